use std::io::{self, BufRead, Write};

use crate::db::traits::DatabaseBackend;
use crate::embeddings::EmbeddingProvider;
use crate::error::Result;
use crate::services::RestaurantCatalog;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationDecision {
    NotNeeded,
    Approved,
    Rejected,
}

/// Outcome of comparing the stored vector width with the provider's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DimensionCheck {
    Fresh,
    Matching,
    Mismatch { stored: usize, provider: usize },
}

fn compare_dimensions(stored: Option<usize>, provider: usize) -> DimensionCheck {
    match stored {
        None => DimensionCheck::Fresh,
        Some(stored) if stored == provider => DimensionCheck::Matching,
        Some(stored) => DimensionCheck::Mismatch { stored, provider },
    }
}

/// Decides whether the restaurant catalog must be re-embedded before serving.
///
/// A fresh database records the provider's width. A mismatch is approved by
/// `force_rebuild` or an interactive `y` on stdin.
pub async fn check_dimension_compatibility(
    db: &dyn DatabaseBackend,
    provider: &EmbeddingProvider,
    force_rebuild: bool,
) -> Result<MigrationDecision> {
    let stored = db.get_embedding_dimensions().await?;

    match compare_dimensions(stored, provider.dimensions()) {
        DimensionCheck::Fresh => {
            tracing::info!(
                dimensions = provider.dimensions(),
                "Fresh catalog, recording embedding dimensions"
            );
            db.set_embedding_dimensions(provider.dimensions()).await?;
            Ok(MigrationDecision::NotNeeded)
        }
        DimensionCheck::Matching => {
            tracing::info!(dimensions = provider.dimensions(), "Embedding dimensions match");
            Ok(MigrationDecision::NotNeeded)
        }
        DimensionCheck::Mismatch { stored, provider } => {
            tracing::warn!(stored, provider, "Embedding dimension mismatch");

            if force_rebuild {
                tracing::info!("--rebuild-embeddings set, re-embedding the restaurant catalog");
                return Ok(MigrationDecision::Approved);
            }

            let stdin = io::stdin();
            let approved = confirm_rebuild(&mut stdin.lock(), &mut io::stdout(), stored, provider)?;
            Ok(if approved {
                MigrationDecision::Approved
            } else {
                MigrationDecision::Rejected
            })
        }
    }
}

fn confirm_rebuild(
    input: &mut impl BufRead,
    output: &mut impl Write,
    stored: usize,
    provider: usize,
) -> io::Result<bool> {
    write!(
        output,
        "\nThe restaurant catalog was embedded with {stored} dimensions, \
         but the configured model produces {provider}.\n\
         Re-embed every stored restaurant now? [y/N]: "
    )?;
    output.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;

    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

/// Re-embed every stored restaurant at the current provider dimensions.
pub async fn rebuild_catalog(catalog: &RestaurantCatalog) -> Result<usize> {
    let rebuilt = catalog.rebuild_embeddings().await?;
    tracing::info!(rebuilt, "Restaurant catalog re-embedded");
    Ok(rebuilt)
}
