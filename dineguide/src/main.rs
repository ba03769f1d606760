use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dineguide::api::{create_router, AppState};
use dineguide::config::Config;
use dineguide::db::{Database, DatabaseBackend, LibSqlBackend};
use dineguide::embeddings::EmbeddingProvider;
use dineguide::llm::LlmProvider;
use dineguide::migration;
use dineguide::services::RestaurantCatalog;

const REPLICA_SYNC_INTERVAL_SECS: u64 = 60;

#[derive(Parser)]
#[command(name = "dineguide")]
#[command(about = "Conversational restaurant recommendations backed by retrieval and an LLM")]
struct Args {
    /// Re-embed the restaurant catalog when a dimension mismatch is detected
    #[arg(long)]
    rebuild_embeddings: bool,

    /// JSON file of catalog entries to load at startup (overrides CATALOG_PATH)
    #[arg(long, value_name = "PATH")]
    catalog: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dineguide=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    tracing::info!("Loading embedding model: {}...", config.embeddings.model);
    let embeddings = EmbeddingProvider::new(&config.embeddings)?;

    tracing::info!("Initializing database...");
    let raw_db = Database::new(&config.database, embeddings.dimensions()).await?;
    let db: Arc<dyn DatabaseBackend> = Arc::new(LibSqlBackend::new(raw_db));

    let catalog = RestaurantCatalog::new(db.clone(), embeddings.clone());

    match migration::check_dimension_compatibility(&*db, &embeddings, args.rebuild_embeddings)
        .await?
    {
        migration::MigrationDecision::NotNeeded => {}
        migration::MigrationDecision::Approved => {
            let rebuilt = migration::rebuild_catalog(&catalog).await?;
            tracing::info!("Re-embedded {} restaurants", rebuilt);
        }
        migration::MigrationDecision::Rejected => {
            tracing::error!("Migration rejected. Cannot start with dimension mismatch.");
            return Err(anyhow::anyhow!(
                "Embedding dimension mismatch - use --rebuild-embeddings flag to force migration"
            ));
        }
    }

    if let Some(path) = args.catalog.as_ref().or(config.catalog.path.as_ref()) {
        let loaded = catalog.load_from_file(path).await?;
        tracing::info!("Catalog loaded from {}: {} restaurants", path, loaded);
    }

    match catalog.count().await {
        Ok(0) => tracing::warn!(
            "Restaurant catalog is empty - set CATALOG_PATH or POST /api/v1/restaurants:import"
        ),
        Ok(n) => tracing::info!("Restaurant catalog contains {} entries", n),
        Err(e) => tracing::warn!("Failed to count catalog entries: {}", e),
    }

    if let Some(llm_config) = &config.llm {
        tracing::info!("Initializing LLM provider: {}...", llm_config.model);
    }
    let llm = LlmProvider::new(config.llm.as_ref());
    if !llm.is_available() {
        tracing::warn!("LLM unavailable - chat turns will fail until LLM_MODEL is set");
    }

    let cancel_token = CancellationToken::new();

    if config.database.local_path.is_some() {
        tracing::info!(
            "Starting embedded replica sync... (interval={}s)",
            REPLICA_SYNC_INTERVAL_SECS
        );
        let replica = db.clone();
        let token = cancel_token.child_token();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        tracing::info!("Replica sync shutting down...");
                        break;
                    }
                    _ = tokio::time::sleep(tokio::time::Duration::from_secs(REPLICA_SYNC_INTERVAL_SECS)) => {
                        if let Err(e) = replica.sync().await {
                            tracing::error!("Replica sync error: {}", e);
                        }
                    }
                }
            }
        });
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(config, db, embeddings, llm);
    let app = create_router(state);

    tracing::info!("Dineguide starting on http://{}", addr);
    tracing::info!("  Health check: http://{}/api/v1/health", addr);
    tracing::info!("  API docs:     http://{}/api/v1/docs", addr);
    tracing::info!("  OpenAPI spec: http://{}/api/v1/openapi.json", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel_token))
        .await?;

    Ok(())
}

async fn shutdown_signal(cancel_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, cancelling background tasks...");
    cancel_token.cancel();
}
