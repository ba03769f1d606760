use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::{Arc, Mutex};

use crate::config::{parse_provider_model, EmbeddingsConfig};
use crate::error::{DineError, Result};

use super::api::{default_base_url, ApiConfig, EmbeddingApiClient};

#[derive(Clone)]
enum EmbeddingBackend {
    Local {
        model: Arc<Mutex<TextEmbedding>>,
        batch_size: usize,
    },
    Api {
        client: EmbeddingApiClient,
        batch_size: usize,
    },
}

/// Embeds restaurant passages and user queries, either with a local
/// fastembed model or through an OpenAI-compatible HTTP API.
#[derive(Clone)]
pub struct EmbeddingProvider {
    backend: EmbeddingBackend,
    dimensions: usize,
}

impl EmbeddingProvider {
    pub fn new(config: &EmbeddingsConfig) -> Result<Self> {
        let (provider, model_name) = parse_provider_model(&config.model);

        if provider == "local" {
            Self::new_local(config, model_name)
        } else {
            Self::new_api(config, provider, model_name)
        }
    }

    fn new_local(config: &EmbeddingsConfig, model_name: &str) -> Result<Self> {
        let embedding_model = resolve_embedding_model(model_name);
        let model = build_model(embedding_model)?;

        Ok(Self {
            backend: EmbeddingBackend::Local {
                model: Arc::new(Mutex::new(model)),
                batch_size: config.batch_size.max(1),
            },
            dimensions: config.dimensions,
        })
    }

    fn new_api(config: &EmbeddingsConfig, provider: &str, model_name: &str) -> Result<Self> {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| default_base_url(provider).to_string());

        let client = EmbeddingApiClient::new(ApiConfig {
            base_url,
            api_key: config.api_key.clone(),
            model: model_name.to_string(),
            timeout_secs: config.timeout_secs,
            max_retries: config.max_retries,
        })?;

        tracing::info!(provider, model = model_name, "Using API embeddings");

        Ok(Self {
            backend: EmbeddingBackend::Api {
                client,
                batch_size: config.batch_size.max(1),
            },
            dimensions: config.dimensions,
        })
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn is_local(&self) -> bool {
        matches!(self.backend, EmbeddingBackend::Local { .. })
    }

    pub async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        let text = match &self.backend {
            // Local models use query: prefix
            EmbeddingBackend::Local { .. } => format!("query: {query}"),
            EmbeddingBackend::Api { .. } => query.to_string(),
        };

        self.embed(vec![text])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DineError::Embedding("No embedding generated".to_string()))
    }

    pub async fn embed_passages(&self, passages: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if passages.is_empty() {
            return Ok(Vec::new());
        }

        let batch_size = match &self.backend {
            EmbeddingBackend::Local { batch_size, .. } | EmbeddingBackend::Api { batch_size, .. } => {
                *batch_size
            }
        };

        let mut all_embeddings = Vec::with_capacity(passages.len());
        for batch in passages.chunks(batch_size) {
            let texts: Vec<String> = match &self.backend {
                EmbeddingBackend::Local { .. } => {
                    batch.iter().map(|p| format!("passage: {p}")).collect()
                }
                EmbeddingBackend::Api { .. } => batch.to_vec(),
            };
            let mut embedded = self.embed(texts).await?;
            all_embeddings.append(&mut embedded);
            tokio::task::yield_now().await;
        }

        Ok(all_embeddings)
    }

    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let expected = texts.len();

        let embeddings = match &self.backend {
            EmbeddingBackend::Local { model, batch_size } => {
                let model = Arc::clone(model);
                let batch_size = *batch_size;
                tokio::task::spawn_blocking(move || {
                    let mut model = model.lock().map_err(|e| {
                        DineError::Embedding(format!("Embedding model lock poisoned: {e}"))
                    })?;
                    model
                        .embed(texts, Some(batch_size))
                        .map_err(|e| DineError::Embedding(e.to_string()))
                })
                .await
                .map_err(|e| DineError::Embedding(format!("Embedding worker failed: {e}")))??
            }
            EmbeddingBackend::Api { client, .. } => {
                let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
                client.embed(&refs).await?
            }
        };

        self.check_shape(expected, &embeddings)?;
        Ok(embeddings)
    }

    fn check_shape(&self, expected: usize, embeddings: &[Vec<f32>]) -> Result<()> {
        if embeddings.len() != expected {
            return Err(DineError::Embedding(format!(
                "Expected {expected} embeddings, got {}",
                embeddings.len()
            )));
        }

        if let Some(wrong) = embeddings.iter().find(|e| e.len() != self.dimensions) {
            return Err(DineError::Embedding(format!(
                "Embedding has {} dimensions, configured for {}. Set EMBEDDING_DIMENSIONS.",
                wrong.len(),
                self.dimensions
            )));
        }

        Ok(())
    }
}

fn resolve_embedding_model(model_name: &str) -> EmbeddingModel {
    match model_name {
        "BAAI/bge-small-en-v1.5" | "bge-small-en-v1.5" => EmbeddingModel::BGESmallENV15,
        "BAAI/bge-base-en-v1.5" | "bge-base-en-v1.5" => EmbeddingModel::BGEBaseENV15,
        "BAAI/bge-large-en-v1.5" | "bge-large-en-v1.5" => EmbeddingModel::BGELargeENV15,
        "all-MiniLM-L6-v2" | "sentence-transformers/all-MiniLM-L6-v2" => {
            EmbeddingModel::AllMiniLML6V2
        }
        "all-MiniLM-L12-v2" | "sentence-transformers/all-MiniLM-L12-v2" => {
            EmbeddingModel::AllMiniLML12V2
        }
        "nomic-embed-text-v1.5" | "nomic-ai/nomic-embed-text-v1.5" => {
            EmbeddingModel::NomicEmbedTextV15
        }
        _ => {
            tracing::warn!(model = model_name, "Unknown local embedding model, using bge-small-en-v1.5");
            EmbeddingModel::BGESmallENV15
        }
    }
}

fn build_model(embedding_model: EmbeddingModel) -> Result<TextEmbedding> {
    TextEmbedding::try_new(InitOptions::new(embedding_model).with_show_download_progress(true))
        .map_err(|e| DineError::Embedding(e.to_string()))
}
