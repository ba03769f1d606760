use axum::extract::State;
use serde::Serialize;

use crate::api::state::AppState;
use crate::api::v1::response::ApiResponse;
use crate::llm::{LlmBackend, LlmProvider};

/// Health data returned inside the v1 envelope.
///
/// `status` is `ok` only when storage is reachable and a chat turn could
/// complete; otherwise `degraded`.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct HealthData {
    pub status: String,
    pub version: String,
    pub database: DatabaseStatus,
    pub catalog: CatalogStatus,
    pub embeddings: EmbeddingsStatus,
    pub llm: LlmStatus,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct DatabaseStatus {
    pub status: String,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct CatalogStatus {
    /// `ready`, `empty` or `unknown` when the count failed.
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restaurants: Option<u64>,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct EmbeddingsStatus {
    pub backend: String,
    pub model: String,
    pub dimensions: usize,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct LlmStatus {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// `GET /api/v1/health`
#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "health",
    responses(
        (status = 200, description = "Service readiness", body = HealthData),
    )
)]
pub async fn health_check(State(state): State<AppState>) -> ApiResponse<HealthData> {
    let database_ok = match state.db.sync().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Database health check failed");
            false
        }
    };

    let catalog = if database_ok {
        match state.catalog.count().await {
            Ok(0) => CatalogStatus {
                status: "empty".to_string(),
                restaurants: Some(0),
            },
            Ok(n) => CatalogStatus {
                status: "ready".to_string(),
                restaurants: Some(n),
            },
            Err(e) => {
                tracing::warn!(error = %e, "Catalog count failed");
                unknown_catalog()
            }
        }
    } else {
        unknown_catalog()
    };

    let llm = llm_status(&state.llm);
    let ready = database_ok && state.llm.is_available();

    ApiResponse::success(HealthData {
        status: if ready { "ok" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: DatabaseStatus {
            status: if database_ok { "ok" } else { "error" }.to_string(),
        },
        catalog,
        embeddings: EmbeddingsStatus {
            backend: if state.embeddings.is_local() { "local" } else { "api" }.to_string(),
            model: state.config.embeddings.model.clone(),
            dimensions: state.embeddings.dimensions(),
        },
        llm,
    })
}

fn unknown_catalog() -> CatalogStatus {
    CatalogStatus {
        status: "unknown".to_string(),
        restaurants: None,
    }
}

fn llm_status(llm: &LlmProvider) -> LlmStatus {
    let provider = match llm.backend() {
        LlmBackend::OpenAI => "openai",
        LlmBackend::OpenRouter => "openrouter",
        LlmBackend::Ollama => "ollama",
        LlmBackend::LmStudio => "lmstudio",
        LlmBackend::OpenAICompatible { .. } => "openai-compatible",
        LlmBackend::Unavailable { .. } => {
            return LlmStatus {
                status: "unavailable".to_string(),
                provider: None,
                model: None,
            }
        }
    };

    LlmStatus {
        status: "available".to_string(),
        provider: Some(provider.to_string()),
        model: llm.config().map(|c| c.model.clone()),
    }
}
