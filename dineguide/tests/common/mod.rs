#![allow(dead_code)]

use std::sync::{Arc, Once};

use serde_json::json;
use tempfile::TempDir;

use dineguide::config::{DatabaseConfig, EmbeddingsConfig, LlmConfig};
use dineguide::db::{Database, DatabaseBackend, LibSqlBackend};

static LOGGER: Once = Once::new();

/// Route tracing output through the test harness. Honors `RUST_LOG`.
pub fn init_test_logger() {
    LOGGER.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// File-backed database in a fresh temp dir. Keep the `TempDir` alive for
/// the duration of the test.
pub async fn test_backend(dimensions: usize) -> (Arc<dyn DatabaseBackend>, TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config = DatabaseConfig {
        url: format!("file:{}", dir.path().join("dineguide.db").display()),
        auth_token: None,
        local_path: None,
    };
    let db = Database::new(&config, dimensions)
        .await
        .expect("Failed to create database");

    (Arc::new(LibSqlBackend::new(db)), dir)
}

pub fn llm_config(base_url: String, max_retries: u32) -> LlmConfig {
    LlmConfig {
        model: "openai/gpt-4o-mini".to_string(),
        api_key: Some("test-key".to_string()),
        base_url: Some(base_url),
        timeout_secs: 5,
        max_retries,
        temperature: Some(0.0),
    }
}

pub fn embeddings_config(base_url: String, dimensions: usize) -> EmbeddingsConfig {
    EmbeddingsConfig {
        model: "openai/text-embedding-3-small".to_string(),
        dimensions,
        batch_size: 2,
        api_key: Some("test-key".to_string()),
        base_url: Some(base_url),
        timeout_secs: 5,
        max_retries: 1,
    }
}

pub fn completion_body(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "created": 1,
        "model": "gpt-4o-mini",
        "choices": [
            {
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": content
                },
                "finish_reason": "stop"
            }
        ],
        "usage": {
            "prompt_tokens": 1,
            "completion_tokens": 1,
            "total_tokens": 2
        }
    })
}

pub fn api_error_body(message: &str, error_type: &str, code: &str) -> serde_json::Value {
    json!({
        "error": {
            "message": message,
            "type": error_type,
            "param": serde_json::Value::Null,
            "code": code
        }
    })
}

pub fn embeddings_body(vectors: &[Vec<f32>]) -> serde_json::Value {
    let data: Vec<serde_json::Value> = vectors
        .iter()
        .enumerate()
        .map(|(index, embedding)| {
            json!({
                "object": "embedding",
                "index": index,
                "embedding": embedding
            })
        })
        .collect();

    json!({
        "object": "list",
        "data": data,
        "model": "text-embedding-3-small",
        "usage": { "prompt_tokens": 1, "total_tokens": 1 }
    })
}
