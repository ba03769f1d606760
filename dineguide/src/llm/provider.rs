use std::sync::Arc;

use crate::config::{parse_llm_provider_model, LlmConfig};
use crate::error::{DineError, Result};
use crate::llm::api::LlmApiClient;
use crate::models::{ChatRole, ChatTurn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmBackend {
    OpenAI,
    OpenRouter,
    Ollama,
    LmStudio,
    OpenAICompatible { base_url: String },
    Unavailable { reason: String },
}

#[derive(Debug, Clone, Default)]
pub struct CompletionOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatMessageRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: ChatMessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatMessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatMessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatMessageRole::Assistant,
            content: content.into(),
        }
    }
}

impl From<&ChatTurn> for ChatMessage {
    fn from(turn: &ChatTurn) -> Self {
        match turn.role {
            ChatRole::Human => Self::user(turn.text.clone()),
            ChatRole::Assistant => Self::assistant(turn.text.clone()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LlmProvider {
    backend: LlmBackend,
    config: Option<Arc<LlmConfig>>,
}

impl LlmProvider {
    pub fn new(config: Option<&LlmConfig>) -> Self {
        let Some(config) = config else {
            return Self::unavailable("No LLM configuration provided");
        };

        let (provider, _model) = parse_llm_provider_model(&config.model);

        let backend = match provider.to_lowercase().as_str() {
            "openai" => LlmBackend::OpenAI,
            "openrouter" => LlmBackend::OpenRouter,
            "ollama" => LlmBackend::Ollama,
            "lmstudio" => LlmBackend::LmStudio,
            _ => {
                if let Some(base_url) = &config.base_url {
                    LlmBackend::OpenAICompatible {
                        base_url: base_url.clone(),
                    }
                } else {
                    LlmBackend::Unavailable {
                        reason: format!("Unknown provider in model: {}", config.model),
                    }
                }
            }
        };

        Self {
            backend,
            config: Some(Arc::new(config.clone())),
        }
    }

    pub fn unavailable(reason: &str) -> Self {
        Self {
            backend: LlmBackend::Unavailable {
                reason: reason.to_string(),
            },
            config: None,
        }
    }

    pub fn is_available(&self) -> bool {
        !matches!(self.backend, LlmBackend::Unavailable { .. })
    }

    pub fn backend(&self) -> &LlmBackend {
        &self.backend
    }

    pub fn config(&self) -> Option<&LlmConfig> {
        self.config.as_deref()
    }

    /// Temperature from config, used when the caller passes no options.
    pub fn default_options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: self.config().and_then(|c| c.temperature),
            max_tokens: None,
        }
    }

    pub async fn complete(
        &self,
        prompt: &str,
        options: Option<&CompletionOptions>,
    ) -> Result<String> {
        let client = self.client()?;
        client.complete(prompt, None, options).await
    }

    pub async fn complete_chat(
        &self,
        messages: &[ChatMessage],
        options: Option<&CompletionOptions>,
    ) -> Result<String> {
        let client = self.client()?;
        client.complete_chat(messages, options).await
    }

    fn client(&self) -> Result<LlmApiClient> {
        if !self.is_available() {
            return Err(DineError::LlmUnavailable(self.unavailable_reason()));
        }

        let config = self
            .config()
            .ok_or_else(|| DineError::LlmUnavailable("No config available".to_string()))?;

        LlmApiClient::new(config)
    }

    fn unavailable_reason(&self) -> String {
        match &self.backend {
            LlmBackend::Unavailable { reason } => reason.clone(),
            _ => "LLM provider is not configured".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(model: &str, base_url: Option<&str>) -> LlmConfig {
        LlmConfig {
            model: model.to_string(),
            api_key: Some("test-key".to_string()),
            base_url: base_url.map(str::to_string),
            timeout_secs: 5,
            max_retries: 0,
            temperature: Some(0.2),
        }
    }

    #[test]
    fn test_backend_detection() {
        assert_eq!(
            LlmProvider::new(Some(&config("openai/gpt-4o-mini", None))).backend(),
            &LlmBackend::OpenAI
        );
        assert_eq!(
            LlmProvider::new(Some(&config("ollama/llama3", None))).backend(),
            &LlmBackend::Ollama
        );
        assert_eq!(
            LlmProvider::new(Some(&config("custom/model", Some("http://llm.local/v1")))).backend(),
            &LlmBackend::OpenAICompatible {
                base_url: "http://llm.local/v1".to_string()
            }
        );
    }

    #[test]
    fn test_missing_config_is_unavailable() {
        let provider = LlmProvider::new(None);
        assert!(!provider.is_available());
        assert!(provider.config().is_none());
    }

    #[test]
    fn test_default_options_use_configured_temperature() {
        let provider = LlmProvider::new(Some(&config("openai/gpt-4o-mini", None)));
        assert_eq!(provider.default_options().temperature, Some(0.2));
    }

    #[test]
    fn test_chat_turns_map_to_roles() {
        let human = ChatMessage::from(&ChatTurn::human("hi"));
        let ai = ChatMessage::from(&ChatTurn::assistant("hello"));
        assert_eq!(human.role, ChatMessageRole::User);
        assert_eq!(ai.role, ChatMessageRole::Assistant);
    }

    #[tokio::test]
    async fn test_unavailable_provider_refuses_completion() {
        let provider = LlmProvider::unavailable("disabled");
        let result = provider.complete_chat(&[ChatMessage::user("hi")], None).await;
        match result {
            Err(DineError::LlmUnavailable(reason)) => assert_eq!(reason, "disabled"),
            other => panic!("expected LlmUnavailable, got {other:?}"),
        }
    }
}
