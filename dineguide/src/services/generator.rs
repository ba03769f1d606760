use async_trait::async_trait;

use crate::config::PolicyStrictness;
use crate::error::Result;
use crate::llm::prompts::{parse_model_response, system_prompt, user_turn_prompt};
use crate::llm::{ChatMessage, LlmProvider};
use crate::models::{ChatTurn, ModelResponse};
use crate::services::RetrievalContext;

/// Fixed conversational policy for one generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatPolicy {
    pub metro_area: String,
    pub strictness: PolicyStrictness,
}

#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    async fn generate(
        &self,
        user_text: &str,
        history: &[ChatTurn],
        context: &RetrievalContext,
        policy: &ChatPolicy,
    ) -> Result<ModelResponse>;
}

pub struct LlmResponseGenerator {
    llm: LlmProvider,
}

impl LlmResponseGenerator {
    pub fn new(llm: LlmProvider) -> Self {
        Self { llm }
    }

    fn build_messages(
        user_text: &str,
        history: &[ChatTurn],
        context: &RetrievalContext,
        policy: &ChatPolicy,
    ) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(system_prompt(
            &policy.metro_area,
            policy.strictness,
        )));
        messages.extend(history.iter().map(ChatMessage::from));
        messages.push(ChatMessage::user(user_turn_prompt(user_text, &context.hits)));
        messages
    }
}

#[async_trait]
impl ResponseGenerator for LlmResponseGenerator {
    async fn generate(
        &self,
        user_text: &str,
        history: &[ChatTurn],
        context: &RetrievalContext,
        policy: &ChatPolicy,
    ) -> Result<ModelResponse> {
        let messages = Self::build_messages(user_text, history, context, policy);
        let options = self.llm.default_options();

        let raw = self.llm.complete_chat(&messages, Some(&options)).await?;
        let response = parse_model_response(&raw)?;

        tracing::debug!(
            recommendations = response.restaurants.len(),
            "Generated structured response"
        );
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DineError;
    use crate::llm::ChatMessageRole;

    fn policy() -> ChatPolicy {
        ChatPolicy {
            metro_area: "Los Angeles".to_string(),
            strictness: PolicyStrictness::PreferHistory,
        }
    }

    #[test]
    fn test_message_layout() {
        let history = vec![ChatTurn::human("hi"), ChatTurn::assistant("{}")];
        let messages = LlmResponseGenerator::build_messages(
            "tacos?",
            &history,
            &RetrievalContext::default(),
            &policy(),
        );

        let roles: Vec<ChatMessageRole> = messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![
                ChatMessageRole::System,
                ChatMessageRole::User,
                ChatMessageRole::Assistant,
                ChatMessageRole::User,
            ]
        );
        assert!(messages[0].content.contains("Los Angeles"));
        assert_eq!(messages[3].content, "tacos?");
    }

    #[tokio::test]
    async fn test_unavailable_llm_fails_generation() {
        let generator = LlmResponseGenerator::new(LlmProvider::unavailable("no llm"));
        let result = generator
            .generate("hi", &[], &RetrievalContext::default(), &policy())
            .await;
        assert!(matches!(result, Err(DineError::LlmUnavailable(_))));
    }
}
