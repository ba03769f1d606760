use std::sync::Arc;

use crate::config::HistoryWindow;
use crate::db::DatabaseBackend;
use crate::error::Result;
use crate::models::{ChatTurn, Message};

/// Builds the model-ready transcript for a session.
#[derive(Clone)]
pub struct HistoryAssembler {
    db: Arc<dyn DatabaseBackend>,
}

impl HistoryAssembler {
    pub fn new(db: Arc<dyn DatabaseBackend>) -> Self {
        Self { db }
    }

    pub async fn assemble(
        &self,
        user_id: &str,
        session_id: &str,
        window: HistoryWindow,
    ) -> Result<Vec<ChatTurn>> {
        let messages = match window.0 {
            Some(limit) => {
                self.db
                    .read_recent_messages(user_id, session_id, limit)
                    .await?
            }
            None => self.db.read_all_messages(user_id, session_id).await?,
        };

        messages.iter().map(to_turn).collect()
    }
}

/// Human text is sent as-is; every other message is replayed to the model
/// as its JSON-serialized content.
fn to_turn(message: &Message) -> Result<ChatTurn> {
    let turn = match message {
        Message::HumanMessageNoPrompt(text) => ChatTurn::human(text.clone()),
        Message::AiMessage(response) => ChatTurn::assistant(serde_json::to_string(response)?),
        Message::RestaurantData(record) => ChatTurn::assistant(serde_json::to_string(record)?),
    };
    Ok(turn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChatRole, StructuredResponse};

    #[test]
    fn test_human_text_is_raw() {
        let turn = to_turn(&Message::HumanMessageNoPrompt("tacos?".into())).unwrap();
        assert_eq!(turn, ChatTurn::human("tacos?"));
    }

    #[test]
    fn test_ai_and_record_become_assistant_json() {
        let ai = to_turn(&Message::AiMessage(StructuredResponse {
            general_response: "Try X".into(),
            restaurants: vec![],
        }))
        .unwrap();
        assert_eq!(ai.role, ChatRole::Assistant);
        let parsed: StructuredResponse = serde_json::from_str(&ai.text).unwrap();
        assert_eq!(parsed.general_response, "Try X");

        let record = to_turn(&Message::RestaurantData("{\"a\":1}".into())).unwrap();
        assert_eq!(record.role, ChatRole::Assistant);
        assert_eq!(record.text, "\"{\\\"a\\\":1}\"");
    }
}
