use std::collections::HashSet;
use std::sync::Arc;

use crate::db::DatabaseBackend;
use crate::error::{DineError, Result};
use crate::models::{Message, SessionSummary};

const NO_GENERAL_RESPONSE: &str = "No general response";
const NO_AI_MESSAGES: &str = "No AI messages yet";

/// Picks the smallest unused positive-integer session id for a user.
#[derive(Clone)]
pub struct SessionAllocator {
    db: Arc<dyn DatabaseBackend>,
}

impl SessionAllocator {
    pub fn new(db: Arc<dyn DatabaseBackend>) -> Self {
        Self { db }
    }

    pub async fn next_available(&self, user_id: &str) -> Result<String> {
        let sessions = self.db.list_sessions(user_id).await?;
        Ok(smallest_unused_id(sessions.keys().map(String::as_str)).to_string())
    }
}

/// A number is taken only when a key equals its decimal form, so `"01"` and
/// `"+1"` do not reserve 1.
pub fn smallest_unused_id<'a>(keys: impl Iterator<Item = &'a str>) -> u64 {
    let used: HashSet<&str> = keys.collect();

    (1..)
        .find(|n: &u64| !used.contains(n.to_string().as_str()))
        .unwrap_or(1)
}

/// Read side of the conversation log.
#[derive(Clone)]
pub struct ConversationQueryService {
    db: Arc<dyn DatabaseBackend>,
}

impl ConversationQueryService {
    pub fn new(db: Arc<dyn DatabaseBackend>) -> Self {
        Self { db }
    }

    /// Visible messages of a session, in order. Retrieval records are never
    /// returned.
    pub async fn get_conversation(&self, user_id: &str, session_id: &str) -> Result<Vec<Message>> {
        if !self.db.session_exists(user_id, session_id).await? {
            return Err(DineError::NotFound(
                "No conversation history found".to_string(),
            ));
        }

        let messages = self.db.read_all_messages(user_id, session_id).await?;
        Ok(messages
            .into_iter()
            .filter(|m| m.message_type().is_visible())
            .collect())
    }

    /// One summary per session, most recently updated first.
    pub async fn list_session_summaries(&self, user_id: &str) -> Result<Vec<SessionSummary>> {
        let sessions = self.db.list_sessions(user_id).await?;
        if sessions.is_empty() {
            return Err(DineError::NotFound(
                "No sessions found for the provided user_id".to_string(),
            ));
        }

        let mut summaries: Vec<SessionSummary> = sessions
            .into_values()
            .map(|session| {
                let conversation_preview = match session.first_ai_response() {
                    Some("") => NO_GENERAL_RESPONSE.to_string(),
                    Some(preview) => preview.to_string(),
                    None => NO_AI_MESSAGES.to_string(),
                };
                SessionSummary {
                    session_id: session.session_id,
                    conversation_preview,
                    last_updated: session.last_updated,
                }
            })
            .collect();

        summaries.sort_by(|a, b| {
            b.last_updated
                .cmp(&a.last_updated)
                .then_with(|| a.session_id.cmp(&b.session_id))
        });

        Ok(summaries)
    }

    pub async fn delete_session(&self, user_id: &str, session_id: &str) -> Result<()> {
        if self.db.delete_session(user_id, session_id).await? {
            tracing::info!(user_id, session_id, "Deleted session");
            Ok(())
        } else {
            Err(DineError::NotFound(
                "No session found for the provided user_id and session_id".to_string(),
            ))
        }
    }
}
