use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::Message;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub session_id: String,
    pub last_updated: DateTime<Utc>,
    pub messages: Vec<Message>,
}

impl Session {
    /// General response of the first AI message in the session, if any.
    pub fn first_ai_response(&self) -> Option<&str> {
        self.messages.iter().find_map(|m| match m {
            Message::AiMessage(response) => Some(response.general_response.as_str()),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionSummary {
    pub session_id: String,
    pub conversation_preview: String,
    pub last_updated: DateTime<Utc>,
}

/// Fixed-width RFC 3339 form so that lexical order equals chronological order.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
