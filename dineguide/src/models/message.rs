use serde::{Deserialize, Serialize};

use super::{RecommendedRestaurant, Restaurant};

/// Discriminant of a stored chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    HumanMessageNoPrompt,
    AiMessage,
    RestaurantData,
}

impl MessageType {
    /// Whether messages of this type are shown to a reading client.
    pub fn is_visible(&self) -> bool {
        !matches!(self, Self::RestaurantData)
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HumanMessageNoPrompt => write!(f, "human_message_no_prompt"),
            Self::AiMessage => write!(f, "ai_message"),
            Self::RestaurantData => write!(f, "restaurant_data"),
        }
    }
}

impl std::str::FromStr for MessageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "human_message_no_prompt" => Ok(Self::HumanMessageNoPrompt),
            "ai_message" => Ok(Self::AiMessage),
            "restaurant_data" => Ok(Self::RestaurantData),
            _ => Err(format!("Unknown message type: {s}")),
        }
    }
}

/// Structured assistant reply as persisted and returned to callers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct StructuredResponse {
    pub general_response: String,
    #[serde(default)]
    pub restaurants: Vec<Restaurant>,
}

/// Raw structured output of the language model, before reconciliation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ModelResponse {
    pub general_response: String,
    #[serde(default)]
    pub restaurants: Vec<RecommendedRestaurant>,
}

/// One entry of a session log. The tag fully determines the content shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "message_type", content = "content", rename_all = "snake_case")]
pub enum Message {
    HumanMessageNoPrompt(String),
    AiMessage(StructuredResponse),
    /// Serialized retrieval results kept for provenance and model priming.
    RestaurantData(String),
}

impl Message {
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::HumanMessageNoPrompt(_) => MessageType::HumanMessageNoPrompt,
            Self::AiMessage(_) => MessageType::AiMessage,
            Self::RestaurantData(_) => MessageType::RestaurantData,
        }
    }

    /// Column representation of the content: raw text for text variants,
    /// compact JSON for the structured AI reply.
    pub fn content_text(&self) -> serde_json::Result<String> {
        match self {
            Self::HumanMessageNoPrompt(text) | Self::RestaurantData(text) => Ok(text.clone()),
            Self::AiMessage(response) => serde_json::to_string(response),
        }
    }

    /// Rebuild a message from its stored columns. Unknown tags and
    /// undecodable AI payloads yield `None`.
    pub fn from_stored(message_type: &str, content: String) -> Option<Self> {
        let message_type: MessageType = match message_type.parse() {
            Ok(t) => t,
            Err(_) => {
                tracing::debug!(message_type, "Skipping message with unknown type");
                return None;
            }
        };

        match message_type {
            MessageType::HumanMessageNoPrompt => Some(Self::HumanMessageNoPrompt(content)),
            MessageType::RestaurantData => Some(Self::RestaurantData(content)),
            MessageType::AiMessage => match serde_json::from_str(&content) {
                Ok(response) => Some(Self::AiMessage(response)),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping undecodable ai_message");
                    None
                }
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    Human,
    Assistant,
}

/// Model-ready transcript entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub text: String,
}

impl ChatTurn {
    pub fn human(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Human,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            text: text.into(),
        }
    }
}
