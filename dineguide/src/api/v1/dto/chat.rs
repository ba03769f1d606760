//! Chat request/response DTOs for the v1 API.

use serde::{Deserialize, Serialize};

use super::restaurants::RestaurantDto;
use crate::models::{self, format_timestamp};
use crate::services::TurnResponse;

/// Request body for `POST /api/v1/chat/messages`.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct SendMessageRequest {
    /// Opaque user identifier from the identity provider.
    pub user_id: String,
    pub session_id: String,
    pub message: String,
}

/// Structured assistant reply.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, utoipa::ToSchema)]
pub struct ChatReplyDto {
    pub general_response: String,
    pub restaurants: Vec<RestaurantDto>,
}

impl From<models::StructuredResponse> for ChatReplyDto {
    fn from(response: models::StructuredResponse) -> Self {
        Self {
            general_response: response.general_response,
            restaurants: response.restaurants.into_iter().map(Into::into).collect(),
        }
    }
}

/// Response for `POST /api/v1/chat/messages`.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct SendMessageResponse {
    pub general_response: String,
    pub restaurants: Vec<RestaurantDto>,
    /// Set when the turn ran without fresh restaurant data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

impl From<TurnResponse> for SendMessageResponse {
    fn from(turn: TurnResponse) -> Self {
        let reply = ChatReplyDto::from(turn.response);
        Self {
            general_response: reply.general_response,
            restaurants: reply.restaurants,
            notice: turn.notice,
        }
    }
}

/// A visible conversation message.
///
/// Wire format: `{"message_type": "human_message_no_prompt", "content": "..."}`
/// or `{"message_type": "ai_message", "content": {"general_response": ..., "restaurants": [...]}}`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, utoipa::ToSchema)]
#[serde(tag = "message_type", content = "content", rename_all = "snake_case")]
pub enum ConversationMessageDto {
    HumanMessageNoPrompt(String),
    AiMessage(ChatReplyDto),
}

impl ConversationMessageDto {
    /// `None` for messages that are never shown to clients.
    pub fn from_visible(message: models::Message) -> Option<Self> {
        match message {
            models::Message::HumanMessageNoPrompt(text) => Some(Self::HumanMessageNoPrompt(text)),
            models::Message::AiMessage(response) => Some(Self::AiMessage(response.into())),
            models::Message::RestaurantData(_) => None,
        }
    }
}

/// Query for endpoints scoped to a user.
#[derive(Debug, Clone, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserQuery {
    pub user_id: String,
}

/// Query for endpoints scoped to one session.
#[derive(Debug, Clone, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ConversationQuery {
    pub user_id: String,
    pub session_id: String,
}

/// Response for `GET /api/v1/chat/conversation`.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct ConversationResponse {
    pub conversation: Vec<ConversationMessageDto>,
}

/// One entry of the session sidebar.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct SessionSummaryDto {
    pub session_id: String,
    /// First assistant reply, or a placeholder when there is none.
    pub conversation_preview: String,
    /// RFC 3339 UTC timestamp with microsecond precision.
    pub last_updated: String,
}

impl From<models::SessionSummary> for SessionSummaryDto {
    fn from(summary: models::SessionSummary) -> Self {
        Self {
            session_id: summary.session_id,
            conversation_preview: summary.conversation_preview,
            last_updated: format_timestamp(&summary.last_updated),
        }
    }
}

/// Response for `GET /api/v1/chat/sessions`. Most recently updated first.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct ListSessionsResponse {
    pub sessions: Vec<SessionSummaryDto>,
}

/// Request body for `POST /api/v1/chat/sessions:delete`.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct DeleteSessionRequest {
    pub user_id: String,
    pub session_id: String,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct DeleteSessionResponse {
    pub message: String,
}

/// Response for `GET /api/v1/chat/sessions:next`.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct NextSessionResponse {
    pub next_session_id: String,
}
