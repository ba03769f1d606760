//! v1 chat handlers.

use axum::extract::State;

use crate::api::extractors::{AppJson, AppQuery};
use crate::api::v1::dto::chat::{
    ConversationMessageDto, ConversationQuery, ConversationResponse, DeleteSessionRequest,
    DeleteSessionResponse, ListSessionsResponse, NextSessionResponse, SendMessageRequest,
    SendMessageResponse, UserQuery,
};
use crate::api::v1::response::{ApiError, ApiResponse, ErrorCode};
use crate::api::AppState;
use crate::services::TurnRequest;

/// `POST /api/v1/chat/messages`
///
/// Runs one conversation turn: retrieval, generation, reconciliation and
/// persistence of both sides of the exchange.
#[utoipa::path(
    post,
    path = "/api/v1/chat/messages",
    tag = "chat",
    request_body = SendMessageRequest,
    responses(
        (status = 200, description = "Assistant reply", body = SendMessageResponse),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 500, description = "Retrieval, generation or storage failed", body = ApiError),
    )
)]
pub async fn send_message(
    State(state): State<AppState>,
    AppJson(req): AppJson<SendMessageRequest>,
) -> ApiResponse<SendMessageResponse> {
    let request = TurnRequest {
        user_id: req.user_id,
        session_id: req.session_id,
        message: req.message,
    };

    match state.turns.send_message(request).await {
        Ok(turn) => ApiResponse::success(turn.into()),
        Err(e) => e.into(),
    }
}

/// `GET /api/v1/chat/sessions`
///
/// Lists the user's sessions, most recently updated first.
#[utoipa::path(
    get,
    path = "/api/v1/chat/sessions",
    tag = "chat",
    params(UserQuery),
    responses(
        (status = 200, description = "Session summaries", body = ListSessionsResponse),
        (status = 400, description = "Missing user_id", body = ApiError),
        (status = 404, description = "No sessions for this user", body = ApiError),
    )
)]
pub async fn list_sessions(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<UserQuery>,
) -> ApiResponse<ListSessionsResponse> {
    if query.user_id.trim().is_empty() {
        return ApiResponse::error(ErrorCode::InvalidRequest, "Missing user_id");
    }

    match state.conversations.list_session_summaries(&query.user_id).await {
        Ok(summaries) => ApiResponse::success(ListSessionsResponse {
            sessions: summaries.into_iter().map(Into::into).collect(),
        }),
        Err(e) => e.into(),
    }
}

/// `GET /api/v1/chat/conversation`
///
/// Returns the visible messages of one session in order.
#[utoipa::path(
    get,
    path = "/api/v1/chat/conversation",
    tag = "chat",
    params(ConversationQuery),
    responses(
        (status = 200, description = "Conversation messages", body = ConversationResponse),
        (status = 400, description = "Missing user_id or session_id", body = ApiError),
        (status = 404, description = "No conversation history found", body = ApiError),
    )
)]
pub async fn get_conversation(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ConversationQuery>,
) -> ApiResponse<ConversationResponse> {
    if query.user_id.trim().is_empty() || query.session_id.trim().is_empty() {
        return ApiResponse::error(ErrorCode::InvalidRequest, "Missing user_id or session_id");
    }

    match state
        .conversations
        .get_conversation(&query.user_id, &query.session_id)
        .await
    {
        Ok(messages) => ApiResponse::success(ConversationResponse {
            conversation: messages
                .into_iter()
                .filter_map(ConversationMessageDto::from_visible)
                .collect(),
        }),
        Err(e) => e.into(),
    }
}

/// `POST /api/v1/chat/sessions:delete`
#[utoipa::path(
    post,
    path = "/api/v1/chat/sessions:delete",
    tag = "chat",
    request_body = DeleteSessionRequest,
    responses(
        (status = 200, description = "Session deleted", body = DeleteSessionResponse),
        (status = 400, description = "Missing user_id or session_id", body = ApiError),
        (status = 404, description = "No such session", body = ApiError),
    )
)]
pub async fn delete_session(
    State(state): State<AppState>,
    AppJson(req): AppJson<DeleteSessionRequest>,
) -> ApiResponse<DeleteSessionResponse> {
    if req.user_id.trim().is_empty() || req.session_id.trim().is_empty() {
        return ApiResponse::error(ErrorCode::InvalidRequest, "Missing user_id or session_id");
    }

    match state
        .conversations
        .delete_session(&req.user_id, &req.session_id)
        .await
    {
        Ok(()) => ApiResponse::success(DeleteSessionResponse {
            message: "Message history deleted successfully".to_string(),
        }),
        Err(e) => e.into(),
    }
}

/// `GET /api/v1/chat/sessions:next`
///
/// Smallest positive-integer session id the user has not used yet.
#[utoipa::path(
    get,
    path = "/api/v1/chat/sessions:next",
    tag = "chat",
    params(UserQuery),
    responses(
        (status = 200, description = "Next free session id", body = NextSessionResponse),
        (status = 400, description = "Missing user_id", body = ApiError),
        (status = 500, description = "Session storage unavailable", body = ApiError),
    )
)]
pub async fn next_session(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<UserQuery>,
) -> ApiResponse<NextSessionResponse> {
    if query.user_id.trim().is_empty() {
        return ApiResponse::error(ErrorCode::InvalidRequest, "Missing user_id");
    }

    match state.sessions.next_available(&query.user_id).await {
        Ok(next_session_id) => ApiResponse::success(NextSessionResponse { next_session_id }),
        Err(e) => e.into(),
    }
}
