use axum::Json;
use utoipa::OpenApi;
use utoipa_redoc::{Redoc, Servable};

use super::dto;
use super::handlers;
use super::response;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Dineguide API",
        version = "1.0.0",
        description = "Conversational restaurant recommendations with durable chat history.",
    ),
    paths(
        handlers::health::health_check,
        handlers::chat::send_message,
        handlers::chat::list_sessions,
        handlers::chat::get_conversation,
        handlers::chat::delete_session,
        handlers::chat::next_session,
        handlers::restaurants::import_restaurants,
    ),
    components(schemas(
        // Response envelope
        response::ErrorCode,
        response::ApiError,
        // Chat
        dto::chat::SendMessageRequest,
        dto::chat::SendMessageResponse,
        dto::chat::ChatReplyDto,
        dto::chat::ConversationMessageDto,
        dto::chat::ConversationResponse,
        dto::chat::SessionSummaryDto,
        dto::chat::ListSessionsResponse,
        dto::chat::DeleteSessionRequest,
        dto::chat::DeleteSessionResponse,
        dto::chat::NextSessionResponse,
        // Restaurants
        dto::restaurants::RestaurantDto,
        dto::restaurants::CatalogEntryDto,
        dto::restaurants::ImportRestaurantsRequest,
        dto::restaurants::ImportRestaurantsResponse,
        // Health (handler-local types)
        handlers::health::HealthData,
        handlers::health::DatabaseStatus,
        handlers::health::CatalogStatus,
        handlers::health::EmbeddingsStatus,
        handlers::health::LlmStatus,
    )),
    tags(
        (name = "health", description = "Health check"),
        (name = "chat", description = "Conversation turns, history and sessions"),
        (name = "restaurants", description = "Restaurant catalog import"),
    ),
)]
pub struct ApiDoc;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

pub fn redoc_router<S: Clone + Send + Sync + 'static>() -> axum::Router<S> {
    Redoc::with_url("/docs", ApiDoc::openapi()).into()
}
