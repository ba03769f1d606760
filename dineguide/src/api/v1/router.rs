use axum::{
    routing::{get, post},
    Router,
};

use crate::api::state::AppState;

use super::handlers;

pub fn v1_router() -> Router<AppState> {
    let chat = Router::new()
        .route("/messages", post(handlers::chat::send_message))
        .route("/sessions", get(handlers::chat::list_sessions))
        .route("/sessions:delete", post(handlers::chat::delete_session))
        .route("/sessions:next", get(handlers::chat::next_session))
        .route("/conversation", get(handlers::chat::get_conversation));

    let public_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/openapi.json", get(super::openapi::openapi_json))
        .merge(super::openapi::redoc_router());

    Router::new()
        .merge(public_routes)
        .nest("/chat", chat)
        .route(
            "/restaurants:import",
            post(handlers::restaurants::import_restaurants),
        )
}
