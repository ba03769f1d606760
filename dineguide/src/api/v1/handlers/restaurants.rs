//! v1 restaurant catalog handlers.

use axum::extract::State;

use crate::api::extractors::AppJson;
use crate::api::v1::dto::restaurants::{ImportRestaurantsRequest, ImportRestaurantsResponse};
use crate::api::v1::response::{ApiError, ApiResponse, ErrorCode};
use crate::api::AppState;
use crate::models::CatalogEntry;

/// `POST /api/v1/restaurants:import`
///
/// Embeds the given restaurants and upserts them into the catalog by
/// `place_id`.
#[utoipa::path(
    post,
    path = "/api/v1/restaurants:import",
    tag = "restaurants",
    request_body = ImportRestaurantsRequest,
    responses(
        (status = 200, description = "Restaurants imported", body = ImportRestaurantsResponse),
        (status = 400, description = "Invalid catalog entry", body = ApiError),
    )
)]
pub async fn import_restaurants(
    State(state): State<AppState>,
    AppJson(req): AppJson<ImportRestaurantsRequest>,
) -> ApiResponse<ImportRestaurantsResponse> {
    if req.restaurants.is_empty() {
        return ApiResponse::error(ErrorCode::InvalidRequest, "Restaurants cannot be empty");
    }

    let entries: Vec<CatalogEntry> = req.restaurants.into_iter().map(Into::into).collect();

    let imported = match state.catalog.upsert(entries).await {
        Ok(n) => n,
        Err(e) => return e.into(),
    };

    let total = match state.catalog.count().await {
        Ok(total) => total,
        Err(e) => return e.into(),
    };

    ApiResponse::success(ImportRestaurantsResponse { imported, total })
}
