//! Restaurant DTOs for the v1 API.

use serde::{Deserialize, Serialize};

use crate::models::{self, PriceLevel};

/// A recommended restaurant as returned to clients.
///
/// Matched recommendations carry the catalog's metadata; unmatched ones only
/// the fields the model produced.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, utoipa::ToSchema)]
pub struct RestaurantDto {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub place_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Average rating between 0.0 and 5.0.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    /// One of `free`, `inexpensive`, `moderate`, `expensive`, `very_expensive`.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub price_level: Option<PriceLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_maps_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restaurant_website: Option<String>,
    /// Newline-delimited weekly hours.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opening_hours: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary_of_restaurant: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary_of_reviews: Option<String>,
}

impl From<models::Restaurant> for RestaurantDto {
    fn from(r: models::Restaurant) -> Self {
        Self {
            place_id: r.place_id,
            name: r.name,
            address: r.address,
            rating: r.rating,
            price_level: r.price_level,
            google_maps_url: r.google_maps_url,
            restaurant_website: r.restaurant_website,
            opening_hours: r.opening_hours,
            summary_of_restaurant: r.summary_of_restaurant,
            summary_of_reviews: r.summary_of_reviews,
        }
    }
}

/// A catalog entry to import. Only `place_id` is required.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct CatalogEntryDto {
    pub place_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    /// Accepts snake_case labels, `$`..`$$$$`, `PRICE_LEVEL_*` or a tier `0..=4`.
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub price_level: Option<PriceLevel>,
    #[serde(default)]
    pub google_maps_url: Option<String>,
    #[serde(default)]
    pub restaurant_website: Option<String>,
    #[serde(default)]
    pub opening_hours: Option<String>,
    #[serde(default)]
    pub summary_of_restaurant: Option<String>,
    #[serde(default)]
    pub summary_of_reviews: Option<String>,
    /// Free text to embed. Defaults to the descriptive fields above.
    #[serde(default)]
    pub page_content: Option<String>,
}

impl From<CatalogEntryDto> for models::CatalogEntry {
    fn from(dto: CatalogEntryDto) -> Self {
        Self {
            record: models::RestaurantRecord {
                place_id: dto.place_id,
                name: dto.name,
                address: dto.address,
                rating: dto.rating,
                price_level: dto.price_level,
                google_maps_url: dto.google_maps_url,
                restaurant_website: dto.restaurant_website,
                opening_hours: dto.opening_hours,
                summary_of_restaurant: dto.summary_of_restaurant,
                summary_of_reviews: dto.summary_of_reviews,
            },
            page_content: dto.page_content.unwrap_or_default(),
        }
    }
}

/// Request body for `POST /api/v1/restaurants:import`.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct ImportRestaurantsRequest {
    pub restaurants: Vec<CatalogEntryDto>,
}

/// Response for `POST /api/v1/restaurants:import`.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct ImportRestaurantsResponse {
    /// Entries embedded and written by this request.
    pub imported: usize,
    /// Restaurants in the catalog after the import.
    pub total: u64,
}
