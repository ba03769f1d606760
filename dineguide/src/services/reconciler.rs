use std::collections::HashMap;

use crate::config::UnmatchedPolicy;
use crate::models::{
    ModelResponse, RecommendedRestaurant, Restaurant, RestaurantRecord, RetrievalHit,
    StructuredResponse,
};

/// Merges model recommendations with the turn's retrieval metadata.
///
/// Each recommendation is matched on `place_id`. Retrieval fields win on
/// overlap, except the two summaries when `prefer_model_summaries` is set.
/// Unmatched recommendations follow [`UnmatchedPolicy`].
#[derive(Debug, Clone, Copy)]
pub struct Reconciler {
    unmatched: UnmatchedPolicy,
    prefer_model_summaries: bool,
}

impl Reconciler {
    pub fn new(unmatched: UnmatchedPolicy, prefer_model_summaries: bool) -> Self {
        Self {
            unmatched,
            prefer_model_summaries,
        }
    }

    pub fn reconcile(&self, response: ModelResponse, hits: &[RetrievalHit]) -> StructuredResponse {
        let by_place_id: HashMap<&str, &RestaurantRecord> = hits
            .iter()
            .map(|hit| (hit.metadata.place_id.as_str(), &hit.metadata))
            .collect();

        let mut matched = 0usize;
        let restaurants: Vec<Restaurant> = response
            .restaurants
            .into_iter()
            .filter_map(|rec| {
                let record = rec
                    .place_id
                    .as_deref()
                    .and_then(|id| by_place_id.get(id).copied());

                match record {
                    Some(record) => {
                        matched += 1;
                        Some(self.merge(rec, record))
                    }
                    None => match self.unmatched {
                        UnmatchedPolicy::PassThrough => Some(Restaurant::from(rec)),
                        UnmatchedPolicy::Drop => {
                            tracing::debug!(place_id = ?rec.place_id, "Dropping unmatched recommendation");
                            None
                        }
                    },
                }
            })
            .collect();

        tracing::debug!(
            matched,
            returned = restaurants.len(),
            "Reconciled recommendations"
        );

        StructuredResponse {
            general_response: response.general_response,
            restaurants,
        }
    }

    fn merge(&self, rec: RecommendedRestaurant, record: &RestaurantRecord) -> Restaurant {
        let (summary_of_restaurant, summary_of_reviews) = if self.prefer_model_summaries {
            (
                rec.summary_of_restaurant
                    .or_else(|| record.summary_of_restaurant.clone()),
                rec.summary_of_reviews
                    .or_else(|| record.summary_of_reviews.clone()),
            )
        } else {
            (
                record
                    .summary_of_restaurant
                    .clone()
                    .or(rec.summary_of_restaurant),
                record.summary_of_reviews.clone().or(rec.summary_of_reviews),
            )
        };

        Restaurant {
            place_id: Some(record.place_id.clone()),
            name: record.name.clone().or(rec.name),
            address: record.address.clone(),
            rating: record.rating,
            price_level: record.price_level,
            google_maps_url: record.google_maps_url.clone(),
            restaurant_website: record.restaurant_website.clone(),
            opening_hours: record.opening_hours.clone(),
            summary_of_restaurant,
            summary_of_reviews,
        }
    }
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(UnmatchedPolicy::PassThrough, true)
    }
}
