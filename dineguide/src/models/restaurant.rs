use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Price tier of a restaurant.
///
/// Serialized as a snake_case label. On input, dollar-sign tiers (`$`..`$$$$`),
/// Google Places labels (`PRICE_LEVEL_MODERATE`) and numeric tiers `0..=4`
/// are accepted as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "PriceLevelRepr")]
pub enum PriceLevel {
    Free,
    Inexpensive,
    Moderate,
    Expensive,
    VeryExpensive,
}

impl PriceLevel {
    pub fn from_tier(tier: u8) -> Option<Self> {
        match tier {
            0 => Some(Self::Free),
            1 => Some(Self::Inexpensive),
            2 => Some(Self::Moderate),
            3 => Some(Self::Expensive),
            4 => Some(Self::VeryExpensive),
            _ => None,
        }
    }
}

impl std::fmt::Display for PriceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Free => write!(f, "free"),
            Self::Inexpensive => write!(f, "inexpensive"),
            Self::Moderate => write!(f, "moderate"),
            Self::Expensive => write!(f, "expensive"),
            Self::VeryExpensive => write!(f, "very_expensive"),
        }
    }
}

impl std::str::FromStr for PriceLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        let label = normalized
            .strip_prefix("price_level_")
            .unwrap_or(normalized.as_str());

        match label {
            "free" => Ok(Self::Free),
            "$" | "inexpensive" | "cheap" => Ok(Self::Inexpensive),
            "$$" | "moderate" => Ok(Self::Moderate),
            "$$$" | "expensive" => Ok(Self::Expensive),
            "$$$$" | "very_expensive" | "very expensive" => Ok(Self::VeryExpensive),
            _ => Err(format!("Unknown price level: {s}")),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PriceLevelRepr {
    Tier(u8),
    Label(String),
}

impl TryFrom<PriceLevelRepr> for PriceLevel {
    type Error = String;

    fn try_from(repr: PriceLevelRepr) -> Result<Self, Self::Error> {
        match repr {
            PriceLevelRepr::Tier(tier) => {
                Self::from_tier(tier).ok_or_else(|| format!("Unknown price tier: {tier}"))
            }
            PriceLevelRepr::Label(label) => label.parse(),
        }
    }
}

/// Authoritative restaurant metadata as stored in the catalog and returned by retrieval.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default, Validate)]
pub struct RestaurantRecord {
    #[validate(custom(function = "non_blank"))]
    pub place_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.0, max = 5.0))]
    pub rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_level: Option<PriceLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google_maps_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restaurant_website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opening_hours: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_of_restaurant: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_of_reviews: Option<String>,
}

fn non_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

/// A catalog restaurant together with the free text that gets embedded for it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct CatalogEntry {
    #[serde(flatten)]
    #[validate(nested)]
    pub record: RestaurantRecord,
    #[serde(default)]
    pub page_content: String,
}

impl CatalogEntry {
    /// Text used for the passage embedding. Falls back to the record's own
    /// descriptive fields when no page content was supplied.
    pub fn embedding_text(&self) -> String {
        if !self.page_content.trim().is_empty() {
            return self.page_content.clone();
        }

        [
            self.record.name.as_deref(),
            self.record.address.as_deref(),
            self.record.summary_of_restaurant.as_deref(),
            self.record.summary_of_reviews.as_deref(),
        ]
        .into_iter()
        .flatten()
        .filter(|part| !part.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
    }
}

/// One similarity-search hit for the current turn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievalHit {
    pub page_content: String,
    pub metadata: RestaurantRecord,
    pub score: f32,
}

/// Restaurant entry as emitted by the language model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct RecommendedRestaurant {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_of_restaurant: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_of_reviews: Option<String>,
}

/// Final per-restaurant record: model commentary merged with retrieval metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Restaurant {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_level: Option<PriceLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google_maps_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restaurant_website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opening_hours: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_of_restaurant: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_of_reviews: Option<String>,
}

impl From<RecommendedRestaurant> for Restaurant {
    fn from(rec: RecommendedRestaurant) -> Self {
        Self {
            place_id: rec.place_id,
            name: rec.name,
            summary_of_restaurant: rec.summary_of_restaurant,
            summary_of_reviews: rec.summary_of_reviews,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_level_accepts_common_labels() {
        let parse = |raw: &str| serde_json::from_str::<PriceLevel>(raw).unwrap();

        assert_eq!(parse(r#""$$""#), PriceLevel::Moderate);
        assert_eq!(parse(r#""PRICE_LEVEL_VERY_EXPENSIVE""#), PriceLevel::VeryExpensive);
        assert_eq!(parse(r#""inexpensive""#), PriceLevel::Inexpensive);
        assert_eq!(parse("0"), PriceLevel::Free);
        assert!(serde_json::from_str::<PriceLevel>("9").is_err());
        assert!(serde_json::from_str::<PriceLevel>(r#""pricey""#).is_err());
    }

    #[test]
    fn price_level_serializes_snake_case() {
        let json = serde_json::to_value(PriceLevel::VeryExpensive).unwrap();
        assert_eq!(json, "very_expensive");
    }

    #[test]
    fn catalog_entry_flattens_record() {
        let entry: CatalogEntry = serde_json::from_str(
            r#"{
                "place_id": "p1",
                "name": "Leo's Tacos",
                "rating": 4.6,
                "price_level": "$",
                "page_content": "Al pastor tacos off the trompo"
            }"#,
        )
        .unwrap();

        assert_eq!(entry.record.place_id, "p1");
        assert_eq!(entry.record.price_level, Some(PriceLevel::Inexpensive));
        assert_eq!(entry.embedding_text(), "Al pastor tacos off the trompo");
    }

    #[test]
    fn embedding_text_falls_back_to_record_fields() {
        let entry = CatalogEntry {
            record: RestaurantRecord {
                place_id: "p2".into(),
                name: Some("Bestia".into()),
                summary_of_restaurant: Some("Italian in the Arts District".into()),
                ..Default::default()
            },
            page_content: String::new(),
        };

        assert_eq!(entry.embedding_text(), "Bestia\nItalian in the Arts District");
    }
}
