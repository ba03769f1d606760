//! Prompt templates for the dining assistant.
//!
//! Templates use plain `format!()` interpolation so that every variable is
//! checked at compile time.

use crate::config::PolicyStrictness;
use crate::error::{DineError, Result};
use crate::models::{ModelResponse, RetrievalHit};

/// System prompt for one conversation turn.
///
/// The policy paragraph depends on `strictness`; the output-format section
/// is shared so that both policies parse the same way.
///
/// # Example
/// ```
/// use dineguide::config::PolicyStrictness;
/// use dineguide::llm::prompts::system_prompt;
///
/// let prompt = system_prompt("Chicago", PolicyStrictness::PreferHistory);
/// assert!(prompt.contains("Chicago"));
/// ```
pub fn system_prompt(metro_area: &str, strictness: PolicyStrictness) -> String {
    let policy = match strictness {
        PolicyStrictness::PreferHistory => format!(
            "Use the restaurant information from the conversation history as your primary source. \
If the history does not provide relevant information, engage in normal conversation and answer \
questions about food and dining in {metro_area} from your own expertise."
        ),
        PolicyStrictness::HistoryOnly => {
            "Answer only from the restaurant information in the conversation history. \
If the history does not cover the question, say politely that you do not have that information \
and recommend no restaurants."
                .to_string()
        }
    };

    format!(
        r#"You are a friendly and knowledgeable guide specializing in restaurants in {metro_area}. Your main role is to assist users by answering questions about restaurants and food in the area.

{policy}

Always aim to make the conversation pleasant and informative. Avoid discussing topics unrelated to food and restaurants, but keep a friendly and engaging demeanor.

{format}"#,
        format = output_format_instructions()
    )
}

/// Instructions describing the JSON object the model must return.
pub fn output_format_instructions() -> &'static str {
    r#"Respond with a single valid JSON object and nothing else, in this shape:
{
  "general_response": "A general response to the user",
  "restaurants": [
    {
      "place_id": "The Place ID of the restaurant, copied exactly from the context",
      "name": "The name of the restaurant",
      "summary_of_restaurant": "A summary of the restaurant",
      "summary_of_reviews": "A summary of the reviews"
    }
  ]
}
Use an empty "restaurants" array when you are not recommending specific restaurants."#
}

/// Context lines for the retrieved restaurants, one line per hit.
pub fn restaurant_context(hits: &[RetrievalHit]) -> String {
    hits.iter()
        .map(|hit| {
            let record = &hit.metadata;
            format!(
                "Restaurant Name: {}, Place ID: {}, Summary: {}",
                record.name.as_deref().unwrap_or("Unknown"),
                record.place_id,
                record
                    .summary_of_restaurant
                    .as_deref()
                    .unwrap_or(hit.page_content.as_str())
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Final user message: retrieval context followed by the user's text.
pub fn user_turn_prompt(user_text: &str, hits: &[RetrievalHit]) -> String {
    if hits.is_empty() {
        return user_text.to_string();
    }

    format!(
        "Relevant restaurants:\n{context}\n\nUser message:\n{user_text}",
        context = restaurant_context(hits)
    )
}

/// Parse the model output, tolerating a surrounding Markdown code fence.
pub fn parse_model_response(raw: &str) -> Result<ModelResponse> {
    let body = strip_code_fence(raw);

    serde_json::from_str(body).map_err(|e| {
        DineError::Generation(format!("Model output did not match the response schema: {e}"))
    })
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Drop an optional language tag on the opening fence.
    let rest = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };

    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RestaurantRecord;

    fn hit(place_id: &str, name: &str, summary: Option<&str>) -> RetrievalHit {
        RetrievalHit {
            page_content: format!("{name} page"),
            metadata: RestaurantRecord {
                place_id: place_id.to_string(),
                name: Some(name.to_string()),
                summary_of_restaurant: summary.map(str::to_string),
                ..Default::default()
            },
            score: 0.9,
        }
    }

    #[test]
    fn test_system_prompt_varies_by_policy() {
        let prefer = system_prompt("Los Angeles", PolicyStrictness::PreferHistory);
        let strict = system_prompt("Los Angeles", PolicyStrictness::HistoryOnly);

        assert!(prefer.contains("from your own expertise"));
        assert!(!strict.contains("from your own expertise"));
        assert!(strict.contains("do not have that information"));
        assert!(prefer.contains("\"general_response\""));
        assert!(strict.contains("\"general_response\""));
    }

    #[test]
    fn test_restaurant_context_lines() {
        let context = restaurant_context(&[
            hit("p1", "Taco Spot", Some("Street tacos")),
            hit("p2", "Noodle Bar", None),
        ]);

        assert_eq!(
            context,
            "Restaurant Name: Taco Spot, Place ID: p1, Summary: Street tacos\n\
             Restaurant Name: Noodle Bar, Place ID: p2, Summary: Noodle Bar page"
        );
    }

    #[test]
    fn test_user_turn_without_hits_is_raw_text() {
        assert_eq!(user_turn_prompt("hello", &[]), "hello");
        assert!(user_turn_prompt("tacos?", &[hit("p1", "Taco Spot", None)])
            .ends_with("User message:\ntacos?"));
    }

    #[test]
    fn test_parse_plain_and_fenced_json() {
        let plain = r#"{"general_response":"Try X","restaurants":[{"place_id":"p1"}]}"#;
        let fenced = format!("```json\n{plain}\n```");

        let a = parse_model_response(plain).unwrap();
        let b = parse_model_response(&fenced).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.restaurants[0].place_id.as_deref(), Some("p1"));
    }

    #[test]
    fn test_parse_missing_restaurants_defaults_to_empty() {
        let parsed = parse_model_response(r#"{"general_response":"Hi!"}"#).unwrap();
        assert!(parsed.restaurants.is_empty());
    }

    #[test]
    fn test_parse_rejects_non_conforming_output() {
        assert!(matches!(
            parse_model_response("Sure! Here are some tacos."),
            Err(DineError::Generation(_))
        ));
        assert!(matches!(
            parse_model_response(r#"{"restaurants":[]}"#),
            Err(DineError::Generation(_))
        ));
    }
}
