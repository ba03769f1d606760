use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::FromRequest;
use axum::extract::FromRequestParts;

use crate::error::DineError;

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(DineError))]
pub struct AppJson<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(DineError))]
pub struct AppQuery<T>(pub T);

impl From<JsonRejection> for DineError {
    fn from(rejection: JsonRejection) -> Self {
        map_json_rejection(rejection)
    }
}

impl From<QueryRejection> for DineError {
    fn from(rejection: QueryRejection) -> Self {
        let message = rejection.body_text();
        match extract_missing_field(&message) {
            Some(field) => DineError::Validation(format!("Missing required field: {field}")),
            None => DineError::Validation(format!("Invalid query string: {message}")),
        }
    }
}

fn map_json_rejection(rejection: JsonRejection) -> DineError {
    match rejection {
        JsonRejection::JsonDataError(err) => {
            let message = err.body_text();
            if let Some(field) = extract_missing_field(&message) {
                DineError::Validation(format!("Missing required field: {field}"))
            } else {
                DineError::Validation(format!("Invalid JSON: {message}"))
            }
        }
        JsonRejection::JsonSyntaxError(err) => {
            DineError::Validation(format!("JSON syntax error: {err}"))
        }
        JsonRejection::MissingJsonContentType(_) => {
            DineError::Validation("Missing `Content-Type: application/json` header".to_string())
        }
        JsonRejection::BytesRejection(_) => {
            DineError::Validation("Failed to read request body".to_string())
        }
        _ => DineError::Validation(rejection.body_text()),
    }
}

fn extract_missing_field(message: &str) -> Option<&str> {
    let prefix = "missing field `";
    let start = message.find(prefix)? + prefix.len();
    let remaining = message.get(start..)?;
    let end = remaining.find('`')?;
    remaining.get(..end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_missing_field() {
        assert_eq!(
            extract_missing_field("Failed to deserialize: missing field `user_id` at line 1"),
            Some("user_id")
        );
        assert_eq!(extract_missing_field("expected a string"), None);
    }
}
