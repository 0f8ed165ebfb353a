// crates/stitch-core/src/translate.rs
//
// Error Translator: turns any GatewayError into the client-facing
// `{"errors": [...]}` body. Transport status is always 200 so GraphQL
// clients read errors from the body.

use http::StatusCode;
use serde_json::{json, Value};

use crate::error::GatewayError;

/// A translated error, ready to be written to the client.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// Translate a gateway error into the uniform error body.
///
/// Pure apart from logging: the same error always yields the same body.
pub fn translate(err: &GatewayError) -> ErrorResponse {
    let envelope = err.envelope();

    if err.is_infrastructure() {
        tracing::error!(code = %envelope.code, error = %err, "Request failed");
    } else {
        tracing::debug!(code = %envelope.code, error = %err, "Request rejected");
    }

    let body = match serde_json::to_value(&envelope) {
        Ok(value) => json!({ "errors": [value] }),
        Err(_) => json!({ "errors": [{ "code": envelope.code, "message": envelope.message }] }),
    };

    ErrorResponse {
        status: StatusCode::OK,
        body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::codes;

    #[test]
    fn test_parser_error_shape() {
        let err = GatewayError::Parser {
            message: "Syntax Error: Expected Name".to_string(),
            extensions: Some(json!({"code": "GRAPHQL_PARSE_FAILED"})),
            locations: None,
        };

        let response = translate(&err);
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(
            response.body,
            json!({
                "errors": [{
                    "code": "PARSER_ERROR",
                    "message": "Syntax Error: Expected Name",
                    "extensions": {"code": "GRAPHQL_PARSE_FAILED"},
                }]
            })
        );
    }

    #[test]
    fn test_translate_is_idempotent() {
        let err = GatewayError::Unavailable {
            endpoint: "http://users:50051".to_string(),
            message: "deadline elapsed".to_string(),
        };
        assert_eq!(translate(&err), translate(&err));
    }

    #[test]
    fn test_every_variant_has_code_and_message() {
        let errors = vec![
            GatewayError::Authentication("no key".to_string()),
            GatewayError::ResourceNotFound("Account not found".to_string()),
            GatewayError::service("users"),
            GatewayError::Upstream {
                raw: "boom".to_string(),
            },
            GatewayError::Store("connection refused".to_string()),
            GatewayError::Config("bad port".to_string()),
            GatewayError::app(codes::BAD_REQUEST, "Body must be JSON"),
        ];

        for err in &errors {
            let response = translate(err);
            assert_eq!(response.status, StatusCode::OK);
            let entry = &response.body["errors"][0];
            assert_eq!(entry["code"], err.error_code());
            assert_eq!(entry["message"], err.to_string());
        }
    }

    #[test]
    fn test_upstream_raw_is_passed_through() {
        let err = GatewayError::Upstream {
            raw: r#"{"message":"schema unavailable"}"#.to_string(),
        };
        let response = translate(&err);
        assert_eq!(
            response.body["errors"][0]["message"],
            r#"{"message":"schema unavailable"}"#
        );
        assert_eq!(response.body["errors"][0]["code"], codes::UPSTREAM);
    }

    #[test]
    fn test_app_error_with_extensions_is_rendered_exactly() {
        let mut extra = serde_json::Map::new();
        extra.insert("extensions".to_string(), json!({"field": "email"}));
        let err = GatewayError::App {
            code: "VALIDATION_ERROR".to_string(),
            message: "email is taken".to_string(),
            extra,
        };

        let response = translate(&err);
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(
            response.body,
            json!({
                "errors": [{
                    "code": "VALIDATION_ERROR",
                    "message": "email is taken",
                    "extensions": {"field": "email"},
                }]
            })
        );
    }
}
