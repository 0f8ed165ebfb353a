// crates/stitch-gateway/src/routes.rs
//
// HTTP surface of the gateway.
//
//   GET  /health             -> "OK"
//   POST /graphql/{service}  -> relay (optionally decrypting / encrypting)
//   GET  /schema/{service}   -> backend schema text
//
// Every failure is rendered by the error translator: status 200 with an
// `{"errors": [...]}` body.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::{Path, State};
use axum::http::{HeaderMap, Request};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::Value;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use stitch_core::crypto::EncryptedPayload;
use stitch_core::error::{codes, GatewayError};
use stitch_core::operation::{GraphQLRequest, Operation};
use stitch_core::translate::translate;

use crate::state::GatewayState;

/// Build the gateway router over shared state.
pub fn router(state: Arc<GatewayState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/graphql/{service}", post(graphql))
        .route("/schema/{service}", get(schema))
        .layer(
            TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    request_id = %Uuid::now_v7(),
                    method = %req.method(),
                    uri = %req.uri(),
                )
            }),
        )
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

async fn graphql(
    State(state): State<Arc<GatewayState>>,
    Path(service): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    match handle_graphql(&state, &service, &headers, &body).await {
        Ok(value) => Json(value).into_response(),
        Err(e) => error_response(&e),
    }
}

async fn schema(
    State(state): State<Arc<GatewayState>>,
    Path(service): Path<String>,
) -> Response {
    let fetched = match state.schema_fetcher(&service) {
        Ok(fetcher) => fetcher.fetch().await,
        Err(e) => Err(e),
    };
    match fetched {
        Ok(text) => text.into_response(),
        Err(e) => error_response(&e),
    }
}

fn error_response(err: &GatewayError) -> Response {
    let translated = translate(err);
    (translated.status, Json(translated.body)).into_response()
}

fn bad_request(message: String) -> GatewayError {
    GatewayError::app(codes::BAD_REQUEST, message)
}

/// Decode (and decrypt if needed) the body, relay it, and seal the result
/// when the caller identified itself with an API key.
async fn handle_graphql(
    state: &GatewayState,
    service: &str,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<Value, GatewayError> {
    let relay = state.relay(service)?;

    let body: Value = serde_json::from_slice(body)
        .map_err(|e| bad_request(format!("Request body must be JSON: {}", e)))?;

    let request: GraphQLRequest = if EncryptedPayload::is_encrypted_body(&body) {
        let encryption = state.encryption().ok_or_else(|| {
            GatewayError::Authentication(
                "Encrypted payloads are not accepted by this gateway".to_string(),
            )
        })?;
        let payload: EncryptedPayload = serde_json::from_value(body).map_err(|e| {
            GatewayError::Authentication(format!("Malformed encrypted payload: {}", e))
        })?;
        let plaintext = encryption
            .cipher
            .decrypt_request(&payload, &encryption.private_key_pem)?;
        serde_json::from_str(&plaintext)
            .map_err(|e| bad_request(format!("Decrypted payload is not a GraphQL request: {}", e)))?
    } else {
        serde_json::from_value(body)
            .map_err(|e| bad_request(format!("Invalid GraphQL request: {}", e)))?
    };

    let operation = Operation::parse(request, forwarded_headers(headers))?;
    let result = serde_json::to_value(relay.dispatch(&operation).await?)?;

    if let Some(encryption) = state.encryption() {
        let api_key = headers
            .get(encryption.api_key_header.as_str())
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty());
        if let Some(api_key) = api_key {
            let sealed = encryption
                .cipher
                .encrypt_response(encryption.store.as_ref(), &result, api_key)
                .await?;
            return Ok(serde_json::to_value(sealed)?);
        }
    }

    Ok(result)
}

/// Flatten request headers for forwarding; repeated names are joined with
/// ", " and non-UTF-8 values are skipped.
fn forwarded_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut forwarded: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let Ok(value) = value.to_str() else {
            continue;
        };
        forwarded
            .entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }
    forwarded
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_forwarded_headers_joins_repeats() {
        let mut headers = HeaderMap::new();
        headers.append("x-tag", HeaderValue::from_static("a"));
        headers.append("x-tag", HeaderValue::from_static("b"));
        headers.insert("authorization", HeaderValue::from_static("Bearer t"));

        let forwarded = forwarded_headers(&headers);
        assert_eq!(forwarded["x-tag"], "a, b");
        assert_eq!(forwarded["authorization"], "Bearer t");
    }

    #[test]
    fn test_forwarded_headers_skips_opaque_values() {
        let mut headers = HeaderMap::new();
        headers.insert("x-bin", HeaderValue::from_bytes(&[0xfa, 0xfb]).unwrap());
        assert!(forwarded_headers(&headers).is_empty());
    }
}
