// crates/stitch-core/src/error.rs
//
// Gateway-wide error taxonomy and the uniform client-facing error envelope.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Error codes emitted in the `code` field of every error envelope.
pub mod codes {
    pub const AUTHENTICATION: &str = "AUTHENTICATION_ERROR";
    pub const RESOURCE_NOT_FOUND: &str = "RESOURCE_NOT_FOUND";
    pub const PARSER: &str = "PARSER_ERROR";
    pub const SERVICE: &str = "SERVICE_ERROR";
    pub const UPSTREAM: &str = "UPSTREAM_ERROR";
    pub const SERVICE_UNAVAILABLE: &str = "SERVICE_UNAVAILABLE";
    pub const STORE: &str = "STORE_ERROR";
    pub const CONFIG: &str = "CONFIG_ERROR";
    pub const BAD_REQUEST: &str = "BAD_REQUEST";
    pub const CRYPTO: &str = "CRYPTO_ERROR";
    pub const INTERNAL: &str = "INTERNAL_SERVER_ERROR";
}

/// Every failure the gateway can raise.
///
/// The first five variants are the client-visible taxonomy; the remaining
/// ones cover infrastructure the relay and cipher depend on. All of them
/// render into an [`ErrorEnvelope`] through [`GatewayError::envelope`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GatewayError {
    /// Missing or undecryptable encrypted payload.
    #[error("{0}")]
    Authentication(String),

    /// No account record exists for the supplied API key.
    #[error("{0}")]
    ResourceNotFound(String),

    /// A structured, GraphQL-shaped error (backend-reported or a local
    /// syntax error), carried verbatim.
    #[error("{message}")]
    Parser {
        message: String,
        extensions: Option<Value>,
        locations: Option<Value>,
    },

    /// The backend answered with neither `data` nor `error`.
    #[error("Service at {endpoint} was not found or is unreachable")]
    Service { endpoint: String },

    /// A raw backend error passed through untranslated.
    #[error("{raw}")]
    Upstream { raw: String },

    /// The RPC transport failed or the per-call deadline elapsed.
    #[error("Service at {endpoint} is unavailable: {message}")]
    Unavailable { endpoint: String, message: String },

    /// Credential store I/O failure.
    #[error("Credential store error: {0}")]
    Store(String),

    /// Invalid or inconsistent configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic carrier: a code, a message, and arbitrary extra fields.
    #[error("{message}")]
    App {
        code: String,
        message: String,
        extra: Map<String, Value>,
    },
}

impl GatewayError {
    /// Build an `App` error without extra fields.
    pub fn app(code: impl Into<String>, message: impl Into<String>) -> Self {
        GatewayError::App {
            code: code.into(),
            message: message.into(),
            extra: Map::new(),
        }
    }

    /// Build the `Service` error for an endpoint that answered with nothing.
    pub fn service(endpoint: impl Into<String>) -> Self {
        GatewayError::Service {
            endpoint: endpoint.into(),
        }
    }

    /// Stable machine-readable code for this error.
    pub fn error_code(&self) -> &str {
        match self {
            GatewayError::Authentication(_) => codes::AUTHENTICATION,
            GatewayError::ResourceNotFound(_) => codes::RESOURCE_NOT_FOUND,
            GatewayError::Parser { .. } => codes::PARSER,
            GatewayError::Service { .. } => codes::SERVICE,
            GatewayError::Upstream { .. } => codes::UPSTREAM,
            GatewayError::Unavailable { .. } => codes::SERVICE_UNAVAILABLE,
            GatewayError::Store(_) => codes::STORE,
            GatewayError::Config(_) => codes::CONFIG,
            GatewayError::App { code, .. } => code.as_str(),
        }
    }

    /// Whether this error originates in gateway infrastructure rather than
    /// in the client's request or the backend's answer.
    pub fn is_infrastructure(&self) -> bool {
        match self {
            GatewayError::Service { .. }
            | GatewayError::Unavailable { .. }
            | GatewayError::Store(_)
            | GatewayError::Config(_) => true,
            GatewayError::App { code, .. } => code == codes::INTERNAL,
            _ => false,
        }
    }

    /// Render this error into the uniform client-facing shape.
    pub fn envelope(&self) -> ErrorEnvelope {
        let mut extra = Map::new();
        match self {
            GatewayError::Parser {
                extensions,
                locations,
                ..
            } => {
                if let Some(extensions) = extensions {
                    extra.insert("extensions".to_string(), extensions.clone());
                }
                if let Some(locations) = locations {
                    extra.insert("locations".to_string(), locations.clone());
                }
            }
            GatewayError::App { extra: fields, .. } => {
                for (key, value) in fields {
                    if key != "code" && key != "message" {
                        extra.insert(key.clone(), value.clone());
                    }
                }
            }
            _ => {}
        }

        ErrorEnvelope {
            code: self.error_code().to_string(),
            message: self.to_string(),
            extra,
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(e: serde_json::Error) -> Self {
        GatewayError::app(codes::INTERNAL, format!("Serialization error: {}", e))
    }
}

/// The structured error a backend reports in the `error` field of its reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendError {
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locations: Option<Value>,
}

impl From<BackendError> for GatewayError {
    fn from(e: BackendError) -> Self {
        GatewayError::Parser {
            message: e.message,
            extensions: e.extensions,
            locations: e.locations,
        }
    }
}

/// One entry of the `errors` array sent to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub code: String,
    pub message: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
