// crates/stitch-core/src/operation.rs
//
// Client operations and the RPC envelopes exchanged with backend services.

use std::collections::BTreeMap;

use async_graphql::parser::{parse_query, types::ExecutableDocument};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{BackendError, GatewayError};

// ---------------------------------------------------------------------------
// Client side
// ---------------------------------------------------------------------------

/// The GraphQL request shape clients send: `{query, operationName?, variables?}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQLRequest {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<Value>,
}

/// Transport-level data captured from the client request and forwarded
/// downstream verbatim.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperationContext {
    /// Original request headers, lower-cased names.
    pub headers: BTreeMap<String, String>,
    /// The query text exactly as the client submitted it.
    pub raw_query: String,
}

/// A parsed client operation. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct Operation {
    pub document: ExecutableDocument,
    pub operation_name: Option<String>,
    pub variables: Option<Value>,
    pub context: OperationContext,
}

impl Operation {
    /// Parse a client request into an operation.
    ///
    /// Syntax errors fail with [`GatewayError::Parser`] carrying the parser's
    /// positions as GraphQL `locations`. A named operation that the document
    /// does not define is rejected the same way.
    pub fn parse(
        request: GraphQLRequest,
        headers: BTreeMap<String, String>,
    ) -> Result<Self, GatewayError> {
        let document = parse_query(&request.query).map_err(|e| {
            let locations: Vec<Value> = e
                .positions()
                .map(|pos| json!({"line": pos.line, "column": pos.column}))
                .collect();
            GatewayError::Parser {
                message: e.to_string(),
                extensions: None,
                locations: if locations.is_empty() {
                    None
                } else {
                    Some(Value::Array(locations))
                },
            }
        })?;

        if let Some(name) = request.operation_name.as_deref() {
            let defined = document
                .operations
                .iter()
                .any(|(op_name, _)| op_name.map(|n| n.as_str()) == Some(name));
            if !defined {
                return Err(GatewayError::Parser {
                    message: format!("Unknown operation named \"{}\"", name),
                    extensions: None,
                    locations: None,
                });
            }
        }

        Ok(Self {
            document,
            operation_name: request.operation_name,
            variables: request.variables,
            context: OperationContext {
                headers,
                raw_query: request.query,
            },
        })
    }

    /// Build the envelope sent to a backend's `execute` method.
    pub fn to_rpc_request(&self) -> Result<RpcRequestEnvelope, GatewayError> {
        Ok(RpcRequestEnvelope {
            headers: serde_json::to_string(&self.context.headers)?,
            query: self.context.raw_query.clone(),
        })
    }
}

/// A successful relay result: `{data: <parsed backend data>}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub data: Value,
}

// ---------------------------------------------------------------------------
// Backend side
// ---------------------------------------------------------------------------

/// Request sent to a backend: JSON-serialized headers plus the raw query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequestEnvelope {
    pub headers: String,
    pub query: String,
}

/// Reply from a backend. Exactly one of `data` / `error` is expected, but
/// neither being present is tolerated and handled by the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RpcResponseEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RpcResponseEnvelope {
    /// Reply carrying serialized data.
    pub fn data(value: &Value) -> Self {
        Self {
            data: Some(value.to_string()),
            error: None,
        }
    }

    /// Reply carrying a structured error.
    pub fn error(error: &BackendError) -> Self {
        Self {
            data: None,
            error: Some(serde_json::to_string(error).unwrap_or_else(|_| {
                json!({"message": error.message}).to_string()
            })),
        }
    }

    /// Reply carrying a plain error message.
    pub fn error_message(message: impl Into<String>) -> Self {
        Self::error(&BackendError {
            message: message.into(),
            extensions: None,
            locations: None,
        })
    }
}
