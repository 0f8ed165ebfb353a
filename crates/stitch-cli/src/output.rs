// crates/stitch-cli/src/output.rs
//
// Output formatting utilities for the Stitch CLI.

use serde::Serialize;

use stitch_core::error::GatewayError;
use stitch_core::translate::translate;

/// Format a serializable value as a pretty-printed JSON string.
pub fn format_json<T: Serialize>(data: &T) -> String {
    serde_json::to_string_pretty(data).unwrap_or_else(|e| format!("JSON serialization error: {}", e))
}

/// Render an error exactly as the gateway would send it to a client.
pub fn format_error(err: &GatewayError) -> String {
    format_json(&translate(err).body)
}
