// crates/stitch-cli/src/commands/query.rs
//
// `stitch query --query <text>`: relay one operation to a backend and print the
// result, or the error body a gateway client would receive.

use std::collections::BTreeMap;

use clap::Args;

use stitch_core::error::{codes, GatewayError};
use stitch_core::operation::{GraphQLRequest, Operation};
use stitch_rpc::relay;

use crate::output::{format_error, format_json};

/// Send one GraphQL operation.
#[derive(Debug, Args)]
pub struct QueryCmd {
    /// The GraphQL query text.
    #[arg(long)]
    pub query: String,

    /// Operation to run when the document defines several.
    #[arg(long)]
    pub operation_name: Option<String>,

    /// Variables as a JSON object.
    #[arg(long)]
    pub variables: Option<String>,

    /// Header forwarded to the backend, as `name=value`. Repeatable.
    #[arg(long = "header", value_name = "NAME=VALUE")]
    pub headers: Vec<String>,
}

/// Parse `name=value` pairs; names are lower-cased like HTTP header names.
fn parse_headers(raw: &[String]) -> Result<BTreeMap<String, String>, GatewayError> {
    raw.iter()
        .map(|pair| {
            let (name, value) = pair.split_once('=').ok_or_else(|| {
                GatewayError::app(
                    codes::BAD_REQUEST,
                    format!("Header \"{}\" is not in name=value form", pair),
                )
            })?;
            Ok((name.trim().to_ascii_lowercase(), value.trim().to_string()))
        })
        .collect()
}

async fn execute(
    endpoint: &str,
    timeout_ms: u64,
    cmd: &QueryCmd,
) -> Result<serde_json::Value, GatewayError> {
    let variables = match &cmd.variables {
        Some(raw) => Some(serde_json::from_str(raw).map_err(|e| {
            GatewayError::app(codes::BAD_REQUEST, format!("--variables is not JSON: {}", e))
        })?),
        None => None,
    };
    let request = GraphQLRequest {
        query: cmd.query.clone(),
        operation_name: cmd.operation_name.clone(),
        variables,
    };

    let operation = Operation::parse(request, parse_headers(&cmd.headers)?)?;
    let client = super::connect(endpoint, timeout_ms)?;
    let result = relay(client).dispatch(&operation).await?;
    Ok(serde_json::to_value(result)?)
}

/// Run the query command.
pub async fn run(
    endpoint: &str,
    timeout_ms: u64,
    cmd: &QueryCmd,
) -> Result<(), Box<dyn std::error::Error>> {
    match execute(endpoint, timeout_ms, cmd).await {
        Ok(result) => {
            println!("{}", format_json(&result));
            Ok(())
        }
        Err(e) => {
            println!("{}", format_error(&e));
            Err(e.into())
        }
    }
}
