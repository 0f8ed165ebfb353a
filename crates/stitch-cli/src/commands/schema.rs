// crates/stitch-cli/src/commands/schema.rs
//
// `stitch schema`: print a backend's schema document.

use stitch_rpc::get_schema;

use crate::output::format_error;

/// Run the schema command.
pub async fn run(endpoint: &str, timeout_ms: u64) -> Result<(), Box<dyn std::error::Error>> {
    let client = super::connect(endpoint, timeout_ms)?;

    match get_schema(client).await {
        Ok(schema) => {
            println!("{}", schema);
            Ok(())
        }
        Err(e) => {
            println!("{}", format_error(&e));
            Err(e.into())
        }
    }
}
