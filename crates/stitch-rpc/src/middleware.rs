// crates/stitch-rpc/src/middleware.rs
//
// Middleware for the backend RPC server.

use tonic::{Request, Status};

/// Logging interceptor for incoming backend RPC requests.
///
/// Only transport metadata is logged; request bodies may carry client
/// headers and are never written out here.
pub fn logging_interceptor(req: Request<()>) -> Result<Request<()>, Status> {
    let user_agent = req
        .metadata()
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-");
    tracing::info!(
        user_agent = %user_agent,
        metadata_entries = req.metadata().len(),
        "Incoming backend RPC request"
    );
    Ok(req)
}
