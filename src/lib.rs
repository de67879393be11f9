pub mod config;
pub mod error;
pub mod form;
pub mod logging;
pub mod model;
pub mod names;
pub mod report;
pub mod server;
pub mod state;
pub mod store;
pub mod tools;
pub mod utils;
pub mod workbook;

pub use config::{CliArgs, ServerConfig};
pub use error::{ErrorCode, McpError, to_mcp_error, to_rmcp_error};
pub use logging::{LoggingConfig, init_logging};
pub use server::NamedRangeServer;

use std::sync::Arc;
use tracing::{info, warn};

/// Bring the server up on stdio with the given configuration.
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    config.ensure_workspace_root()?;

    let config = Arc::new(config);
    let state = Arc::new(state::AppState::new(config.clone()));

    // Prime the index so short ids resolve from the first call.
    match state.list_workbooks(tools::filters::WorkbookFilter::default()) {
        Ok(listing) => {
            let sample: Vec<&str> = listing
                .workbooks
                .iter()
                .take(3)
                .map(|w| w.path.as_str())
                .collect();
            info!(
                workbook_count = listing.workbooks.len(),
                sample = ?sample,
                workspace_root = ?config.workspace_root,
                "startup scan complete"
            );
        }
        Err(err) => {
            warn!(error = %err, "startup scan failed, continuing without index");
        }
    }

    NamedRangeServer::from_state(state).run_stdio().await
}
