use clap::Parser;
use named_range_mcp::{CliArgs, LoggingConfig, ServerConfig, init_logging, run_server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging(LoggingConfig::from_env())?;

    let args = CliArgs::parse();
    let config = ServerConfig::from_args(args)?;

    run_server(config).await
}
