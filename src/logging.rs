//! Structured logging setup.
//!
//! JSON output for production, pretty output for development. The server
//! speaks MCP over stdout, so logs default to stderr.

use anyhow::Result;
use std::env;
use std::io;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub format: LogFormat,
    pub output: LogOutput,
    pub service_name: String,
    pub service_version: String,
    pub environment: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    Stdout,
    Stderr,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("ENV"))
            .unwrap_or_else(|_| "development".to_string());
        let is_production = environment == "production" || environment == "prod";

        Self {
            format: if is_production {
                LogFormat::Json
            } else {
                LogFormat::Pretty
            },
            output: LogOutput::Stderr,
            service_name: "named-range-mcp".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            environment,
        }
    }
}

impl LoggingConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(format) = env::var("NAMED_RANGE_MCP_LOG_FORMAT") {
            config.format = match format.to_lowercase().as_str() {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            };
        }
        if let Ok(output) = env::var("NAMED_RANGE_MCP_LOG_OUTPUT") {
            config.output = match output.to_lowercase().as_str() {
                "stdout" => LogOutput::Stdout,
                _ => LogOutput::Stderr,
            };
        }

        config
    }
}

pub fn init_logging(config: LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match (config.format, config.output) {
        (LogFormat::Json, LogOutput::Stdout) => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().flatten_event(true).with_writer(io::stdout))
                .try_init()
                .map_err(|err| anyhow::anyhow!("failed to init logging: {err}"))?;
        }
        (LogFormat::Json, LogOutput::Stderr) => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().flatten_event(true).with_writer(io::stderr))
                .try_init()
                .map_err(|err| anyhow::anyhow!("failed to init logging: {err}"))?;
        }
        (LogFormat::Pretty, LogOutput::Stdout) => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(io::stdout))
                .try_init()
                .map_err(|err| anyhow::anyhow!("failed to init logging: {err}"))?;
        }
        (LogFormat::Pretty, LogOutput::Stderr) => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(io::stderr))
                .try_init()
                .map_err(|err| anyhow::anyhow!("failed to init logging: {err}"))?;
        }
    }

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = %config.environment,
        "logging initialized"
    );
    Ok(())
}
