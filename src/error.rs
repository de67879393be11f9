//! Error taxonomy for the named-range MCP server.
//!
//! Tool-level failures are classified into JSON-RPC style codes before they
//! cross the rmcp boundary. Workflow-level failures inside an open workbook
//! never surface here; they are folded into the workflow outcome with a
//! coarse code derived by [`coarse_error_code`].

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Raised when a tool call hits a name excluded by `--enabled-tools`.
#[derive(Debug, Error)]
#[error("tool '{tool_name}' is disabled by server configuration")]
pub struct ToolDisabledError {
    pub tool_name: String,
}

impl ToolDisabledError {
    pub fn new(tool_name: &str) -> Self {
        Self {
            tool_name: tool_name.to_ascii_lowercase(),
        }
    }
}

/// MCP error codes: the JSON-RPC standard set plus application codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum ErrorCode {
    ParseError = -32700,
    InvalidRequest = -32600,
    MethodNotFound = -32601,
    InvalidParams = -32602,
    InternalError = -32603,

    /// Workbook file not found or not accessible
    WorkbookNotFound = -32001,
    /// Sheet not found in workbook
    SheetNotFound = -32002,
    /// Named range not found under the requested scope
    NamedRangeNotFound = -32003,
    /// Parameter validation failed
    ValidationError = -32004,
    /// Wizard form sheet or marker is missing
    FormNotFound = -32005,
    /// File I/O error
    IoError = -32006,
    /// Tool disabled by configuration
    ToolDisabled = -32007,
}

impl ErrorCode {
    pub fn code(&self) -> i32 {
        *self as i32
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorCode::InternalError | ErrorCode::IoError)
    }

    pub fn category(&self) -> &'static str {
        match self {
            ErrorCode::ParseError | ErrorCode::InvalidRequest | ErrorCode::InvalidParams => {
                "client_error"
            }
            ErrorCode::MethodNotFound | ErrorCode::ToolDisabled => "not_found",
            ErrorCode::InternalError => "server_error",
            ErrorCode::WorkbookNotFound
            | ErrorCode::SheetNotFound
            | ErrorCode::NamedRangeNotFound
            | ErrorCode::FormNotFound => "resource_not_found",
            ErrorCode::ValidationError => "validation_error",
            ErrorCode::IoError => "io_error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self, self.code())
    }
}

/// Classified error carried between the tool layer and the rmcp bridge.
#[derive(Debug, Clone, Serialize)]
pub struct McpError {
    pub code: ErrorCode,
    pub message: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl McpError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            timestamp: chrono::Utc::now(),
        }
    }
}

impl fmt::Display for McpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for McpError {}

/// Classify an anyhow error by message pattern.
pub fn to_mcp_error(error: anyhow::Error) -> McpError {
    let message = error.to_string();
    let lowered = message.to_lowercase();

    let code = if lowered.contains("workbook") && lowered.contains("not found") {
        ErrorCode::WorkbookNotFound
    } else if lowered.contains("sheet") && lowered.contains("not found") {
        ErrorCode::SheetNotFound
    } else if lowered.starts_with("namedrangenotfound") {
        ErrorCode::NamedRangeNotFound
    } else if lowered.starts_with("formnotfound") {
        ErrorCode::FormNotFound
    } else if lowered.contains("disabled") {
        ErrorCode::ToolDisabled
    } else if lowered.contains("invalid") || lowered.contains("validation") {
        ErrorCode::ValidationError
    } else if lowered.contains("failed to read")
        || lowered.contains("failed to save")
        || lowered.contains("metadata")
    {
        ErrorCode::IoError
    } else if lowered.contains("parse") {
        ErrorCode::ParseError
    } else {
        ErrorCode::InternalError
    };

    McpError::new(code, message)
}

/// Convert a classified error to the rmcp wire error.
pub fn to_rmcp_error(error: McpError) -> rmcp::ErrorData {
    let data = serde_json::to_value(&error).ok();
    match error.code {
        ErrorCode::InvalidRequest | ErrorCode::ToolDisabled => {
            rmcp::ErrorData::invalid_request(error.message, data)
        }
        ErrorCode::InvalidParams | ErrorCode::ValidationError => {
            rmcp::ErrorData::invalid_params(error.message, data)
        }
        ErrorCode::MethodNotFound => {
            rmcp::ErrorData::new(rmcp::model::ErrorCode::METHOD_NOT_FOUND, error.message, data)
        }
        _ => rmcp::ErrorData::internal_error(error.message, data),
    }
}

/// Coarse workflow error code: the text before the first `:` of the host
/// error message, matching how the original task-pane surfaced host faults.
pub fn coarse_error_code(error: &anyhow::Error) -> String {
    let message = error.to_string();
    message
        .split(':')
        .next()
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .unwrap_or("InternalError")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn error_code_values_follow_json_rpc() {
        assert_eq!(ErrorCode::ParseError.code(), -32700);
        assert_eq!(ErrorCode::InvalidParams.code(), -32602);
        assert_eq!(ErrorCode::WorkbookNotFound.code(), -32001);
        assert_eq!(ErrorCode::FormNotFound.code(), -32005);
    }

    #[test]
    fn classification_matches_message_patterns() {
        assert_eq!(
            to_mcp_error(anyhow!("workbook id wb-abc not found")).code,
            ErrorCode::WorkbookNotFound
        );
        assert_eq!(
            to_mcp_error(anyhow!("FormNotFound: AddNamesWizard sheet is missing")).code,
            ErrorCode::FormNotFound
        );
        assert_eq!(
            to_mcp_error(anyhow!("something odd happened")).code,
            ErrorCode::InternalError
        );
    }

    #[test]
    fn coarse_code_takes_leading_token() {
        assert_eq!(
            coarse_error_code(&anyhow!("SheetNotFound: no worksheet named Data")),
            "SheetNotFound"
        );
        assert_eq!(coarse_error_code(&anyhow!("plain message")), "plain message");
        assert_eq!(coarse_error_code(&anyhow!(": odd")), "InternalError");
    }
}
