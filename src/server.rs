use crate::error::{self, ToolDisabledError};
use crate::state::AppState;
use crate::tools;
use rmcp::{
    ErrorData as McpError, Json, ServerHandler, ServiceExt,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{Implementation, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
    transport::stdio,
};
use std::sync::Arc;
use tracing::info;

const BASE_INSTRUCTIONS: &str = "Named-range manager for xlsx workbooks. Start with list_workbooks, \
then list_named_ranges to inspect a workbook's defined names. Bulk changes go through wizard \
sheets: insert_add_form / insert_edit_form stage a form inside the workbook, add_named_ranges / \
edit_named_ranges apply what was typed into it, discard_add_form / discard_edit_form throw the \
form away. export_named_ranges writes a styled ExistingNames report sheet and \
find_invalid_named_ranges lists names whose references are broken.";

#[derive(Clone)]
pub struct NamedRangeServer {
    state: Arc<AppState>,
    tool_router: ToolRouter<Self>,
}

fn to_mcp_error(error: anyhow::Error) -> McpError {
    error::to_rmcp_error(error::to_mcp_error(error))
}

impl NamedRangeServer {
    pub fn from_state(state: Arc<AppState>) -> Self {
        Self {
            state,
            tool_router: Self::tool_router(),
        }
    }

    fn ensure_tool_enabled(&self, tool_name: &str) -> Result<(), anyhow::Error> {
        if self.state.config().is_tool_enabled(tool_name) {
            Ok(())
        } else {
            Err(ToolDisabledError::new(tool_name).into())
        }
    }

    pub async fn run_stdio(self) -> anyhow::Result<()> {
        info!("starting MCP server on stdio");
        let service = self.serve(stdio()).await.inspect_err(|err| {
            tracing::error!(error = %err, "serving error");
        })?;
        service.waiting().await?;
        Ok(())
    }
}

#[tool_router]
impl NamedRangeServer {
    #[tool(
        name = "list_workbooks",
        description = "List workbooks in the workspace, with optional slug prefix, folder, and path glob filters."
    )]
    pub async fn list_workbooks(
        &self,
        Parameters(params): Parameters<tools::ListWorkbooksParams>,
    ) -> Result<Json<crate::model::WorkbookListResponse>, McpError> {
        self.ensure_tool_enabled("list_workbooks")
            .map_err(to_mcp_error)?;
        tools::list_workbooks(self.state.clone(), params)
            .await
            .map(Json)
            .map_err(to_mcp_error)
    }

    #[tool(
        name = "describe_workbook",
        description = "Describe a workbook: path, size, sheet count, and number of defined names."
    )]
    pub async fn describe_workbook(
        &self,
        Parameters(params): Parameters<tools::WorkbookParams>,
    ) -> Result<Json<crate::model::WorkbookDescription>, McpError> {
        self.ensure_tool_enabled("describe_workbook")
            .map_err(to_mcp_error)?;
        tools::describe_workbook(self.state.clone(), params)
            .await
            .map(Json)
            .map_err(to_mcp_error)
    }

    #[tool(
        name = "list_named_ranges",
        description = "List a workbook's named ranges with scope, kind, and resolved first-cell value. Optionally filter by scope ('Workbook' or a sheet name)."
    )]
    pub async fn list_named_ranges(
        &self,
        Parameters(params): Parameters<tools::ListNamedRangesParams>,
    ) -> Result<Json<crate::model::NamedRangesResponse>, McpError> {
        self.ensure_tool_enabled("list_named_ranges")
            .map_err(to_mcp_error)?;
        tools::list_named_ranges(self.state.clone(), params)
            .await
            .map(Json)
            .map_err(to_mcp_error)
    }

    #[tool(
        name = "insert_add_form",
        description = "Insert (or repair) the AddNamesWizard sheet used to stage new named ranges."
    )]
    pub async fn insert_add_form(
        &self,
        Parameters(params): Parameters<tools::WorkbookParams>,
    ) -> Result<Json<crate::model::FormResponse>, McpError> {
        self.ensure_tool_enabled("insert_add_form")
            .map_err(to_mcp_error)?;
        tools::insert_add_form(self.state.clone(), params)
            .await
            .map(Json)
            .map_err(to_mcp_error)
    }

    #[tool(
        name = "discard_add_form",
        description = "Remove the AddNamesWizard sheet and its marker without applying anything."
    )]
    pub async fn discard_add_form(
        &self,
        Parameters(params): Parameters<tools::WorkbookParams>,
    ) -> Result<Json<crate::model::DiscardFormResponse>, McpError> {
        self.ensure_tool_enabled("discard_add_form")
            .map_err(to_mcp_error)?;
        tools::discard_add_form(self.state.clone(), params)
            .await
            .map(Json)
            .map_err(to_mcp_error)
    }

    #[tool(
        name = "add_named_ranges",
        description = "Apply the rows typed into the AddNamesWizard sheet, creating one named range per row."
    )]
    pub async fn add_named_ranges(
        &self,
        Parameters(params): Parameters<tools::WorkbookParams>,
    ) -> Result<Json<crate::model::AddNamedRangesResponse>, McpError> {
        self.ensure_tool_enabled("add_named_ranges")
            .map_err(to_mcp_error)?;
        tools::add_named_ranges(self.state.clone(), params)
            .await
            .map(Json)
            .map_err(to_mcp_error)
    }

    #[tool(
        name = "insert_edit_form",
        description = "Insert (or repair) the EditNamesWizard sheet, prefilled with the workbook's existing named ranges."
    )]
    pub async fn insert_edit_form(
        &self,
        Parameters(params): Parameters<tools::WorkbookParams>,
    ) -> Result<Json<crate::model::FormResponse>, McpError> {
        self.ensure_tool_enabled("insert_edit_form")
            .map_err(to_mcp_error)?;
        tools::insert_edit_form(self.state.clone(), params)
            .await
            .map(Json)
            .map_err(to_mcp_error)
    }

    #[tool(
        name = "discard_edit_form",
        description = "Remove the EditNamesWizard sheet and its marker without applying anything."
    )]
    pub async fn discard_edit_form(
        &self,
        Parameters(params): Parameters<tools::WorkbookParams>,
    ) -> Result<Json<crate::model::DiscardFormResponse>, McpError> {
        self.ensure_tool_enabled("discard_edit_form")
            .map_err(to_mcp_error)?;
        tools::discard_edit_form(self.state.clone(), params)
            .await
            .map(Json)
            .map_err(to_mcp_error)
    }

    #[tool(
        name = "edit_named_ranges",
        description = "Apply the edits typed into the EditNamesWizard sheet: rename, repoint, or rescope named ranges, rolling each row back on failure."
    )]
    pub async fn edit_named_ranges(
        &self,
        Parameters(params): Parameters<tools::WorkbookParams>,
    ) -> Result<Json<crate::model::EditNamedRangesResponse>, McpError> {
        self.ensure_tool_enabled("edit_named_ranges")
            .map_err(to_mcp_error)?;
        tools::edit_named_ranges(self.state.clone(), params)
            .await
            .map(Json)
            .map_err(to_mcp_error)
    }

    #[tool(
        name = "export_named_ranges",
        description = "Write a styled ExistingNames report sheet listing every named range."
    )]
    pub async fn export_named_ranges(
        &self,
        Parameters(params): Parameters<tools::WorkbookParams>,
    ) -> Result<Json<crate::model::ExportResponse>, McpError> {
        self.ensure_tool_enabled("export_named_ranges")
            .map_err(to_mcp_error)?;
        tools::export_named_ranges(self.state.clone(), params)
            .await
            .map(Json)
            .map_err(to_mcp_error)
    }

    #[tool(
        name = "find_invalid_named_ranges",
        description = "List named ranges whose references are broken (contain #REF!)."
    )]
    pub async fn find_invalid_named_ranges(
        &self,
        Parameters(params): Parameters<tools::WorkbookParams>,
    ) -> Result<Json<crate::model::InvalidNamedRangesResponse>, McpError> {
        self.ensure_tool_enabled("find_invalid_named_ranges")
            .map_err(to_mcp_error)?;
        tools::find_invalid_named_ranges(self.state.clone(), params)
            .await
            .map(Json)
            .map_err(to_mcp_error)
    }
}

#[tool_handler(router = self.tool_router)]
impl ServerHandler for NamedRangeServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(BASE_INSTRUCTIONS.to_string()),
            ..ServerInfo::default()
        }
    }
}
