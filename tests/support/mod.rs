#![allow(dead_code)]

use named_range_mcp::config::ServerConfig;
use named_range_mcp::model::WorkbookId;
use named_range_mcp::state::AppState;
use named_range_mcp::tools::filters::WorkbookFilter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use umya_spreadsheet::Spreadsheet;

/// A throwaway workspace directory with helpers to seed workbooks and build
/// server state over it.
pub struct TestWorkspace {
    dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("create temp workspace"),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Seed a workbook file, letting the closure shape it before the write.
    pub fn create_workbook<F>(&self, name: &str, build: F) -> PathBuf
    where
        F: FnOnce(&mut Spreadsheet),
    {
        let mut book = umya_spreadsheet::new_file();
        build(&mut book);
        let path = self.path(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create workbook parent dir");
        }
        umya_spreadsheet::writer::xlsx::write(&book, &path).expect("write workbook");
        path
    }

    pub fn config(&self) -> ServerConfig {
        ServerConfig {
            workspace_root: self.root().to_path_buf(),
            cache_capacity: 8,
            supported_extensions: vec!["xlsx".to_string()],
            single_workbook: None,
            enabled_tools: None,
        }
    }

    pub fn config_with<F>(&self, adjust: F) -> ServerConfig
    where
        F: FnOnce(&mut ServerConfig),
    {
        let mut config = self.config();
        adjust(&mut config);
        config
    }

    pub fn app_state(&self) -> Arc<AppState> {
        Arc::new(AppState::new(Arc::new(self.config())))
    }
}

/// Resolve the canonical id of the only (or first) workbook in a workspace.
pub fn first_workbook_id(state: &AppState) -> WorkbookId {
    let listing = state
        .list_workbooks(WorkbookFilter::default())
        .expect("list workbooks");
    listing
        .workbooks
        .first()
        .expect("workspace has at least one workbook")
        .workbook_id
        .clone()
}
