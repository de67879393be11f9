use crate::config::ServerConfig;
use crate::model::{WorkbookDescription, WorkbookDescriptor, WorkbookId, WorkbookListResponse};
use crate::store;
use crate::tools::filters::WorkbookFilter;
use crate::utils::{
    hash_path_metadata, make_short_workbook_id, path_to_forward_slashes, system_time_to_rfc3339,
};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use umya_spreadsheet::{Spreadsheet, reader::xlsx, writer};

/// An open workbook: identity, file metadata, and the parsed spreadsheet
/// behind a lock. Mutating workflows take the write side and flush with
/// [`WorkbookContext::save`].
pub struct WorkbookContext {
    pub id: WorkbookId,
    pub short_id: String,
    pub slug: String,
    pub path: PathBuf,
    pub bytes: u64,
    pub last_modified: Option<DateTime<Utc>>,
    spreadsheet: Arc<RwLock<Spreadsheet>>,
}

impl WorkbookContext {
    pub fn load(_config: &Arc<ServerConfig>, path: &Path) -> Result<Self> {
        let metadata = fs::metadata(path)
            .with_context(|| format!("unable to read metadata for {:?}", path))?;
        let slug = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "workbook".to_string());
        let bytes = metadata.len();
        let last_modified = metadata.modified().ok().and_then(system_time_to_rfc3339);
        let id = WorkbookId(hash_path_metadata(path, &metadata));
        let spreadsheet =
            xlsx::read(path).with_context(|| format!("failed to parse workbook {:?}", path))?;
        let short_id = make_short_workbook_id(&slug, id.as_str());

        Ok(Self {
            id,
            short_id,
            slug,
            path: path.to_path_buf(),
            bytes,
            last_modified,
            spreadsheet: Arc::new(RwLock::new(spreadsheet)),
        })
    }

    /// Flush the in-memory spreadsheet back to its file. This is the
    /// workflows' synchronize point.
    pub fn save(&self) -> Result<()> {
        let book = self.spreadsheet.read();
        writer::xlsx::write(&book, &self.path)
            .with_context(|| format!("failed to save workbook {:?}", self.path))?;
        Ok(())
    }

    pub fn sheet_names(&self) -> Vec<String> {
        let book = self.spreadsheet.read();
        book.get_sheet_collection()
            .iter()
            .map(|sheet| sheet.get_name().to_string())
            .collect()
    }

    pub fn describe(&self) -> WorkbookDescription {
        let book = self.spreadsheet.read();
        let defined_names = store::list_named_ranges(&book, &crate::form::MARKER_NAMES).len();

        WorkbookDescription {
            workbook_id: self.id.clone(),
            short_id: self.short_id.clone(),
            slug: self.slug.clone(),
            path: path_to_forward_slashes(&self.path),
            bytes: self.bytes,
            sheet_count: book.get_sheet_collection().len(),
            defined_names,
            last_modified: self
                .last_modified
                .map(|dt| dt.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)),
        }
    }

    pub fn with_book<T, F>(&self, func: F) -> T
    where
        F: FnOnce(&Spreadsheet) -> T,
    {
        let book = self.spreadsheet.read();
        func(&book)
    }

    pub fn with_book_mut<T, F>(&self, func: F) -> T
    where
        F: FnOnce(&mut Spreadsheet) -> T,
    {
        let mut book = self.spreadsheet.write();
        func(&mut book)
    }
}

pub fn build_workbook_list(
    config: &Arc<ServerConfig>,
    filter: &WorkbookFilter,
) -> Result<WorkbookListResponse> {
    let mut descriptors = Vec::new();

    if let Some(single) = config.single_workbook() {
        let metadata = fs::metadata(single)
            .with_context(|| format!("unable to read metadata for {:?}", single))?;
        let id = WorkbookId(hash_path_metadata(single, &metadata));
        let slug = single
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "workbook".to_string());
        let folder = derive_folder(config, single);
        let short_id = make_short_workbook_id(&slug, id.as_str());

        if filter.matches(&slug, folder.as_deref(), single) {
            let relative = single
                .strip_prefix(&config.workspace_root)
                .unwrap_or(single);
            descriptors.push(WorkbookDescriptor {
                workbook_id: id,
                short_id,
                slug,
                folder,
                path: path_to_forward_slashes(relative),
                bytes: metadata.len(),
                last_modified: metadata
                    .modified()
                    .ok()
                    .and_then(system_time_to_rfc3339)
                    .map(|dt| dt.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)),
            });
        }

        return Ok(WorkbookListResponse {
            workbooks: descriptors,
        });
    }

    use walkdir::WalkDir;

    for entry in WalkDir::new(&config.workspace_root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if !has_supported_extension(&config.supported_extensions, path) {
            continue;
        }
        let metadata = entry.metadata()?;
        let id = WorkbookId(hash_path_metadata(path, &metadata));
        let slug = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "workbook".to_string());
        let folder = derive_folder(config, path);
        let short_id = make_short_workbook_id(&slug, id.as_str());

        if !filter.matches(&slug, folder.as_deref(), path) {
            continue;
        }

        let relative = path.strip_prefix(&config.workspace_root).unwrap_or(path);
        descriptors.push(WorkbookDescriptor {
            workbook_id: id,
            short_id,
            slug,
            folder,
            path: path_to_forward_slashes(relative),
            bytes: metadata.len(),
            last_modified: metadata
                .modified()
                .ok()
                .and_then(system_time_to_rfc3339)
                .map(|dt| dt.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)),
        });
    }

    descriptors.sort_by(|a, b| a.slug.cmp(&b.slug));

    Ok(WorkbookListResponse {
        workbooks: descriptors,
    })
}

fn derive_folder(config: &Arc<ServerConfig>, path: &Path) -> Option<String> {
    path.strip_prefix(&config.workspace_root)
        .ok()
        .and_then(|relative| relative.parent())
        .and_then(|parent| parent.file_name())
        .map(|os| os.to_string_lossy().to_string())
}

pub fn has_supported_extension(allowed: &[String], path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let lower = ext.to_ascii_lowercase();
            allowed.iter().any(|candidate| candidate == &lower)
        })
        .unwrap_or(false)
}
