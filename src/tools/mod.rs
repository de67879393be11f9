pub mod filters;

use crate::error::coarse_error_code;
use crate::form;
use crate::model::{
    AddCandidate, AddNamedRangesResponse, AddOutcome, DiscardFormResponse, EditNamedRangesResponse,
    EditOperation, EditOutcome, ExportResponse, FormOutcome, FormResponse,
    InvalidNamedRangesResponse, NamedRange, NamedRangeKind, NamedRangesResponse, RowValidations,
    WORKBOOK_SCOPE, WorkbookDescription, WorkbookId, WorkbookListResponse,
};
use crate::names;
use crate::report;
use crate::state::AppState;
use crate::store;
use anyhow::Result;
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;
use umya_spreadsheet::Spreadsheet;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListWorkbooksParams {
    pub slug_prefix: Option<String>,
    pub folder: Option<String>,
    pub path_glob: Option<String>,
}

impl ListWorkbooksParams {
    fn into_filter(self) -> Result<filters::WorkbookFilter> {
        filters::WorkbookFilter::new(self.slug_prefix, self.folder, self.path_glob)
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct WorkbookParams {
    pub workbook_id: WorkbookId,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListNamedRangesParams {
    pub workbook_id: WorkbookId,
    /// Restrict to a scope: `Workbook` or a worksheet name.
    pub scope: Option<String>,
}

pub async fn list_workbooks(
    state: Arc<AppState>,
    params: ListWorkbooksParams,
) -> Result<WorkbookListResponse> {
    let filter = params.into_filter()?;
    state.list_workbooks(filter)
}

pub async fn describe_workbook(
    state: Arc<AppState>,
    params: WorkbookParams,
) -> Result<WorkbookDescription> {
    let workbook = state.open_workbook(&params.workbook_id).await?;
    Ok(workbook.describe())
}

pub async fn list_named_ranges(
    state: Arc<AppState>,
    params: ListNamedRangesParams,
) -> Result<NamedRangesResponse> {
    let workbook = state.open_workbook(&params.workbook_id).await?;
    let mut named_ranges =
        workbook.with_book(|book| store::list_named_ranges(book, &form::MARKER_NAMES));
    if let Some(scope) = params.scope.as_deref() {
        named_ranges.retain(|range| range.scope == scope);
    }
    Ok(NamedRangesResponse {
        workbook_id: workbook.id.clone(),
        workbook_short_id: workbook.short_id.clone(),
        named_ranges,
    })
}

pub async fn insert_add_form(state: Arc<AppState>, params: WorkbookParams) -> Result<FormResponse> {
    let workbook = state.open_workbook(&params.workbook_id).await?;
    let outcome = match workbook.with_book_mut(|book| form::ensure_form(book, &form::ADD_FORM)) {
        Ok(rebuilt) => {
            if rebuilt {
                workbook.save()?;
            }
            FormOutcome::Ready { rebuilt }
        }
        Err(err) => {
            tracing::warn!(error = %err, "failed to insert add form");
            FormOutcome::HostError {
                error_code: coarse_error_code(&err),
            }
        }
    };
    Ok(FormResponse {
        workbook_id: workbook.id.clone(),
        workbook_short_id: workbook.short_id.clone(),
        sheet_name: form::ADD_FORM.sheet_name.to_string(),
        outcome,
    })
}

pub async fn insert_edit_form(
    state: Arc<AppState>,
    params: WorkbookParams,
) -> Result<FormResponse> {
    let workbook = state.open_workbook(&params.workbook_id).await?;
    let outcome = workbook.with_book_mut(|book| -> Result<FormOutcome> {
        let existing = store::list_named_ranges(book, &form::MARKER_NAMES);
        if existing.is_empty() {
            return Ok(FormOutcome::NoExistingNamedRanges);
        }
        let rebuilt = form::ensure_form(book, &form::EDIT_FORM)?;
        Ok(FormOutcome::Ready { rebuilt })
    });
    let outcome = match outcome {
        Ok(outcome) => {
            if matches!(outcome, FormOutcome::Ready { rebuilt: true }) {
                workbook.save()?;
            }
            outcome
        }
        Err(err) => {
            tracing::warn!(error = %err, "failed to insert edit form");
            FormOutcome::HostError {
                error_code: coarse_error_code(&err),
            }
        }
    };
    Ok(FormResponse {
        workbook_id: workbook.id.clone(),
        workbook_short_id: workbook.short_id.clone(),
        sheet_name: form::EDIT_FORM.sheet_name.to_string(),
        outcome,
    })
}

pub async fn discard_add_form(
    state: Arc<AppState>,
    params: WorkbookParams,
) -> Result<DiscardFormResponse> {
    discard_form(state, params, &form::ADD_FORM).await
}

pub async fn discard_edit_form(
    state: Arc<AppState>,
    params: WorkbookParams,
) -> Result<DiscardFormResponse> {
    discard_form(state, params, &form::EDIT_FORM).await
}

async fn discard_form(
    state: Arc<AppState>,
    params: WorkbookParams,
    spec: &form::FormSpec,
) -> Result<DiscardFormResponse> {
    let workbook = state.open_workbook(&params.workbook_id).await?;
    let removed = workbook.with_book_mut(|book| form::teardown_form(book, spec));
    if removed {
        workbook.save()?;
    }
    Ok(DiscardFormResponse {
        workbook_id: workbook.id.clone(),
        workbook_short_id: workbook.short_id.clone(),
        sheet_name: spec.sheet_name.to_string(),
        removed,
    })
}

pub async fn add_named_ranges(
    state: Arc<AppState>,
    params: WorkbookParams,
) -> Result<AddNamedRangesResponse> {
    let workbook = state.open_workbook(&params.workbook_id).await?;
    let outcome = match workbook.with_book_mut(run_add_workflow) {
        Ok(outcome) => outcome,
        Err(err) => {
            tracing::warn!(error = %err, "add workflow aborted");
            AddOutcome::HostError {
                error_code: coarse_error_code(&err),
            }
        }
    };
    workbook.save()?;
    Ok(AddNamedRangesResponse {
        workbook_id: workbook.id.clone(),
        workbook_short_id: workbook.short_id.clone(),
        outcome,
    })
}

fn run_add_workflow(book: &mut Spreadsheet) -> Result<AddOutcome> {
    let raw_rows = form::read_input_rows(book, &form::ADD_FORM)?;

    let mut candidates = Vec::new();
    for cells in raw_rows {
        if cells.iter().all(|cell| cell.is_empty()) {
            continue;
        }
        let scope = if cells[2].is_empty() {
            WORKBOOK_SCOPE.to_string()
        } else {
            cells[2].clone()
        };
        let validations = RowValidations {
            is_name_non_empty: !cells[0].is_empty(),
            is_formula_non_empty: !cells[1].is_empty(),
            is_name_valid: names::is_valid_name(&cells[0]),
        };
        candidates.push(AddCandidate {
            name: cells[0].clone(),
            formula: cells[1].clone(),
            scope,
            validations,
            error: None,
        });
    }

    if candidates.is_empty() {
        return Ok(AddOutcome::NothingToAdd);
    }

    // Validation failures never touch the mutation API.
    if candidates
        .iter()
        .any(|candidate| !candidate.validations.all_pass())
    {
        let rows = candidates
            .into_iter()
            .filter(|candidate| !candidate.validations.all_pass())
            .collect();
        return Ok(AddOutcome::InvalidInput { rows });
    }

    let total = candidates.len();
    let mut failed: Vec<AddCandidate> = Vec::new();
    for mut candidate in candidates {
        if let Err(err) =
            store::add_named_range(book, &candidate.scope, &candidate.name, &candidate.formula)
        {
            tracing::warn!(name = %candidate.name, error = %err, "failed to add named range");
            candidate.error = Some(err.to_string());
            failed.push(candidate);
        }
    }

    if failed.is_empty() {
        form::rebuild_form(book, &form::ADD_FORM)?;
        return Ok(AddOutcome::Added { count: total });
    }

    // Committed rows stay committed; the form comes back with the failed
    // rows staged for another attempt.
    form::rebuild_form(book, &form::ADD_FORM)?;
    let retry: Vec<(String, String)> = failed
        .iter()
        .map(|candidate| (candidate.name.clone(), candidate.formula.clone()))
        .collect();
    form::write_failed_rows(book, &form::ADD_FORM, &retry)?;
    Ok(AddOutcome::FailedToAdd { rows: failed })
}

pub async fn edit_named_ranges(
    state: Arc<AppState>,
    params: WorkbookParams,
) -> Result<EditNamedRangesResponse> {
    let workbook = state.open_workbook(&params.workbook_id).await?;
    let outcome = match workbook.with_book_mut(run_edit_workflow) {
        Ok(outcome) => outcome,
        Err(err) => {
            tracing::warn!(error = %err, "edit workflow aborted");
            EditOutcome::HostError {
                error_code: coarse_error_code(&err),
            }
        }
    };
    workbook.save()?;
    Ok(EditNamedRangesResponse {
        workbook_id: workbook.id.clone(),
        workbook_short_id: workbook.short_id.clone(),
        outcome,
    })
}

fn run_edit_workflow(book: &mut Spreadsheet) -> Result<EditOutcome> {
    let raw_rows = form::read_input_rows(book, &form::EDIT_FORM)?;

    let mut operations = Vec::new();
    for cells in raw_rows {
        let has_target = !cells[4].is_empty() || !cells[5].is_empty() || !cells[6].is_empty();
        if cells[0].is_empty() || cells[1].is_empty() || !has_target {
            continue;
        }
        let old_scope = if cells[3].is_empty() {
            WORKBOOK_SCOPE.to_string()
        } else {
            cells[3].clone()
        };
        operations.push(EditOperation {
            old_name: cells[0].clone(),
            old_formula: cells[1].clone(),
            old_scope,
            new_name: cells[4].clone(),
            new_formula: cells[5].clone(),
            new_scope: cells[6].clone(),
            error: None,
            rollback_error: None,
        });
    }

    if operations.is_empty() {
        return Ok(EditOutcome::NothingToEdit);
    }

    let total = operations.len();
    let mut failed = Vec::new();
    for mut op in operations {
        let target_name = or_default(&op.new_name, &op.old_name);
        let target_formula = or_default(&op.new_formula, &op.old_formula);
        let target_scope = or_default(&op.new_scope, &op.old_scope);

        match store::delete_named_range(book, &op.old_scope, &op.old_name) {
            Err(err) => {
                tracing::warn!(name = %op.old_name, error = %err, "failed to delete named range");
                op.error = Some(err.to_string());
                failed.push(op);
            }
            Ok(()) => {
                if let Err(err) =
                    store::add_named_range(book, &target_scope, &target_name, &target_formula)
                {
                    tracing::warn!(
                        name = %op.old_name,
                        error = %err,
                        "failed to re-add edited named range, rolling back"
                    );
                    if let Err(rollback) =
                        store::add_named_range(book, &op.old_scope, &op.old_name, &op.old_formula)
                    {
                        tracing::warn!(
                            name = %op.old_name,
                            error = %rollback,
                            "rollback failed, named range lost"
                        );
                        op.rollback_error = Some(rollback.to_string());
                    }
                    op.error = Some(err.to_string());
                    failed.push(op);
                }
            }
        }
    }

    if failed.is_empty() {
        form::rebuild_form(book, &form::EDIT_FORM)?;
        Ok(EditOutcome::Edited { count: total })
    } else {
        // The form is left as-is so the failed rows can be corrected in place.
        Ok(EditOutcome::FailedToEdit { rows: failed })
    }
}

fn or_default(candidate: &str, fallback: &str) -> String {
    if candidate.is_empty() {
        fallback.to_string()
    } else {
        candidate.to_string()
    }
}

pub async fn export_named_ranges(
    state: Arc<AppState>,
    params: WorkbookParams,
) -> Result<ExportResponse> {
    let workbook = state.open_workbook(&params.workbook_id).await?;
    let rows_written = workbook.with_book_mut(report::write_report)?;
    workbook.save()?;
    Ok(ExportResponse {
        workbook_id: workbook.id.clone(),
        workbook_short_id: workbook.short_id.clone(),
        sheet_name: report::REPORT_SHEET.to_string(),
        rows_written,
    })
}

pub async fn find_invalid_named_ranges(
    state: Arc<AppState>,
    params: WorkbookParams,
) -> Result<InvalidNamedRangesResponse> {
    let workbook = state.open_workbook(&params.workbook_id).await?;
    let invalid_named_ranges: Vec<NamedRange> = workbook.with_book(|book| {
        store::list_named_ranges(book, &form::MARKER_NAMES)
            .into_iter()
            .filter(|range| range.kind == NamedRangeKind::Error)
            .collect()
    });
    Ok(InvalidNamedRangesResponse {
        workbook_id: workbook.id.clone(),
        workbook_short_id: workbook.short_id.clone(),
        invalid_named_ranges,
    })
}
