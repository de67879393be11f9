mod support;

use named_range_mcp::form;
use named_range_mcp::model::{EditOutcome, WORKBOOK_SCOPE};
use named_range_mcp::tools::{self, ListNamedRangesParams, WorkbookParams};
use support::{TestWorkspace, first_workbook_id};

fn seeded_workspace() -> TestWorkspace {
    let ws = TestWorkspace::new();
    ws.create_workbook("named.xlsx", |book| {
        book.get_sheet_by_name_mut("Sheet1")
            .unwrap()
            .add_defined_name("Total", "Sheet1!$A$1")
            .unwrap();
    });
    ws
}

#[tokio::test(flavor = "current_thread")]
async fn untouched_form_yields_nothing_to_edit() {
    let ws = seeded_workspace();
    let state = ws.app_state();
    let id = first_workbook_id(&state);

    tools::insert_edit_form(
        state.clone(),
        WorkbookParams {
            workbook_id: id.clone(),
        },
    )
    .await
    .unwrap();

    let response = tools::edit_named_ranges(state.clone(), WorkbookParams { workbook_id: id })
        .await
        .unwrap();
    assert!(matches!(response.outcome, EditOutcome::NothingToEdit));
}

#[tokio::test(flavor = "current_thread")]
async fn rename_replaces_the_old_name() {
    let ws = seeded_workspace();
    let state = ws.app_state();
    let id = first_workbook_id(&state);

    tools::insert_edit_form(
        state.clone(),
        WorkbookParams {
            workbook_id: id.clone(),
        },
    )
    .await
    .unwrap();

    let workbook = state.open_workbook(&id).await.unwrap();
    workbook.with_book_mut(|book| {
        let sheet = book
            .get_sheet_by_name_mut(form::EDIT_FORM.sheet_name)
            .unwrap();
        sheet.get_cell_mut("E2").set_value("GrandTotal");
    });

    let response = tools::edit_named_ranges(
        state.clone(),
        WorkbookParams {
            workbook_id: id.clone(),
        },
    )
    .await
    .unwrap();
    assert!(matches!(response.outcome, EditOutcome::Edited { count: 1 }));

    let listed = tools::list_named_ranges(
        state.clone(),
        ListNamedRangesParams {
            workbook_id: id,
            scope: None,
        },
    )
    .await
    .unwrap();
    assert_eq!(listed.named_ranges.len(), 1);
    assert_eq!(listed.named_ranges[0].name, "GrandTotal");
    assert_eq!(listed.named_ranges[0].formula, "Sheet1!$A$1");
    assert_eq!(listed.named_ranges[0].scope, WORKBOOK_SCOPE);
}

#[tokio::test(flavor = "current_thread")]
async fn failed_edit_rolls_the_original_back() {
    let ws = seeded_workspace();
    let state = ws.app_state();
    let id = first_workbook_id(&state);

    tools::insert_edit_form(
        state.clone(),
        WorkbookParams {
            workbook_id: id.clone(),
        },
    )
    .await
    .unwrap();

    // Rescope to a sheet that does not exist: the delete succeeds, the
    // re-add fails, and the original must come back.
    let workbook = state.open_workbook(&id).await.unwrap();
    workbook.with_book_mut(|book| {
        let sheet = book
            .get_sheet_by_name_mut(form::EDIT_FORM.sheet_name)
            .unwrap();
        sheet.get_cell_mut("G2").set_value("Missing");
    });

    let response = tools::edit_named_ranges(
        state.clone(),
        WorkbookParams {
            workbook_id: id.clone(),
        },
    )
    .await
    .unwrap();

    match response.outcome {
        EditOutcome::FailedToEdit { rows } => {
            assert_eq!(rows.len(), 1);
            assert_eq!(rows[0].old_name, "Total");
            assert!(rows[0]
                .error
                .as_deref()
                .unwrap()
                .starts_with("SheetNotFound"));
            assert!(rows[0].rollback_error.is_none());
        }
        other => panic!("expected FailedToEdit, got {other:?}"),
    }

    let listed = tools::list_named_ranges(
        state.clone(),
        ListNamedRangesParams {
            workbook_id: id,
            scope: None,
        },
    )
    .await
    .unwrap();
    assert_eq!(listed.named_ranges.len(), 1);
    assert_eq!(listed.named_ranges[0].name, "Total");
    assert_eq!(listed.named_ranges[0].scope, WORKBOOK_SCOPE);
}

#[tokio::test(flavor = "current_thread")]
async fn rescope_moves_a_name_to_a_sheet() {
    let ws = TestWorkspace::new();
    ws.create_workbook("named.xlsx", |book| {
        let _ = book.new_sheet("Data");
        book.get_sheet_by_name_mut("Sheet1")
            .unwrap()
            .add_defined_name("Total", "Data!$A$1")
            .unwrap();
    });
    let state = ws.app_state();
    let id = first_workbook_id(&state);

    tools::insert_edit_form(
        state.clone(),
        WorkbookParams {
            workbook_id: id.clone(),
        },
    )
    .await
    .unwrap();

    let workbook = state.open_workbook(&id).await.unwrap();
    workbook.with_book_mut(|book| {
        let sheet = book
            .get_sheet_by_name_mut(form::EDIT_FORM.sheet_name)
            .unwrap();
        sheet.get_cell_mut("G2").set_value("Data");
    });

    let response = tools::edit_named_ranges(
        state.clone(),
        WorkbookParams {
            workbook_id: id.clone(),
        },
    )
    .await
    .unwrap();
    assert!(matches!(response.outcome, EditOutcome::Edited { count: 1 }));

    let listed = tools::list_named_ranges(
        state.clone(),
        ListNamedRangesParams {
            workbook_id: id,
            scope: Some("Data".to_string()),
        },
    )
    .await
    .unwrap();
    assert_eq!(listed.named_ranges.len(), 1);
    assert_eq!(listed.named_ranges[0].name, "Total");
    assert_eq!(listed.named_ranges[0].scope, "Data");
}

#[tokio::test(flavor = "current_thread")]
async fn edit_without_a_form_is_a_host_error() {
    let ws = seeded_workspace();
    let state = ws.app_state();
    let id = first_workbook_id(&state);

    let response = tools::edit_named_ranges(state.clone(), WorkbookParams { workbook_id: id })
        .await
        .unwrap();
    match response.outcome {
        EditOutcome::HostError { error_code } => assert_eq!(error_code, "FormNotFound"),
        other => panic!("expected HostError, got {other:?}"),
    }
}
