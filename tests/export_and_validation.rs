mod support;

use named_range_mcp::model::NamedRangeKind;
use named_range_mcp::report;
use named_range_mcp::tools::{self, WorkbookParams};
use support::{TestWorkspace, first_workbook_id};

fn seeded_workspace() -> TestWorkspace {
    let ws = TestWorkspace::new();
    ws.create_workbook("mixed.xlsx", |book| {
        let sheet = book.get_sheet_by_name_mut("Sheet1").unwrap();
        sheet.get_cell_mut("A1").set_value("42");
        sheet.add_defined_name("Good", "Sheet1!$A$1").unwrap();
        sheet.add_defined_name("Broken", "Sheet1!#REF!").unwrap();
    });
    ws
}

#[tokio::test(flavor = "current_thread")]
async fn export_writes_the_report_sheet() {
    let ws = seeded_workspace();
    let state = ws.app_state();
    let id = first_workbook_id(&state);

    let response = tools::export_named_ranges(
        state.clone(),
        WorkbookParams {
            workbook_id: id.clone(),
        },
    )
    .await
    .unwrap();
    assert_eq!(response.sheet_name, report::REPORT_SHEET);
    assert_eq!(response.rows_written, 3);

    let workbook = state.open_workbook(&id).await.unwrap();
    let (header, first_name, broken_kind) = workbook.with_book(|book| {
        let sheet = book.get_sheet_by_name(report::REPORT_SHEET).unwrap();
        (
            sheet.get_cell("B2").unwrap().get_value().to_string(),
            sheet.get_cell("C3").unwrap().get_value().to_string(),
            sheet.get_cell("E4").unwrap().get_value().to_string(),
        )
    });
    assert_eq!(header, "ID");
    assert_eq!(first_name, "Good");
    assert_eq!(broken_kind, "Error");
}

#[tokio::test(flavor = "current_thread")]
async fn export_rerun_replaces_the_previous_report() {
    let ws = seeded_workspace();
    let state = ws.app_state();
    let id = first_workbook_id(&state);

    tools::export_named_ranges(
        state.clone(),
        WorkbookParams {
            workbook_id: id.clone(),
        },
    )
    .await
    .unwrap();
    let second = tools::export_named_ranges(state.clone(), WorkbookParams { workbook_id: id })
        .await
        .unwrap();
    assert_eq!(second.rows_written, 3);
}

#[tokio::test(flavor = "current_thread")]
async fn find_invalid_returns_only_broken_references() {
    let ws = seeded_workspace();
    let state = ws.app_state();
    let id = first_workbook_id(&state);

    let response =
        tools::find_invalid_named_ranges(state.clone(), WorkbookParams { workbook_id: id })
            .await
            .unwrap();
    assert_eq!(response.invalid_named_ranges.len(), 1);
    assert_eq!(response.invalid_named_ranges[0].name, "Broken");
    assert_eq!(response.invalid_named_ranges[0].kind, NamedRangeKind::Error);
}

#[tokio::test(flavor = "current_thread")]
async fn find_invalid_is_empty_when_everything_resolves() {
    let ws = TestWorkspace::new();
    ws.create_workbook("clean.xlsx", |book| {
        book.get_sheet_by_name_mut("Sheet1")
            .unwrap()
            .add_defined_name("Good", "Sheet1!$A$1")
            .unwrap();
    });
    let state = ws.app_state();
    let id = first_workbook_id(&state);

    let response =
        tools::find_invalid_named_ranges(state.clone(), WorkbookParams { workbook_id: id })
            .await
            .unwrap();
    assert!(response.invalid_named_ranges.is_empty());
}
