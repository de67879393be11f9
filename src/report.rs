//! The `ExistingNames` export sheet: a styled snapshot of every defined name.

use crate::form::{ERROR_FONT_ARGB, MARKER_NAMES, REPORT_HEADER_ARGB, apply_text_and_borders, style_header};
use crate::model::NamedRangeKind;
use crate::store;
use crate::utils::cell_address;
use anyhow::{Result, anyhow};
use umya_spreadsheet::Spreadsheet;

pub const REPORT_SHEET: &str = "ExistingNames";

const REPORT_COLUMNS: [&str; 5] = ["ID", "Name", "Formula", "Type", "Scope"];
const FIRST_COL: u32 = 2;
const FIRST_ROW: u32 = 2;

/// Write (or rewrite) the report sheet. Returns the row count including the
/// header.
pub fn write_report(book: &mut Spreadsheet) -> Result<usize> {
    let ranges = store::list_named_ranges(book, &MARKER_NAMES);

    let _ = book.remove_sheet_by_name(REPORT_SHEET);
    book.new_sheet(REPORT_SHEET)
        .map_err(|err| anyhow!("FailedToCreateSheet: {err}"))?;
    let sheet = book
        .get_sheet_by_name_mut(REPORT_SHEET)
        .ok_or_else(|| anyhow!("SheetNotFound: {REPORT_SHEET} missing after creation"))?;

    for (idx, header) in REPORT_COLUMNS.iter().enumerate() {
        sheet
            .get_cell_mut((FIRST_COL + idx as u32, FIRST_ROW))
            .set_value(*header);
    }

    for (offset, range) in ranges.iter().enumerate() {
        let row = FIRST_ROW + 1 + offset as u32;
        // The whole table is text-formatted, the id goes in as a string too.
        sheet
            .get_cell_mut((FIRST_COL, row))
            .set_value((offset + 1).to_string());
        sheet.get_cell_mut((FIRST_COL + 1, row)).set_value(&range.name);
        sheet
            .get_cell_mut((FIRST_COL + 2, row))
            .set_value(&range.formula);
        sheet
            .get_cell_mut((FIRST_COL + 3, row))
            .set_value(range.kind.as_str());
        sheet
            .get_cell_mut((FIRST_COL + 4, row))
            .set_value(&range.scope);
    }

    let last_col = FIRST_COL + REPORT_COLUMNS.len() as u32 - 1;
    let last_row = FIRST_ROW + ranges.len() as u32;
    apply_text_and_borders(sheet, FIRST_COL, last_col, FIRST_ROW, last_row);
    style_header(sheet, FIRST_COL, last_col, FIRST_ROW, REPORT_HEADER_ARGB);

    // Broken names jump out in bold red.
    for (offset, range) in ranges.iter().enumerate() {
        if range.kind != NamedRangeKind::Error {
            continue;
        }
        let row = FIRST_ROW + 1 + offset as u32;
        for col in FIRST_COL..=last_col {
            let address = cell_address(col, row);
            let font = sheet.get_style_mut(address.as_str()).get_font_mut();
            font.set_bold(true);
            font.get_color_mut().set_argb(ERROR_FONT_ARGB);
        }
    }

    // Spacer column A, roomy name and formula columns.
    sheet.get_column_dimension_by_number_mut(&1).set_width(18.0);
    for col in [FIRST_COL + 1, FIRST_COL + 2] {
        sheet.get_column_dimension_by_number_mut(&col).set_width(32.0);
    }

    Ok(ranges.len() + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::WORKBOOK_SCOPE;

    #[test]
    fn report_writes_header_plus_one_row_per_name() {
        let mut book = umya_spreadsheet::new_file();
        store::add_named_range(&mut book, WORKBOOK_SCOPE, "Good", "Sheet1!$A$1").unwrap();
        store::add_named_range(&mut book, WORKBOOK_SCOPE, "Bad", "Sheet1!#REF!").unwrap();

        let rows = write_report(&mut book).unwrap();
        assert_eq!(rows, 3);

        let sheet = book.get_sheet_by_name(REPORT_SHEET).unwrap();
        assert_eq!(sheet.get_cell("B2").unwrap().get_value(), "ID");
        assert_eq!(sheet.get_cell("C3").unwrap().get_value(), "Good");
        assert_eq!(sheet.get_cell("C4").unwrap().get_value(), "Bad");
        assert_eq!(sheet.get_cell("E4").unwrap().get_value(), "Error");
    }

    #[test]
    fn rerunning_replaces_the_previous_report() {
        let mut book = umya_spreadsheet::new_file();
        store::add_named_range(&mut book, WORKBOOK_SCOPE, "One", "Sheet1!$A$1").unwrap();
        write_report(&mut book).unwrap();
        store::add_named_range(&mut book, WORKBOOK_SCOPE, "Two", "Sheet1!$B$1").unwrap();

        let rows = write_report(&mut book).unwrap();
        assert_eq!(rows, 3);
        let sheet = book.get_sheet_by_name(REPORT_SHEET).unwrap();
        assert_eq!(sheet.get_cell("C4").unwrap().get_value(), "Two");
    }
}
