//! Wizard form sheets for the bulk add/edit workflows.
//!
//! Each form is a throwaway worksheet paired with a workbook-scoped marker
//! defined name pointing at its input block. The marker doubles as the
//! "form exists" probe: a sheet without its marker (or vice versa) counts as
//! corrupted and triggers a rebuild.

use crate::model::WORKBOOK_SCOPE;
use crate::store;
use crate::utils::{cell_address, column_number_to_name};
use anyhow::{Result, anyhow};
use umya_spreadsheet::{
    DataValidation, DataValidationValues, DataValidations, NumberingFormat, PatternValues,
    Spreadsheet, Worksheet,
};

pub const FORM_HEADER_ROW: u32 = 1;
pub const FORM_FIRST_INPUT_ROW: u32 = 2;
pub const FORM_LAST_INPUT_ROW: u32 = 9999;

pub const FORM_COLUMNS: [&str; 7] = [
    "Current Name",
    "Current Formula",
    "Type",
    "Scope",
    "New Name",
    "New Formula",
    "New Scope",
];

const NEW_SCOPE_COLUMN: u32 = 7;

/// Both wizard markers. Listing surfaces hide these; they are bookkeeping,
/// not user data.
pub const MARKER_NAMES: [&str; 2] = ["ADD_NAMED_RANGE_FORM", "EDIT_NAMED_RANGE_FORM"];

const HEADER_FONT_ARGB: &str = "FFFFFFFF";
pub const ADD_HEADER_ARGB: &str = "FF3B8CFF";
pub const EDIT_HEADER_ARGB: &str = "FFD533A3";
pub const REPORT_HEADER_ARGB: &str = "FF201A3D";
pub const ERROR_FONT_ARGB: &str = "FFF0533D";

/// Blank input rows styled below the prefilled block. The original formatted
/// the whole 9999-row block, but umya styles are per-cell and the guard it
/// protected against (host auto-coercion of typed input) does not apply.
const STYLED_INPUT_MARGIN: u32 = 15;

pub struct FormSpec {
    pub sheet_name: &'static str,
    pub marker_name: &'static str,
    pub input_start_col: u32,
    pub input_end_col: u32,
    pub header_argb: &'static str,
}

pub const ADD_FORM: FormSpec = FormSpec {
    sheet_name: "AddNamesWizard",
    marker_name: "ADD_NAMED_RANGE_FORM",
    input_start_col: 5,
    input_end_col: 7,
    header_argb: ADD_HEADER_ARGB,
};

pub const EDIT_FORM: FormSpec = FormSpec {
    sheet_name: "EditNamesWizard",
    marker_name: "EDIT_NAMED_RANGE_FORM",
    input_start_col: 1,
    input_end_col: 7,
    header_argb: EDIT_HEADER_ARGB,
};

impl FormSpec {
    pub fn marker_address(&self) -> String {
        format!(
            "{}!${}${}:${}${}",
            self.sheet_name,
            column_number_to_name(self.input_start_col),
            FORM_FIRST_INPUT_ROW,
            column_number_to_name(self.input_end_col),
            FORM_LAST_INPUT_ROW
        )
    }

    pub fn is_present(&self, book: &Spreadsheet) -> bool {
        book.get_sheet_by_name(self.sheet_name).is_some()
            && store::name_exists(book, self.marker_name)
    }
}

/// Make the form whole. No-op when sheet and marker are both intact;
/// otherwise the sheet is recreated from scratch and the marker rebound.
/// Returns whether anything was rebuilt.
pub fn ensure_form(book: &mut Spreadsheet, spec: &FormSpec) -> Result<bool> {
    if spec.is_present(book) {
        return Ok(false);
    }
    rebuild_form(book, spec)?;
    Ok(true)
}

pub fn rebuild_form(book: &mut Spreadsheet, spec: &FormSpec) -> Result<()> {
    store::remove_name_everywhere(book, spec.marker_name);
    let _ = book.remove_sheet_by_name(spec.sheet_name);
    book.new_sheet(spec.sheet_name)
        .map_err(|err| anyhow!("FailedToCreateSheet: {err}"))?;

    populate_template(book, spec)?;

    let sheet = book
        .get_sheet_by_name_mut(spec.sheet_name)
        .ok_or_else(|| anyhow!("SheetNotFound: {} missing after creation", spec.sheet_name))?;
    sheet
        .add_defined_name(spec.marker_name, spec.marker_address().as_str())
        .map_err(|err| anyhow!("FailedToCreateMarker: {err}"))?;
    Ok(())
}

/// Delete marker and sheet if present. Idempotent; reports whether anything
/// was actually removed.
pub fn teardown_form(book: &mut Spreadsheet, spec: &FormSpec) -> bool {
    let had_marker = store::name_exists(book, spec.marker_name);
    store::remove_name_everywhere(book, spec.marker_name);
    let removed_sheet = book.remove_sheet_by_name(spec.sheet_name).is_ok();
    had_marker || removed_sheet
}

fn populate_template(book: &mut Spreadsheet, spec: &FormSpec) -> Result<()> {
    let existing = store::list_named_ranges(book, &MARKER_NAMES);
    let scope_options: Vec<String> = std::iter::once(WORKBOOK_SCOPE.to_string())
        .chain(
            book.get_sheet_collection()
                .iter()
                .map(|sheet| sheet.get_name().to_string())
                .filter(|name| name != spec.sheet_name),
        )
        .collect();

    let sheet = book
        .get_sheet_by_name_mut(spec.sheet_name)
        .ok_or_else(|| anyhow!("SheetNotFound: {} missing after creation", spec.sheet_name))?;

    for (idx, header) in FORM_COLUMNS.iter().enumerate() {
        sheet
            .get_cell_mut((idx as u32 + 1, FORM_HEADER_ROW))
            .set_value(*header);
    }

    for (offset, range) in existing.iter().enumerate() {
        let row = FORM_FIRST_INPUT_ROW + offset as u32;
        sheet.get_cell_mut((1, row)).set_value(&range.name);
        sheet.get_cell_mut((2, row)).set_value(&range.formula);
        sheet.get_cell_mut((3, row)).set_value(range.kind.as_str());
        sheet.get_cell_mut((4, row)).set_value(&range.scope);
    }

    let last_styled_row = FORM_FIRST_INPUT_ROW + existing.len() as u32 + STYLED_INPUT_MARGIN;
    apply_text_and_borders(
        sheet,
        1,
        FORM_COLUMNS.len() as u32,
        FORM_HEADER_ROW,
        last_styled_row,
    );
    style_header(
        sheet,
        1,
        FORM_COLUMNS.len() as u32,
        FORM_HEADER_ROW,
        spec.header_argb,
    );

    // Name and formula columns get room to breathe.
    for col in [1u32, 2, 5, 6] {
        sheet.get_column_dimension_by_number_mut(&col).set_width(32.0);
    }

    attach_scope_dropdown(sheet, &scope_options);
    Ok(())
}

fn attach_scope_dropdown(sheet: &mut Worksheet, options: &[String]) {
    let column = column_number_to_name(NEW_SCOPE_COLUMN);
    let sqref = format!("{column}{FORM_FIRST_INPUT_ROW}:{column}{FORM_LAST_INPUT_ROW}");

    let mut validation = DataValidation::default();
    validation.set_type(DataValidationValues::List);
    validation.set_allow_blank(true);
    validation.get_sequence_of_references_mut().set_sqref(sqref);
    // DV list literals are stored as a quoted, comma-separated string.
    validation.set_formula1(format!("\"{}\"", options.join(",")));

    if sheet.get_data_validations_mut().is_none() {
        sheet.set_data_validations(DataValidations::default());
    }
    if let Some(validations) = sheet.get_data_validations_mut() {
        validations.add_data_validation_list(validation);
    }
}

pub(crate) fn apply_text_and_borders(
    sheet: &mut Worksheet,
    first_col: u32,
    last_col: u32,
    first_row: u32,
    last_row: u32,
) {
    for row in first_row..=last_row {
        for col in first_col..=last_col {
            let address = cell_address(col, row);
            let style = sheet.get_style_mut(address.as_str());
            style
                .get_number_format_mut()
                .set_format_code(NumberingFormat::FORMAT_TEXT);
            let borders = style.get_borders_mut();
            borders.get_left_border_mut().set_border_style("thin");
            borders.get_right_border_mut().set_border_style("thin");
            borders.get_top_border_mut().set_border_style("thin");
            borders.get_bottom_border_mut().set_border_style("thin");
        }
    }
}

pub(crate) fn style_header(
    sheet: &mut Worksheet,
    first_col: u32,
    last_col: u32,
    row: u32,
    fill_argb: &str,
) {
    for col in first_col..=last_col {
        let address = cell_address(col, row);
        let style = sheet.get_style_mut(address.as_str());
        let font = style.get_font_mut();
        font.set_bold(true);
        font.get_color_mut().set_argb(HEADER_FONT_ARGB);
        style
            .get_fill_mut()
            .get_pattern_fill_mut()
            .set_pattern_type(PatternValues::Solid)
            .get_foreground_color_mut()
            .set_argb(fill_argb);
    }
}

/// Read the raw input block, one Vec<String> per row from row 2 down to the
/// last populated row. Values come back exactly as stored; blank-row
/// filtering is the workflows' business.
pub fn read_input_rows(book: &Spreadsheet, spec: &FormSpec) -> Result<Vec<Vec<String>>> {
    let sheet = book.get_sheet_by_name(spec.sheet_name).ok_or_else(|| {
        anyhow!(
            "FormNotFound: {} wizard sheet is missing, insert the form first",
            spec.sheet_name
        )
    })?;

    let last_row = sheet.get_highest_row().min(FORM_LAST_INPUT_ROW);
    let mut rows = Vec::new();
    for row in FORM_FIRST_INPUT_ROW..=last_row {
        let mut cells = Vec::with_capacity((spec.input_end_col - spec.input_start_col + 1) as usize);
        for col in spec.input_start_col..=spec.input_end_col {
            let value = sheet
                .get_cell((col, row))
                .map(|cell| cell.get_value().to_string())
                .unwrap_or_default();
            cells.push(value);
        }
        rows.push(cells);
    }
    Ok(rows)
}

/// Rewrite failed (name, formula) pairs into a freshly rebuilt input block.
pub fn write_failed_rows(
    book: &mut Spreadsheet,
    spec: &FormSpec,
    rows: &[(String, String)],
) -> Result<()> {
    let sheet = book
        .get_sheet_by_name_mut(spec.sheet_name)
        .ok_or_else(|| anyhow!("FormNotFound: {} wizard sheet is missing", spec.sheet_name))?;
    for (offset, (name, formula)) in rows.iter().enumerate() {
        let row = FORM_FIRST_INPUT_ROW + offset as u32;
        sheet
            .get_cell_mut((spec.input_start_col, row))
            .set_value(name);
        sheet
            .get_cell_mut((spec.input_start_col + 1, row))
            .set_value(formula);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_addresses_cover_the_input_block() {
        assert_eq!(ADD_FORM.marker_address(), "AddNamesWizard!$E$2:$G$9999");
        assert_eq!(EDIT_FORM.marker_address(), "EditNamesWizard!$A$2:$G$9999");
    }

    #[test]
    fn ensure_form_is_idempotent() {
        let mut book = umya_spreadsheet::new_file();
        assert!(ensure_form(&mut book, &ADD_FORM).unwrap());
        assert!(!ensure_form(&mut book, &ADD_FORM).unwrap());
        assert!(ADD_FORM.is_present(&book));
    }

    #[test]
    fn missing_marker_counts_as_corrupted() {
        let mut book = umya_spreadsheet::new_file();
        ensure_form(&mut book, &ADD_FORM).unwrap();
        store::remove_name_everywhere(&mut book, ADD_FORM.marker_name);
        assert!(ensure_form(&mut book, &ADD_FORM).unwrap());
    }

    #[test]
    fn teardown_is_idempotent() {
        let mut book = umya_spreadsheet::new_file();
        ensure_form(&mut book, &EDIT_FORM).unwrap();
        assert!(teardown_form(&mut book, &EDIT_FORM));
        assert!(!teardown_form(&mut book, &EDIT_FORM));
        assert!(book.get_sheet_by_name(EDIT_FORM.sheet_name).is_none());
    }

    #[test]
    fn template_prefills_existing_names_and_dropdown() {
        let mut book = umya_spreadsheet::new_file();
        book.get_sheet_by_name_mut("Sheet1")
            .unwrap()
            .add_defined_name("Total", "Sheet1!$A$1")
            .unwrap();

        ensure_form(&mut book, &EDIT_FORM).unwrap();
        let sheet = book.get_sheet_by_name(EDIT_FORM.sheet_name).unwrap();

        for (idx, header) in FORM_COLUMNS.iter().enumerate() {
            let cell = sheet.get_cell((idx as u32 + 1, FORM_HEADER_ROW)).unwrap();
            assert_eq!(cell.get_value(), *header);
        }
        assert_eq!(sheet.get_cell((1u32, 2u32)).unwrap().get_value(), "Total");
        assert_eq!(
            sheet.get_cell((4u32, 2u32)).unwrap().get_value(),
            WORKBOOK_SCOPE
        );

        let validations = sheet.get_data_validations().expect("dropdown present");
        let list = validations.get_data_validation_list();
        assert_eq!(list.len(), 1);
        let formula = list[0].get_formula1();
        assert!(formula.contains("Workbook"));
        assert!(formula.contains("Sheet1"));
        assert!(!formula.contains(EDIT_FORM.sheet_name));
    }
}
