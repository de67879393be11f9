//! Flat store over a workbook's defined names.
//!
//! umya keeps `DefinedName` entries on worksheets. An entry without a
//! `local_sheet_id` is workbook-scoped regardless of which sheet holds it;
//! an entry with `local_sheet_id = i` is scoped to sheet `i`. Workbook-scoped
//! names are anchored on the first sheet when added here.
//!
//! Listing order is stable: workbook-scoped entries first, then sheet-scoped
//! entries, both in sheet-enumeration order and host-native order within a
//! sheet.

use crate::model::{NamedRange, NamedRangeKind, WORKBOOK_SCOPE};
use anyhow::{Result, anyhow, bail};
use umya_spreadsheet::Spreadsheet;

pub fn list_named_ranges(book: &Spreadsheet, exclude: &[&str]) -> Vec<NamedRange> {
    let sheet_names: Vec<String> = book
        .get_sheet_collection()
        .iter()
        .map(|sheet| sheet.get_name().to_string())
        .collect();

    let mut out = Vec::new();

    for sheet in book.get_sheet_collection() {
        for defined in sheet.get_defined_names() {
            if defined.has_local_sheet_id() {
                continue;
            }
            if exclude.contains(&defined.get_name()) {
                continue;
            }
            out.push(describe(
                book,
                defined.get_name(),
                defined.get_address(),
                WORKBOOK_SCOPE.to_string(),
            ));
        }
    }

    for sheet in book.get_sheet_collection() {
        for defined in sheet.get_defined_names() {
            if !defined.has_local_sheet_id() {
                continue;
            }
            if exclude.contains(&defined.get_name()) {
                continue;
            }
            let scope = sheet_names
                .get(*defined.get_local_sheet_id() as usize)
                .cloned()
                .unwrap_or_else(|| sheet.get_name().to_string());
            out.push(describe(book, defined.get_name(), defined.get_address(), scope));
        }
    }

    out
}

/// Add a defined name under the given scope. The reference is stored without
/// a leading `=`. Errors carry a `Code: detail` message so workflows can
/// derive a coarse error code.
pub fn add_named_range(
    book: &mut Spreadsheet,
    scope: &str,
    name: &str,
    formula: &str,
) -> Result<()> {
    let reference = formula.trim().trim_start_matches('=').to_string();

    if scope == WORKBOOK_SCOPE {
        let anchor = book
            .get_sheet_collection()
            .first()
            .map(|sheet| sheet.get_name().to_string())
            .ok_or_else(|| anyhow!("WorkbookEmpty: workbook has no sheets"))?;
        let sheet = book
            .get_sheet_by_name_mut(&anchor)
            .ok_or_else(|| anyhow!("SheetNotFound: worksheet {anchor} not found"))?;
        sheet
            .add_defined_name(name, reference.as_str())
            .map_err(|err| anyhow!("FailedToAdd: {err}"))?;
    } else {
        let index = book
            .get_sheet_collection()
            .iter()
            .position(|sheet| sheet.get_name() == scope)
            .ok_or_else(|| {
                anyhow!("SheetNotFound: no worksheet named {scope} for scoped name {name}")
            })?;
        let sheet = book
            .get_sheet_by_name_mut(scope)
            .ok_or_else(|| anyhow!("SheetNotFound: worksheet {scope} not found"))?;
        sheet
            .add_defined_name(name, reference.as_str())
            .map_err(|err| anyhow!("FailedToAdd: {err}"))?;
        if let Some(defined) = sheet.get_defined_names_mut().last_mut() {
            defined.set_local_sheet_id(index as u32);
        }
    }

    Ok(())
}

/// Delete the defined name matching both name and scope. Errs when no such
/// name exists, which is the per-row failure surface for the edit workflow.
pub fn delete_named_range(book: &mut Spreadsheet, scope: &str, name: &str) -> Result<()> {
    let sheet_names: Vec<String> = book
        .get_sheet_collection()
        .iter()
        .map(|sheet| sheet.get_name().to_string())
        .collect();

    let mut removed = false;
    for sheet_name in &sheet_names {
        let Some(sheet) = book.get_sheet_by_name_mut(sheet_name) else {
            continue;
        };
        let defined_names = sheet.get_defined_names_mut();
        let before = defined_names.len();
        defined_names.retain(|defined| {
            if defined.get_name() != name {
                return true;
            }
            let matches_scope = if defined.has_local_sheet_id() {
                sheet_names
                    .get(*defined.get_local_sheet_id() as usize)
                    .map(String::as_str)
                    == Some(scope)
            } else {
                scope == WORKBOOK_SCOPE
            };
            !matches_scope
        });
        if defined_names.len() != before {
            removed = true;
            break;
        }
    }

    if removed {
        Ok(())
    } else {
        bail!("NamedRangeNotFound: no {scope}-scoped name {name}")
    }
}

/// Remove every defined name with this name, whatever its scope. Used for
/// form-marker cleanup where idempotence matters more than precision.
pub fn remove_name_everywhere(book: &mut Spreadsheet, name: &str) {
    let sheet_names: Vec<String> = book
        .get_sheet_collection()
        .iter()
        .map(|sheet| sheet.get_name().to_string())
        .collect();
    for sheet_name in &sheet_names {
        if let Some(sheet) = book.get_sheet_by_name_mut(sheet_name) {
            sheet
                .get_defined_names_mut()
                .retain(|defined| defined.get_name() != name);
        }
    }
}

pub fn name_exists(book: &Spreadsheet, name: &str) -> bool {
    book.get_sheet_collection()
        .iter()
        .any(|sheet| sheet.get_defined_names().iter().any(|d| d.get_name() == name))
}

fn describe(book: &Spreadsheet, name: &str, address: String, scope: String) -> NamedRange {
    let kind = derive_kind(&address);
    let value = if kind == NamedRangeKind::Range {
        resolve_first_cell_value(book, &address)
    } else {
        String::new()
    };
    NamedRange {
        name: name.to_string(),
        formula: address,
        scope,
        kind,
        value,
        comment: String::new(),
        visible: true,
    }
}

fn derive_kind(address: &str) -> NamedRangeKind {
    let trimmed = address.trim();
    if trimmed.contains("#REF!") {
        NamedRangeKind::Error
    } else if trimmed.starts_with('=') || trimmed.contains('(') {
        NamedRangeKind::Formula
    } else {
        NamedRangeKind::Range
    }
}

fn resolve_first_cell_value(book: &Spreadsheet, address: &str) -> String {
    let trimmed = address.trim().trim_start_matches('=');
    let Some((sheet_part, cells)) = trimmed.split_once('!') else {
        return String::new();
    };
    let sheet_name = sheet_part.trim_matches('\'');
    let first = cells
        .split(':')
        .next()
        .unwrap_or("")
        .replace('$', "");
    if !is_cell_reference(&first) {
        return String::new();
    }
    book.get_sheet_by_name(sheet_name)
        .and_then(|sheet| sheet.get_cell(first.as_str()))
        .map(|cell| cell.get_value().to_string())
        .unwrap_or_default()
}

fn is_cell_reference(candidate: &str) -> bool {
    let letters: String = candidate
        .chars()
        .take_while(|ch| ch.is_ascii_alphabetic())
        .collect();
    let rest = &candidate[letters.len()..];
    (1..=3).contains(&letters.len())
        && !rest.is_empty()
        && rest.chars().all(|ch| ch.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_sheet_book() -> Spreadsheet {
        let mut book = umya_spreadsheet::new_file();
        let _ = book.new_sheet("Data");
        book
    }

    #[test]
    fn listing_puts_workbook_scope_first() {
        let mut book = two_sheet_book();
        add_named_range(&mut book, "Data", "Local", "Data!$A$1").unwrap();
        add_named_range(&mut book, WORKBOOK_SCOPE, "Global", "Sheet1!$A$1").unwrap();

        let listed = list_named_ranges(&book, &[]);
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].name, "Global");
        assert_eq!(listed[0].scope, WORKBOOK_SCOPE);
        assert_eq!(listed[1].name, "Local");
        assert_eq!(listed[1].scope, "Data");
    }

    #[test]
    fn exclude_drops_the_marker_name() {
        let mut book = two_sheet_book();
        add_named_range(&mut book, WORKBOOK_SCOPE, "KEEP", "Sheet1!$A$1").unwrap();
        add_named_range(&mut book, WORKBOOK_SCOPE, "MARKER", "Sheet1!$B$1").unwrap();

        let listed = list_named_ranges(&book, &["MARKER"]);
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "KEEP");
    }

    #[test]
    fn kind_derivation_covers_error_formula_and_range() {
        let mut book = two_sheet_book();
        add_named_range(&mut book, WORKBOOK_SCOPE, "Broken", "Sheet1!#REF!").unwrap();
        add_named_range(
            &mut book,
            WORKBOOK_SCOPE,
            "Calc",
            "SUM(Sheet1!$A$1:$A$4)",
        )
        .unwrap();
        add_named_range(&mut book, WORKBOOK_SCOPE, "Plain", "Sheet1!$A$1").unwrap();

        let listed = list_named_ranges(&book, &[]);
        let kind_of = |name: &str| {
            listed
                .iter()
                .find(|range| range.name == name)
                .map(|range| range.kind)
                .unwrap()
        };
        assert_eq!(kind_of("Broken"), NamedRangeKind::Error);
        assert_eq!(kind_of("Calc"), NamedRangeKind::Formula);
        assert_eq!(kind_of("Plain"), NamedRangeKind::Range);
    }

    #[test]
    fn value_resolves_first_cell_of_plain_references() {
        let mut book = two_sheet_book();
        book.get_sheet_by_name_mut("Sheet1")
            .unwrap()
            .get_cell_mut("A1")
            .set_value("hello");
        add_named_range(&mut book, WORKBOOK_SCOPE, "Greeting", "Sheet1!$A$1:$B$2").unwrap();

        let listed = list_named_ranges(&book, &[]);
        assert_eq!(listed[0].value, "hello");
    }

    #[test]
    fn leading_equals_is_stripped_on_add() {
        let mut book = two_sheet_book();
        add_named_range(&mut book, WORKBOOK_SCOPE, "Eq", "=Sheet1!$A$1").unwrap();
        let listed = list_named_ranges(&book, &[]);
        assert_eq!(listed[0].formula, "Sheet1!$A$1");
    }

    #[test]
    fn add_rejects_missing_scope_sheet() {
        let mut book = two_sheet_book();
        let err = add_named_range(&mut book, "Missing", "X", "Missing!$A$1").unwrap_err();
        assert!(err.to_string().starts_with("SheetNotFound:"));
    }

    #[test]
    fn delete_is_scope_aware() {
        let mut book = two_sheet_book();
        add_named_range(&mut book, WORKBOOK_SCOPE, "Dup", "Sheet1!$A$1").unwrap();
        add_named_range(&mut book, "Data", "Dup", "Data!$A$1").unwrap();

        delete_named_range(&mut book, "Data", "Dup").unwrap();
        let listed = list_named_ranges(&book, &[]);
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].scope, WORKBOOK_SCOPE);

        let err = delete_named_range(&mut book, "Data", "Dup").unwrap_err();
        assert!(err.to_string().starts_with("NamedRangeNotFound:"));
    }

    #[test]
    fn remove_everywhere_ignores_scope_and_is_idempotent() {
        let mut book = two_sheet_book();
        add_named_range(&mut book, WORKBOOK_SCOPE, "Marker", "Sheet1!$A$1").unwrap();
        add_named_range(&mut book, "Data", "Marker", "Data!$A$1").unwrap();

        remove_name_everywhere(&mut book, "Marker");
        assert!(!name_exists(&book, "Marker"));
        remove_name_everywhere(&mut book, "Marker");
    }
}
