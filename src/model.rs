use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Scope label for names visible from every worksheet.
pub const WORKBOOK_SCOPE: &str = "Workbook";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(transparent)]
pub struct WorkbookId(pub String);

impl WorkbookId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for WorkbookId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkbookDescriptor {
    pub workbook_id: WorkbookId,
    pub short_id: String,
    pub slug: String,
    pub folder: Option<String>,
    pub path: String,
    pub bytes: u64,
    pub last_modified: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkbookListResponse {
    pub workbooks: Vec<WorkbookDescriptor>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkbookDescription {
    pub workbook_id: WorkbookId,
    pub short_id: String,
    pub slug: String,
    pub path: String,
    pub bytes: u64,
    pub sheet_count: usize,
    pub defined_names: usize,
    pub last_modified: Option<String>,
}

/// Resolved type of a defined name's stored reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum NamedRangeKind {
    Range,
    Formula,
    Error,
}

impl NamedRangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NamedRangeKind::Range => "Range",
            NamedRangeKind::Formula => "Formula",
            NamedRangeKind::Error => "Error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct NamedRange {
    pub name: String,
    /// Stored reference, without a leading `=`.
    pub formula: String,
    /// `Workbook` or the owning worksheet's name.
    pub scope: String,
    pub kind: NamedRangeKind,
    /// Best-effort value of the first referenced cell, empty when the
    /// reference is not a plain `Sheet!$A$1`-style address.
    pub value: String,
    pub comment: String,
    pub visible: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NamedRangesResponse {
    pub workbook_id: WorkbookId,
    pub workbook_short_id: String,
    pub named_ranges: Vec<NamedRange>,
}

/// Per-row validation verdicts for an add-form row.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema)]
pub struct RowValidations {
    pub is_name_non_empty: bool,
    pub is_formula_non_empty: bool,
    pub is_name_valid: bool,
}

impl RowValidations {
    pub fn all_pass(&self) -> bool {
        self.is_name_non_empty && self.is_formula_non_empty && self.is_name_valid
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AddCandidate {
    pub name: String,
    pub formula: String,
    pub scope: String,
    pub validations: RowValidations,
    /// Raw host error message when the commit for this row failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EditOperation {
    pub old_name: String,
    pub old_formula: String,
    pub old_scope: String,
    pub new_name: String,
    pub new_formula: String,
    pub new_scope: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Set when restoring the original name after a failed edit also failed,
    /// meaning the name is lost from the workbook.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rollback_error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "outcome")]
pub enum AddOutcome {
    Added { count: usize },
    NothingToAdd,
    InvalidInput { rows: Vec<AddCandidate> },
    FailedToAdd { rows: Vec<AddCandidate> },
    HostError { error_code: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "outcome")]
pub enum EditOutcome {
    Edited { count: usize },
    NothingToEdit,
    FailedToEdit { rows: Vec<EditOperation> },
    HostError { error_code: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "outcome")]
pub enum FormOutcome {
    /// The wizard sheet and its marker are in place. `rebuilt` is false when
    /// an intact form was already present and nothing was touched.
    Ready { rebuilt: bool },
    NoExistingNamedRanges,
    HostError { error_code: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FormResponse {
    pub workbook_id: WorkbookId,
    pub workbook_short_id: String,
    pub sheet_name: String,
    #[serde(flatten)]
    pub outcome: FormOutcome,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DiscardFormResponse {
    pub workbook_id: WorkbookId,
    pub workbook_short_id: String,
    pub sheet_name: String,
    pub removed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AddNamedRangesResponse {
    pub workbook_id: WorkbookId,
    pub workbook_short_id: String,
    #[serde(flatten)]
    pub outcome: AddOutcome,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EditNamedRangesResponse {
    pub workbook_id: WorkbookId,
    pub workbook_short_id: String,
    #[serde(flatten)]
    pub outcome: EditOutcome,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExportResponse {
    pub workbook_id: WorkbookId,
    pub workbook_short_id: String,
    pub sheet_name: String,
    /// Written row count, header included.
    pub rows_written: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct InvalidNamedRangesResponse {
    pub workbook_id: WorkbookId,
    pub workbook_short_id: String,
    pub invalid_named_ranges: Vec<NamedRange>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcomes_serialize_with_discriminant() {
        let outcome = AddOutcome::HostError {
            error_code: "FormNotFound".to_string(),
        };
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["outcome"], "HostError");
        assert_eq!(value["error_code"], "FormNotFound");

        let empty = serde_json::to_value(EditOutcome::NothingToEdit).unwrap();
        assert_eq!(empty["outcome"], "NothingToEdit");
    }

    #[test]
    fn row_errors_are_omitted_until_set() {
        let candidate = AddCandidate {
            name: "Total".into(),
            formula: "Sheet1!$A$1".into(),
            scope: WORKBOOK_SCOPE.into(),
            validations: RowValidations {
                is_name_non_empty: true,
                is_formula_non_empty: true,
                is_name_valid: true,
            },
            error: None,
        };
        let value = serde_json::to_value(&candidate).unwrap();
        assert!(value.get("error").is_none());
    }
}
