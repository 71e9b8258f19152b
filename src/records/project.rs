use serde::Serialize;

use super::{FieldValue, Record};

pub const PROJECT_NAME: &str = "Project Name";
pub const PROJECT_STATUS: &str = "Project Status";
pub const TOTAL_BUDGET: &str = "Total Project Budget";
pub const ACTUAL_EXPENSES: &str = "Project Actual Expenses";
pub const PROGRESS: &str = "Project Progress";
pub const NEXT_YEAR_FORECAST: &str = "Next Years Forecast";
pub const PREVIOUS_YEAR_VOW: &str = "Previous Year VOW";

/// Typed view of one row of the PMO budget export.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProjectRecord {
    pub name: String,
    pub status: Option<String>,
    pub total_budget: Option<f64>,
    pub actual_expenses: Option<f64>,
    pub progress: Option<f64>,
    pub next_year_forecast: Option<f64>,
    pub previous_year_vow: Option<f64>,
}

impl ProjectRecord {
    /// Returns `None` when the record has no `Project Name` column, i.e. the
    /// export is not in the project schema and callers should stay generic.
    pub fn from_record(rec: &Record) -> Option<Self> {
        let name = rec.get(PROJECT_NAME)?;
        Some(Self {
            name: display(name).unwrap_or_default(),
            status: rec.get(PROJECT_STATUS).and_then(display),
            total_budget: number(rec, TOTAL_BUDGET),
            actual_expenses: number(rec, ACTUAL_EXPENSES),
            progress: number(rec, PROGRESS),
            next_year_forecast: number(rec, NEXT_YEAR_FORECAST),
            previous_year_vow: number(rec, PREVIOUS_YEAR_VOW),
        })
    }

    /// True when `headers` carry the name column of the project schema.
    pub fn matches_headers<S: AsRef<str>>(headers: &[S]) -> bool {
        headers.iter().any(|h| h.as_ref() == PROJECT_NAME)
    }
}

fn display(v: &FieldValue) -> Option<String> {
    match v {
        FieldValue::Missing => None,
        other => Some(other.to_string()),
    }
}

fn number(rec: &Record, field: &str) -> Option<f64> {
    rec.get(field).and_then(FieldValue::as_number)
}
