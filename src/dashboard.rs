//! Chart series and table search over parsed project records.
//!
//! These are the numbers the dashboard plots; drawing them is someone
//! else's job.

use serde::Serialize;

use crate::records::project::{
    ACTUAL_EXPENSES, NEXT_YEAR_FORECAST, PREVIOUS_YEAR_VOW, PROGRESS, PROJECT_NAME,
    PROJECT_STATUS, TOTAL_BUDGET,
};
use crate::records::{Dataset, FieldValue, Record};

/// Pie chart: how many projects sit in each status.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StatusCount {
    pub status: String,
    pub count: usize,
}

/// Grouped bar chart: budget and actual spend per project.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct BudgetSeries {
    pub projects: Vec<FieldValue>,
    pub budget: Vec<FieldValue>,
    pub actual: Vec<FieldValue>,
}

/// Line chart: progress per project.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ProgressSeries {
    pub projects: Vec<FieldValue>,
    pub progress: Vec<FieldValue>,
}

/// Overlaid histograms of next year's forecast and last year's spend.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ForecastHistograms {
    pub next_year_forecast: Vec<FieldValue>,
    pub previous_year: Vec<FieldValue>,
}

/// Everything the four charts need, in one serializable value.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ChartData {
    pub status_distribution: Vec<StatusCount>,
    pub budget_vs_actual: BudgetSeries,
    pub progress: ProgressSeries,
    pub forecast: ForecastHistograms,
}

fn field(rec: &Record, name: &str) -> FieldValue {
    rec.get(name).cloned().unwrap_or(FieldValue::Missing)
}

/// Counts per `Project Status` in first-seen order. Missing statuses are
/// counted under the placeholder.
pub fn status_distribution(records: &[Record]) -> Vec<StatusCount> {
    let mut out: Vec<StatusCount> = Vec::new();
    for rec in records {
        let status = field(rec, PROJECT_STATUS).to_string();
        match out.iter_mut().find(|s| s.status == status) {
            Some(entry) => entry.count += 1,
            None => out.push(StatusCount { status, count: 1 }),
        }
    }
    out
}

pub fn budget_vs_actual(records: &[Record]) -> BudgetSeries {
    BudgetSeries {
        projects: records.iter().map(|r| field(r, PROJECT_NAME)).collect(),
        budget: records.iter().map(|r| field(r, TOTAL_BUDGET)).collect(),
        actual: records.iter().map(|r| field(r, ACTUAL_EXPENSES)).collect(),
    }
}

pub fn progress_series(records: &[Record]) -> ProgressSeries {
    ProgressSeries {
        projects: records.iter().map(|r| field(r, PROJECT_NAME)).collect(),
        progress: records.iter().map(|r| field(r, PROGRESS)).collect(),
    }
}

/// Histogram inputs with falsy values (missing, zero, empty) dropped.
pub fn forecast_histograms(records: &[Record]) -> ForecastHistograms {
    let truthy = |name: &str| -> Vec<FieldValue> {
        records
            .iter()
            .map(|r| field(r, name))
            .filter(FieldValue::is_truthy)
            .collect()
    };
    ForecastHistograms {
        next_year_forecast: truthy(NEXT_YEAR_FORECAST),
        previous_year: truthy(PREVIOUS_YEAR_VOW),
    }
}

pub fn chart_data(records: &[Record]) -> ChartData {
    ChartData {
        status_distribution: status_distribution(records),
        budget_vs_actual: budget_vs_actual(records),
        progress: progress_series(records),
        forecast: forecast_histograms(records),
    }
}

/// Keeps the latest dataset so the table can be re-filtered without a fetch.
#[derive(Debug, Default)]
pub struct Dashboard {
    current: Option<Dataset>,
}

impl Dashboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the retained dataset wholesale; nothing is merged.
    pub fn replace(&mut self, dataset: Dataset) {
        self.current = Some(dataset);
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        self.current.as_ref()
    }

    pub fn records(&self) -> &[Record] {
        self.current
            .as_ref()
            .map(|d| d.records.as_slice())
            .unwrap_or(&[])
    }

    pub fn charts(&self) -> ChartData {
        chart_data(self.records())
    }

    /// Records where any field's display text contains `query`,
    /// ignoring case. A blank query matches everything.
    pub fn search(&self, query: &str) -> Vec<&Record> {
        search(self.records(), query)
    }
}

pub fn search<'a>(records: &'a [Record], query: &str) -> Vec<&'a Record> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return records.iter().collect();
    }
    records
        .iter()
        .filter(|rec| {
            rec.iter()
                .any(|(_, v)| v.to_string().to_lowercase().contains(&needle))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{parse, parse_with, CsvOptions};

    const EXPORT: &str = "\
Project Name,Project Status,Total Project Budget,Project Actual Expenses,Project Progress,Next Years Forecast,Previous Year VOW
Dam Repair,On Track,5000,1200,40,3000,0
Trail Signs,Delayed,800,900,75,,450
\"Marina, East\",On Track,12000,,10,0,N/A
Visitor Centre,,2000,100,5,1500,700
";

    #[test]
    fn status_counts_keep_first_seen_order() {
        let records = parse(EXPORT).unwrap();
        assert_eq!(
            status_distribution(&records),
            vec![
                StatusCount { status: "On Track".into(), count: 2 },
                StatusCount { status: "Delayed".into(), count: 1 },
                StatusCount { status: "N/A".into(), count: 1 },
            ]
        );
    }

    #[test]
    fn budget_and_progress_series_align_with_rows() {
        let records = parse(EXPORT).unwrap();
        let budget = budget_vs_actual(&records);
        assert_eq!(budget.projects.len(), 4);
        assert_eq!(budget.projects[2], FieldValue::Text("Marina, East".into()));
        assert_eq!(budget.budget[0], FieldValue::Number(5000.0));
        assert_eq!(budget.actual[2], FieldValue::Missing);

        let progress = progress_series(&records);
        assert_eq!(
            progress.progress,
            vec![
                FieldValue::Number(40.0),
                FieldValue::Number(75.0),
                FieldValue::Number(10.0),
                FieldValue::Number(5.0),
            ]
        );
    }

    #[test]
    fn histograms_drop_falsy_values() {
        let records = parse(EXPORT).unwrap();
        let hist = forecast_histograms(&records);
        assert_eq!(
            hist.next_year_forecast,
            vec![FieldValue::Number(3000.0), FieldValue::Number(1500.0)]
        );
        assert_eq!(
            hist.previous_year,
            vec![FieldValue::Number(450.0), FieldValue::Number(700.0)]
        );
    }

    #[test]
    fn search_recomputes_from_retained_dataset() {
        let mut dash = Dashboard::new();
        assert!(dash.search("anything").is_empty());

        dash.replace(parse_with(EXPORT, &CsvOptions::default()).unwrap());
        assert_eq!(dash.search("").len(), 4);
        assert_eq!(dash.search("  on track ").len(), 2);
        assert_eq!(dash.search("marina").len(), 1);
        assert_eq!(dash.search("12000").len(), 1);
        assert!(dash.search("nothing like this").is_empty());
        assert_eq!(dash.charts().status_distribution.len(), 3);
    }
}
