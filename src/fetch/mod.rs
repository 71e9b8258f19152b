pub mod drive;

pub use drive::{DriveFetcher, RemoteFile};

use tracing::info;

use crate::auth::AccessToken;
use crate::error::Result;
use crate::records::{self, CsvOptions, Dataset};

/// Shape of a downloaded export.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    /// A `.csv` or `.json` file name decides; otherwise JSON when the body
    /// opens with `[`, CSV if not.
    pub fn detect(name: Option<&str>, text: &str) -> Self {
        let ext = name.map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some(n) if n.ends_with(".json") => return ExportFormat::Json,
            Some(n) if n.ends_with(".csv") => return ExportFormat::Csv,
            _ => {}
        }
        if text.trim_start_matches('\u{feff}').trim_start().starts_with('[') {
            ExportFormat::Json
        } else {
            ExportFormat::Csv
        }
    }
}

/// Parse an export body in whichever format it is in.
pub fn parse_export(name: Option<&str>, text: &str, opts: &CsvOptions) -> Result<Dataset> {
    match ExportFormat::detect(name, text) {
        ExportFormat::Json => records::parse_json(text.trim_start_matches('\u{feff}')),
        ExportFormat::Csv => records::parse_with(text, opts),
    }
}

/// Download the export with `token` and turn it into records.
pub async fn load_records(
    fetcher: &DriveFetcher,
    token: &AccessToken,
    opts: &CsvOptions,
) -> Result<Dataset> {
    let file = fetcher.fetch_file(token).await?;
    let dataset = parse_export(file.name.as_deref(), &file.text, opts)?;
    info!(
        records = dataset.len(),
        warnings = dataset.warnings.len(),
        "parsed export"
    );
    Ok(dataset)
}
