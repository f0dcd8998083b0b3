//! Step outputs for the CI runner (`$GITHUB_OUTPUT`).

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use apicuron_core::pipeline::RunSummary;

const DELIMITER: &str = "APICURON_REPORTS_EOF";

/// Append `report_count`, `submitted` and `reports` (JSON) to the output file.
pub fn append_github_output(path: &Path, summary: &RunSummary) -> Result<()> {
    let reports = serde_json::to_string(&summary.reports)?;
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    writeln!(file, "report_count={}", summary.reports.len())?;
    writeln!(file, "submitted={}", summary.submitted)?;
    writeln!(file, "reports<<{}", DELIMITER)?;
    writeln!(file, "{}", reports)?;
    writeln!(file, "{}", DELIMITER)?;
    Ok(())
}
