use async_trait::async_trait;
use std::path::PathBuf;
use tracing::info;

use super::csv_sink::write_atomically;
use crate::app::ports::ReportSinkPort;
use crate::pipeline::processing::validator::RunReport;

/// Writes the run report as a pretty-printed JSON document
pub struct JsonReportAdapter {
    path: PathBuf,
}

impl JsonReportAdapter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ReportSinkPort for JsonReportAdapter {
    async fn write_report(&self, report: &RunReport) -> anyhow::Result<()> {
        let json = serde_json::to_vec_pretty(report)?;
        write_atomically(&self.path, &json).await?;
        info!("Run report {} written to {}", report.run_id, self.path.display());
        Ok(())
    }
}

/// Logs the report summary instead of writing a file
pub struct LogReportAdapter;

#[async_trait]
impl ReportSinkPort for LogReportAdapter {
    async fn write_report(&self, report: &RunReport) -> anyhow::Result<()> {
        info!(
            "Run {}: counts {:?}, nulls {:?}, {} date parse failures, {} violations",
            report.run_id,
            report.counts,
            report.null_counts,
            report.date_parse_failures,
            report.violations.len()
        );
        Ok(())
    }
}
