use async_trait::async_trait;

use crate::domain::{CleanRecord, RawRecord};
use crate::error::LoadError;
use crate::pipeline::index::LookupIndexes;
use crate::pipeline::processing::validator::RunReport;

/// Where the raw table comes from
#[async_trait]
pub trait RecordSourcePort: Send + Sync {
    /// Load every raw record, or fail before anything downstream runs
    async fn load(&self) -> Result<Vec<RawRecord>, LoadError>;

    /// Human-readable description of the source for logs
    fn describe(&self) -> String;
}

/// Where the clean table is committed. A commit is all or nothing.
#[async_trait]
pub trait CleanSinkPort: Send + Sync {
    async fn commit(&self, records: &[CleanRecord], indexes: Option<&LookupIndexes>) -> anyhow::Result<()>;
}

#[async_trait]
pub trait ReportSinkPort: Send + Sync {
    async fn write_report(&self, report: &RunReport) -> anyhow::Result<()>;
}
