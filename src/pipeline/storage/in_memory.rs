use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::app::ports::{CleanSinkPort, RecordSourcePort, ReportSinkPort};
use crate::domain::{CleanRecord, RawRecord};
use crate::error::LoadError;
use crate::pipeline::index::LookupIndexes;
use crate::pipeline::processing::validator::RunReport;

/// In-memory source, sink and report store for development/testing
#[derive(Clone, Default)]
pub struct InMemoryStorage {
    raw: Arc<Vec<RawRecord>>,
    committed: Arc<Mutex<Option<Vec<CleanRecord>>>>,
    indexes: Arc<Mutex<Option<LookupIndexes>>>,
    reports: Arc<Mutex<Vec<RunReport>>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_raw(raw: Vec<RawRecord>) -> Self {
        Self {
            raw: Arc::new(raw),
            ..Self::default()
        }
    }

    /// The last committed clean table, `None` if nothing was ever committed
    pub async fn committed(&self) -> Option<Vec<CleanRecord>> {
        self.committed.lock().await.clone()
    }

    pub async fn indexes(&self) -> Option<LookupIndexes> {
        self.indexes.lock().await.clone()
    }

    pub async fn reports(&self) -> Vec<RunReport> {
        self.reports.lock().await.clone()
    }
}

#[async_trait]
impl RecordSourcePort for InMemoryStorage {
    async fn load(&self) -> Result<Vec<RawRecord>, LoadError> {
        Ok(self.raw.as_ref().clone())
    }

    fn describe(&self) -> String {
        format!("in-memory table of {} rows", self.raw.len())
    }
}

#[async_trait]
impl CleanSinkPort for InMemoryStorage {
    async fn commit(&self, records: &[CleanRecord], indexes: Option<&LookupIndexes>) -> anyhow::Result<()> {
        *self.committed.lock().await = Some(records.to_vec());
        *self.indexes.lock().await = indexes.cloned();
        debug!("Committed {} clean records in memory", records.len());
        Ok(())
    }
}

#[async_trait]
impl ReportSinkPort for InMemoryStorage {
    async fn write_report(&self, report: &RunReport) -> anyhow::Result<()> {
        self.reports.lock().await.push(report.clone());
        Ok(())
    }
}
