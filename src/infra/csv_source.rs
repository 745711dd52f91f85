use async_trait::async_trait;
use std::path::PathBuf;
use tracing::info;

use crate::app::ports::RecordSourcePort;
use crate::domain::RawRecord;
use crate::error::LoadError;
use crate::pipeline::ingestion::load_csv;

/// Reads the raw table from a CSV file on disk
pub struct CsvFileSource {
    path: PathBuf,
    null_markers: Vec<String>,
}

impl CsvFileSource {
    pub fn new(path: impl Into<PathBuf>, null_markers: Vec<String>) -> Self {
        Self {
            path: path.into(),
            null_markers,
        }
    }
}

#[async_trait]
impl RecordSourcePort for CsvFileSource {
    async fn load(&self) -> Result<Vec<RawRecord>, LoadError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| LoadError::Unreadable(format!("{}: {}", self.path.display(), e)))?;
        info!("Read {} bytes from {}", bytes.len(), self.path.display());

        load_csv(bytes.as_slice(), &self.null_markers)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
