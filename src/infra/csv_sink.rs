use anyhow::Context;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

use crate::app::ports::CleanSinkPort;
use crate::domain::{write_clean_csv, CleanRecord};
use crate::pipeline::index::LookupIndexes;

/// Commits the clean table to a CSV file, replacing it atomically.
///
/// Content is written to a temp file in the destination directory and renamed
/// over the destination only after the write completes. The lookup index
/// sidecar, when present, is renamed into place only after the table.
pub struct CsvFileSink {
    path: PathBuf,
}

impl CsvFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Sidecar path for the lookup indexes: `<table>.indexes.json`
    pub fn index_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".indexes.json");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl CleanSinkPort for CsvFileSink {
    async fn commit(&self, records: &[CleanRecord], indexes: Option<&LookupIndexes>) -> anyhow::Result<()> {
        let mut table = Vec::new();
        write_clean_csv(records, &mut table).context("Failed to encode clean table")?;

        let sidecar = match indexes {
            Some(indexes) => {
                let json = serde_json::to_vec_pretty(indexes)?;
                Some(write_temp(&self.index_path(), &json).await?)
            }
            None => None,
        };

        let staged = match write_temp(&self.path, &table).await {
            Ok(staged) => staged,
            Err(e) => {
                discard(sidecar.as_deref()).await;
                return Err(e);
            }
        };

        if let Err(e) = promote(&staged, &self.path).await {
            discard(sidecar.as_deref()).await;
            return Err(e);
        }
        if let Some(sidecar) = sidecar {
            promote(&sidecar, &self.index_path()).await?;
        }

        info!("Wrote {} clean records to {}", records.len(), self.path.display());
        Ok(())
    }
}

/// Write `bytes` to `<path>.tmp-<uuid>` then rename it over `path`
pub async fn write_atomically(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    let temp_path = write_temp(path, bytes).await?;
    promote(&temp_path, path).await?;
    debug!("Committed {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

/// Write `bytes` next to `path` under a unique temp name and return that name
async fn write_temp(path: &Path, bytes: &[u8]) -> anyhow::Result<PathBuf> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    let mut temp_name = path.file_name().unwrap_or_default().to_os_string();
    temp_name.push(format!(".tmp-{}", Uuid::new_v4()));
    let temp_path = path.with_file_name(temp_name);

    if let Err(e) = tokio::fs::write(&temp_path, bytes).await {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(e).with_context(|| format!("Failed to write {}", temp_path.display()));
    }

    Ok(temp_path)
}

async fn promote(temp_path: &Path, path: &Path) -> anyhow::Result<()> {
    if let Err(e) = tokio::fs::rename(temp_path, path).await {
        discard(Some(temp_path)).await;
        return Err(e).with_context(|| format!("Failed to move output into {}", path.display()));
    }
    Ok(())
}

async fn discard(temp_path: Option<&Path>) {
    if let Some(temp_path) = temp_path {
        let _ = tokio::fs::remove_file(temp_path).await;
    }
}
