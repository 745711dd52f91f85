use anyhow::Result;
use tracing::{error, info, warn};

use crate::app::ports::{CleanSinkPort, RecordSourcePort, ReportSinkPort};
use crate::error::{CleanerError, LoadError};
use crate::observability::metrics;
use crate::pipeline::processing::validator::RunReport;
use crate::pipeline::{CleaningPipeline, PipelineOutcome};

/// Use case for one cleaning run: load, clean, report, commit
pub struct CleanLayoffsUseCase {
    pipeline: CleaningPipeline,
    source: Box<dyn RecordSourcePort>,
    sink: Box<dyn CleanSinkPort>,
    report: Option<Box<dyn ReportSinkPort>>,
    strict: bool,
    dry_run: bool,
}

impl CleanLayoffsUseCase {
    pub fn new(pipeline: CleaningPipeline, source: Box<dyn RecordSourcePort>, sink: Box<dyn CleanSinkPort>) -> Self {
        Self {
            pipeline,
            source,
            sink,
            report: None,
            strict: false,
            dry_run: false,
        }
    }

    pub fn with_report_sink(mut self, report: Box<dyn ReportSinkPort>) -> Self {
        self.report = Some(report);
        self
    }

    /// Refuse to commit when the clean set has consistency violations
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Run every stage and write the report, but never commit the table
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub async fn execute(&self) -> Result<PipelineOutcome> {
        info!("Loading raw records from {}", self.source.describe());
        let raw = match self.source.load().await {
            Ok(raw) => raw,
            Err(e) => {
                error!("Load failed, nothing will be written: {}", e);
                metrics::load::load_error(load_error_kind(&e));
                metrics::run::refused("load");
                return Err(CleanerError::from(e).into());
            }
        };
        metrics::load::records_loaded(raw.len());

        let outcome = self.pipeline.run(&raw)?;

        if let Some(report) = &self.report {
            report.write_report(&outcome.report).await?;
        }

        self.check_commit(&outcome.report)?;

        if self.dry_run {
            warn!("Dry run: {} clean records not committed", outcome.clean.len());
            return Ok(outcome);
        }

        self.sink.commit(&outcome.clean, outcome.indexes.as_ref()).await?;
        info!("Committed {} clean records", outcome.clean.len());

        Ok(outcome)
    }

    /// In strict mode any consistency violation blocks the commit
    fn check_commit(&self, report: &RunReport) -> std::result::Result<(), CleanerError> {
        if self.strict && !report.is_consistent() {
            metrics::run::refused("strict");
            return Err(CleanerError::Consistency(report.violations.clone()));
        }
        Ok(())
    }
}

fn load_error_kind(error: &LoadError) -> &'static str {
    match error {
        LoadError::Unreadable(_) | LoadError::Io(_) => "unreadable",
        LoadError::SchemaMismatch { .. } => "schema_mismatch",
        LoadError::MalformedRow { .. } | LoadError::Csv(_) => "malformed_row",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CleaningConfig;
    use crate::domain::RawRecord;
    use crate::pipeline::storage::InMemoryStorage;
    use async_trait::async_trait;

    struct FailingSource;

    #[async_trait]
    impl RecordSourcePort for FailingSource {
        async fn load(&self) -> std::result::Result<Vec<RawRecord>, LoadError> {
            Err(LoadError::SchemaMismatch {
                missing: vec!["company".to_string()],
                unexpected: vec![],
            })
        }

        fn describe(&self) -> String {
            "failing source".to_string()
        }
    }

    fn raw(row: usize, cells: [&str; 9]) -> RawRecord {
        RawRecord::from_cells(row, cells.map(|c| Some(c.to_string())))
    }

    fn pipeline() -> CleaningPipeline {
        CleaningPipeline::new(&CleaningConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn commits_clean_records_and_writes_report() {
        let storage = InMemoryStorage::with_raw(vec![
            raw(1, ["Airbnb", "SF Bay Area", "", "30", "", "3/14/2023", "Post-IPO", "United States", "6400"]),
            raw(2, ["Airbnb", "SF Bay Area", "Travel", "1900", "0.25", "5/5/2020", "Private Equity", "United States", "5400"]),
        ]);

        let use_case = CleanLayoffsUseCase::new(pipeline(), Box::new(storage.clone()), Box::new(storage.clone()))
            .with_report_sink(Box::new(storage.clone()));
        let outcome = use_case.execute().await.unwrap();

        let committed = storage.committed().await.unwrap();
        assert_eq!(committed, outcome.clean);
        assert!(committed.iter().all(|r| r.industry.as_deref() == Some("Travel")));
        assert_eq!(storage.reports().await.len(), 1);
        assert!(storage.indexes().await.is_some());
    }

    #[tokio::test]
    async fn load_failure_commits_nothing() {
        let storage = InMemoryStorage::new();
        let use_case = CleanLayoffsUseCase::new(pipeline(), Box::new(FailingSource), Box::new(storage.clone()))
            .with_report_sink(Box::new(storage.clone()));

        assert!(use_case.execute().await.is_err());
        assert!(storage.committed().await.is_none());
        assert!(storage.reports().await.is_empty());
    }

    fn inconsistent_report() -> RunReport {
        use crate::domain::WorkingRecord;
        use crate::pipeline::processing::validator::{StageCounts, ValidationInput, Validator};

        let no_quantities = WorkingRecord {
            source_row: 1,
            company: Some("Acme".to_string()),
            ..Default::default()
        };
        let input = ValidationInput {
            run_id: uuid::Uuid::new_v4(),
            started_at: chrono::Utc::now(),
            raw: 1,
            staged: 1,
            stages: StageCounts::default(),
            date_failures: Vec::new(),
            numeric_failures: Vec::new(),
        };
        Validator::validate(&[no_quantities], input).unwrap().report
    }

    #[test]
    fn strict_mode_blocks_inconsistent_commits() {
        let storage = InMemoryStorage::new();
        let report = inconsistent_report();

        let lenient = CleanLayoffsUseCase::new(pipeline(), Box::new(storage.clone()), Box::new(storage.clone()));
        assert!(lenient.check_commit(&report).is_ok());

        let strict = CleanLayoffsUseCase::new(pipeline(), Box::new(storage.clone()), Box::new(storage)).strict(true);
        match strict.check_commit(&report) {
            Err(CleanerError::Consistency(violations)) => assert_eq!(violations, report.violations),
            other => panic!("expected a consistency error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn strict_mode_commits_consistent_runs() {
        let storage = InMemoryStorage::with_raw(vec![raw(
            1,
            ["Acme", "NYC", "Retail", "10", "", "1/2/2023", "Seed", "United States", ""],
        )]);
        let use_case =
            CleanLayoffsUseCase::new(pipeline(), Box::new(storage.clone()), Box::new(storage.clone())).strict(true);

        use_case.execute().await.unwrap();

        assert_eq!(storage.committed().await.map(|c| c.len()), Some(1));
    }

    #[tokio::test]
    async fn dry_run_does_not_commit() {
        let storage = InMemoryStorage::with_raw(vec![raw(
            1,
            ["Acme", "NYC", "Retail", "10", "", "1/2/2023", "Seed", "United States", ""],
        )]);
        let use_case =
            CleanLayoffsUseCase::new(pipeline(), Box::new(storage.clone()), Box::new(storage.clone())).dry_run(true);

        let outcome = use_case.execute().await.unwrap();

        assert_eq!(outcome.clean.len(), 1);
        assert!(storage.committed().await.is_none());
    }
}
