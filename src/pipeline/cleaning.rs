use chrono::Utc;
use std::time::Instant;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::config::CleaningConfig;
use crate::domain::{CleanRecord, RawRecord};
use crate::error::Result;
use crate::observability::metrics;
use crate::pipeline::index::LookupIndexes;
use crate::pipeline::ingestion::stage;
use crate::pipeline::processing::convert::DateConverter;
use crate::pipeline::processing::dedup::Deduplicator;
use crate::pipeline::processing::enrich::enrich;
use crate::pipeline::processing::filter::filter_rows;
use crate::pipeline::processing::normalize::Normalizer;
use crate::pipeline::processing::validator::{RunReport, StageCounts, ValidationInput, Validator};

/// Result of one complete run over an in-memory table
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub clean: Vec<CleanRecord>,
    pub indexes: Option<LookupIndexes>,
    pub report: RunReport,
}

/// The seven cleaning stages, run in fixed order over a fully loaded table.
///
/// Each stage reads the previous stage's output and returns a new collection,
/// so a run never mutates the raw records it was given. Deduplication runs a
/// second time right after normalization so rows that only match once
/// canonicalized are ranked and dropped like any other duplicate.
pub struct CleaningPipeline {
    deduplicator: Deduplicator,
    normalizer: Normalizer,
    converter: DateConverter,
    write_indexes: bool,
}

impl CleaningPipeline {
    pub fn new(config: &CleaningConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            deduplicator: Deduplicator::new(&config.dedup),
            normalizer: Normalizer::new(&config.normalize)?,
            converter: DateConverter::new(&config.dates.format),
            write_indexes: config.output.write_indexes,
        })
    }

    #[instrument(skip_all, fields(raw = raw.len()))]
    pub fn run(&self, raw: &[RawRecord]) -> Result<PipelineOutcome> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let timer = Instant::now();
        info!("Starting cleaning run {} over {} raw records", run_id, raw.len());

        let staged = stage(raw);

        let deduped = self.deduplicator.deduplicate(&staged);
        metrics::dedup::discarded(deduped.discarded, deduped.duplicate_groups);

        let normalized = self.normalizer.normalize(&deduped.records);
        for (field, count) in &normalized.rewrites {
            metrics::normalize::rewrites(*field, *count);
        }
        metrics::normalize::blanks_nulled(normalized.nulled);

        let canonical = self.deduplicator.deduplicate(&normalized.records);
        metrics::dedup::discarded(canonical.discarded, canonical.duplicate_groups);

        let converted = self.converter.convert(&canonical.records);
        metrics::convert::date_failures(converted.date_failures.len());
        metrics::convert::numeric_failures(converted.numeric_failures.len());

        let enriched = enrich(&converted.records);
        metrics::enrich::enriched(enriched.enriched, enriched.conflicting_keys);

        let filtered = filter_rows(&enriched.records);
        metrics::filter::dropped(filtered.dropped);

        let validation = Validator::validate(
            &filtered.records,
            ValidationInput {
                run_id,
                started_at,
                raw: raw.len(),
                staged: deduped.records.len(),
                stages: StageCounts {
                    dedup_discarded: deduped.discarded + canonical.discarded,
                    dedup_groups: deduped.duplicate_groups + canonical.duplicate_groups,
                    normalize_rewrites: normalized.rewrites.clone(),
                    blanks_nulled: normalized.nulled,
                    enriched: enriched.enriched,
                    conflicting_donor_keys: enriched.conflicting_keys,
                    filter_dropped: filtered.dropped,
                },
                date_failures: converted.date_failures,
                numeric_failures: converted.numeric_failures,
            },
        )?;

        let report = validation.report;
        metrics::validate::clean_set(report.counts.clean, report.violations.len());

        let indexes = self
            .write_indexes
            .then(|| LookupIndexes::build(&validation.clean));

        let elapsed = timer.elapsed().as_secs_f64();
        metrics::run::completed(elapsed);
        info!(
            "Run {} finished in {:.3}s: {} raw -> {} clean (digest {})",
            run_id, elapsed, report.counts.raw, report.counts.clean, report.output_digest
        );

        Ok(PipelineOutcome {
            clean: validation.clean,
            indexes,
            report,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Field;

    fn raw(row: usize, cells: [&str; 9]) -> RawRecord {
        RawRecord::from_cells(row, cells.map(|c| Some(c.to_string())))
    }

    fn pipeline() -> CleaningPipeline {
        CleaningPipeline::new(&CleaningConfig::default()).unwrap()
    }

    #[test]
    fn crypto_spellings_end_up_as_one_record() {
        let records = vec![
            raw(1, ["Coinbase", "SF Bay Area", "Crypto Currency", "100", "0.1", "3/14/2023", "Post-IPO", "United States", "500"]),
            raw(2, ["Coinbase", "SF Bay Area", "CryptoCurrency", "100", "0.1", "3/14/2023", "Post-IPO", "United States", "500"]),
        ];

        let outcome = pipeline().run(&records).unwrap();

        assert_eq!(outcome.clean.len(), 1);
        assert_eq!(outcome.clean[0].industry.as_deref(), Some("Crypto"));
        assert_eq!(outcome.report.counts.staged, 2);
        assert_eq!(outcome.report.stages.dedup_discarded, 1);
        assert_eq!(outcome.report.duplicate_groups, 0);
        assert!(outcome.report.is_consistent());
    }

    #[test]
    fn configured_key_stays_unique_after_trimming() {
        let mut config = CleaningConfig::default();
        config.dedup.key = vec![Field::Company, Field::Date];
        let records = vec![
            raw(1, ["Acme ", "NYC", "Retail", "10", "", "1/2/2023", "Seed", "Canada", ""]),
            raw(2, ["Acme", "Toronto", "", "12", "", "1/2/2023", "Seed", "Canada", ""]),
        ];

        let outcome = CleaningPipeline::new(&config).unwrap().run(&records).unwrap();

        // Raw text differs, so only the pass after normalization groups them
        assert_eq!(outcome.report.counts.staged, 2);
        assert_eq!(outcome.clean.len(), 1);
        assert_eq!(outcome.clean[0].location.as_deref(), Some("NYC"));
        assert_eq!(outcome.report.stages.dedup_discarded, 1);
        assert_eq!(outcome.report.stages.dedup_groups, 1);
        assert!(outcome.report.is_consistent());
    }

    #[test]
    fn normalized_duplicates_follow_the_rank_order() {
        let records = vec![
            raw(1, ["Acme", "NYC", "", "10", "", "1/2/2023", "Seed", "Canada", ""]),
            raw(2, [" Acme", "NYC", "Retail", "10", "", "1/2/2023", "Seed", "Canada", ""]),
        ];
        let mut config = CleaningConfig::default();
        config.dedup.key = vec![Field::Company, Field::Location, Field::Date];

        let outcome = CleaningPipeline::new(&config).unwrap().run(&records).unwrap();

        assert_eq!(outcome.clean.len(), 1);
        assert_eq!(outcome.clean[0].industry.as_deref(), Some("Retail"));
    }

    #[test]
    fn raw_input_is_left_untouched() {
        let records = vec![raw(1, [" Acme ", "NYC", "", "", "", "", "", "", ""])];
        let before = records.clone();

        let outcome = pipeline().run(&records).unwrap();

        assert_eq!(records, before);
        assert!(outcome.clean.is_empty());
        assert_eq!(outcome.report.stages.filter_dropped, 1);
    }

    #[test]
    fn indexes_follow_the_output_config() {
        let records = vec![raw(1, ["Acme", "NYC", "Retail", "5", "", "1/2/2023", "Seed", "Canada", ""])];

        let with = pipeline().run(&records).unwrap();
        assert_eq!(with.indexes.unwrap().rows_for_company("Acme"), &[0]);

        let mut config = CleaningConfig::default();
        config.output.write_indexes = false;
        let without = CleaningPipeline::new(&config).unwrap().run(&records).unwrap();
        assert!(without.indexes.is_none());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = CleaningConfig::default();
        config.dedup.key.clear();
        assert!(CleaningPipeline::new(&config).is_err());
    }
}
