//! Validator: projects the surviving records into the clean table and
//! produces the run report.
//!
//! Nothing here mutates a record. Invariant violations are reported as
//! [`ConsistencyError`]s and it is up to the caller whether they fail the run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use tracing::{error, info};
use uuid::Uuid;

use super::enrich::DonorMap;
use super::filter::has_quantitative_signal;
use crate::constants::{MAX_REPORTED_PARSE_FAILURES, REPORT_SCHEMA_VERSION};
use crate::domain::{write_clean_csv, CleanRecord, Field, WorkingRecord};
use crate::error::{ConsistencyError, DateParseError, NumericParseError, Result};

/// Record counts at the three checkpoints
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordCounts {
    pub raw: usize,
    /// After deduplication
    pub staged: usize,
    pub clean: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NullCounts {
    pub company: usize,
    pub date: usize,
    pub industry: usize,
    pub country: usize,
}

impl NullCounts {
    pub fn of(records: &[CleanRecord]) -> Self {
        records.iter().fold(Self::default(), |mut counts, record| {
            counts.company += record.company.is_none() as usize;
            counts.date += record.date.is_none() as usize;
            counts.industry += record.industry.is_none() as usize;
            counts.country += record.country.is_none() as usize;
            counts
        })
    }
}

/// What each stage did, as reported by the stage itself
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageCounts {
    pub dedup_discarded: usize,
    pub dedup_groups: usize,
    pub normalize_rewrites: BTreeMap<Field, usize>,
    pub blanks_nulled: usize,
    pub enriched: usize,
    pub conflicting_donor_keys: usize,
    pub filter_dropped: usize,
}

/// First few parse failures, kept for diagnosis
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureSamples {
    pub dates: Vec<DateParseError>,
    pub numbers: Vec<NumericParseError>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub schema_version: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub counts: RecordCounts,
    /// Groups of identical clean records; anything above zero is a defect
    pub duplicate_groups: usize,
    pub null_counts: NullCounts,
    pub date_parse_failures: usize,
    pub numeric_parse_failures: usize,
    pub stages: StageCounts,
    pub failure_samples: FailureSamples,
    pub violations: Vec<ConsistencyError>,
    /// SHA-256 of the clean table as CSV
    pub output_digest: String,
}

impl RunReport {
    pub fn is_consistent(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Everything the earlier stages hand to the validator
#[derive(Debug, Clone)]
pub struct ValidationInput {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub raw: usize,
    pub staged: usize,
    pub stages: StageCounts,
    pub date_failures: Vec<DateParseError>,
    pub numeric_failures: Vec<NumericParseError>,
}

#[derive(Debug, Clone)]
pub struct Validation {
    pub clean: Vec<CleanRecord>,
    pub report: RunReport,
}

pub struct Validator;

impl Validator {
    pub fn validate(records: &[WorkingRecord], input: ValidationInput) -> Result<Validation> {
        let clean: Vec<CleanRecord> = records.iter().map(CleanRecord::from).collect();

        let duplicate_groups = duplicate_groups(&clean);
        let violations = check_invariants(records, duplicate_groups);
        for violation in &violations {
            error!("Consistency violation: {}", violation);
        }

        let mut encoded = Vec::new();
        write_clean_csv(&clean, &mut encoded)?;
        let output_digest = hex::encode(Sha256::digest(&encoded));

        let report = RunReport {
            run_id: input.run_id,
            schema_version: REPORT_SCHEMA_VERSION.to_string(),
            started_at: input.started_at,
            finished_at: Utc::now(),
            counts: RecordCounts {
                raw: input.raw,
                staged: input.staged,
                clean: clean.len(),
            },
            duplicate_groups,
            null_counts: NullCounts::of(&clean),
            date_parse_failures: input.date_failures.len(),
            numeric_parse_failures: input.numeric_failures.len(),
            stages: input.stages,
            failure_samples: FailureSamples {
                dates: input
                    .date_failures
                    .into_iter()
                    .take(MAX_REPORTED_PARSE_FAILURES)
                    .collect(),
                numbers: input
                    .numeric_failures
                    .into_iter()
                    .take(MAX_REPORTED_PARSE_FAILURES)
                    .collect(),
            },
            violations,
            output_digest,
        };

        info!(
            "Validated clean set: {} raw, {} staged, {} clean, {} duplicate groups, {} violations",
            report.counts.raw,
            report.counts.staged,
            report.counts.clean,
            report.duplicate_groups,
            report.violations.len()
        );

        Ok(Validation { clean, report })
    }
}

fn duplicate_groups(clean: &[CleanRecord]) -> usize {
    let mut sizes: HashMap<&CleanRecord, usize> = HashMap::new();
    for record in clean {
        *sizes.entry(record).or_default() += 1;
    }
    sizes.values().filter(|&&size| size > 1).count()
}

fn check_invariants(records: &[WorkingRecord], duplicate_groups: usize) -> Vec<ConsistencyError> {
    let mut violations = Vec::new();

    if duplicate_groups > 0 {
        violations.push(ConsistencyError::DuplicateGroups {
            groups: duplicate_groups,
        });
    }

    let missing = records.iter().filter(|r| !has_quantitative_signal(r)).count();
    if missing > 0 {
        violations.push(ConsistencyError::MissingQuantities { records: missing });
    }

    let donors = DonorMap::build(records);
    let enrichable = records
        .iter()
        .filter(|r| r.industry.is_none() && donors.donor_for(r).is_some())
        .count();
    if enrichable > 0 {
        violations.push(ConsistencyError::EnrichableIndustry { records: enrichable });
    }

    violations
}
