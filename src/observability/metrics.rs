//! Metrics for the cleaning pipeline.
//!
//! Metric names live in [`MetricName`] so no stage uses a magic string. The
//! Prometheus recorder is only installed when a listen address is configured;
//! without it every call below is a no-op.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use std::fmt;
use std::net::SocketAddr;
use tracing::{info, warn};

/// Enum representing all metric names used by the cleaner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Load
    RecordsLoaded,
    LoadErrors,

    // Dedup
    DedupDiscarded,
    DedupGroups,

    // Normalize
    NormalizeRewrites,
    NormalizeBlanksNulled,

    // Convert
    DateParseFailures,
    NumericParseFailures,

    // Enrich
    IndustriesEnriched,
    ConflictingDonors,

    // Filter
    FilterDropped,

    // Validate
    RecordsClean,
    ConsistencyViolations,

    // Run
    RunsCompleted,
    RunsRefused,
    RunDuration,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::RecordsLoaded => "layoffs_records_loaded_total",
            MetricName::LoadErrors => "layoffs_load_errors_total",
            MetricName::DedupDiscarded => "layoffs_dedup_discarded_total",
            MetricName::DedupGroups => "layoffs_dedup_groups_total",
            MetricName::NormalizeRewrites => "layoffs_normalize_rewrites_total",
            MetricName::NormalizeBlanksNulled => "layoffs_normalize_blanks_nulled_total",
            MetricName::DateParseFailures => "layoffs_date_parse_failures_total",
            MetricName::NumericParseFailures => "layoffs_numeric_parse_failures_total",
            MetricName::IndustriesEnriched => "layoffs_industries_enriched_total",
            MetricName::ConflictingDonors => "layoffs_conflicting_donor_keys_total",
            MetricName::FilterDropped => "layoffs_filter_dropped_total",
            MetricName::RecordsClean => "layoffs_records_clean_total",
            MetricName::ConsistencyViolations => "layoffs_consistency_violations_total",
            MetricName::RunsCompleted => "layoffs_runs_completed_total",
            MetricName::RunsRefused => "layoffs_runs_refused_total",
            MetricName::RunDuration => "layoffs_run_duration_seconds",
        }
    }

    pub fn all_metrics() -> impl Iterator<Item = MetricName> {
        use MetricName::*;
        [
            RecordsLoaded,
            LoadErrors,
            DedupDiscarded,
            DedupGroups,
            NormalizeRewrites,
            NormalizeBlanksNulled,
            DateParseFailures,
            NumericParseFailures,
            IndustriesEnriched,
            ConflictingDonors,
            FilterDropped,
            RecordsClean,
            ConsistencyViolations,
            RunsCompleted,
            RunsRefused,
            RunDuration,
        ]
        .into_iter()
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

static METRICS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Install the Prometheus recorder and serve it on `listen_addr`.
///
/// Returns `Ok(false)` when no address is given. Must be called from inside a
/// tokio runtime because the exporter is spawned onto it.
pub fn init(listen_addr: Option<SocketAddr>) -> Result<bool, String> {
    let Some(addr) = listen_addr else {
        info!("Metrics disabled (no listen address configured)");
        return Ok(false);
    };

    if METRICS_HANDLE.get().is_some() {
        return Ok(true);
    }

    let (recorder, exporter) = PrometheusBuilder::new()
        .with_http_listener(addr)
        .build()
        .map_err(|e| format!("Failed to build Prometheus exporter: {}", e))?;

    let handle = recorder.handle();
    ::metrics::set_global_recorder(recorder)
        .map_err(|e| format!("Failed to install Prometheus recorder: {}", e))?;
    METRICS_HANDLE.set(handle).ok();

    tokio::spawn(async move {
        if exporter.await.is_err() {
            warn!("Prometheus exporter on {} stopped with an error", addr);
        }
    });

    info!("Metrics exposed on http://{}/metrics", addr);
    Ok(true)
}

/// Current metrics in Prometheus text format, if the recorder is installed
pub fn render() -> Option<String> {
    METRICS_HANDLE.get().map(|handle| handle.render())
}

// ============================================================================
// Load Metrics
// ============================================================================

pub mod load {
    use super::MetricName;

    pub fn records_loaded(count: usize) {
        ::metrics::counter!(MetricName::RecordsLoaded.as_str()).increment(count as u64);
    }

    pub fn load_error(kind: &'static str) {
        ::metrics::counter!(MetricName::LoadErrors.as_str(), "kind" => kind).increment(1);
    }
}

// ============================================================================
// Stage Metrics
// ============================================================================

pub mod dedup {
    use super::MetricName;

    pub fn discarded(count: usize, groups: usize) {
        ::metrics::counter!(MetricName::DedupDiscarded.as_str()).increment(count as u64);
        ::metrics::counter!(MetricName::DedupGroups.as_str()).increment(groups as u64);
    }
}

pub mod normalize {
    use super::MetricName;
    use crate::domain::Field;

    /// Record rule rewrites for one field
    pub fn rewrites(field: Field, count: usize) {
        ::metrics::counter!(MetricName::NormalizeRewrites.as_str(), "field" => field.column_name())
            .increment(count as u64);
    }

    pub fn blanks_nulled(count: usize) {
        ::metrics::counter!(MetricName::NormalizeBlanksNulled.as_str()).increment(count as u64);
    }
}

pub mod convert {
    use super::MetricName;

    pub fn date_failures(count: usize) {
        ::metrics::counter!(MetricName::DateParseFailures.as_str()).increment(count as u64);
    }

    pub fn numeric_failures(count: usize) {
        ::metrics::counter!(MetricName::NumericParseFailures.as_str()).increment(count as u64);
    }
}

pub mod enrich {
    use super::MetricName;

    pub fn enriched(count: usize, conflicting_keys: usize) {
        ::metrics::counter!(MetricName::IndustriesEnriched.as_str()).increment(count as u64);
        ::metrics::counter!(MetricName::ConflictingDonors.as_str()).increment(conflicting_keys as u64);
    }
}

pub mod filter {
    use super::MetricName;

    pub fn dropped(count: usize) {
        ::metrics::counter!(MetricName::FilterDropped.as_str()).increment(count as u64);
    }
}

pub mod validate {
    use super::MetricName;

    pub fn clean_set(clean: usize, violations: usize) {
        ::metrics::counter!(MetricName::RecordsClean.as_str()).increment(clean as u64);
        ::metrics::counter!(MetricName::ConsistencyViolations.as_str()).increment(violations as u64);
    }
}

// ============================================================================
// Run Metrics
// ============================================================================

pub mod run {
    use super::MetricName;

    pub fn completed(secs: f64) {
        ::metrics::counter!(MetricName::RunsCompleted.as_str()).increment(1);
        ::metrics::histogram!(MetricName::RunDuration.as_str()).record(secs);
    }

    /// A run that ended without committing output
    pub fn refused(reason: &'static str) {
        ::metrics::counter!(MetricName::RunsRefused.as_str(), "reason" => reason).increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn metric_names_are_unique_and_prefixed() {
        let names: Vec<&str> = MetricName::all_metrics().map(|m| m.as_str()).collect();
        let unique: HashSet<&str> = names.iter().copied().collect();

        assert_eq!(names.len(), unique.len());
        assert!(names.iter().all(|n| n.starts_with("layoffs_")));
    }

    #[test]
    fn helpers_are_noops_without_a_recorder() {
        load::records_loaded(3);
        run::refused("strict");
        assert!(!init(None).unwrap());
        assert!(render().is_none());
    }
}
