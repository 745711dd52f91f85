use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

use crate::domain::WorkingRecord;

/// Result of the single enrichment pass
#[derive(Debug, Clone)]
pub struct EnrichOutcome {
    pub records: Vec<WorkingRecord>,
    /// Records whose null industry was filled from a donor
    pub enriched: usize,
    /// (company, location) keys whose donors carried different industries
    pub conflicting_keys: usize,
}

/// Donor industries keyed by (company, location)
#[derive(Debug, Clone, Default)]
pub struct DonorMap {
    donors: HashMap<(String, String), String>,
    conflicting_keys: usize,
}

impl DonorMap {
    /// Build from a snapshot. The first non-null industry in input order wins.
    pub fn build(records: &[WorkingRecord]) -> Self {
        let mut donors: HashMap<(String, String), String> = HashMap::new();
        let mut conflicts: HashSet<(String, String)> = HashSet::new();

        for record in records {
            let (Some(key), Some(industry)) = (donor_key(record), record.industry.as_deref()) else {
                continue;
            };

            match donors.entry(key) {
                Entry::Vacant(slot) => {
                    slot.insert(industry.to_string());
                }
                Entry::Occupied(slot) => {
                    if slot.get() != industry {
                        conflicts.insert(slot.key().clone());
                    }
                }
            }
        }

        Self {
            donors,
            conflicting_keys: conflicts.len(),
        }
    }

    pub fn donor_for(&self, record: &WorkingRecord) -> Option<&str> {
        donor_key(record).and_then(|key| self.donors.get(&key).map(String::as_str))
    }

    /// Number of (company, location) keys with a donor
    pub fn key_count(&self) -> usize {
        self.donors.len()
    }
}

/// Null company or location never matches anything, including another null
fn donor_key(record: &WorkingRecord) -> Option<(String, String)> {
    Some((record.company.clone()?, record.location.clone()?))
}

/// Fill null industries from a sibling record sharing (company, location).
///
/// The donor map is taken from the input before any record is touched, so a
/// value filled in this pass never feeds another fill.
pub fn enrich(records: &[WorkingRecord]) -> EnrichOutcome {
    let donors = DonorMap::build(records);
    let mut enriched = 0;

    let filled = records
        .iter()
        .map(|record| {
            let mut record = record.clone();
            if record.industry.is_none() {
                if let Some(industry) = donors.donor_for(&record) {
                    debug!(
                        "Row {}: industry filled with {:?} from sibling record",
                        record.source_row, industry
                    );
                    record.industry = Some(industry.to_string());
                    enriched += 1;
                }
            }
            record
        })
        .collect();

    info!(
        "Enriched {} null industries from {} donor keys ({} with conflicting donors)",
        enriched,
        donors.key_count(),
        donors.conflicting_keys
    );

    EnrichOutcome {
        records: filled,
        enriched,
        conflicting_keys: donors.conflicting_keys,
    }
}
