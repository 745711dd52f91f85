//! Normalizer: whitespace trimming, blank-to-null coercion and rule-table
//! canonicalization of the categorical columns.
//!
//! Canonicalization matches on prefixes and suffixes on purpose so unseen
//! spelling variants are absorbed too. Two distinct entities sharing a
//! configured prefix will be merged; that risk is accepted, not corrected.

pub mod registry;
pub mod rules;

use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::config::NormalizeConfig;
use crate::domain::{Field, WorkingRecord};
use crate::error::Result;
use registry::CanonicalizerRegistry;

/// Columns whose surrounding whitespace is removed
pub const TRIMMED_FIELDS: [Field; 5] = [
    Field::Company,
    Field::Location,
    Field::Industry,
    Field::Stage,
    Field::Country,
];

/// Columns where an empty value becomes null. Company and location keep "".
pub const NULLABLE_FIELDS: [Field; 3] = [Field::Industry, Field::Stage, Field::Country];

#[derive(Debug, Clone)]
pub struct NormalizeOutcome {
    pub records: Vec<WorkingRecord>,
    /// Cells rewritten by a canonicalization rule, per field
    pub rewrites: BTreeMap<Field, usize>,
    /// Empty cells turned into nulls
    pub nulled: usize,
}

impl NormalizeOutcome {
    pub fn total_rewrites(&self) -> usize {
        self.rewrites.values().sum()
    }
}

pub struct Normalizer {
    registry: CanonicalizerRegistry,
}

impl Normalizer {
    pub fn new(config: &NormalizeConfig) -> Result<Self> {
        Ok(Self {
            registry: CanonicalizerRegistry::from_config(config)?,
        })
    }

    pub fn normalize(&self, records: &[WorkingRecord]) -> NormalizeOutcome {
        let mut rewrites: BTreeMap<Field, usize> = BTreeMap::new();
        let mut nulled = 0;

        let normalized = records
            .iter()
            .map(|record| {
                let mut record = record.clone();
                let row = record.source_row;

                for field in TRIMMED_FIELDS {
                    if let Some(value) = record.text_mut(field) {
                        let trimmed = value.trim().to_string();
                        if trimmed.len() != value.len() {
                            *value = trimmed;
                        }
                    }
                }

                for field in self.registry.fields() {
                    let Some(canonicalizer) = self.registry.get(field) else {
                        continue;
                    };
                    let slot = record.text_mut(field);
                    if let Some(canonical) = slot.as_deref().and_then(|v| canonicalizer.canonicalize(v)) {
                        debug!(
                            "Row {}: {} {:?} -> {:?}",
                            row,
                            field,
                            slot.as_deref().unwrap_or_default(),
                            canonical
                        );
                        *slot = Some(canonical);
                        *rewrites.entry(field).or_default() += 1;
                    }
                }

                for field in NULLABLE_FIELDS {
                    let slot = record.text_mut(field);
                    if slot.as_deref().is_some_and(str::is_empty) {
                        *slot = None;
                        nulled += 1;
                    }
                }

                record
            })
            .collect();

        let outcome = NormalizeOutcome {
            records: normalized,
            rewrites,
            nulled,
        };

        info!(
            "Normalized {} records: {} canonical rewrites, {} blanks nulled",
            records.len(),
            outcome.total_rewrites(),
            outcome.nulled
        );

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer() -> Normalizer {
        Normalizer::new(&NormalizeConfig::default()).unwrap()
    }

    fn record(company: &str, location: &str, industry: Option<&str>, country: Option<&str>) -> WorkingRecord {
        WorkingRecord {
            source_row: 1,
            company: Some(company.to_string()),
            location: Some(location.to_string()),
            industry: industry.map(str::to_string),
            country: country.map(str::to_string),
            stage: Some(" Series A ".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn trims_categorical_fields() {
        let outcome = normalizer().normalize(&[record("  Acme ", " NYC", Some(" Retail "), Some("Canada "))]);
        let r = &outcome.records[0];

        assert_eq!(r.company.as_deref(), Some("Acme"));
        assert_eq!(r.location.as_deref(), Some("NYC"));
        assert_eq!(r.industry.as_deref(), Some("Retail"));
        assert_eq!(r.stage.as_deref(), Some("Series A"));
        assert_eq!(r.country.as_deref(), Some("Canada"));
    }

    #[test]
    fn blanks_become_null_only_for_nullable_fields() {
        let mut input = record("   ", "", Some("  "), Some(""));
        input.stage = Some("".to_string());
        let outcome = normalizer().normalize(&[input]);
        let r = &outcome.records[0];

        assert_eq!(r.company.as_deref(), Some(""));
        assert_eq!(r.location.as_deref(), Some(""));
        assert_eq!(r.industry, None);
        assert_eq!(r.stage, None);
        assert_eq!(r.country, None);
        assert_eq!(outcome.nulled, 3);
    }

    #[test]
    fn canonicalizes_industry_location_and_country() {
        let records = vec![
            record("A", "Düsseldorf", Some("Crypto Currency"), Some("United States.")),
            record("B", "Florianópolis", Some("CryptoCurrency"), Some("United States")),
            record("C", "Ferdericton", Some("Fintech"), Some("Germany")),
            record("D", "Malmö", Some("Crypto"), Some("Sweden")),
        ];
        let outcome = normalizer().normalize(&records);

        let locations: Vec<_> = outcome.records.iter().map(|r| r.location.as_deref().unwrap()).collect();
        assert_eq!(locations, vec!["Dusseldorf", "Florianapolis", "Fredericton", "Malmo"]);

        let industries: Vec<_> = outcome.records.iter().map(|r| r.industry.as_deref().unwrap()).collect();
        assert_eq!(industries, vec!["Crypto", "Crypto", "Fintech", "Crypto"]);

        assert_eq!(outcome.records[0].country.as_deref(), Some("United States"));
        assert_eq!(outcome.rewrites[&Field::Location], 4);
        assert_eq!(outcome.rewrites[&Field::Industry], 2);
        assert_eq!(outcome.rewrites[&Field::Country], 1);
    }

    #[test]
    fn country_of_only_dots_becomes_null() {
        let outcome = normalizer().normalize(&[record("A", "X", None, Some(" .. "))]);
        assert_eq!(outcome.records[0].country, None);
    }

    #[test]
    fn normalizing_twice_equals_normalizing_once() {
        let records = vec![
            record(" Acme ", " Düsseldorf ", Some(" Crypto Currency "), Some(" United States. ")),
            record("Beta", "SF", Some(""), Some("United States of America")),
            record("Gamma", "Malm", None, Some("...")),
        ];
        let n = normalizer();

        let once = n.normalize(&records);
        let twice = n.normalize(&once.records);

        assert_eq!(once.records, twice.records);
        assert_eq!(twice.total_rewrites(), 0);
        assert_eq!(twice.nulled, 0);
    }

    #[test]
    fn numeric_and_date_text_are_left_alone() {
        let mut input = record("A", "B", None, None);
        input.total_laid_off = Some(" 100 ".to_string());
        input.date = Some(" 3/14/2023".to_string());
        let outcome = normalizer().normalize(&[input]);

        assert_eq!(outcome.records[0].total_laid_off.as_deref(), Some(" 100 "));
        assert_eq!(outcome.records[0].date.as_deref(), Some(" 3/14/2023"));
    }
}
