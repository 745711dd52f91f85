use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::CleanRecord;

/// Lookup accelerators over the committed table.
///
/// Each index maps a column value to the 0-based positions of the data rows
/// holding it. Nulls are not indexed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupIndexes {
    pub date: BTreeMap<String, Vec<usize>>,
    pub company: BTreeMap<String, Vec<usize>>,
    pub country: BTreeMap<String, Vec<usize>>,
    pub industry: BTreeMap<String, Vec<usize>>,
}

impl LookupIndexes {
    pub fn build(records: &[CleanRecord]) -> Self {
        let mut indexes = Self::default();

        for (position, record) in records.iter().enumerate() {
            if let Some(date) = record.date {
                push(&mut indexes.date, date.format("%Y-%m-%d").to_string(), position);
            }
            if let Some(company) = &record.company {
                push(&mut indexes.company, company.clone(), position);
            }
            if let Some(country) = &record.country {
                push(&mut indexes.country, country.clone(), position);
            }
            if let Some(industry) = &record.industry {
                push(&mut indexes.industry, industry.clone(), position);
            }
        }

        indexes
    }

    pub fn rows_for_company(&self, company: &str) -> &[usize] {
        self.company.get(company).map(Vec::as_slice).unwrap_or_default()
    }
}

fn push(index: &mut BTreeMap<String, Vec<usize>>, key: String, position: usize) {
    index.entry(key).or_default().push(position);
}
