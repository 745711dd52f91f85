use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::config::{DedupConfig, RankCriterion, RankOrder};
use crate::domain::{is_blank, Field, FieldKind, WorkingRecord};

/// Result of one deduplication pass
#[derive(Debug, Clone)]
pub struct DedupOutcome {
    /// Rank-1 survivors, in input order
    pub records: Vec<WorkingRecord>,
    /// Records that lost to a better-ranked duplicate
    pub discarded: usize,
    /// Duplicate keys shared by more than one record
    pub duplicate_groups: usize,
}

/// Groups records by duplicate key and keeps the best-ranked record of each group.
///
/// Ranking follows the configured criteria, most significant first. Records
/// still tied after every criterion keep their input order, so the survivor
/// of an exact tie is always the earliest row.
#[derive(Debug, Clone)]
pub struct Deduplicator {
    key: Vec<Field>,
    rank: Vec<RankCriterion>,
}

impl Deduplicator {
    pub fn new(config: &DedupConfig) -> Self {
        Self {
            key: config.key.clone(),
            rank: config.rank.clone(),
        }
    }

    /// Total preference order between two members of one group
    pub fn compare(&self, a: &WorkingRecord, b: &WorkingRecord) -> Ordering {
        self.rank
            .iter()
            .map(|criterion| compare_on(criterion, a, b))
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.source_row.cmp(&b.source_row))
    }

    /// Assign every record its rank within its duplicate group, keeping input order
    pub fn rank(&self, records: &[WorkingRecord]) -> Vec<WorkingRecord> {
        let mut ranked = records.to_vec();
        for group in self.groups(records) {
            for (position, index) in self.sorted_group(records, group).into_iter().enumerate() {
                ranked[index].rank = Some(position as u32 + 1);
            }
        }
        ranked
    }

    pub fn deduplicate(&self, records: &[WorkingRecord]) -> DedupOutcome {
        let ranked = self.rank(records);
        let duplicate_groups = self
            .groups(records)
            .iter()
            .filter(|group| group.len() > 1)
            .count();

        let survivors: Vec<WorkingRecord> = ranked
            .into_iter()
            .filter(|record| record.rank == Some(1))
            .collect();
        let discarded = records.len() - survivors.len();

        info!(
            "Deduplicated {} records: {} kept, {} discarded across {} duplicate groups",
            records.len(),
            survivors.len(),
            discarded,
            duplicate_groups
        );

        DedupOutcome {
            records: survivors,
            discarded,
            duplicate_groups,
        }
    }

    /// Indices of records sharing a key, groups in order of first appearance
    fn groups(&self, records: &[WorkingRecord]) -> Vec<Vec<usize>> {
        let mut slots: HashMap<Vec<Option<&str>>, usize> = HashMap::new();
        let mut groups: Vec<Vec<usize>> = Vec::new();

        for (index, record) in records.iter().enumerate() {
            let key: Vec<Option<&str>> = self.key.iter().map(|field| record.text(*field)).collect();
            match slots.get(&key) {
                Some(&slot) => groups[slot].push(index),
                None => {
                    slots.insert(key, groups.len());
                    groups.push(vec![index]);
                }
            }
        }

        groups
    }

    fn sorted_group(&self, records: &[WorkingRecord], mut group: Vec<usize>) -> Vec<usize> {
        if group.len() > 1 {
            group.sort_by(|&a, &b| self.compare(&records[a], &records[b]).then(a.cmp(&b)));
            debug!(
                "Duplicate group of {} records keeps row {}",
                group.len(),
                records[group[0]].source_row
            );
        }
        group
    }
}

fn compare_on(criterion: &RankCriterion, a: &WorkingRecord, b: &WorkingRecord) -> Ordering {
    let left = a.text(criterion.field);
    let right = b.text(criterion.field);

    match criterion.order {
        // `true` sorts after `false`, so compare right against left
        RankOrder::PresentFirst => (!is_blank(right)).cmp(&!is_blank(left)),
        RankOrder::Descending => nulls_last(left, right, criterion.field.kind(), true),
        RankOrder::Ascending => nulls_last(left, right, criterion.field.kind(), false),
    }
}

fn nulls_last(left: Option<&str>, right: Option<&str>, kind: FieldKind, descending: bool) -> Ordering {
    let ordering = match kind {
        FieldKind::Numeric => match (parse_number(left), parse_number(right)) {
            (Some(l), Some(r)) => l.total_cmp(&r),
            (Some(_), None) => return Ordering::Less,
            (None, Some(_)) => return Ordering::Greater,
            (None, None) => return Ordering::Equal,
        },
        FieldKind::Text => match (present(left), present(right)) {
            (Some(l), Some(r)) => l.cmp(r),
            (Some(_), None) => return Ordering::Less,
            (None, Some(_)) => return Ordering::Greater,
            (None, None) => return Ordering::Equal,
        },
    };

    if descending {
        ordering.reverse()
    } else {
        ordering
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_number(value: Option<&str>) -> Option<f64> {
    present(value)
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|n| n.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(row: usize, industry: Option<&str>) -> WorkingRecord {
        WorkingRecord {
            source_row: row,
            company: Some("Acme".to_string()),
            location: Some("NYC".to_string()),
            industry: industry.map(str::to_string),
            total_laid_off: Some("100".to_string()),
            percentage_laid_off: Some("0.1".to_string()),
            date: Some("1/2/2023".to_string()),
            stage: Some("Series B".to_string()),
            country: Some("United States".to_string()),
            funds_raised_millions: Some("5".to_string()),
            ..Default::default()
        }
    }

    fn company_key() -> Deduplicator {
        Deduplicator::new(&DedupConfig {
            key: vec![Field::Company],
            ..DedupConfig::default()
        })
    }

    #[test]
    fn exact_duplicates_keep_the_first_row() {
        let dedup = Deduplicator::new(&DedupConfig::default());
        let records = vec![record(1, Some("Retail")), record(2, Some("Retail")), record(3, Some("Travel"))];

        let outcome = dedup.deduplicate(&records);

        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.records[0].source_row, 1);
        assert_eq!(outcome.records[1].source_row, 3);
        assert_eq!(outcome.discarded, 1);
        assert_eq!(outcome.duplicate_groups, 1);
    }

    #[test]
    fn nulls_compare_equal_inside_the_key() {
        let dedup = Deduplicator::new(&DedupConfig::default());
        let records = vec![record(1, None), record(2, None)];
        assert_eq!(dedup.deduplicate(&records).records.len(), 1);
    }

    #[test]
    fn present_industry_wins_over_null() {
        let records = vec![record(1, None), record(2, Some("Retail"))];
        let outcome = company_key().deduplicate(&records);

        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].industry.as_deref(), Some("Retail"));
    }

    #[test]
    fn blank_counts_as_missing_for_present_first() {
        let records = vec![record(1, Some("  ")), record(2, Some("Retail"))];
        let outcome = company_key().deduplicate(&records);
        assert_eq!(outcome.records[0].source_row, 2);
    }

    #[test]
    fn higher_funding_wins_and_nulls_sort_last() {
        let mut low = record(1, Some("Retail"));
        low.funds_raised_millions = Some("20".to_string());
        let mut high = record(2, Some("Retail"));
        high.funds_raised_millions = Some("150".to_string());
        let mut unknown = record(3, Some("Retail"));
        unknown.funds_raised_millions = None;

        let ranked = company_key().rank(&[unknown, low, high]);

        let rank_of = |row: usize| ranked.iter().find(|r| r.source_row == row).unwrap().rank;
        assert_eq!(rank_of(2), Some(1));
        assert_eq!(rank_of(1), Some(2));
        assert_eq!(rank_of(3), Some(3));
    }

    #[test]
    fn later_date_text_wins_lexicographically() {
        let mut earlier = record(1, Some("Retail"));
        earlier.date = Some("1/2/2023".to_string());
        let mut later = record(2, Some("Retail"));
        later.date = Some("3/9/2022".to_string());

        let outcome = company_key().deduplicate(&[earlier, later]);
        // "3/9/2022" > "1/2/2023" as text
        assert_eq!(outcome.records[0].source_row, 2);
    }

    #[test]
    fn quantity_criteria_outrank_funding() {
        let mut no_total = record(1, Some("Retail"));
        no_total.total_laid_off = None;
        no_total.funds_raised_millions = Some("900".to_string());
        let with_total = record(2, Some("Retail"));

        let outcome = company_key().deduplicate(&[no_total, with_total]);
        assert_eq!(outcome.records[0].source_row, 2);
    }

    #[test]
    fn deduplicating_twice_changes_nothing() {
        let dedup = company_key();
        let records = vec![record(1, None), record(2, Some("Retail")), record(3, Some("Travel"))];

        let once = dedup.deduplicate(&records);
        let twice = dedup.deduplicate(&once.records);

        assert_eq!(once.records, twice.records);
        assert_eq!(twice.discarded, 0);
    }

    #[test]
    fn singletons_get_rank_one() {
        let dedup = Deduplicator::new(&DedupConfig::default());
        let ranked = dedup.rank(&[record(1, Some("Retail"))]);
        assert_eq!(ranked[0].rank, Some(1));
    }
}
