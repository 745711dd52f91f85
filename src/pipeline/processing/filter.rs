use tracing::info;

use crate::domain::WorkingRecord;

#[derive(Debug, Clone)]
pub struct FilterOutcome {
    pub records: Vec<WorkingRecord>,
    pub dropped: usize,
}

/// True when the record carries a total or a non-blank percentage
pub fn has_quantitative_signal(record: &WorkingRecord) -> bool {
    record.laid_off.is_some() || record.has_percentage()
}

/// Drop records with neither a typed total nor a percentage.
pub fn filter_rows(records: &[WorkingRecord]) -> FilterOutcome {
    let kept: Vec<WorkingRecord> = records
        .iter()
        .filter(|record| has_quantitative_signal(record))
        .cloned()
        .collect();
    let dropped = records.len() - kept.len();

    info!("Row filter kept {} records, dropped {}", kept.len(), dropped);

    FilterOutcome { records: kept, dropped }
}
