//! Batch-only outlier capping and missing-value statistics.
//!
//! Runs once per pipeline invocation, before the shared transform: duplicate
//! rows are dropped, raw columns are clipped to fixed ranges, and the batch
//! medians for income/dependents are computed over the surviving rows. The
//! medians travel into [`derive`](crate::features::derive) as
//! [`ImputeStats`], so missing flags always reflect the pre-imputation view.

use std::collections::HashSet;

use crate::features::record::RawRecord;
use crate::features::transform::ImputeStats;

/// One row of the raw batch table: applicant attributes plus the optional
/// ground-truth label, carried through untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    pub record: RawRecord,
    pub target: Option<f64>,
}

/// Inclusive per-column clip range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipRange {
    pub lower: f64,
    pub upper: f64,
}

impl ClipRange {
    const fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    /// Clamp a value into the range. Idempotent.
    pub fn clip(&self, value: f64) -> f64 {
        value.clamp(self.lower, self.upper)
    }
}

// Fixed caps, chosen against the training distribution. Utilization above
// 100% and ages above 100 are data errors; the delinquency counts cap at one
// event per two months over the two-year observation window.
pub const UTILIZATION_CAP: ClipRange = ClipRange::new(0.0, 1.0);
pub const AGE_CAP: ClipRange = ClipRange::new(18.0, 100.0);
pub const DELINQUENCY_CAP: ClipRange = ClipRange::new(0.0, 12.0);
pub const DEBT_RATIO_CAP: ClipRange = ClipRange::new(0.0, 5000.0);
pub const INCOME_CAP: ClipRange = ClipRange::new(0.0, 50_000.0);
pub const OPEN_CREDIT_LINES_CAP: ClipRange = ClipRange::new(0.0, 30.0);
pub const REAL_ESTATE_CAP: ClipRange = ClipRange::new(0.0, 10.0);
pub const DEPENDENTS_CAP: ClipRange = ClipRange::new(0.0, 10.0);

/// A deduplicated, clipped batch with its imputation statistics.
#[derive(Debug, Clone)]
pub struct NormalizedBatch {
    pub rows: Vec<RawRow>,
    pub stats: ImputeStats,
    pub duplicates_removed: usize,
}

/// Apply the fixed caps to every present field of one record.
pub fn clip_record(record: &RawRecord) -> RawRecord {
    RawRecord {
        revolving_utilization_of_unsecured_lines: record
            .revolving_utilization_of_unsecured_lines
            .map(|v| UTILIZATION_CAP.clip(v)),
        age: record.age.map(|v| AGE_CAP.clip(v)),
        number_of_time_30_59_days_past_due_not_worse: record
            .number_of_time_30_59_days_past_due_not_worse
            .map(|v| DELINQUENCY_CAP.clip(v)),
        debt_ratio: record.debt_ratio.map(|v| DEBT_RATIO_CAP.clip(v)),
        monthly_income: record.monthly_income.map(|v| INCOME_CAP.clip(v)),
        number_of_open_credit_lines_and_loans: record
            .number_of_open_credit_lines_and_loans
            .map(|v| OPEN_CREDIT_LINES_CAP.clip(v)),
        number_of_times_90_days_late: record
            .number_of_times_90_days_late
            .map(|v| DELINQUENCY_CAP.clip(v)),
        number_real_estate_loans_or_lines: record
            .number_real_estate_loans_or_lines
            .map(|v| REAL_ESTATE_CAP.clip(v)),
        number_of_time_60_89_days_past_due_not_worse: record
            .number_of_time_60_89_days_past_due_not_worse
            .map(|v| DELINQUENCY_CAP.clip(v)),
        number_of_dependents: record.number_of_dependents.map(|v| DEPENDENTS_CAP.clip(v)),
        total_delinquencies: record.total_delinquencies,
    }
}

/// Interpolating median over the present values of a column. Returns 0 for a
/// column with no present values, so a fully-null column imputes to zero
/// rather than poisoning the batch with NaN.
pub fn median(values: impl Iterator<Item = f64>) -> f64 {
    let mut values: Vec<f64> = values.filter(|v| v.is_finite()).collect();
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        values[mid]
    } else {
        (values[mid - 1] + values[mid]) / 2.0
    }
}

fn row_key(row: &RawRow) -> Vec<Option<u64>> {
    let mut key: Vec<Option<u64>> = row
        .record
        .fields()
        .into_iter()
        .map(|(_, v)| v.map(f64::to_bits))
        .collect();
    key.push(row.target.map(f64::to_bits));
    key
}

/// Drop rows identical across all columns, keeping first occurrences.
pub fn drop_duplicates(rows: Vec<RawRow>) -> (Vec<RawRow>, usize) {
    let before = rows.len();
    let mut seen: HashSet<Vec<Option<u64>>> = HashSet::with_capacity(before);
    let deduped: Vec<RawRow> = rows
        .into_iter()
        .filter(|row| seen.insert(row_key(row)))
        .collect();
    let removed = before - deduped.len();
    (deduped, removed)
}

/// Full normalization pass: dedup -> clip -> batch medians.
pub fn normalize(rows: Vec<RawRow>) -> NormalizedBatch {
    let (rows, duplicates_removed) = drop_duplicates(rows);
    if duplicates_removed > 0 {
        tracing::info!(duplicates_removed, "dropped duplicate rows");
    }

    let rows: Vec<RawRow> = rows
        .into_iter()
        .map(|row| RawRow {
            record: clip_record(&row.record),
            target: row.target,
        })
        .collect();

    let stats = ImputeStats {
        median_income: median(rows.iter().filter_map(|r| r.record.monthly_income)),
        median_dependents: median(rows.iter().filter_map(|r| r.record.number_of_dependents)),
    };

    NormalizedBatch {
        rows,
        stats,
        duplicates_removed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(income: Option<f64>, age: f64) -> RawRow {
        RawRow {
            record: RawRecord {
                age: Some(age),
                monthly_income: income,
                ..RawRecord::default()
            },
            target: Some(0.0),
        }
    }

    #[test]
    fn clip_is_idempotent() {
        for v in [-3.0, 0.0, 0.4, 1.0, 250.0] {
            let once = UTILIZATION_CAP.clip(v);
            assert_eq!(UTILIZATION_CAP.clip(once), once);
        }
    }

    #[test]
    fn clip_record_applies_fixed_caps() {
        let record = RawRecord {
            revolving_utilization_of_unsecured_lines: Some(3.2),
            age: Some(140.0),
            debt_ratio: Some(9999.0),
            monthly_income: Some(1_000_000.0),
            number_of_times_90_days_late: Some(98.0),
            ..RawRecord::default()
        };
        let clipped = clip_record(&record);
        assert_eq!(clipped.revolving_utilization_of_unsecured_lines, Some(1.0));
        assert_eq!(clipped.age, Some(100.0));
        assert_eq!(clipped.debt_ratio, Some(5000.0));
        assert_eq!(clipped.monthly_income, Some(50_000.0));
        assert_eq!(clipped.number_of_times_90_days_late, Some(12.0));
        // absent stays absent; clipping never invents values
        assert_eq!(clipped.number_of_dependents, None);
    }

    #[test]
    fn duplicates_are_dropped_and_counted() {
        let rows = vec![row(Some(100.0), 40.0), row(Some(100.0), 40.0), row(None, 40.0)];
        let (deduped, removed) = drop_duplicates(rows);
        assert_eq!(deduped.len(), 2);
        assert_eq!(removed, 1);
    }

    #[test]
    fn missing_and_present_rows_are_not_duplicates() {
        let rows = vec![row(Some(0.0), 40.0), row(None, 40.0)];
        let (deduped, removed) = drop_duplicates(rows);
        assert_eq!(deduped.len(), 2);
        assert_eq!(removed, 0);
    }

    #[test]
    fn median_interpolates_even_batches() {
        assert_eq!(median([1.0, 2.0, 3.0].into_iter()), 2.0);
        assert_eq!(median([1.0, 2.0, 3.0, 4.0].into_iter()), 2.5);
        assert_eq!(median(std::iter::empty()), 0.0);
    }

    #[test]
    fn normalize_computes_stats_after_dedup_and_clip() {
        let rows = vec![
            row(Some(1_000_000.0), 40.0), // clipped to 50_000
            row(Some(2000.0), 41.0),
            row(Some(4000.0), 42.0),
            row(None, 43.0), // nulls excluded from the median
            row(Some(2000.0), 41.0), // duplicate
        ];
        let batch = normalize(rows);
        assert_eq!(batch.duplicates_removed, 1);
        assert_eq!(batch.rows.len(), 4);
        assert_eq!(batch.stats.median_income, 4000.0);
    }
}
