//! Shared feature derivation.
//!
//! This is the one implementation of the raw -> engineered mapping. The
//! serving path calls [`derive`] with `stats = None`; the batch pipeline
//! passes the batch medians so null income/dependents are imputed instead of
//! defaulting to zero. The model weights were fit against exactly these
//! rules, so any change here means retraining.

use crate::error::ScoreError;
use crate::features::record::{EngineeredRecord, RawRecord};

/// Batch-wide imputation statistics, computed once per pipeline run by the
/// normalizer. The online path has none; absent optionals default to zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImputeStats {
    pub median_income: f64,
    pub median_dependents: f64,
}

/// Age bucket boundaries (one-hot, no reference category).
const MIDAGE_MIN: f64 = 35.0;
const SENIOR_MIN: f64 = 60.0;

/// Utilization above this flags the applicant as highly leveraged.
const HIGH_UTILIZATION: f64 = 0.75;

/// Explicit delinquency aggregation, shared by both paths.
///
/// The batch table carries three per-window delinquency counts; online
/// clients send the pre-aggregated total. When both are present and disagree
/// the caller-supplied total wins, but the divergence is logged because it
/// usually means the client aggregates differently than the pipeline does.
pub fn resolve_total_delinquencies(raw: &RawRecord) -> f64 {
    let components = [
        raw.number_of_time_30_59_days_past_due_not_worse,
        raw.number_of_time_60_89_days_past_due_not_worse,
        raw.number_of_times_90_days_late,
    ];
    let computed = if components.iter().any(Option::is_some) {
        Some(components.iter().map(|c| c.unwrap_or(0.0)).sum::<f64>())
    } else {
        None
    };

    match (raw.total_delinquencies, computed) {
        (Some(supplied), Some(computed)) => {
            if (supplied - computed).abs() > f64::EPSILON {
                tracing::warn!(
                    supplied,
                    computed,
                    "caller-supplied total_delinquencies diverges from component sum"
                );
            }
            supplied
        }
        (Some(supplied), None) => supplied,
        (None, Some(computed)) => computed,
        (None, None) => 0.0,
    }
}

/// `1` unless income is present and strictly positive. Zero or negative
/// reported income is as uninformative as an absent field.
pub fn income_missing_flag(raw: &RawRecord) -> f64 {
    match raw.monthly_income {
        Some(v) if v > 0.0 => 0.0,
        _ => 1.0,
    }
}

/// `1` iff the dependents count is absent.
pub fn dependents_missing_flag(raw: &RawRecord) -> f64 {
    if raw.number_of_dependents.is_some() {
        0.0
    } else {
        1.0
    }
}

/// `log(1 + x)`, clamped at zero so the output is always finite. Negative
/// inputs cannot survive batch clipping; online they collapse to zero.
fn log1p(x: f64) -> f64 {
    x.max(0.0).ln_1p()
}

/// Divide with a zero result whenever the denominator is not strictly
/// positive. Never produces NaN/Inf.
fn guarded_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

/// Derive the engineered feature mapping from one raw applicant record.
///
/// Pure: identical input (and stats) always yields identical output. Fails
/// only on non-finite numeric input; absence of a field is never an error
/// here, it is information the transform encodes.
pub fn derive(
    raw: &RawRecord,
    stats: Option<&ImputeStats>,
) -> Result<EngineeredRecord, ScoreError> {
    raw.check_finite()?;

    // Missing-value indicators reflect the record as submitted, before any
    // imputation becomes visible.
    let income_missing = income_missing_flag(raw);
    let dependents_missing = dependents_missing_flag(raw);

    let income = raw
        .monthly_income
        .or(stats.map(|s| s.median_income))
        .unwrap_or(0.0);
    let dependents = raw
        .number_of_dependents
        .or(stats.map(|s| s.median_dependents))
        .unwrap_or(0.0);
    let utilization = raw
        .revolving_utilization_of_unsecured_lines
        .unwrap_or(0.0);
    let age = raw.age.unwrap_or(0.0);
    let debt_ratio = raw.debt_ratio.unwrap_or(0.0);
    let open_credit_lines = raw.number_of_open_credit_lines_and_loans.unwrap_or(0.0);
    let real_estate_loans = raw.number_real_estate_loans_or_lines.unwrap_or(0.0);
    let total_delinquencies = resolve_total_delinquencies(raw);

    Ok(EngineeredRecord {
        age,
        number_of_open_credit_lines_and_loans: open_credit_lines,
        number_real_estate_loans_or_lines: real_estate_loans,
        number_of_dependents: dependents,
        income_missing,
        dependents_missing,
        revolving_utilization_log: log1p(utilization),
        income_log: log1p(income),
        debt_ratio_log: log1p(debt_ratio),
        total_delinquencies_log: log1p(total_delinquencies),
        high_utilization_flag: if utilization > HIGH_UTILIZATION {
            1.0
        } else {
            0.0
        },
        income_per_credit_line: guarded_ratio(income, open_credit_lines),
        age_group_midage: if (MIDAGE_MIN..SENIOR_MIN).contains(&age) {
            1.0
        } else {
            0.0
        },
        age_group_senior: if age >= SENIOR_MIN { 1.0 } else { 0.0 },
        dependents_group_small: if (1.0..=3.0).contains(&dependents) {
            1.0
        } else {
            0.0
        },
        dependents_group_large: if dependents > 3.0 { 1.0 } else { 0.0 },
        util_x_late: utilization * total_delinquencies,
        income_per_dependent: guarded_ratio(income, dependents),
        credit_lines_x_delinquencies: open_credit_lines * total_delinquencies,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RawRecord {
        RawRecord {
            age: Some(35.0),
            monthly_income: Some(5000.0),
            number_of_dependents: Some(2.0),
            number_of_open_credit_lines_and_loans: Some(5.0),
            number_real_estate_loans_or_lines: Some(1.0),
            debt_ratio: Some(0.2),
            revolving_utilization_of_unsecured_lines: Some(0.12),
            total_delinquencies: Some(0.0),
            ..RawRecord::default()
        }
    }

    #[test]
    fn derive_matches_reference_scenario() {
        let engineered = derive(&sample(), None).unwrap();

        assert_eq!(engineered.income_missing, 0.0);
        assert_eq!(engineered.dependents_missing, 0.0);
        assert_eq!(engineered.high_utilization_flag, 0.0);
        assert_eq!(engineered.age_group_midage, 1.0);
        assert_eq!(engineered.age_group_senior, 0.0);
        assert_eq!(engineered.dependents_group_small, 1.0);
        assert_eq!(engineered.dependents_group_large, 0.0);
        assert_eq!(engineered.income_per_credit_line, 1000.0);
        assert_eq!(engineered.util_x_late, 0.0);
    }

    #[test]
    fn derive_is_deterministic() {
        let raw = sample();
        assert_eq!(derive(&raw, None).unwrap(), derive(&raw, None).unwrap());
    }

    #[test]
    fn missing_income_is_flagged_and_zeroed() {
        let mut raw = sample();
        raw.monthly_income = None;
        let engineered = derive(&raw, None).unwrap();

        assert_eq!(engineered.income_missing, 1.0);
        assert_eq!(engineered.income_log, 0.0);
        assert_eq!(engineered.income_per_credit_line, 0.0);
        // income treated as 0, not an error
        assert_eq!(engineered.income_per_dependent, 0.0);
    }

    #[test]
    fn zero_income_counts_as_missing() {
        let mut raw = sample();
        raw.monthly_income = Some(0.0);
        let engineered = derive(&raw, None).unwrap();
        assert_eq!(engineered.income_missing, 1.0);
    }

    #[test]
    fn zero_credit_lines_guards_division() {
        let mut raw = sample();
        raw.number_of_open_credit_lines_and_loans = Some(0.0);
        let engineered = derive(&raw, None).unwrap();
        assert_eq!(engineered.income_per_credit_line, 0.0);
        assert!(engineered.income_per_credit_line.is_finite());
    }

    #[test]
    fn age_bucket_boundaries() {
        for (age, midage, senior) in [
            (34.0, 0.0, 0.0),
            (35.0, 1.0, 0.0),
            (59.0, 1.0, 0.0),
            (60.0, 0.0, 1.0),
            (85.0, 0.0, 1.0),
        ] {
            let mut raw = sample();
            raw.age = Some(age);
            let engineered = derive(&raw, None).unwrap();
            assert_eq!(engineered.age_group_midage, midage, "age {age}");
            assert_eq!(engineered.age_group_senior, senior, "age {age}");
        }
    }

    #[test]
    fn dependents_bucket_boundaries() {
        for (dep, small, large) in [
            (Some(0.0), 0.0, 0.0),
            (Some(1.0), 1.0, 0.0),
            (Some(3.0), 1.0, 0.0),
            (Some(4.0), 0.0, 1.0),
            // null treated as 0 for bucketing
            (None, 0.0, 0.0),
        ] {
            let mut raw = sample();
            raw.number_of_dependents = dep;
            let engineered = derive(&raw, None).unwrap();
            assert_eq!(engineered.dependents_group_small, small, "dep {dep:?}");
            assert_eq!(engineered.dependents_group_large, large, "dep {dep:?}");
        }
    }

    #[test]
    fn high_utilization_flag_threshold() {
        let mut raw = sample();
        raw.revolving_utilization_of_unsecured_lines = Some(0.75);
        assert_eq!(derive(&raw, None).unwrap().high_utilization_flag, 0.0);
        raw.revolving_utilization_of_unsecured_lines = Some(0.76);
        assert_eq!(derive(&raw, None).unwrap().high_utilization_flag, 1.0);
    }

    #[test]
    fn batch_stats_impute_but_do_not_clear_flags() {
        let mut raw = sample();
        raw.monthly_income = None;
        raw.number_of_dependents = None;
        let stats = ImputeStats {
            median_income: 4000.0,
            median_dependents: 1.0,
        };
        let engineered = derive(&raw, Some(&stats)).unwrap();

        assert_eq!(engineered.income_missing, 1.0);
        assert_eq!(engineered.dependents_missing, 1.0);
        assert_eq!(engineered.income_log, 4000.0_f64.ln_1p());
        assert_eq!(engineered.number_of_dependents, 1.0);
        assert_eq!(engineered.income_per_dependent, 4000.0);
    }

    #[test]
    fn interactions_multiply_raw_values() {
        let mut raw = sample();
        raw.revolving_utilization_of_unsecured_lines = Some(0.5);
        raw.total_delinquencies = Some(4.0);
        let engineered = derive(&raw, None).unwrap();
        assert_eq!(engineered.util_x_late, 2.0);
        assert_eq!(engineered.credit_lines_x_delinquencies, 20.0);
    }

    #[test]
    fn delinquencies_sum_from_components() {
        let raw = RawRecord {
            number_of_time_30_59_days_past_due_not_worse: Some(1.0),
            number_of_time_60_89_days_past_due_not_worse: Some(2.0),
            number_of_times_90_days_late: Some(3.0),
            ..RawRecord::default()
        };
        assert_eq!(resolve_total_delinquencies(&raw), 6.0);
    }

    #[test]
    fn caller_supplied_total_wins() {
        let raw = RawRecord {
            number_of_time_30_59_days_past_due_not_worse: Some(1.0),
            number_of_time_60_89_days_past_due_not_worse: Some(1.0),
            number_of_times_90_days_late: Some(1.0),
            total_delinquencies: Some(5.0),
            ..RawRecord::default()
        };
        assert_eq!(resolve_total_delinquencies(&raw), 5.0);
    }

    #[test]
    fn absent_delinquency_inputs_default_to_zero() {
        assert_eq!(resolve_total_delinquencies(&RawRecord::default()), 0.0);
    }

    #[test]
    fn non_finite_input_is_malformed() {
        let mut raw = sample();
        raw.debt_ratio = Some(f64::INFINITY);
        let err = derive(&raw, None).unwrap_err();
        assert!(matches!(err, ScoreError::MalformedInput { .. }));
    }
}
