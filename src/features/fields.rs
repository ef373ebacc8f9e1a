//! Field vocabulary - the single source of truth for column naming.
//!
//! Raw names are shared verbatim by the HTTP request body and the
//! `credit_risk_raw` table; engineered names are shared by the
//! `credit_risk_engineered` table and the model metadata. The model weights
//! were fit against exactly this engineered layout, so changing a name or the
//! order here means retraining and shipping new metadata.

// === Raw applicant fields ===

pub const UTILIZATION: &str = "revolving_utilization_of_unsecured_lines";
pub const AGE: &str = "age";
pub const PAST_DUE_30_59: &str = "number_of_time_30_59_days_past_due_not_worse";
pub const DEBT_RATIO: &str = "debt_ratio";
pub const MONTHLY_INCOME: &str = "monthly_income";
pub const OPEN_CREDIT_LINES: &str = "number_of_open_credit_lines_and_loans";
pub const TIMES_90_DAYS_LATE: &str = "number_of_times_90_days_late";
pub const REAL_ESTATE_LOANS: &str = "number_real_estate_loans_or_lines";
pub const PAST_DUE_60_89: &str = "number_of_time_60_89_days_past_due_not_worse";
pub const DEPENDENTS: &str = "number_of_dependents";
pub const TOTAL_DELINQUENCIES: &str = "total_delinquencies";

/// Optional ground-truth label carried through the batch tables untouched.
pub const TARGET: &str = "serious_dlqin_2yrs";

// === Engineered feature layout ===

/// Engineered feature names in the exact order the batch table stores them.
///
/// The model's own ordering comes from the metadata artifact; this constant
/// is the transform's output key set and the layout of the engineered table.
pub const ENGINEERED_FEATURES: &[&str] = &[
    // passthrough
    "age",
    "number_of_open_credit_lines_and_loans",
    "number_real_estate_loans_or_lines",
    "number_of_dependents",
    // missing-value indicators
    "income_missing",
    "dependents_missing",
    // log-dampened magnitudes
    "revolving_utilization_log",
    "income_log",
    "debt_ratio_log",
    "total_delinquencies_log",
    // derived indicators and ratios
    "high_utilization_flag",
    "income_per_credit_line",
    // one-hot buckets (no reference category stored)
    "age_group_midage",
    "age_group_senior",
    "dependents_group_small",
    "dependents_group_large",
    // interactions
    "util_x_late",
    "income_per_dependent",
    "credit_lines_x_delinquencies",
];

/// Total number of engineered features.
pub const FEATURE_COUNT: usize = 19;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feature_count_matches_layout() {
        assert_eq!(ENGINEERED_FEATURES.len(), FEATURE_COUNT);
    }

    #[test]
    fn feature_names_are_unique() {
        let mut names: Vec<&str> = ENGINEERED_FEATURES.to_vec();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), FEATURE_COUNT);
    }
}
