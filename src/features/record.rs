//! Typed applicant records.
//!
//! The serving boundary used to be an open-ended string map; a typo in a key
//! then only surfaced as a schema error after preprocessing. `RawRecord` moves
//! that to the edge: unknown keys and non-numeric values are rejected during
//! deserialization, and "field absent" is an explicit `None`.

use serde::Deserialize;

use crate::error::ScoreError;
use crate::features::fields;

/// One loan applicant as submitted by a client or read from the raw table.
///
/// Every field is optional; the transform decides what absence means
/// (missing-value flag, default-to-zero, or batch-median imputation).
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RawRecord {
    pub revolving_utilization_of_unsecured_lines: Option<f64>,
    pub age: Option<f64>,
    pub number_of_time_30_59_days_past_due_not_worse: Option<f64>,
    pub debt_ratio: Option<f64>,
    pub monthly_income: Option<f64>,
    pub number_of_open_credit_lines_and_loans: Option<f64>,
    pub number_of_times_90_days_late: Option<f64>,
    pub number_real_estate_loans_or_lines: Option<f64>,
    pub number_of_time_60_89_days_past_due_not_worse: Option<f64>,
    pub number_of_dependents: Option<f64>,
    pub total_delinquencies: Option<f64>,
}

impl RawRecord {
    /// All fields with their canonical names, in table order.
    pub fn fields(&self) -> [(&'static str, Option<f64>); 11] {
        [
            (
                fields::UTILIZATION,
                self.revolving_utilization_of_unsecured_lines,
            ),
            (fields::AGE, self.age),
            (
                fields::PAST_DUE_30_59,
                self.number_of_time_30_59_days_past_due_not_worse,
            ),
            (fields::DEBT_RATIO, self.debt_ratio),
            (fields::MONTHLY_INCOME, self.monthly_income),
            (
                fields::OPEN_CREDIT_LINES,
                self.number_of_open_credit_lines_and_loans,
            ),
            (
                fields::TIMES_90_DAYS_LATE,
                self.number_of_times_90_days_late,
            ),
            (
                fields::REAL_ESTATE_LOANS,
                self.number_real_estate_loans_or_lines,
            ),
            (
                fields::PAST_DUE_60_89,
                self.number_of_time_60_89_days_past_due_not_worse,
            ),
            (fields::DEPENDENTS, self.number_of_dependents),
            (fields::TOTAL_DELINQUENCIES, self.total_delinquencies),
        ]
    }

    /// Reject NaN/Inf in any present field. JSON cannot encode these, but the
    /// raw SQLite table can, and the transform must never see them.
    pub fn check_finite(&self) -> Result<(), ScoreError> {
        for (name, value) in self.fields() {
            if let Some(v) = value {
                if !v.is_finite() {
                    return Err(ScoreError::MalformedInput {
                        field: name.to_string(),
                        reason: format!("non-finite value {v}"),
                    });
                }
            }
        }
        Ok(())
    }
}

/// The engineered feature mapping the model was trained against.
///
/// Field names and [`pairs`](Self::pairs) order mirror
/// [`fields::ENGINEERED_FEATURES`] exactly.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineeredRecord {
    pub age: f64,
    pub number_of_open_credit_lines_and_loans: f64,
    pub number_real_estate_loans_or_lines: f64,
    pub number_of_dependents: f64,
    pub income_missing: f64,
    pub dependents_missing: f64,
    pub revolving_utilization_log: f64,
    pub income_log: f64,
    pub debt_ratio_log: f64,
    pub total_delinquencies_log: f64,
    pub high_utilization_flag: f64,
    pub income_per_credit_line: f64,
    pub age_group_midage: f64,
    pub age_group_senior: f64,
    pub dependents_group_small: f64,
    pub dependents_group_large: f64,
    pub util_x_late: f64,
    pub income_per_dependent: f64,
    pub credit_lines_x_delinquencies: f64,
}

impl EngineeredRecord {
    /// Name/value pairs in canonical layout order.
    pub fn pairs(&self) -> [(&'static str, f64); fields::FEATURE_COUNT] {
        [
            ("age", self.age),
            (
                "number_of_open_credit_lines_and_loans",
                self.number_of_open_credit_lines_and_loans,
            ),
            (
                "number_real_estate_loans_or_lines",
                self.number_real_estate_loans_or_lines,
            ),
            ("number_of_dependents", self.number_of_dependents),
            ("income_missing", self.income_missing),
            ("dependents_missing", self.dependents_missing),
            (
                "revolving_utilization_log",
                self.revolving_utilization_log,
            ),
            ("income_log", self.income_log),
            ("debt_ratio_log", self.debt_ratio_log),
            ("total_delinquencies_log", self.total_delinquencies_log),
            ("high_utilization_flag", self.high_utilization_flag),
            ("income_per_credit_line", self.income_per_credit_line),
            ("age_group_midage", self.age_group_midage),
            ("age_group_senior", self.age_group_senior),
            ("dependents_group_small", self.dependents_group_small),
            ("dependents_group_large", self.dependents_group_large),
            ("util_x_late", self.util_x_late),
            ("income_per_dependent", self.income_per_dependent),
            (
                "credit_lines_x_delinquencies",
                self.credit_lines_x_delinquencies,
            ),
        ]
    }

    /// Look up a feature value by canonical name.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.pairs()
            .into_iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v)
    }

    /// Rebuild a record from a name/value map (engineered table read-back).
    /// Fails with `MissingFeatures` naming every absent canonical feature.
    pub fn from_map(map: &std::collections::BTreeMap<String, f64>) -> Result<Self, ScoreError> {
        let missing: Vec<String> = fields::ENGINEERED_FEATURES
            .iter()
            .filter(|name| !map.contains_key(**name))
            .map(|name| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ScoreError::MissingFeatures(missing));
        }

        let get = |name: &str| map[name];
        Ok(Self {
            age: get("age"),
            number_of_open_credit_lines_and_loans: get("number_of_open_credit_lines_and_loans"),
            number_real_estate_loans_or_lines: get("number_real_estate_loans_or_lines"),
            number_of_dependents: get("number_of_dependents"),
            income_missing: get("income_missing"),
            dependents_missing: get("dependents_missing"),
            revolving_utilization_log: get("revolving_utilization_log"),
            income_log: get("income_log"),
            debt_ratio_log: get("debt_ratio_log"),
            total_delinquencies_log: get("total_delinquencies_log"),
            high_utilization_flag: get("high_utilization_flag"),
            income_per_credit_line: get("income_per_credit_line"),
            age_group_midage: get("age_group_midage"),
            age_group_senior: get("age_group_senior"),
            dependents_group_small: get("dependents_group_small"),
            dependents_group_large: get("dependents_group_large"),
            util_x_late: get("util_x_late"),
            income_per_dependent: get("income_per_dependent"),
            credit_lines_x_delinquencies: get("credit_lines_x_delinquencies"),
        })
    }
}
