//! Schema validation between the transform and the model.
//!
//! The engineered key set must equal the spec's feature set exactly; a
//! mismatch is always reported with the offending names, never papered over
//! by dropping or zero-padding. On success the record is flattened into a
//! positional vector in the spec's order.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::ScoreError;
use crate::features::EngineeredRecord;
use crate::model::FeatureSpec;

/// Check the engineered record against the spec and emit the ordered vector
/// the classifier consumes. Component `i` of the result is the value of
/// `spec.features[i]`.
pub fn validate(
    engineered: &EngineeredRecord,
    spec: &FeatureSpec,
) -> Result<Vec<f64>, ScoreError> {
    let map: BTreeMap<&'static str, f64> = engineered.pairs().into_iter().collect();

    let missing: Vec<String> = spec
        .features
        .iter()
        .filter(|name| !map.contains_key(name.as_str()))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(ScoreError::MissingFeatures(missing));
    }

    let spec_set: BTreeSet<&str> = spec.features.iter().map(String::as_str).collect();
    let unexpected: Vec<String> = map
        .keys()
        .filter(|name| !spec_set.contains(*name))
        .map(|name| name.to_string())
        .collect();
    if !unexpected.is_empty() {
        return Err(ScoreError::UnexpectedFeatures(unexpected));
    }

    Ok(spec
        .features
        .iter()
        .map(|name| map[name.as_str()])
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{derive, RawRecord, ENGINEERED_FEATURES};

    fn engineered() -> EngineeredRecord {
        let raw = RawRecord {
            age: Some(42.0),
            monthly_income: Some(3000.0),
            number_of_dependents: Some(1.0),
            number_of_open_credit_lines_and_loans: Some(4.0),
            number_real_estate_loans_or_lines: Some(1.0),
            debt_ratio: Some(0.3),
            revolving_utilization_of_unsecured_lines: Some(0.5),
            total_delinquencies: Some(2.0),
            ..RawRecord::default()
        };
        derive(&raw, None).unwrap()
    }

    #[test]
    fn exact_match_yields_spec_ordered_vector() {
        let record = engineered();
        // deliberately not the canonical order
        let mut names: Vec<&str> = ENGINEERED_FEATURES.to_vec();
        names.reverse();
        let spec = FeatureSpec::for_tests(0.5, &names);

        let vector = validate(&record, &spec).unwrap();
        assert_eq!(vector.len(), names.len());
        for (i, name) in spec.features.iter().enumerate() {
            assert_eq!(vector[i], record.get(name).unwrap(), "feature {name}");
        }
    }

    #[test]
    fn missing_features_are_named_exactly() {
        let mut names: Vec<&str> = ENGINEERED_FEATURES.to_vec();
        names.push("credit_score_external");
        names.push("bureau_inquiries");
        let spec = FeatureSpec::for_tests(0.5, &names);

        match validate(&engineered(), &spec) {
            Err(ScoreError::MissingFeatures(missing)) => {
                assert_eq!(missing, vec!["credit_score_external", "bureau_inquiries"]);
            }
            other => panic!("expected MissingFeatures, got {other:?}"),
        }
    }

    #[test]
    fn unexpected_features_are_named_exactly() {
        // spec knows fewer features than the transform emits
        let names: Vec<&str> = ENGINEERED_FEATURES
            .iter()
            .copied()
            .filter(|n| *n != "util_x_late")
            .collect();
        let spec = FeatureSpec::for_tests(0.5, &names);

        match validate(&engineered(), &spec) {
            Err(ScoreError::UnexpectedFeatures(unexpected)) => {
                assert_eq!(unexpected, vec!["util_x_late"]);
            }
            other => panic!("expected UnexpectedFeatures, got {other:?}"),
        }
    }

    #[test]
    fn missing_is_reported_before_unexpected() {
        let spec = FeatureSpec::for_tests(0.5, &["age", "external_score"]);
        match validate(&engineered(), &spec) {
            Err(ScoreError::MissingFeatures(missing)) => {
                assert_eq!(missing, vec!["external_score"]);
            }
            other => panic!("expected MissingFeatures, got {other:?}"),
        }
    }
}
