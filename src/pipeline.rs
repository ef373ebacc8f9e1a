//! Batch stage orchestration.
//!
//! Single-pass offline run: read the raw table, normalize once (statistics
//! computed over the whole batch), derive through the same transform the
//! serving path uses, and replace the downstream tables. Optionally scores
//! the engineered table when a model is available.

use rusqlite::Connection;

use crate::context::ScoringContext;
use crate::db;
use crate::error::PipelineError;
use crate::features::{derive, normalize};
use crate::model::validate;

/// What one ETL run did, for operator logs.
#[derive(Debug, Clone, PartialEq)]
pub struct EtlReport {
    pub rows_in: usize,
    pub duplicates_removed: usize,
    pub rows_out: usize,
    pub median_income: f64,
    pub median_dependents: f64,
}

/// raw -> cleaned -> engineered. Each stage write replaces its table.
pub fn run_etl(conn: &mut Connection) -> Result<EtlReport, PipelineError> {
    let raw_rows = db::read_raw(conn)?;
    let rows_in = raw_rows.len();
    tracing::info!(rows = rows_in, table = db::RAW_TABLE, "loaded raw table");

    let batch = normalize::normalize(raw_rows);
    db::write_cleaned(conn, &batch)?;
    tracing::info!(
        rows = batch.rows.len(),
        table = db::CLEANED_TABLE,
        "cleaned table written"
    );

    let mut engineered = Vec::with_capacity(batch.rows.len());
    for (index, row) in batch.rows.iter().enumerate() {
        let record = derive(&row.record, Some(&batch.stats)).map_err(|source| {
            PipelineError::Row {
                table: db::CLEANED_TABLE.to_string(),
                row: index,
                source,
            }
        })?;
        engineered.push((record, row.target));
    }
    db::write_engineered(conn, &engineered)?;
    tracing::info!(
        rows = engineered.len(),
        table = db::ENGINEERED_TABLE,
        "engineered table written"
    );

    Ok(EtlReport {
        rows_in,
        duplicates_removed: batch.duplicates_removed,
        rows_out: batch.rows.len(),
        median_income: batch.stats.median_income,
        median_dependents: batch.stats.median_dependents,
    })
}

/// Score every engineered row against the loaded model and replace the
/// scored table. Validation runs per row; the model never sees a vector in
/// the wrong order.
pub fn run_scoring(
    conn: &mut Connection,
    ctx: &ScoringContext,
) -> Result<usize, PipelineError> {
    let engineered = db::read_engineered(conn)?;

    let mut scored = Vec::with_capacity(engineered.len());
    for (index, (record, target)) in engineered.iter().enumerate() {
        let vector = validate(record, &ctx.spec).map_err(|source| PipelineError::Row {
            table: db::ENGINEERED_TABLE.to_string(),
            row: index,
            source,
        })?;
        let result = ctx.score_vector(&vector).map_err(|source| PipelineError::Row {
            table: db::ENGINEERED_TABLE.to_string(),
            row: index,
            source,
        })?;
        scored.push((result, *target));
    }

    db::write_scores(conn, &scored)?;
    tracing::info!(
        rows = scored.len(),
        table = db::SCORED_TABLE,
        "scored table written"
    );
    Ok(scored.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScoreError;
    use crate::features::{fields, ENGINEERED_FEATURES};
    use crate::model::{Classifier, FeatureSpec};

    struct FixedClassifier(f64);

    impl Classifier for FixedClassifier {
        fn predict_probability(&self, _features: &[f64]) -> Result<f64, ScoreError> {
            Ok(self.0)
        }
    }

    fn seeded_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(&format!(
            "CREATE TABLE {raw} (
                 {util} REAL, {age} REAL, {d30} REAL, {debt} REAL, {income} REAL,
                 {lines} REAL, {d90} REAL, {estate} REAL, {d60} REAL, {deps} REAL,
                 {target} REAL
             );
             INSERT INTO {raw} VALUES (0.9, 45, 1, 0.4, 4000, 6, 2, 1, 0, 2, 1);
             INSERT INTO {raw} VALUES (0.9, 45, 1, 0.4, 4000, 6, 2, 1, 0, 2, 1);
             INSERT INTO {raw} VALUES (0.1, 62, 0, 0.1, NULL, 3, 0, 0, 0, NULL, 0);
             INSERT INTO {raw} VALUES (2.5, 130, 0, 0.2, 8000, 4, 0, 2, 0, 1, 0);",
            raw = db::RAW_TABLE,
            util = fields::UTILIZATION,
            age = fields::AGE,
            d30 = fields::PAST_DUE_30_59,
            debt = fields::DEBT_RATIO,
            income = fields::MONTHLY_INCOME,
            lines = fields::OPEN_CREDIT_LINES,
            d90 = fields::TIMES_90_DAYS_LATE,
            estate = fields::REAL_ESTATE_LOANS,
            d60 = fields::PAST_DUE_60_89,
            deps = fields::DEPENDENTS,
            target = fields::TARGET,
        ))
        .unwrap();
        conn
    }

    #[test]
    fn etl_produces_all_stage_tables() {
        let mut conn = seeded_connection();
        let report = run_etl(&mut conn).unwrap();

        assert_eq!(report.rows_in, 4);
        assert_eq!(report.duplicates_removed, 1);
        assert_eq!(report.rows_out, 3);
        // medians over present, clipped values: income {4000, 8000} -> 6000
        assert_eq!(report.median_income, 6000.0);

        let engineered: i64 = conn
            .query_row(
                &format!("SELECT COUNT(*) FROM {}", db::ENGINEERED_TABLE),
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(engineered, 3);
    }

    #[test]
    fn etl_clips_before_deriving() {
        let mut conn = seeded_connection();
        run_etl(&mut conn).unwrap();

        // the age-130 row clips to 100 and lands in the senior bucket
        let senior: f64 = conn
            .query_row(
                &format!(
                    "SELECT age_group_senior FROM {} WHERE age = 100",
                    db::ENGINEERED_TABLE
                ),
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(senior, 1.0);
    }

    #[test]
    fn scoring_stage_fills_the_scored_table() {
        let mut conn = seeded_connection();
        run_etl(&mut conn).unwrap();

        let ctx = ScoringContext::new(
            FeatureSpec::for_tests(0.5, ENGINEERED_FEATURES),
            Box::new(FixedClassifier(0.7)),
        );
        let scored = run_scoring(&mut conn, &ctx).unwrap();
        assert_eq!(scored, 3);

        let labels: i64 = conn
            .query_row(
                &format!("SELECT SUM(label) FROM {}", db::SCORED_TABLE),
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(labels, 3);
    }

    #[test]
    fn scoring_fails_fast_on_spec_mismatch() {
        let mut conn = seeded_connection();
        run_etl(&mut conn).unwrap();

        let ctx = ScoringContext::new(
            FeatureSpec::for_tests(0.5, &["age", "external_score"]),
            Box::new(FixedClassifier(0.7)),
        );
        let err = run_scoring(&mut conn, &ctx).unwrap_err();
        assert!(matches!(err, PipelineError::Row { .. }));
    }
}
