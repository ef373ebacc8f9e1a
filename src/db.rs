//! SQLite table I/O for the batch boundary.
//!
//! One table per pipeline stage: `credit_risk_raw` is read, and each
//! downstream stage replaces its target table wholesale inside a transaction,
//! so a failed run never leaves a partially written stage behind.

use std::collections::BTreeMap;
use std::path::Path;

use rusqlite::types::ValueRef;
use rusqlite::{params_from_iter, Connection};

use crate::error::{PipelineError, ScoreError};
use crate::features::normalize::{NormalizedBatch, RawRow};
use crate::features::transform::{dependents_missing_flag, income_missing_flag};
use crate::features::{fields, EngineeredRecord, RawRecord, ENGINEERED_FEATURES};
use crate::model::ScoreResult;

pub const RAW_TABLE: &str = "credit_risk_raw";
pub const CLEANED_TABLE: &str = "credit_risk_cleaned";
pub const ENGINEERED_TABLE: &str = "credit_risk_engineered";
pub const SCORED_TABLE: &str = "credit_risk_scored";

/// Open the pipeline database.
pub fn open(path: &Path) -> Result<Connection, PipelineError> {
    let conn = Connection::open(path)?;
    conn.busy_timeout(std::time::Duration::from_secs(5))?;
    Ok(conn)
}

/// Interpret one cell as an optional numeric value.
///
/// The importer upstream writes NULL for missing values, but CSV-sourced
/// tables sometimes carry the literal `NA` marker or empty strings instead;
/// those count as missing. Any other non-numeric text is malformed input.
fn numeric_cell(
    value: ValueRef<'_>,
    table: &str,
    column: &str,
    row: usize,
) -> Result<Option<f64>, PipelineError> {
    let malformed = |reason: String| PipelineError::Row {
        table: table.to_string(),
        row,
        source: ScoreError::MalformedInput {
            field: column.to_string(),
            reason,
        },
    };

    match value {
        ValueRef::Null => Ok(None),
        ValueRef::Integer(i) => Ok(Some(i as f64)),
        ValueRef::Real(f) => Ok(Some(f)),
        ValueRef::Text(bytes) => {
            let text = std::str::from_utf8(bytes)
                .map_err(|_| malformed("non-UTF-8 text".to_string()))?
                .trim();
            if text.is_empty() || text.eq_ignore_ascii_case("na") {
                return Ok(None);
            }
            text.parse::<f64>()
                .map(Some)
                .map_err(|_| malformed(format!("unparseable value `{text}`")))
        }
        ValueRef::Blob(_) => Err(malformed("blob value".to_string())),
    }
}

/// Read the full raw applicant table.
///
/// Columns are matched by name against the raw-field vocabulary; anything
/// else (importer index columns and the like) is ignored.
pub fn read_raw(conn: &Connection) -> Result<Vec<RawRow>, PipelineError> {
    let mut stmt = conn.prepare(&format!("SELECT * FROM {RAW_TABLE}"))?;
    let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();

    let mut rows = stmt.query([])?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let index = out.len();
        let mut record = RawRecord::default();
        let mut target = None;
        for (i, column) in columns.iter().enumerate() {
            let value = numeric_cell(row.get_ref(i)?, RAW_TABLE, column, index)?;
            match column.as_str() {
                fields::UTILIZATION => record.revolving_utilization_of_unsecured_lines = value,
                fields::AGE => record.age = value,
                fields::PAST_DUE_30_59 => {
                    record.number_of_time_30_59_days_past_due_not_worse = value;
                }
                fields::DEBT_RATIO => record.debt_ratio = value,
                fields::MONTHLY_INCOME => record.monthly_income = value,
                fields::OPEN_CREDIT_LINES => {
                    record.number_of_open_credit_lines_and_loans = value;
                }
                fields::TIMES_90_DAYS_LATE => record.number_of_times_90_days_late = value,
                fields::REAL_ESTATE_LOANS => record.number_real_estate_loans_or_lines = value,
                fields::PAST_DUE_60_89 => {
                    record.number_of_time_60_89_days_past_due_not_worse = value;
                }
                fields::DEPENDENTS => record.number_of_dependents = value,
                fields::TOTAL_DELINQUENCIES => record.total_delinquencies = value,
                fields::TARGET => target = value,
                _ => {}
            }
        }
        out.push(RawRow { record, target });
    }

    if out.is_empty() {
        return Err(PipelineError::EmptyTable(RAW_TABLE.to_string()));
    }
    Ok(out)
}

/// Replace the cleaned table: clipped raw columns, imputed income/dependents,
/// missing flags, and the carried-through target.
pub fn write_cleaned(conn: &mut Connection, batch: &NormalizedBatch) -> Result<(), PipelineError> {
    let tx = conn.transaction()?;
    tx.execute_batch(&format!(
        "DROP TABLE IF EXISTS {CLEANED_TABLE};
         CREATE TABLE {CLEANED_TABLE} (
             {util} REAL,
             {age} REAL,
             {d30} REAL,
             {debt} REAL,
             {income} REAL,
             {lines} REAL,
             {d90} REAL,
             {estate} REAL,
             {d60} REAL,
             {deps} REAL,
             monthly_income_missing INTEGER NOT NULL,
             number_of_dependents_missing INTEGER NOT NULL,
             {target} REAL
         );",
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
    ))?;

    {
        let mut stmt = tx.prepare(&format!(
            "INSERT INTO {CLEANED_TABLE} VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"
        ))?;
        for row in &batch.rows {
            let r = &row.record;
            stmt.execute(rusqlite::params![
                r.revolving_utilization_of_unsecured_lines,
                r.age,
                r.number_of_time_30_59_days_past_due_not_worse,
                r.debt_ratio,
                r.monthly_income.or(Some(batch.stats.median_income)),
                r.number_of_open_credit_lines_and_loans,
                r.number_of_times_90_days_late,
                r.number_real_estate_loans_or_lines,
                r.number_of_time_60_89_days_past_due_not_worse,
                r.number_of_dependents.or(Some(batch.stats.median_dependents)),
                income_missing_flag(r) as i64,
                dependents_missing_flag(r) as i64,
                row.target,
            ])?;
        }
    }

    tx.commit()?;
    Ok(())
}

/// Replace the engineered table: the 19 canonical features plus the target.
pub fn write_engineered(
    conn: &mut Connection,
    rows: &[(EngineeredRecord, Option<f64>)],
) -> Result<(), PipelineError> {
    let feature_columns = ENGINEERED_FEATURES
        .iter()
        .map(|name| format!("{name} REAL NOT NULL"))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = (1..=ENGINEERED_FEATURES.len() + 1)
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ");

    let tx = conn.transaction()?;
    tx.execute_batch(&format!(
        "DROP TABLE IF EXISTS {ENGINEERED_TABLE};
         CREATE TABLE {ENGINEERED_TABLE} ({feature_columns}, {target} REAL);",
        target = fields::TARGET,
    ))?;

    {
        let mut stmt = tx.prepare(&format!(
            "INSERT INTO {ENGINEERED_TABLE} VALUES ({placeholders})"
        ))?;
        for (record, target) in rows {
            let values = record
                .pairs()
                .into_iter()
                .map(|(_, v)| Some(v))
                .chain(std::iter::once(*target));
            stmt.execute(params_from_iter(values))?;
        }
    }

    tx.commit()?;
    Ok(())
}

/// Read the engineered table back for batch scoring.
pub fn read_engineered(
    conn: &Connection,
) -> Result<Vec<(EngineeredRecord, Option<f64>)>, PipelineError> {
    let mut stmt = conn.prepare(&format!("SELECT * FROM {ENGINEERED_TABLE}"))?;
    let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();

    let mut rows = stmt.query([])?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let index = out.len();
        let mut map = BTreeMap::new();
        let mut target = None;
        for (i, column) in columns.iter().enumerate() {
            let value = numeric_cell(row.get_ref(i)?, ENGINEERED_TABLE, column, index)?;
            if column == fields::TARGET {
                target = value;
            } else if let Some(v) = value {
                map.insert(column.clone(), v);
            }
        }
        let record = EngineeredRecord::from_map(&map).map_err(|source| PipelineError::Row {
            table: ENGINEERED_TABLE.to_string(),
            row: index,
            source,
        })?;
        out.push((record, target));
    }

    if out.is_empty() {
        return Err(PipelineError::EmptyTable(ENGINEERED_TABLE.to_string()));
    }
    Ok(out)
}

/// Replace the scored table: probability and label per engineered row.
pub fn write_scores(
    conn: &mut Connection,
    rows: &[(ScoreResult, Option<f64>)],
) -> Result<(), PipelineError> {
    let tx = conn.transaction()?;
    tx.execute_batch(&format!(
        "DROP TABLE IF EXISTS {SCORED_TABLE};
         CREATE TABLE {SCORED_TABLE} (
             probability REAL NOT NULL,
             label INTEGER NOT NULL,
             {target} REAL
         );",
        target = fields::TARGET,
    ))?;

    {
        let mut stmt = tx.prepare(&format!("INSERT INTO {SCORED_TABLE} VALUES (?1, ?2, ?3)"))?;
        for (result, target) in rows {
            stmt.execute(rusqlite::params![
                result.probability,
                result.label as i64,
                target
            ])?;
        }
    }

    tx.commit()?;
    Ok(())
}
