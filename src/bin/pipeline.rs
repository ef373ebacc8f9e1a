//! LoanVet batch pipeline binary.
//!
//! Offline, single-pass run over the raw applicant table:
//!
//! ```text
//! pipeline            clean + feature-engineer (raw -> cleaned -> engineered)
//! pipeline score      also score the engineered table with the loaded model
//! ```

use std::path::Path;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use loanvet::config::Config;
use loanvet::{db, pipeline, ScoringContext};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "loanvet=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();
    let config = Config::from_env();
    let with_scoring = std::env::args().any(|arg| arg == "score");

    let mut conn = db::open(Path::new(&config.db_path))
        .with_context(|| format!("opening database `{}`", config.db_path))?;

    let report = pipeline::run_etl(&mut conn).context("ETL run failed")?;
    tracing::info!(
        rows_in = report.rows_in,
        duplicates_removed = report.duplicates_removed,
        rows_out = report.rows_out,
        median_income = report.median_income,
        median_dependents = report.median_dependents,
        "ETL complete"
    );

    if with_scoring {
        let ctx = ScoringContext::load(&config).context("loading model for batch scoring")?;
        let scored = pipeline::run_scoring(&mut conn, &ctx).context("batch scoring failed")?;
        tracing::info!(rows = scored, "batch scoring complete");
    }

    Ok(())
}
