//! LoanVet - credit-default risk scoring.
//!
//! Two entry points share this library:
//! - the serving binary (`src/main.rs`): loads the classifier once and scores
//!   single applicants over HTTP;
//! - the batch binary (`src/bin/pipeline.rs`): cleans and feature-engineers a
//!   full applicant table in SQLite, then optionally scores it.
//!
//! The feature derivation in [`features::transform`] is the one shared
//! implementation both paths call, so offline tables and online requests can
//! never drift apart.

pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod features;
pub mod handlers;
pub mod model;
pub mod pipeline;

pub use context::ScoringContext;
pub use error::{AppError, AppResult, PipelineError, ScoreError, StartupError};
