//! Configuration module

use std::env;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite database path for the batch pipeline tables
    pub db_path: String,

    /// ONNX model artifact path
    pub model_path: String,

    /// Model metadata artifact path (threshold + feature list)
    pub metadata_path: String,

    /// Server port
    pub port: u16,

    /// Environment (development, production)
    pub environment: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            db_path: env::var("LOANVET_DB").unwrap_or_else(|_| "data/loanvet.db".to_string()),

            model_path: env::var("LOANVET_MODEL")
                .unwrap_or_else(|_| "models/credit_model.onnx".to_string()),

            metadata_path: env::var("LOANVET_METADATA")
                .unwrap_or_else(|_| "models/credit_metadata.json".to_string()),

            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),

            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
        }
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}
