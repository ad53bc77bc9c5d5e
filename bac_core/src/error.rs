//! Error types for the bac_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for bac_core operations
///
/// The simulation engine and analytics never produce these; they only
/// arise at the edges (input validation, persistence, configuration).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Drink attributes rejected before conversion
    #[error("Invalid drink: {0}")]
    InvalidDrink(String),

    /// No drink matches the given id or prefix
    #[error("No drink found matching '{0}'")]
    DrinkNotFound(String),

    /// More than one drink matches the given prefix
    #[error("Drink id prefix '{0}' is ambiguous")]
    AmbiguousDrink(String),

    /// Unparseable time argument
    #[error("Invalid time: {0}")]
    InvalidTime(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
