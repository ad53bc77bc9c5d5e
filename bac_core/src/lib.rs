#![forbid(unsafe_code)]

//! Core domain model and simulation logic for the BAC tracker.
//!
//! This crate provides:
//! - Domain types (drink events, simulation parameters, samples, analytics)
//! - Standard-drink conversion
//! - BAC simulation engine (Widmark, two-phase elimination)
//! - Analytics (peak, threshold crossing, projection)
//! - Drink log persistence and preset catalog
//! - CSV export of simulated series

pub mod types;
pub mod error;
pub mod units;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod store;
pub mod engine;
pub mod analytics;
pub mod export;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use units::{to_standard_drinks, validate_drink_input};
pub use catalog::{build_default_catalog, get_default_catalog};
pub use config::Config;
pub use store::DrinkLog;
pub use engine::{simulate, SimulationCache};
pub use analytics::{analyze, estimate_at, LEGAL_THRESHOLD_BAC};
pub use export::{export_series_csv, write_series_csv};
