//! Core domain types for the BAC tracker.
//!
//! This module defines the fundamental types used throughout the system:
//! - Drink events as logged by the user
//! - Physiological parameters fed into the simulation
//! - Simulated BAC samples
//! - Session analytics derived from a simulated series

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Drink Events
// ============================================================================

/// A single logged drink
///
/// `standard_drinks` is computed once in [`DrinkEvent::new`] and never
/// recomputed, even when the timestamp is corrected later.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DrinkEvent {
    pub id: Uuid,
    pub name: String,
    pub volume_ml: f64,
    pub abv_percent: f64,
    pub standard_drinks: f64,
    pub timestamp_ms: i64,
}

impl DrinkEvent {
    /// Create a new drink event with a fresh id
    pub fn new(
        name: impl Into<String>,
        volume_ml: f64,
        abv_percent: f64,
        timestamp_ms: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            volume_ml,
            abv_percent,
            standard_drinks: crate::units::to_standard_drinks(volume_ml, abv_percent),
            timestamp_ms,
        }
    }

    /// Time the drink was consumed
    pub fn consumed_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.timestamp_ms).unwrap_or_default()
    }
}

// ============================================================================
// Simulation Parameters
// ============================================================================

/// Sex used to pick the Widmark distribution ratio
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Sex {
    #[default]
    Male,
    Female,
}

impl Sex {
    /// Widmark "r" for this sex
    pub fn distribution_ratio(self) -> f64 {
        match self {
            Sex::Male => 0.68,
            Sex::Female => 0.55,
        }
    }
}

/// Physiological inputs to the simulation, read-only per invocation
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct SimulationParameters {
    pub body_weight_kg: f64,
    pub sex: Sex,
    /// Standard drinks eliminated per hour during the session's first hour
    pub first_hour_burn_rate: f64,
    /// Standard drinks eliminated per hour after the first hour
    pub subsequent_hour_burn_rate: f64,
}

impl SimulationParameters {
    pub const MAX_FIRST_HOUR_BURN_RATE: f64 = 4.0;
    pub const MAX_SUBSEQUENT_HOUR_BURN_RATE: f64 = 3.0;

    pub fn distribution_ratio(&self) -> f64 {
        self.sex.distribution_ratio()
    }
}

impl Default for SimulationParameters {
    fn default() -> Self {
        Self {
            body_weight_kg: 70.0,
            sex: Sex::Male,
            first_hour_burn_rate: 2.0,
            subsequent_hour_burn_rate: 1.0,
        }
    }
}

// ============================================================================
// Simulation Output
// ============================================================================

/// One sample of the simulated BAC series
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct SimulationPoint {
    pub time_ms: i64,
    pub bac_percent: f64,
}

impl SimulationPoint {
    pub fn time(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.time_ms).unwrap_or_default()
    }
}

/// Where the session stands relative to the legal threshold
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ThresholdStatus {
    /// Peak never reached the threshold
    UnderThreshold,
    /// Peak reached the threshold; `crossing_time_ms` is when BAC falls back
    /// to or below it. When `is_projected` is set the series ran out before
    /// a real crossing and the last sample is reported instead.
    OverThreshold {
        crossing_time_ms: i64,
        crossing_bac_percent: f64,
        is_projected: bool,
    },
}

/// Summary facts derived from a simulated series
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct SessionAnalytics {
    pub peak_bac_percent: f64,
    pub peak_time_ms: i64,
    pub status: ThresholdStatus,
}

impl SessionAnalytics {
    pub fn is_over_threshold(&self) -> bool {
        matches!(self.status, ThresholdStatus::OverThreshold { .. })
    }

    pub fn threshold_crossing_time_ms(&self) -> Option<i64> {
        match self.status {
            ThresholdStatus::UnderThreshold => None,
            ThresholdStatus::OverThreshold {
                crossing_time_ms, ..
            } => Some(crossing_time_ms),
        }
    }

    pub fn is_projected(&self) -> bool {
        matches!(
            self.status,
            ThresholdStatus::OverThreshold {
                is_projected: true,
                ..
            }
        )
    }
}
