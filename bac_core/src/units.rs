//! Standard-drink conversion.
//!
//! A standard drink here is `volume (L) * ABV% * 0.789`, i.e. grams of
//! ethanol per 10 g. Conversion is total for finite non-negative input;
//! rejecting anything else is the caller's job (see [`validate_drink_input`]).

use crate::{Error, Result};

/// Density of ethanol in g/ml
pub const ETHANOL_DENSITY: f64 = 0.789;

/// Convert a drink's volume and strength to standard drinks
pub fn to_standard_drinks(volume_ml: f64, abv_percent: f64) -> f64 {
    (volume_ml / 1000.0) * abv_percent * ETHANOL_DENSITY
}

/// Reject drink attributes the converter should never see
pub fn validate_drink_input(volume_ml: f64, abv_percent: f64) -> Result<()> {
    if !volume_ml.is_finite() || volume_ml <= 0.0 {
        return Err(Error::InvalidDrink(format!(
            "volume must be a positive number of ml, got {}",
            volume_ml
        )));
    }

    if !abv_percent.is_finite() || !(0.0..=100.0).contains(&abv_percent) {
        return Err(Error::InvalidDrink(format!(
            "ABV must be between 0 and 100 percent, got {}",
            abv_percent
        )));
    }

    Ok(())
}
