//! Default catalog of drink presets.
//!
//! Presets let the CLI log common drinks without typing volume and ABV.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A named drink with typical serving size and strength
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DrinkPreset {
    pub id: String,
    pub name: String,
    pub volume_ml: f64,
    pub abv_percent: f64,
}

impl DrinkPreset {
    pub fn standard_drinks(&self) -> f64 {
        crate::to_standard_drinks(self.volume_ml, self.abv_percent)
    }
}

/// The complete set of presets, keyed by id
#[derive(Clone, Debug)]
pub struct Catalog {
    pub presets: BTreeMap<String, DrinkPreset>,
}

/// Cached default catalog - built once and reused across all operations
static DEFAULT_CATALOG: Lazy<Catalog> = Lazy::new(build_default_catalog);

/// Get a reference to the cached default catalog
pub fn get_default_catalog() -> &'static Catalog {
    &DEFAULT_CATALOG
}

/// Builds the default catalog with built-in presets
///
/// Prefer [`get_default_catalog`]; this is kept for tests and custom catalogs.
pub fn build_default_catalog() -> Catalog {
    let presets = [
        ("beer", "Beer (330ml, 5%)", 330.0, 5.0),
        ("pint", "Pint of beer (568ml, 4.5%)", 568.0, 4.5),
        ("strong_beer", "Strong beer (330ml, 8%)", 330.0, 8.0),
        ("cider", "Cider (500ml, 4.5%)", 500.0, 4.5),
        ("wine", "Glass of wine (150ml, 12%)", 150.0, 12.0),
        ("champagne", "Champagne (125ml, 12%)", 125.0, 12.0),
        ("shot", "Shot (40ml, 40%)", 40.0, 40.0),
        ("cocktail", "Cocktail (200ml, 15%)", 200.0, 15.0),
    ]
    .into_iter()
    .map(|(id, name, volume_ml, abv_percent)| {
        (
            id.to_string(),
            DrinkPreset {
                id: id.to_string(),
                name: name.to_string(),
                volume_ml,
                abv_percent,
            },
        )
    })
    .collect();

    Catalog { presets }
}

impl Catalog {
    pub fn get(&self, id: &str) -> Option<&DrinkPreset> {
        self.presets.get(&id.to_lowercase())
    }

    /// Validate every preset, returning a message per problem
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for (key, preset) in &self.presets {
            if key != &preset.id {
                errors.push(format!(
                    "Preset key '{}' does not match its id '{}'",
                    key, preset.id
                ));
            }

            if let Err(e) = crate::validate_drink_input(preset.volume_ml, preset.abv_percent) {
                errors.push(format!("Preset '{}': {}", preset.id, e));
            }
        }

        errors
    }
}
