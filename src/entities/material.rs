//! Material definition - metal powder properties

use serde::{Deserialize, Serialize};

use crate::core::identity::EntityId;

/// Powder material catalog record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialSpec {
    /// Catalog ID (MAT-...), if the record came from a catalog
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,

    /// Material name
    pub name: String,

    /// Short alloy code (e.g. Ti-6Al-4V)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    /// Density in g/cm³
    pub density_g_cm3: f64,

    /// Virgin powder price per kg
    pub price_per_kg: f64,

    /// Embodied carbon in kg CO₂e per kg
    #[serde(default)]
    pub embodied_carbon_per_kg: f64,

    /// Fraction of unused powder that can be sieved and reused, (0, 1]
    pub recycling_efficiency: f64,
}
