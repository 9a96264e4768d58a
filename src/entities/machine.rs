//! Machine definition - the powder-bed-fusion system a job runs on

use serde::{Deserialize, Serialize};

use crate::core::identity::EntityId;

/// Build envelope dimensions in mm
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BuildVolume {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Machine catalog record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineSpec {
    /// Catalog ID (MACH-...), if the record came from a catalog
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,

    /// Machine name
    pub name: String,

    /// Manufacturer model number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_number: Option<String>,

    /// Build envelope
    #[serde(default)]
    pub build_volume_mm: BuildVolume,

    /// Laser power in W
    #[serde(default)]
    pub laser_power_w: f64,

    /// Laser scan speed in mm/s
    pub scan_speed_mm_s: f64,

    /// Purchase price
    pub purchase_price: f64,

    /// Depreciation lifespan in years
    pub lifespan_years: u32,

    /// Service contract / annual maintenance cost
    #[serde(default)]
    pub annual_maintenance_cost: f64,
}

impl MachineSpec {
    /// Straight-line depreciation per year
    pub fn annual_depreciation(&self) -> f64 {
        self.purchase_price / f64::from(self.lifespan_years)
    }
}
