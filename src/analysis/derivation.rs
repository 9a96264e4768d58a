//! Physical build quantities derived from part, machine and material
//!
//! All values are recomputed on every call; nothing here is stored alongside
//! the inputs it came from.

use serde::{Deserialize, Serialize};

use crate::core::error::ModelError;
use crate::entities::{MachineSpec, MaterialSpec, PartSpec};

/// Laser hatch spacing in mm
pub const HATCH_SPACING_MM: f64 = 0.1;

/// Recoater travel time per layer in seconds
pub const RECOAT_SECONDS_PER_LAYER: f64 = 10.0;

/// Absorbs floating-point noise in `height / thickness` before rounding up
const LAYER_EPSILON: f64 = 1e-9;

/// Mass, powder and build-time figures for one job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedQuantities {
    /// Mass of one part including supports, kg
    pub part_mass_kg: f64,

    /// Powder charged per part, kg
    pub total_powder_mass_kg: f64,

    pub num_layers: u64,

    /// Melted volume of the whole build, mm³
    pub total_melt_volume_mm3: f64,

    /// Volumetric build rate, mm³/s
    pub build_rate_mm3_s: f64,

    pub scanning_time_s: f64,
    pub recoating_time_s: f64,

    /// Wall-clock time of one build, hours
    pub build_time_hours: f64,
}

impl DerivedQuantities {
    /// Run the build-time model
    pub fn compute(
        part: &PartSpec,
        machine: &MachineSpec,
        material: &MaterialSpec,
    ) -> Result<Self, ModelError> {
        let layer_thickness = ModelError::require_positive("layer_thickness_mm", part.layer_thickness_mm)?;
        let scan_speed = ModelError::require_positive("scan_speed_mm_s", machine.scan_speed_mm_s)?;
        let utilization =
            ModelError::require_positive("material_utilization", part.material_utilization)?;
        let parts_per_build = ModelError::require_nonzero("parts_per_build", part.parts_per_build)?;
        ModelError::require_positive("volume_mm3", part.volume_mm3)?;
        ModelError::require_positive("density_g_cm3", material.density_g_cm3)?;

        let part_mass_kg = part_mass_kg(part, material);
        let total_powder_mass_kg = part_mass_kg / utilization;

        let num_layers = (part.height_mm / layer_thickness - LAYER_EPSILON).ceil().max(0.0) as u64;
        let total_melt_volume_mm3 = part.melt_volume_mm3() * f64::from(parts_per_build);
        let build_rate_mm3_s = layer_thickness * HATCH_SPACING_MM * scan_speed;
        let scanning_time_s = total_melt_volume_mm3 / build_rate_mm3_s;
        let recoating_time_s = num_layers as f64 * RECOAT_SECONDS_PER_LAYER;
        let build_time_hours = (scanning_time_s + recoating_time_s) / 3600.0;

        Ok(Self {
            part_mass_kg,
            total_powder_mass_kg,
            num_layers,
            total_melt_volume_mm3,
            build_rate_mm3_s,
            scanning_time_s,
            recoating_time_s,
            build_time_hours,
        })
    }
}

/// Mass of one part plus its supports in kg
pub fn part_mass_kg(part: &PartSpec, material: &MaterialSpec) -> f64 {
    (part.melt_volume_mm3() / 1000.0) * material.density_g_cm3 / 1000.0
}
