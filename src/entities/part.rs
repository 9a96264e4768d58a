//! Part definition - geometry and build packing of the part being costed

use serde::{Deserialize, Serialize};

/// Geometry and packing of one part as reported by the slicer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartSpec {
    /// Part name
    pub name: String,

    /// Part volume in mm³
    pub volume_mm3: f64,

    /// Part height along the build axis in mm
    pub height_mm: f64,

    /// Surface area in mm²
    pub surface_area_mm2: f64,

    /// Support structure volume in mm³
    #[serde(default)]
    pub support_volume_mm3: f64,

    /// Layer thickness in mm
    pub layer_thickness_mm: f64,

    /// Parts produced simultaneously in one build
    #[serde(default = "default_parts_per_build")]
    pub parts_per_build: u32,

    /// Fraction of the powder charge that ends up in the part, (0, 1]
    #[serde(default = "default_material_utilization")]
    pub material_utilization: f64,
}

fn default_parts_per_build() -> u32 {
    1
}

fn default_material_utilization() -> f64 {
    0.6
}

impl PartSpec {
    /// Total melted volume of a single part including supports, in mm³
    pub fn melt_volume_mm3(&self) -> f64 {
        self.volume_mm3 + self.support_volume_mm3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_applied_when_omitted() {
        let yaml = r#"
name: Bracket
volume_mm3: 50000
height_mm: 50
surface_area_mm2: 12000
layer_thickness_mm: 0.03
"#;
        let part: PartSpec = serde_yml::from_str(yaml).unwrap();
        assert_eq!(part.parts_per_build, 1);
        assert_eq!(part.support_volume_mm3, 0.0);
        assert!((part.material_utilization - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_melt_volume_includes_supports() {
        let part = PartSpec {
            name: "Bracket".to_string(),
            volume_mm3: 50_000.0,
            height_mm: 50.0,
            surface_area_mm2: 12_000.0,
            support_volume_mm3: 5_000.0,
            layer_thickness_mm: 0.03,
            parts_per_build: 4,
            material_utilization: 0.6,
        };
        assert_eq!(part.melt_volume_mm3(), 55_000.0);
    }
}
