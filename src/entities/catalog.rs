//! Built-in machine and material catalog used to seed new job files

use crate::entities::machine::{BuildVolume, MachineSpec};
use crate::entities::material::MaterialSpec;

/// Reference machines, keyed by model number
pub fn builtin_machines() -> Vec<MachineSpec> {
    vec![
        machine("SLM 280", "SLM280", (280.0, 280.0, 365.0), 400.0, 7000.0, 750_000.0, 50_000.0),
        machine("SLM 500", "SLM500", (500.0, 280.0, 365.0), 700.0, 10_000.0, 1_200_000.0, 75_000.0),
        machine("EOS M290", "M290", (250.0, 250.0, 325.0), 400.0, 7000.0, 800_000.0, 55_000.0),
    ]
}

/// Reference powders, keyed by alloy code
pub fn builtin_materials() -> Vec<MaterialSpec> {
    vec![
        material("Titanium Ti-6Al-4V", "Ti-6Al-4V", 4.43, 350.0, 35.0, 0.90),
        material("Aluminum AlSi10Mg", "AlSi10Mg", 2.67, 45.0, 8.5, 0.92),
        material("Stainless Steel 316L", "316L", 7.99, 85.0, 6.2, 0.88),
        material("Inconel 718", "IN718", 8.19, 280.0, 42.0, 0.85),
    ]
}

/// Look up a machine by model number or name (case-insensitive)
pub fn find_machine(key: &str) -> Option<MachineSpec> {
    builtin_machines().into_iter().find(|m| {
        m.name.eq_ignore_ascii_case(key)
            || m.model_number
                .as_deref()
                .is_some_and(|n| n.eq_ignore_ascii_case(key))
    })
}

/// Look up a material by alloy code or name (case-insensitive)
pub fn find_material(key: &str) -> Option<MaterialSpec> {
    builtin_materials().into_iter().find(|m| {
        m.name.eq_ignore_ascii_case(key)
            || m.code.as_deref().is_some_and(|c| c.eq_ignore_ascii_case(key))
    })
}

fn machine(
    name: &str,
    model: &str,
    (x, y, z): (f64, f64, f64),
    laser_power_w: f64,
    scan_speed_mm_s: f64,
    purchase_price: f64,
    annual_maintenance_cost: f64,
) -> MachineSpec {
    MachineSpec {
        id: None,
        name: name.to_string(),
        model_number: Some(model.to_string()),
        build_volume_mm: BuildVolume { x, y, z },
        laser_power_w,
        scan_speed_mm_s,
        purchase_price,
        lifespan_years: 7,
        annual_maintenance_cost,
    }
}

fn material(
    name: &str,
    code: &str,
    density_g_cm3: f64,
    price_per_kg: f64,
    embodied_carbon_per_kg: f64,
    recycling_efficiency: f64,
) -> MaterialSpec {
    MaterialSpec {
        id: None,
        name: name.to_string(),
        code: Some(code.to_string()),
        density_g_cm3,
        price_per_kg,
        embodied_carbon_per_kg,
        recycling_efficiency,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_machine_by_model_number() {
        let m = find_machine("slm280").unwrap();
        assert_eq!(m.name, "SLM 280");
        assert_eq!(m.scan_speed_mm_s, 7000.0);
        assert!(find_machine("Concept M2").is_none());
    }

    #[test]
    fn test_find_material_by_code_or_name() {
        assert_eq!(find_material("in718").unwrap().density_g_cm3, 8.19);
        assert_eq!(
            find_material("Titanium Ti-6Al-4V").unwrap().code.as_deref(),
            Some("Ti-6Al-4V")
        );
    }
}
