//! Cost line items - the atomic unit of the cost-of-goods breakdown

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The seven cost categories, in report order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CostCategory {
    Labor,
    Consumables,
    Energy,
    Equipment,
    Facility,
    Digital,
    Maintenance,
}

impl CostCategory {
    pub fn all() -> &'static [CostCategory] {
        &[
            CostCategory::Labor,
            CostCategory::Consumables,
            CostCategory::Energy,
            CostCategory::Equipment,
            CostCategory::Facility,
            CostCategory::Digital,
            CostCategory::Maintenance,
        ]
    }

    /// Key used in serialized output
    pub fn as_str(&self) -> &'static str {
        match self {
            CostCategory::Labor => "labor",
            CostCategory::Consumables => "consumables",
            CostCategory::Energy => "energy",
            CostCategory::Equipment => "equipment",
            CostCategory::Facility => "facility",
            CostCategory::Digital => "digital",
            CostCategory::Maintenance => "maintenance",
        }
    }

    /// Human readable heading used in reports
    pub fn display_name(&self) -> &'static str {
        match self {
            CostCategory::Labor => "Labor",
            CostCategory::Consumables => "Consumables & Materials",
            CostCategory::Energy => "Energy",
            CostCategory::Equipment => "Equipment",
            CostCategory::Facility => "Facility Overhead",
            CostCategory::Digital => "Digital & Software",
            CostCategory::Maintenance => "Maintenance",
        }
    }
}

impl fmt::Display for CostCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CostCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CostCategory::all()
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                format!(
                    "unknown cost category '{}' (valid: labor, consumables, energy, equipment, facility, digital, maintenance)",
                    s
                )
            })
    }
}

/// A single costed line: `unit_cost × quantity`, charged per build or per part
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostLineItem {
    pub category: CostCategory,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Cost per unit, ≥ 0
    pub unit_cost: f64,

    /// Quantity consumed, > 0
    pub quantity: f64,

    /// Descriptive unit (hours, kg, kWh, m³, ...)
    pub unit_type: String,

    /// True when the item is incurred once per build, false when once per part
    pub is_per_build: bool,
}

impl CostLineItem {
    pub fn new(
        category: CostCategory,
        name: impl Into<String>,
        unit_cost: f64,
        quantity: f64,
        unit_type: impl Into<String>,
        is_per_build: bool,
    ) -> Self {
        Self {
            category,
            name: name.into(),
            description: None,
            unit_cost,
            quantity,
            unit_type: unit_type.into(),
            is_per_build,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Line total. Always derived from the current unit cost and quantity.
    pub fn total_cost(&self) -> f64 {
        self.unit_cost * self.quantity
    }

    pub fn total_per_part(&self, parts_per_build: u32) -> f64 {
        if self.is_per_build {
            self.total_cost() / f64::from(parts_per_build)
        } else {
            self.total_cost()
        }
    }

    pub fn total_per_build(&self, parts_per_build: u32) -> f64 {
        if self.is_per_build {
            self.total_cost()
        } else {
            self.total_cost() * f64::from(parts_per_build)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_tracks_quantity_changes() {
        let mut item = CostLineItem::new(CostCategory::Labor, "Setup", 150.0, 2.0, "hours", true);
        assert_eq!(item.total_cost(), 300.0);
        item.quantity = 3.0;
        assert_eq!(item.total_cost(), 450.0);
    }

    #[test]
    fn test_per_build_conversion() {
        let item = CostLineItem::new(CostCategory::Energy, "Power", 2.5, 40.0, "kWh", true);
        assert_eq!(item.total_per_build(4), 100.0);
        assert_eq!(item.total_per_part(4), 25.0);
    }

    #[test]
    fn test_per_part_conversion() {
        let item = CostLineItem::new(CostCategory::Consumables, "Powder", 350.0, 0.5, "kg", false);
        assert_eq!(item.total_per_part(4), 175.0);
        assert_eq!(item.total_per_build(4), 700.0);
    }

    #[test]
    fn test_category_parse() {
        assert_eq!("Digital".parse::<CostCategory>().unwrap(), CostCategory::Digital);
        assert!("tooling".parse::<CostCategory>().is_err());
    }

    #[test]
    fn test_line_item_yaml() {
        let yaml = r#"
category: consumables
name: Metal Powder
unit_cost: 350
quantity: 0.41
unit_type: kg
is_per_build: false
"#;
        let item: CostLineItem = serde_yml::from_str(yaml).unwrap();
        assert_eq!(item.category, CostCategory::Consumables);
        assert!(item.description.is_none());
    }
}
