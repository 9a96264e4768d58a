//! Job entity - one part built on one machine from one material
//!
//! A job file (`*.job.yaml`) is the unit the engines operate on. It bundles
//! the four input structures and an optional explicit line-item list.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::identity::{EntityId, EntityPrefix};
use crate::entities::line_item::CostLineItem;
use crate::entities::machine::MachineSpec;
use crate::entities::material::MaterialSpec;
use crate::entities::parameters::{EffectiveParameters, ParameterSource};
use crate::entities::part::PartSpec;
use crate::yaml::{self, YamlError};

/// File suffix recognised by directory scans
pub const JOB_FILE_SUFFIX: &str = ".job.yaml";

/// A costing job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Unique identifier (JOB-...)
    pub id: EntityId,

    /// Optional free-text title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    pub part: PartSpec,
    pub machine: MachineSpec,
    pub material: MaterialSpec,

    /// `use_global_default` or `custom: {...}`
    #[serde(default)]
    pub parameters: ParameterSource,

    /// Explicit line items; the standard cost model is used when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_items: Option<Vec<CostLineItem>>,

    /// Creation timestamp
    #[serde(default = "Utc::now")]
    pub created: DateTime<Utc>,
}

impl Job {
    /// Create a job with a fresh ID that inherits the global defaults
    pub fn new(part: PartSpec, machine: MachineSpec, material: MaterialSpec) -> Self {
        Self {
            id: EntityId::new(EntityPrefix::Job),
            title: None,
            part,
            machine,
            material,
            parameters: ParameterSource::UseGlobalDefault,
            line_items: None,
            created: Utc::now(),
        }
    }

    /// Load a job file with source-annotated YAML diagnostics
    pub fn load(path: &Path) -> Result<Self, YamlError> {
        yaml::parse_yaml_file(path)
    }

    /// Parameters that apply to this job
    pub fn effective_parameters<'a>(
        &'a self,
        global: &'a EffectiveParameters,
    ) -> &'a EffectiveParameters {
        self.parameters.resolve(global)
    }

    /// Snapshot of every value the engines read for this job
    pub fn inputs<'a>(&'a self, global: &'a EffectiveParameters) -> JobInputs<'a> {
        JobInputs {
            part: &self.part,
            machine: &self.machine,
            material: &self.material,
            parameters: self.effective_parameters(global),
            line_items: self.line_items.as_deref(),
        }
    }

    /// Display label: title if set, otherwise the part name
    pub fn label(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.part.name)
    }
}

/// Borrowed view of the resolved inputs of a job
#[derive(Debug, Clone, Copy, Serialize)]
pub struct JobInputs<'a> {
    pub part: &'a PartSpec,
    pub machine: &'a MachineSpec,
    pub material: &'a MaterialSpec,
    pub parameters: &'a EffectiveParameters,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_items: Option<&'a [CostLineItem]>,
}
