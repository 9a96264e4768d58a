//! Input structures consumed by the engines
//!
//! - [`PartSpec`] - part geometry and build packing
//! - [`MachineSpec`] - powder-bed-fusion machine
//! - [`MaterialSpec`] - metal powder
//! - [`EffectiveParameters`] - economic, financial and simulation settings
//! - [`CostLineItem`] - one costed line of the bill of costs
//! - [`Job`] - a job file tying the above together

pub mod catalog;
pub mod job;
pub mod line_item;
pub mod machine;
pub mod material;
pub mod parameters;
pub mod part;

pub use job::{Job, JobInputs};
pub use line_item::{CostCategory, CostLineItem};
pub use machine::{BuildVolume, MachineSpec};
pub use material::MaterialSpec;
pub use parameters::{EffectiveParameters, MaintenanceSchedule, ParameterSource};
pub use part::PartSpec;
