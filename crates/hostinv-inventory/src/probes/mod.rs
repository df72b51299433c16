//! Probe catalogue

use std::sync::Arc;

use crate::error::InventoryError;
use crate::probe::Probe;

pub mod applications;
pub mod class;
pub mod groups;
pub mod processes;

pub use applications::ApplicationsProbe;
pub use class::{ClassProbe, Section};
pub use groups::LocalGroupsProbe;
pub use processes::ProcessesProbe;

/// Every probe, in full-system collection order
#[must_use]
pub fn catalogue() -> Vec<Arc<dyn Probe>> {
    vec![
        Arc::new(ApplicationsProbe::new()),
        Arc::new(ClassProbe::bios()),
        Arc::new(ClassProbe::drives()),
        Arc::new(ClassProbe::local_accounts()),
        Arc::new(LocalGroupsProbe::new()),
        Arc::new(ClassProbe::memory()),
        Arc::new(ClassProbe::network()),
        Arc::new(ClassProbe::os()),
        Arc::new(ProcessesProbe::new()),
        Arc::new(ClassProbe::processor()),
        Arc::new(ClassProbe::services()),
    ]
}

/// Firmware, storage, memory, network and processor probes
#[must_use]
pub fn hardware() -> Vec<Arc<dyn Probe>> {
    vec![
        Arc::new(ClassProbe::bios()),
        Arc::new(ClassProbe::drives()),
        Arc::new(ClassProbe::memory()),
        Arc::new(ClassProbe::network()),
        Arc::new(ClassProbe::processor()),
    ]
}

/// Look a probe up by short name or capability name
///
/// # Errors
/// Returns `UnknownProbe` if nothing matches.
pub fn find(name: &str) -> Result<Arc<dyn Probe>, InventoryError> {
    catalogue()
        .into_iter()
        .find(|p| p.name() == name || p.capability_name() == name)
        .ok_or_else(|| InventoryError::UnknownProbe(name.to_string()))
}
