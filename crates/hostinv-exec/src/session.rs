//! Scoped per-worker session on a management interface

use std::sync::Arc;

use tracing::debug;

use crate::error::ExecError;
use crate::traits::ManagementInterface;

/// Holds one `initialize` on an interface and releases it on drop
///
/// Drop runs on every exit path of the owning worker: normal return, an
/// error propagated with `?`, a panic unwinding through the worker, or the
/// worker's future being dropped on cancellation.
pub struct SessionGuard {
    interface: Arc<dyn ManagementInterface>,
}

impl SessionGuard {
    /// Initialize the interface for the current worker
    ///
    /// # Errors
    /// Returns the interface's initialization error; nothing is released in
    /// that case.
    pub fn acquire(interface: Arc<dyn ManagementInterface>) -> Result<Self, ExecError> {
        interface.initialize()?;
        debug!(interface = interface.interface_type(), "session acquired");
        Ok(Self { interface })
    }

    /// The interface this session is bound to
    #[must_use]
    pub fn interface(&self) -> &Arc<dyn ManagementInterface> {
        &self.interface
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.interface.uninitialize();
        debug!(interface = self.interface.interface_type(), "session released");
    }
}

impl std::fmt::Debug for SessionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionGuard")
            .field("interface", &self.interface.interface_type())
            .finish()
    }
}
