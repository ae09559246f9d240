//! Per-device terminal errors, tagged with the failing stage.

use fleetflash_device::LockTarget;

use crate::traits::{CommandError, ImageError};

/// The error that ends one device's state machine.
///
/// Carried into the device's outcome slot; never aborts sibling
/// devices. [`stage`](Self::stage) names the transition that failed.
#[derive(Debug, thiserror::Error)]
pub enum FlashError {
    #[error("image validation failed: {0}")]
    Validation(#[source] ImageError),

    #[error("bootloader lock status query failed: {0}")]
    QueryLock(#[source] CommandError),

    #[error("bootloader {} command failed: {source}", .target.action_in_progress())]
    SetLock {
        target: LockTarget,
        #[source]
        source: CommandError,
    },

    #[error("bootloader never became {target} within {attempts} attempts")]
    Convergence { target: LockTarget, attempts: u32 },

    #[error("flash-all script failed: {0}")]
    FlashAll(#[source] ImageError),

    #[error("cancelled")]
    Cancelled,
}

impl FlashError {
    /// The state-machine stage this error aborted.
    pub fn stage(&self) -> &'static str {
        match self {
            FlashError::Validation(_) => "validate",
            FlashError::QueryLock(_) => "query-lock",
            FlashError::SetLock { .. } => "set-lock",
            FlashError::Convergence { .. } => "converge",
            FlashError::FlashAll(_) => "flash-all",
            FlashError::Cancelled => "cancelled",
        }
    }
}
