//! Bounded retry-poll convergence on a bootloader lock target.
//!
//! The device bootloader is a slow, partially-observable actor gated
//! by human key presses. The loop here issues the lock/unlock command,
//! waits, re-queries, and retries a bounded number of times until the
//! status converges on the target. A command-level failure aborts
//! immediately; only status non-convergence is retried.

use std::time::Duration;

use fleetflash_device::{Device, LockStatus, LockTarget, ToolName};
use tracing::{debug, info};

use crate::error::FlashError;
use crate::traits::{BootloaderController, CommandError};

pub const DEFAULT_VALIDATION_PAUSE: Duration = Duration::from_secs(5);
pub const DEFAULT_RETRIES: u32 = 2;
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(30);

/// Timing and attempt limits for lock-status convergence.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Additional attempts beyond the first.
    pub retries: u32,
    /// Wait between issuing the command and re-querying the status.
    pub validation_pause: Duration,
    /// Wait between attempts when the status has not converged yet.
    pub retry_interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: DEFAULT_RETRIES,
            validation_pause: DEFAULT_VALIDATION_PAUSE,
            retry_interval: DEFAULT_RETRY_INTERVAL,
        }
    }
}

/// Drives the device's lock status to `target`.
///
/// Per attempt: issue the command, sleep the validation pause,
/// re-query. A reached target ends the loop; exhausted attempts end
/// it with [`FlashError::Convergence`]. An `Unknown` reading is a
/// query failure, never something to converge on.
pub async fn converge(
    bootloader: &dyn BootloaderController,
    device: &Device,
    target: LockTarget,
    policy: &RetryPolicy,
) -> Result<(), FlashError> {
    let mut attempt: u32 = 0;
    loop {
        info!(device = %device, "{} bootloader", target.action_in_progress());
        bootloader
            .set_lock_status(&device.id, target)
            .await
            .map_err(|source| FlashError::SetLock { target, source })?;

        debug!(device = %device, pause = ?policy.validation_pause,
            "waiting before checking bootloader status");
        tokio::time::sleep(policy.validation_pause).await;

        info!(device = %device, "verifying bootloader status");
        let status = query_status(bootloader, device).await?;
        if target.reached_by(status) {
            debug!(device = %device, "bootloader is now {}", target.action_complete());
            return Ok(());
        }

        if attempt >= policy.retries {
            debug!(device = %device, "max {} retries hit", target.action_in_progress());
            return Err(FlashError::Convergence {
                target,
                attempts: attempt + 1,
            });
        }
        info!(device = %device, interval = ?policy.retry_interval,
            "bootloader status is not {} yet, waiting before retrying", target.action_complete());
        tokio::time::sleep(policy.retry_interval).await;
        attempt += 1;
    }
}

/// Fresh status query; an `Unknown` reading is promoted to an error.
pub(crate) async fn query_status(
    bootloader: &dyn BootloaderController,
    device: &Device,
) -> Result<LockStatus, FlashError> {
    let status = bootloader
        .get_lock_status(&device.id)
        .await
        .map_err(FlashError::QueryLock)?;
    if status == LockStatus::Unknown {
        return Err(FlashError::QueryLock(CommandError::UnexpectedOutput {
            tool: ToolName::Fastboot,
            message: "unknown lock status reported".into(),
        }));
    }
    Ok(status)
}
