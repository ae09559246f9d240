//! The per-device flash state machine.

use std::sync::Arc;

use colored::Colorize;
use fleetflash_device::{Device, Hook, LockTarget, ToolName};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::FlashError;
use crate::retry::{self, RetryPolicy};
use crate::traits::{
    AdbController, BootloaderController, FactoryImageFlasher, PlatformToolsFlasher,
};

/// Drives one device through validate → unlock → flash → lock → reboot.
///
/// Holds only read-only collaborators; instances for different devices
/// share nothing mutable and can run concurrently.
pub struct Flasher {
    factory_image: Arc<dyn FactoryImageFlasher>,
    platform_tools: Arc<dyn PlatformToolsFlasher>,
    adb: Arc<dyn AdbController>,
    bootloader: Arc<dyn BootloaderController>,
    policy: RetryPolicy,
    cancel: CancellationToken,
}

impl Flasher {
    pub fn new(
        factory_image: Arc<dyn FactoryImageFlasher>,
        platform_tools: Arc<dyn PlatformToolsFlasher>,
        adb: Arc<dyn AdbController>,
        bootloader: Arc<dyn BootloaderController>,
        policy: RetryPolicy,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            factory_image,
            platform_tools,
            adb,
            bootloader,
            policy,
            cancel,
        }
    }

    /// Runs the full lifecycle for `device`.
    ///
    /// Reboot commands (into and out of the bootloader) are best
    /// effort: the status queries and convergence retries are what
    /// confirm device state, not the reboots themselves. Everything
    /// else aborts this device only.
    pub async fn flash(&self, device: &Device) -> Result<(), FlashError> {
        self.check_cancelled()?;

        info!(device = %device, "validating factory image is for device");
        self.factory_image
            .validate(&device.codename)
            .await
            .map_err(FlashError::Validation)?;

        // Fastboot-discovered devices are already in the bootloader.
        if device.discovery_tool == ToolName::Adb {
            self.check_cancelled()?;
            info!(device = %device, "rebooting into bootloader");
            if let Err(e) = self.adb.reboot_into_bootloader(&device.id).await {
                debug!(device = %device, error = %e,
                    "ignoring adb reboot error, will attempt fastboot access");
            }
        }

        self.check_cancelled()?;
        info!(device = %device, "checking bootloader lock status");
        let status = retry::query_status(self.bootloader.as_ref(), device).await?;

        if !LockTarget::Unlocked.reached_by(status) {
            self.check_cancelled()?;
            info!(device = %device, "starting bootloader unlock");
            println!(
                "{}",
                format!(
                    "5. [{device}] Use the volume and power keys on the device to unlock the bootloader"
                )
                .yellow()
            );
            self.run_hook(device, "pre-unlock", device.hooks.as_ref().and_then(|h| h.pre_unlock));
            retry::converge(
                self.bootloader.as_ref(),
                device,
                LockTarget::Unlocked,
                &self.policy,
            )
            .await?;
        }
        info!(device = %device, "bootloader is unlocked");

        self.check_cancelled()?;
        info!(device = %device, "running flash-all script");
        let tools_path = self.platform_tools.path();
        self.factory_image
            .flash_all(device, &tools_path)
            .await
            .map_err(FlashError::FlashAll)?;
        info!(device = %device, "finished running flash-all script");

        self.check_cancelled()?;
        info!(device = %device, "starting bootloader re-lock");
        println!(
            "{}",
            format!(
                "6. [{device}] Use the volume and power keys on the device to lock the bootloader"
            )
            .yellow()
        );
        self.run_hook(device, "pre-lock", device.hooks.as_ref().and_then(|h| h.pre_lock));
        retry::converge(
            self.bootloader.as_ref(),
            device,
            LockTarget::Locked,
            &self.policy,
        )
        .await?;

        info!(device = %device, "rebooting device");
        if let Err(e) = self.bootloader.reboot(&device.id).await {
            warn!(device = %device, error = %e,
                "failed to reboot device, may need a manual reboot");
        }
        println!(
            "{}",
            format!(
                "7. [{device}] Disable OEM unlocking from Developer Options after setting up the device"
            )
            .yellow()
        );

        Ok(())
    }

    /// Hooks are advisory; a failure is a warning, never an abort.
    fn run_hook(&self, device: &Device, name: &str, hook: Option<Hook>) {
        if let Some(hook) = hook {
            if let Err(e) = hook(device) {
                warn!(device = %device, hook = name, error = %e, "hook failed");
            }
        }
    }

    fn check_cancelled(&self) -> Result<(), FlashError> {
        if self.cancel.is_cancelled() {
            return Err(FlashError::Cancelled);
        }
        Ok(())
    }
}
