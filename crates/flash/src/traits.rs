//! Capability traits for the external vendor tools.
//!
//! Each external capability is a named trait; production and test
//! implementations are two variants satisfying the same contract.

use async_trait::async_trait;
use fleetflash_device::{Codename, Device, LockStatus, LockTarget, PlatformToolsPath, ToolName};

/// A vendor tool invocation failed or produced unusable output.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CommandError {
    #[error("{tool} command failed: {message}")]
    Failed { tool: ToolName, message: String },

    #[error("{tool} unexpected output: {message}")]
    UnexpectedOutput { tool: ToolName, message: String },
}

/// A factory image operation failed.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("failed to validate image for device: {0}")]
    Validation(String),

    #[error("failed to flash device: {0}")]
    FlashFailed(String),
}

/// A factory image held for one codename.
#[async_trait]
pub trait FactoryImageFlasher: Send + Sync {
    /// Checks that the held image is applicable to `codename`.
    async fn validate(&self, codename: &Codename) -> Result<(), ImageError>;

    /// Runs the bundled flash-all script against `device`.
    async fn flash_all(
        &self,
        device: &Device,
        platform_tools: &PlatformToolsPath,
    ) -> Result<(), ImageError>;
}

/// Provider of the platform-tools installation path.
pub trait PlatformToolsFlasher: Send + Sync {
    fn path(&self) -> PlatformToolsPath;
}

/// The adb-side operations the flasher needs.
#[async_trait]
pub trait AdbController: Send + Sync {
    /// Reboots a booted device into its bootloader.
    async fn reboot_into_bootloader(&self, device_id: &str) -> Result<(), CommandError>;

    /// Stops the background adb daemon. Setup/teardown only — never
    /// concurrent with per-device operations.
    async fn kill_server(&self) -> Result<(), CommandError>;
}

/// The fastboot-side bootloader operations.
#[async_trait]
pub trait BootloaderController: Send + Sync {
    /// Queries the current lock status. A read never mutates state.
    async fn get_lock_status(&self, device_id: &str) -> Result<LockStatus, CommandError>;

    /// Issues the unlock/lock command for `target`. The device will
    /// usually require a physical key confirmation before the status
    /// actually changes.
    async fn set_lock_status(&self, device_id: &str, target: LockTarget)
    -> Result<(), CommandError>;

    /// Reboots the device out of the bootloader.
    async fn reboot(&self, device_id: &str) -> Result<(), CommandError>;
}
