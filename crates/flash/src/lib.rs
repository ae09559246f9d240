//! The flash orchestration engine.
//!
//! This crate implements the **business logic** of driving one device
//! through the unlock → flash → lock lifecycle, and of running many
//! such state machines concurrently. It holds no process-spawning
//! code itself — the vendor tools are reached through the capability
//! traits in [`traits`], implemented by `fleetflash-platformtools` and
//! `fleetflash-factoryimage` in production and by scripted fakes in
//! tests.
//!
//! # Pipeline (per device)
//!
//! 1. **Validate** — image matches the device codename
//! 2. **Reboot to bootloader** — adb-discovered devices only, best effort
//! 3. **Query lock status** — fresh fastboot query, never cached
//! 4. **Unlock** — bounded retry-poll convergence on `Unlocked`
//! 5. **Flash** — run the vendor flash-all script
//! 6. **Re-lock** — same convergence loop, target `Locked`
//! 7. **Reboot** — best effort

pub mod error;
pub mod flasher;
pub mod fleet;
pub mod retry;
pub mod traits;

#[cfg(test)]
pub(crate) mod testing;

pub use error::FlashError;
pub use flasher::Flasher;
pub use fleet::{FlashJob, FlashOutcome, FleetRunner};
pub use retry::RetryPolicy;
pub use traits::{
    AdbController, BootloaderController, CommandError, FactoryImageFlasher, ImageError,
    PlatformToolsFlasher,
};
