//! Shared device vocabulary for the fleet flasher.
//!
//! This crate holds the types every other crate speaks in: device
//! identities produced by discovery, bootloader lock status values,
//! and the per-codename custom hook registry for models that need
//! extra manual steps during unlock/lock.

pub mod device;
pub mod hooks;
pub mod types;

pub use device::Device;
pub use hooks::{CustomHooks, Hook, HookRegistry, PostDiscoveryHook};
pub use types::{Codename, HostOs, LockStatus, LockTarget, PlatformToolsPath, ToolName};
