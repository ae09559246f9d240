//! Device discovery over the two vendor channels.
//!
//! Attached devices can be visible to `adb` (booted into Android with
//! USB debugging enabled) or to `fastboot` (already in the bootloader).
//! This crate lists both channels, resolves each listed serial to a
//! model codename, and merges the results into one identity map.
//!
//! Fastboot is authoritative for a serial seen on both channels: a
//! device reachable over adb but also listed by fastboot may be
//! mid-transition into the bootloader.

pub mod channel;
pub mod discovery;

pub use channel::{ChannelError, DiscoveryChannel};
pub use discovery::{Discovery, DiscoveryError};
