//! Vendor platform-tools provisioning and process wrappers.
//!
//! Downloads (or reuses a cached copy of) the versioned platform-tools
//! package, verifies its sha256, extracts it, and wraps the bundled
//! `adb` and `fastboot` executables behind the discovery and flash
//! capability traits. Every invocation spawns a fresh external process
//! parameterized by device serial; the tools hold no in-process state,
//! so concurrent invocations for different devices do not interfere.

pub mod adb;
pub mod fastboot;
mod process;
pub mod setup;
pub mod versions;

pub use adb::AdbTool;
pub use fastboot::FastbootTool;
pub use setup::{PlatformTools, SetupConfig, SetupError};
pub use versions::{download_info, DownloadInfo, HostOs, ToolsVersion};
