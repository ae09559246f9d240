//! Core value types shared across discovery and flashing.

use std::fmt;
use std::path::{Path, PathBuf};

/// A device model's internal short identifier (e.g. `walleye`).
///
/// Codenames key the factory image map and the hook registry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Codename(String);

impl Codename {
    pub fn new(codename: impl Into<String>) -> Self {
        Self(codename.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Codename {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Codename {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Codename {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// The vendor tool a device was discovered with.
///
/// `Adb` reaches devices booted into Android with USB debugging on;
/// `Fastboot` reaches devices already sitting in the bootloader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolName {
    Adb,
    Fastboot,
}

impl ToolName {
    /// The executable name inside the platform-tools directory.
    pub fn executable(&self) -> &'static str {
        match self {
            ToolName::Adb => "adb",
            ToolName::Fastboot => "fastboot",
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.executable())
    }
}

/// Host operating systems the vendor publishes platform-tools for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostOs {
    Linux,
    Darwin,
    Windows,
}

impl HostOs {
    /// The OS this binary was built for.
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            HostOs::Windows
        } else if cfg!(target_os = "macos") {
            HostOs::Darwin
        } else {
            HostOs::Linux
        }
    }

    /// Suffix of tool executables and flash scripts on this OS.
    pub fn exe_suffix(&self) -> &'static str {
        match self {
            HostOs::Windows => ".exe",
            _ => "",
        }
    }

    /// Name of the `PATH`-style environment variable on this OS.
    pub fn path_env_var(&self) -> &'static str {
        match self {
            HostOs::Windows => "Path",
            _ => "PATH",
        }
    }

    /// Separator between entries of the `PATH` variable.
    pub fn path_separator(&self) -> char {
        match self {
            HostOs::Windows => ';',
            _ => ':',
        }
    }
}

impl fmt::Display for HostOs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HostOs::Linux => "linux",
            HostOs::Darwin => "darwin",
            HostOs::Windows => "windows",
        };
        f.write_str(s)
    }
}

/// Bootloader lock status as reported by `fastboot getvar unlocked`.
///
/// Never cached: every value comes from a fresh query. `Unknown` only
/// appears when the query or its parse failed; it is never a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockStatus {
    Unknown,
    Locked,
    Unlocked,
}

impl fmt::Display for LockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LockStatus::Unknown => "unknown",
            LockStatus::Locked => "locked",
            LockStatus::Unlocked => "unlocked",
        };
        f.write_str(s)
    }
}

/// The only two legal goals of a lock-status transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockTarget {
    Locked,
    Unlocked,
}

impl LockTarget {
    /// Whether a fresh status reading satisfies this target.
    pub fn reached_by(&self, status: LockStatus) -> bool {
        matches!(
            (self, status),
            (LockTarget::Locked, LockStatus::Locked)
                | (LockTarget::Unlocked, LockStatus::Unlocked)
        )
    }

    /// Verb for operator-facing messages ("unlocking bootloader").
    pub fn action_in_progress(&self) -> &'static str {
        match self {
            LockTarget::Locked => "locking",
            LockTarget::Unlocked => "unlocking",
        }
    }

    /// Past participle for operator-facing messages ("bootloader is unlocked").
    pub fn action_complete(&self) -> &'static str {
        match self {
            LockTarget::Locked => "locked",
            LockTarget::Unlocked => "unlocked",
        }
    }
}

impl fmt::Display for LockTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.action_complete())
    }
}

/// Path to the extracted platform-tools directory.
///
/// Read-only after setup; shared by clone across all flash tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformToolsPath(PathBuf);

impl PlatformToolsPath {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for PlatformToolsPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl AsRef<Path> for PlatformToolsPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}
