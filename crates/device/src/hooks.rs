//! Per-codename custom hooks for models needing extra manual steps.
//!
//! Hooks are advisory: they print additional operator guidance or fix
//! up discovery metadata. A failing hook is logged as a warning and
//! never aborts the flash.

use std::collections::BTreeMap;
use std::sync::Arc;

use colored::Colorize;

use crate::device::Device;
use crate::types::Codename;

/// Hook run against a fully-constructed device (pre-unlock / pre-lock).
pub type Hook = fn(&Device) -> Result<(), String>;

/// Hook run while a discovery listing entry is upgraded to a device.
/// May rewrite the codename.
pub type PostDiscoveryHook = fn(&mut Device) -> Result<(), String>;

/// Optional callbacks for one device model.
#[derive(Default)]
pub struct CustomHooks {
    pub post_discovery: Option<PostDiscoveryHook>,
    pub pre_unlock: Option<Hook>,
    pub pre_lock: Option<Hook>,
}

/// Read-only codename → hooks table, built once at process start.
///
/// Moved into an `Arc` and shared; never mutated afterwards, so
/// concurrent lookups need no synchronization.
pub struct HookRegistry {
    hooks: BTreeMap<Codename, Arc<CustomHooks>>,
}

impl HookRegistry {
    /// Registry with no entries. Tests add their own via [`insert`](Self::insert).
    pub fn empty() -> Self {
        Self {
            hooks: BTreeMap::new(),
        }
    }

    /// The built-in table for models known to need special handling.
    ///
    /// - `jasmine` (Mi A2 Lite): fastboot reports `jasmine` but the
    ///   factory image is published under `jasmine_sprout`; also needs
    ///   a manual power-cycle into fastboot mode around unlock/lock.
    /// - `walleye` (Pixel 2): needs the same manual power-cycle.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.insert(
            Codename::from("jasmine"),
            CustomHooks {
                post_discovery: Some(jasmine_post_discovery),
                pre_unlock: Some(manual_fastboot_cycle_unlock),
                pre_lock: Some(manual_fastboot_cycle_lock),
            },
        );
        registry.insert(
            Codename::from("walleye"),
            CustomHooks {
                post_discovery: None,
                pre_unlock: Some(manual_fastboot_cycle_unlock),
                pre_lock: Some(manual_fastboot_cycle_lock),
            },
        );
        registry
    }

    pub fn insert(&mut self, codename: Codename, hooks: CustomHooks) {
        self.hooks.insert(codename, Arc::new(hooks));
    }

    /// Pure lookup; `None` for models without special handling.
    pub fn lookup(&self, codename: &Codename) -> Option<Arc<CustomHooks>> {
        self.hooks.get(codename).cloned()
    }
}

fn jasmine_post_discovery(device: &mut Device) -> Result<(), String> {
    device.codename = Codename::from("jasmine_sprout");
    tracing::debug!(device = %device, "updated device codename");
    Ok(())
}

fn manual_fastboot_cycle_unlock(device: &Device) -> Result<(), String> {
    print_manual_fastboot_cycle(device, 5);
    Ok(())
}

fn manual_fastboot_cycle_lock(device: &Device) -> Result<(), String> {
    print_manual_fastboot_cycle(device, 6);
    Ok(())
}

fn print_manual_fastboot_cycle(device: &Device, step: u32) {
    println!(
        "{}",
        format!(" {step}a. [{device}] Once the device boots, disconnect its cable and power it off").yellow()
    );
    println!(
        "{}",
        format!(" {step}b. [{device}] Then press volume down + power to boot it into fastboot mode, and connect the cable again").yellow()
    );
    println!("{}", "The installation will resume automatically".yellow());
}
