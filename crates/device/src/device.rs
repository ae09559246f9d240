//! Device records produced by discovery.

use std::fmt;
use std::sync::Arc;

use crate::hooks::{CustomHooks, HookRegistry};
use crate::types::{Codename, ToolName};

/// One attached device, as resolved by a single discovery pass.
///
/// Created fresh each pass and superseded entirely by the next one;
/// never persisted. The id is the tool-reported serial and is unique
/// within one merged discovery result.
pub struct Device {
    pub id: String,
    pub codename: Codename,
    pub discovery_tool: ToolName,
    pub hooks: Option<Arc<CustomHooks>>,
}

impl Device {
    /// Upgrades a discovery listing entry to a device record.
    ///
    /// Attaches hooks from the registry and applies the model's
    /// post-discovery hook if it has one. A failing hook is logged
    /// and otherwise ignored.
    pub fn new(
        id: impl Into<String>,
        codename: impl Into<Codename>,
        discovery_tool: ToolName,
        registry: &HookRegistry,
    ) -> Self {
        let codename = codename.into();
        let hooks = registry.lookup(&codename);
        let mut device = Self {
            id: id.into(),
            codename,
            discovery_tool,
            hooks,
        };
        if let Some(hooks) = device.hooks.clone() {
            if let Some(post_discovery) = hooks.post_discovery {
                if let Err(e) = post_discovery(&mut device) {
                    tracing::warn!(device = %device, error = %e, "post-discovery hook failed");
                }
            }
        }
        device
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "id={} codename={}", self.id, self.codename)
    }
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("id", &self.id)
            .field("codename", &self.codename)
            .field("discovery_tool", &self.discovery_tool)
            .field("has_hooks", &self.hooks.is_some())
            .finish()
    }
}
