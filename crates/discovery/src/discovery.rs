//! Two-channel discovery pass and identity merge.

use std::collections::BTreeMap;
use std::sync::Arc;

use fleetflash_device::{Device, HookRegistry};
use tracing::{debug, warn};

use crate::channel::DiscoveryChannel;

/// Errors terminating a whole discovery pass.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("no devices detected with adb or fastboot")]
    NoDevicesFound,
}

/// Merges adb and fastboot listings into one device map.
pub struct Discovery {
    adb: Arc<dyn DiscoveryChannel>,
    fastboot: Arc<dyn DiscoveryChannel>,
    hooks: Arc<HookRegistry>,
}

impl Discovery {
    pub fn new(
        adb: Arc<dyn DiscoveryChannel>,
        fastboot: Arc<dyn DiscoveryChannel>,
        hooks: Arc<HookRegistry>,
    ) -> Self {
        Self {
            adb,
            fastboot,
            hooks,
        }
    }

    /// Runs one full discovery pass.
    ///
    /// Scans adb, then fastboot, and overlays the fastboot results by
    /// serial: fastboot wins a cross-channel duplicate. A channel whose
    /// listing fails outright contributes nothing but does not abort
    /// the pass; the pass fails only when the merged set is empty.
    pub async fn discover_devices(&self) -> Result<BTreeMap<String, Device>, DiscoveryError> {
        debug!("discovering adb devices");
        let mut devices = match self.scan_channel(self.adb.as_ref()).await {
            Ok(devices) => devices,
            Err(e) => {
                warn!(error = %e, "adb listing failed");
                BTreeMap::new()
            }
        };

        debug!("discovering fastboot devices");
        match self.scan_channel(self.fastboot.as_ref()).await {
            Ok(fastboot_devices) => {
                // Fastboot is authoritative for bootloader-mode devices.
                for (id, device) in fastboot_devices {
                    devices.insert(id, device);
                }
            }
            Err(e) => warn!(error = %e, "fastboot listing failed"),
        }

        if devices.is_empty() {
            return Err(DiscoveryError::NoDevicesFound);
        }
        Ok(devices)
    }

    /// Scans one channel: list serials, resolve codenames, build devices.
    ///
    /// A serial whose codename lookup fails is skipped (it cannot be
    /// matched to an image later). A serial repeated within the same
    /// listing is skipped too; the first resolution wins.
    async fn scan_channel(
        &self,
        tool: &dyn DiscoveryChannel,
    ) -> Result<BTreeMap<String, Device>, crate::channel::ChannelError> {
        let tool_name = tool.name();
        let mut devices = BTreeMap::new();
        for device_id in tool.device_ids().await? {
            debug!(tool = %tool_name, id = %device_id, "resolving codename");
            let codename = match tool.device_codename(&device_id).await {
                Ok(codename) => codename,
                Err(e) => {
                    warn!(tool = %tool_name, id = %device_id, error = %e,
                        "skipping device, codename lookup failed");
                    continue;
                }
            };
            if devices.contains_key(&device_id) {
                warn!(tool = %tool_name, id = %device_id, "skipping duplicate device");
                continue;
            }
            devices.insert(
                device_id.clone(),
                Device::new(device_id, codename, tool_name, &self.hooks),
            );
        }
        Ok(devices)
    }
}
