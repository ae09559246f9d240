//! Run setup and teardown: udev, platform tools, image extraction.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use fleetflash_device::{Device, HostOs};
use fleetflash_discovery::DiscoveryChannel;
use fleetflash_factoryimage::FactoryImage;
use fleetflash_flash::{
    AdbController, BootloaderController, FactoryImageFlasher, FlashJob, PlatformToolsFlasher,
};
use fleetflash_platformtools::{AdbTool, FastbootTool, PlatformTools, SetupConfig, ToolsVersion};
use tracing::{debug, info, warn};

/// Everything provisioned before discovery starts.
///
/// Holds the extraction temp directories alive for the whole run;
/// dropping this cleans them up.
pub struct ToolSetup {
    host_os: HostOs,
    platform_tools: Arc<PlatformTools>,
    adb: Arc<AdbTool>,
    fastboot: Arc<FastbootTool>,
    udev_installed: bool,
    _staging_dir: tempfile::TempDir,
    _tools_dir: tempfile::TempDir,
}

impl ToolSetup {
    /// Provisions udev rules (Linux), platform tools and the two
    /// vendor tool wrappers. Any failure here is fatal to the run.
    pub async fn provision(image_path: &Path) -> anyhow::Result<Self> {
        let host_os = HostOs::current();
        let staging_dir = tempfile::TempDir::with_prefix("fleetflash-staging-")
            .context("failed to create staging directory")?;

        let mut udev_installed = false;
        if host_os == HostOs::Linux {
            fleetflash_udev::setup(fleetflash_udev::DEFAULT_RULES, staging_dir.path())
                .await
                .context("failed to set up udev")?;
            udev_installed = true;
        }

        debug!("setting up platform tools");
        let version = tools_version_for(image_path);
        let cache_dir = std::env::temp_dir()
            .join("fleetflash")
            .join("platform-tools")
            .join(version.to_string());
        let tools_dir = tempfile::TempDir::with_prefix("fleetflash-tools-")
            .context("failed to create platform-tools directory")?;
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .context("failed to build HTTP client")?;

        let platform_tools = PlatformTools::setup(SetupConfig {
            version,
            host_os,
            cache_dir,
            work_dir: tools_dir.path().to_path_buf(),
            http_client,
        })
        .await
        .context("failed to set up platform tools")?;

        debug!("setting up adb");
        let adb = AdbTool::new(&platform_tools.path(), host_os).context("failed to set up adb")?;
        if let Err(e) = adb.kill_server_now().await {
            debug!(error = %e, "failed to kill adb server");
        }
        adb.start_server()
            .await
            .context("failed to start adb server")?;

        debug!("setting up fastboot");
        let fastboot = FastbootTool::new(&platform_tools.path(), host_os)
            .context("failed to set up fastboot")?;

        Ok(Self {
            host_os,
            platform_tools: Arc::new(platform_tools),
            adb: Arc::new(adb),
            fastboot: Arc::new(fastboot),
            udev_installed,
            _staging_dir: staging_dir,
            _tools_dir: tools_dir,
        })
    }

    pub fn host_os(&self) -> HostOs {
        self.host_os
    }

    pub fn adb_channel(&self) -> Arc<dyn DiscoveryChannel> {
        self.adb.clone()
    }

    pub fn fastboot_channel(&self) -> Arc<dyn DiscoveryChannel> {
        self.fastboot.clone()
    }

    pub fn adb_controller(&self) -> Arc<dyn AdbController> {
        self.adb.clone()
    }

    pub fn bootloader_controller(&self) -> Arc<dyn BootloaderController> {
        self.fastboot.clone()
    }

    pub fn platform_tools(&self) -> Arc<dyn PlatformToolsFlasher> {
        self.platform_tools.clone()
    }

    /// Best-effort teardown: stop the adb daemon and remove udev rules.
    /// Never concurrent with per-device operations.
    pub async fn teardown(&mut self) {
        if let Err(e) = self.adb.kill_server_now().await {
            warn!(error = %e, "cleanup: failed to kill adb server");
        }
        if self.udev_installed {
            fleetflash_udev::cleanup().await;
        }
    }
}

/// Jasmine images need the older platform-tools release.
fn tools_version_for(image_path: &Path) -> ToolsVersion {
    match image_path.file_name().and_then(|n| n.to_str()) {
        Some(name) if image_path.is_file() => ToolsVersion::for_image_name(name),
        _ => ToolsVersion::V30_0_4,
    }
}

/// The eligible devices paired with their extracted images.
pub struct FlashPlan {
    pub jobs: Vec<FlashJob>,
    descriptions: Vec<(String, PathBuf)>,
    _extract_dirs: Vec<tempfile::TempDir>,
}

impl FlashPlan {
    /// Extracts each needed image once per codename, sequentially, and
    /// pairs every device that has a matching image with its image.
    /// Devices without a match are dropped with a warning; a failed
    /// extraction is fatal.
    pub async fn prepare(
        devices: BTreeMap<String, Device>,
        images: BTreeMap<String, PathBuf>,
        host_os: HostOs,
    ) -> anyhow::Result<Self> {
        let mut extracted: BTreeMap<String, Arc<FactoryImage>> = BTreeMap::new();
        let mut extract_dirs = Vec::new();
        let mut jobs = Vec::new();
        let mut descriptions = Vec::new();

        for (_, device) in devices {
            let codename = device.codename.as_str().to_string();
            let Some(image_path) = images.get(&codename) else {
                warn!(device = %device, "no image discovered for device");
                continue;
            };

            let image = match extracted.get(&codename) {
                Some(image) => {
                    debug!(device = %device, "re-using extracted factory image");
                    image.clone()
                }
                None => {
                    let work_dir = tempfile::TempDir::with_prefix("fleetflash-factory-")
                        .context("failed to create extraction directory")?;
                    let mut image = FactoryImage::new(
                        image_path.clone(),
                        work_dir.path().to_path_buf(),
                        host_os,
                    );
                    image
                        .extract()
                        .await
                        .with_context(|| format!("failed to extract {}", image_path.display()))?;
                    extract_dirs.push(work_dir);
                    let image = Arc::new(image);
                    extracted.insert(codename.clone(), image.clone());
                    image
                }
            };

            info!(device = %device, image = %image_path.display(), "device is flashable");
            descriptions.push((device.to_string(), image_path.clone()));
            jobs.push(FlashJob {
                device,
                image: image as Arc<dyn FactoryImageFlasher>,
            });
        }

        Ok(Self {
            jobs,
            descriptions,
            _extract_dirs: extract_dirs,
        })
    }

    pub fn describe(&self) -> impl Iterator<Item = &(String, PathBuf)> {
        self.descriptions.iter()
    }
}
