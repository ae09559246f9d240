fn main() {
    println!("Run `cargo test -p flashsim` to execute the discovery→fleet pipeline tests.");
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use fleetflash_device::{
        Codename, Device, HookRegistry, LockStatus, LockTarget, PlatformToolsPath, ToolName,
    };
    use fleetflash_discovery::{ChannelError, Discovery, DiscoveryChannel};
    use fleetflash_flash::{
        AdbController, BootloaderController, CommandError, FactoryImageFlasher, FlashJob,
        FlashOutcome, FleetRunner, ImageError, PlatformToolsFlasher, RetryPolicy,
    };
    use tokio_util::sync::CancellationToken;

    /// A bench of fake phones: channel listings plus per-device
    /// bootloader state, indexed by serial.
    struct FakeBench {
        locks: Mutex<BTreeMap<String, LockStatus>>,
    }

    impl FakeBench {
        fn new(serials: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                locks: Mutex::new(
                    serials
                        .iter()
                        .map(|s| (s.to_string(), LockStatus::Locked))
                        .collect(),
                ),
            })
        }
    }

    #[async_trait]
    impl BootloaderController for FakeBench {
        async fn get_lock_status(&self, device_id: &str) -> Result<LockStatus, CommandError> {
            self.locks
                .lock()
                .unwrap()
                .get(device_id)
                .copied()
                .ok_or(CommandError::Failed {
                    tool: ToolName::Fastboot,
                    message: format!("no such device {device_id}"),
                })
        }

        async fn set_lock_status(
            &self,
            device_id: &str,
            target: LockTarget,
        ) -> Result<(), CommandError> {
            let status = match target {
                LockTarget::Locked => LockStatus::Locked,
                LockTarget::Unlocked => LockStatus::Unlocked,
            };
            self.locks
                .lock()
                .unwrap()
                .insert(device_id.to_string(), status);
            Ok(())
        }

        async fn reboot(&self, _device_id: &str) -> Result<(), CommandError> {
            Ok(())
        }
    }

    struct FakeChannel {
        tool: ToolName,
        devices: Vec<(String, String)>,
    }

    impl FakeChannel {
        fn new(tool: ToolName, devices: &[(&str, &str)]) -> Arc<Self> {
            Arc::new(Self {
                tool,
                devices: devices
                    .iter()
                    .map(|(id, codename)| (id.to_string(), codename.to_string()))
                    .collect(),
            })
        }
    }

    #[async_trait]
    impl DiscoveryChannel for FakeChannel {
        async fn device_ids(&self) -> Result<Vec<String>, ChannelError> {
            Ok(self.devices.iter().map(|(id, _)| id.clone()).collect())
        }

        async fn device_codename(&self, device_id: &str) -> Result<String, ChannelError> {
            self.devices
                .iter()
                .find(|(id, _)| id == device_id)
                .map(|(_, codename)| codename.clone())
                .ok_or(ChannelError::Command {
                    tool: self.tool,
                    message: format!("no codename for {device_id}"),
                })
        }

        fn name(&self) -> ToolName {
            self.tool
        }
    }

    /// Image accepting exactly one codename, like a real factory image.
    struct CodenameImage {
        codename: Codename,
    }

    impl CodenameImage {
        fn for_codename(codename: &str) -> Arc<Self> {
            Arc::new(Self {
                codename: Codename::from(codename),
            })
        }
    }

    #[async_trait]
    impl FactoryImageFlasher for CodenameImage {
        async fn validate(&self, codename: &Codename) -> Result<(), ImageError> {
            if codename == &self.codename {
                Ok(())
            } else {
                Err(ImageError::Validation(format!(
                    "image is for {}, not {codename}",
                    self.codename
                )))
            }
        }

        async fn flash_all(
            &self,
            _device: &Device,
            _platform_tools: &PlatformToolsPath,
        ) -> Result<(), ImageError> {
            Ok(())
        }
    }

    struct FixedTools;

    impl PlatformToolsFlasher for FixedTools {
        fn path(&self) -> PlatformToolsPath {
            PlatformToolsPath::new("/tmp/platform-tools")
        }
    }

    struct NoopAdb;

    #[async_trait]
    impl AdbController for NoopAdb {
        async fn reboot_into_bootloader(&self, _device_id: &str) -> Result<(), CommandError> {
            Ok(())
        }

        async fn kill_server(&self) -> Result<(), CommandError> {
            Ok(())
        }
    }

    fn runner(bench: Arc<FakeBench>) -> FleetRunner {
        FleetRunner::new(
            Arc::new(FixedTools),
            Arc::new(NoopAdb),
            bench,
            RetryPolicy::default(),
            CancellationToken::new(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn full_pipeline_discovers_and_flashes_a_mixed_fleet() {
        let adb = FakeChannel::new(ToolName::Adb, &[("a1", "walleye"), ("x", "walleye")]);
        let fastboot = FakeChannel::new(ToolName::Fastboot, &[("f1", "blueline"), ("x", "blueline")]);
        let discovery = Discovery::new(adb, fastboot, Arc::new(HookRegistry::builtin()));

        let devices = discovery.discover_devices().await.unwrap();
        assert_eq!(devices.len(), 3);
        // The shared serial resolved in favor of fastboot.
        assert_eq!(devices["x"].codename, Codename::from("blueline"));

        let walleye_image = CodenameImage::for_codename("walleye");
        let blueline_image = CodenameImage::for_codename("blueline");
        let jobs: Vec<FlashJob> = devices
            .into_values()
            .map(|device| {
                let image: Arc<dyn FactoryImageFlasher> =
                    if device.codename == Codename::from("walleye") {
                        walleye_image.clone()
                    } else {
                        blueline_image.clone()
                    };
                FlashJob { device, image }
            })
            .collect();

        let bench = FakeBench::new(&["a1", "f1", "x"]);
        let outcomes = runner(bench.clone()).run_all(jobs).await;

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes.values().all(FlashOutcome::is_success));
        // Every device ended up re-locked.
        for status in bench.locks.lock().unwrap().values() {
            assert_eq!(*status, LockStatus::Locked);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn jasmine_rename_lines_up_with_its_image() {
        let adb = FakeChannel::new(ToolName::Adb, &[("j1", "jasmine")]);
        let fastboot = FakeChannel::new(ToolName::Fastboot, &[]);
        let discovery = Discovery::new(adb, fastboot, Arc::new(HookRegistry::builtin()));

        let devices = discovery.discover_devices().await.unwrap();
        let device = devices.into_values().next().unwrap();
        assert_eq!(device.codename, Codename::from("jasmine_sprout"));

        // The published image is keyed by the rewritten codename.
        let image = CodenameImage::for_codename("jasmine_sprout");
        let bench = FakeBench::new(&["j1"]);
        let outcomes = runner(bench).run_all(vec![FlashJob { device, image }]).await;
        assert!(outcomes["j1"].is_success());
    }

    #[tokio::test(start_paused = true)]
    async fn wrong_image_fails_only_its_own_device() {
        let adb = FakeChannel::new(ToolName::Adb, &[("a1", "walleye"), ("a2", "blueline")]);
        let fastboot = FakeChannel::new(ToolName::Fastboot, &[]);
        let discovery = Discovery::new(adb, fastboot, Arc::new(HookRegistry::empty()));
        let devices = discovery.discover_devices().await.unwrap();

        // Both devices get the walleye image; blueline must fail validation.
        let image = CodenameImage::for_codename("walleye");
        let jobs = devices
            .into_values()
            .map(|device| FlashJob {
                device,
                image: image.clone() as Arc<dyn FactoryImageFlasher>,
            })
            .collect();

        let bench = FakeBench::new(&["a1", "a2"]);
        let outcomes = runner(bench).run_all(jobs).await;

        assert!(outcomes["a1"].is_success());
        match &outcomes["a2"] {
            FlashOutcome::Failed(e) => assert_eq!(e.stage(), "validate"),
            FlashOutcome::Success => panic!("a2 should have failed validation"),
        }
    }
}
