//! Fan-out of per-device flashers and outcome aggregation.

use std::collections::BTreeMap;
use std::sync::Arc;

use fleetflash_device::Device;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::error::FlashError;
use crate::flasher::Flasher;
use crate::retry::RetryPolicy;
use crate::traits::{
    AdbController, BootloaderController, FactoryImageFlasher, PlatformToolsFlasher,
};

/// Terminal result of one device's run, produced exactly once.
#[derive(Debug)]
pub enum FlashOutcome {
    Success,
    Failed(FlashError),
}

impl FlashOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, FlashOutcome::Success)
    }
}

/// One eligible device paired with the factory image for its codename.
///
/// The image is shared read-only between all devices of one codename;
/// its extraction finished before the fleet started.
pub struct FlashJob {
    pub device: Device,
    pub image: Arc<dyn FactoryImageFlasher>,
}

/// Runs one flasher per device and aggregates their outcomes.
pub struct FleetRunner {
    platform_tools: Arc<dyn PlatformToolsFlasher>,
    adb: Arc<dyn AdbController>,
    bootloader: Arc<dyn BootloaderController>,
    policy: RetryPolicy,
    cancel: CancellationToken,
}

impl FleetRunner {
    pub fn new(
        platform_tools: Arc<dyn PlatformToolsFlasher>,
        adb: Arc<dyn AdbController>,
        bootloader: Arc<dyn BootloaderController>,
        policy: RetryPolicy,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            platform_tools,
            adb,
            bootloader,
            policy,
            cancel,
        }
    }

    /// Flashes every job and returns one outcome per device id.
    ///
    /// Jobs run as independent tasks, one per device, with no cap:
    /// the attached fleet is the bound. A failing device never cancels
    /// a sibling; the runner always waits for all of them. A single
    /// job runs inline without spawning.
    pub async fn run_all(&self, mut jobs: Vec<FlashJob>) -> BTreeMap<String, FlashOutcome> {
        let mut outcomes = BTreeMap::new();

        if jobs.len() == 1 {
            if let Some(job) = jobs.pop() {
                let id = job.device.id.clone();
                outcomes.insert(id, self.run_one(job).await);
            }
            return outcomes;
        }

        let mut set = JoinSet::new();
        for job in jobs {
            let flasher = self.flasher_for(&job);
            set.spawn(async move {
                let id = job.device.id.clone();
                let outcome = run_job(flasher, job).await;
                (id, outcome)
            });
        }

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((id, outcome)) => {
                    outcomes.insert(id, outcome);
                }
                // A panicking task loses its slot; surface it loudly.
                Err(e) => error!(error = %e, "flash task panicked"),
            }
        }
        outcomes
    }

    async fn run_one(&self, job: FlashJob) -> FlashOutcome {
        let flasher = self.flasher_for(&job);
        run_job(flasher, job).await
    }

    fn flasher_for(&self, job: &FlashJob) -> Flasher {
        Flasher::new(
            Arc::clone(&job.image),
            Arc::clone(&self.platform_tools),
            Arc::clone(&self.adb),
            Arc::clone(&self.bootloader),
            self.policy.clone(),
            self.cancel.clone(),
        )
    }
}

async fn run_job(flasher: Flasher, job: FlashJob) -> FlashOutcome {
    let device = job.device;
    info!(device = %device, "starting to flash device");
    match flasher.flash(&device).await {
        Ok(()) => {
            info!(device = %device, "finished flashing device");
            FlashOutcome::Success
        }
        Err(e) => {
            error!(device = %device, stage = e.stage(), error = %e, "flashing failed");
            FlashOutcome::Failed(e)
        }
    }
}
