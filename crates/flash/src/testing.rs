//! Scripted fakes of the capability traits, shared by this crate's tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use fleetflash_device::{
    Codename, Device, HookRegistry, LockStatus, LockTarget, PlatformToolsPath, ToolName,
};

use crate::traits::{
    AdbController, BootloaderController, CommandError, FactoryImageFlasher, ImageError,
    PlatformToolsFlasher,
};

pub(crate) fn test_device(id: &str, codename: &str, tool: ToolName) -> Device {
    Device::new(id, codename, tool, &HookRegistry::empty())
}

fn command_error(tool: ToolName, message: &str) -> CommandError {
    CommandError::Failed {
        tool,
        message: message.into(),
    }
}

/// Bootloader fake replaying a fixed sequence of status readings.
///
/// Once the script is exhausted the last reading repeats, so an extra
/// query never fails unexpectedly. `set_lock_status` succeeds unless
/// told to fail, and never changes what the queries report — the
/// script alone decides when the device "converges".
pub(crate) struct ScriptedBootloader {
    statuses: Mutex<VecDeque<LockStatus>>,
    last_status: Mutex<LockStatus>,
    set_lock_error: Mutex<Option<String>>,
    query_error: Mutex<Option<String>>,
    reboot_error: Mutex<Option<String>>,
    set_lock_calls: AtomicUsize,
    query_calls: AtomicUsize,
    reboot_calls: AtomicUsize,
}

impl ScriptedBootloader {
    pub fn with_statuses(statuses: &[LockStatus]) -> Self {
        let last = *statuses.last().unwrap_or(&LockStatus::Unknown);
        Self {
            statuses: Mutex::new(statuses.iter().copied().collect()),
            last_status: Mutex::new(last),
            set_lock_error: Mutex::new(None),
            query_error: Mutex::new(None),
            reboot_error: Mutex::new(None),
            set_lock_calls: AtomicUsize::new(0),
            query_calls: AtomicUsize::new(0),
            reboot_calls: AtomicUsize::new(0),
        }
    }

    pub fn fail_set_lock(&self, message: &str) {
        *self.set_lock_error.lock().unwrap() = Some(message.into());
    }

    pub fn fail_query(&self, message: &str) {
        *self.query_error.lock().unwrap() = Some(message.into());
    }

    pub fn fail_reboot(&self, message: &str) {
        *self.reboot_error.lock().unwrap() = Some(message.into());
    }

    pub fn set_lock_calls(&self) -> usize {
        self.set_lock_calls.load(Ordering::SeqCst)
    }

    pub fn query_calls(&self) -> usize {
        self.query_calls.load(Ordering::SeqCst)
    }

    pub fn reboot_calls(&self) -> usize {
        self.reboot_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BootloaderController for ScriptedBootloader {
    async fn get_lock_status(&self, _device_id: &str) -> Result<LockStatus, CommandError> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.query_error.lock().unwrap().as_deref() {
            return Err(command_error(ToolName::Fastboot, message));
        }
        let mut script = self.statuses.lock().unwrap();
        match script.pop_front() {
            Some(status) => {
                *self.last_status.lock().unwrap() = status;
                Ok(status)
            }
            None => Ok(*self.last_status.lock().unwrap()),
        }
    }

    async fn set_lock_status(
        &self,
        _device_id: &str,
        _target: LockTarget,
    ) -> Result<(), CommandError> {
        self.set_lock_calls.fetch_add(1, Ordering::SeqCst);
        match self.set_lock_error.lock().unwrap().as_deref() {
            Some(message) => Err(command_error(ToolName::Fastboot, message)),
            None => Ok(()),
        }
    }

    async fn reboot(&self, _device_id: &str) -> Result<(), CommandError> {
        self.reboot_calls.fetch_add(1, Ordering::SeqCst);
        match self.reboot_error.lock().unwrap().as_deref() {
            Some(message) => Err(command_error(ToolName::Fastboot, message)),
            None => Ok(()),
        }
    }
}

/// Bootloader fake behaving like a cooperative device: a set command
/// moves the status to the target, queries report the current status
/// and never mutate it.
pub(crate) struct FakeDeviceBootloader {
    status: Mutex<LockStatus>,
}

impl FakeDeviceBootloader {
    pub fn starting_at(status: LockStatus) -> Self {
        Self {
            status: Mutex::new(status),
        }
    }
}

#[async_trait]
impl BootloaderController for FakeDeviceBootloader {
    async fn get_lock_status(&self, _device_id: &str) -> Result<LockStatus, CommandError> {
        Ok(*self.status.lock().unwrap())
    }

    async fn set_lock_status(
        &self,
        _device_id: &str,
        target: LockTarget,
    ) -> Result<(), CommandError> {
        *self.status.lock().unwrap() = match target {
            LockTarget::Locked => LockStatus::Locked,
            LockTarget::Unlocked => LockStatus::Unlocked,
        };
        Ok(())
    }

    async fn reboot(&self, _device_id: &str) -> Result<(), CommandError> {
        Ok(())
    }
}

/// Factory image fake with switchable validate/flash outcomes.
pub(crate) struct MockImage {
    validation_error: Option<String>,
    flash_error: Option<String>,
    flash_calls: AtomicUsize,
}

impl MockImage {
    pub fn ok() -> Self {
        Self {
            validation_error: None,
            flash_error: None,
            flash_calls: AtomicUsize::new(0),
        }
    }

    pub fn failing_validation(message: &str) -> Self {
        Self {
            validation_error: Some(message.into()),
            ..Self::ok()
        }
    }

    pub fn failing_flash(message: &str) -> Self {
        Self {
            flash_error: Some(message.into()),
            ..Self::ok()
        }
    }

    pub fn flash_calls(&self) -> usize {
        self.flash_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FactoryImageFlasher for MockImage {
    async fn validate(&self, _codename: &Codename) -> Result<(), ImageError> {
        match &self.validation_error {
            Some(message) => Err(ImageError::Validation(message.clone())),
            None => Ok(()),
        }
    }

    async fn flash_all(
        &self,
        _device: &Device,
        _platform_tools: &PlatformToolsPath,
    ) -> Result<(), ImageError> {
        self.flash_calls.fetch_add(1, Ordering::SeqCst);
        match &self.flash_error {
            Some(message) => Err(ImageError::FlashFailed(message.clone())),
            None => Ok(()),
        }
    }
}

/// Fixed-path platform tools.
pub(crate) struct MockTools;

impl PlatformToolsFlasher for MockTools {
    fn path(&self) -> PlatformToolsPath {
        PlatformToolsPath::new("/tmp/platform-tools")
    }
}

/// Adb fake; reboot-into-bootloader can be told to fail.
pub(crate) struct MockAdb {
    reboot_error: Option<String>,
    reboot_calls: AtomicUsize,
}

impl MockAdb {
    pub fn ok() -> Self {
        Self {
            reboot_error: None,
            reboot_calls: AtomicUsize::new(0),
        }
    }

    pub fn failing_reboot(message: &str) -> Self {
        Self {
            reboot_error: Some(message.into()),
            reboot_calls: AtomicUsize::new(0),
        }
    }

    pub fn reboot_calls(&self) -> usize {
        self.reboot_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AdbController for MockAdb {
    async fn reboot_into_bootloader(&self, _device_id: &str) -> Result<(), CommandError> {
        self.reboot_calls.fetch_add(1, Ordering::SeqCst);
        match &self.reboot_error {
            Some(message) => Err(command_error(ToolName::Adb, message)),
            None => Ok(()),
        }
    }

    async fn kill_server(&self) -> Result<(), CommandError> {
        Ok(())
    }
}
