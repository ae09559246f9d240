//! The `fastboot` process wrapper.

use std::path::PathBuf;

use async_trait::async_trait;
use fleetflash_device::{LockStatus, LockTarget, PlatformToolsPath, ToolName};
use fleetflash_discovery::{ChannelError, DiscoveryChannel};
use fleetflash_flash::{BootloaderController, CommandError};

use crate::adb::command_to_channel;
use crate::process;
use crate::setup::SetupError;
use crate::versions::HostOs;

/// Wraps the bundled `fastboot` executable.
pub struct FastbootTool {
    executable: PathBuf,
}

impl FastbootTool {
    /// Locates `fastboot` inside an extracted platform-tools directory.
    pub fn new(tools_path: &PlatformToolsPath, host_os: HostOs) -> Result<Self, SetupError> {
        let executable = tools_path
            .as_path()
            .join(format!("fastboot{}", host_os.exe_suffix()));
        if !executable.exists() {
            return Err(SetupError::MissingExecutable(executable));
        }
        Ok(Self { executable })
    }

    async fn run(&self, args: &[&str]) -> Result<String, CommandError> {
        process::run(ToolName::Fastboot, &self.executable, args).await
    }

    async fn getvar(&self, device_id: &str, var: &str) -> Result<String, CommandError> {
        let output = self.run(&["-s", device_id, "getvar", var]).await?;
        parse_getvar(&output, var).ok_or_else(|| CommandError::UnexpectedOutput {
            tool: ToolName::Fastboot,
            message: format!("var {var} not found in output: {}", output.trim()),
        })
    }
}

/// Parses `fastboot devices` output: one `<serial>\t<state>` per line,
/// no header.
fn parse_devices(output: &str) -> Vec<String> {
    output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| line.split('\t').next())
        .map(|serial| serial.trim_end_matches('\r').to_string())
        .filter(|serial| !serial.is_empty())
        .collect()
}

/// Extracts a `getvar` value from combined output.
///
/// Fastboot prints `<var>: <value>` to stderr, followed by a
/// `Finished.` trailer.
fn parse_getvar(output: &str, var: &str) -> Option<String> {
    let prefix = format!("{var}:");
    output
        .lines()
        .find(|line| line.starts_with(&prefix))
        .and_then(|line| line.split_whitespace().nth(1))
        .map(|value| value.trim_end_matches('\r').to_string())
}

/// Maps the reported `unlocked` value onto a lock status.
fn parse_lock_status(value: &str) -> Result<LockStatus, CommandError> {
    match value {
        "yes" => Ok(LockStatus::Unlocked),
        "no" => Ok(LockStatus::Locked),
        other => Err(CommandError::UnexpectedOutput {
            tool: ToolName::Fastboot,
            message: format!("unknown unlocked value returned: {other}"),
        }),
    }
}

#[async_trait]
impl DiscoveryChannel for FastbootTool {
    async fn device_ids(&self) -> Result<Vec<String>, ChannelError> {
        let output = self.run(&["devices"]).await.map_err(command_to_channel)?;
        Ok(parse_devices(&output))
    }

    async fn device_codename(&self, device_id: &str) -> Result<String, ChannelError> {
        self.getvar(device_id, "product")
            .await
            .map_err(command_to_channel)
    }

    fn name(&self) -> ToolName {
        ToolName::Fastboot
    }
}

#[async_trait]
impl BootloaderController for FastbootTool {
    async fn get_lock_status(&self, device_id: &str) -> Result<LockStatus, CommandError> {
        let value = self.getvar(device_id, "unlocked").await?;
        parse_lock_status(&value)
    }

    async fn set_lock_status(
        &self,
        device_id: &str,
        target: LockTarget,
    ) -> Result<(), CommandError> {
        let mode = match target {
            LockTarget::Locked => "lock",
            LockTarget::Unlocked => "unlock",
        };
        self.run(&["-s", device_id, "flashing", mode]).await.map(|_| ())
    }

    async fn reboot(&self, device_id: &str) -> Result<(), CommandError> {
        self.run(&["-s", device_id, "reboot"]).await.map(|_| ())
    }
}
