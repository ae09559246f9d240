//! The `adb` process wrapper.

use std::path::PathBuf;

use async_trait::async_trait;
use fleetflash_device::{PlatformToolsPath, ToolName};
use fleetflash_discovery::{ChannelError, DiscoveryChannel};
use fleetflash_flash::{AdbController, CommandError};

use crate::process;
use crate::setup::SetupError;
use crate::versions::HostOs;

/// Wraps the bundled `adb` executable.
pub struct AdbTool {
    executable: PathBuf,
}

impl AdbTool {
    /// Locates `adb` inside an extracted platform-tools directory.
    pub fn new(tools_path: &PlatformToolsPath, host_os: HostOs) -> Result<Self, SetupError> {
        let executable = tools_path
            .as_path()
            .join(format!("adb{}", host_os.exe_suffix()));
        if !executable.exists() {
            return Err(SetupError::MissingExecutable(executable));
        }
        Ok(Self { executable })
    }

    /// Starts the background adb daemon. Setup only.
    pub async fn start_server(&self) -> Result<(), CommandError> {
        self.run(&["start-server"]).await.map(|_| ())
    }

    /// Stops the background adb daemon. Setup/teardown only — never
    /// while per-device commands are in flight.
    pub async fn kill_server_now(&self) -> Result<(), CommandError> {
        self.run(&["kill-server"]).await.map(|_| ())
    }

    async fn run(&self, args: &[&str]) -> Result<String, CommandError> {
        process::run(ToolName::Adb, &self.executable, args).await
    }

    async fn getprop(&self, device_id: &str, prop: &str) -> Result<String, CommandError> {
        let output = self
            .run(&["-s", device_id, "shell", "getprop", prop])
            .await?;
        Ok(trim_prop(&output))
    }
}

/// Strips the bracket/newline decoration around a getprop value.
fn trim_prop(output: &str) -> String {
    output
        .trim_matches(|c| matches!(c, '[' | ']' | '\n' | '\r' | ' '))
        .to_string()
}

/// Parses `adb devices` output: a header line, then one
/// tab-separated `<serial>\t<state>` entry per line.
fn parse_devices(output: &str) -> Vec<String> {
    output
        .lines()
        .skip(1)
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| line.split('\t').next())
        .map(|serial| serial.trim_end_matches('\r').to_string())
        .filter(|serial| !serial.is_empty())
        .collect()
}

#[async_trait]
impl DiscoveryChannel for AdbTool {
    async fn device_ids(&self) -> Result<Vec<String>, ChannelError> {
        let output = self.run(&["devices"]).await.map_err(command_to_channel)?;
        Ok(parse_devices(&output))
    }

    async fn device_codename(&self, device_id: &str) -> Result<String, ChannelError> {
        let codename = self
            .getprop(device_id, "ro.product.device")
            .await
            .map_err(command_to_channel)?;
        if codename.is_empty() {
            return Err(ChannelError::Parse {
                tool: ToolName::Adb,
                message: format!("empty codename for device {device_id}"),
            });
        }
        Ok(codename)
    }

    fn name(&self) -> ToolName {
        ToolName::Adb
    }
}

#[async_trait]
impl AdbController for AdbTool {
    async fn reboot_into_bootloader(&self, device_id: &str) -> Result<(), CommandError> {
        self.run(&["-s", device_id, "reboot", "bootloader"])
            .await
            .map(|_| ())
    }

    async fn kill_server(&self) -> Result<(), CommandError> {
        self.kill_server_now().await
    }
}

pub(crate) fn command_to_channel(e: CommandError) -> ChannelError {
    match e {
        CommandError::Failed { tool, message } => ChannelError::Command { tool, message },
        CommandError::UnexpectedOutput { tool, message } => ChannelError::Parse { tool, message },
    }
}
