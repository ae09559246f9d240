//! The per-tool discovery capability.

use async_trait::async_trait;
use fleetflash_device::ToolName;

/// Errors from a single channel operation.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("{tool} command failed: {message}")]
    Command { tool: ToolName, message: String },

    #[error("{tool} output parse failed: {message}")]
    Parse { tool: ToolName, message: String },
}

/// One discovery channel, addressed by its vendor tool.
///
/// Production implementations spawn the actual `adb`/`fastboot`
/// executables; tests provide scripted fakes.
#[async_trait]
pub trait DiscoveryChannel: Send + Sync {
    /// Lists serials of devices currently visible to this tool.
    async fn device_ids(&self) -> Result<Vec<String>, ChannelError>;

    /// Resolves one serial to its model codename.
    async fn device_codename(&self, device_id: &str) -> Result<String, ChannelError>;

    fn name(&self) -> ToolName;
}
