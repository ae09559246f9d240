//! Shared subprocess invocation for the vendor tools.

use std::path::Path;

use fleetflash_device::ToolName;
use fleetflash_flash::CommandError;
use tokio::process::Command;
use tracing::trace;

/// Runs a tool once and returns its combined stdout + stderr.
///
/// Fastboot writes `getvar` results to stderr, so callers always get
/// both streams. A non-zero exit is a command failure carrying the
/// combined output as the message.
pub(crate) async fn run(
    tool: ToolName,
    executable: &Path,
    args: &[&str],
) -> Result<String, CommandError> {
    trace!(tool = %tool, ?args, "spawning");
    let output = Command::new(executable)
        .args(args)
        .output()
        .await
        .map_err(|e| CommandError::Failed {
            tool,
            message: format!("failed to spawn {}: {e}", executable.display()),
        })?;

    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));

    if !output.status.success() {
        return Err(CommandError::Failed {
            tool,
            message: format!("{args:?} exited with {}: {}", output.status, combined.trim()),
        });
    }
    Ok(combined)
}
