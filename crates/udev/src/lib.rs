//! Linux udev rules granting USB access to the supported vendors.
//!
//! Without these rules adb and fastboot see devices only under sudo.
//! Installation needs elevated privileges, so the individual steps run
//! through `sudo` and may prompt for a password. Setup failures are
//! fatal; removal at cleanup is best effort.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

pub const RULES_DIR: &str = "/etc/udev/rules.d";
pub const RULES_FILE: &str = "98-fleetflash.rules";

/// One USB vendor granted non-root access.
pub struct UdevRule {
    pub vendor_name: &'static str,
    pub vendor_id: &'static str,
}

/// Google (Pixel) and Xiaomi (Mi A2 Lite).
pub const DEFAULT_RULES: &[UdevRule] = &[
    UdevRule {
        vendor_name: "Google",
        vendor_id: "18d1",
    },
    UdevRule {
        vendor_name: "Xiaomi",
        vendor_id: "2717",
    },
];

#[derive(Debug, thiserror::Error)]
pub enum UdevError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{command} failed: {output}")]
    Command { command: String, output: String },
}

/// Renders the rules file contents.
pub fn render_rules(rules: &[UdevRule]) -> String {
    let mut out = String::new();
    for rule in rules {
        out.push_str(&format!(
            "# {}\nSUBSYSTEM==\"usb\", ATTR{{idVendor}}==\"{}\", GROUP=\"sudo\"\n",
            rule.vendor_name, rule.vendor_id
        ));
    }
    out
}

fn rules_path() -> PathBuf {
    Path::new(RULES_DIR).join(RULES_FILE)
}

/// Installs the rules if they are not present yet and reloads udevd.
///
/// The rendered file is staged in `staging_dir` and copied into place
/// with sudo.
pub async fn setup(rules: &[UdevRule], staging_dir: &Path) -> Result<(), UdevError> {
    if rules_path().exists() {
        debug!("udev rules already installed");
        return Ok(());
    }
    info!("setting up udev, this requires elevated privileges and may prompt for a password");

    run_sudo(&["mkdir", "-p", RULES_DIR]).await?;

    let staged = staging_dir.join(RULES_FILE);
    tokio::fs::write(&staged, render_rules(rules)).await?;
    info!(path = %rules_path().display(), "installing udev rules");
    run_sudo(&["cp", &staged.to_string_lossy(), RULES_DIR]).await?;

    info!("reloading udev rules with udevadm");
    run_sudo(&["udevadm", "control", "--reload-rules"]).await?;
    Ok(())
}

/// Removes the installed rules file. Best effort.
pub async fn cleanup() {
    let path = rules_path();
    if !path.exists() {
        return;
    }
    if let Err(e) = run_sudo(&["rm", &path.to_string_lossy()]).await {
        warn!(error = %e, "failed to remove udev rules");
    }
}

async fn run_sudo(args: &[&str]) -> Result<(), UdevError> {
    let output = tokio::process::Command::new("sudo")
        .args(args)
        .output()
        .await?;
    if !output.status.success() {
        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        return Err(UdevError::Command {
            command: format!("sudo {}", args.join(" ")),
            output: combined.trim().to_string(),
        });
    }
    Ok(())
}
