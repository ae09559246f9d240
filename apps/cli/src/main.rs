//! Fleet flasher entry point.
//!
//! Sequencing matters here: image discovery, udev setup, platform
//! tools provisioning and per-codename image extraction all complete
//! before the concurrent fleet run starts, so the only shared state
//! the flash tasks see is read-only.

mod setup;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use fleetflash_device::HookRegistry;
use fleetflash_discovery::Discovery;
use fleetflash_flash::{FleetRunner, RetryPolicy};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::setup::{FlashPlan, ToolSetup};

#[derive(Parser)]
#[command(name = "fleetflash", about = "Flash a fleet of attached devices from factory images")]
struct Args {
    /// Factory image file, or a directory of images for --parallel runs
    #[arg(long)]
    image: PathBuf,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Allow flashing multiple devices at once
    #[arg(long)]
    parallel: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.debug);

    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    let result = run(&args, cancel).await;
    match result {
        Ok(all_flashed) => {
            if all_flashed {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            eprintln!("{}", format!("{e:#}").red());
            ExitCode::FAILURE
        }
    }
}

fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();
}

fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("\ninterrupt received, finishing the current step and stopping");
            cancel.cancel();
        }
    });
}

/// Runs setup, discovery and the fleet; returns whether every device
/// flashed successfully.
async fn run(args: &Args, cancel: CancellationToken) -> anyhow::Result<bool> {
    if !args.image.exists() {
        anyhow::bail!("unable to find provided path {}", args.image.display());
    }
    // Non-parallel runs take a single file to keep intent explicit.
    if !args.parallel && args.image.is_dir() {
        anyhow::bail!("--image must be a file (not a directory) unless --parallel is set");
    }

    debug!("running image discovery");
    let images = fleetflash_factoryimage::discover(&args.image)
        .with_context(|| format!("image discovery failed for {}", args.image.display()))?;
    info!(count = images.len(), "discovered factory images");

    let mut tools = ToolSetup::provision(&args.image).await?;
    let result = flash_fleet(args, &mut tools, images, cancel).await;

    tools.teardown().await;
    result
}

async fn flash_fleet(
    args: &Args,
    tools: &mut ToolSetup,
    images: std::collections::BTreeMap<String, PathBuf>,
    cancel: CancellationToken,
) -> anyhow::Result<bool> {
    print_preparation_steps();
    wait_for_enter();

    let hooks = Arc::new(HookRegistry::builtin());
    let discovery = Discovery::new(tools.adb_channel(), tools.fastboot_channel(), hooks);
    let devices = discovery
        .discover_devices()
        .await
        .context("failed to run device discovery")?;

    info!("discovered the following device(s):");
    for device in devices.values() {
        info!("  {} ({})", device, device.discovery_tool);
    }

    let plan = FlashPlan::prepare(devices, images, tools.host_os()).await?;
    if plan.jobs.is_empty() {
        anyhow::bail!("there are no flashable devices");
    }
    if !args.parallel && plan.jobs.len() > 1 {
        anyhow::bail!("discovered multiple devices and --parallel is not enabled");
    }

    println!();
    println!("{}", "Flashing the following device(s):".yellow());
    for (device, image_path) in plan.describe() {
        println!("{}", format!("  {device} image={}", image_path.display()).yellow());
    }
    println!("{}", "Press ENTER to continue".yellow());
    wait_for_enter();

    let runner = FleetRunner::new(
        tools.platform_tools(),
        tools.adb_controller(),
        tools.bootloader_controller(),
        RetryPolicy::default(),
        cancel,
    );
    let outcomes = runner.run_all(plan.jobs).await;

    let mut all_flashed = true;
    for (id, outcome) in &outcomes {
        match outcome {
            fleetflash_flash::FlashOutcome::Success => {
                info!(id = %id, "device flashed successfully");
            }
            fleetflash_flash::FlashOutcome::Failed(e) => {
                all_flashed = false;
                error!(id = %id, stage = e.stage(), error = %e, "device failed to flash");
            }
        }
    }
    if !all_flashed {
        warn!("one or more devices failed; successfully flashed devices are still done");
    }
    Ok(all_flashed)
}

fn print_preparation_steps() {
    let steps = [
        "1. Connect to a wifi network and ensure that no SIM cards are installed",
        "2. Enable Developer Options on the device (Settings -> About Phone -> tap \"Build number\" 7 times)",
        "3. Enable USB debugging (Settings -> System -> Advanced -> Developer Options) and allow the computer to debug",
        "4. Enable OEM Unlocking (in the same Developer Options menu)",
        "Press ENTER to continue",
    ];
    for step in steps {
        println!("{}", step.yellow());
    }
}

fn wait_for_enter() {
    let mut line = String::new();
    let _ = std::io::stdin().read_line(&mut line);
}
