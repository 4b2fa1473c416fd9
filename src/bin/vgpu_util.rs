//! Matches a vGPU guest driver against the host driver advertised through
//! the GPU's PCI vendor capability.
//!
//! `match` probes the local PCI devices for the host driver version and
//! branch, loads the compatibility catalog, and prints the selected guest
//! driver as `DRIVER_VERSION=<version>-grid`. `count` reports how many
//! devices expose vGPU capability information. Diagnostics go to stderr so
//! stdout stays machine-consumable.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use vgpu_util::{
    enumerate_vgpu_devices, host_environment, load_catalog_from_path, resolve,
    resolve_catalog_path, resolve_installer_dir, resolve_pci_root, scan_installers,
};

#[derive(Parser, Debug)]
#[command(name = "vgpu-util")]
#[command(about = "Find the vGPU guest driver compatible with the host vGPU manager", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Match a guest driver version against the probed host driver version and branch.
    Match {
        /// Directory containing staged driver installers.
        #[arg(short = 'i', long)]
        installer_directory: Option<PathBuf>,
        /// vGPU driver catalog file.
        #[arg(short = 'c', long)]
        catalog_file: Option<PathBuf>,
    },
    /// Count vGPU devices that expose vGPU capability information.
    Count,
}

fn main() {
    init_logging();
    if let Err(err) = run() {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    match Cli::parse().command {
        Command::Match {
            installer_directory,
            catalog_file,
        } => run_match(installer_directory, catalog_file),
        Command::Count => run_count(),
    }
}

fn run_match(installer_directory: Option<PathBuf>, catalog_file: Option<PathBuf>) -> Result<()> {
    info!("starting driver match");

    let catalog_path = resolve_catalog_path(catalog_file.as_deref());
    let catalog = load_catalog_from_path(&catalog_path).context("unable to load catalog file")?;

    let installer_dir = resolve_installer_dir(installer_directory.as_deref());
    let available = scan_installers(&installer_dir)
        .context("unable to find available drivers staged in the image")?;

    let pci_root = resolve_pci_root(None);
    let devices =
        enumerate_vgpu_devices(&pci_root).context("unable to search for vGPU devices on host")?;

    // Without a device advertising vGPU capability information there is
    // nothing to match against and nothing to report.
    let Some(device) = devices.first() else {
        info!("no vGPU devices found, skipping driver match");
        return Ok(());
    };

    let env = host_environment(device)
        .with_context(|| format!("unable to fetch vGPU device info for {}", device.name))?;
    let version =
        resolve(&catalog, &env, &available).context("unable to find matching driver version")?;

    info!("found matching vGPU guest driver version {version}");
    println!("DRIVER_VERSION={version}-grid");
    Ok(())
}

fn run_count() -> Result<()> {
    let pci_root = resolve_pci_root(None);
    let devices =
        enumerate_vgpu_devices(&pci_root).context("unable to search for vGPU devices on host")?;
    println!("NUM_OF_VGPU_DEVICES={}", devices.len());
    Ok(())
}

fn init_logging() {
    use tracing_subscriber::EnvFilter;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
}
