//! Catalog matcher for hosts where the driver version and branch are known
//! out of band.
//!
//! Same resolution as `vgpu-util match`, but the host driver version and
//! branch come from flags or the environment instead of the PCI vendor
//! capability; the local NVIDIA GPU is probed only for its PCI identity so
//! GPU allow/deny rules still apply. Prints the selection as
//! `DRIVER_VERSION=<version>`.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use vgpu_util::{
    GUEST_CPU, HostEnvironment, first_gpu_identity, load_catalog_from_path, resolve,
    resolve_catalog_path, resolve_installer_dir, resolve_pci_root, scan_installers,
};

const ENV_HOST_DRIVER_VERSION: &str = "VGPU_HOST_DRIVER_VERSION";
const ENV_HOST_DRIVER_BRANCH: &str = "VGPU_HOST_DRIVER_BRANCH";

#[derive(Parser, Debug)]
#[command(name = "vgpu-catalog-parser")]
#[command(about = "Find the vGPU guest driver for a given host driver version and branch", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Find the guest driver matching the supplied host driver version and branch.
    Match {
        /// Host driver version.
        #[arg(short = 'd', long)]
        host_driver_version: Option<String>,
        /// Host driver branch.
        #[arg(short = 'b', long)]
        host_driver_branch: Option<String>,
        /// Directory containing staged driver installers.
        #[arg(short = 'i', long)]
        installer_directory: Option<PathBuf>,
        /// vGPU driver catalog file.
        #[arg(short = 'c', long)]
        catalog_file: Option<PathBuf>,
    },
}

fn main() {
    init_logging();
    if let Err(err) = run() {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let Command::Match {
        host_driver_version,
        host_driver_branch,
        installer_directory,
        catalog_file,
    } = Cli::parse().command;

    let host_driver_version = flag_or_env(host_driver_version, ENV_HOST_DRIVER_VERSION)
        .context("--host-driver-version is required (or set VGPU_HOST_DRIVER_VERSION)")?;
    let host_driver_branch = flag_or_env(host_driver_branch, ENV_HOST_DRIVER_BRANCH)
        .context("--host-driver-branch is required (or set VGPU_HOST_DRIVER_BRANCH)")?;

    info!("starting driver match for host driver {host_driver_version} ({host_driver_branch})");

    let catalog_path = resolve_catalog_path(catalog_file.as_deref());
    let catalog = load_catalog_from_path(&catalog_path).context("unable to load catalog file")?;

    let installer_dir = resolve_installer_dir(installer_directory.as_deref());
    let available = scan_installers(&installer_dir)
        .context("unable to find available drivers staged in the image")?;

    // Without an NVIDIA device the GPU identity stays unknown; descriptors
    // restricted to specific GPUs simply fail to match.
    let pci_root = resolve_pci_root(None);
    let gpu = first_gpu_identity(&pci_root)
        .context("unable to find local nvidia pci device info")?
        .unwrap_or_default();

    let env = HostEnvironment {
        gpu,
        cpu_architecture: GUEST_CPU.to_string(),
        host_driver_version,
        host_driver_branch,
    };
    let version =
        resolve(&catalog, &env, &available).context("unable to find matching driver version")?;

    info!("found matching vGPU guest driver version {version}");
    println!("DRIVER_VERSION={version}");
    Ok(())
}

fn flag_or_env(flag: Option<String>, var: &str) -> Option<String> {
    flag.or_else(|| std::env::var(var).ok().filter(|value| !value.is_empty()))
}

fn init_logging() {
    use tracing_subscriber::EnvFilter;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
}
