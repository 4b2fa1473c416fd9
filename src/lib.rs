//! Matches vGPU guest driver packages against the host driver advertised in
//! the GPU's PCI vendor-specific capability.
//!
//! The library is split along the pipeline: [`probe`] discovers vGPU-capable
//! devices and decodes the host driver version/branch via [`capability`],
//! [`catalog`] loads the declarative compatibility catalog, [`installers`]
//! indexes locally staged installer packages, and [`resolver`] filters the
//! catalog down to the single guest driver version compatible with all three
//! inputs. The two CLI binaries are thin adapters over this library that
//! choose where the host version/branch comes from: probed from hardware
//! (`vgpu-util`) or supplied by the caller (`vgpu-catalog-parser`).

pub mod capability;
pub mod catalog;
pub mod error;
pub mod installers;
pub mod probe;
pub mod resolver;

pub use catalog::{DEFAULT_CATALOG_FILE, DriverCatalog, load_catalog_from_path};
pub use error::{CapabilityError, CatalogError, InstallerError, ProbeError, ResolveError};
pub use installers::scan_installers;
pub use probe::{DeviceRecord, enumerate_vgpu_devices, first_gpu_identity, host_environment};
pub use resolver::{GpuIdentity, HostEnvironment, resolve};

use std::env;
use std::path::{Path, PathBuf};

/// NVIDIA PCI vendor ID as sysfs reports it.
pub const NVIDIA_VENDOR_ID: &str = "0x10de";
/// Default sysfs root listing all PCI devices.
pub const PCI_DEVICES_ROOT: &str = "/sys/bus/pci/devices";
/// Default directory holding staged driver installers.
pub const DEFAULT_INSTALLER_DIRECTORY: &str = "/drivers";
/// CPU architecture of supported guests.
pub const GUEST_CPU: &str = "x86";
/// Guest operating system the resolver selects drivers for.
pub const GUEST_OS: &str = "Linux";

const ENV_INSTALLER_DIRECTORY: &str = "VGPU_INSTALLER_DIRECTORY";
const ENV_CATALOG_FILE: &str = "VGPU_DRIVER_CATALOG_FILE";
const ENV_PCI_DEVICES_ROOT: &str = "VGPU_PCI_DEVICES_ROOT";

/// Resolve the catalog path from a CLI flag, the environment, or the default.
pub fn resolve_catalog_path(cli: Option<&Path>) -> PathBuf {
    resolve_path(cli, ENV_CATALOG_FILE, DEFAULT_CATALOG_FILE)
}

/// Resolve the installer directory from a CLI flag, the environment, or the
/// default.
pub fn resolve_installer_dir(cli: Option<&Path>) -> PathBuf {
    resolve_path(cli, ENV_INSTALLER_DIRECTORY, DEFAULT_INSTALLER_DIRECTORY)
}

/// Resolve the PCI device root, honoring the `VGPU_PCI_DEVICES_ROOT`
/// override.
pub fn resolve_pci_root(cli: Option<&Path>) -> PathBuf {
    resolve_path(cli, ENV_PCI_DEVICES_ROOT, PCI_DEVICES_ROOT)
}

fn resolve_path(cli: Option<&Path>, env_var: &str, default: &str) -> PathBuf {
    if let Some(path) = cli {
        return path.to_path_buf();
    }
    match env::var(env_var) {
        Ok(value) if !value.is_empty() => PathBuf::from(value),
        _ => PathBuf::from(default),
    }
}
