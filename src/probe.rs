//! PCI device enumeration through a sysfs-style device tree.
//!
//! Every vGPU-capable NVIDIA device publishes the host driver's version and
//! branch through its vendor-specific capability. This module finds those
//! devices under the PCI device root and turns one of them into the
//! immutable [`HostEnvironment`] the resolver consumes. Enumeration reads
//! the `vendor`, `device`, `subsystem_device`, and `config` attributes of
//! each device; any read failure aborts the whole scan, since an unreadable
//! attribute usually means a permission problem that affects every device.

use crate::capability;
use crate::error::{CapabilityError, ProbeError};
use crate::resolver::{GpuIdentity, HostEnvironment};
use crate::{GUEST_CPU, NVIDIA_VENDOR_ID};
use std::fs;
use std::path::Path;
use tracing::debug;

/// One NVIDIA PCI device carrying the vGPU vendor capability.
#[derive(Debug, Clone)]
pub struct DeviceRecord {
    /// sysfs entry name, e.g. `0000:3b:00.0`.
    pub name: String,
    pub device_id: String,
    pub subsystem_id: String,
    pub vendor_capability: Vec<u8>,
}

/// Enumerate the vGPU devices under `root`.
///
/// Entries are visited in sorted filename order so repeated runs see the
/// same device first. Non-NVIDIA devices and NVIDIA devices without the
/// vGPU vendor capability are skipped silently.
pub fn enumerate_vgpu_devices(root: &Path) -> Result<Vec<DeviceRecord>, ProbeError> {
    let mut devices = Vec::new();

    for name in sorted_entries(root)? {
        let vendor = read_attribute(root, &name, "vendor")?;
        if vendor != NVIDIA_VENDOR_ID {
            continue;
        }
        debug!("found nvidia device {name}");

        let device_id = read_attribute(root, &name, "device")?;
        let subsystem_id = read_attribute(root, &name, "subsystem_device")?;
        let config = read_binary_attribute(root, &name, "config")?;

        let payload = match capability::vendor_capability(&config) {
            Ok(Some(payload)) => payload.to_vec(),
            Ok(None) => continue,
            Err(err) => return Err(probe_error(name, err)),
        };
        if !capability::is_vgpu_signature(&payload) {
            continue;
        }

        debug!("device {name} ({device_id}/{subsystem_id}) exposes the vGPU capability");
        devices.push(DeviceRecord {
            name,
            device_id,
            subsystem_id,
            vendor_capability: payload,
        });
    }
    Ok(devices)
}

/// Decode the host driver version/branch published by `record` and build
/// the environment for one resolution.
pub fn host_environment(record: &DeviceRecord) -> Result<HostEnvironment, ProbeError> {
    let decoded = capability::host_driver_record(&record.vendor_capability)
        .map_err(|err| probe_error(record.name.clone(), err))?;
    debug!(
        "host driver version {} branch {} for device {}",
        decoded.version, decoded.branch, record.name
    );
    Ok(HostEnvironment {
        gpu: GpuIdentity {
            device_id: record.device_id.clone(),
            subsystem_id: Some(record.subsystem_id.clone()),
        },
        cpu_architecture: GUEST_CPU.to_string(),
        host_driver_version: decoded.version,
        host_driver_branch: decoded.branch,
    })
}

/// Device and subsystem IDs of the first NVIDIA device, vGPU-capable or not.
///
/// Environment source for callers that are told the host driver version and
/// branch out of band and only need the GPU identity for rule matching.
pub fn first_gpu_identity(root: &Path) -> Result<Option<GpuIdentity>, ProbeError> {
    for name in sorted_entries(root)? {
        let vendor = read_attribute(root, &name, "vendor")?;
        if vendor != NVIDIA_VENDOR_ID {
            continue;
        }
        let device_id = read_attribute(root, &name, "device")?;
        let subsystem_id = read_attribute(root, &name, "subsystem_device")?;
        debug!("using nvidia device {name} ({device_id}/{subsystem_id}) for rule matching");
        return Ok(Some(GpuIdentity {
            device_id,
            subsystem_id: Some(subsystem_id),
        }));
    }
    Ok(None)
}

fn probe_error(device: String, err: CapabilityError) -> ProbeError {
    match err {
        CapabilityError::TruncatedConfigSpace { .. } => {
            ProbeError::TruncatedConfigSpace { device }
        }
        CapabilityError::RecordNotFound => ProbeError::RecordNotFound { device },
    }
}

fn sorted_entries(root: &Path) -> Result<Vec<String>, ProbeError> {
    let entries = fs::read_dir(root).map_err(|source| ProbeError::ReadRoot {
        path: root.to_path_buf(),
        source,
    })?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| ProbeError::ReadRoot {
            path: root.to_path_buf(),
            source,
        })?;
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(names)
}

fn read_attribute(root: &Path, device: &str, attribute: &'static str) -> Result<String, ProbeError> {
    let raw = fs::read_to_string(root.join(device).join(attribute)).map_err(|source| {
        ProbeError::Attribute {
            device: device.to_string(),
            attribute,
            source,
        }
    })?;
    Ok(raw.trim().to_string())
}

fn read_binary_attribute(
    root: &Path,
    device: &str,
    attribute: &'static str,
) -> Result<Vec<u8>, ProbeError> {
    fs::read(root.join(device).join(attribute)).map_err(|source| ProbeError::Attribute {
        device: device.to_string(),
        attribute,
        source,
    })
}
