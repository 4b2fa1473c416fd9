#![allow(dead_code)]

// Shared builders for synthetic config spaces, sysfs trees, and catalog
// documents used across the integration suites.

use serde_json::{Value, json};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use vgpu_util::catalog::DriverCatalog;
use vgpu_util::{GUEST_CPU, GpuIdentity, HostEnvironment};

/// Offset the synthetic capability list places its single node at.
const CAPABILITY_OFFSET: usize = 0x40;

/// Vendor capability block (header included) advertising a vGPU device with
/// the given host driver version and branch in its id-0 sub-record.
pub fn vgpu_capability(version: &str, branch: &str) -> Vec<u8> {
    let mut block = vec![0x09, 0x00, 0x00, 0x56, 0x46];
    block.push(0); // host driver version record
    block.push(22);
    block.extend_from_slice(&fixed_field(version));
    block.extend_from_slice(&fixed_field(branch));
    block[2] = block.len() as u8;
    block
}

/// Vendor capability block with the vGPU signature but no id-0 sub-record.
pub fn vgpu_capability_without_record() -> Vec<u8> {
    // one non-zero record walking straight off the payload end
    vec![0x09, 0x00, 0x09, 0x56, 0x46, 0x01, 0x08, 0xaa, 0xbb]
}

fn fixed_field(text: &str) -> [u8; 10] {
    let mut field = [0u8; 10];
    field[..text.len()].copy_from_slice(text.as_bytes());
    field
}

/// 256-byte config space exposing `block` as its only capability.
pub fn config_space(block: &[u8]) -> Vec<u8> {
    let mut config = vec![0u8; 256];
    config[0x06] = 0x10; // capabilities list present
    config[0x34] = CAPABILITY_OFFSET as u8;
    config[CAPABILITY_OFFSET..CAPABILITY_OFFSET + block.len()].copy_from_slice(block);
    config
}

/// Config space without the capability-list status bit.
pub fn config_space_without_capabilities() -> Vec<u8> {
    vec![0u8; 256]
}

/// Create one device directory with the sysfs attributes the probe reads.
pub fn write_device(
    root: &Path,
    name: &str,
    vendor: &str,
    device_id: &str,
    subsystem_id: &str,
    config: &[u8],
) {
    let dir = root.join(name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("vendor"), format!("{vendor}\n")).unwrap();
    fs::write(dir.join("device"), format!("{device_id}\n")).unwrap();
    fs::write(dir.join("subsystem_device"), format!("{subsystem_id}\n")).unwrap();
    fs::write(dir.join("config"), config).unwrap();
}

/// The minimal catalog both suites build on: one host branch R550 allowing
/// guest branch R550, one host driver 550.54, one Linux guest driver
/// 550.54.10.
pub fn sample_catalog() -> Value {
    json!({
        "version": 1,
        "date": "2024-02-01",
        "branch": [
            {
                "name": "R550",
                "type": "host",
                "allow": {"branch": ["R550"]}
            },
            {
                "name": "R550",
                "type": "guest",
                "allow": {"branch": ["R550"]}
            }
        ],
        "driver": [
            {
                "version": "550.54",
                "date": "2024-02-01",
                "branch": "R550",
                "type": "host"
            },
            {
                "version": "550.54.10",
                "date": "2024-02-05",
                "branch": "R550",
                "type": "guest",
                "os": ["Linux"]
            }
        ]
    })
}

pub fn catalog(value: Value) -> DriverCatalog {
    serde_json::from_value(value).expect("catalog document should deserialize")
}

pub fn write_catalog_file(dir: &Path, value: &Value) -> PathBuf {
    let path = dir.join("vgpuDriverCatalog.json");
    fs::write(&path, value.to_string()).unwrap();
    path
}

pub fn environment(version: &str, branch: &str) -> HostEnvironment {
    HostEnvironment {
        gpu: GpuIdentity {
            device_id: "0x2331".to_string(),
            subsystem_id: Some("0x16c1".to_string()),
        },
        cpu_architecture: GUEST_CPU.to_string(),
        host_driver_version: version.to_string(),
        host_driver_branch: branch.to_string(),
    }
}

pub fn available(versions: &[&str]) -> BTreeSet<String> {
    versions.iter().map(|v| v.to_string()).collect()
}
