// Device enumeration guard rails over synthetic sysfs trees.

#[path = "support/common.rs"]
mod common;

use anyhow::Result;
use common::{
    config_space, config_space_without_capabilities, vgpu_capability,
    vgpu_capability_without_record, write_device,
};
use std::fs;
use tempfile::tempdir;
use vgpu_util::{
    NVIDIA_VENDOR_ID, ProbeError, enumerate_vgpu_devices, first_gpu_identity, host_environment,
};

#[test]
fn enumerates_only_vgpu_capable_nvidia_devices() -> Result<()> {
    let root = tempdir()?;
    let config = config_space(&vgpu_capability("550.54", "r550"));
    write_device(
        root.path(),
        "0000:3b:00.0",
        NVIDIA_VENDOR_ID,
        "0x2331",
        "0x16c1",
        &config,
    );
    // NVIDIA device without a capability list
    write_device(
        root.path(),
        "0000:5e:00.0",
        NVIDIA_VENDOR_ID,
        "0x20b5",
        "0x1533",
        &config_space_without_capabilities(),
    );
    // foreign vendor
    write_device(
        root.path(),
        "0000:00:1f.0",
        "0x8086",
        "0xa2c9",
        "0x0000",
        &config,
    );

    let devices = enumerate_vgpu_devices(root.path())?;
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].name, "0000:3b:00.0");
    assert_eq!(devices[0].device_id, "0x2331");
    assert_eq!(devices[0].subsystem_id, "0x16c1");
    Ok(())
}

#[test]
fn devices_are_visited_in_sorted_order() -> Result<()> {
    let root = tempdir()?;
    let config = config_space(&vgpu_capability("550.54", "r550"));
    // created out of order on purpose
    write_device(
        root.path(),
        "0000:5e:00.0",
        NVIDIA_VENDOR_ID,
        "0x2331",
        "0x16c1",
        &config,
    );
    write_device(
        root.path(),
        "0000:3b:00.0",
        NVIDIA_VENDOR_ID,
        "0x2331",
        "0x16c1",
        &config,
    );

    let devices = enumerate_vgpu_devices(root.path())?;
    assert_eq!(devices.len(), 2);
    assert_eq!(devices[0].name, "0000:3b:00.0");
    assert_eq!(devices[1].name, "0000:5e:00.0");
    Ok(())
}

#[test]
fn truncated_config_space_aborts_enumeration() {
    let root = tempdir().unwrap();
    write_device(
        root.path(),
        "0000:3b:00.0",
        NVIDIA_VENDOR_ID,
        "0x2331",
        "0x16c1",
        &[0u8; 64],
    );

    let err = enumerate_vgpu_devices(root.path()).unwrap_err();
    match err {
        ProbeError::TruncatedConfigSpace { device } => assert_eq!(device, "0000:3b:00.0"),
        other => panic!("expected TruncatedConfigSpace, got {other:?}"),
    }
}

#[test]
fn missing_attribute_aborts_enumeration() {
    let root = tempdir().unwrap();
    let config = config_space(&vgpu_capability("550.54", "r550"));
    write_device(
        root.path(),
        "0000:3b:00.0",
        NVIDIA_VENDOR_ID,
        "0x2331",
        "0x16c1",
        &config,
    );
    fs::remove_file(root.path().join("0000:3b:00.0/subsystem_device")).unwrap();

    let err = enumerate_vgpu_devices(root.path()).unwrap_err();
    match err {
        ProbeError::Attribute {
            device, attribute, ..
        } => {
            assert_eq!(device, "0000:3b:00.0");
            assert_eq!(attribute, "subsystem_device");
        }
        other => panic!("expected Attribute, got {other:?}"),
    }
}

#[test]
fn missing_root_is_fatal() {
    let root = tempdir().unwrap();
    let missing = root.path().join("no-such-root");
    assert!(matches!(
        enumerate_vgpu_devices(&missing),
        Err(ProbeError::ReadRoot { .. })
    ));
}

#[test]
fn host_environment_decodes_trimmed_uppercase_fields() -> Result<()> {
    let root = tempdir()?;
    let config = config_space(&vgpu_capability("550.54", "r550"));
    write_device(
        root.path(),
        "0000:3b:00.0",
        NVIDIA_VENDOR_ID,
        "0x2331",
        "0x16c1",
        &config,
    );

    let devices = enumerate_vgpu_devices(root.path())?;
    let env = host_environment(&devices[0])?;
    assert_eq!(env.host_driver_version, "550.54");
    assert_eq!(env.host_driver_branch, "R550");
    assert_eq!(env.gpu.device_id, "0x2331");
    assert_eq!(env.gpu.subsystem_id.as_deref(), Some("0x16c1"));
    assert_eq!(env.cpu_architecture, "x86");
    Ok(())
}

#[test]
fn missing_driver_record_fails_for_that_device() -> Result<()> {
    let root = tempdir()?;
    let config = config_space(&vgpu_capability_without_record());
    write_device(
        root.path(),
        "0000:3b:00.0",
        NVIDIA_VENDOR_ID,
        "0x2331",
        "0x16c1",
        &config,
    );

    let devices = enumerate_vgpu_devices(root.path())?;
    assert_eq!(devices.len(), 1);
    let err = host_environment(&devices[0]).unwrap_err();
    assert!(matches!(err, ProbeError::RecordNotFound { .. }));
    Ok(())
}

#[test]
fn first_gpu_identity_does_not_require_vgpu_capability() -> Result<()> {
    let root = tempdir()?;
    write_device(
        root.path(),
        "0000:3b:00.0",
        NVIDIA_VENDOR_ID,
        "0x20b5",
        "0x1533",
        &config_space_without_capabilities(),
    );

    let identity = first_gpu_identity(root.path())?.expect("nvidia device present");
    assert_eq!(identity.device_id, "0x20b5");
    assert_eq!(identity.subsystem_id.as_deref(), Some("0x1533"));
    Ok(())
}

#[test]
fn first_gpu_identity_is_none_without_nvidia_devices() -> Result<()> {
    let root = tempdir()?;
    write_device(
        root.path(),
        "0000:00:1f.0",
        "0x8086",
        "0xa2c9",
        "0x0000",
        &config_space_without_capabilities(),
    );

    assert!(first_gpu_identity(root.path())?.is_none());
    Ok(())
}
