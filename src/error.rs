//! Error types for probing, catalog loading, and resolution.
//!
//! Library errors are typed so callers can tell a dead-end resolution apart
//! from an unreadable device or a malformed catalog; the binaries wrap them
//! with anyhow context at the process boundary.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failures while decoding a raw PCI configuration-space buffer.
///
/// Capability *absence* is not an error: decoding reports it as `None` and
/// callers treat the device as not vGPU-capable.
#[derive(Debug, Error)]
pub enum CapabilityError {
    /// The configuration space read was incomplete, normally a privilege
    /// problem. Callers must not retry.
    #[error(
        "PCI configuration space is truncated ({len} bytes); run in privileged mode to read the complete configuration data"
    )]
    TruncatedConfigSpace {
        /// Number of bytes actually read.
        len: usize,
    },

    /// The vendor capability is present but carries no usable host driver
    /// version record.
    #[error("no host driver version record in the vendor-specific capability")]
    RecordNotFound,
}

/// Failures while enumerating PCI devices under a sysfs-style tree.
///
/// An unreadable attribute usually indicates a systemic permission problem,
/// so enumeration aborts instead of skipping the device.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The PCI device root itself could not be listed.
    #[error("unable to list PCI devices under {path}: {source}")]
    ReadRoot {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A required device attribute file could not be read.
    #[error("failed to read {attribute} for device {device}: {source}")]
    Attribute {
        device: String,
        attribute: &'static str,
        #[source]
        source: io::Error,
    },

    /// The device's configuration space read was incomplete.
    #[error(
        "PCI configuration space for device {device} is truncated; run in privileged mode to read the complete configuration data"
    )]
    TruncatedConfigSpace { device: String },

    /// The device exposes the vendor capability but no driver version record.
    #[error("cannot find driver version record in vendor-specific capability for device {device}")]
    RecordNotFound { device: String },
}

/// Failures while loading the driver catalog document.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog file {path} not found")]
    NotFound { path: PathBuf },

    #[error("failed to read catalog file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("error parsing catalog file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The document parsed but fails a structural requirement.
    #[error("catalog file {path} is invalid: {reason}")]
    Invalid { path: PathBuf, reason: String },
}

/// Failure while scanning the staged installer directory.
#[derive(Debug, Error)]
pub enum InstallerError {
    #[error("unable to list files from installer directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Terminal resolution failures.
///
/// Each variant carries the offending branch/version values verbatim so the
/// operator can diagnose a catalog or installer mismatch.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// No host branch descriptor matches the probed branch.
    #[error("could not find matching host branch {branch} in the catalog")]
    HostBranchNotFound { branch: String },

    /// No guest branch descriptor is compatible with the probed branch.
    #[error("could not find guest branch info matching host branch {branch} in the catalog")]
    GuestBranchNotFound { branch: String },

    /// Filtering left no staged, eligible guest driver on the host branch.
    #[error(
        "unable to find vGPU driver version matching host driver version {version} and branch {branch}"
    )]
    NoCompatibleDriver { version: String, branch: String },
}
