//! Typed in-memory representation of the driver compatibility catalog.
//!
//! Fields mirror the catalog document. Allow/deny lists all share the same
//! evaluation contract: an empty allow list passes everything, a non-empty
//! allow list requires membership, and any deny membership rejects. The
//! resolver applies that contract; this module only carries the data.

use serde::Deserialize;

/// PCI identity used by allow/deny GPU rules.
///
/// Matches a probed GPU when `devid` equals its device ID or `ssid` is
/// present and equals its subsystem ID; comparisons ignore ASCII case.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GpuDescriptor {
    pub devid: String,
    #[serde(default)]
    pub ssid: Option<String>,
}

/// Whether a descriptor applies to the hypervisor or the guest side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Host,
    Guest,
}

/// Allow/deny rule lists attached to a branch descriptor.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BranchRules {
    #[serde(default)]
    pub branch: Vec<String>,
    #[serde(default)]
    pub cpu: Vec<String>,
    #[serde(default)]
    pub gpu: Vec<GpuDescriptor>,
}

/// One named driver branch and its eligibility rules.
#[derive(Debug, Clone, Deserialize)]
pub struct BranchDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub role: Role,
    #[serde(default)]
    pub allow: BranchRules,
    #[serde(default)]
    pub deny: BranchRules,
    #[serde(default)]
    pub properties: Vec<String>,
}

/// Reference to a concrete driver build inside allow/deny driver lists.
///
/// `hypervisor` and `os` qualifiers are carried but not consulted by
/// matching.
#[derive(Debug, Clone, Deserialize)]
pub struct DriverRef {
    pub version: String,
    #[serde(default)]
    pub hypervisor: Vec<String>,
    #[serde(default)]
    pub os: Vec<String>,
}

/// Allow/deny rule lists attached to a driver descriptor.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DriverRules {
    #[serde(default)]
    pub cpu: Vec<String>,
    #[serde(default)]
    pub gpu: Vec<GpuDescriptor>,
    #[serde(default)]
    pub driver: Vec<DriverRef>,
}

/// One concrete driver build and its eligibility rules.
#[derive(Debug, Clone, Deserialize)]
pub struct DriverDescriptor {
    pub version: String,
    #[serde(default)]
    pub date: String,
    pub branch: String,
    #[serde(rename = "type")]
    pub role: Role,
    #[serde(default)]
    pub os: Vec<String>,
    #[serde(default)]
    pub hypervisor: Vec<String>,
    #[serde(default)]
    pub allow: DriverRules,
    #[serde(default)]
    pub deny: DriverRules,
}

/// Contents of a vGPU driver catalog file.
///
/// `branch` and `driver` keep document order; first-match-wins during
/// resolution depends on it.
#[derive(Debug, Clone, Deserialize)]
pub struct DriverCatalog {
    pub version: i64,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub branch: Vec<BranchDescriptor>,
    #[serde(default)]
    pub driver: Vec<DriverDescriptor>,
}
