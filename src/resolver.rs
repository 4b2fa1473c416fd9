//! Two-stage compatibility resolution over the driver catalog.
//!
//! Stage one selects branches: the single host branch descriptor matching
//! the probed driver branch, and the guest branches eligible to pair with
//! it. Stage two selects drivers: the host driver descriptor for the probed
//! version, and the guest driver candidates that survive constraint, OS,
//! availability, and host allow/deny filtering. The first surviving
//! candidate on the host branch wins.
//!
//! Resolution is a pure function of its inputs: catalog order is scanned
//! front to back, first match wins, and filtering always builds new
//! sequences instead of mutating one being iterated. Calling it twice with
//! identical inputs yields identical results.

use crate::GUEST_OS;
use crate::catalog::{BranchDescriptor, DriverCatalog, DriverDescriptor, GpuDescriptor, Role};
use crate::error::ResolveError;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// PCI identity of the probed GPU.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GpuIdentity {
    /// Lower-case hex device ID as sysfs reports it, e.g. `0x2331`.
    pub device_id: String,
    pub subsystem_id: Option<String>,
}

/// Everything the resolver needs to know about the local machine.
///
/// Built once per run, read-only afterwards, and passed explicitly into
/// every resolver call.
#[derive(Debug, Clone)]
pub struct HostEnvironment {
    pub gpu: GpuIdentity,
    pub cpu_architecture: String,
    pub host_driver_version: String,
    pub host_driver_branch: String,
}

/// Resolve the single guest driver version compatible with `env`.
///
/// `available` holds the version tokens of locally staged installers; a
/// catalog match that is not staged cannot be selected.
pub fn resolve(
    catalog: &DriverCatalog,
    env: &HostEnvironment,
    available: &BTreeSet<String>,
) -> Result<String, ResolveError> {
    let (host_branch, guest_branches) = select_branches(catalog, env)?;
    let (host_driver, candidates) = select_drivers(catalog, env, &guest_branches);

    let candidates: Vec<&DriverDescriptor> = candidates
        .into_iter()
        .filter(|driver| {
            if !available.contains(&driver.version) {
                debug!(
                    "dropping guest driver {} as no installer is staged locally",
                    driver.version
                );
                return false;
            }
            if let Some(host) = host_driver {
                let permitted = permits(&host.allow.driver, &host.deny.driver, |r| {
                    r.version == driver.version
                });
                if !permitted {
                    debug!(
                        "dropping guest driver {} per host driver allow/deny rules",
                        driver.version
                    );
                    return false;
                }
            }
            true
        })
        .collect();

    match candidates
        .iter()
        .find(|driver| driver.branch == env.host_driver_branch)
    {
        Some(driver) => {
            info!(
                "selected guest driver {} on branch {}",
                driver.version, driver.branch
            );
            Ok(driver.version.clone())
        }
        // Candidates on other branches are not ranked by recency; only the
        // host branch yields a selection.
        None => Err(ResolveError::NoCompatibleDriver {
            version: env.host_driver_version.clone(),
            branch: env.host_driver_branch.clone(),
        }),
    }
}

/// Applies one allow/deny rule axis: an empty allow list passes everything,
/// a non-empty allow list requires a match, and any deny match rejects.
fn permits<T>(allow: &[T], deny: &[T], matches: impl Fn(&T) -> bool) -> bool {
    if !allow.is_empty() && !allow.iter().any(&matches) {
        return false;
    }
    !deny.iter().any(&matches)
}

fn gpu_matches(rule: &GpuDescriptor, gpu: &GpuIdentity) -> bool {
    if !gpu.device_id.is_empty() && rule.devid.eq_ignore_ascii_case(&gpu.device_id) {
        return true;
    }
    match (&rule.ssid, &gpu.subsystem_id) {
        (Some(ssid), Some(id)) if !id.is_empty() => ssid.eq_ignore_ascii_case(id),
        _ => false,
    }
}

fn branch_rules_permit(branch: &BranchDescriptor, env: &HostEnvironment) -> bool {
    permits(&branch.allow.cpu, &branch.deny.cpu, |cpu| {
        cpu == &env.cpu_architecture
    }) && permits(&branch.allow.gpu, &branch.deny.gpu, |gpu| {
        gpu_matches(gpu, &env.gpu)
    })
}

fn driver_rules_permit(driver: &DriverDescriptor, env: &HostEnvironment) -> bool {
    permits(&driver.allow.cpu, &driver.deny.cpu, |cpu| {
        cpu == &env.cpu_architecture
    }) && permits(&driver.allow.gpu, &driver.deny.gpu, |gpu| {
        gpu_matches(gpu, &env.gpu)
    })
}

fn names_version(list: &[crate::catalog::DriverRef], version: &str) -> bool {
    list.iter().any(|r| r.version == version)
}

fn supports_guest_os(os: &[String]) -> bool {
    os.iter().any(|os| os.as_str() == GUEST_OS)
}

/// Stage one: the host branch descriptor and the eligible guest branches.
fn select_branches<'a>(
    catalog: &'a DriverCatalog,
    env: &HostEnvironment,
) -> Result<(&'a BranchDescriptor, Vec<&'a BranchDescriptor>), ResolveError> {
    let mut host_branch: Option<&BranchDescriptor> = None;
    let mut guest_branches: Vec<&BranchDescriptor> = Vec::new();

    for branch in &catalog.branch {
        match branch.role {
            Role::Host => {
                debug!("checking host branch descriptor {}", branch.name);
                if branch.name != env.host_driver_branch || !branch_rules_permit(branch, env) {
                    continue;
                }
                if host_branch.is_some() {
                    warn!(
                        "duplicate host branch info found for branch name {}",
                        branch.name
                    );
                    continue;
                }
                host_branch = Some(branch);
            }
            Role::Guest => {
                debug!("checking guest branch descriptor {}", branch.name);
                if !branch_rules_permit(branch, env) {
                    continue;
                }
                if branch
                    .deny
                    .branch
                    .iter()
                    .any(|b| b == &env.host_driver_branch)
                {
                    info!(
                        "host branch {} matches denied branch list of {}, ignoring",
                        env.host_driver_branch, branch.name
                    );
                    continue;
                }
                // A guest branch opts in by naming the host branches it can
                // pair with; no allow list means no pairing.
                if branch.allow.branch.is_empty() {
                    continue;
                }
                if !branch
                    .allow
                    .branch
                    .iter()
                    .any(|b| b == &env.host_driver_branch)
                {
                    info!(
                        "host branch {} not in allowed branch list of {}, ignoring",
                        env.host_driver_branch, branch.name
                    );
                    continue;
                }
                guest_branches.push(branch);
            }
        }
    }

    let host_branch = host_branch.ok_or_else(|| ResolveError::HostBranchNotFound {
        branch: env.host_driver_branch.clone(),
    })?;
    debug!("selected host branch descriptor {}", host_branch.name);

    if guest_branches.is_empty() {
        return Err(ResolveError::GuestBranchNotFound {
            branch: env.host_driver_branch.clone(),
        });
    }
    debug!("collected {} guest branch descriptors", guest_branches.len());

    // The host branch's own allow/deny lists govern which guest branches it
    // will pair with. An empty result here is not an error; stage two can
    // still include candidates through explicit allow-driver entries.
    let guest_branches: Vec<&BranchDescriptor> = guest_branches
        .into_iter()
        .filter(|guest| {
            let kept = permits(&host_branch.allow.branch, &host_branch.deny.branch, |b| {
                b == &guest.name
            });
            if !kept {
                debug!(
                    "removing guest branch {} per host branch allow/deny rules",
                    guest.name
                );
            }
            kept
        })
        .collect();

    Ok((host_branch, guest_branches))
}

/// Stage two: the host driver descriptor and the raw guest candidates.
fn select_drivers<'a>(
    catalog: &'a DriverCatalog,
    env: &HostEnvironment,
    guest_branches: &[&BranchDescriptor],
) -> (Option<&'a DriverDescriptor>, Vec<&'a DriverDescriptor>) {
    let mut host_driver: Option<&DriverDescriptor> = None;
    let mut candidates: Vec<&DriverDescriptor> = Vec::new();

    for driver in &catalog.driver {
        match driver.role {
            Role::Guest => {
                if !driver_rules_permit(driver, env) {
                    continue;
                }
                if !supports_guest_os(&driver.os) {
                    continue;
                }
                // An explicit allow entry naming the host version includes
                // the candidate outright, even off the eligible branches.
                if names_version(&driver.allow.driver, &env.host_driver_version) {
                    candidates.push(driver);
                    continue;
                }
                if names_version(&driver.deny.driver, &env.host_driver_version) {
                    debug!(
                        "guest driver {} denies host driver version {}",
                        driver.version, env.host_driver_version
                    );
                    continue;
                }
                if guest_branches.iter().any(|b| b.name == driver.branch) {
                    candidates.push(driver);
                }
            }
            Role::Host => {
                if !driver_rules_permit(driver, env) {
                    continue;
                }
                if driver.branch != env.host_driver_branch
                    || driver.version != env.host_driver_version
                {
                    continue;
                }
                if host_driver.is_some() {
                    warn!(
                        "duplicate driver info found for branch {} version {}",
                        driver.branch, driver.version
                    );
                    continue;
                }
                host_driver = Some(driver);
            }
        }
    }

    (host_driver, candidates)
}
