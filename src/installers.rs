//! Version tokens of locally staged driver installers.

use crate::error::InstallerError;
use regex::Regex;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use tracing::debug;

// NVIDIA-Linux-x86_64-460.16-grid.run
static INSTALLER_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^NVIDIA-Linux-x86_64-(.*)-grid\.run$").expect("installer name pattern"));

/// Collect the driver versions for which an installer is staged in `dir`.
///
/// Only filenames matching the guest installer convention contribute a
/// version token; everything else is silently ignored. An unreadable
/// directory is fatal.
pub fn scan_installers(dir: &Path) -> Result<BTreeSet<String>, InstallerError> {
    let entries = fs::read_dir(dir).map_err(|source| InstallerError::ReadDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut versions = BTreeSet::new();
    for entry in entries {
        let entry = entry.map_err(|source| InstallerError::ReadDir {
            path: dir.to_path_buf(),
            source,
        })?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if let Some(captures) = INSTALLER_NAME.captures(name) {
            let version = captures[1].to_string();
            debug!("found staged installer for driver version {version}");
            versions.insert(version);
        }
    }
    Ok(versions)
}
