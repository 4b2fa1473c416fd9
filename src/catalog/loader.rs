//! Catalog loading and minimal structural validation.

use crate::catalog::model::DriverCatalog;
use crate::error::CatalogError;
use std::fs;
use std::path::Path;
use tracing::info;

/// Load a driver catalog document from disk.
///
/// Validation stops at structure: the document must parse into the typed
/// model and name every branch and driver. Whether the entries make sense
/// together is the resolver's concern.
pub fn load_catalog_from_path(path: &Path) -> Result<DriverCatalog, CatalogError> {
    info!("loading catalog file {}", path.display());

    if !path.exists() {
        return Err(CatalogError::NotFound {
            path: path.to_path_buf(),
        });
    }

    let data = fs::read_to_string(path).map_err(|source| CatalogError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let catalog: DriverCatalog =
        serde_json::from_str(&data).map_err(|source| CatalogError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    validate(&catalog).map_err(|reason| CatalogError::Invalid {
        path: path.to_path_buf(),
        reason,
    })?;

    info!("successfully loaded catalog file");
    Ok(catalog)
}

fn validate(catalog: &DriverCatalog) -> Result<(), String> {
    for branch in &catalog.branch {
        if branch.name.trim().is_empty() {
            return Err("branch descriptor with empty name".to_string());
        }
    }
    for driver in &catalog.driver {
        if driver.version.trim().is_empty() {
            return Err("driver descriptor with empty version".to_string());
        }
        if driver.branch.trim().is_empty() {
            return Err(format!(
                "driver descriptor {} with empty branch",
                driver.version
            ));
        }
    }
    Ok(())
}
