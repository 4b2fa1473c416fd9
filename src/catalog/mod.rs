//! Driver catalog wiring.
//!
//! The catalog is the declarative document enumerating every known
//! branch/driver compatibility rule. Types in [`model`] mirror the document
//! fields; [`loader`] reads a document from disk and checks the minimal
//! structure the resolver relies on. The catalog is immutable once loaded
//! and its sequence order is preserved end to end.

pub mod loader;
pub mod model;

pub use loader::load_catalog_from_path;
pub use model::{
    BranchDescriptor, BranchRules, DriverCatalog, DriverDescriptor, DriverRef, DriverRules,
    GpuDescriptor, Role,
};

/// Default location of the driver catalog document.
pub const DEFAULT_CATALOG_FILE: &str = "/drivers/vgpuDriverCatalog.json";
