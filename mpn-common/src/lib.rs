// mpn-common/src/lib.rs
pub mod config;
pub mod error;
pub mod manifest;
pub mod model;
pub mod pipeline;

// Re-export key types
pub use config::Config;
pub use error::{MpnError, Result};
pub use model::{
    DependencyGraph, DependencyNode, FileKind, Package, PackageSpecifier, Reference,
    RelocationPlan,
};
