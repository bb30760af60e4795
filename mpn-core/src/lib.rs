// mpn-core/src/lib.rs

pub mod catalog;
pub mod components;
pub mod context;
pub mod graph;
pub mod pipeline;
pub mod relocate;
pub mod resolve;
pub mod rewrite;
pub mod scan;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export key types for easier use by the CLI crate
pub use catalog::PackageCatalog;
pub use components::ComponentWalker;
pub use context::BuildContext;
pub use graph::DependencyGraphBuilder;
pub use pipeline::engine::{run_build, BuildOutput};
pub use pipeline::output::write_outputs;
pub use relocate::RelocationPlanner;
pub use resolve::{ModuleResolver, NodeResolver, ReferenceResolver};
pub use rewrite::{ContentRewriter, PackageTable};
pub use scan::{ScanningExtractor, SpecifierExtractor};
