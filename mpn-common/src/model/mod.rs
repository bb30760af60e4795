// mpn-common/src/model/mod.rs
pub mod dependency;
pub mod file;
pub mod package;
pub mod path;
pub mod reference;
pub mod relocation;
pub mod specifier;

pub use dependency::{ComponentGraph, ComponentNode, DependencyGraph, DependencyNode};
pub use file::FileKind;
pub use package::Package;
pub use reference::{ComponentRef, Reference};
pub use relocation::RelocationPlan;
pub use specifier::PackageSpecifier;
