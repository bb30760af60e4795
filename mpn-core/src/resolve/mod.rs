// mpn-core/src/resolve/mod.rs
pub mod host;
pub mod reference;

pub use host::{ModuleResolver, NodeResolver};
pub use reference::ReferenceResolver;
