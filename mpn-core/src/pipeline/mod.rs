// mpn-core/src/pipeline/mod.rs
pub mod engine;
pub mod output;
mod worker;
