// mpn/src/pipeline/mod.rs
pub mod runner;
