// snakecharm/src/commands/mod.rs
pub mod bypass;
pub mod strategies;
