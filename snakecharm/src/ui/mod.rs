// snakecharm/src/ui/mod.rs
pub mod output;
pub mod theme;
