//! MiWiFi cache CLI library
//!
//! Configuration loading and the simulated collection loop behind the
//! `miwifi-cache` binary.

pub mod config;
pub mod simulation;
