// DRAM ECC reliability simulator core.
//
// This library exposes the Galois-field arithmetic, codec family, cache-line
// layout engine, fault taxonomy, per-rank fault domain, and ECC orchestrator
// that together make up the Monte-Carlo reliability estimator. `main.rs`
// wires these into a CLI front end; everything here is free of I/O.

pub mod app_config;
pub mod codec;
pub mod domain;
pub mod ecc;
pub mod error;
pub mod fault;
pub mod gf;
pub mod layout;
pub mod telemetry;
pub mod tester;
