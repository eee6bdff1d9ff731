//! The `ObservationEngine` facade (spec §4.9): the only public entry
//! point into the core, wiring the ranker, store reader, merger,
//! formula engine, and overlay into the six operations of spec §6.

pub mod config;
pub mod decode;
pub mod engine;

pub use config::GatewayConfig;
pub use engine::ObservationEngine;
