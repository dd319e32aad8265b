//! Core library for the overture cluster orchestrator.
//!
//! The actual resource creation and convergence logic lives in the external
//! provisioning and configuration tools; this crate holds the data
//! transformations that cross the boundary with them: layered configuration
//! resolution, provisioning-state parsing, host-inventory derivation, the
//! readiness probe and template rendering.

pub mod config;
pub mod error;
pub mod inventory;
pub mod probe;
pub mod state;
pub mod template;

pub use error::Error;
