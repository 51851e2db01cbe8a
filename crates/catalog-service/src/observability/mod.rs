//! Observability for the catalog service.
//!
//! Provides metrics definitions and the recorder setup.

pub mod metrics;
