//! Dasha hierarchy engine.
//!
//! This crate provides:
//! - The nine grahas and lenient planet-name resolution
//! - A canonical `DashaNode` tree built from heterogeneous backend payloads
//! - Current-period location, cycle grouping, balance detection and
//!   duration formatting over those trees
//!
//! Period boundaries are computed by an external service; everything here
//! is a pure function of its inputs.

pub mod dasha;
pub mod error;
pub mod graha;

pub use error::{DashaError, MalformedPeriodError};
pub use graha::{ALL_GRAHAS, Graha};
