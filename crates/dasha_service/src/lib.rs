//! Boundary to the external dasha calculation service.
//!
//! - [`DashaRequest`]: the request contract (subject, level, system, lord context)
//! - [`PeriodSource`]: anything that answers requests with raw JSON;
//!   [`HttpPeriodSource`] is the `reqwest` implementation
//! - [`ExpansionController`]: the lazy drill-down state machine
//! - [`ExpansionDriver`]: runs the controller on tokio with timeouts and
//!   cancellation of superseded fetches

pub mod config;
pub mod controller;
pub mod driver;
pub mod error;
pub mod http;
pub mod request;
pub mod source;

pub use config::ServiceConfig;
pub use controller::{
    Breadcrumb, ExpansionController, ExpansionState, ExpansionWarning, Resolution, Ticket,
};
pub use driver::ExpansionDriver;
pub use error::{ServiceError, ServiceResult};
pub use http::HttpPeriodSource;
pub use request::{DashaRequest, LordContext};
pub use source::PeriodSource;
