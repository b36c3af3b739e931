//! Error types for dasha tree construction.

use thiserror::Error;

use crate::dasha::types::DashaLevel;

/// Errors from the dasha engine.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum DashaError {
    /// One record could not be normalized.
    #[error("malformed period: {0}")]
    MalformedPeriod(#[from] MalformedPeriodError),
    /// Expansion requested below Prana.
    #[error("no level exists below {0}")]
    UnsupportedDepth(DashaLevel),
    /// A payload contained no recognizable list of periods.
    #[error("no period list found in payload")]
    NoPeriodList,
    /// Unrecognized calendar-system identifier.
    #[error("unknown dasha system: {0}")]
    UnknownSystem(String),
}

/// Why a single period record was dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MalformedReason {
    NotAnObject,
    MissingPlanet,
    MissingDate(&'static str),
    UnparsableDate { field: &'static str, value: String },
}

/// A record that could not become a `DashaNode`.
///
/// Recovered locally: the record is dropped and its siblings still
/// normalize.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{level} record #{order}: {}", describe(.reason))]
pub struct MalformedPeriodError {
    /// Level the record was being normalized at.
    pub level: DashaLevel,
    /// 1-based position of the record in its list.
    pub order: u32,
    pub reason: MalformedReason,
}

fn describe(reason: &MalformedReason) -> String {
    match reason {
        MalformedReason::NotAnObject => "not a JSON object".to_string(),
        MalformedReason::MissingPlanet => "missing planet identifier".to_string(),
        MalformedReason::MissingDate(field) => format!("missing {field} date"),
        MalformedReason::UnparsableDate { field, value } => {
            format!("unparsable {field} date {value:?}")
        }
    }
}
