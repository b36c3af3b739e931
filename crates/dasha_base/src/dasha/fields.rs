//! Field-name candidates for duck-typed backend records.
//!
//! Every logical field maps to an ordered list of keys; the first key that
//! is present with a non-null value wins. Adding a backend spelling means
//! adding one string here.

use serde_json::{Map, Value};

/// Logical fields of a period record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Planet,
    Start,
    End,
    Children,
    Cycle,
    BalanceFlag,
    BalanceKind,
    Years,
    Days,
    FixedYears,
}

/// `{logical field: [candidate keys...]}`, consulted in order.
pub const FIELD_CANDIDATES: [(Field, &[&str]); 10] = [
    (
        Field::Planet,
        &[
            "planet",
            "lord",
            "planet_name",
            "planetName",
            "graha",
            "dasha_lord",
            "dashaLord",
        ],
    ),
    (
        Field::Start,
        &[
            "startDate",
            "start_date",
            "start",
            "startTime",
            "start_time",
            "from",
            "begin",
        ],
    ),
    (
        Field::End,
        &["endDate", "end_date", "end", "endTime", "end_time", "to", "until"],
    ),
    (
        Field::Children,
        &[
            "subPeriods",
            "sub_periods",
            "antardashas",
            "pratyantardashas",
            "sookshmas",
            "sookshma_dashas",
            "pranas",
            "prana_dashas",
            "children",
        ],
    ),
    (Field::Cycle, &["cycleNumber", "cycle_number", "cycle"]),
    (Field::BalanceFlag, &["isBalance", "is_balance", "balance"]),
    (
        Field::BalanceKind,
        &["antardasha_type", "dasha_type", "period_type", "type"],
    ),
    (
        Field::Years,
        &["years", "duration_years", "durationYears", "period_years"],
    ),
    (Field::Days, &["days", "duration_days", "durationDays"]),
    (
        Field::FixedYears,
        &["fixed_years", "fixedYears", "fixed_duration_years"],
    ),
];

/// Keys under which a response may carry its list of periods.
pub const PERIOD_LIST_KEYS: [&str; 16] = [
    "periods",
    "dashas",
    "mahadashas",
    "antardashas",
    "pratyantardashas",
    "sookshmas",
    "sookshma_dashas",
    "pranas",
    "prana_dashas",
    "dasha_periods",
    "subPeriods",
    "sub_periods",
    "timeline",
    "data",
    "result",
    "results",
];

impl Field {
    /// Candidate keys for this field, most preferred first.
    pub fn candidates(self) -> &'static [&'static str] {
        FIELD_CANDIDATES
            .iter()
            .find(|(f, _)| *f == self)
            .map(|(_, keys)| *keys)
            .unwrap_or(&[])
    }

    /// First non-null value for this field.
    pub fn lookup(self, record: &Map<String, Value>) -> Option<&Value> {
        self.candidates()
            .iter()
            .filter_map(|key| record.get(*key))
            .find(|v| !v.is_null())
    }

    /// Whether `key` is one of this field's candidates.
    pub fn matches(self, key: &str) -> bool {
        self.candidates().contains(&key)
    }
}

/// Read a number that may arrive as a JSON number or numeric string.
pub fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .filter(|v: &f64| v.is_finite())
}

/// Read a boolean that may arrive as a JSON bool, 0/1, or "true"/"false".
pub fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|v| v != 0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}
