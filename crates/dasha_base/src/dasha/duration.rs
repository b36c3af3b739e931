//! Human-readable period durations ("4Y 3M 12D").
//!
//! Sources, highest precedence first:
//! 1. a fixed per-planet duration (backend hint or system table),
//! 2. backend year/day counts, when they agree with the date span,
//! 3. the calendar difference between start and end.

use chrono::{DateTime, Datelike, Months, Utc};
use tracing::warn;

use super::fields::{Field, as_f64};
use super::system::SystemProfile;
use super::types::{DAYS_PER_YEAR, DashaLevel, DashaNode};

/// Mean month length used when splitting numeric day counts.
pub const DAYS_PER_MONTH: f64 = DAYS_PER_YEAR / 12.0;

/// Numeric counts may drift this far from the date span and still count as consistent.
pub const CONSISTENCY_TOLERANCE_DAYS: f64 = 2.0;

/// Everything the formatter may draw on for one period.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DurationInput {
    pub years: Option<f64>,
    pub days: Option<f64>,
    pub span: Option<(DateTime<Utc>, DateTime<Utc>)>,
    pub fixed_years: Option<f64>,
}

impl DurationInput {
    pub fn from_span(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            span: Some((start, end)),
            ..Self::default()
        }
    }

    /// Collect hints from a node's raw fields, its dates and, for top-level
    /// non-balance periods, the system's fixed-duration table.
    pub fn from_node(node: &DashaNode, profile: Option<&SystemProfile>) -> Self {
        let raw_fixed = Field::FixedYears.lookup(&node.raw).and_then(as_f64);
        let table_fixed = match (profile, node.lord.graha()) {
            (Some(p), Some(g)) if node.level == DashaLevel::Mahadasha && !node.is_balance => {
                p.fixed_years(g)
            }
            _ => None,
        };
        Self {
            years: Field::Years.lookup(&node.raw).and_then(as_f64),
            days: Field::Days.lookup(&node.raw).and_then(as_f64),
            span: Some((node.start, node.end)),
            fixed_years: raw_fixed.or(table_fixed),
        }
    }

    /// Total days implied by the numeric counts, if any.
    fn numeric_days(&self) -> Option<f64> {
        self.days.or(self.years.map(|y| y * DAYS_PER_YEAR))
    }

    fn span_days(&self) -> Option<f64> {
        self.span
            .map(|(start, end)| (end - start).num_seconds() as f64 / 86_400.0)
    }
}

/// Broken-down duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DurationParts {
    pub years: u32,
    pub months: u32,
    pub days: u32,
}

impl DurationParts {
    /// Split a day count on mean year and month lengths.
    pub fn from_days(total: f64) -> Self {
        let total = total.max(0.0) + 1e-6;
        let years = (total / DAYS_PER_YEAR).floor();
        let rest = total - years * DAYS_PER_YEAR;
        let months = (rest / DAYS_PER_MONTH).floor();
        let days = (rest - months * DAYS_PER_MONTH).floor();
        Self {
            years: years as u32,
            months: months as u32,
            days: days as u32,
        }
    }

    /// Calendar difference: whole years, then whole months, then days.
    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        if end <= start {
            return Self::default();
        }
        let mut months = (end.year() - start.year()) * 12 + end.month() as i32 - start.month() as i32;
        let mut cursor = add_months(start, months);
        while months > 0 && cursor.is_none_or(|c| c > end) {
            months -= 1;
            cursor = add_months(start, months);
        }
        let cursor = cursor.unwrap_or(start);
        let months = months.max(0) as u32;
        Self {
            years: months / 12,
            months: months % 12,
            days: (end - cursor).num_days().max(0) as u32,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.years == 0 && self.months == 0 && self.days == 0
    }
}

fn add_months(start: DateTime<Utc>, months: i32) -> Option<DateTime<Utc>> {
    start.checked_add_months(Months::new(u32::try_from(months).ok()?))
}

impl std::fmt::Display for DurationParts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_zero() {
            return f.write_str("0D");
        }
        let parts = [(self.years, 'Y'), (self.months, 'M'), (self.days, 'D')];
        let mut first = true;
        for (value, unit) in parts {
            if value == 0 {
                continue;
            }
            if !first {
                f.write_str(" ")?;
            }
            write!(f, "{value}{unit}")?;
            first = false;
        }
        Ok(())
    }
}

/// Resolve the duration parts for `input`.
pub fn duration_parts(input: &DurationInput) -> DurationParts {
    if let Some(years) = input.fixed_years {
        return numeric_parts(years * DAYS_PER_YEAR, "fixed duration");
    }

    let numeric = input.numeric_days();
    match (numeric, input.span) {
        (Some(n), Some((start, end))) => {
            let consistent = input
                .span_days()
                .is_some_and(|s| (s - n).abs() <= CONSISTENCY_TOLERANCE_DAYS);
            if consistent {
                numeric_parts(n, "numeric duration")
            } else {
                span_parts(start, end)
            }
        }
        (Some(n), None) => numeric_parts(n, "numeric duration"),
        (None, Some((start, end))) => span_parts(start, end),
        (None, None) => DurationParts::default(),
    }
}

/// Format `input` as e.g. `"4Y 3M 12D"`; zero and malformed input give `"0D"`.
pub fn format_duration(input: &DurationInput) -> String {
    duration_parts(input).to_string()
}

fn numeric_parts(days: f64, source: &str) -> DurationParts {
    if !days.is_finite() || days < 0.0 {
        warn!(days, source, "malformed duration, formatting as zero");
        return DurationParts::default();
    }
    DurationParts::from_days(days)
}

fn span_parts(start: DateTime<Utc>, end: DateTime<Utc>) -> DurationParts {
    if end < start {
        warn!(%start, %end, "negative period span, formatting as zero");
        return DurationParts::default();
    }
    DurationParts::between(start, end)
}
