//! Core types for dasha (planetary period) trees.
//!
//! A dasha timeline is a hierarchy of periods, five levels deep. Each
//! backend system returns its own JSON shape; the normalizer turns all of
//! them into the [`DashaNode`] tree defined here.

use std::fmt::{Display, Formatter};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::graha::Graha;

/// Year length constant for dasha period calculations.
pub const DAYS_PER_YEAR: f64 = 365.25;

/// Maximum dasha depth. Levels 0-4 supported.
pub const MAX_DASHA_LEVEL: u8 = 4;

/// 5 hierarchical dasha levels.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum DashaLevel {
    Mahadasha = 0,
    Antardasha = 1,
    Pratyantardasha = 2,
    Sookshma = 3,
    Prana = 4,
}

/// All 5 levels, outermost first.
pub const ALL_DASHA_LEVELS: [DashaLevel; 5] = [
    DashaLevel::Mahadasha,
    DashaLevel::Antardasha,
    DashaLevel::Pratyantardasha,
    DashaLevel::Sookshma,
    DashaLevel::Prana,
];

impl DashaLevel {
    /// Create from raw u8 value.
    pub fn from_u8(v: u8) -> Option<Self> {
        ALL_DASHA_LEVELS.get(v as usize).copied()
    }

    /// 0-based depth.
    pub const fn depth(self) -> u8 {
        self as u8
    }

    /// Human-readable name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Mahadasha => "Mahadasha",
            Self::Antardasha => "Antardasha",
            Self::Pratyantardasha => "Pratyantardasha",
            Self::Sookshma => "Sookshma",
            Self::Prana => "Prana",
        }
    }

    /// Identifier used by the calculation service.
    pub const fn service_name(self) -> &'static str {
        match self {
            Self::Mahadasha => "mahadasha",
            Self::Antardasha => "antardasha",
            Self::Pratyantardasha => "pratyantardasha",
            Self::Sookshma => "sookshma",
            Self::Prana => "prana",
        }
    }

    /// Next deeper level, if any.
    pub const fn child_level(self) -> Option<Self> {
        match self {
            Self::Mahadasha => Some(Self::Antardasha),
            Self::Antardasha => Some(Self::Pratyantardasha),
            Self::Pratyantardasha => Some(Self::Sookshma),
            Self::Sookshma => Some(Self::Prana),
            Self::Prana => None,
        }
    }

    /// Next shallower level, if any.
    pub const fn parent_level(self) -> Option<Self> {
        match self {
            Self::Mahadasha => None,
            Self::Antardasha => Some(Self::Mahadasha),
            Self::Pratyantardasha => Some(Self::Antardasha),
            Self::Sookshma => Some(Self::Pratyantardasha),
            Self::Prana => Some(Self::Sookshma),
        }
    }
}

impl Display for DashaLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Who rules a period.
///
/// Unrecognized planet identifiers are kept verbatim so one odd record does
/// not abort normalization of its siblings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum DashaLord {
    Graha(Graha),
    Unknown(String),
}

impl DashaLord {
    /// Resolve a backend planet identifier, tagging unknown ones.
    pub fn parse(s: &str) -> Self {
        match Graha::parse(s) {
            Some(g) => Self::Graha(g),
            None => Self::Unknown(s.trim().to_string()),
        }
    }

    /// The graha, if recognized.
    pub fn graha(&self) -> Option<Graha> {
        match self {
            Self::Graha(g) => Some(*g),
            Self::Unknown(_) => None,
        }
    }

    /// Compact code used in node ids.
    pub fn code(&self) -> &str {
        match self {
            Self::Graha(g) => g.code(),
            Self::Unknown(_) => "Unknown",
        }
    }
}

impl Display for DashaLord {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Graha(g) => f.write_str(g.english_name()),
            Self::Unknown(raw) => write!(f, "Unknown({raw})"),
        }
    }
}

/// Stable node identifier.
///
/// A `/`-joined path of `{depth}.{order}.{code}` segments, one per ancestor
/// plus the node itself. `order` is the 1-based position of the record in
/// the backend list, so ids stay put when a malformed sibling is dropped and
/// stay unique when a planet repeats under one parent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Build the id for a node under `parent` (None for top-level nodes).
    pub fn new(parent: Option<&NodeId>, level: DashaLevel, order: u32, lord: &DashaLord) -> Self {
        let segment = format!("{}.{}.{}", level.depth(), order, lord.code());
        match parent {
            Some(p) => Self(format!("{}/{}", p.0, segment)),
            None => Self(segment),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of path segments (1 for a mahadasha).
    pub fn segments(&self) -> usize {
        self.0.split('/').count()
    }

    /// True if `self` is a strict ancestor of `other`.
    pub fn is_ancestor_of(&self, other: &NodeId) -> bool {
        other.0.len() > self.0.len()
            && other.0.starts_with(&self.0)
            && other.0.as_bytes()[self.0.len()] == b'/'
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single dasha period in canonical form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashaNode {
    /// Deterministic id, unique within a tree.
    pub id: NodeId,
    /// The ruling planet.
    pub lord: DashaLord,
    /// Inclusive start.
    pub start: DateTime<Utc>,
    /// Inclusive end.
    pub end: DateTime<Utc>,
    /// Hierarchical level.
    pub level: DashaLevel,
    /// 1-indexed position in the backend list this node came from.
    pub order: u32,
    /// `None` = not fetched yet, `Some([])` = no sub-periods exist.
    pub children: Option<Arc<[DashaNode]>>,
    /// Derived: the period contains "now".
    pub is_current: bool,
    /// Derived: the period was already running at birth.
    pub is_balance: bool,
    /// 1-based super-cycle index for cyclic systems.
    pub cycle_number: Option<u32>,
    /// Backend fields other than the children array, untouched.
    pub raw: Map<String, Value>,
}

impl DashaNode {
    /// Duration of the period.
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Duration of the period in fractional days.
    pub fn duration_days(&self) -> f64 {
        self.duration().num_seconds() as f64 / 86_400.0
    }

    /// Inclusive containment check on both ends.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }

    /// Whether a deeper level can exist below this node.
    pub fn is_expandable(&self) -> bool {
        self.level.child_level().is_some()
    }

    /// Whether the next level has been fetched (possibly empty).
    pub fn is_fetched(&self) -> bool {
        self.children.is_some()
    }

    /// Loaded children, if any were fetched.
    pub fn children(&self) -> Option<&[DashaNode]> {
        self.children.as_deref()
    }

    /// Copy of this node with its children replaced.
    pub fn with_children(&self, children: Vec<DashaNode>) -> Self {
        Self {
            children: Some(Arc::from(children)),
            ..self.clone()
        }
    }
}
