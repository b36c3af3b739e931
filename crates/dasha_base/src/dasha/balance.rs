//! Balance-at-birth detection.
//!
//! A balance period is the partial period already running at the birth
//! moment. Backends sometimes flag it; when none of a sequence is flagged,
//! the per-system [`BalancePolicy`] decides whether the first position is
//! assumed to be one.

use std::sync::Arc;

use serde_json::{Map, Value};

use super::fields::{Field, as_bool};
use super::types::DashaNode;

/// Heuristic used when a sequence carries no explicit balance flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BalancePolicy {
    /// Only backend flags mark balance periods.
    ExplicitOnly,
    /// Position zero of a sequence that starts at birth is balance.
    #[default]
    FirstPosition,
}

impl BalancePolicy {
    pub const fn name(self) -> &'static str {
        match self {
            Self::ExplicitOnly => "explicit-only",
            Self::FirstPosition => "first-position",
        }
    }
}

/// Read an explicit balance signal from a raw record.
///
/// Boolean flags (`is_balance`, `balance`) give a definite answer. A type
/// string (`antardasha_type`, ...) only signals `true` when it mentions
/// "balance"; any other type value is no signal at all.
pub fn explicit_balance_flag(raw: &Map<String, Value>) -> Option<bool> {
    if let Some(flag) = Field::BalanceFlag.lookup(raw).and_then(as_bool) {
        return Some(flag);
    }
    Field::BalanceKind
        .lookup(raw)
        .and_then(Value::as_str)
        .filter(|kind| kind.to_ascii_lowercase().contains("balance"))
        .map(|_| true)
}

/// Annotate `is_balance` across a sibling list and every loaded subtree.
///
/// `starts_at_birth` says whether this sequence begins at the birth moment:
/// true for the top-level list, and for a child list when its parent is
/// itself a balance period.
pub fn detect_balance(
    nodes: &[DashaNode],
    policy: BalancePolicy,
    starts_at_birth: bool,
) -> Vec<DashaNode> {
    let flags: Vec<Option<bool>> = nodes.iter().map(|n| explicit_balance_flag(&n.raw)).collect();
    let any_explicit = flags.iter().any(Option::is_some);

    nodes
        .iter()
        .zip(flags)
        .enumerate()
        .map(|(i, (node, flag))| {
            let is_balance = if any_explicit {
                flag.unwrap_or(false)
            } else {
                policy == BalancePolicy::FirstPosition && starts_at_birth && i == 0
            };
            let children = node
                .children
                .as_deref()
                .map(|kids| Arc::from(detect_balance(kids, policy, is_balance)));
            DashaNode {
                is_balance,
                children,
                ..node.clone()
            }
        })
        .collect()
}
