//! Immutable tree operations.
//!
//! Trees are never mutated in place. Attaching children rebuilds only the
//! ancestor chain of the target; every untouched subtree stays behind the
//! same `Arc`.

use chrono::Duration;
use tracing::warn;

use super::types::{DashaNode, NodeId};

/// Largest boundary mismatch between siblings that is not reported, in seconds.
pub const CONTIGUITY_TOLERANCE_SECS: i64 = 86_400;

/// Find a node by id anywhere in the loaded tree.
pub fn find_node<'a>(roots: &'a [DashaNode], id: &NodeId) -> Option<&'a DashaNode> {
    let mut level = roots;
    loop {
        let node = level
            .iter()
            .find(|n| n.id == *id || n.id.is_ancestor_of(id))?;
        if node.id == *id {
            return Some(node);
        }
        level = node.children()?;
    }
}

/// Ancestors of `id`, outermost first, ending with the node itself.
pub fn path_to<'a>(roots: &'a [DashaNode], id: &NodeId) -> Option<Vec<&'a DashaNode>> {
    let mut path = Vec::new();
    let mut level = roots;
    loop {
        let node = level
            .iter()
            .find(|n| n.id == *id || n.id.is_ancestor_of(id))?;
        path.push(node);
        if node.id == *id {
            return Some(path);
        }
        level = node.children()?;
    }
}

/// New roots with `children` attached under `target`.
///
/// Returns `None` when `target` is not in the loaded tree.
pub fn with_children(
    roots: &[DashaNode],
    target: &NodeId,
    children: Vec<DashaNode>,
) -> Option<Vec<DashaNode>> {
    let idx = roots
        .iter()
        .position(|n| n.id == *target || n.id.is_ancestor_of(target))?;
    let node = &roots[idx];
    let replacement = if node.id == *target {
        node.with_children(children)
    } else {
        let kids = with_children(node.children()?, target, children)?;
        node.with_children(kids)
    };
    let mut out = roots.to_vec();
    out[idx] = replacement;
    Some(out)
}

/// A boundary between consecutive siblings that is not contiguous.
#[derive(Debug, Clone, PartialEq)]
pub struct ContiguityGap {
    pub before: NodeId,
    pub after: NodeId,
    /// `after.start - before.end`; negative means overlap.
    pub gap: Duration,
}

impl ContiguityGap {
    pub fn is_overlap(&self) -> bool {
        self.gap < Duration::zero()
    }
}

/// Report sibling boundaries that drift more than a day apart.
///
/// The boundary after a leading balance period is exempt.
pub fn check_contiguity(siblings: &[DashaNode]) -> Vec<ContiguityGap> {
    siblings
        .windows(2)
        .enumerate()
        .filter(|(i, pair)| !(*i == 0 && pair[0].is_balance))
        .filter_map(|(_, pair)| {
            let gap = pair[1].start - pair[0].end;
            (gap.num_seconds().abs() > CONTIGUITY_TOLERANCE_SECS).then(|| ContiguityGap {
                before: pair[0].id.clone(),
                after: pair[1].id.clone(),
                gap,
            })
        })
        .collect()
}

/// Run [`check_contiguity`] over every loaded sibling list and log the findings.
pub fn audit_contiguity(roots: &[DashaNode]) -> Vec<ContiguityGap> {
    let mut gaps = check_contiguity(roots);
    for node in roots {
        if let Some(kids) = node.children() {
            gaps.extend(audit_contiguity(kids));
        }
    }
    for gap in &gaps {
        warn!(
            before = %gap.before,
            after = %gap.after,
            gap_hours = gap.gap.num_hours(),
            overlap = gap.is_overlap(),
            "non-contiguous sibling periods"
        );
    }
    gaps
}
