//! Current-period location.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::types::{DashaLord, DashaNode};

/// Chain of current periods, outermost first.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivePath {
    /// Instant the path was computed for.
    pub query: DateTime<Utc>,
    /// One node per depth, ending at the deepest loaded level with a match.
    pub periods: Vec<DashaNode>,
}

impl ActivePath {
    pub fn lords(&self) -> Vec<&DashaLord> {
        self.periods.iter().map(|n| &n.lord).collect()
    }

    pub fn deepest(&self) -> Option<&DashaNode> {
        self.periods.last()
    }

    pub fn len(&self) -> usize {
        self.periods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }
}

/// Index of the first sibling whose inclusive interval contains `now`.
pub fn find_active(nodes: &[DashaNode], now: DateTime<Utc>) -> Option<usize> {
    nodes.iter().position(|n| n.contains(now))
}

/// Recompute `is_current` throughout the tree and return the active path.
///
/// Only children of a current node can be current. When two siblings both
/// contain `now`, the first one in list order wins.
pub fn locate_current(nodes: &[DashaNode], now: DateTime<Utc>) -> (Vec<DashaNode>, ActivePath) {
    let mut periods = Vec::new();
    let annotated = annotate(nodes, now, true, &mut periods);
    (annotated, ActivePath { query: now, periods })
}

fn annotate(
    nodes: &[DashaNode],
    now: DateTime<Utc>,
    parent_active: bool,
    path: &mut Vec<DashaNode>,
) -> Vec<DashaNode> {
    let active = if parent_active {
        find_active(nodes, now)
    } else {
        None
    };

    nodes
        .iter()
        .enumerate()
        .map(|(i, node)| {
            let is_current = active == Some(i);
            let mut out = DashaNode {
                is_current,
                children: None,
                ..node.clone()
            };
            if is_current {
                // parent goes on the path before its descendants
                path.push(out.clone());
            }
            let slot = path.len();
            out.children = node
                .children
                .as_deref()
                .map(|kids| Arc::from(annotate(kids, now, is_current, path)));
            if is_current {
                path[slot - 1].children = out.children.clone();
            }
            out
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dasha::normalize::normalize_periods;
    use crate::dasha::types::DashaLevel;
    use chrono::TimeZone;
    use serde_json::json;

    fn mahadashas() -> Vec<DashaNode> {
        let records = json!([
            {"planet": "Su", "startDate": "1980-01-01", "endDate": "1986-01-01"},
            {"planet": "Mo", "startDate": "1986-01-01", "endDate": "1996-01-01"},
            {"planet": "Ma", "startDate": "1996-01-01", "endDate": "2003-01-01"},
            {"planet": "Ra", "startDate": "2003-01-01", "endDate": "2021-01-01"},
            {"planet": "Ju", "startDate": "2021-01-01", "endDate": "2037-01-01", "antardashas": [
                {"planet": "Ju", "startDate": "2021-01-01", "endDate": "2023-02-19"},
                {"planet": "Sa", "startDate": "2023-02-19", "endDate": "2025-09-01"},
                {"planet": "Me", "startDate": "2025-09-01", "endDate": "2027-12-07"}
            ]},
            {"planet": "Sa", "startDate": "2037-01-01", "endDate": "2056-01-01"},
            {"planet": "Me", "startDate": "2056-01-01", "endDate": "2073-01-01"},
            {"planet": "Ke", "startDate": "2073-01-01", "endDate": "2080-01-01"}
        ]);
        normalize_periods(records.as_array().unwrap(), None, DashaLevel::Mahadasha).nodes
    }

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn jupiter_current_in_2023() {
        let (nodes, path) = locate_current(&mahadashas(), at(2023, 6, 1));
        let current: Vec<_> = nodes.iter().filter(|n| n.is_current).collect();
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].lord.code(), "Ju");
        let codes: Vec<&str> = path.lords().iter().map(|l| l.code()).collect();
        assert_eq!(codes, vec!["Ju", "Sa"]);
        assert_eq!(path.deepest().unwrap().level, DashaLevel::Antardasha);
    }

    #[test]
    fn path_nodes_carry_annotated_children() {
        let (_, path) = locate_current(&mahadashas(), at(2023, 6, 1));
        let maha = &path.periods[0];
        let kids = maha.children().unwrap();
        assert!(kids[1].is_current);
        assert!(!kids[0].is_current);
    }

    #[test]
    fn path_stops_at_unloaded_level() {
        let (_, path) = locate_current(&mahadashas(), at(2040, 1, 1));
        assert_eq!(path.len(), 1);
        assert_eq!(path.deepest().unwrap().lord.code(), "Sa");
    }

    #[test]
    fn nothing_current_outside_range() {
        let (nodes, path) = locate_current(&mahadashas(), at(1950, 1, 1));
        assert!(nodes.iter().all(|n| !n.is_current));
        assert!(path.is_empty());
    }

    #[test]
    fn shared_boundary_goes_to_first_match() {
        let boundary = Utc.with_ymd_and_hms(1986, 1, 1, 0, 0, 0).unwrap();
        let (nodes, _) = locate_current(&mahadashas(), boundary);
        assert!(nodes[0].is_current);
        assert!(!nodes[1].is_current);
    }

    #[test]
    fn relocating_clears_stale_flags() {
        let (first, _) = locate_current(&mahadashas(), at(2023, 6, 1));
        let (second, _) = locate_current(&first, at(1990, 6, 1));
        assert!(second[1].is_current);
        assert!(!second[4].is_current);
        assert!(second[4].children().unwrap().iter().all(|n| !n.is_current));
    }
}
