//! Cycle grouping and stop-at-planet truncation for repeating systems.

use std::collections::BTreeMap;

use tracing::debug;

use crate::graha::Graha;

use super::types::DashaNode;

/// Stop emitting top-level periods before the Nth occurrence of a planet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StopAtPlanet {
    pub graha: Graha,
    /// 1-based occurrence that is cut (it and everything after it).
    pub occurrence: u32,
}

impl StopAtPlanet {
    pub const fn new(graha: Graha, occurrence: u32) -> Self {
        Self { graha, occurrence }
    }

    /// Index of the first node to discard, if the stop planet recurs often enough.
    pub fn cut_index(&self, nodes: &[DashaNode]) -> Option<usize> {
        let wanted = self.occurrence.max(1) as usize;
        nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.lord.graha() == Some(self.graha))
            .nth(wanted - 1)
            .map(|(i, _)| i)
    }
}

/// Drop the stop planet's Nth occurrence and everything after it.
pub fn truncate_at_planet(mut nodes: Vec<DashaNode>, stop: StopAtPlanet) -> Vec<DashaNode> {
    if let Some(cut) = stop.cut_index(&nodes) {
        debug!(
            graha = %stop.graha,
            occurrence = stop.occurrence,
            kept = cut,
            dropped = nodes.len() - cut,
            "truncating period list"
        );
        nodes.truncate(cut);
    }
    nodes
}

/// Cycle number for every node, in input order.
///
/// Explicit backend numbers are used when every node carries one; otherwise
/// all are inferred as `index / periods_per_cycle + 1`. A zero
/// `periods_per_cycle` puts everything in cycle 1.
pub fn assign_cycles(nodes: &[DashaNode], periods_per_cycle: usize) -> Vec<u32> {
    let explicit: Option<Vec<u32>> = nodes.iter().map(|n| n.cycle_number).collect();
    match explicit {
        Some(numbers) if !numbers.is_empty() => numbers,
        _ => (0..nodes.len())
            .map(|i| match periods_per_cycle {
                0 => 1,
                ppc => (i / ppc) as u32 + 1,
            })
            .collect(),
    }
}

/// One bucket of a cyclic timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Cycle {
    pub number: u32,
    pub nodes: Vec<DashaNode>,
}

/// Top-level periods partitioned into cycles.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CycleGroups {
    /// Buckets in ascending cycle order; node order within a bucket follows input.
    pub cycles: Vec<Cycle>,
    /// Cycle holding the current node, else the first cycle.
    pub active: Option<u32>,
}

impl CycleGroups {
    /// Available cycle numbers, ascending.
    pub fn cycle_numbers(&self) -> Vec<u32> {
        self.cycles.iter().map(|c| c.number).collect()
    }

    pub fn active_cycle(&self) -> Option<&Cycle> {
        self.active.and_then(|n| self.cycle(n))
    }

    pub fn cycle(&self, number: u32) -> Option<&Cycle> {
        self.cycles.iter().find(|c| c.number == number)
    }

    pub fn len(&self) -> usize {
        self.cycles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cycles.is_empty()
    }
}

/// Partition top-level nodes into cycles, stamping each node's `cycle_number`.
pub fn group_cycles(nodes: &[DashaNode], periods_per_cycle: usize) -> CycleGroups {
    let numbers = assign_cycles(nodes, periods_per_cycle);
    let mut buckets: BTreeMap<u32, Vec<DashaNode>> = BTreeMap::new();
    for (node, number) in nodes.iter().zip(numbers) {
        buckets.entry(number).or_default().push(DashaNode {
            cycle_number: Some(number),
            ..node.clone()
        });
    }

    let cycles: Vec<Cycle> = buckets
        .into_iter()
        .map(|(number, nodes)| Cycle { number, nodes })
        .collect();
    let active = cycles
        .iter()
        .find(|c| c.nodes.iter().any(|n| n.is_current))
        .or_else(|| cycles.first())
        .map(|c| c.number);

    CycleGroups { cycles, active }
}
