//! Full timeline pipeline for one system.
//!
//! normalize -> truncate -> balance -> cycles -> locate -> group

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::error::{DashaError, MalformedPeriodError};

use super::balance::{BalancePolicy, detect_balance};
use super::cycle::{CycleGroups, StopAtPlanet, assign_cycles, group_cycles, truncate_at_planet};
use super::duration::{DurationInput, format_duration};
use super::locate::{ActivePath, locate_current};
use super::normalize::{Normalized, normalize_response};
use super::system::{DashaSystem, SystemProfile};
use super::tree::{ContiguityGap, audit_contiguity, find_node, with_children};
use super::types::{DashaLevel, DashaNode, NodeId};

/// Engine knobs for one timeline; always passed explicitly.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineOptions {
    pub profile: SystemProfile,
    pub balance_policy: BalancePolicy,
    pub stop_at: Option<StopAtPlanet>,
}

impl TimelineOptions {
    /// Defaults taken from the system's profile.
    pub fn for_system(system: DashaSystem) -> Self {
        let profile = system.profile();
        Self {
            balance_policy: profile.balance_policy,
            stop_at: profile.stop_at,
            profile,
        }
    }

    pub fn with_balance_policy(mut self, policy: BalancePolicy) -> Self {
        self.balance_policy = policy;
        self
    }

    pub fn with_stop_at(mut self, stop_at: Option<StopAtPlanet>) -> Self {
        self.stop_at = stop_at;
        self
    }

    pub fn system(&self) -> DashaSystem {
        self.profile.system
    }
}

/// An annotated top-level timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Timeline {
    pub options: TimelineOptions,
    /// Top-level periods with every loaded subtree annotated.
    pub nodes: Vec<DashaNode>,
    /// Records dropped during normalization.
    pub errors: Vec<MalformedPeriodError>,
    pub active: ActivePath,
    /// Present for cyclic systems and for payloads with explicit cycle numbers.
    pub cycles: Option<CycleGroups>,
    pub gaps: Vec<ContiguityGap>,
    /// Number of top-level periods removed by the stop-at rule.
    pub truncated: usize,
}

/// Build an annotated timeline from a root-level service payload.
#[instrument(skip(payload, options), fields(system = %options.system()))]
pub fn build_timeline(
    payload: &Value,
    options: &TimelineOptions,
    now: DateTime<Utc>,
) -> Result<Timeline, DashaError> {
    let normalized = normalize_response(payload, None, DashaLevel::Mahadasha)?;
    Ok(Timeline::from_normalized(normalized, options, now))
}

impl Timeline {
    /// Annotate already-normalized top-level periods.
    pub fn from_normalized(
        normalized: Normalized,
        options: &TimelineOptions,
        now: DateTime<Utc>,
    ) -> Timeline {
        let total = normalized.nodes.len();
        let nodes = match options.stop_at {
            Some(stop) => truncate_at_planet(normalized.nodes, stop),
            None => normalized.nodes,
        };
        let truncated = total - nodes.len();

        let mut nodes = detect_balance(&nodes, options.balance_policy, true);

        let explicit_cycles = !nodes.is_empty() && nodes.iter().all(|n| n.cycle_number.is_some());
        let grouped = options.profile.is_cyclic() || explicit_cycles;
        if grouped {
            let numbers = assign_cycles(&nodes, options.profile.periods_per_cycle());
            for (node, number) in nodes.iter_mut().zip(numbers) {
                node.cycle_number = Some(number);
            }
        }

        let (nodes, active) = locate_current(&nodes, now);
        let cycles = grouped.then(|| group_cycles(&nodes, options.profile.periods_per_cycle()));
        let gaps = audit_contiguity(&nodes);

        debug!(
            periods = nodes.len(),
            dropped = normalized.errors.len(),
            truncated,
            cycles = cycles.as_ref().map_or(0, CycleGroups::len),
            active_depth = active.len(),
            "timeline built"
        );

        Timeline {
            options: options.clone(),
            nodes,
            errors: normalized.errors,
            active,
            cycles,
            gaps,
            truncated,
        }
    }

    pub fn system(&self) -> DashaSystem {
        self.options.system()
    }

    pub fn find(&self, id: &NodeId) -> Option<&DashaNode> {
        find_node(&self.nodes, id)
    }

    /// Formatted duration for a node of this timeline.
    pub fn duration_of(&self, node: &DashaNode) -> String {
        format_duration(&DurationInput::from_node(node, Some(&self.options.profile)))
    }

    /// New timeline with `children` attached under `target` and re-annotated.
    ///
    /// Children are balance-checked against their parent and current-period
    /// flags are recomputed for `now`. Returns `None` if `target` is unknown.
    pub fn attach(
        &self,
        target: &NodeId,
        children: Vec<DashaNode>,
        now: DateTime<Utc>,
    ) -> Option<Timeline> {
        let parent = self.find(target)?;
        let children = detect_balance(&children, self.options.balance_policy, parent.is_balance);
        let nodes = with_children(&self.nodes, target, children)?;
        let (nodes, active) = locate_current(&nodes, now);
        let cycles = self
            .cycles
            .as_ref()
            .map(|_| group_cycles(&nodes, self.options.profile.periods_per_cycle()));
        let gaps = audit_contiguity(&nodes);
        Some(Timeline {
            options: self.options.clone(),
            nodes,
            errors: self.errors.clone(),
            active,
            cycles,
            gaps,
            truncated: self.truncated,
        })
    }

    /// [`Timeline::attach`] for a normalized child response.
    ///
    /// Records dropped from the response join [`Timeline::errors`].
    pub fn attach_normalized(
        &self,
        target: &NodeId,
        normalized: Normalized,
        now: DateTime<Utc>,
    ) -> Option<Timeline> {
        let Normalized { nodes, errors } = normalized;
        let mut next = self.attach(target, nodes, now)?;
        next.errors.extend(errors);
        Some(next)
    }

    /// Recompute current-period flags for another instant.
    pub fn relocate(&self, now: DateTime<Utc>) -> Timeline {
        let (nodes, active) = locate_current(&self.nodes, now);
        let cycles = self
            .cycles
            .as_ref()
            .map(|_| group_cycles(&nodes, self.options.profile.periods_per_cycle()));
        Timeline {
            nodes,
            active,
            cycles,
            ..self.clone()
        }
    }
}
