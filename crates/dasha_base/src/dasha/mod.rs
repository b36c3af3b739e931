//! Dasha (planetary period) hierarchy engine.
//!
//! Turns heterogeneous backend period payloads into one canonical tree,
//! then annotates it: current periods, balance-at-birth periods, and cycle
//! buckets for systems whose sequence repeats.

pub mod balance;
pub mod cycle;
pub mod date;
pub mod duration;
pub mod fields;
pub mod locate;
pub mod normalize;
pub mod system;
pub mod timeline;
pub mod tree;
pub mod types;

pub use balance::{BalancePolicy, detect_balance, explicit_balance_flag};
pub use cycle::{
    Cycle, CycleGroups, StopAtPlanet, assign_cycles, group_cycles, truncate_at_planet,
};
pub use duration::{DurationInput, DurationParts, duration_parts, format_duration};
pub use locate::{ActivePath, find_active, locate_current};
pub use normalize::{
    Normalized, find_period_list, normalize_children, normalize_period, normalize_periods,
    normalize_response,
};
pub use system::{ALL_DASHA_SYSTEMS, DashaSystem, SystemProfile};
pub use timeline::{Timeline, TimelineOptions, build_timeline};
pub use tree::{ContiguityGap, audit_contiguity, check_contiguity, find_node, path_to, with_children};
pub use types::{
    ALL_DASHA_LEVELS, DAYS_PER_YEAR, DashaLevel, DashaLord, DashaNode, MAX_DASHA_LEVEL, NodeId,
};
