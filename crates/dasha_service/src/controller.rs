//! Lazy expansion controller.
//!
//! Holds one drill-down session: the loaded timeline, the path of selected
//! nodes, and at most one authoritative request. Every request gets a
//! sequence number; a response is applied only if its number is the latest
//! one issued, so the last request wins regardless of arrival order.
//!
//! The controller does no I/O. Callers take the [`Ticket`] it hands out,
//! perform the fetch, and feed the outcome back through
//! [`ExpansionController::resolve`].

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use dasha_base::dasha::{
    DashaLevel, DashaLord, DashaNode, DashaSystem, NodeId, Timeline,
    TimelineOptions, normalize_response, path_to,
};
use dasha_base::{DashaError, MalformedPeriodError};

use crate::error::{ServiceError, ServiceResult};
use crate::request::DashaRequest;

/// Where the session stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpansionState {
    /// Nothing requested yet.
    Idle,
    /// A request is in flight.
    Loading,
    /// The last authoritative request was applied.
    Loaded,
    /// The last authoritative request failed; the previous view is kept.
    Failed(String),
}

/// A request the caller should send, tagged with its sequence number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub seq: u64,
    pub request: DashaRequest,
}

/// Non-fatal conditions from the last applied response.
#[derive(Debug, Clone, PartialEq)]
pub enum ExpansionWarning {
    /// The fetch succeeded but held no usable periods.
    EmptyResult {
        level: DashaLevel,
        parent: Option<NodeId>,
    },
    /// Some records were dropped during normalization.
    DroppedRecords(Vec<MalformedPeriodError>),
}

/// What [`ExpansionController::resolve`] did with a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A newer request superseded this one; nothing changed.
    Stale,
    /// New periods are now in view.
    Applied { periods: usize },
    /// Success without periods; see [`ExpansionController::last_warning`].
    Empty,
    /// The request failed; the previous view is retained.
    Failed,
}

/// One breadcrumb of the drill-down path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breadcrumb {
    /// Depth to pass to [`ExpansionController::navigate_to`].
    pub depth: usize,
    pub label: String,
    /// `None` for the root crumb.
    pub id: Option<NodeId>,
}

#[derive(Debug, Clone, PartialEq)]
enum Intent {
    /// Replace the whole timeline and return to the root view.
    Root,
    /// Load children of `parent`, then show them with `path` as the new path.
    Children { parent: NodeId, path: Vec<NodeId> },
}

#[derive(Debug, Clone, PartialEq)]
struct Pending {
    seq: u64,
    request: DashaRequest,
    intent: Intent,
}

/// Drill-down session over one subject and system.
#[derive(Debug, Clone)]
pub struct ExpansionController {
    subject_id: String,
    options: TimelineOptions,
    timeline: Option<Timeline>,
    path: Vec<NodeId>,
    state: ExpansionState,
    last_seq: u64,
    pending: Option<Pending>,
    failed: Option<Pending>,
    last_warning: Option<ExpansionWarning>,
}

impl ExpansionController {
    pub fn new(subject_id: impl Into<String>, options: TimelineOptions) -> Self {
        Self {
            subject_id: subject_id.into(),
            options,
            timeline: None,
            path: Vec::new(),
            state: ExpansionState::Idle,
            last_seq: 0,
            pending: None,
            failed: None,
            last_warning: None,
        }
    }

    pub fn for_system(subject_id: impl Into<String>, system: DashaSystem) -> Self {
        Self::new(subject_id, TimelineOptions::for_system(system))
    }

    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    pub fn system(&self) -> DashaSystem {
        self.options.system()
    }

    pub fn state(&self) -> &ExpansionState {
        &self.state
    }

    pub fn is_loading(&self) -> bool {
        self.state == ExpansionState::Loading
    }

    pub fn timeline(&self) -> Option<&Timeline> {
        self.timeline.as_ref()
    }

    /// Top-level periods, empty before the root request lands.
    pub fn roots(&self) -> &[DashaNode] {
        self.timeline.as_ref().map_or(&[][..], |t| t.nodes.as_slice())
    }

    /// Selected nodes, outermost first.
    pub fn path(&self) -> Vec<&DashaNode> {
        match self.path.last() {
            Some(last) => path_to(self.roots(), last).unwrap_or_default(),
            None => Vec::new(),
        }
    }

    /// The period list currently shown: roots, or the loaded children of the
    /// deepest selected node.
    pub fn viewing(&self) -> &[DashaNode] {
        match self.path.last() {
            None => self.roots(),
            Some(last) => self
                .timeline
                .as_ref()
                .and_then(|t| t.find(last))
                .and_then(DashaNode::children)
                .unwrap_or(&[]),
        }
    }

    pub fn breadcrumbs(&self) -> Vec<Breadcrumb> {
        let root = Breadcrumb {
            depth: 0,
            label: self.system().name().to_string(),
            id: None,
        };
        std::iter::once(root)
            .chain(self.path().into_iter().enumerate().map(|(i, node)| Breadcrumb {
                depth: i + 1,
                label: format!("{} {}", node.lord, node.level),
                id: Some(node.id.clone()),
            }))
            .collect()
    }

    pub fn last_warning(&self) -> Option<&ExpansionWarning> {
        self.last_warning.as_ref()
    }

    /// Sequence number of the request that may still be applied.
    pub fn pending_seq(&self) -> Option<u64> {
        self.pending.as_ref().map(|p| p.seq)
    }

    /// Request the top-level list.
    pub fn start(&mut self) -> Ticket {
        let request = DashaRequest::root(self.subject_id.clone(), self.system());
        self.issue(request, Intent::Root)
    }

    /// Request the children of a node in the current view.
    ///
    /// Prana nodes are rejected before any request is issued and leave the
    /// controller untouched.
    #[instrument(skip(self), fields(node = %id))]
    pub fn drill_down(&mut self, id: &NodeId) -> ServiceResult<Ticket> {
        let node = self
            .viewing()
            .iter()
            .find(|n| n.id == *id)
            .ok_or_else(|| ServiceError::NotInView(id.clone()))?;
        if node.level.child_level().is_none() {
            debug!(level = %node.level, "drill-down below Prana ignored");
            return Err(DashaError::UnsupportedDepth(node.level).into());
        }

        let mut path = self.path.clone();
        path.push(node.id.clone());
        let parent = node.id.clone();
        let request = self.child_request(&path)?;
        Ok(self.issue(request, Intent::Children { parent, path }))
    }

    /// Jump back to breadcrumb `depth` (0 = root) and re-fetch that level.
    ///
    /// The path is truncated once the response is applied; a failure leaves
    /// the current view in place.
    #[instrument(skip(self))]
    pub fn navigate_to(&mut self, depth: usize) -> ServiceResult<Ticket> {
        if depth > self.path.len() {
            return Err(ServiceError::InvalidBreadcrumb {
                requested: depth,
                path_len: self.path.len(),
            });
        }
        if depth == 0 {
            return Ok(self.start());
        }
        let path = self.path[..depth].to_vec();
        let parent = path[depth - 1].clone();
        let request = self.child_request(&path)?;
        Ok(self.issue(request, Intent::Children { parent, path }))
    }

    /// Re-issue the request that failed last, under a new sequence number.
    pub fn retry(&mut self) -> Option<Ticket> {
        if !matches!(self.state, ExpansionState::Failed(_)) {
            return None;
        }
        let failed = self.failed.take()?;
        info!(level = %failed.request.level, "retrying failed request");
        Some(self.issue(failed.request, failed.intent))
    }

    /// Apply the outcome of the request numbered `seq`.
    #[instrument(skip(self, result, now))]
    pub fn resolve(
        &mut self,
        seq: u64,
        result: Result<Value, ServiceError>,
        now: DateTime<Utc>,
    ) -> Resolution {
        let Some(pending) = self.pending.take_if(|p| p.seq == seq) else {
            debug!(latest = self.last_seq, "discarding stale response");
            return Resolution::Stale;
        };

        let previous_warning = self.last_warning.take();
        match result.and_then(|body| self.apply(&pending, &body, now)) {
            Ok(resolution) => {
                self.state = ExpansionState::Loaded;
                self.failed = None;
                resolution
            }
            Err(err) => {
                warn!(error = %err, level = %pending.request.level, "dasha fetch failed");
                self.last_warning = previous_warning;
                self.state = ExpansionState::Failed(err.to_string());
                self.failed = Some(pending);
                Resolution::Failed
            }
        }
    }

    fn issue(&mut self, request: DashaRequest, intent: Intent) -> Ticket {
        self.last_seq += 1;
        let seq = self.last_seq;
        if let Some(old) = self.pending.replace(Pending {
            seq,
            request: request.clone(),
            intent,
        }) {
            debug!(superseded = old.seq, seq, "request superseded");
        }
        self.state = ExpansionState::Loading;
        Ticket { seq, request }
    }

    fn child_request(&self, path: &[NodeId]) -> ServiceResult<DashaRequest> {
        let lords = self.lords_for(path)?;
        Ok(DashaRequest::for_child(
            self.subject_id.clone(),
            self.system(),
            &lords,
        )?)
    }

    fn lords_for(&self, path: &[NodeId]) -> ServiceResult<Vec<DashaLord>> {
        let Some(last) = path.last() else {
            return Ok(Vec::new());
        };
        let nodes = path_to(self.roots(), last).ok_or_else(|| ServiceError::NotInView(last.clone()))?;
        Ok(nodes.into_iter().map(|n| n.lord.clone()).collect())
    }

    fn apply(
        &mut self,
        pending: &Pending,
        body: &Value,
        now: DateTime<Utc>,
    ) -> ServiceResult<Resolution> {
        match &pending.intent {
            Intent::Root => {
                let normalized = normalize_response(body, None, DashaLevel::Mahadasha)?;
                let count = normalized.nodes.len();
                self.note_dropped(&normalized.errors);
                if count == 0 && !self.roots().is_empty() {
                    warn!("empty root response; keeping the loaded timeline");
                } else {
                    let timeline = Timeline::from_normalized(normalized, &self.options, now);
                    self.timeline = Some(timeline);
                    self.path.clear();
                }
                Ok(self.outcome(count, DashaLevel::Mahadasha, None))
            }
            Intent::Children { parent, path } => {
                let timeline = self
                    .timeline
                    .as_ref()
                    .ok_or_else(|| ServiceError::NotInView(parent.clone()))?;
                let parent_node = timeline
                    .find(parent)
                    .ok_or_else(|| ServiceError::NotInView(parent.clone()))?;
                let level = parent_node
                    .level
                    .child_level()
                    .ok_or(DashaError::UnsupportedDepth(parent_node.level))?;

                let normalized = normalize_response(body, Some(parent), level)?;
                let count = normalized.nodes.len();
                let dropped = normalized.errors.clone();
                // an empty re-fetch never replaces periods already on screen
                let keep_loaded =
                    count == 0 && parent_node.children().is_some_and(|kids| !kids.is_empty());
                if keep_loaded {
                    warn!(%parent, "empty re-fetch; keeping loaded periods");
                } else {
                    let updated = timeline
                        .attach_normalized(parent, normalized, now)
                        .ok_or_else(|| ServiceError::NotInView(parent.clone()))?;
                    self.timeline = Some(updated);
                }
                self.note_dropped(&dropped);

                if count > 0 {
                    self.path = path.clone();
                }
                Ok(self.outcome(count, level, Some(parent.clone())))
            }
        }
    }

    fn outcome(&mut self, count: usize, level: DashaLevel, parent: Option<NodeId>) -> Resolution {
        if count == 0 {
            info!(%level, "service returned no periods");
            self.last_warning = Some(ExpansionWarning::EmptyResult { level, parent });
            return Resolution::Empty;
        }
        Resolution::Applied { periods: count }
    }

    fn note_dropped(&mut self, errors: &[MalformedPeriodError]) {
        if !errors.is_empty() {
            warn!(dropped = errors.len(), "records dropped from service response");
            self.last_warning = Some(ExpansionWarning::DroppedRecords(errors.to_vec()));
        }
    }
}
