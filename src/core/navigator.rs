//! # Navigator
//!
//! Turns "the user selected node N" into a new set of child nodes and/or
//! primary content while several expanders race to answer.
//!
//! ```text
//! expand(node)
//!   │
//!   ├─ publish PreNavigate(node.id)
//!   ├─ applies_to() on every expander ── spawn one task per match
//!   ├─ wait for N results against one shared deadline
//!   │     error      → failure status, keep waiting
//!   │     nodes      → concatenate in arrival order
//!   │     content    → accept once, a second one is an invariant violation
//!   ├─ check ID uniqueness
//!   └─ commit: push previous Page, replace view, publish Navigated
//! ```
//!
//! Every navigation-mutating operation holds `op_lock` (which owns the
//! history) for its whole run, so concurrent calls queue instead of
//! interleaving. The visible view sits behind a separate short-lived lock
//! so the display can snapshot it while an expansion is in flight.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::{Instant, timeout_at};

use crate::core::bus::{BusEvent, EventBus, GO_BACK_ID, NavigatedEvent};
use crate::core::expander::{Expander, ExpanderError, ExpanderResult};
use crate::core::history::{History, Page};
use crate::core::node::{Content, TreeNode};
use crate::core::status::StatusEvent;

/// Deadline for one expansion in interactive use.
pub const DEFAULT_EXPAND_TIMEOUT: Duration = Duration::from_secs(45);
/// Deadline when running with `--debug`, where requests are slowed by tracing.
pub const DEBUG_EXPAND_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Debug)]
pub enum NavError {
    /// Two nodes in one displayed set share an ID. Invariant violation.
    DuplicateNodeId { id: String, parent_id: String },
    /// Two expanders both supplied primary content. Invariant violation.
    DuplicatePrimaryContent {
        node_id: String,
        first: String,
        second: String,
    },
    NothingSelected,
    /// The selected node has no producing expander to route an action to.
    NoExpander(String),
    Expander(ExpanderError),
}

impl NavError {
    /// Collaborator contract breaches that must stop the caller, not just be reported.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            NavError::DuplicateNodeId { .. } | NavError::DuplicatePrimaryContent { .. }
        )
    }
}

impl fmt::Display for NavError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NavError::DuplicateNodeId { id, parent_id } => {
                write!(f, "duplicate node ID '{id}' while expanding '{parent_id}'")
            }
            NavError::DuplicatePrimaryContent {
                node_id,
                first,
                second,
            } => write!(
                f,
                "expanders '{first}' and '{second}' both returned primary content for '{node_id}'"
            ),
            NavError::NothingSelected => write!(f, "no item selected"),
            NavError::NoExpander(id) => write!(f, "no expander recorded for '{id}'"),
            NavError::Expander(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for NavError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpandOutcome {
    Committed { node_count: usize, has_content: bool },
    /// Expanders ran but produced nothing. View unchanged.
    Empty,
    /// No expander applies to the node. View unchanged.
    NoExpanders,
    /// The deadline passed before every expander reported. View unchanged.
    TimedOut,
    /// An expander task died without reporting. Partial results are dropped
    /// and the view is unchanged.
    Interrupted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackOutcome {
    Restored,
    NoHistory,
}

/// What the display renders. Also the shape of a history [`Page`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct View {
    pub items: Vec<TreeNode>,
    pub content: Content,
    pub title: String,
    /// Index into [`View::visible_items`].
    pub selection: usize,
    pub filter: String,
    pub expanded_node: Option<TreeNode>,
}

impl View {
    pub fn visible_items(&self) -> Vec<&TreeNode> {
        self.items
            .iter()
            .filter(|n| n.matches_filter(&self.filter))
            .collect()
    }

    pub fn selected(&self) -> Option<&TreeNode> {
        self.visible_items().get(self.selection).copied()
    }

    fn to_page(&self) -> Page {
        Page {
            items: self.items.clone(),
            content: self.content.clone(),
            title: self.title.clone(),
            selection: self.selection,
            filter: self.filter.clone(),
            expanded_node: self.expanded_node.clone(),
        }
    }
}

impl From<Page> for View {
    fn from(page: Page) -> Self {
        Self {
            items: page.items,
            content: page.content,
            title: page.title,
            selection: page.selection,
            filter: page.filter,
            expanded_node: page.expanded_node,
        }
    }
}

fn clamp_selection(index: usize, count: usize) -> usize {
    index.min(count.saturating_sub(1))
}

pub struct Navigator {
    bus: EventBus,
    expanders: Vec<Arc<dyn Expander>>,
    expand_timeout: Duration,
    op_lock: tokio::sync::Mutex<History>,
    view: Mutex<View>,
}

impl Navigator {
    pub fn new(bus: EventBus, expanders: Vec<Arc<dyn Expander>>, expand_timeout: Duration) -> Self {
        info!(
            "Navigator created with {} expander(s), deadline {}s",
            expanders.len(),
            expand_timeout.as_secs()
        );
        Self {
            bus,
            expanders,
            expand_timeout,
            op_lock: tokio::sync::Mutex::new(History::new()),
            view: Mutex::new(View::default()),
        }
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn snapshot(&self) -> View {
        self.lock_view().clone()
    }

    pub async fn history_len(&self) -> usize {
        self.op_lock.lock().await.len()
    }

    /// Expands the top-level node without recording history.
    pub async fn load_root(&self, root: TreeNode) -> Result<ExpandOutcome, NavError> {
        let mut history = self.op_lock.lock().await;
        self.run_expansion(&mut history, root, false).await
    }

    pub async fn expand(&self, node: TreeNode) -> Result<ExpandOutcome, NavError> {
        let mut history = self.op_lock.lock().await;
        self.run_expansion(&mut history, node, true).await
    }

    pub async fn expand_current_selection(&self) -> Result<ExpandOutcome, NavError> {
        let mut history = self.op_lock.lock().await;
        let node = self.selected_node().ok_or(NavError::NothingSelected)?;
        self.run_expansion(&mut history, node, true).await
    }

    pub async fn go_back(&self) -> BackOutcome {
        let mut history = self.op_lock.lock().await;
        self.go_back_locked(&mut history)
    }

    /// Redoes the last expansion: back, expand the same selection again,
    /// then restore the cursor (clamped to the new item count).
    /// With no history the root load is redone instead.
    pub async fn refresh(&self) -> Result<ExpandOutcome, NavError> {
        let mut history = self.op_lock.lock().await;
        let remembered = self.lock_view().selection;

        let outcome = if history.is_empty() {
            let Some(root) = self.lock_view().expanded_node.clone() else {
                debug!("Refresh with nothing loaded, ignoring");
                return Ok(ExpandOutcome::Empty);
            };
            self.run_expansion(&mut history, root, false).await?
        } else {
            self.go_back_locked(&mut history);
            let node = self.selected_node().ok_or(NavError::NothingSelected)?;
            self.run_expansion(&mut history, node, true).await?
        };

        if matches!(outcome, ExpandOutcome::Committed { .. }) {
            let mut view = self.lock_view();
            let count = view.visible_items().len();
            view.selection = clamp_selection(remembered, count);
        }
        Ok(outcome)
    }

    pub fn change_selection(&self, index: usize) {
        let mut view = self.lock_view();
        let count = view.visible_items().len();
        view.selection = clamp_selection(index, count);
    }

    /// Narrows the visible items. Resets the cursor to the first match.
    pub fn set_filter(&self, filter: &str) {
        let mut view = self.lock_view();
        view.filter = filter.to_string();
        view.selection = 0;
    }

    /// Routes a delete of the selected node to the expander that produced it.
    pub async fn delete_selected(&self) -> Result<(), NavError> {
        let node = self.selected_node().ok_or(NavError::NothingSelected)?;
        self.delete(node).await
    }

    /// Deletes `node` through its producing expander, whatever is selected now.
    pub async fn delete(&self, node: TreeNode) -> Result<(), NavError> {
        let expander = node
            .expander
            .clone()
            .ok_or_else(|| NavError::NoExpander(node.id.clone()))?;

        info!("Deleting {} via {}", node.id, expander.name());
        let status = self
            .bus
            .send_status(StatusEvent::in_progress(format!("Deleting {}", node.display)).toast());
        match expander.delete(&node).await {
            Ok(()) => {
                status.done();
                Ok(())
            }
            Err(e) => {
                warn!("Delete of {} failed: {}", node.id, e);
                status.fail(format!("Delete {} failed: {}", node.display, e));
                Err(NavError::Expander(e))
            }
        }
    }

    fn lock_view(&self) -> MutexGuard<'_, View> {
        self.view.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn selected_node(&self) -> Option<TreeNode> {
        self.lock_view().selected().cloned()
    }

    fn publish_navigated(&self, event: NavigatedEvent) {
        self.bus.publish(BusEvent::Navigated(event));
    }

    fn go_back_locked(&self, history: &mut History) -> BackOutcome {
        self.bus.publish(BusEvent::PreNavigate(GO_BACK_ID.to_string()));

        let Some(page) = history.pop() else {
            debug!("Back requested with empty history");
            self.publish_navigated(NavigatedEvent::failure(true, None));
            return BackOutcome::NoHistory;
        };

        let nodes = page.items.clone();
        let parent_id = page.expanded_node.as_ref().map(|n| n.id.clone());
        *self.lock_view() = View::from(page);
        debug!("Restored page, {} item(s), history depth {}", nodes.len(), history.len());

        self.publish_navigated(NavigatedEvent {
            success: true,
            is_back: true,
            parent_id,
            nodes,
        });
        BackOutcome::Restored
    }

    async fn run_expansion(
        &self,
        history: &mut History,
        node: TreeNode,
        record_history: bool,
    ) -> Result<ExpandOutcome, NavError> {
        self.bus.publish(BusEvent::PreNavigate(node.id.clone()));

        let applicable: Vec<Arc<dyn Expander>> = self
            .expanders
            .iter()
            .filter(|e| e.applies_to(&node))
            .cloned()
            .collect();
        if applicable.is_empty() {
            info!("No expander applies to {}", node.id);
            self.publish_navigated(NavigatedEvent::failure(false, Some(node.id.clone())));
            return Ok(ExpandOutcome::NoExpanders);
        }

        debug!(
            "Expanding {} with {:?}",
            node.id,
            applicable.iter().map(|e| e.name()).collect::<Vec<_>>()
        );
        let status = self.bus.send_status(
            StatusEvent::in_progress(format!("Expanding {}", node.display))
                .with_timeout(self.expand_timeout)
                .toast(),
        );

        let expected = applicable.len();
        let (tx, mut rx) = mpsc::channel::<ExpanderResult>(expected);
        let mut tasks = JoinSet::new();
        for expander in applicable {
            let tx = tx.clone();
            let node = node.clone();
            tasks.spawn(async move {
                let outcome = expander.expand(&node).await;
                // The receiver is gone once the deadline has passed; late results are discarded.
                let _ = tx.send(ExpanderResult { expander, outcome }).await;
            });
        }
        drop(tx);

        let deadline = Instant::now() + self.expand_timeout;
        let mut nodes: Vec<TreeNode> = Vec::new();
        let mut content: Option<(String, Content)> = None;

        for _ in 0..expected {
            let result = match timeout_at(deadline, rx.recv()).await {
                Ok(Some(result)) => result,
                Ok(None) => {
                    tasks.abort_all();
                    warn!("Expander task for {} ended without reporting", node.id);
                    status.fail(format!("An expander for {} stopped unexpectedly", node.display));
                    self.publish_navigated(NavigatedEvent::failure(false, Some(node.id.clone())));
                    return Ok(ExpandOutcome::Interrupted);
                }
                Err(_) => {
                    tasks.abort_all();
                    warn!(
                        "Expansion of {} timed out after {}s",
                        node.id,
                        self.expand_timeout.as_secs()
                    );
                    status.fail(format!(
                        "Timed out expanding {} after {}s",
                        node.display,
                        self.expand_timeout.as_secs()
                    ));
                    self.publish_navigated(NavigatedEvent::failure(false, Some(node.id.clone())));
                    return Ok(ExpandOutcome::TimedOut);
                }
            };

            let source = result.source().to_string();
            match result.outcome {
                Err(e) => {
                    warn!("Expander {} failed on {}: {}", source, node.id, e);
                    self.bus
                        .send_failure(format!("{source}: failed to expand {}: {e}", node.display));
                }
                Ok(expansion) => {
                    if let Some(new_content) = expansion.content {
                        if let Some((first, _)) = &content {
                            tasks.abort_all();
                            let err = NavError::DuplicatePrimaryContent {
                                node_id: node.id.clone(),
                                first: first.clone(),
                                second: source,
                            };
                            error!("Invariant violation: {}", err);
                            status.fail(err.to_string());
                            self.publish_navigated(NavigatedEvent::failure(false, Some(node.id.clone())));
                            return Err(err);
                        }
                        content = Some((source.clone(), new_content));
                    }
                    debug!("{} returned {} node(s) for {}", source, expansion.nodes.len(), node.id);
                    nodes.extend(expansion.nodes.into_iter().map(|mut child| {
                        if child.expander.is_none() {
                            child.expander = Some(result.expander.clone());
                        }
                        if child.parent_id.is_none() {
                            child.parent_id = Some(node.id.clone());
                        }
                        child
                    }));
                }
            }
        }

        if let Err(err) = check_unique_ids(&node, &nodes) {
            error!("Invariant violation: {}", err);
            status.fail(err.to_string());
            self.publish_navigated(NavigatedEvent::failure(false, Some(node.id.clone())));
            return Err(err);
        }

        if nodes.is_empty() && content.is_none() {
            info!("Expansion of {} produced nothing", node.id);
            status.done();
            self.publish_navigated(NavigatedEvent::failure(false, Some(node.id.clone())));
            return Ok(ExpandOutcome::Empty);
        }

        let node_count = nodes.len();
        let has_content = content.is_some();
        {
            let mut view = self.lock_view();
            if record_history {
                history.push(view.to_page());
            }
            // Content-only expansions keep the current list on screen.
            if !nodes.is_empty() {
                view.items = nodes.clone();
                view.selection = 0;
                view.filter.clear();
            }
            view.content = content.map(|(_, c)| c).unwrap_or_default();
            view.title = node.display.clone();
            view.expanded_node = Some(node.clone());
        }
        info!(
            "Committed expansion of {}: {} node(s), content: {}",
            node.id, node_count, has_content
        );
        status.done();

        self.publish_navigated(NavigatedEvent {
            success: true,
            is_back: false,
            parent_id: Some(node.id.clone()),
            nodes,
        });
        Ok(ExpandOutcome::Committed {
            node_count,
            has_content,
        })
    }
}

fn check_unique_ids(parent: &TreeNode, nodes: &[TreeNode]) -> Result<(), NavError> {
    let mut seen = HashSet::with_capacity(nodes.len());
    for child in nodes {
        if child.id == parent.id || !seen.insert(child.id.as_str()) {
            return Err(NavError::DuplicateNodeId {
                id: child.id.clone(),
                parent_id: parent.id.clone(),
            });
        }
    }
    Ok(())
}
