//! Tree Synchronizer
//!
//! [`TreeView`] owns one root object, resolves its composition asynchronously,
//! keeps one [`TreeNode`] per resolved child and re-resolves whenever the root
//! reports a mutation. Selection is tracked alongside and re-applied after
//! every reconciliation.
//!
//! # Ordering
//!
//! Every resolution is tagged with the root identity and a sequence number at
//! initiation. A completion is applied only if the root identity still matches
//! and its sequence number is above the floor: the highest sequence number
//! already applied, raised to the latest issued number whenever the root is
//! replaced. Failed resolutions leave the rendered nodes untouched.
//!
//! # Locking
//!
//! Collaborator callbacks (mutation listeners, gesture services) must not call
//! back into the view synchronously from `listen` or `attach_gestures`.
//! Locks are only ever taken parent view first, then nested views.

use crate::capability::{CapabilityKind, CapabilityOutput, ChildrenFuture, MutationCallback, Unlisten};
use crate::config::TreeSettings;
use crate::element::Element;
use crate::error::{ResolutionError, TreeError};
use crate::gesture::GestureService;
use crate::node::{NodeRenderer, TreeNode};
use crate::object::{DomainObject, ObjectId};
use crate::runtime::{current_runtime, Spawn};
use crate::selection::{SelectionTracker, Unobserve};
use futures::future::{self, BoxFuture};
use futures::FutureExt;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

pub const TREE_CLASS: &str = "tree";

/// Root-object lifecycle of a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootState {
    NoRoot,
    Leaf,
    Composite,
}

#[derive(Clone)]
pub struct TreeView {
    shared: Arc<Shared>,
}

struct Shared {
    renderer: NodeRenderer,
    /// Identities above this view's root, outermost first; empty at top level.
    base: Vec<ObjectId>,
    state: Mutex<TreeState>,
    selection: SelectionTracker,
    in_flight: watch::Sender<usize>,
}

#[derive(Default)]
struct TreeState {
    root: Option<DomainObject>,
    listener: Option<Unlisten>,
    nodes: Vec<TreeNode>,
    next_seq: u64,
    floor_seq: u64,
}

impl TreeView {
    pub fn new(gestures: Arc<dyn GestureService>, spawner: Arc<dyn Spawn>) -> Self {
        Self::with_settings(TreeSettings::default(), gestures, spawner)
    }

    pub fn with_settings(
        settings: TreeSettings,
        gestures: Arc<dyn GestureService>,
        spawner: Arc<dyn Spawn>,
    ) -> Self {
        Self::from_renderer(
            NodeRenderer::new(Arc::new(settings), gestures, spawner),
            Vec::new(),
        )
    }

    /// View driven by the Tokio runtime the caller is running on.
    pub fn on_current_runtime(
        settings: TreeSettings,
        gestures: Arc<dyn GestureService>,
    ) -> Result<Self, TreeError> {
        Ok(Self::with_settings(settings, gestures, current_runtime()?))
    }

    /// View nested below the identities in `base`.
    pub(crate) fn from_renderer(renderer: NodeRenderer, base: Vec<ObjectId>) -> Self {
        let (in_flight, _) = watch::channel(0usize);
        Self {
            shared: Arc::new(Shared {
                renderer,
                base,
                state: Mutex::new(TreeState::default()),
                selection: SelectionTracker::new(),
                in_flight,
            }),
        }
    }

    pub fn settings(&self) -> &TreeSettings {
        self.shared.renderer.settings()
    }

    /// Replace the root object, or clear it with `None`.
    ///
    /// The previous mutation subscription and all previous nodes are disposed
    /// before anything about the new root is established.
    pub fn set_root(&self, root: Option<DomainObject>) {
        let (previous_listener, previous_nodes) = {
            let mut state = self.shared.state.lock();
            state.root = None;
            state.floor_seq = state.next_seq;
            (state.listener.take(), std::mem::take(&mut state.nodes))
        };
        if let Some(listener) = previous_listener {
            listener.unlisten();
        }
        drop(previous_nodes);

        let Some(root) = root else {
            info!("Tree root cleared");
            return;
        };
        let root_id = root.id().clone();

        if root.composition().is_none() {
            self.shared.state.lock().root = Some(root);
            info!(root = %root_id, "Tree root set (leaf)");
            return;
        }

        // Subscribe before resolving so no change between the two is missed.
        let listener = root
            .mutation()
            .map(|mutation| mutation.listen(self.mutation_callback(root_id.clone())));
        {
            let mut state = self.shared.state.lock();
            state.root = Some(root);
            state.listener = listener;
        }
        info!(root = %root_id, "Tree root set (composite)");
        self.refresh();
    }

    pub fn clear(&self) {
        self.set_root(None);
    }

    pub fn root(&self) -> Option<DomainObject> {
        self.shared.state.lock().root.clone()
    }

    pub fn root_state(&self) -> RootState {
        match &self.shared.state.lock().root {
            None => RootState::NoRoot,
            Some(root) if root.composition().is_some() => RootState::Composite,
            Some(_) => RootState::Leaf,
        }
    }

    /// Whether a mutation subscription is currently held for the root.
    pub fn is_listening(&self) -> bool {
        self.shared.state.lock().listener.is_some()
    }

    /// Snapshot of the root-level container: a `ul.tree` with one item per node.
    pub fn elements(&self) -> Element {
        let state = self.shared.state.lock();
        let mut container = Element::new("ul").with_class(TREE_CLASS);
        for node in &state.nodes {
            container.push_child(node.element());
        }
        container
    }

    /// Identities of the rendered root-level nodes, in order.
    pub fn node_ids(&self) -> Vec<ObjectId> {
        self.shared.state.lock().nodes.iter().map(TreeNode::id).collect()
    }

    /// Select `value` (or clear with `None`) and notify every observer.
    pub fn set_value(&self, value: Option<DomainObject>) {
        self.apply_selection(value.clone());
        self.shared.selection.notify(value.as_ref());
    }

    pub fn value(&self) -> Option<DomainObject> {
        self.shared.selection.value()
    }

    pub fn observe(
        &self,
        callback: impl Fn(Option<&DomainObject>) + Send + Sync + 'static,
    ) -> Unobserve {
        self.shared.selection.observe(Arc::new(callback))
    }

    /// Expand or collapse the node bound to `id`, searching nested views too.
    ///
    /// Returns `false` when no such node exists or it cannot expand.
    pub fn set_expanded(&self, id: &ObjectId, expanded: bool) -> bool {
        let selection = self.shared.selection.value();
        let subtrees = {
            let mut state = self.shared.state.lock();
            let lineage = self.lineage(&state);
            if let Some(node) = state.nodes.iter_mut().find(|n| &n.id() == id) {
                let changed = node.set_expanded(expanded, &self.shared.renderer, &lineage);
                if changed && expanded {
                    if let Some(subtree) = node.subtree() {
                        subtree.apply_selection(selection);
                    }
                }
                debug!(node = %id, expanded, changed, "Expansion requested");
                return changed;
            }
            collect_subtrees(&state.nodes)
        };
        subtrees.iter().any(|subtree| subtree.set_expanded(id, expanded))
    }

    /// Completes once no resolution is in flight here or in any nested view.
    ///
    /// Never completes while a composition stalls.
    pub fn settled(&self) -> BoxFuture<'_, ()> {
        async move {
            let mut pending = self.shared.in_flight.subscribe();
            if pending.wait_for(|count| *count == 0).await.is_err() {
                return;
            }
            let subtrees = collect_subtrees(&self.shared.state.lock().nodes);
            for subtree in &subtrees {
                subtree.settled().await;
            }
        }
        .boxed()
    }

    /// Record `value` and mark nodes without notifying observers.
    pub(crate) fn apply_selection(&self, value: Option<DomainObject>) {
        self.shared.selection.record(value.clone());
        let mut state = self.shared.state.lock();
        let lineage = self.lineage(&state);
        mark_selection(
            &mut state.nodes,
            value.as_ref(),
            &self.shared.renderer,
            &lineage,
            ExpandScope::All,
        );
    }

    /// Move to a newer instance of the current root identity, keeping nodes.
    ///
    /// The subscription moves to the new instance and its composition is
    /// re-resolved. A different identity is a full [`TreeView::set_root`].
    pub(crate) fn rebind_root(&self, root: DomainObject) {
        let root_id = root.id().clone();
        let current = self.shared.state.lock().root.clone();
        match current {
            Some(current) if current.id() == &root_id => {
                if current.same_instance(&root) {
                    return;
                }
            }
            _ => {
                self.set_root(Some(root));
                return;
            }
        }

        let listener = root
            .mutation()
            .map(|mutation| mutation.listen(self.mutation_callback(root_id.clone())));
        let previous = {
            let mut state = self.shared.state.lock();
            state.root = Some(root);
            std::mem::replace(&mut state.listener, listener)
        };
        if let Some(previous) = previous {
            previous.unlisten();
        }
        debug!(root = %root_id, "Rebound tree root to a newer instance");
        self.refresh();
    }

    /// Identities from the outermost root down to this view's root.
    fn lineage(&self, state: &TreeState) -> Vec<ObjectId> {
        let mut lineage = self.shared.base.clone();
        lineage.extend(state.root.as_ref().map(|root| root.id().clone()));
        lineage
    }

    fn mutation_callback(&self, root_id: ObjectId) -> MutationCallback {
        let weak = Arc::downgrade(&self.shared);
        Arc::new(move |updated: &DomainObject| {
            if let Some(shared) = weak.upgrade() {
                TreeView { shared }.on_mutation(&root_id, updated);
            }
        })
    }

    fn on_mutation(&self, root_id: &ObjectId, updated: &DomainObject) {
        if updated.id() != root_id {
            warn!(
                root = %root_id,
                notified = %updated.id(),
                "Ignoring mutation notification for a different object"
            );
            return;
        }
        {
            let mut state = self.shared.state.lock();
            match &state.root {
                Some(current) if current.id() == root_id => state.root = Some(updated.clone()),
                _ => {
                    trace!(root = %root_id, "Mutation notification after root was replaced");
                    return;
                }
            }
        }
        debug!(root = %root_id, "Root mutated; re-resolving composition");
        self.refresh();
    }

    /// Start a resolution of the current root's composition.
    fn refresh(&self) {
        let (root, seq) = {
            let mut state = self.shared.state.lock();
            let Some(root) = state.root.clone() else {
                return;
            };
            state.next_seq += 1;
            (root, state.next_seq)
        };
        let root_id = root.id().clone();

        let resolution: ChildrenFuture = match root.use_capability(CapabilityKind::Composition) {
            Some(CapabilityOutput::Composition(children)) => children,
            // An updated root that lost its composition renders no children.
            _ => future::ready(Ok(Vec::new())).boxed(),
        };

        self.shared.in_flight.send_modify(|count| *count += 1);
        debug!(root = %root_id, seq, "Resolving composition");

        let weak = Arc::downgrade(&self.shared);
        self.shared.renderer.spawner().spawn(
            async move {
                let result = resolution.await;
                if let Some(shared) = weak.upgrade() {
                    let view = TreeView { shared };
                    view.complete(&root_id, seq, result);
                    view.shared
                        .in_flight
                        .send_modify(|count| *count = count.saturating_sub(1));
                }
            }
            .boxed(),
        );
    }

    fn complete(
        &self,
        root_id: &ObjectId,
        seq: u64,
        result: Result<Vec<DomainObject>, ResolutionError>,
    ) {
        let selection = self.shared.selection.value();
        let removed = {
            let mut state = self.shared.state.lock();
            if state.root.as_ref().map(DomainObject::id) != Some(root_id) {
                trace!(root = %root_id, seq, "Discarding resolution for a replaced root");
                return;
            }
            if seq <= state.floor_seq {
                trace!(
                    root = %root_id,
                    seq,
                    floor = state.floor_seq,
                    "Discarding superseded resolution"
                );
                return;
            }
            let children = match result {
                Ok(children) => children,
                Err(e) => {
                    warn!(
                        root = %root_id,
                        seq,
                        error = %e,
                        "Composition resolution failed; keeping current nodes"
                    );
                    return;
                }
            };

            state.floor_seq = seq;
            let lineage = self.lineage(&state);
            let previous = std::mem::take(&mut state.nodes);
            let reconciled = reconcile(previous, children, &self.shared.renderer);
            state.nodes = reconciled.nodes;
            mark_selection(
                &mut state.nodes,
                selection.as_ref(),
                &self.shared.renderer,
                &lineage,
                ExpandScope::Created(&reconciled.created),
            );
            debug!(
                root = %root_id,
                seq,
                kept = reconciled.kept,
                added = reconciled.created.len(),
                removed = reconciled.removed.len(),
                "Reconciled tree nodes"
            );
            reconciled.removed
        };
        // Disposed outside the lock; dropping releases gestures and subscriptions.
        drop(removed);
    }
}

impl std::fmt::Debug for TreeView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("TreeView")
            .field("root", &state.root.as_ref().map(DomainObject::id))
            .field("nodes", &state.nodes.len())
            .field("listening", &state.listener.is_some())
            .finish()
    }
}

struct Reconciled {
    nodes: Vec<TreeNode>,
    created: Vec<ObjectId>,
    removed: Vec<TreeNode>,
    kept: usize,
}

/// Match resolved children to existing nodes by identity.
///
/// Kept nodes follow the new order, new identities get fresh nodes and the
/// rest are handed back for disposal. Repeated identities keep the first.
fn reconcile(
    previous: Vec<TreeNode>,
    children: Vec<DomainObject>,
    renderer: &NodeRenderer,
) -> Reconciled {
    let mut existing: HashMap<ObjectId, TreeNode> =
        previous.into_iter().map(|node| (node.id(), node)).collect();
    let mut seen = HashSet::with_capacity(children.len());
    let mut nodes = Vec::with_capacity(children.len());
    let mut created = Vec::new();
    let mut kept = 0;

    for child in children {
        if !seen.insert(child.id().clone()) {
            warn!(object = %child.id(), "Composition lists an object twice; keeping first");
            continue;
        }
        match existing.remove(child.id()) {
            Some(mut node) => {
                node.replace_object(child, renderer.settings());
                nodes.push(node);
                kept += 1;
            }
            None => {
                created.push(child.id().clone());
                nodes.push(renderer.render(child));
            }
        }
    }

    Reconciled {
        nodes,
        created,
        removed: existing.into_values().collect(),
        kept,
    }
}

enum ExpandScope<'a> {
    All,
    Created(&'a [ObjectId]),
}

impl ExpandScope<'_> {
    fn allows(&self, id: &ObjectId) -> bool {
        match self {
            ExpandScope::All => true,
            ExpandScope::Created(created) => created.contains(id),
        }
    }
}

/// Mark the node at the selection's position and forward it to nested views.
///
/// With a `context` path the selection is located by the identities from the
/// outermost root down to it, so an object reachable in several places (for
/// example through a link) is marked once. Without one, only root-level nodes
/// match, by identity.
fn mark_selection(
    nodes: &mut [TreeNode],
    selection: Option<&DomainObject>,
    renderer: &NodeRenderer,
    lineage: &[ObjectId],
    scope: ExpandScope<'_>,
) {
    let target = selection.map(|selection| SelectionTarget::locate(selection, lineage));
    let expand = renderer.settings().expand_to_selection;

    for node in nodes.iter_mut() {
        let id = node.id();
        let (selected, reveal) = match &target {
            Some(target) => (
                target.selects(lineage, &id),
                expand && target.passes_through(lineage, &id),
            ),
            None => (false, false),
        };
        node.set_selected(selected);
        if reveal && !node.is_expanded() && scope.allows(&id) {
            node.set_expanded(true, renderer, lineage);
        }
        if let Some(subtree) = node.subtree() {
            subtree.apply_selection(selection.cloned());
        }
    }
}

/// Where the selection sits, relative to the outermost rendered root.
struct SelectionTarget {
    id: ObjectId,
    /// Context path starting at the outermost root and ending at the selection
    path: Option<Vec<ObjectId>>,
}

impl SelectionTarget {
    fn locate(selection: &DomainObject, lineage: &[ObjectId]) -> Self {
        let path = lineage.first().and_then(|top| {
            let path: Vec<ObjectId> = selection
                .context()?
                .path()
                .iter()
                .map(|ancestor| ancestor.id().clone())
                .collect();
            let start = path.iter().rposition(|id| id == top)?;
            Some(path[start..].to_vec())
        });
        Self {
            id: selection.id().clone(),
            path,
        }
    }

    /// Whether the node `id` in a view with `lineage` is the selection itself.
    fn selects(&self, lineage: &[ObjectId], id: &ObjectId) -> bool {
        if &self.id != id {
            return false;
        }
        match &self.path {
            Some(path) => {
                path.len() == lineage.len() + 1
                    && path.starts_with(lineage)
                    && path.last() == Some(id)
            }
            None => lineage.len() == 1,
        }
    }

    /// Whether the node `id` in a view with `lineage` is an ancestor on the path.
    fn passes_through(&self, lineage: &[ObjectId], id: &ObjectId) -> bool {
        match &self.path {
            Some(path) => {
                path.len() > lineage.len() + 1
                    && path.starts_with(lineage)
                    && &path[lineage.len()] == id
            }
            None => false,
        }
    }
}

fn collect_subtrees(nodes: &[TreeNode]) -> Vec<TreeView> {
    nodes
        .iter()
        .filter_map(|node| node.subtree().cloned())
        .collect()
}
