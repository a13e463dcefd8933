//! Tree nodes
//!
//! A [`TreeNode`] is the rendered, resource-owning unit bound to one child
//! object: its label, gesture handle, label-refresh subscription, selection
//! marker and (once expanded) a nested [`TreeView`].

use crate::capability::Unlisten;
use crate::config::TreeSettings;
use crate::element::Element;
use crate::gesture::{GestureGuard, GestureService};
use crate::object::{DomainObject, ObjectId};
use crate::runtime::Spawn;
use crate::view::TreeView;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

pub const ITEM_CLASS: &str = "tree-item";
pub const LABEL_CLASS: &str = "tree-label";
pub const GLYPH_CLASS: &str = "tree-glyph";
pub const LINK_CLASS: &str = "tree-link";
pub const EXPANDED_CLASS: &str = "expanded";
pub const LEAF_CLASS: &str = "leaf";

/// Produces tree nodes and nested views sharing one set of collaborators.
#[derive(Clone)]
pub struct NodeRenderer {
    settings: Arc<TreeSettings>,
    gestures: Arc<dyn GestureService>,
    spawner: Arc<dyn Spawn>,
}

impl NodeRenderer {
    pub fn new(
        settings: Arc<TreeSettings>,
        gestures: Arc<dyn GestureService>,
        spawner: Arc<dyn Spawn>,
    ) -> Self {
        Self {
            settings,
            gestures,
            spawner,
        }
    }

    pub fn settings(&self) -> &Arc<TreeSettings> {
        &self.settings
    }

    pub(crate) fn spawner(&self) -> &Arc<dyn Spawn> {
        &self.spawner
    }

    /// Render `object` as a node, attaching gestures and label tracking.
    pub fn render(&self, object: DomainObject) -> TreeNode {
        let label = render_label(&self.settings, &object);
        let gestures = GestureGuard::new(self.gestures.attach_gestures(&label, &object));
        let cell = Arc::new(Mutex::new(NodeLabel { object, element: label }));
        let listener = track_label(&self.settings, &cell);

        TreeNode {
            label: cell,
            listener,
            gestures,
            selected: false,
            expanded: false,
            subtree: None,
            selected_class: self.settings.selected_class.clone(),
        }
    }
}

/// Label element: glyph, text and, for links, the link indicator.
pub fn render_label(settings: &TreeSettings, object: &DomainObject) -> Element {
    let glyph = object
        .type_info()
        .map(|t| t.glyph())
        .unwrap_or_else(|| settings.default_glyph.clone());
    let mut label = Element::new("span")
        .with_class(LABEL_CLASS)
        .with_child(Element::new("span").with_class(GLYPH_CLASS).with_text(glyph))
        .with_child(Element::new("span").with_text(object.label(&settings.label_field)));

    if object.location().map(|l| l.is_link()).unwrap_or(false) {
        label.push_child(
            Element::new("span")
                .with_class(LINK_CLASS)
                .with_text(settings.link_glyph.clone()),
        );
    }
    label
}

struct NodeLabel {
    object: DomainObject,
    element: Element,
}

/// Subscribe to the object's own mutations so the label follows renames.
fn track_label(settings: &Arc<TreeSettings>, cell: &Arc<Mutex<NodeLabel>>) -> Option<Unlisten> {
    let object = cell.lock().object.clone();
    let mutation = object.mutation()?;
    let settings = Arc::clone(settings);
    let weak = Arc::downgrade(cell);
    let id = object.id().clone();

    Some(mutation.listen(Arc::new(move |updated: &DomainObject| {
        if updated.id() != &id {
            return;
        }
        if let Some(cell) = weak.upgrade() {
            let element = render_label(&settings, updated);
            let mut label = cell.lock();
            label.object = updated.clone();
            label.element = element;
            debug!(object = %id, "Refreshed node label");
        }
    })))
}

pub struct TreeNode {
    label: Arc<Mutex<NodeLabel>>,
    listener: Option<Unlisten>,
    gestures: GestureGuard,
    selected: bool,
    expanded: bool,
    subtree: Option<TreeView>,
    selected_class: String,
}

impl TreeNode {
    pub fn id(&self) -> ObjectId {
        self.label.lock().object.id().clone()
    }

    pub fn object(&self) -> DomainObject {
        self.label.lock().object.clone()
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    /// Idempotent visual toggle of the selection marker.
    pub fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    pub fn subtree(&self) -> Option<&TreeView> {
        self.subtree.as_ref()
    }

    /// Expand or collapse the node.
    ///
    /// The first expansion creates a nested view rooted at the node's object.
    /// Collapsing keeps that view alive. Returns `false` for objects without
    /// a `composition` capability, which never expand. `lineage` lists the
    /// identities from the outermost root down to the view holding this node.
    pub fn set_expanded(
        &mut self,
        expanded: bool,
        renderer: &NodeRenderer,
        lineage: &[ObjectId],
    ) -> bool {
        if !expanded {
            self.expanded = false;
            return true;
        }

        let object = self.object();
        if object.composition().is_none() {
            return false;
        }
        if self.subtree.is_none() {
            let subtree = TreeView::from_renderer(renderer.clone(), lineage.to_vec());
            subtree.set_root(Some(object));
            self.subtree = Some(subtree);
        }
        self.expanded = true;
        true
    }

    /// Rebind to a newer instance of the same identity.
    ///
    /// Re-renders the label and moves the label subscription to the new
    /// instance's mutation capability. Gestures stay attached. A nested view
    /// follows the new instance, or is dropped when it no longer composes.
    pub(crate) fn replace_object(&mut self, object: DomainObject, settings: &Arc<TreeSettings>) {
        if self.label.lock().object.same_instance(&object) {
            return;
        }
        if object.composition().is_none() {
            self.expanded = false;
            self.subtree = None;
        } else if let Some(subtree) = &self.subtree {
            subtree.rebind_root(object.clone());
        }
        let element = render_label(settings, &object);
        {
            let mut label = self.label.lock();
            label.object = object;
            label.element = element;
        }
        self.listener = None;
        self.listener = track_label(settings, &self.label);
    }

    /// Snapshot of the node's list item, including an expanded subtree.
    pub fn element(&self) -> Element {
        let (label, composable) = {
            let label = self.label.lock();
            (label.element.clone(), label.object.composition().is_some())
        };

        let mut item = Element::new("li").with_class(ITEM_CLASS).with_child(label);
        if !composable {
            item.add_class(LEAF_CLASS);
        }
        if self.expanded {
            item.add_class(EXPANDED_CLASS);
            if let Some(subtree) = &self.subtree {
                item.push_child(subtree.elements());
            }
        }
        item.toggle_class(&self.selected_class, self.selected);
        item
    }

    /// Release gestures, label tracking and any subtree now.
    pub fn destroy(mut self) {
        self.dispose();
    }

    fn dispose(&mut self) {
        self.gestures.release();
        if let Some(listener) = self.listener.take() {
            listener.unlisten();
        }
        self.subtree = None;
    }
}

impl Drop for TreeNode {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for TreeNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeNode")
            .field("id", &self.id())
            .field("selected", &self.selected)
            .field("expanded", &self.expanded)
            .finish()
    }
}
