//! In-memory object model
//!
//! A mutable store of named objects whose [`DomainObject`] views carry working
//! `composition`, `mutation`, `context`, `type` and `location` capabilities.
//! Structural edits notify the edited object's mutation listeners with a fresh
//! instance, outside the store lock.

use crate::capability::{
    CompositionCapability, ContextCapability, Glyph, LinkFlag, MutationCallback,
    MutationCapability, Unlisten,
};
use crate::error::{ResolutionError, TreeError};
use crate::object::{DomainObject, ObjectId};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Weak};
use tracing::debug;

/// Serializable description of a whole model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Object shown when no explicit root is requested
    pub root: ObjectId,
    #[serde(default)]
    pub objects: Vec<ObjectSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectSpec {
    pub id: ObjectId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub glyph: Option<String>,
    /// Objects listed here are reached through a link rather than their home
    #[serde(default)]
    pub link: bool,
    /// Absent means the object is not composable
    #[serde(default)]
    pub children: Option<Vec<ObjectId>>,
}

impl ModelSpec {
    pub fn from_toml_str(text: &str) -> Result<Self, TreeError> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_json_str(text: &str) -> Result<Self, TreeError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Load by extension: `.json` as JSON, anything else as TOML.
    pub fn load(path: &Path) -> Result<Self, TreeError> {
        let text = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&text),
            _ => Self::from_toml_str(&text),
        }
    }
}

struct Entry {
    name: String,
    glyph: Option<String>,
    link: bool,
    children: Option<Vec<ObjectId>>,
    parent: Option<ObjectId>,
    listeners: Vec<(u64, MutationCallback)>,
}

#[derive(Default)]
struct ModelState {
    entries: HashMap<ObjectId, Entry>,
    next_listener: u64,
}

#[derive(Clone, Default)]
pub struct MemoryModel {
    state: Arc<Mutex<ModelState>>,
}

impl MemoryModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_spec(spec: &ModelSpec) -> Result<Self, TreeError> {
        let model = Self::new();
        {
            let mut state = model.state.lock();
            for object in &spec.objects {
                if state.entries.contains_key(&object.id) {
                    return Err(TreeError::Fixture(format!("duplicate object id '{}'", object.id)));
                }
                state.entries.insert(
                    object.id.clone(),
                    Entry {
                        name: object.name.clone().unwrap_or_else(|| object.id.to_string()),
                        glyph: object.glyph.clone(),
                        link: object.link,
                        children: object.children.clone(),
                        parent: None,
                        listeners: Vec::new(),
                    },
                );
            }
            if !state.entries.contains_key(&spec.root) {
                return Err(TreeError::Fixture(format!("root '{}' is not defined", spec.root)));
            }

            let mut homes = Vec::new();
            for object in &spec.objects {
                for child in object.children.iter().flatten() {
                    if !state.entries.contains_key(child) {
                        return Err(TreeError::Fixture(format!(
                            "'{}' lists unknown child '{}'",
                            object.id, child
                        )));
                    }
                    homes.push((child.clone(), object.id.clone()));
                }
            }
            // The first parent listing an object is its home.
            for (child, parent) in homes {
                if let Some(entry) = state.entries.get_mut(&child) {
                    if entry.parent.is_none() && child != parent {
                        entry.parent = Some(parent);
                    }
                }
            }
        }
        debug!(objects = spec.objects.len(), "Loaded in-memory model");
        Ok(model)
    }

    /// Add a standalone object; `composable` gives it an empty composition.
    pub fn insert(&self, id: impl Into<ObjectId>, name: impl Into<String>, composable: bool) {
        self.state.lock().entries.insert(
            id.into(),
            Entry {
                name: name.into(),
                glyph: None,
                link: false,
                children: composable.then(Vec::new),
                parent: None,
                listeners: Vec::new(),
            },
        );
    }

    pub fn contains(&self, id: &ObjectId) -> bool {
        self.state.lock().entries.contains_key(id)
    }

    /// Current view of `id` as a domain object.
    pub fn object(&self, id: &ObjectId) -> Result<DomainObject, TreeError> {
        let state = self.state.lock();
        self.build(&state, id)
            .ok_or_else(|| TreeError::UnknownObject(id.clone()))
    }

    pub fn listener_count(&self, id: &ObjectId) -> usize {
        self.state
            .lock()
            .entries
            .get(id)
            .map(|e| e.listeners.len())
            .unwrap_or(0)
    }

    pub fn add_child(&self, parent: &ObjectId, child: &ObjectId) -> Result<(), TreeError> {
        self.edit(parent, |state| {
            if !state.entries.contains_key(child) {
                return Err(TreeError::UnknownObject(child.clone()));
            }
            let entry = composable_entry(state, parent)?;
            entry.children.get_or_insert_with(Vec::new).push(child.clone());
            if let Some(child_entry) = state.entries.get_mut(child) {
                child_entry.parent.get_or_insert_with(|| parent.clone());
            }
            Ok(())
        })
    }

    pub fn remove_child(&self, parent: &ObjectId, child: &ObjectId) -> Result<(), TreeError> {
        self.edit(parent, |state| {
            let entry = composable_entry(state, parent)?;
            entry.children.get_or_insert_with(Vec::new).retain(|c| c != child);
            Ok(())
        })
    }

    pub fn set_children(&self, parent: &ObjectId, children: Vec<ObjectId>) -> Result<(), TreeError> {
        self.edit(parent, |state| {
            if let Some(unknown) = children.iter().find(|c| !state.entries.contains_key(*c)) {
                return Err(TreeError::UnknownObject(unknown.clone()));
            }
            composable_entry(state, parent)?.children = Some(children);
            Ok(())
        })
    }

    pub fn rename(&self, id: &ObjectId, name: impl Into<String>) -> Result<(), TreeError> {
        let name = name.into();
        self.edit(id, |state| {
            let entry = state
                .entries
                .get_mut(id)
                .ok_or_else(|| TreeError::UnknownObject(id.clone()))?;
            entry.name = name;
            Ok(())
        })
    }

    /// Apply `change`, then notify `id`'s listeners with its new instance.
    fn edit(
        &self,
        id: &ObjectId,
        change: impl FnOnce(&mut ModelState) -> Result<(), TreeError>,
    ) -> Result<(), TreeError> {
        let (updated, listeners) = {
            let mut state = self.state.lock();
            change(&mut *state)?;
            let updated = self
                .build(&*state, id)
                .ok_or_else(|| TreeError::UnknownObject(id.clone()))?;
            let listeners: Vec<MutationCallback> = state
                .entries
                .get(id)
                .map(|e| e.listeners.iter().map(|(_, l)| Arc::clone(l)).collect())
                .unwrap_or_default();
            (updated, listeners)
        };
        debug!(object = %id, listeners = listeners.len(), "Object mutated");
        for listener in listeners {
            listener(&updated);
        }
        Ok(())
    }

    fn build(&self, state: &ModelState, id: &ObjectId) -> Option<DomainObject> {
        let entry = state.entries.get(id)?;
        let handle = ObjectHandle {
            model: Arc::downgrade(&self.state),
            id: id.clone(),
        };

        let mut builder = DomainObject::builder(id.clone())
            .model(json!({ "name": entry.name }))
            .mutation(Arc::new(handle.clone()))
            .context(Arc::new(handle.clone()))
            .location(Arc::new(LinkFlag(entry.link)));
        if let Some(glyph) = &entry.glyph {
            builder = builder.type_info(Arc::new(Glyph(glyph.clone())));
        }
        if entry.children.is_some() {
            builder = builder.composition(Arc::new(handle));
        }
        Some(builder.build())
    }
}

fn composable_entry<'a>(
    state: &'a mut ModelState,
    id: &ObjectId,
) -> Result<&'a mut Entry, TreeError> {
    let entry = state
        .entries
        .get_mut(id)
        .ok_or_else(|| TreeError::UnknownObject(id.clone()))?;
    if entry.children.is_none() {
        return Err(TreeError::Fixture(format!("'{}' is not composable", id)));
    }
    Ok(entry)
}

/// Capability implementation shared by every facet of one stored object.
#[derive(Clone)]
struct ObjectHandle {
    model: Weak<Mutex<ModelState>>,
    id: ObjectId,
}

impl ObjectHandle {
    fn model(&self) -> Option<MemoryModel> {
        self.model.upgrade().map(|state| MemoryModel { state })
    }
}

#[async_trait]
impl CompositionCapability for ObjectHandle {
    async fn invoke(&self) -> Result<Vec<DomainObject>, ResolutionError> {
        let model = self
            .model()
            .ok_or_else(|| ResolutionError::Unavailable(self.id.clone()))?;
        let state = model.state.lock();
        let children = state
            .entries
            .get(&self.id)
            .and_then(|e| e.children.clone())
            .ok_or_else(|| ResolutionError::Unavailable(self.id.clone()))?;
        children
            .iter()
            .map(|child| {
                model
                    .build(&state, child)
                    .ok_or_else(|| ResolutionError::Rejected(format!("unknown child '{}'", child)))
            })
            .collect()
    }
}

impl MutationCapability for ObjectHandle {
    fn listen(&self, callback: MutationCallback) -> Unlisten {
        let Some(model) = self.model.upgrade() else {
            return Unlisten::noop();
        };
        let listener_id = {
            let mut state = model.lock();
            let listener_id = state.next_listener;
            state.next_listener += 1;
            match state.entries.get_mut(&self.id) {
                Some(entry) => entry.listeners.push((listener_id, callback)),
                None => return Unlisten::noop(),
            }
            listener_id
        };

        let weak = Arc::downgrade(&model);
        let id = self.id.clone();
        Unlisten::new(move || {
            if let Some(model) = weak.upgrade() {
                if let Some(entry) = model.lock().entries.get_mut(&id) {
                    entry.listeners.retain(|(l, _)| *l != listener_id);
                }
            }
        })
    }
}

impl ContextCapability for ObjectHandle {
    fn path(&self) -> Vec<DomainObject> {
        let Some(model) = self.model() else {
            return Vec::new();
        };
        let state = model.state.lock();
        let mut path = Vec::new();
        let mut visited = HashSet::new();
        let mut current = Some(self.id.clone());
        while let Some(id) = current {
            if !visited.insert(id.clone()) {
                break;
            }
            let Some(object) = model.build(&state, &id) else {
                break;
            };
            path.push(object);
            current = state.entries.get(&id).and_then(|e| e.parent.clone());
        }
        path.reverse();
        path
    }
}
