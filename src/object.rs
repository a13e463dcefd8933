//! Domain objects
//!
//! An addressable node of the hierarchical model: a stable identity, an
//! immutable model payload and a capability set. Objects are cheap to clone;
//! a "changed" object is a new instance carrying the same identity.

use crate::capability::{
    Capability, CapabilityKind, CapabilityOutput, CapabilitySet, CompositionCapability,
    ContextCapability, LocationCapability, MutationCapability, TypeCapability,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Stable identity of a domain object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObjectId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ObjectId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

#[derive(Clone)]
pub struct DomainObject {
    inner: Arc<ObjectInner>,
}

struct ObjectInner {
    id: ObjectId,
    model: Value,
    capabilities: CapabilitySet,
}

impl DomainObject {
    pub fn new(id: impl Into<ObjectId>, model: Value, capabilities: CapabilitySet) -> Self {
        Self {
            inner: Arc::new(ObjectInner {
                id: id.into(),
                model,
                capabilities,
            }),
        }
    }

    pub fn builder(id: impl Into<ObjectId>) -> DomainObjectBuilder {
        DomainObjectBuilder {
            id: id.into(),
            model: Value::Object(Default::default()),
            capabilities: CapabilitySet::new(),
        }
    }

    pub fn id(&self) -> &ObjectId {
        &self.inner.id
    }

    pub fn model(&self) -> &Value {
        &self.inner.model
    }

    pub fn capabilities(&self) -> &CapabilitySet {
        &self.inner.capabilities
    }

    pub fn has_capability(&self, kind: CapabilityKind) -> bool {
        self.inner.capabilities.has(kind)
    }

    pub fn get_capability(&self, kind: CapabilityKind) -> Option<&Capability> {
        self.inner.capabilities.get(kind)
    }

    /// Invoke the primary action of `kind`; `None` when absent or action-less.
    pub fn use_capability(&self, kind: CapabilityKind) -> Option<CapabilityOutput> {
        self.inner.capabilities.invoke(kind)
    }

    pub fn composition(&self) -> Option<&Arc<dyn CompositionCapability>> {
        self.get_capability(CapabilityKind::Composition)
            .and_then(Capability::as_composition)
    }

    pub fn mutation(&self) -> Option<&Arc<dyn MutationCapability>> {
        self.get_capability(CapabilityKind::Mutation)
            .and_then(Capability::as_mutation)
    }

    pub fn context(&self) -> Option<&Arc<dyn ContextCapability>> {
        self.get_capability(CapabilityKind::Context)
            .and_then(Capability::as_context)
    }

    pub fn type_info(&self) -> Option<&Arc<dyn TypeCapability>> {
        self.get_capability(CapabilityKind::Type)
            .and_then(Capability::as_type)
    }

    pub fn location(&self) -> Option<&Arc<dyn LocationCapability>> {
        self.get_capability(CapabilityKind::Location)
            .and_then(Capability::as_location)
    }

    /// Display label: the string at `field` in the model, falling back to the id.
    pub fn label(&self, field: &str) -> String {
        self.inner
            .model
            .get(field)
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| self.inner.id.to_string())
    }

    /// True when both handles point at the same instance, not merely the same id.
    pub fn same_instance(&self, other: &DomainObject) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for DomainObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DomainObject")
            .field("id", &self.inner.id)
            .field("capabilities", &self.inner.capabilities)
            .finish()
    }
}

pub struct DomainObjectBuilder {
    id: ObjectId,
    model: Value,
    capabilities: CapabilitySet,
}

impl DomainObjectBuilder {
    pub fn model(mut self, model: Value) -> Self {
        self.model = model;
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        if let Value::Object(map) = &mut self.model {
            map.insert("name".to_string(), Value::String(name.into()));
        }
        self
    }

    pub fn capability(mut self, capability: Capability) -> Self {
        self.capabilities.insert(capability);
        self
    }

    pub fn composition(self, composition: Arc<dyn CompositionCapability>) -> Self {
        self.capability(Capability::Composition(composition))
    }

    pub fn mutation(self, mutation: Arc<dyn MutationCapability>) -> Self {
        self.capability(Capability::Mutation(mutation))
    }

    pub fn context(self, context: Arc<dyn ContextCapability>) -> Self {
        self.capability(Capability::Context(context))
    }

    pub fn type_info(self, type_info: Arc<dyn TypeCapability>) -> Self {
        self.capability(Capability::Type(type_info))
    }

    pub fn location(self, location: Arc<dyn LocationCapability>) -> Self {
        self.capability(Capability::Location(location))
    }

    pub fn build(self) -> DomainObject {
        DomainObject::new(self.id, self.model, self.capabilities)
    }
}
