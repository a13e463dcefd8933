//! Capabilities
//!
//! Named, optionally present facets of a domain object. The tree view never
//! inspects concrete object types; it asks a [`CapabilitySet`] whether a
//! capability exists, fetches it, or invokes its primary action.

use crate::error::{ResolutionError, TreeError};
use crate::object::DomainObject;
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Capability names understood by the tree view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityKind {
    Composition,
    Mutation,
    Context,
    Type,
    Location,
}

impl CapabilityKind {
    pub const ALL: [CapabilityKind; 5] = [
        CapabilityKind::Composition,
        CapabilityKind::Mutation,
        CapabilityKind::Context,
        CapabilityKind::Type,
        CapabilityKind::Location,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CapabilityKind::Composition => "composition",
            CapabilityKind::Mutation => "mutation",
            CapabilityKind::Context => "context",
            CapabilityKind::Type => "type",
            CapabilityKind::Location => "location",
        }
    }
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CapabilityKind {
    type Err = TreeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CapabilityKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| TreeError::UnknownCapability(s.to_string()))
    }
}

/// Future yielding the ordered children of a composable object.
pub type ChildrenFuture = BoxFuture<'static, Result<Vec<DomainObject>, ResolutionError>>;

/// Callback invoked with the (possibly updated) object on every mutation.
pub type MutationCallback = Arc<dyn Fn(&DomainObject) + Send + Sync>;

/// Resolves the ordered children of an object.
///
/// Implementations may complete at any time, fail, or never complete.
#[async_trait]
pub trait CompositionCapability: Send + Sync {
    async fn invoke(&self) -> Result<Vec<DomainObject>, ResolutionError>;
}

/// Change notifications for an object.
pub trait MutationCapability: Send + Sync {
    /// Register `callback`; the returned [`Unlisten`] removes it.
    fn listen(&self, callback: MutationCallback) -> Unlisten;
}

/// Ancestry of an object, root first, ending with the object itself.
pub trait ContextCapability: Send + Sync {
    fn path(&self) -> Vec<DomainObject>;
}

/// Type information used for decoration.
pub trait TypeCapability: Send + Sync {
    fn glyph(&self) -> String;
}

/// Where an object lives relative to the parent it was reached through.
pub trait LocationCapability: Send + Sync {
    fn is_link(&self) -> bool;
}

/// Disposer for a mutation subscription.
///
/// The wrapped release runs at most once: on [`Unlisten::unlisten`] or on drop,
/// whichever comes first.
pub struct Unlisten(Option<Box<dyn FnOnce() + Send>>);

impl Unlisten {
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self(Some(Box::new(release)))
    }

    /// A subscription with nothing to release.
    pub fn noop() -> Self {
        Self(None)
    }

    pub fn unlisten(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(release) = self.0.take() {
            release();
        }
    }
}

impl Drop for Unlisten {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Unlisten {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unlisten")
            .field("active", &self.0.is_some())
            .finish()
    }
}

/// Fixed glyph for objects of a known type.
#[derive(Debug, Clone)]
pub struct Glyph(pub String);

impl TypeCapability for Glyph {
    fn glyph(&self) -> String {
        self.0.clone()
    }
}

/// Fixed link flag.
#[derive(Debug, Clone, Copy)]
pub struct LinkFlag(pub bool);

impl LocationCapability for LinkFlag {
    fn is_link(&self) -> bool {
        self.0
    }
}

/// One capability object of a known kind.
#[derive(Clone)]
pub enum Capability {
    Composition(Arc<dyn CompositionCapability>),
    Mutation(Arc<dyn MutationCapability>),
    Context(Arc<dyn ContextCapability>),
    Type(Arc<dyn TypeCapability>),
    Location(Arc<dyn LocationCapability>),
}

impl Capability {
    pub fn kind(&self) -> CapabilityKind {
        match self {
            Capability::Composition(_) => CapabilityKind::Composition,
            Capability::Mutation(_) => CapabilityKind::Mutation,
            Capability::Context(_) => CapabilityKind::Context,
            Capability::Type(_) => CapabilityKind::Type,
            Capability::Location(_) => CapabilityKind::Location,
        }
    }

    pub fn as_composition(&self) -> Option<&Arc<dyn CompositionCapability>> {
        match self {
            Capability::Composition(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_mutation(&self) -> Option<&Arc<dyn MutationCapability>> {
        match self {
            Capability::Mutation(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_context(&self) -> Option<&Arc<dyn ContextCapability>> {
        match self {
            Capability::Context(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_type(&self) -> Option<&Arc<dyn TypeCapability>> {
        match self {
            Capability::Type(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_location(&self) -> Option<&Arc<dyn LocationCapability>> {
        match self {
            Capability::Location(c) => Some(c),
            _ => None,
        }
    }

    /// Run the capability's primary action, if it has one.
    pub fn invoke(&self) -> Option<CapabilityOutput> {
        match self {
            Capability::Composition(c) => {
                let composition = Arc::clone(c);
                let future = async move { composition.invoke().await }.boxed();
                Some(CapabilityOutput::Composition(future))
            }
            Capability::Mutation(_) => None,
            Capability::Context(c) => Some(CapabilityOutput::Path(c.path())),
            Capability::Type(c) => Some(CapabilityOutput::Glyph(c.glyph())),
            Capability::Location(c) => Some(CapabilityOutput::IsLink(c.is_link())),
        }
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Capability({})", self.kind())
    }
}

/// Result of [`Capability::invoke`].
pub enum CapabilityOutput {
    Composition(ChildrenFuture),
    Path(Vec<DomainObject>),
    Glyph(String),
    IsLink(bool),
}

impl fmt::Debug for CapabilityOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapabilityOutput::Composition(_) => f.write_str("Composition(<pending>)"),
            CapabilityOutput::Path(path) => f
                .debug_tuple("Path")
                .field(&path.iter().map(|o| o.id().as_str()).collect::<Vec<_>>())
                .finish(),
            CapabilityOutput::Glyph(glyph) => f.debug_tuple("Glyph").field(glyph).finish(),
            CapabilityOutput::IsLink(link) => f.debug_tuple("IsLink").field(link).finish(),
        }
    }
}

/// Explicit mapping from capability kind to capability object.
#[derive(Clone, Default)]
pub struct CapabilitySet {
    entries: BTreeMap<CapabilityKind, Capability>,
}

impl CapabilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the capability of the same kind.
    pub fn insert(&mut self, capability: Capability) -> Option<Capability> {
        self.entries.insert(capability.kind(), capability)
    }

    pub fn with(mut self, capability: Capability) -> Self {
        self.insert(capability);
        self
    }

    pub fn remove(&mut self, kind: CapabilityKind) -> Option<Capability> {
        self.entries.remove(&kind)
    }

    pub fn has(&self, kind: CapabilityKind) -> bool {
        self.entries.contains_key(&kind)
    }

    pub fn get(&self, kind: CapabilityKind) -> Option<&Capability> {
        self.entries.get(&kind)
    }

    pub fn invoke(&self, kind: CapabilityKind) -> Option<CapabilityOutput> {
        self.entries.get(&kind).and_then(Capability::invoke)
    }

    pub fn kinds(&self) -> impl Iterator<Item = CapabilityKind> + '_ {
        self.entries.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.kinds()).finish()
    }
}
