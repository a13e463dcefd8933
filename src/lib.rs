//! Canopy: Tree View Synchronization
//!
//! Keeps a rendered tree consistent with a hierarchical, capability-based
//! object model whose children resolve asynchronously and change at runtime,
//! with single selection and selection observers.

pub mod capability;
pub mod cli;
pub mod config;
pub mod element;
pub mod error;
pub mod gesture;
pub mod logging;
pub mod memory;
pub mod node;
pub mod object;
pub mod runtime;
pub mod selection;
pub mod view;

pub use capability::{Capability, CapabilityKind, CapabilitySet, Unlisten};
pub use config::{CanopyConfig, TreeSettings};
pub use element::Element;
pub use error::{ResolutionError, TreeError};
pub use gesture::{GestureHandle, GestureService, NoGestures};
pub use object::{DomainObject, ObjectId};
pub use selection::Unobserve;
pub use view::{RootState, TreeView};
