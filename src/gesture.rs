//! Gesture attachment
//!
//! Interaction behavior is owned by an external service. The tree view only
//! requests attachment per rendered node and guarantees the returned handle
//! is destroyed exactly once when the node goes away.

use crate::element::Element;
use crate::object::DomainObject;

/// Attached interaction behavior for one rendered element.
pub trait GestureHandle: Send {
    /// Detach everything that was attached. Called at most once per handle.
    fn destroy(&mut self);
}

pub trait GestureService: Send + Sync {
    fn attach_gestures(&self, element: &Element, object: &DomainObject) -> Box<dyn GestureHandle>;
}

/// Gesture service that attaches nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGestures;

struct DetachedHandle;

impl GestureHandle for DetachedHandle {
    fn destroy(&mut self) {}
}

impl GestureService for NoGestures {
    fn attach_gestures(&self, _element: &Element, _object: &DomainObject) -> Box<dyn GestureHandle> {
        Box::new(DetachedHandle)
    }
}

/// Owns a gesture handle and destroys it once, on release or drop.
pub(crate) struct GestureGuard(Option<Box<dyn GestureHandle>>);

impl GestureGuard {
    pub(crate) fn new(handle: Box<dyn GestureHandle>) -> Self {
        Self(Some(handle))
    }

    pub(crate) fn release(&mut self) {
        if let Some(mut handle) = self.0.take() {
            handle.destroy();
        }
    }
}

impl Drop for GestureGuard {
    fn drop(&mut self) {
        self.release();
    }
}
