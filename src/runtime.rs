//! Execution context for composition resolutions.

use crate::error::TreeError;
use futures::future::BoxFuture;
use std::sync::Arc;
use tokio::runtime::Handle;

/// Schedules resolution tasks onto the owner's execution context.
pub trait Spawn: Send + Sync {
    fn spawn(&self, task: BoxFuture<'static, ()>);
}

impl Spawn for Handle {
    fn spawn(&self, task: BoxFuture<'static, ()>) {
        // Completion is observed through the tree state, not the join handle.
        drop(Handle::spawn(self, task));
    }
}

/// Spawner bound to the Tokio runtime the caller is running on.
pub fn current_runtime() -> Result<Arc<dyn Spawn>, TreeError> {
    Handle::try_current()
        .map(|handle| Arc::new(handle) as Arc<dyn Spawn>)
        .map_err(|e| TreeError::NoRuntime(e.to_string()))
}
