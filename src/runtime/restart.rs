use anyhow::Result;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::sync::Arc;

use super::AgentRuntime;

/// Stops the current runtime and builds a new one. `Ok(None)` means the
/// runtime failed to come back.
#[async_trait]
pub trait RestartHandler: Send + Sync {
    async fn restart(&self) -> Result<Option<Arc<dyn AgentRuntime>>>;
}

type RestartFn =
    dyn Fn() -> BoxFuture<'static, Result<Option<Arc<dyn AgentRuntime>>>> + Send + Sync;

/// Adapts a closure returning a boxed future into a [`RestartHandler`].
pub struct FnRestartHandler {
    f: Box<RestartFn>,
}

impl FnRestartHandler {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn() -> BoxFuture<'static, Result<Option<Arc<dyn AgentRuntime>>>>
            + Send
            + Sync
            + 'static,
    {
        Self { f: Box::new(f) }
    }
}

#[async_trait]
impl RestartHandler for FnRestartHandler {
    async fn restart(&self) -> Result<Option<Arc<dyn AgentRuntime>>> {
        (self.f)().await
    }
}
