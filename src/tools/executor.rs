//! The tool execution capability supplied by the caller.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::CourierError;

/// Executes a named tool with structured arguments.
///
/// This is the seam between the conversation engine and whatever actually runs
/// tools (a local agent process, a remote service, ...).
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(
        &self,
        name: &str,
        args: serde_json::Value,
    ) -> Result<serde_json::Value, CourierError>;
}

type ExecuteFn = dyn Fn(
        String,
        serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<serde_json::Value, CourierError>> + Send>>
    + Send
    + Sync;

/// Closure-based executor for quick wiring and tests.
#[derive(Clone)]
pub struct FnExecutor {
    handler: Arc<ExecuteFn>,
}

impl FnExecutor {
    pub fn new<F, Fut>(handler: F) -> Self
    where
        F: Fn(String, serde_json::Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<serde_json::Value, CourierError>> + Send + 'static,
    {
        Self {
            handler: Arc::new(move |name, args| Box::pin(handler(name, args))),
        }
    }
}

#[async_trait]
impl ToolExecutor for FnExecutor {
    async fn execute(
        &self,
        name: &str,
        args: serde_json::Value,
    ) -> Result<serde_json::Value, CourierError> {
        (self.handler)(name.to_string(), args).await
    }
}

impl std::fmt::Debug for FnExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnExecutor").finish_non_exhaustive()
    }
}
