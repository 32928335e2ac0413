//! Tool descriptors generated from agent task listings.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::executor::ToolExecutor;
use crate::error::{CourierError, Result};

/// A task advertised by an agent, as returned by its task listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentTask {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Property name to JSON schema fragment.
    #[serde(default)]
    pub schema: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub returns: serde_json::Value,
    #[serde(default)]
    pub required_params: Vec<String>,
}

/// What a descriptor hands to its invoker.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    pub agent_id: String,
    pub task_name: String,
    pub params: serde_json::Value,
}

/// Runs an agent task. Shared by all descriptors of a registry.
pub type ToolInvoker =
    Arc<dyn Fn(ToolInvocation) -> BoxFuture<'static, Result<serde_json::Value>> + Send + Sync>;

/// Wrap a closure as a [`ToolInvoker`].
pub fn invoker<F, Fut>(f: F) -> ToolInvoker
where
    F: Fn(ToolInvocation) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<serde_json::Value>> + Send + 'static,
{
    Arc::new(move |invocation| Box::pin(f(invocation)))
}

/// A callable tool: schema data plus the invoker that runs it.
#[derive(Clone)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub schema: serde_json::Map<String, serde_json::Value>,
    pub required_params: Vec<String>,
    pub returns: serde_json::Value,
    pub agent_id: String,
    pub task_name: String,
    invoke: ToolInvoker,
}

impl ToolDescriptor {
    /// Build the descriptor for `task`, exposed to the model as `<agent_id>_<task>`.
    pub fn from_task(agent_id: &str, task: AgentTask, invoke: ToolInvoker) -> Self {
        Self {
            name: format!("{agent_id}_{}", task.name),
            description: task.description,
            schema: task.schema,
            required_params: task.required_params,
            returns: task.returns,
            agent_id: agent_id.to_string(),
            task_name: task.name,
            invoke,
        }
    }

    /// Function-tool definition for the backend.
    pub fn openai_schema(&self) -> serde_json::Value {
        let returns = serde_json::to_string_pretty(&self.returns).unwrap_or_default();
        serde_json::json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": format!("{}\n\nReturns: {returns}", self.description),
                "parameters": {
                    "type": "object",
                    "properties": self.schema,
                    "required": self.required_params,
                }
            }
        })
    }

    pub async fn call(&self, params: serde_json::Value) -> Result<serde_json::Value> {
        debug!(tool = %self.name, task = %self.task_name, "invoking agent task");
        (self.invoke)(ToolInvocation {
            agent_id: self.agent_id.clone(),
            task_name: self.task_name.clone(),
            params,
        })
        .await
    }
}

impl std::fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .field("agent_id", &self.agent_id)
            .field("task_name", &self.task_name)
            .finish()
    }
}

/// Descriptors by tool name; dispatches uniformly by name.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, ToolDescriptor>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, descriptor: ToolDescriptor) {
        self.tools.insert(descriptor.name.clone(), descriptor);
    }

    /// Register every task of an agent with a shared invoker.
    pub fn register_agent_tasks(&mut self, agent_id: &str, tasks: Vec<AgentTask>, invoke: ToolInvoker) {
        for task in tasks {
            self.register(ToolDescriptor::from_task(agent_id, task, invoke.clone()));
        }
    }

    /// Drop every tool belonging to `agent_id`.
    pub fn remove_agent(&mut self, agent_id: &str) {
        self.tools.retain(|_, tool| tool.agent_id != agent_id);
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.get(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub fn schemas(&self) -> Vec<serde_json::Value> {
        self.tools.values().map(ToolDescriptor::openai_schema).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[async_trait]
impl ToolExecutor for ToolRegistry {
    async fn execute(&self, name: &str, args: serde_json::Value) -> Result<serde_json::Value> {
        let tool = self.get(name).ok_or_else(|| CourierError::ToolExecution {
            tool_name: name.to_string(),
            message: format!("Tool not found: {name}"),
        })?;
        tool.call(args).await
    }
}
