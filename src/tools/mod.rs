//! Tool execution: descriptors, the executor seam, and batch dispatch.

pub mod descriptor;
pub mod dispatcher;
pub mod executor;

pub use descriptor::{invoker, AgentTask, ToolDescriptor, ToolInvocation, ToolInvoker, ToolRegistry};
pub use dispatcher::{patch_submission_error, ToolCallDispatcher, PARALLEL_TOOL_NAME};
pub use executor::{FnExecutor, ToolExecutor};
