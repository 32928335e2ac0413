//! Courier: streaming conversation engine for LLM backends.
//!
//! Drives multi-turn conversations over server-sent-event streams, with
//! externally executed tool calls and cooperative cancellation. Two clients
//! share the same decoder and cancellation model:
//!
//! - [`session::AssistantSession`]: managed threads and runs (Assistants v2).
//! - [`completions::CompletionStreamClient`]: direct chat-completions streaming.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use courier::prelude::*;
//!
//! # async fn example() -> courier::error::Result<()> {
//! let config = CourierConfig::from_env();
//! let backend = Arc::new(OpenAiAssistantsBackend::from_config(&config)?);
//! let mut session = AssistantSession::new(backend, config);
//! session.init().await?;
//!
//! let tools = ToolRegistry::new();
//! let result = session
//!     .add_user_message("Hello!", &tools, &|delta: &str| print!("{delta}"))
//!     .await?;
//! println!("\n{} file(s) referenced", result.payload.files.len());
//! # Ok(())
//! # }
//! ```

pub mod bus;
pub mod cancel;
pub mod completions;
pub mod config;
pub mod error;
pub mod instructions;
pub mod prelude;
pub mod provider;
pub mod session;
pub mod stream;
pub mod tools;
pub mod types;

#[cfg(feature = "cli")]
pub mod cli;
