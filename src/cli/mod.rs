//! CLI entry point for Courier.

use clap::{Parser, Subcommand};

/// Courier CLI
#[derive(Parser, Debug)]
#[command(name = "courier", version, about = "Courier: streaming assistant and completions client")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one turn on a managed assistant thread
    Assistant(AssistantArgs),
    /// Stream a reply from the chat completions endpoint
    Complete(CompleteArgs),
}

/// Arguments for the `assistant` subcommand.
#[derive(Parser, Debug)]
pub struct AssistantArgs {
    /// Reuse an existing assistant
    #[arg(long)]
    pub assistant_id: Option<String>,

    /// Continue an existing thread
    #[arg(long)]
    pub thread_id: Option<String>,

    /// Extra instructions appended to the generated ones
    #[arg(short, long)]
    pub instructions: Option<String>,

    /// Model override (defaults to OPENAI_MODEL)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Keep the created thread and assistant instead of deleting them
    #[arg(long)]
    pub keep: bool,

    /// User prompt (positional)
    pub prompt: String,
}

/// Arguments for the `complete` subcommand.
#[derive(Parser, Debug)]
pub struct CompleteArgs {
    /// Model override (defaults to OPENAI_MODEL)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Temperature (0.0 - 2.0)
    #[arg(short, long)]
    pub temperature: Option<f32>,

    /// Max tokens
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Endpoint override (defaults to COURIER_COMPLETIONS_URL or <base>/chat/completions)
    #[arg(long)]
    pub url: Option<String>,

    /// User prompt (positional)
    pub prompt: String,
}
