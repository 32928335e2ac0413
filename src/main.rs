//! Courier CLI binary entry point.

use std::io::Write;
use std::sync::Arc;

use clap::Parser;
use courier::bus::{ChatBus, ChatEvent};
use courier::cancel::CancellationToken;
use courier::cli::{AssistantArgs, Cli, Commands, CompleteArgs};
use courier::completions::{CompletionOptions, CompletionStreamClient};
use courier::config::CourierConfig;
use courier::provider::OpenAiAssistantsBackend;
use courier::session::AssistantSession;
use courier::tools::ToolRegistry;
use courier::types::{ConversationTurnResult, StoredMessage};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "courier=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Assistant(args) => handle_assistant(args).await,
        Commands::Complete(args) => handle_complete(args).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn handle_assistant(args: AssistantArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = CourierConfig::from_env();
    if let Some(model) = args.model {
        config = config.with_model(model);
    }

    let backend = Arc::new(OpenAiAssistantsBackend::from_config(&config)?);
    let mut session = AssistantSession::new(backend, config)
        .with_instructions(&[], args.instructions.as_deref());
    let reusing = args.assistant_id.is_some() || args.thread_id.is_some();
    if let Some(id) = args.assistant_id {
        session = session.with_assistant_id(id);
    }
    if let Some(id) = args.thread_id {
        session = session.with_thread_id(id);
    }
    session.init().await?;
    eprintln!(
        "assistant {} / thread {}",
        session.assistant_id().unwrap_or("?"),
        session.thread_id().unwrap_or("?")
    );

    let session = Arc::new(session);
    let canceller = session.clone();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            canceller.cancel_current_run();
        }
    });

    let tools = ToolRegistry::new();
    let result = session
        .add_user_message(&args.prompt, &tools, &print_delta)
        .await;
    ctrl_c.abort();
    let _ = ctrl_c.await;
    let result = result?;
    report(&result);

    if !args.keep && !reusing {
        match Arc::try_unwrap(session) {
            Ok(session) => session.destroy().await?,
            Err(_) => eprintln!("session still shared; skipping cleanup"),
        }
    }
    Ok(())
}

async fn handle_complete(args: CompleteArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = CourierConfig::from_env();
    if let Some(url) = args.url {
        config = config.with_completions_url(url);
    }
    if let Some(model) = args.model {
        config = config.with_model(model);
    }

    let bus = ChatBus::new();
    let mut events = bus.subscribe();
    let printer = tokio::spawn(async move {
        let mut printed = 0;
        while let Ok(event) = events.recv().await {
            match event {
                ChatEvent::Typing {
                    is_typing: true,
                    text_so_far,
                    ..
                } => {
                    if let Some(fresh) = text_so_far.get(printed..) {
                        print_delta(fresh);
                    }
                    printed = text_so_far.len();
                }
                ChatEvent::Error { message, .. } => eprintln!("\n❌ {message}"),
                _ => {}
            }
        }
    });

    let client = CompletionStreamClient::from_config(&config, bus)?.with_options(CompletionOptions {
        model: Some(config.model().to_string()),
        max_tokens: args.max_tokens,
        temperature: args.temperature,
        omit_tool_messages: false,
    });

    let token = CancellationToken::new();
    let canceller = token.clone();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            canceller.cancel();
        }
    });

    let history = vec![StoredMessage::user(args.prompt)];
    let result = client.send("cli", &history, &token).await;
    ctrl_c.abort();
    drop(client);
    let _ = printer.await;

    report(&result?);
    Ok(())
}

fn print_delta(text: &str) {
    print!("{text}");
    let _ = std::io::stdout().flush();
}

fn report(result: &ConversationTurnResult) {
    println!(); // newline after streaming
    if result.aborted {
        eprintln!("(cancelled)");
    }
    for file in &result.payload.files {
        eprintln!("📎 {} ({}) {}", file.name, file.mime_type, file.path);
    }
}
