//! Ask Perplexity Labs about local source files, then keep chatting.
//!
//! # Usage
//!
//! ```bash
//! # Explain a project
//! ppxity --directories ./src --prompt "Explain what this project is about"
//!
//! # A couple of files, another model, wire-level logging
//! ppxity --files main.go,go.mod --model mixtral-8x7b-instruct --debug --prompt "Review this"
//! ```
//!
//! After the first answer, type follow-up questions. `backtrack` forgets the
//! last exchange, `help` lists commands and `exit` (or Ctrl+D) quits.

use std::sync::Arc;

use arrrg::CommandLine;
use biometrics::Collector;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing_subscriber::EnvFilter;

use ppxity::chat::{
    ChatArgs, ChatCommand, ChatConfig, ChatSession, PlainTextRenderer, Renderer, help_text,
    parse_command,
};
use ppxity::{
    Client, Collected, Completion, Prompt, TracingEmitter, TracingFrameLogger, emit_biometrics,
    register_biometrics,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, free) = ChatArgs::from_command_line_relaxed("ppxity [OPTIONS] [FILES...]");
    let config = ChatConfig::from_args(args, &free)?;
    init_tracing(config.debug);
    let collector = Collector::new();
    register_biometrics(&collector);
    let debug = config.debug;
    let mut renderer = PlainTextRenderer::with_color(config.use_color);

    let mut prompt = Prompt::new(config.prompt.clone(), &config.extensions);
    for dir in &config.directories {
        prompt.add_directory(dir)?;
    }
    for file in &config.files {
        prompt.add_file(file)?;
    }
    let compiled = prompt.compile()?;
    tracing::info!(files = prompt.files().len(), "compiled initial prompt");

    let mut client = Client::new()?;
    if config.debug {
        client = client.with_frame_logger(Arc::new(TracingFrameLogger));
    }
    let connection = client.connect().await?;
    let show_initial_prompt = config.show_initial_prompt;
    let mut session = ChatSession::new(connection, config);

    if show_initial_prompt {
        renderer.print_turn("User", &compiled);
    } else {
        renderer.print_turn("User", "Initial prompt sent");
    }
    let collected = session.send_initial(&compiled, &mut renderer).await?;
    print_answer(&collected, &mut renderer);
    if let Some(err) = collected.error {
        if let Err(close_err) = session.close().await {
            tracing::debug!(error = %close_err, "close after failed exchange");
        }
        return Err(err.into());
    }

    chat_loop(&mut session, &mut renderer).await?;

    let closed = session.close().await;
    if debug {
        let _ = emit_biometrics(&collector, &mut TracingEmitter);
    }
    closed?;
    Ok(())
}

async fn chat_loop(
    session: &mut ChatSession,
    renderer: &mut PlainTextRenderer,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut rl = DefaultEditor::new()?;
    loop {
        let line = match rl.readline("You: ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                renderer.print_error(&format!("Input error: {err}"));
                break;
            }
        };
        let Some(command) = parse_command(&line) else {
            continue;
        };
        let _ = rl.add_history_entry(line.trim());

        match command {
            ChatCommand::Exit => break,
            ChatCommand::Help => renderer.print_info(help_text()),
            ChatCommand::Backtrack => match session.backtrack() {
                Ok(()) => renderer.print_info("Forgot the last exchange."),
                Err(err) => {
                    tracing::warn!(error = %err, "backtrack failed");
                    renderer.print_error(&err.to_string());
                }
            },
            ChatCommand::Message(text) => match session.send(&text, renderer).await {
                Ok(collected) => {
                    print_answer(&collected, renderer);
                    if let Some(err) = &collected.error {
                        renderer.print_error(&err.to_string());
                    }
                    if collected.connection_lost() {
                        renderer.print_info("The connection is gone; exiting.");
                        break;
                    }
                }
                Err(err) => {
                    tracing::warn!(error = %err, "error sending message");
                    renderer.print_error(&err.to_string());
                }
            },
        }
    }
    Ok(())
}

fn print_answer(collected: &Collected, renderer: &mut dyn Renderer) {
    match collected.completion {
        Completion::Terminated => {
            tracing::info!(attempts = collected.deliveries, "answer complete");
        }
        Completion::TimedOut => {
            tracing::warn!(attempts = collected.deliveries, "answer timed out");
        }
        Completion::Exhausted => {
            tracing::warn!(attempts = collected.deliveries, "answer never finished");
        }
        Completion::Failed => {
            tracing::warn!(attempts = collected.deliveries, "answer cut short");
        }
    }
    renderer.print_turn("Assistant", &format!("\r\n{}\r\n", collected.text));
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,ppxity=info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
