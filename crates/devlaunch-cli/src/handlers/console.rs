//! `console`: start everything, then take commands line by line.
//!
//! Line editing runs on its own thread (rustyline blocks). The reader hands
//! over one line at a time and waits to be resumed, so it is never left
//! holding the terminal when the console exits.

use std::sync::mpsc as std_mpsc;
use std::thread;

use anyhow::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio::sync::mpsc;
use tracing::debug;

use crate::bootstrap::CliContext;
use crate::commands::ConsoleCommand;
use crate::handlers::{session, status};

const PROMPT: &str = "devlaunch> ";

/// Lines typed at the console.
struct LineReader {
    lines: mpsc::Receiver<String>,
    resume: std_mpsc::Sender<()>,
}

impl LineReader {
    fn spawn() -> Self {
        let (line_tx, lines) = mpsc::channel(1);
        let (resume, resume_rx) = std_mpsc::channel();

        thread::spawn(move || {
            let mut editor = match DefaultEditor::new() {
                Ok(editor) => editor,
                Err(e) => {
                    debug!(error = %e, "line editor unavailable");
                    return;
                }
            };
            loop {
                let line = match editor.readline(PROMPT) {
                    Ok(line) => {
                        let _ = editor.add_history_entry(line.as_str());
                        line
                    }
                    Err(ReadlineError::Interrupted) => "quit".to_string(),
                    Err(_) => return,
                };
                if line_tx.blocking_send(line).is_err() || resume_rx.recv().is_err() {
                    return;
                }
            }
        });

        Self { lines, resume }
    }

    /// Next line, or `None` at end of input.
    async fn next(&mut self) -> Option<String> {
        self.lines.recv().await
    }

    /// Let the reader prompt again.
    fn resume(&self) {
        let _ = self.resume.send(());
    }
}

fn print_help() {
    println!("Commands:");
    for (usage, description) in ConsoleCommand::USAGE {
        println!("  {usage:<14} {description}");
    }
}

async fn run(ctx: &CliContext, command: ConsoleCommand) {
    let supervisor = ctx.supervisor();
    match command {
        ConsoleCommand::Start(role) => {
            // Failures are already reported as events.
            let _ = supervisor.start(role);
        }
        ConsoleCommand::Stop(role) => {
            supervisor.stop(role).await;
        }
        ConsoleCommand::Restart => {
            supervisor.restart_all().await;
        }
        ConsoleCommand::StartAll => {
            supervisor.start_all().await;
        }
        ConsoleCommand::StopAll => {
            supervisor.stop_all().await;
        }
        ConsoleCommand::Status => status::print_table(&supervisor.status()),
        ConsoleCommand::Url(role) => {
            let url = supervisor.resolve_url(role).await;
            println!("{} URL: {url}", role.display_name());
        }
        ConsoleCommand::Clean => {
            supervisor.clean_stray_listeners().await;
        }
        ConsoleCommand::Help => print_help(),
        ConsoleCommand::Quit => {}
    }
}

pub async fn execute(ctx: &CliContext) -> Result<()> {
    let session = session::open(ctx).await?;
    println!("Type 'help' for commands, 'quit' to stop everything and exit.");

    let mut reader = LineReader::spawn();
    while let Some(line) = reader.next().await {
        if line.trim().is_empty() {
            reader.resume();
            continue;
        }
        match line.parse::<ConsoleCommand>() {
            Ok(ConsoleCommand::Quit) => break,
            Ok(command) => run(ctx, command).await,
            Err(e) => println!("{e} (type 'help')"),
        }
        reader.resume();
    }

    println!("Stopping all servers...");
    session::close(ctx, session).await;
    Ok(())
}
