//! Console front end
//!
//! A line-oriented REPL. Input is read on a blocking thread and handed
//! over a channel, so a pending read never stalls the scheduler.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::logging::Logger;
use crate::orchestrator::QueryOrchestrator;
use crate::types::CancellationToken;

/// Conversation id used by the console
pub const CONSOLE_CONVERSATION: &str = "console";

const PROMPT: &str = "> ";

/// One console input line, classified
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Quit,
    Clear,
    Servers,
    Tools,
    Query(String),
    Empty,
}

impl ConsoleCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        match line.to_lowercase().as_str() {
            "" => ConsoleCommand::Empty,
            "quit" | "exit" | "q" => ConsoleCommand::Quit,
            "clear" => ConsoleCommand::Clear,
            "servers" => ConsoleCommand::Servers,
            "tools" => ConsoleCommand::Tools,
            _ => ConsoleCommand::Query(line.to_string()),
        }
    }
}

pub struct ConsoleFrontEnd {
    orchestrator: Arc<QueryOrchestrator>,
    logger: Arc<dyn Logger>,
}

impl ConsoleFrontEnd {
    pub fn new(orchestrator: Arc<QueryOrchestrator>, logger: Arc<dyn Logger>) -> Self {
        Self { orchestrator, logger }
    }

    /// Run the REPL until `quit`, end of input, or `cancel`
    pub async fn run<R, W>(&self, input: R, mut output: W, cancel: CancellationToken) -> io::Result<()>
    where
        R: BufRead + Send + 'static,
        W: Write + Send,
    {
        let mut lines = spawn_reader(input);

        writeln!(output, "toolmux console. Commands: quit, clear, servers, tools")?;
        loop {
            write!(output, "{}", PROMPT)?;
            output.flush()?;

            let line = tokio::select! {
                _ = cancel.cancelled() => break,
                line = lines.recv() => line,
            };
            let Some(line) = line else {
                break;
            };

            match self.execute(ConsoleCommand::parse(&line?)).await {
                Some(reply) => writeln!(output, "{}", reply)?,
                None => break,
            }
        }

        writeln!(output)?;
        output.flush()?;
        self.logger.info("[ConsoleFrontEnd] Console closed");
        Ok(())
    }

    /// Carry out one command; `None` means quit
    pub async fn execute(&self, command: ConsoleCommand) -> Option<String> {
        let reply = match command {
            ConsoleCommand::Quit => return None,
            ConsoleCommand::Empty => String::new(),
            ConsoleCommand::Clear => {
                self.orchestrator.conversations().clear(CONSOLE_CONVERSATION);
                "Conversation history cleared.".to_string()
            }
            ConsoleCommand::Servers => self.servers(),
            ConsoleCommand::Tools => self.tools().await,
            ConsoleCommand::Query(text) => {
                match self.orchestrator.process_query(CONSOLE_CONVERSATION, &text, None).await {
                    Ok(answer) => answer,
                    Err(e) => e.to_string(),
                }
            }
        };
        Some(reply)
    }

    fn servers(&self) -> String {
        let summaries = self.orchestrator.registry().summaries();
        if summaries.is_empty() {
            return "No servers registered.".to_string();
        }
        summaries
            .iter()
            .map(|s| format!("  {} ({}, {:?})", s.name, s.kind, s.liveness))
            .collect::<Vec<_>>()
            .join("\n")
    }

    async fn tools(&self) -> String {
        let entries = self.orchestrator.catalog().refresh().await;
        if entries.is_empty() {
            return "No tools available.".to_string();
        }
        entries
            .iter()
            .map(|e| format!("  {} [{}]: {}", e.tool.name, e.provider, e.tool.description))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn spawn_reader<R: BufRead + Send + 'static>(mut input: R) -> mpsc::Receiver<io::Result<String>> {
    let (tx, rx) = mpsc::channel(1);
    tokio::task::spawn_blocking(move || loop {
        let mut line = String::new();
        match input.read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {
                if tx.blocking_send(Ok(line)).is_err() {
                    break;
                }
            }
            Err(e) => {
                let _ = tx.blocking_send(Err(e));
                break;
            }
        }
    });
    rx
}
