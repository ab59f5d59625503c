//! Console Bot Example
//!
//! A terminal-backed bot showing backends, plugins, commands and listeners.
//!
//! Every stdin line is a message from `console`; prefix it with `name> ` to
//! speak as someone else. A line starting with `+` is a reaction.
//!
//! ```text
//! @bot ping
//! @bot echo hello   there
//! @bot sum 1 2 3
//! admin> @bot admin ban 42
//! +👍
//! ```
//!
//! The default prefix is a mention of the bot. Set a literal one with
//! `HOOKWIRE_COMMANDS__PREFIX__LITERAL='!'`.
//!
//! # Usage
//!
//! ```bash
//! cargo run --package console_bot
//! ```

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use hookwire::prelude::*;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

// ============================================================================
// Console backend
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum ConsoleKind {
    Line,
    Reaction,
    Blank,
}

#[derive(Debug, Serialize, Deserialize)]
struct Line {
    author: String,
    content: String,
}

json_payload!(Line);

const BLANK: TypedEvent<ConsoleKind, Line> = TypedEvent::new(ConsoleKind::Blank);

struct ConsoleUser(String);

impl User for ConsoleUser {
    fn id(&self) -> Option<&str> {
        Some(&self.0)
    }

    fn mention(&self) -> String {
        format!("@{}", self.0)
    }
}

struct Stdout;

#[async_trait]
impl Channel for Stdout {
    fn id(&self) -> &str {
        "stdout"
    }

    fn mention(&self) -> String {
        "#console".to_owned()
    }

    async fn send(&self, content: &str) -> BackendResult<()> {
        println!("bot: {content}");
        Ok(())
    }
}

struct ConsoleMessage(Line);

#[async_trait]
impl Message for ConsoleMessage {
    fn content(&self) -> &str {
        &self.0.content
    }

    fn author(&self) -> Arc<dyn User> {
        Arc::new(ConsoleUser(self.0.author.clone()))
    }

    fn channel(&self) -> Arc<dyn Channel> {
        Arc::new(Stdout)
    }
}

struct ConsoleReaction(Line);

impl Reaction for ConsoleReaction {
    fn user(&self) -> Arc<dyn User> {
        Arc::new(ConsoleUser(self.0.author.clone()))
    }

    fn content(&self) -> &str {
        &self.0.content
    }
}

fn decode_line(raw: &[u8]) -> DecodeResult<Line> {
    serde_json::from_slice(raw).map_err(|e| DecodeError::new("Line", e))
}

struct ConsoleBackend {
    registry: EventRegistry<ConsoleKind>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl ConsoleBackend {
    fn new() -> Self {
        Self {
            registry: EventRegistry::new()
                .translate_kind(ConsoleKind::Line, GlobalEvent::MessageCreate)
                .translate_kind(ConsoleKind::Reaction, GlobalEvent::ReactionAdd)
                .decoder(GlobalEvent::MessageCreate, |raw| {
                    let line = decode_line(raw)?;
                    Ok(GlobalPayload::Message(Arc::new(ConsoleMessage(line))))
                })
                .decoder(GlobalEvent::ReactionAdd, |raw| {
                    let line = decode_line(raw)?;
                    Ok(GlobalPayload::Reaction(Arc::new(ConsoleReaction(line))))
                }),
            reader: Mutex::new(None),
        }
    }

    /// Splits a stdin line into its kind and payload.
    fn parse(input: &str) -> (ConsoleKind, Line) {
        let (author, text) = match input.split_once("> ") {
            Some((author, text)) if !author.trim().is_empty() => (author.trim(), text),
            _ => ("console", input),
        };
        let (kind, content) = if text.trim().is_empty() {
            (ConsoleKind::Blank, text)
        } else if let Some(emoji) = text.strip_prefix('+') {
            (ConsoleKind::Reaction, emoji.trim())
        } else {
            (ConsoleKind::Line, text)
        };
        let line = Line {
            author: author.to_owned(),
            content: content.to_owned(),
        };
        (kind, line)
    }

    async fn read_stdin(events: EventSender<ConsoleKind>) {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            let input = match lines.next_line().await {
                Ok(Some(input)) => input,
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "Failed to read stdin");
                    break;
                }
            };
            let (kind, line) = Self::parse(&input);
            let raw = match serde_json::to_vec(&line) {
                Ok(raw) => raw,
                Err(e) => {
                    warn!(error = %e, "Failed to encode console line");
                    continue;
                }
            };
            if events.send(kind, raw).await.is_err() {
                break;
            }
        }
        debug!("Console input closed");
    }
}

#[async_trait]
impl Backend for ConsoleBackend {
    type Kind = ConsoleKind;

    fn id(&self) -> BackendId {
        BackendId::from_static("console")
    }

    fn self_mention(&self) -> Option<String> {
        Some("@bot".to_owned())
    }

    async fn boot(&self, events: EventSender<ConsoleKind>) -> BackendResult<()> {
        let reader = tokio::spawn(Self::read_stdin(events));
        *self.reader.lock() = Some(reader);
        Ok(())
    }

    async fn shutdown(&self) -> BackendResult<()> {
        if let Some(reader) = self.reader.lock().take() {
            reader.abort();
        }
        Ok(())
    }

    fn translate(&self, kind: &ConsoleKind) -> Option<GlobalEvent> {
        self.registry.translate(kind)
    }

    fn decode_global(&self, kind: GlobalEvent, raw: &[u8]) -> DecodeResult<GlobalPayload> {
        self.registry.decode(kind, raw)
    }
}

// ============================================================================
// Plugins
// ============================================================================

/// Small utility commands.
struct Basics;

impl Plugin for Basics {
    fn name(&self) -> &str {
        "basics"
    }

    fn commands(&self) -> Vec<Command> {
        vec![
            Command::new("ping")
                .description("Pong!")
                .execute(|_event: CommandEvent, _args: Arguments| async { "Pong!" }),
            Command::new("echo")
                .alias("say")
                .description("Repeats the given text")
                .arg(ArgumentSpec::required("content", StringArg).consuming())
                .execute(|_event: CommandEvent, args: Arguments| async move {
                    args.get::<String>("content")
                }),
            Command::new("sum")
                .description("Adds integers")
                .arg(ArgumentSpec::required("numbers", ListArg(IntArg)).consuming())
                .execute(|_event: CommandEvent, args: Arguments| async move {
                    let numbers: Vec<i64> = args.get("numbers")?;
                    let total = numbers.iter().fold(0i64, |acc, n| acc.saturating_add(*n));
                    Ok::<_, CommandError>(total.to_string())
                }),
            Command::new("hello")
                .arg(ArgumentSpec::optional("name", StringArg))
                .execute(|event: CommandEvent, args: Arguments| async move {
                    let name = args
                        .optional::<String>("name")?
                        .unwrap_or_else(|| event.user().mention());
                    Ok::<_, CommandError>(format!("Hello, {name}!"))
                }),
        ]
    }

    fn listeners(&self, listeners: &mut ListenerSet) {
        listeners.on_global(
            REACTION_ADD,
            |_ctx: Arc<DispatchContext>, reaction: Arc<dyn Reaction>| async move {
                info!(user = %reaction.user().mention(), emoji = reaction.content(), "Reaction");
            },
        );
        listeners.on_backend("console", BLANK, |_ctx: Arc<DispatchContext>, line: Line| async move {
            debug!(author = %line.author, "Blank line");
        });
    }
}

/// Commands restricted to the `admin` user.
struct Admin;

impl Plugin for Admin {
    fn name(&self) -> &str {
        "admin"
    }

    fn commands(&self) -> Vec<Command> {
        vec![
            Command::new("ban")
                .group("admin")
                .description("Bans a user by id")
                .arg(ArgumentSpec::required("id", IntArg))
                .arg(ArgumentSpec::optional("reason", StringArg).consuming())
                .check(IdCheck::new(["admin"]))
                .execute(|_event: CommandEvent, args: Arguments| async move {
                    let id: i64 = args.get("id")?;
                    let reply = match args.optional::<String>("reason")? {
                        Some(reason) => format!("Banned {id}: {reason}"),
                        None => format!("Banned {id}"),
                    };
                    Ok::<_, CommandError>(reply)
                }),
        ]
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let runtime = HookwireRuntime::builder().build()?;

    runtime.register_plugin(Basics)?;
    runtime.register_plugin(Admin)?;
    runtime.listen_global(
        MESSAGE_CREATE,
        |ctx: Arc<DispatchContext>, message: Arc<dyn Message>| async move {
            debug!(
                backend = %ctx.backend(),
                author = %message.author().mention(),
                content = message.content(),
                "Message"
            );
        },
    );
    runtime.register_backend(ConsoleBackend::new()).await?;

    runtime.run().await?;

    info!(stats = ?runtime.stats(), "Bye");
    Ok(())
}
