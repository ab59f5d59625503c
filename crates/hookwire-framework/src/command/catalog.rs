//! The command catalog: every registered command, looked up by trigger.
//!
//! The catalog is append-only. Registration builds a new command list and
//! swaps it in under a write lock, so a lookup in progress keeps working on
//! the list it started with.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use super::definition::Command;
use crate::error::{CommandError, CommandResult};

/// A command whose trigger matched some input.
#[derive(Debug, Clone)]
pub struct CommandMatch {
    /// The matched command.
    pub command: Arc<Command>,
    /// The full trigger or alias that matched.
    pub trigger: String,
    /// Tokens after the trigger.
    pub tokens: Vec<String>,
}

/// Registered commands.
pub struct CommandCatalog {
    commands: RwLock<Arc<[Arc<Command>]>>,
}

impl Default for CommandCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandCatalog {
    pub fn new() -> Self {
        Self {
            commands: RwLock::new(Arc::from(Vec::new())),
        }
    }

    /// Validates and registers one command.
    pub fn register(&self, command: Command) -> CommandResult<()> {
        self.register_all([command]).map(|_| ())
    }

    /// Validates and registers a batch of commands atomically.
    ///
    /// Either every command is added or, on the first invalid or conflicting
    /// command, none is and the error is returned.
    pub fn register_all(
        &self,
        commands: impl IntoIterator<Item = Command>,
    ) -> CommandResult<usize> {
        let batch: Vec<Command> = commands.into_iter().collect();
        for command in &batch {
            command.validate()?;
        }
        for (index, command) in batch.iter().enumerate() {
            if batch[..index].iter().any(|prev| prev.conflicts_with(command)) {
                return Err(CommandError::CommandRedeclaration(command.full_trigger()));
            }
        }

        let mut commands = self.commands.write();
        for command in &batch {
            if commands.iter().any(|existing| existing.conflicts_with(command)) {
                debug!(trigger = %command.full_trigger(), "Rejected conflicting command");
                return Err(CommandError::CommandRedeclaration(command.full_trigger()));
            }
        }

        let added = batch.len();
        let next: Arc<[Arc<Command>]> = commands
            .iter()
            .cloned()
            .chain(batch.into_iter().map(Arc::new))
            .collect();
        *commands = next;
        info!(added, total = commands.len(), "Commands registered");
        Ok(added)
    }

    /// Snapshot of every registered command.
    pub fn commands(&self) -> Arc<[Arc<Command>]> {
        Arc::clone(&self.commands.read())
    }

    pub fn len(&self) -> usize {
        self.commands.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.read().is_empty()
    }

    /// Every command whose full trigger (or aliased form) starts `content`.
    ///
    /// Matching is done on whitespace tokens, so `"ping"` matches
    /// `"ping extra"` but not `"pingpong"`. Several commands may match the
    /// same input; each appears at most once.
    pub fn find(&self, content: &str) -> Vec<CommandMatch> {
        let tokens: Vec<&str> = content.split_whitespace().collect();
        if tokens.is_empty() {
            return Vec::new();
        }

        self.commands()
            .iter()
            .filter_map(|command| {
                command.full_triggers().into_iter().find_map(|trigger| {
                    let len = trigger.split_whitespace().count();
                    let matched = len > 0
                        && tokens.len() >= len
                        && tokens.iter().zip(trigger.split_whitespace()).all(|(a, b)| *a == b);
                    matched.then(|| CommandMatch {
                        command: Arc::clone(command),
                        tokens: tokens[len..].iter().map(|t| (*t).to_owned()).collect(),
                        trigger,
                    })
                })
            })
            .collect()
    }
}

impl fmt::Debug for CommandCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandCatalog")
            .field("commands", &self.len())
            .finish()
    }
}
