//! Command definitions and their registration-time validation.
//!
//! A [`Command`] is assembled with by-value builder methods and becomes
//! immutable once it is registered in a catalog. Adding an argument, alias or
//! check yields a new value; nothing stored is ever modified in place.
//!
//! # Example
//!
//! ```rust,ignore
//! let ban = Command::new("ban")
//!     .group("admin")
//!     .alias("kick")
//!     .arg(ArgumentSpec::required("id", IntArg))
//!     .arg(ArgumentSpec::optional("reason", StringArg).consuming())
//!     .check(IdCheck::new(["owner-id"]))
//!     .execute(|event: CommandEvent, args: Arguments| async move {
//!         let id: i64 = args.get("id")?;
//!         Ok::<_, CommandError>(format!("banned {id}"))
//!     });
//!
//! ban.validate()?;
//! assert_eq!(ban.help(), "admin ban <id:Int> [reason:String...]");
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;
use hookwire_core::{BackendId, BoxError};

use super::argument::ArgumentSpec;
use super::event::CommandEvent;
use super::permission::PermissionCheck;
use super::resolver::Arguments;
use crate::error::{CommandError, CommandResult};

// =============================================================================
// Handler responses
// =============================================================================

/// Values a command handler may return.
///
/// Text is sent back as a reply to the triggering message.
#[async_trait]
pub trait CommandResponse: Send + 'static {
    async fn respond(self, event: &CommandEvent) -> Result<(), BoxError>;
}

#[async_trait]
impl CommandResponse for () {
    async fn respond(self, _event: &CommandEvent) -> Result<(), BoxError> {
        Ok(())
    }
}

#[async_trait]
impl CommandResponse for String {
    async fn respond(self, event: &CommandEvent) -> Result<(), BoxError> {
        event.reply(&self).await?;
        Ok(())
    }
}

#[async_trait]
impl CommandResponse for &'static str {
    async fn respond(self, event: &CommandEvent) -> Result<(), BoxError> {
        event.reply(self).await?;
        Ok(())
    }
}

#[async_trait]
impl<T: CommandResponse> CommandResponse for Option<T> {
    async fn respond(self, event: &CommandEvent) -> Result<(), BoxError> {
        match self {
            Some(inner) => inner.respond(event).await,
            None => Ok(()),
        }
    }
}

#[async_trait]
impl<T, E> CommandResponse for Result<T, E>
where
    T: CommandResponse,
    E: Into<BoxError> + Send + 'static,
{
    async fn respond(self, event: &CommandEvent) -> Result<(), BoxError> {
        match self {
            Ok(inner) => inner.respond(event).await,
            Err(e) => Err(e.into()),
        }
    }
}

/// A boxed command handler.
pub type CommandHandler =
    Arc<dyn Fn(CommandEvent, Arguments) -> BoxFuture<'static, Result<(), BoxError>> + Send + Sync>;

// =============================================================================
// Command
// =============================================================================

/// A registered (or registrable) text command.
#[derive(Clone)]
pub struct Command {
    trigger: String,
    group: Option<String>,
    aliases: Vec<String>,
    description: Option<String>,
    arguments: Vec<ArgumentSpec>,
    checks: Vec<Arc<dyn PermissionCheck>>,
    whitelist: Vec<BackendId>,
    handler: CommandHandler,
}

impl Command {
    /// Creates a command with no arguments and a handler that does nothing.
    pub fn new(trigger: impl Into<String>) -> Self {
        Self {
            trigger: trigger.into(),
            group: None,
            aliases: Vec::new(),
            description: None,
            arguments: Vec::new(),
            checks: Vec::new(),
            whitelist: Vec::new(),
            handler: Arc::new(|_: CommandEvent, _: Arguments| {
                async { Ok::<(), BoxError>(()) }.boxed()
            }),
        }
    }

    /// Places the command under `group`; the full trigger becomes `group trigger`.
    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Adds an alternative trigger.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Appends a positional argument.
    pub fn arg(mut self, spec: ArgumentSpec) -> Self {
        self.arguments.push(spec);
        self
    }

    /// Appends a permission check.
    pub fn check(mut self, check: impl PermissionCheck) -> Self {
        self.checks.push(Arc::new(check));
        self
    }

    /// Restricts the command to `backend`. May be called several times.
    pub fn on_backend(mut self, backend: impl Into<BackendId>) -> Self {
        self.whitelist.push(backend.into());
        self
    }

    /// Sets the handler.
    pub fn execute<F, Fut, R>(mut self, handler: F) -> Self
    where
        F: Fn(CommandEvent, Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: CommandResponse,
    {
        self.handler = Arc::new(move |event: CommandEvent, args: Arguments| {
            let fut = handler(event.clone(), args);
            async move { fut.await.respond(&event).await }.boxed()
        });
        self
    }

    pub fn trigger(&self) -> &str {
        &self.trigger
    }

    pub fn group_name(&self) -> Option<&str> {
        self.group.as_deref()
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn about(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn arguments(&self) -> &[ArgumentSpec] {
        &self.arguments
    }

    pub fn checks(&self) -> &[Arc<dyn PermissionCheck>] {
        &self.checks
    }

    pub fn whitelist(&self) -> &[BackendId] {
        &self.whitelist
    }

    pub fn handler(&self) -> &CommandHandler {
        &self.handler
    }

    /// `group trigger`, or just `trigger` without a group.
    pub fn full_trigger(&self) -> String {
        self.qualify(&self.trigger)
    }

    /// Full forms of the trigger followed by every alias.
    pub fn full_triggers(&self) -> Vec<String> {
        std::iter::once(&self.trigger)
            .chain(&self.aliases)
            .map(|name| self.qualify(name))
            .collect()
    }

    fn qualify(&self, name: &str) -> String {
        match &self.group {
            Some(group) => format!("{group} {name}"),
            None => name.to_owned(),
        }
    }

    /// Usage line: the full trigger followed by every argument's readable form.
    pub fn help(&self) -> String {
        std::iter::once(self.full_trigger())
            .chain(self.arguments.iter().map(ToString::to_string))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Whether the command may run for messages from `backend`.
    ///
    /// An empty whitelist allows every backend.
    pub fn allows_backend(&self, backend: &BackendId) -> bool {
        self.whitelist.is_empty() || self.whitelist.contains(backend)
    }

    /// Checks the argument list is well formed.
    pub fn validate(&self) -> CommandResult<()> {
        let last = self.arguments.len().saturating_sub(1);
        for (index, spec) in self.arguments.iter().enumerate() {
            if !spec.is_consuming() {
                continue;
            }
            if index != last {
                return Err(CommandError::ConsumingArgumentIsNotLast(
                    spec.name().to_owned(),
                ));
            }
            if !spec.argument_type().can_consume() {
                return Err(CommandError::ArgumentCannotConsume(spec.name().to_owned()));
            }
        }
        Ok(())
    }

    /// Whether registering both commands would make a trigger ambiguous.
    ///
    /// Commands conflict when they share a group and any of their triggers or
    /// aliases coincide.
    pub fn conflicts_with(&self, other: &Command) -> bool {
        if self.group != other.group {
            return false;
        }
        let names = || std::iter::once(&self.trigger).chain(&self.aliases);
        let other_names: Vec<&String> = std::iter::once(&other.trigger)
            .chain(&other.aliases)
            .collect();
        names().any(|name| other_names.contains(&name))
    }

    /// Invokes the handler.
    pub fn call(
        &self,
        event: CommandEvent,
        args: Arguments,
    ) -> BoxFuture<'static, Result<(), BoxError>> {
        (self.handler)(event, args)
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("trigger", &self.trigger)
            .field("group", &self.group)
            .field("aliases", &self.aliases)
            .field("arguments", &self.arguments)
            .field("checks", &self.checks.len())
            .field("whitelist", &self.whitelist)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::argument::{IntArg, ListArg, StringArg};
    use tokio_test::{assert_err, assert_ok};

    fn ban() -> Command {
        Command::new("ban")
            .arg(ArgumentSpec::required("id", IntArg))
            .arg(ArgumentSpec::optional("reason", StringArg))
    }

    #[test]
    fn test_full_trigger_and_help() {
        let command = ban().group("admin").alias("kick");
        assert_eq!(command.full_trigger(), "admin ban");
        assert_eq!(command.full_triggers(), ["admin ban", "admin kick"]);
        assert_eq!(command.help(), "admin ban <id:Int> [reason:String]");
        assert_eq!(Command::new("ping").help(), "ping");
    }

    #[test]
    fn test_adding_an_argument_yields_a_new_value() {
        let base = Command::new("say");
        let extended = base.clone().arg(ArgumentSpec::required("text", StringArg));
        assert!(base.arguments().is_empty());
        assert_eq!(extended.arguments().len(), 1);
        assert_eq!(extended.trigger(), base.trigger());
    }

    #[test]
    fn test_consuming_argument_must_be_last() {
        let command = Command::new("say")
            .arg(ArgumentSpec::required("text", StringArg).consuming())
            .arg(ArgumentSpec::required("times", IntArg));
        assert_eq!(
            command.validate(),
            Err(CommandError::ConsumingArgumentIsNotLast("text".into()))
        );

        let two_consuming = Command::new("say")
            .arg(ArgumentSpec::required("a", StringArg).consuming())
            .arg(ArgumentSpec::required("b", StringArg).consuming());
        assert_eq!(
            two_consuming.validate(),
            Err(CommandError::ConsumingArgumentIsNotLast("a".into()))
        );
    }

    #[test]
    fn test_consuming_type_must_support_it() {
        let command = Command::new("sum").arg(ArgumentSpec::required("n", IntArg).consuming());
        assert_eq!(
            command.validate(),
            Err(CommandError::ArgumentCannotConsume("n".into()))
        );

        let list =
            Command::new("sum").arg(ArgumentSpec::required("n", ListArg(IntArg)).consuming());
        assert_ok!(list.validate());
    }

    #[test]
    fn test_conflicts() {
        let a = Command::new("ban").alias("kick");
        assert!(a.conflicts_with(&Command::new("kick")));
        assert!(a.conflicts_with(&Command::new("boot").alias("ban")));
        assert!(!a.conflicts_with(&Command::new("ban").group("admin")));
        assert!(!a.conflicts_with(&Command::new("mute")));
    }

    #[test]
    fn test_backend_whitelist() {
        let open = Command::new("ping");
        let restricted = Command::new("ping").on_backend("discord");
        let irc = BackendId::from_static("irc");
        assert!(open.allows_backend(&irc));
        assert!(!restricted.allows_backend(&irc));
        assert!(restricted.allows_backend(&BackendId::from_static("discord")));
    }

    #[test]
    fn test_optional_after_consuming_is_rejected() {
        assert_err!(
            Command::new("x")
                .arg(ArgumentSpec::required("a", StringArg).consuming())
                .arg(ArgumentSpec::optional("b", StringArg))
                .validate()
        );
    }
}
