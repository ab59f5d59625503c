//! Command routing: prefix, trigger lookup, resolution, checks and invocation.
//!
//! For every message the router:
//!
//! 1. stops unless commands are enabled and the content starts with the
//!    configured prefix;
//! 2. looks up every command whose full trigger starts the remaining content;
//! 3. drops candidates whose backend whitelist excludes the origin;
//! 4. runs each remaining candidate independently: resolve arguments, run the
//!    permission checks, then the handler on its own task;
//! 5. translates any failure into a reply.
//!
//! All candidates run concurrently and the router waits for every one of them
//! before reporting.

use std::fmt;
use std::sync::Arc;

use futures::future::join_all;
use hookwire_core::{BoxError, DispatchContext, Message};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{Instrument, debug, error, info_span, trace, warn};

use super::catalog::{CommandCatalog, CommandMatch};
use super::definition::Command;
use super::event::CommandEvent;
use super::resolver::resolve;
use super::translate::{DefaultErrorTranslator, ErrorTranslator};
use crate::error::CommandError;
use crate::stats::RouterStats;

// =============================================================================
// Configuration
// =============================================================================

/// What a message must start with to be treated as a command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandPrefix {
    /// A fixed string such as `!`.
    Literal(String),
    /// The backend's mention of the bot itself.
    #[default]
    Mention,
}

impl CommandPrefix {
    /// Shorthand for [`CommandPrefix::Literal`].
    pub fn literal(prefix: impl Into<String>) -> Self {
        Self::Literal(prefix.into())
    }

    /// Returns `content` without the prefix, or `None` if it does not start with it.
    pub fn strip<'a>(&self, content: &'a str, ctx: &DispatchContext) -> Option<&'a str> {
        match self {
            Self::Literal(prefix) => content.strip_prefix(prefix.as_str()),
            Self::Mention => {
                let mention = ctx.self_mention()?;
                content.trim_start().strip_prefix(mention)
            }
        }
    }
}

/// Command routing settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Prefix messages must start with.
    pub prefix: CommandPrefix,
    /// Whether commands are routed at all.
    pub enabled: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            prefix: CommandPrefix::Mention,
            enabled: true,
        }
    }
}

// =============================================================================
// Invocation state
// =============================================================================

/// Lifecycle of one command invocation.
///
/// ```text
/// Matched → ArgsResolving → ArgsFailed
///                         → PermissionChecking → PermissionDenied
///                                              → Executing → Succeeded
///                                                          → Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvocationState {
    Matched,
    ArgsResolving,
    ArgsFailed,
    PermissionChecking,
    PermissionDenied,
    Executing,
    Succeeded,
    Failed,
}

impl InvocationState {
    /// Whether the invocation has ended.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::ArgsFailed | Self::PermissionDenied | Self::Succeeded | Self::Failed
        )
    }

    /// Whether `next` directly follows `self`.
    pub fn can_advance_to(self, next: Self) -> bool {
        use InvocationState::*;
        matches!(
            (self, next),
            (Matched, ArgsResolving)
                | (ArgsResolving, ArgsFailed | PermissionChecking)
                | (PermissionChecking, PermissionDenied | Executing)
                | (Executing, Succeeded | Failed)
        )
    }
}

/// What happened to one matched command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationReport {
    /// The full trigger or alias that matched.
    pub trigger: String,
    /// Every state visited, starting with [`InvocationState::Matched`].
    pub states: Vec<InvocationState>,
    /// The failure, if the invocation did not succeed.
    pub error: Option<String>,
    /// Reply sent for the failure, if any.
    pub reply: Option<String>,
}

impl InvocationReport {
    fn new(trigger: &str) -> Self {
        Self {
            trigger: trigger.to_owned(),
            states: vec![InvocationState::Matched],
            error: None,
            reply: None,
        }
    }

    /// The current (final, once routing returned) state.
    pub fn state(&self) -> InvocationState {
        self.states
            .last()
            .copied()
            .unwrap_or(InvocationState::Matched)
    }

    fn advance(&mut self, next: InvocationState) {
        debug_assert!(
            self.state().can_advance_to(next),
            "invalid transition {:?} -> {next:?}",
            self.state()
        );
        trace!(from = ?self.state(), to = ?next, "Invocation state changed");
        self.states.push(next);
    }
}

/// Result of routing one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Commands are disabled.
    Disabled,
    /// The message does not start with the prefix.
    NoPrefix,
    /// No command matched (or every match was excluded by its whitelist).
    NoMatch,
    /// The listed commands were invoked.
    Invoked(Vec<InvocationReport>),
}

impl RouteOutcome {
    /// Reports of invoked commands, empty unless [`RouteOutcome::Invoked`].
    pub fn invocations(&self) -> &[InvocationReport] {
        match self {
            Self::Invoked(reports) => reports,
            _ => &[],
        }
    }
}

#[derive(Debug, Error)]
#[error("command handler panicked")]
struct HandlerPanicked;

/// The handler task was dropped before finishing, typically at runtime shutdown.
#[derive(Debug, Error)]
#[error("command handler was cancelled")]
struct HandlerCancelled;

// =============================================================================
// CommandRouter
// =============================================================================

/// Routes messages to the commands of a [`CommandCatalog`].
pub struct CommandRouter {
    catalog: Arc<CommandCatalog>,
    config: RwLock<RouterConfig>,
    translator: Arc<dyn ErrorTranslator>,
    stats: Arc<RouterStats>,
}

impl CommandRouter {
    pub fn new(catalog: Arc<CommandCatalog>, stats: Arc<RouterStats>) -> Self {
        Self {
            catalog,
            config: RwLock::new(RouterConfig::default()),
            translator: Arc::new(DefaultErrorTranslator),
            stats,
        }
    }

    pub fn with_config(self, config: RouterConfig) -> Self {
        *self.config.write() = config;
        self
    }

    /// Replaces the error translator.
    pub fn with_translator(mut self, translator: impl ErrorTranslator) -> Self {
        self.translator = Arc::new(translator);
        self
    }

    pub fn config(&self) -> RouterConfig {
        self.config.read().clone()
    }

    pub fn set_config(&self, config: RouterConfig) {
        *self.config.write() = config;
    }

    pub fn catalog(&self) -> &Arc<CommandCatalog> {
        &self.catalog
    }

    /// Routes one message.
    pub async fn route(&self, message: Arc<dyn Message>, ctx: Arc<DispatchContext>) -> RouteOutcome {
        let config = self.config();
        if !config.enabled {
            return RouteOutcome::Disabled;
        }
        let Some(rest) = config.prefix.strip(message.content(), &ctx) else {
            return RouteOutcome::NoPrefix;
        };

        let candidates: Vec<CommandMatch> = self
            .catalog
            .find(rest)
            .into_iter()
            .filter(|m| {
                let allowed = m.command.allows_backend(ctx.backend());
                if !allowed {
                    trace!(trigger = %m.trigger, backend = %ctx.backend(), "Command not whitelisted for backend");
                }
                allowed
            })
            .collect();
        if candidates.is_empty() {
            return RouteOutcome::NoMatch;
        }

        let invocations = candidates.into_iter().map(|matched| {
            let span = info_span!(
                "command",
                trigger = %matched.trigger,
                backend = %ctx.backend(),
            );
            self.invoke(matched, Arc::clone(&message), Arc::clone(&ctx), span.clone())
                .instrument(span)
        });
        RouteOutcome::Invoked(join_all(invocations).await)
    }

    async fn invoke(
        &self,
        matched: CommandMatch,
        message: Arc<dyn Message>,
        ctx: Arc<DispatchContext>,
        span: tracing::Span,
    ) -> InvocationReport {
        self.stats.record_match();
        let mut report = InvocationReport::new(&matched.trigger);
        let CommandMatch {
            command,
            trigger,
            tokens,
        } = matched;
        let event = CommandEvent::new(trigger, tokens, message, ctx, span);

        let reply = match self.execute(&mut report, &command, &event).await {
            Ok(()) => None,
            Err(e) => {
                report.error = Some(e.to_string());
                self.translator.translate(&command, &*e)
            }
        };

        if let Some(text) = reply {
            if let Err(e) = event.reply(&text).await {
                warn!(error = %e, "Failed to send command error reply");
            }
            report.reply = Some(text);
        }
        report
    }

    async fn execute(
        &self,
        report: &mut InvocationReport,
        command: &Arc<Command>,
        event: &CommandEvent,
    ) -> Result<(), BoxError> {
        report.advance(InvocationState::ArgsResolving);
        let args = match resolve(command.arguments(), event.tokens()) {
            Ok(args) => args,
            Err(e) => {
                report.advance(InvocationState::ArgsFailed);
                self.stats.record_arguments_rejected();
                debug!(error = %e, "Argument resolution failed");
                return Err(e.into());
            }
        };

        report.advance(InvocationState::PermissionChecking);
        if !command.checks().iter().all(|check| check.check(event)) {
            report.advance(InvocationState::PermissionDenied);
            self.stats.record_permission_denied();
            debug!(user = ?event.user().id(), "Permission check rejected invocation");
            return Err(CommandError::InvalidPermissions.into());
        }

        report.advance(InvocationState::Executing);
        let handler = command
            .call(event.clone(), args)
            .instrument(event.span().clone());
        match event.context().spawn(handler).await {
            Ok(Ok(())) => {
                report.advance(InvocationState::Succeeded);
                self.stats.record_success();
                debug!("Command completed");
                Ok(())
            }
            Ok(Err(e)) => {
                report.advance(InvocationState::Failed);
                self.stats.record_failure();
                warn!(error = %e, "Command handler returned an error");
                Err(e)
            }
            Err(e) => {
                report.advance(InvocationState::Failed);
                self.stats.record_failure();
                if e.is_panic() {
                    error!(error = %e, "Command handler panicked");
                    Err(HandlerPanicked.into())
                } else {
                    warn!("Command handler was cancelled");
                    Err(HandlerCancelled.into())
                }
            }
        }
    }
}

impl fmt::Debug for CommandRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandRouter")
            .field("catalog", &self.catalog)
            .field("config", &*self.config.read())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::argument::{ArgumentSpec, IntArg, StringArg};
    use crate::command::permission::IdCheck;
    use crate::command::resolver::Arguments;
    use crate::testing::{TestMessage, context, context_for};
    use hookwire_core::{BackendId, DispatchContext};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio_test::assert_ok;

    fn router(commands: Vec<Command>) -> CommandRouter {
        let catalog = Arc::new(CommandCatalog::new());
        assert_ok!(catalog.register_all(commands));
        CommandRouter::new(catalog, Arc::new(RouterStats::default()))
            .with_config(RouterConfig {
                prefix: CommandPrefix::literal("!"),
                enabled: true,
            })
    }

    fn states(outcome: &RouteOutcome) -> Vec<InvocationState> {
        outcome.invocations().iter().map(InvocationReport::state).collect()
    }

    #[test]
    fn test_state_transitions() {
        use InvocationState::*;
        assert!(Matched.can_advance_to(ArgsResolving));
        assert!(ArgsResolving.can_advance_to(ArgsFailed));
        assert!(!Matched.can_advance_to(Executing));
        assert!(!Succeeded.can_advance_to(Failed));
        assert!(Succeeded.is_terminal() && PermissionDenied.is_terminal());
        assert!(!Executing.is_terminal());
    }

    #[test]
    fn test_prefix_config_serde() {
        let config: RouterConfig =
            serde_json::from_str(r#"{"prefix":{"literal":"!"},"enabled":false}"#).unwrap();
        assert_eq!(config.prefix, CommandPrefix::literal("!"));
        assert!(!config.enabled);

        let config: RouterConfig = serde_json::from_str(r#"{"prefix":"mention"}"#).unwrap();
        assert_eq!(config, RouterConfig::default());
    }

    #[tokio::test]
    async fn test_echo_with_consuming_argument() {
        let router = router(vec![
            Command::new("echo")
                .arg(ArgumentSpec::required("content", StringArg).consuming())
                .execute(|_event: CommandEvent, args: Arguments| async move {
                    args.get::<String>("content")
                }),
        ]);
        let message = TestMessage::new("u1", "!echo hello   world");

        let outcome = router.route(message.clone(), context()).await;

        assert_eq!(states(&outcome), [InvocationState::Succeeded]);
        assert_eq!(message.replies(), ["hello world"]);
    }

    #[tokio::test]
    async fn test_disabled_and_missing_prefix() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);
        let router = router(vec![Command::new("ping").execute(
            move |_event: CommandEvent, _args: Arguments| {
                let c = Arc::clone(&c);
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                }
            },
        )]);

        let outcome = router.route(TestMessage::new("u1", "ping"), context()).await;
        assert_eq!(outcome, RouteOutcome::NoPrefix);

        router.set_config(RouterConfig {
            prefix: CommandPrefix::literal("!"),
            enabled: false,
        });
        let outcome = router.route(TestMessage::new("u1", "!ping"), context()).await;
        assert_eq!(outcome, RouteOutcome::Disabled);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_mention_prefix() {
        let router = router(vec![Command::new("ping").execute(
            |_event: CommandEvent, _args: Arguments| async { "pong" },
        )]);
        router.set_config(RouterConfig::default());

        let message = TestMessage::new("u1", "@bot ping");
        let outcome = router.route(message.clone(), context()).await;
        assert_eq!(states(&outcome), [InvocationState::Succeeded]);
        assert_eq!(message.replies(), ["pong"]);

        let outcome = router.route(TestMessage::new("u1", "!ping"), context()).await;
        assert_eq!(outcome, RouteOutcome::NoPrefix);
    }

    #[tokio::test]
    async fn test_missing_argument_replies_with_usage() {
        let router = router(vec![
            Command::new("ban")
                .arg(ArgumentSpec::required("id", IntArg))
                .arg(ArgumentSpec::optional("reason", StringArg)),
        ]);
        let message = TestMessage::new("u1", "!ban");

        let outcome = router.route(message.clone(), context()).await;

        assert_eq!(states(&outcome), [InvocationState::ArgsFailed]);
        assert_eq!(
            message.replies(),
            ["Missing argument: id\nUsage: ban <id:Int> [reason:String]"]
        );
        assert_eq!(router.stats.snapshot().arguments_rejected, 1);
    }

    #[tokio::test]
    async fn test_optional_reason_resolves_to_none() {
        let seen = Arc::new(Mutex::new(None));
        let s = Arc::clone(&seen);
        let router = router(vec![
            Command::new("ban")
                .arg(ArgumentSpec::required("id", IntArg))
                .arg(ArgumentSpec::optional("reason", StringArg))
                .execute(move |_event: CommandEvent, args: Arguments| {
                    let s = Arc::clone(&s);
                    async move {
                        let id: i64 = args.get("id")?;
                        let reason: Option<String> = args.optional("reason")?;
                        *s.lock() = Some((id, reason));
                        Ok::<_, CommandError>(())
                    }
                }),
        ]);

        let outcome = router.route(TestMessage::new("u1", "!ban 42"), context()).await;

        assert_eq!(states(&outcome), [InvocationState::Succeeded]);
        assert_eq!(*seen.lock(), Some((42, None)));
    }

    #[tokio::test]
    async fn test_permission_denied() {
        let router = router(vec![
            Command::new("shutdown").check(IdCheck::new(["owner"])),
        ]);

        let message = TestMessage::new("intruder", "!shutdown");
        let outcome = router.route(message.clone(), context()).await;
        assert_eq!(
            outcome.invocations()[0].states,
            [
                InvocationState::Matched,
                InvocationState::ArgsResolving,
                InvocationState::PermissionChecking,
                InvocationState::PermissionDenied,
            ]
        );
        assert_eq!(message.replies(), ["Invalid permissions!\nUsage: shutdown"]);

        let outcome = router
            .route(TestMessage::new("owner", "!shutdown"), context())
            .await;
        assert_eq!(states(&outcome), [InvocationState::Succeeded]);
    }

    #[tokio::test]
    async fn test_checks_short_circuit() {
        let second = Arc::new(AtomicUsize::new(0));
        let s = Arc::clone(&second);
        let router = router(vec![
            Command::new("x")
                .check(|_: &CommandEvent| false)
                .check(move |_: &CommandEvent| {
                    s.fetch_add(1, Ordering::SeqCst);
                    true
                }),
        ]);

        router.route(TestMessage::new("u1", "!x"), context()).await;

        assert_eq!(second.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_grouped_command_wins_only_its_trigger() {
        let hits = Arc::new(Mutex::new(Vec::new()));
        let record = |name: &'static str| {
            let hits = Arc::clone(&hits);
            move |_event: CommandEvent, _args: Arguments| {
                let hits = Arc::clone(&hits);
                async move { hits.lock().push(name) }
            }
        };
        let router = router(vec![
            Command::new("ban")
                .group("admin")
                .arg(ArgumentSpec::required("id", IntArg))
                .execute(record("admin ban")),
            Command::new("ban")
                .arg(ArgumentSpec::required("id", IntArg))
                .execute(record("ban")),
        ]);

        let outcome = router.route(TestMessage::new("u1", "!admin ban 42"), context()).await;

        assert_eq!(outcome.invocations().len(), 1);
        assert_eq!(*hits.lock(), ["admin ban"]);
    }

    #[tokio::test]
    async fn test_overlapping_commands_run_independently() {
        let router = router(vec![
            Command::new("ping").execute(|_event: CommandEvent, _args: Arguments| async {
                Err::<(), _>(std::io::Error::other("ping broke"))
            }),
            Command::new("extra")
                .group("ping")
                .execute(|_event: CommandEvent, _args: Arguments| async { "extra ok" }),
        ]);
        let message = TestMessage::new("u1", "!ping extra");

        let outcome = router.route(message.clone(), context()).await;

        assert_eq!(
            states(&outcome),
            [InvocationState::Failed, InvocationState::Succeeded]
        );
        let mut replies = message.replies();
        replies.sort();
        assert_eq!(replies, ["Something went wrong!\nUsage: ping", "extra ok"]);
        let stats = router.stats.snapshot();
        assert_eq!((stats.commands_matched, stats.commands_failed), (2, 1));
    }

    #[tokio::test]
    async fn test_panicking_handler_is_contained() {
        let router = router(vec![Command::new("boom").execute(
            |event: CommandEvent, _args: Arguments| async move {
                if event.trigger() == "boom" {
                    panic!("handler bug");
                }
            },
        )]);
        let message = TestMessage::new("u1", "!boom");

        let outcome = router.route(message.clone(), context()).await;

        assert_eq!(states(&outcome), [InvocationState::Failed]);
        assert_eq!(
            outcome.invocations()[0].error.as_deref(),
            Some("command handler panicked")
        );
        assert_eq!(message.replies(), ["Something went wrong!\nUsage: boom"]);
    }

    #[tokio::test]
    async fn test_cancelled_handler_is_not_a_panic() {
        let router = router(vec![Command::new("ping")]);
        let stopped = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let handle = stopped.handle().clone();
        stopped.shutdown_background();
        let ctx = Arc::new(
            DispatchContext::new(BackendId::from_static("test"), handle)
                .with_self_mention(Some("@bot")),
        );

        let outcome = router.route(TestMessage::new("u1", "!ping"), ctx).await;

        assert_eq!(states(&outcome), [InvocationState::Failed]);
        assert_eq!(
            outcome.invocations()[0].error.as_deref(),
            Some("command handler was cancelled")
        );
        assert_eq!(router.stats.snapshot().commands_failed, 1);
    }

    #[tokio::test]
    async fn test_backend_whitelist_excludes_other_backends() {
        let router = router(vec![Command::new("ping").on_backend("discord")]);

        let outcome = router
            .route(TestMessage::new("u1", "!ping"), context_for("irc"))
            .await;
        assert_eq!(outcome, RouteOutcome::NoMatch);

        let outcome = router
            .route(TestMessage::new("u1", "!ping"), context_for("discord"))
            .await;
        assert_eq!(states(&outcome), [InvocationState::Succeeded]);
    }

    #[tokio::test]
    async fn test_handler_command_error_is_translated() {
        let router = router(vec![
            Command::new("add")
                .arg(ArgumentSpec::required("n", StringArg))
                .execute(|_event: CommandEvent, args: Arguments| async move {
                    let n: i64 = args.get("n")?;
                    Ok::<_, CommandError>(format!("{}", n + 1))
                }),
        ]);
        let message = TestMessage::new("u1", "!add two");

        router.route(message.clone(), context()).await;

        assert_eq!(
            message.replies(),
            ["Error converting two to Int\nUsage: add <n:String>"]
        );
    }

    #[tokio::test]
    async fn test_custom_translator() {
        let catalog = Arc::new(CommandCatalog::new());
        assert_ok!(catalog.register(Command::new("ban").arg(ArgumentSpec::required("id", IntArg))));
        let router = CommandRouter::new(catalog, Arc::new(RouterStats::default()))
            .with_config(RouterConfig {
                prefix: CommandPrefix::literal("/"),
                enabled: true,
            })
            .with_translator(|_: &Command, _: &(dyn std::error::Error + 'static)| None::<String>);
        let message = TestMessage::new("u1", "/ban");

        let outcome = router.route(message.clone(), context()).await;

        assert_eq!(outcome.invocations()[0].reply, None);
        assert!(message.replies().is_empty());
    }
}
