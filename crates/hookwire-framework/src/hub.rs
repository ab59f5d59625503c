//! Per-backend dispatch.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use hookwire_core::{
    Backend, BackendId, DecodeError, DispatchContext, DispatchTable, GlobalEvent,
    ListenerOutcome, ListenerResponse, Payload, RawPayload, TypedEvent,
};
use tracing::{debug, trace};

use crate::hooks::{GlobalReport, HookRouter};
use crate::listener::ListenerSet;

/// What one inbound event triggered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    /// Outcomes of the backend-scoped listeners, in registration order.
    pub scoped: Vec<ListenerOutcome>,
    /// The canonical kind the event translated to.
    pub translated: Option<GlobalEvent>,
    /// Set when the event translated but its payload did not decode.
    pub decode_error: Option<DecodeError>,
    /// Global dispatch, when the payload decoded.
    pub global: Option<GlobalReport>,
}

/// A backend together with its native dispatch table.
pub struct BackendHub<B: Backend> {
    backend: Arc<B>,
    id: BackendId,
    table: DispatchTable<B::Kind, RawPayload>,
    router: Arc<HookRouter>,
}

impl<B: Backend> BackendHub<B> {
    /// Creates the hub and applies the scoped listeners of every plugin
    /// already registered on `router`.
    pub fn new(backend: Arc<B>, router: Arc<HookRouter>) -> Self {
        let hub = Self {
            id: backend.id(),
            backend,
            table: DispatchTable::new(),
            router,
        };
        for listeners in hub.router.listener_sets() {
            hub.apply(&listeners);
        }
        hub
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    pub fn id(&self) -> &BackendId {
        &self.id
    }

    pub fn table(&self) -> &DispatchTable<B::Kind, RawPayload> {
        &self.table
    }

    pub fn router(&self) -> &Arc<HookRouter> {
        &self.router
    }

    /// Binds `handler` to one of this backend's native kinds.
    pub fn listen<T, F, Fut, R>(&self, event: TypedEvent<B::Kind, T>, handler: F)
    where
        T: Payload,
        F: Fn(Arc<DispatchContext>, T) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: ListenerResponse,
    {
        self.table.listen(event, handler);
    }

    /// Applies the scoped bindings of `listeners` meant for this backend.
    pub fn apply(&self, listeners: &ListenerSet) -> usize {
        let applied = listeners.apply_scoped(&self.id, &self.table);
        if applied > 0 {
            debug!(backend = %self.id, applied, "Scoped listeners applied");
        }
        applied
    }

    /// Dispatches one inbound event.
    ///
    /// Backend-scoped listeners run first. If the kind translates to a
    /// canonical kind and the payload decodes, the global layer runs next.
    /// Kinds without a translation never reach global listeners.
    pub async fn dispatch(&self, kind: B::Kind, raw: RawPayload) -> DispatchReport {
        let ctx = Arc::new(
            DispatchContext::current(self.id.clone())
                .with_event_name(format!("{kind:?}"))
                .with_self_mention(self.backend.self_mention()),
        );
        self.router.stats().record_event();

        let scoped = self
            .table
            .dispatch(&kind, Arc::clone(&raw), Arc::clone(&ctx))
            .await;
        for outcome in &scoped {
            if !outcome.is_completed() {
                self.router.stats().record_listener_failure();
            }
        }

        let mut report = DispatchReport {
            scoped,
            translated: None,
            decode_error: None,
            global: None,
        };

        let Some(global) = self.backend.translate(&kind) else {
            trace!(backend = %self.id, kind = ?kind, "No canonical kind");
            return report;
        };
        report.translated = Some(global);

        match self.backend.decode_global(global, &raw) {
            Ok(payload) => {
                report.global = Some(self.router.dispatch_global(payload, ctx).await);
            }
            Err(e) => {
                debug!(backend = %self.id, error = %e, "Unable to extract {global} from data");
                self.router.stats().record_decode_failure();
                report.decode_error = Some(e);
            }
        }
        report
    }
}

impl<B: Backend> fmt::Debug for BackendHub<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendHub")
            .field("id", &self.id)
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{
        ArgumentSpec, Arguments, Command, CommandEvent, CommandPrefix, IntArg, RouterConfig,
    };
    use crate::plugin::Plugin;
    use crate::testing::TestMessage;
    use async_trait::async_trait;
    use hookwire_core::{
        BackendResult, DecodeResult, EventRegistry, EventSender, GlobalPayload, MESSAGE_CREATE,
        Message,
    };
    use parking_lot::Mutex;
    use serde::Deserialize;
    use tokio_test::assert_ok;

    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    enum ChatKind {
        Message,
        Typing,
    }

    #[derive(Debug, Deserialize)]
    struct Typing {
        user: String,
    }

    hookwire_core::json_payload!(Typing);

    const TYPING: TypedEvent<ChatKind, Typing> = TypedEvent::new(ChatKind::Typing);

    struct ChatBackend {
        registry: EventRegistry<ChatKind>,
    }

    impl ChatBackend {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                registry: EventRegistry::new()
                    .translate_kind(ChatKind::Message, GlobalEvent::MessageCreate)
                    .decoder(GlobalEvent::MessageCreate, |raw| {
                        TestMessage::decode(raw).map(GlobalPayload::Message)
                    }),
            })
        }
    }

    #[async_trait]
    impl Backend for ChatBackend {
        type Kind = ChatKind;

        fn id(&self) -> BackendId {
            BackendId::from_static("chat")
        }

        fn self_mention(&self) -> Option<String> {
            Some("@bot".into())
        }

        async fn boot(&self, _events: EventSender<ChatKind>) -> BackendResult<()> {
            Ok(())
        }

        fn translate(&self, kind: &ChatKind) -> Option<GlobalEvent> {
            self.registry.translate(kind)
        }

        fn decode_global(&self, kind: GlobalEvent, raw: &[u8]) -> DecodeResult<GlobalPayload> {
            self.registry.decode(kind, raw)
        }
    }

    fn raw(json: &str) -> RawPayload {
        Arc::from(json.as_bytes())
    }

    fn router() -> Arc<HookRouter> {
        Arc::new(HookRouter::new().with_config(RouterConfig {
            prefix: CommandPrefix::literal("!"),
            enabled: true,
        }))
    }

    #[tokio::test]
    async fn test_untranslated_kind_fires_only_scoped_listeners() {
        let router = router();
        let global_hits = Arc::new(Mutex::new(0));
        let g = Arc::clone(&global_hits);
        router.listen_global(MESSAGE_CREATE, move |_ctx: Arc<DispatchContext>, _m: Arc<dyn Message>| {
            let g = Arc::clone(&g);
            async move { *g.lock() += 1 }
        });
        let hub = BackendHub::new(ChatBackend::new(), router);
        let typists = Arc::new(Mutex::new(Vec::new()));
        let t = Arc::clone(&typists);
        hub.listen(TYPING, move |_ctx: Arc<DispatchContext>, typing: Typing| {
            let t = Arc::clone(&t);
            async move { t.lock().push(typing.user) }
        });

        let report = hub.dispatch(ChatKind::Typing, raw(r#"{"user":"ana"}"#)).await;

        assert_eq!(report.scoped, [ListenerOutcome::Completed]);
        assert_eq!(report.translated, None);
        assert_eq!(*typists.lock(), ["ana"]);
        assert_eq!(*global_hits.lock(), 0);
    }

    #[tokio::test]
    async fn test_grouped_command_scenario() {
        let router = router();
        let hits = Arc::new(Mutex::new(Vec::new()));
        let record = |name: &'static str| {
            let hits = Arc::clone(&hits);
            move |_event: CommandEvent, args: Arguments| {
                let hits = Arc::clone(&hits);
                async move {
                    let id: i64 = args.get("id")?;
                    hits.lock().push(format!("{name} {id}"));
                    Ok::<_, crate::error::CommandError>(())
                }
            }
        };
        assert_ok!(router.register(
            Command::new("ban")
                .group("admin")
                .arg(ArgumentSpec::required("id", IntArg))
                .execute(record("admin ban")),
        ));
        assert_ok!(router.register(
            Command::new("ban")
                .arg(ArgumentSpec::required("id", IntArg))
                .execute(record("ban")),
        ));
        let hub = BackendHub::new(ChatBackend::new(), Arc::clone(&router));

        let report = hub
            .dispatch(
                ChatKind::Message,
                raw(r#"{"author":"mod","content":"!admin ban 42"}"#),
            )
            .await;

        assert_eq!(report.translated, Some(GlobalEvent::MessageCreate));
        let global = report.global.expect("message should decode");
        assert_eq!(global.commands.map(|c| c.invocations().len()), Some(1));
        assert_eq!(*hits.lock(), ["admin ban 42"]);
        assert_eq!(router.stats().snapshot().commands_succeeded, 1);
    }

    #[tokio::test]
    async fn test_decode_failure_is_counted_not_raised() {
        let router = router();
        let hub = BackendHub::new(ChatBackend::new(), Arc::clone(&router));

        let report = hub.dispatch(ChatKind::Message, raw("not json")).await;

        assert_eq!(report.translated, Some(GlobalEvent::MessageCreate));
        assert!(report.decode_error.is_some());
        assert!(report.global.is_none());
        let stats = router.stats().snapshot();
        assert_eq!((stats.events_dispatched, stats.decode_failures), (1, 1));
    }

    #[tokio::test]
    async fn test_plugin_scoped_listeners_reach_later_backends() {
        struct Watcher(Arc<Mutex<usize>>);
        impl Plugin for Watcher {
            fn name(&self) -> &str {
                "watcher"
            }
            fn listeners(&self, listeners: &mut ListenerSet) {
                let count = Arc::clone(&self.0);
                listeners.on(TYPING, move |_ctx: Arc<DispatchContext>, _t: Typing| {
                    let count = Arc::clone(&count);
                    async move { *count.lock() += 1 }
                });
            }
        }

        let router = router();
        let count = Arc::new(Mutex::new(0));
        assert_ok!(router.register_plugin(&Watcher(Arc::clone(&count))));
        let hub = BackendHub::new(ChatBackend::new(), router);

        hub.dispatch(ChatKind::Typing, raw(r#"{"user":"bo"}"#)).await;

        assert_eq!(*count.lock(), 1);
    }
}
