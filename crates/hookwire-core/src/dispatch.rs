//! Dispatch tables: event kind to ordered listener lists.
//!
//! Two kinds of tables exist at runtime:
//!
//! - one per backend instance, keyed by that backend's native kinds and fed
//!   raw payloads ([`DispatchTable<K, RawPayload>`]);
//! - one global table keyed by [`GlobalEvent`] and fed decoded canonical
//!   payloads ([`DispatchTable<GlobalEvent, GlobalPayload>`]).
//!
//! Listeners are stored as boxed tower services. A typed listener decodes the
//! table payload into its declared type before the handler runs; the decoder
//! is picked once, when the listener is registered.
//!
//! Registration is copy-on-write: the list for a kind is replaced by a new
//! `Arc<[_]>` with the listener appended, so a dispatch in flight keeps the
//! snapshot it started with.
//!
//! # Example
//!
//! ```rust,ignore
//! let table = DispatchTable::new();
//! table.listen(GUILD_JOIN, |ctx: Arc<DispatchContext>, join: GuildJoin| async move {
//!     info!(backend = %ctx.backend(), guild = %join.guild_id, "Joined guild");
//! });
//!
//! let outcomes = table.dispatch(&DiscordKind::GuildJoin, raw, ctx).await;
//! ```

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::FutureExt;
use futures::future::{BoxFuture, join_all};
use parking_lot::RwLock;
use tower::util::BoxCloneSyncService;
use tower::{BoxError, Service, ServiceExt};
use tracing::{Instrument, Level, debug, error, span, warn};

use crate::context::DispatchContext;
use crate::error::{DecodeError, DecodeResult};
use crate::event::{
    EventKind, GlobalContent, GlobalEvent, GlobalPayload, Payload, RawPayload, TypedEvent,
    decode_raw, extract_global,
};

/// Request handed to every listener service.
pub type ListenerRequest<P> = (Arc<DispatchContext>, P);

/// A type-erased listener.
pub type BoxedListener<P> = BoxCloneSyncService<ListenerRequest<P>, (), BoxError>;

// =============================================================================
// Outcomes
// =============================================================================

/// Result of invoking one listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerOutcome {
    /// The handler ran to completion.
    Completed,
    /// The payload did not decode to the listener's type; the handler did not run.
    DecodeFailed(DecodeError),
    /// The handler returned an error or panicked.
    Failed(String),
}

impl ListenerOutcome {
    /// Whether the handler completed successfully.
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }

    fn from_result(result: Result<(), BoxError>) -> Self {
        match result {
            Ok(()) => Self::Completed,
            Err(e) => match e.downcast::<Undecoded>() {
                Ok(undecoded) => Self::DecodeFailed(undecoded.0),
                Err(e) => Self::Failed(e.to_string()),
            },
        }
    }

}

/// Marks a payload that never reached the handler, so a handler returning a
/// [`DecodeError`] of its own is still reported as [`ListenerOutcome::Failed`].
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
struct Undecoded(DecodeError);

// =============================================================================
// Listener responses
// =============================================================================

/// Values a listener handler may return.
pub trait ListenerResponse: Send + 'static {
    /// Converts the handler output into a listener result.
    fn into_result(self) -> Result<(), BoxError>;
}

impl ListenerResponse for () {
    fn into_result(self) -> Result<(), BoxError> {
        Ok(())
    }
}

impl<E> ListenerResponse for Result<(), E>
where
    E: Into<BoxError> + Send + 'static,
{
    fn into_result(self) -> Result<(), BoxError> {
        self.map_err(Into::into)
    }
}

// =============================================================================
// TypedListener
// =============================================================================

/// A tower [`Service`] decoding the table payload into `T` before calling the handler.
pub struct TypedListener<P, T, F> {
    decode: fn(&P) -> DecodeResult<T>,
    handler: F,
    _marker: PhantomData<fn(P) -> T>,
}

impl<P, T, F> TypedListener<P, T, F> {
    /// Wraps `handler` behind `decode`.
    pub fn new(decode: fn(&P) -> DecodeResult<T>, handler: F) -> Self {
        Self {
            decode,
            handler,
            _marker: PhantomData,
        }
    }
}

impl<P, T, F: Clone> Clone for TypedListener<P, T, F> {
    fn clone(&self) -> Self {
        Self::new(self.decode, self.handler.clone())
    }
}

impl<P, T, F, Fut, R> Service<ListenerRequest<P>> for TypedListener<P, T, F>
where
    P: Send + 'static,
    T: Send + 'static,
    F: Fn(Arc<DispatchContext>, T) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: ListenerResponse,
{
    type Response = ();
    type Error = BoxError;
    type Future = BoxFuture<'static, Result<(), BoxError>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, (ctx, payload): ListenerRequest<P>) -> Self::Future {
        let decoded = (self.decode)(&payload);
        let handler = self.handler.clone();
        async move {
            let value = decoded.map_err(Undecoded)?;
            handler(ctx, value).await.into_result()
        }
        .boxed()
    }
}

// =============================================================================
// DispatchTable
// =============================================================================

/// Map from event kind to the listeners bound to it, in registration order.
pub struct DispatchTable<K, P> {
    entries: RwLock<HashMap<K, Arc<[BoxedListener<P>]>>>,
}

impl<K: EventKind, P: Clone + Send + 'static> Default for DispatchTable<K, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: EventKind, P: Clone + Send + 'static> DispatchTable<K, P> {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Appends a listener service for `kind`.
    pub fn register<S>(&self, kind: K, listener: S)
    where
        S: Service<ListenerRequest<P>, Response = (), Error = BoxError>
            + Clone
            + Send
            + Sync
            + 'static,
        S::Future: Send + 'static,
    {
        let listener = BoxCloneSyncService::new(listener);
        let mut entries = self.entries.write();
        let next: Arc<[BoxedListener<P>]> = match entries.get(&kind) {
            Some(current) => current
                .iter()
                .cloned()
                .chain(std::iter::once(listener))
                .collect(),
            None => Arc::from(vec![listener]),
        };
        debug!(kind = ?kind, listeners = next.len(), "Listener registered");
        entries.insert(kind, next);
    }

    /// Snapshot of the listeners bound to `kind`.
    pub fn listeners(&self, kind: &K) -> Option<Arc<[BoxedListener<P>]>> {
        self.entries.read().get(kind).cloned()
    }

    /// Number of listeners bound to `kind`.
    pub fn listener_count(&self, kind: &K) -> usize {
        self.entries.read().get(kind).map_or(0, |l| l.len())
    }

    /// Kinds with at least one listener.
    pub fn kinds(&self) -> Vec<K> {
        self.entries.read().keys().cloned().collect()
    }

    /// Invokes every listener bound to `kind` and waits for all of them.
    ///
    /// Listeners are started in registration order and run concurrently.
    /// Outcomes are returned in the same order. Failures are logged and
    /// reported, never propagated.
    pub async fn dispatch(
        &self,
        kind: &K,
        payload: P,
        ctx: Arc<DispatchContext>,
    ) -> Vec<ListenerOutcome> {
        let Some(listeners) = self.listeners(kind) else {
            return Vec::new();
        };

        let span = span!(Level::DEBUG, "dispatch", kind = ?kind, backend = %ctx.backend());

        let calls = listeners.iter().cloned().map(|listener| {
            let request = (Arc::clone(&ctx), payload.clone());
            AssertUnwindSafe(listener.oneshot(request))
                .catch_unwind()
                .map(|result| match result {
                    Ok(result) => ListenerOutcome::from_result(result),
                    Err(_) => ListenerOutcome::Failed("listener panicked".into()),
                })
                .boxed()
        });
        let outcomes = join_all(calls).instrument(span).await;

        for (index, outcome) in outcomes.iter().enumerate() {
            match outcome {
                ListenerOutcome::Completed => {}
                ListenerOutcome::DecodeFailed(e) => {
                    warn!(kind = ?kind, listener = index, error = %e, "Unable to decode payload for listener");
                }
                ListenerOutcome::Failed(e) => {
                    error!(kind = ?kind, listener = index, error = %e, "Listener returned an error");
                }
            }
        }

        outcomes
    }
}

impl<K: EventKind> DispatchTable<K, RawPayload> {
    /// Registers `handler` for a backend-scoped binding.
    ///
    /// The handler only runs for payloads that decode to `T`.
    pub fn listen<T, F, Fut, R>(&self, event: TypedEvent<K, T>, handler: F)
    where
        T: Payload,
        F: Fn(Arc<DispatchContext>, T) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: ListenerResponse,
    {
        self.register(
            event.into_kind(),
            TypedListener::new(decode_raw::<T>, handler),
        );
    }
}

impl DispatchTable<GlobalEvent, GlobalPayload> {
    /// Registers `handler` for a canonical binding.
    pub fn listen_global<T, F, Fut, R>(&self, event: TypedEvent<GlobalEvent, T>, handler: F)
    where
        T: GlobalContent,
        F: Fn(Arc<DispatchContext>, T) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: ListenerResponse,
    {
        self.register(
            event.into_kind(),
            TypedListener::new(extract_global::<T>, handler),
        );
    }
}

impl<K, P> fmt::Debug for DispatchTable<K, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchTable")
            .field("kinds", &self.entries.read().len())
            .finish_non_exhaustive()
    }
}
