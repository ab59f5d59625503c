//! Deferred listener registrations.
//!
//! A [`ListenerSet`] records listener bindings without a table to put them in
//! yet. Global bindings are applied once to the global table; backend-scoped
//! bindings are kept per native kind type and applied to every backend whose
//! kind type matches, including backends registered later.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use hookwire_core::{
    BackendId, DispatchContext, DispatchTable, EventKind, GlobalContent, GlobalEvent,
    GlobalPayload, ListenerResponse, Payload, RawPayload, TypedEvent,
};

type GlobalBinding = Arc<dyn Fn(&DispatchTable<GlobalEvent, GlobalPayload>) + Send + Sync>;
type ScopedBinding<K> = Arc<dyn Fn(&DispatchTable<K, RawPayload>) + Send + Sync>;

struct Scoped<K> {
    backend: Option<BackendId>,
    bind: ScopedBinding<K>,
}

/// Listener bindings waiting to be applied to dispatch tables.
#[derive(Default)]
pub struct ListenerSet {
    global: Vec<GlobalBinding>,
    scoped: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl ListenerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `handler` to a canonical kind on every backend.
    pub fn on_global<T, F, Fut, R>(&mut self, event: TypedEvent<GlobalEvent, T>, handler: F)
    where
        T: GlobalContent,
        F: Fn(Arc<DispatchContext>, T) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: ListenerResponse,
    {
        self.global.push(Arc::new(
            move |table: &DispatchTable<GlobalEvent, GlobalPayload>| {
                table.listen_global(event, handler.clone());
            },
        ));
    }

    /// Binds `handler` to a native kind on every backend using `K`.
    pub fn on<K, T, F, Fut, R>(&mut self, event: TypedEvent<K, T>, handler: F)
    where
        K: EventKind,
        T: Payload,
        F: Fn(Arc<DispatchContext>, T) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: ListenerResponse,
    {
        self.push_scoped(None, event, handler);
    }

    /// Binds `handler` to a native kind on the backend called `backend` only.
    pub fn on_backend<K, T, F, Fut, R>(
        &mut self,
        backend: impl Into<BackendId>,
        event: TypedEvent<K, T>,
        handler: F,
    ) where
        K: EventKind,
        T: Payload,
        F: Fn(Arc<DispatchContext>, T) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: ListenerResponse,
    {
        self.push_scoped(Some(backend.into()), event, handler);
    }

    fn push_scoped<K, T, F, Fut, R>(
        &mut self,
        backend: Option<BackendId>,
        event: TypedEvent<K, T>,
        handler: F,
    ) where
        K: EventKind,
        T: Payload,
        F: Fn(Arc<DispatchContext>, T) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: ListenerResponse,
    {
        let bind: ScopedBinding<K> = Arc::new(move |table: &DispatchTable<K, RawPayload>| {
            table.listen(event.clone(), handler.clone());
        });
        let entry = self
            .scoped
            .entry(TypeId::of::<K>())
            .or_insert_with(|| Box::new(Vec::<Scoped<K>>::new()));
        if let Some(bindings) = entry.downcast_mut::<Vec<Scoped<K>>>() {
            bindings.push(Scoped { backend, bind });
        }
    }

    /// Number of global bindings.
    pub fn global_len(&self) -> usize {
        self.global.len()
    }

    /// Whether no binding of any kind was recorded.
    pub fn is_empty(&self) -> bool {
        self.global.is_empty() && self.scoped.is_empty()
    }

    /// Registers every global binding into `table`. Returns how many were applied.
    pub fn apply_global(&self, table: &DispatchTable<GlobalEvent, GlobalPayload>) -> usize {
        for bind in &self.global {
            bind(table);
        }
        self.global.len()
    }

    /// Registers the bindings for kind type `K` that apply to `backend` into
    /// `table`. Returns how many were applied.
    pub fn apply_scoped<K: EventKind>(
        &self,
        backend: &BackendId,
        table: &DispatchTable<K, RawPayload>,
    ) -> usize {
        let Some(bindings) = self
            .scoped
            .get(&TypeId::of::<K>())
            .and_then(|entry| entry.downcast_ref::<Vec<Scoped<K>>>())
        else {
            return 0;
        };

        let mut applied = 0;
        for scoped in bindings {
            if scoped.backend.as_ref().is_none_or(|id| id == backend) {
                (scoped.bind)(table);
                applied += 1;
            }
        }
        applied
    }
}

impl fmt::Debug for ListenerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerSet")
            .field("global", &self.global.len())
            .field("scoped_kind_types", &self.scoped.len())
            .finish()
    }
}
