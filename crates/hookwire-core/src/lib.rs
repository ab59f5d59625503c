//! # Hookwire Core
//!
//! The event model shared by every Hookwire crate:
//!
//! - [`EventKind`], [`GlobalEvent`] and [`TypedEvent`] describe what happened
//!   and which payload type comes with it.
//! - [`Backend`] is the contract a chat-platform connector fulfils: boot,
//!   push `(kind, raw payload)` pairs, translate native kinds to canonical ones
//!   and decode canonical payloads.
//! - [`DispatchTable`] maps kinds to ordered listener lists and fans a single
//!   event out to all of them.
//! - [`Message`], [`User`], [`Channel`] and [`Reaction`] are the
//!   backend-independent views handlers work with.
//!
//! ```text
//! backend ──(kind, raw)──▶ backend DispatchTable ──▶ listeners
//!                 │
//!                 └─ translate + decode ──▶ global DispatchTable ──▶ listeners
//! ```

pub mod backend;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod message;
pub mod registry;

pub use backend::{Backend, BackendId, EventReceiver, EventSender, InboundEvent};
pub use context::DispatchContext;
pub use dispatch::{
    BoxedListener, DispatchTable, ListenerOutcome, ListenerRequest, ListenerResponse,
    TypedListener,
};
pub use error::{BackendError, BackendResult, DecodeError, DecodeResult};
pub use event::{
    EventKind, GlobalContent, GlobalEvent, GlobalPayload, MESSAGE_CREATE, Payload, REACTION_ADD,
    RawPayload, TypedEvent, decode_json,
};
pub use message::{Channel, Message, Reaction, User};
pub use registry::EventRegistry;

pub use tower::BoxError;
