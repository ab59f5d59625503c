//! Event kinds, typed bindings and payload decoding.
//!
//! Every backend declares its own native event kinds (usually a small enum).
//! Some of those kinds translate to a [`GlobalEvent`], the backend-independent
//! vocabulary used by cross-backend listeners and by the command router.
//!
//! A [`TypedEvent`] binds a kind to the payload type its listeners receive:
//!
//! ```rust,ignore
//! #[derive(Debug, Clone, PartialEq, Eq, Hash)]
//! enum DiscordKind { MessageCreate, GuildJoin }
//!
//! #[derive(Deserialize)]
//! struct GuildJoin { guild_id: String }
//! json_payload!(GuildJoin);
//!
//! const GUILD_JOIN: TypedEvent<DiscordKind, GuildJoin> = TypedEvent::new(DiscordKind::GuildJoin);
//! ```

use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::error::{DecodeError, DecodeResult};
use crate::message::{Message, Reaction};

/// Undecoded bytes delivered by a backend.
pub type RawPayload = Arc<[u8]>;

// =============================================================================
// Kinds
// =============================================================================

/// An event identifier usable as a dispatch table key.
///
/// Implemented for every type with value equality and hashing, so backends
/// can use plain enums or strings as their native kinds.
pub trait EventKind: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

impl<T> EventKind for T where T: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

/// Canonical, backend-independent event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GlobalEvent {
    /// A message was posted. Carries a [`Message`].
    MessageCreate,
    /// A reaction was added to a message. Carries a [`Reaction`].
    ReactionAdd,
}

impl GlobalEvent {
    /// All canonical kinds.
    pub const ALL: [GlobalEvent; 2] = [GlobalEvent::MessageCreate, GlobalEvent::ReactionAdd];

    /// Stable name of the kind.
    pub const fn name(self) -> &'static str {
        match self {
            Self::MessageCreate => "message_create",
            Self::ReactionAdd => "reaction_add",
        }
    }
}

impl fmt::Display for GlobalEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Payloads
// =============================================================================

/// A payload type that can be decoded from raw backend bytes.
pub trait Payload: Sized + Send + Sync + 'static {
    /// Decodes the payload, reporting failures instead of coercing.
    fn decode(raw: &[u8]) -> DecodeResult<Self>;
}

/// Decodes a JSON payload with `serde_json`.
pub fn decode_json<T: DeserializeOwned>(raw: &[u8]) -> DecodeResult<T> {
    serde_json::from_slice(raw).map_err(|e| DecodeError::new(std::any::type_name::<T>(), e))
}

/// Implements [`Payload`] for types that deserialize from JSON.
///
/// ```rust,ignore
/// #[derive(Deserialize)]
/// struct Typing { user_id: String }
///
/// json_payload!(Typing);
/// ```
#[macro_export]
macro_rules! json_payload {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::event::Payload for $ty {
                fn decode(raw: &[u8]) -> $crate::error::DecodeResult<Self> {
                    $crate::event::decode_json(raw)
                }
            }
        )+
    };
}

/// A decoded canonical payload.
///
/// Canonical kinds carry a fixed set of shapes, so the payload is a tagged
/// variant rather than a type-erased value.
#[derive(Clone)]
pub enum GlobalPayload {
    /// Payload of [`GlobalEvent::MessageCreate`].
    Message(Arc<dyn Message>),
    /// Payload of [`GlobalEvent::ReactionAdd`].
    Reaction(Arc<dyn Reaction>),
}

impl GlobalPayload {
    /// The canonical kind this payload belongs to.
    pub fn kind(&self) -> GlobalEvent {
        match self {
            Self::Message(_) => GlobalEvent::MessageCreate,
            Self::Reaction(_) => GlobalEvent::ReactionAdd,
        }
    }

    /// Returns the message, if this is a message payload.
    pub fn as_message(&self) -> Option<&Arc<dyn Message>> {
        match self {
            Self::Message(message) => Some(message),
            Self::Reaction(_) => None,
        }
    }
}

impl fmt::Debug for GlobalPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Message(message) => f
                .debug_struct("Message")
                .field("content", &message.content())
                .finish_non_exhaustive(),
            Self::Reaction(reaction) => f
                .debug_struct("Reaction")
                .field("content", &reaction.content())
                .finish_non_exhaustive(),
        }
    }
}

/// A value that can be extracted from a [`GlobalPayload`].
pub trait GlobalContent: Sized + Send + Sync + 'static {
    /// The canonical kind carrying this value.
    const KIND: GlobalEvent;

    /// Extracts the value, or `None` if the payload is of another kind.
    fn from_payload(payload: &GlobalPayload) -> Option<Self>;
}

impl GlobalContent for Arc<dyn Message> {
    const KIND: GlobalEvent = GlobalEvent::MessageCreate;

    fn from_payload(payload: &GlobalPayload) -> Option<Self> {
        match payload {
            GlobalPayload::Message(message) => Some(Arc::clone(message)),
            GlobalPayload::Reaction(_) => None,
        }
    }
}

impl GlobalContent for Arc<dyn Reaction> {
    const KIND: GlobalEvent = GlobalEvent::ReactionAdd;

    fn from_payload(payload: &GlobalPayload) -> Option<Self> {
        match payload {
            GlobalPayload::Reaction(reaction) => Some(Arc::clone(reaction)),
            GlobalPayload::Message(_) => None,
        }
    }
}

// =============================================================================
// Typed bindings
// =============================================================================

/// Binds an event kind to the payload type its listeners receive.
pub struct TypedEvent<K, T> {
    kind: K,
    _payload: PhantomData<fn() -> T>,
}

impl<K, T> TypedEvent<K, T> {
    /// Creates a binding for `kind`.
    pub const fn new(kind: K) -> Self {
        Self {
            kind,
            _payload: PhantomData,
        }
    }

    /// The bound kind.
    pub fn kind(&self) -> &K {
        &self.kind
    }

    /// Consumes the binding, returning its kind.
    pub fn into_kind(self) -> K {
        self.kind
    }
}

impl<K: Clone, T> Clone for TypedEvent<K, T> {
    fn clone(&self) -> Self {
        Self::new(self.kind.clone())
    }
}

impl<K: Copy, T> Copy for TypedEvent<K, T> {}

impl<K: fmt::Debug, T> fmt::Debug for TypedEvent<K, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedEvent")
            .field("kind", &self.kind)
            .field("payload", &std::any::type_name::<T>())
            .finish()
    }
}

/// Messages posted on any backend.
pub const MESSAGE_CREATE: TypedEvent<GlobalEvent, Arc<dyn Message>> =
    TypedEvent::new(GlobalEvent::MessageCreate);

/// Reactions added on any backend.
pub const REACTION_ADD: TypedEvent<GlobalEvent, Arc<dyn Reaction>> =
    TypedEvent::new(GlobalEvent::ReactionAdd);

pub(crate) fn decode_raw<T: Payload>(raw: &RawPayload) -> DecodeResult<T> {
    T::decode(raw)
}

pub(crate) fn extract_global<T: GlobalContent>(payload: &GlobalPayload) -> DecodeResult<T> {
    T::from_payload(payload).ok_or_else(|| DecodeError::mismatch(T::KIND, payload.kind()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Typing {
        user_id: String,
    }

    json_payload!(Typing);

    #[test]
    fn test_json_payload_decodes() {
        let typing = Typing::decode(br#"{"user_id":"u1"}"#).unwrap();
        assert_eq!(typing.user_id, "u1");
    }

    #[test]
    fn test_json_payload_reports_failure() {
        let err = Typing::decode(b"not json").unwrap_err();
        assert!(err.target.contains("Typing"));
    }

    #[test]
    fn test_typed_event_is_copy_for_copy_kinds() {
        let event = MESSAGE_CREATE;
        let again = event;
        assert_eq!(event.kind(), again.kind());
    }

    #[test]
    fn test_global_event_names() {
        assert_eq!(GlobalEvent::MessageCreate.to_string(), "message_create");
        assert_eq!(GlobalEvent::ReactionAdd.name(), "reaction_add");
    }
}
