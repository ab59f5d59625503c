//! Backend connector abstraction.
//!
//! A backend owns the connection to a chat platform. Hookwire consumes three
//! things from it: a `boot` entry point, a stream of `(kind, raw payload)`
//! pairs pushed through an [`EventSender`], and the translation/decoding of
//! native kinds into canonical ones.
//!
//! # Example
//!
//! ```rust,ignore
//! struct Console { registry: EventRegistry<ConsoleKind> }
//!
//! #[async_trait]
//! impl Backend for Console {
//!     type Kind = ConsoleKind;
//!
//!     fn id(&self) -> BackendId {
//!         BackendId::from_static("console")
//!     }
//!
//!     async fn boot(&self, events: EventSender<ConsoleKind>) -> BackendResult<()> {
//!         tokio::spawn(read_stdin(events));
//!         Ok(())
//!     }
//!
//!     fn translate(&self, kind: &ConsoleKind) -> Option<GlobalEvent> {
//!         self.registry.translate(kind)
//!     }
//!
//!     fn decode_global(&self, kind: GlobalEvent, raw: &[u8]) -> DecodeResult<GlobalPayload> {
//!         self.registry.decode(kind, raw)
//!     }
//! }
//! ```

use std::borrow::Cow;
use std::fmt;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::{BackendError, BackendResult, DecodeResult};
use crate::event::{EventKind, GlobalEvent, GlobalPayload, RawPayload};

// =============================================================================
// BackendId
// =============================================================================

/// Identifier of a backend instance, used by command whitelists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BackendId(Cow<'static, str>);

impl BackendId {
    /// Creates an identifier from a static string.
    pub const fn from_static(id: &'static str) -> Self {
        Self(Cow::Borrowed(id))
    }

    /// Creates an identifier from an owned string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(Cow::Owned(id.into()))
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for BackendId {
    fn from(id: &'static str) -> Self {
        Self::from_static(id)
    }
}

impl From<String> for BackendId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

// =============================================================================
// Event channel
// =============================================================================

/// One undecoded event pushed by a backend.
#[derive(Debug, Clone)]
pub struct InboundEvent<K> {
    /// Native event kind.
    pub kind: K,
    /// Raw payload bytes.
    pub raw: RawPayload,
}

/// Sending half of a backend's event stream.
pub struct EventSender<K> {
    tx: mpsc::Sender<InboundEvent<K>>,
}

impl<K> Clone for EventSender<K> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

/// Receiving half of a backend's event stream.
pub struct EventReceiver<K> {
    rx: mpsc::Receiver<InboundEvent<K>>,
}

impl<K: EventKind> EventSender<K> {
    /// Creates a bounded event stream.
    pub fn channel(capacity: usize) -> (EventSender<K>, EventReceiver<K>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (EventSender { tx }, EventReceiver { rx })
    }

    /// Pushes an event, waiting for queue space.
    pub async fn send(&self, kind: K, raw: impl Into<RawPayload>) -> BackendResult<()> {
        self.tx
            .send(InboundEvent {
                kind,
                raw: raw.into(),
            })
            .await
            .map_err(|_| BackendError::ChannelClosed)
    }

    /// Pushes an event without waiting; fails when the queue is full or closed.
    pub fn try_send(&self, kind: K, raw: impl Into<RawPayload>) -> BackendResult<()> {
        self.tx
            .try_send(InboundEvent {
                kind,
                raw: raw.into(),
            })
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => BackendError::send("event queue is full"),
                mpsc::error::TrySendError::Closed(_) => BackendError::ChannelClosed,
            })
    }

    /// Whether the receiving side has gone away.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl<K> EventReceiver<K> {
    /// Receives the next event, or `None` once every sender is dropped.
    pub async fn recv(&mut self) -> Option<InboundEvent<K>> {
        self.rx.recv().await
    }

    /// Stops accepting new events.
    pub fn close(&mut self) {
        self.rx.close();
    }
}

// =============================================================================
// Backend
// =============================================================================

/// A connector delivering events from one chat platform instance.
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    /// Native event kinds of this backend.
    type Kind: EventKind;

    /// Identifier of this backend instance.
    fn id(&self) -> BackendId;

    /// Text that mentions the bot on this backend, used by the mention prefix.
    fn self_mention(&self) -> Option<String> {
        None
    }

    /// Starts delivering events into `events`.
    ///
    /// Implementations typically spawn their receive loop and return.
    async fn boot(&self, events: EventSender<Self::Kind>) -> BackendResult<()>;

    /// Stops the backend.
    async fn shutdown(&self) -> BackendResult<()> {
        Ok(())
    }

    /// Maps a native kind to its canonical kind, if it has one.
    fn translate(&self, kind: &Self::Kind) -> Option<GlobalEvent>;

    /// Decodes a raw payload of a translated kind into its canonical shape.
    fn decode_global(&self, kind: GlobalEvent, raw: &[u8]) -> DecodeResult<GlobalPayload>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_backend_id_display() {
        assert_eq!(BackendId::from("discord").to_string(), "discord");
        assert_eq!(BackendId::new("irc".to_string()), BackendId::from_static("irc"));
    }

    #[tokio::test]
    async fn test_event_channel_delivers_in_order() {
        let (tx, mut rx) = EventSender::channel(4);
        assert_ok!(tx.send("a", b"1".to_vec()).await);
        assert_ok!(tx.send("b", b"2".to_vec()).await);
        drop(tx);

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!((first.kind, &*first.raw), ("a", &b"1"[..]));
        assert_eq!((second.kind, &*second.raw), ("b", &b"2"[..]));
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_send_after_receiver_dropped_fails() {
        let (tx, rx) = EventSender::<&'static str>::channel(1);
        drop(rx);
        assert!(tx.is_closed());
        assert_err!(tx.send("a", Vec::new()).await);
        assert_err!(tx.try_send("a", Vec::new()));
    }
}
