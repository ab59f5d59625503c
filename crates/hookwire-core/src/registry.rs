//! Translation and decoding tables for backend event kinds.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{DecodeError, DecodeResult};
use crate::event::{EventKind, GlobalEvent, GlobalPayload};

type GlobalDecoder = Arc<dyn Fn(&[u8]) -> DecodeResult<GlobalPayload> + Send + Sync>;

/// Lookup table from a backend's native kinds to canonical kinds, plus the
/// decoder producing each canonical payload.
///
/// Backends build one at construction and delegate [`Backend::translate`] and
/// [`Backend::decode_global`] to it.
///
/// ```rust,ignore
/// let registry = EventRegistry::new()
///     .translate_kind(ConsoleKind::Line, GlobalEvent::MessageCreate)
///     .decoder(GlobalEvent::MessageCreate, |raw| {
///         let line: ConsoleLine = decode_json(raw)?;
///         Ok(GlobalPayload::Message(Arc::new(line)))
///     });
/// ```
///
/// [`Backend::translate`]: crate::backend::Backend::translate
/// [`Backend::decode_global`]: crate::backend::Backend::decode_global
pub struct EventRegistry<K> {
    translations: HashMap<K, GlobalEvent>,
    decoders: HashMap<GlobalEvent, GlobalDecoder>,
}

impl<K: EventKind> Default for EventRegistry<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: EventKind> EventRegistry<K> {
    /// Creates an empty registry. Every kind is untranslated.
    pub fn new() -> Self {
        Self {
            translations: HashMap::new(),
            decoders: HashMap::new(),
        }
    }

    /// Maps native `kind` to canonical `global`.
    pub fn translate_kind(mut self, kind: K, global: GlobalEvent) -> Self {
        self.translations.insert(kind, global);
        self
    }

    /// Sets the decoder producing payloads of canonical `kind`.
    pub fn decoder<F>(mut self, kind: GlobalEvent, decode: F) -> Self
    where
        F: Fn(&[u8]) -> DecodeResult<GlobalPayload> + Send + Sync + 'static,
    {
        self.decoders.insert(kind, Arc::new(decode));
        self
    }

    /// Canonical kind for `kind`, if any.
    pub fn translate(&self, kind: &K) -> Option<GlobalEvent> {
        self.translations.get(kind).copied()
    }

    /// Decodes `raw` as a payload of canonical `kind`.
    pub fn decode(&self, kind: GlobalEvent, raw: &[u8]) -> DecodeResult<GlobalPayload> {
        let decoder = self
            .decoders
            .get(&kind)
            .ok_or_else(|| DecodeError::unsupported(kind))?;
        let payload = decoder(raw)?;
        if payload.kind() != kind {
            return Err(DecodeError::mismatch(kind, payload.kind()));
        }
        Ok(payload)
    }
}

impl<K: fmt::Debug> fmt::Debug for EventRegistry<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventRegistry")
            .field("translations", &self.translations)
            .field("decoders", &self.decoders.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackendResult;
    use crate::message::{Channel, Message, Reaction, User};
    use async_trait::async_trait;

    struct Nobody;

    impl User for Nobody {
        fn id(&self) -> Option<&str> {
            None
        }

        fn mention(&self) -> String {
            "@nobody".into()
        }
    }

    struct Thumbs;

    impl Reaction for Thumbs {
        fn user(&self) -> Arc<dyn User> {
            Arc::new(Nobody)
        }

        fn content(&self) -> &str {
            "+1"
        }
    }

    struct Void;

    #[async_trait]
    impl Channel for Void {
        fn id(&self) -> &str {
            "void"
        }

        fn mention(&self) -> String {
            "#void".into()
        }

        async fn send(&self, _content: &str) -> BackendResult<()> {
            Ok(())
        }
    }

    struct Text(String);

    impl Message for Text {
        fn content(&self) -> &str {
            &self.0
        }

        fn author(&self) -> Arc<dyn User> {
            Arc::new(Nobody)
        }

        fn channel(&self) -> Arc<dyn Channel> {
            Arc::new(Void)
        }
    }

    fn registry() -> EventRegistry<&'static str> {
        EventRegistry::new()
            .translate_kind("msg", GlobalEvent::MessageCreate)
            .translate_kind("react", GlobalEvent::ReactionAdd)
            .decoder(GlobalEvent::MessageCreate, |raw| {
                let text = std::str::from_utf8(raw).map_err(|e| DecodeError::new("text", e))?;
                Ok(GlobalPayload::Message(Arc::new(Text(text.to_owned()))))
            })
    }

    #[test]
    fn test_unknown_kind_is_untranslated() {
        let registry = registry();
        assert_eq!(registry.translate(&"msg"), Some(GlobalEvent::MessageCreate));
        assert_eq!(registry.translate(&"typing"), None);
    }

    #[test]
    fn test_decode_message() {
        let payload = registry().decode(GlobalEvent::MessageCreate, b"hi").unwrap();
        assert_eq!(payload.as_message().unwrap().content(), "hi");
    }

    #[test]
    fn test_decode_failure_is_reported() {
        let err = registry()
            .decode(GlobalEvent::MessageCreate, &[0xff, 0xfe])
            .unwrap_err();
        assert_eq!(err.target, "text");
    }

    #[test]
    fn test_missing_decoder() {
        let err = registry().decode(GlobalEvent::ReactionAdd, b"").unwrap_err();
        assert_eq!(err, DecodeError::unsupported(GlobalEvent::ReactionAdd));
    }

    #[test]
    fn test_decoder_returning_wrong_variant() {
        let registry = EventRegistry::<&'static str>::new().decoder(GlobalEvent::MessageCreate, |_| {
            Ok(GlobalPayload::Reaction(Arc::new(Thumbs)))
        });
        let err = registry.decode(GlobalEvent::MessageCreate, b"").unwrap_err();
        assert_eq!(
            err,
            DecodeError::mismatch(GlobalEvent::MessageCreate, GlobalEvent::ReactionAdd)
        );
    }
}
