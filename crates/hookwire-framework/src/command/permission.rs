//! Permission checks run before a command handler.
//!
//! Checks are synchronous and run in declaration order; the first `false`
//! rejects the invocation with [`CommandError::InvalidPermissions`].
//!
//! [`CommandError::InvalidPermissions`]: crate::error::CommandError::InvalidPermissions

use std::collections::HashSet;

use super::event::CommandEvent;

/// Decides whether an invocation may proceed.
pub trait PermissionCheck: Send + Sync + 'static {
    fn check(&self, event: &CommandEvent) -> bool;
}

impl<F> PermissionCheck for F
where
    F: Fn(&CommandEvent) -> bool + Send + Sync + 'static,
{
    fn check(&self, event: &CommandEvent) -> bool {
        self(event)
    }
}

/// Allows only users whose identifier is listed.
///
/// Users without an identifier are always rejected.
#[derive(Debug, Clone, Default)]
pub struct IdCheck {
    allowed: HashSet<String>,
}

impl IdCheck {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: ids.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether `id` is on the allow-list.
    pub fn allows(&self, id: Option<&str>) -> bool {
        id.is_some_and(|id| self.allowed.contains(id))
    }
}

impl PermissionCheck for IdCheck {
    fn check(&self, event: &CommandEvent) -> bool {
        self.allows(event.user().id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{TestMessage, context};
    use tracing::Span;

    #[test]
    fn test_id_check() {
        let check = IdCheck::new(["1", "2"]);
        assert!(check.allows(Some("1")));
        assert!(!check.allows(Some("3")));
        assert!(!check.allows(None));
    }

    #[tokio::test]
    async fn test_checks_see_the_author() {
        let event = CommandEvent::new(
            "x",
            Vec::new(),
            TestMessage::new("42", "!x"),
            context(),
            Span::none(),
        );
        assert!(IdCheck::new(["42"]).check(&event));
        assert!(!IdCheck::new(["7"]).check(&event));

        let same_channel = |event: &CommandEvent| event.channel().id() == "general";
        assert!(same_channel.check(&event));
    }
}
