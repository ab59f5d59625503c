//! Plugins bundle commands and listeners under one name.
//!
//! ```rust,ignore
//! struct Moderation;
//!
//! impl Plugin for Moderation {
//!     fn name(&self) -> &str {
//!         "moderation"
//!     }
//!
//!     fn commands(&self) -> Vec<Command> {
//!         vec![Command::new("ban").group("admin").arg(ArgumentSpec::required("id", IntArg))]
//!     }
//!
//!     fn listeners(&self, listeners: &mut ListenerSet) {
//!         listeners.on_global(REACTION_ADD, |_ctx, reaction: Arc<dyn Reaction>| async move {
//!             tracing::info!(emoji = reaction.content(), "reaction");
//!         });
//!     }
//! }
//! ```

use crate::command::Command;
use crate::listener::ListenerSet;

/// A named bundle of commands and listeners.
///
/// Registration adds every command atomically: if any of them is invalid or
/// conflicts with a registered command, nothing from the plugin is registered.
pub trait Plugin: Send + Sync + 'static {
    /// Display name, used in logs.
    fn name(&self) -> &str;

    /// Commands the plugin provides.
    fn commands(&self) -> Vec<Command> {
        Vec::new()
    }

    /// Records the plugin's listeners.
    fn listeners(&self, _listeners: &mut ListenerSet) {}
}
