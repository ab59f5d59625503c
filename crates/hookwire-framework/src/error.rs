//! Error types for the Hookwire framework.

use thiserror::Error;

/// Errors raised while registering or invoking commands.
///
/// Registration errors ([`ConsumingArgumentIsNotLast`], [`ArgumentCannotConsume`],
/// [`CommandRedeclaration`]) are returned to the caller of `register`.
/// Invocation errors are caught by the router and translated into a reply.
///
/// [`ConsumingArgumentIsNotLast`]: CommandError::ConsumingArgumentIsNotLast
/// [`ArgumentCannotConsume`]: CommandError::ArgumentCannotConsume
/// [`CommandRedeclaration`]: CommandError::CommandRedeclaration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// A required argument had no token.
    #[error("missing argument `{0}`")]
    ArgumentNotFound(String),

    /// A token could not be converted to the argument's type.
    #[error("unable to convert `{0}` to {1}")]
    UnableToConvertArgument(String, String),

    /// A consuming argument is followed by another argument.
    #[error("consuming argument `{0}` must be the last argument")]
    ConsumingArgumentIsNotLast(String),

    /// An argument is marked consuming but its type cannot absorb several tokens.
    #[error("argument `{0}` is consuming but its type cannot consume")]
    ArgumentCannotConsume(String),

    /// A permission check rejected the invocation.
    #[error("invalid permissions")]
    InvalidPermissions,

    /// The trigger or an alias collides with a registered command of the same group.
    #[error("command `{0}` is already declared")]
    CommandRedeclaration(String),
}

/// Result type for command operations.
pub type CommandResult<T> = Result<T, CommandError>;
