//! Mapping of invocation failures to user-facing replies.

use std::error::Error as StdError;

use super::definition::Command;
use crate::error::CommandError;

/// Turns an invocation failure into reply text.
///
/// Returning `None` suppresses the reply; the failure is still logged.
pub trait ErrorTranslator: Send + Sync + 'static {
    fn translate(&self, command: &Command, error: &(dyn StdError + 'static)) -> Option<String>;
}

impl<F> ErrorTranslator for F
where
    F: Fn(&Command, &(dyn StdError + 'static)) -> Option<String> + Send + Sync + 'static,
{
    fn translate(&self, command: &Command, error: &(dyn StdError + 'static)) -> Option<String> {
        self(command, error)
    }
}

/// Replies with a short description of the failure followed by the usage line.
///
/// Handler errors that are [`CommandError`]s get their specific text; any
/// other error is reported as `Something went wrong!`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultErrorTranslator;

impl DefaultErrorTranslator {
    fn describe(error: &(dyn StdError + 'static)) -> String {
        match error.downcast_ref::<CommandError>() {
            Some(CommandError::ArgumentNotFound(name)) => format!("Missing argument: {name}"),
            Some(CommandError::UnableToConvertArgument(raw, ty)) => {
                format!("Error converting {raw} to {ty}")
            }
            Some(CommandError::InvalidPermissions) => "Invalid permissions!".to_owned(),
            _ => "Something went wrong!".to_owned(),
        }
    }
}

impl ErrorTranslator for DefaultErrorTranslator {
    fn translate(&self, command: &Command, error: &(dyn StdError + 'static)) -> Option<String> {
        Some(format!("{}\nUsage: {}", Self::describe(error), command.help()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::argument::{ArgumentSpec, IntArg};

    fn command() -> Command {
        Command::new("ban").arg(ArgumentSpec::required("id", IntArg))
    }

    #[test]
    fn test_default_texts() {
        let translator = DefaultErrorTranslator;
        let cases = [
            (
                CommandError::ArgumentNotFound("id".into()),
                "Missing argument: id\nUsage: ban <id:Int>",
            ),
            (
                CommandError::UnableToConvertArgument("x".into(), "Int".into()),
                "Error converting x to Int\nUsage: ban <id:Int>",
            ),
            (
                CommandError::InvalidPermissions,
                "Invalid permissions!\nUsage: ban <id:Int>",
            ),
        ];
        for (error, expected) in cases {
            assert_eq!(translator.translate(&command(), &error).as_deref(), Some(expected));
        }
    }

    #[test]
    fn test_foreign_errors_are_generic() {
        let error = std::io::Error::other("disk on fire");
        assert_eq!(
            DefaultErrorTranslator.translate(&command(), &error).as_deref(),
            Some("Something went wrong!\nUsage: ban <id:Int>")
        );
    }
}
