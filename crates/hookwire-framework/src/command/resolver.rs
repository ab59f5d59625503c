//! Token-to-value resolution for command arguments.
//!
//! [`resolve`] walks the argument specs in order with a cursor over the
//! tokens. A single-token argument takes the token under the cursor and
//! advances it; a consuming argument takes everything left. An optional
//! argument that resolves to nothing leaves the cursor where it was, so the
//! following argument still sees that token.

use tracing::trace;

use super::argument::{ArgValue, ArgumentSpec, FromArgValue};
use crate::error::{CommandError, CommandResult};

/// The outcome of resolving one argument.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedArgument {
    /// Argument name.
    pub name: String,
    /// Text the value was converted from.
    pub raw: Option<String>,
    /// Converted value, `None` for an absent optional argument.
    pub value: Option<ArgValue>,
}

impl ResolvedArgument {
    fn absent(spec: &ArgumentSpec) -> Self {
        Self {
            name: spec.name().to_owned(),
            raw: None,
            value: None,
        }
    }

    fn present(spec: &ArgumentSpec, raw: String, value: ArgValue) -> Self {
        Self {
            name: spec.name().to_owned(),
            raw: Some(raw),
            value: Some(value),
        }
    }
}

/// Resolved arguments of one command invocation, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    values: Vec<ResolvedArgument>,
    unused: Vec<String>,
}

impl Arguments {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ResolvedArgument> {
        self.values.iter()
    }

    fn find(&self, name: &str) -> Option<&ResolvedArgument> {
        self.values.iter().find(|arg| arg.name == name)
    }

    /// Value at declaration position `index`.
    pub fn value(&self, index: usize) -> Option<&ArgValue> {
        self.values.get(index).and_then(|arg| arg.value.as_ref())
    }

    /// Value of the argument called `name`.
    pub fn get_value(&self, name: &str) -> Option<&ArgValue> {
        self.find(name).and_then(|arg| arg.value.as_ref())
    }

    /// Text the argument called `name` was converted from.
    pub fn raw(&self, name: &str) -> Option<&str> {
        self.find(name).and_then(|arg| arg.raw.as_deref())
    }

    /// Reads the argument called `name` as `T`.
    ///
    /// Fails with [`CommandError::ArgumentNotFound`] when the argument is
    /// absent, and with [`CommandError::UnableToConvertArgument`] when its value
    /// is not a `T`.
    pub fn get<T: FromArgValue>(&self, name: &str) -> CommandResult<T> {
        self.optional(name)?
            .ok_or_else(|| CommandError::ArgumentNotFound(name.to_owned()))
    }

    /// Reads the argument called `name` as `T`, `None` when absent.
    pub fn optional<T: FromArgValue>(&self, name: &str) -> CommandResult<Option<T>> {
        let Some(arg) = self.find(name) else {
            return Err(CommandError::ArgumentNotFound(name.to_owned()));
        };
        match &arg.value {
            None => Ok(None),
            Some(value) => T::from_value(value).map(Some).ok_or_else(|| {
                CommandError::UnableToConvertArgument(
                    arg.raw.clone().unwrap_or_default(),
                    T::TYPE_NAME.to_owned(),
                )
            }),
        }
    }

    /// Tokens left over after every argument was resolved.
    pub fn unused(&self) -> &[String] {
        &self.unused
    }

    /// Re-serializes the resolved arguments into whitespace tokens.
    pub fn to_tokens(&self) -> Vec<String> {
        self.values
            .iter()
            .filter_map(|arg| arg.raw.as_deref())
            .flat_map(str::split_whitespace)
            .map(str::to_owned)
            .collect()
    }
}

impl<'a> IntoIterator for &'a Arguments {
    type Item = &'a ResolvedArgument;
    type IntoIter = std::slice::Iter<'a, ResolvedArgument>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

/// Resolves `tokens` against `specs`.
///
/// Pure: the result only depends on the inputs.
pub fn resolve<S: AsRef<str>>(specs: &[ArgumentSpec], tokens: &[S]) -> CommandResult<Arguments> {
    let mut cursor = 0;
    let mut values = Vec::with_capacity(specs.len());

    for spec in specs {
        if spec.is_consuming() {
            let rest = tokens.get(cursor..).unwrap_or_default();
            let joined = rest
                .iter()
                .map(AsRef::as_ref)
                .collect::<Vec<_>>()
                .join(" ");
            if joined.is_empty() {
                if !spec.is_optional() {
                    return Err(CommandError::ArgumentNotFound(spec.name().to_owned()));
                }
                values.push(ResolvedArgument::absent(spec));
                continue;
            }
            match spec.convert(&joined) {
                Some(value) => {
                    cursor = tokens.len();
                    values.push(ResolvedArgument::present(spec, joined, value));
                }
                None if spec.is_optional() => {
                    trace!(argument = spec.name(), raw = %joined, "Optional argument did not convert");
                    values.push(ResolvedArgument::absent(spec));
                }
                None => {
                    return Err(CommandError::UnableToConvertArgument(
                        joined,
                        spec.type_name().into_owned(),
                    ));
                }
            }
            continue;
        }

        // An empty token counts as missing.
        let Some(raw) = tokens
            .get(cursor)
            .map(AsRef::as_ref)
            .filter(|raw: &&str| !raw.is_empty())
        else {
            if !spec.is_optional() {
                return Err(CommandError::ArgumentNotFound(spec.name().to_owned()));
            }
            values.push(ResolvedArgument::absent(spec));
            continue;
        };

        match spec.convert(raw) {
            Some(value) => {
                cursor += 1;
                values.push(ResolvedArgument::present(spec, raw.to_owned(), value));
            }
            None if spec.is_optional() => {
                trace!(argument = spec.name(), raw, "Optional argument did not convert");
                values.push(ResolvedArgument::absent(spec));
            }
            None => {
                return Err(CommandError::UnableToConvertArgument(
                    raw.to_owned(),
                    spec.type_name().into_owned(),
                ));
            }
        }
    }

    let unused = tokens
        .get(cursor..)
        .unwrap_or_default()
        .iter()
        .map(|t| t.as_ref().to_owned())
        .collect();

    Ok(Arguments { values, unused })
}
