//! Positional argument specifications and the types they convert to.
//!
//! An [`ArgumentSpec`] names one positional argument, its [`ArgumentType`],
//! whether it may be absent and whether it absorbs every remaining token.
//!
//! ```rust,ignore
//! let id = ArgumentSpec::required("id", IntArg);
//! let reason = ArgumentSpec::optional("reason", StringArg).consuming();
//!
//! assert_eq!(id.to_string(), "<id:Int>");
//! assert_eq!(reason.to_string(), "[reason:String...]");
//! ```

use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

// =============================================================================
// Values
// =============================================================================

/// A converted argument value.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    String(String),
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
    Uuid(Uuid),
    List(Vec<ArgValue>),
    /// Value produced by a user-defined [`ArgumentType`].
    Custom(CustomValue),
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Int(v) => write!(f, "{v}"),
            Self::UInt(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Uuid(v) => write!(f, "{v}"),
            Self::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
            Self::Custom(_) => f.write_str("<custom>"),
        }
    }
}

/// An opaque value produced by a custom argument type.
#[derive(Clone)]
pub struct CustomValue(Arc<dyn Any + Send + Sync>);

impl CustomValue {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// Borrows the value as `T`, if it is one.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref()
    }
}

impl PartialEq for CustomValue {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for CustomValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CustomValue").finish_non_exhaustive()
    }
}

/// Rust types that can be read out of an [`ArgValue`].
pub trait FromArgValue: Sized {
    /// Name used in conversion errors.
    const TYPE_NAME: &'static str;

    fn from_value(value: &ArgValue) -> Option<Self>;
}

macro_rules! impl_from_arg_value {
    ($($ty:ty => $name:literal, |$v:ident| $body:expr;)+) => {
        $(
            impl FromArgValue for $ty {
                const TYPE_NAME: &'static str = $name;

                fn from_value($v: &ArgValue) -> Option<Self> {
                    $body
                }
            }
        )+
    };
}

impl_from_arg_value! {
    String => "String", |v| match v {
        ArgValue::String(s) => Some(s.clone()),
        ArgValue::Custom(_) => None,
        other => Some(other.to_string()),
    };
    i64 => "Int", |v| match v {
        ArgValue::Int(i) => Some(*i),
        ArgValue::UInt(u) => i64::try_from(*u).ok(),
        _ => None,
    };
    i32 => "Int", |v| i64::from_value(v).and_then(|i| i32::try_from(i).ok());
    u64 => "UInt", |v| match v {
        ArgValue::UInt(u) => Some(*u),
        ArgValue::Int(i) => u64::try_from(*i).ok(),
        _ => None,
    };
    u32 => "UInt", |v| u64::from_value(v).and_then(|u| u32::try_from(u).ok());
    f64 => "Float", |v| match v {
        ArgValue::Float(f) => Some(*f),
        ArgValue::Int(i) => Some(*i as f64),
        ArgValue::UInt(u) => Some(*u as f64),
        _ => None,
    };
    bool => "Bool", |v| match v {
        ArgValue::Bool(b) => Some(*b),
        _ => None,
    };
    Uuid => "UUID", |v| match v {
        ArgValue::Uuid(u) => Some(*u),
        _ => None,
    };
}

impl<T: FromArgValue> FromArgValue for Vec<T> {
    const TYPE_NAME: &'static str = "List";

    fn from_value(value: &ArgValue) -> Option<Self> {
        match value {
            ArgValue::List(items) => items.iter().map(T::from_value).collect(),
            single => T::from_value(single).map(|v| vec![v]),
        }
    }
}

// =============================================================================
// Types
// =============================================================================

/// A type positional arguments can be converted to.
///
/// Implement this to accept domain types as command arguments:
///
/// ```rust,ignore
/// struct DurationArg;
///
/// impl ArgumentType for DurationArg {
///     fn name(&self) -> Cow<'static, str> {
///         "Duration".into()
///     }
///
///     fn convert(&self, raw: &str) -> Option<ArgValue> {
///         let secs = raw.strip_suffix('s')?.parse::<u64>().ok()?;
///         Some(ArgValue::Custom(CustomValue::new(Duration::from_secs(secs))))
///     }
/// }
/// ```
pub trait ArgumentType: Send + Sync + 'static {
    /// Display name, used in help text and conversion errors.
    fn name(&self) -> Cow<'static, str>;

    /// Whether an argument of this type may absorb all remaining tokens.
    fn can_consume(&self) -> bool {
        false
    }

    /// Converts a non-empty token (or joined token run) into a value.
    fn convert(&self, raw: &str) -> Option<ArgValue>;
}

/// Free text. Consuming arguments receive the remaining tokens joined by a space.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringArg;

impl ArgumentType for StringArg {
    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed("String")
    }

    fn can_consume(&self) -> bool {
        true
    }

    fn convert(&self, raw: &str) -> Option<ArgValue> {
        (!raw.is_empty()).then(|| ArgValue::String(raw.to_owned()))
    }
}

/// Signed 64-bit integer.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntArg;

impl ArgumentType for IntArg {
    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed("Int")
    }

    fn convert(&self, raw: &str) -> Option<ArgValue> {
        raw.parse().ok().map(ArgValue::Int)
    }
}

/// Unsigned 64-bit integer.
#[derive(Debug, Clone, Copy, Default)]
pub struct UIntArg;

impl ArgumentType for UIntArg {
    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed("UInt")
    }

    fn convert(&self, raw: &str) -> Option<ArgValue> {
        raw.parse().ok().map(ArgValue::UInt)
    }
}

/// 64-bit float.
#[derive(Debug, Clone, Copy, Default)]
pub struct FloatArg;

impl ArgumentType for FloatArg {
    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed("Float")
    }

    fn convert(&self, raw: &str) -> Option<ArgValue> {
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(ArgValue::Float)
    }
}

/// Boolean: `true/false`, `yes/no`, `on/off`, `1/0`, case-insensitive.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoolArg;

impl ArgumentType for BoolArg {
    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed("Bool")
    }

    fn convert(&self, raw: &str) -> Option<ArgValue> {
        match raw.to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(ArgValue::Bool(true)),
            "false" | "no" | "off" | "0" => Some(ArgValue::Bool(false)),
            _ => None,
        }
    }
}

/// Hyphenated or simple UUID.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidArg;

impl ArgumentType for UuidArg {
    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed("UUID")
    }

    fn convert(&self, raw: &str) -> Option<ArgValue> {
        Uuid::parse_str(raw).ok().map(ArgValue::Uuid)
    }
}

/// Whitespace-separated sequence of a base type.
///
/// Always eligible to consume; every token must convert with the base type.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListArg<T>(pub T);

impl<T: ArgumentType> ArgumentType for ListArg<T> {
    fn name(&self) -> Cow<'static, str> {
        self.0.name()
    }

    fn can_consume(&self) -> bool {
        true
    }

    fn convert(&self, raw: &str) -> Option<ArgValue> {
        let items = raw
            .split_whitespace()
            .map(|token| self.0.convert(token))
            .collect::<Option<Vec<_>>>()?;
        (!items.is_empty()).then_some(ArgValue::List(items))
    }
}

// =============================================================================
// ArgumentSpec
// =============================================================================

/// One positional command argument.
#[derive(Clone)]
pub struct ArgumentSpec {
    name: String,
    ty: Arc<dyn ArgumentType>,
    optional: bool,
    consuming: bool,
}

impl ArgumentSpec {
    /// A required, single-token argument.
    pub fn required(name: impl Into<String>, ty: impl ArgumentType) -> Self {
        Self {
            name: name.into(),
            ty: Arc::new(ty),
            optional: false,
            consuming: false,
        }
    }

    /// An optional, single-token argument.
    pub fn optional(name: impl Into<String>, ty: impl ArgumentType) -> Self {
        Self {
            optional: true,
            ..Self::required(name, ty)
        }
    }

    /// Makes the argument absorb every remaining token.
    pub fn consuming(mut self) -> Self {
        self.consuming = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_name(&self) -> Cow<'static, str> {
        self.ty.name()
    }

    pub fn argument_type(&self) -> &dyn ArgumentType {
        &*self.ty
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn is_consuming(&self) -> bool {
        self.consuming
    }

    /// Converts `raw` with this argument's type.
    pub fn convert(&self, raw: &str) -> Option<ArgValue> {
        self.ty.convert(raw)
    }
}

impl fmt::Display for ArgumentSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (open, close) = if self.optional { ('[', ']') } else { ('<', '>') };
        let rest = if self.consuming { "..." } else { "" };
        write!(f, "{open}{}:{}{rest}{close}", self.name, self.ty.name())
    }
}

impl fmt::Debug for ArgumentSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArgumentSpec")
            .field("name", &self.name)
            .field("type", &self.ty.name())
            .field("optional", &self.optional)
            .field("consuming", &self.consuming)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_readable_forms() {
        assert_eq!(ArgumentSpec::required("id", IntArg).to_string(), "<id:Int>");
        assert_eq!(
            ArgumentSpec::optional("reason", StringArg).to_string(),
            "[reason:String]"
        );
        assert_eq!(
            ArgumentSpec::required("content", StringArg)
                .consuming()
                .to_string(),
            "<content:String...>"
        );
        assert_eq!(
            ArgumentSpec::required("ids", ListArg(UIntArg)).to_string(),
            "<ids:UInt>"
        );
    }

    #[test]
    fn test_builtin_conversions() {
        assert_eq!(IntArg.convert("-7"), Some(ArgValue::Int(-7)));
        assert_eq!(IntArg.convert("seven"), None);
        assert_eq!(UIntArg.convert("-7"), None);
        assert_eq!(FloatArg.convert("2.5"), Some(ArgValue::Float(2.5)));
        assert_eq!(FloatArg.convert("NaN"), None);
        assert_eq!(BoolArg.convert("Yes"), Some(ArgValue::Bool(true)));
        assert_eq!(BoolArg.convert("0"), Some(ArgValue::Bool(false)));
        assert_eq!(StringArg.convert(""), None);
        assert!(matches!(
            UuidArg.convert("67e55044-10b1-426f-9247-bb680e5fe0c8"),
            Some(ArgValue::Uuid(_))
        ));
    }

    #[test]
    fn test_list_converts_every_token() {
        let list = ListArg(IntArg);
        assert!(list.can_consume());
        assert_eq!(
            list.convert("1 2  3"),
            Some(ArgValue::List(vec![
                ArgValue::Int(1),
                ArgValue::Int(2),
                ArgValue::Int(3)
            ]))
        );
        assert_eq!(list.convert("1 two 3"), None);
    }

    #[test]
    fn test_only_text_and_lists_consume() {
        assert!(StringArg.can_consume());
        assert!(!IntArg.can_consume());
        assert!(!UuidArg.can_consume());
    }

    #[test]
    fn test_from_arg_value() {
        assert_eq!(i32::from_value(&ArgValue::Int(5)), Some(5));
        assert_eq!(u64::from_value(&ArgValue::Int(-1)), None);
        assert_eq!(String::from_value(&ArgValue::Int(9)), Some("9".into()));
        assert_eq!(
            Vec::<i64>::from_value(&ArgValue::List(vec![ArgValue::Int(1), ArgValue::Int(2)])),
            Some(vec![1, 2])
        );
    }

    #[test]
    fn test_custom_value_downcast() {
        let value = CustomValue::new(std::time::Duration::from_secs(3));
        assert_eq!(
            value.downcast_ref::<std::time::Duration>(),
            Some(&std::time::Duration::from_secs(3))
        );
        assert!(value.downcast_ref::<String>().is_none());
    }
}
