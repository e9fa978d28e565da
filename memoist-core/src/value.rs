use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// A single argument value of a memoized call.
///
/// `ArgValue` is the closed set of values the key derivation knows how to
/// canonicalize: numbers, strings, booleans, null, ordered sequences and
/// mappings, all recursively. Two extra variants exist so that values
/// *without* a stable representation can still be passed around and rejected
/// with a precise error instead of being hashed by identity:
///
/// * `Set` - an unordered collection (e.g. a `HashSet`)
/// * `Opaque` - any other value, identified only by its type name
///
/// # Examples
///
/// ```
/// use memoist_core::ArgValue;
///
/// let v: ArgValue = vec![1, 2, 3].into();
/// assert_eq!(v, ArgValue::Seq(vec![1.into(), 2.into(), 3.into()]));
///
/// let s: ArgValue = "hello".into();
/// assert_eq!(s.as_str(), Some("hello"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Null,
    Bool(bool),
    /// Every Rust integer type widens losslessly into `i128`.
    Int(i128),
    Float(f64),
    Str(String),
    Seq(Vec<ArgValue>),
    /// Key/value pairs. Entry order is irrelevant for key derivation.
    Map(Vec<(ArgValue, ArgValue)>),
    /// Unordered collection; never canonicalizable.
    Set(Vec<ArgValue>),
    /// Value without a stable representation; never canonicalizable.
    Opaque(&'static str),
}

impl ArgValue {
    /// Wraps a value of type `T` that has no canonical representation.
    ///
    /// Deriving a key from an invocation that contains an opaque value fails
    /// with `KeyError::UnsupportedArgumentType`.
    ///
    /// # Examples
    ///
    /// ```
    /// use memoist_core::ArgValue;
    ///
    /// struct Connection;
    /// let v = ArgValue::opaque::<Connection>();
    /// assert!(!v.is_canonical());
    /// ```
    pub fn opaque<T: ?Sized>() -> Self {
        ArgValue::Opaque(std::any::type_name::<T>())
    }

    /// Short name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            ArgValue::Null => "null",
            ArgValue::Bool(_) => "bool",
            ArgValue::Int(_) => "int",
            ArgValue::Float(_) => "float",
            ArgValue::Str(_) => "string",
            ArgValue::Seq(_) => "sequence",
            ArgValue::Map(_) => "map",
            ArgValue::Set(_) => "set",
            ArgValue::Opaque(name) => name,
        }
    }

    /// Returns `true` if this value and everything nested inside it can be
    /// canonicalized.
    pub fn is_canonical(&self) -> bool {
        match self {
            ArgValue::Set(_) | ArgValue::Opaque(_) => false,
            ArgValue::Seq(items) => items.iter().all(ArgValue::is_canonical),
            ArgValue::Map(entries) => entries
                .iter()
                .all(|(k, v)| k.is_canonical() && v.is_canonical()),
            _ => true,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ArgValue::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ArgValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i128> {
        match self {
            ArgValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view of the value. Integers are converted to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ArgValue::Int(i) => Some(*i as f64),
            ArgValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ArgValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&[ArgValue]> {
        match self {
            ArgValue::Seq(items) => Some(items),
            _ => None,
        }
    }
}

macro_rules! int_from {
    ($($t:ty),*) => {
        $(
            impl From<$t> for ArgValue {
                fn from(value: $t) -> Self {
                    ArgValue::Int(value as i128)
                }
            }
        )*
    };
}

int_from!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, usize);

impl From<bool> for ArgValue {
    fn from(value: bool) -> Self {
        ArgValue::Bool(value)
    }
}

impl From<f32> for ArgValue {
    fn from(value: f32) -> Self {
        ArgValue::Float(value as f64)
    }
}

impl From<f64> for ArgValue {
    fn from(value: f64) -> Self {
        ArgValue::Float(value)
    }
}

impl From<&str> for ArgValue {
    fn from(value: &str) -> Self {
        ArgValue::Str(value.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(value: String) -> Self {
        ArgValue::Str(value)
    }
}

impl From<()> for ArgValue {
    fn from(_: ()) -> Self {
        ArgValue::Null
    }
}

impl<T: Into<ArgValue>> From<Option<T>> for ArgValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(ArgValue::Null, Into::into)
    }
}

impl<T: Into<ArgValue>> From<Vec<T>> for ArgValue {
    fn from(value: Vec<T>) -> Self {
        ArgValue::Seq(value.into_iter().map(Into::into).collect())
    }
}

impl<T: Clone + Into<ArgValue>> From<&[T]> for ArgValue {
    fn from(value: &[T]) -> Self {
        ArgValue::Seq(value.iter().cloned().map(Into::into).collect())
    }
}

impl<T: Into<ArgValue>> From<BTreeSet<T>> for ArgValue {
    fn from(value: BTreeSet<T>) -> Self {
        ArgValue::Seq(value.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<ArgValue>, S> From<HashSet<T, S>> for ArgValue {
    fn from(value: HashSet<T, S>) -> Self {
        ArgValue::Set(value.into_iter().map(Into::into).collect())
    }
}

impl<K: Into<ArgValue>, V: Into<ArgValue>> From<BTreeMap<K, V>> for ArgValue {
    fn from(value: BTreeMap<K, V>) -> Self {
        ArgValue::Map(value.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl<K: Into<ArgValue>, V: Into<ArgValue>, S> From<HashMap<K, V, S>> for ArgValue {
    fn from(value: HashMap<K, V, S>) -> Self {
        ArgValue::Map(value.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// The captured arguments of one call: positional values in call order plus
/// keyword bindings.
///
/// Keyword order is preserved as written at the call site; key derivation
/// sorts the bindings, so it never affects the derived key.
///
/// # Examples
///
/// ```
/// use memoist_core::Args;
///
/// let args = Args::new().arg(12).arg(14).kwarg("scale", 100);
/// assert_eq!(args.len(), 3);
/// assert_eq!(args.positional_len(), 2);
/// assert_eq!(args.get(0).and_then(|v| v.as_int()), Some(12));
/// assert_eq!(args.kwarg_value("scale").and_then(|v| v.as_int()), Some(100));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    positional: Vec<ArgValue>,
    keyword: Vec<(String, ArgValue)>,
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an argument list from positional values only.
    pub fn positional<I, T>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<ArgValue>,
    {
        Self {
            positional: values.into_iter().map(Into::into).collect(),
            keyword: Vec::new(),
        }
    }

    /// Appends a positional argument.
    pub fn arg(mut self, value: impl Into<ArgValue>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Appends a keyword argument.
    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<ArgValue>) -> Self {
        self.keyword.push((name.into(), value.into()));
        self
    }

    /// Number of bindings, positional and keyword.
    pub fn len(&self) -> usize {
        self.positional.len() + self.keyword.len()
    }

    pub fn positional_len(&self) -> usize {
        self.positional.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.keyword.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ArgValue> {
        self.positional.get(index)
    }

    /// Looks up a keyword argument by name (first binding wins).
    pub fn kwarg_value(&self, name: &str) -> Option<&ArgValue> {
        self.keyword
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }

    pub fn positional_values(&self) -> &[ArgValue] {
        &self.positional
    }

    pub fn keyword_values(&self) -> &[(String, ArgValue)] {
        &self.keyword
    }
}
