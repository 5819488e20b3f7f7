//! Token predicates and the value types they range over.

use std::cmp::Ordering;
use std::fmt;

use crate::error::ModelError;
use crate::switch::Comparison;

/// Closed set of value types a dispatcher can switch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TokenKind {
    Bool,
    Char,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Str,
}

impl TokenKind {
    pub const ALL: [TokenKind; 13] = [
        TokenKind::Bool,
        TokenKind::Char,
        TokenKind::I8,
        TokenKind::I16,
        TokenKind::I32,
        TokenKind::I64,
        TokenKind::U8,
        TokenKind::U16,
        TokenKind::U32,
        TokenKind::U64,
        TokenKind::F32,
        TokenKind::F64,
        TokenKind::Str,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Char => "char",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::Str => "str",
        }
    }

    /// Whether range tokens are allowed for this kind.
    pub fn is_orderable(self) -> bool {
        !matches!(self, Self::Bool)
    }

    /// The operator used to tell apart values that share a switch hash.
    pub fn comparison(self) -> Comparison {
        match self {
            Self::Bool
            | Self::Char
            | Self::I8
            | Self::I16
            | Self::I32
            | Self::U8
            | Self::U16
            | Self::U32
            | Self::F32 => Comparison::Identity,
            Self::I64 | Self::U64 => Comparison::Value,
            Self::F64 => Comparison::Bits,
            Self::Str => Comparison::Content,
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A value a machine can dispatch on.
///
/// `switch_hash` follows boxed-value hashing conventions so that dispatch
/// tables stay compact for small integers while wide types fold into 32 bits.
/// Two values with the same hash are told apart with `same`, never with the
/// hash alone.
pub trait TokenValue: Clone + fmt::Debug + Send + Sync + 'static {
    const KIND: TokenKind;

    fn switch_hash(&self) -> i32;

    /// Exact equality. Floats compare by canonical bit pattern, so `NaN`
    /// equals `NaN` and `0.0` differs from `-0.0`.
    fn same(&self, other: &Self) -> bool;

    /// Total order used by range tokens, `None` for unorderable kinds.
    fn order(&self, other: &Self) -> Option<Ordering>;
}

macro_rules! narrow_token_value {
    ($($ty:ty => $kind:ident),* $(,)?) => {$(
        impl TokenValue for $ty {
            const KIND: TokenKind = TokenKind::$kind;

            #[inline]
            fn switch_hash(&self) -> i32 {
                *self as i32
            }

            #[inline]
            fn same(&self, other: &Self) -> bool {
                self == other
            }

            #[inline]
            fn order(&self, other: &Self) -> Option<Ordering> {
                Some(self.cmp(other))
            }
        }
    )*};
}

narrow_token_value!(
    i8 => I8,
    i16 => I16,
    i32 => I32,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    char => Char,
);

macro_rules! wide_token_value {
    ($($ty:ty => $kind:ident),* $(,)?) => {$(
        impl TokenValue for $ty {
            const KIND: TokenKind = TokenKind::$kind;

            #[inline]
            fn switch_hash(&self) -> i32 {
                fold_u64(*self as u64)
            }

            #[inline]
            fn same(&self, other: &Self) -> bool {
                self == other
            }

            #[inline]
            fn order(&self, other: &Self) -> Option<Ordering> {
                Some(self.cmp(other))
            }
        }
    )*};
}

wide_token_value!(i64 => I64, u64 => U64);

impl TokenValue for bool {
    const KIND: TokenKind = TokenKind::Bool;

    #[inline]
    fn switch_hash(&self) -> i32 {
        if *self { 1231 } else { 1237 }
    }

    #[inline]
    fn same(&self, other: &Self) -> bool {
        self == other
    }

    fn order(&self, _other: &Self) -> Option<Ordering> {
        None
    }
}

impl TokenValue for f32 {
    const KIND: TokenKind = TokenKind::F32;

    #[inline]
    fn switch_hash(&self) -> i32 {
        f32_bits(*self) as i32
    }

    #[inline]
    fn same(&self, other: &Self) -> bool {
        f32_bits(*self) == f32_bits(*other)
    }

    fn order(&self, other: &Self) -> Option<Ordering> {
        Some(f32::from_bits(f32_bits(*self)).total_cmp(&f32::from_bits(f32_bits(*other))))
    }
}

impl TokenValue for f64 {
    const KIND: TokenKind = TokenKind::F64;

    #[inline]
    fn switch_hash(&self) -> i32 {
        fold_u64(f64_bits(*self))
    }

    #[inline]
    fn same(&self, other: &Self) -> bool {
        f64_bits(*self) == f64_bits(*other)
    }

    fn order(&self, other: &Self) -> Option<Ordering> {
        Some(f64::from_bits(f64_bits(*self)).total_cmp(&f64::from_bits(f64_bits(*other))))
    }
}

impl TokenValue for String {
    const KIND: TokenKind = TokenKind::Str;

    #[inline]
    fn switch_hash(&self) -> i32 {
        str_hash(self)
    }

    #[inline]
    fn same(&self, other: &Self) -> bool {
        self == other
    }

    fn order(&self, other: &Self) -> Option<Ordering> {
        Some(self.as_str().cmp(other.as_str()))
    }
}

impl TokenValue for &'static str {
    const KIND: TokenKind = TokenKind::Str;

    #[inline]
    fn switch_hash(&self) -> i32 {
        str_hash(self)
    }

    #[inline]
    fn same(&self, other: &Self) -> bool {
        self == other
    }

    fn order(&self, other: &Self) -> Option<Ordering> {
        Some((*self).cmp(*other))
    }
}

#[inline]
fn fold_u64(bits: u64) -> i32 {
    (bits ^ (bits >> 32)) as i32
}

#[inline]
fn f32_bits(value: f32) -> u32 {
    if value.is_nan() { 0x7fc0_0000 } else { value.to_bits() }
}

#[inline]
fn f64_bits(value: f64) -> u64 {
    if value.is_nan() {
        0x7ff8_0000_0000_0000
    } else {
        value.to_bits()
    }
}

/// Polynomial hash over UTF-16 code units.
pub fn str_hash(value: &str) -> i32 {
    value
        .encode_utf16()
        .fold(0i32, |hash, unit| hash.wrapping_mul(31).wrapping_add(i32::from(unit)))
}

/// Inclusive range check shared by the table interpreter and generated code.
#[inline]
pub fn within<T: TokenValue>(value: &T, start: &T, end: &T) -> bool {
    matches!(value.order(start), Some(Ordering::Greater | Ordering::Equal))
        && matches!(value.order(end), Some(Ordering::Less | Ordering::Equal))
}

/// Predicate attached to a conditional transition.
#[derive(Debug, Clone)]
pub enum Token<T> {
    /// Matches exactly one value.
    Single(T),
    /// Matches any of two or more distinct values.
    Set(Vec<T>),
    /// Matches `start <= v <= end`.
    Range { start: T, end: T },
}

impl<T: TokenValue> Token<T> {
    pub fn single(value: T) -> Self {
        Self::Single(value)
    }

    /// Collects distinct values into a set token. A single distinct value
    /// collapses into [`Token::Single`].
    pub fn set(values: impl IntoIterator<Item = T>) -> Self {
        let mut distinct: Vec<T> = Vec::new();
        for value in values {
            if !distinct.iter().any(|seen| seen.same(&value)) {
                distinct.push(value);
            }
        }
        if distinct.len() == 1
            && let Some(value) = distinct.pop()
        {
            return Self::Single(value);
        }
        Self::Set(distinct)
    }

    pub fn range(start: T, end: T) -> Result<Self, ModelError> {
        let token = Self::Range { start, end };
        token.validate()?;
        Ok(token)
    }

    /// Every value the token names explicitly. Ranges yield their two
    /// boundaries.
    pub fn values(&self) -> impl Iterator<Item = &T> + '_ {
        let (head, tail): (&[T], Option<&T>) = match self {
            Self::Single(value) => (std::slice::from_ref(value), None),
            Self::Set(values) => (values.as_slice(), None),
            Self::Range { start, end } => (std::slice::from_ref(start), Some(end)),
        };
        head.iter().chain(tail)
    }

    pub fn matches(&self, value: &T) -> bool {
        match self {
            Self::Single(expected) => expected.same(value),
            Self::Set(values) => values.iter().any(|expected| expected.same(value)),
            Self::Range { start, end } => within(value, start, end),
        }
    }

    pub fn is_range(&self) -> bool {
        matches!(self, Self::Range { .. })
    }

    pub(crate) fn validate(&self) -> Result<(), ModelError> {
        match self {
            Self::Single(_) => Ok(()),
            Self::Set(values) => {
                let mut distinct = 0;
                for (i, value) in values.iter().enumerate() {
                    if !values[..i].iter().any(|seen| seen.same(value)) {
                        distinct += 1;
                    }
                }
                if distinct < 2 {
                    return Err(ModelError::DegenerateSet(distinct));
                }
                Ok(())
            }
            Self::Range { start, end } => {
                if !T::KIND.is_orderable() {
                    return Err(ModelError::UnorderedRange(T::KIND));
                }
                match start.order(end) {
                    Some(Ordering::Less) => Ok(()),
                    _ => Err(ModelError::InvalidRange {
                        start: format!("{start:?}"),
                        end: format!("{end:?}"),
                    }),
                }
            }
        }
    }

    /// Construction-order independent rendering used by fingerprints.
    pub(crate) fn canonical(&self) -> String {
        match self {
            Self::Single(value) => format!("={value:?}"),
            Self::Set(values) => {
                let mut rendered: Vec<String> = values.iter().map(|v| format!("{v:?}")).collect();
                rendered.sort();
                rendered.dedup();
                format!("{{{}}}", rendered.join(","))
            }
            Self::Range { start, end } => format!("[{start:?}..={end:?}]"),
        }
    }
}

impl<T: TokenValue> PartialEq for Token<T> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Single(a), Self::Single(b)) => a.same(b),
            (Self::Set(a), Self::Set(b)) => {
                a.iter().all(|x| b.iter().any(|y| x.same(y)))
                    && b.iter().all(|y| a.iter().any(|x| x.same(y)))
            }
            (Self::Range { start: a, end: b }, Self::Range { start: c, end: d }) => {
                a.same(c) && b.same(d)
            }
            _ => false,
        }
    }
}

impl<T: TokenValue> fmt::Display for Token<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(value) => write!(f, "{value:?}"),
            Self::Set(values) => {
                f.write_str("{")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{value:?}")?;
                }
                f.write_str("}")
            }
            Self::Range { start, end } => write!(f, "{start:?}..={end:?}"),
        }
    }
}
