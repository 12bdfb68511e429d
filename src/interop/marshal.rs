//! Type marshaling - script ↔ native conversions
//!
//! Design: one codec pair per supported native type. Decoding never coerces
//! across kinds beyond what the runtime itself treats as equivalent
//! (integer/float subtypes, and the opt-in string/number conversions). The
//! string/number conversions are the runtime's own, so `"0x10"` reads as 16
//! and `0.1 + 0.2` reads as `"0.3"`, exactly as `tonumber`/`tostring` do.

use super::context::CallContext;
use super::types::ValueKind;
use crate::errors::BindError;
use crate::infrastructure::config::{CodecConfig, IntegerCoercion};
use mlua::{Lua, Value};
use num_traits::{NumCast, ToPrimitive};
use std::fmt;

/// Why a script value could not be decoded, described from the script side
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeFailure {
    pub found: String,
}

impl DecodeFailure {
    pub fn new(found: impl Into<String>) -> Self {
        Self { found: found.into() }
    }

    /// Failure naming the runtime's own type of `value`
    pub fn of(value: &Value) -> Self {
        Self::new(value.type_name())
    }
}

/// Native types that can be read from a script argument slot
pub trait FromScript: Sized {
    fn kind() -> ValueKind;

    fn from_script(value: &Value, lua: &Lua, codec: &CodecConfig) -> Result<Self, DecodeFailure>;
}

/// Native types that encode to exactly one script value
pub trait IntoScript {
    fn kind() -> ValueKind;

    fn into_script(self, lua: &Lua) -> Result<Value, BindError>;
}

/// Native return types: pushes 0 or 1 results onto the call context
pub trait ReturnValue {
    fn kind() -> ValueKind;

    fn push_results(self, ctx: &mut CallContext<'_>) -> Result<usize, BindError>;
}

impl<T: IntoScript> ReturnValue for T {
    fn kind() -> ValueKind {
        <T as IntoScript>::kind()
    }

    fn push_results(self, ctx: &mut CallContext<'_>) -> Result<usize, BindError> {
        ctx.push(self)?;
        Ok(1)
    }
}

impl ReturnValue for () {
    fn kind() -> ValueKind {
        ValueKind::Void
    }

    fn push_results(self, _ctx: &mut CallContext<'_>) -> Result<usize, BindError> {
        Ok(0)
    }
}

/// `Err` from a native body becomes a script runtime error
impl<T: ReturnValue, E: fmt::Display> ReturnValue for Result<T, E> {
    fn kind() -> ValueKind {
        T::kind()
    }

    fn push_results(self, ctx: &mut CallContext<'_>) -> Result<usize, BindError> {
        match self {
            Ok(value) => value.push_results(ctx),
            Err(error) => Err(BindError::native(error)),
        }
    }
}

fn float_to_integer(n: f64, coercion: IntegerCoercion) -> Option<i64> {
    match coercion {
        IntegerCoercion::Exact if n.fract() == 0.0 => n.to_i64(),
        IntegerCoercion::Exact => None,
        IntegerCoercion::Truncate => n.trunc().to_i64(),
    }
}

fn decode_integer(value: &Value, lua: &Lua, codec: &CodecConfig) -> Option<i64> {
    match value {
        Value::Integer(i) => Some(*i),
        Value::Number(n) => float_to_integer(*n, codec.integer_coercion),
        Value::String(_) if codec.string_to_number => match lua.coerce_integer(value.clone()) {
            Ok(Some(i)) => Some(i),
            _ => lua
                .coerce_number(value.clone())
                .ok()
                .flatten()
                .and_then(|n| float_to_integer(n, codec.integer_coercion)),
        },
        _ => None,
    }
}

fn decode_float(value: &Value, lua: &Lua, codec: &CodecConfig) -> Option<f64> {
    match value {
        Value::Integer(i) => Some(*i as f64),
        Value::Number(n) => Some(*n),
        Value::String(_) if codec.string_to_number => lua.coerce_number(value.clone()).ok().flatten(),
        _ => None,
    }
}

macro_rules! impl_integer_codec {
    ($($ty:ty),* $(,)?) => {$(
        impl FromScript for $ty {
            fn kind() -> ValueKind {
                ValueKind::Integer
            }

            fn from_script(value: &Value, lua: &Lua, codec: &CodecConfig) -> Result<Self, DecodeFailure> {
                let wide = decode_integer(value, lua, codec).ok_or_else(|| DecodeFailure::of(value))?;
                <$ty as NumCast>::from(wide)
                    .ok_or_else(|| DecodeFailure::new(format!("out-of-range integer {}", wide)))
            }
        }

        impl IntoScript for $ty {
            fn kind() -> ValueKind {
                ValueKind::Integer
            }

            /// Values beyond the runtime's 64-bit signed range are refused
            fn into_script(self, _lua: &Lua) -> Result<Value, BindError> {
                self.to_i64()
                    .map(Value::Integer)
                    .ok_or_else(|| BindError::out_of_range(self))
            }
        }
    )*};
}

impl_integer_codec!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

macro_rules! impl_float_codec {
    ($($ty:ty),* $(,)?) => {$(
        impl FromScript for $ty {
            fn kind() -> ValueKind {
                ValueKind::Number
            }

            fn from_script(value: &Value, lua: &Lua, codec: &CodecConfig) -> Result<Self, DecodeFailure> {
                decode_float(value, lua, codec)
                    .map(|n| n as $ty)
                    .ok_or_else(|| DecodeFailure::of(value))
            }
        }

        impl IntoScript for $ty {
            fn kind() -> ValueKind {
                ValueKind::Number
            }

            fn into_script(self, _lua: &Lua) -> Result<Value, BindError> {
                Ok(Value::Number(self as f64))
            }
        }
    )*};
}

impl_float_codec!(f32, f64);

impl FromScript for bool {
    fn kind() -> ValueKind {
        ValueKind::Boolean
    }

    fn from_script(value: &Value, _lua: &Lua, _codec: &CodecConfig) -> Result<Self, DecodeFailure> {
        match value {
            Value::Boolean(b) => Ok(*b),
            other => Err(DecodeFailure::of(other)),
        }
    }
}

impl IntoScript for bool {
    fn kind() -> ValueKind {
        ValueKind::Boolean
    }

    fn into_script(self, _lua: &Lua) -> Result<Value, BindError> {
        Ok(Value::Boolean(self))
    }
}

impl FromScript for String {
    fn kind() -> ValueKind {
        ValueKind::String
    }

    fn from_script(value: &Value, lua: &Lua, codec: &CodecConfig) -> Result<Self, DecodeFailure> {
        let text = match value {
            Value::String(s) => s.clone(),
            Value::Integer(_) | Value::Number(_) if codec.number_to_string => lua
                .coerce_string(value.clone())
                .ok()
                .flatten()
                .ok_or_else(|| DecodeFailure::of(value))?,
            other => return Err(DecodeFailure::of(other)),
        };

        text.to_str()
            .map(|text| (*text).to_owned())
            .map_err(|_| DecodeFailure::new("non-UTF-8 string"))
    }
}

impl IntoScript for String {
    fn kind() -> ValueKind {
        ValueKind::String
    }

    fn into_script(self, lua: &Lua) -> Result<Value, BindError> {
        Ok(Value::String(lua.create_string(&self)?))
    }
}

impl IntoScript for &'static str {
    fn kind() -> ValueKind {
        ValueKind::String
    }

    fn into_script(self, lua: &Lua) -> Result<Value, BindError> {
        Ok(Value::String(lua.create_string(self)?))
    }
}

/// Borrowed view of a script string
///
/// Holds a reference to the runtime's own string object instead of copying
/// its bytes. Only guaranteed to be valid UTF-8; meant to be consumed within
/// the call that received it.
#[derive(Debug, Clone)]
pub struct StrView {
    inner: mlua::String,
}

impl StrView {
    pub fn to_str(&self) -> Result<mlua::BorrowedStr<'_>, BindError> {
        Ok(self.inner.to_str()?)
    }

    pub fn to_string_lossy(&self) -> String {
        self.inner.to_string_lossy()
    }

    pub fn len(&self) -> usize {
        self.inner.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PartialEq<str> for StrView {
    fn eq(&self, other: &str) -> bool {
        *self.inner.as_bytes() == *other.as_bytes()
    }
}

impl PartialEq<&str> for StrView {
    fn eq(&self, other: &&str) -> bool {
        self == *other
    }
}

impl FromScript for StrView {
    fn kind() -> ValueKind {
        ValueKind::StringView
    }

    fn from_script(value: &Value, _lua: &Lua, _codec: &CodecConfig) -> Result<Self, DecodeFailure> {
        match value {
            Value::String(s) if s.to_str().is_ok() => Ok(Self { inner: s.clone() }),
            Value::String(_) => Err(DecodeFailure::new("non-UTF-8 string")),
            other => Err(DecodeFailure::of(other)),
        }
    }
}

impl IntoScript for StrView {
    fn kind() -> ValueKind {
        ValueKind::StringView
    }

    fn into_script(self, _lua: &Lua) -> Result<Value, BindError> {
        Ok(Value::String(self.inner))
    }
}

/// `nil` maps to `None`
impl<T: FromScript> FromScript for Option<T> {
    fn kind() -> ValueKind {
        <T as FromScript>::kind()
    }

    fn from_script(value: &Value, lua: &Lua, codec: &CodecConfig) -> Result<Self, DecodeFailure> {
        match value {
            Value::Nil => Ok(None),
            other => T::from_script(other, lua, codec).map(Some),
        }
    }
}

impl<T: IntoScript> IntoScript for Option<T> {
    fn kind() -> ValueKind {
        <T as IntoScript>::kind()
    }

    fn into_script(self, lua: &Lua) -> Result<Value, BindError> {
        match self {
            Some(value) => value.into_script(lua),
            None => Ok(Value::Nil),
        }
    }
}
