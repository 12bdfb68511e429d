//! Per-call value stack
//!
//! A `CallContext` owns the arguments of one script → native call and
//! collects the values the native side returns. Positions are 1-based, the
//! way scripts count them.

use super::marshal::{FromScript, IntoScript};
use crate::errors::BindError;
use crate::ffi::object;
use crate::infrastructure::config::CodecConfig;
use mlua::{AnyUserData, Lua, MultiValue, Value};
use smallvec::SmallVec;

pub struct CallContext<'lua> {
    lua: &'lua Lua,
    codec: &'lua CodecConfig,
    args: SmallVec<[Value; 8]>,
    results: SmallVec<[Value; 2]>,
}

impl<'lua> CallContext<'lua> {
    pub fn new(lua: &'lua Lua, codec: &'lua CodecConfig, args: MultiValue) -> Self {
        Self {
            lua,
            codec,
            args: args.into_iter().collect(),
            results: SmallVec::new(),
        }
    }

    #[inline]
    pub fn lua(&self) -> &'lua Lua {
        self.lua
    }

    #[inline]
    pub fn codec(&self) -> &CodecConfig {
        self.codec
    }

    /// Number of arguments the script supplied
    #[inline]
    pub fn len(&self) -> usize {
        self.args.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn value(&self, position: usize) -> Option<&Value> {
        position.checked_sub(1).and_then(|index| self.args.get(index))
    }

    pub fn check_arity(&self, expected: usize) -> Result<(), BindError> {
        if self.len() == expected {
            Ok(())
        } else {
            Err(BindError::arity(expected, self.len()))
        }
    }

    /// Decode the argument at `position`; a missing slot reads as `nil`
    pub fn decode<T: FromScript>(&self, position: usize) -> Result<T, BindError> {
        let nil = Value::Nil;
        let value = self.value(position).unwrap_or(&nil);
        T::from_script(value, self.lua, self.codec)
            .map_err(|failure| BindError::type_mismatch(position, T::kind(), failure.found, self.codec))
    }

    /// Object handle at `position`, checked to carry `T`'s identity
    pub fn receiver<T: 'static>(&self, position: usize) -> Result<AnyUserData, BindError> {
        let nil = Value::Nil;
        object::checked_handle::<T>(self.value(position).unwrap_or(&nil))
    }

    pub fn push<T: IntoScript>(&mut self, value: T) -> Result<(), BindError> {
        let encoded = value.into_script(self.lua)?;
        self.results.push(encoded);
        Ok(())
    }

    #[inline]
    pub fn result_count(&self) -> usize {
        self.results.len()
    }

    pub fn into_results(self) -> MultiValue {
        self.results.into_iter().collect()
    }
}
