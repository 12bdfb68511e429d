//! Object lifecycle - native objects owned by the script runtime
//!
//! The native value is moved into a runtime-allocated userdata block and
//! stamped with its type identifier. The runtime's collector drops it, or
//! `release_handle` drops it earlier; either way the destructor runs once.

use super::identity;
use crate::errors::{BindError, ErrorKind};
use crate::infrastructure::config::CodecConfig;
use crate::infrastructure::logging::{log_handle_created, log_handle_released};
use crate::interop::{DecodeFailure, FromScript, IntoScript, ValueKind};
use mlua::{AnyUserData, Lua, MetaMethod, Table, UserData, UserDataMethods, UserDataRef, UserDataRefMut, Value};
use std::fmt;
use std::marker::PhantomData;

/// Named user value carrying the identifier a handle was created with
pub const STAMP_KEY: &str = "laf.stamp";

/// Registry key of the method table attached for `identifier`
pub fn methods_key(identifier: &str) -> String {
    format!("laf.methods:{}", identifier)
}

/// Userdata payload wrapping one native object
pub struct ObjectHandle<T: 'static> {
    object: Option<T>,
    identifier: &'static str,
}

impl<T: 'static> ObjectHandle<T> {
    #[inline]
    pub fn get(&self) -> Option<&T> {
        self.object.as_ref()
    }

    #[inline]
    pub fn get_mut(&mut self) -> Option<&mut T> {
        self.object.as_mut()
    }

    #[inline]
    pub fn is_live(&self) -> bool {
        self.object.is_some()
    }

    pub fn identifier(&self) -> &'static str {
        self.identifier
    }

    /// Drop the native object now; returns false if it was already gone
    pub fn destroy(&mut self) -> bool {
        match self.object.take() {
            Some(object) => {
                drop(object);
                log_handle_released(self.identifier, true);
                true
            }
            None => false,
        }
    }
}

impl<T: 'static> Drop for ObjectHandle<T> {
    fn drop(&mut self) {
        if self.object.take().is_some() {
            log_handle_released(self.identifier, false);
        }
    }
}

impl<T: 'static> UserData for ObjectHandle<T> {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        // Looked up on every access so tables attached after creation apply
        methods.add_meta_function(MetaMethod::Index, |lua, (handle, key): (AnyUserData, Value)| {
            let Some(identifier) = stamp_of(&handle)? else {
                return Ok(Value::Nil);
            };
            match lua.named_registry_value::<Option<Table>>(&methods_key(&identifier))? {
                Some(table) => table.raw_get::<Value>(key),
                None => Ok(Value::Nil),
            }
        });

        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| {
            let state = if this.is_live() { "live" } else { "released" };
            Ok(format!("{}: {}", this.identifier, state))
        });
    }
}

fn stamp_of(handle: &AnyUserData) -> mlua::Result<Option<String>> {
    handle.named_user_value::<Option<String>>(STAMP_KEY)
}

fn reclaimed(identifier: &str) -> BindError {
    BindError::new(ErrorKind::ReclaimedHandle {
        identifier: identifier.to_string(),
    })
}

/// Userdata in `value` if it is a handle stamped with `expected`,
/// otherwise what was found instead
fn stamped_handle(value: &Value, expected: &str) -> Result<AnyUserData, String> {
    match value {
        Value::UserData(handle) => match stamp_of(handle) {
            Ok(Some(stamp)) if stamp == expected => Ok(handle.clone()),
            Ok(Some(stamp)) => Err(stamp),
            _ => Err("userdata".to_string()),
        },
        other => Err(other.type_name().to_string()),
    }
}

/// Receiver check used by member adapters
pub(crate) fn checked_handle<T: 'static>(value: &Value) -> Result<AnyUserData, BindError> {
    let expected = identity::identifier::<T>()?;
    stamped_handle(value, expected).map_err(|found| BindError::receiver(expected, found))
}

pub(crate) fn borrow_handle<T: 'static>(
    handle: &AnyUserData,
) -> Result<UserDataRef<ObjectHandle<T>>, BindError> {
    Ok(handle.borrow::<ObjectHandle<T>>()?)
}

pub(crate) fn borrow_handle_mut<T: 'static>(
    handle: &AnyUserData,
) -> Result<UserDataRefMut<ObjectHandle<T>>, BindError> {
    Ok(handle.borrow_mut::<ObjectHandle<T>>()?)
}

/// Live object behind a borrowed handle
pub(crate) fn live<T: 'static>(handle: &ObjectHandle<T>) -> Result<&T, BindError> {
    handle.get().ok_or_else(|| reclaimed(handle.identifier))
}

pub(crate) fn live_mut<T: 'static>(handle: &mut ObjectHandle<T>) -> Result<&mut T, BindError> {
    let identifier = handle.identifier;
    handle.get_mut().ok_or_else(|| reclaimed(identifier))
}

/// Move `value` into a new handle owned by the runtime
pub fn create_handle<T: 'static>(lua: &Lua, value: T) -> Result<ObjectRef<T>, BindError> {
    let identifier = identity::identifier::<T>()?;
    let handle = lua.create_userdata(ObjectHandle {
        object: Some(value),
        identifier,
    })?;
    handle.set_named_user_value(STAMP_KEY, identifier)?;
    log_handle_created(identifier);

    Ok(ObjectRef::from_userdata(handle))
}

/// Run the native destructor without waiting for collection.
/// Returns false when the object was already released.
pub fn release_handle<T: 'static>(handle: &ObjectRef<T>) -> Result<bool, BindError> {
    let mut guard = borrow_handle_mut::<T>(&handle.handle)?;
    Ok(guard.destroy())
}

/// Typed reference to a handle, usable as a parameter or return value
pub struct ObjectRef<T: 'static> {
    handle: AnyUserData,
    _marker: PhantomData<fn() -> T>,
}

impl<T: 'static> ObjectRef<T> {
    fn from_userdata(handle: AnyUserData) -> Self {
        Self {
            handle,
            _marker: PhantomData,
        }
    }

    /// Scoped shared access to the native object
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> Result<R, BindError> {
        let guard = borrow_handle::<T>(&self.handle)?;
        let object = live(&guard)?;
        Ok(f(object))
    }

    /// Scoped exclusive access to the native object
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R, BindError> {
        let mut guard = borrow_handle_mut::<T>(&self.handle)?;
        let object = live_mut(&mut guard)?;
        Ok(f(object))
    }

    pub fn is_live(&self) -> bool {
        borrow_handle::<T>(&self.handle)
            .map(|guard| guard.is_live())
            .unwrap_or(false)
    }

    pub fn release(&self) -> Result<bool, BindError> {
        release_handle(self)
    }

    pub fn as_userdata(&self) -> &AnyUserData {
        &self.handle
    }
}

impl<T: 'static> Clone for ObjectRef<T> {
    fn clone(&self) -> Self {
        Self::from_userdata(self.handle.clone())
    }
}

impl<T: 'static> fmt::Debug for ObjectRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectRef")
            .field("type", &std::any::type_name::<T>())
            .field("live", &self.is_live())
            .finish()
    }
}

impl<T: 'static> FromScript for ObjectRef<T> {
    fn kind() -> ValueKind {
        ValueKind::Object
    }

    fn from_script(value: &Value, _lua: &Lua, _codec: &CodecConfig) -> Result<Self, DecodeFailure> {
        let expected = identity::identifier::<T>()
            .map_err(|_| DecodeFailure::new(format!("{} (unregistered)", std::any::type_name::<T>())))?;
        stamped_handle(value, expected)
            .map(Self::from_userdata)
            .map_err(DecodeFailure::new)
    }
}

impl<T: 'static> IntoScript for ObjectRef<T> {
    fn kind() -> ValueKind {
        ValueKind::Object
    }

    fn into_script(self, _lua: &Lua) -> Result<Value, BindError> {
        Ok(Value::UserData(self.handle))
    }
}
