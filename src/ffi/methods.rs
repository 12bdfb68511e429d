//! Method tables - named callables attached to a native type's handles

use super::identity;
use super::object::methods_key;
use crate::errors::{BindError, ErrorKind};
use crate::infrastructure::config::CodecConfig;
use crate::infrastructure::logging::log_methods_attached;
use crate::interop::{bind, NativeCallable};
use mlua::{Lua, Table};
use std::any::{type_name, TypeId};
use std::collections::HashSet;
use std::marker::PhantomData;

/// Ordered `(name, callable)` pairs for one owning type
#[derive(Debug, Clone)]
pub struct MethodTable {
    owner: TypeId,
    owner_name: &'static str,
    entries: Vec<(String, NativeCallable)>,
}

impl MethodTable {
    pub fn builder<T: 'static>() -> MethodTableBuilder<T> {
        MethodTableBuilder {
            entries: Vec::new(),
            _marker: PhantomData,
        }
    }

    pub fn get(&self, name: &str) -> Option<&NativeCallable> {
        self.entries
            .iter()
            .find(|(entry, _)| entry == name)
            .map(|(_, callable)| callable)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rust type name of the owning type
    pub fn owner_name(&self) -> &'static str {
        self.owner_name
    }

    pub fn owner_type_id(&self) -> TypeId {
        self.owner
    }

    /// Bind every entry and publish the table for the owner's handles.
    ///
    /// Attaching again replaces the previous table, including for handles
    /// that already exist.
    pub fn attach(&self, lua: &Lua, codec: &CodecConfig) -> Result<Table, BindError> {
        let identity = identity::identity_of(self.owner)
            .ok_or_else(|| BindError::unregistered_type(self.owner_name))?;

        let table = lua.create_table()?;
        for (name, callable) in &self.entries {
            let function = bind(lua, name, callable, codec)?;
            table.raw_set(name.as_str(), function)?;
        }

        lua.set_named_registry_value(&methods_key(identity.identifier), table.clone())?;
        log_methods_attached(identity.identifier, self.entries.len());

        Ok(table)
    }
}

pub struct MethodTableBuilder<T: 'static> {
    entries: Vec<(String, NativeCallable)>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: 'static> MethodTableBuilder<T> {
    pub fn method(mut self, name: impl Into<String>, callable: NativeCallable) -> Self {
        self.entries.push((name.into(), callable));
        self
    }

    /// Validate names and receivers
    ///
    /// Free-standing callables are allowed; they receive the handle as an
    /// ordinary first argument.
    pub fn build(self) -> Result<MethodTable, BindError> {
        let table = type_name::<T>();
        let mut seen = HashSet::with_capacity(self.entries.len());

        for (name, callable) in &self.entries {
            if !seen.insert(name.as_str()) {
                return Err(BindError::new(ErrorKind::DuplicateMethodName {
                    table: table.to_string(),
                    method: name.clone(),
                }));
            }

            if let Some(owner) = callable.owner() {
                if owner.type_id != TypeId::of::<T>() {
                    return Err(BindError::foreign_member(table, name, owner.type_name).in_function(name));
                }
            }
        }

        Ok(MethodTable {
            owner: TypeId::of::<T>(),
            owner_name: table,
            entries: self.entries,
        })
    }
}
