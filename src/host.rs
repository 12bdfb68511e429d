//! Embedding facade
//!
//! `ScriptHost` owns one Lua state plus the configuration every binding made
//! through it shares.

use crate::errors::BindError;
use crate::ffi::{self, identity, MethodTable, ObjectRef, TypeIdentity};
use crate::infrastructure::config::{CodecConfig, Config, RuntimeConfig};
use crate::infrastructure::logging::{init_logging, LogConfig};
use crate::interop::{bind, bind_with_signature, IntoScript, NativeCallable, Signature};
use mlua::{FromLuaMulti, Function, Lua, LuaOptions, StdLib, Table};
use tracing_appender::non_blocking::WorkerGuard;

pub struct ScriptHost {
    lua: Lua,
    config: Config,
}

fn standard_library(name: &str) -> Option<StdLib> {
    let lib = match name {
        "coroutine" => StdLib::COROUTINE,
        "table" => StdLib::TABLE,
        "io" => StdLib::IO,
        "os" => StdLib::OS,
        "string" => StdLib::STRING,
        "utf8" => StdLib::UTF8,
        "math" => StdLib::MATH,
        "package" => StdLib::PACKAGE,
        _ => return None,
    };
    Some(lib)
}

fn create_runtime(runtime: &RuntimeConfig) -> Result<Lua, BindError> {
    let lua = if runtime.libraries.is_empty() {
        Lua::new()
    } else {
        let mut libs = StdLib::NONE;
        for name in &runtime.libraries {
            let lib = standard_library(name)
                .ok_or_else(|| BindError::runtime(format!("unknown standard library '{}'", name)))?;
            libs = libs | lib;
        }
        Lua::new_with(libs, LuaOptions::default())?
    };

    if let Some(limit) = runtime.memory_limit {
        lua.set_memory_limit(limit)?;
    }

    Ok(lua)
}

impl ScriptHost {
    pub fn new() -> Result<Self, BindError> {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Result<Self, BindError> {
        let lua = create_runtime(&config.runtime)?;
        tracing::debug!(
            libraries = ?config.runtime.libraries,
            memory_limit = ?config.runtime.memory_limit,
            "Created script host"
        );
        Ok(Self { lua, config })
    }

    /// Host configured from the nearest `laf.toml`
    pub fn discover() -> Result<Self, BindError> {
        Self::with_config(Config::discover())
    }

    /// Install the global subscriber described by the `[logging]` section
    pub fn init_logging(&self) -> Option<WorkerGuard> {
        init_logging(LogConfig::from(&self.config.logging))
    }

    #[inline]
    pub fn lua(&self) -> &Lua {
        &self.lua
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    pub fn codec(&self) -> &CodecConfig {
        &self.config.codec
    }

    pub fn register_type<T: 'static>(&self, identifier: &'static str) -> Result<TypeIdentity, BindError> {
        identity::register::<T>(identifier)
    }

    /// Entry point for `callable` without installing it anywhere
    pub fn bind(&self, name: &str, callable: &NativeCallable) -> Result<Function, BindError> {
        bind(&self.lua, name, callable, &self.config.codec)
    }

    /// Install `callable` as the global `name`
    pub fn register(&self, name: &str, callable: NativeCallable) -> Result<(), BindError> {
        let function = self.bind(name, &callable)?;
        self.lua.globals().set(name, function)?;
        Ok(())
    }

    pub fn register_with_signature(
        &self,
        name: &str,
        callable: NativeCallable,
        requested: &Signature,
    ) -> Result<(), BindError> {
        let function = bind_with_signature(&self.lua, name, &callable, requested, &self.config.codec)?;
        self.lua.globals().set(name, function)?;
        Ok(())
    }

    /// Install `callable` as `namespace.name`, creating the global table on first use
    pub fn register_in(&self, namespace: &str, name: &str, callable: NativeCallable) -> Result<(), BindError> {
        let function = self.bind(name, &callable)?;
        let globals = self.lua.globals();
        let table = match globals.raw_get::<Option<Table>>(namespace)? {
            Some(table) => table,
            None => {
                let table = self.lua.create_table()?;
                globals.raw_set(namespace, table.clone())?;
                table
            }
        };
        table.raw_set(name, function)?;
        Ok(())
    }

    pub fn attach_methods(&self, table: &MethodTable) -> Result<Table, BindError> {
        table.attach(&self.lua, &self.config.codec)
    }

    pub fn create_handle<T: 'static>(&self, value: T) -> Result<ObjectRef<T>, BindError> {
        ffi::create_handle(&self.lua, value)
    }

    pub fn set_global(&self, name: &str, value: impl IntoScript) -> Result<(), BindError> {
        let value = value.into_script(&self.lua)?;
        self.lua.globals().set(name, value)?;
        Ok(())
    }

    /// Run a chunk for its side effects
    pub fn exec(&self, chunk: &str) -> Result<(), BindError> {
        self.lua
            .load(chunk)
            .exec()
            .map_err(|error| BindError::from_lua(&error))
    }

    /// Run a chunk and convert what it returns
    pub fn eval<R: FromLuaMulti>(&self, chunk: &str) -> Result<R, BindError> {
        self.lua
            .load(chunk)
            .eval::<R>()
            .map_err(|error| BindError::from_lua(&error))
    }

    /// Full collection cycle; unreachable handles run their destructors
    pub fn collect_garbage(&self) -> Result<(), BindError> {
        self.lua.gc_collect()?;
        self.lua.gc_collect()?;
        Ok(())
    }
}
