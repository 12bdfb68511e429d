//! Expose native Rust callables and objects to embedded Lua scripts.
//!
//! Free functions, function pointers, closures and members are adapted into
//! Lua functions with checked arity and typed argument decoding. Native
//! objects live inside runtime-owned handles stamped with a registered
//! identifier, and reach their members through attached method tables.

// Core modules
pub mod errors;
pub mod ffi;
pub mod host;
pub mod infrastructure;
pub mod interop;

// Re-export commonly used items
pub use errors::{BindError, ErrorKind};
pub use ffi::{MethodTable, ObjectRef, TypeIdentity};
pub use host::ScriptHost;
pub use infrastructure::{CodecConfig, Config, IntegerCoercion};
pub use interop::{CallableShape, NativeCallable, Signature, StrView, ValueKind};
