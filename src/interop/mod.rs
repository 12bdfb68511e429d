//! Interoperability - Call native Rust code from Lua scripts
//!
//! Design: statically typed adapters with automatic value marshaling
//!
//! Architecture:
//! - `types.rs` - script-visible kinds and signatures (ValueKind, Signature)
//! - `marshal.rs` - Lua ↔ Rust value conversions
//! - `context.rs` - per-call argument and result stack
//! - `call.rs` - callable adapters and script entry points

mod types;
mod marshal;
mod context;
mod call;
mod counters;

pub use types::{Signature, ValueKind};
pub use marshal::{DecodeFailure, FromScript, IntoScript, ReturnValue, StrView};
pub use context::CallContext;
pub use call::{
    bind, bind_with_signature, ArgList, CallableShape, NativeCallable, NativeFn, NativeMethod,
    NativeMethodMut, Owner,
};

/// Dispatch counters accumulated since process start
pub fn stats() -> InteropStats {
    let (calls_made, call_errors, entry_points) = counters::snapshot();
    InteropStats {
        calls_made,
        call_errors,
        entry_points,
    }
}

/// Interop statistics for monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InteropStats {
    pub calls_made: usize,
    pub call_errors: usize,
    pub entry_points: usize,
}
