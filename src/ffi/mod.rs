//! Native object support
//!
//! Type identities, runtime-owned object handles and the method tables
//! scripts reach through those handles.

pub mod identity;
pub mod methods;
pub mod object;

pub use identity::{identifier, identity_of, is_registered, register, TypeIdentity};
pub use methods::{MethodTable, MethodTableBuilder};
pub use object::{create_handle, release_handle, ObjectHandle, ObjectRef};
