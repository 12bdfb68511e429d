//! Type identity registry
//!
//! Process-wide mapping from native types to the script identifiers their
//! handles are stamped with. Both directions are kept so an identifier can
//! never name two types.

use crate::errors::{BindError, ErrorKind};
use crate::infrastructure::logging::log_type_registered;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use std::any::{type_name, TypeId};

/// Registered identity of one native type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeIdentity {
    pub identifier: &'static str,
    pub type_name: &'static str,
}

static IDENTITIES: Lazy<DashMap<TypeId, TypeIdentity>> = Lazy::new(DashMap::new);
static OWNERS: Lazy<DashMap<&'static str, TypeIdentity>> = Lazy::new(DashMap::new);

/// Register `T` under `identifier`
///
/// Registering the same pair again is a no-op. Lock order is
/// `IDENTITIES` then `OWNERS`.
pub fn register<T: 'static>(identifier: &'static str) -> Result<TypeIdentity, BindError> {
    let requested = TypeIdentity {
        identifier,
        type_name: type_name::<T>(),
    };

    match IDENTITIES.entry(TypeId::of::<T>()) {
        Entry::Occupied(existing) => {
            let existing = *existing.get();
            if existing.identifier == identifier {
                Ok(existing)
            } else {
                Err(BindError::new(ErrorKind::DuplicateType {
                    type_name: requested.type_name.to_string(),
                    existing: existing.identifier.to_string(),
                    requested: identifier.to_string(),
                }))
            }
        }
        Entry::Vacant(slot) => {
            match OWNERS.entry(identifier) {
                Entry::Occupied(owner) => {
                    return Err(BindError::new(ErrorKind::IdentifierTaken {
                        identifier: identifier.to_string(),
                        owner: owner.get().type_name.to_string(),
                    }));
                }
                Entry::Vacant(owner) => {
                    owner.insert(requested);
                }
            }
            slot.insert(requested);
            log_type_registered(requested.type_name, identifier);
            Ok(requested)
        }
    }
}

/// Script identifier of `T`
pub fn identifier<T: 'static>() -> Result<&'static str, BindError> {
    identity_of(TypeId::of::<T>())
        .map(|identity| identity.identifier)
        .ok_or_else(|| BindError::unregistered_type(type_name::<T>()))
}

pub fn identity_of(type_id: TypeId) -> Option<TypeIdentity> {
    IDENTITIES.get(&type_id).map(|entry| *entry.value())
}

pub fn owner_of(identifier: &str) -> Option<TypeIdentity> {
    OWNERS.get(identifier).map(|entry| *entry.value())
}

pub fn is_registered<T: 'static>() -> bool {
    IDENTITIES.contains_key(&TypeId::of::<T>())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Widget;
    struct Gadget;
    struct Gizmo;
    struct Unseen;

    #[test]
    fn test_register_is_idempotent() {
        let first = register::<Widget>("identity_tests::Widget").unwrap();
        let second = register::<Widget>("identity_tests::Widget").unwrap();
        assert_eq!(first, second);
        assert_eq!(identifier::<Widget>().unwrap(), "identity_tests::Widget");
        assert_eq!(owner_of("identity_tests::Widget"), Some(first));
    }

    #[test]
    fn test_second_identifier_for_type() {
        register::<Gadget>("identity_tests::Gadget").unwrap();
        let error = register::<Gadget>("identity_tests::Other").unwrap_err();
        assert!(matches!(error.kind, ErrorKind::DuplicateType { .. }));
        assert!(owner_of("identity_tests::Other").is_none());
    }

    #[test]
    fn test_identifier_taken_by_other_type() {
        register::<Gizmo>("identity_tests::Gizmo").unwrap();
        let error = register::<Unseen>("identity_tests::Gizmo").unwrap_err();
        assert!(matches!(error.kind, ErrorKind::IdentifierTaken { .. }));
        assert!(!is_registered::<Unseen>());
    }

    #[test]
    fn test_unregistered_type() {
        struct Stranger;
        let error = identifier::<Stranger>().unwrap_err();
        assert!(matches!(error.kind, ErrorKind::UnregisteredType { .. }));
        assert!(identity_of(TypeId::of::<Stranger>()).is_none());
    }
}
