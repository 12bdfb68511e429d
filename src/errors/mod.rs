//! Error taxonomy for binding and calling native code from scripts
//!
//! Registration-time kinds are setup mistakes and should abort startup.
//! Call-time kinds only abort the current script call and are reported
//! through the runtime's error channel.

use crate::infrastructure::config::{CodecConfig, IntegerCoercion};
use crate::interop::ValueKind;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    UnregisteredType { type_name: String },
    DuplicateType { type_name: String, existing: String, requested: String },
    IdentifierTaken { identifier: String, owner: String },
    DuplicateMethodName { table: String, method: String },
    ForeignMember { table: String, method: String, owner: String },
    SignatureMismatch { expected: String, found: String },
    TypeMismatch { index: usize, expected: ValueKind, found: String },
    ReceiverType { expected: String, found: String },
    Arity { expected: usize, found: usize },
    OutOfRange { value: String },
    ReclaimedHandle { identifier: String },
    Native { message: String },
    Runtime { message: String },
}

impl ErrorKind {
    /// Kinds raised while wiring callables, types and tables together
    pub fn is_registration_error(&self) -> bool {
        matches!(
            self,
            Self::UnregisteredType { .. }
                | Self::DuplicateType { .. }
                | Self::IdentifierTaken { .. }
                | Self::DuplicateMethodName { .. }
                | Self::ForeignMember { .. }
                | Self::SignatureMismatch { .. }
        )
    }

    pub fn is_call_error(&self) -> bool {
        !self.is_registration_error()
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnregisteredType { type_name } => {
                write!(f, "type {} has no registered script identifier", type_name)
            }
            Self::DuplicateType { type_name, existing, requested } => {
                write!(
                    f,
                    "type {} is already registered as '{}', cannot register it as '{}'",
                    type_name, existing, requested
                )
            }
            Self::IdentifierTaken { identifier, owner } => {
                write!(f, "identifier '{}' is already used by type {}", identifier, owner)
            }
            Self::DuplicateMethodName { table, method } => {
                write!(f, "method '{}' is defined twice in the method table of {}", method, table)
            }
            Self::ForeignMember { table, method, owner } => {
                write!(
                    f,
                    "method '{}' in the method table of {} is a member of {}",
                    method, table, owner
                )
            }
            Self::SignatureMismatch { expected, found } => {
                write!(f, "signature mismatch: requested {}, bound {}", expected, found)
            }
            Self::TypeMismatch { index, expected, found } => {
                write!(f, "bad argument #{} ({} expected, got {})", index, expected, found)
            }
            Self::ReceiverType { expected, found } => {
                write!(f, "bad receiver ({} expected, got {})", expected, found)
            }
            Self::Arity { expected, found } => {
                write!(f, "wrong number of arguments: expected {}, got {}", expected, found)
            }
            Self::OutOfRange { value } => {
                write!(f, "integer {} does not fit the runtime's 64-bit integers", value)
            }
            Self::ReclaimedHandle { identifier } => {
                write!(f, "{} handle used after its object was released", identifier)
            }
            Self::Native { message } => write!(f, "{}", message),
            Self::Runtime { message } => write!(f, "{}", message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindError {
    pub kind: ErrorKind,
    pub function: Option<String>,
    pub suggestions: Vec<String>,
}

impl BindError {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            function: None,
            suggestions: Vec::new(),
        }
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Attach the script-visible name of the callable that failed.
    /// An already recorded name wins, so nested adapters keep the innermost one.
    pub fn in_function(mut self, name: &str) -> Self {
        if self.function.is_none() {
            self.function = Some(name.to_string());
        }
        self
    }

    pub fn with_suggestion(mut self, suggestion: String) -> Self {
        self.suggestions.push(suggestion);
        self
    }

    pub fn unregistered_type(type_name: &str) -> Self {
        Self::new(ErrorKind::UnregisteredType { type_name: type_name.to_string() })
            .with_suggestion("register the type with an identifier before exposing it".to_string())
    }

    pub fn arity(expected: usize, found: usize) -> Self {
        Self::new(ErrorKind::Arity { expected, found })
    }

    /// Hints only name codec options that would change the outcome
    pub fn type_mismatch(index: usize, expected: ValueKind, found: String, codec: &CodecConfig) -> Self {
        let hint = match (expected, found.as_str()) {
            (ValueKind::Integer, "number") if codec.integer_coercion == IntegerCoercion::Exact => {
                Some("pass a whole number, or set codec.integer_coercion = \"truncate\"")
            }
            (ValueKind::Number | ValueKind::Integer, "string") if !codec.string_to_number => {
                Some("convert with tonumber(), or enable codec.string_to_number")
            }
            (ValueKind::Number | ValueKind::Integer, "string") => {
                Some("the string is not a number tonumber() would accept")
            }
            (ValueKind::String, "number" | "integer") if !codec.number_to_string => {
                Some("convert with tostring(), or enable codec.number_to_string")
            }
            (ValueKind::Object, _) => Some("pass a handle created by the host"),
            _ => None,
        };

        let error = Self::new(ErrorKind::TypeMismatch { index, expected, found });
        match hint {
            Some(hint) => error.with_suggestion(hint.to_string()),
            None => error,
        }
    }

    pub fn receiver(expected: &str, found: String) -> Self {
        Self::new(ErrorKind::ReceiverType {
            expected: expected.to_string(),
            found,
        })
        .with_suggestion("call methods with ':' so the handle is passed first".to_string())
    }

    pub fn foreign_member(table: &str, method: &str, owner: &str) -> Self {
        Self::new(ErrorKind::ForeignMember {
            table: table.to_string(),
            method: method.to_string(),
            owner: owner.to_string(),
        })
        .with_suggestion("build a separate method table for the member's own type".to_string())
    }

    pub fn out_of_range(value: impl fmt::Display) -> Self {
        Self::new(ErrorKind::OutOfRange { value: value.to_string() })
    }

    pub fn native(message: impl fmt::Display) -> Self {
        Self::new(ErrorKind::Native { message: message.to_string() })
    }

    pub fn runtime(message: impl fmt::Display) -> Self {
        Self::new(ErrorKind::Runtime { message: message.to_string() })
    }

    /// Recover a bridge error from a runtime error chain.
    ///
    /// Errors raised by an adapter travel through the runtime wrapped as
    /// callback errors; anything else becomes `ErrorKind::Runtime`.
    pub fn from_lua(error: &mlua::Error) -> Self {
        find_bind_error(error).unwrap_or_else(|| Self::runtime(error))
    }
}

fn find_bind_error(error: &mlua::Error) -> Option<BindError> {
    match error {
        mlua::Error::CallbackError { cause, .. } => find_bind_error(cause),
        mlua::Error::WithContext { cause, .. } => find_bind_error(cause),
        mlua::Error::ExternalError(inner) => inner.downcast_ref::<BindError>().cloned(),
        _ => None,
    }
}

impl fmt::Display for BindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.kind, &self.function) {
            (ErrorKind::TypeMismatch { index, expected, found }, Some(name)) => write!(
                f,
                "bad argument #{} to '{}' ({} expected, got {})",
                index, name, expected, found
            )?,
            (ErrorKind::ReceiverType { expected, found }, Some(name)) => write!(
                f,
                "calling '{}' on bad self ({} expected, got {})",
                name, expected, found
            )?,
            (kind, Some(name)) => write!(f, "{}: {}", name, kind)?,
            (kind, None) => write!(f, "{}", kind)?,
        }

        for suggestion in &self.suggestions {
            write!(f, "\n  hint: {}", suggestion)?;
        }

        Ok(())
    }
}

impl std::error::Error for BindError {}

impl From<BindError> for mlua::Error {
    fn from(error: BindError) -> Self {
        mlua::Error::ExternalError(Arc::new(error))
    }
}

impl From<mlua::Error> for BindError {
    fn from(error: mlua::Error) -> Self {
        BindError::from_lua(&error)
    }
}
