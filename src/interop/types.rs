//! Type descriptors for bound signatures
//!
//! Describes the native side of a binding in script terms, for signature
//! checks and error messages.

use std::fmt;

/// Script-visible kind of a native parameter or return type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Integer,
    Number,
    Boolean,
    /// Borrowed view of a script string, valid for the duration of the call
    StringView,
    String,
    /// Opaque handle to a native object
    Object,
    /// No value (only valid as a return kind)
    Void,
    /// Kind provided by a user codec
    Custom(&'static str),
}

impl ValueKind {
    /// Name used in script-facing messages
    pub const fn script_name(self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::StringView | Self::String => "string",
            Self::Object => "userdata",
            Self::Void => "nothing",
            Self::Custom(name) => name,
        }
    }

    /// Number of script values produced when used as a return kind
    #[inline]
    pub const fn result_count(self) -> usize {
        match self {
            Self::Void => 0,
            _ => 1,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.script_name())
    }
}

/// Fixed parameter list plus return kind a callable commits to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    pub params: Vec<ValueKind>,
    pub returns: ValueKind,
}

impl Signature {
    pub fn new(params: Vec<ValueKind>, returns: ValueKind) -> Self {
        Self { params, returns }
    }

    /// Signature of a native function taking `Args` and returning `Ret`
    pub fn of<Args, Ret>() -> Self
    where
        Args: super::call::ArgList,
        Ret: super::marshal::ReturnValue,
    {
        Self::new(Args::kinds(), Ret::kind())
    }

    /// Signature of a member of some object type taking `Args` and returning `Ret`
    pub fn of_method<Args, Ret>() -> Self
    where
        Args: super::call::ArgList,
        Ret: super::marshal::ReturnValue,
    {
        let mut params = Vec::with_capacity(Args::ARITY + 1);
        params.push(ValueKind::Object);
        params.extend(Args::kinds());
        Self::new(params, Ret::kind())
    }

    #[inline]
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", param)?;
        }
        write!(f, ") -> {}", self.returns)
    }
}
