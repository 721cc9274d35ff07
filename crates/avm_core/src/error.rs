//! Shared error taxonomy (spec.md §7). Each crate defines its own concrete
//! error enum (`avm_cdi::LoadError`, `avm_resolve::ResolveError`,
//! `avm_ie::EmitError`, `avm_verify::VerifyError`,
//! `avm_verify::RecursionError`, `avm_token::ConfigError`) and implements
//! [`CodedError`] so every failure, regardless of which crate raised it,
//! carries a stable code identifier without the caller needing to match on
//! crate-specific variants.

/// The six failure kinds from spec.md §7's taxonomy table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    LoadError,
    VerifyError,
    ResolveError,
    EmitError,
    ConfigError,
    RecursionError,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::LoadError => "LoadError",
            ErrorCode::VerifyError => "VerifyError",
            ErrorCode::ResolveError => "ResolveError",
            ErrorCode::EmitError => "EmitError",
            ErrorCode::ConfigError => "ConfigError",
            ErrorCode::RecursionError => "RecursionError",
        }
    }
}

/// Implemented by every crate-local error enum so failures can be reported
/// uniformly (spec.md §7: "User-visible error objects carry the failing
/// name and a stable code identifier").
pub trait CodedError: std::error::Error {
    fn code(&self) -> ErrorCode;
    /// The ABC-level name that was being processed when the failure
    /// occurred (a method name, a class name, …), if known.
    fn failing_name(&self) -> Option<&str> {
        None
    }
}
