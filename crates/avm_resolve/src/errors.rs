use thiserror::Error;

use avm_core::error::{CodedError, ErrorCode};

/// Type Resolver failures (spec.md §4.3, §7 `ResolveError`).
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("namespace kind `private` may not appear in a qualified name")]
    PrivateNamespaceRejected,

    #[error("type `{0}` not found")]
    NotFound(String),

    #[error("invalid vector element type: {0}")]
    VectorElementInvalid(String),

    #[error("interface `{0}` has a base interface that is not exported")]
    InterfaceBaseNotExported(String),

    #[error("interface `{0}` declares an unexported instance method")]
    InterfaceHasUnexportedMethod(String),

    #[error("cyclic base or interface chain involving `{0}`")]
    CyclicBaseChain(String),

    #[error("host import failed for `{0}`: {1}")]
    ImportFailed(String, String),
}

impl CodedError for ResolveError {
    fn code(&self) -> ErrorCode {
        ErrorCode::ResolveError
    }

    fn failing_name(&self) -> Option<&str> {
        match self {
            ResolveError::NotFound(n)
            | ResolveError::InterfaceBaseNotExported(n)
            | ResolveError::InterfaceHasUnexportedMethod(n)
            | ResolveError::CyclicBaseChain(n)
            | ResolveError::ImportFailed(n, _) => Some(n),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ResolveError>;
