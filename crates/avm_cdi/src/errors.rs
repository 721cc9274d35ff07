use thiserror::Error;

use avm_core::error::{CodedError, ErrorCode};

/// Class Descriptor Importer failures (spec.md §4.4).
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("class `{0}` is generic; only a single internal vector base may be")]
    GenericNotAllowed(String),

    #[error("class `{0}` is nested, which is not allowed")]
    NestedNotAllowed(String),

    #[error("class `{0}` is abstract but is not an interface")]
    AbstractNotAllowed(String),

    #[error("class `{0}` does not descend from the AS object root")]
    MissingObjectRootAncestor(String),

    #[error("class `{0}` does not have public visibility")]
    NotPublic(String),

    #[error("class `{0}` exports more than one constructor")]
    MultipleConstructors(String),

    #[error("member `{0}` has a type outside the allowed set")]
    DisallowedMemberType(String),

    #[error("property `{0}` has mismatched getter/setter accessor signatures")]
    AccessorSignatureMismatch(String),

    #[error("method `{0}` has a required parameter after an optional one")]
    OptionalParameterOrder(String),

    #[error("method `{0}` has a rest parameter that is not last")]
    RestParameterNotLast(String),

    #[error("interface `{0}` declares an unexported instance method")]
    InterfaceHasUnexportedMethod(String),

    #[error("malformed metadata annotation: {0}")]
    MetadataSyntax(String),
}

impl CodedError for LoadError {
    fn code(&self) -> ErrorCode {
        ErrorCode::LoadError
    }

    fn failing_name(&self) -> Option<&str> {
        match self {
            LoadError::GenericNotAllowed(n)
            | LoadError::NestedNotAllowed(n)
            | LoadError::AbstractNotAllowed(n)
            | LoadError::MissingObjectRootAncestor(n)
            | LoadError::NotPublic(n)
            | LoadError::MultipleConstructors(n)
            | LoadError::DisallowedMemberType(n)
            | LoadError::AccessorSignatureMismatch(n)
            | LoadError::OptionalParameterOrder(n)
            | LoadError::RestParameterNotLast(n)
            | LoadError::InterfaceHasUnexportedMethod(n) => Some(n),
            LoadError::MetadataSyntax(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, LoadError>;
