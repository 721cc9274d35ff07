use avm_core::error::{CodedError, ErrorCode};

/// spec.md §7: "token provider missing when required" — raised by a caller
/// that needs token services but was built without a provider.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no token provider configured for this operation")]
    MissingProvider,
    #[error("signature helper required but local '{0}' was declared with only a type signature")]
    SignatureHelperRequired(String),
}

impl CodedError for ConfigError {
    fn code(&self) -> ErrorCode {
        ErrorCode::ConfigError
    }
}
