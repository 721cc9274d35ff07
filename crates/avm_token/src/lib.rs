//! Token Provider (spec.md §4.2): the abstract interface through which the
//! instruction emitter obtains opaque handles for types, fields, methods,
//! strings, and local-variable signatures, plus its static and dynamic
//! implementations.

pub mod dynamic_provider;
pub mod error;
pub mod provider;
pub mod signature;
pub mod static_provider;

pub use dynamic_provider::DynamicTokenProvider;
pub use error::ConfigError;
pub use provider::{EntityHandle, StandaloneSignatureHandle, TokenProvider, UserStringHandle};
pub use signature::MethodSignature;
pub use static_provider::{StaticTokenProvider, StaticTokenProviderBuilder};
