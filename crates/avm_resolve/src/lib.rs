//! Type Resolver (spec.md §4.3): resolves qualified names to class
//! descriptors within an application domain, importing from a host class
//! source on a cache miss.

pub mod errors;
pub mod model;
pub mod resolver;
pub mod source;

pub use errors::{ResolveError, Result};
pub use model::{ClassDescriptor, ClassKind, Namespace, NamespaceKind, QualifiedName};
pub use resolver::TypeResolver;
pub use source::{DescribeError, RawClassDecl, RawClassSource};
