//! Class Descriptor Importer (spec.md §4.4): builds class/module descriptors
//! from declarative annotations on host classes, including the metadata
//! mini-grammar parser, and bridges to `avm_resolve` via [`RawClassSource`].

pub mod errors;
pub mod importer;
pub mod metadata;
pub mod model;

pub use errors::{LoadError, Result};
pub use importer::{import, CdiClassSource};
pub use metadata::{parse_member_metadata, parse_metadata_tag, MetadataItem, MetadataTag};
pub use model::{
    HostAccessor, HostClassDecl, HostField, HostMethod, HostParam, HostProperty, HostTypeRef,
    OptionalKind,
};
