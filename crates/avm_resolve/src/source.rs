use crate::model::ClassKind;

/// What the host side reports about a class or interface when the resolver
/// asks it to describe one by canonical name (spec.md §4.3: "creating it on
/// demand when the source is a native (host-language) declaration").
///
/// This is the seam between `avm_resolve` and `avm_cdi`: rather than
/// `avm_resolve` depending on the importer crate directly (which would make
/// `avm_cdi` -> `avm_resolve` -> `avm_cdi` a cycle, since the importer also
/// needs the resolver to resolve member types), `avm_cdi` implements this
/// trait and the caller wires the two together.
pub struct RawClassDecl {
    pub kind: ClassKind,
    pub is_exported: bool,
    pub is_boxed_primitive_wrapper: bool,
    /// Canonical dotted name of the base class, `None` for the AS object
    /// root itself.
    pub base_name: Option<String>,
    pub interface_names: Vec<String>,
    /// Canonical dotted names of every type referenced by a member signature
    /// (spec.md §4.3 "Dependency closure"), walked after this class is
    /// published so cycles among them resolve through the symbol table
    /// instead of recursing.
    pub referenced_type_names: Vec<String>,
    /// Set when this is an interface and it declares at least one
    /// non-exported instance method that isn't a property-accessor shim
    /// (spec.md §4.3 "Interface rules").
    pub has_unexported_instance_method: bool,
}

/// Why a host-side description attempt failed (distinguishes "doesn't
/// exist" from "exists but is malformed", so [`crate::resolver::TypeResolver`]
/// can report the right [`crate::errors::ResolveError`] variant).
#[derive(Debug, Clone)]
pub enum DescribeError {
    NotFound,
    /// The host source found the declaration but rejected it (e.g. `avm_cdi`
    /// failing one of its class-shape rules); carries a human-readable
    /// reason.
    Malformed(String),
}

pub trait RawClassSource {
    fn describe(&self, canonical_name: &str) -> Result<RawClassDecl, DescribeError>;
}
