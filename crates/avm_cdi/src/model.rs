use avm_core::types::PrimitiveKind;
use avm_resolve::ClassKind;

/// A member's type as the host side reports it, pre-resolution. `ClassRef`
/// names are resolved through `avm_resolve::TypeResolver` later; CDI itself
/// only checks the type falls in spec.md §4.4's allowed set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostTypeRef {
    Primitive(PrimitiveKind),
    Any,
    StringType,
    Void,
    ClassRef(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionalKind {
    Required,
    Optional,
    /// The "rest" type denoting a variadic trailing parameter.
    Rest,
}

#[derive(Debug, Clone)]
pub struct HostParam {
    pub name: String,
    pub ty: HostTypeRef,
    pub optional: OptionalKind,
}

#[derive(Debug, Clone)]
pub struct HostMethod {
    pub name: String,
    pub is_exported: bool,
    pub params: Vec<HostParam>,
    pub return_type: HostTypeRef,
    /// Raw `[Tag(...)]` strings attached to this member, validated but not
    /// otherwise interpreted (spec.md §4.4's metadata mini-grammar).
    pub metadata: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct HostField {
    pub name: String,
    pub is_exported: bool,
    pub ty: HostTypeRef,
    pub metadata: Vec<String>,
}

/// One side (getter or setter) of a property accessor pair.
#[derive(Debug, Clone)]
pub struct HostAccessor {
    pub params: Vec<HostParam>,
    pub return_type: HostTypeRef,
}

#[derive(Debug, Clone)]
pub struct HostProperty {
    pub name: String,
    pub is_exported: bool,
    pub getter: Option<HostAccessor>,
    pub setter: Option<HostAccessor>,
    pub metadata: Vec<String>,
}

/// The declarative description of one host class or interface, as a
/// host-specific reflection scanner would have already extracted it. CDI
/// consumes this; scanning the live host object model is out of scope
/// (spec.md Non-goals: "dynamic object model").
#[derive(Debug, Clone)]
pub struct HostClassDecl {
    pub canonical_name: String,
    pub kind: ClassKind,
    pub is_generic: bool,
    /// True only for the host's own internal `Vector.<T>` base class, the
    /// single permitted exception to "non-generic".
    pub is_generic_vector_base: bool,
    pub is_nested: bool,
    pub is_abstract: bool,
    pub is_public: bool,
    pub descends_from_object_root: bool,
    pub is_boxed_primitive_wrapper: bool,
    pub base_name: Option<String>,
    pub interface_names: Vec<String>,
    /// Count of constructors the host reports as exported.
    pub exported_constructor_count: u8,
    pub methods: Vec<HostMethod>,
    pub fields: Vec<HostField>,
    pub properties: Vec<HostProperty>,
}
