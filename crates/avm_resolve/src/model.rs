use avm_core::ClassId;

/// A namespace's visibility kind (spec.md §4.3 "Name formation"). Mirrors
/// AS3's namespace attributes as the host side reports them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamespaceKind {
    Public,
    Internal,
    Protected,
    Private,
    /// A user-defined (custom) namespace, identified by its URI.
    Explicit,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    pub uri: Option<String>,
    pub kind: NamespaceKind,
}

impl Namespace {
    pub fn public() -> Self {
        Namespace {
            uri: None,
            kind: NamespaceKind::Public,
        }
    }
}

/// A fully-formed, canonical name (spec.md §4.3 "Name formation"): the
/// output of [`crate::resolver::TypeResolver::form_qualified_name`], never
/// constructed directly from an unchecked namespace kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedName {
    pub namespace: Namespace,
    pub local_name: String,
}

impl QualifiedName {
    /// The string key the domain symbol table and `RawClassSource` key on.
    pub fn canonical(&self) -> String {
        match &self.namespace.uri {
            Some(uri) if !uri.is_empty() => format!("{uri}::{}", self.local_name),
            _ => self.local_name.clone(),
        }
    }

    /// Splits a host-reported dotted name (`"flash.display.Sprite"`) into a
    /// public-namespace qualified name. Used for base/interface/member type
    /// names reported by [`crate::source::RawClassDecl`], which the host
    /// side always reports pre-resolved to a concrete namespace.
    pub fn from_canonical(raw: &str) -> Self {
        match raw.rsplit_once('.') {
            Some((ns, local)) => QualifiedName {
                namespace: Namespace {
                    uri: Some(ns.to_string()),
                    kind: NamespaceKind::Public,
                },
                local_name: local.to_string(),
            },
            None => QualifiedName {
                namespace: Namespace::public(),
                local_name: raw.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassKind {
    Class,
    Interface,
    /// A constructed `Vector.<T>` instantiation (spec.md §4.3 "Vector
    /// instantiations"): tagged distinctly from an ordinary class.
    VectorInstantiation,
}

/// A resolved class or interface descriptor (spec.md §4.3). Immutable once
/// published to the domain symbol table; [`crate::resolver::TypeResolver`]
/// guarantees at most one of these per underlying host type per domain.
#[derive(Debug, Clone)]
pub struct ClassDescriptor {
    pub id: ClassId,
    pub qualified_name: QualifiedName,
    pub kind: ClassKind,
    pub is_exported: bool,
    pub base: Option<ClassId>,
    pub interfaces: Vec<ClassId>,
    /// Only meaningful for `ClassKind::VectorInstantiation`.
    pub vector_element: Option<ClassId>,
    /// True for the host's boxed-primitive wrapper classes (`int`, `uint`,
    /// `Number`, `Boolean` object forms) — disallowed as vector element
    /// types (spec.md §4.3).
    pub is_boxed_primitive_wrapper: bool,
}
