//! Shared type-signature vocabulary (spec.md §3, "Local variable" /
//! "Operand kind": `token` operands and local declarations both carry a type
//! signature). Kept in `avm_core` because the emitter, the resolver and the
//! class-descriptor importer all need to compare these for equality without
//! depending on each other.

use crate::ids::ClassId;

/// The primitive kinds the class-descriptor importer allows for an exported
/// member's type (spec.md §4.4), plus the two forms every local or operand
/// can take beyond a primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Int32,
    UInt32,
    Float64,
    Bool,
}

/// A resolved type signature. Structural equality here is what drives the
/// temp-pool reuse rule (spec.md §3: "a disposed slot is re-leased only for
/// a request whose type-signature equals the slot's recorded type") and the
/// vector-instantiation disallow list (spec.md §4.3).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeSignature {
    Primitive(PrimitiveKind),
    /// The AS3 `*` any-type.
    Any,
    String,
    Void,
    /// A resolved, non-generic class or interface.
    Class(ClassId),
    /// `Vector.<T>` for some resolved element type.
    Vector(Box<TypeSignature>),
    ByRef(Box<TypeSignature>),
}

/// Which call-like opcode a stack-delta query is for (spec.md §4.1: "the
/// emitter consults TP for a computed delta derived from the signature...
/// adjusted for `newobj` which pushes +1 instead of consuming `this`").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    Call,
    CallVirt,
    NewObj,
    LdFtn,
}

impl TypeSignature {
    pub fn is_primitive(&self) -> bool {
        matches!(self, TypeSignature::Primitive(_))
    }

    /// Strips a `ByRef` wrapper for comparisons that should ignore it
    /// (mirrors `avm_resolve`'s parameter-matching rule).
    pub fn unref(&self) -> &TypeSignature {
        match self {
            TypeSignature::ByRef(inner) => inner.unref(),
            other => other,
        }
    }
}
