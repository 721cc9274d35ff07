use avm_core::types::TypeSignature;
use avm_core::{ClassId, Label, Local};
use avm_token::MethodSignature;

/// What a token-carrying operand names (spec.md §4.2's five `handle_for_*`
/// entry points, collapsed into one operand so `emit` stays a single
/// dispatch point).
#[derive(Debug, Clone, PartialEq)]
pub enum TokenOperand {
    Type(ClassId),
    Field(ClassId, String),
    Method(ClassId, String),
    String(String),
    Signature(MethodSignature),
}

/// The operand half of an `emit(op, operand)` call (spec.md §3 "Operand
/// kind").
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    None,
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    Branch(Label),
    Switch(Vec<Label>),
    Local(Local),
    Arg(u16),
    Token(TokenOperand),
    /// Drives type-specialized selection for `ldelem`/`stelem`/`ldobj`/`stobj`.
    Typed(TypeSignature),
}
