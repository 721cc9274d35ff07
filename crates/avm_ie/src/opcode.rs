//! Native opcode vocabulary and wire-level encoding tables (spec.md §3
//! "Opcode descriptor" / §4.1 "Immediate-constant compaction" /
//! "Type-specialized opcodes").

use avm_core::types::{PrimitiveKind, TypeSignature};

/// The logical opcode a caller of [`crate::emitter::InstructionEmitter::emit`]
/// names. Several of these compile down to one of several wire forms chosen
/// by the emitter (short/long branch, narrow/wide local index, typed
/// element access, …) — callers never pick the wire form themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Nop,
    Pop,
    Dup,
    Ret,
    Throw,
    Rethrow,

    LdcI4,
    LdcI8,
    LdcR4,
    LdcR8,

    LdLoc,
    StLoc,
    LdArg,

    Br,
    BrFalse,
    BrTrue,
    Beq,
    Bne,
    Blt,
    Ble,
    Bgt,
    Bge,
    Switch,
    Leave,

    EndFilter,
    EndFinally,

    LdElem,
    StElem,
    LdObj,
    StObj,

    LdStr,
    LdFld,
    StFld,

    Call,
    CallVirt,
    NewObj,
    LdFtn,
}

impl Opcode {
    /// Sentinel stack deltas from spec.md §3: "`-128` = reserved/invalid;
    /// `-127` = empties the stack (return, throw, leave); `127` = stack
    /// change determined by operand (call-like)."
    pub const EMPTIES_STACK: i8 = -127;
    pub const OPERAND_DETERMINED: i8 = 127;

    /// Fixed part of the stack delta; `None` means the delta depends on the
    /// operand (call-like opcodes consult the token provider; `leave`/`ret`
    /// empty the stack outright).
    pub fn base_stack_delta(self) -> i8 {
        match self {
            Opcode::Nop | Opcode::EndFilter | Opcode::EndFinally => 0,
            Opcode::Pop => -1,
            Opcode::Dup => 1,
            Opcode::Ret | Opcode::Throw | Opcode::Rethrow | Opcode::Leave => Self::EMPTIES_STACK,
            Opcode::LdcI4 | Opcode::LdcI8 | Opcode::LdcR4 | Opcode::LdcR8 => 1,
            Opcode::LdLoc | Opcode::LdArg => 1,
            Opcode::StLoc => -1,
            Opcode::Br => 0,
            Opcode::BrFalse | Opcode::BrTrue => -1,
            Opcode::Beq | Opcode::Bne | Opcode::Blt | Opcode::Ble | Opcode::Bgt | Opcode::Bge => -2,
            Opcode::Switch => -1,
            Opcode::LdElem => -1,
            Opcode::StElem => -3,
            Opcode::LdObj => 0,
            Opcode::StObj => -2,
            Opcode::LdStr => 1,
            Opcode::LdFld => 0,
            Opcode::StFld => -2,
            Opcode::Call | Opcode::CallVirt | Opcode::NewObj | Opcode::LdFtn => {
                Self::OPERAND_DETERMINED
            }
        }
    }

    pub fn is_call_like(self) -> bool {
        matches!(
            self,
            Opcode::Call | Opcode::CallVirt | Opcode::NewObj | Opcode::LdFtn
        )
    }

    pub fn is_unconditional_branch(self) -> bool {
        matches!(self, Opcode::Br | Opcode::Leave)
    }

    pub fn is_branch(self) -> bool {
        matches!(
            self,
            Opcode::Br
                | Opcode::BrFalse
                | Opcode::BrTrue
                | Opcode::Beq
                | Opcode::Bne
                | Opcode::Blt
                | Opcode::Ble
                | Opcode::Bgt
                | Opcode::Bge
                | Opcode::Leave
        )
    }
}

/// One-byte wire opcodes. Short/long branch pairs are kept 13 apart except
/// `leave`/`leave_s`, special-cased per spec.md §4.1 ("op = long_op − 13,
/// with `leave → leave_s` special-cased").
pub mod wire {
    pub const NOP: u8 = 0x00;
    pub const POP: u8 = 0x01;
    pub const DUP: u8 = 0x02;
    pub const RET: u8 = 0x03;
    pub const THROW: u8 = 0x04;
    pub const RETHROW: u8 = 0x05;
    pub const END_FILTER: u8 = 0x06;
    pub const END_FINALLY: u8 = 0x07;

    pub const LDC_I4_M1: u8 = 0x10;
    pub const LDC_I4_0: u8 = 0x11;
    // LDC_I4_0 .. LDC_I4_8 occupy 0x11..=0x19
    pub const LDC_I4_S: u8 = 0x1A;
    pub const LDC_I4: u8 = 0x1B;
    pub const LDC_I8: u8 = 0x1C;
    pub const CONV_I8: u8 = 0x1D;
    pub const LDC_R4: u8 = 0x1E;
    pub const LDC_R8: u8 = 0x1F;

    pub const LDLOC_0: u8 = 0x20;
    // LDLOC_0 .. LDLOC_3 occupy 0x20..=0x23
    pub const LDLOC_S: u8 = 0x24;
    pub const LDLOC: u8 = 0x25;
    pub const STLOC_0: u8 = 0x26;
    pub const STLOC_S: u8 = 0x2A;
    pub const STLOC: u8 = 0x2B;
    pub const LDARG_0: u8 = 0x2C;
    pub const LDARG_S: u8 = 0x30;
    pub const LDARG: u8 = 0x31;

    // Long-form branches, 0x40..=0x49; short forms are long - 13 (0x33..=0x3C).
    pub const BR: u8 = 0x40;
    pub const BRFALSE: u8 = 0x41;
    pub const BRTRUE: u8 = 0x42;
    pub const BEQ: u8 = 0x43;
    pub const BNE: u8 = 0x44;
    pub const BLT: u8 = 0x45;
    pub const BLE: u8 = 0x46;
    pub const BGT: u8 = 0x47;
    pub const BGE: u8 = 0x48;
    pub const BRANCH_SHORT_OFFSET: u8 = 13;

    pub const SWITCH: u8 = 0x49;

    pub const LEAVE: u8 = 0x4A;
    pub const LEAVE_S: u8 = 0x4B;

    pub const LDELEM_I4: u8 = 0x50;
    pub const LDELEM_U4: u8 = 0x51;
    pub const LDELEM_R8: u8 = 0x53;
    pub const LDELEM_BOOL: u8 = 0x54;
    pub const LDELEM_REF: u8 = 0x55;

    pub const STELEM_I4: u8 = 0x58;
    pub const STELEM_U4: u8 = 0x59;
    pub const STELEM_R8: u8 = 0x5B;
    pub const STELEM_BOOL: u8 = 0x5C;
    pub const STELEM_REF: u8 = 0x5D;

    pub const LDOBJ_I4: u8 = 0x60;
    pub const LDOBJ_U4: u8 = 0x62;
    pub const LDOBJ_R8: u8 = 0x63;
    pub const LDOBJ_BOOL: u8 = 0x64;
    pub const LDOBJ_REF: u8 = 0x65;
    pub const STOBJ_I4: u8 = 0x66;
    pub const STOBJ_U4: u8 = 0x6C;
    pub const STOBJ_R8: u8 = 0x6D;
    pub const STOBJ_BOOL: u8 = 0x6E;
    pub const STOBJ_REF: u8 = 0x6F;

    pub const CALL: u8 = 0x68;
    pub const CALLVIRT: u8 = 0x69;
    pub const NEWOBJ: u8 = 0x6A;
    pub const LDFTN: u8 = 0x6B;

    pub const LDSTR: u8 = 0x70;
    pub const LDFLD: u8 = 0x71;
    pub const STFLD: u8 = 0x72;

    /// Long-form branch opcode → short form (spec.md §4.1).
    pub fn short_branch_form(long_op: u8) -> u8 {
        if long_op == LEAVE {
            LEAVE_S
        } else {
            long_op - BRANCH_SHORT_OFFSET
        }
    }
}

/// `ldc_i4 n` compaction (spec.md §4.1): collapses to the narrowest form
/// that can represent `n`. Returns the bytes to emit after the opcode byte
/// (empty for the fully-implicit forms).
pub fn compact_ldc_i4(n: i32) -> (u8, Vec<u8>) {
    if (-1..=8).contains(&n) {
        (((n + 1) as u8) + wire::LDC_I4_M1, Vec::new())
    } else if (-128..=127).contains(&n) {
        (wire::LDC_I4_S, vec![n as i8 as u8])
    } else {
        (wire::LDC_I4, n.to_le_bytes().to_vec())
    }
}

/// `ldc_i8 n` compaction: when `n` fits in an `i32`, emit the narrow `i4`
/// load followed by `conv_i8` (spec.md §4.1).
pub fn compact_ldc_i8(n: i64) -> Vec<(u8, Vec<u8>)> {
    if let Ok(narrow) = i32::try_from(n) {
        let (op, bytes) = compact_ldc_i4(narrow);
        vec![(op, bytes), (wire::CONV_I8, Vec::new())]
    } else {
        vec![(wire::LDC_I8, n.to_le_bytes().to_vec())]
    }
}

/// Which typed-access family (spec.md §4.1: "`ldelem`, `stelem`, `ldobj`,
/// `stobj` with a type operand select among the typed short forms").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypedAccessFamily {
    Elem,
    Obj,
}

/// Selects the typed wire opcode for a resolved element/value type,
/// total over the primitive set plus reference types.
pub fn typed_opcode(sig: &TypeSignature, is_store: bool, family: TypedAccessFamily) -> u8 {
    use TypedAccessFamily::*;
    match (sig.unref(), is_store, family) {
        (TypeSignature::Primitive(PrimitiveKind::Bool), false, Elem) => wire::LDELEM_BOOL,
        (TypeSignature::Primitive(PrimitiveKind::Bool), true, Elem) => wire::STELEM_BOOL,
        (TypeSignature::Primitive(PrimitiveKind::Int32), false, Elem) => wire::LDELEM_I4,
        (TypeSignature::Primitive(PrimitiveKind::Int32), true, Elem) => wire::STELEM_I4,
        (TypeSignature::Primitive(PrimitiveKind::UInt32), false, Elem) => wire::LDELEM_U4,
        (TypeSignature::Primitive(PrimitiveKind::UInt32), true, Elem) => wire::STELEM_U4,
        (TypeSignature::Primitive(PrimitiveKind::Float64), false, Elem) => wire::LDELEM_R8,
        (TypeSignature::Primitive(PrimitiveKind::Float64), true, Elem) => wire::STELEM_R8,
        (_, false, Elem) => wire::LDELEM_REF,
        (_, true, Elem) => wire::STELEM_REF,

        (TypeSignature::Primitive(PrimitiveKind::Bool), false, Obj) => wire::LDOBJ_BOOL,
        (TypeSignature::Primitive(PrimitiveKind::Bool), true, Obj) => wire::STOBJ_BOOL,
        (TypeSignature::Primitive(PrimitiveKind::Int32), false, Obj) => wire::LDOBJ_I4,
        (TypeSignature::Primitive(PrimitiveKind::Int32), true, Obj) => wire::STOBJ_I4,
        (TypeSignature::Primitive(PrimitiveKind::UInt32), false, Obj) => wire::LDOBJ_U4,
        (TypeSignature::Primitive(PrimitiveKind::UInt32), true, Obj) => wire::STOBJ_U4,
        (TypeSignature::Primitive(PrimitiveKind::Float64), false, Obj) => wire::LDOBJ_R8,
        (TypeSignature::Primitive(PrimitiveKind::Float64), true, Obj) => wire::STOBJ_R8,
        (_, false, Obj) => wire::LDOBJ_REF,
        (_, true, Obj) => wire::STOBJ_REF,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compact_ldc_i4_picks_the_implicit_form_for_small_values() {
        for n in -1..=8 {
            let (op, bytes) = compact_ldc_i4(n);
            assert_eq!(op, ((n + 1) as u8) + wire::LDC_I4_M1);
            assert!(bytes.is_empty());
        }
    }

    #[test]
    fn compact_ldc_i4_picks_the_short_form_just_outside_the_implicit_range() {
        let (op, bytes) = compact_ldc_i4(9);
        assert_eq!(op, wire::LDC_I4_S);
        assert_eq!(bytes, vec![9u8]);

        let (op, bytes) = compact_ldc_i4(-2);
        assert_eq!(op, wire::LDC_I4_S);
        assert_eq!(bytes, vec![(-2i8) as u8]);
    }

    #[test]
    fn compact_ldc_i4_falls_back_to_the_wide_form() {
        let (op, bytes) = compact_ldc_i4(200);
        assert_eq!(op, wire::LDC_I4);
        assert_eq!(bytes, 200i32.to_le_bytes().to_vec());
    }

    #[test]
    fn compact_ldc_i8_narrow_values_reuse_ldc_i4_then_convert() {
        let seq = compact_ldc_i8(7);
        assert_eq!(seq.len(), 2);
        assert_eq!(seq[1].0, wire::CONV_I8);
    }

    #[test]
    fn compact_ldc_i8_wide_values_use_the_dedicated_opcode() {
        let seq = compact_ldc_i8(i64::MAX);
        assert_eq!(seq.len(), 1);
        assert_eq!(seq[0].0, wire::LDC_I8);
    }

    #[test]
    fn short_branch_form_subtracts_the_fixed_offset() {
        assert_eq!(wire::short_branch_form(wire::BR), wire::BR - wire::BRANCH_SHORT_OFFSET);
    }

    #[test]
    fn short_branch_form_special_cases_leave() {
        assert_eq!(wire::short_branch_form(wire::LEAVE), wire::LEAVE_S);
    }

    #[test]
    fn typed_opcode_selects_the_narrow_primitive_form() {
        let byte = typed_opcode(&TypeSignature::Primitive(PrimitiveKind::Int32), false, TypedAccessFamily::Elem);
        assert_eq!(byte, wire::LDELEM_I4);
        let byte = typed_opcode(&TypeSignature::Primitive(PrimitiveKind::Float64), true, TypedAccessFamily::Obj);
        assert_eq!(byte, wire::STOBJ_R8);
    }

    #[test]
    fn typed_opcode_falls_back_to_the_reference_form() {
        let byte = typed_opcode(&TypeSignature::String, false, TypedAccessFamily::Elem);
        assert_eq!(byte, wire::LDELEM_REF);
    }

    #[test]
    fn call_like_opcodes_report_an_operand_determined_delta() {
        assert_eq!(Opcode::CallVirt.base_stack_delta(), Opcode::OPERAND_DETERMINED);
        assert!(Opcode::CallVirt.is_call_like());
        assert!(!Opcode::Br.is_call_like());
    }
}
