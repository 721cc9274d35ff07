//! Structural decode (spec.md §4.5 step 1): turns the raw ABC bytecode
//! stream into a sequence of `(op, operand)` pairs with byte offsets,
//! resolving constant-pool and multiname operands eagerly so later stages
//! never touch the constant pool directly.

use crate::abc::{wire, AbcConstantPool, AbcMethodInput, AbcOp};
use crate::errors::{VerifyError, VerifyResult};

#[derive(Debug, Clone)]
pub struct DecodedInstr {
    pub offset: u32,
    pub next_offset: u32,
    pub op: AbcOp,
}

struct Reader<'a> {
    code: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn u8(&mut self) -> VerifyResult<u8> {
        let b = *self
            .code
            .get(self.pos)
            .ok_or(VerifyError::MalformedStream { offset: self.pos as u32 })?;
        self.pos += 1;
        Ok(b)
    }

    fn i8(&mut self) -> VerifyResult<i8> {
        Ok(self.u8()? as i8)
    }

    fn u32(&mut self) -> VerifyResult<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes(bytes.try_into().unwrap()))
    }

    fn i32(&mut self) -> VerifyResult<i32> {
        Ok(self.u32()? as i32)
    }

    fn f64(&mut self) -> VerifyResult<f64> {
        let bytes = self.take(8)?;
        Ok(f64::from_le_bytes(bytes.try_into().unwrap()))
    }

    fn take(&mut self, n: usize) -> VerifyResult<&'a [u8]> {
        let start = self.pos;
        let end = start + n;
        let slice = self
            .code
            .get(start..end)
            .ok_or(VerifyError::MalformedStream { offset: start as u32 })?;
        self.pos = end;
        Ok(slice)
    }
}

/// Resolves a relative jump offset encoded from the position right after
/// the 4-byte displacement field (the ABC convention this decoder mirrors).
fn absolute_target(base_after_operand: u32, relative: i32) -> VerifyResult<u32> {
    let target = base_after_operand as i64 + relative as i64;
    if target < 0 || target > u32::MAX as i64 {
        return Err(VerifyError::UndefinedBranchTarget {
            from: base_after_operand,
            target: relative as u32,
        });
    }
    Ok(target as u32)
}

pub fn decode(input: &AbcMethodInput) -> VerifyResult<Vec<DecodedInstr>> {
    let mut reader = Reader { code: input.code, pos: 0 };
    let constants = input.constants;
    let mut out = Vec::new();

    while reader.pos < reader.code.len() {
        let offset = reader.pos as u32;
        let opcode = reader.u8()?;
        let op = decode_one(opcode, &mut reader, constants)?;
        let next_offset = reader.pos as u32;
        out.push(DecodedInstr { offset, next_offset, op });
    }

    Ok(out)
}

fn decode_one(opcode: u8, r: &mut Reader, constants: &dyn AbcConstantPool) -> VerifyResult<AbcOp> {
    Ok(match opcode {
        wire::NOP => AbcOp::Nop,
        wire::POP => AbcOp::Pop,
        wire::DUP => AbcOp::Dup,
        wire::PUSH_NULL => AbcOp::PushNull,
        wire::PUSH_UNDEFINED => AbcOp::PushUndefined,
        wire::PUSH_TRUE => AbcOp::PushTrue,
        wire::PUSH_FALSE => AbcOp::PushFalse,
        wire::PUSH_BYTE => AbcOp::PushByte(r.i8()?),
        wire::PUSH_INT => AbcOp::PushInt(r.i32()?),
        wire::PUSH_DOUBLE => AbcOp::PushDouble(r.f64()?),
        wire::PUSH_STRING => {
            let idx = r.u32()?;
            AbcOp::PushString(constants.string(idx).to_string())
        }
        wire::GET_LOCAL => AbcOp::GetLocal(r.u32()?),
        wire::SET_LOCAL => AbcOp::SetLocal(r.u32()?),
        wire::GET_LEX => {
            let idx = r.u32()?;
            AbcOp::GetLex(constants.multiname(idx).to_string())
        }
        wire::GET_PROPERTY => {
            let idx = r.u32()?;
            AbcOp::GetProperty(constants.multiname(idx).to_string())
        }
        wire::SET_PROPERTY => {
            let idx = r.u32()?;
            AbcOp::SetProperty(constants.multiname(idx).to_string())
        }
        wire::CALL_PROPERTY => {
            let idx = r.u32()?;
            let arg_count = r.u32()?;
            AbcOp::CallProperty { name: constants.multiname(idx).to_string(), arg_count }
        }
        wire::CALL_PROPERTY_VOID => {
            let idx = r.u32()?;
            let arg_count = r.u32()?;
            AbcOp::CallPropertyVoid { name: constants.multiname(idx).to_string(), arg_count }
        }
        wire::CONSTRUCT_PROP => {
            let idx = r.u32()?;
            let arg_count = r.u32()?;
            AbcOp::ConstructProp { name: constants.multiname(idx).to_string(), arg_count }
        }
        wire::CONSTRUCT => AbcOp::Construct { arg_count: r.u32()? },
        wire::NEW_OBJECT => {
            let idx = r.u32()?;
            AbcOp::NewObject { class_name: constants.multiname(idx).to_string() }
        }
        wire::RETURN_VALUE => AbcOp::ReturnValue,
        wire::RETURN_VOID => AbcOp::ReturnVoid,
        wire::THROW => AbcOp::Throw,
        wire::JUMP => {
            let rel = r.i32()?;
            AbcOp::Jump(absolute_target(r.pos as u32, rel)?)
        }
        wire::IF_TRUE => AbcOp::IfTrue(absolute_target(r.pos as u32 + 4, r.i32()?)?),
        wire::IF_FALSE => AbcOp::IfFalse(absolute_target(r.pos as u32 + 4, r.i32()?)?),
        wire::IF_EQ => AbcOp::IfEq(absolute_target(r.pos as u32 + 4, r.i32()?)?),
        wire::IF_NE => AbcOp::IfNe(absolute_target(r.pos as u32 + 4, r.i32()?)?),
        wire::IF_LT => AbcOp::IfLt(absolute_target(r.pos as u32 + 4, r.i32()?)?),
        wire::IF_LE => AbcOp::IfLe(absolute_target(r.pos as u32 + 4, r.i32()?)?),
        wire::IF_GT => AbcOp::IfGt(absolute_target(r.pos as u32 + 4, r.i32()?)?),
        wire::IF_GE => AbcOp::IfGe(absolute_target(r.pos as u32 + 4, r.i32()?)?),
        wire::LOOKUP_SWITCH => {
            let default_rel = r.i32()?;
            let base = r.pos as u32;
            let case_count = r.u32()?;
            let mut case_targets = Vec::with_capacity(case_count as usize);
            for _ in 0..case_count {
                case_targets.push(absolute_target(base, r.i32()?)?);
            }
            AbcOp::LookupSwitch { default_target: absolute_target(base, default_rel)?, case_targets }
        }
        _ => return Err(VerifyError::MalformedStream { offset: (r.pos - 1) as u32 }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abc::AbcMethodInput;
    use avm_token::MethodSignature;

    struct EmptyPool;
    impl AbcConstantPool for EmptyPool {
        fn string(&self, _index: u32) -> &str {
            "s"
        }
        fn multiname(&self, _index: u32) -> &str {
            "m"
        }
        fn method_signature(&self, _class_name: &str, _member_name: &str) -> MethodSignature {
            MethodSignature { params: Vec::new(), return_type: avm_core::TypeSignature::Void, has_this: true }
        }
    }

    fn input(code: &[u8]) -> AbcMethodInput<'_> {
        AbcMethodInput {
            method_name: "test".to_string(),
            code,
            exceptions: &[],
            constants: &EmptyPool,
            local_count: 2,
        }
    }

    #[test]
    fn decodes_simple_linear_stream() {
        let code = [wire::NOP, wire::POP, wire::RETURN_VOID];
        let instrs = decode(&input(&code)).unwrap();
        assert_eq!(instrs.len(), 3);
        assert_eq!(instrs[0].op, AbcOp::Nop);
        assert_eq!(instrs[0].offset, 0);
        assert_eq!(instrs[1].op, AbcOp::Pop);
        assert_eq!(instrs[1].offset, 1);
        assert_eq!(instrs[2].op, AbcOp::ReturnVoid);
        assert_eq!(instrs[2].offset, 2);
    }

    #[test]
    fn decodes_push_int_operand() {
        let mut code = vec![wire::PUSH_INT];
        code.extend_from_slice(&42i32.to_le_bytes());
        let instrs = decode(&input(&code)).unwrap();
        assert_eq!(instrs[0].op, AbcOp::PushInt(42));
        assert_eq!(instrs[0].next_offset, 5);
    }

    #[test]
    fn resolves_jump_to_absolute_offset() {
        // jump +0 from right after its own 4-byte displacement (offset 5)
        // lands back on itself.
        let mut code = vec![wire::JUMP];
        code.extend_from_slice(&0i32.to_le_bytes());
        let instrs = decode(&input(&code)).unwrap();
        assert_eq!(instrs[0].op, AbcOp::Jump(5));
    }

    #[test]
    fn truncated_operand_is_malformed_stream() {
        let code = [wire::PUSH_INT, 0x01, 0x02];
        let err = decode(&input(&code)).unwrap_err();
        assert!(matches!(err, VerifyError::MalformedStream { .. }));
    }

    #[test]
    fn unknown_opcode_is_malformed_stream() {
        let code = [0xFFu8];
        let err = decode(&input(&code)).unwrap_err();
        assert!(matches!(err, VerifyError::MalformedStream { offset: 0 }));
    }

    #[test]
    fn decodes_lookup_switch() {
        // base is fixed at the position right after the default displacement
        // field (offset 5); case offsets are relative to that same base.
        let mut code = vec![wire::LOOKUP_SWITCH];
        code.extend_from_slice(&0i32.to_le_bytes()); // default: +0 from base (5)
        code.extend_from_slice(&2u32.to_le_bytes()); // 2 cases
        code.extend_from_slice(&0i32.to_le_bytes()); // case 0: +0 from base
        code.extend_from_slice(&4i32.to_le_bytes()); // case 1: +4 from base
        let instrs = decode(&input(&code)).unwrap();
        match &instrs[0].op {
            AbcOp::LookupSwitch { default_target, case_targets } => {
                assert_eq!(*default_target, 5);
                assert_eq!(case_targets, &[5, 9]);
            }
            other => panic!("expected LookupSwitch, got {other:?}"),
        }
    }
}
