use avm_core::branch::relocate;
use avm_core::exception::{ExceptionKind, ExceptionRegion, ExceptionSectionForm};
use avm_core::label::LabelState;
use avm_core::types::{CallKind, TypeSignature};
use avm_core::{BranchRecord, ClassId, Label, LabelId, Local, MethodBody, RelocationRecord};
use avm_token::TokenProvider;

use crate::error::{EmitError, EmitResult};
use crate::exception_machine::{GroupState, TryGroup};
use crate::local_pool::LocalPool;
use crate::opcode::{self, compact_ldc_i4, compact_ldc_i8, typed_opcode, wire, Opcode, TypedAccessFamily};
use crate::operand::{Operand, TokenOperand};

struct SwitchRecord {
    offset_pos: u32,
    base_pos: u32,
    target: Label,
}

/// Emits a linear stream of native opcodes (spec.md §4.1). One instance is
/// reused across methods via [`InstructionEmitter::reset`]; `Label`/`Local`
/// handles issued by an instance are only valid against that instance.
pub struct InstructionEmitter<'tp> {
    token_provider: Option<&'tp dyn TokenProvider>,
    code: Vec<u8>,
    current_stack: u16,
    max_stack: u16,
    locals: LocalPool,
    labels: Vec<LabelState>,
    branch_records: Vec<BranchRecord>,
    switch_records: Vec<SwitchRecord>,
    groups: Vec<TryGroup>,
    closed_regions: Vec<ExceptionRegion>,
    virtual_token_locations: Vec<u32>,
    last_opcode: Option<Opcode>,
}

impl<'tp> InstructionEmitter<'tp> {
    pub fn new(token_provider: Option<&'tp dyn TokenProvider>) -> Self {
        InstructionEmitter {
            token_provider,
            code: Vec::new(),
            current_stack: 0,
            max_stack: 0,
            locals: LocalPool::new(),
            labels: Vec::new(),
            branch_records: Vec::new(),
            switch_records: Vec::new(),
            groups: Vec::new(),
            closed_regions: Vec::new(),
            virtual_token_locations: Vec::new(),
            last_opcode: None,
        }
    }

    pub fn reset(&mut self) {
        self.code.clear();
        self.current_stack = 0;
        self.max_stack = 0;
        self.locals.reset();
        self.labels.clear();
        self.branch_records.clear();
        self.switch_records.clear();
        self.groups.clear();
        self.closed_regions.clear();
        self.virtual_token_locations.clear();
        self.last_opcode = None;
    }

    // ---- locals -----------------------------------------------------

    pub fn declare_local(&mut self, signature: TypeSignature, pinned: bool) -> EmitResult<Local> {
        self.locals.declare_local(signature, pinned)
    }

    pub fn acquire_temp(&mut self, signature: TypeSignature) -> EmitResult<Local> {
        self.locals.acquire_temp(signature)
    }

    pub fn release_temp(&mut self, local: Local) -> EmitResult<()> {
        self.locals.release_temp(local)
    }

    fn validate_local(&self, local: Local) -> EmitResult<()> {
        if self.locals.slot(local).is_some() {
            Ok(())
        } else {
            Err(EmitError::UndefinedLocal(local))
        }
    }

    // ---- labels -------------------------------------------------------

    pub fn create_label(&mut self) -> Label {
        self.labels.push(LabelState::Unbound);
        Label(LabelId((self.labels.len() - 1) as u32))
    }

    pub fn create_label_group(&mut self, n: u32) -> EmitResult<Vec<Label>> {
        if n == 0 {
            return Err(EmitError::InvalidArg);
        }
        Ok((0..n).map(|_| self.create_label()).collect())
    }

    fn validate_label_created(&self, label: Label) -> EmitResult<()> {
        if (label.0 .0 as usize) < self.labels.len() {
            Ok(())
        } else {
            Err(EmitError::UndefinedLabel(label))
        }
    }

    pub fn mark_label(&mut self, label: Label) -> EmitResult<()> {
        self.close_awaiting_groups()?;
        self.validate_label_created(label)?;
        if self.labels[label.0 .0 as usize].is_bound() {
            return Err(EmitError::AlreadyBound(label));
        }
        let pos = self.code.len() as u32;
        self.labels[label.0 .0 as usize] = LabelState::Bound {
            pos,
            required_stack_depth: self.current_stack,
        };
        Ok(())
    }

    /// spec.md §4.1: "callers may override by setting the current depth
    /// before emitting the next instruction."
    pub fn set_current_stack(&mut self, n: u16) {
        self.current_stack = n;
        self.max_stack = self.max_stack.max(n);
    }

    // ---- exception regions ---------------------------------------------

    /// Any [`GroupState::AwaitingClause`] group sitting on top of the stack
    /// is done the moment anything other than another `begin_*` call comes
    /// next; this is where that implicit close happens.
    fn close_awaiting_groups(&mut self) -> EmitResult<()> {
        while let Some(top) = self.groups.last() {
            if top.has_unclosed_clause() {
                break;
            }
            let group = self.groups.pop().expect("just peeked");
            let pos = self.code.len() as u32;
            self.labels[group.end_label.0 .0 as usize] = LabelState::Bound {
                pos,
                required_stack_depth: self.current_stack,
            };
            self.closed_regions.extend(group.clauses);
        }
        Ok(())
    }

    pub fn begin_try(&mut self) -> EmitResult<()> {
        self.close_awaiting_groups()?;
        let end_label = self.create_label();
        let pos = self.code.len() as u32;
        self.groups.push(TryGroup::new(pos, end_label));
        Ok(())
    }

    pub fn begin_filter(&mut self) -> EmitResult<()> {
        let pos = self.code.len() as u32;
        let top = self
            .groups
            .last_mut()
            .ok_or(EmitError::BadClauseOrder("begin_filter without an open try"))?;
        top.begin_clause(ExceptionKind::Filter, pos, None, false)?;
        self.current_stack = 1;
        self.max_stack = self.max_stack.max(1);
        Ok(())
    }

    pub fn begin_catch(&mut self, catch_type: Option<ClassId>) -> EmitResult<()> {
        let pos = self.code.len() as u32;
        let last_was_end_filter = self.last_opcode == Some(Opcode::EndFilter);
        let needs_end_filter = {
            let top = self
                .groups
                .last_mut()
                .ok_or(EmitError::BadClauseOrder("begin_catch without an open try"))?;
            top.begin_clause(ExceptionKind::Catch, pos, catch_type, last_was_end_filter)?
        };
        if needs_end_filter {
            self.code.push(wire::END_FILTER);
            self.last_opcode = Some(Opcode::EndFilter);
            let new_pos = self.code.len() as u32;
            if let Some(TryGroup {
                state: GroupState::InHandler { handler_start, .. },
                ..
            }) = self.groups.last_mut()
            {
                *handler_start = new_pos;
            }
        }
        self.current_stack = 1;
        self.max_stack = self.max_stack.max(1);
        Ok(())
    }

    pub fn begin_fault(&mut self) -> EmitResult<()> {
        let pos = self.code.len() as u32;
        let top = self
            .groups
            .last_mut()
            .ok_or(EmitError::BadClauseOrder("begin_fault without an open try"))?;
        top.begin_clause(ExceptionKind::Fault, pos, None, false)?;
        self.current_stack = 0;
        Ok(())
    }

    pub fn begin_finally(&mut self) -> EmitResult<()> {
        let pos = self.code.len() as u32;
        let top = self
            .groups
            .last_mut()
            .ok_or(EmitError::BadClauseOrder("begin_finally without an open try"))?;
        top.begin_clause(ExceptionKind::Finally, pos, None, false)?;
        self.current_stack = 0;
        Ok(())
    }

    pub fn end_try(&mut self) -> EmitResult<()> {
        let last_terminal = matches!(
            self.last_opcode,
            Some(Opcode::Leave) | Some(Opcode::Throw) | Some(Opcode::Rethrow) | Some(Opcode::EndFinally)
        );
        let (kind, end_label) = match self.groups.last() {
            Some(g) => match &g.state {
                GroupState::InHandler { kind, .. } => (*kind, g.end_label),
                _ => return Err(EmitError::BadClauseOrder("end_try without an open handler")),
            },
            None => return Err(EmitError::BadClauseOrder("end_try without begin_try")),
        };
        if !last_terminal {
            match kind {
                ExceptionKind::Fault | ExceptionKind::Finally => {
                    self.code.push(wire::END_FINALLY);
                    self.last_opcode = Some(Opcode::EndFinally);
                }
                ExceptionKind::Catch | ExceptionKind::Filter => {
                    self.emit_leave_to(end_label)?;
                }
            }
        }
        let pos = self.code.len() as u32;
        let top = self.groups.last_mut().expect("checked above");
        top.end_clause(pos)?;
        self.current_stack = 0;
        Ok(())
    }

    fn emit_leave_to(&mut self, label: Label) -> EmitResult<()> {
        self.validate_label_created(label)?;
        self.code.push(wire::LEAVE);
        let offset_pos = self.code.len() as u32;
        self.code.extend_from_slice(&0i32.to_le_bytes());
        let base_pos = self.code.len() as u32;
        self.branch_records.push(BranchRecord {
            offset_pos,
            base_pos,
            target: label,
            opcode: wire::LEAVE,
            short_form: false,
        });
        self.last_opcode = Some(Opcode::Leave);
        Ok(())
    }

    // ---- emission -------------------------------------------------------

    fn apply_delta(&mut self, delta: i32) {
        let next = (self.current_stack as i32 + delta).max(0) as u16;
        self.current_stack = next;
        self.max_stack = self.max_stack.max(next);
    }

    fn encode_indexed(idx: u16, implicit0: u8, short_s: u8, wide: u8) -> (u8, Vec<u8>) {
        if idx < 4 {
            (implicit0 + idx as u8, Vec::new())
        } else if idx <= 255 {
            (short_s, vec![idx as u8])
        } else {
            (wide, idx.to_le_bytes().to_vec())
        }
    }

    fn push_bytes(&mut self, op: u8, operand: &[u8]) {
        self.code.push(op);
        self.code.extend_from_slice(operand);
    }

    pub fn emit(&mut self, op: Opcode, operand: Operand) -> EmitResult<()> {
        self.close_awaiting_groups()?;
        match op {
            Opcode::Nop => self.push_bytes(wire::NOP, &[]),
            Opcode::Pop => {
                self.push_bytes(wire::POP, &[]);
                self.apply_delta(-1);
            }
            Opcode::Dup => {
                self.push_bytes(wire::DUP, &[]);
                self.apply_delta(1);
            }
            Opcode::Ret => {
                self.push_bytes(wire::RET, &[]);
                self.current_stack = 0;
            }
            Opcode::Throw => {
                self.push_bytes(wire::THROW, &[]);
                self.current_stack = 0;
            }
            Opcode::Rethrow => {
                self.push_bytes(wire::RETHROW, &[]);
                self.current_stack = 0;
            }
            Opcode::EndFilter => self.push_bytes(wire::END_FILTER, &[]),
            Opcode::EndFinally => {
                self.push_bytes(wire::END_FINALLY, &[]);
                self.current_stack = 0;
            }

            Opcode::LdcI4 => {
                let Operand::Int32(n) = operand else {
                    return Err(EmitError::OperandKindMismatch { expected: "Int32" });
                };
                let (b, bytes) = compact_ldc_i4(n);
                self.push_bytes(b, &bytes);
                self.apply_delta(1);
            }
            Opcode::LdcI8 => {
                let Operand::Int64(n) = operand else {
                    return Err(EmitError::OperandKindMismatch { expected: "Int64" });
                };
                for (b, bytes) in compact_ldc_i8(n) {
                    self.push_bytes(b, &bytes);
                }
                self.apply_delta(1);
            }
            Opcode::LdcR4 => {
                let Operand::Float32(v) = operand else {
                    return Err(EmitError::OperandKindMismatch { expected: "Float32" });
                };
                self.push_bytes(wire::LDC_R4, &v.to_le_bytes());
                self.apply_delta(1);
            }
            Opcode::LdcR8 => {
                let Operand::Float64(v) = operand else {
                    return Err(EmitError::OperandKindMismatch { expected: "Float64" });
                };
                self.push_bytes(wire::LDC_R8, &v.to_le_bytes());
                self.apply_delta(1);
            }

            Opcode::LdLoc => {
                let Operand::Local(l) = operand else {
                    return Err(EmitError::OperandKindMismatch { expected: "Local" });
                };
                self.validate_local(l)?;
                let (b, bytes) = Self::encode_indexed(l.index(), wire::LDLOC_0, wire::LDLOC_S, wire::LDLOC);
                self.push_bytes(b, &bytes);
                self.apply_delta(1);
            }
            Opcode::StLoc => {
                let Operand::Local(l) = operand else {
                    return Err(EmitError::OperandKindMismatch { expected: "Local" });
                };
                self.validate_local(l)?;
                let (b, bytes) = Self::encode_indexed(l.index(), wire::STLOC_0, wire::STLOC_S, wire::STLOC);
                self.push_bytes(b, &bytes);
                self.apply_delta(-1);
            }
            Opcode::LdArg => {
                let Operand::Arg(n) = operand else {
                    return Err(EmitError::OperandKindMismatch { expected: "Arg" });
                };
                let (b, bytes) = Self::encode_indexed(n, wire::LDARG_0, wire::LDARG_S, wire::LDARG);
                self.push_bytes(b, &bytes);
                self.apply_delta(1);
            }

            Opcode::Br
            | Opcode::BrFalse
            | Opcode::BrTrue
            | Opcode::Beq
            | Opcode::Bne
            | Opcode::Blt
            | Opcode::Ble
            | Opcode::Bgt
            | Opcode::Bge
            | Opcode::Leave => {
                let Operand::Branch(label) = operand else {
                    return Err(EmitError::OperandKindMismatch { expected: "Branch" });
                };
                self.emit_conditional_branch(op, label)?;
            }

            Opcode::Switch => {
                let Operand::Switch(labels) = operand else {
                    return Err(EmitError::OperandKindMismatch { expected: "Switch" });
                };
                self.emit_switch(labels)?;
            }

            Opcode::LdElem => self.emit_typed(TypedAccessFamily::Elem, false, operand, -1)?,
            Opcode::StElem => self.emit_typed(TypedAccessFamily::Elem, true, operand, -3)?,
            Opcode::LdObj => self.emit_typed(TypedAccessFamily::Obj, false, operand, 0)?,
            Opcode::StObj => self.emit_typed(TypedAccessFamily::Obj, true, operand, -2)?,

            Opcode::LdStr => self.emit_ldstr(operand)?,
            Opcode::LdFld => self.emit_field(op, operand, 0)?,
            Opcode::StFld => self.emit_field(op, operand, -2)?,

            Opcode::Call | Opcode::CallVirt | Opcode::NewObj | Opcode::LdFtn => {
                self.emit_call(op, operand)?;
            }
        }
        self.last_opcode = Some(op);
        Ok(())
    }

    fn emit_ldstr(&mut self, operand: Operand) -> EmitResult<()> {
        let Operand::Token(TokenOperand::String(s)) = operand else {
            return Err(EmitError::OperandKindMismatch { expected: "Token(String)" });
        };
        let tp = self.token_provider.ok_or(EmitError::MissingTokenProvider)?;
        let handle = tp.handle_for_string(&s);
        self.code.push(wire::LDSTR);
        self.code.extend_from_slice(&handle.to_le_bytes());
        self.apply_delta(1);
        Ok(())
    }

    fn emit_field(&mut self, op: Opcode, operand: Operand, delta: i32) -> EmitResult<()> {
        let Operand::Token(TokenOperand::Field(ty, name)) = operand else {
            return Err(EmitError::OperandKindMismatch { expected: "Token(Field)" });
        };
        let tp = self.token_provider.ok_or(EmitError::MissingTokenProvider)?;
        let handle = tp.handle_for_field(ty, &name);
        let wire_op = match op {
            Opcode::LdFld => wire::LDFLD,
            Opcode::StFld => wire::STFLD,
            _ => unreachable!("only called for LdFld/StFld"),
        };
        self.code.push(wire_op);
        let token_pos = self.code.len() as u32;
        self.code.extend_from_slice(&handle.to_le_bytes());
        if tp.is_virtual(handle) {
            self.virtual_token_locations.push(token_pos);
        }
        self.apply_delta(delta);
        Ok(())
    }

    fn emit_conditional_branch(&mut self, op: Opcode, label: Label) -> EmitResult<()> {
        self.validate_label_created(label)?;
        let long_byte = match op {
            Opcode::Br => wire::BR,
            Opcode::BrFalse => wire::BRFALSE,
            Opcode::BrTrue => wire::BRTRUE,
            Opcode::Beq => wire::BEQ,
            Opcode::Bne => wire::BNE,
            Opcode::Blt => wire::BLT,
            Opcode::Ble => wire::BLE,
            Opcode::Bgt => wire::BGT,
            Opcode::Bge => wire::BGE,
            Opcode::Leave => wire::LEAVE,
            _ => unreachable!(),
        };
        self.code.push(long_byte);
        let offset_pos = self.code.len() as u32;
        self.code.extend_from_slice(&0i32.to_le_bytes());
        let base_pos = self.code.len() as u32;
        self.branch_records.push(BranchRecord {
            offset_pos,
            base_pos,
            target: label,
            opcode: long_byte,
            short_form: false,
        });
        let delta = match op {
            Opcode::Br | Opcode::Leave => 0,
            Opcode::BrFalse | Opcode::BrTrue => -1,
            _ => -2,
        };
        self.apply_delta(delta);
        if op.is_unconditional_branch() {
            self.current_stack = 0;
        }
        Ok(())
    }

    fn emit_switch(&mut self, labels: Vec<Label>) -> EmitResult<()> {
        for l in &labels {
            self.validate_label_created(*l)?;
        }
        self.code.push(wire::SWITCH);
        self.code.extend_from_slice(&(labels.len() as u32).to_le_bytes());
        let table_start = self.code.len() as u32;
        for _ in &labels {
            self.code.extend_from_slice(&0i32.to_le_bytes());
        }
        let base_pos = self.code.len() as u32;
        for (i, l) in labels.iter().enumerate() {
            self.switch_records.push(SwitchRecord {
                offset_pos: table_start + (i as u32) * 4,
                base_pos,
                target: *l,
            });
        }
        self.apply_delta(-1);
        Ok(())
    }

    fn emit_typed(&mut self, family: TypedAccessFamily, is_store: bool, operand: Operand, delta: i32) -> EmitResult<()> {
        let Operand::Typed(sig) = operand else {
            return Err(EmitError::OperandKindMismatch { expected: "Typed" });
        };
        let byte = typed_opcode(&sig, is_store, family);
        self.push_bytes(byte, &[]);
        self.apply_delta(delta);
        Ok(())
    }

    fn emit_call(&mut self, op: Opcode, operand: Operand) -> EmitResult<()> {
        let Operand::Token(tok) = operand else {
            return Err(EmitError::OperandKindMismatch { expected: "Token" });
        };
        let tp = self.token_provider.ok_or(EmitError::MissingTokenProvider)?;
        let (wire_op, handle, call_kind) = match (op, &tok) {
            (Opcode::Call, TokenOperand::Method(ty, name)) => {
                (wire::CALL, tp.handle_for_method(*ty, name), CallKind::Call)
            }
            (Opcode::CallVirt, TokenOperand::Method(ty, name)) => {
                (wire::CALLVIRT, tp.handle_for_method(*ty, name), CallKind::CallVirt)
            }
            (Opcode::NewObj, TokenOperand::Method(ty, name)) => {
                (wire::NEWOBJ, tp.handle_for_method(*ty, name), CallKind::NewObj)
            }
            (Opcode::LdFtn, TokenOperand::Method(ty, name)) => {
                (wire::LDFTN, tp.handle_for_method(*ty, name), CallKind::LdFtn)
            }
            _ => return Err(EmitError::OperandKindMismatch { expected: "method token" }),
        };
        self.code.push(wire_op);
        let token_pos = self.code.len() as u32;
        self.code.extend_from_slice(&handle.to_le_bytes());
        if tp.is_virtual(handle) {
            self.virtual_token_locations.push(token_pos);
        }
        let delta = tp.method_stack_delta(handle, call_kind);
        self.apply_delta(delta);
        Ok(())
    }

    // ---- finalize ---------------------------------------------------

    fn encode_local_signature(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&(self.locals.len() as u32).to_le_bytes());
        for slot in self.locals.iter() {
            out.push(u8::from(slot.pinned));
            encode_type_signature(&slot.signature, &mut out);
        }
        out
    }

    pub fn finalize(&mut self) -> EmitResult<MethodBody> {
        self.close_awaiting_groups()?;
        if !self.groups.is_empty() {
            return Err(EmitError::OpenHandlers);
        }
        for (i, state) in self.labels.iter().enumerate() {
            if !state.is_bound() {
                return Err(EmitError::UnmarkedLabel(Label(LabelId(i as u32))));
            }
        }
        if self.max_stack == u16::MAX {
            return Err(EmitError::MaxStackExceeded);
        }

        // Decide short/long form using original (pre-relocation) positions.
        let label_pos = |l: Label| -> u32 {
            match self.labels[l.0 .0 as usize] {
                LabelState::Bound { pos, .. } => pos,
                LabelState::Unbound => unreachable!("checked above"),
            }
        };

        let mut decisions = Vec::with_capacity(self.branch_records.len());
        for br in &self.branch_records {
            let disp = label_pos(br.target) as i64 - br.base_pos as i64;
            let shorten = br.opcode != wire::SWITCH && (-128..=126).contains(&disp);
            decisions.push(shorten);
        }

        let mut relocations: Vec<RelocationRecord> = self
            .branch_records
            .iter()
            .zip(&decisions)
            .filter(|(_, shorten)| **shorten)
            .map(|(br, _)| RelocationRecord {
                start_offset: br.offset_pos + 1,
                cumulative_shift: -3,
            })
            .collect();
        relocations.sort_by_key(|r| r.start_offset);

        let final_code = self.materialize_code(&decisions, &relocations, &label_pos);

        let mut regions = self.closed_regions.clone();
        regions.sort_by_key(|r| r.try_start + r.try_length);
        let form = ExceptionSectionForm::choose(&regions);
        let exception_section_bytes = serialize_exceptions(&regions, form, &relocations, self.token_provider);

        let virtual_token_locations = self
            .virtual_token_locations
            .iter()
            .map(|&p| relocate(&relocations, p))
            .collect();

        let local_signature_bytes = self.encode_local_signature();
        let (local_signature_bytes, local_signature_handle) =
            if let Some(tp) = self.token_provider.filter(|tp| tp.use_signature_helper()) {
                (
                    local_signature_bytes.clone(),
                    Some(tp.local_signature_handle(&local_signature_bytes)),
                )
            } else {
                (local_signature_bytes, None)
            };

        Ok(MethodBody {
            code_bytes: final_code,
            max_stack: self.max_stack,
            init_locals_flag: !self.locals.is_empty(),
            local_signature_bytes,
            local_signature_handle,
            exception_section_bytes,
            virtual_token_locations,
        })
    }

    fn materialize_code(
        &self,
        decisions: &[bool],
        relocations: &[RelocationRecord],
        label_pos: &impl Fn(Label) -> u32,
    ) -> Vec<u8> {
        // Map original byte offset -> (new_opcode_byte, new_operand_bytes) for
        // every edited branch/switch-target span; everything else copies verbatim.
        let mut out = Vec::with_capacity(self.code.len());
        let mut branch_by_opcode_pos = std::collections::HashMap::new();
        for (br, shorten) in self.branch_records.iter().zip(decisions) {
            branch_by_opcode_pos.insert(br.offset_pos - 1, (br, *shorten));
        }
        let mut switch_targets_by_table_pos: std::collections::HashMap<u32, &SwitchRecord> =
            std::collections::HashMap::new();
        for sr in &self.switch_records {
            switch_targets_by_table_pos.insert(sr.offset_pos, sr);
        }

        let mut i = 0u32;
        while (i as usize) < self.code.len() {
            if let Some((br, shorten)) = branch_by_opcode_pos.get(&i) {
                let new_base = relocate(relocations, br.base_pos);
                let new_target = relocate(relocations, label_pos(br.target));
                let disp = new_target as i64 - new_base as i64;
                if *shorten {
                    out.push(opcode::wire::short_branch_form(br.opcode));
                    out.push(disp as i8 as u8);
                } else {
                    out.push(br.opcode);
                    out.extend_from_slice(&(disp as i32).to_le_bytes());
                }
                i += 5;
                continue;
            }
            if let Some(sr) = switch_targets_by_table_pos.get(&i) {
                let new_base = relocate(relocations, sr.base_pos);
                let new_target = relocate(relocations, label_pos(sr.target));
                let disp = new_target as i64 - new_base as i64;
                out.extend_from_slice(&(disp as i32).to_le_bytes());
                i += 4;
                continue;
            }
            out.push(self.code[i as usize]);
            i += 1;
        }
        out
    }
}

fn encode_type_signature(sig: &TypeSignature, out: &mut Vec<u8>) {
    match sig {
        TypeSignature::Primitive(p) => {
            out.push(0);
            out.push(*p as u8);
        }
        TypeSignature::Any => out.push(1),
        TypeSignature::String => out.push(2),
        TypeSignature::Void => out.push(3),
        TypeSignature::Class(id) => {
            out.push(4);
            out.extend_from_slice(&id.0.to_le_bytes());
        }
        TypeSignature::Vector(elem) => {
            out.push(5);
            encode_type_signature(elem, out);
        }
        TypeSignature::ByRef(inner) => {
            out.push(6);
            encode_type_signature(inner, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EmitError;

    #[test]
    fn branch_within_short_range_is_collapsed_at_finalize() {
        let mut emitter = InstructionEmitter::new(None);
        let target = emitter.create_label();
        emitter.emit(Opcode::Br, Operand::Branch(target)).unwrap();
        for _ in 0..5 {
            emitter.emit(Opcode::Nop, Operand::None).unwrap();
        }
        emitter.mark_label(target).unwrap();
        let body = emitter.finalize().unwrap();
        // short br (2 bytes) + 5 nops, down from the long-form 5 + 5.
        assert_eq!(body.code_bytes.len(), 7);
    }

    #[test]
    fn unmarked_label_rejects_finalize() {
        let mut emitter = InstructionEmitter::new(None);
        let target = emitter.create_label();
        emitter.emit(Opcode::Br, Operand::Branch(target)).unwrap();
        let err = emitter.finalize().unwrap_err();
        assert!(matches!(err, EmitError::UnmarkedLabel(_)));
    }

    #[test]
    fn open_handler_rejects_finalize() {
        let mut emitter = InstructionEmitter::new(None);
        emitter.begin_try().unwrap();
        let err = emitter.finalize().unwrap_err();
        assert!(matches!(err, EmitError::OpenHandlers));
    }

    #[test]
    fn ldstr_without_a_token_provider_is_a_config_error() {
        let mut emitter = InstructionEmitter::new(None);
        let err = emitter
            .emit(Opcode::LdStr, Operand::Token(TokenOperand::String("hi".to_string())))
            .unwrap_err();
        assert!(matches!(err, EmitError::MissingTokenProvider));
    }

    #[test]
    fn local_index_below_four_uses_the_implicit_form() {
        let mut emitter = InstructionEmitter::new(None);
        let local = emitter.declare_local(TypeSignature::Any, false).unwrap();
        emitter.emit(Opcode::LdLoc, Operand::Local(local)).unwrap();
        let body = emitter.finalize().unwrap();
        assert_eq!(body.code_bytes[0], wire::LDLOC_0);
    }

    #[test]
    fn local_index_in_the_short_range_uses_the_one_byte_index_form() {
        let mut emitter = InstructionEmitter::new(None);
        let mut last = emitter.declare_local(TypeSignature::Any, false).unwrap();
        for _ in 0..4 {
            last = emitter.declare_local(TypeSignature::Any, false).unwrap();
        }
        emitter.emit(Opcode::LdLoc, Operand::Local(last)).unwrap();
        let body = emitter.finalize().unwrap();
        assert_eq!(body.code_bytes[0], wire::LDLOC_S);
        assert_eq!(body.code_bytes[1], 4);
    }

    #[test]
    fn try_catch_produces_a_non_empty_exception_section() {
        let mut emitter = InstructionEmitter::new(None);
        emitter.begin_try().unwrap();
        emitter.emit(Opcode::Nop, Operand::None).unwrap();
        emitter.begin_catch(None).unwrap();
        emitter.emit(Opcode::Nop, Operand::None).unwrap();
        emitter.end_try().unwrap();
        let body = emitter.finalize().unwrap();
        assert!(!body.exception_section_bytes.is_empty());
    }

    #[test]
    fn finally_continuation_reuses_the_try_range() {
        let mut emitter = InstructionEmitter::new(None);
        emitter.begin_try().unwrap();
        emitter.emit(Opcode::Nop, Operand::None).unwrap();
        emitter.begin_catch(None).unwrap();
        emitter.emit(Opcode::Nop, Operand::None).unwrap();
        emitter.end_try().unwrap();
        emitter.begin_finally().unwrap();
        emitter.emit(Opcode::Nop, Operand::None).unwrap();
        emitter.end_try().unwrap();
        let body = emitter.finalize().unwrap();
        assert!(!body.exception_section_bytes.is_empty());
    }
}

fn serialize_exceptions(
    regions: &[ExceptionRegion],
    form: ExceptionSectionForm,
    relocations: &[RelocationRecord],
    token_provider: Option<&dyn TokenProvider>,
) -> Vec<u8> {
    if regions.is_empty() {
        return Vec::new();
    }
    let catch_handle = |r: &ExceptionRegion| -> u32 {
        match (r.catch_type, token_provider) {
            (Some(ty), Some(tp)) => tp.handle_for_type(ty),
            _ => 0,
        }
    };
    let mut out = Vec::new();
    match form {
        ExceptionSectionForm::Small => {
            out.push(ExceptionSectionForm::SMALL_FLAG);
            out.push(regions.len() as u8);
            out.extend_from_slice(&0u16.to_le_bytes());
            for r in regions {
                let try_start = relocate(relocations, r.try_start);
                let try_end = relocate(relocations, r.try_start + r.try_length);
                let handler_start = relocate(relocations, r.handler_start);
                let handler_end = relocate(relocations, r.handler_start + r.handler_length);
                out.extend_from_slice(&(r.kind.wire_value() as u16).to_le_bytes());
                out.extend_from_slice(&(try_start as u16).to_le_bytes());
                out.push((try_end - try_start) as u8);
                out.extend_from_slice(&(handler_start as u16).to_le_bytes());
                out.push((handler_end - handler_start) as u8);
                let extra = match r.kind {
                    ExceptionKind::Catch => catch_handle(r),
                    ExceptionKind::Filter => r.filter_start.map(|p| relocate(relocations, p)).unwrap_or(0),
                    _ => 0,
                };
                out.extend_from_slice(&extra.to_le_bytes());
            }
        }
        ExceptionSectionForm::Fat => {
            out.push(ExceptionSectionForm::FAT_FLAG);
            let len = regions.len() as u32;
            out.extend_from_slice(&len.to_le_bytes()[..3]);
            for r in regions {
                let try_start = relocate(relocations, r.try_start);
                let try_end = relocate(relocations, r.try_start + r.try_length);
                let handler_start = relocate(relocations, r.handler_start);
                let handler_end = relocate(relocations, r.handler_start + r.handler_length);
                out.extend_from_slice(&r.kind.wire_value().to_le_bytes());
                out.extend_from_slice(&try_start.to_le_bytes());
                out.extend_from_slice(&(try_end - try_start).to_le_bytes());
                out.extend_from_slice(&handler_start.to_le_bytes());
                out.extend_from_slice(&(handler_end - handler_start).to_le_bytes());
                let extra = match r.kind {
                    ExceptionKind::Catch => catch_handle(r),
                    ExceptionKind::Filter => r.filter_start.map(|p| relocate(relocations, p)).unwrap_or(0),
                    _ => 0,
                };
                out.extend_from_slice(&extra.to_le_bytes());
            }
        }
    }
    out
}
