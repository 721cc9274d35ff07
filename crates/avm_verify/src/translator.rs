//! The verify-then-lower pipeline (spec.md §4.5 steps 3-5): a forward
//! dataflow fixpoint over the CFG to pin down one `TypeState` per block
//! entry, a post-fixpoint local-signature fold, and a final pass that
//! re-walks each block lowering every `AbcOp` into `avm_ie` instructions.

use std::collections::{BTreeMap, HashSet, VecDeque};

use avm_core::exception::ExceptionKind;
use avm_core::types::{PrimitiveKind, TypeSignature};
use avm_core::{ClassId, Label, Local, MethodBody};
use avm_ie::{EmitResult, InstructionEmitter, Opcode, Operand, TokenOperand};
use avm_resolve::TypeResolver;

use crate::abc::{AbcConstantPool, AbcExceptionInfo, AbcMethodInput, AbcOp};
use crate::cfg::{self, BasicBlock};
use crate::decode::{self, DecodedInstr};
use crate::errors::{RecursionError, TranslateError, TranslateResult, VerifyError, VerifyResult};
use crate::stack::{join, widen, TypeState};

const DEFAULT_MAX_FIXPOINT_ITERATIONS: u32 = 10_000;

#[derive(Debug, Clone)]
pub struct VerifyOptions {
    pub max_fixpoint_iterations: u32,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        VerifyOptions {
            max_fixpoint_iterations: DEFAULT_MAX_FIXPOINT_ITERATIONS,
        }
    }
}

/// Runs spec.md §4.5's full pipeline for one ABC method body, emitting into
/// `emitter` and returning its finalized form. `param_types` gives the
/// initial types of locals `0..param_types.len()` (the receiver and formal
/// parameters); any remaining declared local is seeded with `TypeSignature::Any`.
pub fn translate_method(
    input: &AbcMethodInput,
    resolver: &TypeResolver,
    param_types: &[TypeSignature],
    emitter: &mut InstructionEmitter,
    options: &VerifyOptions,
) -> TranslateResult<MethodBody> {
    let instrs = decode::decode(input)?;
    let leaders = cfg::compute_leaders(&instrs, input.exceptions)?;
    let blocks = cfg::build_blocks(&instrs, &leaders);
    // A handler/filter clause is only ever reached through exception dispatch,
    // never by falling into it from the guarded code that precedes it in the
    // byte stream, so that implicit edge is never part of the real CFG.
    let handler_entries: HashSet<u32> = input
        .exceptions
        .iter()
        .flat_map(|ex| [Some(ex.handler_start), ex.filter_start])
        .flatten()
        .collect();
    let successors = build_successors(&instrs, &blocks, &handler_entries)?;

    let local_count = input.local_count as usize;
    let seed = TypeState::entry(local_count, param_types);

    let mut entry_states: Vec<Option<TypeState>> = vec![None; blocks.len()];
    let mut iterations = 0u32;
    let mut worklist: VecDeque<usize> = VecDeque::new();

    if !blocks.is_empty() {
        entry_states[0] = Some(seed.clone());
        worklist.push_back(0);
    }
    run_fixpoint(
        &mut worklist,
        &mut entry_states,
        &blocks,
        &instrs,
        &successors,
        resolver,
        input.constants,
        options.max_fixpoint_iterations,
        &mut iterations,
        &input.method_name,
    )?;

    // Fold every reached block's locals into one fixed per-index signature
    // (avm_ie declares one type per local slot for the whole method, unlike
    // this pass's per-block-varying abstract locals).
    let mut local_sig = seed.locals.clone();
    for st in entry_states.iter().flatten() {
        for (slot, ty) in local_sig.iter_mut().zip(&st.locals) {
            *slot = widen(resolver, slot, ty);
        }
    }

    // Seed exception-handler block entries from the folded local signature
    // plus a one-deep stack holding the resolved catch/filter type (or
    // `Any` for fault/finally), then let the fixpoint continue from there.
    // A real try-region's own locals would be sharper, but the whole-method
    // fold is always a sound over-approximation and far simpler to compute.
    for ex in input.exceptions {
        let caught_type = match (ex.kind, &ex.catch_type_name) {
            (ExceptionKind::Catch, Some(name)) | (ExceptionKind::Filter, Some(name)) => {
                TypeSignature::Class(resolver.resolve_by_name(name)?)
            }
            _ => TypeSignature::Any,
        };
        let mut seed_block_at = |offset: u32| -> TranslateResult<()> {
            let idx = cfg::block_at(&blocks, offset).ok_or(VerifyError::MalformedExceptionRegion {
                try_start: ex.try_start,
                reason: "handler_start is not a block leader",
            })?;
            let seeded = TypeState {
                operand_stack: vec![caught_type.clone()],
                locals: local_sig.clone(),
            };
            let merged = match entry_states[idx].take() {
                Some(existing) => join(resolver, offset, &existing, &seeded)?,
                None => seeded,
            };
            entry_states[idx] = Some(merged);
            worklist.push_back(idx);
            Ok(())
        };
        // The filter expression examines the same caught value the catch
        // body would get, so both block entries are seeded identically.
        if let (ExceptionKind::Filter, Some(filter_start)) = (ex.kind, ex.filter_start) {
            seed_block_at(filter_start)?;
        }
        seed_block_at(ex.handler_start)?;
    }
    run_fixpoint(
        &mut worklist,
        &mut entry_states,
        &blocks,
        &instrs,
        &successors,
        resolver,
        input.constants,
        options.max_fixpoint_iterations,
        &mut iterations,
        &input.method_name,
    )?;

    // `declare_local` assigns sequential indices starting at 0 (see
    // `LocalPool::push_slot`), so declaring `local_sig` in order reproduces
    // the ABC method's own local index space exactly.
    let local_handles: Vec<Local> = local_sig
        .iter()
        .enumerate()
        .map(|(i, ty)| {
            emitter.declare_local(ty.clone(), false)?;
            Ok(Local(avm_core::LocalIndex(i as u16)))
        })
        .collect::<EmitResult<Vec<Local>>>()?;

    let labels: Vec<Label> = (0..blocks.len()).map(|_| emitter.create_label()).collect();
    let exception_actions = build_exception_actions(input.exceptions, resolver)?;
    let mut applied_offsets: HashSet<u32> = HashSet::new();

    for (i, block) in blocks.iter().enumerate() {
        if let Some(acts) = exception_actions.get(&block.start) {
            for act in acts {
                apply_exception_action(act, emitter)?;
            }
        }
        applied_offsets.insert(block.start);

        let entry = entry_states[i]
            .clone()
            .unwrap_or_else(|| TypeState::entry(local_count, param_types));
        emitter.set_current_stack(entry.operand_stack.len() as u16);
        emitter.mark_label(labels[i])?;
        lower_block(block, &instrs, entry, resolver, input.constants, emitter, &blocks, &labels, &local_handles)?;
    }

    for (&offset, acts) in &exception_actions {
        if applied_offsets.contains(&offset) {
            continue;
        }
        for act in acts {
            apply_exception_action(act, emitter)?;
        }
    }

    Ok(emitter.finalize()?)
}

fn build_successors(
    instrs: &[DecodedInstr],
    blocks: &[BasicBlock],
    handler_entries: &HashSet<u32>,
) -> TranslateResult<Vec<Vec<usize>>> {
    let mut out = Vec::with_capacity(blocks.len());
    for (i, b) in blocks.iter().enumerate() {
        let mut succs = Vec::new();
        let next_is_handler_entry = blocks.get(i + 1).is_some_and(|n| handler_entries.contains(&n.start));
        if let Some(last_idx) = b.instrs.clone().last() {
            let last = &instrs[last_idx];
            if last.op.is_branch() {
                for t in last.op.branch_targets() {
                    let idx = cfg::block_at(blocks, t)
                        .ok_or(VerifyError::UndefinedBranchTarget { from: last.offset, target: t })?;
                    succs.push(idx);
                }
                let falls_through = !matches!(last.op, AbcOp::Jump(_) | AbcOp::LookupSwitch { .. });
                if falls_through && i + 1 < blocks.len() && !next_is_handler_entry {
                    succs.push(i + 1);
                }
            } else if !matches!(last.op, AbcOp::ReturnValue | AbcOp::ReturnVoid | AbcOp::Throw)
                && i + 1 < blocks.len()
                && !next_is_handler_entry
            {
                succs.push(i + 1);
            }
        } else if i + 1 < blocks.len() && !next_is_handler_entry {
            succs.push(i + 1);
        }
        out.push(succs);
    }
    Ok(out)
}

#[allow(clippy::too_many_arguments)]
fn run_fixpoint(
    worklist: &mut VecDeque<usize>,
    entry_states: &mut [Option<TypeState>],
    blocks: &[BasicBlock],
    instrs: &[DecodedInstr],
    successors: &[Vec<usize>],
    resolver: &TypeResolver,
    constants: &dyn AbcConstantPool,
    max_iterations: u32,
    iterations: &mut u32,
    method_name: &str,
) -> TranslateResult<()> {
    while let Some(i) = worklist.pop_front() {
        *iterations += 1;
        if *iterations > max_iterations {
            return Err(TranslateError::Recursion(RecursionError {
                method_name: method_name.to_string(),
                limit: max_iterations,
            }));
        }
        let entry = entry_states[i].clone().expect("seeded before being enqueued");
        let exit = block_exit_state(&entry, &blocks[i], instrs, resolver, constants)?;
        for &succ in &successors[i] {
            let changed = match entry_states[succ].take() {
                Some(existing) => {
                    let joined = join(resolver, blocks[succ].start, &existing, &exit)?;
                    let changed = joined != existing;
                    entry_states[succ] = Some(joined);
                    changed
                }
                None => {
                    entry_states[succ] = Some(exit.clone());
                    true
                }
            };
            if changed {
                worklist.push_back(succ);
            }
        }
    }
    Ok(())
}

fn block_exit_state(
    entry: &TypeState,
    block: &BasicBlock,
    instrs: &[DecodedInstr],
    resolver: &TypeResolver,
    constants: &dyn AbcConstantPool,
) -> TranslateResult<TypeState> {
    let mut state = entry.clone();
    for idx in block.instrs.clone() {
        let instr = &instrs[idx];
        apply_type_effect(&instr.op, instr.offset, &mut state, resolver, constants)?;
    }
    Ok(state)
}

fn class_of(ty: &TypeSignature, offset: u32) -> VerifyResult<ClassId> {
    match ty.unref() {
        TypeSignature::Class(id) => Ok(*id),
        other => Err(VerifyError::TypeMismatch {
            offset,
            expected: "Class".to_string(),
            found: format!("{other:?}"),
        }),
    }
}

fn canonical_name_of(resolver: &TypeResolver, cid: ClassId, offset: u32) -> VerifyResult<String> {
    resolver
        .descriptor(cid)
        .map(|d| d.qualified_name.canonical())
        .ok_or(VerifyError::UnresolvedType { offset, name: format!("{cid:?}") })
}

/// Type-only effect of one `AbcOp`, shared by the fixpoint pass (which only
/// needs the resulting stack/local shape) and [`lower_block`] (which needs
/// the same effect plus emission).
fn apply_type_effect(
    op: &AbcOp,
    offset: u32,
    state: &mut TypeState,
    resolver: &TypeResolver,
    constants: &dyn AbcConstantPool,
) -> TranslateResult<()> {
    use AbcOp::*;
    match op {
        Nop => {}
        Pop => {
            state.pop(offset)?;
        }
        Dup => {
            let t = state.pop(offset)?;
            state.push(t.clone());
            state.push(t);
        }
        PushNull | PushUndefined | PushFalse => state.push(TypeSignature::Any),
        PushTrue => state.push(TypeSignature::Primitive(PrimitiveKind::Bool)),
        PushByte(_) | PushInt(_) => state.push(TypeSignature::Primitive(PrimitiveKind::Int32)),
        PushDouble(_) => state.push(TypeSignature::Primitive(PrimitiveKind::Float64)),
        PushString(_) => state.push(TypeSignature::String),
        GetLocal(i) => {
            let t = state.local(offset, *i)?.clone();
            state.push(t);
        }
        SetLocal(i) => {
            let v = state.pop(offset)?;
            state.set_local(offset, *i, v)?;
        }
        GetLex(name) => {
            let cid = resolver.resolve_by_name(name)?;
            state.push(TypeSignature::Class(cid));
        }
        GetProperty(_) => {
            let recv = state.pop(offset)?;
            class_of(&recv, offset)?;
            state.push(TypeSignature::Any);
        }
        SetProperty(_) => {
            state.pop(offset)?;
            let recv = state.pop(offset)?;
            class_of(&recv, offset)?;
        }
        CallProperty { name, arg_count } => {
            for _ in 0..*arg_count {
                state.pop(offset)?;
            }
            let recv = state.pop(offset)?;
            let cid = class_of(&recv, offset)?;
            let cname = canonical_name_of(resolver, cid, offset)?;
            let sig = constants.method_signature(&cname, name);
            let pushed = if sig.return_type == TypeSignature::Void {
                TypeSignature::Any
            } else {
                sig.return_type
            };
            state.push(pushed);
        }
        CallPropertyVoid { arg_count, .. } => {
            for _ in 0..*arg_count {
                state.pop(offset)?;
            }
            let recv = state.pop(offset)?;
            class_of(&recv, offset)?;
        }
        ConstructProp { name, arg_count } => {
            for _ in 0..*arg_count {
                state.pop(offset)?;
            }
            state.pop(offset)?;
            let cid = resolver.resolve_by_name(name)?;
            state.push(TypeSignature::Class(cid));
        }
        Construct { arg_count } => {
            for _ in 0..*arg_count {
                state.pop(offset)?;
            }
            let ctor = state.pop(offset)?;
            let cid = class_of(&ctor, offset)?;
            state.push(TypeSignature::Class(cid));
        }
        NewObject { class_name } => {
            let cid = resolver.resolve_by_name(class_name)?;
            state.push(TypeSignature::Class(cid));
        }
        ReturnValue => {
            state.pop(offset)?;
        }
        ReturnVoid => {}
        Throw => {
            state.pop(offset)?;
        }
        Jump(_) => {}
        IfTrue(_) | IfFalse(_) => {
            state.pop(offset)?;
        }
        IfEq(_) | IfNe(_) | IfLt(_) | IfLe(_) | IfGt(_) | IfGe(_) => {
            state.pop(offset)?;
            state.pop(offset)?;
        }
        LookupSwitch { .. } => {
            state.pop(offset)?;
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn lower_block(
    block: &BasicBlock,
    instrs: &[DecodedInstr],
    mut state: TypeState,
    resolver: &TypeResolver,
    constants: &dyn AbcConstantPool,
    emitter: &mut InstructionEmitter,
    blocks: &[BasicBlock],
    labels: &[Label],
    local_handles: &[Local],
) -> TranslateResult<()> {
    let label_for = |offset: u32| -> VerifyResult<Label> {
        cfg::block_at(blocks, offset)
            .map(|idx| labels[idx])
            .ok_or(VerifyError::UndefinedBranchTarget { from: offset, target: offset })
    };

    for idx in block.instrs.clone() {
        let instr = &instrs[idx];
        let offset = instr.offset;
        match &instr.op {
            AbcOp::Nop => {
                emitter.emit(Opcode::Nop, Operand::None)?;
            }
            AbcOp::Pop => {
                state.pop(offset)?;
                emitter.emit(Opcode::Pop, Operand::None)?;
            }
            AbcOp::Dup => {
                let t = state.pop(offset)?;
                state.push(t.clone());
                state.push(t);
                emitter.emit(Opcode::Dup, Operand::None)?;
            }
            AbcOp::PushNull | AbcOp::PushUndefined | AbcOp::PushFalse => {
                state.push(TypeSignature::Any);
                emitter.emit(Opcode::LdcI4, Operand::Int32(0))?;
            }
            AbcOp::PushTrue => {
                state.push(TypeSignature::Primitive(PrimitiveKind::Bool));
                emitter.emit(Opcode::LdcI4, Operand::Int32(1))?;
            }
            AbcOp::PushByte(b) => {
                state.push(TypeSignature::Primitive(PrimitiveKind::Int32));
                emitter.emit(Opcode::LdcI4, Operand::Int32(*b as i32))?;
            }
            AbcOp::PushInt(n) => {
                state.push(TypeSignature::Primitive(PrimitiveKind::Int32));
                emitter.emit(Opcode::LdcI4, Operand::Int32(*n))?;
            }
            AbcOp::PushDouble(d) => {
                state.push(TypeSignature::Primitive(PrimitiveKind::Float64));
                emitter.emit(Opcode::LdcR8, Operand::Float64(*d))?;
            }
            AbcOp::PushString(s) => {
                state.push(TypeSignature::String);
                emitter.emit(Opcode::LdStr, Operand::Token(TokenOperand::String(s.clone())))?;
            }
            AbcOp::GetLocal(i) => {
                let ty = state.local(offset, *i)?.clone();
                state.push(ty);
                let local = *local_handles
                    .get(*i as usize)
                    .ok_or(VerifyError::IndexOutOfBounds { offset, index: *i })?;
                emitter.emit(Opcode::LdLoc, Operand::Local(local))?;
            }
            AbcOp::SetLocal(i) => {
                let v = state.pop(offset)?;
                state.set_local(offset, *i, v)?;
                let local = *local_handles
                    .get(*i as usize)
                    .ok_or(VerifyError::IndexOutOfBounds { offset, index: *i })?;
                emitter.emit(Opcode::StLoc, Operand::Local(local))?;
            }
            AbcOp::GetLex(name) => {
                let cid = resolver.resolve_by_name(name)?;
                state.push(TypeSignature::Class(cid));
            }
            AbcOp::GetProperty(name) => {
                let recv = state.pop(offset)?;
                let rcid = class_of(&recv, offset)?;
                state.push(TypeSignature::Any);
                emitter.emit(Opcode::LdFld, Operand::Token(TokenOperand::Field(rcid, name.clone())))?;
            }
            AbcOp::SetProperty(name) => {
                state.pop(offset)?;
                let recv = state.pop(offset)?;
                let rcid = class_of(&recv, offset)?;
                emitter.emit(Opcode::StFld, Operand::Token(TokenOperand::Field(rcid, name.clone())))?;
            }
            AbcOp::CallProperty { name, arg_count } => {
                for _ in 0..*arg_count {
                    state.pop(offset)?;
                }
                let recv = state.pop(offset)?;
                let rcid = class_of(&recv, offset)?;
                let cname = canonical_name_of(resolver, rcid, offset)?;
                let sig = constants.method_signature(&cname, name);
                let pushed = if sig.return_type == TypeSignature::Void {
                    TypeSignature::Any
                } else {
                    sig.return_type.clone()
                };
                state.push(pushed);
                emitter.emit(Opcode::CallVirt, Operand::Token(TokenOperand::Method(rcid, name.clone())))?;
            }
            AbcOp::CallPropertyVoid { name, arg_count } => {
                for _ in 0..*arg_count {
                    state.pop(offset)?;
                }
                let recv = state.pop(offset)?;
                let rcid = class_of(&recv, offset)?;
                emitter.emit(Opcode::CallVirt, Operand::Token(TokenOperand::Method(rcid, name.clone())))?;
            }
            AbcOp::ConstructProp { name, arg_count } => {
                for _ in 0..*arg_count {
                    state.pop(offset)?;
                }
                state.pop(offset)?;
                let cid = resolver.resolve_by_name(name)?;
                state.push(TypeSignature::Class(cid));
                emitter.emit(
                    Opcode::NewObj,
                    Operand::Token(TokenOperand::Method(cid, "constructor".to_string())),
                )?;
            }
            AbcOp::Construct { arg_count } => {
                for _ in 0..*arg_count {
                    state.pop(offset)?;
                }
                let ctor = state.pop(offset)?;
                let cid = class_of(&ctor, offset)?;
                state.push(TypeSignature::Class(cid));
                emitter.emit(
                    Opcode::NewObj,
                    Operand::Token(TokenOperand::Method(cid, "constructor".to_string())),
                )?;
            }
            AbcOp::NewObject { class_name } => {
                let cid = resolver.resolve_by_name(class_name)?;
                state.push(TypeSignature::Class(cid));
                emitter.emit(
                    Opcode::NewObj,
                    Operand::Token(TokenOperand::Method(cid, "constructor".to_string())),
                )?;
            }
            AbcOp::ReturnValue => {
                state.pop(offset)?;
                emitter.emit(Opcode::Ret, Operand::None)?;
            }
            AbcOp::ReturnVoid => {
                emitter.emit(Opcode::Ret, Operand::None)?;
            }
            AbcOp::Throw => {
                state.pop(offset)?;
                emitter.emit(Opcode::Throw, Operand::None)?;
            }
            AbcOp::Jump(target) => {
                emitter.emit(Opcode::Br, Operand::Branch(label_for(*target)?))?;
            }
            AbcOp::IfTrue(target) => {
                state.pop(offset)?;
                emitter.emit(Opcode::BrTrue, Operand::Branch(label_for(*target)?))?;
            }
            AbcOp::IfFalse(target) => {
                state.pop(offset)?;
                emitter.emit(Opcode::BrFalse, Operand::Branch(label_for(*target)?))?;
            }
            AbcOp::IfEq(target) => {
                state.pop(offset)?;
                state.pop(offset)?;
                emitter.emit(Opcode::Beq, Operand::Branch(label_for(*target)?))?;
            }
            AbcOp::IfNe(target) => {
                state.pop(offset)?;
                state.pop(offset)?;
                emitter.emit(Opcode::Bne, Operand::Branch(label_for(*target)?))?;
            }
            AbcOp::IfLt(target) => {
                state.pop(offset)?;
                state.pop(offset)?;
                emitter.emit(Opcode::Blt, Operand::Branch(label_for(*target)?))?;
            }
            AbcOp::IfLe(target) => {
                state.pop(offset)?;
                state.pop(offset)?;
                emitter.emit(Opcode::Ble, Operand::Branch(label_for(*target)?))?;
            }
            AbcOp::IfGt(target) => {
                state.pop(offset)?;
                state.pop(offset)?;
                emitter.emit(Opcode::Bgt, Operand::Branch(label_for(*target)?))?;
            }
            AbcOp::IfGe(target) => {
                state.pop(offset)?;
                state.pop(offset)?;
                emitter.emit(Opcode::Bge, Operand::Branch(label_for(*target)?))?;
            }
            AbcOp::LookupSwitch { default_target, case_targets } => {
                state.pop(offset)?;
                let case_labels = case_targets
                    .iter()
                    .map(|t| label_for(*t))
                    .collect::<VerifyResult<Vec<_>>>()?;
                emitter.emit(Opcode::Switch, Operand::Switch(case_labels))?;
                emitter.emit(Opcode::Br, Operand::Branch(label_for(*default_target)?))?;
            }
        }
    }
    Ok(())
}

/// What must happen to the emitter's exception-region machine right before
/// the block starting at a given offset (spec.md §4.5 "Exception
/// reconstruction").
enum ExcAction {
    BeginTry,
    BeginFilter,
    BeginCatch(Option<ClassId>),
    BeginFault,
    BeginFinally,
    EndTry,
}

fn apply_exception_action(act: &ExcAction, emitter: &mut InstructionEmitter) -> TranslateResult<()> {
    match act {
        ExcAction::BeginTry => emitter.begin_try()?,
        ExcAction::BeginFilter => emitter.begin_filter()?,
        ExcAction::BeginCatch(ty) => emitter.begin_catch(*ty)?,
        ExcAction::BeginFault => emitter.begin_fault()?,
        ExcAction::BeginFinally => emitter.begin_finally()?,
        ExcAction::EndTry => emitter.end_try()?,
    }
    Ok(())
}

/// Groups `exceptions` by `(try_start, try_end)` (spec.md §3's continuation
/// rule) and lays out the `begin_*`/`end_try` call sequence each group needs,
/// keyed by the code offset each call belongs at.
fn build_exception_actions(
    exceptions: &[AbcExceptionInfo],
    resolver: &TypeResolver,
) -> TranslateResult<BTreeMap<u32, Vec<ExcAction>>> {
    let mut actions: BTreeMap<u32, Vec<ExcAction>> = BTreeMap::new();
    let mut seen_groups: HashSet<(u32, u32)> = HashSet::new();

    for ex in exceptions {
        if seen_groups.insert((ex.try_start, ex.try_end)) {
            actions.entry(ex.try_start).or_default().push(ExcAction::BeginTry);
        }
        let catch_type = match &ex.catch_type_name {
            Some(name) => Some(resolver.resolve_by_name(name)?),
            None => None,
        };
        match ex.kind {
            ExceptionKind::Catch => {
                actions.entry(ex.handler_start).or_default().push(ExcAction::BeginCatch(catch_type));
            }
            ExceptionKind::Filter => {
                let filter_start = ex.filter_start.ok_or(VerifyError::MalformedExceptionRegion {
                    try_start: ex.try_start,
                    reason: "filter exception kind requires filter_start",
                })?;
                actions.entry(filter_start).or_default().push(ExcAction::BeginFilter);
                actions.entry(ex.handler_start).or_default().push(ExcAction::BeginCatch(catch_type));
            }
            ExceptionKind::Fault => {
                actions.entry(ex.handler_start).or_default().push(ExcAction::BeginFault);
            }
            ExceptionKind::Finally => {
                actions.entry(ex.handler_start).or_default().push(ExcAction::BeginFinally);
            }
        }
        actions.entry(ex.handler_end).or_default().push(ExcAction::EndTry);
    }

    Ok(actions)
}
