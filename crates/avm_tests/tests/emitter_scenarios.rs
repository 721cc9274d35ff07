//! End-to-end scenarios S1-S6 (spec.md §8), run directly against the
//! instruction emitter the way the teacher's `bsharp_tests` crate drives its
//! IL builder through a handful of named scenarios rather than one opcode at
//! a time.

mod support;

use avm_core::types::TypeSignature;
use avm_ie::opcode::wire;
use avm_ie::{EmitError, InstructionEmitter, Opcode, Operand};

/// S1 — short branch selection: `ldc_i4 0; brfalse L; ldc_i4 1; mark L; ret`.
/// The branch is within short range, so it collapses to `brfalse_s` and the
/// final stream is five bytes: `ldc_i4_0`(1) + `brfalse_s`+disp(2) +
/// `ldc_i4_1`(1) + `ret`(1).
#[test]
fn s1_short_branch_selection() {
    support::init_test_logging();

    let mut emitter = InstructionEmitter::new(None);
    let target = emitter.create_label();
    emitter.emit(Opcode::LdcI4, Operand::Int32(0)).unwrap();
    emitter.emit(Opcode::BrFalse, Operand::Branch(target)).unwrap();
    emitter.emit(Opcode::LdcI4, Operand::Int32(1)).unwrap();
    emitter.mark_label(target).unwrap();
    emitter.emit(Opcode::Ret, Operand::None).unwrap();

    let body = emitter.finalize().unwrap();
    assert_eq!(body.code_bytes.len(), 5);
    assert_eq!(body.code_bytes[1], wire::short_branch_form(wire::BRFALSE));
    assert_eq!(body.max_stack, 1);
}

/// S2 — switch is never shortened: `ldc_i4 0; switch [A,B,C]; mark A; ret;
/// mark B; ret; mark C; ret`. The switch instruction is `op(1) + count(4) +
/// 3 displacement entries(4 each) = 17` bytes, always long form.
#[test]
fn s2_switch_is_not_shortened() {
    support::init_test_logging();

    let mut emitter = InstructionEmitter::new(None);
    let labels = emitter.create_label_group(3).unwrap();
    emitter.emit(Opcode::LdcI4, Operand::Int32(0)).unwrap();
    emitter.emit(Opcode::Switch, Operand::Switch(labels.clone())).unwrap();
    for label in &labels {
        emitter.mark_label(*label).unwrap();
        emitter.emit(Opcode::Ret, Operand::None).unwrap();
    }

    let body = emitter.finalize().unwrap();
    // ldc_i4_0(1) + switch table(17) + 3 * ret(1)
    assert_eq!(body.code_bytes.len(), 1 + 17 + 3);
    assert_eq!(body.code_bytes[1], wire::SWITCH);
    assert_eq!(body.max_stack, 1);

    // The full byte layout (opcode, count, three displacements, three rets)
    // is easier to eyeball as one snapshot than as a wall of indexed asserts.
    insta::assert_snapshot!(
        format!("{:?}", body.code_bytes),
        @"[17, 73, 3, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 2, 0, 0, 0, 3, 3, 3]"
    );
}

/// S3 — try/catch with leave compaction: a try body that pushes a value,
/// a catch clause that discards the caught exception, and an automatic
/// `leave` inserted at the try body's end since the body doesn't end in a
/// terminal instruction of its own.
#[test]
fn s3_try_catch_with_leave_compaction() {
    support::init_test_logging();

    let mut emitter = InstructionEmitter::new(None);
    emitter.begin_try().unwrap();
    emitter.emit(Opcode::LdcI4, Operand::Int32(1)).unwrap();
    emitter.begin_catch(None).unwrap();
    emitter.emit(Opcode::Pop, Operand::None).unwrap();
    emitter.end_try().unwrap();

    let body = emitter.finalize().unwrap();
    assert!(!body.exception_section_bytes.is_empty());
    assert!(body.max_stack >= 1);
    // try body: ldc_i4_1(1); handler body: pop(1) then an implicit
    // leave_s+disp(2) closing the clause, since `pop` isn't terminal.
    assert_eq!(body.code_bytes.len(), 4);
    assert_eq!(body.code_bytes[1], wire::POP);
    assert_eq!(body.code_bytes[2], wire::LEAVE_S);
}

/// S4 — long-form necessary: 200 `nop`s sit between the branch and its
/// label, so the displacement doesn't fit a short form and the branch stays
/// long, 4-byte little-endian displacement.
#[test]
fn s4_long_form_necessary_over_long_distance() {
    support::init_test_logging();

    let mut emitter = InstructionEmitter::new(None);
    let target = emitter.create_label();
    emitter.emit(Opcode::Br, Operand::Branch(target)).unwrap();
    for _ in 0..200 {
        emitter.emit(Opcode::Nop, Operand::None).unwrap();
    }
    emitter.mark_label(target).unwrap();

    let body = emitter.finalize().unwrap();
    assert_eq!(body.code_bytes[0], wire::BR);
    let disp = i32::from_le_bytes(body.code_bytes[1..5].try_into().unwrap());
    assert_eq!(disp, 200);
    assert_eq!(body.code_bytes.len(), 5 + 200);
}

/// S5 — relocation correctness on chained short branches: three independent
/// forward branches, each shortenable by 3 bytes, must all land on the
/// correct post-relocation target.
#[test]
fn s5_relocation_correctness_on_chained_short_branches() {
    support::init_test_logging();

    let mut emitter = InstructionEmitter::new(None);
    let t1 = emitter.create_label();
    let t2 = emitter.create_label();
    let t3 = emitter.create_label();

    emitter.emit(Opcode::Br, Operand::Branch(t1)).unwrap();
    emitter.emit(Opcode::Nop, Operand::None).unwrap();
    emitter.mark_label(t1).unwrap();

    emitter.emit(Opcode::Br, Operand::Branch(t2)).unwrap();
    emitter.emit(Opcode::Nop, Operand::None).unwrap();
    emitter.mark_label(t2).unwrap();

    emitter.emit(Opcode::Br, Operand::Branch(t3)).unwrap();
    emitter.emit(Opcode::Nop, Operand::None).unwrap();
    emitter.mark_label(t3).unwrap();

    let body = emitter.finalize().unwrap();
    // before shortening: 3 * (5 + 1) = 18 bytes; each branch shortens by 3.
    assert_eq!(body.code_bytes.len(), 18 - 9);

    // every branch collapsed to its short form: opcode, then 1-byte forward
    // displacement of +1 (skip over the following nop onto the next branch).
    assert_eq!(body.code_bytes[0], wire::short_branch_form(wire::BR));
    assert_eq!(body.code_bytes[1] as i8, 1);
    assert_eq!(body.code_bytes[3], wire::short_branch_form(wire::BR));
    assert_eq!(body.code_bytes[4] as i8, 1);
    assert_eq!(body.code_bytes[6], wire::short_branch_form(wire::BR));
    assert_eq!(body.code_bytes[7] as i8, 1);

    insta::assert_snapshot!(
        format!("{:?}", body.code_bytes),
        @"[51, 1, 0, 51, 1, 0, 51, 1, 0]"
    );
}

/// S6 — an unmarked label is fatal: finalize must reject the method and
/// produce no body at all.
#[test]
fn s6_unmarked_label_is_fatal() {
    support::init_test_logging();

    let mut emitter = InstructionEmitter::new(None);
    let target = emitter.create_label();
    emitter.emit(Opcode::Br, Operand::Branch(target)).unwrap();
    let err = emitter.finalize().unwrap_err();
    assert!(matches!(err, EmitError::UnmarkedLabel(_)));
}

/// Invariant 7 restated as an end-to-end scenario: releasing a temp and
/// re-acquiring with the same signature returns the identical local, a
/// different signature gets a fresh one.
#[test]
fn temp_pool_reuse_round_trip() {
    support::init_test_logging();

    let mut emitter = InstructionEmitter::new(None);
    let a = emitter.acquire_temp(TypeSignature::String).unwrap();
    emitter.release_temp(a).unwrap();
    let b = emitter.acquire_temp(TypeSignature::String).unwrap();
    assert_eq!(a, b);

    emitter.release_temp(b).unwrap();
    let c = emitter.acquire_temp(TypeSignature::Any).unwrap();
    assert_ne!(b, c);
}
