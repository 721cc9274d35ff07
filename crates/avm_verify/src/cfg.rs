//! CFG skeleton (spec.md §4.5 step 2): basic-block leader computation.

use std::collections::BTreeSet;
use std::ops::Range;

use crate::abc::AbcExceptionInfo;
use crate::decode::DecodedInstr;
use crate::errors::{VerifyError, VerifyResult};

#[derive(Debug, Clone)]
pub struct BasicBlock {
    pub start: u32,
    pub end: u32,
    pub instrs: Range<usize>,
}

/// Leaders: the first instruction, the instruction after any
/// branch/throw/return, every branch target, and every exception-region
/// boundary (spec.md §4.5 step 2).
pub fn compute_leaders(
    instrs: &[DecodedInstr],
    exceptions: &[AbcExceptionInfo],
) -> VerifyResult<BTreeSet<u32>> {
    let mut leaders = BTreeSet::new();
    if let Some(first) = instrs.first() {
        leaders.insert(first.offset);
    }
    let offsets: BTreeSet<u32> = instrs.iter().map(|i| i.offset).collect();

    for (i, instr) in instrs.iter().enumerate() {
        if instr.op.is_block_terminator() {
            if let Some(next) = instrs.get(i + 1) {
                leaders.insert(next.offset);
            }
        }
        for target in instr.op.branch_targets() {
            if !offsets.contains(&target) {
                return Err(VerifyError::UndefinedBranchTarget { from: instr.offset, target });
            }
            leaders.insert(target);
        }
    }

    for ex in exceptions {
        if !offsets.contains(&ex.try_start) || !offsets.contains(&ex.handler_start) {
            return Err(VerifyError::MalformedExceptionRegion {
                try_start: ex.try_start,
                reason: "try_start or handler_start is not an instruction boundary",
            });
        }
        leaders.insert(ex.try_start);
        leaders.insert(ex.handler_start);
        if ex.try_end != ex.try_start && !offsets.contains(&ex.try_end) {
            return Err(VerifyError::MalformedExceptionRegion {
                try_start: ex.try_start,
                reason: "try_end is not an instruction boundary",
            });
        }
        leaders.insert(ex.try_end);
        if ex.handler_end != ex.handler_start && offsets.contains(&ex.handler_end) {
            leaders.insert(ex.handler_end);
        }
        if let Some(filter_start) = ex.filter_start {
            if !offsets.contains(&filter_start) {
                return Err(VerifyError::MalformedExceptionRegion {
                    try_start: ex.try_start,
                    reason: "filter_start is not an instruction boundary",
                });
            }
            leaders.insert(filter_start);
        }
    }

    Ok(leaders)
}

pub fn build_blocks(instrs: &[DecodedInstr], leaders: &BTreeSet<u32>) -> Vec<BasicBlock> {
    let mut blocks = Vec::new();
    let leader_vec: Vec<u32> = leaders.iter().copied().collect();
    for (i, &start) in leader_vec.iter().enumerate() {
        let end = leader_vec.get(i + 1).copied().unwrap_or(u32::MAX);
        let start_idx = instrs.partition_point(|instr| instr.offset < start);
        let end_idx = if end == u32::MAX {
            instrs.len()
        } else {
            instrs.partition_point(|instr| instr.offset < end)
        };
        let block_end = instrs.get(end_idx.saturating_sub(1)).map(|i| i.next_offset).unwrap_or(start);
        blocks.push(BasicBlock { start, end: block_end, instrs: start_idx..end_idx });
    }
    blocks
}

/// The index, within `blocks`, of the block starting at `offset`.
pub fn block_at(blocks: &[BasicBlock], offset: u32) -> Option<usize> {
    blocks.iter().position(|b| b.start == offset)
}
