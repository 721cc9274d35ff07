use crate::label::Label;

/// A branch awaiting resolution at `finalize()` (spec.md §3, "Branch
/// record"). All branches are emitted in long form first; `finalize` may
/// rewrite eligible ones to short form (spec.md §4.1, "Label binding and
/// branch selection").
#[derive(Debug, Clone)]
pub struct BranchRecord {
    /// Byte position where the displacement is written.
    pub offset_pos: u32,
    /// Position the displacement is measured from (end of the instruction).
    pub base_pos: u32,
    pub target: Label,
    /// The long-form opcode as originally emitted.
    pub opcode: u8,
    /// Whether `finalize` rewrote this branch to its short form.
    pub short_form: bool,
}

/// Produced when a long-form branch collapses to short form, shaving 3 bytes
/// (spec.md §3, "Relocation record").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelocationRecord {
    pub start_offset: u32,
    /// Always `-3` per relocation in this design (one relocation per
    /// shortened branch); kept as a field rather than a constant so the
    /// monotone-shift math below reads the same way spec.md §8 invariant 2
    /// states it.
    pub cumulative_shift: i32,
}

/// Computes `shift(p) = Σ{r.shift : r.start_offset ≤ p}` over a
/// relocation list sorted ascending by `start_offset` (spec.md §3 /
/// §8 invariant 2). `relocations` must already be sorted; this is a binary
/// search over the prefix sums.
pub fn shift_at(relocations: &[RelocationRecord], p: u32) -> i32 {
    // Partition point: first index whose start_offset > p.
    let idx = relocations.partition_point(|r| r.start_offset <= p);
    relocations[..idx].iter().map(|r| r.cumulative_shift).sum()
}

/// Applies the monotone relocation function to a pre-shortening position.
pub fn relocate(relocations: &[RelocationRecord], p: u32) -> u32 {
    (p as i64 + shift_at(relocations, p) as i64) as u32
}
