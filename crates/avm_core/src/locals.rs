use crate::ids::LocalIndex;
use crate::types::TypeSignature;

/// Lifecycle state of a declared local slot (spec.md §3, "Local variable").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalStatus {
    /// Explicitly declared, kept for the whole method.
    Persistent,
    /// Leased from the temp pool and currently in use.
    TempActive,
    /// Released by its last lessee; available for reuse by a request with a
    /// matching type signature.
    TempDisposed,
}

#[derive(Debug, Clone)]
pub struct LocalSlot {
    pub index: LocalIndex,
    pub signature: TypeSignature,
    pub pinned: bool,
    pub status: LocalStatus,
}

impl LocalSlot {
    pub fn is_available_for(&self, sig: &TypeSignature) -> bool {
        matches!(self.status, LocalStatus::TempDisposed) && &self.signature == sig
    }
}

/// A handle returned to callers of `declare_local`/`acquire_temp`. Scoped to
/// the emitter that issued it (spec.md §3, "Lifecycle").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Local(pub LocalIndex);

impl Local {
    pub fn index(&self) -> u16 {
        self.0 .0
    }
}

/// Maximum local index a method body may declare (spec.md §3: `[0, 65534]`).
pub const MAX_LOCAL_INDEX: u32 = 65_534;
