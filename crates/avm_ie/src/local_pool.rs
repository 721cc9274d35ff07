use avm_core::locals::{Local, LocalSlot, LocalStatus, MAX_LOCAL_INDEX};
use avm_core::types::TypeSignature;
use avm_core::LocalIndex;

use crate::error::{EmitError, EmitResult};

/// Declared-local and temp-pool bookkeeping (spec.md §3 "Local variable",
/// §8 invariant 7). Kept separate from [`crate::emitter::InstructionEmitter`]
/// so the reuse rule can be unit-tested in isolation.
#[derive(Debug, Default)]
pub struct LocalPool {
    slots: Vec<LocalSlot>,
}

impl LocalPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.slots.clear();
    }

    pub fn slot(&self, local: Local) -> Option<&LocalSlot> {
        self.slots.get(local.index() as usize)
    }

    fn push_slot(&mut self, signature: TypeSignature, pinned: bool, status: LocalStatus) -> EmitResult<Local> {
        if self.slots.len() as u32 > MAX_LOCAL_INDEX {
            return Err(EmitError::LocalLimit);
        }
        let index = LocalIndex(self.slots.len() as u16);
        self.slots.push(LocalSlot {
            index,
            signature,
            pinned,
            status,
        });
        Ok(Local(index))
    }

    /// `declare_local(sig, pinned?)` (spec.md §4.1 contract table).
    pub fn declare_local(&mut self, signature: TypeSignature, pinned: bool) -> EmitResult<Local> {
        self.push_slot(signature, pinned, LocalStatus::Persistent)
    }

    /// `acquire_temp(sig)`: reuses a disposed slot with a matching
    /// signature before allocating a fresh one (spec.md §8 invariant 7).
    pub fn acquire_temp(&mut self, signature: TypeSignature) -> EmitResult<Local> {
        if let Some(slot) = self.slots.iter_mut().find(|s| s.is_available_for(&signature)) {
            slot.status = LocalStatus::TempActive;
            return Ok(Local(slot.index));
        }
        self.push_slot(signature, false, LocalStatus::TempActive)
    }

    /// `release_temp(local)`.
    pub fn release_temp(&mut self, local: Local) -> EmitResult<()> {
        let slot = self
            .slots
            .get_mut(local.index() as usize)
            .ok_or(EmitError::InvalidLease(local))?;
        if slot.status != LocalStatus::TempActive {
            return Err(EmitError::InvalidLease(local));
        }
        slot.status = LocalStatus::TempDisposed;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LocalSlot> {
        self.slots.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declare_local_assigns_sequential_indices() {
        let mut pool = LocalPool::new();
        let a = pool.declare_local(TypeSignature::Any, false).unwrap();
        let b = pool.declare_local(TypeSignature::String, false).unwrap();
        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);
    }

    #[test]
    fn released_temp_is_reused_by_a_matching_request() {
        let mut pool = LocalPool::new();
        let a = pool.acquire_temp(TypeSignature::String).unwrap();
        pool.release_temp(a).unwrap();
        let b = pool.acquire_temp(TypeSignature::String).unwrap();
        assert_eq!(a, b);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn released_temp_is_not_reused_for_a_different_signature() {
        let mut pool = LocalPool::new();
        let a = pool.acquire_temp(TypeSignature::String).unwrap();
        pool.release_temp(a).unwrap();
        let b = pool.acquire_temp(TypeSignature::Any).unwrap();
        assert_ne!(a, b);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn releasing_a_slot_twice_is_an_invalid_lease() {
        let mut pool = LocalPool::new();
        let a = pool.acquire_temp(TypeSignature::Any).unwrap();
        pool.release_temp(a).unwrap();
        let err = pool.release_temp(a).unwrap_err();
        assert!(matches!(err, EmitError::InvalidLease(_)));
    }

    #[test]
    fn releasing_a_persistent_local_is_an_invalid_lease() {
        let mut pool = LocalPool::new();
        let a = pool.declare_local(TypeSignature::Any, false).unwrap();
        let err = pool.release_temp(a).unwrap_err();
        assert!(matches!(err, EmitError::InvalidLease(_)));
    }
}
