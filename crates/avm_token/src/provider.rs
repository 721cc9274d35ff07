use avm_core::types::{CallKind, TypeSignature};
use avm_core::ClassId;

use crate::signature::MethodSignature;

pub type EntityHandle = u32;
pub type UserStringHandle = u32;
pub type StandaloneSignatureHandle = u32;

/// Abstract source of opaque handles the instruction emitter embeds into a
/// method body (spec.md §4.2). Implementations must be internally
/// consistent: a handle returned for a given `(type, member)` pair must
/// compare equal to any other handle this provider returns for the same
/// pair.
pub trait TokenProvider {
    fn handle_for_type(&self, ty: ClassId) -> EntityHandle;
    fn handle_for_field(&self, ty: ClassId, field_name: &str) -> EntityHandle;
    fn handle_for_method(&self, ty: ClassId, method_name: &str) -> EntityHandle;
    fn handle_for_string(&self, s: &str) -> UserStringHandle;
    fn handle_for_signature(&self, sig: &MethodSignature) -> EntityHandle;

    /// True when `h`'s final on-disk encoding is not yet fixed (spec.md
    /// §4.1 "Virtual tokens"); the emitter records such offsets for later
    /// patching.
    fn is_virtual(&self, h: EntityHandle) -> bool;

    fn signature_for_type(&self, ty: ClassId) -> TypeSignature;

    /// Selects which of the two local-signature encoding modes the emitter
    /// must use (spec.md §4.1 "Local signature").
    fn use_signature_helper(&self) -> bool;

    fn local_signature_handle(&self, bytes: &[u8]) -> StandaloneSignatureHandle;

    /// `args_popped + this_popped − return_pushed`, adjusted for `newobj`
    /// (spec.md §4.1).
    fn method_stack_delta(&self, h: EntityHandle, opcode: CallKind) -> i32;
}
