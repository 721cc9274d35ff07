use std::collections::HashMap;

use avm_core::types::{CallKind, TypeSignature};
use avm_core::ClassId;

use crate::provider::{EntityHandle, StandaloneSignatureHandle, TokenProvider, UserStringHandle};
use crate::signature::MethodSignature;

/// Pre-assigned handles into a persisted metadata image (spec.md §4.2,
/// "static ... pre-baked indices into a metadata image"). Built once, then
/// read-only: safe to share across threads without synchronization.
#[derive(Debug, Default)]
pub struct StaticTokenProvider {
    type_handles: HashMap<ClassId, EntityHandle>,
    type_signatures: HashMap<ClassId, TypeSignature>,
    field_handles: HashMap<(ClassId, String), EntityHandle>,
    method_handles: HashMap<(ClassId, String), EntityHandle>,
    method_signatures: HashMap<EntityHandle, MethodSignature>,
    strings: HashMap<String, UserStringHandle>,
    signature_handles: HashMap<Vec<u8>, StandaloneSignatureHandle>,
    next_handle: EntityHandle,
}

/// Assembles a [`StaticTokenProvider`] before it is frozen and shared.
#[derive(Debug, Default)]
pub struct StaticTokenProviderBuilder {
    image: StaticTokenProvider,
}

impl StaticTokenProviderBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc(&mut self) -> EntityHandle {
        let h = self.image.next_handle;
        self.image.next_handle += 1;
        h
    }

    pub fn define_type(&mut self, ty: ClassId, signature: TypeSignature) -> EntityHandle {
        let h = self.alloc();
        self.image.type_handles.insert(ty, h);
        self.image.type_signatures.insert(ty, signature);
        h
    }

    pub fn define_field(&mut self, ty: ClassId, name: impl Into<String>) -> EntityHandle {
        let h = self.alloc();
        self.image.field_handles.insert((ty, name.into()), h);
        h
    }

    pub fn define_method(
        &mut self,
        ty: ClassId,
        name: impl Into<String>,
        signature: MethodSignature,
    ) -> EntityHandle {
        let h = self.alloc();
        self.image.method_handles.insert((ty, name.into()), h);
        self.image.method_signatures.insert(h, signature);
        h
    }

    pub fn intern_string(&mut self, s: impl Into<String>) -> UserStringHandle {
        let s = s.into();
        if let Some(h) = self.image.strings.get(&s) {
            return *h;
        }
        let h = self.alloc();
        self.image.strings.insert(s, h);
        h
    }

    pub fn build(self) -> StaticTokenProvider {
        self.image
    }
}

impl TokenProvider for StaticTokenProvider {
    fn handle_for_type(&self, ty: ClassId) -> EntityHandle {
        *self
            .type_handles
            .get(&ty)
            .unwrap_or_else(|| panic!("type {ty:?} not present in static image"))
    }

    fn handle_for_field(&self, ty: ClassId, field_name: &str) -> EntityHandle {
        *self
            .field_handles
            .get(&(ty, field_name.to_string()))
            .unwrap_or_else(|| panic!("field {ty:?}.{field_name} not present in static image"))
    }

    fn handle_for_method(&self, ty: ClassId, method_name: &str) -> EntityHandle {
        *self
            .method_handles
            .get(&(ty, method_name.to_string()))
            .unwrap_or_else(|| panic!("method {ty:?}.{method_name} not present in static image"))
    }

    fn handle_for_string(&self, s: &str) -> UserStringHandle {
        *self
            .strings
            .get(s)
            .unwrap_or_else(|| panic!("string {s:?} not interned in static image"))
    }

    fn handle_for_signature(&self, sig: &MethodSignature) -> EntityHandle {
        self.method_signatures
            .iter()
            .find(|(_, s)| *s == sig)
            .map(|(h, _)| *h)
            .unwrap_or_else(|| panic!("signature {sig:?} not present in static image"))
    }

    fn is_virtual(&self, _h: EntityHandle) -> bool {
        // spec.md §9: "the static TP inverts both" (is_virtual always false,
        // direct signature encoding always used).
        false
    }

    fn signature_for_type(&self, ty: ClassId) -> TypeSignature {
        self.type_signatures
            .get(&ty)
            .cloned()
            .unwrap_or_else(|| panic!("type {ty:?} not present in static image"))
    }

    fn use_signature_helper(&self) -> bool {
        false
    }

    fn local_signature_handle(&self, bytes: &[u8]) -> StandaloneSignatureHandle {
        *self
            .signature_handles
            .get(bytes)
            .unwrap_or_else(|| panic!("local signature not pre-baked into static image"))
    }

    fn method_stack_delta(&self, h: EntityHandle, opcode: CallKind) -> i32 {
        let sig = self
            .method_signatures
            .get(&h)
            .unwrap_or_else(|| panic!("method handle {h} has no signature in static image"));
        stack_delta_for(sig, opcode)
    }
}

pub(crate) fn stack_delta_for(sig: &MethodSignature, opcode: CallKind) -> i32 {
    let pops = sig.pops() as i32;
    match opcode {
        CallKind::NewObj => 1 - (pops - i32::from(sig.has_this)),
        _ => sig.pushes() as i32 - pops,
    }
}
