use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use avm_core::types::{CallKind, TypeSignature};
use avm_core::ClassId;

use crate::provider::{EntityHandle, StandaloneSignatureHandle, TokenProvider, UserStringHandle};
use crate::signature::MethodSignature;
use crate::static_provider::stack_delta_for;

/// Materializes handles on demand for in-process execution (spec.md §4.2).
/// `ClassId` already is the reference-equality key TR hands out per
/// resolved descriptor (spec.md §4.3 "Uniqueness"), so caching on
/// `(ClassId, name)` pairs here has the same effect as caching on host
/// descriptor identity.
///
/// Not thread-safe (spec.md §9: "the dynamic TP requires the `is_virtual`
/// bit to stay false and the local-signature helper path to be used" — it
/// is documented as single-threaded, §5: "The provided dynamic token
/// provider is **not** thread-safe").
#[derive(Default)]
pub struct DynamicTokenProvider {
    next_handle: Cell<EntityHandle>,
    type_handles: RefCell<HashMap<ClassId, EntityHandle>>,
    type_signatures: RefCell<HashMap<ClassId, TypeSignature>>,
    field_handles: RefCell<HashMap<(ClassId, String), EntityHandle>>,
    method_handles: RefCell<HashMap<(ClassId, String), EntityHandle>>,
    method_signatures: RefCell<HashMap<EntityHandle, MethodSignature>>,
    strings: RefCell<HashMap<String, UserStringHandle>>,
    signature_handles: RefCell<HashMap<Vec<u8>, StandaloneSignatureHandle>>,
}

impl DynamicTokenProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc(&self) -> EntityHandle {
        let h = self.next_handle.get();
        self.next_handle.set(h + 1);
        h
    }

    /// Registers the signature a later `method_stack_delta`/`signature_for_type`
    /// query needs; callers resolve this before the method that references it
    /// is translated (mirrors the resolver populating TR's symbol table ahead
    /// of VT's queries).
    pub fn register_type(&self, ty: ClassId, signature: TypeSignature) {
        self.type_signatures.borrow_mut().insert(ty, signature);
    }

    pub fn register_method_signature(&self, ty: ClassId, name: &str, signature: MethodSignature) {
        let handle = self.handle_for_method(ty, name);
        self.method_signatures.borrow_mut().insert(handle, signature);
    }
}

impl TokenProvider for DynamicTokenProvider {
    fn handle_for_type(&self, ty: ClassId) -> EntityHandle {
        if let Some(h) = self.type_handles.borrow().get(&ty) {
            return *h;
        }
        let h = self.alloc();
        self.type_handles.borrow_mut().insert(ty, h);
        h
    }

    fn handle_for_field(&self, ty: ClassId, field_name: &str) -> EntityHandle {
        let key = (ty, field_name.to_string());
        if let Some(h) = self.field_handles.borrow().get(&key) {
            return *h;
        }
        let h = self.alloc();
        self.field_handles.borrow_mut().insert(key, h);
        h
    }

    fn handle_for_method(&self, ty: ClassId, method_name: &str) -> EntityHandle {
        let key = (ty, method_name.to_string());
        if let Some(h) = self.method_handles.borrow().get(&key) {
            return *h;
        }
        let h = self.alloc();
        self.method_handles.borrow_mut().insert(key, h);
        h
    }

    fn handle_for_string(&self, s: &str) -> UserStringHandle {
        if let Some(h) = self.strings.borrow().get(s) {
            return *h;
        }
        let h = self.alloc();
        self.strings.borrow_mut().insert(s.to_string(), h);
        h
    }

    fn handle_for_signature(&self, sig: &MethodSignature) -> EntityHandle {
        if let Some((h, _)) = self
            .method_signatures
            .borrow()
            .iter()
            .find(|(_, s)| *s == sig)
        {
            return *h;
        }
        let h = self.alloc();
        self.method_signatures.borrow_mut().insert(h, sig.clone());
        h
    }

    fn is_virtual(&self, _h: EntityHandle) -> bool {
        // spec.md §9: dynamic handles are never fixed until persistence,
        // which this provider never does; every handle it hands out is
        // virtual until a later stage patches it.
        true
    }

    fn signature_for_type(&self, ty: ClassId) -> TypeSignature {
        self.type_signatures
            .borrow()
            .get(&ty)
            .cloned()
            .unwrap_or_else(|| panic!("type {ty:?} registered no signature with the dynamic provider"))
    }

    fn use_signature_helper(&self) -> bool {
        true
    }

    fn local_signature_handle(&self, bytes: &[u8]) -> StandaloneSignatureHandle {
        if let Some(h) = self.signature_handles.borrow().get(bytes) {
            return *h;
        }
        let h = self.alloc();
        self.signature_handles
            .borrow_mut()
            .insert(bytes.to_vec(), h);
        h
    }

    fn method_stack_delta(&self, h: EntityHandle, opcode: CallKind) -> i32 {
        let signatures = self.method_signatures.borrow();
        let sig = signatures
            .get(&h)
            .unwrap_or_else(|| panic!("method handle {h} has no registered signature"));
        stack_delta_for(sig, opcode)
    }
}
