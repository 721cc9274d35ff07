//! Abstract-stack simulation (spec.md §4.5 step 3): a "type state" per
//! basic-block entry (operand-stack snapshot + local-variable snapshot),
//! widened at joins using the least-common-supertype of the domain.

use std::collections::HashSet;

use avm_core::types::TypeSignature;
use avm_core::ClassId;
use avm_resolve::TypeResolver;

use crate::errors::{VerifyError, VerifyResult};

#[derive(Debug, Clone, PartialEq)]
pub struct TypeState {
    pub operand_stack: Vec<TypeSignature>,
    pub locals: Vec<TypeSignature>,
}

impl TypeState {
    pub fn entry(local_count: usize, param_types: &[TypeSignature]) -> Self {
        let mut locals = Vec::with_capacity(local_count);
        for i in 0..local_count {
            locals.push(param_types.get(i).cloned().unwrap_or(TypeSignature::Any));
        }
        TypeState { operand_stack: Vec::new(), locals }
    }

    pub fn push(&mut self, ty: TypeSignature) {
        self.operand_stack.push(ty);
    }

    pub fn pop(&mut self, offset: u32) -> VerifyResult<TypeSignature> {
        self.operand_stack
            .pop()
            .ok_or(VerifyError::StackUnderflow { offset })
    }

    pub fn local(&self, offset: u32, index: u32) -> VerifyResult<&TypeSignature> {
        self.locals
            .get(index as usize)
            .ok_or(VerifyError::IndexOutOfBounds { offset, index })
    }

    pub fn set_local(&mut self, offset: u32, index: u32, ty: TypeSignature) -> VerifyResult<()> {
        let slot = self
            .locals
            .get_mut(index as usize)
            .ok_or(VerifyError::IndexOutOfBounds { offset, index })?;
        *slot = ty;
        Ok(())
    }
}

/// Finds the nearest common ancestor of two classes by walking both base
/// chains (spec.md §4.5: "least-common-supertype of the domain").
fn least_common_class(resolver: &TypeResolver, a: ClassId, b: ClassId) -> Option<ClassId> {
    let mut ancestors = HashSet::new();
    let mut cur = Some(a);
    while let Some(c) = cur {
        ancestors.insert(c);
        cur = resolver.descriptor(c).and_then(|d| d.base);
    }
    let mut cur = Some(b);
    while let Some(c) = cur {
        if ancestors.contains(&c) {
            return Some(c);
        }
        cur = resolver.descriptor(c).and_then(|d| d.base);
    }
    None
}

pub fn widen(resolver: &TypeResolver, a: &TypeSignature, b: &TypeSignature) -> TypeSignature {
    if a == b {
        return a.clone();
    }
    if let (TypeSignature::Class(x), TypeSignature::Class(y)) = (a.unref(), b.unref()) {
        if let Some(common) = least_common_class(resolver, *x, *y) {
            return TypeSignature::Class(common);
        }
    }
    TypeSignature::Any
}

/// Joins two block-entry states that flow into the same successor. Stack
/// depth and local count must already agree — a mismatch means the ABC
/// file's control flow is malformed, not something widening can paper over.
pub fn join(resolver: &TypeResolver, offset: u32, a: &TypeState, b: &TypeState) -> VerifyResult<TypeState> {
    if a.operand_stack.len() != b.operand_stack.len() {
        return Err(VerifyError::ArityMismatch {
            offset,
            expected: a.operand_stack.len(),
            found: b.operand_stack.len(),
        });
    }
    let operand_stack = a
        .operand_stack
        .iter()
        .zip(&b.operand_stack)
        .map(|(x, y)| widen(resolver, x, y))
        .collect();
    let locals = a
        .locals
        .iter()
        .zip(&b.locals)
        .map(|(x, y)| widen(resolver, x, y))
        .collect();
    Ok(TypeState { operand_stack, locals })
}

#[cfg(test)]
mod tests {
    use super::*;
    use avm_core::DomainId;
    use avm_resolve::model::ClassKind;
    use avm_resolve::source::{DescribeError, RawClassDecl, RawClassSource};
    use avm_resolve::TypeResolver;

    /// Object <- Animal <- Dog, Animal <- Cat; Widget stands alone with no
    /// shared ancestor.
    struct FakeSource;
    impl RawClassSource for FakeSource {
        fn describe(&self, name: &str) -> Result<RawClassDecl, DescribeError> {
            let base_name = match name {
                "Object" => None,
                "Animal" => Some("Object".to_string()),
                "Dog" | "Cat" => Some("Animal".to_string()),
                "Widget" => None,
                _ => return Err(DescribeError::NotFound),
            };
            Ok(RawClassDecl {
                kind: ClassKind::Class,
                is_exported: true,
                is_boxed_primitive_wrapper: false,
                base_name,
                interface_names: Vec::new(),
                referenced_type_names: Vec::new(),
                has_unexported_instance_method: false,
            })
        }
    }

    #[test]
    fn widen_identical_types_is_unchanged() {
        let source = FakeSource;
        let r = TypeResolver::new(DomainId(0), &source);
        assert_eq!(widen(&r, &TypeSignature::Any, &TypeSignature::Any), TypeSignature::Any);
    }

    #[test]
    fn widen_sibling_classes_to_common_ancestor() {
        let source = FakeSource;
        let r = TypeResolver::new(DomainId(0), &source);
        let dog = r.resolve_by_name("Dog").unwrap();
        let cat = r.resolve_by_name("Cat").unwrap();
        let animal = r.resolve_by_name("Animal").unwrap();
        let widened = widen(&r, &TypeSignature::Class(dog), &TypeSignature::Class(cat));
        assert_eq!(widened, TypeSignature::Class(animal));
    }

    #[test]
    fn widen_unrelated_classes_falls_back_to_any() {
        let source = FakeSource;
        let r = TypeResolver::new(DomainId(0), &source);
        let dog = r.resolve_by_name("Dog").unwrap();
        let widget = r.resolve_by_name("Widget").unwrap();
        let widened = widen(&r, &TypeSignature::Class(dog), &TypeSignature::Class(widget));
        assert_eq!(widened, TypeSignature::Any);
    }

    #[test]
    fn join_rejects_mismatched_stack_depth() {
        let source = FakeSource;
        let r = TypeResolver::new(DomainId(0), &source);
        let a = TypeState { operand_stack: vec![TypeSignature::Any], locals: Vec::new() };
        let b = TypeState { operand_stack: Vec::new(), locals: Vec::new() };
        let err = join(&r, 0, &a, &b).unwrap_err();
        assert!(matches!(err, VerifyError::ArityMismatch { .. }));
    }

    #[test]
    fn join_widens_per_slot() {
        let source = FakeSource;
        let r = TypeResolver::new(DomainId(0), &source);
        let dog = r.resolve_by_name("Dog").unwrap();
        let cat = r.resolve_by_name("Cat").unwrap();
        let animal = r.resolve_by_name("Animal").unwrap();
        let a = TypeState { operand_stack: vec![TypeSignature::Class(dog)], locals: Vec::new() };
        let b = TypeState { operand_stack: vec![TypeSignature::Class(cat)], locals: Vec::new() };
        let joined = join(&r, 0, &a, &b).unwrap();
        assert_eq!(joined.operand_stack, vec![TypeSignature::Class(animal)]);
    }

    #[test]
    fn entry_state_seeds_params_then_any() {
        let state = TypeState::entry(3, &[TypeSignature::String]);
        assert_eq!(state.locals, vec![TypeSignature::String, TypeSignature::Any, TypeSignature::Any]);
        assert!(state.operand_stack.is_empty());
    }

    #[test]
    fn pop_on_empty_stack_is_underflow() {
        let mut state = TypeState::entry(0, &[]);
        let err = state.pop(7).unwrap_err();
        assert!(matches!(err, VerifyError::StackUnderflow { offset: 7 }));
    }
}
