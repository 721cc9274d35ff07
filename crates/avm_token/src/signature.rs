use avm_core::types::TypeSignature;

/// The shape the token provider needs to compute a call-site stack delta
/// and, in helper mode, to encode a local-variable signature
/// (spec.md §4.1 "Local signature" / §4.2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSignature {
    pub params: Vec<TypeSignature>,
    pub return_type: TypeSignature,
    /// Whether the callee expects an implicit receiver on the stack.
    pub has_this: bool,
}

impl MethodSignature {
    /// `args_popped + this_popped` (spec.md §4.1, call-like stack delta).
    pub fn pops(&self) -> usize {
        self.params.len() + usize::from(self.has_this)
    }

    pub fn pushes(&self) -> usize {
        usize::from(self.return_type != TypeSignature::Void)
    }
}
