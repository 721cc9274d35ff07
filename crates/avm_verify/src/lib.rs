//! Verifier/Translator (spec.md §4.5): turns one already-decoded ABC method
//! body into a finalized native [`avm_core::MethodBody`], via structural
//! decode, CFG construction, an abstract-stack fixpoint, and a lowering pass
//! that emits through [`avm_ie::InstructionEmitter`].

pub mod abc;
pub mod cfg;
pub mod decode;
pub mod errors;
pub mod stack;
pub mod translator;

pub use abc::{AbcConstantPool, AbcExceptionInfo, AbcMethodInput, AbcOp};
pub use errors::{RecursionError, TranslateError, TranslateResult, VerifyError, VerifyResult};
pub use translator::{translate_method, VerifyOptions};
