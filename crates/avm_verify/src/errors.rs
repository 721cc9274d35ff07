use std::fmt;

use avm_core::error::{CodedError, ErrorCode};

/// Verifier/translator failures (spec.md §4.5 "Failure semantics"): any of
/// these abandons the one method being processed, leaving sibling methods
/// in the same ABC file unaffected. Plain enum with a hand-written
/// `Display`, same hand-rolled shape as `avm_ie::EmitError` — see that
/// type's doc comment for why this isn't `thiserror`-derived.
#[derive(Debug, Clone, PartialEq)]
pub enum VerifyError {
    MalformedStream { offset: u32 },
    UndefinedBranchTarget { from: u32, target: u32 },
    StackUnderflow { offset: u32 },
    TypeMismatch { offset: u32, expected: String, found: String },
    ArityMismatch { offset: u32, expected: usize, found: usize },
    IndexOutOfBounds { offset: u32, index: u32 },
    MalformedExceptionRegion { try_start: u32, reason: &'static str },
    UnresolvedType { offset: u32, name: String },
}

impl fmt::Display for VerifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerifyError::MalformedStream { offset } => {
                write!(f, "malformed instruction stream at offset {offset}")
            }
            VerifyError::UndefinedBranchTarget { from, target } => {
                write!(f, "branch at {from} targets undefined offset {target}")
            }
            VerifyError::StackUnderflow { offset } => {
                write!(f, "stack underflow at offset {offset}")
            }
            VerifyError::TypeMismatch { offset, expected, found } => {
                write!(f, "type mismatch at {offset}: expected {expected}, found {found}")
            }
            VerifyError::ArityMismatch { offset, expected, found } => {
                write!(f, "arity mismatch at {offset}: expected {expected}, found {found}")
            }
            VerifyError::IndexOutOfBounds { offset, index } => {
                write!(f, "index {index} out of bounds at offset {offset}")
            }
            VerifyError::MalformedExceptionRegion { try_start, reason } => {
                write!(f, "malformed exception region starting at {try_start}: {reason}")
            }
            VerifyError::UnresolvedType { offset, name } => {
                write!(f, "unresolved type `{name}` referenced at offset {offset}")
            }
        }
    }
}

impl std::error::Error for VerifyError {}

impl CodedError for VerifyError {
    fn code(&self) -> ErrorCode {
        ErrorCode::VerifyError
    }
}

/// Raised when the abstract-stack fixpoint worklist fails to converge
/// within `MAX_FIXPOINT_ITERATIONS` (spec.md §4.5 step 3's join loop over a
/// pathological CFG). Kept distinct from [`VerifyError`] per spec.md §7's
/// taxonomy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecursionError {
    pub method_name: String,
    pub limit: u32,
}

impl fmt::Display for RecursionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "fixpoint computation for `{}` did not converge within {} iterations",
            self.method_name, self.limit
        )
    }
}

impl std::error::Error for RecursionError {}

impl CodedError for RecursionError {
    fn code(&self) -> ErrorCode {
        ErrorCode::RecursionError
    }

    fn failing_name(&self) -> Option<&str> {
        Some(&self.method_name)
    }
}

pub type VerifyResult<T> = Result<T, VerifyError>;

/// Unifies every failure mode of `translate_method` (spec.md §4.5's three
/// pipeline stages plus emission) into one return type.
#[derive(Debug)]
pub enum TranslateError {
    Verify(VerifyError),
    Recursion(RecursionError),
    Resolve(avm_resolve::ResolveError),
    Emit(avm_ie::EmitError),
}

impl fmt::Display for TranslateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranslateError::Verify(e) => write!(f, "{e}"),
            TranslateError::Recursion(e) => write!(f, "{e}"),
            TranslateError::Resolve(e) => write!(f, "{e}"),
            TranslateError::Emit(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for TranslateError {}

impl From<VerifyError> for TranslateError {
    fn from(e: VerifyError) -> Self {
        TranslateError::Verify(e)
    }
}

impl From<RecursionError> for TranslateError {
    fn from(e: RecursionError) -> Self {
        TranslateError::Recursion(e)
    }
}

impl From<avm_resolve::ResolveError> for TranslateError {
    fn from(e: avm_resolve::ResolveError) -> Self {
        TranslateError::Resolve(e)
    }
}

impl From<avm_ie::EmitError> for TranslateError {
    fn from(e: avm_ie::EmitError) -> Self {
        TranslateError::Emit(e)
    }
}

impl CodedError for TranslateError {
    fn code(&self) -> ErrorCode {
        match self {
            TranslateError::Verify(e) => e.code(),
            TranslateError::Recursion(e) => e.code(),
            TranslateError::Resolve(e) => e.code(),
            TranslateError::Emit(e) => e.code(),
        }
    }

    fn failing_name(&self) -> Option<&str> {
        match self {
            TranslateError::Verify(_) => None,
            TranslateError::Recursion(e) => e.failing_name(),
            TranslateError::Resolve(_) => None,
            TranslateError::Emit(_) => None,
        }
    }
}

pub type TranslateResult<T> = Result<T, TranslateError>;
