use std::fmt;

use avm_core::error::{CodedError, ErrorCode};
use avm_core::{Label, Local};

/// Instruction-emitter failures (spec.md §4.1's contract table, §7
/// `EmitError`). Plain enum with a hand-written `Display` rather than
/// `thiserror`, unlike the teacher's own error enums
/// (`bsharp_il`/`bsharp_analysis` both derive theirs) — no specific teacher
/// precedent is claimed for this shape, just the variant-per-failure-mode
/// convention `CodedError` needs underneath.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmitError {
    LocalLimit,
    InvalidLease(Local),
    InvalidArg,
    AlreadyBound(Label),
    OperandKindMismatch { expected: &'static str },
    UndefinedLabel(Label),
    UndefinedLocal(Local),
    BadClauseOrder(&'static str),
    MaxStackExceeded,
    OpenHandlers,
    UnmarkedLabel(Label),
    /// spec.md §7 `ConfigError`: "token provider missing when required".
    MissingTokenProvider,
}

impl fmt::Display for EmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmitError::LocalLimit => write!(f, "local count exceeds MAX_LOCAL_INDEX"),
            EmitError::InvalidLease(l) => write!(f, "local {l:?} is not on temp lease"),
            EmitError::InvalidArg => write!(f, "invalid argument"),
            EmitError::AlreadyBound(l) => write!(f, "label {l:?} already bound"),
            EmitError::OperandKindMismatch { expected } => {
                write!(f, "operand kind mismatch, expected {expected}")
            }
            EmitError::UndefinedLabel(l) => write!(f, "label {l:?} referenced before creation"),
            EmitError::UndefinedLocal(l) => write!(f, "local {l:?} referenced before declaration"),
            EmitError::BadClauseOrder(ctx) => write!(f, "bad exception clause order: {ctx}"),
            EmitError::MaxStackExceeded => write!(f, "max stack exceeded u16 range"),
            EmitError::OpenHandlers => write!(f, "finalize called with open exception handlers"),
            EmitError::UnmarkedLabel(l) => write!(f, "label {l:?} never marked"),
            EmitError::MissingTokenProvider => write!(f, "no token provider configured"),
        }
    }
}

impl std::error::Error for EmitError {}

impl CodedError for EmitError {
    fn code(&self) -> ErrorCode {
        match self {
            // Spec.md §7 files this under ConfigError, not EmitError, even
            // though it surfaces from inside the emitter.
            EmitError::MissingTokenProvider => ErrorCode::ConfigError,
            _ => ErrorCode::EmitError,
        }
    }
}

pub type EmitResult<T> = Result<T, EmitError>;
