//! Instruction Emitter (spec.md §4.1): turns a sequence of logical opcodes
//! and operands into a finalized native method body, resolving labels,
//! choosing short/long branch forms, and laying out exception regions.

pub mod emitter;
pub mod error;
pub mod exception_machine;
pub mod local_pool;
pub mod opcode;
pub mod operand;

pub use emitter::InstructionEmitter;
pub use error::{EmitError, EmitResult};
pub use exception_machine::{GroupState, TryGroup};
pub use local_pool::LocalPool;
pub use opcode::{wire, Opcode, TypedAccessFamily};
pub use operand::{Operand, TokenOperand};
