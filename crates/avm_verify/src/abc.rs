//! The ABC-side input model (spec.md §4.5, step 1 "Structural decode").
//!
//! Parsing an ABC *file* (constant pool, method/class/script directories)
//! is out of scope (spec.md Non-goals); callers hand the verifier/translator
//! one already-located method body's raw bytecode plus a view onto that
//! file's already-parsed constant pool and exception table.

use avm_core::exception::ExceptionKind;
use avm_token::MethodSignature;

/// One already-parsed ABC `exception_info` entry (spec.md §4.5 "Exception
/// reconstruction"). Offsets are byte offsets into the same method's
/// [`AbcMethodInput::code`]. Entries sharing `(try_start, try_end)`, in
/// table order, are the clauses of one try-block — spec.md §3's
/// continuation-region rule.
#[derive(Debug, Clone)]
pub struct AbcExceptionInfo {
    pub try_start: u32,
    pub try_end: u32,
    pub handler_start: u32,
    pub handler_end: u32,
    pub kind: ExceptionKind,
    /// Only meaningful for `ExceptionKind::Catch`; `None` is "catch all"
    /// (spec.md §4.5: "an absent type ... maps ... to catch all").
    pub catch_type_name: Option<String>,
    /// Where the filter expression begins, distinct from `handler_start`
    /// where the caught-value catch body begins once the expression is
    /// true (spec.md §3 "filter_start (if filter)", §4.1's two-step
    /// `begin_filter`/`begin_catch`). Required when `kind` is
    /// `ExceptionKind::Filter`, meaningless otherwise.
    pub filter_start: Option<u32>,
}

/// Read access to an ABC file's already-parsed constant pool and method
/// directory. Building this table is the out-of-scope "ABC parser"; the
/// verifier/translator only ever reads from it.
pub trait AbcConstantPool {
    fn string(&self, index: u32) -> &str;
    /// Resolves a multiname constant to the dotted canonical name a
    /// `TypeResolver` accepts (namespace and local name already joined).
    fn multiname(&self, index: u32) -> &str;
    /// The formal signature of `class_name::member_name`, as recorded in
    /// the ABC file's method directory (spec.md §4.5 step 4, "prepared
    /// argument shape").
    fn method_signature(&self, class_name: &str, member_name: &str) -> MethodSignature;
}

/// One method body's input (spec.md §4.5).
pub struct AbcMethodInput<'a> {
    pub method_name: String,
    pub code: &'a [u8],
    pub exceptions: &'a [AbcExceptionInfo],
    pub constants: &'a dyn AbcConstantPool,
    /// Number of local slots the ABC method body declares (including the
    /// parameters and the implicit receiver).
    pub local_count: u32,
}

/// The ABC-side opcode vocabulary this crate decodes (a representative
/// subset covering property/constructor dispatch, branching, and returns —
/// spec.md §4.5 describes the pipeline, not an exhaustive opcode table).
#[derive(Debug, Clone, PartialEq)]
pub enum AbcOp {
    Nop,
    Pop,
    Dup,
    PushNull,
    PushUndefined,
    PushTrue,
    PushFalse,
    PushByte(i8),
    PushInt(i32),
    PushDouble(f64),
    PushString(String),
    GetLocal(u32),
    SetLocal(u32),
    GetLex(String),
    GetProperty(String),
    SetProperty(String),
    CallProperty { name: String, arg_count: u32 },
    CallPropertyVoid { name: String, arg_count: u32 },
    ConstructProp { name: String, arg_count: u32 },
    Construct { arg_count: u32 },
    NewObject { class_name: String },
    ReturnValue,
    ReturnVoid,
    Throw,
    /// Absolute target offset, resolved from the relative displacement at
    /// decode time.
    Jump(u32),
    IfTrue(u32),
    IfFalse(u32),
    IfEq(u32),
    IfNe(u32),
    IfLt(u32),
    IfLe(u32),
    IfGt(u32),
    IfGe(u32),
    LookupSwitch {
        default_target: u32,
        case_targets: Vec<u32>,
    },
}

impl AbcOp {
    pub fn is_branch(&self) -> bool {
        matches!(
            self,
            AbcOp::Jump(_)
                | AbcOp::IfTrue(_)
                | AbcOp::IfFalse(_)
                | AbcOp::IfEq(_)
                | AbcOp::IfNe(_)
                | AbcOp::IfLt(_)
                | AbcOp::IfLe(_)
                | AbcOp::IfGt(_)
                | AbcOp::IfGe(_)
                | AbcOp::LookupSwitch { .. }
        )
    }

    pub fn is_block_terminator(&self) -> bool {
        self.is_branch() || matches!(self, AbcOp::ReturnValue | AbcOp::ReturnVoid | AbcOp::Throw)
    }

    /// Every absolute offset this instruction can transfer control to,
    /// excluding fallthrough.
    pub fn branch_targets(&self) -> Vec<u32> {
        match self {
            AbcOp::Jump(t)
            | AbcOp::IfTrue(t)
            | AbcOp::IfFalse(t)
            | AbcOp::IfEq(t)
            | AbcOp::IfNe(t)
            | AbcOp::IfLt(t)
            | AbcOp::IfLe(t)
            | AbcOp::IfGt(t)
            | AbcOp::IfGe(t) => vec![*t],
            AbcOp::LookupSwitch {
                default_target,
                case_targets,
            } => {
                let mut out = vec![*default_target];
                out.extend(case_targets.iter().copied());
                out
            }
            _ => Vec::new(),
        }
    }
}

/// Invented fixed-width wire encoding this crate's own decoder reads
/// (spec.md's ABC Non-goal excludes the real variable-length AVM2 encoding;
/// operands here are plain little-endian `u32`/`i32` fields for a
/// structurally equivalent, decodable stand-in).
pub mod wire {
    pub const NOP: u8 = 0x02;
    pub const POP: u8 = 0x03;
    pub const DUP: u8 = 0x04;
    pub const PUSH_NULL: u8 = 0x05;
    pub const PUSH_UNDEFINED: u8 = 0x06;
    pub const PUSH_TRUE: u8 = 0x07;
    pub const PUSH_FALSE: u8 = 0x08;
    pub const PUSH_BYTE: u8 = 0x09;
    pub const PUSH_INT: u8 = 0x0B;
    pub const PUSH_DOUBLE: u8 = 0x0C;
    pub const PUSH_STRING: u8 = 0x0D;
    pub const GET_LOCAL: u8 = 0x10;
    pub const SET_LOCAL: u8 = 0x11;
    pub const GET_LEX: u8 = 0x12;
    pub const GET_PROPERTY: u8 = 0x13;
    pub const SET_PROPERTY: u8 = 0x14;
    pub const CALL_PROPERTY: u8 = 0x15;
    pub const CALL_PROPERTY_VOID: u8 = 0x16;
    pub const CONSTRUCT_PROP: u8 = 0x17;
    pub const CONSTRUCT: u8 = 0x18;
    pub const NEW_OBJECT: u8 = 0x19;
    pub const RETURN_VALUE: u8 = 0x1A;
    pub const RETURN_VOID: u8 = 0x1B;
    pub const THROW: u8 = 0x1C;
    pub const JUMP: u8 = 0x20;
    pub const IF_TRUE: u8 = 0x21;
    pub const IF_FALSE: u8 = 0x22;
    pub const IF_EQ: u8 = 0x23;
    pub const IF_NE: u8 = 0x24;
    pub const IF_LT: u8 = 0x25;
    pub const IF_LE: u8 = 0x26;
    pub const IF_GT: u8 = 0x27;
    pub const IF_GE: u8 = 0x28;
    pub const LOOKUP_SWITCH: u8 = 0x29;
}
