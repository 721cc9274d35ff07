//! Shared data model and concurrency primitives used by every other crate
//! in the workspace (spec.md §3 "Data model" and §5 "Concurrency &
//! resource model"). This crate has no dependency on any other workspace
//! member so it can sit at the bottom of the dependency graph.

pub mod branch;
pub mod error;
pub mod exception;
pub mod ids;
pub mod label;
pub mod lazy_class;
pub mod locals;
pub mod method_body;
pub mod symtab;
pub mod types;
pub mod zone;

pub use branch::{BranchRecord, RelocationRecord};
pub use error::{CodedError, ErrorCode};
pub use exception::{ExceptionKind, ExceptionRegion, ExceptionSectionForm};
pub use ids::{ClassId, DomainId, LabelId, LocalIndex, ZoneId};
pub use label::{Label, LabelState};
pub use lazy_class::{LazyClassInit, ReentrancyPolicy, ReentrantInit};
pub use locals::{Local, LocalSlot, LocalStatus, MAX_LOCAL_INDEX};
pub use method_body::MethodBody;
pub use symtab::{DomainSymbolTable, DuplicateGlobalTrait};
pub use types::{CallKind, PrimitiveKind, TypeSignature};
pub use zone::{current as current_zone, enter as enter_zone, ZoneRegistry};
