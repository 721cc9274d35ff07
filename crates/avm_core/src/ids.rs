//! Stable small identifiers used across the compiler core.
//!
//! Mirrors the newtype-id convention the instruction emitter's predecessor
//! used for blocks/functions/registers: plain `Copy` tuple structs, no
//! validation baked into the type itself (validation happens where the id is
//! consumed).

/// Identifies a [`crate::label::Label`] within the emitter that created it.
/// Handles are scoped to the emitter instance; using one against a different
/// instance has unspecified behavior (spec.md §3, "Lifecycle").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LabelId(pub u32);

/// Identifies a declared or leased local slot. Stable within `[0, 65534]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalIndex(pub u16);

/// Identifies an application domain (spec.md §5, "Static zones" / domain
/// symbol tables are per-domain).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DomainId(pub u32);

/// Identifies a resolved class descriptor within a domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassId(pub u32);

/// Identifies a zone installed via [`crate::zone::Zone`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ZoneId(pub u64);
