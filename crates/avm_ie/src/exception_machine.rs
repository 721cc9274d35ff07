use avm_core::exception::{ExceptionKind, ExceptionRegion};
use avm_core::{ClassId, Label};

use crate::error::{EmitError, EmitResult};

/// A region's place in the per-instruction-stream state machine (spec.md
/// §4.1 "Exception-region machine").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupState {
    InTry,
    InFilterExpr { filter_start: u32 },
    InHandler {
        kind: ExceptionKind,
        handler_start: u32,
        catch_type: Option<ClassId>,
        filter_start: Option<u32>,
    },
    /// `end_try` has closed the last clause; a following `begin_*` attaches a
    /// continuation clause to the same try range, anything else implicitly
    /// closes the whole try statement.
    AwaitingClause,
}

/// One open (or awaiting-continuation) try statement.
#[derive(Debug)]
pub struct TryGroup {
    pub try_start: u32,
    pub try_length: Option<u32>,
    pub end_label: Label,
    pub clauses: Vec<ExceptionRegion>,
    pub state: GroupState,
}

impl TryGroup {
    pub fn new(try_start: u32, end_label: Label) -> Self {
        TryGroup {
            try_start,
            try_length: None,
            end_label,
            clauses: Vec::new(),
            state: GroupState::InTry,
        }
    }

    /// Begins a filter, catch, fault, or finally clause at `pos` (the
    /// current emission position). `kind` identifies which; `catch_type` is
    /// only meaningful for `Catch`.
    pub fn begin_clause(
        &mut self,
        kind: ExceptionKind,
        pos: u32,
        catch_type: Option<ClassId>,
        last_op_is_end_filter: bool,
    ) -> EmitResult<bool> {
        let mut needs_end_filter = false;
        let mut filter_start = None;
        match &self.state {
            GroupState::InTry => {
                self.try_length = Some(pos - self.try_start);
            }
            GroupState::AwaitingClause => {
                // continuation: try range already fixed, reused verbatim.
            }
            GroupState::InFilterExpr { filter_start: fs } => {
                if kind != ExceptionKind::Catch {
                    return Err(EmitError::BadClauseOrder(
                        "only a catch clause may follow a filter expression",
                    ));
                }
                if !last_op_is_end_filter {
                    needs_end_filter = true;
                }
                filter_start = Some(*fs);
            }
            GroupState::InHandler { .. } => {
                return Err(EmitError::BadClauseOrder(
                    "call end_try before starting another clause",
                ));
            }
        }

        if kind == ExceptionKind::Filter && matches!(self.state, GroupState::InFilterExpr { .. }) {
            return Err(EmitError::BadClauseOrder("nested filter clauses are forbidden"));
        }

        self.state = if kind == ExceptionKind::Filter {
            GroupState::InFilterExpr { filter_start: pos }
        } else {
            GroupState::InHandler {
                kind,
                handler_start: pos,
                catch_type,
                filter_start,
            }
        };
        Ok(needs_end_filter)
    }

    /// Ends the current clause at `pos` — the caller must already have
    /// emitted the clause's terminator (`leave`/`endfinally`) so
    /// `handler_length` includes it.
    pub fn end_clause(&mut self, pos: u32) -> EmitResult<ExceptionRegion> {
        let GroupState::InHandler {
            kind,
            handler_start,
            catch_type,
            filter_start,
        } = self.state
        else {
            return Err(EmitError::BadClauseOrder("end_try without an open handler"));
        };

        let is_continuation = !self.clauses.is_empty();
        let region = ExceptionRegion {
            try_start: self.try_start,
            try_length: self.try_length.unwrap_or(0),
            handler_start,
            handler_length: pos - handler_start,
            kind,
            filter_start,
            catch_type,
            end_label: self.end_label,
            is_continuation,
        };
        self.clauses.push(region.clone());
        self.state = GroupState::AwaitingClause;
        Ok(region)
    }

    /// True while a clause is mid-emission (not yet `end_try`'d) — finalize
    /// must reject this (spec.md §4.1 `OpenHandlers`).
    pub fn has_unclosed_clause(&self) -> bool {
        !matches!(self.state, GroupState::AwaitingClause)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use avm_core::{LabelId, Label};

    fn end_label() -> Label {
        Label(LabelId(0))
    }

    #[test]
    fn begin_catch_fixes_try_length_from_the_open_try() {
        let mut group = TryGroup::new(10, end_label());
        group.begin_clause(ExceptionKind::Catch, 20, None, false).unwrap();
        assert_eq!(group.try_length, Some(10));
        assert!(matches!(group.state, GroupState::InHandler { kind: ExceptionKind::Catch, .. }));
    }

    #[test]
    fn filter_then_catch_requires_an_end_filter_only_if_not_already_emitted() {
        let mut group = TryGroup::new(0, end_label());
        group.begin_clause(ExceptionKind::Filter, 5, None, false).unwrap();
        let needs_end_filter = group.begin_clause(ExceptionKind::Catch, 8, None, false).unwrap();
        assert!(needs_end_filter);
    }

    #[test]
    fn filter_then_catch_with_end_filter_already_emitted_does_not_need_another() {
        let mut group = TryGroup::new(0, end_label());
        group.begin_clause(ExceptionKind::Filter, 5, None, false).unwrap();
        let needs_end_filter = group.begin_clause(ExceptionKind::Catch, 8, None, true).unwrap();
        assert!(!needs_end_filter);
    }

    #[test]
    fn end_clause_preserves_the_filter_start_position() {
        let mut group = TryGroup::new(0, end_label());
        group.begin_clause(ExceptionKind::Filter, 5, None, false).unwrap();
        group.begin_clause(ExceptionKind::Catch, 8, None, true).unwrap();
        let region = group.end_clause(12).unwrap();
        assert_eq!(region.filter_start, Some(5));
        assert_eq!(region.handler_start, 8);
    }

    #[test]
    fn fault_after_filter_expression_is_rejected() {
        let mut group = TryGroup::new(0, end_label());
        group.begin_clause(ExceptionKind::Filter, 5, None, false).unwrap();
        let err = group.begin_clause(ExceptionKind::Fault, 8, None, false).unwrap_err();
        assert!(matches!(err, EmitError::BadClauseOrder(_)));
    }

    #[test]
    fn starting_a_clause_while_one_is_open_is_rejected() {
        let mut group = TryGroup::new(0, end_label());
        group.begin_clause(ExceptionKind::Catch, 5, None, false).unwrap();
        let err = group.begin_clause(ExceptionKind::Fault, 8, None, false).unwrap_err();
        assert!(matches!(err, EmitError::BadClauseOrder(_)));
    }

    #[test]
    fn end_clause_marks_the_group_awaiting_a_continuation() {
        let mut group = TryGroup::new(0, end_label());
        group.begin_clause(ExceptionKind::Catch, 5, None, false).unwrap();
        assert!(group.has_unclosed_clause());
        let region = group.end_clause(9).unwrap();
        assert_eq!(region.handler_start, 5);
        assert_eq!(region.handler_length, 4);
        assert!(!region.is_continuation);
        assert!(!group.has_unclosed_clause());
    }

    #[test]
    fn a_second_clause_in_the_same_group_is_a_continuation() {
        let mut group = TryGroup::new(0, end_label());
        group.begin_clause(ExceptionKind::Catch, 5, None, false).unwrap();
        group.end_clause(9).unwrap();
        group.begin_clause(ExceptionKind::Finally, 9, None, false).unwrap();
        let region = group.end_clause(12).unwrap();
        assert!(region.is_continuation);
        // continuation clauses reuse the original try range verbatim.
        assert_eq!(region.try_start, 0);
        assert_eq!(region.try_length, 5);
    }
}
