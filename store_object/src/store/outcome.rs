//! Detailed operation results
//!
//! The boolean lifecycle methods collapse these. Callers that need to tell an
//! idempotent no-op from a write that matched nothing use the `_detailed`
//! variants instead.

/// How a soft delete ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The entity was never persisted
    NotPersisted,
    /// The delete rule set rejected the entity
    RulesFailed,
    /// A before-delete handler stopped the operation with this result
    Vetoed(bool),
    /// The soft-delete field was already false; no UPDATE was issued
    AlreadyInactive,
    /// The UPDATE matched rows
    Updated { rows: u64 },
    /// The UPDATE matched nothing, e.g. the row is gone
    NoRowsAffected,
}

impl DeleteOutcome {
    pub fn succeeded(&self) -> bool {
        match self {
            DeleteOutcome::Vetoed(result) => *result,
            DeleteOutcome::AlreadyInactive | DeleteOutcome::Updated { .. } => true,
            DeleteOutcome::NotPersisted
            | DeleteOutcome::RulesFailed
            | DeleteOutcome::NoRowsAffected => false,
        }
    }

    /// Rows touched by the UPDATE, zero when none was issued
    pub fn rows_affected(&self) -> u64 {
        match self {
            DeleteOutcome::Updated { rows } => *rows,
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestoreOutcome {
    pub rows_affected: u64,
}

impl RestoreOutcome {
    pub fn succeeded(&self) -> bool {
        self.rows_affected > 0
    }
}
