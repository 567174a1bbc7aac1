//! Phase tracking for one mutating call.
//!
//! A [`MutationUnit`] follows `Begin → HeaderWritten → BulkWritten →
//! RangesRecomputed → Committed`. Dropping it before `Committed` records the
//! terminal `RolledBack` phase; the transaction dropped alongside it discards
//! the staged work.
use std::fmt;

use log::debug;

use crate::metadata::LogUri;

/// Mutating operation kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    /// Create a log.
    Add,
    /// Merge into a log.
    Update,
    /// Overwrite a log.
    Replace,
    /// Delete ranges of a log.
    PartialDelete,
    /// Remove a log.
    Delete,
}

impl Operation {
    /// Name used in logs and errors.
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Add => "add",
            Operation::Update => "update",
            Operation::Replace => "replace",
            Operation::PartialDelete => "partial delete",
            Operation::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Phase of a mutation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum MutationPhase {
    /// Transaction opened.
    Begin,
    /// Header staged.
    HeaderWritten,
    /// Bulk rows staged.
    BulkWritten,
    /// Ranges recomputed and staged.
    RangesRecomputed,
    /// Commit durable.
    Committed,
    /// Abandoned before commit.
    RolledBack,
}

/// Tracks the phase of one mutation and logs every transition.
#[derive(Debug)]
pub struct MutationUnit {
    operation: Operation,
    uri: LogUri,
    phase: MutationPhase,
}

impl MutationUnit {
    /// Start tracking `operation` on `uri`.
    pub fn begin(operation: Operation, uri: &LogUri) -> Self {
        debug!("{operation} {uri}: begin");
        Self {
            operation,
            uri: uri.clone(),
            phase: MutationPhase::Begin,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> MutationPhase {
        self.phase
    }

    /// Move forward to `phase`.
    pub fn advance(&mut self, phase: MutationPhase) {
        debug_assert!(phase > self.phase, "{:?} -> {phase:?}", self.phase);
        debug!("{} {}: {:?} -> {phase:?}", self.operation, self.uri, self.phase);
        self.phase = phase;
    }

    /// Mark the mutation committed at `version`.
    pub fn committed(mut self, version: u64) {
        debug!("{} {}: committed version {version}", self.operation, self.uri);
        self.phase = MutationPhase::Committed;
    }
}

impl Drop for MutationUnit {
    fn drop(&mut self) {
        if self.phase != MutationPhase::Committed {
            debug!(
                "{} {}: rolled back during {:?}",
                self.operation, self.uri, self.phase
            );
            self.phase = MutationPhase::RolledBack;
        }
    }
}
