//! Roster source and report sink ports.

use std::error::Error;

use serde::{Deserialize, Serialize};

use crate::model::RosterRecord;
use crate::reconcile::PassSummary;

/// A roster row that was excluded from the pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowDiagnostic {
    /// 1-based line in the source, header included.
    pub line: usize,
    /// Why the row was excluded.
    pub message: String,
}

/// Records loaded for a group plus the rows that were rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RosterLoad {
    /// Valid records in source order.
    pub records: Vec<RosterRecord>,
    /// Rows excluded with a reason.
    pub diagnostics: Vec<RowDiagnostic>,
}

/// Supplies the roster for a group key.
pub trait RosterSource: Send + Sync {
    /// Loads the roster for `group`.
    ///
    /// # Errors
    ///
    /// Returns an error if the roster as a whole cannot be read. Individual
    /// bad rows are reported through [`RosterLoad::diagnostics`] instead.
    fn load_roster(&self, group: &str) -> Result<RosterLoad, Box<dyn Error + Send + Sync>>;
}

/// Receives the summary of a finished pass.
pub trait ReportSink: Send + Sync {
    /// Persists or publishes `summary` for `group`.
    ///
    /// # Errors
    ///
    /// Returns an error if the report cannot be written.
    fn write_report(
        &self,
        group: &str,
        summary: &PassSummary,
    ) -> Result<(), Box<dyn Error + Send + Sync>>;
}
