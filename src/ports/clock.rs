//! Time source for stamping passes.

use chrono::{DateTime, Utc};

/// Wall-clock time as seen by a reconciliation pass.
///
/// `started_at` and `finished_at` in a pass summary both come from here, so
/// tests can pin them.
pub trait Clock: Send + Sync {
    /// Current instant in UTC.
    fn now(&self) -> DateTime<Utc>;
}
