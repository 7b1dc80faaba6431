//! ID generator port for tagging reconciliation passes.

/// Generates unique identifiers.
///
/// Each pass carries an id so its log lines and report can be correlated.
/// Tests substitute a predictable sequence.
pub trait IdGenerator: Send + Sync {
    /// Generates a new unique identifier string.
    fn generate_id(&self) -> String;
}
