//! Error types for bulk operations.

use thiserror::Error;

/// Errors from bulk edit operations.
#[derive(Debug, Error)]
pub enum OpsError {
    /// A client call failed and the run stopped there. `updated` counts
    /// the entries that had already been written back, so the caller
    /// knows how far the run got.
    #[error("{op} aborted after {updated} update(s): {source}")]
    Aborted {
        /// Operation that was running.
        op: &'static str,
        /// Updates applied before the fault.
        updated: usize,
        source: hatenablog::Error,
    },

    /// A rewrite pattern built from caller input did not compile.
    #[error("invalid rewrite pattern: {0}")]
    Pattern(#[from] regex::Error),
}
