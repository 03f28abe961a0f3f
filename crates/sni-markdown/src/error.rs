//! Pipeline errors.

use std::path::PathBuf;

/// Error returned when a document cannot be read.
///
/// Processing text never fails; only reading the source can.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Source file missing, unreadable or not valid UTF-8.
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        /// File that was being read.
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
