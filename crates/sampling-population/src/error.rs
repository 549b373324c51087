//! Error types for population ingestion

/// Errors while building a population from external input
#[derive(Debug, thiserror::Error)]
pub enum PopulationError {
    /// Input is not valid JSON
    #[error("population is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// Top-level document is not an array
    #[error("population must be a JSON array of records")]
    NotArray,

    /// Array element is not an object
    #[error("population element {index} is not a record")]
    NotRecord {
        /// Position of the offending element
        index: usize,
    },
}
