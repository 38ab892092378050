//! Error types for top-hits reduction

use thiserror::Error;

use crate::sort::SortFieldType;

/// Result type alias for reduce operations
pub type ReduceResult<T> = std::result::Result<T, ReduceError>;

/// Errors that can occur while reducing shard partials
#[derive(Debug, Error)]
pub enum ReduceError {
    /// The caller supplied nothing to reduce
    #[error("No partial results to reduce")]
    NoPartials,

    /// More partials than the configured limit
    #[error("Too many partial results: {count} (limit {limit})")]
    TooManyPartials { count: usize, limit: usize },

    /// A partial requested a different `from`/`size` window than the first one
    #[error(
        "Window mismatch on shard {shard_index}: expected from={expected_from} size={expected_size}, \
         found from={found_from} size={found_size}"
    )]
    WindowMismatch {
        shard_index: usize,
        expected_from: usize,
        expected_size: usize,
        found_from: usize,
        found_size: usize,
    },

    /// A partial was ranked with different sort fields (or score vs fields)
    #[error("Sort mismatch on shard {shard_index}: expected [{expected}], found [{found}]")]
    SortMismatch {
        shard_index: usize,
        expected: String,
        found: String,
    },

    /// The sort field type has no comparison policy
    #[error("Unsupported sort type {} for field {field:?}", .field_type.as_str())]
    UnsupportedSortType {
        field: String,
        field_type: SortFieldType,
    },

    /// A hit carries sort values that do not fit the declared sort fields
    #[error("Invalid sort values for doc {doc_id} on shard {shard_index}: {reason}")]
    InvalidSortValue {
        shard_index: usize,
        doc_id: i32,
        reason: String,
    },

    /// A partial's hits were not ranked by the shared comparator
    #[error("Shard {shard_index} hits out of order at position {position}")]
    UnorderedPartial { shard_index: usize, position: usize },

    /// Tree reduction needs groups of at least two
    #[error("Invalid fan-in: {0} (must be >= 2)")]
    InvalidFanIn(usize),

    /// Malformed configuration input
    #[error("Invalid config: {0}")]
    Config(String),

    /// I/O error while reading partials
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ReduceError {
    /// Returns the error type string (for JSON responses)
    #[must_use]
    pub const fn error_type(&self) -> &'static str {
        match self {
            Self::NoPartials => "NO_PARTIALS",
            Self::TooManyPartials { .. } => "TOO_MANY_PARTIALS",
            Self::WindowMismatch { .. } => "WINDOW_MISMATCH",
            Self::SortMismatch { .. } => "SORT_MISMATCH",
            Self::UnsupportedSortType { .. } => "UNSUPPORTED_SORT_TYPE",
            Self::InvalidSortValue { .. } => "INVALID_SORT_VALUE",
            Self::UnorderedPartial { .. } => "UNORDERED_PARTIAL",
            Self::InvalidFanIn(_) => "INVALID_FAN_IN",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Returns whether the error is transient and can be retried.
    ///
    /// Reduction is pure, so only I/O around it can succeed on a second try.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_))
    }

    /// Whether the error comes from partials that disagree with each other
    #[must_use]
    pub const fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::WindowMismatch { .. }
                | Self::SortMismatch { .. }
                | Self::UnsupportedSortType { .. }
        )
    }
}
