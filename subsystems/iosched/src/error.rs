//! # Scheduler Error Types
//!
//! The scheduling hot path never fails: admission degrades instead of
//! rejecting, and dispatch reports idle. Errors only appear at the edges,
//! when a queue is torn down with requests still inside it, or when an
//! administrator writes a tunable that is unknown or out of range.

use core::fmt;

// ============================================================================
// RESULT TYPES
// ============================================================================

/// Result type for scheduler lifecycle operations
pub type IoSchedResult<T> = Result<T, IoSchedError>;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

// ============================================================================
// SCHEDULER ERRORS
// ============================================================================

/// Scheduler error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoSchedError {
    /// Teardown found requests still owned by the scheduler
    QueueNotEmpty {
        /// Requests left in the read FIFO
        reads: usize,
        /// Requests left in the write FIFO
        writes: usize,
        /// Writes left in the coalesce staging area
        staged: usize,
        /// Entries left in the ordered indices
        indexed: usize,
    },

    /// Configuration rejected
    Config(ConfigError),
}

impl fmt::Display for IoSchedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QueueNotEmpty {
                reads,
                writes,
                staged,
                indexed,
            } => write!(
                f,
                "Scheduler not empty at teardown: {} reads, {} writes, {} staged, {} indexed",
                reads, writes, staged, indexed
            ),
            Self::Config(err) => write!(f, "Configuration error: {}", err),
        }
    }
}

impl From<ConfigError> for IoSchedError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

// ============================================================================
// CONFIGURATION ERRORS
// ============================================================================

/// Tunable validation error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No tunable with this name
    UnknownTunable,

    /// Value outside the tunable's valid range
    OutOfRange {
        /// Tunable name
        name: &'static str,
        /// Rejected value
        value: i64,
        /// Smallest accepted value
        min: i32,
        /// Largest accepted value
        max: i32,
    },

    /// Input is not a decimal integer
    Parse,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownTunable => write!(f, "Unknown tunable"),
            Self::OutOfRange {
                name,
                value,
                min,
                max,
            } => write!(
                f,
                "Value {} for '{}' outside range [{}, {}]",
                value, name, min, max
            ),
            Self::Parse => write!(f, "Invalid integer"),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn test_display_out_of_range() {
        let err = ConfigError::OutOfRange {
            name: "fifo_batch",
            value: 500,
            min: 1,
            max: 128,
        };
        assert_eq!(
            err.to_string(),
            "Value 500 for 'fifo_batch' outside range [1, 128]"
        );
    }

    #[test]
    fn test_config_error_converts() {
        let err: IoSchedError = ConfigError::Parse.into();
        assert_eq!(err, IoSchedError::Config(ConfigError::Parse));
    }
}
