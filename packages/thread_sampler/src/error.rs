use std::time::SystemTime;

use thiserror::Error;

/// Errors that can occur when building a sampling collector.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The maximum stack depth is outside the supported range.
    #[error("invalid max_frames {value}: must be between 1 and {max}")]
    InvalidMaxFrames {
        /// The value that was provided.
        value: usize,

        /// The largest supported value.
        max: usize,
    },

    /// The pruning interval was zero.
    #[error("invalid prune_interval: must be at least 1 sampling pass")]
    InvalidPruneInterval,
}

/// A failure to capture the stack of one thread.
///
/// Such failures are transient: the thread is skipped for the current sampling pass and
/// the pass carries on with the remaining threads.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CaptureError {
    /// The thread terminated before its stack could be captured.
    #[error("thread exited before its stack could be captured")]
    ThreadExited,

    /// The stack could not be read for another reason.
    #[error("thread stack is unreadable: {reason}")]
    Unreadable {
        /// A human-readable description of the problem.
        reason: String,
    },
}

/// A recorder refused to accept a sample.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RecordError {
    /// The recorder has no room for another distinct sample until it is serialized.
    #[error("recorder is full: already holds {capacity} distinct samples")]
    CapacityExceeded {
        /// How many distinct samples the recorder can hold.
        capacity: usize,
    },

    /// The recorder rejected the sample for another reason.
    #[error("recorder rejected the sample: {reason}")]
    Rejected {
        /// A human-readable description of the problem.
        reason: String,
    },
}

/// A recorder could not produce a serialized profile.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SerializeError {
    /// The system clock reports an end time earlier than the start of the profile.
    #[error("profile would end at {end:?}, before it started at {start:?}")]
    InvalidTimeRange {
        /// When the profile started.
        start: SystemTime,

        /// The end time that was observed.
        end: SystemTime,
    },

    /// The recorder could not serialize the profile for another reason.
    #[error("profile serialization failed: {reason}")]
    Failed {
        /// A human-readable description of the problem.
        reason: String,
    },
}

/// A specialized `Result` type for collector operations, returning the crate's
/// [`Error`] type as the error value.
pub(crate) type Result<T> = std::result::Result<T, Error>;
