use std::fmt::Debug;
use std::time::SystemTime;

use crate::{RecordError, Sample, SerializeError};

/// Aggregates samples into a profile and serializes the profile on demand.
///
/// A sampling collector only ever calls [`record()`][Self::record]. Serialization is driven
/// by whoever owns profile export, typically from a different thread than the one doing the
/// sampling, so implementations must allow both operations to run concurrently.
///
/// [`StackRecorder`][crate::StackRecorder] is the implementation provided by this package.
#[cfg_attr(test, mockall::automock)]
pub trait Recorder: Debug + Send + Sync {
    /// Accepts one sample.
    ///
    /// A failure rejects only this sample. The collector counts the failure and continues
    /// with the other threads of the sampling pass.
    ///
    /// # Errors
    ///
    /// Returns an error if the recorder cannot accept the sample, for example because its
    /// buffer is full.
    fn record(&self, sample: Sample) -> Result<(), RecordError>;

    /// Serializes everything recorded since the previous serialization.
    ///
    /// # Errors
    ///
    /// Returns an error if the profile cannot be serialized.
    fn serialize(&self) -> Result<SerializedProfile, SerializeError>;
}

/// A serialized profile covering the time window from `start` to `end`.
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub struct SerializedProfile {
    /// When the profile started collecting samples.
    pub start: SystemTime,

    /// When the profile was serialized.
    pub end: SystemTime,

    /// The encoded profile. The byte layout is defined by the recorder.
    pub bytes: Vec<u8>,
}

impl SerializedProfile {
    /// Creates a serialized profile covering the time window from `start` to `end`.
    #[must_use]
    pub const fn new(start: SystemTime, end: SystemTime, bytes: Vec<u8>) -> Self {
        Self { start, end, bytes }
    }
}
