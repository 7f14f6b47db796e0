use std::num::NonZero;
use std::sync::Arc;

use new_zealand::nz;

use crate::{Error, Recorder, Result, SamplingCollector, StackSource, SystemThreads};

/// Default maximum number of frames captured per stack.
pub const DEFAULT_MAX_FRAMES: NonZero<usize> = nz!(400);

/// The largest supported maximum number of frames captured per stack.
pub const MAX_FRAMES_LIMIT: usize = 10_000;

/// Default number of sampling passes between two sweeps of terminated threads.
pub const DEFAULT_PRUNE_INTERVAL: NonZero<u64> = nz!(100);

/// Builder for creating an instance of [`SamplingCollector`].
///
/// All settings are optional. Values are validated when the collector is built.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use thread_sampler::{SamplingCollector, StackRecorder, SystemThreads, TimingOnly};
///
/// let collector = SamplingCollector::builder()
///     .max_frames(64)
///     .prune_interval(500)
///     .build(
///         SystemThreads::current(),
///         TimingOnly,
///         Arc::new(StackRecorder::new()),
///     )
///     .unwrap();
///
/// assert_eq!(collector.max_frames().get(), 64);
/// ```
#[derive(Debug)]
#[must_use]
pub struct CollectorBuilder {
    max_frames: usize,
    prune_interval: u64,
}

impl CollectorBuilder {
    pub(crate) const fn new() -> Self {
        Self {
            max_frames: DEFAULT_MAX_FRAMES.get(),
            prune_interval: DEFAULT_PRUNE_INTERVAL.get(),
        }
    }

    /// Sets the maximum number of frames captured per stack.
    ///
    /// Deeper stacks are truncated from the outermost end, with the truncation recorded on
    /// the sample. Must be between 1 and [`MAX_FRAMES_LIMIT`]. Defaults to
    /// [`DEFAULT_MAX_FRAMES`].
    pub const fn max_frames(mut self, max_frames: usize) -> Self {
        self.max_frames = max_frames;
        self
    }

    /// Sets how many sampling passes happen between two sweeps that remove the bookkeeping
    /// of terminated threads.
    ///
    /// Must be at least 1. Defaults to [`DEFAULT_PRUNE_INTERVAL`].
    pub const fn prune_interval(mut self, passes: u64) -> Self {
        self.prune_interval = passes;
        self
    }

    /// Builds a collector that samples the threads of `threads`, captures their stacks with
    /// `stacks` and hands every sample to `recorder`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMaxFrames`] if the maximum stack depth is out of range and
    /// [`Error::InvalidPruneInterval`] if the pruning interval is zero.
    pub fn build<S, R>(
        self,
        threads: SystemThreads,
        stacks: S,
        recorder: Arc<R>,
    ) -> Result<SamplingCollector<S, R>>
    where
        S: StackSource,
        R: Recorder + ?Sized,
    {
        let max_frames = NonZero::new(self.max_frames)
            .filter(|n| n.get() <= MAX_FRAMES_LIMIT)
            .ok_or(Error::InvalidMaxFrames {
                value: self.max_frames,
                max: MAX_FRAMES_LIMIT,
            })?;

        let prune_interval =
            NonZero::new(self.prune_interval).ok_or(Error::InvalidPruneInterval)?;

        Ok(SamplingCollector::new(
            threads,
            stacks,
            recorder,
            max_frames,
            prune_interval,
        ))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use static_assertions::assert_impl_all;

    use super::*;
    use crate::fake::FakeThreads;
    use crate::{StackRecorder, TimingOnly};

    assert_impl_all!(CollectorBuilder: Send, Sync);

    fn build(builder: CollectorBuilder) -> Result<SamplingCollector<TimingOnly, StackRecorder>> {
        builder.build(
            SystemThreads::fake(&FakeThreads::new()),
            TimingOnly,
            Arc::new(StackRecorder::new()),
        )
    }

    #[test]
    fn defaults() {
        let collector = build(CollectorBuilder::new()).unwrap();

        assert_eq!(collector.max_frames(), DEFAULT_MAX_FRAMES);
        assert_eq!(collector.prune_interval(), DEFAULT_PRUNE_INTERVAL);
    }

    #[test]
    fn custom_values() {
        let collector = build(CollectorBuilder::new().max_frames(123).prune_interval(7)).unwrap();

        assert_eq!(collector.max_frames().get(), 123);
        assert_eq!(collector.prune_interval().get(), 7);
    }

    #[test]
    fn max_frames_limits_are_inclusive() {
        build(CollectorBuilder::new().max_frames(1)).unwrap();
        build(CollectorBuilder::new().max_frames(MAX_FRAMES_LIMIT)).unwrap();
    }

    #[test]
    fn zero_max_frames_is_rejected() {
        let error = build(CollectorBuilder::new().max_frames(0)).unwrap_err();

        assert!(matches!(
            error,
            Error::InvalidMaxFrames {
                value: 0,
                max: MAX_FRAMES_LIMIT
            }
        ));
    }

    #[test]
    fn excessive_max_frames_is_rejected() {
        let error = build(CollectorBuilder::new().max_frames(MAX_FRAMES_LIMIT + 1)).unwrap_err();

        assert!(matches!(error, Error::InvalidMaxFrames { .. }));
    }

    #[test]
    fn zero_prune_interval_is_rejected() {
        let error = build(CollectorBuilder::new().prune_interval(0)).unwrap_err();

        assert!(matches!(error, Error::InvalidPruneInterval));
    }
}
