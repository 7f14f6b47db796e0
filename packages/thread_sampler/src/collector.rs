use std::num::NonZero;
use std::sync::Arc;
use std::time::Instant;

use nm::Event;
use tracing::{debug, trace, warn};

use crate::metrics::{
    CAPTURE_FAILURES, CONTEXTS_PRUNED, PASS_DURATION_MS, PASSES, RECORD_FAILURES,
    SAMPLES_RECORDED, THREADS_PER_PASS,
};
use crate::{
    Capture, CaptureError, CollectorBuilder, RecordError, Recorder, Sample, Stack,
    StackRecorder, StackSource, SystemThreads, ThreadContext, ThreadContextTable, ThreadIdentity,
    TimingOnly,
};

/// Periodically samples the stacks and clocks of every thread of the process.
///
/// Each call to [`sample()`][Self::sample] performs one sampling pass: it enumerates the
/// live threads, captures the stack of each, attributes the processor time and wall clock
/// time elapsed since the thread's previous sample to that stack and hands the resulting
/// [`Sample`] to the recorder. Every few passes, the bookkeeping of threads that no longer
/// exist is removed.
///
/// The collector does not decide when to sample. The owner calls `sample()` at whatever
/// cadence it chooses, typically from a dedicated timer thread. Passes are serialized by
/// the `&mut self` receiver.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use thread_sampler::{Recorder, SamplingCollector, StackRecorder, SystemThreads, TimingOnly};
///
/// let recorder = Arc::new(StackRecorder::new());
///
/// let mut collector = SamplingCollector::builder()
///     .build(SystemThreads::current(), TimingOnly, Arc::clone(&recorder))
///     .unwrap();
///
/// collector.sample();
///
/// let profile = recorder.serialize().unwrap();
/// println!("profile holds {} bytes", profile.bytes.len());
/// ```
#[derive(Debug)]
pub struct SamplingCollector<S, R>
where
    S: StackSource,
    R: Recorder + ?Sized,
{
    threads: SystemThreads,
    stacks: S,
    recorder: Arc<R>,

    max_frames: NonZero<usize>,
    prune_interval: NonZero<u64>,

    contexts: ThreadContextTable,

    /// Threads seen by the enumeration of the most recent pass.
    thread_list: Vec<ThreadIdentity>,

    /// Sequence number of the most recent pass. Zero before the first pass.
    pass: u64,

    stats: CollectorStats,
}

/// Counters describing everything a [`SamplingCollector`] has done since it was built.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub struct CollectorStats {
    /// Sampling passes performed.
    pub passes: u64,

    /// Samples accepted by the recorder.
    pub samples_recorded: u64,

    /// Threads skipped because their stack could not be captured.
    pub capture_failures: u64,

    /// Samples the recorder refused to accept.
    pub record_failures: u64,

    /// Sweeps for contexts of terminated threads.
    pub prune_passes: u64,

    /// Contexts removed because their thread no longer exists.
    pub contexts_pruned: u64,
}

/// What happened during one sampling pass.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub struct PassSummary {
    /// Live threads found by the enumeration at the start of the pass.
    pub threads: usize,

    /// Samples accepted by the recorder.
    pub samples_recorded: usize,

    /// Threads skipped because their stack could not be captured.
    pub capture_failures: usize,

    /// Samples the recorder refused to accept.
    pub record_failures: usize,

    /// Contexts removed by a sweep for terminated threads, if the pass ran one.
    pub contexts_pruned: Option<usize>,
}

enum ThreadOutcome {
    Recorded,
    CaptureFailed,
    RecordFailed(RecordError),
}

impl SamplingCollector<TimingOnly, StackRecorder> {
    /// Starts building a new collector.
    ///
    /// The builder is not tied to a stack source or recorder type. Those are chosen by the
    /// arguments of [`CollectorBuilder::build()`].
    pub const fn builder() -> CollectorBuilder {
        CollectorBuilder::new()
    }
}

impl<S, R> SamplingCollector<S, R>
where
    S: StackSource,
    R: Recorder + ?Sized,
{
    pub(crate) fn new(
        threads: SystemThreads,
        stacks: S,
        recorder: Arc<R>,
        max_frames: NonZero<usize>,
        prune_interval: NonZero<u64>,
    ) -> Self {
        Self {
            threads,
            stacks,
            recorder,
            max_frames,
            prune_interval,
            contexts: ThreadContextTable::new(),
            thread_list: Vec::new(),
            pass: 0,
            stats: CollectorStats::default(),
        }
    }

    /// Performs one sampling pass over all live threads.
    ///
    /// Exactly one sample is recorded for every thread that is alive throughout the pass.
    /// Threads whose stack cannot be captured are skipped for this pass, and samples the
    /// recorder rejects are counted. Neither stops the pass from sampling the remaining
    /// threads.
    ///
    /// Every [`prune_interval()`][Self::prune_interval] passes, the pass ends with a sweep
    /// that removes the contexts of threads that no longer exist.
    pub fn sample(&mut self) -> PassSummary {
        let started = Instant::now();

        self.pass = self.pass.wrapping_add(1);
        let pass = self.pass;

        let thread_list = self.threads.live_threads();
        let now = self.threads.now();

        let mut summary = PassSummary {
            threads: thread_list.len(),
            ..PassSummary::default()
        };

        for &thread in &thread_list {
            match self.sample_thread(thread, now, pass) {
                ThreadOutcome::Recorded => {
                    summary.samples_recorded = summary.samples_recorded.saturating_add(1);
                }
                ThreadOutcome::CaptureFailed => {
                    summary.capture_failures = summary.capture_failures.saturating_add(1);
                }
                ThreadOutcome::RecordFailed(error) => {
                    // One log entry per pass is enough to notice a recorder in trouble.
                    if summary.record_failures == 0 {
                        warn!(%thread, %error, "recorder rejected a sample");
                    }

                    summary.record_failures = summary.record_failures.saturating_add(1);
                }
            }
        }

        self.thread_list = thread_list;
        self.contexts.mark_unseen_stale(pass);

        if pass % self.prune_interval == 0 {
            summary.contexts_pruned = Some(self.prune());
        }

        self.stats.passes = self.stats.passes.saturating_add(1);
        self.stats.samples_recorded =
            add_count(self.stats.samples_recorded, summary.samples_recorded);
        self.stats.capture_failures =
            add_count(self.stats.capture_failures, summary.capture_failures);
        self.stats.record_failures =
            add_count(self.stats.record_failures, summary.record_failures);

        PASSES.with(Event::observe_once);
        THREADS_PER_PASS.with(|e| e.observe(summary.threads));
        SAMPLES_RECORDED.with(|e| e.batch(summary.samples_recorded).observe_once());
        CAPTURE_FAILURES.with(|e| e.batch(summary.capture_failures).observe_once());
        RECORD_FAILURES.with(|e| e.batch(summary.record_failures).observe_once());
        PASS_DURATION_MS.with(|e| e.observe_millis(started.elapsed()));

        summary
    }

    fn sample_thread(&mut self, thread: ThreadIdentity, now: Instant, pass: u64) -> ThreadOutcome {
        let stack = match self.stacks.capture(thread, self.max_frames) {
            Ok(Capture::Stack(stack)) => stack.bound(self.max_frames),
            Ok(Capture::NotRunning) => Stack::empty(),
            Err(CaptureError::ThreadExited) => {
                trace!(%thread, "thread exited before its stack was captured");

                if let Some(context) = self.contexts.get_mut(&thread) {
                    context.mark_stale();
                }

                return ThreadOutcome::CaptureFailed;
            }
            Err(error) => {
                trace!(%thread, %error, "skipping thread with unreadable stack");
                return ThreadOutcome::CaptureFailed;
            }
        };

        let cpu_time = self.threads.cpu_time(thread);

        let (context, created) = self
            .contexts
            .get_or_insert_with(thread, || ThreadContext::new(thread, now, cpu_time, pass));

        if created {
            trace!(%thread, "started tracking thread");
        }

        // A new context starts at the current readings, so its first sample has zero deltas.
        let values = context.advance(now, cpu_time, pass);

        let sample = Sample::for_thread(thread, self.threads.thread_name(thread), stack, values);

        match self.recorder.record(sample) {
            Ok(()) => ThreadOutcome::Recorded,
            Err(error) => ThreadOutcome::RecordFailed(error),
        }
    }

    /// Removes the contexts of all threads that no longer exist, returning how many were
    /// removed.
    ///
    /// Sampling passes call this automatically every
    /// [`prune_interval()`][Self::prune_interval] passes. Call it directly to release the
    /// bookkeeping of terminated threads sooner.
    pub fn prune(&mut self) -> usize {
        let dead: Vec<ThreadIdentity> = self
            .contexts
            .iter()
            .map(ThreadContext::thread)
            .filter(|thread| !self.threads.is_alive(*thread))
            .collect();

        for thread in &dead {
            self.contexts.remove(thread);
        }

        self.stats.prune_passes = self.stats.prune_passes.saturating_add(1);
        self.stats.contexts_pruned = add_count(self.stats.contexts_pruned, dead.len());

        CONTEXTS_PRUNED.with(|e| e.batch(dead.len()).observe_once());

        debug!(
            pruned = dead.len(),
            remaining = self.contexts.len(),
            "pruned contexts of terminated threads"
        );

        dead.len()
    }

    /// The threads found by the enumeration of the most recent sampling pass.
    ///
    /// Empty before the first pass.
    #[must_use]
    pub fn thread_list(&self) -> &[ThreadIdentity] {
        &self.thread_list
    }

    /// Read-only view of the per-thread bookkeeping.
    #[must_use]
    pub const fn thread_contexts(&self) -> &ThreadContextTable {
        &self.contexts
    }

    /// Counters describing all passes performed so far.
    #[must_use]
    pub const fn stats(&self) -> CollectorStats {
        self.stats
    }

    /// The recorder that receives the samples.
    #[must_use]
    pub const fn recorder(&self) -> &Arc<R> {
        &self.recorder
    }

    /// The maximum number of frames captured per stack.
    #[must_use]
    pub const fn max_frames(&self) -> NonZero<usize> {
        self.max_frames
    }

    /// How many passes happen between two sweeps for terminated threads.
    #[must_use]
    pub const fn prune_interval(&self) -> NonZero<u64> {
        self.prune_interval
    }
}

fn add_count(total: u64, count: usize) -> u64 {
    total.saturating_add(u64::try_from(count).unwrap_or(u64::MAX))
}
