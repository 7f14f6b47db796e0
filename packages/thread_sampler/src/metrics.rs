//! Metrics for the sampling collector.
//!
//! The events use per-thread instances, so a collector driven from a dedicated timer thread
//! never contends with the rest of the application when reporting.

use nm::{Event, Magnitude};

/// Histogram buckets for the number of threads visited by one sampling pass.
const THREADS_PER_PASS_BUCKETS: &[Magnitude] = &[1, 2, 4, 8, 16, 32, 64, 128, 256, 512, 1024];

/// Histogram buckets for the duration of one sampling pass in milliseconds.
const PASS_DURATION_MS_BUCKETS: &[Magnitude] = &[0, 1, 2, 5, 10, 20, 50, 100, 200, 500];

thread_local! {
    /// A sampling pass was performed.
    pub(crate) static PASSES: Event = Event::builder()
        .name("thread_sampler_passes")
        .build();

    /// Samples accepted by the recorder.
    pub(crate) static SAMPLES_RECORDED: Event = Event::builder()
        .name("thread_sampler_samples_recorded")
        .build();

    /// Threads skipped in a pass because their stack could not be captured.
    pub(crate) static CAPTURE_FAILURES: Event = Event::builder()
        .name("thread_sampler_capture_failures")
        .build();

    /// Samples the recorder refused to accept.
    pub(crate) static RECORD_FAILURES: Event = Event::builder()
        .name("thread_sampler_record_failures")
        .build();

    /// Contexts of terminated threads removed from the context table.
    pub(crate) static CONTEXTS_PRUNED: Event = Event::builder()
        .name("thread_sampler_contexts_pruned")
        .build();

    /// Number of live threads enumerated by a sampling pass.
    pub(crate) static THREADS_PER_PASS: Event = Event::builder()
        .name("thread_sampler_threads_per_pass")
        .histogram(THREADS_PER_PASS_BUCKETS)
        .build();

    /// How long one sampling pass took, in milliseconds.
    pub(crate) static PASS_DURATION_MS: Event = Event::builder()
        .name("thread_sampler_pass_duration_ms")
        .histogram(PASS_DURATION_MS_BUCKETS)
        .build();
}
