//! Per-thread accounting carried between sampling passes.

use std::collections::hash_map::{Entry, Values};
use std::time::{Duration, Instant};

use foldhash::{HashMap, HashMapExt};

use crate::{SampleValues, ThreadIdentity};

/// Bookkeeping for one thread that has been sampled at least once.
///
/// A context is created the first time a sampling pass observes its thread, updated on
/// every later pass that samples the thread, marked stale once the thread is no longer
/// observed and finally removed by a pruning pass.
#[derive(Clone, Debug)]
pub struct ThreadContext {
    thread: ThreadIdentity,
    last_wall_time: Instant,
    last_cpu_time: Option<Duration>,
    is_stale: bool,

    total_cpu_time: Duration,
    total_wall_time: Duration,
    sample_count: u64,

    /// Sequence number of the sampling pass that last observed the thread.
    last_seen_pass: u64,
}

impl ThreadContext {
    pub(crate) const fn new(
        thread: ThreadIdentity,
        now: Instant,
        cpu_time: Option<Duration>,
        pass: u64,
    ) -> Self {
        Self {
            thread,
            last_wall_time: now,
            last_cpu_time: cpu_time,
            is_stale: false,
            total_cpu_time: Duration::ZERO,
            total_wall_time: Duration::ZERO,
            sample_count: 0,
            last_seen_pass: pass,
        }
    }

    /// The thread this context belongs to.
    #[must_use]
    pub const fn thread(&self) -> ThreadIdentity {
        self.thread
    }

    /// Wall clock time of the most recent sample of the thread.
    #[must_use]
    pub const fn last_wall_time(&self) -> Instant {
        self.last_wall_time
    }

    /// Processor time of the thread as of the most recent sample, if the platform reports it.
    #[must_use]
    pub const fn last_cpu_time(&self) -> Option<Duration> {
        self.last_cpu_time
    }

    /// Whether the thread has been observed to no longer exist.
    #[must_use]
    pub const fn is_stale(&self) -> bool {
        self.is_stale
    }

    /// Total processor time attributed to samples of this thread.
    #[must_use]
    pub const fn total_cpu_time(&self) -> Duration {
        self.total_cpu_time
    }

    /// Total wall clock time attributed to samples of this thread.
    #[must_use]
    pub const fn total_wall_time(&self) -> Duration {
        self.total_wall_time
    }

    /// How many samples of this thread have been taken.
    #[must_use]
    pub const fn sample_count(&self) -> u64 {
        self.sample_count
    }

    /// Moves the context forward to the current clock readings, returning the time elapsed
    /// since the previous sample.
    ///
    /// Readings earlier than the previous ones produce a zero delta. If either the previous
    /// or the current processor time is unknown, the processor time delta is zero.
    pub(crate) fn advance(
        &mut self,
        now: Instant,
        cpu_time: Option<Duration>,
        pass: u64,
    ) -> SampleValues {
        let wall_time = now.saturating_duration_since(self.last_wall_time);

        let cpu_time_delta = match (self.last_cpu_time, cpu_time) {
            (Some(previous), Some(current)) => current.saturating_sub(previous),
            _ => Duration::ZERO,
        };

        self.last_wall_time = now;
        self.last_cpu_time = cpu_time;

        self.total_wall_time = self.total_wall_time.saturating_add(wall_time);
        self.total_cpu_time = self.total_cpu_time.saturating_add(cpu_time_delta);
        self.sample_count = self.sample_count.saturating_add(1);

        self.mark_seen(pass);

        SampleValues {
            cpu_time: cpu_time_delta,
            wall_time,
        }
    }

    pub(crate) const fn mark_seen(&mut self, pass: u64) {
        self.last_seen_pass = pass;
        self.is_stale = false;
    }

    pub(crate) const fn mark_stale(&mut self) {
        self.is_stale = true;
    }
}

/// The set of [`ThreadContext`]s kept by a sampling collector, keyed by thread identity.
///
/// Iteration order is unspecified. Only the owning collector can modify the table; callers
/// get a read-only view via [`SamplingCollector::thread_contexts()`][1].
///
/// [1]: crate::SamplingCollector::thread_contexts
#[derive(Debug, Default)]
pub struct ThreadContextTable {
    contexts: HashMap<ThreadIdentity, ThreadContext>,
}

impl ThreadContextTable {
    pub(crate) fn new() -> Self {
        Self {
            contexts: HashMap::new(),
        }
    }

    /// The context of `thread`, if the thread has been sampled and not yet pruned.
    #[must_use]
    pub fn get(&self, thread: &ThreadIdentity) -> Option<&ThreadContext> {
        self.contexts.get(thread)
    }

    /// Whether the table has a context for `thread`.
    #[must_use]
    pub fn contains(&self, thread: &ThreadIdentity) -> bool {
        self.contexts.contains_key(thread)
    }

    /// Iterates over all contexts in unspecified order.
    pub fn iter(&self) -> Values<'_, ThreadIdentity, ThreadContext> {
        self.contexts.values()
    }

    /// Number of contexts, stale ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    /// Whether the table has no contexts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    /// Number of contexts whose threads have been observed to no longer exist.
    #[must_use]
    pub fn stale_count(&self) -> usize {
        self.contexts.values().filter(|c| c.is_stale()).count()
    }

    /// Looks up the context of `thread`, creating it with `create` if it does not exist.
    ///
    /// Returns the context and whether it was newly created.
    pub(crate) fn get_or_insert_with(
        &mut self,
        thread: ThreadIdentity,
        create: impl FnOnce() -> ThreadContext,
    ) -> (&mut ThreadContext, bool) {
        match self.contexts.entry(thread) {
            Entry::Occupied(entry) => (entry.into_mut(), false),
            Entry::Vacant(entry) => (entry.insert(create()), true),
        }
    }

    pub(crate) fn get_mut(&mut self, thread: &ThreadIdentity) -> Option<&mut ThreadContext> {
        self.contexts.get_mut(thread)
    }

    pub(crate) fn remove(&mut self, thread: &ThreadIdentity) -> Option<ThreadContext> {
        self.contexts.remove(thread)
    }

    /// Marks every context not observed in `pass` as stale.
    pub(crate) fn mark_unseen_stale(&mut self, pass: u64) {
        for context in self.contexts.values_mut() {
            if context.last_seen_pass != pass {
                context.mark_stale();
            }
        }
    }
}

impl<'a> IntoIterator for &'a ThreadContextTable {
    type Item = &'a ThreadContext;
    type IntoIter = Values<'a, ThreadIdentity, ThreadContext>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(ThreadContextTable: Send, Sync);

    fn thread(id: u64) -> ThreadIdentity {
        ThreadIdentity::new(id, 0)
    }

    #[test]
    fn advance_computes_deltas() {
        let start = Instant::now();
        let mut context = ThreadContext::new(thread(1), start, Some(Duration::from_millis(5)), 1);

        let values = context.advance(
            start + Duration::from_millis(100),
            Some(Duration::from_millis(25)),
            2,
        );

        assert_eq!(values.wall_time, Duration::from_millis(100));
        assert_eq!(values.cpu_time, Duration::from_millis(20));
        assert_eq!(context.total_wall_time(), Duration::from_millis(100));
        assert_eq!(context.total_cpu_time(), Duration::from_millis(20));
        assert_eq!(context.sample_count(), 1);
        assert_eq!(context.last_cpu_time(), Some(Duration::from_millis(25)));
    }

    #[test]
    fn advance_clamps_backwards_clocks_to_zero() {
        let start = Instant::now() + Duration::from_secs(10);
        let mut context = ThreadContext::new(thread(1), start, Some(Duration::from_secs(3)), 1);

        let values = context.advance(
            start - Duration::from_secs(1),
            Some(Duration::from_secs(1)),
            2,
        );

        assert_eq!(values.wall_time, Duration::ZERO);
        assert_eq!(values.cpu_time, Duration::ZERO);
    }

    #[test]
    fn advance_without_cpu_time_yields_zero_cpu_delta() {
        let start = Instant::now();
        let mut context = ThreadContext::new(thread(1), start, None, 1);

        let values = context.advance(
            start + Duration::from_millis(1),
            Some(Duration::from_millis(50)),
            2,
        );
        assert_eq!(values.cpu_time, Duration::ZERO);

        let values = context.advance(start + Duration::from_millis(2), None, 3);
        assert_eq!(values.cpu_time, Duration::ZERO);
        assert_eq!(context.last_cpu_time(), None);
    }

    #[test]
    fn get_or_insert_creates_once() {
        let mut table = ThreadContextTable::new();
        let now = Instant::now();

        let (_, created) = table.get_or_insert_with(thread(1), || {
            ThreadContext::new(thread(1), now, None, 1)
        });
        assert!(created);

        let (_, created) = table.get_or_insert_with(thread(1), || {
            ThreadContext::new(thread(1), now, None, 1)
        });
        assert!(!created);

        assert_eq!(table.len(), 1);
        assert!(table.contains(&thread(1)));
    }

    #[test]
    fn unseen_contexts_become_stale_and_seen_ones_recover() {
        let mut table = ThreadContextTable::new();
        let now = Instant::now();

        for id in 1..=3 {
            table.get_or_insert_with(thread(id), || ThreadContext::new(thread(id), now, None, 1));
        }

        table
            .get_mut(&thread(1))
            .expect("context was just inserted")
            .mark_seen(2);
        table.mark_unseen_stale(2);

        assert!(!table.get(&thread(1)).expect("present").is_stale());
        assert!(table.get(&thread(2)).expect("present").is_stale());
        assert_eq!(table.stale_count(), 2);

        table
            .get_mut(&thread(2))
            .expect("present")
            .mark_seen(3);
        assert!(!table.get(&thread(2)).expect("present").is_stale());
    }

    #[test]
    fn remove_by_key() {
        let mut table = ThreadContextTable::new();
        let now = Instant::now();

        for id in 1..=4 {
            table.get_or_insert_with(thread(id), || ThreadContext::new(thread(id), now, None, 1));
        }

        assert!(table.remove(&thread(2)).is_some());
        assert!(table.remove(&thread(2)).is_none());

        assert_eq!(table.len(), 3);
        assert_eq!((&table).into_iter().count(), 3);
        assert!(!table.contains(&thread(2)));
    }
}
