//! Public handle to the thread registry of the process, supporting both real and fake
//! implementations.

use std::sync::Arc;
use std::time::{Duration, Instant};

#[cfg(any(test, feature = "test-util"))]
use crate::fake::FakeThreads;
use crate::ThreadIdentity;
use crate::pal::{Platform, PlatformFacade};

/// Handle to the threads of the current process and their clocks.
///
/// A `SystemThreads` either inspects the real threads of the process (via
/// [`SystemThreads::current()`]) or a synthetic thread set for testing (via
/// `SystemThreads::fake()` when the `test-util` feature is enabled). A sampling collector
/// takes the handle as a parameter, so tests can drive it with a fully controlled set of
/// threads.
///
/// Thread enumeration and per-thread processor time are supported on Linux. On other
/// operating systems the real registry reports no threads.
///
/// # Example
///
/// ```
/// use thread_sampler::SystemThreads;
///
/// let threads = SystemThreads::current();
///
/// for thread in threads.live_threads() {
///     println!(
///         "thread {thread} ({:?}) used {:?} of processor time",
///         threads.thread_name(thread),
///         threads.cpu_time(thread)
///     );
/// }
/// ```
#[derive(Clone, Debug)]
pub struct SystemThreads {
    platform: PlatformFacade,
}

impl SystemThreads {
    /// Returns a handle to the real threads of the current process.
    #[must_use]
    pub const fn current() -> Self {
        Self {
            platform: PlatformFacade::target(),
        }
    }

    /// Returns a handle to a synthetic thread set for testing purposes.
    ///
    /// This method is only available when the `test-util` feature is enabled. The handle
    /// observes all later changes made through `threads` and its clones.
    ///
    /// # Example
    ///
    /// ```
    /// use thread_sampler::SystemThreads;
    /// use thread_sampler::fake::FakeThreads;
    ///
    /// let fake = FakeThreads::new();
    /// let worker = fake.spawn();
    ///
    /// let threads = SystemThreads::fake(&fake);
    /// assert_eq!(threads.live_threads(), vec![fake.main_thread(), worker]);
    ///
    /// fake.exit(worker);
    /// assert!(!threads.is_alive(worker));
    /// ```
    #[cfg(any(test, feature = "test-util"))]
    #[must_use]
    pub fn fake(threads: &FakeThreads) -> Self {
        Self {
            platform: PlatformFacade::fake(threads),
        }
    }

    /// Enumerates the threads that exist at the moment of the call.
    #[must_use]
    pub fn live_threads(&self) -> Vec<ThreadIdentity> {
        self.platform.live_threads()
    }

    /// The identity of the calling thread.
    #[must_use]
    pub fn current_thread(&self) -> ThreadIdentity {
        self.platform.current_thread()
    }

    /// Whether `thread` still exists.
    #[must_use]
    pub fn is_alive(&self, thread: ThreadIdentity) -> bool {
        self.platform.is_alive(thread)
    }

    /// Processor time consumed by `thread` since it started, if the platform can report it.
    #[must_use]
    pub fn cpu_time(&self, thread: ThreadIdentity) -> Option<Duration> {
        self.platform.cpu_time(thread)
    }

    /// The name of `thread`, if it has one.
    #[must_use]
    pub fn thread_name(&self, thread: ThreadIdentity) -> Option<Arc<str>> {
        self.platform.thread_name(thread)
    }

    /// The current time on the monotonic clock used for wall time accounting.
    #[must_use]
    pub fn now(&self) -> Instant {
        self.platform.now()
    }
}
