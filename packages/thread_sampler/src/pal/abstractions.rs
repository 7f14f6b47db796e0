use std::fmt::Debug;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::ThreadIdentity;

/// Provides access to the set of threads of the current process and their clocks.
pub(crate) trait Platform: Debug + Send + Sync + 'static {
    /// Enumerates the threads that exist at the moment of the call.
    ///
    /// Threads that exit while the enumeration is in progress may or may not be included.
    fn live_threads(&self) -> Vec<ThreadIdentity>;

    /// The identity of the calling thread.
    fn current_thread(&self) -> ThreadIdentity;

    /// Whether the thread still exists.
    fn is_alive(&self, thread: ThreadIdentity) -> bool;

    /// Processor time consumed by the thread since it started.
    ///
    /// Returns `None` if the platform cannot report it or the thread no longer exists.
    fn cpu_time(&self, thread: ThreadIdentity) -> Option<Duration>;

    /// The name of the thread, if it has one.
    fn thread_name(&self, thread: ThreadIdentity) -> Option<Arc<str>>;

    /// The current wall clock time on a monotonic clock.
    fn now(&self) -> Instant;
}
