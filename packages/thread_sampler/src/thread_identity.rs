use std::fmt;

/// Identifies one thread of the current process for the lifetime of the process.
///
/// The identity combines the operating system thread ID with the moment the thread was
/// started, so a thread ID recycled by the operating system after a thread exits never
/// aliases the exited thread. An identity remains a valid map key after its thread has
/// terminated.
///
/// # Example
///
/// ```
/// use thread_sampler::SystemThreads;
///
/// let threads = SystemThreads::current();
/// let me = threads.current_thread();
///
/// println!("sampling thread {me}");
/// ```
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ThreadIdentity {
    native_id: u64,
    start_ticks: u64,
}

impl ThreadIdentity {
    pub(crate) const fn new(native_id: u64, start_ticks: u64) -> Self {
        Self {
            native_id,
            start_ticks,
        }
    }

    /// The thread ID assigned by the operating system.
    ///
    /// This is the value carried by the `thread id` label of every sample. It is not unique
    /// over the lifetime of the process because the operating system may reuse it.
    #[must_use]
    pub const fn native_id(&self) -> u64 {
        self.native_id
    }

    /// The platform-specific moment the thread started, used to tell apart threads that
    /// reused the same native ID.
    #[must_use]
    pub(crate) const fn start_ticks(&self) -> u64 {
        self.start_ticks
    }
}

impl fmt::Display for ThreadIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.native_id)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::collections::HashSet;

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(ThreadIdentity: Send, Sync, Copy);

    #[test]
    fn recycled_native_id_is_distinct_identity() {
        let first = ThreadIdentity::new(42, 1_000);
        let second = ThreadIdentity::new(42, 2_000);

        assert_ne!(first, second);
        assert_eq!(first.native_id(), second.native_id());

        let set: HashSet<_> = [first, second].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn displays_native_id() {
        let identity = ThreadIdentity::new(1234, 99);
        assert_eq!(identity.to_string(), "1234");
    }
}
