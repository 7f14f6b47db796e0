//! Backend for operating systems where thread enumeration is not supported.
//!
//! The calling thread still gets a stable identity so callers can tell threads apart, but
//! enumeration reports no threads and processor time is unavailable.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::ThreadIdentity;
use crate::pal::Platform;

pub(crate) static BUILD_TARGET_PLATFORM: BuildTargetPlatform = BuildTargetPlatform;

static NEXT_THREAD_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static CURRENT_THREAD_ID: u64 = NEXT_THREAD_ID.fetch_add(1, Ordering::Relaxed);
}

#[derive(Debug)]
pub(crate) struct BuildTargetPlatform;

impl Platform for BuildTargetPlatform {
    fn live_threads(&self) -> Vec<ThreadIdentity> {
        Vec::new()
    }

    fn current_thread(&self) -> ThreadIdentity {
        ThreadIdentity::new(CURRENT_THREAD_ID.with(|id| *id), 0)
    }

    fn is_alive(&self, _thread: ThreadIdentity) -> bool {
        false
    }

    fn cpu_time(&self, _thread: ThreadIdentity) -> Option<Duration> {
        None
    }

    fn thread_name(&self, _thread: ThreadIdentity) -> Option<Arc<str>> {
        None
    }

    fn now(&self) -> Instant {
        Instant::now()
    }
}
