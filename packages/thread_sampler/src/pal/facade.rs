use std::fmt::Debug;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[cfg(any(test, feature = "test-util"))]
use crate::fake::FakeThreads;
use crate::ThreadIdentity;
use crate::pal::{BUILD_TARGET_PLATFORM, BuildTargetPlatform, Platform};

#[derive(Clone)]
pub(crate) enum PlatformFacade {
    Target(&'static BuildTargetPlatform),

    #[cfg(any(test, feature = "test-util"))]
    Fake(FakeThreads),
}

impl PlatformFacade {
    pub(crate) const fn target() -> Self {
        Self::Target(&BUILD_TARGET_PLATFORM)
    }

    #[cfg(any(test, feature = "test-util"))]
    pub(crate) fn fake(threads: &FakeThreads) -> Self {
        Self::Fake(threads.clone())
    }
}

impl Platform for PlatformFacade {
    fn live_threads(&self) -> Vec<ThreadIdentity> {
        match self {
            Self::Target(p) => p.live_threads(),
            #[cfg(any(test, feature = "test-util"))]
            Self::Fake(p) => p.live_threads(),
        }
    }

    fn current_thread(&self) -> ThreadIdentity {
        match self {
            Self::Target(p) => p.current_thread(),
            #[cfg(any(test, feature = "test-util"))]
            Self::Fake(p) => p.current_thread(),
        }
    }

    fn is_alive(&self, thread: ThreadIdentity) -> bool {
        match self {
            Self::Target(p) => p.is_alive(thread),
            #[cfg(any(test, feature = "test-util"))]
            Self::Fake(p) => p.is_alive(thread),
        }
    }

    fn cpu_time(&self, thread: ThreadIdentity) -> Option<Duration> {
        match self {
            Self::Target(p) => p.cpu_time(thread),
            #[cfg(any(test, feature = "test-util"))]
            Self::Fake(p) => p.cpu_time(thread),
        }
    }

    fn thread_name(&self, thread: ThreadIdentity) -> Option<Arc<str>> {
        match self {
            Self::Target(p) => p.thread_name(thread),
            #[cfg(any(test, feature = "test-util"))]
            Self::Fake(p) => p.thread_name(thread),
        }
    }

    fn now(&self) -> Instant {
        match self {
            Self::Target(p) => p.now(),
            #[cfg(any(test, feature = "test-util"))]
            Self::Fake(p) => p.now(),
        }
    }
}

impl Debug for PlatformFacade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Target(p) => p.fmt(f),
            #[cfg(any(test, feature = "test-util"))]
            Self::Fake(p) => p.fmt(f),
        }
    }
}
