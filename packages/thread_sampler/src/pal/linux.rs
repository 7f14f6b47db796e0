//! Thread inspection via the Linux `/proc` filesystem.

mod procfs;

use std::fs;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use crate::ThreadIdentity;
use crate::pal::Platform;
use crate::pal::linux::procfs::TaskStat;

const TASK_DIR: &str = "/proc/self/task";

pub(crate) static BUILD_TARGET_PLATFORM: BuildTargetPlatform = BuildTargetPlatform;

/// Reads thread information of the current process from `/proc/self/task`.
#[derive(Debug)]
pub(crate) struct BuildTargetPlatform;

impl BuildTargetPlatform {
    fn task_stat(native_id: u64) -> Option<TaskStat> {
        let contents = fs::read_to_string(format!("{TASK_DIR}/{native_id}/stat")).ok()?;
        procfs::parse_stat(&contents)
    }

    fn identity(native_id: u64) -> Option<ThreadIdentity> {
        Self::task_stat(native_id).map(|stat| ThreadIdentity::new(native_id, stat.start_ticks))
    }
}

impl Platform for BuildTargetPlatform {
    fn live_threads(&self) -> Vec<ThreadIdentity> {
        let Ok(entries) = fs::read_dir(TASK_DIR) else {
            return Vec::new();
        };

        entries
            .filter_map(|entry| entry.ok()?.file_name().to_str()?.parse::<u64>().ok())
            // A thread that exits between listing and reading its stat file is not live.
            .filter_map(Self::identity)
            .collect()
    }

    fn current_thread(&self) -> ThreadIdentity {
        // SAFETY: gettid() has no preconditions and cannot fail.
        let tid = unsafe { libc::gettid() };
        let native_id = u64::try_from(tid).expect("thread IDs are never negative");

        // The calling thread is alive, so its stat file is readable unless /proc is not
        // mounted. In that case no enumeration will ever find it either.
        Self::identity(native_id).unwrap_or(ThreadIdentity::new(native_id, 0))
    }

    fn is_alive(&self, thread: ThreadIdentity) -> bool {
        Self::task_stat(thread.native_id())
            .is_some_and(|stat| stat.start_ticks == thread.start_ticks())
    }

    fn cpu_time(&self, thread: ThreadIdentity) -> Option<Duration> {
        let native_id = thread.native_id();

        // schedstat has nanosecond precision but depends on the kernel configuration.
        if let Some(nanos) = fs::read_to_string(format!("{TASK_DIR}/{native_id}/schedstat"))
            .ok()
            .and_then(|contents| procfs::parse_schedstat(&contents))
        {
            return Some(Duration::from_nanos(nanos));
        }

        let stat = Self::task_stat(native_id)?;
        Some(procfs::ticks_to_duration(
            stat.utime_ticks.saturating_add(stat.stime_ticks),
            clock_ticks_per_second(),
        ))
    }

    fn thread_name(&self, thread: ThreadIdentity) -> Option<Arc<str>> {
        let contents =
            fs::read_to_string(format!("{TASK_DIR}/{}/comm", thread.native_id())).ok()?;
        let name = contents.trim_end_matches('\n');

        (!name.is_empty()).then(|| name.into())
    }

    fn now(&self) -> Instant {
        Instant::now()
    }
}

fn clock_ticks_per_second() -> u64 {
    static TICKS: OnceLock<u64> = OnceLock::new();

    *TICKS.get_or_init(|| {
        // SAFETY: sysconf() has no preconditions; it only reads a configuration value.
        let ticks = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };

        // 100 Hz is the value on every mainstream Linux configuration.
        u64::try_from(ticks).ok().filter(|t| *t > 0).unwrap_or(100)
    })
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::sync::mpsc;
    use std::thread;

    use super::*;

    #[test]
    #[cfg_attr(miri, ignore)] // Miri cannot use the real operating system APIs.
    fn current_thread_is_live() {
        let platform = &BUILD_TARGET_PLATFORM;
        let me = platform.current_thread();

        assert!(platform.live_threads().contains(&me));
        assert!(platform.is_alive(me));
        assert!(platform.cpu_time(me).is_some());
    }

    #[test]
    #[cfg_attr(miri, ignore)] // Miri cannot use the real operating system APIs.
    fn exited_thread_is_not_alive() {
        let platform = &BUILD_TARGET_PLATFORM;

        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            tx.send(BUILD_TARGET_PLATFORM.current_thread()).unwrap();
        })
        .join()
        .unwrap();

        let exited = rx.recv().unwrap();

        // join() may return a moment before the kernel removes the task from /proc.
        let deadline = Instant::now() + Duration::from_secs(5);
        while platform.is_alive(exited) && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }

        assert!(!platform.is_alive(exited));
        assert!(!platform.live_threads().contains(&exited));
    }

    #[test]
    #[cfg_attr(miri, ignore)] // Miri cannot use the real operating system APIs.
    fn reports_thread_name() {
        let name = thread::Builder::new()
            .name("sampler-name".to_string())
            .spawn(|| {
                let platform = &BUILD_TARGET_PLATFORM;
                platform.thread_name(platform.current_thread())
            })
            .unwrap()
            .join()
            .unwrap();

        assert_eq!(name.as_deref(), Some("sampler-name"));
    }
}
