use std::collections::BTreeMap;
use std::num::NonZero;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::pal::Platform;
use crate::{Capture, CaptureError, Frame, Stack, StackSource, ThreadIdentity};

const ERR_POISONED_FAKE: &str = "FakeThreads state lock should not be poisoned";

/// A synthetic set of threads with controllable clocks and stacks.
///
/// A new instance contains one running thread, the main thread, which is also the thread
/// that every caller appears to be (see [`main_thread()`][Self::main_thread]). Threads are
/// enumerated in the order they were spawned.
///
/// Clones share the same underlying state.
#[derive(Clone, Debug)]
pub struct FakeThreads {
    state: Arc<Mutex<State>>,
}

#[derive(Debug)]
struct State {
    main: ThreadIdentity,

    // Ordered by identity, which orders by spawn order because native IDs and start ticks
    // are both handed out from increasing counters.
    threads: BTreeMap<ThreadIdentity, FakeThread>,

    next_native_id: u64,
    next_start_ticks: u64,

    now: Instant,
    cpu_time_supported: bool,
}

#[derive(Debug)]
struct FakeThread {
    name: Option<Arc<str>>,
    alive: bool,
    cpu_time: Duration,
    capture: FakeCapture,
}

#[derive(Debug)]
enum FakeCapture {
    Stack(Vec<Frame>),
    NotRunning,
    Unreadable(String),
    ExitDuringCapture,
}

impl FakeThreads {
    /// Creates a process with only a main thread, named `main`.
    #[must_use]
    pub fn new() -> Self {
        let main = ThreadIdentity::new(1, 1);

        let mut threads = BTreeMap::new();
        threads.insert(main, FakeThread::new(Some("main".into())));

        Self {
            state: Arc::new(Mutex::new(State {
                main,
                threads,
                next_native_id: 2,
                next_start_ticks: 2,
                now: Instant::now(),
                cpu_time_supported: true,
            })),
        }
    }

    /// The thread that exists from the start and that every caller appears to run on.
    #[must_use]
    pub fn main_thread(&self) -> ThreadIdentity {
        self.state.lock().expect(ERR_POISONED_FAKE).main
    }

    /// Starts a new unnamed thread.
    ///
    /// The thread has consumed no processor time and is not running code whose stack can
    /// be captured until [`set_stack()`][Self::set_stack] is called for it.
    #[must_use]
    pub fn spawn(&self) -> ThreadIdentity {
        self.spawn_inner(None, None)
    }

    /// Starts a new thread with the given name.
    #[must_use]
    pub fn spawn_named(&self, name: impl Into<Arc<str>>) -> ThreadIdentity {
        self.spawn_inner(Some(name.into()), None)
    }

    /// Starts a new thread that reuses the native ID of a previous thread, the way an
    /// operating system recycles the IDs of exited threads.
    ///
    /// # Panics
    ///
    /// Panics if `previous` is still alive.
    #[must_use]
    pub fn spawn_reusing_id(&self, previous: ThreadIdentity) -> ThreadIdentity {
        assert!(
            !self.is_alive(previous),
            "cannot reuse the native ID of thread {previous} while it is still alive"
        );

        self.spawn_inner(None, Some(previous.native_id()))
    }

    fn spawn_inner(&self, name: Option<Arc<str>>, native_id: Option<u64>) -> ThreadIdentity {
        let mut state = self.state.lock().expect(ERR_POISONED_FAKE);

        let native_id = native_id.unwrap_or_else(|| {
            let id = state.next_native_id;
            state.next_native_id = id.wrapping_add(1);
            id
        });

        let start_ticks = state.next_start_ticks;
        state.next_start_ticks = start_ticks.wrapping_add(1);

        let thread = ThreadIdentity::new(native_id, start_ticks);
        state.threads.insert(thread, FakeThread::new(name));

        thread
    }

    /// Terminates a thread. Terminating an unknown or already exited thread does nothing.
    pub fn exit(&self, thread: ThreadIdentity) {
        self.with_thread(thread, |t| t.alive = false);
    }

    /// Moves the wall clock forward.
    ///
    /// # Panics
    ///
    /// Panics if the clock would overflow.
    pub fn advance(&self, duration: Duration) {
        let mut state = self.state.lock().expect(ERR_POISONED_FAKE);

        state.now = state
            .now
            .checked_add(duration)
            .expect("fake wall clock overflowed");
    }

    /// Moves the wall clock backward, simulating a clock that is not monotonic.
    ///
    /// # Panics
    ///
    /// Panics if the clock would move before the earliest instant the platform supports.
    pub fn rewind(&self, duration: Duration) {
        let mut state = self.state.lock().expect(ERR_POISONED_FAKE);

        state.now = state
            .now
            .checked_sub(duration)
            .expect("fake wall clock moved before the earliest supported instant");
    }

    /// Sets the total processor time a thread has consumed since it started.
    ///
    /// Setting a value lower than the previous one simulates a processor clock that moved
    /// backwards.
    pub fn set_cpu_time(&self, thread: ThreadIdentity, cpu_time: Duration) {
        self.with_thread(thread, |t| t.cpu_time = cpu_time);
    }

    /// Adds to the processor time a thread has consumed.
    pub fn add_cpu_time(&self, thread: ThreadIdentity, cpu_time: Duration) {
        self.with_thread(thread, |t| t.cpu_time = t.cpu_time.saturating_add(cpu_time));
    }

    /// Sets whether the platform reports per-thread processor time at all.
    ///
    /// When unsupported, every thread reports `None` as its processor time.
    pub fn set_cpu_time_supported(&self, supported: bool) {
        self.state.lock().expect(ERR_POISONED_FAKE).cpu_time_supported = supported;
    }

    /// Sets the frames, innermost first, that capturing the thread's stack returns.
    pub fn set_stack(&self, thread: ThreadIdentity, frames: Vec<Frame>) {
        self.with_thread(thread, |t| t.capture = FakeCapture::Stack(frames));
    }

    /// Makes the thread report that it is not running code whose stack can be captured.
    ///
    /// This is the state of every newly spawned thread.
    pub fn set_not_running(&self, thread: ThreadIdentity) {
        self.with_thread(thread, |t| t.capture = FakeCapture::NotRunning);
    }

    /// Makes every capture of the thread's stack fail with
    /// [`CaptureError::Unreadable`].
    pub fn set_unreadable(&self, thread: ThreadIdentity, reason: impl Into<String>) {
        let reason = reason.into();
        self.with_thread(thread, |t| t.capture = FakeCapture::Unreadable(reason));
    }

    /// Makes the thread exit at the moment its stack is next captured, simulating a thread
    /// that terminates between enumeration and capture.
    pub fn exit_during_capture(&self, thread: ThreadIdentity) {
        self.with_thread(thread, |t| t.capture = FakeCapture::ExitDuringCapture);
    }

    fn with_thread(&self, thread: ThreadIdentity, f: impl FnOnce(&mut FakeThread)) {
        let mut state = self.state.lock().expect(ERR_POISONED_FAKE);

        if let Some(t) = state.threads.get_mut(&thread) {
            f(t);
        }
    }
}

impl Default for FakeThreads {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeThread {
    const fn new(name: Option<Arc<str>>) -> Self {
        Self {
            name,
            alive: true,
            cpu_time: Duration::ZERO,
            capture: FakeCapture::NotRunning,
        }
    }
}

impl Platform for FakeThreads {
    fn live_threads(&self) -> Vec<ThreadIdentity> {
        let state = self.state.lock().expect(ERR_POISONED_FAKE);

        state
            .threads
            .iter()
            .filter(|(_, t)| t.alive)
            .map(|(id, _)| *id)
            .collect()
    }

    fn current_thread(&self) -> ThreadIdentity {
        self.main_thread()
    }

    fn is_alive(&self, thread: ThreadIdentity) -> bool {
        let state = self.state.lock().expect(ERR_POISONED_FAKE);

        state.threads.get(&thread).is_some_and(|t| t.alive)
    }

    fn cpu_time(&self, thread: ThreadIdentity) -> Option<Duration> {
        let state = self.state.lock().expect(ERR_POISONED_FAKE);

        if !state.cpu_time_supported {
            return None;
        }

        state
            .threads
            .get(&thread)
            .filter(|t| t.alive)
            .map(|t| t.cpu_time)
    }

    fn thread_name(&self, thread: ThreadIdentity) -> Option<Arc<str>> {
        let state = self.state.lock().expect(ERR_POISONED_FAKE);

        state.threads.get(&thread).and_then(|t| t.name.clone())
    }

    fn now(&self) -> Instant {
        self.state.lock().expect(ERR_POISONED_FAKE).now
    }
}

impl StackSource for FakeThreads {
    fn capture(
        &mut self,
        thread: ThreadIdentity,
        max_frames: NonZero<usize>,
    ) -> Result<Capture, CaptureError> {
        let mut state = self.state.lock().expect(ERR_POISONED_FAKE);

        let Some(t) = state.threads.get_mut(&thread).filter(|t| t.alive) else {
            return Err(CaptureError::ThreadExited);
        };

        match &t.capture {
            FakeCapture::Stack(frames) => Ok(Capture::Stack(Stack::bounded(
                frames.clone(),
                max_frames,
            ))),
            FakeCapture::NotRunning => Ok(Capture::NotRunning),
            FakeCapture::Unreadable(reason) => Err(CaptureError::Unreadable {
                reason: reason.clone(),
            }),
            FakeCapture::ExitDuringCapture => {
                t.alive = false;
                Err(CaptureError::ThreadExited)
            }
        }
    }
}
