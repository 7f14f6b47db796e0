use std::fmt::Debug;
use std::num::NonZero;

use crate::{CaptureError, Stack, ThreadIdentity};

/// Captures the call stack of an arbitrary thread of the current process.
///
/// Reading another thread's stack needs cooperation from the runtime or the operating
/// system, so the capability is supplied by the owner of the collector rather than built
/// into it. Implementations must return within a bounded time and must never block the
/// target thread indefinitely.
///
/// # Example
///
/// ```
/// use std::num::NonZero;
///
/// use thread_sampler::{Capture, CaptureError, Frame, Stack, StackSource, ThreadIdentity};
///
/// /// Attributes all time to a single placeholder frame.
/// #[derive(Debug)]
/// struct Placeholder;
///
/// impl StackSource for Placeholder {
///     fn capture(
///         &mut self,
///         _thread: ThreadIdentity,
///         max_frames: NonZero<usize>,
///     ) -> Result<Capture, CaptureError> {
///         Ok(Capture::Stack(Stack::bounded(
///             vec![Frame::symbol("unknown")],
///             max_frames,
///         )))
///     }
/// }
/// ```
pub trait StackSource: Debug + Send {
    /// Captures the stack of `thread`, innermost frame first.
    ///
    /// The returned stack should hold at most `max_frames` frames. The collector truncates
    /// longer stacks itself, recording the truncation on the stack.
    ///
    /// # Errors
    ///
    /// Returns an error if the stack cannot be read. Return [`CaptureError::ThreadExited`]
    /// if the thread terminated, so the collector can mark its bookkeeping as stale.
    fn capture(
        &mut self,
        thread: ThreadIdentity,
        max_frames: NonZero<usize>,
    ) -> Result<Capture, CaptureError>;
}

/// The result of a successful stack capture.
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum Capture {
    /// The thread's current stack.
    Stack(Stack),

    /// The thread is not executing code whose stack can be captured, for example because
    /// it is blocked outside the runtime. It is still sampled, with an empty stack, so its
    /// time is accounted for.
    NotRunning,
}

/// A [`StackSource`] that never captures frames.
///
/// Every thread is sampled with an empty stack. Use it when only the distribution of
/// processor and wall clock time across threads is of interest.
#[derive(Clone, Copy, Debug, Default)]
pub struct TimingOnly;

impl StackSource for TimingOnly {
    fn capture(
        &mut self,
        _thread: ThreadIdentity,
        _max_frames: NonZero<usize>,
    ) -> Result<Capture, CaptureError> {
        Ok(Capture::NotRunning)
    }
}
