use std::num::NonZero;

use crate::Frame;

/// A captured call stack, innermost frame first.
///
/// A stack is bounded to a maximum depth. When the real stack was deeper, the frames
/// beyond the bound are dropped from the outermost end and their count is kept in
/// [`truncated_frames()`][Self::truncated_frames], so truncation stays visible in the
/// resulting profile instead of silently shortening the stack.
///
/// # Example
///
/// ```
/// use std::num::NonZero;
///
/// use thread_sampler::{Frame, Stack};
///
/// let frames = vec![
///     Frame::symbol("leaf"),
///     Frame::symbol("middle"),
///     Frame::symbol("root"),
/// ];
///
/// let stack = Stack::bounded(frames, NonZero::new(2).unwrap());
///
/// assert_eq!(stack.frames().len(), 2);
/// assert_eq!(stack.truncated_frames(), 1);
/// ```
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct Stack {
    frames: Vec<Frame>,
    truncated_frames: usize,
}

impl Stack {
    /// A stack with no frames, used for threads that are not currently running code
    /// that can be captured.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            frames: Vec::new(),
            truncated_frames: 0,
        }
    }

    /// Creates a complete stack from frames ordered innermost first.
    #[must_use]
    pub const fn new(frames: Vec<Frame>) -> Self {
        Self {
            frames,
            truncated_frames: 0,
        }
    }

    /// Creates a stack from frames that a stack source already had to cut short,
    /// with `truncated_frames` frames known to be missing from the outermost end.
    #[must_use]
    pub const fn truncated(frames: Vec<Frame>, truncated_frames: usize) -> Self {
        Self {
            frames,
            truncated_frames,
        }
    }

    /// Creates a stack from frames ordered innermost first, keeping at most `max_frames`.
    #[must_use]
    pub fn bounded(frames: Vec<Frame>, max_frames: NonZero<usize>) -> Self {
        Self::new(frames).bound(max_frames)
    }

    /// Truncates the stack to at most `max_frames`, adding any dropped frames to the
    /// truncation count.
    #[must_use]
    pub fn bound(mut self, max_frames: NonZero<usize>) -> Self {
        let excess = self.frames.len().saturating_sub(max_frames.get());

        if excess > 0 {
            self.frames.truncate(max_frames.get());
            self.truncated_frames = self.truncated_frames.saturating_add(excess);
        }

        self
    }

    /// The captured frames, innermost first.
    #[must_use]
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// How many outermost frames are missing from [`frames()`][Self::frames].
    #[must_use]
    pub const fn truncated_frames(&self) -> usize {
        self.truncated_frames
    }

    /// Whether any frames are missing from the stack.
    #[must_use]
    pub const fn is_truncated(&self) -> bool {
        self.truncated_frames > 0
    }

    /// Whether the stack holds no frames at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}
