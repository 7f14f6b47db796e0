use std::fmt;
use std::sync::Arc;

/// One entry of a captured call stack.
///
/// The exact contents depend on the [`StackSource`][crate::StackSource] that captured the
/// stack. The collector only ever compares and forwards frames; turning raw addresses
/// into names is left to whoever consumes the profile.
///
/// # Example
///
/// ```
/// use thread_sampler::{Frame, SourceLocation};
///
/// let raw = Frame::address(0x7f3a_1000);
/// let named = Frame::symbol("worker_loop").with_location(SourceLocation::new("src/worker.rs", 42));
///
/// assert_ne!(raw, named);
/// ```
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Frame {
    symbol: FrameSymbol,
    location: Option<SourceLocation>,
}

/// What a [`Frame`] points at: either a raw instruction pointer or an already resolved name.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum FrameSymbol {
    /// An instruction pointer that has not been symbolized.
    InstructionPointer(u64),

    /// A function, method or other named code unit.
    Name(Arc<str>),
}

/// File and line that a [`Frame`] refers to.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct SourceLocation {
    file: Arc<str>,
    line: u32,
}

impl Frame {
    /// Creates a frame from an unsymbolized instruction pointer.
    #[must_use]
    pub const fn address(instruction_pointer: u64) -> Self {
        Self {
            symbol: FrameSymbol::InstructionPointer(instruction_pointer),
            location: None,
        }
    }

    /// Creates a frame from a resolved symbol name.
    #[must_use]
    pub fn symbol(name: impl Into<Arc<str>>) -> Self {
        Self {
            symbol: FrameSymbol::Name(name.into()),
            location: None,
        }
    }

    /// Attaches a source location to the frame.
    #[must_use]
    pub fn with_location(self, location: SourceLocation) -> Self {
        Self {
            location: Some(location),
            ..self
        }
    }

    /// What the frame points at.
    #[must_use]
    pub const fn frame_symbol(&self) -> &FrameSymbol {
        &self.symbol
    }

    /// The source location of the frame, if the stack source provided one.
    #[must_use]
    pub const fn location(&self) -> Option<&SourceLocation> {
        self.location.as_ref()
    }
}

impl SourceLocation {
    /// Creates a source location.
    #[must_use]
    pub fn new(file: impl Into<Arc<str>>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }

    /// The source file path.
    #[must_use]
    pub fn file(&self) -> &str {
        &self.file
    }

    /// The 1-based line number, or 0 if unknown.
    #[must_use]
    pub const fn line(&self) -> u32 {
        self.line
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.symbol {
            FrameSymbol::InstructionPointer(ip) => write!(f, "{ip:#x}")?,
            FrameSymbol::Name(name) => write!(f, "{name}")?,
        }

        if let Some(location) = &self.location {
            write!(f, " ({}:{})", location.file, location.line)?;
        }

        Ok(())
    }
}
