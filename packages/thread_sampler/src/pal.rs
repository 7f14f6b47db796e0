//! Platform abstraction layer for inspecting the threads of the current process.
//!
//! The real backend reads the Linux `/proc` filesystem. Other operating systems get a
//! fallback backend that reports no threads. Tests and the `test-util` feature substitute
//! the synthetic thread registry from [`crate::fake`].

mod abstractions;
mod facade;

pub(crate) use abstractions::*;
pub(crate) use facade::*;

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
pub(crate) use linux::*;

#[cfg(not(target_os = "linux"))]
mod fallback;
#[cfg(not(target_os = "linux"))]
pub(crate) use fallback::*;
