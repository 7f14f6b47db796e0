#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Periodic processor time and wall clock time sampling of every thread of a process.
//!
//! A [`SamplingCollector`] performs one sampling pass each time its owner calls
//! [`sample()`][SamplingCollector::sample]. A pass enumerates the live threads of the
//! process, captures each thread's call stack and attributes the processor time and wall
//! clock time the thread spent since its previous sample to that stack. The resulting
//! [`Sample`]s go to a [`Recorder`], which aggregates them into a profile that can be
//! serialized on demand.
//!
//! The core functionality includes:
//! - [`SamplingCollector`] - Performs sampling passes and keeps per-thread bookkeeping
//! - [`ThreadContextTable`] - Read-only view of the per-thread bookkeeping
//! - [`StackSource`] - Captures the stack of an arbitrary thread, supplied by the owner
//! - [`SystemThreads`] - Enumerates the threads of the process and reads their clocks
//! - [`Recorder`] - Receives samples and serializes profiles
//! - [`StackRecorder`] - Aggregating recorder that emits [pprof] profiles
//!
//! The collector never decides when to sample. Scheduling the passes, for example from a
//! timer thread, is up to the owner.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::thread;
//! use std::time::Duration;
//!
//! use thread_sampler::{Recorder, SamplingCollector, StackRecorder, SystemThreads, TimingOnly};
//!
//! let recorder = Arc::new(StackRecorder::new());
//!
//! let mut collector = SamplingCollector::builder()
//!     .build(SystemThreads::current(), TimingOnly, Arc::clone(&recorder))
//!     .unwrap();
//!
//! for _ in 0..3 {
//!     collector.sample();
//!     thread::sleep(Duration::from_millis(10));
//! }
//!
//! let profile = recorder.serialize().unwrap();
//! println!(
//!     "{} bytes of pprof covering {:?}",
//!     profile.bytes.len(),
//!     profile.end.duration_since(profile.start)
//! );
//! ```
//!
//! # Platform support
//!
//! Thread enumeration and per-thread processor time are read from the `/proc` filesystem on
//! Linux. On other operating systems the real thread registry reports no threads.
//!
//! # Testing
//!
//! With the `test-util` feature enabled, the [`fake`] module provides a synthetic thread
//! registry that doubles as a stack source, so code driving a collector can be tested
//! deterministically.

mod collector;
mod collector_builder;
mod error;
mod frame;
mod metrics;
mod pal;
mod pprof_encoder;
mod recorder;
mod sample;
mod stack;
mod stack_recorder;
mod stack_source;
mod system_threads;
mod thread_context;
mod thread_identity;

#[cfg(any(test, feature = "test-util"))]
pub mod fake;
pub mod pprof;

pub use collector::*;
pub use collector_builder::*;
pub use error::*;
pub use frame::*;
pub use recorder::*;
pub use sample::*;
pub use stack::*;
pub use stack_recorder::*;
pub use stack_source::*;
pub use system_threads::*;
pub use thread_context::*;
pub use thread_identity::*;

pub(crate) const ERR_POISONED_LOCK: &str = "poisoned lock - safe execution no longer possible";
