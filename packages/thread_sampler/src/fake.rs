//! Fake thread registry for testing.
//!
//! This module simulates the threads of a process, their clocks and their stacks, so code
//! that drives a sampling collector can be tested deterministically without depending on
//! what the real operating system scheduler does.
//!
//! Only available when the `test-util` feature is enabled.
//!
//! # Basic usage
//!
//! ```
//! use std::time::Duration;
//!
//! use thread_sampler::SystemThreads;
//! use thread_sampler::fake::FakeThreads;
//!
//! let fake = FakeThreads::new();
//! let worker = fake.spawn_named("worker");
//! fake.add_cpu_time(worker, Duration::from_millis(5));
//!
//! let threads = SystemThreads::fake(&fake);
//!
//! assert_eq!(threads.live_threads().len(), 2);
//! assert_eq!(threads.cpu_time(worker), Some(Duration::from_millis(5)));
//! ```
//!
//! # Driving a collector
//!
//! A [`FakeThreads`] is both the thread registry (through [`crate::SystemThreads::fake()`])
//! and the [`crate::StackSource`] of a collector. All clones share the same state, so a test
//! keeps one clone to change the simulated process between sampling passes.
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use thread_sampler::fake::FakeThreads;
//! use thread_sampler::{Frame, SamplingCollector, StackRecorder, SystemThreads};
//!
//! let fake = FakeThreads::new();
//! let worker = fake.spawn();
//! fake.set_stack(worker, vec![Frame::symbol("poll"), Frame::symbol("run")]);
//!
//! let mut collector = SamplingCollector::builder()
//!     .build(
//!         SystemThreads::fake(&fake),
//!         fake.clone(),
//!         Arc::new(StackRecorder::new()),
//!     )
//!     .unwrap();
//!
//! collector.sample();
//!
//! fake.advance(Duration::from_millis(10));
//! fake.exit(worker);
//! collector.sample();
//!
//! assert_eq!(collector.thread_contexts().stale_count(), 1);
//! ```
//!
//! # Isolation
//!
//! Each `FakeThreads` created by [`FakeThreads::new()`] is independent, so parallel tests
//! never observe each other's threads.

mod threads;

pub use threads::FakeThreads;
