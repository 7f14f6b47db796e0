//! Drives a sampling collector from a dedicated timer thread while a few worker threads
//! burn processor time, then prints how the time was attributed across threads.

#![expect(
    clippy::arithmetic_side_effects,
    clippy::cast_precision_loss,
    clippy::indexing_slicing,
    reason = "this is example code that does not need to be production-grade"
)]

use std::hint::black_box;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use prost::Message;
use thread_sampler::pprof::Profile;
use thread_sampler::{
    Recorder, SamplingCollector, StackRecorder, SystemThreads, THREAD_ID_LABEL,
    THREAD_NAME_LABEL, TimingOnly,
};

const SAMPLING_INTERVAL: Duration = Duration::from_millis(10);
const RUN_TIME: Duration = Duration::from_secs(1);

fn main() {
    let stop = Arc::new(AtomicBool::new(false));

    let workers: Vec<_> = (0..3)
        .map(|index| {
            let stop = Arc::clone(&stop);

            thread::Builder::new()
                .name(format!("worker-{index}"))
                .spawn(move || {
                    let mut counter = 0_u64;

                    while !stop.load(Ordering::Relaxed) {
                        // Busier workers get a larger share of processor time.
                        for _ in 0..(index + 1) * 1_000 {
                            counter = black_box(counter.wrapping_add(1));
                        }

                        thread::sleep(Duration::from_micros(100));
                    }
                })
                .expect("failed to spawn worker thread")
        })
        .collect();

    let recorder = Arc::new(StackRecorder::new());

    let timer = {
        let recorder = Arc::clone(&recorder);

        thread::Builder::new()
            .name("sampler".to_string())
            .spawn(move || {
                let mut collector = SamplingCollector::builder()
                    .build(SystemThreads::current(), TimingOnly, recorder)
                    .expect("default configuration is valid");

                let started = Instant::now();

                while started.elapsed() < RUN_TIME {
                    collector.sample();
                    thread::sleep(SAMPLING_INTERVAL);
                }

                collector.stats()
            })
            .expect("failed to spawn timer thread")
    };

    let stats = timer.join().expect("timer thread panicked");
    stop.store(true, Ordering::Relaxed);

    for worker in workers {
        worker.join().expect("worker thread panicked");
    }

    println!(
        "{} passes recorded {} samples ({} capture failures, {} record failures)",
        stats.passes, stats.samples_recorded, stats.capture_failures, stats.record_failures
    );

    let serialized = recorder.serialize().expect("profile serialization failed");
    let profile = Profile::decode(serialized.bytes.as_slice()).expect("invalid pprof output");

    for sample in &profile.samples {
        let id = profile.num_label(sample, THREAD_ID_LABEL).unwrap_or_default();
        let name = profile.str_label(sample, THREAD_NAME_LABEL).unwrap_or("?");

        println!(
            "thread {id:>8} {name:<16} cpu {:>6.1} ms  samples {:>4}  wall {:>7.1} ms",
            sample.values[0] as f64 / 1_000_000.0,
            sample.values[1],
            sample.values[2] as f64 / 1_000_000.0,
        );
    }
}
