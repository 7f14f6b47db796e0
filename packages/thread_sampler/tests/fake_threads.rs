//! Integration tests for `thread_sampler` driven by the fake thread registry, checking the
//! profiles a collector produces end to end.

use std::sync::Arc;
use std::time::Duration;

use prost::Message;
use thread_sampler::fake::FakeThreads;
use thread_sampler::pprof::Profile;
use thread_sampler::{
    Frame, Recorder, SamplingCollector, SourceLocation, StackRecorder, SystemThreads,
    THREAD_ID_LABEL,
};

fn decode(recorder: &StackRecorder) -> Profile {
    Profile::decode(recorder.serialize().unwrap().bytes.as_slice()).unwrap()
}

fn function_names(profile: &Profile, sample: &thread_sampler::pprof::Sample) -> Vec<String> {
    sample
        .location_ids
        .iter()
        .map(|id| {
            let location = profile.locations.iter().find(|l| l.id == *id).unwrap();

            match location.lines.first() {
                Some(line) => {
                    let function = profile
                        .functions
                        .iter()
                        .find(|f| f.id == line.function_id)
                        .unwrap();
                    profile.string(function.name).to_string()
                }
                None => format!("{:#x}", location.address),
            }
        })
        .collect()
}

#[test]
fn profile_attributes_time_to_stacks() {
    let fake = FakeThreads::new();
    let main = fake.main_thread();
    let worker = fake.spawn_named("worker");

    fake.set_stack(
        worker,
        vec![
            Frame::symbol("parse").with_location(SourceLocation::new("parser.rs", 42)),
            Frame::symbol("handle_request"),
            Frame::address(0x1000),
        ],
    );

    let recorder = Arc::new(StackRecorder::new());
    let mut collector = SamplingCollector::builder()
        .build(
            SystemThreads::fake(&fake),
            fake.clone(),
            Arc::clone(&recorder),
        )
        .unwrap();

    collector.sample();

    for _ in 0..4 {
        fake.advance(Duration::from_millis(10));
        fake.add_cpu_time(worker, Duration::from_millis(6));
        collector.sample();
    }

    let profile = decode(&recorder);

    let sample_types: Vec<(&str, &str)> = profile
        .sample_types
        .iter()
        .map(|t| (profile.string(t.r#type), profile.string(t.unit)))
        .collect();
    assert_eq!(
        sample_types,
        vec![
            ("cpu-time", "nanoseconds"),
            ("cpu-samples", "count"),
            ("wall-time", "nanoseconds"),
        ]
    );

    assert_eq!(profile.samples.len(), 2);

    let worker_id = i64::try_from(worker.native_id()).unwrap();
    let worker_sample = profile
        .samples
        .iter()
        .find(|s| profile.num_label(s, THREAD_ID_LABEL) == Some(worker_id))
        .unwrap();

    assert_eq!(worker_sample.values, vec![24_000_000, 5, 40_000_000]);
    assert_eq!(
        function_names(&profile, worker_sample),
        vec!["parse", "handle_request", "0x1000"]
    );

    let main_id = i64::try_from(main.native_id()).unwrap();
    let main_sample = profile
        .samples
        .iter()
        .find(|s| profile.num_label(s, THREAD_ID_LABEL) == Some(main_id))
        .unwrap();

    assert!(main_sample.location_ids.is_empty());
    assert_eq!(main_sample.values, vec![0, 5, 40_000_000]);
}

#[test]
fn truncated_stacks_end_with_omitted_frames_marker() {
    let fake = FakeThreads::new();
    let main = fake.main_thread();
    fake.set_stack(
        main,
        (0..10).map(|i| Frame::symbol(format!("f{i}"))).collect(),
    );

    let recorder = Arc::new(StackRecorder::new());
    let mut collector = SamplingCollector::builder()
        .max_frames(4)
        .build(
            SystemThreads::fake(&fake),
            fake.clone(),
            Arc::clone(&recorder),
        )
        .unwrap();

    collector.sample();

    let profile = decode(&recorder);
    assert_eq!(profile.samples.len(), 1);

    assert_eq!(
        function_names(&profile, &profile.samples[0]),
        vec!["f0", "f1", "f2", "f3", "6 frames omitted"]
    );
}

#[test]
fn recorder_capacity_limits_are_counted_not_fatal() {
    let fake = FakeThreads::new();
    for _ in 0..4 {
        _ = fake.spawn();
    }

    let recorder = Arc::new(StackRecorder::with_max_unique_samples(
        new_zealand::nz!(2),
    ));
    let mut collector = SamplingCollector::builder()
        .build(
            SystemThreads::fake(&fake),
            fake.clone(),
            Arc::clone(&recorder),
        )
        .unwrap();

    let summary = collector.sample();

    assert_eq!(summary.threads, 5);
    assert_eq!(summary.samples_recorded, 2);
    assert_eq!(summary.record_failures, 3);
    assert_eq!(collector.thread_contexts().len(), 5);

    // Serializing frees room for the next profile.
    assert_eq!(decode(&recorder).samples.len(), 2);
    assert_eq!(collector.sample().samples_recorded, 2);
}
