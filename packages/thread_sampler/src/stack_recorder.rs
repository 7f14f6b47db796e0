use std::mem;
use std::num::NonZero;
use std::sync::Mutex;
use std::time::SystemTime;

use foldhash::{HashMap, HashMapExt};
use new_zealand::nz;
use prost::Message;

use crate::pprof_encoder::{AggregatedValues, PprofEncoder};
use crate::{
    ERR_POISONED_LOCK, Labels, RecordError, Recorder, Sample, SerializeError, SerializedProfile,
    Stack,
};

/// Default bound on the number of distinct stack and label combinations kept between
/// serializations.
pub const DEFAULT_MAX_UNIQUE_SAMPLES: NonZero<usize> = nz!(65_536);

/// A [`Recorder`] that aggregates samples in memory and serializes them as a
/// [pprof][crate::pprof] profile.
///
/// Samples with identical stacks and labels are merged by summing their values, so memory
/// use grows with the number of distinct stacks rather than with the number of samples.
/// Every serialization returns the profile accumulated since the previous one and starts
/// a new profile.
///
/// Recording and serialization may be called concurrently from different threads.
///
/// # Example
///
/// ```
/// use prost::Message;
/// use thread_sampler::pprof::Profile;
/// use thread_sampler::{Recorder, StackRecorder};
///
/// let recorder = StackRecorder::new();
///
/// // ... a sampling collector records samples here ...
///
/// let serialized = recorder.serialize().unwrap();
/// let profile = Profile::decode(serialized.bytes.as_slice()).unwrap();
///
/// println!(
///     "profile from {:?} to {:?} has {} samples",
///     serialized.start,
///     serialized.end,
///     profile.samples.len()
/// );
/// ```
#[derive(Debug)]
pub struct StackRecorder {
    max_unique_samples: NonZero<usize>,
    state: Mutex<ProfileState>,
}

#[derive(Debug)]
struct ProfileState {
    start: SystemTime,
    samples: HashMap<SampleKey, AggregatedValues>,
}

#[derive(Debug, Eq, Hash, PartialEq)]
struct SampleKey {
    stack: Stack,
    labels: Labels,
}

impl StackRecorder {
    /// Creates a recorder holding up to [`DEFAULT_MAX_UNIQUE_SAMPLES`] distinct samples.
    #[must_use]
    #[expect(
        clippy::new_without_default,
        reason = "creating a recorder starts its profile clock, which is not a default value"
    )]
    pub fn new() -> Self {
        Self::with_max_unique_samples(DEFAULT_MAX_UNIQUE_SAMPLES)
    }

    /// Creates a recorder holding up to `max_unique_samples` distinct samples.
    ///
    /// Once the bound is reached, samples with a new combination of stack and labels are
    /// rejected until the next serialization. Samples matching an existing combination are
    /// still accepted.
    #[must_use]
    pub fn with_max_unique_samples(max_unique_samples: NonZero<usize>) -> Self {
        Self {
            max_unique_samples,
            state: Mutex::new(ProfileState {
                start: SystemTime::now(),
                samples: HashMap::new(),
            }),
        }
    }

    /// Number of distinct stack and label combinations recorded since the last serialization.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().expect(ERR_POISONED_LOCK).samples.len()
    }

    /// Whether nothing has been recorded since the last serialization.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn serialize_at(&self, end: SystemTime) -> Result<SerializedProfile, SerializeError> {
        let (start, samples) = {
            let mut state = self.state.lock().expect(ERR_POISONED_LOCK);

            if end < state.start {
                return Err(SerializeError::InvalidTimeRange {
                    start: state.start,
                    end,
                });
            }

            let start = mem::replace(&mut state.start, end);
            (start, mem::take(&mut state.samples))
        };

        // Encoding happens outside the lock so recording can continue meanwhile.
        let mut encoder = PprofEncoder::new(start, end);

        for (key, values) in &samples {
            encoder.add_sample(&key.stack, &key.labels, *values);
        }

        Ok(SerializedProfile::new(
            start,
            end,
            encoder.finish().encode_to_vec(),
        ))
    }
}

impl Recorder for StackRecorder {
    fn record(&self, sample: Sample) -> Result<(), RecordError> {
        let (stack, labels, values) = sample.into_parts();
        let key = SampleKey { stack, labels };

        let mut state = self.state.lock().expect(ERR_POISONED_LOCK);

        if let Some(existing) = state.samples.get_mut(&key) {
            existing.add(values.cpu_time, values.wall_time);
            return Ok(());
        }

        if state.samples.len() >= self.max_unique_samples.get() {
            return Err(RecordError::CapacityExceeded {
                capacity: self.max_unique_samples.get(),
            });
        }

        state
            .samples
            .entry(key)
            .or_default()
            .add(values.cpu_time, values.wall_time);

        Ok(())
    }

    #[cfg_attr(test, mutants::skip)] // Depends on the real system clock, covered via serialize_at().
    fn serialize(&self) -> Result<SerializedProfile, SerializeError> {
        self.serialize_at(SystemTime::now())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use static_assertions::assert_impl_all;

    use super::*;
    use crate::pprof::Profile;
    use crate::{Frame, SampleValues, THREAD_ID_LABEL, ThreadIdentity};

    assert_impl_all!(StackRecorder: Send, Sync);

    fn sample(thread: u64, function: &str, wall_millis: u64) -> Sample {
        Sample::for_thread(
            ThreadIdentity::new(thread, 0),
            None,
            Stack::new(vec![Frame::symbol(function)]),
            SampleValues::new(Duration::from_millis(1), Duration::from_millis(wall_millis)),
        )
    }

    fn decode(serialized: &SerializedProfile) -> Profile {
        Profile::decode(serialized.bytes.as_slice()).expect("recorder emits valid pprof")
    }

    #[test]
    fn identical_samples_are_aggregated() {
        let recorder = StackRecorder::new();

        recorder.record(sample(1, "work", 10)).unwrap();
        recorder.record(sample(1, "work", 15)).unwrap();
        recorder.record(sample(2, "work", 5)).unwrap();

        assert_eq!(recorder.len(), 2);

        let profile = decode(&recorder.serialize().unwrap());
        assert_eq!(profile.samples.len(), 2);

        let thread_1 = profile
            .samples
            .iter()
            .find(|s| profile.num_label(s, THREAD_ID_LABEL) == Some(1))
            .expect("thread 1 was sampled");

        assert_eq!(thread_1.values, vec![2_000_000, 2, 25_000_000]);
    }

    #[test]
    fn capacity_rejects_only_new_combinations() {
        let recorder = StackRecorder::with_max_unique_samples(nz!(1));

        recorder.record(sample(1, "work", 1)).unwrap();

        let error = recorder.record(sample(2, "work", 1)).unwrap_err();
        assert!(matches!(
            error,
            RecordError::CapacityExceeded { capacity: 1 }
        ));

        // Existing combinations still aggregate.
        recorder.record(sample(1, "work", 1)).unwrap();
        assert_eq!(recorder.len(), 1);
    }

    #[test]
    fn serialize_starts_a_new_profile() {
        let recorder = StackRecorder::new();
        recorder.record(sample(1, "work", 1)).unwrap();

        let first = recorder.serialize().unwrap();
        assert!(recorder.is_empty());

        let second = recorder.serialize().unwrap();

        assert_eq!(second.start, first.end);
        assert_eq!(decode(&first).samples.len(), 1);
        assert!(decode(&second).samples.is_empty());
    }

    #[test]
    fn serialize_before_start_is_rejected_and_keeps_data() {
        let recorder = StackRecorder::new();
        recorder.record(sample(1, "work", 1)).unwrap();

        let result = recorder.serialize_at(SystemTime::UNIX_EPOCH);

        assert!(matches!(
            result,
            Err(SerializeError::InvalidTimeRange { .. })
        ));
        assert_eq!(recorder.len(), 1);
    }

    #[test]
    fn concurrent_record_and_serialize() {
        let recorder = Arc::new(StackRecorder::new());

        let writers: Vec<_> = (0..4_u64)
            .map(|thread| {
                let recorder = Arc::clone(&recorder);
                thread::spawn(move || {
                    for _ in 0..100 {
                        recorder.record(sample(thread, "work", 1)).unwrap();
                    }
                })
            })
            .collect();

        let mut total_samples = 0;
        for _ in 0..10 {
            total_samples += sum_sample_counts(&decode(&recorder.serialize().unwrap()));
        }

        for writer in writers {
            writer.join().unwrap();
        }

        total_samples += sum_sample_counts(&decode(&recorder.serialize().unwrap()));

        assert_eq!(total_samples, 400);
    }

    fn sum_sample_counts(profile: &Profile) -> i64 {
        profile.samples.iter().map(|s| s.values[1]).sum()
    }
}
