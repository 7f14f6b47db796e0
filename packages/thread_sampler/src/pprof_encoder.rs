use std::sync::Arc;
use std::time::{Duration, SystemTime};

use foldhash::{HashMap, HashMapExt};

use crate::pprof::{Function, Label, Line, Location, Profile, Sample, ValueType};
use crate::{Frame, FrameSymbol, LabelValue, Labels, Stack};

/// Sample types in the order their values appear on every encoded sample.
pub(crate) const SAMPLE_TYPES: [(&str, &str); 3] = [
    ("cpu-time", "nanoseconds"),
    ("cpu-samples", "count"),
    ("wall-time", "nanoseconds"),
];

/// Summed values of all samples that share the same stack and labels.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub(crate) struct AggregatedValues {
    pub(crate) cpu_time_nanos: i64,
    pub(crate) cpu_samples: i64,
    pub(crate) wall_time_nanos: i64,
}

impl AggregatedValues {
    pub(crate) fn add(&mut self, cpu_time: Duration, wall_time: Duration) {
        self.cpu_time_nanos = self.cpu_time_nanos.saturating_add(duration_nanos(cpu_time));
        self.cpu_samples = self.cpu_samples.saturating_add(1);
        self.wall_time_nanos = self
            .wall_time_nanos
            .saturating_add(duration_nanos(wall_time));
    }
}

/// Builds a pprof [`Profile`], deduplicating strings, functions and locations.
#[derive(Debug)]
pub(crate) struct PprofEncoder {
    profile: Profile,
    strings: HashMap<Arc<str>, i64>,
    functions: HashMap<(i64, i64), u64>,
    locations: HashMap<Frame, u64>,
}

impl PprofEncoder {
    pub(crate) fn new(start: SystemTime, end: SystemTime) -> Self {
        let mut encoder = Self {
            profile: Profile::default(),
            strings: HashMap::new(),
            functions: HashMap::new(),
            locations: HashMap::new(),
        };

        // The string table must start with the empty string.
        encoder.intern("");

        for (kind, unit) in SAMPLE_TYPES {
            let value_type = ValueType {
                r#type: encoder.intern(kind),
                unit: encoder.intern(unit),
            };
            encoder.profile.sample_types.push(value_type);
        }

        encoder.profile.time_nanos = start
            .duration_since(SystemTime::UNIX_EPOCH)
            .map_or(0, duration_nanos);
        encoder.profile.duration_nanos = end.duration_since(start).map_or(0, duration_nanos);

        encoder
    }

    pub(crate) fn add_sample(&mut self, stack: &Stack, labels: &Labels, values: AggregatedValues) {
        let mut location_ids: Vec<u64> = stack
            .frames()
            .iter()
            .map(|frame| self.location(frame))
            .collect();

        if stack.is_truncated() {
            let omitted = Frame::symbol(format!("{} frames omitted", stack.truncated_frames()));
            location_ids.push(self.location(&omitted));
        }

        let labels = labels
            .iter()
            .map(|(key, value)| {
                let key = self.intern(key);
                match value {
                    LabelValue::Num(num) => Label {
                        key,
                        num: *num,
                        ..Label::default()
                    },
                    LabelValue::Str(text) => Label {
                        key,
                        str: self.intern(text),
                        ..Label::default()
                    },
                }
            })
            .collect();

        self.profile.samples.push(Sample {
            location_ids,
            values: vec![
                values.cpu_time_nanos,
                values.cpu_samples,
                values.wall_time_nanos,
            ],
            labels,
        });
    }

    pub(crate) fn finish(self) -> Profile {
        self.profile
    }

    fn intern(&mut self, value: &str) -> i64 {
        if let Some(index) = self.strings.get(value) {
            return *index;
        }

        let index = next_index(self.profile.string_table.len());
        self.profile.string_table.push(value.to_owned());
        self.strings.insert(value.into(), index);
        index
    }

    fn location(&mut self, frame: &Frame) -> u64 {
        if let Some(id) = self.locations.get(frame) {
            return *id;
        }

        // pprof IDs are 1-based, zero means "none".
        let id = next_id(self.profile.locations.len());

        let location = match frame.frame_symbol() {
            FrameSymbol::InstructionPointer(address) => Location {
                id,
                address: *address,
                ..Location::default()
            },
            FrameSymbol::Name(name) => {
                let (filename, line) = frame
                    .location()
                    .map_or(("", 0), |l| (l.file(), i64::from(l.line())));

                let function_id = self.function(name, filename);

                Location {
                    id,
                    lines: vec![Line { function_id, line }],
                    ..Location::default()
                }
            }
        };

        self.profile.locations.push(location);
        self.locations.insert(frame.clone(), id);
        id
    }

    fn function(&mut self, name: &str, filename: &str) -> u64 {
        let name = self.intern(name);
        let filename = self.intern(filename);

        if let Some(id) = self.functions.get(&(name, filename)) {
            return *id;
        }

        let id = next_id(self.profile.functions.len());
        self.profile.functions.push(Function {
            id,
            name,
            system_name: name,
            filename,
            start_line: 0,
        });
        self.functions.insert((name, filename), id);
        id
    }
}

fn next_id(len: usize) -> u64 {
    u64::try_from(len).map_or(u64::MAX, |len| len.saturating_add(1))
}

fn next_index(len: usize) -> i64 {
    i64::try_from(len).unwrap_or(i64::MAX)
}

/// Converts a duration to nanoseconds, saturating at `i64::MAX` (about 292 years).
pub(crate) fn duration_nanos(duration: Duration) -> i64 {
    i64::try_from(duration.as_nanos()).unwrap_or(i64::MAX)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::SourceLocation;

    fn encode(stack: &Stack) -> Profile {
        let start = SystemTime::UNIX_EPOCH + Duration::from_secs(100);
        let mut encoder = PprofEncoder::new(start, start + Duration::from_secs(60));
        encoder.add_sample(stack, &Labels::new(), AggregatedValues::default());
        encoder.finish()
    }

    #[test]
    fn header_describes_sample_types_and_window() {
        let profile = encode(&Stack::empty());

        assert_eq!(profile.string(0), "");
        assert_eq!(profile.sample_types.len(), 3);
        assert_eq!(profile.string(profile.sample_types[0].r#type), "cpu-time");
        assert_eq!(profile.string(profile.sample_types[1].unit), "count");
        assert_eq!(profile.string(profile.sample_types[2].r#type), "wall-time");
        assert_eq!(profile.time_nanos, 100_000_000_000);
        assert_eq!(profile.duration_nanos, 60_000_000_000);
    }

    #[test]
    fn identical_frames_share_locations_and_functions() {
        let frame = Frame::symbol("poll").with_location(SourceLocation::new("lib.rs", 3));
        let stack = Stack::new(vec![frame.clone(), Frame::address(0x10), frame]);

        let profile = encode(&stack);

        assert_eq!(profile.locations.len(), 2);
        assert_eq!(profile.functions.len(), 1);
        assert_eq!(profile.samples[0].location_ids, vec![1, 2, 1]);
        assert_eq!(profile.locations[1].address, 0x10);
        assert_eq!(profile.locations[0].lines[0].line, 3);
        assert_eq!(profile.string(profile.functions[0].filename), "lib.rs");
    }

    #[test]
    fn truncation_adds_synthetic_outermost_frame() {
        let stack = Stack::truncated(vec![Frame::symbol("leaf")], 7);

        let profile = encode(&stack);

        let outermost = profile.samples[0]
            .location_ids
            .last()
            .copied()
            .expect("sample has locations");
        let location = profile
            .locations
            .iter()
            .find(|l| l.id == outermost)
            .expect("location is defined");
        let function = profile
            .functions
            .iter()
            .find(|f| f.id == location.lines[0].function_id)
            .expect("function is defined");

        assert_eq!(profile.string(function.name), "7 frames omitted");
    }

    #[test]
    fn aggregated_values_saturate() {
        let mut values = AggregatedValues {
            cpu_time_nanos: i64::MAX,
            ..AggregatedValues::default()
        };

        values.add(Duration::from_secs(1), Duration::from_millis(1));

        assert_eq!(values.cpu_time_nanos, i64::MAX);
        assert_eq!(values.cpu_samples, 1);
        assert_eq!(values.wall_time_nanos, 1_000_000);
    }
}
