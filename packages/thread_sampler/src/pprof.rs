//! Message types of the [pprof] profile interchange format.
//!
//! [`StackRecorder`][crate::StackRecorder] encodes profiles with these types. They are public
//! so consumers can decode a [`SerializedProfile`][crate::SerializedProfile] with
//! [`prost::Message::decode`]:
//!
//! ```
//! use prost::Message;
//! use thread_sampler::pprof::Profile;
//! use thread_sampler::{Recorder, StackRecorder};
//!
//! let recorder = StackRecorder::new();
//! let serialized = recorder.serialize().unwrap();
//!
//! let profile = Profile::decode(serialized.bytes.as_slice()).unwrap();
//! assert!(profile.samples.is_empty());
//! ```
//!
//! All `i64` fields documented as string indexes refer to entries of
//! [`Profile::string_table`], whose first entry is always the empty string.
//!
//! [pprof]: https://github.com/google/pprof/blob/main/proto/profile.proto

#![allow(
    missing_docs,
    reason = "field meanings are defined by the upstream profile.proto schema"
)]

#[derive(Clone, Eq, PartialEq, ::prost::Message)]
pub struct Profile {
    #[prost(message, repeated, tag = "1")]
    pub sample_types: Vec<ValueType>,
    #[prost(message, repeated, tag = "2")]
    pub samples: Vec<Sample>,
    #[prost(message, repeated, tag = "3")]
    pub mappings: Vec<Mapping>,
    #[prost(message, repeated, tag = "4")]
    pub locations: Vec<Location>,
    #[prost(message, repeated, tag = "5")]
    pub functions: Vec<Function>,
    #[prost(string, repeated, tag = "6")]
    pub string_table: Vec<String>,
    #[prost(int64, tag = "7")]
    pub drop_frames: i64,
    #[prost(int64, tag = "8")]
    pub keep_frames: i64,
    #[prost(int64, tag = "9")]
    pub time_nanos: i64,
    #[prost(int64, tag = "10")]
    pub duration_nanos: i64,
    #[prost(message, optional, tag = "11")]
    pub period_type: Option<ValueType>,
    #[prost(int64, tag = "12")]
    pub period: i64,
    #[prost(int64, repeated, tag = "13")]
    pub comment: Vec<i64>,
    #[prost(int64, tag = "14")]
    pub default_sample_type: i64,
}

#[derive(Clone, Eq, Hash, PartialEq, ::prost::Message)]
pub struct Sample {
    #[prost(uint64, repeated, tag = "1")]
    pub location_ids: Vec<u64>,
    #[prost(int64, repeated, tag = "2")]
    pub values: Vec<i64>,
    #[prost(message, repeated, tag = "3")]
    pub labels: Vec<Label>,
}

#[derive(Copy, Clone, Eq, Hash, PartialEq, ::prost::Message)]
pub struct ValueType {
    /// String index.
    #[prost(int64, tag = "1")]
    pub r#type: i64,
    /// String index.
    #[prost(int64, tag = "2")]
    pub unit: i64,
}

#[derive(Copy, Clone, Eq, Hash, PartialEq, ::prost::Message)]
pub struct Label {
    /// String index.
    #[prost(int64, tag = "1")]
    pub key: i64,
    /// String index, zero for numeric labels.
    #[prost(int64, tag = "2")]
    pub str: i64,
    #[prost(int64, tag = "3")]
    pub num: i64,
    /// String index.
    #[prost(int64, tag = "4")]
    pub num_unit: i64,
}

#[derive(Copy, Clone, Eq, Hash, PartialEq, ::prost::Message)]
pub struct Mapping {
    #[prost(uint64, tag = "1")]
    pub id: u64,
    #[prost(uint64, tag = "2")]
    pub memory_start: u64,
    #[prost(uint64, tag = "3")]
    pub memory_limit: u64,
    #[prost(uint64, tag = "4")]
    pub file_offset: u64,
    /// String index.
    #[prost(int64, tag = "5")]
    pub filename: i64,
    /// String index.
    #[prost(int64, tag = "6")]
    pub build_id: i64,
    #[prost(bool, tag = "7")]
    pub has_functions: bool,
    #[prost(bool, tag = "8")]
    pub has_filenames: bool,
    #[prost(bool, tag = "9")]
    pub has_line_numbers: bool,
    #[prost(bool, tag = "10")]
    pub has_inline_frames: bool,
}

#[derive(Clone, Eq, Hash, PartialEq, ::prost::Message)]
pub struct Location {
    #[prost(uint64, tag = "1")]
    pub id: u64,
    #[prost(uint64, tag = "2")]
    pub mapping_id: u64,
    #[prost(uint64, tag = "3")]
    pub address: u64,
    #[prost(message, repeated, tag = "4")]
    pub lines: Vec<Line>,
    #[prost(bool, tag = "5")]
    pub is_folded: bool,
}

#[derive(Copy, Clone, Eq, Hash, PartialEq, ::prost::Message)]
pub struct Line {
    #[prost(uint64, tag = "1")]
    pub function_id: u64,
    #[prost(int64, tag = "2")]
    pub line: i64,
}

#[derive(Copy, Clone, Eq, Hash, PartialEq, ::prost::Message)]
pub struct Function {
    #[prost(uint64, tag = "1")]
    pub id: u64,
    /// String index.
    #[prost(int64, tag = "2")]
    pub name: i64,
    /// String index.
    #[prost(int64, tag = "3")]
    pub system_name: i64,
    /// String index.
    #[prost(int64, tag = "4")]
    pub filename: i64,
    #[prost(int64, tag = "5")]
    pub start_line: i64,
}

impl Profile {
    /// Looks up an entry of the string table, returning an empty string for
    /// out-of-range indexes.
    #[must_use]
    pub fn string(&self, index: i64) -> &str {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.string_table.get(i))
            .map_or("", String::as_str)
    }

    /// The value of the label named `key` on `sample`, if it is a numeric label.
    #[must_use]
    pub fn num_label(&self, sample: &Sample, key: &str) -> Option<i64> {
        sample
            .labels
            .iter()
            .find(|label| self.string(label.key) == key && label.str == 0)
            .map(|label| label.num)
    }

    /// The value of the label named `key` on `sample`, if it is a string label.
    #[must_use]
    pub fn str_label(&self, sample: &Sample, key: &str) -> Option<&str> {
        sample
            .labels
            .iter()
            .find(|label| self.string(label.key) == key && label.str != 0)
            .map(|label| self.string(label.str))
    }
}
