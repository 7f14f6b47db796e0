use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::{Stack, ThreadIdentity};

/// Label carrying the native ID of the sampled thread. Present on every sample.
pub const THREAD_ID_LABEL: &str = "thread id";

/// Label carrying the name of the sampled thread. Present when the platform reports one.
pub const THREAD_NAME_LABEL: &str = "thread name";

/// Labels attached to a [`Sample`], keyed by label name.
pub type Labels = BTreeMap<&'static str, LabelValue>;

/// The value of one sample label.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[non_exhaustive]
pub enum LabelValue {
    /// A numeric label value.
    Num(i64),

    /// A textual label value.
    Str(Arc<str>),
}

impl fmt::Display for LabelValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Num(n) => write!(f, "{n}"),
            Self::Str(s) => write!(f, "{s}"),
        }
    }
}

/// Time attributed to the stack of a [`Sample`].
///
/// Both values cover the interval since the previous sample of the same thread and are
/// never negative: a clock that went backwards yields a zero value.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub struct SampleValues {
    /// Processor time the thread consumed. Zero if the platform cannot report it.
    pub cpu_time: Duration,

    /// Elapsed wall clock time.
    pub wall_time: Duration,
}

impl SampleValues {
    /// Creates sample values from processor time and wall clock time.
    #[must_use]
    pub const fn new(cpu_time: Duration, wall_time: Duration) -> Self {
        Self {
            cpu_time,
            wall_time,
        }
    }
}

/// One thread's captured stack plus timing values for one sampling pass.
///
/// Samples are immutable once created. The collector hands each sample to the
/// [`Recorder`][crate::Recorder] by value as soon as it is built.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Sample {
    stack: Stack,
    labels: Labels,
    values: SampleValues,
}

impl Sample {
    /// Creates a sample for `thread`, labelling it with the thread's identity and,
    /// if known, its name.
    #[must_use]
    pub fn for_thread(
        thread: ThreadIdentity,
        thread_name: Option<Arc<str>>,
        stack: Stack,
        values: SampleValues,
    ) -> Self {
        let mut labels = Labels::new();

        labels.insert(
            THREAD_ID_LABEL,
            // Native thread IDs are far below i64::MAX on every supported platform.
            LabelValue::Num(i64::try_from(thread.native_id()).unwrap_or(i64::MAX)),
        );

        if let Some(name) = thread_name {
            labels.insert(THREAD_NAME_LABEL, LabelValue::Str(name));
        }

        Self::new(stack, labels, values)
    }

    /// Creates a sample from its parts.
    #[must_use]
    pub const fn new(stack: Stack, labels: Labels, values: SampleValues) -> Self {
        Self {
            stack,
            labels,
            values,
        }
    }

    /// The captured stack.
    #[must_use]
    pub const fn stack(&self) -> &Stack {
        &self.stack
    }

    /// The labels describing the sampled thread.
    #[must_use]
    pub const fn labels(&self) -> &Labels {
        &self.labels
    }

    /// The time attributed to the stack.
    #[must_use]
    pub const fn values(&self) -> SampleValues {
        self.values
    }

    /// The native thread ID from the `thread id` label.
    #[must_use]
    pub fn thread_native_id(&self) -> Option<i64> {
        match self.labels.get(THREAD_ID_LABEL) {
            Some(LabelValue::Num(id)) => Some(*id),
            _ => None,
        }
    }

    pub(crate) fn into_parts(self) -> (Stack, Labels, SampleValues) {
        (self.stack, self.labels, self.values)
    }
}
