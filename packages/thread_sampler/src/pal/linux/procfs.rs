//! Parsers for the per-thread files under `/proc/<pid>/task/<tid>/`.

use std::time::Duration;

/// The fields of a `stat` file that the sampler uses.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct TaskStat {
    pub(crate) utime_ticks: u64,
    pub(crate) stime_ticks: u64,
    pub(crate) start_ticks: u64,
}

// Field numbers from proc(5), counted from 1. Field 3 is the first one after the
// parenthesized command name.
const FIRST_FIELD_AFTER_COMM: usize = 3;
const UTIME_FIELD: usize = 14;
const STIME_FIELD: usize = 15;
const STARTTIME_FIELD: usize = 22;

/// Parses the contents of a `stat` file.
///
/// The command name may itself contain spaces and parentheses, so fields are counted from
/// the last closing parenthesis.
pub(crate) fn parse_stat(contents: &str) -> Option<TaskStat> {
    let (_, after_comm) = contents.rsplit_once(')')?;
    let fields: Vec<&str> = after_comm.split_whitespace().collect();

    let field = |number: usize| -> Option<u64> {
        fields
            .get(number.checked_sub(FIRST_FIELD_AFTER_COMM)?)?
            .parse()
            .ok()
    };

    Some(TaskStat {
        utime_ticks: field(UTIME_FIELD)?,
        stime_ticks: field(STIME_FIELD)?,
        start_ticks: field(STARTTIME_FIELD)?,
    })
}

/// Parses the contents of a `schedstat` file, returning the time spent on a processor
/// in nanoseconds.
pub(crate) fn parse_schedstat(contents: &str) -> Option<u64> {
    contents.split_whitespace().next()?.parse().ok()
}

/// Converts a number of clock ticks to a duration.
pub(crate) fn ticks_to_duration(ticks: u64, ticks_per_second: u64) -> Duration {
    let nanos_per_tick = 1_000_000_000_u64
        .checked_div(ticks_per_second)
        .unwrap_or(0);

    Duration::from_nanos(ticks.saturating_mul(nanos_per_tick))
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    const STAT: &str = "4242 (tokio-runtime-w) S 4200 4200 4100 34816 4200 4194368 \
                        120 0 0 0 17 5 0 0 20 0 12 0 987654 123456789 2048 \
                        18446744073709551615 1 1 0 0 0 0 0 4096 17642 0 0 0 -1 3 0 0 0 0 0\n";

    #[test]
    fn parses_stat_fields() {
        let stat = parse_stat(STAT).unwrap();

        assert_eq!(stat.utime_ticks, 17);
        assert_eq!(stat.stime_ticks, 5);
        assert_eq!(stat.start_ticks, 987_654);
    }

    #[test]
    fn parses_stat_with_parentheses_in_name() {
        let contents = STAT.replace("(tokio-runtime-w)", "(weird) name (x))");
        let stat = parse_stat(&contents).unwrap();

        assert_eq!(stat.start_ticks, 987_654);
    }

    #[test]
    fn truncated_stat_is_rejected() {
        assert_eq!(parse_stat("4242 (main) S 1 2 3"), None);
        assert_eq!(parse_stat("garbage"), None);
    }

    #[test]
    fn parses_schedstat() {
        assert_eq!(parse_schedstat("123456789 2000 15\n"), Some(123_456_789));
        assert_eq!(parse_schedstat(""), None);
    }

    #[test]
    fn converts_ticks() {
        assert_eq!(ticks_to_duration(250, 100), Duration::from_millis(2_500));
        assert_eq!(ticks_to_duration(250, 0), Duration::ZERO);
    }
}
