use chrono::NaiveDateTime;

use super::model::{ChannelSeries, Flag};

// ---------------------------------------------------------------------------
// Segment – a contiguous run of one flag value
// ---------------------------------------------------------------------------

/// A run of samples carrying the same flag, in index and time coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub start_index: usize,
    pub stop_index: usize,
    pub start_time: NaiveDateTime,
    pub stop_time: NaiveDateTime,
}

/// Per-sample indicator for a single flag value.
pub fn indicator_for(flags: &[Flag], wanted: Flag) -> Vec<bool> {
    flags.iter().map(|f| *f == wanted).collect()
}

/// Find maximal runs of `true` as `(start, stop)` index pairs.
///
/// `stop` is the first index after the run, except for a run that reaches
/// the end of the slice: its `stop` is the last index itself.
/// `[F,F,T,T,T,F,T,F,F]` gives `[(2,5),(6,7)]`, `[F,T,T]` gives `[(1,2)]`.
pub fn find_segments(indicator: &[bool]) -> Vec<(usize, usize)> {
    let Some(&first) = indicator.first() else {
        return Vec::new();
    };

    let mut starts = Vec::new();
    let mut stops = Vec::new();
    if first {
        starts.push(0);
    }
    for (i, pair) in indicator.windows(2).enumerate() {
        match (pair[0], pair[1]) {
            (false, true) => starts.push(i + 1),
            (true, false) => stops.push(i + 1),
            _ => {}
        }
    }
    if indicator[indicator.len() - 1] {
        stops.push(indicator.len() - 1);
    }

    debug_assert_eq!(starts.len(), stops.len());
    starts.into_iter().zip(stops).collect()
}

/// Runs of `wanted` in the series' flag column, mapped to timestamps.
pub fn flag_segments(series: &ChannelSeries, wanted: Flag) -> Vec<Segment> {
    find_segments(&indicator_for(&series.flag, wanted))
        .into_iter()
        .map(|(start, stop)| Segment {
            start_index: start,
            stop_index: stop,
            start_time: series.time[start],
            stop_time: series.time[stop],
        })
        .collect()
}
