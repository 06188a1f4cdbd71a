use std::fmt;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

// ---------------------------------------------------------------------------
// Flag – per-sample event label
// ---------------------------------------------------------------------------

/// Event label carried by every sample of a [`ChannelSeries`].
///
/// Stored as a typed column, so a sample can only ever hold one of the
/// three codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
#[repr(u8)]
pub enum Flag {
    #[default]
    None = 0,
    Rain = 1,
    Failure = 2,
}

impl Flag {
    /// Integer code used in exported tables (0, 1 or 2).
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn is_set(self) -> bool {
        self != Flag::None
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Flag::None => write!(f, "none"),
            Flag::Rain => write!(f, "rain"),
            Flag::Failure => write!(f, "failure"),
        }
    }
}

// ---------------------------------------------------------------------------
// EventRecord – one row of the event log
// ---------------------------------------------------------------------------

/// Category of a logged event. Only rain and failure stamp flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    Rain,
    Failure,
    Other(String),
}

impl EventKind {
    /// Case-sensitive match on the `EVENT` column.
    pub fn parse(s: &str) -> Self {
        match s {
            "rain" => EventKind::Rain,
            "failure" => EventKind::Failure,
            other => EventKind::Other(other.to_string()),
        }
    }

    /// The flag this event stamps, if any.
    pub fn flag(&self) -> Option<Flag> {
        match self {
            EventKind::Rain => Some(Flag::Rain),
            EventKind::Failure => Some(Flag::Failure),
            EventKind::Other(_) => None,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Rain => write!(f, "rain"),
            EventKind::Failure => write!(f, "failure"),
            EventKind::Other(s) => write!(f, "{s}"),
        }
    }
}

/// A real-world event covering the half-open interval
/// `[date + time_start, date + time_stop)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    pub date: NaiveDate,
    /// Offset from midnight; may exceed one day.
    pub time_start: Duration,
    pub time_stop: Duration,
    pub kind: EventKind,
}

impl EventRecord {
    pub fn start(&self) -> NaiveDateTime {
        self.at_offset(self.time_start)
    }

    pub fn stop(&self) -> NaiveDateTime {
        self.at_offset(self.time_stop)
    }

    /// Saturates at the ends of the calendar. The loader rejects such offsets.
    fn at_offset(&self, offset: Duration) -> NaiveDateTime {
        let midnight = self.date.and_time(NaiveTime::MIN);
        midnight.checked_add_signed(offset).unwrap_or(if offset < Duration::zero() {
            NaiveDateTime::MIN
        } else {
            NaiveDateTime::MAX
        })
    }
}

// ---------------------------------------------------------------------------
// ChannelSeries – one receiver channel
// ---------------------------------------------------------------------------

/// Time-indexed (signal, noise, flag) columns of a single channel.
///
/// `time` is strictly increasing; all columns have the same length.
/// Missing measurements are `NaN`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelSeries {
    /// 1-based channel number as used in file names (`<name>_ch<n>`).
    pub channel: u8,
    pub time: Vec<NaiveDateTime>,
    /// Received beacon power [dB].
    pub signal: Vec<f64>,
    /// Noise power [dB].
    pub noise: Vec<f64>,
    pub flag: Vec<Flag>,
}

impl ChannelSeries {
    /// Build a series with every flag cleared.
    pub fn new(channel: u8, time: Vec<NaiveDateTime>, signal: Vec<f64>, noise: Vec<f64>) -> Self {
        debug_assert_eq!(time.len(), signal.len());
        debug_assert_eq!(time.len(), noise.len());
        let flag = vec![Flag::None; time.len()];
        ChannelSeries {
            channel,
            time,
            signal,
            noise,
            flag,
        }
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Index range of samples with `start <= t < stop`.
    ///
    /// Empty when `stop <= start` or the window misses the series.
    pub fn index_range(&self, start: NaiveDateTime, stop: NaiveDateTime) -> std::ops::Range<usize> {
        let lo = self.time.partition_point(|t| *t < start);
        let hi = self.time.partition_point(|t| *t < stop);
        lo..hi.max(lo)
    }

    /// Copy of the samples inside `[start, stop)`, flags included.
    pub fn crop(&self, start: NaiveDateTime, stop: NaiveDateTime) -> ChannelSeries {
        let r = self.index_range(start, stop);
        ChannelSeries {
            channel: self.channel,
            time: self.time[r.clone()].to_vec(),
            signal: self.signal[r.clone()].to_vec(),
            noise: self.noise[r.clone()].to_vec(),
            flag: self.flag[r].to_vec(),
        }
    }

    /// Calendar days covered by the series, in order, without repeats.
    pub fn days(&self) -> Vec<NaiveDate> {
        let mut days: Vec<NaiveDate> = self.time.iter().map(|t| t.date()).collect();
        days.dedup();
        days
    }
}

// ---------------------------------------------------------------------------
// BeaconDataset – all channels of one named acquisition
// ---------------------------------------------------------------------------

/// A named dataset (e.g. one month of Alphasat data) with one series per
/// channel, in channel order.
#[derive(Debug, Clone, Default)]
pub struct BeaconDataset {
    pub name: String,
    pub channels: Vec<ChannelSeries>,
}

impl BeaconDataset {
    pub fn new(name: impl Into<String>, channels: Vec<ChannelSeries>) -> Self {
        BeaconDataset {
            name: name.into(),
            channels,
        }
    }

    /// Number of channels.
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Total number of samples across all channels.
    pub fn sample_count(&self) -> usize {
        self.channels.iter().map(ChannelSeries::len).sum()
    }

    /// First and last timestamp over all channels.
    pub fn time_span(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        let first = self.channels.iter().filter_map(|c| c.time.first()).min()?;
        let last = self.channels.iter().filter_map(|c| c.time.last()).max()?;
        Some((*first, *last))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 5, 17)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn minutes(n: u32) -> ChannelSeries {
        let time = (0..n).map(|i| at(10, 0) + Duration::minutes(i as i64)).collect();
        ChannelSeries::new(1, time, vec![0.0; n as usize], vec![0.0; n as usize])
    }

    #[test]
    fn index_range_is_half_open() {
        let s = minutes(10);
        assert_eq!(s.index_range(at(10, 2), at(10, 5)), 2..5);
        assert_eq!(s.index_range(at(9, 0), at(10, 1)), 0..1);
        assert_eq!(s.index_range(at(11, 0), at(12, 0)), 10..10);
    }

    #[test]
    fn inverted_window_is_empty() {
        let s = minutes(10);
        assert!(s.index_range(at(10, 5), at(10, 2)).is_empty());
    }

    #[test]
    fn crop_keeps_columns_aligned() {
        let mut s = minutes(10);
        s.flag[3] = Flag::Rain;
        let c = s.crop(at(10, 3), at(10, 6));
        assert_eq!(c.len(), 3);
        assert_eq!(c.flag, vec![Flag::Rain, Flag::None, Flag::None]);
        assert_eq!(c.time[0], at(10, 3));
    }

    #[test]
    fn out_of_range_event_saturates() {
        let ev = EventRecord {
            date: NaiveDate::from_ymd_opt(2019, 7, 3).unwrap(),
            time_start: Duration::days(200_000_000),
            time_stop: Duration::days(-200_000_000),
            kind: EventKind::Rain,
        };
        assert_eq!(ev.start(), NaiveDateTime::MAX);
        assert_eq!(ev.stop(), NaiveDateTime::MIN);
    }

    #[test]
    fn event_kind_is_case_sensitive() {
        assert_eq!(EventKind::parse("rain"), EventKind::Rain);
        assert_eq!(EventKind::parse("Rain"), EventKind::Other("Rain".into()));
        assert_eq!(EventKind::parse("failure").flag(), Some(Flag::Failure));
    }
}
