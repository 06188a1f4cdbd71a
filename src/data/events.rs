use std::collections::BTreeSet;

use chrono::NaiveDate;

use super::model::{BeaconDataset, ChannelSeries, EventRecord, Flag};

// ---------------------------------------------------------------------------
// Event annotation
// ---------------------------------------------------------------------------

/// Stamp the flag column of `series` from the event log.
///
/// Flags are reset to [`Flag::None`] first, then each event overwrites the
/// samples in `[start, stop)` in input order, so the last overlapping event
/// wins. Events of other kinds are skipped. Returns the number of samples
/// stamped (a sample touched twice counts twice).
pub fn annotate(series: &mut ChannelSeries, events: &[EventRecord]) -> usize {
    series.flag.clear();
    series.flag.resize(series.len(), Flag::None);

    let mut stamped = 0;
    for (i, event) in events.iter().enumerate() {
        let Some(flag) = event.kind.flag() else {
            log::trace!("ch{}: event {i} ({}) ignored", series.channel, event.kind);
            continue;
        };
        let range = series.index_range(event.start(), event.stop());
        if range.is_empty() {
            continue;
        }
        log::debug!(
            "ch{}: event {i} {} {}..{} -> {} samples",
            series.channel,
            flag,
            event.start(),
            event.stop(),
            range.len()
        );
        stamped += range.len();
        series.flag[range].fill(flag);
    }
    stamped
}

/// Apply the same event log to every channel of the dataset.
pub fn annotate_dataset(dataset: &mut BeaconDataset, events: &[EventRecord]) {
    for series in &mut dataset.channels {
        let stamped = annotate(series, events);
        log::info!(
            "{} ch{}: {stamped} samples flagged by {} events",
            dataset.name,
            series.channel,
            events.len()
        );
    }
}

/// Calendar days touched by rain or failure events, sorted.
pub fn event_days(events: &[EventRecord]) -> Vec<NaiveDate> {
    let mut days = BTreeSet::new();
    for event in events.iter().filter(|e| e.kind.flag().is_some()) {
        let (start, stop) = (event.start(), event.stop());
        if stop <= start {
            continue;
        }
        let last = (stop - chrono::Duration::nanoseconds(1)).date();
        let mut day = start.date();
        while day <= last {
            days.insert(day);
            match day.succ_opt() {
                Some(next) => day = next,
                None => break,
            }
        }
    }
    days.into_iter().collect()
}

/// Count of samples per flag value: `[none, rain, failure]`.
pub fn flag_counts(series: &ChannelSeries) -> [usize; 3] {
    let mut counts = [0usize; 3];
    for f in &series.flag {
        counts[f.code() as usize] += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::EventKind;
    use chrono::{Duration, NaiveDateTime};
    use proptest::prelude::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2019, 7, 3).unwrap()
    }

    fn at(h: u32, m: u32) -> NaiveDateTime {
        day().and_hms_opt(h, m, 0).unwrap()
    }

    /// One sample per minute from 09:50 to 10:19.
    fn series() -> ChannelSeries {
        let time: Vec<_> = (0..30).map(|i| at(9, 50) + Duration::minutes(i)).collect();
        let n = time.len();
        ChannelSeries::new(1, time, vec![-10.0; n], vec![-40.0; n])
    }

    fn event(kind: EventKind, start: (i64, i64), stop: (i64, i64)) -> EventRecord {
        EventRecord {
            date: day(),
            time_start: Duration::hours(start.0) + Duration::minutes(start.1),
            time_stop: Duration::hours(stop.0) + Duration::minutes(stop.1),
            kind,
        }
    }

    #[test]
    fn rain_interval_is_half_open() {
        let mut s = series();
        annotate(&mut s, &[event(EventKind::Rain, (10, 0), (10, 5))]);
        for (t, f) in s.time.iter().zip(&s.flag) {
            let inside = *t >= at(10, 0) && *t < at(10, 5);
            assert_eq!(*f == Flag::Rain, inside, "at {t}");
        }
        assert_eq!(flag_counts(&s), [25, 5, 0]);
    }

    #[test]
    fn later_event_wins_on_overlap() {
        let mut s = series();
        annotate(
            &mut s,
            &[
                event(EventKind::Rain, (10, 0), (10, 5)),
                event(EventKind::Failure, (10, 0), (10, 5)),
            ],
        );
        assert_eq!(flag_counts(&s), [25, 0, 5]);

        annotate(
            &mut s,
            &[
                event(EventKind::Failure, (10, 0), (10, 5)),
                event(EventKind::Rain, (10, 3), (10, 8)),
            ],
        );
        assert_eq!(flag_counts(&s), [22, 5, 3]);
    }

    #[test]
    fn other_events_and_empty_windows_are_ignored() {
        let mut s = series();
        let stamped = annotate(
            &mut s,
            &[
                event(EventKind::Other("snow".into()), (10, 0), (10, 5)),
                event(EventKind::Rain, (10, 5), (10, 5)),
                event(EventKind::Rain, (10, 8), (10, 2)),
                event(EventKind::Failure, (20, 0), (21, 0)),
            ],
        );
        assert_eq!(stamped, 0);
        assert!(s.flag.iter().all(|f| *f == Flag::None));
    }

    #[test]
    fn reannotation_resets_previous_flags() {
        let mut s = series();
        annotate(&mut s, &[event(EventKind::Rain, (9, 0), (11, 0))]);
        annotate(&mut s, &[]);
        assert_eq!(flag_counts(&s), [30, 0, 0]);
    }

    #[test]
    fn days_of_flagging_events() {
        let next = day().succ_opt().unwrap();
        let events = [
            event(EventKind::Rain, (10, 0), (10, 5)),
            event(EventKind::Failure, (23, 0), (24, 30)),
            event(EventKind::Rain, (12, 0), (24, 0)),
            event(EventKind::Other("fog".into()), (50, 0), (51, 0)),
        ];
        assert_eq!(event_days(&events), vec![day(), next]);
        assert!(event_days(&[event(EventKind::Rain, (5, 0), (5, 0))]).is_empty());
    }

    #[test]
    fn stop_past_midnight_reaches_next_day() {
        let time = vec![at(23, 59), at(23, 59) + Duration::minutes(2)];
        let mut s = ChannelSeries::new(2, time, vec![0.0; 2], vec![0.0; 2]);
        annotate(&mut s, &[event(EventKind::Rain, (23, 0), (24, 30))]);
        assert_eq!(s.flag, vec![Flag::Rain, Flag::Rain]);
    }

    fn arb_event() -> impl Strategy<Value = EventRecord> {
        (0u8..3, 9 * 60..10 * 60 + 30i64, 0..40i64).prop_map(|(kind, start, len)| EventRecord {
            date: day(),
            time_start: Duration::minutes(start),
            time_stop: Duration::minutes(start + len),
            kind: match kind {
                0 => EventKind::Rain,
                1 => EventKind::Failure,
                _ => EventKind::Other("hail".into()),
            },
        })
    }

    proptest! {
        #[test]
        fn each_sample_takes_the_last_covering_event(
            events in prop::collection::vec(arb_event(), 0..12)
        ) {
            let mut s = series();
            annotate(&mut s, &events);
            prop_assert_eq!(s.flag.len(), s.len());
            for (t, f) in s.time.iter().zip(&s.flag) {
                let expected = events
                    .iter()
                    .rev()
                    .filter(|e| e.start() <= *t && *t < e.stop())
                    .find_map(|e| e.kind.flag())
                    .unwrap_or(Flag::None);
                prop_assert_eq!(*f, expected);
            }
        }
    }
}
