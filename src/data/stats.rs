use serde::Serialize;

use super::model::ChannelSeries;

// ---------------------------------------------------------------------------
// Running mean / variance
// ---------------------------------------------------------------------------

/// Welford accumulator; `NaN` inputs are skipped.
#[derive(Debug, Clone, Default)]
pub struct Accumulator {
    n_vals: usize,
    mean: f64,
    diff_2_sum: f64,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, val: f64) {
        if val.is_nan() {
            return;
        }
        self.n_vals += 1;

        let diff_a = val - self.mean;
        self.mean += diff_a / self.n_vals as f64;

        let diff_b = val - self.mean;
        self.diff_2_sum += diff_a * diff_b;
    }

    pub fn count(&self) -> usize {
        self.n_vals
    }

    pub fn mean(&self) -> f64 {
        if self.n_vals == 0 {
            f64::NAN
        } else {
            self.mean
        }
    }

    /// Sample standard deviation (n - 1 denominator).
    pub fn std_dev(&self) -> f64 {
        if self.n_vals > 1 {
            (self.diff_2_sum / (self.n_vals as f64 - 1.0)).sqrt()
        } else {
            f64::NAN
        }
    }
}

impl FromIterator<f64> for Accumulator {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut acc = Accumulator::new();
        for v in iter {
            acc.add(v);
        }
        acc
    }
}

// ---------------------------------------------------------------------------
// Channel statistics
// ---------------------------------------------------------------------------

/// Descriptive statistics of one channel's raw signal and noise.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChannelStats {
    pub channel: u8,
    pub mean_signal: f64,
    pub std_signal: f64,
    pub mean_noise: f64,
    pub std_noise: f64,
    /// Non-missing samples that went into the signal figures.
    pub count_signal: usize,
    pub count_noise: usize,
}

/// Statistics over the whole series as loaded; flags are not applied.
pub fn channel_stats(series: &ChannelSeries) -> ChannelStats {
    let signal: Accumulator = series.signal.iter().copied().collect();
    let noise: Accumulator = series.noise.iter().copied().collect();
    ChannelStats {
        channel: series.channel,
        mean_signal: signal.mean(),
        std_signal: signal.std_dev(),
        mean_noise: noise.mean(),
        std_noise: noise.std_dev(),
        count_signal: signal.count(),
        count_noise: noise.count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn series(signal: Vec<f64>, noise: Vec<f64>) -> ChannelSeries {
        let t0 = NaiveDate::from_ymd_opt(2021, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let time = (0..signal.len())
            .map(|i| t0 + Duration::seconds(i as i64))
            .collect();
        ChannelSeries::new(3, time, signal, noise)
    }

    #[test]
    fn constant_series() {
        let s = series(vec![5.0; 10], vec![2.0; 10]);
        let st = channel_stats(&s);
        assert_eq!(st.mean_signal, 5.0);
        assert_eq!(st.std_signal, 0.0);
        assert_eq!(st.mean_noise, 2.0);
        assert_eq!(st.std_noise, 0.0);
        assert_eq!(st.channel, 3);
    }

    #[test]
    fn missing_values_are_skipped() {
        let s = series(
            vec![1.0, f64::NAN, 2.0, 3.0, 4.0],
            vec![f64::NAN, 0.0, 0.0, f64::NAN, 0.0],
        );
        let st = channel_stats(&s);
        assert_eq!(st.count_signal, 4);
        assert!((st.mean_signal - 2.5).abs() < 1e-12);
        // sample std of 1..4 = sqrt(5/3)
        assert!((st.std_signal - (5.0f64 / 3.0).sqrt()).abs() < 1e-12);
        assert_eq!(st.count_noise, 3);
    }

    #[test]
    fn flags_do_not_change_stats() {
        let mut s = series(vec![1.0, 2.0, 3.0], vec![0.0; 3]);
        let before = channel_stats(&s);
        s.flag[1] = crate::data::model::Flag::Rain;
        assert_eq!(channel_stats(&s), before);
    }

    #[test]
    fn too_few_values() {
        let empty = channel_stats(&series(vec![], vec![]));
        assert!(empty.mean_signal.is_nan());
        assert!(empty.std_signal.is_nan());

        let one = channel_stats(&series(vec![7.0], vec![1.0]));
        assert_eq!(one.mean_signal, 7.0);
        assert!(one.std_signal.is_nan());
    }
}
