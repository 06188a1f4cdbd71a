use std::f64::consts::PI;

use num_complex::Complex64;
use serde::Deserialize;

use super::model::ChannelSeries;
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Filter coefficients
// ---------------------------------------------------------------------------

/// Transfer function `B(z) / A(z)` of an IIR filter.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FilterCoefficients {
    /// Numerator.
    pub b: Vec<f64>,
    /// Denominator; `a[0]` must be non-zero.
    pub a: Vec<f64>,
}

impl FilterCoefficients {
    pub fn new(b: Vec<f64>, a: Vec<f64>) -> Result<Self> {
        let coeffs = FilterCoefficients { b, a };
        coeffs.validate()?;
        Ok(coeffs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.b.is_empty() || self.a.is_empty() {
            return Err(Error::InvalidFilter("empty coefficient vector".into()));
        }
        if self.a[0] == 0.0 {
            return Err(Error::InvalidFilter("a[0] must be non-zero".into()));
        }
        if self.b.iter().chain(&self.a).any(|c| !c.is_finite()) {
            return Err(Error::InvalidFilter("non-finite coefficient".into()));
        }
        Ok(())
    }

    /// Digital Butterworth low-pass of the given order.
    ///
    /// `cutoff` is normalised to the Nyquist frequency and must lie in
    /// `(0, 1)`. Designed from the analog prototype with a pre-warped
    /// bilinear transform.
    pub fn butterworth(order: usize, cutoff: f64) -> Result<Self> {
        if order == 0 {
            return Err(Error::InvalidFilter("order must be at least 1".into()));
        }
        if !(cutoff > 0.0 && cutoff < 1.0) {
            return Err(Error::InvalidFilter(format!(
                "cutoff {cutoff} outside (0, 1)"
            )));
        }

        // bilinear transform with fs = 2
        let fs2 = 4.0;
        let warped = fs2 * (PI * cutoff / 2.0).tan();
        let n = order as f64;

        let poles: Vec<Complex64> = (0..order)
            .map(|k| {
                let theta = PI * (2.0 * k as f64 + n + 1.0) / (2.0 * n);
                Complex64::from_polar(warped, theta)
            })
            .collect();

        let denom: Complex64 = poles.iter().map(|&p| fs2 - p).product();
        let gain = warped.powi(order as i32) / denom.re;

        let z_poles: Vec<Complex64> = poles.iter().map(|&p| (fs2 + p) / (fs2 - p)).collect();
        let a: Vec<f64> = poly(&z_poles).iter().map(|c| c.re).collect();

        // all digital zeros sit at z = -1
        let b: Vec<f64> = binomial_row(order)
            .into_iter()
            .map(|c| gain * c)
            .collect();

        Self::new(b, a)
    }

    fn normalized(&self) -> (Vec<f64>, Vec<f64>) {
        let ntaps = self.b.len().max(self.a.len());
        let a0 = self.a[0];
        let mut b = vec![0.0; ntaps];
        let mut a = vec![0.0; ntaps];
        for (dst, src) in b.iter_mut().zip(&self.b) {
            *dst = src / a0;
        }
        for (dst, src) in a.iter_mut().zip(&self.a) {
            *dst = src / a0;
        }
        (b, a)
    }

    /// Samples of odd extension added on each side by [`filtfilt`].
    pub fn padlen(&self) -> usize {
        3 * self.b.len().max(self.a.len())
    }
}

/// Coefficients of the monic polynomial with the given roots, highest
/// power first.
fn poly(roots: &[Complex64]) -> Vec<Complex64> {
    let mut coeffs = vec![Complex64::new(1.0, 0.0)];
    for &r in roots {
        let mut next = coeffs.clone();
        next.push(Complex64::new(0.0, 0.0));
        for j in 1..next.len() {
            next[j] -= r * coeffs[j - 1];
        }
        coeffs = next;
    }
    coeffs
}

fn binomial_row(n: usize) -> Vec<f64> {
    let mut row = vec![1.0];
    for k in 0..n {
        let next = row[k] * (n - k) as f64 / (k + 1) as f64;
        row.push(next);
    }
    row
}

// ---------------------------------------------------------------------------
// Linear filtering
// ---------------------------------------------------------------------------

/// Direct-form II transposed recursion with initial state `zi`
/// (`ntaps - 1` values). Expects normalised, equal-length `b` and `a`.
fn lfilter_state(b: &[f64], a: &[f64], x: &[f64], mut z: Vec<f64>) -> Vec<f64> {
    let n = b.len();
    let mut y = Vec::with_capacity(x.len());
    for &xi in x {
        let yi = b[0] * xi + z.first().copied().unwrap_or(0.0);
        for k in 1..n {
            let carry = if k < n - 1 { z[k] } else { 0.0 };
            z[k - 1] = b[k] * xi + carry - a[k] * yi;
        }
        y.push(yi);
    }
    y
}

/// Causal single-pass filter starting from rest.
pub fn lfilter(coeffs: &FilterCoefficients, x: &[f64]) -> Result<Vec<f64>> {
    coeffs.validate()?;
    let (b, a) = coeffs.normalized();
    let zi = vec![0.0; b.len() - 1];
    Ok(lfilter_state(&b, &a, x, zi))
}

/// Initial state giving the steady-state response to a unit step.
pub fn lfilter_zi(coeffs: &FilterCoefficients) -> Result<Vec<f64>> {
    coeffs.validate()?;
    let (b, a) = coeffs.normalized();
    steady_state(&b, &a)
}

fn steady_state(b: &[f64], a: &[f64]) -> Result<Vec<f64>> {
    let a_sum: f64 = a.iter().sum();
    if a_sum.abs() < f64::EPSILON {
        return Err(Error::InvalidFilter("pole at z = 1, no steady state".into()));
    }
    let gain = b.iter().sum::<f64>() / a_sum;

    let mut zi = Vec::with_capacity(b.len() - 1);
    let mut acc = gain - b[0];
    for k in 1..b.len() {
        zi.push(acc);
        acc -= b[k] - a[k] * gain;
    }
    Ok(zi)
}

/// Zero-phase forward-backward filtering.
///
/// The input is extended at both ends by an odd reflection of
/// [`FilterCoefficients::padlen`] samples, filtered forward and then
/// backward with steady-state initial conditions, and trimmed back to the
/// input length. Empty or all-`NaN` input is returned unchanged.
pub fn filtfilt(coeffs: &FilterCoefficients, x: &[f64]) -> Result<Vec<f64>> {
    coeffs.validate()?;
    if x.iter().all(|v| v.is_nan()) {
        return Ok(x.to_vec());
    }
    let padlen = coeffs.padlen();
    if x.len() <= padlen {
        return Err(Error::SignalTooShort {
            len: x.len(),
            padlen,
        });
    }

    let (b, a) = coeffs.normalized();
    let zi = steady_state(&b, &a)?;

    let n = x.len();
    let first = x[0];
    let last = x[n - 1];
    let mut ext = Vec::with_capacity(n + 2 * padlen);
    ext.extend((1..=padlen).rev().map(|i| 2.0 * first - x[i]));
    ext.extend_from_slice(x);
    ext.extend((1..=padlen).map(|i| 2.0 * last - x[n - 1 - i]));

    let x0 = ext[0];
    let mut y = lfilter_state(&b, &a, &ext, zi.iter().map(|z| z * x0).collect());

    y.reverse();
    let y0 = y[0];
    let mut y = lfilter_state(&b, &a, &y, zi.iter().map(|z| z * y0).collect());
    y.reverse();

    Ok(y[padlen..padlen + n].to_vec())
}

/// Zero-phase low-pass of the raw signal column.
pub fn low_pass(coeffs: &FilterCoefficients, series: &ChannelSeries) -> Result<Vec<f64>> {
    filtfilt(coeffs, &series.signal)
}

// ---------------------------------------------------------------------------
// Flag masking
// ---------------------------------------------------------------------------

/// Replace every filtered sample whose source sample is flagged with `NaN`.
pub fn mask_flagged(filtered: &mut [f64], series: &ChannelSeries) -> Result<()> {
    if filtered.len() != series.len() {
        return Err(Error::LengthMismatch {
            filtered: filtered.len(),
            series: series.len(),
        });
    }
    for (v, f) in filtered.iter_mut().zip(&series.flag) {
        if f.is_set() {
            *v = f64::NAN;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Flag;
    use chrono::{Duration, NaiveDate};

    fn close(a: &[f64], b: &[f64], tol: f64) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() < tol)
    }

    #[test]
    fn butterworth_matches_reference_design() {
        let c = FilterCoefficients::butterworth(2, 0.1).unwrap();
        assert!(close(&c.b, &[0.02008337, 0.04016673, 0.02008337], 1e-7));
        assert!(close(&c.a, &[1.0, -1.56101808, 0.64135154], 1e-7));

        let c = FilterCoefficients::butterworth(1, 0.5).unwrap();
        assert!(close(&c.b, &[0.5, 0.5], 1e-12));
        assert!(close(&c.a, &[1.0, 0.0], 1e-12));
    }

    #[test]
    fn butterworth_rejects_bad_cutoff() {
        assert!(FilterCoefficients::butterworth(2, 0.0).is_err());
        assert!(FilterCoefficients::butterworth(2, 1.0).is_err());
        assert!(FilterCoefficients::butterworth(0, 0.3).is_err());
    }

    #[test]
    fn steady_state_initial_conditions() {
        let c = FilterCoefficients::new(vec![0.5, 0.5], vec![1.0, 0.0]).unwrap();
        assert!(close(&lfilter_zi(&c).unwrap(), &[0.5], 1e-12));

        // A step filtered from its steady state stays flat.
        let c = FilterCoefficients::butterworth(3, 0.2).unwrap();
        let zi = lfilter_zi(&c).unwrap();
        let (b, a) = c.normalized();
        let y = lfilter_state(&b, &a, &[1.0; 50], zi);
        assert!(y.iter().all(|v| (v - 1.0).abs() < 1e-9));
    }

    #[test]
    fn unnormalized_denominator() {
        let c = FilterCoefficients::new(vec![1.0, 1.0], vec![2.0, 0.0]).unwrap();
        let y = lfilter(&c, &[1.0, 0.0, 0.0]).unwrap();
        assert!(close(&y, &[0.5, 0.5, 0.0], 1e-12));
    }

    #[test]
    fn filtfilt_preserves_constant() {
        let c = FilterCoefficients::butterworth(4, 0.05).unwrap();
        let y = filtfilt(&c, &[-12.5; 100]).unwrap();
        assert_eq!(y.len(), 100);
        assert!(y.iter().all(|v| (v + 12.5).abs() < 1e-8));
    }

    #[test]
    fn filtfilt_has_no_group_delay() {
        let c = FilterCoefficients::butterworth(2, 0.1).unwrap();
        let mut x = vec![0.0; 301];
        for v in &mut x[140..=160] {
            *v = 1.0;
        }
        let y = filtfilt(&c, &x).unwrap();
        for k in 0..60 {
            assert!((y[150 - k] - y[150 + k]).abs() < 1e-4, "asymmetric at {k}");
        }
    }

    #[test]
    fn filtfilt_edge_cases() {
        let c = FilterCoefficients::butterworth(2, 0.1).unwrap();
        assert!(filtfilt(&c, &[]).unwrap().is_empty());

        let nans = filtfilt(&c, &[f64::NAN; 4]).unwrap();
        assert_eq!(nans.len(), 4);
        assert!(nans.iter().all(|v| v.is_nan()));

        assert!(matches!(
            filtfilt(&c, &[1.0; 9]),
            Err(Error::SignalTooShort { len: 9, padlen: 9 })
        ));
    }

    #[test]
    fn mask_nulls_flagged_positions_only() {
        let t0 = NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let time = (0..5).map(|i| t0 + Duration::seconds(i)).collect();
        let mut series = ChannelSeries::new(1, time, vec![0.0; 5], vec![0.0; 5]);
        series.flag = vec![Flag::None, Flag::Rain, Flag::None, Flag::Failure, Flag::None];

        let mut filtered = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        mask_flagged(&mut filtered, &series).unwrap();
        let nulled: Vec<usize> = (0..5).filter(|&i| filtered[i].is_nan()).collect();
        assert_eq!(nulled, vec![1, 3]);
        assert_eq!(filtered[0], 1.0);
        assert_eq!(filtered[2], 3.0);
        assert_eq!(filtered[4], 5.0);

        let mut short = vec![0.0; 4];
        assert!(matches!(
            mask_flagged(&mut short, &series),
            Err(Error::LengthMismatch { .. })
        ));
    }
}
