//! Order statistics used by the filter and the resampler.

use statrs::statistics::Statistics;

/// Arithmetic mean, `None` for an empty slice.
#[must_use]
pub(crate) fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().mean())
}

/// Quantile of an ascending slice by linear interpolation between the two
/// nearest ranks (`pos = q * (n - 1)`).
///
/// Returns `None` for an empty slice. `q` is clamped into `[0, 1]`.
#[must_use]
pub(crate) fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    let last = sorted.len().checked_sub(1)?;
    let pos = q.clamp(0.0, 1.0) * last as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Median of an ascending slice.
#[must_use]
pub(crate) fn median_sorted(sorted: &[f64]) -> Option<f64> {
    quantile_sorted(sorted, 0.5)
}

/// Returns a sorted copy of the values using IEEE total order.
#[must_use]
pub(crate) fn sorted(values: &[f64]) -> Vec<f64> {
    let mut out = values.to_vec();
    out.sort_by(f64::total_cmp);
    out
}
