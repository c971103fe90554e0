// =============================================================================
// Simple Moving Average (SMA)
// =============================================================================
//
// Arithmetic mean of each window of `period` consecutive closes.
//
//   SMA_i = (close_{i-period+1} + ... + close_i) / period
//
// The first value sits at input index `period - 1`.
// =============================================================================

use super::series::{IndicatorKind, IndicatorSeries};

/// Compute the SMA series for `closes` over `period`.
///
/// Produces `closes.len() - period + 1` values starting at input index
/// `period - 1`. Each window is summed directly rather than with a running
/// total so that values match a naive mean exactly.
///
/// # Edge cases
/// - `period == 0` => empty series
/// - `period > closes.len()` => empty series
pub fn calculate_sma(closes: &[f64], period: usize) -> IndicatorSeries {
    if period == 0 || period > closes.len() {
        return IndicatorSeries::empty(IndicatorKind::Sma, period, closes.len());
    }

    let values = closes
        .windows(period)
        .map(|w| w.iter().sum::<f64>() / period as f64)
        .collect();

    IndicatorSeries::new(IndicatorKind::Sma, period, period - 1, closes.len(), values)
}
