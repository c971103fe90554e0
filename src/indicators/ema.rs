// =============================================================================
// Exponential Moving Average (EMA)
// =============================================================================
//
// EMA weights recent closes more heavily than the SMA does.
//
// Formula:
//   multiplier = 2 / (period + 1)
//   EMA_i      = (close_i - EMA_{i-1}) * multiplier + EMA_{i-1}
//
// The value at input index `period - 1` is seeded with the SMA of the first
// `period` closes; earlier positions are undefined.
// =============================================================================

use super::series::{IndicatorKind, IndicatorSeries};
use super::sma::calculate_sma;

/// Compute the EMA series for `closes` over `period`.
///
/// The series starts at input index `period - 1` and runs to the last close,
/// so its aligned view has the same length as the input.
///
/// # Edge cases
/// - `period == 0` => empty series
/// - `closes.len() < period` => empty series
pub fn calculate_ema(closes: &[f64], period: usize) -> IndicatorSeries {
    let Some(seed) = calculate_sma(closes, period).first() else {
        return IndicatorSeries::empty(IndicatorKind::Ema, period, closes.len());
    };

    let multiplier = 2.0 / (period as f64 + 1.0);

    let mut values = Vec::with_capacity(closes.len() - period + 1);
    values.push(seed);

    let mut prev = seed;
    for &close in &closes[period..] {
        let ema = (close - prev) * multiplier + prev;
        values.push(ema);
        prev = ema;
    }

    IndicatorSeries::new(IndicatorKind::Ema, period, period - 1, closes.len(), values)
}
