// =============================================================================
// Relative Strength Index (RSI): Wilder's Smoothing
// =============================================================================
//
// Step 1: Price changes from consecutive closes.
// Step 2: Seed average gain / average loss from the first `period` changes
//          (sum of gains / period, sum of loss magnitudes / period). The seed
//          RSI belongs to input index `period`.
// Step 3: Wilder's update for every later close:
//            avg_gain = (avg_gain * (period - 1) + gain) / period
//            avg_loss = (avg_loss * (period - 1) + loss) / period
// Step 4: RSI = 100 - 100 / (1 + avg_gain / avg_loss), or 100 when
//          avg_loss is zero.
//
// A zero seed average loss saturates differently depending on
// `RsiSaturation`; see its docs.
// =============================================================================

use serde::{Deserialize, Serialize};

use super::series::{IndicatorKind, IndicatorSeries};

pub const DEFAULT_RSI_PERIOD: usize = 14;

/// How a zero average loss at the seed index is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RsiSaturation {
    /// Every defined index reads 100, regardless of later losses.
    #[default]
    Global,
    /// Only the seed index reads 100; later indices use the normal update.
    SeedOnly,
}

/// Compute the RSI series for `closes` over `period`.
///
/// Values start at input index `period` and run to the last close.
///
/// # Edge cases
/// - `period == 0` => empty series
/// - `closes.len() <= period` => empty series (need `period` changes)
pub fn calculate_rsi(closes: &[f64], period: usize, saturation: RsiSaturation) -> IndicatorSeries {
    if period == 0 || closes.len() <= period {
        return IndicatorSeries::empty(IndicatorKind::Rsi, period, closes.len());
    }

    let period_f = period as f64;
    let out_len = closes.len() - period;

    // --- Seed ----------------------------------------------------------------
    let (sum_gain, sum_loss) = closes[..=period]
        .windows(2)
        .map(|w| w[1] - w[0])
        .fold((0.0_f64, 0.0_f64), |(g, l), d| {
            if d > 0.0 {
                (g + d, l)
            } else {
                (g, l - d)
            }
        });

    let mut avg_gain = sum_gain / period_f;
    let mut avg_loss = sum_loss / period_f;

    if avg_loss == 0.0 && saturation == RsiSaturation::Global {
        return IndicatorSeries::new(
            IndicatorKind::Rsi,
            period,
            period,
            closes.len(),
            vec![100.0; out_len],
        );
    }

    let mut values = Vec::with_capacity(out_len);
    values.push(rsi_from_averages(avg_gain, avg_loss));

    // --- Wilder's smoothing --------------------------------------------------
    for w in closes[period..].windows(2) {
        let change = w[1] - w[0];
        let (gain, loss) = if change > 0.0 {
            (change, 0.0)
        } else {
            (0.0, -change)
        };

        avg_gain = (avg_gain * (period_f - 1.0) + gain) / period_f;
        avg_loss = (avg_loss * (period_f - 1.0) + loss) / period_f;

        values.push(rsi_from_averages(avg_gain, avg_loss));
    }

    IndicatorSeries::new(IndicatorKind::Rsi, period, period, closes.len(), values)
}

/// Most recent RSI value together with a label.
///
/// Uses the same `saturation` as the series it is reported beside, so the
/// value always equals `calculate_rsi(..).last()`.
pub fn current_rsi(
    closes: &[f64],
    period: usize,
    saturation: RsiSaturation,
) -> Option<(f64, &'static str)> {
    let value = calculate_rsi(closes, period, saturation).last()?;

    let label = if value >= 70.0 {
        "OVERBOUGHT"
    } else if value <= 30.0 {
        "OVERSOLD"
    } else {
        "NEUTRAL"
    };

    Some((value, label))
}

/// Zero average loss reads as 100 (includes the no-movement case).
fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        100.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}
