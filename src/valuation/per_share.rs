// =============================================================================
// Per-Share Price
// =============================================================================
//
// Divides a DCF value by shares outstanding. Share counts arrive as strings
// from the company overview ("15550061000", "None", ...), so parsing and
// the positivity check live here.
// =============================================================================

use crate::error::{Result, ValuationError};
use crate::types::ValuationResult;

/// Parse a raw shares-outstanding field.
///
/// Fails when the field is absent, non-numeric, non-finite or not strictly
/// positive.
pub fn parse_shares_outstanding(raw: Option<&str>) -> Result<f64> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ValuationError::SharesOutstanding("field is absent".to_string()))?;

    let shares: f64 = raw
        .parse()
        .map_err(|_| ValuationError::SharesOutstanding(format!("not numeric: {raw:?}")))?;

    if !shares.is_finite() || shares <= 0.0 {
        return Err(ValuationError::SharesOutstanding(format!(
            "must be a positive number, got {shares}"
        )));
    }
    Ok(shares)
}

/// `value / shares`, or the reason no per-share price exists.
pub fn per_share_price(value: f64, shares_outstanding: Option<&str>) -> Result<f64> {
    let shares = parse_shares_outstanding(shares_outstanding)?;
    Ok(value / shares)
}

/// Attach a per-share price to `value` when the share count allows it.
///
/// The error explaining a missing price is returned alongside the result so
/// that the value itself is never lost.
pub fn with_share_price(
    value: f64,
    shares_outstanding: Option<&str>,
) -> (ValuationResult, Option<ValuationError>) {
    match per_share_price(value, shares_outstanding) {
        Ok(price) => (
            ValuationResult {
                value,
                per_share_price: Some(price),
            },
            None,
        ),
        Err(e) => (ValuationResult::without_share_price(value), Some(e)),
    }
}
