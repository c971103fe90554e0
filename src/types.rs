// =============================================================================
// Shared types used across the valuation engine
// =============================================================================

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Chronological closing prices, oldest first.
///
/// The closes live behind an `Arc<[f64]>`: cloning is cheap and there is no
/// way to mutate a series once it has been built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<f64>", into = "Vec<f64>")]
pub struct PriceSeries {
    closes: Arc<[f64]>,
}

impl PriceSeries {
    pub fn new(closes: Vec<f64>) -> Self {
        Self {
            closes: closes.into(),
        }
    }

    pub fn closes(&self) -> &[f64] {
        &self.closes
    }

    pub fn len(&self) -> usize {
        self.closes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.closes.is_empty()
    }

    /// Most recent close.
    pub fn last(&self) -> Option<f64> {
        self.closes.last().copied()
    }

    /// Close `lag` sessions back counted from the end, where `lag == 1` is the
    /// most recent close.
    pub fn lagged(&self, lag: usize) -> Option<f64> {
        if lag == 0 || lag > self.closes.len() {
            return None;
        }
        Some(self.closes[self.closes.len() - lag])
    }
}

impl From<Vec<f64>> for PriceSeries {
    fn from(closes: Vec<f64>) -> Self {
        Self::new(closes)
    }
}

impl From<PriceSeries> for Vec<f64> {
    fn from(series: PriceSeries) -> Self {
        series.closes.to_vec()
    }
}

impl AsRef<[f64]> for PriceSeries {
    fn as_ref(&self) -> &[f64] {
        &self.closes
    }
}

/// DCF output for one symbol.
///
/// `value` is the present value of projected cash flows minus net debt.
/// `per_share_price` divides that adjusted figure by shares outstanding and
/// is `None` whenever no valid share count was available.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ValuationResult {
    pub value: f64,
    pub per_share_price: Option<f64>,
}

impl ValuationResult {
    pub fn without_share_price(value: f64) -> Self {
        Self {
            value,
            per_share_price: None,
        }
    }
}
