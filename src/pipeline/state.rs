// =============================================================================
// Pipeline State & Report
// =============================================================================
//
//   Idle ──request──▶ Loading ──join ok──▶ Loaded
//                        │                   │
//                        └──any failure──▶ Error(msg)
//
// A new request from Loaded or Error goes back to Loading. Idle is only seen
// before the first request.
// =============================================================================

use serde::Serialize;

use crate::error::ValuationError;
use crate::fundamentals::StatementFigures;
use crate::types::ValuationResult;
use crate::valuation::DcfValuation;

/// Observable status of the valuation pipeline.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum PipelineState {
    #[default]
    Idle,
    Loading,
    Loaded,
    Error(String),
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Loaded | Self::Error(_))
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Loading => write!(f, "loading"),
            Self::Loaded => write!(f, "loaded"),
            Self::Error(msg) => write!(f, "error: {msg}"),
        }
    }
}

/// Everything produced by one successful valuation request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValuationReport {
    /// UUID v4 tying the report to its log lines.
    pub request_id: String,
    pub symbol: String,
    /// `fiscalDateEnding` of the cash flow report used, when present.
    pub fiscal_date_ending: Option<String>,
    pub figures: StatementFigures,
    pub dcf: DcfValuation,
    pub result: ValuationResult,
    /// Last traded price from the stored quote, shown beside
    /// `result.per_share_price`.
    pub market_price: Option<f64>,
    /// Why `result.per_share_price` is `None`, if it is.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share_price_error: Option<ValuationError>,
    /// ISO 8601 completion time.
    pub completed_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_idle() {
        assert_eq!(PipelineState::default(), PipelineState::Idle);
        assert!(!PipelineState::Loading.is_terminal());
        assert!(PipelineState::Error("x".into()).is_terminal());
    }

    #[test]
    fn serialises_with_tag() {
        let json = serde_json::to_string(&PipelineState::Error("boom".into())).unwrap();
        assert_eq!(json, r#"{"state":"error","message":"boom"}"#);
        let json = serde_json::to_string(&PipelineState::Loaded).unwrap();
        assert_eq!(json, r#"{"state":"loaded"}"#);
    }
}
