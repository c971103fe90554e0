// =============================================================================
// Valuation Module
// =============================================================================
//
// Intrinsic value from fundamentals: the multi-stage DCF model and the
// per-share division that follows it. Both are synchronous and pure.

pub mod dcf;
pub mod per_share;

pub use dcf::{
    compute_dcf, CashFlowProjection, DcfConfig, DcfInputs, DcfModel, DcfValuation, PresentValues,
};
pub use per_share::{parse_shares_outstanding, per_share_price, with_share_price};
