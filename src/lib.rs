// =============================================================================
// Valuation Engine
// =============================================================================
//
// Technical indicators, a multi-stage DCF model and the pipeline that fetches
// a company's statements concurrently and turns them into a valuation.
// =============================================================================

pub mod alpha_vantage;
pub mod error;
pub mod features;
pub mod fundamentals;
pub mod indicators;
pub mod pipeline;
pub mod runtime_config;
pub mod types;
pub mod valuation;

pub use error::{ErrorKind, Result, ValuationError};
pub use features::FeatureVector;
pub use pipeline::{MarketDataSource, PipelineState, PricePredictor, ValuationPipeline};
pub use runtime_config::RuntimeConfig;
pub use types::{PriceSeries, ValuationResult};
