// =============================================================================
// Valuation Pipeline
// =============================================================================

pub mod collaborators;
pub mod orchestrator;
pub mod state;

pub use collaborators::{MarketDataSource, PricePredictor};
pub use orchestrator::ValuationPipeline;
pub use state::{PipelineState, ValuationReport};
