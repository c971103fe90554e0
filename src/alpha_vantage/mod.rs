// =============================================================================
// Alpha Vantage market data adapter
// =============================================================================

pub mod client;

pub use client::AlphaVantageClient;
