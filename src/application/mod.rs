// Indicator engine
pub mod indicators;

// Chart and candlestick pattern recognition
pub mod patterns;

// Support/resistance discovery
pub mod levels;

// Signal aggregation
pub mod signals;

// Full-analysis orchestration
pub mod analysis;
