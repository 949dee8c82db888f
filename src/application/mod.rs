// Market data processing
pub mod market_data;

// Regime classification, signals and sizing
pub mod strategy;

// Simulated order execution
pub mod execution;

// Per-symbol decision loop
pub mod trading_instance;

// System orchestrator
pub mod system;
