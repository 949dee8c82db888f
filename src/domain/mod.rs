// Market data and regime domain
pub mod market;

// Port interfaces
pub mod ports;

// Risk management domain
pub mod risk;

// Core trading domain
pub mod trading;

// Observability events
pub mod events;

// Domain-specific error types
pub mod errors;
