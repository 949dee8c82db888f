pub mod position_scaling;
pub mod regime_state_machine;
pub mod risk_sizing;
pub mod signal_generator;
