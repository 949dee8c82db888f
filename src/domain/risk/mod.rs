// Risk management domain
pub mod state;
