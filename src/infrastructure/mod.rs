pub mod event_bus;
pub mod live_execution;
pub mod mock;
pub mod queue;
pub mod tick_hub;

pub use event_bus::EventBus;
pub use queue::{DropQueue, drop_queue};
