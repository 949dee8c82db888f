// Market data processing modules
pub mod candle_aggregator;
pub mod indicator_service;
pub mod streaming_engine;
