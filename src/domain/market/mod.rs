pub mod candle;
pub mod indicators;
pub mod market_regime;
pub mod timeframe;
