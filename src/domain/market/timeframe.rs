use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const MINUTE_MS: i64 = 60_000;

/// Candle bucket widths driven by the streaming engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Timeframe {
    OneMin,
    FiveMin,
    FifteenMin,
    OneHour,
    FourHour,
}

impl Timeframe {
    /// Returns the duration of this timeframe in minutes
    pub fn to_minutes(&self) -> i64 {
        match self {
            Timeframe::OneMin => 1,
            Timeframe::FiveMin => 5,
            Timeframe::FifteenMin => 15,
            Timeframe::OneHour => 60,
            Timeframe::FourHour => 240,
        }
    }

    /// Returns the duration in milliseconds
    pub fn duration_ms(&self) -> i64 {
        self.to_minutes() * MINUTE_MS
    }

    /// Short exchange-style label ("1m", "5m", "1h", ...)
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::OneMin => "1m",
            Timeframe::FiveMin => "5m",
            Timeframe::FifteenMin => "15m",
            Timeframe::OneHour => "1h",
            Timeframe::FourHour => "4h",
        }
    }

    /// Returns all available timeframes in ascending order
    pub fn all() -> Vec<Timeframe> {
        vec![
            Timeframe::OneMin,
            Timeframe::FiveMin,
            Timeframe::FifteenMin,
            Timeframe::OneHour,
            Timeframe::FourHour,
        ]
    }

    /// Returns the start timestamp of the bucket containing the given timestamp
    ///
    /// # Arguments
    /// * `timestamp_ms` - Unix timestamp in milliseconds
    ///
    /// # Returns
    /// The timestamp truncated to this timeframe's duration (epoch aligned)
    pub fn period_start(&self, timestamp_ms: i64) -> i64 {
        timestamp_ms - timestamp_ms.rem_euclid(self.duration_ms())
    }

    /// Last millisecond covered by the bucket starting at `start_ms`
    pub fn period_end(&self, start_ms: i64) -> i64 {
        start_ms + self.duration_ms() - 1
    }

    /// Checks if a timestamp aligns with the start of a bucket
    pub fn is_period_start(&self, timestamp_ms: i64) -> bool {
        timestamp_ms.rem_euclid(self.duration_ms()) == 0
    }
}

impl FromStr for Timeframe {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "1m" | "1min" | "onemin" => Ok(Timeframe::OneMin),
            "5m" | "5min" | "fivemin" => Ok(Timeframe::FiveMin),
            "15m" | "15min" | "fifteenmin" => Ok(Timeframe::FifteenMin),
            "1h" | "1hour" | "onehour" => Ok(Timeframe::OneHour),
            "4h" | "4hour" | "fourhour" => Ok(Timeframe::FourHour),
            _ => Err(anyhow!(
                "Invalid timeframe: '{}'. Valid options: 1m, 5m, 15m, 1h, 4h",
                s
            )),
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_minutes() {
        assert_eq!(Timeframe::OneMin.to_minutes(), 1);
        assert_eq!(Timeframe::FiveMin.to_minutes(), 5);
        assert_eq!(Timeframe::FifteenMin.to_minutes(), 15);
        assert_eq!(Timeframe::OneHour.to_minutes(), 60);
        assert_eq!(Timeframe::FourHour.to_minutes(), 240);
        assert_eq!(Timeframe::OneHour.duration_ms(), 3_600_000);
    }

    #[test]
    fn test_from_str() {
        assert_eq!(Timeframe::from_str("1m").unwrap(), Timeframe::OneMin);
        assert_eq!(Timeframe::from_str("5m").unwrap(), Timeframe::FiveMin);
        assert_eq!(Timeframe::from_str("15Min").unwrap(), Timeframe::FifteenMin);
        assert_eq!(Timeframe::from_str("1h").unwrap(), Timeframe::OneHour);
        assert_eq!(Timeframe::from_str("4H").unwrap(), Timeframe::FourHour);
        assert!(Timeframe::from_str("1d").is_err());
    }

    #[test]
    fn test_period_start_and_end() {
        let tf = Timeframe::FiveMin;
        // 2024-01-01 00:00:00 UTC
        let base = 1704067200000i64;

        assert_eq!(tf.period_start(base), base);
        assert_eq!(tf.period_start(base + 3 * MINUTE_MS), base);
        assert_eq!(tf.period_start(base + 5 * MINUTE_MS), base + 5 * MINUTE_MS);
        assert_eq!(tf.period_start(base + 7 * MINUTE_MS + 999), base + 5 * MINUTE_MS);

        assert_eq!(tf.period_end(base), base + 5 * MINUTE_MS - 1);
        assert_eq!(tf.period_start(tf.period_end(base)), base);
    }

    #[test]
    fn test_is_period_start() {
        let tf = Timeframe::OneHour;
        let base = 1704067200000i64;

        assert!(tf.is_period_start(base));
        assert!(tf.is_period_start(base + 60 * MINUTE_MS));
        assert!(!tf.is_period_start(base + 59 * MINUTE_MS));
    }

    #[test]
    fn test_display_roundtrips_through_from_str() {
        for tf in Timeframe::all() {
            assert_eq!(Timeframe::from_str(&tf.to_string()).unwrap(), tf);
        }
    }
}
