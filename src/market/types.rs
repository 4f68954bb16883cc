//! Core data types for the aggregation engine.

use serde::{Deserialize, Serialize};

/// Candle bucket width supported by the snapshot API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum Granularity {
    #[serde(rename = "1m")]
    M1,
    #[serde(rename = "5m")]
    M5,
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "6h")]
    H6,
    #[serde(rename = "1d")]
    D1,
}

impl Granularity {
    /// Bucket width in seconds, as expected by the candles endpoint.
    pub fn seconds(&self) -> u64 {
        match self {
            Granularity::M1 => 60,
            Granularity::M5 => 300,
            Granularity::M15 => 900,
            Granularity::H1 => 3600,
            Granularity::H6 => 21600,
            Granularity::D1 => 86400,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::M1 => "1m",
            Granularity::M5 => "5m",
            Granularity::M15 => "15m",
            Granularity::H1 => "1h",
            Granularity::H6 => "6h",
            Granularity::D1 => "1d",
        }
    }

    /// Bucket label format. Sub-hour buckets only need time-of-day, hourly
    /// buckets need the date as well, anything coarser only the date.
    pub fn label_format(&self) -> &'static str {
        match self {
            Granularity::M1 | Granularity::M5 | Granularity::M15 => "%H:%M",
            Granularity::H1 => "%b %-d %H:%M",
            Granularity::H6 | Granularity::D1 => "%b %-d",
        }
    }
}

impl std::fmt::Display for Granularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which candle field feeds the chart and the derived metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueField {
    Open,
    High,
    Low,
    #[default]
    Close,
    Average,
}

impl ValueField {
    /// Select the configured reading from one candle. `Average` is the
    /// arithmetic mean of the four price fields.
    pub fn pick(&self, low: f64, high: f64, open: f64, close: f64) -> f64 {
        match self {
            ValueField::Open => open,
            ValueField::High => high,
            ValueField::Low => low,
            ValueField::Close => close,
            ValueField::Average => (low + high + open + close) / 4.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ValueField::Open => "open",
            ValueField::High => "high",
            ValueField::Low => "low",
            ValueField::Close => "close",
            ValueField::Average => "average",
        }
    }
}

/// Maker order side as reported by the matches channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MakerSide {
    Buy,
    Sell,
}

impl MakerSide {
    /// The feed's `side` field is the resting (maker) order side. From the
    /// taker's perspective this is inverted: a maker sell was bought into,
    /// a maker buy was sold into.
    pub fn taker(self) -> TakerSide {
        match self {
            MakerSide::Buy => TakerSide::Sell,
            MakerSide::Sell => TakerSide::Buy,
        }
    }
}

/// Trade side from the taker's perspective, used for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TakerSide {
    Buy,
    Sell,
    #[default]
    None,
}

impl TakerSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            TakerSide::Buy => "buy",
            TakerSide::Sell => "sell",
            TakerSide::None => "none",
        }
    }

    pub fn is_buy(&self) -> bool {
        matches!(self, TakerSide::Buy)
    }
}

impl std::fmt::Display for TakerSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One snapshot bucket with the pre-selected value field and its display
/// label. The label is derived once per bucket at parse time, not per render.
#[derive(Debug, Clone, PartialEq)]
pub struct Candle {
    /// Bucket start time, unix seconds.
    pub ts: i64,
    pub low: f64,
    pub high: f64,
    pub open: f64,
    pub close: f64,
    pub volume: f64,
    /// The configured value-field reading. The one field the live overlay
    /// may overwrite in place.
    pub value: f64,
    pub label: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_granularity_seconds() {
        assert_eq!(Granularity::M1.seconds(), 60);
        assert_eq!(Granularity::M5.seconds(), 300);
        assert_eq!(Granularity::M15.seconds(), 900);
        assert_eq!(Granularity::H1.seconds(), 3600);
        assert_eq!(Granularity::H6.seconds(), 21600);
        assert_eq!(Granularity::D1.seconds(), 86400);
    }

    #[test]
    fn test_granularity_deserialize() {
        let granularity: Granularity = serde_json::from_str("\"15m\"").unwrap();
        assert_eq!(granularity, Granularity::M15);
        assert!(serde_json::from_str::<Granularity>("\"2h\"").is_err());
    }

    #[test]
    fn test_value_field_pick() {
        // low=10, high=20, open=12, close=18
        assert_eq!(ValueField::Low.pick(10.0, 20.0, 12.0, 18.0), 10.0);
        assert_eq!(ValueField::High.pick(10.0, 20.0, 12.0, 18.0), 20.0);
        assert_eq!(ValueField::Open.pick(10.0, 20.0, 12.0, 18.0), 12.0);
        assert_eq!(ValueField::Close.pick(10.0, 20.0, 12.0, 18.0), 18.0);
        assert_eq!(ValueField::Average.pick(10.0, 20.0, 12.0, 18.0), 15.0);
    }

    #[test]
    fn test_maker_side_inversion() {
        assert_eq!(MakerSide::Sell.taker(), TakerSide::Buy);
        assert_eq!(MakerSide::Buy.taker(), TakerSide::Sell);
    }

    #[test]
    fn test_maker_side_deserialize() {
        let side: MakerSide = serde_json::from_str("\"sell\"").unwrap();
        assert_eq!(side, MakerSide::Sell);
    }
}
