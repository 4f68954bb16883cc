//! Candle snapshot retrieval from the exchange REST API.

use chrono::{TimeZone, Utc};
use tracing::debug;

use crate::error::FetchError;
use crate::market::config::SymbolConfig;
use crate::market::types::{Candle, Granularity, ValueField};

/// Raw response row: [time, low, high, open, close, volume], newest-first.
pub type CandleRow = [f64; 6];

pub struct SnapshotFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl SnapshotFetcher {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    /// One request per call. Any transport, status, or decode failure means
    /// the caller skips this cycle; nothing is partially applied.
    pub async fn fetch(&self, cfg: &SymbolConfig) -> Result<Vec<Candle>, FetchError> {
        let url = format!(
            "{}/products/{}/candles?granularity={}",
            self.base_url,
            cfg.product,
            cfg.granularity.seconds()
        );

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::USER_AGENT, "cryptocharts-tui")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status()));
        }

        let rows: Vec<CandleRow> = response
            .json()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))?;

        debug!(product = %cfg.product, rows = rows.len(), "fetched candle snapshot");
        Ok(parse_candles(&rows, cfg.value_field, cfg.granularity))
    }
}

/// Convert raw rows into candles, selecting the configured value field and
/// pre-formatting the display label once per bucket. Row order is preserved
/// (newest-first, as the API delivers it); the engine reverses on merge.
pub fn parse_candles(
    rows: &[CandleRow],
    value_field: ValueField,
    granularity: Granularity,
) -> Vec<Candle> {
    rows.iter()
        .map(|row| {
            let [ts, low, high, open, close, volume] = *row;
            let ts = ts as i64;
            Candle {
                ts,
                low,
                high,
                open,
                close,
                volume,
                value: value_field.pick(low, high, open, close),
                label: bucket_label(ts, granularity),
            }
        })
        .collect()
}

fn bucket_label(ts: i64, granularity: Granularity) -> String {
    let time = Utc.timestamp_opt(ts, 0).single().unwrap_or_default();
    time.format(granularity.label_format()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    // [time, low, high, open, close, volume]
    const ROWS: [CandleRow; 3] = [
        [1700000600.0, 104.0, 111.0, 110.0, 105.0, 3.0],
        [1700000300.0, 99.0, 112.0, 100.0, 110.0, 2.0],
        [1700000000.0, 95.0, 101.0, 96.0, 100.0, 1.0],
    ];

    #[test]
    fn test_parse_preserves_feed_order() {
        let candles = parse_candles(&ROWS, ValueField::Close, Granularity::M5);
        assert_eq!(candles.len(), 3);
        // newest-first, exactly as delivered
        assert_eq!(candles[0].ts, 1700000600);
        assert_eq!(candles[2].ts, 1700000000);
    }

    #[test]
    fn test_parse_selects_value_field() {
        let closes = parse_candles(&ROWS, ValueField::Close, Granularity::M5);
        assert_eq!(closes[0].value, 105.0);

        let lows = parse_candles(&ROWS, ValueField::Low, Granularity::M5);
        assert_eq!(lows[0].value, 104.0);

        let averages = parse_candles(&ROWS, ValueField::Average, Granularity::M5);
        assert_eq!(averages[0].value, (104.0 + 111.0 + 110.0 + 105.0) / 4.0);
    }

    #[test]
    fn test_parse_payload_json() {
        let raw = "[[1700000600, 104.0, 111.0, 110.0, 105.0, 3.0]]";
        let rows: Vec<CandleRow> = serde_json::from_str(raw).unwrap();
        let candles = parse_candles(&rows, ValueField::Close, Granularity::M5);
        assert_eq!(candles[0].close, 105.0);
        assert_eq!(candles[0].volume, 3.0);
    }

    #[test]
    fn test_bucket_labels_by_granularity() {
        // 2023-11-14 22:13:20 UTC
        let ts = 1700000000;
        assert_eq!(bucket_label(ts, Granularity::M1), "22:13");
        assert_eq!(bucket_label(ts, Granularity::M15), "22:13");
        assert_eq!(bucket_label(ts, Granularity::H1), "Nov 14 22:13");
        assert_eq!(bucket_label(ts, Granularity::H6), "Nov 14");
        assert_eq!(bucket_label(ts, Granularity::D1), "Nov 14");
    }
}
