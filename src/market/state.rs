//! Per-product aggregate state and the engine that owns its mutation.
//!
//! Two writers touch a `SymbolState`: snapshot merges replace the candle
//! series and recompute derived metrics; stream matches update the trade
//! accumulator and may overlay the last candle's value. The renderer only
//! ever reads cloned snapshots.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::market::calc;
use crate::market::config::SymbolConfig;
use crate::market::feed::MatchEvent;
use crate::market::types::{Candle, MakerSide, TakerSide};

/// Running totals since process start. Never reset during a run, in
/// particular not by feed reconnects.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TradeAccumulator {
    pub last_price: f64,
    pub last_side: TakerSide,
    pub last_size: f64,
    /// Base volume takers bought (into maker sell orders).
    pub bought: f64,
    /// Base volume takers sold (into maker buy orders).
    pub sold: f64,
    pub buy_count: u64,
    pub sell_count: u64,
}

impl TradeAccumulator {
    /// True once at least one match has been applied.
    pub fn has_trades(&self) -> bool {
        self.last_side != TakerSide::None
    }
}

/// Statistics recomputed in full on every successful snapshot merge.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DerivedMetrics {
    /// Latest value-field reading (newest bucket).
    pub rate: f64,
    pub average: f64,
    pub high: f64,
    pub low: f64,
    /// Percent change at the granularity's 5 horizons; `None` while the
    /// series is still too short for a horizon.
    pub change: [Option<f64>; 5],
}

/// The single source of truth for one tracked product.
#[derive(Debug, Clone)]
pub struct SymbolState {
    pub config: SymbolConfig,
    /// Oldest-first candle series, replaced wholesale on each merge.
    pub series: Vec<Candle>,
    pub metrics: DerivedMetrics,
    pub trades: TradeAccumulator,
}

impl SymbolState {
    fn new(config: SymbolConfig) -> Self {
        Self {
            config,
            series: Vec::new(),
            metrics: DerivedMetrics::default(),
            trades: TradeAccumulator::default(),
        }
    }
}

/// Owns every `SymbolState` write. Tasks share it behind `Arc<RwLock>`.
pub type SharedAggregator = Arc<RwLock<Aggregator>>;

#[derive(Debug)]
pub struct Aggregator {
    symbols: Vec<SymbolState>,
}

impl Aggregator {
    pub fn new(configs: Vec<SymbolConfig>) -> Self {
        Self {
            symbols: configs.into_iter().map(SymbolState::new).collect(),
        }
    }

    pub fn symbol(&self, product: &str) -> Option<&SymbolState> {
        self.symbols.iter().find(|s| s.config.product == product)
    }

    fn symbol_mut(&mut self, product: &str) -> Option<&mut SymbolState> {
        self.symbols.iter_mut().find(|s| s.config.product == product)
    }

    /// Replace a product's series with a fresh snapshot (newest-first, as
    /// fetched) and recompute its derived metrics. Snapshots for untracked
    /// products are ignored.
    pub fn merge_snapshot(&mut self, product: &str, mut series: Vec<Candle>) {
        let Some(state) = self.symbol_mut(product) else {
            return;
        };

        // Feed order is newest-first; the series is kept oldest-first.
        series.reverse();

        let values: Vec<f64> = series.iter().map(|c| c.value).collect();
        state.metrics = DerivedMetrics {
            rate: values.last().copied().unwrap_or(0.0),
            average: calc::mean(&values),
            high: calc::high(&values),
            low: calc::low(&values),
            change: calc::horizon_changes(&values, state.config.granularity),
        };
        state.series = series;
    }

    /// Apply one match from the live feed. Matches for untracked products
    /// and matches with unparseable numbers are dropped.
    pub fn apply_match(&mut self, event: &MatchEvent) {
        let (Some(price), Some(size)) = (event.price_f64(), event.size_f64()) else {
            return;
        };
        let Some(state) = self.symbol_mut(&event.product_id) else {
            return;
        };

        let trades = &mut state.trades;
        trades.last_price = price;
        trades.last_side = event.side.taker();
        trades.last_size = size;

        // Counters keyed to the maker side, matching the taker inversion:
        // a maker sell is volume the taker bought, and vice versa.
        match event.side {
            MakerSide::Sell => {
                trades.bought += size;
                trades.buy_count += 1;
            }
            MakerSide::Buy => {
                trades.sold += size;
                trades.sell_count += 1;
            }
        }

        // Live overlay: only the last bucket's value, only when enabled.
        // Metrics stay keyed to the last full snapshot merge.
        if state.config.live_chart {
            if let Some(last) = state.series.last_mut() {
                last.value = price;
            }
        }
    }

    /// Clone of the full state for the render path.
    pub fn snapshot(&self) -> Vec<SymbolState> {
        self.symbols.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::types::{Granularity, ValueField};

    fn candle(ts: i64, value: f64) -> Candle {
        Candle {
            ts,
            low: value,
            high: value,
            open: value,
            close: value,
            volume: 1.0,
            value,
            label: format!("{ts}"),
        }
    }

    fn match_event(product: &str, side: MakerSide, price: &str, size: &str) -> MatchEvent {
        let side = match side {
            MakerSide::Buy => "buy",
            MakerSide::Sell => "sell",
        };
        serde_json::from_str(&format!(
            r#"{{"product_id": "{product}", "price": "{price}", "side": "{side}", "size": "{size}"}}"#
        ))
        .unwrap()
    }

    fn btc_aggregator(live_chart: bool) -> Aggregator {
        let config = SymbolConfig {
            live_chart,
            granularity: Granularity::M1,
            value_field: ValueField::Close,
            ..SymbolConfig::new("BTC-USD")
        };
        Aggregator::new(vec![config])
    }

    #[test]
    fn test_merge_three_buckets_end_to_end() {
        let mut aggregator = btc_aggregator(false);
        // newest-first, as fetched: closes 105, 110, 100
        aggregator.merge_snapshot(
            "BTC-USD",
            vec![candle(300, 105.0), candle(240, 110.0), candle(180, 100.0)],
        );

        let state = aggregator.symbol("BTC-USD").unwrap();
        assert_eq!(state.metrics.rate, 105.0);
        assert_eq!(state.metrics.high, 110.0);
        assert_eq!(state.metrics.low, 100.0);
        assert_eq!(state.metrics.average, 105.0);
        // oldest-first after the merge, strictly increasing timestamps
        let ts: Vec<_> = state.series.iter().map(|c| c.ts).collect();
        assert_eq!(ts, vec![180, 240, 300]);
    }

    #[test]
    fn test_merge_recomputes_horizon_changes() {
        let mut aggregator = btc_aggregator(false);
        aggregator.merge_snapshot(
            "BTC-USD",
            vec![candle(300, 105.0), candle(240, 110.0), candle(180, 100.0)],
        );

        let state = aggregator.symbol("BTC-USD").unwrap();
        // 1-bucket horizon: 110 -> 105; everything longer is out of range
        assert!((state.metrics.change[0].unwrap() - (105.0 - 110.0) / 110.0 * 100.0).abs() < 1e-9);
        assert_eq!(&state.metrics.change[1..], &[None, None, None, None]);
    }

    #[test]
    fn test_merge_untracked_product_leaves_state_untouched() {
        let mut aggregator = btc_aggregator(false);
        aggregator.merge_snapshot("BTC-USD", vec![candle(180, 100.0)]);
        let before = aggregator.snapshot();

        aggregator.merge_snapshot("DOGE-USD", vec![candle(300, 1.0)]);

        let after = aggregator.snapshot();
        assert_eq!(before.len(), after.len());
        assert_eq!(before[0].series, after[0].series);
        assert_eq!(before[0].metrics, after[0].metrics);
    }

    #[test]
    fn test_skipped_cycle_keeps_prior_metrics() {
        // A failed fetch never reaches merge_snapshot; the previous cycle's
        // state must survive unchanged through the skipped cycle.
        let mut aggregator = btc_aggregator(false);
        aggregator.merge_snapshot("BTC-USD", vec![candle(240, 110.0), candle(180, 100.0)]);
        let before = aggregator.symbol("BTC-USD").unwrap().clone();

        let after = aggregator.symbol("BTC-USD").unwrap();
        assert_eq!(before.metrics, after.metrics);
        assert_eq!(before.series, after.series);
    }

    #[test]
    fn test_maker_sell_counts_as_taker_buy() {
        let mut aggregator = btc_aggregator(false);
        aggregator.apply_match(&match_event("BTC-USD", MakerSide::Sell, "100.5", "2.5"));

        let trades = &aggregator.symbol("BTC-USD").unwrap().trades;
        assert_eq!(trades.last_price, 100.5);
        assert_eq!(trades.last_side, TakerSide::Buy);
        assert_eq!(trades.bought, 2.5);
        assert_eq!(trades.buy_count, 1);
        assert_eq!(trades.sold, 0.0);
        assert_eq!(trades.sell_count, 0);
    }

    #[test]
    fn test_maker_buy_counts_as_taker_sell() {
        let mut aggregator = btc_aggregator(false);
        aggregator.apply_match(&match_event("BTC-USD", MakerSide::Buy, "99.0", "1.5"));

        let trades = &aggregator.symbol("BTC-USD").unwrap().trades;
        assert_eq!(trades.last_side, TakerSide::Sell);
        assert_eq!(trades.sold, 1.5);
        assert_eq!(trades.sell_count, 1);
        assert_eq!(trades.bought, 0.0);
        assert_eq!(trades.buy_count, 0);
    }

    #[test]
    fn test_match_for_untracked_product_is_ignored() {
        let mut aggregator = btc_aggregator(false);
        aggregator.apply_match(&match_event("DOGE-USD", MakerSide::Sell, "0.1", "10"));
        assert!(!aggregator.symbol("BTC-USD").unwrap().trades.has_trades());
    }

    #[test]
    fn test_match_with_unparseable_price_is_dropped() {
        let mut aggregator = btc_aggregator(false);
        aggregator.apply_match(&match_event("BTC-USD", MakerSide::Sell, "n/a", "2.5"));
        assert!(!aggregator.symbol("BTC-USD").unwrap().trades.has_trades());
    }

    #[test]
    fn test_overlay_replaces_only_last_value_when_enabled() {
        let mut aggregator = btc_aggregator(true);
        aggregator.merge_snapshot(
            "BTC-USD",
            vec![candle(300, 10.0), candle(240, 10.0), candle(180, 10.0)],
        );
        aggregator.apply_match(&match_event("BTC-USD", MakerSide::Sell, "12", "1"));

        let values: Vec<_> = aggregator
            .symbol("BTC-USD")
            .unwrap()
            .series
            .iter()
            .map(|c| c.value)
            .collect();
        assert_eq!(values, vec![10.0, 10.0, 12.0]);
    }

    #[test]
    fn test_overlay_disabled_leaves_series_alone() {
        let mut aggregator = btc_aggregator(false);
        aggregator.merge_snapshot(
            "BTC-USD",
            vec![candle(300, 10.0), candle(240, 10.0), candle(180, 10.0)],
        );
        aggregator.apply_match(&match_event("BTC-USD", MakerSide::Sell, "12", "1"));

        let values: Vec<_> = aggregator
            .symbol("BTC-USD")
            .unwrap()
            .series
            .iter()
            .map(|c| c.value)
            .collect();
        assert_eq!(values, vec![10.0, 10.0, 10.0]);
    }

    #[test]
    fn test_overlay_on_empty_series_is_a_noop() {
        let mut aggregator = btc_aggregator(true);
        aggregator.apply_match(&match_event("BTC-USD", MakerSide::Sell, "12", "1"));
        assert!(aggregator.symbol("BTC-USD").unwrap().series.is_empty());
    }

    #[test]
    fn test_counters_survive_resubscribe() {
        // The feed task reconnects without touching the aggregator; matches
        // applied after a resubscribe keep accumulating.
        let mut aggregator = btc_aggregator(false);
        for _ in 0..3 {
            aggregator.apply_match(&match_event("BTC-USD", MakerSide::Sell, "100", "1.0"));
        }

        // disconnect + resubscribe happens here, purely in the feed task

        for _ in 0..2 {
            aggregator.apply_match(&match_event("BTC-USD", MakerSide::Buy, "100", "0.5"));
        }

        let trades = &aggregator.symbol("BTC-USD").unwrap().trades;
        assert_eq!(trades.buy_count, 3);
        assert_eq!(trades.bought, 3.0);
        assert_eq!(trades.sell_count, 2);
        assert_eq!(trades.sold, 1.0);
    }

    #[test]
    fn test_counters_are_monotone() {
        let mut aggregator = btc_aggregator(false);
        let mut last = TradeAccumulator::default();
        for i in 0..10 {
            let side = if i % 2 == 0 {
                MakerSide::Sell
            } else {
                MakerSide::Buy
            };
            aggregator.apply_match(&match_event("BTC-USD", side, "100", "0.25"));
            let trades = aggregator.symbol("BTC-USD").unwrap().trades.clone();
            assert!(trades.bought >= last.bought);
            assert!(trades.sold >= last.sold);
            assert!(trades.buy_count >= last.buy_count);
            assert!(trades.sell_count >= last.sell_count);
            last = trades;
        }
    }
}
