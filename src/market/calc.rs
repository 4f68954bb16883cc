//! Metric math for the derived per-product statistics.

use crate::market::types::Granularity;

/// A lookback distance in buckets with its display label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Horizon {
    pub offset: usize,
    pub label: &'static str,
}

const fn h(offset: usize, label: &'static str) -> Horizon {
    Horizon { offset, label }
}

/// Fixed 5-entry lookback tables per granularity. Adding a `Granularity`
/// variant requires extending this table in lockstep; there is no dynamic
/// derivation.
pub fn horizons(granularity: Granularity) -> [Horizon; 5] {
    match granularity {
        Granularity::M1 => [
            h(1, " 1m"),
            h(6, " 5m"),
            h(16, "15m"),
            h(31, "30m"),
            h(61, " 1h"),
        ],
        Granularity::M5 => [
            h(1, " 5m"),
            h(6, "30m"),
            h(12, " 1h"),
            h(144, "12h"),
            h(287, " 1d"),
        ],
        Granularity::M15 => [
            h(1, "15m"),
            h(2, "30m"),
            h(4, " 1h"),
            h(8, " 2h"),
            h(16, " 4h"),
        ],
        Granularity::H1 => [
            h(1, " 1h"),
            h(2, " 2h"),
            h(5, " 5h"),
            h(12, "12h"),
            h(24, " 1d"),
        ],
        Granularity::H6 => [
            h(1, " 6h"),
            h(2, "12h"),
            h(4, " 1d"),
            h(8, " 2d"),
            h(16, " 4d"),
        ],
        Granularity::D1 => [
            h(1, " 1d"),
            h(2, " 2d"),
            h(7, " 1w"),
            h(14, " 2w"),
            h(28, " 1m"),
        ],
    }
}

/// Percent change from `old` to `new`. A zero base yields 0 rather than
/// dividing by zero.
pub fn percent_change(old: f64, new: f64) -> f64 {
    if old == 0.0 {
        0.0
    } else {
        (new - old) / old * 100.0
    }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub fn high(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }
}

pub fn low(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().copied().fold(f64::INFINITY, f64::min)
    }
}

/// Percent change at each of the granularity's 5 horizons, computed from an
/// oldest-first value series against its newest value. Horizons the series
/// cannot reach yet are `None`; the lookup never indexes out of bounds.
pub fn horizon_changes(values: &[f64], granularity: Granularity) -> [Option<f64>; 5] {
    let mut changes = [None; 5];
    let Some(&rate) = values.last() else {
        return changes;
    };

    for (slot, horizon) in changes.iter_mut().zip(horizons(granularity)) {
        if horizon.offset < values.len() {
            let old = values[values.len() - 1 - horizon.offset];
            *slot = Some(percent_change(old, rate));
        }
    }

    changes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_change() {
        assert_eq!(percent_change(100.0, 110.0), 10.0);
        assert_eq!(percent_change(100.0, 90.0), -10.0);
        assert_eq!(percent_change(100.0, 100.0), 0.0);
    }

    #[test]
    fn test_percent_change_zero_base_is_defined() {
        assert_eq!(percent_change(0.0, 123.45), 0.0);
        assert_eq!(percent_change(0.0, -1.0), 0.0);
        assert_eq!(percent_change(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_mean_high_low_bounds() {
        let values = [100.0, 110.0, 105.0, 95.0];
        let (lo, hi, avg) = (low(&values), high(&values), mean(&values));
        assert_eq!(lo, 95.0);
        assert_eq!(hi, 110.0);
        assert_eq!(avg, 102.5);
        assert!(lo <= avg && avg <= hi);
        for value in values {
            assert!(lo <= value && value <= hi);
        }
    }

    #[test]
    fn test_empty_series_statistics() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(high(&[]), 0.0);
        assert_eq!(low(&[]), 0.0);
    }

    #[test]
    fn test_every_table_has_five_ordered_horizons() {
        for granularity in [
            Granularity::M1,
            Granularity::M5,
            Granularity::M15,
            Granularity::H1,
            Granularity::H6,
            Granularity::D1,
        ] {
            let table = horizons(granularity);
            assert_eq!(table.len(), 5);
            for pair in table.windows(2) {
                assert!(pair[0].offset < pair[1].offset, "{granularity}");
            }
        }
    }

    #[test]
    fn test_horizon_labels_for_one_minute() {
        let labels: Vec<_> = horizons(Granularity::M1).iter().map(|h| h.label).collect();
        assert_eq!(labels, vec![" 1m", " 5m", "15m", "30m", " 1h"]);
    }

    #[test]
    fn test_horizon_changes_short_series_is_guarded() {
        // 1m horizons reach back 61 buckets; 3 values only support offset 1.
        let values = [100.0, 102.0, 104.0];
        let changes = horizon_changes(&values, Granularity::M1);
        assert_eq!(changes.len(), 5);
        assert!((changes[0].unwrap() - percent_change(102.0, 104.0)).abs() < 1e-9);
        assert_eq!(&changes[1..], &[None, None, None, None]);
    }

    #[test]
    fn test_horizon_changes_empty_series() {
        assert_eq!(horizon_changes(&[], Granularity::M5), [None; 5]);
    }

    #[test]
    fn test_horizon_changes_full_series() {
        // 62 values climbing by 1 each bucket; every 1m horizon is in range.
        let values: Vec<f64> = (0..62).map(|i| 100.0 + i as f64).collect();
        let changes = horizon_changes(&values, Granularity::M1);
        assert!(changes.iter().all(|c| c.is_some()));
        // 1-bucket change: from 160 to 161
        assert!((changes[0].unwrap() - percent_change(160.0, 161.0)).abs() < 1e-9);
        // 61-bucket change: from 100 to 161
        assert!((changes[4].unwrap() - 61.0).abs() < 1e-9);
    }
}
