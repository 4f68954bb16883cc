//! Per-product configuration and app-level settings.
//!
//! Configuration is read once at startup from a JSON file and is immutable
//! for the lifetime of the process.

use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::error::ChartError;
use crate::market::types::{Granularity, ValueField};

/// Immutable per-product settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SymbolConfig {
    /// Product id, e.g. "BTC-USD".
    pub product: String,
    #[serde(default = "default_granularity")]
    pub granularity: Granularity,
    #[serde(default)]
    pub value_field: ValueField,
    /// Fiat-quoted products get "$" and two decimals in tables.
    #[serde(default)]
    pub fiat: bool,
    /// Draw a flat average line over the chart window.
    #[serde(default)]
    pub draw_average: bool,
    /// Overlay the latest streamed trade price onto the last candle.
    #[serde(default)]
    pub live_chart: bool,
    #[serde(default = "default_line_color")]
    pub line_color: String,
}

impl SymbolConfig {
    pub fn new(product: impl Into<String>) -> Self {
        Self {
            product: product.into(),
            granularity: default_granularity(),
            value_field: ValueField::default(),
            fiat: true,
            draw_average: false,
            live_chart: true,
            line_color: default_line_color(),
        }
    }
}

fn default_granularity() -> Granularity {
    Granularity::M5
}

fn default_line_color() -> String {
    "yellow".to_string()
}

/// App-level settings with the tracked product list.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub symbols: Vec<SymbolConfig>,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
    #[serde(default = "default_fetch_interval_secs")]
    pub fetch_interval_secs: u64,
    #[serde(default = "default_render_interval_ms")]
    pub render_interval_ms: u64,
    /// Token bucket shared across all products: capacity and refill per
    /// second for outbound snapshot requests.
    #[serde(default = "default_rate_limit_per_sec")]
    pub rate_limit_per_sec: u32,
    #[serde(default = "default_reconnect_delay_secs")]
    pub reconnect_delay_secs: u64,
}

fn default_api_url() -> String {
    "https://api.pro.coinbase.com".to_string()
}

fn default_ws_url() -> String {
    "wss://ws-feed.pro.coinbase.com".to_string()
}

fn default_fetch_interval_secs() -> u64 {
    30
}

fn default_render_interval_ms() -> u64 {
    150
}

fn default_rate_limit_per_sec() -> u32 {
    3
}

fn default_reconnect_delay_secs() -> u64 {
    2
}

impl Default for Config {
    fn default() -> Self {
        Self {
            symbols: vec![
                SymbolConfig::new("BTC-USD"),
                SymbolConfig::new("ETH-USD"),
                SymbolConfig::new("LTC-USD"),
            ],
            api_url: default_api_url(),
            ws_url: default_ws_url(),
            fetch_interval_secs: default_fetch_interval_secs(),
            render_interval_ms: default_render_interval_ms(),
            rate_limit_per_sec: default_rate_limit_per_sec(),
            reconnect_delay_secs: default_reconnect_delay_secs(),
        }
    }
}

impl Config {
    /// Load from the path in `CRYPTOCHARTS_CONFIG` (default `config.json`).
    /// A missing file falls back to the built-in defaults; a file that
    /// exists but does not parse is a startup error.
    pub fn load_default() -> Result<Self, ChartError> {
        let path =
            std::env::var("CRYPTOCHARTS_CONFIG").unwrap_or_else(|_| "config.json".to_string());
        Self::load(&path)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ChartError> {
        let path = path.as_ref();
        if !path.exists() {
            info!("no config file at {}, using defaults", path.display());
            return Ok(Self::default().with_env_overrides());
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|e| ChartError::Config(format!("{}: {e}", path.display())))?;
        let config: Config = serde_json::from_str(&raw)
            .map_err(|e| ChartError::Config(format!("{}: {e}", path.display())))?;

        if config.symbols.is_empty() {
            return Err(ChartError::Config("no symbols configured".to_string()));
        }

        info!(
            symbols = config.symbols.len(),
            "loaded config from {}",
            path.display()
        );
        Ok(config.with_env_overrides())
    }

    /// `CRYPTOCHARTS_API_URL` / `CRYPTOCHARTS_WS_URL` take precedence over
    /// the file for pointing the dashboard at a different endpoint.
    fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var("CRYPTOCHARTS_API_URL") {
            self.api_url = url;
        }
        if let Ok(url) = std::env::var("CRYPTOCHARTS_WS_URL") {
            self.ws_url = url;
        }
        self
    }

    pub fn products(&self) -> Vec<String> {
        self.symbols.iter().map(|s| s.product.clone()).collect()
    }
}
