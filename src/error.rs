use thiserror::Error;

/// Snapshot fetch failures. All variants are transient: the caller skips the
/// current cycle and retries on the next one, keeping the prior state.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("candle request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("candle request returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("malformed candle payload: {0}")]
    Decode(String),
}

/// All errors generated in `cryptocharts-tui`.
#[derive(Debug, Error)]
pub enum ChartError {
    #[error("config error: {0}")]
    Config(String),

    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("terminal error: {0}")]
    Terminal(#[from] std::io::Error),
}
