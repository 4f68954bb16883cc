/// Cryptocharts dashboard
///
/// One line chart per configured product plus chart stats, percent change,
/// and live trade tables, all fed by the shared aggregation engine:
/// rate-limited snapshot polling merged with a live trade-match feed.
use std::{error::Error, io, sync::Arc, time::Duration, time::Instant};

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use rustls::crypto::ring::default_provider;
use tokio::sync::{watch, RwLock};
use tracing::info;

use cryptocharts_tui::{market, Aggregator, Config, RateLimiter, SnapshotFetcher};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let _ = default_provider().install_default();
    init_logging();

    let config = Config::load_default()?;
    info!(
        products = ?config.products(),
        "starting cryptocharts dashboard"
    );

    // Setup panic hook to restore terminal on crash
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
        original_hook(panic_info);
    }));

    // Shared aggregation engine and its two writer tasks
    let aggregator = Arc::new(RwLock::new(Aggregator::new(config.symbols.clone())));
    let fetcher = Arc::new(SnapshotFetcher::new(config.api_url.clone()));
    let limiter = Arc::new(RateLimiter::new(
        config.rate_limit_per_sec,
        config.rate_limit_per_sec as f64,
    ));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    market::spawn_fetch_loop(
        Arc::clone(&aggregator),
        fetcher,
        limiter,
        config.symbols.clone(),
        Duration::from_secs(config.fetch_interval_secs),
        shutdown_rx.clone(),
    );
    market::feed::spawn_feed(
        Arc::clone(&aggregator),
        config.ws_url.clone(),
        config.products(),
        Duration::from_secs(config.reconnect_delay_secs),
        shutdown_rx,
    );

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Render loop: reads already-materialized state on its own tick
    let render_interval = Duration::from_millis(config.render_interval_ms);
    let mut last_draw = Instant::now() - render_interval;

    let result = loop {
        if event::poll(Duration::from_millis(5))? {
            if let Event::Key(key) = event::read()? {
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => break Ok(()),
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        break Ok(())
                    }
                    _ => {}
                }
            }
        }

        if last_draw.elapsed() >= render_interval {
            let snapshot = { aggregator.read().await.snapshot() };
            terminal.draw(|frame| market::widget::draw(frame, &snapshot))?;
            last_draw = Instant::now();
        }
    };

    // Stop the fetch loop and the feed; in-flight fetches finish naturally
    let _ = shutdown_tx.send(true);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    info!("cryptocharts dashboard stopped");
    result
}

/// Initialize logging. Logs go to stderr so they stay out of the dashboard;
/// redirect stderr to a file to capture them.
fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();
}
