//! Live trade feed subscriber with automatic resubscribe.
//!
//! One persistent WebSocket connection for the lifetime of the process. On
//! connect a single subscription message covers every tracked product; on
//! disconnect the task reconnects and resubscribes on its own, leaving the
//! aggregator (and its accumulators) untouched.

use std::time::Duration;

use futures::{SinkExt, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use crate::market::state::SharedAggregator;
use crate::market::types::MakerSide;

/// Outbound subscription for the matches channel.
#[derive(Debug, Serialize)]
struct Subscribe<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    product_ids: &'a [String],
    channels: [&'static str; 1],
}

fn subscribe_message(products: &[String]) -> String {
    serde_json::to_string(&Subscribe {
        kind: "subscribe",
        product_ids: products,
        channels: ["matches"],
    })
    .unwrap_or_default()
}

/// Inbound feed messages. Only matches are meaningful; subscription acks,
/// heartbeats, and anything else land in `Ignored`.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum FeedMessage {
    #[serde(rename = "match")]
    Match(MatchEvent),
    #[serde(other)]
    Ignored,
}

/// A single trade match. Price and size arrive as strings on the wire.
#[derive(Debug, Clone, Deserialize)]
pub struct MatchEvent {
    pub product_id: String,
    pub price: String,
    pub side: MakerSide,
    pub size: String,
}

impl MatchEvent {
    pub fn price_f64(&self) -> Option<f64> {
        self.price.parse().ok()
    }

    pub fn size_f64(&self) -> Option<f64> {
        self.size.parse().ok()
    }
}

/// Spawn the feed task: connect, subscribe, dispatch matches into the
/// aggregator, reconnect on any failure until shutdown is signalled.
pub fn spawn_feed(
    aggregator: SharedAggregator,
    url: String,
    products: Vec<String>,
    reconnect_delay: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        info!("starting trade feed for {url}");
        let subscription = subscribe_message(&products);

        loop {
            if *shutdown.borrow() {
                break;
            }

            match connect_async(&url).await {
                Ok((ws_stream, _)) => {
                    info!("connected to trade feed at {url}");
                    let (mut write, mut read) = ws_stream.split();

                    if let Err(e) = write.send(Message::Text(subscription.clone().into())).await {
                        error!("failed to send subscription: {e}");
                    } else {
                        run_dispatch(&aggregator, &mut read, &mut shutdown).await;
                    }

                    if *shutdown.borrow() {
                        // Clean close, no further dispatch or reconnects.
                        let _ = write.send(Message::Close(None)).await;
                        break;
                    }
                    warn!("trade feed disconnected, will resubscribe");
                }
                Err(e) => {
                    error!("failed to connect to trade feed at {url}: {e}");
                }
            }

            tokio::select! {
                _ = shutdown.changed() => break,
                _ = tokio::time::sleep(reconnect_delay) => {}
            }
        }

        info!("trade feed stopped");
    })
}

/// Read messages until the connection drops or shutdown is signalled.
async fn run_dispatch<S>(
    aggregator: &SharedAggregator,
    read: &mut S,
    shutdown: &mut watch::Receiver<bool>,
) where
    S: Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                debug!("trade feed shutting down");
                return;
            }
            msg = read.next() => match msg {
                Some(Ok(Message::Text(text))) => match serde_json::from_str::<FeedMessage>(&text) {
                    Ok(FeedMessage::Match(event)) => {
                        let mut guard = aggregator.write().await;
                        guard.apply_match(&event);
                    }
                    Ok(FeedMessage::Ignored) => {}
                    Err(e) => {
                        debug!("dropping unparseable feed message: {e}");
                    }
                },
                Some(Ok(Message::Close(_))) => {
                    warn!("trade feed closed by server");
                    return;
                }
                // Pings and pongs are answered by tungstenite itself.
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    error!("trade feed error: {e}");
                    return;
                }
                None => {
                    warn!("trade feed stream ended");
                    return;
                }
            }
        }
    }
}
