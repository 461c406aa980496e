use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use rust_decimal::Decimal;
use serde::Deserialize;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use tradrx_core::{BridgeError, TradingPair};

use crate::symbols;

/// Establishes one stream connection per call. The seam exists so the
/// feed's reconnect behavior is testable without a network.
#[async_trait]
pub trait StreamConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn StreamHandle>, BridgeError>;
}

/// An established stream connection.
#[async_trait]
pub trait StreamHandle: Send {
    /// Next text payload. `None` means the upstream closed cleanly.
    async fn next_message(&mut self) -> Option<Result<String, BridgeError>>;

    /// Keep-alive probe.
    async fn ping(&mut self) -> Result<(), BridgeError>;
}

/// Live connector for the Binance combined ticker stream.
pub struct BinanceStreamConnector {
    url: String,
}

impl BinanceStreamConnector {
    /// `base_url` is the websocket endpoint, e.g.
    /// `wss://stream.binance.com:9443/ws`; one `@ticker` stream per
    /// symbol is combined into a single connection.
    pub fn new(base_url: &str, binance_symbols: &[String]) -> Self {
        let streams: Vec<String> = binance_symbols
            .iter()
            .map(|s| format!("{}@ticker", s.to_lowercase()))
            .collect();
        Self {
            url: format!("{}/{}", base_url.trim_end_matches('/'), streams.join("/")),
        }
    }

    pub fn for_all_pairs(base_url: &str) -> Self {
        Self::new(base_url, &symbols::binance_symbols())
    }
}

#[async_trait]
impl StreamConnector for BinanceStreamConnector {
    async fn connect(&self) -> Result<Box<dyn StreamHandle>, BridgeError> {
        let (ws, _) = connect_async(&self.url)
            .await
            .map_err(|e| BridgeError::Network(e.to_string()))?;
        Ok(Box::new(WsStreamHandle { ws }))
    }
}

struct WsStreamHandle {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl StreamHandle for WsStreamHandle {
    async fn next_message(&mut self) -> Option<Result<String, BridgeError>> {
        loop {
            match self.ws.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text)),
                Ok(Message::Ping(payload)) => {
                    if let Err(e) = self.ws.send(Message::Pong(payload)).await {
                        return Some(Err(BridgeError::Network(e.to_string())));
                    }
                }
                Ok(Message::Close(_)) => return None,
                // Binary and stray pong/raw frames carry nothing for us.
                Ok(_) => continue,
                Err(e) => return Some(Err(BridgeError::Network(e.to_string()))),
            }
        }
    }

    async fn ping(&mut self) -> Result<(), BridgeError> {
        self.ws
            .send(Message::Ping(Vec::new()))
            .await
            .map_err(|e| BridgeError::Network(e.to_string()))
    }
}

/// Inbound 24h ticker frame, subset of fields the bridge uses.
#[derive(Debug, Deserialize)]
struct TickerFrame {
    /// Event type, "24hrTicker" for the frames we consume.
    #[serde(rename = "e")]
    event: String,
    /// Binance symbol, e.g. "BTCUSDT".
    #[serde(rename = "s")]
    symbol: String,
    /// Last price.
    #[serde(rename = "c")]
    last_price: Decimal,
    /// 24h price change percent.
    #[serde(rename = "P")]
    change_percent: Decimal,
}

/// Normalize one inbound text payload.
///
/// `Err` is a malformed payload (caller logs and drops it), `Ok(None)`
/// is a well-formed frame we do not consume (other event types,
/// unmapped symbols), `Ok(Some)` is a price update.
pub fn parse_ticker(text: &str) -> Result<Option<TradingPair>, BridgeError> {
    let frame: TickerFrame =
        serde_json::from_str(text).map_err(|e| BridgeError::Parse(e.to_string()))?;

    if frame.event != "24hrTicker" {
        return Ok(None);
    }

    let Some(mapping) = symbols::by_binance_symbol(&frame.symbol) else {
        return Ok(None);
    };

    Ok(Some(TradingPair {
        symbol: mapping.pair.to_string(),
        price: frame.last_price,
        change_percent_24h: frame.change_percent,
    }))
}
