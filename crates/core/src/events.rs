use crate::models::TradingPair;
use serde::{Deserialize, Serialize};

/// Notifications broadcast by the bridge to its subscribers (the UI
/// layer and any diagnostics listeners).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BridgeEvent {
    /// A normalized price tick from either feed.
    Price(TradingPair),
    /// The streaming feed completed its handshake.
    StreamConnected,
    /// The streaming feed dropped; a reconnect may follow.
    StreamDisconnected { reason: String },
    /// The streaming feed exhausted its retry budget. Emitted exactly
    /// once per permanent failure; polling continues regardless.
    StreamFailed { attempts: u32 },
}
