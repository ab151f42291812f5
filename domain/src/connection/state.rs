//! Gateway lifecycle state

use serde::{Deserialize, Serialize};

/// Lifecycle of a gateway.
///
/// Monotonic: the only legal transitions are to [`next`](Self::next).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayState {
    #[default]
    Uninitialized,
    /// Identity assigned, transport opening
    Initialized,
    /// Transport open, handshake in flight
    ConnectionOpen,
    /// Handshake done, subscriptions announced
    Ready,
}

impl GatewayState {
    /// The single state this one may advance to
    pub fn next(self) -> Option<GatewayState> {
        match self {
            GatewayState::Uninitialized => Some(GatewayState::Initialized),
            GatewayState::Initialized => Some(GatewayState::ConnectionOpen),
            GatewayState::ConnectionOpen => Some(GatewayState::Ready),
            GatewayState::Ready => None,
        }
    }

    pub fn is_initialized(self) -> bool {
        self >= GatewayState::Initialized
    }

    /// Transport is open (handshake may still be pending)
    pub fn is_connected(self) -> bool {
        self >= GatewayState::ConnectionOpen
    }

    pub fn is_ready(self) -> bool {
        self == GatewayState::Ready
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GatewayState::Uninitialized => "uninitialized",
            GatewayState::Initialized => "initialized",
            GatewayState::ConnectionOpen => "connection_open",
            GatewayState::Ready => "ready",
        }
    }
}

impl std::fmt::Display for GatewayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
