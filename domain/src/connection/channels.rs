//! Channel naming for a client connection

use super::identity::ClientIdentity;

/// Prefix of the client → server channels.
///
/// The bare prefix is also the well-known handshake channel: the server cannot
/// route per-client traffic until the handshake has associated the identity.
pub const OUTBOUND_PREFIX: &str = "events.to.martians";

/// Prefix of the server → client channels.
pub const INBOUND_PREFIX: &str = "events.from.martians";

/// The two logical channels dedicated to one client.
///
/// Derived deterministically from the [`ClientIdentity`]; a gateway holds
/// exactly one pair for its whole lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelPair {
    inbound: String,
    outbound: String,
}

impl ChannelPair {
    /// Derive `<INBOUND_PREFIX>.<id>` / `<OUTBOUND_PREFIX>.<id>`
    pub fn for_client(id: &ClientIdentity) -> Self {
        Self {
            inbound: format!("{}.{}", INBOUND_PREFIX, id),
            outbound: format!("{}.{}", OUTBOUND_PREFIX, id),
        }
    }

    /// Channel the server pushes to (events and query responses)
    pub fn inbound(&self) -> &str {
        &self.inbound
    }

    /// Channel the client sends on once the session is established
    pub fn outbound(&self) -> &str {
        &self.outbound
    }

    /// Fixed channel used for the session handshake
    pub fn handshake() -> &'static str {
        OUTBOUND_PREFIX
    }
}
