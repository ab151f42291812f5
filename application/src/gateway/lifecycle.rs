//! Connection lifecycle bookkeeping.
//!
//! Tracks the monotonic [`GatewayState`], the identity assigned at `init`, the
//! channel pair derived from it, and the queue of ready callbacks. Pure state:
//! no transport access, no callbacks invoked while the owner holds its lock.

use super::error::GatewayError;
use busgate_domain::{ChannelPair, ClientIdentity, GatewayState};

/// Callback run once the gateway reaches Ready.
pub type ReadyCallback = Box<dyn FnOnce() + Send>;

pub struct Lifecycle {
    state: GatewayState,
    identity: Option<ClientIdentity>,
    channels: Option<ChannelPair>,
    /// `Some` until the ready queue has been fully drained.
    ready_queue: Option<Vec<ReadyCallback>>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            state: GatewayState::Uninitialized,
            identity: None,
            channels: None,
            ready_queue: Some(Vec::new()),
        }
    }

    pub fn state(&self) -> GatewayState {
        self.state
    }

    pub fn identity(&self) -> Option<&ClientIdentity> {
        self.identity.as_ref()
    }

    pub fn channels(&self) -> Option<&ChannelPair> {
        self.channels.as_ref()
    }

    /// Assign the identity and move to Initialized.
    pub fn begin(&mut self, identity: ClientIdentity) -> Result<&ChannelPair, GatewayError> {
        if self.state != GatewayState::Uninitialized {
            return Err(GatewayError::AlreadyInitialized);
        }
        let channels = ChannelPair::for_client(&identity);
        self.identity = Some(identity);
        self.state = GatewayState::Initialized;
        Ok(self.channels.insert(channels))
    }

    /// Initialized -> ConnectionOpen. Returns false for any other starting state.
    pub fn mark_open(&mut self) -> bool {
        self.advance_from(GatewayState::Initialized)
    }

    /// ConnectionOpen -> Ready. Returns false for any other starting state.
    pub fn mark_ready(&mut self) -> bool {
        self.advance_from(GatewayState::ConnectionOpen)
    }

    fn advance_from(&mut self, expected: GatewayState) -> bool {
        if self.state != expected {
            return false;
        }
        match self.state.next() {
            Some(next) => {
                self.state = next;
                true
            }
            None => false,
        }
    }

    /// Channels, provided `init` has run.
    pub fn require_initialized(&self) -> Result<&ChannelPair, GatewayError> {
        self.channels.as_ref().ok_or(GatewayError::NotInitialized)
    }

    /// Channels, provided the transport has opened.
    pub fn require_connected(&self) -> Result<&ChannelPair, GatewayError> {
        let channels = self.require_initialized()?;
        if !self.state.is_connected() {
            return Err(GatewayError::NotConnected);
        }
        Ok(channels)
    }

    /// Queue `callback` for the Ready flush.
    ///
    /// Hands the callback back when the queue is already drained; the caller
    /// must then run it itself.
    pub fn queue_ready(&mut self, callback: ReadyCallback) -> Option<ReadyCallback> {
        match self.ready_queue.as_mut() {
            Some(queue) => {
                queue.push(callback);
                None
            }
            None => Some(callback),
        }
    }

    /// Take the callbacks queued so far.
    ///
    /// An empty batch closes the queue for good; later registrations are
    /// handed straight back by [`queue_ready`](Self::queue_ready).
    pub fn take_ready_batch(&mut self) -> Vec<ReadyCallback> {
        if !self.state.is_ready() {
            return Vec::new();
        }
        let batch = self
            .ready_queue
            .as_mut()
            .map(std::mem::take)
            .unwrap_or_default();
        if batch.is_empty() {
            self.ready_queue = None;
        }
        batch
    }
}

#[cfg(test)]
impl Lifecycle {
    fn queued_ready_callbacks(&self) -> usize {
        self.ready_queue.as_ref().map_or(0, Vec::len)
    }
}
