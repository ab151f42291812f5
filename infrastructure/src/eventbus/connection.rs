//! WebSocket event-bus connection.
//!
//! One background task owns the socket. Outgoing frames are queued on an
//! unbounded channel, so callers never block and frames sent before the socket
//! opens are flushed once it does. Incoming `rec` / `err` frames are routed to
//! the handler registered for their address.

use super::frame::{BridgeFrame, websocket_url};
use busgate_application::{
    DeliveryError, EventBusConnection, EventBusConnector, InboundFrame, MessageHandler,
    OpenHandler, TransportError,
};
use futures::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// Default keep-alive ping interval expected by the bridge
pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(5);

/// Opens [`WebSocketConnection`]s on the current tokio runtime.
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    ping_interval: Duration,
}

impl Default for WebSocketConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl WebSocketConnector {
    pub fn new() -> Self {
        Self {
            ping_interval: DEFAULT_PING_INTERVAL,
        }
    }

    pub fn with_ping_interval(mut self, interval: Duration) -> Self {
        if !interval.is_zero() {
            self.ping_interval = interval;
        }
        self
    }

    pub fn ping_interval(&self) -> Duration {
        self.ping_interval
    }
}

impl EventBusConnector for WebSocketConnector {
    fn open(&self, endpoint: &str) -> Result<Arc<dyn EventBusConnection>, TransportError> {
        let url = websocket_url(endpoint)?;
        let runtime = Handle::try_current().map_err(|_| TransportError::NoRuntime)?;

        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
        let state = Arc::new(ConnectionState::default());
        let cancel = CancellationToken::new();

        debug!(url = %url, "Opening event-bus connection");
        runtime.spawn(socket_loop(
            url,
            Arc::clone(&state),
            outgoing_rx,
            cancel.clone(),
            self.ping_interval,
        ));

        Ok(Arc::new(WebSocketConnection {
            state,
            outgoing: outgoing_tx,
            cancel,
        }))
    }
}

/// State shared between the connection handle and its socket task.
#[derive(Default)]
struct ConnectionState {
    open: AtomicBool,
    closed: AtomicBool,
    open_handlers: Mutex<Vec<OpenHandler>>,
    /// Address -> handler. Handlers are cloned out before being called.
    handlers: RwLock<HashMap<String, MessageHandler>>,
}

impl ConnectionState {
    fn mark_open(&self) {
        let pending = {
            let mut handlers = self
                .open_handlers
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            self.open.store(true, Ordering::SeqCst);
            std::mem::take(&mut *handlers)
        };
        for handler in pending {
            handler();
        }
    }

    fn mark_closed(&self) {
        self.open.store(false, Ordering::SeqCst);
        self.closed.store(true, Ordering::SeqCst);
    }

    fn handler_for(&self, address: &str) -> Option<MessageHandler> {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(address)
            .cloned()
    }

    /// Route one text frame from the server.
    fn dispatch_text(&self, text: &str) {
        trace!("Bridge received: {}", text);
        let frame = match BridgeFrame::from_text(text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Bridge: skipping unparseable frame: {}", e);
                return;
            }
        };

        match frame {
            BridgeFrame::Rec { address, body } => match self.handler_for(&address) {
                Some(handler) => handler(Ok(InboundFrame::new(address, body))),
                None => debug!("Bridge: no handler for address={}", address),
            },
            BridgeFrame::Err {
                address: Some(address),
                message,
            } => match self.handler_for(&address) {
                Some(handler) => handler(Err(DeliveryError::new(address, message))),
                None => warn!("Bridge error on {}: {}", address, message),
            },
            BridgeFrame::Err {
                address: None,
                message,
            } => warn!("Bridge error: {}", message),
            BridgeFrame::Pong => trace!("Bridge: pong"),
            other => debug!("Bridge: ignoring client-side frame from server: {:?}", other),
        }
    }
}

/// Handle to a live bridge connection.
///
/// Dropping it stops the socket task.
pub struct WebSocketConnection {
    state: Arc<ConnectionState>,
    outgoing: mpsc::UnboundedSender<BridgeFrame>,
    cancel: CancellationToken,
}

impl WebSocketConnection {
    fn enqueue(&self, frame: BridgeFrame) -> Result<(), TransportError> {
        if self.state.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        self.outgoing
            .send(frame)
            .map_err(|_| TransportError::Closed)
    }
}

impl EventBusConnection for WebSocketConnection {
    fn on_open(&self, handler: OpenHandler) {
        let mut handlers = self
            .state
            .open_handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if self.state.open.load(Ordering::SeqCst) {
            drop(handlers);
            handler();
        } else {
            handlers.push(handler);
        }
    }

    fn register_handler(
        &self,
        address: &str,
        handler: MessageHandler,
    ) -> Result<(), TransportError> {
        self.state
            .handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(address.to_string(), handler);
        self.enqueue(BridgeFrame::Register {
            address: address.to_string(),
        })
    }

    fn send(&self, address: &str, payload: String) -> Result<(), TransportError> {
        self.enqueue(BridgeFrame::Send {
            address: address.to_string(),
            body: payload,
        })
    }
}

impl Drop for WebSocketConnection {
    fn drop(&mut self) {
        debug!("WebSocketConnection dropping, stopping socket task");
        self.cancel.cancel();
    }
}

/// Background task: connect, then pump frames both ways until closed.
async fn socket_loop(
    url: String,
    state: Arc<ConnectionState>,
    mut outgoing: mpsc::UnboundedReceiver<BridgeFrame>,
    cancel: CancellationToken,
    ping_interval: Duration,
) {
    let connected = tokio::select! {
        _ = cancel.cancelled() => {
            state.mark_closed();
            return;
        }
        result = connect_async(url.as_str()) => result,
    };

    let ws_stream = match connected {
        Ok((ws_stream, _)) => ws_stream,
        Err(e) => {
            warn!("Event-bus connect to {} failed: {}", url, e);
            state.mark_closed();
            return;
        }
    };
    info!("Event-bus connected: {}", url);

    let (mut write, mut read) = ws_stream.split();
    state.mark_open();

    let mut ping = tokio::time::interval_at(
        tokio::time::Instant::now() + ping_interval,
        ping_interval,
    );

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                let _ = write.close().await;
                break;
            }

            frame = outgoing.recv() => {
                let Some(frame) = frame else {
                    break;
                };
                let text = match frame.to_text() {
                    Ok(text) => text,
                    Err(e) => {
                        warn!("Bridge: failed to encode frame: {}", e);
                        continue;
                    }
                };
                trace!("Bridge sending: {}", text);
                if let Err(e) = write.send(Message::Text(text)).await {
                    warn!("Bridge: write failed: {}", e);
                    break;
                }
            }

            _ = ping.tick() => {
                if let Ok(text) = BridgeFrame::Ping.to_text()
                    && let Err(e) = write.send(Message::Text(text)).await
                {
                    warn!("Bridge: ping failed: {}", e);
                    break;
                }
            }

            message = read.next() => match message {
                Some(Ok(Message::Text(text))) => state.dispatch_text(&text),
                Some(Ok(Message::Ping(data))) => {
                    if write.send(Message::Pong(data)).await.is_err() {
                        warn!("Bridge: failed to answer ping");
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    info!("Event-bus connection closed by server");
                    break;
                }
                Some(Err(e)) => {
                    warn!("Event-bus socket error: {}", e);
                    break;
                }
                Some(Ok(_)) => {}
            }
        }
    }

    state.mark_closed();
    debug!("Bridge: socket task ended");
}
