//! Gateway facade.
//!
//! [`Gateway`] is the one object applications talk to. It owns the lifecycle
//! state, the subscription registry, and the pending query table behind a
//! single lock. The lock covers bookkeeping only: transport sends and user
//! callbacks always run after it is released, so callbacks may call back into
//! the gateway.

use super::correlator::{RequestCorrelator, Resolver, Ticket};
use super::dispatcher::{Inbound, classify};
use super::error::GatewayError;
use super::lifecycle::{Lifecycle, ReadyCallback};
use super::registry::{EventCallback, SubscriptionRegistry};
use crate::config::GatewayConfig;
use crate::ports::diagnostics::{DiagnosticEvent, DiagnosticKind, DiagnosticSink, NoDiagnostics};
use crate::ports::transport::{
    DeliveryError, EventBusConnection, EventBusConnector, InboundFrame, MessageHandler,
};
use busgate_domain::{
    ChannelPair, ClientIdentity, Event, GatewayState, Query, WireMessage, attach_request_id,
};
use futures::FutureExt;
use futures::future::{self, BoxFuture};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::{oneshot, watch};
use tracing::{debug, info, trace, warn};

/// Future returned by [`Gateway::execute`]
pub type QueryFuture = BoxFuture<'static, Result<Value, GatewayError>>;

struct GatewayCore {
    lifecycle: Lifecycle,
    registry: SubscriptionRegistry,
    correlator: RequestCorrelator,
    connection: Option<Arc<dyn EventBusConnection>>,
}

struct Shared {
    core: Mutex<GatewayCore>,
    connector: Arc<dyn EventBusConnector>,
    diagnostics: Arc<dyn DiagnosticSink>,
    config: GatewayConfig,
    ready: watch::Sender<bool>,
}

/// Handle to one gateway instance.
///
/// Cloning is cheap; all clones share the same connection, subscriptions and
/// pending queries. Transport handlers hold only weak references, so dropping
/// the last handle tears the instance down and abandons pending queries.
#[derive(Clone)]
pub struct Gateway {
    shared: Arc<Shared>,
}

impl Gateway {
    /// Gateway that discards diagnostics.
    pub fn new(connector: Arc<dyn EventBusConnector>, config: GatewayConfig) -> Self {
        Self::with_diagnostics(connector, config, Arc::new(NoDiagnostics))
    }

    /// Gateway routing server errors and delivery failures to `diagnostics`.
    pub fn with_diagnostics(
        connector: Arc<dyn EventBusConnector>,
        config: GatewayConfig,
        diagnostics: Arc<dyn DiagnosticSink>,
    ) -> Self {
        let (ready, _) = watch::channel(false);
        Self {
            shared: Arc::new(Shared {
                core: Mutex::new(GatewayCore {
                    lifecycle: Lifecycle::new(),
                    registry: SubscriptionRegistry::new(),
                    correlator: RequestCorrelator::new(),
                    connection: None,
                }),
                connector,
                diagnostics,
                config,
                ready,
            }),
        }
    }

    fn from_shared(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    fn core(&self) -> MutexGuard<'_, GatewayCore> {
        self.shared
            .core
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn weak(&self) -> Weak<Shared> {
        Arc::downgrade(&self.shared)
    }

    // ==================== Lifecycle ====================

    /// Assign the client identity and start connecting.
    ///
    /// Returns once the transport has been asked to open; readiness is
    /// signalled through [`on_ready`](Self::on_ready) /
    /// [`wait_ready`](Self::wait_ready). If the connector fails the gateway
    /// stays Initialized and is never reopened.
    pub fn init(&self, client_id: &str) -> Result<(), GatewayError> {
        let identity = ClientIdentity::new(client_id)?;
        self.core().lifecycle.begin(identity)?;
        info!(client_id, endpoint = %self.shared.config.endpoint, "Gateway initialized");

        let connection = self.shared.connector.open(&self.shared.config.endpoint)?;
        self.core().connection = Some(connection.clone());

        let weak = self.weak();
        connection.on_open(Box::new(move || {
            if let Some(shared) = weak.upgrade() {
                Gateway::from_shared(shared).handle_open();
            }
        }));
        Ok(())
    }

    fn handle_open(&self) {
        let (connection, channels, identity) = {
            let mut core = self.core();
            if !core.lifecycle.mark_open() {
                debug!("Ignoring duplicate open notification");
                return;
            }
            let (Some(connection), Some(channels), Some(identity)) = (
                core.connection.clone(),
                core.lifecycle.channels().cloned(),
                core.lifecycle.identity().cloned(),
            ) else {
                return;
            };
            (connection, channels, identity)
        };
        info!(inbound = channels.inbound(), "Connection open");

        let weak = self.weak();
        let handler: MessageHandler = Arc::new(move |delivery| {
            if let Some(shared) = weak.upgrade() {
                Gateway::from_shared(shared).handle_inbound(delivery);
            }
        });
        if let Err(e) = connection.register_handler(channels.inbound(), handler) {
            warn!(error = %e, "Failed to register inbound handler");
        }

        let weak = self.weak();
        let on_handshake: Resolver = Box::new(move |_response| {
            if let Some(shared) = weak.upgrade() {
                Gateway::from_shared(shared).complete_handshake();
            }
        });
        if let Err(e) = self.send_query(
            ChannelPair::handshake(),
            Query::Session,
            WireMessage::handshake_payload(&identity),
            on_handshake,
        ) {
            warn!(error = %e, "Session handshake could not be sent");
        }
    }

    fn complete_handshake(&self) {
        let (replay, connection, channels, identity) = {
            let mut core = self.core();
            if !core.lifecycle.mark_ready() {
                debug!("Ignoring handshake response outside ConnectionOpen");
                return;
            }
            let replay = core.registry.take_replay();
            (
                replay,
                core.connection.clone(),
                core.lifecycle.channels().cloned(),
                core.lifecycle.identity().cloned(),
            )
        };
        info!(replayed = replay.len(), "Gateway ready");

        if let (Some(connection), Some(channels), Some(identity)) =
            (connection, channels, identity)
        {
            for event in replay {
                announce(connection.as_ref(), &channels, &identity, event);
            }
        }

        self.flush_ready();
        self.shared.ready.send_replace(true);
    }

    fn flush_ready(&self) {
        loop {
            let batch = self.core().lifecycle.take_ready_batch();
            if batch.is_empty() {
                break;
            }
            for callback in batch {
                callback();
            }
        }
    }

    /// Run `callback` once the gateway is Ready.
    ///
    /// Callbacks registered before readiness run in registration order after
    /// the handshake and subscription replay; afterwards they run immediately.
    pub fn on_ready<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let callback: ReadyCallback = Box::new(callback);
        let immediate = self.core().lifecycle.queue_ready(callback);
        if let Some(callback) = immediate {
            callback();
        }
    }

    /// Resolve once the gateway is Ready and ready callbacks have run.
    pub async fn wait_ready(&self) {
        let mut ready = self.shared.ready.subscribe();
        // The sender lives as long as `self`, so this only ends on `true`.
        let _ = ready.wait_for(|ready| *ready).await;
    }

    // ==================== Events ====================

    /// Register `callback` for `event`.
    ///
    /// Allowed any time after `init`. When the gateway is already Ready and
    /// this is the event's first subscriber, a subscribe is sent right away;
    /// otherwise it is sent when the gateway becomes Ready. Subscribing to
    /// [`Event::All`] receives every catalog event and sends nothing.
    pub fn subscribe<F>(&self, event: Event, callback: F) -> Result<(), GatewayError>
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let callback: EventCallback = Arc::new(callback);
        let announcement = {
            let mut core = self.core();
            let channels = core.lifecycle.require_initialized()?.clone();
            let ready = core.lifecycle.state().is_ready();
            if core.registry.subscribe(event, callback, ready) {
                core.connection
                    .clone()
                    .zip(core.lifecycle.identity().cloned())
                    .map(|(connection, identity)| (connection, channels, identity))
            } else {
                None
            }
        };
        debug!(event = event.wire_type(), "Subscribed");

        if let Some((connection, channels, identity)) = announcement {
            announce(connection.as_ref(), &channels, &identity, event);
        }
        Ok(())
    }

    /// [`subscribe`](Self::subscribe) by symbolic or wire name.
    pub fn subscribe_named<F>(&self, name: &str, callback: F) -> Result<(), GatewayError>
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let event: Event = name.parse()?;
        self.subscribe(event, callback)
    }

    /// Fire-and-forget message on the private outbound channel.
    pub fn send(&self, message_type: &str, data: Value) -> Result<(), GatewayError> {
        let (connection, channel) = {
            let core = self.core();
            let channel = core.lifecycle.require_connected()?.outbound().to_string();
            let connection = core.connection.clone().ok_or(GatewayError::NotConnected)?;
            (connection, channel)
        };
        let payload = WireMessage::new(message_type, data).to_json()?;
        trace!(channel = %channel, payload = %payload, "Sending message");
        connection.send(&channel, payload)?;
        Ok(())
    }

    // ==================== Queries ====================

    /// Send `query` and resolve with the response payload.
    ///
    /// The message is sent before this returns; the future only waits for the
    /// response. A caller-supplied `requestIdentifier` is reused, otherwise a
    /// fresh one is generated. Lifecycle and send failures surface as an
    /// already-rejected future. There is no built-in timeout: wrap the future
    /// in one if needed. Dropping the future before it resolves removes the
    /// pending entry, and a late response is then discarded.
    pub fn execute(&self, query: Query, data: Value) -> QueryFuture {
        let channel = match self.core().lifecycle.require_connected() {
            Ok(channels) => channels.outbound().to_string(),
            Err(e) => return future::ready(Err(e)).boxed(),
        };

        let (tx, rx) = oneshot::channel();
        let resolver: Resolver = Box::new(move |response| {
            // Receiver gone means the caller stopped waiting.
            let _ = tx.send(response);
        });

        match self.send_query(&channel, query, data, resolver) {
            Ok(ticket) => {
                debug!(query = query.wire_type(), request_id = %ticket.id(), "Query sent");
                let mut guard = ForgetOnDrop {
                    shared: self.weak(),
                    ticket: Some(ticket),
                };
                async move {
                    let response = rx.await;
                    guard.disarm();
                    response.map_err(|_| GatewayError::QueryAbandoned)
                }
                .boxed()
            }
            Err(e) => future::ready(Err(e)).boxed(),
        }
    }

    /// [`execute`](Self::execute) by symbolic or wire name.
    pub fn execute_named(&self, name: &str, data: Value) -> QueryFuture {
        match name.parse::<Query>() {
            Ok(query) => self.execute(query, data),
            Err(e) => future::ready(Err(e.into())).boxed(),
        }
    }

    fn send_query(
        &self,
        channel: &str,
        query: Query,
        mut data: Value,
        resolver: Resolver,
    ) -> Result<Ticket, GatewayError> {
        let request_id = attach_request_id(&mut data)?;
        let payload = WireMessage::new(query.wire_type(), data).to_json()?;

        let (connection, ticket) = {
            let mut core = self.core();
            let connection = core.connection.clone().ok_or(GatewayError::NotConnected)?;
            let ticket = core.correlator.register(request_id, resolver);
            (connection, ticket)
        };

        trace!(channel, payload = %payload, "Sending query");
        if let Err(e) = connection.send(channel, payload) {
            warn!(error = %e, query = query.wire_type(), "Query send failed");
            self.core().correlator.forget(&ticket);
            return Err(e.into());
        }
        Ok(ticket)
    }

    // ==================== Inbound ====================

    fn handle_inbound(&self, delivery: Result<InboundFrame, DeliveryError>) {
        match classify(delivery) {
            Inbound::DeliveryFailed(err) => {
                warn!(address = %err.address, "Delivery error: {}", err.message);
                self.shared.diagnostics.report(DiagnosticEvent::new(
                    DiagnosticKind::DeliveryError,
                    Some(err.address),
                    json!({ "message": err.message }),
                ));
            }
            Inbound::Malformed { address, reason } => {
                debug!(address = %address, "Dropping malformed message: {}", reason);
            }
            Inbound::ServerError { address, data } => {
                self.shared.diagnostics.report(DiagnosticEvent::new(
                    DiagnosticKind::ServerError,
                    Some(address),
                    data,
                ));
            }
            Inbound::Response { request_id, data } => {
                let resolver = self.core().correlator.take(&request_id);
                match resolver {
                    Some(resolve) => resolve(data),
                    None => debug!(request_id = %request_id, "Dropping response to unknown request"),
                }
            }
            Inbound::Event { wire_type, data } => {
                let listeners = self.core().registry.listeners_for(&wire_type);
                if listeners.is_empty() {
                    debug!(event = %wire_type, "No subscribers for event");
                }
                for listener in listeners {
                    listener(&data);
                }
            }
        }
    }

    // ==================== Accessors ====================

    /// Every catalog event
    pub fn events(&self) -> &'static [Event] {
        &Event::CATALOG
    }

    /// Every catalog query
    pub fn queries(&self) -> &'static [Query] {
        &Query::CATALOG
    }

    /// The wildcard event
    pub fn all_events(&self) -> Event {
        Event::All
    }

    pub fn client_id(&self) -> Option<ClientIdentity> {
        self.core().lifecycle.identity().cloned()
    }

    pub fn channels(&self) -> Option<ChannelPair> {
        self.core().lifecycle.channels().cloned()
    }

    pub fn state(&self) -> GatewayState {
        self.core().lifecycle.state()
    }

    pub fn is_initialized(&self) -> bool {
        self.state().is_initialized()
    }

    pub fn is_ready(&self) -> bool {
        self.state().is_ready()
    }

    /// Number of queries awaiting a response (the handshake included)
    pub fn pending_queries(&self) -> usize {
        self.core().correlator.len()
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.shared.config
    }
}

/// Held by a query future; removes the pending entry if the future is
/// dropped before its response arrives.
struct ForgetOnDrop {
    shared: Weak<Shared>,
    ticket: Option<Ticket>,
}

impl ForgetOnDrop {
    fn disarm(&mut self) {
        self.ticket = None;
    }
}

impl Drop for ForgetOnDrop {
    fn drop(&mut self) {
        let (Some(ticket), Some(shared)) = (self.ticket.take(), self.shared.upgrade()) else {
            return;
        };
        let gateway = Gateway::from_shared(shared);
        if gateway.core().correlator.forget(&ticket) {
            debug!(request_id = %ticket.id(), "Query dropped before its response");
        }
    }
}

/// Send the network subscribe for `event`. Failures are logged, not retried.
fn announce(
    connection: &dyn EventBusConnection,
    channels: &ChannelPair,
    identity: &ClientIdentity,
    event: Event,
) {
    let result = WireMessage::subscribe(event, identity)
        .to_json()
        .map_err(GatewayError::from)
        .and_then(|payload| {
            connection
                .send(channels.outbound(), payload)
                .map_err(GatewayError::from)
        });
    match result {
        Ok(()) => debug!(event = event.wire_type(), "Subscription announced"),
        Err(e) => warn!(event = event.wire_type(), error = %e, "Subscription announce failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::transport::{OpenHandler, TransportError};
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    // ==================== Recording transport ====================

    #[derive(Default)]
    struct RecordingConnection {
        open: AtomicBool,
        open_handlers: Mutex<Vec<OpenHandler>>,
        handlers: Mutex<HashMap<String, MessageHandler>>,
        sent: Mutex<Vec<(String, Value)>>,
        fail_sends: AtomicBool,
    }

    impl RecordingConnection {
        fn fire_open(&self) {
            self.open.store(true, Ordering::SeqCst);
            let handlers: Vec<OpenHandler> = self.open_handlers.lock().unwrap().drain(..).collect();
            for handler in handlers {
                handler();
            }
        }

        fn deliver(&self, address: &str, body: Value) {
            self.deliver_raw(Ok(InboundFrame::new(address, body)));
        }

        fn deliver_raw(&self, delivery: Result<InboundFrame, DeliveryError>) {
            let address = match &delivery {
                Ok(frame) => frame.address.clone(),
                Err(err) => err.address.clone(),
            };
            let handler = self.handlers.lock().unwrap().get(&address).cloned();
            if let Some(handler) = handler {
                handler(delivery);
            }
        }

        fn sent(&self) -> Vec<(String, Value)> {
            self.sent.lock().unwrap().clone()
        }

        fn sent_to(&self, address: &str) -> Vec<Value> {
            self.sent()
                .into_iter()
                .filter(|(a, _)| a == address)
                .map(|(_, v)| v)
                .collect()
        }

        fn subscribes(&self) -> Vec<String> {
            self.sent()
                .into_iter()
                .filter(|(_, v)| v["type"] == "subscribe")
                .map(|(_, v)| v["data"]["id"].as_str().unwrap().to_string())
                .collect()
        }

        /// Answer the most recent query sent on `address`, echoing its id.
        fn respond_last(&self, address: &str, inbound: &str, data: Value) {
            let request = self.sent_to(address).pop().unwrap();
            let mut data = data;
            data["requestIdentifier"] = request["data"]["requestIdentifier"].clone();
            self.deliver(inbound, json!({"type": request["type"], "data": data}));
        }
    }

    impl EventBusConnection for RecordingConnection {
        fn on_open(&self, handler: OpenHandler) {
            if self.open.load(Ordering::SeqCst) {
                handler();
            } else {
                self.open_handlers.lock().unwrap().push(handler);
            }
        }

        fn register_handler(
            &self,
            address: &str,
            handler: MessageHandler,
        ) -> Result<(), TransportError> {
            self.handlers
                .lock()
                .unwrap()
                .insert(address.to_string(), handler);
            Ok(())
        }

        fn send(&self, address: &str, payload: String) -> Result<(), TransportError> {
            if self.fail_sends.load(Ordering::SeqCst) {
                return Err(TransportError::SendFailed("socket gone".to_string()));
            }
            let value: Value = serde_json::from_str(&payload).unwrap();
            self.sent
                .lock()
                .unwrap()
                .push((address.to_string(), value));
            Ok(())
        }
    }

    struct RecordingConnector {
        connection: Arc<RecordingConnection>,
        opened: Mutex<Vec<String>>,
        fail: bool,
    }

    impl EventBusConnector for RecordingConnector {
        fn open(&self, endpoint: &str) -> Result<Arc<dyn EventBusConnection>, TransportError> {
            if self.fail {
                return Err(TransportError::InvalidEndpoint(endpoint.to_string()));
            }
            self.opened.lock().unwrap().push(endpoint.to_string());
            Ok(self.connection.clone())
        }
    }

    #[derive(Default)]
    struct RecordingDiagnostics {
        events: Mutex<Vec<(DiagnosticKind, Value)>>,
    }

    impl DiagnosticSink for RecordingDiagnostics {
        fn report(&self, event: DiagnosticEvent) {
            self.events
                .lock()
                .unwrap()
                .push((event.kind, event.payload));
        }
    }

    const HANDSHAKE: &str = "events.to.martians";
    const OUTBOX: &str = "events.to.martians.u1";
    const INBOX: &str = "events.from.martians.u1";

    struct Harness {
        gateway: Gateway,
        connection: Arc<RecordingConnection>,
        connector: Arc<RecordingConnector>,
        diagnostics: Arc<RecordingDiagnostics>,
    }

    fn harness() -> Harness {
        let connection = Arc::new(RecordingConnection::default());
        let connector = Arc::new(RecordingConnector {
            connection: connection.clone(),
            opened: Mutex::new(Vec::new()),
            fail: false,
        });
        let diagnostics = Arc::new(RecordingDiagnostics::default());
        let gateway = Gateway::with_diagnostics(
            connector.clone(),
            GatewayConfig::default(),
            diagnostics.clone(),
        );
        Harness {
            gateway,
            connection,
            connector,
            diagnostics,
        }
    }

    impl Harness {
        fn open(&self) {
            self.gateway.init("u1").unwrap();
            self.connection.fire_open();
        }

        fn ready(&self) {
            self.open();
            self.connection.respond_last(HANDSHAKE, INBOX, json!({"ok": true}));
            assert!(self.gateway.is_ready());
        }
    }

    fn counter() -> (Arc<AtomicUsize>, impl Fn(&Value) + Send + Sync + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        (count, move |_: &Value| {
            c.fetch_add(1, Ordering::SeqCst);
        })
    }

    // ==================== Lifecycle ====================

    #[test]
    fn test_init_opens_configured_endpoint() {
        let h = harness();
        assert_eq!(h.gateway.state(), GatewayState::Uninitialized);
        h.gateway.init("u1").unwrap();

        assert!(h.gateway.is_initialized());
        assert!(!h.gateway.is_ready());
        assert_eq!(
            *h.connector.opened.lock().unwrap(),
            vec!["http://localhost:8080/events".to_string()]
        );
        assert_eq!(h.gateway.client_id().unwrap().as_str(), "u1");
        assert_eq!(h.gateway.channels().unwrap().inbound(), INBOX);
    }

    #[test]
    fn test_init_twice_fails() {
        let h = harness();
        h.gateway.init("u1").unwrap();
        assert_eq!(h.gateway.init("u2"), Err(GatewayError::AlreadyInitialized));
        assert_eq!(h.gateway.client_id().unwrap().as_str(), "u1");
    }

    #[test]
    fn test_init_rejects_blank_identity() {
        let h = harness();
        assert!(matches!(
            h.gateway.init("  "),
            Err(GatewayError::InvalidClientId(_))
        ));
        assert_eq!(h.gateway.state(), GatewayState::Uninitialized);
    }

    #[test]
    fn test_connector_failure_leaves_gateway_initialized() {
        let connection = Arc::new(RecordingConnection::default());
        let connector = Arc::new(RecordingConnector {
            connection,
            opened: Mutex::new(Vec::new()),
            fail: true,
        });
        let gateway = Gateway::new(connector, GatewayConfig::default());

        assert!(matches!(
            gateway.init("u1"),
            Err(GatewayError::Transport(TransportError::InvalidEndpoint(_)))
        ));
        assert_eq!(gateway.state(), GatewayState::Initialized);
        assert_eq!(gateway.init("u1"), Err(GatewayError::AlreadyInitialized));
    }

    #[test]
    fn test_handshake_scenario() {
        let h = harness();
        let (alerts, on_alert) = counter();
        h.gateway.init("u1").unwrap();
        h.gateway.subscribe(Event::Alerts, on_alert).unwrap();
        h.gateway.subscribe(Event::Users, |_| {}).unwrap();
        assert!(h.connection.sent().is_empty());

        h.connection.fire_open();
        assert_eq!(h.gateway.state(), GatewayState::ConnectionOpen);

        let handshake = h.connection.sent_to(HANDSHAKE);
        assert_eq!(handshake.len(), 1);
        assert_eq!(handshake[0]["type"], "queries.session");
        assert_eq!(handshake[0]["data"]["id"], "u1");
        assert!(handshake[0]["data"]["requestIdentifier"].is_string());
        assert!(h.connection.subscribes().is_empty());
        assert_eq!(h.gateway.pending_queries(), 1);

        h.connection.respond_last(HANDSHAKE, INBOX, json!({"session": "ok"}));

        assert!(h.gateway.is_ready());
        assert_eq!(h.gateway.pending_queries(), 0);
        assert_eq!(
            h.connection.subscribes(),
            vec!["events.alerts".to_string(), "events.users".to_string()]
        );
        for (address, message) in h.connection.sent() {
            if message["type"] == "subscribe" {
                assert_eq!(address, OUTBOX);
                assert_eq!(message["data"]["clientId"], "u1");
            }
        }

        h.connection
            .deliver(INBOX, json!({"type": "events.alerts", "data": {"x": 1}}));
        assert_eq!(alerts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_duplicate_open_is_ignored() {
        let h = harness();
        h.open();
        h.gateway.handle_open();
        assert_eq!(h.connection.sent_to(HANDSHAKE).len(), 1);
        assert_eq!(h.gateway.state(), GatewayState::ConnectionOpen);
    }

    // ==================== Subscriptions ====================

    #[test]
    fn test_subscribe_before_init_fails() {
        let h = harness();
        assert_eq!(
            h.gateway.subscribe(Event::Alerts, |_| {}),
            Err(GatewayError::NotInitialized)
        );
    }

    #[test]
    fn test_one_network_subscribe_per_event() {
        let h = harness();
        h.gateway.init("u1").unwrap();
        h.gateway.subscribe(Event::Pricing, |_| {}).unwrap();
        h.gateway.subscribe(Event::Pricing, |_| {}).unwrap();
        h.connection.fire_open();
        h.connection.respond_last(HANDSHAKE, INBOX, json!({}));

        h.gateway.subscribe(Event::Pricing, |_| {}).unwrap();
        assert_eq!(h.connection.subscribes(), vec!["events.pricing".to_string()]);
    }

    #[test]
    fn test_subscribe_after_ready_announces_immediately() {
        let h = harness();
        h.ready();
        h.gateway.subscribe(Event::Statistics, |_| {}).unwrap();
        h.gateway.subscribe(Event::All, |_| {}).unwrap();
        assert_eq!(
            h.connection.subscribes(),
            vec!["events.statistics".to_string()]
        );
    }

    #[test]
    fn test_unknown_event_name_sends_nothing() {
        let h = harness();
        h.ready();
        let before = h.connection.sent().len();
        assert_eq!(
            h.gateway.subscribe_named("events.weather", |_| {}),
            Err(GatewayError::UnknownEvent("events.weather".to_string()))
        );
        assert_eq!(h.connection.sent().len(), before);
    }

    #[test]
    fn test_subscribe_named_accepts_symbol_and_wire() {
        let h = harness();
        h.ready();
        h.gateway.subscribe_named("LIVE_DATA", |_| {}).unwrap();
        h.gateway.subscribe_named("events.live-data", |_| {}).unwrap();
        assert_eq!(
            h.connection.subscribes(),
            vec!["events.live-data".to_string()]
        );
    }

    #[test]
    fn test_wildcard_and_specific_dispatch() {
        let h = harness();
        h.ready();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        h.gateway
            .subscribe(Event::All, move |data| s.lock().unwrap().push(data.clone()))
            .unwrap();
        let (alerts, on_alert) = counter();
        h.gateway.subscribe(Event::Alerts, on_alert).unwrap();

        h.connection
            .deliver(INBOX, json!({"type": "events.alerts", "data": {"x": 1}}));

        assert_eq!(*seen.lock().unwrap(), vec![json!({"x": 1})]);
        assert_eq!(alerts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_error_message_reaches_no_subscriber() {
        let h = harness();
        h.ready();
        let (all, on_all) = counter();
        h.gateway.subscribe(Event::All, on_all).unwrap();

        h.connection
            .deliver(INBOX, json!({"type": "error", "data": {"message": "denied"}}));

        assert_eq!(all.load(Ordering::SeqCst), 0);
        let reported = h.diagnostics.events.lock().unwrap();
        assert_eq!(reported.len(), 1);
        assert_eq!(reported[0].0, DiagnosticKind::ServerError);
        assert_eq!(reported[0].1["message"], "denied");
    }

    #[test]
    fn test_unmapped_and_malformed_messages_are_dropped() {
        let h = harness();
        h.ready();
        let (all, on_all) = counter();
        h.gateway.subscribe(Event::All, on_all).unwrap();

        h.connection
            .deliver(INBOX, json!({"type": "events.weather", "data": {}}));
        h.connection.deliver(INBOX, json!({"type": "all", "data": {}}));
        h.connection.deliver(INBOX, json!({"data": {}}));
        h.connection.deliver(INBOX, json!("garbage"));

        assert_eq!(all.load(Ordering::SeqCst), 0);
        assert!(h.gateway.is_ready());
    }

    #[test]
    fn test_delivery_error_goes_to_diagnostics() {
        let h = harness();
        h.ready();
        let (all, on_all) = counter();
        h.gateway.subscribe(Event::All, on_all).unwrap();

        h.connection
            .deliver_raw(Err(DeliveryError::new(INBOX, "rejected by bridge")));

        assert_eq!(all.load(Ordering::SeqCst), 0);
        let reported = h.diagnostics.events.lock().unwrap();
        assert_eq!(reported[0].0, DiagnosticKind::DeliveryError);
        assert_eq!(reported[0].1["message"], "rejected by bridge");
    }

    #[test]
    fn test_clones_report_to_injected_diagnostics() {
        let h = harness();
        let clone = h.gateway.clone();
        clone.init("u1").unwrap();
        h.connection.fire_open();

        h.connection.deliver(
            INBOX,
            json!({"type": "error", "data": {"reason": "bad subscribe"}}),
        );

        let reported = h.diagnostics.events.lock().unwrap();
        assert_eq!(reported.len(), 1);
        assert_eq!(reported[0].0, DiagnosticKind::ServerError);
        assert_eq!(reported[0].1["reason"], "bad subscribe");
    }

    #[test]
    fn test_callback_may_reenter_gateway() {
        let h = harness();
        h.ready();
        let gateway = h.gateway.clone();
        h.gateway
            .subscribe(Event::Alerts, move |_| {
                gateway.subscribe(Event::Users, |_| {}).unwrap();
                gateway.send("ack", json!({})).unwrap();
            })
            .unwrap();

        h.connection
            .deliver(INBOX, json!({"type": "events.alerts", "data": {}}));

        assert!(h.connection.subscribes().contains(&"events.users".to_string()));
        assert!(h.connection.sent_to(OUTBOX).iter().any(|m| m["type"] == "ack"));
    }

    // ==================== Ready callbacks ====================

    #[test]
    fn test_ready_callbacks_fire_in_order_after_replay() {
        let h = harness();
        let order = Arc::new(Mutex::new(Vec::new()));
        h.gateway.init("u1").unwrap();
        h.gateway.subscribe(Event::Alerts, |_| {}).unwrap();

        for tag in ["first", "second"] {
            let order = order.clone();
            let connection = h.connection.clone();
            h.gateway.on_ready(move || {
                // Replay already happened
                assert_eq!(connection.subscribes(), vec!["events.alerts".to_string()]);
                order.lock().unwrap().push(tag);
            });
        }
        h.connection.fire_open();
        assert!(order.lock().unwrap().is_empty());

        h.connection.respond_last(HANDSHAKE, INBOX, json!({}));
        assert_eq!(*order.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn test_ready_callback_after_ready_fires_immediately() {
        let h = harness();
        h.ready();
        let fired = Arc::new(AtomicBool::new(false));
        let f = fired.clone();
        h.gateway.on_ready(move || f.store(true, Ordering::SeqCst));
        assert!(fired.load(Ordering::SeqCst));
    }

    #[test]
    fn test_ready_callback_registered_during_flush_runs_once() {
        let h = harness();
        let count = Arc::new(AtomicUsize::new(0));
        let gateway = h.gateway.clone();
        let c = count.clone();
        h.gateway.on_ready(move || {
            let c = c.clone();
            gateway.on_ready(move || {
                c.fetch_add(1, Ordering::SeqCst);
            });
        });
        h.ready();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_wait_ready_resolves_after_handshake() {
        let h = harness();
        h.open();
        let gateway = h.gateway.clone();
        let waiter = tokio::spawn(async move { gateway.wait_ready().await });

        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        h.connection.respond_last(HANDSHAKE, INBOX, json!({}));
        waiter.await.unwrap();
        assert!(h.gateway.is_ready());
    }

    // ==================== Queries ====================

    #[tokio::test]
    async fn test_execute_round_trip() {
        let h = harness();
        h.ready();

        let pending = h
            .gateway
            .execute_named("queries.get-property", json!({"id": "p1"}));

        let request = h.connection.sent_to(OUTBOX).pop().unwrap();
        assert_eq!(request["type"], "queries.get-property");
        assert_eq!(request["data"]["id"], "p1");
        let request_id = request["data"]["requestIdentifier"].as_str().unwrap();
        assert_eq!(request_id.len(), 36);

        h.connection.deliver(
            INBOX,
            json!({
                "type": "queries.get-property",
                "data": {"name": "Villa", "requestIdentifier": request_id}
            }),
        );

        assert_eq!(pending.await.unwrap(), json!({"name": "Villa"}));
        assert_eq!(h.gateway.pending_queries(), 0);
    }

    #[tokio::test]
    async fn test_execute_allowed_before_ready() {
        let h = harness();
        h.open();
        let pending = h.gateway.execute(Query::GetUsers, Value::Null);
        h.connection.respond_last(OUTBOX, INBOX, json!({"users": []}));
        assert_eq!(pending.await.unwrap(), json!({"users": []}));
    }

    #[tokio::test]
    async fn test_concurrent_queries_resolve_independently() {
        let h = harness();
        h.ready();

        let first = h.gateway.execute(Query::GetUser, json!({"id": "a"}));
        let second = h.gateway.execute(Query::GetUser, json!({"id": "b"}));
        let sent = h.connection.sent_to(OUTBOX);
        let id_a = sent[sent.len() - 2]["data"]["requestIdentifier"].clone();
        let id_b = sent[sent.len() - 1]["data"]["requestIdentifier"].clone();
        assert_ne!(id_a, id_b);

        // Answer in reverse order
        h.connection.deliver(
            INBOX,
            json!({"type": "queries.get-user", "data": {"name": "B", "requestIdentifier": id_b}}),
        );
        h.connection.deliver(
            INBOX,
            json!({"type": "queries.get-user", "data": {"name": "A", "requestIdentifier": id_a}}),
        );

        assert_eq!(first.await.unwrap(), json!({"name": "A"}));
        assert_eq!(second.await.unwrap(), json!({"name": "B"}));
    }

    #[tokio::test]
    async fn test_caller_supplied_request_id_is_reused() {
        let h = harness();
        h.ready();
        let pending = h.gateway.execute(
            Query::GetPricing,
            json!({"requestIdentifier": "fixed-id"}),
        );
        let request = h.connection.sent_to(OUTBOX).pop().unwrap();
        assert_eq!(request["data"]["requestIdentifier"], "fixed-id");

        h.connection.deliver(
            INBOX,
            json!({"type": "queries.get-pricing", "data": {"requestIdentifier": "fixed-id"}}),
        );
        assert_eq!(pending.await.unwrap(), json!({}));
    }

    #[tokio::test]
    async fn test_unknown_response_is_not_broadcast() {
        let h = harness();
        h.ready();
        let (all, on_all) = counter();
        h.gateway.subscribe(Event::All, on_all).unwrap();

        h.connection.deliver(
            INBOX,
            json!({"type": "events.alerts", "data": {"requestIdentifier": "stranger"}}),
        );
        assert_eq!(all.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_second_response_is_ignored() {
        let h = harness();
        h.ready();
        let (all, on_all) = counter();
        h.gateway.subscribe(Event::All, on_all).unwrap();

        let pending = h.gateway.execute(Query::GetStatistics, json!({}));
        h.connection.respond_last(OUTBOX, INBOX, json!({"n": 1}));
        h.connection.respond_last(OUTBOX, INBOX, json!({"n": 2}));

        assert_eq!(pending.await.unwrap(), json!({"n": 1}));
        assert_eq!(all.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_execute_requires_connection() {
        let h = harness();
        assert_eq!(
            h.gateway.execute(Query::GetUsers, json!({})).await,
            Err(GatewayError::NotInitialized)
        );
        h.gateway.init("u1").unwrap();
        assert_eq!(
            h.gateway.execute(Query::GetUsers, json!({})).await,
            Err(GatewayError::NotConnected)
        );
        assert!(h.connection.sent().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_query_name_sends_nothing() {
        let h = harness();
        h.ready();
        let before = h.connection.sent().len();
        assert_eq!(
            h.gateway.execute_named("queries.launch-rocket", json!({})).await,
            Err(GatewayError::UnknownQuery("queries.launch-rocket".to_string()))
        );
        assert_eq!(h.connection.sent().len(), before);
    }

    #[tokio::test]
    async fn test_non_object_payload_is_rejected() {
        let h = harness();
        h.ready();
        assert!(matches!(
            h.gateway.execute(Query::GetUser, json!([1, 2])).await,
            Err(GatewayError::Serialization(_))
        ));
        assert_eq!(h.gateway.pending_queries(), 0);
    }

    #[tokio::test]
    async fn test_send_failure_rejects_and_clears_pending() {
        let h = harness();
        h.ready();
        h.connection.fail_sends.store(true, Ordering::SeqCst);

        let result = h.gateway.execute(Query::GetUsers, json!({})).await;
        assert!(matches!(
            result,
            Err(GatewayError::Transport(TransportError::SendFailed(_)))
        ));
        assert_eq!(h.gateway.pending_queries(), 0);
    }

    #[tokio::test]
    async fn test_dropping_gateway_abandons_pending_queries() {
        let h = harness();
        h.ready();
        let pending = h.gateway.execute(Query::GetUsers, json!({}));
        let Harness {
            gateway, connector, ..
        } = h;
        drop(gateway);
        drop(connector);

        assert_eq!(pending.await, Err(GatewayError::QueryAbandoned));
    }

    #[tokio::test]
    async fn test_timed_out_queries_leave_nothing_pending() {
        let h = harness();
        h.ready();
        let (all, on_all) = counter();
        h.gateway.subscribe(Event::All, on_all).unwrap();

        for _ in 0..3 {
            let result = tokio::time::timeout(
                Duration::from_millis(1),
                h.gateway.execute(Query::GetUsers, json!({})),
            )
            .await;
            assert!(result.is_err());
        }
        assert_eq!(h.gateway.pending_queries(), 0);

        // A late answer finds nobody waiting and is not broadcast.
        h.connection.respond_last(OUTBOX, INBOX, json!({"users": []}));
        assert_eq!(all.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_dropped_query_spares_query_reusing_its_id() {
        let h = harness();
        h.ready();
        let first = h.gateway.execute(
            Query::GetPricing,
            json!({"requestIdentifier": "dup"}),
        );
        let second = h.gateway.execute(
            Query::GetPricing,
            json!({"requestIdentifier": "dup"}),
        );
        drop(first);
        assert_eq!(h.gateway.pending_queries(), 1);

        h.connection.deliver(
            INBOX,
            json!({"type": "queries.get-pricing", "data": {"requestIdentifier": "dup", "price": 3}}),
        );
        assert_eq!(second.await.unwrap(), json!({"price": 3}));
        assert_eq!(h.gateway.pending_queries(), 0);
    }

    #[tokio::test]
    async fn test_answered_query_leaves_nothing_pending() {
        let h = harness();
        h.ready();
        let pending = h.gateway.execute(Query::GetStatistics, json!({}));
        assert_eq!(h.gateway.pending_queries(), 1);
        h.connection.respond_last(OUTBOX, INBOX, json!({"n": 1}));
        assert_eq!(pending.await.unwrap(), json!({"n": 1}));
        assert_eq!(h.gateway.pending_queries(), 0);
    }

    // ==================== Send ====================

    #[test]
    fn test_send_uses_private_outbound_channel() {
        let h = harness();
        assert_eq!(
            h.gateway.send("ping", json!({})),
            Err(GatewayError::NotInitialized)
        );
        h.gateway.init("u1").unwrap();
        assert_eq!(
            h.gateway.send("ping", json!({})),
            Err(GatewayError::NotConnected)
        );

        h.connection.fire_open();
        h.gateway.send("user.typing", json!({"on": true})).unwrap();
        let sent = h.connection.sent_to(OUTBOX);
        assert_eq!(sent, vec![json!({"type": "user.typing", "data": {"on": true}})]);
    }

    #[test]
    fn test_catalog_accessors() {
        let h = harness();
        assert_eq!(h.gateway.events().len(), 7);
        assert_eq!(h.gateway.queries().len(), 11);
        assert_eq!(h.gateway.all_events(), Event::All);
        assert!(h.gateway.client_id().is_none());
        assert!(h.gateway.channels().is_none());
    }
}
