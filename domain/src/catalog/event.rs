//! Event catalog value object

use crate::core::error::DomainError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Server-pushed events a client may subscribe to (Value Object)
///
/// This is the closed schema of the push side of the protocol. Each variant
/// carries a symbolic name (`ALERTS`) and the event-type string used on the
/// wire (`events.alerts`).
///
/// [`Event::All`] is the wildcard entry: its listeners observe every
/// dispatched event, and it is never announced to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Event {
    All,
    Alerts,
    LiveData,
    Properties,
    Users,
    Statistics,
    Pricing,
}

impl Event {
    /// Every catalog entry, wildcard first.
    pub const CATALOG: [Event; 7] = [
        Event::All,
        Event::Alerts,
        Event::LiveData,
        Event::Properties,
        Event::Users,
        Event::Statistics,
        Event::Pricing,
    ];

    /// Event-type string as it appears in `{"type": ...}` on the wire
    pub fn wire_type(&self) -> &'static str {
        match self {
            Event::All => "all",
            Event::Alerts => "events.alerts",
            Event::LiveData => "events.live-data",
            Event::Properties => "events.properties",
            Event::Users => "events.users",
            Event::Statistics => "events.statistics",
            Event::Pricing => "events.pricing",
        }
    }

    /// Symbolic catalog name
    pub fn symbol(&self) -> &'static str {
        match self {
            Event::All => "ALL",
            Event::Alerts => "ALERTS",
            Event::LiveData => "LIVE_DATA",
            Event::Properties => "PROPERTIES",
            Event::Users => "USERS",
            Event::Statistics => "STATISTICS",
            Event::Pricing => "PRICING",
        }
    }

    /// Check if this is the wildcard entry
    pub fn is_wildcard(&self) -> bool {
        matches!(self, Event::All)
    }

    /// Look up an event by its wire event-type string only.
    ///
    /// Inbound dispatch uses this: symbolic names never arrive from the server.
    pub fn from_wire(wire_type: &str) -> Option<Event> {
        Self::CATALOG
            .into_iter()
            .find(|event| event.wire_type() == wire_type)
    }

    /// Look up an event by symbolic name (case-insensitive).
    pub fn from_symbol(symbol: &str) -> Option<Event> {
        Self::CATALOG
            .into_iter()
            .find(|event| event.symbol().eq_ignore_ascii_case(symbol))
    }
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.wire_type())
    }
}

impl std::str::FromStr for Event {
    type Err = DomainError;

    /// Accepts either the symbolic name (`ALERTS`) or the wire string
    /// (`events.alerts`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::from_wire(s)
            .or_else(|| Self::from_symbol(s))
            .ok_or_else(|| DomainError::UnknownEvent(s.to_string()))
    }
}

impl Serialize for Event {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.wire_type())
    }
}

impl<'de> Deserialize<'de> for Event {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
