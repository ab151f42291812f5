//! Subscription registry.
//!
//! Maps catalog events to their callbacks and remembers which events have
//! already been announced to the server. Announcement happens at most once per
//! event for the lifetime of the gateway; the wildcard is never announced.

use busgate_domain::Event;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Subscriber callback, invoked with the event's `data` payload.
pub type EventCallback = Arc<dyn Fn(&Value) + Send + Sync>;

#[derive(Default)]
pub struct SubscriptionRegistry {
    table: BTreeMap<Event, Vec<EventCallback>>,
    announced: BTreeSet<Event>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `callback` to the event's list, creating the entry if needed.
    ///
    /// Returns `true` when the caller must announce the event to the server
    /// now: `announce_now` is set (gateway Ready), the event is not the
    /// wildcard, and it has not been announced before.
    pub fn subscribe(&mut self, event: Event, callback: EventCallback, announce_now: bool) -> bool {
        self.table.entry(event).or_default().push(callback);
        announce_now && !event.is_wildcard() && self.announced.insert(event)
    }

    /// Events registered before Ready that still need announcing.
    ///
    /// Marks them announced; the caller sends one subscribe per entry.
    pub fn take_replay(&mut self) -> Vec<Event> {
        let pending: Vec<Event> = self
            .table
            .keys()
            .copied()
            .filter(|event| !event.is_wildcard() && !self.announced.contains(event))
            .collect();
        self.announced.extend(pending.iter().copied());
        pending
    }

    /// Callbacks to invoke for an inbound event: the event's own subscribers
    /// in registration order, then the wildcard subscribers.
    ///
    /// Unmapped wire types, and the wildcard's own wire type, match nothing.
    pub fn listeners_for(&self, wire_type: &str) -> Vec<EventCallback> {
        let Some(event) = Event::from_wire(wire_type) else {
            return Vec::new();
        };
        if event.is_wildcard() {
            return Vec::new();
        }

        self.table
            .get(&event)
            .into_iter()
            .chain(self.table.get(&Event::All))
            .flat_map(|callbacks| callbacks.iter().cloned())
            .collect()
    }
}

#[cfg(test)]
impl SubscriptionRegistry {
    fn is_announced(&self, event: Event) -> bool {
        self.announced.contains(&event)
    }

    fn subscriber_count(&self, event: Event) -> usize {
        self.table.get(&event).map_or(0, Vec::len)
    }
}
