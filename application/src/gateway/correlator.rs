//! Request correlator: pending query table keyed by correlation id.

use busgate_domain::RequestId;
use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;

/// One-shot completion for a pending query, fed the response payload.
pub type Resolver = Box<dyn FnOnce(Value) + Send>;

/// Identifies one registration. Request ids may be reused by callers, so the
/// sequence number tells a replaced entry from its replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    id: RequestId,
    seq: u64,
}

impl Ticket {
    pub fn id(&self) -> &RequestId {
        &self.id
    }
}

#[derive(Default)]
pub struct RequestCorrelator {
    pending: HashMap<RequestId, (u64, Resolver)>,
    next_seq: u64,
}

impl RequestCorrelator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a query about to be sent.
    ///
    /// Reusing an id that is still pending replaces the older entry, whose
    /// caller then observes the query as abandoned.
    pub fn register(&mut self, id: RequestId, resolver: Resolver) -> Ticket {
        let seq = self.next_seq;
        self.next_seq += 1;
        if self.pending.insert(id.clone(), (seq, resolver)).is_some() {
            warn!(request_id = %id, "Replacing pending query with duplicate request id");
        }
        Ticket { id, seq }
    }

    /// Remove and return the resolver for `id`. A second call for the same id
    /// yields `None`.
    pub fn take(&mut self, id: &str) -> Option<Resolver> {
        self.pending
            .remove(&RequestId::from(id))
            .map(|(_, resolver)| resolver)
    }

    /// Drop the entry `ticket` registered, unless it was already answered or
    /// replaced. Returns whether an entry was removed.
    pub fn forget(&mut self, ticket: &Ticket) -> bool {
        match self.pending.get(&ticket.id) {
            Some((seq, _)) if *seq == ticket.seq => {
                self.pending.remove(&ticket.id);
                true
            }
            _ => false,
        }
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
