use std::time::{Duration, Instant};

/// A stored value with its optional deadline.
#[derive(Debug)]
pub(crate) struct Entry {
    pub(crate) value: Vec<u8>,
    pub(crate) expires_at: Option<Instant>,
}

impl Entry {
    /// A zero `ttl` means the entry never expires.
    pub(crate) fn new(value: Vec<u8>, ttl: Duration, now: Instant) -> Self {
        let expires_at = (!ttl.is_zero()).then(|| now + ttl);
        Self { value, expires_at }
    }

    pub(crate) fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| deadline <= now)
    }
}
