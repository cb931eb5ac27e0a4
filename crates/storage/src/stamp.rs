//! Expiry header shared by the keyed engines.
//!
//! A stored value is prefixed with its deadline as little-endian Unix
//! milliseconds; zero means it never expires.

use crate::error::{ErrorKind, Result};
use std::time::Duration;
use time::OffsetDateTime;

const HEADER_LEN: usize = size_of::<u64>();
pub(crate) const NEVER: u64 = 0;

pub(crate) fn now_millis() -> u64 {
    u64::try_from(OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000).unwrap_or(0)
}

/// A decoded record borrowing its value from the stored bytes.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct Stamped<'a> {
    deadline: u64,
    pub(crate) value: &'a [u8],
}

impl<'a> Stamped<'a> {
    pub(crate) fn new(deadline: u64, value: &'a [u8]) -> Self {
        Self { deadline, value }
    }

    pub(crate) fn parse(raw: &'a [u8]) -> Result<Self> {
        let Some((header, value)) = raw.split_first_chunk::<HEADER_LEN>() else {
            exn::bail!(ErrorKind::InvalidData(format!("record shorter than {HEADER_LEN} bytes")));
        };
        Ok(Self::new(u64::from_le_bytes(*header), value))
    }

    pub(crate) fn deadline(&self) -> u64 {
        self.deadline
    }

    pub(crate) fn is_expired(&self, now: u64) -> bool {
        self.deadline != NEVER && self.deadline <= now
    }

    pub(crate) fn remaining(&self, now: u64) -> Option<Duration> {
        (self.deadline != NEVER).then(|| Duration::from_millis(self.deadline.saturating_sub(now)))
    }
}

pub(crate) fn deadline(ttl: Option<Duration>, now: u64) -> u64 {
    match ttl {
        Some(ttl) if !ttl.is_zero() => now.saturating_add(u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX)).max(1),
        _ => NEVER,
    }
}

pub(crate) fn encode(value: &[u8], deadline: u64) -> Vec<u8> {
    let mut raw = Vec::with_capacity(HEADER_LEN + value.len());
    raw.extend_from_slice(&deadline.to_le_bytes());
    raw.extend_from_slice(value);
    raw
}
