//! Interaction ids and request logging
//!
//! Every inbound request is tagged with an [`InteractionId`] before its body is
//! parsed. The id only ever appears in server-side logs; it is never accepted
//! from or returned to a caller.
//!
//! The id is `hex(sha256(timestamp_nanos || nonce)[..16])`. The derivation is a
//! pure function ([`derive_interaction_id`]); the clock and the entropy source
//! are injected so tests can pin both.

use std::fmt;
use std::net::SocketAddr;

use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use tracing::info;

/// Opaque per-request correlation token
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InteractionId(String);

impl InteractionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InteractionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Time source for interaction ids
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to one instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Derive an interaction id from a timestamp and a nonce
pub fn derive_interaction_id(at: DateTime<Utc>, nonce: u64) -> InteractionId {
    // Nanosecond precision overflows i64 past 2262; fall back to micros.
    let stamp = at
        .timestamp_nanos_opt()
        .unwrap_or_else(|| at.timestamp_micros());

    let mut hasher = Sha256::new();
    hasher.update(stamp.to_be_bytes());
    hasher.update(nonce.to_be_bytes());
    let digest = hasher.finalize();

    InteractionId(hex::encode(&digest[..16]))
}

/// Issues interaction ids from a clock and an entropy source
#[derive(Debug, Clone, Copy, Default)]
pub struct InteractionIdIssuer<C = SystemClock> {
    clock: C,
}

impl InteractionIdIssuer<SystemClock> {
    pub fn new() -> Self {
        Self { clock: SystemClock }
    }
}

impl<C: Clock> InteractionIdIssuer<C> {
    pub fn with_clock(clock: C) -> Self {
        Self { clock }
    }

    /// Issue an id using the operating system RNG
    pub fn issue(&self) -> InteractionId {
        self.issue_with(&mut OsRng)
    }

    /// Issue an id drawing the nonce from `rng`
    pub fn issue_with<R: RngCore + ?Sized>(&self, rng: &mut R) -> InteractionId {
        derive_interaction_id(self.clock.now(), rng.next_u64())
    }
}

/// Emit one log line for an interaction event
pub fn log_interaction(event: &str, interaction_id: &InteractionId, remote: Option<SocketAddr>) {
    match remote {
        Some(addr) => info!(
            event = event,
            interaction_id = %interaction_id,
            remote = %addr,
            "interaction"
        ),
        None => info!(
            event = event,
            interaction_id = %interaction_id,
            remote = "unknown",
            "interaction"
        ),
    }
}
