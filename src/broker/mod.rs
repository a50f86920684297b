//! The broker: subscription bookkeeping and fan-out.
//!
//! - `engine`: the [`Broker`] itself.
//! - `message`: wire protocol frames.
//! - `subscription`: the two-way connection/channel index.

pub mod engine;
pub mod message;
pub mod subscription;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub use engine::Broker;

/// How the broker is shared between connection tasks.
pub type SharedBroker = Arc<Mutex<Broker>>;

/// Lock the shared broker. A panic in another connection task does not take
/// the broker down with it.
pub fn lock(broker: &SharedBroker) -> MutexGuard<'_, Broker> {
    broker.lock().unwrap_or_else(PoisonError::into_inner)
}
