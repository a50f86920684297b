//! Subscription index
//!
//! Two reverse-indexed views over the same set of subscriptions:
//! connection -> its subscriptions, and channel -> its subscribers. Every
//! entry in one view has an entry with the same `SubscriptionId` in the
//! other; removal always goes through both.
//!
//! A channel exists only while it has at least one subscriber. There is no
//! unsubscribe operation: subscriptions are dropped in bulk when their
//! connection goes away.

use std::collections::HashMap;

use crate::connection::ConnectionId;

pub type ChannelName = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub connection: ConnectionId,
    pub channel: ChannelName,
}

#[derive(Debug, Default)]
pub struct SubscriptionIndex {
    by_connection: HashMap<ConnectionId, Vec<Subscription>>,
    by_channel: HashMap<ChannelName, Vec<Subscription>>,
    next_id: u64,
}

impl SubscriptionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new subscription in both directions. Does not check for an
    /// existing (connection, channel) pair; see [`SubscriptionIndex::contains`].
    pub fn insert(&mut self, connection: &ConnectionId, channel: &str) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;

        let subscription = Subscription {
            id,
            connection: connection.clone(),
            channel: channel.to_string(),
        };

        self.by_channel
            .entry(subscription.channel.clone())
            .or_default()
            .push(subscription.clone());
        self.by_connection
            .entry(subscription.connection.clone())
            .or_default()
            .push(subscription);

        id
    }

    pub fn contains(&self, connection: &ConnectionId, channel: &str) -> bool {
        self.subscriptions_of(connection)
            .iter()
            .any(|s| s.channel == channel)
    }

    /// Subscribers of `channel`, in subscription order. Empty for unknown channels.
    pub fn subscribers(&self, channel: &str) -> &[Subscription] {
        self.by_channel
            .get(channel)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn subscriptions_of(&self, connection: &ConnectionId) -> &[Subscription] {
        self.by_connection
            .get(connection)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Drop every subscription owned by `connection` from both views and
    /// return them. A connection with no subscriptions is a no-op.
    pub fn remove_connection(&mut self, connection: &ConnectionId) -> Vec<Subscription> {
        let Some(owned) = self.by_connection.remove(connection) else {
            return Vec::new();
        };

        for subscription in &owned {
            if let Some(subscribers) = self.by_channel.get_mut(&subscription.channel) {
                if let Some(pos) = subscribers.iter().position(|s| s.id == subscription.id) {
                    subscribers.remove(pos);
                }
                if subscribers.is_empty() {
                    self.by_channel.remove(&subscription.channel);
                }
            }
        }

        owned
    }

    pub fn channel_count(&self) -> usize {
        self.by_channel.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_channel.is_empty() && self.by_connection.is_empty()
    }
}
