use std::collections::HashMap;
use std::collections::hash_map::Entry;

use tokio::sync::mpsc::UnboundedSender;
use tungstenite::protocol::Message as WsMessage;
use uuid::Uuid;

pub type ConnectionId = String;

/// A live connection as seen by the broker.
#[derive(Debug)]
pub struct Connection {
    pub id: ConnectionId,
    /// Outbound queue drained by the connection's writer task.
    pub sender: UnboundedSender<WsMessage>,
}

impl Connection {
    /// Create a connection with a fresh random id.
    pub fn new(sender: UnboundedSender<WsMessage>) -> Self {
        Self {
            id: format!("conn-{}", Uuid::new_v4()),
            sender,
        }
    }
}

/// Identity registry for live connections. An id is never handed out twice
/// while its first owner is still registered.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: HashMap<ConnectionId, Connection>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection and return its id.
    pub fn register(&mut self, sender: UnboundedSender<WsMessage>) -> ConnectionId {
        let mut connection = Connection::new(sender);
        loop {
            match self.connections.entry(connection.id.clone()) {
                Entry::Vacant(slot) => {
                    let id = connection.id.clone();
                    slot.insert(connection);
                    return id;
                }
                Entry::Occupied(_) => {
                    connection.id = format!("conn-{}", Uuid::new_v4());
                }
            }
        }
    }

    pub fn get(&self, id: &ConnectionId) -> Option<&Connection> {
        self.connections.get(id)
    }

    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.connections.contains_key(id)
    }

    pub fn remove(&mut self, id: &ConnectionId) -> Option<Connection> {
        self.connections.remove(id)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
