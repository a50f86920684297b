use super::{Connection, ConnectionRegistry};
use tokio::sync::mpsc;
use tungstenite::protocol::Message as WsMessage;

#[test]
fn test_connection_new() {
    let (tx, _) = mpsc::unbounded_channel::<WsMessage>();
    let connection = Connection::new(tx);
    assert!(connection.id.starts_with("conn-"));
}

#[test]
fn test_registry_assigns_distinct_ids() {
    let mut registry = ConnectionRegistry::new();
    let (tx, _rx) = mpsc::unbounded_channel::<WsMessage>();

    let ids: Vec<_> = (0..100).map(|_| registry.register(tx.clone())).collect();
    let unique: std::collections::HashSet<_> = ids.iter().collect();

    assert_eq!(unique.len(), 100);
    assert_eq!(registry.len(), 100);
}

#[test]
fn test_registry_remove() {
    let mut registry = ConnectionRegistry::new();
    let (tx, _rx) = mpsc::unbounded_channel::<WsMessage>();
    let id = registry.register(tx);

    assert!(registry.contains(&id));
    let removed = registry.remove(&id).unwrap();
    assert_eq!(removed.id, id);
    assert!(registry.is_empty());
    assert!(registry.remove(&id).is_none());
}

#[test]
fn test_registered_sender_reaches_receiver() {
    let mut registry = ConnectionRegistry::new();
    let (tx, mut rx) = mpsc::unbounded_channel::<WsMessage>();
    let id = registry.register(tx);

    registry
        .get(&id)
        .unwrap()
        .sender
        .send(WsMessage::text("ping"))
        .unwrap();

    assert_eq!(rx.try_recv().unwrap(), WsMessage::text("ping"));
}
