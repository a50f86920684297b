//! In-memory `Transport` for tests: the ready state is driven by hand and
//! every sent frame is captured.

use std::sync::{Arc, Mutex};

use tokio::sync::watch;

use crate::broker::message::Frame;
use crate::connector::transport::{ReadyState, Transport};
use crate::utils::error::TransportError;

#[derive(Clone)]
pub(crate) struct MockTransport {
    state: Arc<watch::Sender<ReadyState>>,
    sent: Arc<Mutex<Vec<String>>>,
}

impl MockTransport {
    pub(crate) fn new(initial: ReadyState) -> Self {
        let (state, _) = watch::channel(initial);
        Self {
            state: Arc::new(state),
            sent: Arc::default(),
        }
    }

    pub(crate) fn set(&self, state: ReadyState) {
        self.state.send_replace(state);
    }

    pub(crate) fn sent_frames(&self) -> Vec<Frame> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|text| Frame::parse(text).unwrap())
            .collect()
    }
}

impl Transport for MockTransport {
    fn ready_state(&self) -> ReadyState {
        *self.state.borrow()
    }

    fn watch_ready(&self) -> watch::Receiver<ReadyState> {
        self.state.subscribe()
    }

    fn send_text(&self, text: String) -> Result<(), TransportError> {
        if !self.ready_state().is_open() {
            return Err(TransportError::NotOpen);
        }
        self.sent.lock().unwrap().push(text);
        Ok(())
    }
}
