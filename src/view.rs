//! # View State
//!
//! Holds the latest HTML fragment for the browser page and reconciles pushes
//! from arbitrary caller threads with the single active view connection.
//!
//! ## Delivery model:
//! Latest write wins. Every update overwrites the stored HTML and sets the
//! dirty flag; the flag is cleared only after a successful push to a connected
//! client. With no client the push is a no-op and the state is retained, so
//! the freshest HTML is flushed to the next connecting client before that
//! client's inbound loop begins. Two rapid updates may therefore deliver only
//! the second — desired for a status view, and the documented contract.
//!
//! Delivery is fire-and-forget: no acknowledgment, no retry beyond the
//! dirty-flag catch-up on reconnect.

use crate::channel::{ChannelSlot, Outbound};
use crate::websocket::Envelope;
use actix::Recipient;
use std::sync::Mutex;
use tracing::info;

pub struct ViewState {
    slot: ChannelSlot,
    inner: Mutex<ViewInner>,
    debug: bool,
}

struct ViewInner {
    html: String,
    /// Set on every write, cleared only after a successful push
    dirty: bool,
}

impl ViewState {
    pub fn new(debug: bool) -> Self {
        Self {
            slot: ChannelSlot::new("view", debug),
            inner: Mutex::new(ViewInner {
                html: String::new(),
                dirty: false,
            }),
            debug,
        }
    }

    /// Replace the current HTML and attempt an immediate push.
    ///
    /// Safe to call from any thread, blocking or async context; it never
    /// waits on the network. With no connected client this only records the
    /// state for the next connect.
    pub fn update(&self, html: &str) {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.html = html.to_string();
            inner.dirty = true;
        }
        self.flush();
    }

    /// Push the current HTML if it is dirty and a client is connected.
    fn flush(&self) {
        let mut inner = self.inner.lock().unwrap();
        if !inner.dirty {
            return;
        }

        let envelope = Envelope::Html {
            data: inner.html.clone(),
        };
        if let Ok(json) = serde_json::to_string(&envelope) {
            if self.slot.send(json) {
                inner.dirty = false;
                if self.debug {
                    info!("view updated");
                }
            } else if self.debug {
                info!("no client connected for view update");
            }
        }
    }

    /// Called by the view socket actor when a new connection is accepted.
    ///
    /// Registers the connection and immediately flushes retained HTML so a
    /// reconnecting page never shows stale content.
    pub fn connect(&self, client: Recipient<Outbound>) -> u64 {
        let generation = self.slot.attach(client);
        self.flush();
        generation
    }

    /// Called by the view socket actor on its guaranteed-cleanup path.
    pub fn disconnect(&self, generation: u64) {
        self.slot.release(generation);
    }

    pub fn is_connected(&self) -> bool {
        self.slot.is_connected()
    }

    pub fn is_dirty(&self) -> bool {
        self.inner.lock().unwrap().dirty
    }

    /// Current HTML, mainly for the health endpoint and tests.
    pub fn html(&self) -> String {
        self.inner.lock().unwrap().html.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::testing::{collector, settle};

    #[test]
    fn test_update_without_client_retains_latest() {
        let view = ViewState::new(false);
        view.update("<h1>first</h1>");
        view.update("<h1>second</h1>");

        assert!(view.is_dirty());
        assert_eq!(view.html(), "<h1>second</h1>");
    }

    #[actix_web::test]
    async fn test_connect_flushes_retained_html() {
        let view = ViewState::new(false);
        view.update("<p>queued before connect</p>");

        let (client, frames) = collector();
        view.connect(client);
        settle().await;

        assert!(!view.is_dirty());
        let frames = frames.lock().unwrap();
        assert_eq!(frames.len(), 1);
        let envelope: Envelope = serde_json::from_str(&frames[0]).unwrap();
        match envelope {
            Envelope::Html { data } => assert_eq!(data, "<p>queued before connect</p>"),
            other => panic!("unexpected envelope: {:?}", other),
        }
    }

    #[actix_web::test]
    async fn test_connect_with_clean_state_pushes_nothing() {
        let view = ViewState::new(false);
        let (client, frames) = collector();
        view.connect(client);
        settle().await;

        assert!(frames.lock().unwrap().is_empty());
    }

    #[actix_web::test]
    async fn test_update_while_connected_pushes_immediately() {
        let view = ViewState::new(false);
        let (client, frames) = collector();
        view.connect(client);

        view.update("<div>live</div>");
        settle().await;

        assert!(!view.is_dirty());
        assert_eq!(frames.lock().unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn test_dirty_set_again_after_disconnect() {
        let view = ViewState::new(false);
        let (client, _frames) = collector();
        let generation = view.connect(client);

        view.update("<div>seen</div>");
        view.disconnect(generation);
        view.update("<div>unseen</div>");

        assert!(view.is_dirty());
        assert_eq!(view.html(), "<div>unseen</div>");
    }
}
