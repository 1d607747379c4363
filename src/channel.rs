//! # Connection Channel
//!
//! One logical duplex channel (view update, audio playback, audio recording)
//! owns at most one live WebSocket connection at a time. `ChannelSlot` is the
//! registry for that single connection: the socket actor attaches itself on
//! connect and releases itself on disconnect, while the channel components
//! push outbound frames through the slot from whatever thread they are called
//! on.
//!
//! ## Connection lifecycle:
//! 1. **Attach**: a freshly accepted socket registers its address and receives
//!    a generation number; any previous connection is silently superseded
//! 2. **Send**: outbound frames go into the current socket actor's mailbox,
//!    which is the single writer to the wire
//! 3. **Release**: when the socket's loop exits (peer close, network error,
//!    protocol error) the actor releases its generation; the slot is cleared
//!    only if that generation is still the active one, so a slow-closing old
//!    connection can never clobber a freshly accepted replacement

use actix::prelude::*;
use std::sync::Mutex;
use tracing::info;

/// Outbound UTF-8 text frame destined for the connected browser page.
///
/// Every socket actor implements `Handler<Outbound>` by writing the payload
/// as a WebSocket text frame.
#[derive(Message)]
#[rtype(result = "()")]
pub struct Outbound(pub String);

/// The single-connection registry for one logical channel.
pub struct ChannelSlot {
    /// Channel name used in log output ("view", "playback", "recording")
    name: &'static str,

    /// Verbose connect/disconnect/push logging, inherited from configuration
    debug: bool,

    inner: Mutex<SlotInner>,
}

struct SlotInner {
    /// Monotonic counter; each attached connection gets the next value
    generation: u64,

    /// Mailbox of the currently attached socket actor, if any
    client: Option<Recipient<Outbound>>,
}

impl ChannelSlot {
    pub fn new(name: &'static str, debug: bool) -> Self {
        Self {
            name,
            debug,
            inner: Mutex::new(SlotInner {
                generation: 0,
                client: None,
            }),
        }
    }

    /// Register a new connection and return its generation number.
    ///
    /// A previous connection still registered here is superseded without
    /// ceremony; its eventual `release` will no-op on the generation check.
    pub fn attach(&self, client: Recipient<Outbound>) -> u64 {
        let mut inner = self.inner.lock().unwrap();
        inner.generation += 1;
        inner.client = Some(client);
        if self.debug {
            info!("{} channel: client connected (generation {})", self.name, inner.generation);
        }
        inner.generation
    }

    /// Clear the active connection, but only if `generation` is still current.
    ///
    /// Returns whether the slot was actually cleared; a `false` means a newer
    /// connection has already taken over and the caller's connection was
    /// stale.
    pub fn release(&self, generation: u64) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if inner.generation != generation {
            return false;
        }
        inner.client = None;
        if self.debug {
            info!("{} channel: client disconnected (generation {})", self.name, generation);
        }
        true
    }

    /// Try to send one text frame to the active connection.
    ///
    /// Returns `false` when no client is attached or its mailbox is gone; the
    /// caller decides what "no client" means (keep a dirty flag, re-queue a
    /// clip, report `false` to the application). Delivery is unbounded into
    /// the socket actor's mailbox — the actor is the single writer to the
    /// wire and drains in order.
    pub fn send(&self, text: String) -> bool {
        let mut inner = self.inner.lock().unwrap();
        match &inner.client {
            Some(client) => match client.try_send(Outbound(text)) {
                Ok(()) => true,
                Err(_) => {
                    // The actor is gone but has not released yet
                    inner.client = None;
                    false
                }
            },
            None => false,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.inner.lock().unwrap().client.is_some()
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{collector, settle};
    use super::*;

    #[test]
    fn test_empty_slot_send_fails() {
        let slot = ChannelSlot::new("view", false);
        assert!(!slot.is_connected());
        assert!(!slot.send("hello".to_string()));
    }

    #[actix_web::test]
    async fn test_attach_send_release() {
        let slot = ChannelSlot::new("view", false);
        let (client, frames) = collector();

        let generation = slot.attach(client);
        assert!(slot.is_connected());
        assert!(slot.send("hello".to_string()));

        settle().await;
        assert_eq!(frames.lock().unwrap().as_slice(), ["hello"]);

        assert!(slot.release(generation));
        assert!(!slot.is_connected());
        assert!(!slot.send("after close".to_string()));
    }

    /// A stale connection releasing late must not clear a newer connection.
    #[actix_web::test]
    async fn test_stale_release_does_not_clobber() {
        let slot = ChannelSlot::new("playback", false);
        let (old_client, _) = collector();
        let (new_client, new_frames) = collector();

        let old_generation = slot.attach(old_client);
        let _new_generation = slot.attach(new_client);

        // The superseded connection finally gets around to cleaning up
        assert!(!slot.release(old_generation));
        assert!(slot.is_connected());

        assert!(slot.send("still here".to_string()));
        settle().await;
        assert_eq!(new_frames.lock().unwrap().as_slice(), ["still here"]);
    }
}
