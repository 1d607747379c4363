//! # Playback Session
//!
//! A FIFO queue of pending audio clips plus a completion-tracking registry.
//! Application code enqueues clips from any thread; the queue drains onto the
//! active playback connection, and each clip stays "pending" until the page
//! acknowledges it with a `playback_complete` envelope.
//!
//! ## Clip lifecycle:
//! 1. **Queued**: created by `play`, waiting in the FIFO
//! 2. **Sent**: dequeued and written to the wire, id moves to the sent set
//! 3. **Acknowledged**: completion envelope received, id removed; when the
//!    pending count reaches zero, waiters on `wait_until_finished` release
//!
//! Clips are transmitted strictly in submission order; the browser page is
//! responsible for playing them sequentially and honoring each clip's delay.
//! Acknowledgments may arrive in any order. A duplicate or unknown
//! acknowledgment is a benign no-op.
//!
//! ## Disconnect policy:
//! When a playback connection is released (or superseded), clips already sent
//! on it are dropped from the pending set — the page that would have
//! acknowledged them is gone, and `wait_until_finished` must not hang on a
//! dead connection. Clips still queued stay pending and are flushed to the
//! next connection, the same way retained HTML is.

use crate::channel::{ChannelSlot, Outbound};
use crate::websocket::Envelope;
use actix::Recipient;
use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;
use tokio::sync::watch;
use tracing::{info, warn};
use uuid::Uuid;

/// One discrete audio-playback request.
#[derive(Debug, Clone)]
pub struct AudioClip {
    pub id: Uuid,
    /// String-encoded audio, typically a base64 `data:audio/wav` URI
    pub data: String,
    /// Playback delay in seconds, applied by the browser before starting
    pub delay: Option<f32>,
}

struct PlaybackInner {
    /// Clips not yet written to the wire, in submission order
    queue: VecDeque<AudioClip>,

    /// Ids transmitted on the current connection, awaiting acknowledgment
    sent: HashSet<Uuid>,
}

impl PlaybackInner {
    fn pending_count(&self) -> usize {
        self.queue.len() + self.sent.len()
    }
}

pub struct PlaybackSession {
    slot: ChannelSlot,
    inner: Mutex<PlaybackInner>,

    /// Mirrors the pending count so waiters can await it reaching zero
    outstanding: watch::Sender<usize>,

    debug: bool,
}

impl PlaybackSession {
    pub fn new(debug: bool) -> Self {
        let (outstanding, _) = watch::channel(0);
        Self {
            slot: ChannelSlot::new("playback", debug),
            inner: Mutex::new(PlaybackInner {
                queue: VecDeque::new(),
                sent: HashSet::new(),
            }),
            outstanding,
            debug,
        }
    }

    /// Enqueue a clip for playback and return its identifier.
    ///
    /// Fire-and-return: the id comes back as soon as the clip is queued and
    /// transmission-eligible, not once playback completes. Use
    /// `wait_until_finished` to block until every pending clip has been
    /// acknowledged.
    pub fn play(&self, data: impl Into<String>, delay: Option<f32>) -> Uuid {
        let id = Uuid::new_v4();
        {
            let mut inner = self.inner.lock().unwrap();
            inner.queue.push_back(AudioClip {
                id,
                data: data.into(),
                delay,
            });
            self.outstanding.send_replace(inner.pending_count());
        }
        self.drain();
        id
    }

    /// Transmit queued clips in FIFO order until the queue is empty or the
    /// connection is unavailable.
    fn drain(&self) {
        let mut inner = self.inner.lock().unwrap();
        while let Some(clip) = inner.queue.pop_front() {
            let envelope = Envelope::Audio {
                id: clip.id,
                data: clip.data.clone(),
                delay: clip.delay,
            };
            match serde_json::to_string(&envelope) {
                Ok(json) => {
                    if self.slot.send(json) {
                        inner.sent.insert(clip.id);
                        if self.debug {
                            info!("audio clip {} sent for playback", clip.id);
                        }
                    } else {
                        // No client: keep the clip at the head for the next
                        // connection
                        inner.queue.push_front(clip);
                        break;
                    }
                }
                Err(err) => {
                    warn!("dropping audio clip {}: {}", clip.id, err);
                }
            }
        }
        self.outstanding.send_replace(inner.pending_count());
    }

    /// Record a completion acknowledgment from the page.
    ///
    /// Unknown or repeated ids are benign: the first acknowledgment removes
    /// the entry, later ones find nothing to remove.
    pub fn acknowledge(&self, id: Uuid) {
        let mut inner = self.inner.lock().unwrap();
        if inner.sent.remove(&id) {
            if self.debug {
                info!("audio clip {} finished", id);
            }
        } else if self.debug {
            info!("ignoring acknowledgment for unknown clip {}", id);
        }
        self.outstanding.send_replace(inner.pending_count());
    }

    /// Wait until every currently queued or sent clip has been acknowledged.
    ///
    /// Returns immediately when nothing is pending. There is no timeout; a
    /// page that never acknowledges keeps the caller waiting until the
    /// connection drops and the disconnect policy clears the in-flight set.
    pub async fn wait_until_finished(&self) {
        let mut rx = self.outstanding.subscribe();
        let _ = rx.wait_for(|count| *count == 0).await;
    }

    /// Drop all not-yet-sent clips and release any waiters.
    ///
    /// This cancels backlog, not in-flight playback: clips the page already
    /// received keep playing, and their late acknowledgments are ignored.
    pub fn clear_queue(&self) {
        let mut inner = self.inner.lock().unwrap();
        let dropped = inner.queue.len();
        inner.queue.clear();
        inner.sent.clear();
        self.outstanding.send_replace(0);
        if self.debug && dropped > 0 {
            info!("cleared {} queued audio clips", dropped);
        }
    }

    /// Called by the playback socket actor when a new connection is accepted.
    ///
    /// In-flight clips from a previous connection are dropped from the
    /// pending set (their page is gone), then the backlog drains to the new
    /// client in order.
    pub fn connect(&self, client: Recipient<Outbound>) -> u64 {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.sent.clear();
            self.outstanding.send_replace(inner.pending_count());
        }
        let generation = self.slot.attach(client);
        self.drain();
        generation
    }

    /// Called by the playback socket actor on its guaranteed-cleanup path.
    pub fn disconnect(&self, generation: u64) {
        if self.slot.release(generation) {
            let mut inner = self.inner.lock().unwrap();
            if !inner.sent.is_empty() {
                if self.debug {
                    info!(
                        "dropping {} unacknowledged clips from closed connection",
                        inner.sent.len()
                    );
                }
                inner.sent.clear();
            }
            self.outstanding.send_replace(inner.pending_count());
        }
    }

    pub fn is_connected(&self) -> bool {
        self.slot.is_connected()
    }

    /// Clips queued or sent but not yet acknowledged.
    pub fn pending_count(&self) -> usize {
        self.inner.lock().unwrap().pending_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::testing::{collector, settle};
    use std::sync::Arc;
    use std::time::Duration;

    fn decode(frame: &str) -> Envelope {
        serde_json::from_str(frame).unwrap()
    }

    #[test]
    fn test_play_without_client_queues() {
        let session = PlaybackSession::new(false);
        let id = session.play("data:audio/wav;base64,AAAA", None);
        assert_ne!(id, Uuid::nil());
        assert_eq!(session.pending_count(), 1);
    }

    #[actix_web::test]
    async fn test_clips_transmit_in_fifo_order() {
        let session = PlaybackSession::new(false);
        let first = session.play("data:audio/wav;base64,AAAA", None);
        let second = session.play("data:audio/wav;base64,BBBB", Some(2.0));

        let (client, frames) = collector();
        session.connect(client);
        let third = session.play("data:audio/wav;base64,CCCC", None);
        settle().await;

        let frames = frames.lock().unwrap();
        let ids: Vec<Uuid> = frames
            .iter()
            .map(|frame| match decode(frame) {
                Envelope::Audio { id, .. } => id,
                other => panic!("unexpected envelope: {:?}", other),
            })
            .collect();
        assert_eq!(ids, vec![first, second, third]);
    }

    #[actix_web::test]
    async fn test_audio_envelope_shape() {
        let session = PlaybackSession::new(false);
        let (client, frames) = collector();
        session.connect(client);

        let id = session.play("data:audio/wav;base64,AAAA", Some(3.0));
        settle().await;

        let frames = frames.lock().unwrap();
        let value: serde_json::Value = serde_json::from_str(&frames[0]).unwrap();
        assert_eq!(value["type"], "audio");
        assert_eq!(value["id"], id.to_string());
        assert_eq!(value["data"], "data:audio/wav;base64,AAAA");
        assert_eq!(value["delay"].as_f64().unwrap(), 3.0);
    }

    #[actix_web::test]
    async fn test_delay_omitted_when_absent() {
        let session = PlaybackSession::new(false);
        let (client, frames) = collector();
        session.connect(client);

        session.play("data:audio/wav;base64,AAAA", None);
        settle().await;

        let frames = frames.lock().unwrap();
        let value: serde_json::Value = serde_json::from_str(&frames[0]).unwrap();
        assert!(value.get("delay").is_none());
    }

    #[actix_web::test]
    async fn test_acknowledge_is_idempotent() {
        let session = PlaybackSession::new(false);
        let (client, _frames) = collector();
        session.connect(client);

        let id = session.play("data:audio/wav;base64,AAAA", None);
        assert_eq!(session.pending_count(), 1);

        session.acknowledge(id);
        assert_eq!(session.pending_count(), 0);

        // Second acknowledgment for the same id changes nothing
        session.acknowledge(id);
        assert_eq!(session.pending_count(), 0);

        // Unknown ids are equally harmless
        session.acknowledge(Uuid::new_v4());
        assert_eq!(session.pending_count(), 0);
    }

    #[actix_web::test]
    async fn test_wait_until_finished_releases_on_ack() {
        let session = Arc::new(PlaybackSession::new(false));
        let (client, _frames) = collector();
        session.connect(client);
        let id = session.play("data:audio/wav;base64,AAAA", None);

        let waiter = {
            let session = session.clone();
            actix_web::rt::spawn(async move {
                session.wait_until_finished().await;
            })
        };

        // The waiter must still be blocked while the clip is pending
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        session.acknowledge(id);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should release after acknowledgment")
            .unwrap();
    }

    #[actix_web::test]
    async fn test_wait_until_finished_rearms_for_new_clips() {
        let session = PlaybackSession::new(false);
        let (client, _frames) = collector();
        session.connect(client);

        // Nothing pending: returns immediately
        tokio::time::timeout(Duration::from_millis(100), session.wait_until_finished())
            .await
            .expect("empty pending set should not block");

        let _id = session.play("data:audio/wav;base64,AAAA", None);
        assert_eq!(session.pending_count(), 1);

        // Pending again: a fresh wait must block until the new clip is acked
        let blocked =
            tokio::time::timeout(Duration::from_millis(50), session.wait_until_finished()).await;
        assert!(blocked.is_err());
    }

    #[actix_web::test]
    async fn test_clear_queue_releases_waiters() {
        let session = Arc::new(PlaybackSession::new(false));
        for _ in 0..3 {
            session.play("data:audio/wav;base64,AAAA", None);
        }
        assert_eq!(session.pending_count(), 3);

        let waiter = {
            let session = session.clone();
            actix_web::rt::spawn(async move {
                session.wait_until_finished().await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        session.clear_queue();
        assert_eq!(session.pending_count(), 0);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("clear_queue should release waiters")
            .unwrap();
    }

    #[actix_web::test]
    async fn test_disconnect_drops_in_flight_keeps_queued() {
        let session = PlaybackSession::new(false);
        let (client, _frames) = collector();
        let generation = session.connect(client);

        // Transmitted on the live connection
        let _sent = session.play("data:audio/wav;base64,AAAA", None);
        assert_eq!(session.pending_count(), 1);

        session.disconnect(generation);
        // The dead connection's in-flight clip is dropped
        assert_eq!(session.pending_count(), 0);

        // Queued while disconnected: stays pending for the next connection
        let queued = session.play("data:audio/wav;base64,BBBB", None);
        assert_eq!(session.pending_count(), 1);

        let (client, frames) = collector();
        session.connect(client);
        settle().await;

        let frames = frames.lock().unwrap();
        match decode(&frames[0]) {
            Envelope::Audio { id, .. } => assert_eq!(id, queued),
            other => panic!("unexpected envelope: {:?}", other),
        }
    }
}
