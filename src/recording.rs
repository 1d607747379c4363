//! # Recording Session
//!
//! Toggles remote microphone capture on the browser page and forwards the
//! streamed samples to a caller-supplied sink.
//!
//! ## Protocol:
//! - `start_recording` sends `{"type":"command","command":"start_recording"}`
//!   to the connected page and registers the sink; it is a `false`-returning
//!   no-op when no client is connected
//! - the page streams `{"type":"audio_data","data":[...]}` frames of float
//!   samples in [-1.0, 1.0] (32-bit float PCM, single channel)
//! - each frame is converted to 16-bit signed little-endian PCM and handed to
//!   the sink — but only while the recording flag is set; frames arriving
//!   after `stop_recording` are discarded without invoking the sink
//!
//! Only one sink is active at a time; a second `start_recording` replaces the
//! previous sink reference. When the recording connection drops, the flag and
//! sink are cleared — a freshly loaded page is always non-recording, so a
//! stale server-side flag would misreport state.

use crate::audio::pcm;
use crate::channel::{ChannelSlot, Outbound};
use crate::websocket::Envelope;
use actix::Recipient;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::info;

/// Callback receiving converted 16-bit PCM byte buffers.
pub type AudioSink = Arc<dyn Fn(Vec<u8>) + Send + Sync>;

pub struct RecordingSession {
    slot: ChannelSlot,
    sink: Mutex<Option<AudioSink>>,
    recording: AtomicBool,
    debug: bool,
}

impl RecordingSession {
    pub fn new(debug: bool) -> Self {
        Self {
            slot: ChannelSlot::new("recording", debug),
            sink: Mutex::new(None),
            recording: AtomicBool::new(false),
            debug,
        }
    }

    /// Ask the page to start capturing and register the sink.
    ///
    /// Returns `false` (and registers nothing) when no client is connected.
    /// Calling this while already recording replaces the sink.
    pub fn start_recording(&self, sink: AudioSink) -> bool {
        if !self.send_command("start_recording") {
            if self.debug {
                info!("no client connected to start recording");
            }
            return false;
        }

        *self.sink.lock().unwrap() = Some(sink);
        self.recording.store(true, Ordering::SeqCst);
        if self.debug {
            info!("recording started");
        }
        true
    }

    /// Ask the page to stop capturing and drop the sink.
    ///
    /// The local flag and sink are cleared unconditionally; the return value
    /// reports whether the stop command actually reached a client.
    pub fn stop_recording(&self) -> bool {
        let delivered = self.send_command("stop_recording");
        self.recording.store(false, Ordering::SeqCst);
        *self.sink.lock().unwrap() = None;
        if self.debug {
            info!("recording stopped (command delivered: {})", delivered);
        }
        delivered
    }

    fn send_command(&self, command: &str) -> bool {
        let envelope = Envelope::Command {
            command: command.to_string(),
        };
        match serde_json::to_string(&envelope) {
            Ok(json) => self.slot.send(json),
            Err(_) => false,
        }
    }

    /// Feed one inbound sample frame from the page.
    ///
    /// Converts to 16-bit PCM bytes and invokes the sink while recording;
    /// frames arriving outside a recording session are discarded.
    pub fn ingest_samples(&self, samples: &[f32]) {
        if !self.recording.load(Ordering::SeqCst) {
            return;
        }

        let sink = self.sink.lock().unwrap().clone();
        if let Some(sink) = sink {
            sink(pcm::float_frame_to_bytes(samples));
        }
    }

    /// Called by the recording socket actor when a new connection is accepted.
    pub fn connect(&self, client: Recipient<Outbound>) -> u64 {
        self.slot.attach(client)
    }

    /// Called by the recording socket actor on its guaranteed-cleanup path.
    ///
    /// A genuine disconnect ends the capture session: the stream source is
    /// gone, so the flag and sink are cleared.
    pub fn disconnect(&self, generation: u64) {
        if self.slot.release(generation) {
            self.recording.store(false, Ordering::SeqCst);
            *self.sink.lock().unwrap() = None;
        }
    }

    pub fn is_connected(&self) -> bool {
        self.slot.is_connected()
    }

    pub fn is_recording(&self) -> bool {
        self.recording.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::testing::{collector, settle};

    fn capture_sink() -> (AudioSink, Arc<Mutex<Vec<Vec<u8>>>>) {
        let captured: Arc<Mutex<Vec<Vec<u8>>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let captured = captured.clone();
            Arc::new(move |bytes: Vec<u8>| {
                captured.lock().unwrap().push(bytes);
            }) as AudioSink
        };
        (sink, captured)
    }

    #[test]
    fn test_start_recording_without_client_is_noop() {
        let session = RecordingSession::new(false);
        let (sink, captured) = capture_sink();

        assert!(!session.start_recording(sink));
        assert!(!session.is_recording());

        // Samples with no session registered never reach a sink
        session.ingest_samples(&[0.5, -0.5]);
        assert!(captured.lock().unwrap().is_empty());
    }

    #[actix_web::test]
    async fn test_recording_round_trip() {
        let session = RecordingSession::new(false);
        let (client, frames) = collector();
        session.connect(client);

        let (sink, captured) = capture_sink();
        assert!(session.start_recording(sink));
        assert!(session.is_recording());

        session.ingest_samples(&[-1.0, 0.0, 1.0]);
        let buffers = captured.lock().unwrap();
        assert_eq!(buffers.len(), 1);
        // -32767, 0, 32767 little-endian
        assert_eq!(buffers[0], vec![0x01, 0x80, 0x00, 0x00, 0xFF, 0x7F]);
        drop(buffers);

        assert!(session.stop_recording());
        assert!(!session.is_recording());

        // Late frames after stop are discarded
        session.ingest_samples(&[0.25; 16]);
        assert_eq!(captured.lock().unwrap().len(), 1);

        settle().await;
        let frames = frames.lock().unwrap();
        let commands: Vec<String> = frames
            .iter()
            .map(|frame| match serde_json::from_str(frame).unwrap() {
                Envelope::Command { command } => command,
                other => panic!("unexpected envelope: {:?}", other),
            })
            .collect();
        assert_eq!(commands, vec!["start_recording", "stop_recording"]);
    }

    #[actix_web::test]
    async fn test_second_start_replaces_sink() {
        let session = RecordingSession::new(false);
        let (client, _frames) = collector();
        session.connect(client);

        let (first_sink, first_captured) = capture_sink();
        let (second_sink, second_captured) = capture_sink();

        assert!(session.start_recording(first_sink));
        assert!(session.start_recording(second_sink));

        session.ingest_samples(&[0.5]);
        assert!(first_captured.lock().unwrap().is_empty());
        assert_eq!(second_captured.lock().unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn test_disconnect_ends_capture() {
        let session = RecordingSession::new(false);
        let (client, _frames) = collector();
        let generation = session.connect(client);

        let (sink, captured) = capture_sink();
        assert!(session.start_recording(sink));

        session.disconnect(generation);
        assert!(!session.is_recording());

        session.ingest_samples(&[0.5]);
        assert!(captured.lock().unwrap().is_empty());
    }
}
