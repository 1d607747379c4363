//! # WebSocket Channel Handlers
//!
//! One WebSocket endpoint per logical channel, each owned by its own actor:
//!
//! - `/ws-view` — outbound HTML pushes, no application-level inbound traffic
//! - `/ws-audio-player` — outbound audio clips, inbound playback
//!   acknowledgments
//! - `/ws-audio-recorder` — outbound recording commands, inbound sample
//!   frames
//!
//! ## Wire format:
//! UTF-8 text frames carrying JSON envelopes tagged with `"type"`:
//! `{"type":"html","data":...}`, `{"type":"audio","id","data","delay"}`,
//! `{"type":"command","command":...}`, `{"type":"playback_complete","id"}`,
//! `{"type":"audio_data","data":[...]}`. The same envelope scheme applies on
//! every channel; raw text frames are not used.
//!
//! ## Lifecycle:
//! On start each actor attaches itself to its channel component and receives
//! a generation number; `stopped` is the guaranteed-cleanup path that
//! releases it (generation-checked, so a superseded connection cannot clobber
//! its replacement). Malformed inbound JSON is a protocol error that tears
//! down the connection — never a process crash. WebSocket-level ping/pong
//! keeps half-dead connections from lingering.

use crate::channel::Outbound;
use crate::playback::PlaybackSession;
use crate::recording::RecordingSession;
use crate::state::AppState;
use crate::view::ViewState;

use actix::prelude::*;
use actix_web::{web, HttpRequest, HttpResponse, Result as ActixResult};
use actix_web_actors::ws;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Interval between server-initiated heartbeat pings.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// How long a connection may go silent before it is dropped.
const CLIENT_TIMEOUT: Duration = Duration::from_secs(60);

/// JSON envelope shared by all three channels.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Envelope {
    /// HTML fragment replacing the page's content area (server → page)
    Html { data: String },

    /// One audio clip for playback (server → page)
    Audio {
        id: Uuid,
        /// Base64 data URI of the clip
        data: String,
        /// Seconds to wait before starting playback
        #[serde(skip_serializing_if = "Option::is_none")]
        delay: Option<f32>,
    },

    /// Recording control command (server → page)
    Command { command: String },

    /// Playback finished for the given clip (page → server)
    PlaybackComplete { id: Uuid },

    /// One frame of captured float samples in [-1.0, 1.0] (page → server)
    AudioData { data: Vec<f32> },
}

/// View-update socket: pushes HTML, expects no application messages back.
pub struct ViewSocket {
    view: Arc<ViewState>,
    generation: Option<u64>,
    last_heartbeat: Instant,
}

impl ViewSocket {
    pub fn new(view: Arc<ViewState>) -> Self {
        Self {
            view,
            generation: None,
            last_heartbeat: Instant::now(),
        }
    }
}

impl Actor for ViewSocket {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        start_heartbeat(ctx, |actor: &ViewSocket| actor.last_heartbeat);
        self.generation = Some(self.view.connect(ctx.address().recipient()));
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        if let Some(generation) = self.generation.take() {
            self.view.disconnect(generation);
        }
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for ViewSocket {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Text(text)) => match serde_json::from_str::<Envelope>(&text) {
                Ok(envelope) => {
                    warn!("unexpected message on view channel: {:?}", envelope);
                }
                Err(err) => {
                    warn!("protocol error on view channel, closing: {}", err);
                    ctx.stop();
                }
            },
            other => handle_control_frame(other, &mut self.last_heartbeat, ctx),
        }
    }
}

impl Handler<Outbound> for ViewSocket {
    type Result = ();

    fn handle(&mut self, msg: Outbound, ctx: &mut Self::Context) {
        ctx.text(msg.0);
    }
}

/// Audio-playback socket: sends clips, consumes acknowledgments.
pub struct PlaybackSocket {
    playback: Arc<PlaybackSession>,
    generation: Option<u64>,
    last_heartbeat: Instant,
}

impl PlaybackSocket {
    pub fn new(playback: Arc<PlaybackSession>) -> Self {
        Self {
            playback,
            generation: None,
            last_heartbeat: Instant::now(),
        }
    }
}

impl Actor for PlaybackSocket {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        start_heartbeat(ctx, |actor: &PlaybackSocket| actor.last_heartbeat);
        self.generation = Some(self.playback.connect(ctx.address().recipient()));
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        if let Some(generation) = self.generation.take() {
            self.playback.disconnect(generation);
        }
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for PlaybackSocket {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Text(text)) => match serde_json::from_str::<Envelope>(&text) {
                Ok(Envelope::PlaybackComplete { id }) => {
                    self.playback.acknowledge(id);
                }
                Ok(envelope) => {
                    warn!("unexpected message on playback channel: {:?}", envelope);
                }
                Err(err) => {
                    warn!("protocol error on playback channel, closing: {}", err);
                    ctx.stop();
                }
            },
            other => handle_control_frame(other, &mut self.last_heartbeat, ctx),
        }
    }
}

impl Handler<Outbound> for PlaybackSocket {
    type Result = ();

    fn handle(&mut self, msg: Outbound, ctx: &mut Self::Context) {
        ctx.text(msg.0);
    }
}

/// Audio-recording socket: sends commands, consumes sample frames.
pub struct RecordingSocket {
    recording: Arc<RecordingSession>,
    generation: Option<u64>,
    last_heartbeat: Instant,
}

impl RecordingSocket {
    pub fn new(recording: Arc<RecordingSession>) -> Self {
        Self {
            recording,
            generation: None,
            last_heartbeat: Instant::now(),
        }
    }
}

impl Actor for RecordingSocket {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        start_heartbeat(ctx, |actor: &RecordingSocket| actor.last_heartbeat);
        self.generation = Some(self.recording.connect(ctx.address().recipient()));
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        if let Some(generation) = self.generation.take() {
            self.recording.disconnect(generation);
        }
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for RecordingSocket {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Text(text)) => match serde_json::from_str::<Envelope>(&text) {
                Ok(Envelope::AudioData { data }) => {
                    debug!("received {} audio samples", data.len());
                    self.recording.ingest_samples(&data);
                }
                Ok(envelope) => {
                    warn!("unexpected message on recording channel: {:?}", envelope);
                }
                Err(err) => {
                    warn!("protocol error on recording channel, closing: {}", err);
                    ctx.stop();
                }
            },
            other => handle_control_frame(other, &mut self.last_heartbeat, ctx),
        }
    }
}

impl Handler<Outbound> for RecordingSocket {
    type Result = ();

    fn handle(&mut self, msg: Outbound, ctx: &mut Self::Context) {
        ctx.text(msg.0);
    }
}

/// Schedule the heartbeat timer for a socket actor.
fn start_heartbeat<A>(ctx: &mut ws::WebsocketContext<A>, last_heartbeat: fn(&A) -> Instant)
where
    A: Actor<Context = ws::WebsocketContext<A>>,
{
    ctx.run_interval(HEARTBEAT_INTERVAL, move |actor, ctx| {
        if Instant::now().duration_since(last_heartbeat(actor)) > CLIENT_TIMEOUT {
            warn!("websocket heartbeat timeout, closing connection");
            ctx.stop();
        } else {
            ctx.ping(b"");
        }
    });
}

/// Common handling for non-text frames: ping/pong bookkeeping, close,
/// protocol errors.
fn handle_control_frame<A>(
    msg: Result<ws::Message, ws::ProtocolError>,
    last_heartbeat: &mut Instant,
    ctx: &mut ws::WebsocketContext<A>,
) where
    A: Actor<Context = ws::WebsocketContext<A>>,
{
    match msg {
        Ok(ws::Message::Ping(data)) => {
            *last_heartbeat = Instant::now();
            ctx.pong(&data);
        }
        Ok(ws::Message::Pong(_)) => {
            *last_heartbeat = Instant::now();
        }
        Ok(ws::Message::Close(reason)) => {
            info!("websocket closed: {:?}", reason);
            ctx.stop();
        }
        Ok(ws::Message::Binary(_)) => {
            warn!("unexpected binary frame, closing");
            ctx.stop();
        }
        Ok(ws::Message::Continuation(_)) => {
            warn!("unexpected continuation frame");
        }
        Ok(ws::Message::Nop) | Ok(ws::Message::Text(_)) => {}
        Err(err) => {
            warn!("websocket protocol error: {}", err);
            ctx.stop();
        }
    }
}

/// HTTP → WebSocket upgrade for the view-update channel.
pub async fn view_socket(
    req: HttpRequest,
    stream: web::Payload,
    state: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    ws::start(ViewSocket::new(state.view.clone()), &req, stream)
}

/// HTTP → WebSocket upgrade for the audio-playback channel.
pub async fn playback_socket(
    req: HttpRequest,
    stream: web::Payload,
    state: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    ws::start(PlaybackSocket::new(state.playback.clone()), &req, stream)
}

/// HTTP → WebSocket upgrade for the audio-recording channel.
pub async fn recording_socket(
    req: HttpRequest,
    stream: web::Payload,
    state: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    ws::start(RecordingSocket::new(state.recording.clone()), &req, stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_serialization() {
        let envelope = Envelope::Html {
            data: "<h1>hello</h1>".to_string(),
        };
        let json = serde_json::to_string(&envelope).unwrap();
        assert!(json.contains(r#""type":"html""#));

        let envelope = Envelope::Command {
            command: "start_recording".to_string(),
        };
        let json = serde_json::to_string(&envelope).unwrap();
        assert_eq!(json, r#"{"type":"command","command":"start_recording"}"#);
    }

    #[test]
    fn test_envelope_round_trip() {
        let id = Uuid::new_v4();
        let envelope = Envelope::Audio {
            id,
            data: "data:audio/wav;base64,AAAA".to_string(),
            delay: Some(3.0),
        };
        let json = serde_json::to_string(&envelope).unwrap();
        match serde_json::from_str::<Envelope>(&json).unwrap() {
            Envelope::Audio { id: decoded, data, delay } => {
                assert_eq!(decoded, id);
                assert_eq!(data, "data:audio/wav;base64,AAAA");
                assert_eq!(delay, Some(3.0));
            }
            other => panic!("wrong envelope type: {:?}", other),
        }
    }

    #[test]
    fn test_inbound_envelopes_parse() {
        let id = Uuid::new_v4();
        let json = format!(r#"{{"type":"playback_complete","id":"{}"}}"#, id);
        match serde_json::from_str::<Envelope>(&json).unwrap() {
            Envelope::PlaybackComplete { id: decoded } => assert_eq!(decoded, id),
            other => panic!("wrong envelope type: {:?}", other),
        }

        let json = r#"{"type":"audio_data","data":[-1.0,0.0,0.5,1.0]}"#;
        match serde_json::from_str::<Envelope>(json).unwrap() {
            Envelope::AudioData { data } => assert_eq!(data, vec![-1.0, 0.0, 0.5, 1.0]),
            other => panic!("wrong envelope type: {:?}", other),
        }
    }

    #[test]
    fn test_malformed_envelopes_rejected() {
        assert!(serde_json::from_str::<Envelope>("not json at all").is_err());
        assert!(serde_json::from_str::<Envelope>(r#"{"type":"teleport"}"#).is_err());
        // Missing required field
        assert!(serde_json::from_str::<Envelope>(r#"{"type":"playback_complete"}"#).is_err());
    }
}
