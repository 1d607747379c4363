//! # Webview Facade
//!
//! The caller-facing handle over the whole shell: starts the server on its
//! own thread, launches the browser, and exposes the channel operations to
//! both blocking and non-blocking call sites.
//!
//! ## Call-context bridge:
//! The `async` methods are the primitive implementation. Every one has a
//! `*_blocking` counterpart that runs the same future to completion on a
//! dedicated current-thread runtime owned by this facade — never on the
//! caller's scheduler. Calling a `*_blocking` method from inside an async
//! runtime is a caller error: the thread that would drive the result is the
//! one being blocked. Those calls panic with an explanatory message instead
//! of deadlocking.

use crate::browser;
use crate::config::AppConfig;
use crate::recording::AudioSink;
use crate::server;
use crate::state::AppState;

use anyhow::Result;
use std::future::Future;
use std::process::Child;
use std::sync::Mutex;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{error, info};
use uuid::Uuid;

/// How long `start` waits for the server socket to accept connections.
const READY_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle over a running (or startable) browser shell.
///
/// Construct one per process, share it by reference (or clone the underlying
/// [`AppState`]); all channel state lives in the injected components, not in
/// globals.
pub struct Webview {
    state: AppState,

    /// Dedicated runtime driving blocking entry points
    runtime: tokio::runtime::Runtime,

    server_thread: Mutex<Option<JoinHandle<()>>>,
    browser: Mutex<Option<Child>>,
}

impl Webview {
    /// Create the shell from a validated configuration.
    pub fn new(config: AppConfig) -> Result<Self> {
        config.validate()?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        Ok(Self {
            state: AppState::new(config),
            runtime,
            server_thread: Mutex::new(None),
            browser: Mutex::new(None),
        })
    }

    /// The shared application state, for wiring the shell into an existing
    /// server or inspecting channel status.
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Start the HTTP server on a dedicated thread, wait until it accepts
    /// connections, and launch the browser if configured to.
    pub fn start(&self) -> Result<()> {
        let mut server_thread = self.server_thread.lock().unwrap();
        if server_thread.is_some() {
            return Err(anyhow::anyhow!("webview already started"));
        }

        let state = self.state.clone();
        let handle = std::thread::Builder::new()
            .name("kioskview-server".to_string())
            .spawn(move || {
                let system = actix_web::rt::System::new();
                let result = system.block_on(async move {
                    server::build(state)?.await.map_err(anyhow::Error::from)
                });
                if let Err(err) = result {
                    error!("kioskview server exited with error: {:#}", err);
                }
            })?;
        *server_thread = Some(handle);
        drop(server_thread);

        let config = self.state.get_config();
        server::wait_until_ready(&config.server.host, config.server.port, READY_TIMEOUT)?;
        info!(
            "kioskview server listening on http://{}:{}/",
            config.server.host, config.server.port
        );

        if config.browser.auto_launch {
            let child = browser::launch(&config)?;
            *self.browser.lock().unwrap() = Some(child);
        }

        Ok(())
    }

    /// Replace the page content with the given HTML fragment.
    ///
    /// Fire-and-forget with best-effort delivery: when no client is connected
    /// the fragment is retained and flushed on the next connect.
    pub async fn update_view(&self, html: &str) {
        self.state.view.update(html);
    }

    /// Blocking variant of [`update_view`](Self::update_view).
    pub fn update_view_blocking(&self, html: &str) {
        self.block_on(self.update_view(html));
    }

    /// Queue an audio clip for playback and return its identifier.
    ///
    /// Returns as soon as the clip is queued and transmission-eligible, not
    /// once playback completes; see [`wait_until_finished`](Self::wait_until_finished).
    pub async fn play_audio(&self, audio_data_uri: impl Into<String>, delay: Option<f32>) -> Uuid {
        self.state.playback.play(audio_data_uri, delay)
    }

    /// Blocking variant of [`play_audio`](Self::play_audio).
    pub fn play_audio_blocking(
        &self,
        audio_data_uri: impl Into<String>,
        delay: Option<f32>,
    ) -> Uuid {
        self.block_on(self.play_audio(audio_data_uri, delay))
    }

    /// Wait until every queued or sent clip has been acknowledged as played.
    pub async fn wait_until_finished(&self) {
        self.state.playback.wait_until_finished().await;
    }

    /// Blocking variant of [`wait_until_finished`](Self::wait_until_finished).
    pub fn wait_until_finished_blocking(&self) {
        self.block_on(self.wait_until_finished());
    }

    /// Drop all not-yet-sent clips and release any waiters.
    pub async fn clear_audio_queue(&self) {
        self.state.playback.clear_queue();
    }

    /// Blocking variant of [`clear_audio_queue`](Self::clear_audio_queue).
    pub fn clear_audio_queue_blocking(&self) {
        self.block_on(self.clear_audio_queue());
    }

    /// Start remote recording, feeding converted 16-bit PCM buffers to
    /// `sink`. Returns `false` when no recording client is connected.
    pub async fn start_recording(&self, sink: AudioSink) -> bool {
        self.state.recording.start_recording(sink)
    }

    /// Blocking variant of [`start_recording`](Self::start_recording).
    pub fn start_recording_blocking(&self, sink: AudioSink) -> bool {
        self.block_on(self.start_recording(sink))
    }

    /// Stop remote recording. Returns whether the stop command reached a
    /// client; the local session ends either way.
    pub async fn stop_recording(&self) -> bool {
        self.state.recording.stop_recording()
    }

    /// Blocking variant of [`stop_recording`](Self::stop_recording).
    pub fn stop_recording_blocking(&self) -> bool {
        self.block_on(self.stop_recording())
    }

    /// Run a facade future to completion on the dedicated runtime.
    ///
    /// Must not be called from inside an async runtime: the blocking wait
    /// would starve the very executor expected to produce the result.
    fn block_on<F: Future>(&self, future: F) -> F::Output {
        if tokio::runtime::Handle::try_current().is_ok() {
            panic!(
                "kioskview blocking call invoked from within an async runtime; \
                 use the async variant instead"
            );
        }
        self.runtime.block_on(future)
    }
}

impl Drop for Webview {
    fn drop(&mut self) {
        // The browser window belongs to this shell; take it down with us.
        // The server thread is detached and exits with the process.
        if let Some(mut child) = self.browser.lock().unwrap().take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}
