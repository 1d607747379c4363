//! # kioskview
//!
//! A minimal desktop-like UI shell: a local actix-web server renders a single
//! host page in a launched browser, and the host process pushes HTML
//! fragments and audio playback/recording commands to that page over
//! persistent WebSocket connections, receiving recorded audio back.
//!
//! ## Quick start
//!
//! ```no_run
//! use kioskview::{AppConfig, Webview};
//!
//! fn main() -> anyhow::Result<()> {
//!     let webview = Webview::new(AppConfig::default())?;
//!     webview.start()?;
//!
//!     webview.update_view_blocking("<h1>Hello from the host process</h1>");
//!
//!     let clip = webview.play_audio_blocking(
//!         kioskview::audio::encode::wav_file_to_data_uri("chime.wav")?,
//!         None,
//!     );
//!     println!("clip {clip} queued");
//!     webview.wait_until_finished_blocking();
//!     Ok(())
//! }
//! ```
//!
//! Async callers use the non-`_blocking` variants of the same operations.
//!
//! ## Architecture
//!
//! - [`channel`]: one generation-counted connection slot per logical channel
//! - [`view`]: latest-HTML-wins push state with dirty-flag catch-up
//! - [`playback`]: FIFO clip queue with per-clip completion tracking
//! - [`recording`]: remote capture toggle + float→PCM sink forwarding
//! - [`websocket`]: the JSON envelope and the three socket actors
//! - [`webview`]: the caller-facing facade bridging blocking and async call
//!   sites
//! - [`page`], [`server`], [`browser`]: host page, HTTP assembly, browser
//!   launch
//! - [`config`], [`state`], [`error`], [`health`], [`middleware`],
//!   [`handlers`]: configuration, shared state, and the API surface

pub mod audio;
pub mod browser;
pub mod channel;
pub mod config;
pub mod error;
pub mod handlers;
pub mod health;
pub mod middleware;
pub mod page;
pub mod playback;
pub mod recording;
pub mod server;
pub mod state;
pub mod view;
pub mod websocket;
pub mod webview;

pub use config::AppConfig;
pub use recording::AudioSink;
pub use state::AppState;
pub use webview::Webview;
