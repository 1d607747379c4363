//! # Host Page
//!
//! The single HTML page served at `GET /`. It carries a content div that the
//! view channel rewrites, plus three embedded scripts — view updater, audio
//! player, audio recorder — each opening its own WebSocket back to the
//! server. Placeholders of the form `[=[key]=]` are substituted at render
//! time from the configuration; no template engine, the page is small enough
//! for plain string replacement.

use crate::state::AppState;
use actix_web::{web, HttpResponse};

/// WebSocket path for HTML pushes.
pub const VIEW_ENDPOINT: &str = "ws-view";

/// WebSocket path for audio playback.
pub const PLAYBACK_ENDPOINT: &str = "ws-audio-player";

/// WebSocket path for audio recording.
pub const RECORDING_ENDPOINT: &str = "ws-audio-recorder";

const HOST_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>[=[title]=]</title>
    <style>
        html, body, #main_update_content {
            margin: 0;
            padding: 0;
            width: 100%;
            height: 100%;
        }
        body {
            overflow: hidden;
        }
    </style>
</head>
<body>
    <div id="main_update_content"></div>
    <script>
        [=[view_updater_script]=]
        [=[audio_player_script]=]
        [=[audio_recorder_script]=]

        const viewUpdater = new ViewUpdater("ws://[=[host]=]:[=[port]=]/[=[view_endpoint]=]");
        const audioPlayer = new AudioPlayer("ws://[=[host]=]:[=[port]=]/[=[playback_endpoint]=]");
        const audioRecorder = new AudioRecorder("ws://[=[host]=]:[=[port]=]/[=[recording_endpoint]=]");
    </script>
</body>
</html>"#;

/// Receives `{"type":"html","data":...}` envelopes and swaps the content div.
const VIEW_UPDATER_SCRIPT: &str = r#"
class ViewUpdater {
    constructor(wsUrl) {
        this.socket = new WebSocket(wsUrl);
        this.socket.onopen = () => console.log('view channel connected');
        this.socket.onclose = () => console.log('view channel closed');
        this.socket.onerror = (error) => console.error('view channel error:', error);
        this.socket.onmessage = this.onMessage.bind(this);
    }

    onMessage(event) {
        const message = JSON.parse(event.data);
        if (message.type === 'html') {
            document.getElementById('main_update_content').innerHTML = message.data;
        }
    }
}
"#;

/// Receives `{"type":"audio",...}` clips, plays them sequentially honoring
/// each clip's delay, and acknowledges every finished clip with
/// `{"type":"playback_complete","id":...}`.
const AUDIO_PLAYER_SCRIPT: &str = r#"
class AudioPlayer {
    constructor(wsUrl) {
        this.socket = new WebSocket(wsUrl);
        this.audioQueue = [];
        this.isPlaying = false;

        this.socket.onopen = () => console.log('audio player channel connected');
        this.socket.onclose = () => console.log('audio player channel closed');
        this.socket.onerror = (error) => console.error('audio player channel error:', error);
        this.socket.onmessage = this.onMessage.bind(this);
    }

    onMessage(event) {
        const message = JSON.parse(event.data);
        if (message.type === 'audio') {
            this.audioQueue.push(message);
            if (!this.isPlaying) {
                this.playNextAudio();
            }
        }
    }

    playNextAudio() {
        if (this.audioQueue.length === 0) {
            this.isPlaying = false;
            return;
        }

        this.isPlaying = true;
        const clip = this.audioQueue.shift();

        this.playAudio(clip.data, clip.delay)
            .then(() => {
                this.socket.send(JSON.stringify({
                    type: 'playback_complete',
                    id: clip.id
                }));
                this.playNextAudio();
            })
            .catch((error) => {
                console.error('error playing audio:', error);
                this.socket.send(JSON.stringify({
                    type: 'playback_complete',
                    id: clip.id
                }));
                this.playNextAudio();
            });
    }

    async playAudio(base64Audio, delay) {
        return new Promise((resolve, reject) => {
            const audio = new Audio(base64Audio);
            audio.onended = resolve;
            audio.onerror = reject;

            const playWithDelay = () => {
                audio.play().catch(reject);
            };

            if (delay && delay > 0) {
                setTimeout(playWithDelay, delay * 1000);
            } else {
                playWithDelay();
            }
        });
    }
}
"#;

/// Handles `{"type":"command","command":...}` envelopes and streams captured
/// samples back as `{"type":"audio_data","data":[...]}` frames.
const AUDIO_RECORDER_SCRIPT: &str = r#"
class AudioRecorder {
    constructor(wsUrl) {
        this.socket = new WebSocket(wsUrl);
        this.audioContext = null;
        this.mediaStreamSource = null;
        this.processor = null;
        this.stream = null;
        this.isRecording = false;

        this.socket.onopen = () => console.log('audio recorder channel connected');
        this.socket.onclose = () => console.log('audio recorder channel closed');
        this.socket.onerror = (error) => console.error('audio recorder channel error:', error);
        this.socket.onmessage = this.onMessage.bind(this);
    }

    onMessage(event) {
        const message = JSON.parse(event.data);
        if (message.type === 'command' && message.command === 'start_recording') {
            this.startRecording();
        } else if (message.type === 'command' && message.command === 'stop_recording') {
            this.stopRecording();
        }
    }

    async startRecording() {
        if (this.isRecording) return;

        try {
            this.stream = await navigator.mediaDevices.getUserMedia({ audio: true });
            this.audioContext = new (window.AudioContext || window.webkitAudioContext)();
            this.mediaStreamSource = this.audioContext.createMediaStreamSource(this.stream);
            this.processor = this.audioContext.createScriptProcessor(8192, 1, 1);

            this.processor.onaudioprocess = (event) => {
                const inputData = event.inputBuffer.getChannelData(0);
                this.socket.send(JSON.stringify({
                    type: 'audio_data',
                    data: Array.from(inputData)
                }));
            };

            this.mediaStreamSource.connect(this.processor);
            this.processor.connect(this.audioContext.destination);
            this.isRecording = true;
            console.log('recording started');
        } catch (error) {
            console.error('audio recorder error:', error);
        }
    }

    stopRecording() {
        if (!this.isRecording) return;

        if (this.processor) {
            this.processor.disconnect();
            this.mediaStreamSource.disconnect();
        }
        if (this.audioContext) {
            this.audioContext.close();
        }
        if (this.stream) {
            this.stream.getTracks().forEach(track => track.stop());
        }
        this.isRecording = false;
        console.log('recording stopped');
    }
}
"#;

/// Render the host page for the given configuration.
pub fn render_page(config: &crate::config::AppConfig) -> String {
    HOST_PAGE
        .replace("[=[view_updater_script]=]", VIEW_UPDATER_SCRIPT)
        .replace("[=[audio_player_script]=]", AUDIO_PLAYER_SCRIPT)
        .replace("[=[audio_recorder_script]=]", AUDIO_RECORDER_SCRIPT)
        .replace("[=[title]=]", &config.page.title)
        .replace("[=[host]=]", &config.server.host)
        .replace("[=[port]=]", &config.server.port.to_string())
        .replace("[=[view_endpoint]=]", VIEW_ENDPOINT)
        .replace("[=[playback_endpoint]=]", PLAYBACK_ENDPOINT)
        .replace("[=[recording_endpoint]=]", RECORDING_ENDPOINT)
}

/// `GET /` — serve the host page.
pub async fn index(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(render_page(&state.get_config()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    #[test]
    fn test_render_substitutes_all_placeholders() {
        let mut config = AppConfig::default();
        config.page.title = "Status Board".to_string();
        config.server.port = 9001;

        let page = render_page(&config);
        assert!(page.contains("<title>Status Board</title>"));
        assert!(page.contains("ws://127.0.0.1:9001/ws-view"));
        assert!(page.contains("ws://127.0.0.1:9001/ws-audio-player"));
        assert!(page.contains("ws://127.0.0.1:9001/ws-audio-recorder"));
        // No placeholder survives rendering
        assert!(!page.contains("[=["));
    }

    #[test]
    fn test_scripts_embedded() {
        let page = render_page(&AppConfig::default());
        assert!(page.contains("class ViewUpdater"));
        assert!(page.contains("class AudioPlayer"));
        assert!(page.contains("class AudioRecorder"));
        assert!(page.contains("playback_complete"));
    }
}
