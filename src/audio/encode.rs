//! # Audio Data-URI Encoding
//!
//! Playback clips travel to the browser as base64 `data:audio/wav` URIs that
//! the page feeds straight into an `Audio` element. These helpers wrap
//! existing WAV bytes into that form — they do not transcode; callers bring
//! their own WAV data.

use anyhow::Result;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::path::Path;

/// Encode WAV bytes as a `data:audio/wav;base64,` URI.
pub fn wav_bytes_to_data_uri(bytes: &[u8]) -> String {
    format!("data:audio/wav;base64,{}", STANDARD.encode(bytes))
}

/// Read a WAV file and encode it as a data URI.
///
/// The file is sanity-checked for a RIFF/WAVE header so an accidentally
/// passed MP3 fails here rather than silently as an unplayable clip in the
/// browser.
pub fn wav_file_to_data_uri(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;

    if bytes.len() < 12 || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
        return Err(anyhow::anyhow!(
            "{} is not a RIFF/WAVE file",
            path.display()
        ));
    }

    Ok(wav_bytes_to_data_uri(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_uri_prefix() {
        let uri = wav_bytes_to_data_uri(&[0, 0, 0]);
        assert_eq!(uri, "data:audio/wav;base64,AAAA");
    }

    #[test]
    fn test_rejects_non_wav_file() {
        let dir = std::env::temp_dir();
        let path = dir.join("kioskview_encode_test.bin");
        std::fs::write(&path, b"ID3\x04not a wav").unwrap();

        assert!(wav_file_to_data_uri(&path).is_err());
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_accepts_wav_header() {
        let dir = std::env::temp_dir();
        let path = dir.join("kioskview_encode_test.wav");
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&36u32.to_le_bytes());
        bytes.extend_from_slice(b"WAVE");
        std::fs::write(&path, &bytes).unwrap();

        let uri = wav_file_to_data_uri(&path).unwrap();
        assert!(uri.starts_with("data:audio/wav;base64,"));
        std::fs::remove_file(&path).ok();
    }
}
