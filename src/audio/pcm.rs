//! # PCM Sample Conversion
//!
//! The browser's capture pipeline delivers 32-bit float samples in [-1.0, 1.0]
//! (single channel); recording sinks expect 16-bit signed little-endian PCM.
//! The conversion is linear scaling by 32767 with clamping — out-of-range
//! input (a misbehaving client, a float rounding excursion past ±1.0) clamps
//! to the i16 range instead of wrapping or panicking.

use byteorder::{LittleEndian, WriteBytesExt};

/// Convert float samples in [-1.0, 1.0] to 16-bit signed PCM.
///
/// Values outside the range are clamped; NaN converts to 0.
pub fn float_to_pcm(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&sample| {
            let scaled = (sample * 32767.0).round();
            scaled.clamp(i16::MIN as f32, i16::MAX as f32) as i16
        })
        .collect()
}

/// Serialize 16-bit PCM samples as little-endian bytes.
pub fn pcm_to_bytes(samples: &[i16]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        bytes
            .write_i16::<LittleEndian>(sample)
            .expect("writing to a Vec cannot fail");
    }
    bytes
}

/// Convert a float sample frame straight to the byte form handed to sinks.
pub fn float_frame_to_bytes(samples: &[f32]) -> Vec<u8> {
    pcm_to_bytes(&float_to_pcm(samples))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_to_pcm_reference_values() {
        let samples = [-1.0f32, 0.0, 0.5, 1.0];
        let pcm = float_to_pcm(&samples);
        assert_eq!(pcm[0], -32767);
        assert_eq!(pcm[1], 0);
        // 0.5 * 32767 = 16383.5, rounds to 16384
        assert!(pcm[2] == 16383 || pcm[2] == 16384);
        assert_eq!(pcm[3], 32767);
    }

    #[test]
    fn test_out_of_range_clamps() {
        let pcm = float_to_pcm(&[2.0, -3.0, f32::NAN]);
        assert_eq!(pcm[0], i16::MAX);
        assert_eq!(pcm[1], i16::MIN);
        assert_eq!(pcm[2], 0);
    }

    #[test]
    fn test_pcm_byte_order() {
        let bytes = pcm_to_bytes(&[0x1234, -1]);
        assert_eq!(bytes, vec![0x34, 0x12, 0xFF, 0xFF]);
    }

    #[test]
    fn test_frame_length() {
        let bytes = float_frame_to_bytes(&[0.0; 8192]);
        assert_eq!(bytes.len(), 8192 * 2);
    }
}
