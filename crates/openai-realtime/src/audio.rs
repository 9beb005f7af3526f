use base64::Engine;

/// Encodes PCM16 samples for `input_audio_buffer.append`.
///
/// A trailing odd byte is not a whole sample and is left out.
pub fn encode_pcm16(pcm16: &[u8]) -> String {
    let whole = pcm16.len() - pcm16.len() % 2;
    base64::engine::general_purpose::STANDARD.encode(&pcm16[..whole])
}

/// Decodes a base64 PCM16 audio delta.
///
/// Returns `None` for undecodable input; a trailing odd byte is dropped so
/// the result always holds whole samples.
pub fn decode_pcm16_delta(base64_fragment: &str) -> Option<Vec<u8>> {
    match base64::engine::general_purpose::STANDARD.decode(base64_fragment) {
        Ok(mut bytes) => {
            bytes.truncate(bytes.len() - bytes.len() % 2);
            Some(bytes)
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to decode audio delta");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_whole_samples() {
        let encoded = base64::engine::general_purpose::STANDARD.encode([0x00u8, 0x40, 0xff, 0x7f]);
        assert_eq!(decode_pcm16_delta(&encoded), Some(vec![0x00, 0x40, 0xff, 0x7f]));
    }

    #[test]
    fn test_decode_drops_odd_byte() {
        let encoded = base64::engine::general_purpose::STANDARD.encode([0x01u8, 0x02, 0x03]);
        assert_eq!(decode_pcm16_delta(&encoded), Some(vec![0x01, 0x02]));
    }

    #[test]
    fn test_encode_whole_samples() {
        assert_eq!(encode_pcm16(&[1, 2, 3, 4]), "AQIDBA==");
        assert_eq!(encode_pcm16(&[1, 2, 3]), "AQI=");
        assert_eq!(encode_pcm16(&[]), "");
    }

    #[test]
    fn test_decode_invalid_input() {
        assert_eq!(decode_pcm16_delta("not base64!!"), None);
    }
}
