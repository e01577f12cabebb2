//! Base64 helpers for audio exchanged with browser clients.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

use crate::error::{InterviewError, Result};

/// Audio container formats accepted from and sent to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    /// RIFF WAVE (default).
    #[default]
    Wav,
    /// MPEG layer 3.
    Mp3,
    /// Ogg container.
    Ogg,
    /// `WebM` container.
    Webm,
}

/// Every supported format, in display order.
pub const SUPPORTED_FORMATS: [AudioFormat; 4] = [
    AudioFormat::Wav,
    AudioFormat::Mp3,
    AudioFormat::Ogg,
    AudioFormat::Webm,
];

impl AudioFormat {
    /// Parses a format name, case-insensitively.
    #[must_use]
    pub fn from_str_case_insensitive(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "wav" => Some(Self::Wav),
            "mp3" => Some(Self::Mp3),
            "ogg" => Some(Self::Ogg),
            "webm" => Some(Self::Webm),
            _ => None,
        }
    }

    /// Returns the lowercase format name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Mp3 => "mp3",
            Self::Ogg => "ogg",
            Self::Webm => "webm",
        }
    }

    /// Returns the MIME type.
    #[must_use]
    pub const fn mime_type(&self) -> &'static str {
        match self {
            Self::Wav => "audio/wav",
            Self::Mp3 => "audio/mpeg",
            Self::Ogg => "audio/ogg",
            Self::Webm => "audio/webm",
        }
    }
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Encodes raw audio as standard base64.
#[must_use]
pub fn encode(audio: &[u8]) -> String {
    STANDARD.encode(audio)
}

/// Decodes base64 audio, with or without a `data:` URL prefix.
///
/// # Errors
///
/// Returns `InterviewError::Validation` if the payload is not valid base64.
pub fn decode(payload: &str) -> Result<Vec<u8>> {
    let payload = payload.trim();
    let encoded = if payload.starts_with("data:") {
        payload
            .split_once(";base64,")
            .map(|(_, data)| data)
            .ok_or_else(|| InterviewError::validation("audio data URL is not base64-encoded"))?
    } else {
        payload
    };

    STANDARD
        .decode(encoded)
        .map_err(|e| InterviewError::validation(format!("invalid base64 audio: {e}")))
}

/// Builds a `data:` URL for playback in a browser.
#[must_use]
pub fn data_url(audio_base64: &str, format: AudioFormat) -> String {
    format!("data:{};base64,{audio_base64}", format.mime_type())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode() {
        let audio = b"RIFF\x00\x01fake";
        let encoded = encode(audio);
        assert_eq!(decode(&encoded).unwrap(), audio);
    }

    #[test]
    fn test_decode_accepts_data_url() {
        let url = data_url(&encode(b"abc"), AudioFormat::Webm);
        assert!(url.starts_with("data:audio/webm;base64,"));
        assert_eq!(decode(&url).unwrap(), b"abc");
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode("not base64!!"),
            Err(InterviewError::Validation { .. })
        ));
        assert!(decode("data:audio/wav,plain").is_err());
    }

    #[test]
    fn test_format_parsing_and_mime() {
        assert_eq!(
            AudioFormat::from_str_case_insensitive("MP3"),
            Some(AudioFormat::Mp3)
        );
        assert_eq!(AudioFormat::from_str_case_insensitive("flac"), None);
        assert_eq!(AudioFormat::Mp3.mime_type(), "audio/mpeg");
        assert_eq!(
            SUPPORTED_FORMATS.map(|f| f.as_str()),
            ["wav", "mp3", "ogg", "webm"]
        );
    }
}
