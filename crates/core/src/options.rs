//! Option Model
//!
//! Enumerates every user-selectable value for a realtime session (models,
//! voices, turn detection, session mode) together with one default per
//! enumeration, plus the per-attempt `ConnectionOptions` value object.

use crate::{
    api_key::{ApiKey, ValidationError},
    transport::TransportKind,
};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr, sync::Arc};

/// Error returned when a string does not name a member of an option enumeration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{value}' is not a valid {kind}")]
pub struct UnknownOption {
    pub kind: &'static str,
    pub value: String,
}

/// Generates a closed string enumeration with `ALL`, `as_str`, `Display` and `FromStr`.
macro_rules! option_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $($(#[$vmeta:meta])* $variant:ident => $wire:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $($(#[$vmeta])* #[serde(rename = $wire)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownOption;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.trim();
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(s))
                    .ok_or_else(|| UnknownOption {
                        kind: $kind,
                        value: s.to_string(),
                    })
            }
        }
    };
}

option_enum! {
    /// Model used to transcribe the user's speech.
    TranscriptionModel, "transcription model" {
        Primary => "gpt-4o-transcribe",
        Mini => "gpt-4o-mini-transcribe",
    }
}

option_enum! {
    /// Conversational realtime model.
    ConversationModel, "conversation model" {
        GptRealtime => "gpt-realtime",
        Gpt4oRealtimePreview => "gpt-4o-realtime-preview-2025-06-03",
    }
}

option_enum! {
    /// Output voice of the conversation agent.
    Voice, "voice" {
        Alloy => "alloy",
        Echo => "echo",
        Shimmer => "shimmer",
        Ash => "ash",
        Ballad => "ballad",
        Coral => "coral",
        Sage => "sage",
        Verse => "verse",
        Cedar => "cedar",
        Marin => "marin",
    }
}

option_enum! {
    /// Mechanism deciding when the user has finished speaking.
    TurnDetectionType, "turn detection type" {
        ServerVad => "server_vad",
        SemanticVad => "semantic_vad",
    }
}

option_enum! {
    /// How eagerly semantic VAD ends the user's turn.
    VadEagerness, "VAD eagerness" {
        Auto => "auto",
        Low => "low",
        Medium => "medium",
        High => "high",
    }
}

option_enum! {
    /// Which agent/session variant is built for a connection attempt.
    SessionMode, "session mode" {
        Conversation => "conversation",
        Transcription => "transcription",
    }
}

option_enum! {
    /// Connection state of the lifecycle controller.
    ConnectionStatus, "connection status" {
        Disconnected => "disconnected",
        Connecting => "connecting",
        Connected => "connected",
    }
}

pub const DEFAULT_TRANSCRIPTION_MODEL: TranscriptionModel = TranscriptionModel::Primary;
pub const DEFAULT_CONVERSATION_MODEL: ConversationModel = ConversationModel::GptRealtime;
pub const DEFAULT_SESSION_MODE: SessionMode = SessionMode::Conversation;
pub const DEFAULT_TURN_DETECTION_TYPE: TurnDetectionType = TurnDetectionType::ServerVad;
pub const DEFAULT_VAD_EAGERNESS: VadEagerness = VadEagerness::Auto;
/// Voice the API speaks with when none is sent. Unset options leave the
/// choice to the server, so this is only for display and explicit resets.
pub const DEFAULT_VOICE: Voice = Voice::Alloy;

/// Language pinned for input transcription.
pub const TRANSCRIPTION_LANGUAGE: &str = "ja";

pub const DEFAULT_INSTRUCTIONS: &str = "You are a helpful assistant. Speak in Japanese. Keep replies concise unless asked. \
If the user asks you to research or check up-to-date information, use the web_search tool without asking for permission before answering.";

impl Default for TranscriptionModel {
    fn default() -> Self {
        DEFAULT_TRANSCRIPTION_MODEL
    }
}

impl Default for ConversationModel {
    fn default() -> Self {
        DEFAULT_CONVERSATION_MODEL
    }
}

impl Default for SessionMode {
    fn default() -> Self {
        DEFAULT_SESSION_MODE
    }
}

impl Default for Voice {
    fn default() -> Self {
        DEFAULT_VOICE
    }
}

impl Default for TurnDetectionType {
    fn default() -> Self {
        DEFAULT_TURN_DETECTION_TYPE
    }
}

impl Default for VadEagerness {
    fn default() -> Self {
        DEFAULT_VAD_EAGERNESS
    }
}

impl Default for ConnectionStatus {
    fn default() -> Self {
        ConnectionStatus::Disconnected
    }
}

/// Receives decoded PCM16 (24 kHz, mono, little-endian) output audio.
///
/// One sink is bound to the active session at a time; it is only written to
/// once the session decides to render audio.
pub trait AudioSink: Send + Sync {
    fn play(&self, pcm16: &[u8]);
}

/// Produces PCM16 (24 kHz, mono, little-endian) input audio for the session.
#[async_trait]
pub trait AudioSource: Send {
    /// Next chunk of samples, or `None` once the source is exhausted.
    async fn next_chunk(&mut self) -> Option<Vec<u8>>;
}

/// Everything a single connect attempt needs, built from the user's form state.
///
/// Unset optional fields mean "not chosen by the user"; default resolution
/// happens in the session assembler, never here. The API key is kept as
/// entered and validated when a connect is requested.
#[derive(Clone)]
pub struct ConnectionOptions {
    pub api_key: SecretString,
    pub session_mode: SessionMode,
    pub conversation_model: Option<ConversationModel>,
    pub transcription_model: Option<TranscriptionModel>,
    pub instructions: Option<String>,
    pub voice: Option<Voice>,
    pub turn_detection_type: Option<TurnDetectionType>,
    pub silence_duration_ms: Option<u32>,
    pub prefix_padding_ms: Option<u32>,
    pub idle_timeout_ms: Option<u32>,
    pub threshold: Option<f32>,
    pub eagerness: Option<VadEagerness>,
    pub transport: TransportKind,
    pub audio_sink: Option<Arc<dyn AudioSink>>,
}

impl ConnectionOptions {
    /// Creates options with every optional field unset.
    pub fn new(api_key: impl Into<String>, session_mode: SessionMode) -> Self {
        Self {
            api_key: SecretString::from(api_key.into()),
            session_mode,
            conversation_model: None,
            transcription_model: None,
            instructions: None,
            voice: None,
            turn_detection_type: None,
            silence_duration_ms: None,
            prefix_padding_ms: None,
            idle_timeout_ms: None,
            threshold: None,
            eagerness: None,
            transport: TransportKind::default(),
            audio_sink: None,
        }
    }

    /// Validates the entered key.
    pub fn validated_key(&self) -> Result<ApiKey, ValidationError> {
        ApiKey::parse(self.api_key.expose_secret())
    }
}

impl fmt::Debug for ConnectionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionOptions")
            .field("api_key", &"[REDACTED]")
            .field("session_mode", &self.session_mode)
            .field("conversation_model", &self.conversation_model)
            .field("transcription_model", &self.transcription_model)
            .field("voice", &self.voice)
            .field("turn_detection_type", &self.turn_detection_type)
            .field("silence_duration_ms", &self.silence_duration_ms)
            .field("prefix_padding_ms", &self.prefix_padding_ms)
            .field("idle_timeout_ms", &self.idle_timeout_ms)
            .field("threshold", &self.threshold)
            .field("eagerness", &self.eagerness)
            .field("transport", &self.transport)
            .field("audio_sink", &self.audio_sink.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_members() {
        assert!(TranscriptionModel::ALL.contains(&TranscriptionModel::default()));
        assert!(ConversationModel::ALL.contains(&ConversationModel::default()));
        assert!(SessionMode::ALL.contains(&SessionMode::default()));
        assert!(Voice::ALL.contains(&Voice::default()));
        assert_eq!(TurnDetectionType::default(), TurnDetectionType::ServerVad);
        assert_eq!(VadEagerness::default(), VadEagerness::Auto);
        assert_eq!(ConnectionStatus::default(), ConnectionStatus::Disconnected);
        assert_eq!(TranscriptionModel::default().as_str(), "gpt-4o-transcribe");
        assert_eq!(ConversationModel::default().as_str(), "gpt-realtime");
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("Alloy".parse::<Voice>().unwrap(), Voice::Alloy);
        assert_eq!(
            " semantic_vad ".parse::<TurnDetectionType>().unwrap(),
            TurnDetectionType::SemanticVad
        );
        assert_eq!(
            "TRANSCRIPTION".parse::<SessionMode>().unwrap(),
            SessionMode::Transcription
        );
    }

    #[test]
    fn test_parse_unknown_value() {
        let err = "robot".parse::<Voice>().unwrap_err();
        assert_eq!(err.to_string(), "'robot' is not a valid voice");
    }

    #[test]
    fn test_serde_uses_wire_names() {
        let json = serde_json::to_string(&VadEagerness::High).unwrap();
        assert_eq!(json, "\"high\"");
        let mode: SessionMode = serde_json::from_str("\"conversation\"").unwrap();
        assert_eq!(mode, SessionMode::Conversation);
    }

    #[test]
    fn test_options_validate_key_and_redact_debug() {
        let opts = ConnectionOptions::new("sk-abcdefghijklmnopqrstuvwx", SessionMode::Conversation);
        assert!(opts.validated_key().is_ok());
        assert!(!format!("{:?}", opts).contains("abcdef"));

        let bad = ConnectionOptions::new("bad-key", SessionMode::Conversation);
        assert!(bad.validated_key().is_err());
    }

    #[test]
    fn test_enumerations_are_complete() {
        assert_eq!(Voice::ALL.len(), 10);
        assert_eq!(VadEagerness::ALL.len(), 4);
        assert_eq!(ConnectionStatus::ALL.len(), 3);
    }
}
