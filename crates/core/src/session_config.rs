//! Wire shape of the realtime session configuration (`session.update`).

use crate::{
    options::{TRANSCRIPTION_LANGUAGE, TranscriptionModel, Voice},
    tools::ToolDefinition,
    turn_detection::TurnDetection,
};
use serde::Serialize;

pub const OUTPUT_AUDIO_FORMAT: &str = "audio/pcm";
pub const OUTPUT_AUDIO_RATE: u32 = 24_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Text,
    Audio,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionConfig {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub model: String,
    pub output_modalities: Vec<Modality>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    pub audio: AudioConfig,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioConfig {
    pub input: AudioInputConfig,
    pub output: AudioOutputConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioInputConfig {
    pub transcription: TranscriptionConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn_detection: Option<TurnDetection>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptionConfig {
    pub model: TranscriptionModel,
    pub language: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioOutputConfig {
    pub format: AudioFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<Voice>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioFormat {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub rate: u32,
}

/// Input side: user speech is always transcribed in the pinned language.
/// An empty turn-detection descriptor is left out entirely.
pub fn build_audio_input(
    transcription_model: TranscriptionModel,
    turn_detection: TurnDetection,
) -> AudioInputConfig {
    AudioInputConfig {
        transcription: TranscriptionConfig {
            model: transcription_model,
            language: TRANSCRIPTION_LANGUAGE.to_string(),
        },
        turn_detection: (!turn_detection.is_empty()).then_some(turn_detection),
    }
}

pub fn build_audio_output(voice: Option<Voice>) -> AudioOutputConfig {
    AudioOutputConfig {
        format: AudioFormat {
            kind: OUTPUT_AUDIO_FORMAT,
            rate: OUTPUT_AUDIO_RATE,
        },
        voice,
    }
}
