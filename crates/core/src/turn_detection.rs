//! Turn-Detection Builder
//!
//! Copies only the tuning fields the caller actually supplied into a
//! descriptor. Nothing is defaulted here: an empty descriptor means "let the
//! session default apply".

use crate::options::{TurnDetectionType, VadEagerness};
use serde::Serialize;

/// Sparse VAD tuning as supplied by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TurnDetectionParams {
    pub kind: Option<TurnDetectionType>,
    pub silence_duration_ms: Option<u32>,
    pub prefix_padding_ms: Option<u32>,
    pub idle_timeout_ms: Option<u32>,
    pub threshold: Option<f32>,
    pub eagerness: Option<VadEagerness>,
    /// Forced response-creation behavior; transcription sessions set `false`.
    pub create_response: Option<bool>,
}

/// Turn-detection block of a session configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TurnDetection {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<TurnDetectionType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub silence_duration_ms: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix_padding_ms: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idle_timeout_ms: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eagerness: Option<VadEagerness>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_response: Option<bool>,
}

impl TurnDetection {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Builds a descriptor holding exactly the supplied fields.
pub fn build_turn_detection(params: &TurnDetectionParams) -> TurnDetection {
    TurnDetection {
        kind: params.kind,
        silence_duration_ms: params.silence_duration_ms,
        prefix_padding_ms: params.prefix_padding_ms,
        idle_timeout_ms: params.idle_timeout_ms,
        threshold: params.threshold,
        eagerness: params.eagerness,
        create_response: params.create_response,
    }
}
