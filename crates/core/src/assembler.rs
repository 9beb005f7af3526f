//! Session Assembler
//!
//! The single place where defaults are resolved. Everything downstream (turn
//! detection, agent and transport factories) receives fully-resolved input.

use crate::{
    api_key::ApiKey,
    agent::{RealtimeAgent, create_conversation_agent, create_transcription_agent},
    options::{
        ConnectionOptions, DEFAULT_CONVERSATION_MODEL, DEFAULT_INSTRUCTIONS,
        DEFAULT_TRANSCRIPTION_MODEL, SessionMode,
    },
    session_config::{AudioConfig, Modality, SessionConfig, build_audio_input, build_audio_output},
    transport::{ApiBase, Transport, TransportKind, create_transport},
    turn_detection::{TurnDetectionParams, build_turn_detection},
    web_search::WebSearchSettings,
};
use tracing::debug;

/// Environment-level settings that are not part of the per-connect form.
#[derive(Debug, Clone, Default)]
pub struct AssemblerSettings {
    pub api_base: ApiBase,
    pub web_search: WebSearchSettings,
}

/// A fully configured, not yet connected session.
#[derive(Debug, Clone)]
pub struct SessionPlan {
    pub mode: SessionMode,
    pub agent: RealtimeAgent,
    pub transport: Transport,
    pub config: SessionConfig,
}

/// Builds the mode-specific session plan for one connect attempt.
///
/// Transcription sessions always run on the default conversational model,
/// never create responses and only produce text. Conversation sessions use
/// the caller's model, voice and instructions and produce audio.
pub fn assemble(
    options: &ConnectionOptions,
    api_key: &ApiKey,
    settings: &AssemblerSettings,
) -> SessionPlan {
    assemble_with_transport(options, api_key, options.transport, settings)
}

/// Like [`assemble`] but with the transport kind overridden (used for fallback).
pub fn assemble_with_transport(
    options: &ConnectionOptions,
    api_key: &ApiKey,
    transport_kind: TransportKind,
    settings: &AssemblerSettings,
) -> SessionPlan {
    let transcription_model = options
        .transcription_model
        .unwrap_or(DEFAULT_TRANSCRIPTION_MODEL);
    let mut td_params = TurnDetectionParams {
        kind: options.turn_detection_type,
        silence_duration_ms: options.silence_duration_ms,
        prefix_padding_ms: options.prefix_padding_ms,
        idle_timeout_ms: options.idle_timeout_ms,
        threshold: options.threshold,
        eagerness: options.eagerness,
        create_response: None,
    };

    let (agent, model, modalities, voice) = match options.session_mode {
        SessionMode::Transcription => {
            td_params.create_response = Some(false);
            (
                create_transcription_agent(),
                DEFAULT_CONVERSATION_MODEL,
                vec![Modality::Text],
                None,
            )
        }
        SessionMode::Conversation => {
            let instructions = options
                .instructions
                .clone()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_INSTRUCTIONS.to_string());
            (
                create_conversation_agent(
                    api_key,
                    instructions,
                    options.voice,
                    settings.web_search.clone(),
                ),
                options.conversation_model.unwrap_or(DEFAULT_CONVERSATION_MODEL),
                vec![Modality::Audio],
                options.voice,
            )
        }
    };

    let turn_detection = build_turn_detection(&td_params);
    let transport = create_transport(
        &settings.api_base,
        transport_kind,
        model.as_str(),
        options.audio_sink.clone(),
    );
    let config = SessionConfig {
        kind: "realtime",
        model: model.as_str().to_string(),
        output_modalities: modalities,
        instructions: agent.instructions.clone(),
        audio: AudioConfig {
            input: build_audio_input(transcription_model, turn_detection),
            output: build_audio_output(voice),
        },
        tools: agent.tool_definitions(),
    };

    debug!(
        mode = %options.session_mode,
        model = %config.model,
        transport = %transport.kind,
        "Assembled realtime session"
    );
    SessionPlan {
        mode: options.session_mode,
        agent,
        transport,
        config,
    }
}
