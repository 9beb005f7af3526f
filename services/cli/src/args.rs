use crate::config::Config;
use clap::Parser;
use realtime_voice_core::{
    options::{
        ConnectionOptions, ConversationModel, SessionMode, TranscriptionModel, TurnDetectionType,
        VadEagerness, Voice,
    },
    transport::TransportKind,
};
use std::path::PathBuf;

/// Realtime voice assistant session from the terminal.
///
/// Flags override the environment for this run.
#[derive(Parser, Debug, Default)]
#[command(version, about)]
pub struct Args {
    /// Session mode: conversation or transcription
    #[arg(long)]
    pub mode: Option<SessionMode>,

    /// Transport: websocket or webrtc. WebRTC is not available in this
    /// runtime, so it always fails once and falls back to websocket.
    #[arg(long)]
    pub transport: Option<TransportKind>,

    #[arg(long)]
    pub conversation_model: Option<ConversationModel>,

    #[arg(long)]
    pub transcription_model: Option<TranscriptionModel>,

    #[arg(long)]
    pub voice: Option<Voice>,

    /// Assistant instructions (conversation mode)
    #[arg(long)]
    pub instructions: Option<String>,

    /// server_vad or semantic_vad
    #[arg(long)]
    pub turn_detection: Option<TurnDetectionType>,

    #[arg(long)]
    pub silence_duration_ms: Option<u32>,

    #[arg(long)]
    pub prefix_padding_ms: Option<u32>,

    #[arg(long)]
    pub idle_timeout_ms: Option<u32>,

    /// VAD activation threshold, 0.0 to 1.0
    #[arg(long)]
    pub threshold: Option<f32>,

    /// Semantic VAD eagerness: auto, low, medium or high
    #[arg(long)]
    pub eagerness: Option<VadEagerness>,

    /// Write assistant audio (raw PCM16, 24 kHz mono) to this file
    #[arg(long)]
    pub audio_out: Option<PathBuf>,

    /// Stream this raw PCM16 file (24 kHz mono) as microphone input after
    /// each /connect
    #[arg(long)]
    pub audio_in: Option<PathBuf>,

    /// Connect right after startup
    #[arg(long)]
    pub connect: bool,
}

impl Args {
    /// Options for one connect attempt: flags first, then the environment.
    pub fn connection_options(
        &self,
        config: &Config,
        api_key: &str,
        mode: SessionMode,
    ) -> ConnectionOptions {
        let mut options = ConnectionOptions::new(api_key, mode);
        options.transport = self.transport.unwrap_or(config.transport);
        options.conversation_model = self.conversation_model.or(config.conversation_model);
        options.transcription_model = self.transcription_model.or(config.transcription_model);
        options.voice = self.voice.or(config.voice);
        options.instructions = self.instructions.clone();
        options.turn_detection_type = self.turn_detection;
        options.silence_duration_ms = self.silence_duration_ms;
        options.prefix_padding_ms = self.prefix_padding_ms;
        options.idle_timeout_ms = self.idle_timeout_ms;
        options.threshold = self.threshold;
        options.eagerness = self.eagerness;
        options
    }
}
