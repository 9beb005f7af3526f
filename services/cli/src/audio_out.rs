use realtime_voice_core::options::AudioSink;
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
    sync::Mutex,
};
use tracing::error;

/// Appends raw PCM16 (24 kHz mono) output audio to a file.
pub struct FileAudioSink {
    out: Mutex<BufWriter<File>>,
}

impl FileAudioSink {
    pub fn create(path: &Path) -> std::io::Result<Self> {
        Ok(Self {
            out: Mutex::new(BufWriter::new(File::create(path)?)),
        })
    }
}

impl AudioSink for FileAudioSink {
    fn play(&self, pcm16: &[u8]) {
        let Ok(mut out) = self.out.lock() else {
            error!("Audio file writer poisoned");
            return;
        };
        if let Err(e) = out.write_all(pcm16).and_then(|_| out.flush()) {
            error!(error = %e, "Failed to write output audio");
        }
    }
}
