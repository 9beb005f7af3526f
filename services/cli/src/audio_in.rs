use async_trait::async_trait;
use realtime_voice_core::options::AudioSource;
use std::{path::Path, time::Duration};
use tokio::{
    fs::File,
    io::AsyncReadExt,
    sync::mpsc,
};
use tracing::{debug, error};

/// 100 ms of PCM16 at 24 kHz mono.
pub const CHUNK_BYTES: usize = 4800;
const CHUNK_DURATION: Duration = Duration::from_millis(100);
/// Silence appended after the file so server VAD can close the turn.
pub const TRAILING_SILENCE_CHUNKS: usize = 10;

/// Streams a raw PCM16 file at real-time pace, as a microphone would.
pub struct FilePcmSource {
    file: Option<File>,
    silence_left: usize,
    first: bool,
}

impl FilePcmSource {
    pub async fn open(path: &Path) -> std::io::Result<Self> {
        Ok(Self {
            file: Some(File::open(path).await?),
            silence_left: TRAILING_SILENCE_CHUNKS,
            first: true,
        })
    }

    async fn read_chunk(file: &mut File) -> std::io::Result<Vec<u8>> {
        let mut buf = vec![0u8; CHUNK_BYTES];
        let mut filled = 0;
        while filled < CHUNK_BYTES {
            let n = file.read(&mut buf[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        buf.truncate(filled);
        Ok(buf)
    }
}

#[async_trait]
impl AudioSource for FilePcmSource {
    async fn next_chunk(&mut self) -> Option<Vec<u8>> {
        if !std::mem::take(&mut self.first) {
            tokio::time::sleep(CHUNK_DURATION).await;
        }

        if let Some(file) = self.file.as_mut() {
            match Self::read_chunk(file).await {
                Ok(chunk) if !chunk.is_empty() => return Some(chunk),
                Ok(_) => debug!("Input audio file exhausted"),
                Err(e) => error!(error = %e, "Failed to read input audio"),
            }
            self.file = None;
        }

        if self.silence_left == 0 {
            return None;
        }
        self.silence_left -= 1;
        Some(vec![0; CHUNK_BYTES])
    }
}

/// Drains `source` into `tx` until either side is done.
pub async fn pump(mut source: impl AudioSource, tx: mpsc::Sender<Vec<u8>>) {
    while let Some(chunk) = source.next_chunk().await {
        if tx.send(chunk).await.is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_file_is_chunked_then_padded_with_silence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("question.pcm");
        let samples: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, &samples).unwrap();

        let source = FilePcmSource::open(&path).await.unwrap();
        let (tx, mut rx) = mpsc::channel(64);
        let started = tokio::time::Instant::now();
        pump(source, tx).await;

        let mut chunks = Vec::new();
        while let Ok(chunk) = rx.try_recv() {
            chunks.push(chunk);
        }
        assert_eq!(chunks.len(), 3 + TRAILING_SILENCE_CHUNKS);
        assert_eq!(chunks[0].len(), CHUNK_BYTES);
        assert_eq!(chunks[2].len(), 10_000 - 2 * CHUNK_BYTES);
        assert_eq!(chunks[..3].concat(), samples);
        assert!(chunks[3..].iter().all(|c| c.len() == CHUNK_BYTES && c.iter().all(|b| *b == 0)));
        // paced like live capture
        assert!(started.elapsed() >= CHUNK_DURATION * (chunks.len() as u32 - 1));
    }

    #[tokio::test]
    async fn test_pump_stops_when_receiver_is_gone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.pcm");
        std::fs::write(&path, []).unwrap();

        let source = FilePcmSource::open(&path).await.unwrap();
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        pump(source, tx).await;
    }

    #[tokio::test]
    async fn test_missing_file_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        assert!(FilePcmSource::open(&dir.path().join("nope.pcm")).await.is_err());
    }
}
