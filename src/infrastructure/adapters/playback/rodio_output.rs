//! Rodio Audio Output
//!
//! 播放在阻塞线程中进行；输出流在每次播放期间打开，播放结束或出错时随作用域释放

use async_trait::async_trait;
use std::io::Cursor;
use std::path::Path;
use tokio::fs;
use tokio::sync::Mutex;

use crate::application::ports::{AudioOutputPort, PlaybackError, SynthesizedAudio};

/// Rodio 音频输出
#[derive(Default)]
pub struct RodioAudioOutput {
    /// 同一时间只有一次播放占用设备
    device: Mutex<()>,
}

impl RodioAudioOutput {
    pub fn new() -> Self {
        Self::default()
    }
}

fn play_blocking(data: Vec<u8>) -> Result<(), PlaybackError> {
    let stream = rodio::OutputStreamBuilder::open_default_stream()
        .map_err(|e| PlaybackError::DeviceUnavailable(e.to_string()))?;
    let sink = rodio::Sink::connect_new(stream.mixer());
    let source = rodio::Decoder::new(Cursor::new(data))
        .map_err(|e| PlaybackError::DecodingError(e.to_string()))?;
    sink.append(source);
    sink.sleep_until_end();
    Ok(())
}

#[async_trait]
impl AudioOutputPort for RodioAudioOutput {
    async fn play(&self, audio: &SynthesizedAudio) -> Result<(), PlaybackError> {
        let _device = self.device.lock().await;

        tracing::debug!(
            format = %audio.format,
            size = audio.audio_data.len(),
            "Starting playback"
        );

        let data = audio.audio_data.clone();
        tokio::task::spawn_blocking(move || play_blocking(data))
            .await
            .map_err(|e| PlaybackError::DeviceUnavailable(format!("Playback task failed: {}", e)))??;

        tracing::debug!("Playback finished");
        Ok(())
    }

    async fn save(&self, audio: &SynthesizedAudio, path: &Path) -> Result<(), PlaybackError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| PlaybackError::IoError(format!("{}: {}", parent.display(), e)))?;
        }

        fs::write(path, &audio.audio_data)
            .await
            .map_err(|e| PlaybackError::IoError(format!("{}: {}", path.display(), e)))?;

        tracing::info!(path = %path.display(), size = audio.audio_data.len(), "Audio saved");
        Ok(())
    }
}
