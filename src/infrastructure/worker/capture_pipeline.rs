//! Capture Pipeline - 交互模式单次运行
//!
//! Idle → Capturing → (SpeakImageHandler: Analyzing → Resolving → Synthesizing → Playing) → Idle

use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::application::commands::handlers::{PipelineState, SpeakImageHandler, SpeakOutcome};
use crate::application::commands::{OutputTarget, SpeakImage};
use crate::application::ports::ScreenCapturePort;

/// 截图流水线
pub struct CapturePipeline {
    capture: Arc<dyn ScreenCapturePort>,
    speaker: Arc<SpeakImageHandler>,
    context_hint: String,
    /// 设置后每次运行的音频都保存到该目录
    save_dir: Option<PathBuf>,
}

impl CapturePipeline {
    pub fn new(
        capture: Arc<dyn ScreenCapturePort>,
        speaker: Arc<SpeakImageHandler>,
        context_hint: impl Into<String>,
        save_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            capture,
            speaker,
            context_hint: context_hint.into(),
            save_dir,
        }
    }

    pub fn speaker(&self) -> &Arc<SpeakImageHandler> {
        &self.speaker
    }

    /// 执行一次完整运行，任何失败都只影响本次运行
    pub async fn run_once(&self, cancel: &CancellationToken) -> SpeakOutcome {
        if cancel.is_cancelled() {
            return SpeakOutcome::Cancelled {
                stage: PipelineState::Idle,
            };
        }

        self.speaker.set_state(PipelineState::Capturing);
        let captured = self.capture.capture().await;

        if cancel.is_cancelled() {
            tracing::info!("Shutdown requested during capture, dropping screenshot");
            self.speaker.set_state(PipelineState::ShuttingDown);
            return SpeakOutcome::Cancelled {
                stage: PipelineState::Capturing,
            };
        }

        let image = match captured {
            Ok(image) => image,
            Err(e) => {
                tracing::error!(error = %e, "Screen capture failed");
                self.speaker.set_state(PipelineState::Idle);
                return SpeakOutcome::Abandoned {
                    stage: PipelineState::Capturing,
                    reason: e.to_string(),
                };
            }
        };

        tracing::debug!(image_size = image.len(), "Screen captured");

        let command = SpeakImage {
            image,
            context_hint: self.context_hint.clone(),
            output: self.save_dir.clone().map(OutputTarget::Directory),
            play: true,
        };
        self.speaker.handle(command, cancel).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    use crate::application::commands::handlers::{AssignmentEngine, ProviderLocks};
    use crate::application::ports::{
        AnalyzerError, AudioOutputPort, CaptureError, CharacterAnalysis, ImageAnalyzerPort,
        PlaybackError, SynthesizedAudio,
    };
    use crate::application::queries::handlers::VoicePoolStore;
    use crate::domain::voice::{Gender, ProviderKind, Voice, VoiceFilter, VoiceId};
    use crate::infrastructure::adapters::{FakeTtsClient, InMemoryStateStorage};
    use crate::infrastructure::persistence::{JsonLedgerRepository, JsonVoicePoolRepository};

    /// 截图假实现：可选等待放行信号，记录调用次数
    pub(crate) struct GatedCapture {
        pub gate: Option<Arc<Notify>>,
        pub result: Result<Vec<u8>, ()>,
        pub calls: AtomicUsize,
    }

    impl GatedCapture {
        pub fn ok() -> Self {
            Self {
                gate: None,
                result: Ok(vec![0x89, b'P', b'N', b'G']),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn gated(gate: Arc<Notify>) -> Self {
            Self {
                gate: Some(gate),
                ..Self::ok()
            }
        }
    }

    #[async_trait]
    impl ScreenCapturePort for GatedCapture {
        async fn capture(&self) -> Result<Vec<u8>, CaptureError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.result.clone().map_err(|_| CaptureError::EmptyImage)
        }
    }

    struct FixedAnalyzer;

    #[async_trait]
    impl ImageAnalyzerPort for FixedAnalyzer {
        async fn analyze(
            &self,
            _image: &[u8],
            context_hint: &str,
        ) -> Result<CharacterAnalysis, AnalyzerError> {
            Ok(CharacterAnalysis {
                character_name: "Town Crier".to_string(),
                gender: Gender::Male,
                dialogue: format!("Hear ye, {}!", context_hint),
                persona_instructions: String::new(),
            })
        }
    }

    #[derive(Default)]
    pub(crate) struct CountingOutput {
        pub played: AtomicUsize,
        pub saved: std::sync::Mutex<Vec<PathBuf>>,
    }

    #[async_trait]
    impl AudioOutputPort for CountingOutput {
        async fn play(&self, _audio: &SynthesizedAudio) -> Result<(), PlaybackError> {
            self.played.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn save(&self, _audio: &SynthesizedAudio, path: &Path) -> Result<(), PlaybackError> {
            self.saved.lock().unwrap().push(path.to_path_buf());
            Ok(())
        }
    }

    pub(crate) fn build_pipeline(
        capture: Arc<GatedCapture>,
        output: Arc<CountingOutput>,
        save_dir: Option<PathBuf>,
    ) -> CapturePipeline {
        let kind = ProviderKind::OpenAi;
        let storage = Arc::new(InMemoryStateStorage::new());
        let tts = Arc::new(FakeTtsClient::new(
            kind,
            vec![Voice::new(VoiceId::new("onyx").unwrap(), "Onyx", Gender::Male, kind)],
        ));
        let pool_store = Arc::new(VoicePoolStore::new(
            tts.clone(),
            Arc::new(JsonVoicePoolRepository::new(storage.clone())),
            VoiceFilter::pass_through(),
        ));
        let engine = Arc::new(AssignmentEngine::new(
            pool_store,
            Arc::new(JsonLedgerRepository::new(storage)),
            Arc::new(ProviderLocks::new()),
            VoiceId::new("alloy").unwrap(),
        ));
        let speaker = Arc::new(SpeakImageHandler::new(
            Arc::new(FixedAnalyzer),
            engine,
            tts,
            output,
        ));
        CapturePipeline::new(capture, speaker, "Hollow Village", save_dir)
    }

    #[tokio::test]
    async fn test_run_once_speaks_captured_screen() {
        let output = Arc::new(CountingOutput::default());
        let pipeline = build_pipeline(Arc::new(GatedCapture::ok()), output.clone(), None);

        let outcome = pipeline.run_once(&CancellationToken::new()).await;

        assert!(matches!(
            &outcome,
            SpeakOutcome::Spoken { character, voice_id, played: true, .. }
                if character == "Town Crier" && voice_id.as_str() == "onyx"
        ));
        assert_eq!(output.played.load(Ordering::SeqCst), 1);
        assert_eq!(pipeline.speaker().state(), PipelineState::Idle);
    }

    #[tokio::test]
    async fn test_capture_failure_returns_to_idle() {
        let capture = Arc::new(GatedCapture {
            result: Err(()),
            ..GatedCapture::ok()
        });
        let output = Arc::new(CountingOutput::default());
        let pipeline = build_pipeline(capture, output.clone(), None);

        let outcome = pipeline.run_once(&CancellationToken::new()).await;

        assert!(matches!(
            outcome,
            SpeakOutcome::Abandoned {
                stage: PipelineState::Capturing,
                ..
            }
        ));
        assert_eq!(pipeline.speaker().state(), PipelineState::Idle);
        assert_eq!(output.played.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_save_dir_receives_audio() {
        let output = Arc::new(CountingOutput::default());
        let pipeline = build_pipeline(
            Arc::new(GatedCapture::ok()),
            output.clone(),
            Some(PathBuf::from("recordings")),
        );

        pipeline.run_once(&CancellationToken::new()).await;

        let saved = output.saved.lock().unwrap().clone();
        assert_eq!(saved.len(), 1);
        assert!(saved[0].starts_with("recordings"));
    }

    #[tokio::test]
    async fn test_cancel_while_capturing_discards_screenshot() {
        let gate = Arc::new(Notify::new());
        let output = Arc::new(CountingOutput::default());
        let pipeline = Arc::new(build_pipeline(
            Arc::new(GatedCapture::gated(gate.clone())),
            output.clone(),
            None,
        ));
        let cancel = CancellationToken::new();

        let run = {
            let pipeline = pipeline.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { pipeline.run_once(&cancel).await })
        };
        tokio::task::yield_now().await;
        cancel.cancel();
        gate.notify_one();

        let outcome = run.await.unwrap();
        assert_eq!(
            outcome,
            SpeakOutcome::Cancelled {
                stage: PipelineState::Capturing
            }
        );
        assert_eq!(output.played.load(Ordering::SeqCst), 0);
        assert_eq!(pipeline.speaker().state(), PipelineState::ShuttingDown);
    }
}
