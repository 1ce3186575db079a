//! SpeakImage Handler - 截图朗读流水线
//!
//! 分析 → 解析音色 → 合成 → 保存/播放。每个外部调用完成后检查取消令牌：
//! 已发出的调用允许执行完毕，但结果被丢弃且不再进入下一阶段

use chrono::Local;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::application::commands::{OutputTarget, SpeakImage};
use crate::application::ports::{
    AudioOutputPort, ImageAnalyzerPort, SynthesisRequest, SynthesizedAudio, TtsProviderPort,
};
use crate::domain::voice::VoiceId;

use super::AssignmentEngine;

/// 流水线状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Capturing,
    Analyzing,
    Resolving,
    Synthesizing,
    Playing,
    /// 终止状态
    ShuttingDown,
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PipelineState::Idle => "idle",
            PipelineState::Capturing => "capturing",
            PipelineState::Analyzing => "analyzing",
            PipelineState::Resolving => "resolving",
            PipelineState::Synthesizing => "synthesizing",
            PipelineState::Playing => "playing",
            PipelineState::ShuttingDown => "shutting_down",
        };
        f.write_str(s)
    }
}

/// 单次运行结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeakOutcome {
    /// 已合成，`played` 表示播放是否成功
    Spoken {
        character: String,
        voice_id: VoiceId,
        played: bool,
        saved_to: Option<PathBuf>,
    },
    /// 截图中没有台词，角色仍已记录
    NoDialogue {
        character: String,
        voice_id: VoiceId,
    },
    /// 外部调用失败，本次运行放弃
    Abandoned {
        stage: PipelineState,
        reason: String,
    },
    /// 收到关闭信号，结果被丢弃
    Cancelled { stage: PipelineState },
}

impl SpeakOutcome {
    pub fn is_spoken(&self) -> bool {
        matches!(self, SpeakOutcome::Spoken { .. })
    }
}

/// SpeakImage Handler
pub struct SpeakImageHandler {
    analyzer: Arc<dyn ImageAnalyzerPort>,
    engine: Arc<AssignmentEngine>,
    provider: Arc<dyn TtsProviderPort>,
    output: Arc<dyn AudioOutputPort>,
    state: watch::Sender<PipelineState>,
}

impl SpeakImageHandler {
    pub fn new(
        analyzer: Arc<dyn ImageAnalyzerPort>,
        engine: Arc<AssignmentEngine>,
        provider: Arc<dyn TtsProviderPort>,
        output: Arc<dyn AudioOutputPort>,
    ) -> Self {
        let (state, _) = watch::channel(PipelineState::Idle);
        Self {
            analyzer,
            engine,
            provider,
            output,
            state,
        }
    }

    /// 订阅状态变化
    pub fn subscribe(&self) -> watch::Receiver<PipelineState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> PipelineState {
        *self.state.borrow()
    }

    /// 截图阶段由调用方驱动，这里只对外暴露状态切换
    pub fn set_state(&self, state: PipelineState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            tracing::debug!(from = %previous, to = %state, "Pipeline state changed");
        }
    }

    pub async fn handle(&self, command: SpeakImage, cancel: &CancellationToken) -> SpeakOutcome {
        let outcome = self.run(command, cancel).await;
        if matches!(outcome, SpeakOutcome::Cancelled { .. }) {
            self.set_state(PipelineState::ShuttingDown);
        } else {
            self.set_state(PipelineState::Idle);
        }
        outcome
    }

    async fn run(&self, command: SpeakImage, cancel: &CancellationToken) -> SpeakOutcome {
        let provider = self.provider.kind();

        // 1. 分析截图
        if let Some(outcome) = self.enter(PipelineState::Analyzing, cancel) {
            return outcome;
        }
        let analysis = self
            .analyzer
            .analyze(&command.image, &command.context_hint)
            .await;
        if cancel.is_cancelled() {
            tracing::info!("Shutdown requested during analysis, dropping result");
            return SpeakOutcome::Cancelled {
                stage: PipelineState::Analyzing,
            };
        }
        let analysis = match analysis {
            Ok(analysis) => analysis,
            Err(e) => {
                tracing::error!(error = %e, "Image analysis failed");
                return SpeakOutcome::Abandoned {
                    stage: PipelineState::Analyzing,
                    reason: e.to_string(),
                };
            }
        };

        tracing::info!(
            character = %analysis.character_name,
            gender = %analysis.gender,
            dialogue_len = analysis.dialogue.len(),
            "Image analyzed"
        );

        // 2. 解析音色（总能得到一个音色）
        if let Some(outcome) = self.enter(PipelineState::Resolving, cancel) {
            return outcome;
        }
        let resolved = self
            .engine
            .resolve_voice(
                provider,
                &analysis.character_name,
                analysis.gender,
                &analysis.persona_instructions,
            )
            .await;
        let (voice_id, persona) = match resolved {
            Ok(resolved) => (resolved.voice_id, resolved.persona_instructions),
            Err(e) => {
                if e.is_state_corruption() {
                    tracing::error!(
                        provider = %provider,
                        error = %e,
                        "Voice ledger is corrupt, using fallback voice without recording"
                    );
                } else {
                    tracing::error!(
                        provider = %provider,
                        error = %e,
                        "Voice resolution failed, using fallback voice"
                    );
                }
                (
                    self.engine.fallback_voice().clone(),
                    analysis.persona_instructions.clone(),
                )
            }
        };
        if cancel.is_cancelled() {
            tracing::info!("Shutdown requested during voice resolution, stopping");
            return SpeakOutcome::Cancelled {
                stage: PipelineState::Resolving,
            };
        }

        if !analysis.has_dialogue() {
            tracing::info!(
                character = %analysis.character_name,
                voice_id = %voice_id,
                "No dialogue found, skipping synthesis"
            );
            return SpeakOutcome::NoDialogue {
                character: analysis.character_name,
                voice_id,
            };
        }

        // 3. 合成
        if let Some(outcome) = self.enter(PipelineState::Synthesizing, cancel) {
            return outcome;
        }
        let mut request = SynthesisRequest::new(analysis.dialogue.trim(), voice_id.clone());
        if self.provider.supports_persona() {
            request = request.with_persona(persona);
        }
        let audio = self.provider.synthesize(request).await;
        if cancel.is_cancelled() {
            tracing::info!("Shutdown requested during synthesis, dropping audio");
            return SpeakOutcome::Cancelled {
                stage: PipelineState::Synthesizing,
            };
        }
        let audio = match audio {
            Ok(audio) => audio,
            Err(e) => {
                tracing::error!(
                    provider = %provider,
                    voice_id = %voice_id,
                    error = %e,
                    "Speech synthesis failed"
                );
                return SpeakOutcome::Abandoned {
                    stage: PipelineState::Synthesizing,
                    reason: e.to_string(),
                };
            }
        };

        // 4. 保存、播放（失败只记录日志）
        if let Some(outcome) = self.enter(PipelineState::Playing, cancel) {
            return outcome;
        }
        let saved_to = match &command.output {
            Some(target) => {
                let path = output_path(target, &analysis.character_name, &audio);
                self.save(&audio, path).await
            }
            None => None,
        };

        let played = if command.play {
            match self.output.play(&audio).await {
                Ok(()) => true,
                Err(e) => {
                    tracing::error!(error = %e, "Audio playback failed");
                    false
                }
            }
        } else {
            false
        };

        tracing::info!(
            character = %analysis.character_name,
            voice_id = %voice_id,
            played = played,
            "Dialogue spoken"
        );

        SpeakOutcome::Spoken {
            character: analysis.character_name,
            voice_id,
            played,
            saved_to,
        }
    }

    /// 进入下一阶段；已取消则不再进入
    fn enter(&self, stage: PipelineState, cancel: &CancellationToken) -> Option<SpeakOutcome> {
        if cancel.is_cancelled() {
            return Some(SpeakOutcome::Cancelled { stage });
        }
        self.set_state(stage);
        None
    }

    async fn save(&self, audio: &SynthesizedAudio, path: PathBuf) -> Option<PathBuf> {
        match self.output.save(audio, &path).await {
            Ok(()) => {
                tracing::debug!(path = ?path, "Run output written");
                Some(path)
            }
            Err(e) => {
                tracing::error!(path = ?path, error = %e, "Failed to save audio");
                None
            }
        }
    }
}

/// 目录输出时文件名为 `{character}_{timestamp}.{ext}`
fn output_path(target: &OutputTarget, character: &str, audio: &SynthesizedAudio) -> PathBuf {
    match target {
        OutputTarget::File(path) => path.clone(),
        OutputTarget::Directory(dir) => {
            let file_name = format!(
                "{}_{}.{}",
                file_stem(character),
                Local::now().format("%Y%m%d_%H%M%S%3f"),
                audio.format.extension()
            );
            Path::new(dir).join(file_name)
        }
    }
}

fn file_stem(character: &str) -> String {
    let stem: String = character
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if stem.trim_matches('_').is_empty() {
        "unknown".to_string()
    } else {
        stem
    }
}
