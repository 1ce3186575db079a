//! Fake TTS Client - 用于测试的 TTS 客户端
//!
//! 返回给定的音色目录和一段静音 WAV，不访问网络；记录调用次数与合成请求

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use super::gemini::pcm_to_wav;
use crate::application::ports::{
    AudioFormat, ProviderError, SynthesisRequest, SynthesizedAudio, TtsProviderPort,
};
use crate::domain::voice::{ProviderKind, Voice};

/// Fake TTS Client
pub struct FakeTtsClient {
    kind: ProviderKind,
    catalog: Vec<Voice>,
    /// 100ms 静音
    audio_data: Vec<u8>,
    fetch_count: AtomicUsize,
    fail_fetch: AtomicBool,
    fail_synthesize: AtomicBool,
    requests: Mutex<Vec<SynthesisRequest>>,
}

impl FakeTtsClient {
    pub fn new(kind: ProviderKind, catalog: Vec<Voice>) -> Self {
        Self {
            kind,
            catalog,
            audio_data: pcm_to_wav(&[0u8; 4800], 24_000, 1),
            fetch_count: AtomicUsize::new(0),
            fail_fetch: AtomicBool::new(false),
            fail_synthesize: AtomicBool::new(false),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// 目录获取次数
    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }

    pub fn set_fail_fetch(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_synthesize(&self, fail: bool) {
        self.fail_synthesize.store(fail, Ordering::SeqCst);
    }

    /// 已收到的合成请求
    pub fn requests(&self) -> Vec<SynthesisRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl TtsProviderPort for FakeTtsClient {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn supports_persona(&self) -> bool {
        matches!(self.kind, ProviderKind::OpenAi | ProviderKind::Gemini)
    }

    async fn fetch_voices(&self) -> Result<Vec<Voice>, ProviderError> {
        // 让出执行权，与真实网络调用一样给其他任务运行的机会
        tokio::task::yield_now().await;
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(ProviderError::NetworkError("fake fetch failure".to_string()));
        }
        Ok(self.catalog.clone())
    }

    async fn synthesize(&self, request: SynthesisRequest) -> Result<SynthesizedAudio, ProviderError> {
        tokio::task::yield_now().await;
        tracing::debug!(
            voice_id = %request.voice_id,
            text_len = request.text.len(),
            "FakeTtsClient: returning silence"
        );

        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }

        if self.fail_synthesize.load(Ordering::SeqCst) {
            return Err(ProviderError::ServiceError("fake synthesis failure".to_string()));
        }

        Ok(SynthesizedAudio {
            audio_data: self.audio_data.clone(),
            format: AudioFormat::Wav,
        })
    }
}
