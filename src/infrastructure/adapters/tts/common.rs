//! 各 HTTP 提供方共用的请求辅助

use reqwest::{Client, Response};
use std::time::Duration;

use crate::application::ports::ProviderError;

/// 构建带超时的 HTTP 客户端
pub(crate) fn build_http_client(timeout_secs: u64) -> Result<Client, ProviderError> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ProviderError::NetworkError(e.to_string()))
}

/// 非 2xx 响应转换为服务错误，404 视为音色不存在
pub(crate) async fn check_status(
    response: Response,
    voice_id: Option<&str>,
) -> Result<Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error_text = response.text().await.unwrap_or_default();
    if status == reqwest::StatusCode::NOT_FOUND {
        if let Some(voice_id) = voice_id {
            return Err(ProviderError::VoiceNotFound(voice_id.to_string()));
        }
    }
    Err(ProviderError::ServiceError(format!(
        "HTTP {}: {}",
        status,
        truncate(&error_text, 512)
    )))
}

/// 空台词不发请求
pub(crate) fn ensure_text(text: &str) -> Result<&str, ProviderError> {
    let text = text.trim();
    if text.is_empty() {
        Err(ProviderError::EmptyText)
    } else {
        Ok(text)
    }
}

pub(crate) fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
