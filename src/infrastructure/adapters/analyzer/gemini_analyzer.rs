//! Gemini Image Analyzer
//!
//! 将截图以内联 base64 发送给视觉模型，要求只返回 JSON，
//! 再从模型文本中提取并校验 JSON 对象

use async_trait::async_trait;
use base64::Engine;
use image::imageops::FilterType;
use image::ImageFormat;
use reqwest::Client;
use serde::Deserialize;
use std::io::Cursor;
use std::time::Duration;

use crate::application::ports::{AnalyzerError, CharacterAnalysis, ImageAnalyzerPort};
use crate::domain::voice::Gender;
use crate::infrastructure::adapters::gemini_dto::{
    generate_content_url, Content, GenerateContentRequest, GenerateContentResponse,
    GenerationConfig, Part, API_KEY_HEADER, DEFAULT_BASE_URL,
};

const ANALYSIS_PROMPT: &str = r#"Analyze the character prominently featured in the screenshot.
Identify the character's name, gender (Male/Female/Unknown) and any dialogue they are speaking
(look for speech bubbles, subtitles or text boxes attributed to them).
Use "Unknown" if the name or gender cannot be determined.
Also write a short persona description (tone, age, personality, accent) that a voice actor could
follow when reading the line.

Return ONLY a valid JSON object with this structure:
{
  "character_name": "<Character's name or Unknown>",
  "gender": "<Male/Female/Unknown>",
  "dialogue": "<The exact spoken words, or an empty string if none>",
  "persona_instructions": "<One or two sentences describing how the character speaks>"
}

Do not include any text before or after the JSON object.
If no dialogue is clearly attributable to the character, return an empty string for "dialogue"."#;

/// Gemini 分析器配置
#[derive(Debug, Clone)]
pub struct GeminiImageAnalyzerConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
    /// 上传前的最大高度（像素）
    pub max_image_height: u32,
}

impl GeminiImageAnalyzerConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: "gemini-2.0-flash".to_string(),
            timeout_secs: 120,
            max_image_height: 720,
        }
    }
}

/// Gemini 截图分析器
pub struct GeminiImageAnalyzer {
    client: Client,
    config: GeminiImageAnalyzerConfig,
}

impl GeminiImageAnalyzer {
    pub fn new(config: GeminiImageAnalyzerConfig) -> Result<Self, AnalyzerError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AnalyzerError::Unavailable(e.to_string()))?;
        Ok(Self { client, config })
    }
}

fn build_prompt(context_hint: &str) -> String {
    let hint = context_hint.trim();
    if hint.is_empty() {
        ANALYSIS_PROMPT.to_string()
    } else {
        format!(
            "The screenshot is from the game \"{}\"; use your knowledge of it to identify the speaker.\n\n{}",
            hint, ANALYSIS_PROMPT
        )
    }
}

/// 高度超过 `max_height` 时按 Lanczos 等比缩小并重新编码为 PNG
///
/// 无需缩放或缩放失败时返回 `None`，调用方发送原图
pub(crate) fn downscale_image(image: &[u8], max_height: u32) -> Option<Vec<u8>> {
    let decoded = match image::load_from_memory(image) {
        Ok(decoded) => decoded,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to decode screenshot, sending original");
            return None;
        }
    };

    let (width, height) = (decoded.width(), decoded.height());
    if max_height == 0 || height <= max_height {
        return None;
    }

    let new_width = ((u64::from(width) * u64::from(max_height)) / u64::from(height)).max(1) as u32;
    let resized = decoded.resize_exact(new_width, max_height, FilterType::Lanczos3);

    let mut encoded = Cursor::new(Vec::new());
    if let Err(e) = resized.write_to(&mut encoded, ImageFormat::Png) {
        tracing::warn!(error = %e, "Failed to encode resized screenshot, sending original");
        return None;
    }

    tracing::debug!(
        from = %format!("{}x{}", width, height),
        to = %format!("{}x{}", new_width, max_height),
        "Screenshot resized"
    );
    Some(encoded.into_inner())
}

/// 按文件头识别图像类型，未知时按 PNG 处理
fn image_mime_type(image: &[u8]) -> &'static str {
    if image.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "image/jpeg"
    } else if image.starts_with(b"RIFF") && image.get(8..12) == Some(&b"WEBP"[..]) {
        "image/webp"
    } else {
        "image/png"
    }
}

/// 去掉 Markdown 代码块，提取第一个完整的 JSON 对象
pub(crate) fn clean_model_response(text: &str) -> &str {
    let text = text.trim();
    let Some(start) = text.find('{') else {
        return text;
    };

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return &text[start..start + offset + 1];
                }
            }
            _ => {}
        }
    }

    // 未闭合，交给 JSON 解析报错
    &text[start..]
}

#[derive(Debug, Deserialize)]
struct RawAnalysis {
    character_name: Option<serde_json::Value>,
    gender: Option<serde_json::Value>,
    dialogue: Option<serde_json::Value>,
    #[serde(default)]
    persona_instructions: Option<serde_json::Value>,
}

fn value_to_string(value: Option<serde_json::Value>) -> String {
    match value {
        Some(serde_json::Value::String(s)) => s.trim().to_string(),
        Some(serde_json::Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// 解析并规范化模型输出
pub(crate) fn parse_analysis(text: &str) -> Result<CharacterAnalysis, AnalyzerError> {
    let cleaned = clean_model_response(text);
    if cleaned.is_empty() {
        return Err(AnalyzerError::InvalidResponse("Empty model response".to_string()));
    }

    let raw: RawAnalysis = serde_json::from_str(cleaned)
        .map_err(|e| AnalyzerError::InvalidResponse(format!("Invalid JSON: {}", e)))?;

    if raw.character_name.is_none() || raw.gender.is_none() || raw.dialogue.is_none() {
        return Err(AnalyzerError::InvalidResponse(
            "Missing required keys (character_name, gender, dialogue)".to_string(),
        ));
    }

    let mut character_name = value_to_string(raw.character_name);
    if character_name.is_empty() {
        character_name = "Unknown".to_string();
    }

    Ok(CharacterAnalysis {
        character_name,
        gender: Gender::parse_lenient(&value_to_string(raw.gender)),
        dialogue: value_to_string(raw.dialogue),
        persona_instructions: value_to_string(raw.persona_instructions),
    })
}

#[async_trait]
impl ImageAnalyzerPort for GeminiImageAnalyzer {
    async fn analyze(
        &self,
        image: &[u8],
        context_hint: &str,
    ) -> Result<CharacterAnalysis, AnalyzerError> {
        if image.is_empty() {
            return Err(AnalyzerError::InvalidResponse("Empty image".to_string()));
        }

        // 解码和重采样是 CPU 密集操作
        let max_height = self.config.max_image_height;
        let original = image.to_vec();
        let resized = tokio::task::spawn_blocking(move || downscale_image(&original, max_height))
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Screenshot resize task failed, sending original");
                None
            });
        let image = resized.as_deref().unwrap_or(image);

        let mime_type = image_mime_type(image);
        let encoded = base64::engine::general_purpose::STANDARD.encode(image);
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![
                    Part::text(build_prompt(context_hint)),
                    Part::inline(mime_type, encoded),
                ],
            }],
            generation_config: Some(GenerationConfig {
                temperature: Some(0.2),
                ..Default::default()
            }),
        };

        tracing::debug!(
            model = %self.config.model,
            image_size = image.len(),
            mime_type = mime_type,
            "Sending screenshot to analyzer"
        );

        let response = self
            .client
            .post(generate_content_url(&self.config.base_url, &self.config.model))
            .header(API_KEY_HEADER, &self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AnalyzerError::Unavailable(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| AnalyzerError::InvalidResponse(e.to_string()))?;
        if let Some(reason) = body.block_reason() {
            return Err(AnalyzerError::Blocked(reason));
        }

        let text = body.text();
        tracing::debug!(response = %text, "Analyzer raw response");

        let analysis = parse_analysis(&text)?;
        tracing::info!(
            character = %analysis.character_name,
            gender = %analysis.gender,
            dialogue_len = analysis.dialogue.len(),
            has_persona = !analysis.persona_instructions.is_empty(),
            "Screenshot analyzed"
        );
        Ok(analysis)
    }
}
