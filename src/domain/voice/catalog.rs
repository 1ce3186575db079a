//! 固定音色目录
//!
//! OpenAI 与 Gemini 不提供带性别信息的音色列表接口，音色集合是封闭的，
//! 性别为通常听感

use super::{Gender, ProviderKind, Voice, VoiceId};

const OPENAI_VOICES: &[(&str, Gender)] = &[
    ("alloy", Gender::Male),
    ("echo", Gender::Male),
    ("fable", Gender::Male),
    ("onyx", Gender::Male),
    ("ash", Gender::Male),
    ("nova", Gender::Female),
    ("shimmer", Gender::Female),
    ("coral", Gender::Female),
    ("sage", Gender::Female),
];

const GEMINI_VOICES: &[(&str, Gender)] = &[
    ("Zephyr", Gender::Female),
    ("Puck", Gender::Male),
    ("Charon", Gender::Male),
    ("Kore", Gender::Female),
    ("Fenrir", Gender::Male),
    ("Leda", Gender::Female),
    ("Orus", Gender::Male),
    ("Aoede", Gender::Female),
    ("Callirrhoe", Gender::Female),
    ("Autonoe", Gender::Female),
    ("Enceladus", Gender::Male),
    ("Iapetus", Gender::Male),
    ("Umbriel", Gender::Male),
    ("Algieba", Gender::Male),
    ("Despina", Gender::Female),
    ("Erinome", Gender::Female),
    ("Algenib", Gender::Male),
    ("Rasalgethi", Gender::Male),
    ("Laomedeia", Gender::Female),
    ("Achernar", Gender::Male),
    ("Alnilam", Gender::Male),
    ("Schedar", Gender::Male),
    ("Gacrux", Gender::Male),
    ("Pulcherrima", Gender::Female),
    ("Achird", Gender::Male),
    ("Zubenelgenubi", Gender::Male),
    ("Vindemiatrix", Gender::Female),
    ("Sadachbia", Gender::Male),
    ("Sadaltager", Gender::Male),
    ("Sulafat", Gender::Female),
];

/// 封闭音色集合；目录需在线获取的提供方返回 `None`
pub fn builtin_voices(provider: ProviderKind) -> Option<&'static [(&'static str, Gender)]> {
    match provider {
        ProviderKind::OpenAi => Some(OPENAI_VOICES),
        ProviderKind::Gemini => Some(GEMINI_VOICES),
        ProviderKind::ElevenLabs | ProviderKind::Google => None,
    }
}

/// 固定目录转换为音色列表（目录顺序）
pub fn builtin_catalog(provider: ProviderKind) -> Vec<Voice> {
    builtin_voices(provider)
        .unwrap_or_default()
        .iter()
        .filter_map(|(id, gender)| {
            let voice_id = VoiceId::new(*id).ok()?;
            Some(Voice::new(voice_id, capitalize(id), *gender, provider))
        })
        .collect()
}

/// 音色是否属于该提供方的封闭集合；开放目录的提供方始终返回 true
pub fn is_known_voice(provider: ProviderKind, voice_id: &str) -> bool {
    match builtin_voices(provider) {
        Some(voices) => voices.iter().any(|(id, _)| *id == voice_id),
        None => true,
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_catalog() {
        let voices = builtin_catalog(ProviderKind::OpenAi);
        assert_eq!(voices.len(), 9);
        assert_eq!(voices[0].id().as_str(), "alloy");
        assert_eq!(voices[0].name(), "Alloy");
        assert!(voices.iter().all(|v| v.provider() == ProviderKind::OpenAi));
    }

    #[test]
    fn test_gemini_catalog_has_both_genders() {
        let voices = builtin_catalog(ProviderKind::Gemini);
        assert_eq!(voices.len(), 30);
        assert!(voices.iter().any(|v| v.gender() == Gender::Female));
        assert!(voices.iter().any(|v| v.gender() == Gender::Male));
    }

    #[test]
    fn test_known_voice() {
        assert!(is_known_voice(ProviderKind::Gemini, "Kore"));
        assert!(!is_known_voice(ProviderKind::Gemini, "kore"));
        assert!(!is_known_voice(ProviderKind::OpenAi, "Kore"));
        assert!(is_known_voice(ProviderKind::Google, "anything"));
        assert!(builtin_catalog(ProviderKind::ElevenLabs).is_empty());
    }
}
