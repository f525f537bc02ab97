use llm::builder::{LLMBackend, LLMBuilder};
use llm::chat::{ChatMessage, StructuredOutputFormat};

use powerlens_core::AiSettings;

use crate::ReviewError;

pub fn map_backend(provider: &str) -> Result<LLMBackend, ReviewError> {
    match provider {
        "openai" => Ok(LLMBackend::OpenAI),
        "anthropic" => Ok(LLMBackend::Anthropic),
        "google" => Ok(LLMBackend::Google),
        "ollama" => Ok(LLMBackend::Ollama),
        "groq" => Ok(LLMBackend::Groq),
        "mistral" => Ok(LLMBackend::Mistral),
        "deepseek" => Ok(LLMBackend::DeepSeek),
        other => Err(ReviewError::UnknownProvider(other.to_string())),
    }
}

/// Send one system + user exchange and return the raw response text. No retries.
pub async fn generate(
    settings: &AiSettings,
    system: &str,
    user_msg: &str,
    format: StructuredOutputFormat,
) -> Result<String, ReviewError> {
    let backend = map_backend(&settings.provider)?;

    let mut builder = LLMBuilder::new()
        .backend(backend)
        .model(&settings.model)
        .system(system)
        .schema(format);

    if !settings.api_key.is_empty() {
        builder = builder.api_key(&settings.api_key);
    }
    if let Some(url) = settings.base_url.as_deref().filter(|u| !u.is_empty()) {
        builder = builder.base_url(url);
    }
    if settings.timeout_secs > 0 {
        builder = builder.timeout_seconds(settings.timeout_secs);
    }

    let llm = builder.build().map_err(|e| ReviewError::Build(e.to_string()))?;

    let messages = vec![ChatMessage::user().content(user_msg).build()];

    let response = llm
        .chat(&messages)
        .await
        .map_err(|e| ReviewError::Request(e.to_string()))?;

    match response.text() {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(ReviewError::EmptyResponse),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_providers_map_to_backends() {
        for provider in ["openai", "anthropic", "google", "ollama", "groq", "mistral", "deepseek"] {
            assert!(map_backend(provider).is_ok(), "{provider} should be supported");
        }
    }

    #[test]
    fn unknown_provider_is_rejected() {
        match map_backend("gemini") {
            Err(ReviewError::UnknownProvider(p)) => assert_eq!(p, "gemini"),
            other => panic!("expected UnknownProvider, got {other:?}"),
        }
    }
}
