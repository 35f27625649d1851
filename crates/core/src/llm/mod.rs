//! Chat backends that turn a message list into an answer.

pub mod ollama;
pub mod openai;

use crate::config::{LlmProviderKind, Settings};
use crate::error::{ConfigError, LlmError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use ollama::OllamaChat;
pub use openai::OpenAiChat;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Generate the assistant's reply to `messages`.
    async fn generate(&self, messages: &[Message]) -> Result<String, LlmError>;
}

/// The chat backend selected by [`Settings::llm_provider`].
#[derive(Debug, Clone)]
pub enum LlmBackend {
    Ollama(OllamaChat),
    OpenAi(OpenAiChat),
}

impl LlmBackend {
    /// Resolve the configured backend, failing when its credentials are absent.
    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        match settings.llm_provider {
            LlmProviderKind::Ollama => Ok(Self::Ollama(OllamaChat::new(
                &settings.ollama_base_url,
                &settings.ollama_model,
            ))),
            LlmProviderKind::OpenAi => {
                let api_key = settings
                    .openai_api_key
                    .clone()
                    .ok_or_else(|| ConfigError::Missing {
                        key: format!("{}OPENAI_API_KEY", crate::config::ENV_PREFIX),
                    })?;
                Ok(Self::OpenAi(OpenAiChat::new(
                    &settings.openai_base_url,
                    &settings.openai_model,
                    api_key,
                )))
            }
        }
    }

    pub fn kind(&self) -> LlmProviderKind {
        match self {
            Self::Ollama(_) => LlmProviderKind::Ollama,
            Self::OpenAi(_) => LlmProviderKind::OpenAi,
        }
    }
}

#[async_trait]
impl ChatModel for LlmBackend {
    async fn generate(&self, messages: &[Message]) -> Result<String, LlmError> {
        match self {
            Self::Ollama(model) => model.generate(messages).await,
            Self::OpenAi(model) => model.generate(messages).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(pairs: &[(&str, &str)]) -> Settings {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (format!("LOCALRAG_{key}"), value.to_string()))
            .collect();
        Settings::from_lookup(|key| vars.get(key).cloned()).expect("valid settings")
    }

    #[test]
    fn ollama_is_the_default_backend() -> Result<(), ConfigError> {
        let backend = LlmBackend::from_settings(&settings(&[]))?;
        assert_eq!(backend.kind(), LlmProviderKind::Ollama);
        Ok(())
    }

    #[test]
    fn openai_without_key_fails_fast() {
        let result = LlmBackend::from_settings(&settings(&[("LLM_PROVIDER", "openai")]));
        match result {
            Err(ConfigError::Missing { key }) => assert_eq!(key, "LOCALRAG_OPENAI_API_KEY"),
            other => panic!("expected missing key error, got {other:?}"),
        }
    }

    #[test]
    fn openai_with_key_resolves() -> Result<(), ConfigError> {
        let backend = LlmBackend::from_settings(&settings(&[
            ("LLM_PROVIDER", "openai"),
            ("OPENAI_API_KEY", "sk-test"),
        ]))?;
        assert_eq!(backend.kind(), LlmProviderKind::OpenAi);
        Ok(())
    }

    #[test]
    fn roles_serialize_lowercase() -> Result<(), serde_json::Error> {
        let rendered = serde_json::to_value(Message::assistant("hi"))?;
        assert_eq!(rendered["role"], "assistant");
        Ok(())
    }
}
