use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use zoro_config::{AppConfig, OrchestratorConfig};

pub mod gemini;

pub use gemini::GeminiProvider;

pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("provider index not initialised")]
    ProviderIndexMissing,
    #[error("missing Gemini API key")]
    GeminiApiKeyMissing,
    #[error("provider {0} is not registered")]
    ProviderNotFound(String),
    #[error("no text generation provider is available")]
    ProviderUnavailable,
    #[error("provider http request failed: {0}")]
    ProviderHttp(#[from] reqwest::Error),
    #[error("invalid provider response: {0}")]
    ProviderResponse(#[from] serde_json::Error),
    #[error("provider returned status {status}: {message}")]
    ProviderStatus { status: u16, message: String },
    #[error("provider returned no text")]
    EmptyResponse,
    #[error("invalid generation request: {0}")]
    InvalidRequest(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

/// One prior turn of a conversation handed to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub text: String,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Model,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    #[serde(default)]
    pub system: Option<String>,
    #[serde(default)]
    pub history: Vec<ChatTurn>,
    pub prompt: String,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_output_tokens: Option<u32>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_history(mut self, history: Vec<ChatTurn>) -> Self {
        self.history = history;
        self
    }
}

/// A backend able to turn a prompt into text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    fn name(&self) -> &'static str;

    fn model(&self) -> &str;

    async fn generate(&self, request: GenerationRequest) -> Result<String, OrchestratorError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderMetadata {
    pub identifier: String,
    pub family: String,
    pub model: String,
    pub capabilities: Vec<String>,
}

#[derive(Default)]
struct ProviderIndex {
    metadata: Vec<ProviderMetadata>,
    handles: HashMap<String, Arc<dyn TextGenerator>>,
}

impl ProviderIndex {
    fn len(&self) -> usize {
        self.handles.len()
    }

    fn register(&mut self, metadata: ProviderMetadata, provider: Arc<dyn TextGenerator>) {
        let identifier = metadata.identifier.clone();
        if let Some(existing) = self
            .metadata
            .iter_mut()
            .find(|entry| entry.identifier == identifier)
        {
            *existing = metadata;
        } else {
            self.metadata.push(metadata);
        }
        self.handles.insert(identifier, provider);
    }

    fn get(&self, identifier: &str) -> Option<Arc<dyn TextGenerator>> {
        self.handles.get(identifier).cloned()
    }

    fn first(&self) -> Option<Arc<dyn TextGenerator>> {
        self.metadata
            .first()
            .and_then(|entry| self.handles.get(&entry.identifier).cloned())
    }
}

pub struct Orchestrator {
    config: OrchestratorConfig,
    providers: Option<ProviderIndex>,
}

impl Orchestrator {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            config: config.orchestrator.clone(),
            providers: None,
        }
    }

    /// Registers every provider the configuration can support. A missing
    /// Gemini key leaves the orchestrator without providers rather than failing.
    pub fn bootstrap(mut self) -> Result<Self, OrchestratorError> {
        let mut index = ProviderIndex::default();

        match register_gemini_provider(&self.config, &mut index) {
            Ok(()) => {}
            Err(OrchestratorError::GeminiApiKeyMissing) => {
                warn!("no Gemini API key configured; AI features are disabled");
            }
            Err(error) => return Err(error),
        }

        info!(count = index.len(), "provider catalogue initialised");
        self.providers = Some(index);
        Ok(self)
    }

    /// Registers an additional provider, replacing one with the same identifier.
    pub fn with_provider(
        mut self,
        metadata: ProviderMetadata,
        provider: Arc<dyn TextGenerator>,
    ) -> Self {
        self.providers
            .get_or_insert_with(ProviderIndex::default)
            .register(metadata, provider);
        self
    }

    pub fn active_model(&self) -> String {
        self.config.default_model.clone()
    }

    pub fn is_available(&self) -> bool {
        self.providers
            .as_ref()
            .map(|providers| providers.len() > 0)
            .unwrap_or(false)
    }

    pub fn providers(&self) -> Vec<ProviderMetadata> {
        self.providers
            .as_ref()
            .map(|providers| providers.metadata.clone())
            .unwrap_or_default()
    }

    pub fn provider(&self, identifier: &str) -> Result<Arc<dyn TextGenerator>, OrchestratorError> {
        let providers = self
            .providers
            .as_ref()
            .ok_or(OrchestratorError::ProviderIndexMissing)?;

        providers
            .get(identifier)
            .ok_or_else(|| OrchestratorError::ProviderNotFound(identifier.to_string()))
    }

    pub fn default_provider(&self) -> Result<Arc<dyn TextGenerator>, OrchestratorError> {
        self.provider_for_model(&self.config.default_model)
    }

    pub fn provider_for_model(
        &self,
        model: &str,
    ) -> Result<Arc<dyn TextGenerator>, OrchestratorError> {
        let providers = self
            .providers
            .as_ref()
            .ok_or(OrchestratorError::ProviderIndexMissing)?;

        let identifier = provider_identifier_from_model(model);
        if let Some(provider) = providers.get(&identifier) {
            return Ok(provider);
        }

        if let Some(provider) = providers.first() {
            debug!(model = %model, fallback = provider.name(), "falling back to first registered provider");
            return Ok(provider);
        }

        Err(OrchestratorError::ProviderUnavailable)
    }

    /// Runs a request against the default provider.
    pub async fn generate(&self, request: GenerationRequest) -> Result<String, OrchestratorError> {
        let provider = self.default_provider()?;
        provider.generate(request).await
    }
}

fn register_gemini_provider(
    config: &OrchestratorConfig,
    index: &mut ProviderIndex,
) -> Result<(), OrchestratorError> {
    let api_key = config
        .gemini
        .api_key
        .clone()
        .filter(|key| !key.trim().is_empty())
        .or_else(|| {
            std::env::var(GEMINI_API_KEY_ENV)
                .ok()
                .filter(|key| !key.trim().is_empty())
        })
        .ok_or(OrchestratorError::GeminiApiKeyMissing)?;

    let api_key_source = if config.gemini.api_key.is_some() {
        "config"
    } else {
        "env"
    };
    debug!(source = api_key_source, "initialising Gemini provider");

    let provider = GeminiProvider::new(&config.gemini, api_key, config.default_model.clone())?;
    let metadata = ProviderMetadata {
        identifier: "gemini".to_string(),
        family: "google".to_string(),
        model: config.default_model.clone(),
        capabilities: vec!["generate-content".to_string()],
    };

    index.register(metadata, Arc::new(provider));
    Ok(())
}

fn provider_identifier_from_model(model: &str) -> String {
    model
        .split(['/', '-'])
        .next()
        .filter(|value| !value.is_empty())
        .unwrap_or("gemini")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_identifier_uses_model_family_prefix() {
        assert_eq!(provider_identifier_from_model("gemini-1.5-flash"), "gemini");
        assert_eq!(provider_identifier_from_model("acme/large"), "acme");
        assert_eq!(provider_identifier_from_model(""), "gemini");
    }

    #[test]
    fn generation_request_builders() {
        let request = GenerationRequest::new("hi")
            .with_system("be brief")
            .with_history(vec![ChatTurn::user("a"), ChatTurn::model("b")]);
        assert_eq!(request.system.as_deref(), Some("be brief"));
        assert_eq!(request.history[1].role, ChatRole::Model);
    }
}
