/*!
 * Provider registry.
 *
 * Maps provider identifiers to factories so the controller never matches on
 * concrete provider types. Tests register their own factories (usually a
 * shared `MockProvider`) under any id.
 */

use log::debug;
use std::collections::HashMap;
use std::sync::Arc;

use crate::app_config::ProviderConfig;
use crate::errors::ProviderError;
use crate::providers::LlmProvider;
use crate::providers::anthropic::Anthropic;
use crate::providers::mock::MockProvider;
use crate::providers::ollama::Ollama;
use crate::providers::openai::OpenAICompatible;

/// Builds a provider from its settings
pub type ProviderFactory =
    Arc<dyn Fn(&ProviderConfig) -> Result<Arc<dyn LlmProvider>, ProviderError> + Send + Sync>;

/// Provider factories keyed by identifier
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    factories: HashMap<String, ProviderFactory>,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("ids", &self.ids())
            .finish()
    }
}

impl ProviderRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in provider
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("ollama", |config| Ok(Arc::new(Ollama::from_config(config)) as Arc<dyn LlmProvider>));
        for id in ["lm_studio", "openai", "qwen"] {
            registry.register(id, |config| {
                Ok(Arc::new(OpenAICompatible::from_config(config)) as Arc<dyn LlmProvider>)
            });
        }
        registry.register("anthropic", |config| Ok(Arc::new(Anthropic::from_config(config)) as Arc<dyn LlmProvider>));
        registry.register("mock", |_| Ok(Arc::new(MockProvider::working()) as Arc<dyn LlmProvider>));
        registry
    }

    /// Add or replace a factory
    pub fn register<F>(&mut self, id: &str, factory: F)
    where
        F: Fn(&ProviderConfig) -> Result<Arc<dyn LlmProvider>, ProviderError> + Send + Sync + 'static,
    {
        self.factories.insert(id.to_string(), Arc::new(factory));
    }

    /// Register a ready-made provider instance under `id`
    pub fn register_instance(&mut self, id: &str, provider: Arc<dyn LlmProvider>) {
        self.register(id, move |_| Ok(Arc::clone(&provider)));
    }

    /// Build and validate the provider for `id`
    pub fn create(&self, id: &str, config: &ProviderConfig) -> Result<Arc<dyn LlmProvider>, ProviderError> {
        let key = normalize_id(id);
        let factory = self.factories.get(&key)
            .ok_or_else(|| ProviderError::InvalidConfig(format!(
                "Unknown provider '{}'; available: {}", id, self.ids().join(", ")
            )))?;

        let provider = factory(config)?;
        provider.validate_config()?;
        debug!("Created provider {} with model {}", provider.id(), provider.model());
        Ok(provider)
    }

    /// Registered identifiers, sorted
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.factories.keys().cloned().collect();
        ids.sort();
        ids
    }
}

fn normalize_id(id: &str) -> String {
    let id = id.trim().to_lowercase().replace('-', "_");
    if id == "lmstudio" { "lm_studio".to_string() } else { id }
}
