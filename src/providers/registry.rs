/*!
 * Lookup table from provider kind to a ready client.
 *
 * The orchestrator only sees `Arc<dyn Provider>`; tests register mocks under
 * a real provider kind, the CLI builds HTTP clients from the configuration.
 */

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use log::{debug, warn};
use url::Url;

use crate::app_config::{Config, TranslationProvider};
use crate::providers::Provider;
use crate::providers::gemini::Gemini;
use crate::providers::openai::OpenAI;

/// Providers available to a batch, keyed by kind
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<TranslationProvider, Arc<dyn Provider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the client for a provider kind
    pub fn register(&mut self, kind: TranslationProvider, provider: Arc<dyn Provider>) {
        if self.providers.insert(kind, provider).is_some() {
            debug!("Replaced registered {} provider", kind.display_name());
        }
    }

    /// Builder-style variant of [`register`](Self::register)
    pub fn with(mut self, kind: TranslationProvider, provider: Arc<dyn Provider>) -> Self {
        self.register(kind, provider);
        self
    }

    pub fn get(&self, kind: TranslationProvider) -> Option<Arc<dyn Provider>> {
        self.providers.get(&kind).cloned()
    }

    pub fn contains(&self, kind: TranslationProvider) -> bool {
        self.providers.contains_key(&kind)
    }

    /// Registered kinds in a stable order
    pub fn kinds(&self) -> Vec<TranslationProvider> {
        TranslationProvider::ALL
            .into_iter()
            .filter(|kind| self.contains(*kind))
            .collect()
    }

    /// Build HTTP clients for every provider whose API key can be resolved
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut registry = Self::new();
        let settings = &config.translation;

        for kind in TranslationProvider::ALL {
            let Some(api_key) = settings.get_api_key(kind) else {
                if kind == settings.provider {
                    warn!("No API key found for active provider {}", kind.display_name());
                }
                continue;
            };

            let endpoint = settings.get_endpoint(kind);
            Url::parse(&endpoint)
                .with_context(|| format!("Invalid {} endpoint URL: {}", kind.display_name(), endpoint))?;
            let timeout = settings.get_timeout(kind);

            let provider: Arc<dyn Provider> = match kind {
                TranslationProvider::OpenAI => Arc::new(OpenAI::new_with_timeout(api_key, endpoint, timeout)),
                TranslationProvider::Gemini => Arc::new(Gemini::new_with_timeout(api_key, endpoint, timeout)),
            };
            debug!("Registered {} provider", kind.display_name());
            registry.register(kind, provider);
        }

        Ok(registry)
    }
}
