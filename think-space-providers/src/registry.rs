//! Provider registry - single source of truth for LLM provider metadata

use serde::{Deserialize, Serialize};

/// One LLM provider's metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSpec {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    pub default_api_base: String,
}

impl ProviderSpec {
    pub fn label(&self) -> String {
        if !self.display_name.is_empty() {
            self.display_name.clone()
        } else {
            let mut name = self.name.clone();
            if let Some(first_char) = name.chars().next() {
                name = first_char.to_uppercase().to_string() + &name[first_char.len_utf8()..];
            }
            name
        }
    }
}

/// Registry of available LLM providers
pub struct ProviderRegistry {
    providers: Vec<ProviderSpec>,
}

impl ProviderRegistry {
    /// Create a new provider registry with default providers
    pub fn new() -> Self {
        Self {
            providers: Self::default_providers(),
        }
    }

    /// Find a provider by config name
    pub fn find_by_name(&self, name: &str) -> Option<&ProviderSpec> {
        self.providers
            .iter()
            .find(|spec| spec.name.eq_ignore_ascii_case(name))
    }

    /// Human-readable label for a provider name, falling back to the name itself
    pub fn label_for(&self, name: &str) -> String {
        self.find_by_name(name)
            .map(ProviderSpec::label)
            .unwrap_or_else(|| name.to_string())
    }

    fn default_providers() -> Vec<ProviderSpec> {
        let yaml = include_str!("providers.yaml");
        serde_yaml::from_str(yaml).expect("Failed to parse default providers configuration")
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
