//! Per-provider credential set
//!
//! Credentials are explicit values passed to the normalizer at call time,
//! never ambient state. The only environment read happens in [`CredentialSet::from_env`].
//! Keys are never logged in full; use [`redact`] for any display.

use serde::{Deserialize, Serialize};

use crate::registry::ProviderKind;

/// One optional secret per supported provider
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialSet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openai: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub perplexity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anthropic: Option<String>,
}

impl CredentialSet {
    /// Load server-side fallback credentials from the environment.
    pub fn from_env() -> Self {
        let read = |kind: ProviderKind| {
            std::env::var(kind.env_key())
                .ok()
                .filter(|value| !value.trim().is_empty())
        };
        Self {
            openai: read(ProviderKind::OpenAi),
            perplexity: read(ProviderKind::Perplexity),
            anthropic: read(ProviderKind::Anthropic),
        }
    }

    pub fn for_provider(&self, kind: ProviderKind) -> Option<&str> {
        match kind {
            ProviderKind::OpenAi => self.openai.as_deref(),
            ProviderKind::Perplexity => self.perplexity.as_deref(),
            ProviderKind::Anthropic => self.anthropic.as_deref(),
        }
    }

    pub fn set(&mut self, kind: ProviderKind, value: Option<String>) {
        let value = value.filter(|v| !v.trim().is_empty());
        match kind {
            ProviderKind::OpenAi => self.openai = value,
            ProviderKind::Perplexity => self.perplexity = value,
            ProviderKind::Anthropic => self.anthropic = value,
        }
    }

    /// Slot-wise resolution: this set wins, `other` fills empty slots. The
    /// relay calls `server.with_fallback(&client)` so the server-held key is
    /// preferred over a client-supplied one.
    pub fn with_fallback(&self, other: &CredentialSet) -> CredentialSet {
        CredentialSet {
            openai: self.openai.clone().or_else(|| other.openai.clone()),
            perplexity: self.perplexity.clone().or_else(|| other.perplexity.clone()),
            anthropic: self.anthropic.clone().or_else(|| other.anthropic.clone()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.openai.is_none() && self.perplexity.is_none() && self.anthropic.is_none()
    }
}

// keys stay redacted even through {:?}
impl std::fmt::Debug for CredentialSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialSet")
            .field("openai", &self.openai.as_deref().map(redact))
            .field("perplexity", &self.perplexity.as_deref().map(redact))
            .field("anthropic", &self.anthropic.as_deref().map(redact))
            .finish()
    }
}

/// Render a secret as its last four characters, keeping short keys fully
/// hidden. Safe for logs and status output.
pub fn redact(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        "…".to_string()
    } else {
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("…{tail}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_prefers_own_slot() {
        let server = CredentialSet {
            openai: Some("sk-server-key-1234".into()),
            ..Default::default()
        };
        let client = CredentialSet {
            openai: Some("sk-client-key-5678".into()),
            perplexity: Some("pplx-client-key".into()),
            ..Default::default()
        };

        let resolved = server.with_fallback(&client);
        assert_eq!(resolved.openai.as_deref(), Some("sk-server-key-1234"));
        assert_eq!(resolved.perplexity.as_deref(), Some("pplx-client-key"));
        assert!(resolved.anthropic.is_none());
    }

    #[test]
    fn test_set_drops_blank_values() {
        let mut creds = CredentialSet::default();
        creds.set(ProviderKind::OpenAi, Some("   ".into()));
        assert!(creds.openai.is_none());
        creds.set(ProviderKind::OpenAi, Some("sk-real".into()));
        assert_eq!(creds.for_provider(ProviderKind::OpenAi), Some("sk-real"));
    }

    #[test]
    fn test_redact_never_reveals_short_keys() {
        assert_eq!(redact("short"), "…");
        assert_eq!(redact("sk-abcdefgh1234"), "…1234");
        assert!(!redact("sk-abcdefgh1234").contains("abcdefgh"));
    }

    #[test]
    fn test_serde_roundtrip() {
        let creds = CredentialSet {
            openai: Some("sk-test".into()),
            perplexity: None,
            anthropic: Some("sk-ant".into()),
        };
        let json = serde_json::to_string(&creds).unwrap();
        let back: CredentialSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, creds);
    }
}
