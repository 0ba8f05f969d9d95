//! Request and policy types shared by every stage of the pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Publishing platform the copy is written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Twitter,
    Linkedin,
    Instagram,
    Facebook,
    Tiktok,
    Email,
    Blog,
}

impl Platform {
    /// All supported platforms, in schema order.
    pub const ALL: [Platform; 7] = [
        Platform::Twitter,
        Platform::Linkedin,
        Platform::Instagram,
        Platform::Facebook,
        Platform::Tiktok,
        Platform::Email,
        Platform::Blog,
    ];

    /// Character limit used when the request does not set `max_length`.
    pub fn default_max_length(self) -> u32 {
        match self {
            Platform::Twitter => 280,
            Platform::Linkedin => 3000,
            Platform::Instagram => 2200,
            Platform::Facebook => 63206,
            Platform::Tiktok => 2200,
            Platform::Email => 5000,
            Platform::Blog => 20000,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Twitter => "twitter",
            Platform::Linkedin => "linkedin",
            Platform::Instagram => "instagram",
            Platform::Facebook => "facebook",
            Platform::Tiktok => "tiktok",
            Platform::Email => "email",
            Platform::Blog => "blog",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named policy level controlling how strictly banned content is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyMode {
    #[default]
    Safe,
    Balanced,
    Relaxed,
}

impl SafetyMode {
    pub fn as_str(self) -> &'static str {
        match self {
            SafetyMode::Safe => "safe",
            SafetyMode::Balanced => "balanced",
            SafetyMode::Relaxed => "relaxed",
        }
    }
}

impl fmt::Display for SafetyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SafetyMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "safe" => Ok(SafetyMode::Safe),
            "balanced" => Ok(SafetyMode::Balanced),
            "relaxed" => Ok(SafetyMode::Relaxed),
            other => Err(format!(
                "unknown safety mode '{}': expected one of safe, balanced, relaxed",
                other
            )),
        }
    }
}

/// What to write about and how.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentInput {
    /// Subject of the copy
    pub topic: String,

    /// Target platform
    pub platform: Platform,

    /// Requested tone of voice (e.g. "playful", "authoritative")
    pub tone: String,

    /// Content format (e.g. "post", "thread", "newsletter")
    pub format: String,

    /// Hard character limit; platform default when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,

    /// Whether a call-to-action is wanted
    #[serde(default = "default_include_cta")]
    pub include_cta: bool,

    /// Kind of call-to-action (e.g. "signup", "purchase")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cta_type: Option<String>,
}

fn default_include_cta() -> bool {
    true
}

impl ContentInput {
    /// The character limit that applies to this input.
    pub fn effective_max_length(&self) -> u32 {
        self.max_length
            .unwrap_or_else(|| self.platform.default_max_length())
    }
}

/// A caller's request to produce on-brand copy.
///
/// Immutable for the lifetime of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub brand_id: String,
    pub input: ContentInput,

    /// Overrides the brand's stored safety mode for this request only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safety_mode: Option<SafetyMode>,
}

/// Per-brand content policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrandSafetyConfig {
    #[serde(default)]
    pub safety_mode: SafetyMode,

    #[serde(default)]
    pub banned_phrases: Vec<String>,

    #[serde(default)]
    pub banned_claims: Vec<String>,

    #[serde(default)]
    pub required_disclaimers: Vec<String>,

    #[serde(default)]
    pub required_hashtags: Vec<String>,
}

impl BrandSafetyConfig {
    /// Policy applied when a brand has nothing stored or storage is degraded.
    pub fn system_default() -> Self {
        Self {
            safety_mode: SafetyMode::Safe,
            banned_phrases: vec![
                "guaranteed results".to_string(),
                "risk-free".to_string(),
                "act now or miss out".to_string(),
            ],
            banned_claims: vec![
                "cures".to_string(),
                "clinically proven".to_string(),
                "best in the world".to_string(),
            ],
            required_disclaimers: Vec::new(),
            required_hashtags: Vec::new(),
        }
    }

    /// Same policy with a different safety mode.
    pub fn with_mode(mut self, mode: SafetyMode) -> Self {
        self.safety_mode = mode;
        self
    }
}

impl Default for BrandSafetyConfig {
    fn default() -> Self {
        Self::system_default()
    }
}

/// Brand voice parameters handed to the fidelity scorer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BrandVoice {
    pub brand_id: String,
    pub tone: String,
    pub platform: Platform,
    pub format: String,
}

impl BrandVoice {
    pub fn from_request(request: &GenerationRequest) -> Self {
        Self {
            brand_id: request.brand_id.clone(),
            tone: request.input.tone.clone(),
            platform: request.input.platform,
            format: request.input.format.clone(),
        }
    }
}

/// Resource usage reported by one generator call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationUsage {
    pub tokens_in: u32,
    pub tokens_out: u32,
    pub provider: String,
    pub model: String,
}

impl GenerationUsage {
    pub fn total_tokens(&self) -> u32 {
        self.tokens_in + self.tokens_out
    }
}
