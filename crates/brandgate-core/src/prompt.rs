//! Prompt construction for the copy generator.
//!
//! The system prompt is constant so providers with prompt caching can
//! reuse it across requests. The user prompt carries everything specific
//! to one request and is built once: every attempt sends the same prompt.

use serde::{Deserialize, Serialize};

use crate::types::{BrandSafetyConfig, GenerationRequest, SafetyMode};

/// Base system prompt shared by every generation request.
pub const COPYWRITER_SYSTEM_PROMPT: &str = r##"
You are a senior brand copywriter producing marketing copy for a single brand.

## Rules
1. Write ONLY about the requested topic
2. Match the requested tone and platform conventions
3. Never use a banned phrase or make a banned claim
4. Include every required disclaimer verbatim
5. Include every required hashtag
6. Stay within the character limit, counting headline, body, CTA and hashtags

## Output Format (JSON)
{
  "headline": "string",
  "body": "string",
  "cta": "string (empty when no call-to-action is requested)",
  "hashtags": ["#tag", "#tag"]
}

Return the JSON object only. No commentary.
"##;

/// Messages sent to the generator for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// Build the prompt for a request under an effective safety configuration.
pub fn build_prompt(request: &GenerationRequest, safety: &BrandSafetyConfig) -> Prompt {
    let input = &request.input;
    let mut user = String::new();

    user.push_str("## Brief\n");
    user.push_str(&format!("- Topic: {}\n", input.topic.trim()));
    user.push_str(&format!("- Platform: {}\n", input.platform));
    user.push_str(&format!("- Tone: {}\n", input.tone.trim()));
    user.push_str(&format!("- Format: {}\n", input.format.trim()));
    user.push_str(&format!(
        "- Maximum length: {} characters\n",
        input.effective_max_length()
    ));

    if input.include_cta {
        match input.cta_type.as_deref() {
            Some(kind) if !kind.trim().is_empty() => {
                user.push_str(&format!("- Call-to-action: required ({})\n", kind.trim()))
            }
            _ => user.push_str("- Call-to-action: required\n"),
        }
    } else {
        user.push_str("- Call-to-action: none\n");
    }

    user.push_str(&format!("\n## Safety mode: {}\n", safety.safety_mode));
    user.push_str(safety_mode_guidance(safety.safety_mode));
    user.push('\n');

    push_list(&mut user, "Never use these phrases", &safety.banned_phrases);
    push_list(&mut user, "Never make these claims", &safety.banned_claims);
    push_list(&mut user, "Include these disclaimers verbatim", &safety.required_disclaimers);
    push_list(&mut user, "Include these hashtags", &safety.required_hashtags);

    Prompt {
        system: COPYWRITER_SYSTEM_PROMPT.trim().to_string(),
        user: user.trim_end().to_string(),
    }
}

fn safety_mode_guidance(mode: SafetyMode) -> &'static str {
    match mode {
        SafetyMode::Safe => {
            "Keep the copy conservative: no slang, no superlatives about results, no edgy humor."
        }
        SafetyMode::Balanced => {
            "Light humor and informal language are fine; avoid anything that could read as a promise of outcomes."
        }
        SafetyMode::Relaxed => {
            "Bold, informal copy is allowed, but banned phrases and claims still apply."
        }
    }
}

fn push_list(out: &mut String, heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    out.push_str(&format!("\n### {}\n", heading));
    for item in items {
        out.push_str(&format!("- {}\n", item));
    }
}
