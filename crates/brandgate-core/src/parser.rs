//! Parsing raw generator text into a structured [`Candidate`].
//!
//! Generators are asked for JSON or labelled sections, but real output
//! drifts. Parsing is tried in a fixed order:
//!
//! 1. JSON object, located inside a fenced code block or as the outermost
//!    `{...}` span, so a preamble or sign-off around it is ignored
//! 2. Labelled sections (`HEADLINE:`, `BODY:`, `CTA:`, `HASHTAGS:`)
//! 3. Fallback: first non-empty line as headline, the rest as body
//!
//! Step 3 is only taken through [`parse_candidate_or_fallback`] and is
//! deterministic: the same text always yields the same candidate.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

use crate::candidate::Candidate;
use crate::types::ContentInput;

lazy_static! {
    static ref CODE_FENCE: Regex =
        Regex::new(r"(?s)^```[a-zA-Z]*\s*(.*?)\s*```$").unwrap();

    static ref FENCED_BLOCK: Regex =
        Regex::new(r"(?s)```[a-zA-Z]*\s*(.*?)\s*```").unwrap();

    static ref SECTION_LABEL: Regex = Regex::new(
        r"(?mi)^[ \t]*[*_]{0,2}(headline|title|body|cta|call to action|hashtags)[*_]{0,2}[ \t]*:[*_]{0,2}[ \t]*"
    ).unwrap();

    static ref HASHTAG: Regex = Regex::new(r"#[A-Za-z0-9_]+").unwrap();

    static ref MARKDOWN_HEADING: Regex = Regex::new(r"^#{1,6}\s+").unwrap();
}

/// Errors from structured candidate parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Generator returned empty output")]
    Empty,

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Output is not structured as JSON or labelled sections")]
    Unstructured,
}

/// Values used when the fallback parse has to invent fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseDefaults {
    pub include_cta: bool,
    pub default_cta: String,
}

impl ParseDefaults {
    pub fn from_input(input: &ContentInput) -> Self {
        let default_cta = match input.cta_type.as_deref().map(str::to_ascii_lowercase) {
            Some(t) if t == "signup" || t == "sign_up" => "Sign up today",
            Some(t) if t == "purchase" || t == "buy" || t == "shop" => "Shop now",
            Some(t) if t == "download" => "Download now",
            Some(t) if t == "contact" => "Get in touch",
            _ => "Learn more",
        };

        Self {
            include_cta: input.include_cta,
            default_cta: default_cta.to_string(),
        }
    }
}

impl Default for ParseDefaults {
    fn default() -> Self {
        Self {
            include_cta: true,
            default_cta: "Learn more".to_string(),
        }
    }
}

/// A parsed candidate plus how it was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCandidate {
    pub candidate: Candidate,
    pub used_fallback: bool,
}

#[derive(Debug, Deserialize)]
struct JsonCandidate {
    #[serde(default, alias = "title")]
    headline: Option<String>,
    #[serde(default)]
    body: Option<String>,
    #[serde(default, alias = "call_to_action")]
    cta: Option<String>,
    #[serde(default)]
    hashtags: Option<JsonHashtags>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum JsonHashtags {
    List(Vec<String>),
    Text(String),
}

/// Parse structured generator output.
pub fn parse_candidate(raw: &str) -> Result<Candidate, ParseError> {
    let text = strip_code_fence(raw.trim());
    if text.is_empty() {
        return Err(ParseError::Empty);
    }

    if let Some(parsed) = find_json(raw.trim()) {
        return from_json(parsed);
    }

    parse_sections(text)
}

/// The first embedded JSON object that names a headline or body.
fn find_json(text: &str) -> Option<JsonCandidate> {
    let fenced = FENCED_BLOCK
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str());

    [fenced, outermost_object(text)]
        .into_iter()
        .flatten()
        .filter_map(|span| outermost_object(span))
        .filter_map(|span| serde_json::from_str::<JsonCandidate>(span).ok())
        .find(|parsed| parsed.headline.is_some() || parsed.body.is_some())
}

fn outermost_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

/// Parse structured output, falling back to first-line-as-headline.
///
/// Only [`ParseError::Empty`] survives the fallback. It is returned for
/// blank output and for output with no line left to use as a headline,
/// such as a bare list of hashtags.
pub fn parse_candidate_or_fallback(
    raw: &str,
    defaults: &ParseDefaults,
) -> Result<ParsedCandidate, ParseError> {
    match parse_candidate(raw) {
        Ok(candidate) => Ok(ParsedCandidate {
            candidate,
            used_fallback: false,
        }),
        Err(ParseError::Empty) => Err(ParseError::Empty),
        Err(e) => {
            tracing::debug!(error = %e, "Structured parse failed, using first-line fallback");
            Ok(ParsedCandidate {
                candidate: fallback_parse(strip_code_fence(raw.trim()), defaults)?,
                used_fallback: true,
            })
        }
    }
}

fn strip_code_fence(text: &str) -> &str {
    CODE_FENCE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or(text)
}

fn from_json(parsed: JsonCandidate) -> Result<Candidate, ParseError> {
    let headline = non_empty(parsed.headline).ok_or(ParseError::MissingField("headline"))?;
    let body = non_empty(parsed.body).ok_or(ParseError::MissingField("body"))?;
    let hashtags = match parsed.hashtags {
        Some(JsonHashtags::List(tags)) => tags.into_iter().filter(|t| !t.trim().is_empty()).collect(),
        Some(JsonHashtags::Text(text)) => split_hashtags(&text),
        None => Vec::new(),
    };

    Ok(Candidate::new(
        headline,
        body,
        parsed.cta.unwrap_or_default().trim(),
        hashtags,
    ))
}

fn parse_sections(text: &str) -> Result<Candidate, ParseError> {
    let labels: Vec<(String, usize, usize)> = SECTION_LABEL
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let label = caps.get(1)?.as_str().to_ascii_lowercase();
            Some((label, whole.start(), whole.end()))
        })
        .collect();

    if labels.is_empty() {
        return Err(ParseError::Unstructured);
    }

    let mut headline = None;
    let mut body = None;
    let mut cta = None;
    let mut hashtags = None;

    for (i, (label, _, content_start)) in labels.iter().enumerate() {
        let content_end = labels.get(i + 1).map(|(_, start, _)| *start).unwrap_or(text.len());
        let content = text[*content_start..content_end].trim().to_string();

        match label.as_str() {
            "headline" | "title" => headline = Some(content),
            "body" => body = Some(content),
            "cta" | "call to action" => cta = Some(content),
            "hashtags" => hashtags = Some(split_hashtags(&content)),
            _ => {}
        }
    }

    let headline = non_empty(headline).ok_or(ParseError::MissingField("headline"))?;
    let body = non_empty(body).ok_or(ParseError::MissingField("body"))?;

    Ok(Candidate::new(
        headline,
        body,
        cta.unwrap_or_default(),
        hashtags.unwrap_or_default(),
    ))
}

fn fallback_parse(text: &str, defaults: &ParseDefaults) -> Result<Candidate, ParseError> {
    let hashtags: Vec<String> = HASHTAG
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .fold(Vec::new(), |mut acc, tag| {
            if !acc.contains(&tag) {
                acc.push(tag);
            }
            acc
        });

    let mut lines = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !is_hashtag_line(line));

    let headline = lines
        .next()
        .map(|line| MARKDOWN_HEADING.replace(line, "").trim().to_string())
        .filter(|line| !line.is_empty())
        .ok_or(ParseError::Empty)?;
    let body = lines.collect::<Vec<_>>().join("\n");

    let cta = if defaults.include_cta {
        defaults.default_cta.clone()
    } else {
        String::new()
    };

    Ok(Candidate::new(headline, body, cta, hashtags))
}

fn is_hashtag_line(line: &str) -> bool {
    line.split_whitespace().all(|word| HASHTAG.is_match(word) && word.starts_with('#'))
}

fn split_hashtags(text: &str) -> Vec<String> {
    text.split(|c: char| c.is_whitespace() || c == ',')
        .map(str::trim)
        .filter(|t| !t.is_empty() && *t != "#")
        .map(str::to_string)
        .collect()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json() {
        let raw = r##"{"headline": "Fresh roast, fresh start", "body": "Our autumn blend is here.", "cta": "Order now", "hashtags": ["coffee", "#autumn"]}"##;
        let candidate = parse_candidate(raw).unwrap();
        assert_eq!(candidate.headline, "Fresh roast, fresh start");
        assert_eq!(candidate.cta, "Order now");
        assert_eq!(candidate.hashtags, vec!["#coffee", "#autumn"]);
    }

    #[test]
    fn test_parse_fenced_json() {
        let raw = "```json\n{\"headline\": \"H\", \"body\": \"B\", \"hashtags\": \"#a #b\"}\n```";
        let candidate = parse_candidate(raw).unwrap();
        assert_eq!(candidate.headline, "H");
        assert_eq!(candidate.hashtags, vec!["#a", "#b"]);
        assert_eq!(candidate.cta, "");
    }

    #[test]
    fn test_parse_fenced_json_after_preamble() {
        let raw = "Here is your copy:\n```json\n{\"headline\": \"Autumn is here\", \"body\": \"Cozy knits.\", \"cta\": \"Shop now\"}\n```";
        let parsed = parse_candidate_or_fallback(raw, &ParseDefaults::default()).unwrap();

        assert!(!parsed.used_fallback);
        assert_eq!(parsed.candidate.headline, "Autumn is here");
        assert_eq!(parsed.candidate.body, "Cozy knits.");
    }

    #[test]
    fn test_parse_json_with_sign_off() {
        let raw = "{\"headline\": \"Autumn is here\", \"body\": \"Cozy knits.\"}\nHope this helps!";
        let candidate = parse_candidate(raw).unwrap();

        assert_eq!(candidate.headline, "Autumn is here");
        assert!(!candidate.body.contains('{'));
    }

    #[test]
    fn test_braces_in_prose_are_not_json() {
        let raw = "Big {news} today\nOur store opens at noon.";
        let parsed = parse_candidate_or_fallback(raw, &ParseDefaults::default()).unwrap();
        assert!(parsed.used_fallback);
        assert_eq!(parsed.candidate.headline, "Big {news} today");
    }

    #[test]
    fn test_parse_labelled_sections() {
        let raw = "HEADLINE: Winter is coming\nBODY: Stay warm with our new parkas.\nThey ship tomorrow.\n**CTA:** Shop the range\nHASHTAGS: #winter, #parka";
        let candidate = parse_candidate(raw).unwrap();
        assert_eq!(candidate.headline, "Winter is coming");
        assert_eq!(candidate.body, "Stay warm with our new parkas.\nThey ship tomorrow.");
        assert_eq!(candidate.cta, "Shop the range");
        assert_eq!(candidate.hashtags, vec!["#winter", "#parka"]);
    }

    #[test]
    fn test_missing_body_is_error() {
        let raw = "HEADLINE: Only a headline";
        assert_eq!(parse_candidate(raw), Err(ParseError::MissingField("body")));
    }

    #[test]
    fn test_unstructured_text_is_error() {
        assert_eq!(
            parse_candidate("Just some prose without labels."),
            Err(ParseError::Unstructured)
        );
        assert_eq!(parse_candidate("   \n "), Err(ParseError::Empty));
    }

    #[test]
    fn test_fallback_first_line_headline() {
        let raw = "# Big news\nWe are opening a second store.\nCome visit!\n#grandopening #local";
        let parsed = parse_candidate_or_fallback(raw, &ParseDefaults::default()).unwrap();

        assert!(parsed.used_fallback);
        assert_eq!(parsed.candidate.headline, "Big news");
        assert_eq!(parsed.candidate.body, "We are opening a second store.\nCome visit!");
        assert_eq!(parsed.candidate.cta, "Learn more");
        assert_eq!(parsed.candidate.hashtags, vec!["#grandopening", "#local"]);
    }

    #[test]
    fn test_fallback_without_cta() {
        let defaults = ParseDefaults {
            include_cta: false,
            default_cta: "Learn more".to_string(),
        };
        let parsed = parse_candidate_or_fallback("Line one\nLine two", &defaults).unwrap();
        assert_eq!(parsed.candidate.cta, "");
    }

    #[test]
    fn test_fallback_is_deterministic() {
        let raw = "Headline here\nbody text #tag";
        let a = parse_candidate_or_fallback(raw, &ParseDefaults::default()).unwrap();
        let b = parse_candidate_or_fallback(raw, &ParseDefaults::default()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_fallback_rejects_empty() {
        assert_eq!(
            parse_candidate_or_fallback("", &ParseDefaults::default()),
            Err(ParseError::Empty)
        );
    }

    #[test]
    fn test_fallback_rejects_hashtags_only() {
        assert_eq!(
            parse_candidate_or_fallback("#launch #spring\n#sale", &ParseDefaults::default()),
            Err(ParseError::Empty)
        );
    }

    #[test]
    fn test_structured_parse_not_marked_fallback() {
        let parsed =
            parse_candidate_or_fallback("HEADLINE: A\nBODY: B", &ParseDefaults::default()).unwrap();
        assert!(!parsed.used_fallback);
    }

    #[test]
    fn test_default_cta_follows_cta_type() {
        let input = ContentInput {
            topic: "Beta".to_string(),
            platform: crate::types::Platform::Email,
            tone: "warm".to_string(),
            format: "newsletter".to_string(),
            max_length: None,
            include_cta: true,
            cta_type: Some("signup".to_string()),
        };
        assert_eq!(ParseDefaults::from_input(&input).default_cta, "Sign up today");
    }
}
