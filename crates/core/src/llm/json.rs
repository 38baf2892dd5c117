use crate::domain::contract::parse_intent_value;
use anyhow::Context;
use serde_json::Value;

/// Pull a JSON object out of free-form model output.
///
/// Handles Markdown fences anywhere in the text (with or without a language
/// tag), then falls back to the span from the first `{` to the last `}`.
pub fn extract_json(text: &str) -> Option<String> {
    let trimmed = text.trim();

    if let Some(open) = trimmed.find("```") {
        let after = &trimmed[open + 3..];
        // Skip the language tag line (```json).
        let body = match after.find('\n') {
            Some(nl) if !after[..nl].trim_start().starts_with('{') => &after[nl + 1..],
            _ => after,
        };
        let body = match body.find("```") {
            Some(close) => &body[..close],
            None => body,
        };
        let body = body.trim();
        if !body.is_empty() {
            return Some(body.to_string());
        }
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(trimmed[start..=end].trim().to_string())
}

/// Decode model text into an intent descriptor and check it validates.
///
/// Returns the raw descriptor; the simulation engine validates it again on use.
pub fn parse_intent_text(text: &str) -> anyhow::Result<Value> {
    let json_str = extract_json(text).unwrap_or_else(|| text.trim().to_string());
    let value = serde_json::from_str::<Value>(&json_str)
        .with_context(|| format!("LLM output is not valid JSON: {json_str}"))?;
    parse_intent_value(&value)
        .with_context(|| format!("LLM output does not match the intent schema: {json_str}"))?;
    Ok(value)
}
