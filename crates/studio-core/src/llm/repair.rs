const FENCE: &str = "```";
const EMPTY_OBJECT: &str = "{}";

/// Cleans raw model text into a candidate JSON object literal.
///
/// Surrounding code fences (with an optional language tag) are removed, then the text is
/// sliced from the first `{` to the last `}`. Missing text or a missing brace pair yields
/// `{}` so that schema validation reports the absent fields.
pub fn repair_payload(raw: Option<&str>) -> String {
    let Some(raw) = raw else {
        return EMPTY_OBJECT.to_string();
    };

    let unfenced = strip_code_fences(raw);
    match (unfenced.find('{'), unfenced.rfind('}')) {
        (Some(start), Some(end)) if start < end => unfenced[start..=end].to_string(),
        _ => EMPTY_OBJECT.to_string(),
    }
}

fn strip_code_fences(raw: &str) -> &str {
    let mut text = raw.trim();

    if let Some(rest) = text.strip_prefix(FENCE) {
        // Opening fence may carry a language tag such as `json`.
        let tag_len = rest
            .find(|ch: char| !ch.is_ascii_alphanumeric())
            .unwrap_or(rest.len());
        text = rest[tag_len..].trim_start();
    }

    if let Some(rest) = text.strip_suffix(FENCE) {
        text = rest.trim_end();
    }

    text
}
