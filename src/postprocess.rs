//! Post-processing of generated content before it is persisted

use crate::types::GenerationQueueItem;
use regex::Regex;
use std::sync::OnceLock;

fn fence_regex() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| Regex::new(r"(?s)^\s*```[A-Za-z0-9_+-]*[^\n]*\n(.*?)\n?```\s*$").unwrap())
}

/// Turn a unit name or dotted path into a valid PascalCase identifier,
/// e.g. `Card.Header` -> `CardHeader`, `user-menu` -> `UserMenu`
pub fn sanitize_identifier(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = true;
    for ch in name.chars() {
        if ch.is_alphanumeric() || ch == '_' {
            if upper_next {
                out.extend(ch.to_uppercase());
            } else {
                out.push(ch);
            }
            upper_next = false;
        } else {
            upper_next = true;
        }
    }
    if out.chars().next().map_or(true, |c| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

/// Strip a markdown code fence wrapping the whole response
pub fn strip_code_fences(content: &str) -> String {
    match fence_regex().captures(content) {
        Some(captures) => captures
            .get(1)
            .map_or(String::new(), |m| m.as_str().to_string()),
        None => content.trim().to_string(),
    }
}

/// Final text for a unit: fences removed, dotted names replaced by the
/// sanitized identifier, self-documentation prepended
pub fn finalize_content(item: &GenerationQueueItem, raw: &str) -> String {
    let mut body = strip_code_fences(raw);
    let identifier = sanitize_identifier(&item.path);
    if item.path.contains('.') {
        body = body.replace(&item.path, &identifier);
    }
    if item.name != identifier && !is_valid_identifier(&item.name) {
        body = body.replace(&item.name, &identifier);
    }

    let mut result = String::with_capacity(item.self_documentation.len() + body.len() + 1);
    result.push_str(&item.self_documentation);
    result.push_str(body.trim_end());
    result.push('\n');
    result
}

pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}
