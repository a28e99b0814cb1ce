//! Sample value synthesis from type contracts
//!
//! Produces placeholder values for preview props. Anything that cannot be
//! resolved yields `None` and is left out by the caller; a missing prop is
//! preferred over a fabricated one of the wrong shape.

use crate::type_resolver::{parse_fields, split_top_level, FieldDescriptor, TypeResolver};
use crate::types::MAX_SYNTHESIS_DEPTH;
use serde_json::{Map, Value};

pub const PLACEHOLDER_TEXT: &str = "Sample text";
const MAX_ALIAS_HOPS: usize = 8;

pub struct SampleSynthesizer {
    placeholder: String,
    timestamp: String,
    max_depth: usize,
}

impl SampleSynthesizer {
    pub fn new() -> Self {
        Self {
            placeholder: PLACEHOLDER_TEXT.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            max_depth: MAX_SYNTHESIS_DEPTH,
        }
    }

    /// Fix the value used for `Date` fields
    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = timestamp.into();
        self
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    /// Sample value for `type_text`, or `None` when it cannot be resolved.
    /// Named shapes nest at most `MAX_SYNTHESIS_DEPTH` levels below `depth`.
    pub fn synthesize(
        &self,
        type_text: &str,
        resolver: &dyn TypeResolver,
        depth: usize,
    ) -> Option<Value> {
        self.synthesize_inner(type_text, resolver, depth, 0)
    }

    /// Sample props for every resolvable field of a named contract
    pub fn synthesize_props(&self, contract: &str, resolver: &dyn TypeResolver) -> Map<String, Value> {
        match self.synthesize(contract, resolver, 0) {
            Some(Value::Object(props)) => props,
            _ => Map::new(),
        }
    }

    fn synthesize_inner(
        &self,
        type_text: &str,
        resolver: &dyn TypeResolver,
        depth: usize,
        alias_hops: usize,
    ) -> Option<Value> {
        if depth > self.max_depth {
            return None;
        }
        let text = normalize(type_text);
        if text.is_empty() {
            return None;
        }

        let members = split_top_level(text, &['|']);
        if members.len() > 1 {
            return members
                .iter()
                .map(|m| m.trim())
                .filter(|m| !matches!(*m, "null" | "undefined" | "void" | ""))
                .find_map(|m| self.synthesize_inner(m, resolver, depth, alias_hops));
        }

        if let Some(element) = text.strip_suffix("[]") {
            return self
                .synthesize_inner(element, resolver, depth, alias_hops)
                .map(|value| Value::Array(vec![value]));
        }
        if let Some(element) = generic_argument(text, &["Array", "ReadonlyArray"]) {
            return self
                .synthesize_inner(element, resolver, depth, alias_hops)
                .map(|value| Value::Array(vec![value]));
        }

        if let Some(literal) = string_literal(text) {
            return Some(Value::String(literal.to_string()));
        }
        if let Ok(number) = text.parse::<i64>() {
            return Some(Value::from(number));
        }
        if let Ok(number) = text.parse::<f64>() {
            return serde_json::Number::from_f64(number).map(Value::Number);
        }

        match text {
            "string" | "ReactNode" | "React.ReactNode" => {
                return Some(Value::String(self.placeholder.clone()))
            }
            "number" | "bigint" => return Some(Value::from(1)),
            "boolean" | "true" => return Some(Value::Bool(true)),
            "false" => return Some(Value::Bool(false)),
            "Date" => return Some(Value::String(self.timestamp.clone())),
            "object" => return Some(Value::Object(Map::new())),
            _ => {}
        }
        if text.starts_with("Record<") {
            return Some(Value::Object(Map::new()));
        }

        if text.starts_with('{') && text.ends_with('}') {
            let fields = parse_fields(&text[1..text.len() - 1]);
            return Some(self.object(&fields, resolver, depth, alias_hops));
        }

        let name = text.split('<').next().unwrap_or(text).trim();
        if let Some(fields) = resolver.fields(name) {
            return Some(self.object(&fields, resolver, depth, alias_hops));
        }
        if alias_hops < MAX_ALIAS_HOPS {
            if let Some(target) = resolver.alias(name) {
                return self.synthesize_inner(&target, resolver, depth, alias_hops + 1);
            }
        }

        log::trace!("Skipping unresolvable type '{}'", text);
        None
    }

    fn object(
        &self,
        fields: &[FieldDescriptor],
        resolver: &dyn TypeResolver,
        depth: usize,
        alias_hops: usize,
    ) -> Value {
        let mut object = Map::new();
        for field in fields {
            if let Some(value) =
                self.synthesize_inner(&field.type_text, resolver, depth + 1, alias_hops)
            {
                object.insert(field.name.clone(), value);
            }
        }
        Value::Object(object)
    }
}

impl Default for SampleSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize(type_text: &str) -> &str {
    let mut text = type_text.trim();
    text = text.strip_prefix("readonly ").unwrap_or(text).trim();
    while text.starts_with('(') && text.ends_with(')') && wraps_whole(text) {
        text = text[1..text.len() - 1].trim();
    }
    text
}

/// True if the opening paren at 0 closes at the very end
fn wraps_whole(text: &str) -> bool {
    let mut depth = 0i32;
    for (i, ch) in text.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return i == text.len() - 1;
                }
            }
            _ => {}
        }
    }
    false
}

fn generic_argument<'a>(text: &'a str, wrappers: &[&str]) -> Option<&'a str> {
    wrappers.iter().find_map(|wrapper| {
        text.strip_prefix(wrapper)?
            .strip_prefix('<')?
            .strip_suffix('>')
            .map(str::trim)
    })
}

fn string_literal(text: &str) -> Option<&str> {
    for quote in ['\'', '"', '`'] {
        if text.len() >= 2 && text.starts_with(quote) && text.ends_with(quote) {
            return Some(&text[1..text.len() - 1]);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::type_resolver::TextScanResolver;
    use serde_json::json;

    fn synth() -> SampleSynthesizer {
        SampleSynthesizer::new().with_timestamp("2024-01-01T00:00:00Z")
    }

    fn nesting(value: &Value) -> usize {
        match value {
            Value::Object(map) => 1 + map.values().map(nesting).max().unwrap_or(0),
            Value::Array(items) => items.iter().map(nesting).max().unwrap_or(0),
            _ => 0,
        }
    }

    #[test]
    fn test_primitives() {
        let resolver = TextScanResolver::new();
        let s = synth();
        assert_eq!(s.synthesize("string", &resolver, 0), Some(json!("Sample text")));
        assert_eq!(s.synthesize("number", &resolver, 0), Some(json!(1)));
        assert_eq!(s.synthesize("boolean", &resolver, 0), Some(json!(true)));
        assert_eq!(s.synthesize("Date", &resolver, 0), Some(json!("2024-01-01T00:00:00Z")));
        assert_eq!(s.synthesize("'primary' | 'secondary'", &resolver, 0), Some(json!("primary")));
        assert_eq!(s.synthesize("string | null", &resolver, 0), Some(json!("Sample text")));
        assert_eq!(s.synthesize("42", &resolver, 0), Some(json!(42)));
    }

    #[test]
    fn test_arrays() {
        let resolver = TextScanResolver::scan("interface Tag { label: string }");
        let s = synth();
        assert_eq!(s.synthesize("string[]", &resolver, 0), Some(json!(["Sample text"])));
        assert_eq!(
            s.synthesize("Array<Tag>", &resolver, 0),
            Some(json!([{ "label": "Sample text" }]))
        );
        assert_eq!(s.synthesize("(string | number)[]", &resolver, 0), Some(json!(["Sample text"])));
        assert_eq!(s.synthesize("Missing[]", &resolver, 0), None);
    }

    #[test]
    fn test_named_shapes_omit_unresolvable_fields() {
        let resolver = TextScanResolver::scan(
            "interface User { name: string; avatar: Blob; onClick: () => void; joined: Date }",
        );
        let value = synth().synthesize("User", &resolver, 0).unwrap();
        assert_eq!(
            value,
            json!({ "name": "Sample text", "joined": "2024-01-01T00:00:00Z" })
        );
        assert!(value.get("avatar").is_none());
        assert!(value.get("onClick").is_none());
    }

    #[test]
    fn test_unknown_type_is_none() {
        let resolver = TextScanResolver::new();
        assert_eq!(synth().synthesize("Mystery", &resolver, 0), None);
        assert_eq!(synth().synthesize("(a: string) => void", &resolver, 0), None);
    }

    #[test]
    fn test_self_reference_is_bounded() {
        let resolver =
            TextScanResolver::scan("interface TreeNode { label: string; child: TreeNode; children: TreeNode[] }");
        let value = synth().synthesize("TreeNode", &resolver, 0).unwrap();
        assert_eq!(nesting(&value), 3);
        assert_eq!(value["child"]["label"], json!("Sample text"));
        // third level is past the bound, so its fields are all skipped
        assert_eq!(value["child"]["child"], json!({}));
    }

    #[test]
    fn test_depth_past_limit_is_none() {
        let resolver = TextScanResolver::new();
        assert_eq!(synth().synthesize("string", &resolver, 3), None);
    }

    #[test]
    fn test_aliases_and_inline_shapes() {
        let resolver = TextScanResolver::scan(
            "type Size = 'sm' | 'lg';\ntype Loop = Loop;\ninterface Props { size: Size; style: { color: string }; meta: Record<string, string>; loop: Loop }",
        );
        let props = synth().synthesize_props("Props", &resolver);
        assert_eq!(props["size"], json!("sm"));
        assert_eq!(props["style"], json!({ "color": "Sample text" }));
        assert_eq!(props["meta"], json!({}));
        assert!(!props.contains_key("loop"));
    }
}
