//! Lightweight type-contract resolution
//!
//! [`TextScanResolver`] reads `interface X { ... }` and `type X = ...`
//! declarations out of source text without a real parser. It is a heuristic;
//! anything it cannot read is simply absent, and callers treat absence as
//! "unresolvable". A stricter resolver can be swapped in through the
//! [`TypeResolver`] trait.

use indexmap::IndexMap;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

const MAX_EXTENDS_DEPTH: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
    pub type_text: String,
    pub optional: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShapeDescriptor {
    pub fields: Vec<FieldDescriptor>,
    pub extends: Vec<String>,
}

pub trait TypeResolver {
    /// Fields of a named object shape, inherited fields first
    fn fields(&self, name: &str) -> Option<Vec<FieldDescriptor>>;

    /// Right-hand side of a non-object type alias
    fn alias(&self, _name: &str) -> Option<String> {
        None
    }
}

fn declaration_regex() -> &'static Regex {
    static DECL: OnceLock<Regex> = OnceLock::new();
    DECL.get_or_init(|| Regex::new(r"\b(interface|type)\s+([A-Za-z_$][\w$]*)").unwrap())
}

fn comment_regex() -> &'static Regex {
    static COMMENT: OnceLock<Regex> = OnceLock::new();
    COMMENT.get_or_init(|| Regex::new(r"(?s)/\*.*?\*/|//[^\n]*").unwrap())
}

#[derive(Debug, Clone, Default)]
pub struct TextScanResolver {
    shapes: IndexMap<String, ShapeDescriptor>,
    aliases: IndexMap<String, String>,
}

impl TextScanResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scan(source: &str) -> Self {
        let mut resolver = Self::new();
        resolver.add_source(source);
        resolver
    }

    /// Add every declaration found in `source`. Later declarations of the
    /// same name replace earlier ones.
    pub fn add_source(&mut self, source: &str) {
        let cleaned = comment_regex().replace_all(source, "");
        let text = cleaned.as_ref();

        for captures in declaration_regex().captures_iter(text) {
            let (Some(keyword), Some(name), Some(whole)) =
                (captures.get(1), captures.get(2), captures.get(0))
            else {
                continue;
            };
            let rest = &text[whole.end()..];
            match keyword.as_str() {
                "interface" => {
                    if let Some(shape) = parse_interface(rest) {
                        self.shapes.insert(name.as_str().to_string(), shape);
                    }
                }
                _ => match parse_type_alias(rest) {
                    Some(AliasBody::Shape(shape)) => {
                        self.shapes.insert(name.as_str().to_string(), shape);
                    }
                    Some(AliasBody::Alias(target)) => {
                        self.aliases.insert(name.as_str().to_string(), target);
                    }
                    None => {}
                },
            }
        }
    }

    pub fn shapes(&self) -> &IndexMap<String, ShapeDescriptor> {
        &self.shapes
    }

    pub fn contains(&self, name: &str) -> bool {
        self.shapes.contains_key(name)
    }

    /// The props contract for a unit: `<Name>Props` if declared, otherwise
    /// the only `*Props` shape in the table
    pub fn props_contract(&self, unit_name: &str) -> Option<String> {
        let preferred = format!("{}Props", unit_name);
        if self.shapes.contains_key(&preferred) {
            return Some(preferred);
        }
        let mut candidates = self.shapes.keys().filter(|name| name.ends_with("Props"));
        match (candidates.next(), candidates.next()) {
            (Some(only), None) => Some(only.clone()),
            _ => None,
        }
    }

    fn collect_fields(
        &self,
        name: &str,
        depth: usize,
        visited: &mut HashSet<String>,
        out: &mut IndexMap<String, FieldDescriptor>,
    ) -> bool {
        let Some(shape) = self.shapes.get(name) else {
            return false;
        };
        if depth > MAX_EXTENDS_DEPTH || !visited.insert(name.to_string()) {
            return true;
        }
        for base in &shape.extends {
            self.collect_fields(base, depth + 1, visited, out);
        }
        for field in &shape.fields {
            out.insert(field.name.clone(), field.clone());
        }
        true
    }
}

impl TypeResolver for TextScanResolver {
    fn fields(&self, name: &str) -> Option<Vec<FieldDescriptor>> {
        let mut out = IndexMap::new();
        let mut visited = HashSet::new();
        if self.collect_fields(name, 0, &mut visited, &mut out) {
            Some(out.into_values().collect())
        } else {
            None
        }
    }

    fn alias(&self, name: &str) -> Option<String> {
        self.aliases.get(name).cloned()
    }
}

/// A plain resolution table of shape name to fields
impl TypeResolver for IndexMap<String, Vec<FieldDescriptor>> {
    fn fields(&self, name: &str) -> Option<Vec<FieldDescriptor>> {
        self.get(name).cloned()
    }
}

enum AliasBody {
    Shape(ShapeDescriptor),
    Alias(String),
}

fn parse_interface(rest: &str) -> Option<ShapeDescriptor> {
    let rest = skip_generics(rest.trim_start());
    let open = rest.find('{')?;
    let header = rest[..open].trim();
    let extends = header
        .strip_prefix("extends")
        .map(|list| {
            split_top_level(list, &[','])
                .into_iter()
                .map(|base| strip_generics(base.trim()).to_string())
                .filter(|base| !base.is_empty())
                .collect()
        })
        .unwrap_or_default();
    if !extends_is_plausible(header) {
        return None;
    }
    let body = balanced_body(&rest[open..])?;
    Some(ShapeDescriptor {
        fields: parse_fields(body),
        extends,
    })
}

fn extends_is_plausible(header: &str) -> bool {
    header.is_empty() || header.starts_with("extends")
}

fn parse_type_alias(rest: &str) -> Option<AliasBody> {
    let rest = skip_generics(rest.trim_start()).trim_start();
    let rest = rest.strip_prefix('=')?.trim_start();
    if rest.starts_with('{') {
        let body = balanced_body(rest)?;
        return Some(AliasBody::Shape(ShapeDescriptor {
            fields: parse_fields(body),
            extends: Vec::new(),
        }));
    }

    let mut target = String::new();
    for segment in split_top_level(rest, &[';', '\n']) {
        let trimmed = segment.trim();
        if trimmed.is_empty() {
            if target.is_empty() {
                continue;
            }
            break;
        }
        if !target.is_empty() && !trimmed.starts_with('|') && !trimmed.starts_with('&') {
            break;
        }
        if !target.is_empty() {
            target.push(' ');
        }
        target.push_str(trimmed);
    }
    let target = target.trim_start_matches('|').trim().to_string();
    if target.is_empty() {
        None
    } else {
        Some(AliasBody::Alias(target))
    }
}

fn skip_generics(text: &str) -> &str {
    if !text.starts_with('<') {
        return text;
    }
    let mut depth = 0usize;
    for (i, ch) in text.char_indices() {
        match ch {
            '<' => depth += 1,
            '>' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return &text[i + 1..];
                }
            }
            _ => {}
        }
    }
    text
}

fn strip_generics(text: &str) -> &str {
    text.split('<').next().unwrap_or(text).trim()
}

/// Text between a leading `{` and its matching `}`
fn balanced_body(text: &str) -> Option<&str> {
    let mut depth = 0usize;
    for (i, ch) in text.char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&text[1..i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split on any of `separators` outside brackets, braces, parens, angle
/// brackets and string literals
pub(crate) fn split_top_level<'a>(text: &'a str, separators: &[char]) -> Vec<&'a str> {
    let mut parts = Vec::new();
    let mut depth: i32 = 0;
    let mut quote: Option<char> = None;
    let mut start = 0;
    let mut prev = '\0';

    for (i, ch) in text.char_indices() {
        if let Some(q) = quote {
            if ch == q && prev != '\\' {
                quote = None;
            }
        } else {
            match ch {
                '\'' | '"' | '`' => quote = Some(ch),
                '{' | '(' | '[' | '<' => depth += 1,
                // `=>` is an arrow, not a closing angle bracket
                '>' if prev == '=' => {}
                '}' | ')' | ']' | '>' => depth -= 1,
                c if depth <= 0 && separators.contains(&c) => {
                    parts.push(&text[start..i]);
                    start = i + c.len_utf8();
                }
                _ => {}
            }
        }
        prev = ch;
    }
    parts.push(&text[start..]);
    parts
}

pub(crate) fn parse_fields(body: &str) -> Vec<FieldDescriptor> {
    let mut segments: Vec<String> = Vec::new();
    for raw in split_top_level(body, &[';', ',', '\n']) {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            continue;
        }
        match segments.last_mut() {
            Some(last) if trimmed.starts_with('|') || trimmed.starts_with('&') => {
                last.push(' ');
                last.push_str(trimmed);
            }
            _ => segments.push(trimmed.to_string()),
        }
    }

    segments.iter().filter_map(|s| parse_field(s)).collect()
}

fn parse_field(segment: &str) -> Option<FieldDescriptor> {
    if segment.starts_with('[') {
        return None;
    }
    let colon = split_top_level(segment, &[':']).first()?.len();
    if colon >= segment.len() {
        return None;
    }
    let raw_name = segment[..colon].trim();
    let raw_name = raw_name.strip_prefix("readonly ").unwrap_or(raw_name).trim();
    if raw_name.contains('(') {
        return None;
    }
    let optional = raw_name.ends_with('?');
    let name = raw_name
        .trim_end_matches('?')
        .trim_matches(|c| c == '\'' || c == '"')
        .to_string();
    let type_text = segment[colon + 1..].trim().to_string();
    if name.is_empty() || type_text.is_empty() {
        return None;
    }
    Some(FieldDescriptor {
        name,
        type_text,
        optional,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = r#"
import React from 'react';

// legacy shape
export interface Address {
  street: string;
  city: string
}

/* the props
   contract */
export interface ProfileCardProps extends BaseProps {
  name: string;
  age?: number;
  address: Address;
  tags: string[];
  onSelect: (id: string) => void;
  style: { color: string; size: number };
  variant: Variant;
  'data-id'?: string;
  [key: string]: unknown;
}

interface BaseProps {
  id: string;
}

type Variant =
  | 'primary'
  | 'secondary';

type Point = { x: number, y: number };
"#;

    #[test]
    fn test_scans_interfaces_and_aliases() {
        let resolver = TextScanResolver::scan(SOURCE);
        assert!(resolver.contains("Address"));
        assert!(resolver.contains("ProfileCardProps"));
        assert!(resolver.contains("Point"));
        assert_eq!(
            resolver.alias("Variant").as_deref(),
            Some("'primary' | 'secondary'")
        );
    }

    #[test]
    fn test_field_parsing() {
        let resolver = TextScanResolver::scan(SOURCE);
        let fields = resolver.fields("ProfileCardProps").unwrap();
        let names: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["id", "name", "age", "address", "tags", "onSelect", "style", "variant", "data-id"]
        );

        let age = fields.iter().find(|f| f.name == "age").unwrap();
        assert!(age.optional);
        assert_eq!(age.type_text, "number");

        let on_select = fields.iter().find(|f| f.name == "onSelect").unwrap();
        assert_eq!(on_select.type_text, "(id: string) => void");

        let style = fields.iter().find(|f| f.name == "style").unwrap();
        assert_eq!(style.type_text, "{ color: string; size: number }");
    }

    #[test]
    fn test_props_contract_lookup() {
        let resolver = TextScanResolver::scan(SOURCE);
        assert_eq!(
            resolver.props_contract("ProfileCard").as_deref(),
            Some("ProfileCardProps")
        );
        // BaseProps and ProfileCardProps both qualify, so no guess is made
        assert_eq!(resolver.props_contract("Other"), None);
    }

    #[test]
    fn test_unknown_name_is_absent() {
        let resolver = TextScanResolver::scan(SOURCE);
        assert!(resolver.fields("Missing").is_none());
    }

    #[test]
    fn test_cyclic_extends_terminates() {
        let resolver = TextScanResolver::scan(
            "interface A extends B { a: string }\ninterface B extends A { b: number }",
        );
        let fields = resolver.fields("A").unwrap();
        assert_eq!(fields.len(), 2);
    }

    #[test]
    fn test_plain_table_resolver() {
        let mut table: IndexMap<String, Vec<FieldDescriptor>> = IndexMap::new();
        table.insert(
            "User".to_string(),
            vec![FieldDescriptor {
                name: "name".to_string(),
                type_text: "string".to_string(),
                optional: false,
            }],
        );
        assert_eq!(table.fields("User").unwrap().len(), 1);
        assert!(table.alias("User").is_none());
    }
}
