//! Deterministic action and route classifier
//!
//! Derives server actions, client actions and routes for a unit by keyword
//! matching over its name, description and tags. Nothing here calls a backend.

use crate::types::ComponentKind;

const ROUTE_SUFFIXES: &[&str] = &["Page", "View", "Screen"];
const ENTITY_SUFFIXES: &[&str] = &[
    "Form", "Page", "View", "Screen", "List", "Table", "Grid", "Modal", "Dialog", "Card",
];
const INDEX_ROUTE_NAMES: &[&str] = &["home", "index", "landing", "main"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub server_actions: Vec<String>,
    pub client_actions: Vec<String>,
    pub routes: Vec<String>,
}

impl Classification {
    fn server(&mut self, action: String) {
        push_unique(&mut self.server_actions, action);
    }

    fn client(&mut self, action: &str) {
        push_unique(&mut self.client_actions, action.to_string());
    }
}

fn push_unique(list: &mut Vec<String>, value: String) {
    if !list.contains(&value) {
        list.push(value);
    }
}

pub fn classify(
    name: &str,
    description: &str,
    kind: Option<ComponentKind>,
    tags: &[String],
) -> Classification {
    let haystack = format!("{} {} {}", name, description, tags.join(" ")).to_lowercase();
    let has = |words: &[&str]| words.iter().any(|w| haystack.contains(w));
    let entity = entity_name(name);
    let mut result = Classification::default();

    let is_auth = has(&["login", "signin", "sign in", "auth"]);
    let is_register = has(&["register", "signup", "sign up"]);

    if is_auth {
        result.server("login".to_string());
        result.server("logout".to_string());
        result.server("getSession".to_string());
        result.client("handleLogin");
    }
    if is_register {
        result.server("register".to_string());
        result.client("handleRegister");
    }

    // auth forms are already covered by the auth vocabulary
    if (kind == Some(ComponentKind::Form) || has(&["form"])) && !is_auth && !is_register {
        result.server(format!("create{}", entity));
        result.server(format!("update{}", entity));
        result.server(format!("delete{}", entity));
    }
    if kind == Some(ComponentKind::Form) || has(&["form"]) {
        result.client("handleSubmit");
        result.client("validateForm");
        result.client("resetForm");
    }

    if has(&["search", "filter"]) {
        result.server(format!("search{}", entity));
        result.client("handleSearch");
    }

    if kind == Some(ComponentKind::Data) || has(&["list", "table", "grid"]) {
        result.server(format!("list{}", entity));
    }

    match kind {
        Some(ComponentKind::Navigation) => result.client("navigate"),
        Some(ComponentKind::Overlay) => {
            result.client("open");
            result.client("close");
        }
        _ => {}
    }

    if let Some(route) = route_for(name) {
        push_unique(&mut result.routes, route);
    }

    result
}

/// Route path for page-like units: strip a Page/View/Screen suffix and kebab-case the rest
pub fn route_for(name: &str) -> Option<String> {
    let stem = ROUTE_SUFFIXES
        .iter()
        .find_map(|suffix| name.strip_suffix(suffix))?;
    let slug = to_kebab_case(stem);
    if slug.is_empty() || INDEX_ROUTE_NAMES.contains(&slug.as_str()) {
        Some("/".to_string())
    } else {
        Some(format!("/{}", slug))
    }
}

/// Entity a unit operates on, e.g. `ContactForm` -> `Contact`
pub fn entity_name(name: &str) -> String {
    let base = name.rsplit('.').next().unwrap_or(name);
    let stem = ENTITY_SUFFIXES
        .iter()
        .find_map(|suffix| base.strip_suffix(suffix).filter(|s| !s.is_empty()))
        .unwrap_or(base);
    stem.chars().filter(|c| c.is_alphanumeric()).collect()
}

pub fn to_kebab_case(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 4);
    let chars: Vec<char> = input.chars().collect();
    for (i, &ch) in chars.iter().enumerate() {
        if ch.is_alphanumeric() {
            if ch.is_uppercase() && i > 0 {
                let prev = chars[i - 1];
                let next_lower = chars.get(i + 1).map_or(false, |c| c.is_lowercase());
                if prev.is_lowercase()
                    || prev.is_ascii_digit()
                    || (prev.is_uppercase() && next_lower)
                {
                    if !out.ends_with('-') {
                        out.push('-');
                    }
                }
            }
            out.extend(ch.to_lowercase());
        } else if !out.is_empty() && !out.ends_with('-') {
            out.push('-');
        }
    }
    out.trim_end_matches('-').to_string()
}
