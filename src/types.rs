//! Core types and constants for the uigen generator

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

// Retry defaults
pub const DEFAULT_MAX_ATTEMPTS: u32 = 4;
pub const DEFAULT_BASE_DELAY_MS: u64 = 2000;
pub const DEFAULT_MAX_JITTER_MS: u64 = 1000;
pub const DEFAULT_TIMEOUT_MS: u64 = 120_000;

// Synthesis
pub const MAX_SYNTHESIS_DEPTH: usize = 2;

// Output layout
pub const DEFAULT_FILE_EXTENSION: &str = "tsx";
pub const REGISTRY_FILE: &str = "registry.tsx";
pub const PREVIEW_PROPS_FILE: &str = "preview-props.ts";
pub const PREVIEW_CANVAS_FILE: &str = "preview-canvas.tsx";
pub const RESERVED_PAGE_STEM: &str = "page";
pub const RESERVED_INDEX_STEM: &str = "index";
pub const SHARED_GROUP_DIR: &str = "shared";
pub const READY_MARKER: &str = ".uigen/ready";

/// Closed set of design unit categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    Layout,
    Form,
    Navigation,
    Feedback,
    Data,
    Overlay,
    Media,
    Other,
}

impl ComponentKind {
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "layout" => Self::Layout,
            "form" => Self::Form,
            "navigation" | "nav" => Self::Navigation,
            "feedback" => Self::Feedback,
            "data" | "display" => Self::Data,
            "overlay" | "modal" => Self::Overlay,
            "media" => Self::Media,
            _ => Self::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Layout => "layout",
            Self::Form => "form",
            Self::Navigation => "navigation",
            Self::Feedback => "feedback",
            Self::Data => "data",
            Self::Overlay => "overlay",
            Self::Media => "media",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit in the design tree.
///
/// The root is a synthetic container at level 0 and is never emitted as a
/// build unit. Children keep their insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentNode {
    pub name: String,
    pub description: String,
    pub kind: Option<ComponentKind>,
    pub tags: Vec<String>,
    pub level: usize,
    pub children: IndexMap<String, ComponentNode>,
    /// Filled in by the architecture planner
    pub derived_actions: Vec<String>,
    pub derived_routes: Vec<String>,
}

impl ComponentNode {
    pub fn new(name: impl Into<String>, level: usize) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            kind: None,
            tags: Vec::new(),
            level,
            children: IndexMap::new(),
            derived_actions: Vec::new(),
            derived_routes: Vec::new(),
        }
    }

    pub fn root(name: impl Into<String>) -> Self {
        Self::new(name, 0)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_kind(mut self, kind: ComponentKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Attach a child, fixing its level (and its subtree's) relative to this node.
    /// A child with the same name replaces the previous one in place.
    pub fn add_child(&mut self, mut child: ComponentNode) -> &mut ComponentNode {
        child.relevel(self.level + 1);
        let (index, _) = self.children.insert_full(child.name.clone(), child);
        &mut self.children[index]
    }

    fn relevel(&mut self, level: usize) {
        self.level = level;
        for child in self.children.values_mut() {
            child.relevel(level + 1);
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Number of nodes below this one
    pub fn descendant_count(&self) -> usize {
        self.children
            .values()
            .map(|child| 1 + child.descendant_count())
            .sum()
    }
}

/// Component record inside a legacy flat group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyComponent {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Fields the compiler does not interpret are carried through untouched
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A named group of leaf units
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentGroup {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub components: Vec<LegacyComponent>,
}

/// One planned build unit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationQueueItem {
    pub name: String,
    pub description: String,
    pub kind: Option<ComponentKind>,
    pub level: usize,
    /// First-level ancestor, `None` for first-level nodes themselves
    pub group: Option<String>,
    /// Dot-joined path from the first-level ancestor (exclusive) to this node
    pub path: String,
    /// Node has children of its own
    pub is_container: bool,
    pub server_actions: Vec<String>,
    pub routes: Vec<String>,
    pub client_actions: Vec<String>,
    pub self_documentation: String,
}

impl GenerationQueueItem {
    /// Group used for output placement and error reporting
    pub fn group_name(&self) -> &str {
        self.group.as_deref().unwrap_or(&self.name)
    }
}

/// Content returned by a generation backend
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GeneratedContent {
    pub content: String,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl GeneratedContent {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: serde_json::Map::new(),
        }
    }
}

/// Extra information handed to a backend alongside the unit being generated
#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerationContext {
    pub project: String,
    pub group_description: Option<String>,
    /// Units already produced earlier in the same pass
    pub existing_units: Vec<String>,
}
