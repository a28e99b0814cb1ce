//! Specification loading
//!
//! Two input shapes are accepted transparently:
//!
//! - legacy flat: `{ "groups": [{ "name", "description", "components": [...] }] }`
//! - hierarchical: `{ "<root>": { "description", "children": { "<name>": {...} } }, "metadata": {...} }`
//!
//! The optional sibling `metadata` key of the hierarchical shape is ignored.

use crate::error::{GeneratorError, Result};
use crate::types::{ComponentGroup, ComponentKind, ComponentNode};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

const METADATA_KEY: &str = "metadata";
const GROUPS_KEY: &str = "groups";

/// A parsed specification document
#[derive(Debug, Clone, PartialEq)]
pub enum SpecDocument {
    /// Already-flat groups, passed through the compiler unchanged
    Legacy(Vec<ComponentGroup>),
    /// Tree rooted at a synthetic level-0 container
    Hierarchical(ComponentNode),
}

impl SpecDocument {
    pub fn from_str(source: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(source).map_err(|e| {
            GeneratorError::planning(format!("Specification is not valid JSON: {}", e))
        })?;
        Self::from_value(&value)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|e| GeneratorError::FileNotFound {
            path: format!("{}: {}", path.display(), e),
        })?;
        log::info!("Loaded specification from {}", path.display());
        Self::from_str(&source)
    }

    pub fn from_value(value: &Value) -> Result<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| GeneratorError::planning("Specification must be a JSON object"))?;

        if let Some(groups) = object.get(GROUPS_KEY) {
            if groups.is_array() {
                let groups: Vec<ComponentGroup> = serde_json::from_value(groups.clone())
                    .map_err(|e| {
                        GeneratorError::planning(format!("Invalid legacy group list: {}", e))
                    })?;
                log::debug!("Detected legacy flat specification ({} groups)", groups.len());
                return Ok(Self::Legacy(groups));
            }
        }

        let (root_key, root_value) = object
            .iter()
            .find(|(key, _)| key.as_str() != METADATA_KEY)
            .ok_or_else(|| GeneratorError::planning("Specification has no root component"))?;

        let root = parse_node(root_key, root_value, 0, root_key)?;
        log::debug!(
            "Detected hierarchical specification rooted at '{}' ({} nodes)",
            root.name,
            root.descendant_count()
        );
        Ok(Self::Hierarchical(root))
    }
}

fn parse_node(name: &str, value: &Value, level: usize, path: &str) -> Result<ComponentNode> {
    let object = value.as_object().ok_or_else(|| {
        GeneratorError::planning(format!("Component '{}' must be an object", path))
    })?;

    let mut node = ComponentNode::new(name, level);
    node.description = string_field(object, "description", path)?.unwrap_or_default();
    node.kind = string_field(object, "kind", path)?.map(|kind| ComponentKind::from_name(&kind));
    node.tags = tags_field(object, path)?;

    match object.get("children") {
        None | Some(Value::Null) => {}
        Some(Value::Object(children)) => {
            for (child_name, child_value) in children {
                if child_name.trim().is_empty() {
                    return Err(GeneratorError::planning(format!(
                        "Component '{}' has a child with an empty name",
                        path
                    )));
                }
                let child_path = format!("{}.{}", path, child_name);
                let child = parse_node(child_name, child_value, level + 1, &child_path)?;
                node.children.insert(child_name.clone(), child);
            }
        }
        Some(_) => {
            return Err(GeneratorError::planning(format!(
                "Component '{}' has non-object 'children'",
                path
            )))
        }
    }

    Ok(node)
}

fn string_field(object: &Map<String, Value>, key: &str, path: &str) -> Result<Option<String>> {
    match object.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(GeneratorError::planning(format!(
            "Component '{}' field '{}' must be a string",
            path, key
        ))),
    }
}

fn tags_field(object: &Map<String, Value>, path: &str) -> Result<Vec<String>> {
    match object.get("tags") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str().map(str::to_string).ok_or_else(|| {
                    GeneratorError::planning(format!("Component '{}' has a non-string tag", path))
                })
            })
            .collect(),
        Some(_) => Err(GeneratorError::planning(format!(
            "Component '{}' field 'tags' must be an array",
            path
        ))),
    }
}
