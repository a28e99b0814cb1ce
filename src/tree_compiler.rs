//! Tree compiler: component tree -> groups and generation queue

use crate::classifier::{classify, Classification};
use crate::error::{GeneratorError, Result};
use crate::input::SpecDocument;
use crate::persist::unit_slot;
use crate::types::*;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};

/// Output of one planning pass
#[derive(Debug, Clone, Serialize)]
pub struct BuildPlan {
    pub groups: Vec<ComponentGroup>,
    /// The planned tree with derived actions and routes filled in
    #[serde(skip)]
    pub tree: ComponentNode,
    pub queue: Vec<GenerationQueueItem>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PlanningStats {
    pub group_count: usize,
    pub leaf_count: usize,
    pub queue_length: usize,
    pub max_level: usize,
}

pub struct TreeCompiler {
    stats: PlanningStats,
}

impl TreeCompiler {
    pub fn new() -> Self {
        Self {
            stats: PlanningStats::default(),
        }
    }

    pub fn stats(&self) -> &PlanningStats {
        &self.stats
    }

    /// Flatten and queue a document in one pass.
    ///
    /// Legacy documents are queued by lifting their groups into a two-level tree.
    pub fn plan(&mut self, document: &SpecDocument) -> Result<BuildPlan> {
        let groups = flatten_to_groups(document);
        let mut root = match document {
            SpecDocument::Hierarchical(root) => root.clone(),
            SpecDocument::Legacy(groups) => tree_from_groups(groups)?,
        };
        annotate_tree(&mut root);
        let queue = build_generation_queue(&root);
        check_output_slots(&queue)?;

        self.stats = PlanningStats {
            group_count: groups.len(),
            leaf_count: groups.iter().map(|g| g.components.len()).sum(),
            queue_length: queue.len(),
            max_level: queue.iter().map(|item| item.level).max().unwrap_or(0),
        };
        log::info!(
            "Planned {} groups, {} leaf units, {} queue items (max level {})",
            self.stats.group_count,
            self.stats.leaf_count,
            self.stats.queue_length,
            self.stats.max_level
        );

        Ok(BuildPlan {
            groups,
            tree: root,
            queue,
        })
    }
}

impl Default for TreeCompiler {
    fn default() -> Self {
        Self::new()
    }
}

/// Flatten a document into named groups of leaf units.
///
/// Legacy documents come back unchanged.
pub fn flatten_to_groups(document: &SpecDocument) -> Vec<ComponentGroup> {
    match document {
        SpecDocument::Legacy(groups) => groups.clone(),
        SpecDocument::Hierarchical(root) => flatten_tree(root),
    }
}

/// One group per first-level child of `root`; groups without leaves are dropped
pub fn flatten_tree(root: &ComponentNode) -> Vec<ComponentGroup> {
    let mut groups = Vec::new();

    for group_root in root.children.values() {
        let mut components = Vec::new();
        if group_root.is_leaf() {
            if group_root.kind.is_some() {
                components.push(leaf_record(group_root, &group_root.name));
            }
        } else {
            for child in group_root.children.values() {
                collect_leaves(child, &child.name, &mut components);
            }
        }

        if components.is_empty() {
            log::debug!("Dropping group '{}' with no leaf components", group_root.name);
            continue;
        }
        groups.push(ComponentGroup {
            name: group_root.name.clone(),
            description: group_root.description.clone(),
            components,
        });
    }

    groups
}

fn collect_leaves(node: &ComponentNode, path: &str, out: &mut Vec<LegacyComponent>) {
    if node.is_leaf() {
        if node.kind.is_some() {
            out.push(leaf_record(node, path));
        }
        return;
    }
    for child in node.children.values() {
        collect_leaves(child, &format!("{}.{}", path, child.name), out);
    }
}

fn leaf_record(node: &ComponentNode, path: &str) -> LegacyComponent {
    let mut extra = serde_json::Map::new();
    if !node.tags.is_empty() {
        extra.insert("tags".to_string(), serde_json::json!(node.tags));
    }
    LegacyComponent {
        name: path.to_string(),
        description: Some(node.description.clone()).filter(|d| !d.is_empty()),
        kind: node.kind.map(|k| k.as_str().to_string()),
        extra,
    }
}

/// Lift flat groups into a tree: groups at level 1, their components at level 2
pub fn tree_from_groups(groups: &[ComponentGroup]) -> Result<ComponentNode> {
    let mut root = ComponentNode::root("Project");
    for group in groups {
        if root.children.contains_key(&group.name) {
            return Err(GeneratorError::planning(format!(
                "Duplicate group name '{}'",
                group.name
            )));
        }
        let group_node = root.add_child(
            ComponentNode::new(&group.name, 1).with_description(&group.description),
        );
        for component in &group.components {
            if group_node.children.contains_key(&component.name) {
                return Err(GeneratorError::planning(format!(
                    "Duplicate component '{}' in group '{}'",
                    component.name, group.name
                )));
            }
            let mut node = ComponentNode::new(&component.name, 2)
                .with_description(component.description.clone().unwrap_or_default());
            node.kind = component.kind.as_deref().map(ComponentKind::from_name);
            if let Some(tags) = component.extra.get("tags").and_then(|t| t.as_array()) {
                node.tags = tags
                    .iter()
                    .filter_map(|t| t.as_str().map(str::to_string))
                    .collect();
            }
            group_node.add_child(node);
        }
    }
    Ok(root)
}

/// Build the generation queue: one item per non-root node, breadth-first,
/// siblings in insertion order.
pub fn build_generation_queue(root: &ComponentNode) -> Vec<GenerationQueueItem> {
    let mut queue = Vec::with_capacity(root.descendant_count());
    let mut pending: VecDeque<(&ComponentNode, Option<&str>, String)> = root
        .children
        .values()
        .map(|child| (child, None, child.name.clone()))
        .collect();

    while let Some((node, group, path)) = pending.pop_front() {
        let child_group = group.or(Some(node.name.as_str()));
        for child in node.children.values() {
            let child_path = if group.is_none() {
                child.name.clone()
            } else {
                format!("{}.{}", path, child.name)
            };
            pending.push_back((child, child_group, child_path));
        }

        let Classification {
            server_actions,
            client_actions,
            routes,
        } = classify(&node.name, &node.description, node.kind, &node.tags);

        let mut item = GenerationQueueItem {
            name: node.name.clone(),
            description: node.description.clone(),
            kind: node.kind,
            level: node.level,
            group: group.map(str::to_string),
            path,
            is_container: !node.is_leaf(),
            server_actions,
            routes,
            client_actions,
            self_documentation: String::new(),
        };
        item.self_documentation = self_documentation(&item);
        log::debug!("Queued '{}' at level {}", item.path, item.level);
        queue.push(item);
    }

    queue
}

/// Reject plans where two items would be written to the same file, e.g.
/// `Card.Header` next to a sibling `CardHeader`, or two groups whose names
/// share a directory slug
pub fn check_output_slots(queue: &[GenerationQueueItem]) -> Result<()> {
    let mut taken: HashMap<(String, String), &GenerationQueueItem> = HashMap::new();
    for item in queue {
        let slot = unit_slot(item);
        if let Some(previous) = taken.get(&slot) {
            return Err(GeneratorError::planning(format!(
                "'{}' (group {}) and '{}' (group {}) would both be written to {}/{}",
                previous.path,
                previous.group_name(),
                item.path,
                item.group_name(),
                slot.0,
                slot.1
            )));
        }
        taken.insert(slot, item);
    }
    Ok(())
}

/// Populate `derived_actions` and `derived_routes` on every non-root node
pub fn annotate_tree(root: &mut ComponentNode) {
    for child in root.children.values_mut() {
        annotate_node(child);
    }
}

fn annotate_node(node: &mut ComponentNode) {
    let classification = classify(&node.name, &node.description, node.kind, &node.tags);
    node.derived_actions = classification
        .server_actions
        .into_iter()
        .chain(classification.client_actions)
        .collect();
    node.derived_routes = classification.routes;
    for child in node.children.values_mut() {
        annotate_node(child);
    }
}

/// Descriptive header prepended to generated output
pub fn self_documentation(item: &GenerationQueueItem) -> String {
    let list = |values: &[String]| {
        if values.is_empty() {
            "none".to_string()
        } else {
            values.join(", ")
        }
    };

    let mut doc = String::from("/**\n");
    doc.push_str(&format!(" * @component {}\n", item.path));
    doc.push_str(&format!(" * @group {}\n", item.group_name()));
    doc.push_str(&format!(" * @level {}\n", item.level));
    if let Some(kind) = item.kind {
        doc.push_str(&format!(" * @kind {}\n", kind));
    }
    for line in item.description.lines().filter(|l| !l.trim().is_empty()) {
        doc.push_str(&format!(" * {}\n", line.trim().replace("*/", "* /")));
    }
    doc.push_str(&format!(" * @serverActions {}\n", list(&item.server_actions)));
    doc.push_str(&format!(" * @clientActions {}\n", list(&item.client_actions)));
    doc.push_str(&format!(" * @routes {}\n", list(&item.routes)));
    doc.push_str(" */\n");
    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn hierarchical(source: &str) -> ComponentNode {
        match SpecDocument::from_str(source).unwrap() {
            SpecDocument::Hierarchical(root) => root,
            other => panic!("Expected hierarchical document, got {:?}", other),
        }
    }

    fn sample_tree() -> ComponentNode {
        hierarchical(
            r#"{"App": {"children": {
                "Forms": {"description": "Input forms", "children": {
                    "Login": {"kind": "form", "description": "Sign in"},
                    "Card": {"children": {
                        "Header": {"kind": "layout"},
                        "Body": {"kind": "layout"}
                    }}
                }},
                "Pages": {"children": {
                    "SettingsPage": {"kind": "layout"}
                }},
                "Empty": {"children": {"Folder": {"children": {}}}}
            }}}"#,
        )
    }

    fn check_levels(node: &ComponentNode) {
        for child in node.children.values() {
            assert_eq!(child.level, node.level + 1, "level of {}", child.name);
            check_levels(child);
        }
    }

    #[test]
    fn test_flat_groups_pass_through() {
        let source = r#"{"groups":[{"name":"Forms","description":"d","components":[{"name":"Login","kind":"form"}]}]}"#;
        let document = SpecDocument::from_str(source).unwrap();
        let SpecDocument::Legacy(original) = &document else {
            panic!("Expected legacy document");
        };
        let groups = flatten_to_groups(&document);
        assert_eq!(&groups, original);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].components.len(), 1);
        assert_eq!(groups[0].components[0].name, "Login");
    }

    #[test]
    fn test_hierarchical_flatten() {
        let document =
            SpecDocument::from_str(r#"{"App":{"children":{"Forms":{"children":{"Login":{"kind":"form","description":"x"}}}}}}"#)
                .unwrap();
        let groups = flatten_to_groups(&document);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].name, "Forms");
        assert_eq!(groups[0].components.len(), 1);
        assert_eq!(groups[0].components[0].name, "Login");
        assert_eq!(groups[0].components[0].description.as_deref(), Some("x"));
    }

    #[test]
    fn test_flatten_uses_dotted_paths_and_drops_empty_groups() {
        let groups = flatten_tree(&sample_tree());
        let names: Vec<&str> = groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["Forms", "Pages"]);

        let forms: Vec<&str> = groups[0].components.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(forms, vec!["Login", "Card.Header", "Card.Body"]);
        assert_eq!(groups[0].description, "Input forms");
    }

    #[test]
    fn test_empty_root_yields_no_groups() {
        let root = ComponentNode::root("App");
        assert!(flatten_tree(&root).is_empty());
        assert!(build_generation_queue(&root).is_empty());
    }

    #[test]
    fn test_tree_levels() {
        check_levels(&sample_tree());
    }

    #[test]
    fn test_queue_covers_every_node_once() {
        let root = sample_tree();
        let queue = build_generation_queue(&root);
        assert_eq!(queue.len(), root.descendant_count());

        let paths: HashSet<(Option<String>, String)> = queue
            .iter()
            .map(|item| (item.group.clone(), item.path.clone()))
            .collect();
        assert_eq!(paths.len(), queue.len());
        assert!(queue.iter().all(|item| item.name != "App"));
    }

    #[test]
    fn test_queue_is_breadth_first() {
        let queue = build_generation_queue(&sample_tree());
        let levels: Vec<usize> = queue.iter().map(|item| item.level).collect();
        let mut sorted = levels.clone();
        sorted.sort();
        assert_eq!(levels, sorted);

        let first_level: Vec<&str> = queue
            .iter()
            .take_while(|item| item.level == 1)
            .map(|item| item.name.as_str())
            .collect();
        assert_eq!(first_level, vec!["Forms", "Pages", "Empty"]);

        let header = queue.iter().find(|item| item.name == "Header").unwrap();
        assert_eq!(header.group.as_deref(), Some("Forms"));
        assert_eq!(header.path, "Card.Header");
    }

    #[test]
    fn test_queue_items_carry_classification() {
        let queue = build_generation_queue(&sample_tree());
        let login = queue.iter().find(|item| item.name == "Login").unwrap();
        assert!(login.server_actions.contains(&"login".to_string()));
        assert!(login.self_documentation.contains("@component Login"));
        assert!(login.self_documentation.contains("Sign in"));

        let settings = queue.iter().find(|item| item.name == "SettingsPage").unwrap();
        assert_eq!(settings.routes, vec!["/settings"]);
    }

    #[test]
    fn test_legacy_plan_builds_queue() {
        let document = SpecDocument::from_str(
            r#"{"groups":[{"name":"Forms","components":[{"name":"Login","kind":"form"},{"name":"Signup","kind":"form"}]}]}"#,
        )
        .unwrap();
        let mut compiler = TreeCompiler::new();
        let plan = compiler.plan(&document).unwrap();
        assert_eq!(plan.queue.len(), 3);
        assert_eq!(plan.queue[0].name, "Forms");
        assert_eq!(plan.queue[1].group.as_deref(), Some("Forms"));
        assert_eq!(compiler.stats().leaf_count, 2);
        assert_eq!(compiler.stats().max_level, 2);
    }

    #[test]
    fn test_duplicate_legacy_components_rejected() {
        let groups = vec![ComponentGroup {
            name: "Forms".to_string(),
            description: String::new(),
            components: vec![
                serde_json::from_str(r#"{"name":"Login"}"#).unwrap(),
                serde_json::from_str(r#"{"name":"Login"}"#).unwrap(),
            ],
        }];
        assert!(matches!(
            tree_from_groups(&groups),
            Err(GeneratorError::Planning { .. })
        ));
    }

    #[test]
    fn test_plan_annotates_tree() {
        let plan = TreeCompiler::new()
            .plan(&SpecDocument::Hierarchical(sample_tree()))
            .unwrap();
        let login = &plan.tree.children["Forms"].children["Login"];
        assert!(login.derived_actions.contains(&"login".to_string()));
        assert_eq!(
            plan.tree.children["Pages"].children["SettingsPage"].derived_routes,
            vec!["/settings"]
        );
    }

    #[test]
    fn test_plan_rejects_colliding_identifiers() {
        let document = SpecDocument::from_str(
            r#"{"App": {"children": {"Forms": {"children": {
                "Card": {"children": {"Header": {"kind": "layout"}}},
                "CardHeader": {"kind": "layout"}
            }}}}}"#,
        )
        .unwrap();
        match TreeCompiler::new().plan(&document) {
            Err(GeneratorError::Planning { message }) => {
                assert!(message.contains("'CardHeader'"), "{}", message);
                assert!(message.contains("'Card.Header'"), "{}", message);
                assert!(message.contains("forms/CardHeader"), "{}", message);
            }
            other => panic!("Expected planning error, got {:?}", other),
        }
    }

    #[test]
    fn test_plan_rejects_groups_sharing_a_directory() {
        let document = SpecDocument::from_str(
            r#"{"App": {"children": {
                "UserMenu": {"children": {"Avatar": {"kind": "media"}}},
                "user-menu": {"children": {"Logout": {"kind": "navigation"}}}
            }}}"#,
        )
        .unwrap();
        let err = TreeCompiler::new().plan(&document).unwrap_err();
        assert!(err.to_string().contains("user-menu/page"), "{}", err);
    }

    #[test]
    fn test_annotate_tree_fills_derived_fields() {
        let mut root = sample_tree();
        annotate_tree(&mut root);
        let login = &root.children["Forms"].children["Login"];
        assert!(login.derived_actions.contains(&"login".to_string()));
        let settings = &root.children["Pages"].children["SettingsPage"];
        assert_eq!(settings.derived_routes, vec!["/settings"]);
        assert!(root.derived_actions.is_empty());
    }
}
