//! Preview registry generation
//!
//! The registry reflects what is on disk at scan time, not the original plan.
//! Discovery treats each first-level directory under the output root as a
//! group and each source file inside it as a unit; reserved `page.*` and
//! `index.*` files are skipped.
//!
//! Failures on this path degrade instead of aborting: a unit whose module
//! cannot be loaded renders as a "Component not found" placeholder.

use crate::error::{GeneratorError, Result};
use crate::synthesizer::SampleSynthesizer;
use crate::type_resolver::{TextScanResolver, TypeResolver};
use crate::types::*;
use indexmap::IndexMap;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use walkdir::WalkDir;

const SOURCE_EXTENSIONS: &[&str] = &["tsx", "ts", "jsx", "js"];
const SHARED_TYPES_STEM: &str = "types";

pub type SampleProps = IndexMap<String, Map<String, Value>>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegistryEntry {
    pub group: String,
    pub name: String,
    /// Import specifier relative to the output root, e.g. `./forms/Login`
    pub module_path: String,
    #[serde(skip)]
    pub file: PathBuf,
}

/// What a module exports, as far as the loader can tell
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModuleExports {
    pub names: Vec<String>,
    pub has_default: bool,
}

pub trait ModuleLoader {
    fn load(&self, entry: &RegistryEntry) -> std::result::Result<ModuleExports, String>;
}

/// Loads modules by reading their source and scanning `export` statements
pub struct FsModuleLoader;

fn named_export_regex() -> &'static Regex {
    static NAMED: OnceLock<Regex> = OnceLock::new();
    NAMED.get_or_init(|| {
        Regex::new(
            r"export\s+(default\s+)?(?:async\s+)?(?:function\*?|const|let|var|class)\s+([A-Za-z_$][\w$]*)",
        )
        .unwrap()
    })
}

fn default_export_regex() -> &'static Regex {
    static DEFAULT: OnceLock<Regex> = OnceLock::new();
    DEFAULT.get_or_init(|| Regex::new(r"(?m)^[ \t]*export\s+default\b").unwrap())
}

fn export_list_regex() -> &'static Regex {
    static LIST: OnceLock<Regex> = OnceLock::new();
    LIST.get_or_init(|| Regex::new(r"export\s*\{([^}]*)\}").unwrap())
}

pub fn scan_exports(source: &str) -> ModuleExports {
    let mut exports = ModuleExports::default();
    for captures in named_export_regex().captures_iter(source) {
        if captures.get(1).is_some() {
            exports.has_default = true;
        }
        if let Some(name) = captures.get(2) {
            exports.names.push(name.as_str().to_string());
        }
    }
    for captures in export_list_regex().captures_iter(source) {
        let Some(list) = captures.get(1) else { continue };
        for item in list.as_str().split(',') {
            let exported = item.rsplit(" as ").next().unwrap_or(item).trim();
            if exported == "default" {
                exports.has_default = true;
            } else if !exported.is_empty() {
                exports.names.push(exported.to_string());
            }
        }
    }
    if default_export_regex().is_match(source) {
        exports.has_default = true;
    }
    exports
}

impl ModuleLoader for FsModuleLoader {
    fn load(&self, entry: &RegistryEntry) -> std::result::Result<ModuleExports, String> {
        fs::read_to_string(&entry.file)
            .map(|source| scan_exports(&source))
            .map_err(|e| format!("{}: {}", entry.file.display(), e))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderedUnit {
    Component {
        name: String,
        props: Map<String, Value>,
    },
    Placeholder {
        name: String,
        message: String,
    },
}

pub fn missing_component_message(name: &str) -> String {
    format!("Component not found: {}", name)
}

/// Shallow merge; explicit props win over samples
pub fn merge_props(sample: Option<&Map<String, Value>>, explicit: Option<&Map<String, Value>>) -> Map<String, Value> {
    let mut merged = sample.cloned().unwrap_or_default();
    if let Some(explicit) = explicit {
        for (key, value) in explicit {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

impl RegistryEntry {
    /// Resolve the entry at render time. Never fails: load errors and missing
    /// exports become a placeholder naming the unit.
    pub fn resolve(
        &self,
        loader: &dyn ModuleLoader,
        samples: &SampleProps,
        explicit: Option<&Map<String, Value>>,
    ) -> RenderedUnit {
        let placeholder = || RenderedUnit::Placeholder {
            name: self.name.clone(),
            message: missing_component_message(&self.name),
        };
        match loader.load(self) {
            Ok(exports) if exports.names.contains(&self.name) || exports.has_default => {
                RenderedUnit::Component {
                    name: self.name.clone(),
                    props: merge_props(samples.get(&self.name), explicit),
                }
            }
            Ok(_) => {
                log::warn!("{} does not export '{}'", self.module_path, self.name);
                placeholder()
            }
            Err(e) => {
                log::warn!("Failed to load {}: {}", self.module_path, e);
                placeholder()
            }
        }
    }
}

/// Discovered entries plus synthesized sample props keyed by unit name
#[derive(Debug, Clone, Default, Serialize)]
pub struct PreviewRegistry {
    pub entries: Vec<RegistryEntry>,
    pub sample_props: SampleProps,
}

impl PreviewRegistry {
    /// Render every entry, grouped by group name in discovery order
    pub fn render_all(
        &self,
        loader: &dyn ModuleLoader,
        explicit: &SampleProps,
    ) -> IndexMap<String, Vec<RenderedUnit>> {
        let mut groups: IndexMap<String, Vec<RenderedUnit>> = IndexMap::new();
        for entry in &self.entries {
            let rendered = entry.resolve(loader, &self.sample_props, explicit.get(&entry.name));
            groups.entry(entry.group.clone()).or_default().push(rendered);
        }
        groups
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegistryArtifacts {
    pub registry_path: PathBuf,
    pub props_path: PathBuf,
    /// Set only when the canvas scaffold did not exist and was written
    pub canvas_path: Option<PathBuf>,
}

pub struct RegistryBuilder {
    root: PathBuf,
    synthesizer: SampleSynthesizer,
}

impl RegistryBuilder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            synthesizer: SampleSynthesizer::new(),
        }
    }

    pub fn with_synthesizer(mut self, synthesizer: SampleSynthesizer) -> Self {
        self.synthesizer = synthesizer;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Scan `<root>/<group>/<Unit>.<ext>`, sorted by group then file name
    pub fn discover(&self) -> Result<Vec<RegistryEntry>> {
        if !self.root.is_dir() {
            return Err(GeneratorError::FileNotFound {
                path: format!("Output directory {}", self.root.display()),
            });
        }

        let mut entries = Vec::new();
        // Depth-1 entries must reach the filter so hidden groups are pruned
        let walker = WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(2)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !is_hidden(e.path()));

        for entry in walker {
            let entry = entry
                .map_err(|e| GeneratorError::registry(format!("Directory traversal error: {}", e)))?;
            if entry.depth() != 2 || !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let Some(stem) = unit_stem(path) else { continue };
            let Some(group) = path
                .parent()
                .and_then(Path::file_name)
                .and_then(|g| g.to_str())
            else {
                continue;
            };

            entries.push(RegistryEntry {
                group: group.to_string(),
                name: stem.to_string(),
                module_path: format!("./{}/{}", group, stem),
                file: path.to_path_buf(),
            });
        }

        log::info!("Discovered {} units under {}", entries.len(), self.root.display());
        Ok(entries)
    }

    /// Shared declarations at `<root>/types.*`, if any
    fn shared_types(&self) -> Result<Option<String>> {
        for ext in SOURCE_EXTENSIONS {
            let path = self.root.join(format!("{}.{}", SHARED_TYPES_STEM, ext));
            if path.is_file() {
                return Ok(Some(fs::read_to_string(path)?));
            }
        }
        Ok(None)
    }

    /// Synthesize sample props for each entry from its props contract
    pub fn sample_props(&self, entries: &[RegistryEntry]) -> Result<SampleProps> {
        let shared = self.shared_types()?;
        let mut samples = SampleProps::new();

        for entry in entries {
            let source = match fs::read_to_string(&entry.file) {
                Ok(source) => source,
                Err(e) => {
                    log::warn!("Skipping props for {}: {}", entry.module_path, e);
                    continue;
                }
            };
            let mut resolver = TextScanResolver::new();
            if let Some(shared) = &shared {
                resolver.add_source(shared);
            }
            resolver.add_source(&source);

            let Some(contract) = resolver.props_contract(&entry.name) else {
                log::debug!("No props contract found for {}", entry.module_path);
                continue;
            };
            let props = self.synthesizer.synthesize_props(&contract, &resolver as &dyn TypeResolver);
            if samples.insert(entry.name.clone(), props).is_some() {
                log::warn!(
                    "Unit name '{}' appears in more than one group; keeping the last sample",
                    entry.name
                );
            }
        }
        Ok(samples)
    }

    pub fn build(&self) -> Result<PreviewRegistry> {
        let entries = self.discover()?;
        let sample_props = self.sample_props(&entries)?;
        Ok(PreviewRegistry {
            entries,
            sample_props,
        })
    }

    /// Write the registry and props modules, and the canvas scaffold if absent
    pub fn emit(&self, registry: &PreviewRegistry) -> Result<RegistryArtifacts> {
        let registry_path = self.root.join(REGISTRY_FILE);
        let props_path = self.root.join(PREVIEW_PROPS_FILE);
        let canvas = self.root.join(PREVIEW_CANVAS_FILE);

        fs::write(&registry_path, render_registry_source(&registry.entries)?)?;
        fs::write(&props_path, render_props_source(&registry.sample_props)?)?;

        let canvas_path = if canvas.exists() {
            None
        } else {
            fs::write(&canvas, canvas_scaffold())?;
            Some(canvas)
        };

        log::info!(
            "Wrote {} with {} entries",
            registry_path.display(),
            registry.entries.len()
        );
        Ok(RegistryArtifacts {
            registry_path,
            props_path,
            canvas_path,
        })
    }

    pub fn build_and_emit(&self) -> Result<(PreviewRegistry, RegistryArtifacts)> {
        let registry = self.build()?;
        let artifacts = self.emit(&registry)?;
        Ok((registry, artifacts))
    }
}

/// True for files this module writes itself
pub fn is_registry_artifact(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map_or(false, |n| {
            n == REGISTRY_FILE || n == PREVIEW_PROPS_FILE || n == PREVIEW_CANVAS_FILE
        })
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map_or(false, |n| n.starts_with('.'))
}

/// File stem of a unit source, or `None` for reserved and non-source files
fn unit_stem(path: &Path) -> Option<&str> {
    let ext = path.extension()?.to_str()?;
    if !SOURCE_EXTENSIONS.contains(&ext) {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    // Button.test.tsx, types.d.ts and friends are not units
    if stem.contains('.') || stem == RESERVED_PAGE_STEM || stem == RESERVED_INDEX_STEM {
        return None;
    }
    Some(stem)
}

fn js_string(value: &str) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

pub fn render_registry_source(entries: &[RegistryEntry]) -> Result<String> {
    let mut out = String::from(REGISTRY_PRELUDE);
    out.push_str("export const registry: RegistryEntry[] = [\n");
    for entry in entries {
        let name = js_string(&entry.name)?;
        let path = js_string(&entry.module_path)?;
        out.push_str(&format!(
            "  {{ group: {}, name: {}, path: {}, loader: load({}, () => import({})) }},\n",
            js_string(&entry.group)?,
            name,
            path,
            name,
            path
        ));
    }
    out.push_str("];\n\nexport { previewProps };\n");
    Ok(out)
}

pub fn render_props_source(samples: &SampleProps) -> Result<String> {
    let body = serde_json::to_string_pretty(samples)?;
    Ok(format!(
        "// Generated by uigen. Do not edit.\n\nexport const previewProps: Record<string, Record<string, unknown>> = {};\n",
        body
    ))
}

pub fn canvas_scaffold() -> &'static str {
    CANVAS_SCAFFOLD
}

const REGISTRY_PRELUDE: &str = r#"// Generated by uigen. Do not edit.

import { lazy, type ComponentType, type LazyExoticComponent } from 'react';
import { previewProps } from './preview-props';

type AnyComponent = ComponentType<Record<string, unknown>>;

export interface RegistryEntry {
  group: string;
  name: string;
  path: string;
  loader: LazyExoticComponent<AnyComponent>;
}

function missing(name: string): { default: AnyComponent } {
  return {
    default: () => <div className="uigen-missing">Component not found: {name}</div>,
  };
}

function load(name: string, importer: () => Promise<Record<string, unknown>>) {
  return lazy(() =>
    importer()
      .then((mod) => {
        const component = (mod[name] ?? mod.default) as AnyComponent | undefined;
        return component ? { default: component } : missing(name);
      })
      .catch(() => missing(name)),
  );
}

"#;

const CANVAS_SCAFFOLD: &str = r#"import { Suspense } from 'react';
import { registry, type RegistryEntry } from './registry';
import { previewProps } from './preview-props';

type PropOverrides = Record<string, Record<string, unknown>>;

export function PreviewCanvas({ props = {} }: { props?: PropOverrides }) {
  const groups = registry.reduce<Record<string, RegistryEntry[]>>((acc, entry) => {
    (acc[entry.group] ??= []).push(entry);
    return acc;
  }, {});

  return (
    <div className="uigen-canvas">
      {Object.entries(groups).map(([group, entries]) => (
        <section key={group}>
          <h2>{group}</h2>
          {entries.map(({ name, loader: Component }) => (
            <Suspense key={name} fallback={<div>Loading {name}</div>}>
              <Component {...previewProps[name]} {...props[name]} />
            </Suspense>
          ))}
        </section>
      ))}
    </div>
  );
}

export default PreviewCanvas;
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn create_test_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let file_path = dir.path().join(name);
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&file_path, content).unwrap();
        file_path
    }

    fn sample_output() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        create_test_file(
            &temp_dir,
            "forms/Login.tsx",
            r#"
export interface LoginProps {
  title: string;
  remember?: boolean;
  user: User;
  onSubmit: (values: FormValues) => void;
}
export function Login(props: LoginProps) { return null; }
"#,
        );
        create_test_file(&temp_dir, "forms/page.tsx", "export default function Page() {}");
        create_test_file(&temp_dir, "forms/index.ts", "export * from './Login';");
        create_test_file(&temp_dir, "forms/Login.test.tsx", "test('x', () => {});");
        create_test_file(
            &temp_dir,
            "data-display/Table.tsx",
            "type TableProps = { rows: number[] };\nconst Table = (p: TableProps) => null;\nexport { Table };",
        );
        create_test_file(&temp_dir, "data-display/notes.md", "# notes");
        create_test_file(&temp_dir, ".uigen/Hidden.tsx", "export function Hidden() {}");
        create_test_file(&temp_dir, "types.ts", "export interface User { name: string; email: string }");
        temp_dir
    }

    #[test]
    fn test_discovery_skips_reserved_files() {
        let temp_dir = sample_output();
        let entries = RegistryBuilder::new(temp_dir.path()).discover().unwrap();
        let found: Vec<(&str, &str)> = entries
            .iter()
            .map(|e| (e.group.as_str(), e.name.as_str()))
            .collect();
        assert_eq!(found, vec![("data-display", "Table"), ("forms", "Login")]);
        assert_eq!(entries[1].module_path, "./forms/Login");
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let builder = RegistryBuilder::new(temp_dir.path().join("nope"));
        assert!(matches!(builder.discover(), Err(GeneratorError::FileNotFound { .. })));
    }

    #[test]
    fn test_sample_props_use_contracts_and_shared_types() {
        let temp_dir = sample_output();
        let builder = RegistryBuilder::new(temp_dir.path())
            .with_synthesizer(SampleSynthesizer::new().with_placeholder("Lorem"));
        let registry = builder.build().unwrap();

        let login = &registry.sample_props["Login"];
        assert_eq!(login["title"], json!("Lorem"));
        assert_eq!(login["remember"], json!(true));
        assert_eq!(login["user"], json!({ "name": "Lorem", "email": "Lorem" }));
        assert!(!login.contains_key("onSubmit"));

        assert_eq!(registry.sample_props["Table"]["rows"], json!([1]));
    }

    #[test]
    fn test_emit_writes_artifacts_and_keeps_existing_canvas() {
        let temp_dir = sample_output();
        let builder = RegistryBuilder::new(temp_dir.path());
        let (_, artifacts) = builder.build_and_emit().unwrap();

        let registry = fs::read_to_string(&artifacts.registry_path).unwrap();
        assert!(registry.contains(r#"loader: load("Login", () => import("./forms/Login"))"#));
        assert!(registry.contains("Component not found"));
        let props = fs::read_to_string(&artifacts.props_path).unwrap();
        assert!(props.contains("\"Login\""));
        assert!(artifacts.canvas_path.is_some());

        fs::write(temp_dir.path().join(PREVIEW_CANVAS_FILE), "// customized").unwrap();
        let (_, again) = builder.build_and_emit().unwrap();
        assert!(again.canvas_path.is_none());
        assert_eq!(
            fs::read_to_string(temp_dir.path().join(PREVIEW_CANVAS_FILE)).unwrap(),
            "// customized"
        );
    }

    #[test]
    fn test_missing_export_renders_placeholder() {
        let temp_dir = TempDir::new().unwrap();
        create_test_file(&temp_dir, "forms/Broken.tsx", "export function SomethingElse() {}");
        let builder = RegistryBuilder::new(temp_dir.path());
        let registry = builder.build().unwrap();

        let rendered = registry.entries[0].resolve(&FsModuleLoader, &registry.sample_props, None);
        match rendered {
            RenderedUnit::Placeholder { name, message } => {
                assert_eq!(name, "Broken");
                assert!(message.contains("Broken"));
            }
            other => panic!("Expected placeholder, got {:?}", other),
        }
    }

    #[test]
    fn test_unreadable_module_renders_placeholder() {
        let entry = RegistryEntry {
            group: "forms".to_string(),
            name: "Gone".to_string(),
            module_path: "./forms/Gone".to_string(),
            file: PathBuf::from("/definitely/not/here/Gone.tsx"),
        };
        let rendered = entry.resolve(&FsModuleLoader, &SampleProps::new(), None);
        assert_eq!(
            rendered,
            RenderedUnit::Placeholder {
                name: "Gone".to_string(),
                message: "Component not found: Gone".to_string(),
            }
        );
    }

    #[test]
    fn test_explicit_props_win() {
        let temp_dir = sample_output();
        let registry = RegistryBuilder::new(temp_dir.path()).build().unwrap();

        let mut explicit = SampleProps::new();
        let mut login = Map::new();
        login.insert("title".to_string(), json!("Welcome back"));
        explicit.insert("Login".to_string(), login);

        let groups = registry.render_all(&FsModuleLoader, &explicit);
        assert_eq!(groups.keys().collect::<Vec<_>>(), vec!["data-display", "forms"]);
        match &groups["forms"][0] {
            RenderedUnit::Component { props, .. } => {
                assert_eq!(props["title"], json!("Welcome back"));
                assert_eq!(props["remember"], json!(true));
            }
            other => panic!("Expected component, got {:?}", other),
        }
    }

    #[test]
    fn test_registry_artifacts_are_recognized() {
        assert!(is_registry_artifact(Path::new("/out/registry.tsx")));
        assert!(is_registry_artifact(Path::new("preview-props.ts")));
        assert!(!is_registry_artifact(Path::new("/out/forms/Login.tsx")));
    }

    #[test]
    fn test_hidden_group_files_are_not_units() {
        let temp_dir = TempDir::new().unwrap();
        create_test_file(&temp_dir, ".git/Config.ts", "export const Config = 1;");
        create_test_file(&temp_dir, "forms/.Draft.tsx", "export function Draft() {}");
        create_test_file(&temp_dir, "forms/Login.tsx", "export function Login() {}");
        create_test_file(&temp_dir, "Stray.tsx", "export function Stray() {}");

        let (registry, artifacts) = RegistryBuilder::new(temp_dir.path()).build_and_emit().unwrap();
        let names: Vec<&str> = registry.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Login"]);
        let source = fs::read_to_string(&artifacts.registry_path).unwrap();
        assert!(!source.contains("./.git/"));
    }

    #[test]
    fn test_default_export_mention_in_comment_is_not_an_export() {
        let exports = scan_exports(
            "// switch to export default once the API settles\nconst label = \"export default\";\nexport function Other() {}",
        );
        assert!(!exports.has_default);
        assert_eq!(exports.names, vec!["Other"]);

        let temp_dir = TempDir::new().unwrap();
        create_test_file(
            &temp_dir,
            "forms/Wizard.tsx",
            "/* export default Wizard */\nexport function Step() {}",
        );
        let registry = RegistryBuilder::new(temp_dir.path()).build().unwrap();
        let rendered = registry.entries[0].resolve(&FsModuleLoader, &registry.sample_props, None);
        assert!(matches!(rendered, RenderedUnit::Placeholder { .. }));
    }

    #[test]
    fn test_default_export_statement_counts() {
        assert!(scan_exports("const Card = () => null;\nexport default Card;").has_default);
    }

    #[test]
    fn test_scan_exports() {
        let exports = scan_exports(
            "export const A = 1;\nexport default function B() {}\nconst C = 2;\nexport { C as D, E };",
        );
        assert_eq!(exports.names, vec!["A", "B", "D", "E"]);
        assert!(exports.has_default);
    }
}
