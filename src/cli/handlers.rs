// FILE: src/cli/handlers.rs
use crate::{
    cli::{OutputFormat, Template},
    generate_file, plan_file, GenerationReport, GeneratorError, PreviewRegistry,
    RegistryArtifacts, RegistryBuilder, Result, READY_MARKER,
};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use std::time::Instant;

// --- PLAN ---
pub fn handle_plan_command(matches: &clap::ArgMatches) -> Result<()> {
    let input_path = required(matches, "input")?;
    let plan = plan_file(input_path)?;

    match matches.get_one::<OutputFormat>("format") {
        Some(OutputFormat::Json) => {
            println!("{}", serde_json::to_string_pretty(&plan)?);
        }
        _ => {
            println!("📋 {} groups, {} queue items", plan.groups.len(), plan.queue.len());
            for group in &plan.groups {
                println!("   {} ({} units)", group.name, group.components.len());
            }
            println!("\n   Generation order:");
            for (index, item) in plan.queue.iter().enumerate() {
                let indent = "  ".repeat(item.level.saturating_sub(1));
                let kind = item.kind.map(|k| k.to_string()).unwrap_or_default();
                println!("   {:>3}. {}{} {}", index + 1, indent, item.path, kind);
            }
        }
    }
    Ok(())
}

// --- GENERATE ---
pub fn handle_generate_command(cli: &super::EnhancedCli, matches: &clap::ArgMatches) -> Result<()> {
    let input_path = required(matches, "input")?;
    let project_dir = Path::new(required(matches, "project")?);

    if !matches.get_flag("force") {
        ensure_ready(project_dir)?;
    }

    let options = cli.build_generator_options(matches)?;
    let backend_config = cli.build_backend_config(matches)?;

    println!("🔨 Generating {} -> {}", input_path, options.output_directory);

    let runtime = tokio::runtime::Runtime::new()?;
    let report = runtime.block_on(generate_file(input_path, &backend_config, &options))?;
    print_report(&report);

    if matches.get_flag("registry") {
        let (registry, artifacts) = RegistryBuilder::new(&options.output_directory).build_and_emit()?;
        print_registry(&registry, &artifacts);
    }

    println!("   Total time: {}ms", cli.elapsed().as_millis());
    Ok(())
}

/// Full builds only run once the project has been marked ready
pub fn ensure_ready(project_dir: &Path) -> Result<()> {
    let marker = project_dir.join(READY_MARKER);
    if marker.is_file() {
        Ok(())
    } else {
        Err(GeneratorError::InvalidFormat {
            message: format!(
                "Project is not ready for generation: {} is missing. Run `{} init` or pass --force.",
                marker.display(),
                crate::NAME
            ),
        })
    }
}

// --- REGISTRY ---
pub fn handle_registry_command(cli: &super::EnhancedCli, matches: &clap::ArgMatches) -> Result<()> {
    let output_dir = cli.output_directory(matches.get_one::<String>("dir"));
    let builder = RegistryBuilder::new(&output_dir);

    if matches.get_flag("watch") {
        watch_and_rebuild(&builder)
    } else {
        let (registry, artifacts) = builder.build_and_emit()?;
        print_registry(&registry, &artifacts);
        Ok(())
    }
}

fn watch_and_rebuild(builder: &RegistryBuilder) -> Result<()> {
    println!("👀 Watching {} for changes...", builder.root().display());

    let (tx, rx) = channel();
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| {
            if let Ok(event) = res {
                if let Err(e) = tx.send(event) {
                    eprintln!("Watch error: {}", e);
                }
            }
        },
        notify::Config::default(),
    )
    .map_err(|e| {
        GeneratorError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("Failed to create file watcher: {}", e),
        ))
    })?;

    watcher
        .watch(builder.root(), RecursiveMode::Recursive)
        .map_err(|e| {
            GeneratorError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Failed to watch directory: {}", e),
            ))
        })?;

    match builder.build_and_emit() {
        Ok((registry, _)) => println!("✅ Initial registry built ({} units)", registry.entries.len()),
        Err(e) => eprintln!("❌ Initial registry build failed: {}", e),
    }

    loop {
        match rx.recv() {
            Ok(event) => {
                if !should_rebuild(&event) {
                    continue;
                }
                println!("🔄 Output changed, rebuilding registry...");
                let started = Instant::now();
                match builder.build_and_emit() {
                    Ok((registry, _)) => println!(
                        "✅ Rebuilt registry ({} units, {}ms)",
                        registry.entries.len(),
                        started.elapsed().as_millis()
                    ),
                    Err(e) => eprintln!("❌ Registry build failed: {}", e),
                }
            }
            Err(e) => {
                eprintln!("Watch error: {}", e);
                break;
            }
        }
    }

    Ok(())
}

/// Ignore access events and writes to the registry's own artifacts
fn should_rebuild(event: &Event) -> bool {
    if matches!(event.kind, EventKind::Access(_)) {
        return false;
    }
    event
        .paths
        .iter()
        .any(|path| !crate::registry::is_registry_artifact(path))
}

// --- INIT ---
pub fn handle_init_command(matches: &clap::ArgMatches) -> Result<()> {
    let project_name = required(matches, "name")?;
    let template = matches
        .get_one::<Template>("template")
        .cloned()
        .unwrap_or(Template::Hierarchical);

    println!("🚀 Initializing new uigen project: {}", project_name);

    let project_dir = PathBuf::from(project_name);
    init_project(&project_dir, &template)?;

    println!("✅ Project created successfully!");
    println!("   Directory: {}", project_dir.display());
    println!("\nNext steps:");
    println!("   cd {}", project_name);
    println!("   edit components.json");
    println!("   {} generate components.json --registry", crate::NAME);

    Ok(())
}

fn init_project(project_dir: &Path, template: &Template) -> Result<()> {
    let document_path = project_dir.join("components.json");
    if document_path.exists() {
        return Err(GeneratorError::InvalidFormat {
            message: format!("'{}' already exists", document_path.display()),
        });
    }

    fs::create_dir_all(project_dir.join(".uigen"))?;
    let document = match template {
        Template::Hierarchical => HIERARCHICAL_TEMPLATE,
        Template::Legacy => LEGACY_TEMPLATE,
    };
    fs::write(&document_path, document)?;
    fs::write(project_dir.join("uigen.toml"), CONFIG_TEMPLATE)?;
    fs::write(project_dir.join(READY_MARKER), "")?;
    Ok(())
}

const HIERARCHICAL_TEMPLATE: &str = r#"{
  "App": {
    "description": "Application shell",
    "children": {
      "Authentication": {
        "description": "Sign-in and account screens",
        "children": {
          "LoginForm": { "kind": "form", "description": "Email and password sign-in" },
          "SignupPage": { "kind": "layout", "description": "New account registration" }
        }
      },
      "Dashboard": {
        "description": "Overview of recent activity",
        "children": {
          "ActivityTable": { "kind": "data", "description": "Recent events" },
          "StatsCard": {
            "kind": "layout",
            "children": {
              "Header": { "description": "Card title and period selector" }
            }
          }
        }
      }
    }
  },
  "metadata": { "version": 1 }
}
"#;

const LEGACY_TEMPLATE: &str = r#"{
  "groups": [
    {
      "name": "Authentication",
      "description": "Sign-in and account screens",
      "components": [
        { "name": "LoginForm", "kind": "form", "description": "Email and password sign-in" },
        { "name": "SignupPage", "kind": "layout", "description": "New account registration" }
      ]
    }
  ]
}
"#;

const CONFIG_TEMPLATE: &str = r#"output_directory = "components"
max_attempts = 4
timeout_ms = 120000
provider_priority = ["anthropic", "openai", "gemini"]
file_extension = "tsx"
"#;

// --- HELPERS ---
fn required<'a>(matches: &'a clap::ArgMatches, name: &str) -> Result<&'a String> {
    matches
        .get_one::<String>(name)
        .ok_or_else(|| GeneratorError::InvalidFormat {
            message: format!("Missing required argument '{}'", name),
        })
}

fn print_report(report: &GenerationReport) {
    println!("✅ Generation successful!");
    println!("   Units: {}", report.units.len());
    println!("   Attempts: {}", report.total_attempts());
    println!("   Time: {}ms", report.elapsed_ms);
    for unit in report.units.iter().filter(|u| u.attempts > 1) {
        println!("     {} needed {} attempts", unit.path, unit.attempts);
    }
}

fn print_registry(registry: &PreviewRegistry, artifacts: &RegistryArtifacts) {
    println!("✅ Registry built: {} units", registry.entries.len());
    println!("   Registry: {}", artifacts.registry_path.display());
    println!("   Props: {} ({} with samples)", artifacts.props_path.display(), registry.sample_props.len());
    if let Some(canvas) = &artifacts.canvas_path {
        println!("   Canvas: {}", canvas.display());
    }
}
