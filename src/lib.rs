//! uigen - UI Component Generator
//!
//! Turns a declarative component specification into generated UI source files
//! and a preview registry for browsing them.
//!
//! # Features
//!
//! - Legacy grouped and hierarchical specification documents
//! - Breadth-first generation queue with derived actions and routes
//! - Local multi-backend generation with bounded retry, or a hosted endpoint
//! - Sample prop synthesis from type declarations found in generated code
//! - Preview registry that degrades to placeholders for broken units
//!
//! # Basic Usage
//!
//! ```rust,no_run
//! use uigen::{plan_file, Result};
//!
//! fn main() -> Result<()> {
//!     let plan = plan_file("components.json")?;
//!     for item in &plan.queue {
//!         println!("{} (level {})", item.path, item.level);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Pipeline
//!
//! 1. **Input**: parse the document and detect its shape
//! 2. **Planning**: flatten to groups and build the generation queue
//! 3. **Generation**: invoke backends per unit, with retry on the local path
//! 4. **Persistence**: post-process and write each unit under its group
//! 5. **Registry**: rediscover units on disk and emit the preview modules

pub mod types;
pub mod error;
pub mod input;
pub mod classifier;
pub mod tree_compiler;

pub mod backends;
pub mod invoker;
pub mod postprocess;
pub mod persist;
pub mod pipeline;

pub mod type_resolver;
pub mod synthesizer;
pub mod registry;
pub mod cli;

use std::path::Path;
use std::time::Duration;

pub use error::{GeneratorError, InvocationError, InvocationFailure, Result};
pub use types::*;
pub use input::SpecDocument;
pub use classifier::{classify, to_kebab_case, Classification};
pub use tree_compiler::{
    build_generation_queue, flatten_to_groups, flatten_tree, BuildPlan, PlanningStats, TreeCompiler,
};
pub use backends::{BackendConfig, GenerationBackend, HostedBackend, HttpBackend, Provider};
pub use invoker::{InvocationRoute, RetryPolicy, RetryingInvoker};
pub use persist::{FsUnitWriter, UnitWriter};
pub use pipeline::{generate_queue, GenerationReport, PipelineOptions, UnitReport};
pub use type_resolver::{FieldDescriptor, TextScanResolver, TypeResolver};
pub use synthesizer::SampleSynthesizer;
pub use registry::{
    FsModuleLoader, ModuleLoader, PreviewRegistry, RegistryArtifacts, RegistryBuilder,
    RegistryEntry, RenderedUnit,
};
pub use cli::EnhancedCli;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

pub const BUILD_INFO: GeneratorInfo = GeneratorInfo {
    version: VERSION,
    name: NAME,
    description: DESCRIPTION,
    supported_features: &[
        "legacy-input",
        "hierarchical-input",
        "derived-actions",
        "local-backends",
        "hosted-backend",
        "preview-registry",
        "sample-props",
        "watch",
    ],
};

#[derive(Debug, Clone)]
pub struct GeneratorInfo {
    pub version: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub supported_features: &'static [&'static str],
}

/// Options for a full generation run
#[derive(Debug, Clone)]
pub struct GeneratorOptions {
    /// Root directory that receives the group directories
    pub output_directory: String,

    /// Extension for generated unit files, without the dot
    pub file_extension: String,

    /// Project name passed to backends as context
    pub project: String,

    pub retry: RetryPolicy,

    /// Upper bound for a single backend attempt
    pub timeout: Duration,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            output_directory: "components".to_string(),
            file_extension: DEFAULT_FILE_EXTENSION.to_string(),
            project: "app".to_string(),
            retry: RetryPolicy::default(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }
}

/// Read a specification document and plan it
pub fn plan_file(input_path: impl AsRef<Path>) -> Result<BuildPlan> {
    let document = SpecDocument::from_file(input_path)?;
    TreeCompiler::new().plan(&document)
}

/// Plan, generate and persist every unit of a specification document
pub async fn generate_file(
    input_path: impl AsRef<Path>,
    backend_config: &BackendConfig,
    options: &GeneratorOptions,
) -> Result<GenerationReport> {
    let plan = plan_file(input_path)?;
    let invoker = RetryingInvoker::from_config(backend_config, options.retry);
    let writer = FsUnitWriter::new(&options.output_directory)
        .with_extension(options.file_extension.as_str());
    let pipeline_options = PipelineOptions {
        project: options.project.clone(),
        timeout: options.timeout,
    };
    generate_queue(&plan.queue, &invoker, &writer, &pipeline_options).await
}

/// Rebuild the preview registry for an output directory
pub fn build_registry(output_root: impl AsRef<Path>) -> Result<(PreviewRegistry, RegistryArtifacts)> {
    RegistryBuilder::new(output_root.as_ref()).build_and_emit()
}

pub fn supports_feature(feature: &str) -> bool {
    BUILD_INFO.supported_features.contains(&feature)
}

pub fn build_info() -> &'static GeneratorInfo {
    &BUILD_INFO
}
