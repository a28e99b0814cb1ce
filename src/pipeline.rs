//! Sequential queue processing
//!
//! Items are generated one at a time in queue order. The first failure stops
//! the run and propagates with the failing unit's identity; units written
//! before it stay on disk.

use crate::error::{GeneratorError, Result};
use crate::invoker::RetryingInvoker;
use crate::persist::UnitWriter;
use crate::postprocess::finalize_content;
use crate::types::*;
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub project: String,
    pub timeout: Duration,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            project: "app".to_string(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UnitReport {
    pub path: String,
    pub group: String,
    pub file: PathBuf,
    pub attempts: u32,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerationReport {
    pub units: Vec<UnitReport>,
    pub elapsed_ms: u64,
}

impl GenerationReport {
    pub fn total_attempts(&self) -> u32 {
        self.units.iter().map(|u| u.attempts).sum()
    }
}

pub async fn generate_queue(
    queue: &[GenerationQueueItem],
    invoker: &RetryingInvoker,
    writer: &dyn UnitWriter,
    options: &PipelineOptions,
) -> Result<GenerationReport> {
    let start = Instant::now();
    let group_descriptions: HashMap<&str, &str> = queue
        .iter()
        .filter(|item| item.level == 1 && !item.description.is_empty())
        .map(|item| (item.name.as_str(), item.description.as_str()))
        .collect();

    let mut report = GenerationReport::default();
    let mut context = GenerationContext {
        project: options.project.clone(),
        group_description: None,
        existing_units: Vec::new(),
    };

    for (index, item) in queue.iter().enumerate() {
        log::info!(
            "[{}/{}] Generating {} (level {}, group {})",
            index + 1,
            queue.len(),
            item.path,
            item.level,
            item.group_name()
        );
        context.group_description = group_descriptions
            .get(item.group_name())
            .map(|d| d.to_string());

        let generated = invoker
            .invoke(item, &context, options.timeout)
            .await
            .map_err(|failure| GeneratorError::Generation {
                unit: item.path.clone(),
                group: item.group_name().to_string(),
                description: item.description.clone(),
                attempts: failure.attempts,
                source: failure.error,
            })?;

        let attempts = generated
            .metadata
            .get("attempts")
            .and_then(|v| v.as_u64())
            .unwrap_or(1) as u32;
        let content = finalize_content(item, &generated.content);
        let file = writer.write_unit(item, &content)?;

        context.existing_units.push(item.path.clone());
        report.units.push(UnitReport {
            path: item.path.clone(),
            group: item.group_name().to_string(),
            file,
            attempts,
        });
    }

    report.elapsed_ms = start.elapsed().as_millis() as u64;
    log::info!(
        "Generated {} units in {}ms ({} attempts)",
        report.units.len(),
        report.elapsed_ms,
        report.total_attempts()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::GenerationBackend;
    use crate::error::InvocationError;
    use crate::input::SpecDocument;
    use crate::invoker::{InvocationRoute, RetryPolicy};
    use crate::persist::FsUnitWriter;
    use crate::tree_compiler::TreeCompiler;
    use async_trait::async_trait;
    use std::fs;
    use tempfile::TempDir;

    /// Echoes the unit name, failing terminally for one chosen unit
    struct EchoBackend {
        fail_on: Option<String>,
    }

    #[async_trait]
    impl GenerationBackend for EchoBackend {
        fn name(&self) -> &str {
            "echo"
        }

        async fn generate(
            &self,
            unit: &GenerationQueueItem,
            _context: &GenerationContext,
        ) -> std::result::Result<GeneratedContent, InvocationError> {
            if self.fail_on.as_deref() == Some(unit.name.as_str()) {
                return Err(InvocationError::terminal("malformed request"));
            }
            Ok(GeneratedContent::new(format!(
                "```tsx\nexport function {}() {{ return null }}\n```",
                unit.path
            )))
        }
    }

    fn plan() -> Vec<GenerationQueueItem> {
        let document = SpecDocument::from_str(
            r#"{"App": {"children": {
                "Forms": {"description": "Input forms", "children": {
                    "Login": {"kind": "form"},
                    "Card": {"children": {"Header": {"kind": "layout"}}}
                }}
            }}}"#,
        )
        .unwrap();
        TreeCompiler::new().plan(&document).unwrap().queue
    }

    fn invoker(fail_on: Option<&str>) -> RetryingInvoker {
        let backend = EchoBackend {
            fail_on: fail_on.map(str::to_string),
        };
        RetryingInvoker::new(
            InvocationRoute::Local(vec![Box::new(backend)]),
            RetryPolicy::new(2, 1, 0),
        )
    }

    #[tokio::test]
    async fn test_generates_every_unit_in_order() {
        let temp_dir = TempDir::new().unwrap();
        let writer = FsUnitWriter::new(temp_dir.path());
        let queue = plan();

        let report = generate_queue(&queue, &invoker(None), &writer, &PipelineOptions::default())
            .await
            .unwrap();

        let paths: Vec<&str> = report.units.iter().map(|u| u.path.as_str()).collect();
        assert_eq!(paths, vec!["Forms", "Login", "Card", "Card.Header"]);
        assert_eq!(report.total_attempts(), 4);

        let header = fs::read_to_string(temp_dir.path().join("forms/CardHeader.tsx")).unwrap();
        assert!(header.starts_with("/**"));
        assert!(header.contains("export function CardHeader()"));
        assert!(temp_dir.path().join("forms/page.tsx").exists());
    }

    #[tokio::test]
    async fn test_first_failure_stops_the_run() {
        let temp_dir = TempDir::new().unwrap();
        let writer = FsUnitWriter::new(temp_dir.path());
        let queue = plan();

        let err = generate_queue(&queue, &invoker(Some("Card")), &writer, &PipelineOptions::default())
            .await
            .unwrap_err();

        match err {
            GeneratorError::Generation { unit, group, attempts, .. } => {
                assert_eq!(unit, "Card");
                assert_eq!(group, "Forms");
                assert_eq!(attempts, 1);
            }
            other => panic!("Expected generation error, got {:?}", other),
        }
        assert!(temp_dir.path().join("forms/Login.tsx").exists());
        assert!(!temp_dir.path().join("forms/Card.tsx").exists());
        assert!(!temp_dir.path().join("forms/CardHeader.tsx").exists());
    }
}
