//! Filesystem persistence of generated units
//!
//! Layout: `<root>/<kebab-group>/<Identifier>.<ext>`, plus a per-group
//! `index.<ext>` export list. A first-level container is the group itself and
//! is written as the group's `page.<ext>`.

use crate::classifier::to_kebab_case;
use crate::error::Result;
use crate::postprocess::sanitize_identifier;
use crate::types::*;
use std::fs;
use std::path::{Path, PathBuf};

/// Directory name for a group; names with no usable characters go to `shared/`
pub fn group_slug(group: &str) -> String {
    let slug = to_kebab_case(group);
    if slug.is_empty() {
        SHARED_GROUP_DIR.to_string()
    } else {
        slug
    }
}

/// Group directory and file stem a unit is written to. Two items with the
/// same slot would overwrite each other.
pub fn unit_slot(item: &GenerationQueueItem) -> (String, String) {
    let stem = if item.level == 1 && item.is_container {
        RESERVED_PAGE_STEM.to_string()
    } else {
        sanitize_identifier(&item.path)
    };
    (group_slug(item.group_name()), stem)
}

pub trait UnitWriter {
    /// Persist finalized content for one unit and return where it went
    fn write_unit(&self, item: &GenerationQueueItem, content: &str) -> Result<PathBuf>;
}

pub struct FsUnitWriter {
    root: PathBuf,
    extension: String,
}

impl FsUnitWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extension: DEFAULT_FILE_EXTENSION.to_string(),
        }
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into().trim_start_matches('.').to_string();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn group_dir(&self, group: &str) -> PathBuf {
        self.root.join(group_slug(group))
    }

    pub fn unit_path(&self, item: &GenerationQueueItem) -> PathBuf {
        let (group, stem) = unit_slot(item);
        self.root.join(group).join(format!("{}.{}", stem, self.extension))
    }

    fn index_extension(&self) -> &str {
        if self.extension.starts_with('j') {
            "js"
        } else {
            "ts"
        }
    }

    fn update_index(&self, dir: &Path, identifier: &str) -> Result<()> {
        let index_path = dir.join(format!("{}.{}", RESERVED_INDEX_STEM, self.index_extension()));
        let line = format!("export * from './{}';", identifier);

        let mut lines: Vec<String> = match fs::read_to_string(&index_path) {
            Ok(existing) => existing
                .lines()
                .filter(|l| !l.trim().is_empty())
                .map(str::to_string)
                .collect(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        if lines.contains(&line) {
            return Ok(());
        }
        lines.push(line);
        lines.sort();
        fs::write(&index_path, lines.join("\n") + "\n")?;
        Ok(())
    }
}

impl UnitWriter for FsUnitWriter {
    fn write_unit(&self, item: &GenerationQueueItem, content: &str) -> Result<PathBuf> {
        let path = self.unit_path(item);
        let dir = path.parent().unwrap_or(&self.root).to_path_buf();
        fs::create_dir_all(&dir)?;
        fs::write(&path, content)?;

        let is_page = path
            .file_stem()
            .map_or(false, |stem| stem == RESERVED_PAGE_STEM);
        if !is_page {
            self.update_index(&dir, &sanitize_identifier(&item.path))?;
        }
        log::debug!("Wrote {}", path.display());
        Ok(path)
    }
}
