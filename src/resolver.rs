//! Path resolution
//!
//! Turns an import tree into a map from qualified subject name to the
//! directory holding its version files. A directory is a subject iff it
//! directly contains at least one file; directories holding only
//! subdirectories are namespace scaffolding.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::context::{NamingContext, QualifiedSubject, CONTEXTS_MARKER};
use crate::error::{MigrateError, Result};

/// A directory whose immediate children are version files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectPath {
    dir: PathBuf,
    files: Vec<PathBuf>,
}

impl SubjectPath {
    /// Files are kept in lexicographic file-name order, which is replay order
    pub fn new(dir: impl Into<PathBuf>, mut files: Vec<PathBuf>) -> Self {
        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Self {
            dir: dir.into(),
            files,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }
}

/// Result of resolving one import tree
#[derive(Debug, Default)]
pub struct ResolvedTree {
    subjects: BTreeMap<QualifiedSubject, SubjectPath>,
}

impl ResolvedTree {
    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }

    pub fn get(&self, subject: &QualifiedSubject) -> Option<&SubjectPath> {
        self.subjects.get(subject)
    }

    pub fn subjects(&self) -> impl Iterator<Item = &QualifiedSubject> {
        self.subjects.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&QualifiedSubject, &SubjectPath)> {
        self.subjects.iter()
    }

    fn insert(&mut self, subject: QualifiedSubject, path: SubjectPath) -> Result<()> {
        if let Some(existing) = self.subjects.get(&subject) {
            return Err(MigrateError::DuplicateSubject {
                subject: subject.to_string(),
                first: existing.dir.clone(),
                second: path.dir,
            });
        }
        self.subjects.insert(subject, path);
        Ok(())
    }
}

/// Derives qualified subject names from an import tree
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
    context: NamingContext,
}

impl PathResolver {
    /// `context` is prepended to every resolved subject's context
    pub fn new(root: impl Into<PathBuf>, context: NamingContext) -> Self {
        Self {
            root: root.into(),
            context,
        }
    }

    /// Walk the tree and resolve every subject directory.
    ///
    /// Fails on the first directory whose name cannot be qualified and on
    /// any two directories that qualify to the same subject.
    pub fn resolve(&self) -> Result<ResolvedTree> {
        if !self.root.is_dir() {
            return Err(MigrateError::MissingRoot(self.root.clone()));
        }

        let mut files_by_dir: BTreeMap<PathBuf, Vec<PathBuf>> = BTreeMap::new();
        for entry in WalkDir::new(&self.root).sort_by_file_name() {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if let Some(parent) = path.parent() {
                files_by_dir
                    .entry(parent.to_path_buf())
                    .or_default()
                    .push(path.to_path_buf());
            }
        }

        let mut tree = ResolvedTree::default();
        for (dir, files) in files_by_dir {
            let segments = relative_segments(&self.root, &dir);
            match qualify_segments(&self.context, &segments)? {
                Some(subject) => {
                    debug!(%subject, dir = %dir.display(), files = files.len(), "resolved subject");
                    tree.insert(subject, SubjectPath::new(dir, files))?;
                }
                None => warn!(
                    dir = %dir.display(),
                    "skipping files directly under the import root"
                ),
            }
        }
        Ok(tree)
    }
}

fn relative_segments(root: &Path, dir: &Path) -> Vec<String> {
    dir.strip_prefix(root)
        .unwrap_or(dir)
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect()
}

/// Qualify a subject from its directory segments relative to the import root.
///
/// The last segment is the base subject name. If an earlier segment is the
/// `contexts` marker, every segment after the first marker and before the
/// base is appended to `root` as context. Segments before the marker carry
/// no meaning. An empty segment list (the root itself) yields `None`.
pub fn qualify_segments(root: &NamingContext, segments: &[String]) -> Result<Option<QualifiedSubject>> {
    let Some((base, parents)) = segments.split_last() else {
        return Ok(None);
    };

    let mut context = root.clone();
    if let Some(marker) = parents.iter().position(|s| s == CONTEXTS_MARKER) {
        for segment in &parents[marker + 1..] {
            context.push(segment)?;
        }
    }
    Ok(Some(context.qualify(base.as_str())))
}
