//! Export
//!
//! Writes every version of every subject on a source registry into the tree
//! layout the import side reads back:
//!
//! ```text
//! export/
//! ├── orders-value/
//! │   ├── 0000000001.json
//! │   └── 0000000002.json
//! └── contexts/team-a/invoice/0000000001.json
//! ```
//!
//! File names are zero-padded version numbers so that lexicographic order is
//! replay order. Files whose content is unchanged are left alone.

use std::fs;
use std::path::{Component, Path, PathBuf};

use serde_json::Value;
use tracing::{debug, error, info};

use crate::checksum::Checksum;
use crate::client::RegistryClient;
use crate::config::OutputFormat;
use crate::context::QualifiedSubject;
use crate::error::{MigrateError, Result};

/// Counts over one export
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub subjects: usize,
    pub written: usize,
    pub unchanged: usize,
    pub failed: usize,
}

/// Serializes a registry's subjects to disk
pub struct Exporter<'a, C: RegistryClient + ?Sized> {
    client: &'a C,
    dir: PathBuf,
    format: OutputFormat,
}

impl<'a, C: RegistryClient + ?Sized> Exporter<'a, C> {
    pub fn new(client: &'a C, dir: impl Into<PathBuf>, format: OutputFormat) -> Self {
        Self {
            client,
            dir: dir.into(),
            format,
        }
    }

    /// Export all subjects. Only failure to list subjects is fatal; other
    /// failures are logged and counted.
    pub fn export(&self) -> Result<ExportSummary> {
        let subjects = self.client.list_subjects()?;
        info!(count = subjects.len(), "found subjects on source registry");

        let mut summary = ExportSummary::default();
        for subject in &subjects {
            summary.subjects += 1;
            if let Err(e) = self.export_subject(subject, &mut summary) {
                error!(%subject, error = %e, "failed to export subject");
                summary.failed += 1;
            }
        }

        info!(
            subjects = summary.subjects,
            written = summary.written,
            unchanged = summary.unchanged,
            failed = summary.failed,
            dir = %self.dir.display(),
            "export finished"
        );
        Ok(summary)
    }

    fn export_subject(&self, wire: &str, summary: &mut ExportSummary) -> Result<()> {
        let subject = QualifiedSubject::parse(wire)?;
        let dir = self.dir.join(subject_dir(&subject)?);
        fs::create_dir_all(&dir)?;

        let versions = self.client.list_versions(wire)?;
        debug!(subject = %wire, ?versions, "versions found");

        for version in versions {
            match self.export_version(wire, version, &dir) {
                Ok(true) => summary.written += 1,
                Ok(false) => summary.unchanged += 1,
                Err(e) => {
                    error!(subject = %wire, version, error = %e, "failed to export version");
                    summary.failed += 1;
                }
            }
        }
        Ok(())
    }

    /// Returns whether the file was (re)written
    fn export_version(&self, wire: &str, version: i64, dir: &Path) -> Result<bool> {
        let payload = self.client.get_version(wire, version)?;
        let content = self.render(&payload)?;
        let path = dir.join(version_file_name(version));

        if Checksum::of_file(&path)? == Some(Checksum::from_bytes(content.as_bytes())) {
            debug!(path = %path.display(), "unchanged");
            return Ok(false);
        }
        fs::write(&path, content)?;
        debug!(path = %path.display(), "written");
        Ok(true)
    }

    fn render(&self, payload: &Value) -> Result<String> {
        Ok(match self.format {
            OutputFormat::Pretty => serde_json::to_string_pretty(payload)?,
            OutputFormat::Compact => serde_json::to_string(payload)?,
        })
    }
}

/// File name for one version, padded so lexicographic order is numeric order.
/// Registry versions are 32-bit, so ten digits cover every one of them.
pub fn version_file_name(version: i64) -> String {
    format!("{version:010}.json")
}

/// Relative directory for a subject, refusing names that would escape the
/// export root or land somewhere the import side reads differently
fn subject_dir(subject: &QualifiedSubject) -> Result<PathBuf> {
    let dir = subject.relative_dir();
    let base_ok = !subject.base().is_empty()
        && !subject.base().contains(['/', '\\']);
    let components_ok = dir.components().all(|c| matches!(c, Component::Normal(_)));
    if base_ok && components_ok {
        Ok(dir)
    } else {
        Err(MigrateError::InvalidContext {
            segment: subject.base().to_string(),
            reason: "subject name cannot be used as a directory".to_string(),
        })
    }
}
