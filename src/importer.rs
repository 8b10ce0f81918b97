//! Per-subject import
//!
//! Each subject goes through a small state machine against the target
//! registry:
//!
//! ```text
//! ReadWrite ──set_mode(IMPORT)──▶ Import ──▶ Replaying ──set_mode(READWRITE)──▶ Restored
//!     │                                          │
//!     └─ refused ─▶ FailedToEnterImport          └─ refused ─▶ StrandedInImport
//! ```
//!
//! Version failures never stop the replay. A refused restore is logged and
//! reported, never retried.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tracing::{debug, error, info, warn};

use crate::client::{Mode, RegistryClient};
use crate::context::QualifiedSubject;
use crate::error::{MigrateError, Result};
use crate::report::{SubjectOutcome, VersionOutcome};
use crate::resolver::SubjectPath;
use crate::version_file::VersionFile;

/// Where a subject is in its import
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubjectState {
    ReadWrite,
    Import,
    Replaying,
    Restored,
    FailedToEnterImport,
    StrandedInImport,
}

impl SubjectState {
    pub fn name(&self) -> &'static str {
        match self {
            SubjectState::ReadWrite => "READWRITE",
            SubjectState::Import => "IMPORT",
            SubjectState::Replaying => "REPLAYING",
            SubjectState::Restored => "RESTORED",
            SubjectState::FailedToEnterImport => "FAILED-TO-ENTER-IMPORT",
            SubjectState::StrandedInImport => "STRANDED-IN-IMPORT",
        }
    }
}

impl fmt::Display for SubjectState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One subject's trip through IMPORT mode
pub struct SubjectImport<'a, C: RegistryClient + ?Sized> {
    client: &'a C,
    subject: String,
    state: SubjectState,
    failure: Option<String>,
    versions: IndexMap<String, VersionOutcome>,
    attempted: HashSet<i64>,
}

impl<'a, C: RegistryClient + ?Sized> SubjectImport<'a, C> {
    pub fn new(client: &'a C, subject: &QualifiedSubject) -> Self {
        Self {
            client,
            subject: subject.to_string(),
            state: SubjectState::ReadWrite,
            failure: None,
            versions: IndexMap::new(),
            attempted: HashSet::new(),
        }
    }

    pub fn state(&self) -> SubjectState {
        self.state
    }

    /// `ReadWrite` → `Import`, or `FailedToEnterImport` if the registry refuses
    pub fn enter_import(&mut self) -> Result<SubjectState> {
        self.require_state(&[SubjectState::ReadWrite], SubjectState::Import)?;
        match self.client.set_mode(&self.subject, Mode::Import) {
            Ok(()) => {
                info!(subject = %self.subject, "subject is in IMPORT mode");
                self.state = SubjectState::Import;
            }
            Err(e) => {
                error!(subject = %self.subject, error = %e, "failed to put subject into IMPORT mode");
                self.failure = Some(e.to_string());
                self.state = SubjectState::FailedToEnterImport;
            }
        }
        Ok(self.state)
    }

    /// `Import` → `Replaying`, registering every file in the given order
    pub fn replay(&mut self, files: &[PathBuf]) -> Result<SubjectState> {
        self.require_state(&[SubjectState::Import], SubjectState::Replaying)?;
        self.state = SubjectState::Replaying;
        for file in files {
            self.replay_file(file);
        }
        Ok(self.state)
    }

    /// `Import`/`Replaying` → `Restored`, or `StrandedInImport` if the
    /// registry refuses to go back to READWRITE
    pub fn restore(&mut self) -> Result<SubjectState> {
        self.require_state(
            &[SubjectState::Import, SubjectState::Replaying],
            SubjectState::Restored,
        )?;
        match self.client.set_mode(&self.subject, Mode::ReadWrite) {
            Ok(()) => {
                info!(subject = %self.subject, "subject restored to READWRITE mode");
                self.state = SubjectState::Restored;
            }
            Err(e) => {
                warn!(
                    subject = %self.subject,
                    error = %e,
                    "subject LEFT IN IMPORT MODE, set it back to READWRITE manually"
                );
                self.state = SubjectState::StrandedInImport;
            }
        }
        Ok(self.state)
    }

    /// Collapse the session into its reported outcome
    pub fn finish(self) -> SubjectOutcome {
        match self.state {
            SubjectState::ReadWrite | SubjectState::FailedToEnterImport => SubjectOutcome::Failed {
                reason: self
                    .failure
                    .unwrap_or_else(|| "import mode was never entered".to_string()),
            },
            SubjectState::Restored => SubjectOutcome::Replayed {
                versions: self.versions,
                restored: true,
            },
            SubjectState::Import | SubjectState::Replaying | SubjectState::StrandedInImport => {
                SubjectOutcome::Replayed {
                    versions: self.versions,
                    restored: false,
                }
            }
        }
    }

    fn require_state(&self, from: &[SubjectState], to: SubjectState) -> Result<()> {
        if from.contains(&self.state) {
            Ok(())
        } else {
            Err(MigrateError::InvalidTransition {
                subject: self.subject.clone(),
                from: self.state.name(),
                to: to.name(),
            })
        }
    }

    fn replay_file(&mut self, path: &Path) {
        let version_file = match VersionFile::load(path) {
            Ok(file) => file,
            Err(e) => {
                warn!(subject = %self.subject, file = %path.display(), error = %e, "skipping unreadable version file");
                self.record_local_failure(path, e.to_string());
                return;
            }
        };

        let version = version_file.version();
        if !self.attempted.insert(version) {
            warn!(subject = %self.subject, version, file = %path.display(), "duplicate version, not sent");
            self.record_local_failure(path, format!("duplicate version {version}"));
            return;
        }

        let outcome = match self.client.register_version(&self.subject, version_file.payload()) {
            Ok(()) => {
                debug!(subject = %self.subject, version, "registered version");
                VersionOutcome::Imported
            }
            Err(MigrateError::Rejected { status, body }) => {
                warn!(subject = %self.subject, version, status, "registry rejected version");
                VersionOutcome::Rejected { status, body }
            }
            Err(e) => {
                warn!(subject = %self.subject, version, error = %e, "failed to register version");
                VersionOutcome::Failed { reason: e.to_string() }
            }
        };
        self.versions.insert(version.to_string(), outcome);
    }

    /// Record a failure for a file that was never sent. The key is the file
    /// name, or `file:<name>` when the name alone would read as a version.
    fn record_local_failure(&mut self, path: &Path, reason: String) {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let key = if name.parse::<i64>().is_ok() {
            format!("file:{name}")
        } else {
            name
        };
        self.versions.insert(key, VersionOutcome::Failed { reason });
    }
}

/// Drives subjects one at a time through [`SubjectImport`]
pub struct SubjectImporter<'a, C: RegistryClient + ?Sized> {
    client: &'a C,
}

impl<'a, C: RegistryClient + ?Sized> SubjectImporter<'a, C> {
    pub fn new(client: &'a C) -> Self {
        Self { client }
    }

    /// Run the full enter → replay → restore sequence for one subject.
    /// Every failure is folded into the returned outcome.
    pub fn import(&self, subject: &QualifiedSubject, path: &SubjectPath) -> SubjectOutcome {
        let mut session = SubjectImport::new(self.client, subject);
        if let Err(e) = drive(&mut session, path.files()) {
            error!(subject = %subject, error = %e, "subject import aborted");
        }
        session.finish()
    }
}

fn drive<C: RegistryClient + ?Sized>(session: &mut SubjectImport<'_, C>, files: &[PathBuf]) -> Result<()> {
    if session.enter_import()? != SubjectState::Import {
        return Ok(());
    }
    session.replay(files)?;
    session.restore()?;
    Ok(())
}
