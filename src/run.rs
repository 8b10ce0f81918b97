//! Import run orchestration
//!
//! resolve → verify → import each subject, sequentially. Everything that can
//! fail before the first mutation fails the whole run; everything after is
//! captured in the [`RunReport`].

use std::path::PathBuf;

use tracing::info;

use crate::client::RegistryClient;
use crate::context::NamingContext;
use crate::error::Result;
use crate::importer::SubjectImporter;
use crate::report::RunReport;
use crate::resolver::{PathResolver, ResolvedTree};
use crate::verifier::CollisionVerifier;

/// Inputs for one import run
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Root of the exported tree
    pub root: PathBuf,
    /// Context every imported subject is placed under
    pub context: Option<NamingContext>,
}

impl ImportOptions {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            context: None,
        }
    }

    pub fn with_context(mut self, context: NamingContext) -> Self {
        self.context = Some(context);
        self
    }
}

/// One import of a directory tree into a target registry
pub struct ImportRun<'a, C: RegistryClient + ?Sized> {
    client: &'a C,
    options: ImportOptions,
}

impl<'a, C: RegistryClient + ?Sized> ImportRun<'a, C> {
    pub fn new(client: &'a C, options: ImportOptions) -> Self {
        Self { client, options }
    }

    /// Resolve the tree and clear it against the target. Read-only.
    pub fn plan(&self) -> Result<ResolvedTree> {
        let root_context = self.options.context.clone().unwrap_or_default();
        let tree = PathResolver::new(&self.options.root, root_context).resolve()?;
        info!(
            root = %self.options.root.display(),
            subjects = tree.len(),
            "resolved import tree"
        );

        CollisionVerifier::new(self.client).verify(tree.subjects(), self.options.context.as_ref())?;
        Ok(tree)
    }

    /// Plan, then import every subject. Returns `Err` only for failures that
    /// happen before any subject is touched.
    pub fn execute(&self) -> Result<RunReport> {
        let tree = self.plan()?;
        let importer = SubjectImporter::new(self.client);

        let mut report = RunReport::new();
        for (subject, path) in tree.iter() {
            info!(%subject, versions = path.files().len(), "importing subject");
            report.record(subject.to_string(), importer.import(subject, path));
        }
        report.finish();

        let summary = report.summary();
        info!(
            subjects = summary.subjects,
            imported = summary.imported_versions,
            failed_versions = summary.failed_versions,
            failed_subjects = summary.failed_subjects,
            stranded = summary.stranded_subjects,
            "import finished"
        );
        Ok(report)
    }
}
