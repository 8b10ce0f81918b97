//! Schema Registry Migrator
//!
//! Moves subjects between schema registry instances. Export walks a source
//! registry and writes every version of every subject to a directory tree;
//! import replays such a tree into a target registry without overwriting
//! anything already there.
//!
//! ## Import tree
//!
//! ```text
//! export/
//! ├── orders-value/
//! │   ├── 000001.json
//! │   └── 000002.json
//! └── contexts/
//!     └── team-a/
//!         └── invoice/
//!             └── 000001.json        -> :.team-a:invoice
//! ```
//!
//! ## Import sequence
//!
//! 1. [`PathResolver`] derives a qualified subject name per directory.
//! 2. [`CollisionVerifier`] checks the target's subjects and contexts.
//! 3. [`SubjectImporter`] puts each subject in IMPORT mode, replays its
//!    versions in file-name order and restores READWRITE.
//! 4. [`ImportRun`] ties these together and returns a [`RunReport`].

pub mod checksum;
pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod export;
pub mod importer;
pub mod report;
pub mod resolver;
pub mod run;
pub mod testing;
pub mod verifier;
pub mod version_file;

pub use client::{HttpRegistryClient, Mode, RegistryClient};
pub use config::MigratorConfig;
pub use context::{NamingContext, QualifiedSubject};
pub use error::{MigrateError, Result};
pub use export::{ExportSummary, Exporter};
pub use importer::{SubjectImport, SubjectImporter, SubjectState};
pub use report::{RunReport, SubjectOutcome, VersionOutcome};
pub use resolver::{PathResolver, ResolvedTree, SubjectPath};
pub use run::{ImportOptions, ImportRun};
pub use verifier::CollisionVerifier;
pub use version_file::VersionFile;
