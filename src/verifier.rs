//! Pre-import collision checks
//!
//! Reads the target registry's subject and context lists and refuses the run
//! when importing could overwrite or merge into live data. Nothing here
//! mutates the registry.

use std::collections::HashSet;

use tracing::info;

use crate::client::RegistryClient;
use crate::context::{NamingContext, QualifiedSubject};
use crate::error::{MigrateError, Result};

/// Read-only gatekeeper run before any subject is touched
pub struct CollisionVerifier<'a, C: RegistryClient + ?Sized> {
    client: &'a C,
}

impl<'a, C: RegistryClient + ?Sized> CollisionVerifier<'a, C> {
    pub fn new(client: &'a C) -> Self {
        Self { client }
    }

    /// Clear `planned` for import, or explain why not.
    ///
    /// With an import context, that context must not exist yet on the target
    /// and no planned name may already be registered. Without one, the
    /// target must hold no subjects at all. A default (empty) context counts
    /// as no context.
    pub fn verify<'s>(
        &self,
        planned: impl IntoIterator<Item = &'s QualifiedSubject>,
        import_context: Option<&NamingContext>,
    ) -> Result<()> {
        let existing = self.client.list_subjects()?;

        match import_context.filter(|c| !c.is_default()) {
            Some(context) => {
                let wanted = context.dotted();
                let contexts = self.client.list_contexts()?;
                if contexts.iter().any(|c| c.trim_start_matches('.') == wanted) {
                    return Err(MigrateError::ContextExists(wanted));
                }

                let existing: HashSet<&str> = existing.iter().map(String::as_str).collect();
                let overlapping: Vec<String> = planned
                    .into_iter()
                    .map(|s| s.to_string())
                    .filter(|s| existing.contains(s.as_str()))
                    .collect();
                if !overlapping.is_empty() {
                    return Err(MigrateError::SubjectsExist(overlapping));
                }
                info!(context = %context, "import context is free on target");
            }
            None => {
                if !existing.is_empty() {
                    return Err(MigrateError::TargetNotEmpty {
                        count: existing.len(),
                    });
                }
                info!("target registry has no subjects");
            }
        }
        Ok(())
    }
}
