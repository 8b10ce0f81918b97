//! In-memory registry for tests
//!
//! [`MockRegistry`] stores subjects and versions in memory, records every
//! call it receives and can be scripted to refuse mode changes or reject
//! specific versions.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};

use serde_json::Value;

use crate::client::{Mode, RegistryClient};
use crate::error::{MigrateError, Result};

/// One call received by the mock
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    ListSubjects,
    ListContexts,
    SetMode { subject: String, mode: Mode },
    Register { subject: String, payload: Value },
    ListVersions(String),
    GetVersion(String, i64),
}

impl Call {
    /// Whether this call changes registry state
    pub fn is_mutation(&self) -> bool {
        matches!(self, Call::SetMode { .. } | Call::Register { .. })
    }
}

/// Scriptable in-memory registry
#[derive(Debug, Default)]
pub struct MockRegistry {
    subjects: RefCell<BTreeMap<String, BTreeMap<i64, Value>>>,
    contexts: Vec<String>,
    unreachable: bool,
    refused_modes: HashSet<(String, Mode)>,
    rejected_versions: HashMap<(String, i64), (u16, String)>,
    calls: RefCell<Vec<Call>>,
}

impl MockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-existing subjects with no versions
    pub fn with_subjects(self, names: &[&str]) -> Self {
        {
            let mut subjects = self.subjects.borrow_mut();
            for name in names {
                subjects.entry(name.to_string()).or_default();
            }
        }
        self
    }

    /// Pre-existing contexts, in registry-native form (`.team-a`)
    pub fn with_contexts(mut self, contexts: &[&str]) -> Self {
        self.contexts = contexts.iter().map(|c| c.to_string()).collect();
        self
    }

    /// A stored version payload, as an export source would hold it
    pub fn with_version(self, subject: &str, version: i64, payload: Value) -> Self {
        self.subjects
            .borrow_mut()
            .entry(subject.to_string())
            .or_default()
            .insert(version, payload);
        self
    }

    /// Every call fails with a transport error
    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    /// Refuse switching `subject` into `mode`
    pub fn refuse_mode(mut self, subject: &str, mode: Mode) -> Self {
        self.refused_modes.insert((subject.to_string(), mode));
        self
    }

    /// Reject registration of one version with the given status and body
    pub fn reject_version(mut self, subject: &str, version: i64, status: u16, body: &str) -> Self {
        self.rejected_versions
            .insert((subject.to_string(), version), (status, body.to_string()));
        self
    }

    /// All calls received so far, in order
    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    /// Calls that would have changed a real registry
    pub fn mutations(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_mutation).collect()
    }

    /// Versions currently stored for a subject
    pub fn stored_versions(&self, subject: &str) -> Vec<i64> {
        self.subjects
            .borrow()
            .get(subject)
            .map(|versions| versions.keys().copied().collect())
            .unwrap_or_default()
    }

    fn record(&self, call: Call) -> Result<()> {
        self.calls.borrow_mut().push(call);
        if self.unreachable {
            return Err(MigrateError::Transport("connection refused".to_string()));
        }
        Ok(())
    }
}

impl RegistryClient for MockRegistry {
    fn list_subjects(&self) -> Result<Vec<String>> {
        self.record(Call::ListSubjects)?;
        Ok(self.subjects.borrow().keys().cloned().collect())
    }

    fn list_contexts(&self) -> Result<Vec<String>> {
        self.record(Call::ListContexts)?;
        Ok(self.contexts.clone())
    }

    fn set_mode(&self, subject: &str, mode: Mode) -> Result<()> {
        self.record(Call::SetMode {
            subject: subject.to_string(),
            mode,
        })?;
        if self.refused_modes.contains(&(subject.to_string(), mode)) {
            return Err(MigrateError::Rejected {
                status: 422,
                body: r#"{"error_code":42205,"message":"Invalid mode"}"#.to_string(),
            });
        }
        Ok(())
    }

    fn register_version(&self, subject: &str, payload: &Value) -> Result<()> {
        self.record(Call::Register {
            subject: subject.to_string(),
            payload: payload.clone(),
        })?;
        let version = payload.get("version").and_then(Value::as_i64).unwrap_or_default();
        if let Some((status, body)) = self.rejected_versions.get(&(subject.to_string(), version)) {
            return Err(MigrateError::Rejected {
                status: *status,
                body: body.clone(),
            });
        }
        self.subjects
            .borrow_mut()
            .entry(subject.to_string())
            .or_default()
            .insert(version, payload.clone());
        Ok(())
    }

    fn list_versions(&self, subject: &str) -> Result<Vec<i64>> {
        self.record(Call::ListVersions(subject.to_string()))?;
        self.subjects
            .borrow()
            .get(subject)
            .map(|versions| versions.keys().copied().collect())
            .ok_or_else(|| not_found(subject))
    }

    fn get_version(&self, subject: &str, version: i64) -> Result<Value> {
        self.record(Call::GetVersion(subject.to_string(), version))?;
        self.subjects
            .borrow()
            .get(subject)
            .and_then(|versions| versions.get(&version))
            .cloned()
            .ok_or_else(|| not_found(subject))
    }
}

fn not_found(subject: &str) -> MigrateError {
    MigrateError::Rejected {
        status: 404,
        body: format!(r#"{{"error_code":40401,"message":"Subject '{subject}' not found."}}"#),
    }
}
