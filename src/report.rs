//! Import results
//!
//! The report serializes to the nested shape operators inspect after a run:
//!
//! ```json
//! {
//!   "orders-value": { "1": "IMPORTED", "2": {"error_code": 409, "message": "..."} },
//!   ":.team-a:billing": { "*": "FAILED" }
//! }
//! ```

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;

/// Key used for a subject that never entered IMPORT mode
pub const FAILED_SUBJECT_KEY: &str = "*";
const IMPORTED: &str = "IMPORTED";
const FAILED: &str = "FAILED";

/// What happened to one version file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionOutcome {
    /// The registry accepted the version
    Imported,
    /// The registry refused the version; `body` is its raw response
    Rejected { status: u16, body: String },
    /// The version never reached the registry or the call itself failed
    Failed { reason: String },
}

impl VersionOutcome {
    pub fn is_imported(&self) -> bool {
        matches!(self, VersionOutcome::Imported)
    }
}

impl Serialize for VersionOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            VersionOutcome::Imported => serializer.serialize_str(IMPORTED),
            VersionOutcome::Rejected { body, .. } => match serde_json::from_str::<Value>(body) {
                Ok(json) => json.serialize(serializer),
                Err(_) => serializer.serialize_str(body),
            },
            VersionOutcome::Failed { reason } => serializer.serialize_str(reason),
        }
    }
}

/// What happened to one subject
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubjectOutcome {
    /// The subject could not be put into IMPORT mode; nothing was sent
    Failed { reason: String },
    /// Versions were replayed. `restored` is false when the subject was left
    /// in IMPORT mode.
    Replayed {
        versions: IndexMap<String, VersionOutcome>,
        restored: bool,
    },
}

impl SubjectOutcome {
    /// Subject is still in IMPORT mode on the target
    pub fn is_stranded(&self) -> bool {
        matches!(self, SubjectOutcome::Replayed { restored: false, .. })
    }
}

impl Serialize for SubjectOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SubjectOutcome::Failed { .. } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(FAILED_SUBJECT_KEY, FAILED)?;
                map.end()
            }
            SubjectOutcome::Replayed { versions, .. } => versions.serialize(serializer),
        }
    }
}

/// Consolidated result of one import run
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct RunReport {
    subjects: IndexMap<String, SubjectOutcome>,
    #[serde(skip)]
    started_at: DateTime<Utc>,
    #[serde(skip)]
    finished_at: Option<DateTime<Utc>>,
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}

impl RunReport {
    pub fn new() -> Self {
        Self {
            subjects: IndexMap::new(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn record(&mut self, subject: impl Into<String>, outcome: SubjectOutcome) {
        self.subjects.insert(subject.into(), outcome);
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn get(&self, subject: &str) -> Option<&SubjectOutcome> {
        self.subjects.get(subject)
    }

    pub fn subjects(&self) -> impl Iterator<Item = (&str, &SubjectOutcome)> {
        self.subjects.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Subjects left in IMPORT mode that need manual remediation
    pub fn stranded(&self) -> Vec<&str> {
        self.subjects()
            .filter(|(_, outcome)| outcome.is_stranded())
            .map(|(subject, _)| subject)
            .collect()
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    pub fn summary(&self) -> ReportSummary {
        let mut summary = ReportSummary {
            started_at: self.started_at,
            finished_at: self.finished_at,
            ..ReportSummary::default()
        };
        for outcome in self.subjects.values() {
            summary.subjects += 1;
            match outcome {
                SubjectOutcome::Failed { .. } => summary.failed_subjects += 1,
                SubjectOutcome::Replayed { versions, restored } => {
                    if !restored {
                        summary.stranded_subjects += 1;
                    }
                    for version in versions.values() {
                        if version.is_imported() {
                            summary.imported_versions += 1;
                        } else {
                            summary.failed_versions += 1;
                        }
                    }
                }
            }
        }
        summary
    }
}

/// Counts over a run, for logs and the CLI footer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub subjects: usize,
    pub failed_subjects: usize,
    pub stranded_subjects: usize,
    pub imported_versions: usize,
    pub failed_versions: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl ReportSummary {
    pub fn elapsed_ms(&self) -> Option<i64> {
        self.finished_at
            .map(|end| (end - self.started_at).num_milliseconds())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn replayed(entries: &[(&str, VersionOutcome)], restored: bool) -> SubjectOutcome {
        SubjectOutcome::Replayed {
            versions: entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
            restored,
        }
    }

    #[test]
    fn test_report_shape() {
        let mut report = RunReport::new();
        report.record("foo", replayed(&[("1", VersionOutcome::Imported)], true));
        report.record(
            ":.team-a:bar",
            SubjectOutcome::Failed {
                reason: "mode refused".to_string(),
            },
        );

        assert_eq!(
            report.to_json(),
            json!({
                "foo": { "1": "IMPORTED" },
                ":.team-a:bar": { "*": "FAILED" }
            })
        );
    }

    #[test]
    fn test_rejection_body_is_verbatim() {
        let json_body = VersionOutcome::Rejected {
            status: 409,
            body: r#"{"error_code":409,"message":"incompatible"}"#.to_string(),
        };
        assert_eq!(
            serde_json::to_value(&json_body).unwrap(),
            json!({"error_code": 409, "message": "incompatible"})
        );

        let text_body = VersionOutcome::Rejected {
            status: 500,
            body: "Internal Server Error".to_string(),
        };
        assert_eq!(serde_json::to_value(&text_body).unwrap(), json!("Internal Server Error"));
    }

    #[test]
    fn test_replay_order_is_preserved() {
        let mut report = RunReport::new();
        report.record(
            "foo",
            replayed(
                &[
                    ("2", VersionOutcome::Imported),
                    ("10", VersionOutcome::Imported),
                ],
                true,
            ),
        );
        let text = serde_json::to_string(&report).unwrap();
        assert_eq!(text, r#"{"foo":{"2":"IMPORTED","10":"IMPORTED"}}"#);
    }

    #[test]
    fn test_summary_and_stranded() {
        let mut report = RunReport::new();
        report.record(
            "a",
            replayed(
                &[
                    ("1", VersionOutcome::Imported),
                    (
                        "2",
                        VersionOutcome::Failed {
                            reason: "bad file".to_string(),
                        },
                    ),
                ],
                false,
            ),
        );
        report.record(
            "b",
            SubjectOutcome::Failed {
                reason: "mode refused".to_string(),
            },
        );
        report.finish();

        let summary = report.summary();
        assert_eq!(summary.subjects, 2);
        assert_eq!(summary.failed_subjects, 1);
        assert_eq!(summary.stranded_subjects, 1);
        assert_eq!(summary.imported_versions, 1);
        assert_eq!(summary.failed_versions, 1);
        assert!(summary.elapsed_ms().is_some());
        assert_eq!(report.stranded(), vec!["a"]);
    }
}
