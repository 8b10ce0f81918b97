//! Naming contexts and registry-qualified subject names
//!
//! A subject living in a non-default context travels on the wire as
//! `:.<seg>.<seg>:<base>`. Subjects in the default context are just `<base>`.
//!
//! ```text
//! import-root/
//! ├── orders-value/1.json                     -> orders-value
//! └── contexts/
//!     └── team-a/
//!         └── billing/
//!             └── invoice/3.json              -> :.team-a.billing:invoice
//! ```

use std::fmt;
use std::path::PathBuf;

use crate::error::{MigrateError, Result};

/// Directory name that introduces context segments in an import tree
pub const CONTEXTS_MARKER: &str = "contexts";

/// Hierarchical namespace a subject lives in. Empty means the default context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NamingContext {
    segments: Vec<String>,
}

impl NamingContext {
    /// Parse a dotted context string such as `team-a.billing` or the
    /// registry-native `.team-a.billing`. Empty segments are ignored, so
    /// `"."` and `""` both parse to the default context.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut context = Self::default();
        for segment in raw.split('.').filter(|s| !s.is_empty()) {
            context.push(segment)?;
        }
        Ok(context)
    }

    /// Append one segment, rejecting anything that would corrupt the wire form
    pub fn push(&mut self, segment: &str) -> Result<()> {
        validate_segment(segment)?;
        self.segments.push(segment.to_string());
        Ok(())
    }

    /// This context followed by all of `other`'s segments
    pub fn join(&self, other: &NamingContext) -> NamingContext {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        Self { segments }
    }

    pub fn is_default(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Dot-joined segments without the leading dot (`team-a.billing`)
    pub fn dotted(&self) -> String {
        self.segments.join(".")
    }

    /// Qualify a base subject name with this context
    pub fn qualify(&self, base: impl Into<String>) -> QualifiedSubject {
        QualifiedSubject {
            context: self.clone(),
            base: base.into(),
        }
    }
}

impl fmt::Display for NamingContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ".{}", self.dotted())
    }
}

fn validate_segment(segment: &str) -> Result<()> {
    let reason = if segment.is_empty() {
        "segment is empty"
    } else if segment.contains(':') {
        "':' separates context from subject"
    } else if segment.contains('.') {
        "'.' separates context segments"
    } else if segment.contains('/') || segment.contains('\\') {
        "path separators are not allowed"
    } else {
        return Ok(());
    };
    Err(MigrateError::InvalidContext {
        segment: segment.to_string(),
        reason: reason.to_string(),
    })
}

/// A subject name as the registry sees it on the wire
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QualifiedSubject {
    context: NamingContext,
    base: String,
}

impl QualifiedSubject {
    /// Parse a wire-form subject name. Names without the `:.` prefix live in
    /// the default context.
    pub fn parse(wire: &str) -> Result<Self> {
        let Some(rest) = wire.strip_prefix(":.") else {
            return Ok(NamingContext::default().qualify(wire));
        };
        match rest.split_once(':') {
            Some((dotted, base)) => Ok(NamingContext::parse(dotted)?.qualify(base)),
            None => Err(MigrateError::InvalidContext {
                segment: wire.to_string(),
                reason: "missing ':' after context".to_string(),
            }),
        }
    }

    pub fn context(&self) -> &NamingContext {
        &self.context
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// Directory, relative to an export root, that holds this subject's
    /// version files
    pub fn relative_dir(&self) -> PathBuf {
        let mut dir = PathBuf::new();
        if !self.context.is_default() {
            dir.push(CONTEXTS_MARKER);
            for segment in self.context.segments() {
                dir.push(segment);
            }
        }
        dir.push(&self.base);
        dir
    }
}

impl fmt::Display for QualifiedSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.context.is_default() {
            write!(f, "{}", self.base)
        } else {
            write!(f, ":{}:{}", self.context, self.base)
        }
    }
}
