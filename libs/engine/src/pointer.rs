//! Data pointers: a selection target plus an RFC 6901 JSON Pointer.
//!
//! The string form is `target:path`. The target is either one of the
//! built-ins (`$in` for the input document, `$context` for the evaluation
//! context) or a stylesheet-defined prefix that the engine expands until a
//! built-in is reached. A pointer with no target selects from the input.

use std::fmt;

use crate::error::ApplyError;

/// Targets a pointer may resolve to without further prefix expansion.
pub const RESOLVED_TARGETS: [&str; 2] = ["$in", "$context"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPointer {
    pub target: Option<String>,
    pub path: String,
}

impl DataPointer {
    /// Parse a non-empty pointer string. At most one `:` may appear.
    pub fn parse(strrep: &str) -> Result<Self, ApplyError> {
        let trimmed = strrep.trim();
        if trimmed.is_empty() {
            return Err(ApplyError::Pointer {
                select: strrep.to_string(),
                reason: "format error (empty string)".to_string(),
            });
        }
        let mut parts = trimmed.split(':');
        let first = parts.next().unwrap_or_default();
        match (parts.next(), parts.next()) {
            (None, _) => Ok(Self {
                target: None,
                path: first.to_string(),
            }),
            (Some(path), None) => Ok(Self {
                target: (!first.is_empty()).then(|| first.to_string()),
                path: path.to_string(),
            }),
            (Some(_), Some(_)) => Err(ApplyError::Pointer {
                select: strrep.to_string(),
                reason: "format error (too many ':')".to_string(),
            }),
        }
    }

    /// Like [`DataPointer::parse`], but an empty string selects the whole
    /// input document.
    pub fn new(strrep: &str) -> Result<Self, ApplyError> {
        if strrep.trim().is_empty() {
            return Ok(Self {
                target: None,
                path: String::new(),
            });
        }
        Self::parse(strrep)
    }

    /// Whether the target needs no further prefix expansion.
    pub fn is_resolved(&self) -> bool {
        match &self.target {
            Some(t) => RESOLVED_TARGETS.contains(&t.as_str()),
            None => false,
        }
    }
}

impl fmt::Display for DataPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(target) = &self.target {
            write!(f, "{target}:")?;
        }
        write!(f, "{}", self.path)
    }
}

/// Whether a directive string should be read as a data pointer rather than a
/// transform name: empty, rooted at `/`, or carrying a target.
pub(crate) fn looks_like_pointer(s: &str) -> bool {
    s.is_empty() || s.starts_with('/') || s.contains(':')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_without_target() {
        let p = DataPointer::parse("/contact/name").unwrap();
        assert_eq!(p.target, None);
        assert_eq!(p.path, "/contact/name");
        assert_eq!(p.to_string(), "/contact/name");
    }

    #[test]
    fn test_parse_with_target() {
        let p = DataPointer::parse("$context:/answers/0").unwrap();
        assert_eq!(p.target.as_deref(), Some("$context"));
        assert_eq!(p.path, "/answers/0");
        assert!(p.is_resolved());
        assert_eq!(p.to_string(), "$context:/answers/0");
    }

    #[test]
    fn test_parse_bare_target() {
        let p = DataPointer::parse("$in:").unwrap();
        assert_eq!(p.target.as_deref(), Some("$in"));
        assert_eq!(p.path, "");
    }

    #[test]
    fn test_parse_prefix_target() {
        let p = DataPointer::parse("curation:/contact").unwrap();
        assert_eq!(p.target.as_deref(), Some("curation"));
        assert!(!p.is_resolved());
    }

    #[test]
    fn test_parse_errors() {
        assert!(DataPointer::parse("").is_err());
        assert!(DataPointer::parse("  ").is_err());
        assert!(DataPointer::parse("a:b:c").is_err());
    }

    #[test]
    fn test_new_accepts_empty() {
        let p = DataPointer::new("").unwrap();
        assert_eq!(p.target, None);
        assert_eq!(p.path, "");
    }

    #[test]
    fn test_looks_like_pointer() {
        assert!(looks_like_pointer(""));
        assert!(looks_like_pointer("/a/b"));
        assert!(looks_like_pointer("$in:"));
        assert!(!looks_like_pointer("tostr"));
        assert!(!looks_like_pointer("xml.attribute"));
    }
}
