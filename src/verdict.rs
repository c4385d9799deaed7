//! Verdict extraction from the Critic's output.
//!
//! The Critic signals its judgment with an inline tag:
//! - `#APPROVED` — the output passes
//! - `#REVISION_REQUIRED` — the Storyteller should revise; the surrounding
//!   text is the feedback
//!
//! Anything else (including `#REJECTED` and untagged text) yields
//! `NoVerdict`, which routes the session to manual review.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

static APPROVED_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#APPROVED\b").unwrap());

static REVISION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#REVISION_REQUIRED\b").unwrap());

/// The Critic's categorical judgment on an Output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Verdict {
    Approved,
    NeedsRevision { feedback: String },
    /// The critic failed to produce a usable tag.
    NoVerdict,
}

impl Verdict {
    /// Extract a verdict from the critic's raw text.
    ///
    /// `#REVISION_REQUIRED` takes precedence over `#APPROVED` when both
    /// appear, matching the original review handler's check order. For a
    /// revision verdict the full critic text is carried as feedback — the
    /// scores and summary around the tag are the actionable part.
    pub fn parse(text: &str) -> Verdict {
        if REVISION_REGEX.is_match(text) {
            return Verdict::NeedsRevision {
                feedback: text.trim().to_string(),
            };
        }
        if APPROVED_REGEX.is_match(text) {
            return Verdict::Approved;
        }
        Verdict::NoVerdict
    }

    pub fn is_approved(&self) -> bool {
        matches!(self, Verdict::Approved)
    }

    pub fn is_usable(&self) -> bool {
        !matches!(self, Verdict::NoVerdict)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Approved => write!(f, "approved"),
            Verdict::NeedsRevision { .. } => write!(f, "needs revision"),
            Verdict::NoVerdict => write!(f, "no verdict"),
        }
    }
}

/// One entry in a session's verdict trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerdictRecord {
    /// Revision of the output this verdict applies to.
    pub revision: u32,
    pub verdict: Verdict,
    pub at: DateTime<Utc>,
}

impl VerdictRecord {
    pub fn new(revision: u32, verdict: Verdict) -> Self {
        Self {
            revision,
            verdict,
            at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_approved() {
        let text = "Goal Coverage: 9/10\nLanguage Clarity: 9/10\nCreativity: 8/10\n\n\
                    The story covers the goal well.\n\n#APPROVED";
        assert_eq!(Verdict::parse(text), Verdict::Approved);
    }

    #[test]
    fn test_parse_revision_required_carries_text() {
        let text = "Goal Coverage: 6/10\n\nThe ending is rushed.\n\n#REVISION_REQUIRED";
        match Verdict::parse(text) {
            Verdict::NeedsRevision { feedback } => {
                assert!(feedback.contains("ending is rushed"));
                assert!(feedback.contains("#REVISION_REQUIRED"));
            }
            other => panic!("Expected NeedsRevision, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_revision_takes_precedence_over_approved() {
        // A confused critic emitting both tags still requests revision.
        let text = "#APPROVED overall, but #REVISION_REQUIRED for the intro";
        assert!(matches!(
            Verdict::parse(text),
            Verdict::NeedsRevision { .. }
        ));
    }

    #[test]
    fn test_parse_rejected_is_no_verdict() {
        // #REJECTED has no automated transition; it falls to manual review.
        assert_eq!(
            Verdict::parse("Major issues throughout.\n\n#REJECTED"),
            Verdict::NoVerdict
        );
    }

    #[test]
    fn test_parse_untagged_is_no_verdict() {
        assert_eq!(Verdict::parse("Looks fine to me!"), Verdict::NoVerdict);
        assert_eq!(Verdict::parse(""), Verdict::NoVerdict);
    }

    #[test]
    fn test_tag_must_be_a_word_boundary() {
        // #APPROVEDX is not the approval tag.
        assert_eq!(Verdict::parse("#APPROVEDX"), Verdict::NoVerdict);
    }

    #[test]
    fn test_is_usable() {
        assert!(Verdict::Approved.is_usable());
        assert!(Verdict::NeedsRevision { feedback: "x".into() }.is_usable());
        assert!(!Verdict::NoVerdict.is_usable());
    }

    #[test]
    fn test_verdict_serde_roundtrip() {
        let v = Verdict::NeedsRevision {
            feedback: "more detail".to_string(),
        };
        let json = serde_json::to_string(&v).unwrap();
        let parsed: Verdict = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, v);
    }

    #[test]
    fn test_verdict_record_keeps_revision() {
        let rec = VerdictRecord::new(2, Verdict::Approved);
        assert_eq!(rec.revision, 2);
        assert!(rec.verdict.is_approved());
    }
}
