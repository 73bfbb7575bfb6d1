//! Redaction integrity: redaction-style annotations cross-checked against
//! whether the page still yields extractable text.
//!
//! Known ambiguity: this check depends on the document reader returning
//! selectable text under a redaction's bounds. A reader that strips
//! redacted text at the model level makes recoverability unverifiable, so
//! the unconfirmed case is reported as such instead of being resolved
//! silently.

use serde::{Deserialize, Serialize};

use crate::types::Annotation;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedactionIssue {
    pub page: usize,
    /// Text is still extractable where a redaction mark sits
    pub recoverable: bool,
    pub description: String,
}

fn is_redaction_mark(annot: &Annotation) -> bool {
    if annot.subtype.eq_ignore_ascii_case("Redact") {
        return true;
    }
    // Black-filled squares over content are visually consistent with a
    // redaction mark
    annot.subtype.eq_ignore_ascii_case("Square")
        && annot
            .color
            .map(|c| c.iter().all(|v| *v <= 0.05))
            .unwrap_or(false)
}

/// Detects redaction marks per page and classifies their integrity
pub fn detect(page_annotations: &[Vec<Annotation>], page_texts: &[String]) -> Vec<RedactionIssue> {
    let mut issues = Vec::new();
    for (page, annots) in page_annotations.iter().enumerate() {
        let marks = annots.iter().filter(|a| is_redaction_mark(a)).count();
        if marks == 0 {
            continue;
        }
        let text_present = page_texts
            .get(page)
            .map(|t| !t.trim().is_empty())
            .unwrap_or(false);
        if text_present {
            issues.push(RedactionIssue {
                page,
                recoverable: true,
                description: format!(
                    "{} redaction mark(s) but the page still yields extractable text; \
                     content is recoverable",
                    marks
                ),
            });
        } else {
            issues.push(RedactionIssue {
                page,
                recoverable: false,
                description: format!(
                    "{} redaction mark(s); no extractable text returned by the reader, \
                     recoverability could not be confirmed",
                    marks
                ),
            });
        }
    }
    issues
}
