//! Suspicious-element detection: active content markers, orphaned
//! objects, and creator/producer tool-family mismatches.

use serde::{Deserialize, Serialize};

use crate::extract::bytes::{defined_object_numbers, referenced_object_numbers};
use crate::types::PdfMetadata;

/// Objects that are legitimately never referenced by another object
/// (the catalog reached only through the trailer).
const ALWAYS_UNREFERENCED: usize = 1;

/// Tool families recognized in Creator/Producer strings
const TOOL_FAMILIES: &[&str] = &[
    "microsoft", "word", "excel", "powerpoint", "acrobat", "adobe", "indesign", "libreoffice",
    "openoffice", "latex", "pdflatex", "xetex", "ghostscript", "itext", "pdftk", "quartz", "skia",
    "chromium", "chrome", "prince", "wkhtmltopdf", "reportlab", "fpdf",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SuspiciousElements {
    pub javascript: bool,
    pub launch_action: bool,
    pub orphaned_objects: usize,
    /// Set when Creator and Producer name different tool families
    pub tool_mismatch: Option<String>,
}

/// Scans for suspicious elements; empty/default on a clean document
pub fn detect(bytes: &[u8], metadata: &PdfMetadata) -> SuspiciousElements {
    SuspiciousElements {
        javascript: metadata.has_javascript,
        launch_action: metadata.has_launch_action,
        orphaned_objects: orphaned_object_count(bytes),
        tool_mismatch: tool_family_mismatch(
            metadata.creator.as_deref(),
            metadata.producer.as_deref(),
        ),
    }
}

/// Objects defined by `N M obj` but never referenced by `N M R`, less the
/// always-unreferenced constant.
pub fn orphaned_object_count(bytes: &[u8]) -> usize {
    let defined = defined_object_numbers(bytes);
    let referenced = referenced_object_numbers(bytes);
    let orphaned = defined
        .iter()
        .filter(|n| referenced.binary_search(n).is_err())
        .count();
    orphaned.saturating_sub(ALWAYS_UNREFERENCED)
}

fn tool_family(raw: &str) -> Option<&'static str> {
    let lower = raw.to_lowercase();
    TOOL_FAMILIES.iter().copied().find(|f| lower.contains(f))
}

/// Creator and Producer naming different known tool families is a weak
/// indicator that the document passed through a second tool.
pub fn tool_family_mismatch(creator: Option<&str>, producer: Option<&str>) -> Option<String> {
    let creator_family = creator.and_then(tool_family)?;
    let producer_family = producer.and_then(tool_family)?;
    if creator_family == producer_family {
        return None;
    }
    // Office creators paired with Adobe/printer producers are routine
    let routine_pairs = [
        ("microsoft", "acrobat"),
        ("microsoft", "adobe"),
        ("word", "acrobat"),
        ("word", "adobe"),
        ("latex", "pdflatex"),
        ("pdflatex", "latex"),
        ("chrome", "skia"),
        ("chromium", "skia"),
    ];
    if routine_pairs
        .iter()
        .any(|(c, p)| *c == creator_family && *p == producer_family)
    {
        return None;
    }
    Some(format!(
        "creator tool family '{}' does not match producer family '{}'",
        creator_family, producer_family
    ))
}
