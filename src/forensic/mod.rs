//! Forensic extractor: per-document detection of signatures, hidden
//! content, redaction problems, optional-content layers, links, and
//! suspicious elements. Every detector degrades to an empty result on
//! absence rather than failing.

pub mod hidden;
pub mod redactions;
pub mod signatures;
pub mod suspicious;

use serde::{Deserialize, Serialize};

use crate::types::{DocumentSnapshot, Finding, FindingCategory, Severity};

pub use hidden::{HiddenItem, HiddenKind, LayerInfo};
pub use redactions::RedactionIssue;
pub use signatures::SignatureInfo;
pub use suspicious::SuspiciousElements;

/// One hyperlink annotation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkInfo {
    pub page: usize,
    pub target: Option<String>,
}

/// Aggregate forensic signal set for one document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForensicFacts {
    pub signatures: Vec<SignatureInfo>,
    pub hidden_items: Vec<HiddenItem>,
    pub layers: Vec<LayerInfo>,
    pub redactions: Vec<RedactionIssue>,
    pub links: Vec<LinkInfo>,
    pub suspicious: SuspiciousElements,
}

/// Runs every per-document detector over an already-loaded snapshot
pub fn extract_facts(snapshot: &DocumentSnapshot) -> ForensicFacts {
    let (hidden_items, layers) = hidden::detect(
        &snapshot.raw_bytes,
        &snapshot.page_annotations,
        &snapshot.page_bounds,
    );
    ForensicFacts {
        signatures: signatures::detect(&snapshot.raw_bytes),
        hidden_items,
        layers,
        redactions: redactions::detect(&snapshot.page_annotations, &snapshot.page_texts),
        links: collect_links(snapshot),
        suspicious: suspicious::detect(&snapshot.raw_bytes, &snapshot.metadata),
    }
}

/// Diffs two documents' forensic facts. Findings describe signature
/// integrity lost or concealment introduced in the comparison document.
pub fn compare_facts(original: &ForensicFacts, comparison: &ForensicFacts) -> Vec<Finding> {
    let mut findings = Vec::new();

    if comparison.signatures.len() < original.signatures.len() {
        findings.push(Finding::new(
            FindingCategory::Signatures,
            Severity::High,
            "Signature Removed",
            format!(
                "The original carries {} signature(s); the comparison carries {}.",
                original.signatures.len(),
                comparison.signatures.len()
            ),
        ));
    }

    let intact = |facts: &ForensicFacts| {
        facts
            .signatures
            .iter()
            .filter(|s| s.valid && s.covers_whole_document)
            .count()
    };
    if comparison.signatures.len() >= original.signatures.len()
        && intact(comparison) < intact(original)
    {
        findings.push(Finding::new(
            FindingCategory::Signatures,
            Severity::High,
            "Signature Integrity Lost",
            format!(
                "{} whole-document signature(s) in the original are invalid or \
                 partial in the comparison.",
                intact(original) - intact(comparison)
            ),
        ));
    }

    if comparison.hidden_items.len() > original.hidden_items.len() {
        findings.push(Finding::new(
            FindingCategory::HiddenContent,
            Severity::Medium,
            "Hidden Content Introduced",
            format!(
                "{} hidden item(s) in the comparison against {} in the original.",
                comparison.hidden_items.len(),
                original.hidden_items.len()
            ),
        ));
    }

    let off_layers = |facts: &ForensicFacts| facts.layers.iter().filter(|l| l.hidden).count();
    if off_layers(comparison) > off_layers(original) {
        findings.push(Finding::new(
            FindingCategory::HiddenContent,
            Severity::Medium,
            "Layer Switched Off",
            format!(
                "{} hidden optional-content layer(s) in the comparison against {}.",
                off_layers(comparison),
                off_layers(original)
            ),
        ));
    }

    if comparison.redactions.len() > original.redactions.len() {
        findings.push(Finding::new(
            FindingCategory::Redactions,
            Severity::Medium,
            "Redactions Added",
            format!(
                "{} redaction mark(s) in the comparison against {} in the original.",
                comparison.redactions.len(),
                original.redactions.len()
            ),
        ));
    }

    let recoverable = |facts: &ForensicFacts| {
        facts.redactions.iter().filter(|r| r.recoverable).count()
    };
    if recoverable(comparison) > recoverable(original) {
        findings.push(Finding::new(
            FindingCategory::Redactions,
            Severity::High,
            "Recoverable Redaction Introduced",
            format!(
                "{} redaction(s) in the comparison still have extractable text \
                 underneath.",
                recoverable(comparison) - recoverable(original)
            ),
        ));
    }

    findings
}

fn collect_links(snapshot: &DocumentSnapshot) -> Vec<LinkInfo> {
    snapshot
        .page_annotations
        .iter()
        .enumerate()
        .flat_map(|(page, annots)| {
            annots
                .iter()
                .filter(|a| a.subtype.eq_ignore_ascii_case("Link"))
                .map(move |a| LinkInfo {
                    page,
                    target: a.action.clone(),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signature(valid: bool, covers: bool) -> SignatureInfo {
        SignatureInfo {
            signer: Some("Alice Example".into()),
            reason: None,
            location: None,
            date: None,
            valid,
            covers_whole_document: covers,
            byte_range: None,
        }
    }

    #[test]
    fn identical_facts_produce_no_findings() {
        let facts = ForensicFacts {
            signatures: vec![signature(true, true)],
            ..Default::default()
        };
        assert!(compare_facts(&facts, &facts).is_empty());
    }

    #[test]
    fn stripped_signature_is_reported() {
        let original = ForensicFacts {
            signatures: vec![signature(true, true)],
            ..Default::default()
        };
        let comparison = ForensicFacts::default();
        let findings = compare_facts(&original, &comparison);
        assert!(findings
            .iter()
            .any(|f| f.title == "Signature Removed" && f.severity == Severity::High));
    }

    #[test]
    fn degraded_signature_coverage_is_reported() {
        let original = ForensicFacts {
            signatures: vec![signature(true, true)],
            ..Default::default()
        };
        let comparison = ForensicFacts {
            signatures: vec![signature(true, false)],
            ..Default::default()
        };
        let findings = compare_facts(&original, &comparison);
        assert!(findings.iter().any(|f| f.title == "Signature Integrity Lost"));
        assert!(findings.iter().all(|f| f.title != "Signature Removed"));
    }

    #[test]
    fn concealment_in_the_comparison_is_reported() {
        let original = ForensicFacts::default();
        let comparison = ForensicFacts {
            hidden_items: vec![HiddenItem {
                kind: HiddenKind::WhiteText,
                page: Some(0),
                description: "white-colored FreeText annotation holding text".into(),
            }],
            redactions: vec![RedactionIssue {
                page: 0,
                recoverable: true,
                description: "text remains under a redaction mark".into(),
            }],
            ..Default::default()
        };
        let findings = compare_facts(&original, &comparison);
        assert!(findings.iter().any(|f| f.title == "Hidden Content Introduced"));
        assert!(findings.iter().any(|f| f.title == "Redactions Added"));
        assert!(findings
            .iter()
            .any(|f| f.title == "Recoverable Redaction Introduced"));
    }
}
