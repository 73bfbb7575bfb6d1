//! Tampering analyzer: converts heterogeneous signals into weighted
//! indicators, summed into a bounded score and likelihood.
//!
//! `analyze` is a pure function of its inputs; re-running it on identical
//! inputs yields an identical ordered indicator set and score.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::compare::metadata::normalize_date;
use crate::external::ExternalSignals;
use crate::forensic::{ForensicFacts, HiddenKind};
use crate::types::{FileInfo, PdfMetadata, Severity};

/// Indicator categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorCategory {
    Structure,
    Timestamps,
    Signatures,
    HiddenContent,
    ToolChain,
    Metadata,
    Security,
}

/// Closed set of indicator kinds. Base weight and category assignment are
/// exhaustive matches, so adding a kind without both is a compile error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorKind {
    // Structure
    IncrementalUpdates,
    DeletedObjects,
    OrphanedObjects,
    XrefAnomaly,
    // Timestamps
    ModifiedBeforeCreated,
    CreationDateMismatch,
    MetadataDateMismatch,
    XmpHistoryDiscrepancy,
    // Signatures
    InvalidSignature,
    PartialSignatureCoverage,
    SignatureMissingData,
    ModificationAfterSigning,
    // Hidden content
    HiddenAnnotation,
    HiddenLayer,
    OffPageContent,
    TinyBoundsText,
    ImproperRedaction,
    // Tool chain
    CreatorProducerMismatch,
    KnownEditorTrace,
    MultipleGenerators,
    // Metadata
    DocumentIdChanged,
    MetadataStripped,
    InfoXmpDivergence,
    // Security
    JavaScriptEmbedded,
    LaunchAction,
    EmbeddedFiles,
    EncryptedDocument,
}

impl IndicatorKind {
    pub fn base_weight(self) -> f64 {
        use IndicatorKind::*;
        match self {
            InvalidSignature | PartialSignatureCoverage | ImproperRedaction => 30.0,
            ModificationAfterSigning => 25.0,
            IncrementalUpdates | DeletedObjects | HiddenAnnotation | HiddenLayer
            | OffPageContent => 20.0,
            ModifiedBeforeCreated | CreationDateMismatch | MetadataDateMismatch
            | XmpHistoryDiscrepancy | TinyBoundsText | DocumentIdChanged | InfoXmpDivergence
            | SignatureMissingData | JavaScriptEmbedded | LaunchAction => 15.0,
            OrphanedObjects | XrefAnomaly | CreatorProducerMismatch | KnownEditorTrace
            | MultipleGenerators | MetadataStripped | EmbeddedFiles | EncryptedDocument => 10.0,
        }
    }

    pub fn category(self) -> IndicatorCategory {
        use IndicatorKind::*;
        match self {
            IncrementalUpdates | DeletedObjects | OrphanedObjects | XrefAnomaly => {
                IndicatorCategory::Structure
            }
            ModifiedBeforeCreated | CreationDateMismatch | MetadataDateMismatch
            | XmpHistoryDiscrepancy => IndicatorCategory::Timestamps,
            InvalidSignature | PartialSignatureCoverage | SignatureMissingData
            | ModificationAfterSigning => IndicatorCategory::Signatures,
            HiddenAnnotation | HiddenLayer | OffPageContent | TinyBoundsText
            | ImproperRedaction => IndicatorCategory::HiddenContent,
            CreatorProducerMismatch | KnownEditorTrace | MultipleGenerators => {
                IndicatorCategory::ToolChain
            }
            DocumentIdChanged | MetadataStripped | InfoXmpDivergence => IndicatorCategory::Metadata,
            JavaScriptEmbedded | LaunchAction | EmbeddedFiles | EncryptedDocument => {
                IndicatorCategory::Security
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Likelihood {
    None,
    Low,
    Moderate,
    High,
    VeryHigh,
}

impl Likelihood {
    pub fn from_score(score: f64) -> Self {
        if score >= 70.0 {
            Likelihood::VeryHigh
        } else if score >= 45.0 {
            Likelihood::High
        } else if score >= 20.0 {
            Likelihood::Moderate
        } else if score >= 5.0 {
            Likelihood::Low
        } else {
            Likelihood::None
        }
    }
}

impl fmt::Display for Likelihood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Likelihood::None => "none",
            Likelihood::Low => "low",
            Likelihood::Moderate => "moderate",
            Likelihood::High => "high",
            Likelihood::VeryHigh => "very_high",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TamperingIndicator {
    pub kind: IndicatorKind,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<BTreeMap<String, String>>,
}

impl TamperingIndicator {
    fn new(
        kind: IndicatorKind,
        severity: Severity,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            severity,
            title: title.into(),
            description: description.into(),
            details: None,
        }
    }

    pub fn weight(&self) -> f64 {
        self.kind.base_weight() * self.severity.multiplier()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TamperingAnalysis {
    pub indicators: Vec<TamperingIndicator>,
    /// min(100, Σ weight)
    pub score: f64,
    pub likelihood: Likelihood,
}

impl TamperingAnalysis {
    fn from_indicators(indicators: Vec<TamperingIndicator>) -> Self {
        let score = indicators
            .iter()
            .map(TamperingIndicator::weight)
            .sum::<f64>()
            .min(100.0);
        Self {
            indicators,
            score,
            likelihood: Likelihood::from_score(score),
        }
    }
}

/// Converts all per-document signals into an ordered indicator list.
/// Sub-analyses run in a fixed order; summation is commutative so only
/// the pre-sort report order depends on it.
pub fn analyze(
    metadata: &PdfMetadata,
    file_info: &FileInfo,
    forensic: &ForensicFacts,
    external: Option<&ExternalSignals>,
) -> TamperingAnalysis {
    let mut indicators = Vec::new();
    analyze_structure(metadata, external, &mut indicators);
    analyze_dates(metadata, file_info, external, &mut indicators);
    analyze_signatures(forensic, metadata, &mut indicators);
    analyze_hidden_content(forensic, &mut indicators);
    analyze_tool_chain(metadata, forensic, external, &mut indicators);
    analyze_metadata(metadata, external, &mut indicators);
    analyze_security(metadata, forensic, &mut indicators);
    TamperingAnalysis::from_indicators(indicators)
}

fn analyze_structure(
    metadata: &PdfMetadata,
    external: Option<&ExternalSignals>,
    out: &mut Vec<TamperingIndicator>,
) {
    if metadata.incremental_updates > 0 {
        let severity = if metadata.incremental_updates > 2 {
            Severity::High
        } else {
            Severity::Medium
        };
        out.push(TamperingIndicator::new(
            IndicatorKind::IncrementalUpdates,
            severity,
            "Incremental Updates Present",
            format!(
                "The file carries {} incremental update(s); earlier revisions remain \
                 embedded in the byte stream.",
                metadata.incremental_updates
            ),
        ));
    }

    if let Some(fonts) = external.and_then(|e| e.font_inspector.as_ref()) {
        if fonts.free_objects > 0 {
            out.push(TamperingIndicator::new(
                IndicatorKind::DeletedObjects,
                Severity::Medium,
                "Deleted Objects",
                format!(
                    "{} free object slot(s) alongside {} in-use objects.",
                    fonts.free_objects, fonts.in_use_objects
                ),
            ));
        }
        if fonts.prev_xref_offsets.len() > 1 {
            out.push(TamperingIndicator::new(
                IndicatorKind::XrefAnomaly,
                Severity::Low,
                "Chained Cross-Reference Sections",
                format!(
                    "{} previous cross-reference offsets declared.",
                    fonts.prev_xref_offsets.len()
                ),
            ));
        }
    }
}

fn analyze_dates(
    metadata: &PdfMetadata,
    file_info: &FileInfo,
    external: Option<&ExternalSignals>,
    out: &mut Vec<TamperingIndicator>,
) {
    let created = metadata.creation_date.as_deref().and_then(normalize_date);
    let modified = metadata
        .modification_date
        .as_deref()
        .and_then(normalize_date);
    if let (Some(c), Some(m)) = (&created, &modified) {
        if m < c {
            out.push(TamperingIndicator::new(
                IndicatorKind::ModifiedBeforeCreated,
                Severity::High,
                "Modification Precedes Creation",
                "The modification date is earlier than the creation date.",
            ));
        }
    }

    // A day of slack absorbs timezone offsets between the PDF date and
    // the filesystem timestamp
    if let (Some(fs_modified), Some(claimed)) = (
        file_info
            .modified
            .as_deref()
            .and_then(|raw| chrono::DateTime::parse_from_rfc3339(raw).ok()),
        metadata
            .modification_date
            .as_deref()
            .and_then(parse_pdf_datetime),
    ) {
        if claimed - fs_modified.naive_utc() > chrono::Duration::days(1) {
            out.push(TamperingIndicator::new(
                IndicatorKind::MetadataDateMismatch,
                Severity::Low,
                "Claimed Modification Postdates File",
                "The document's declared modification date is later than the last \
                 write time of the file on disk.",
            ));
        }
    }

    // XMP history should account for the incremental saves: N updates
    // imply at least N recorded events beyond the original
    if !metadata.xmp_history.is_empty()
        && metadata.incremental_updates + 1 > metadata.xmp_history.len()
    {
        out.push(TamperingIndicator::new(
            IndicatorKind::XmpHistoryDiscrepancy,
            Severity::Medium,
            "XMP History Discrepancy",
            format!(
                "{} incremental update(s) but only {} XMP history event(s) recorded.",
                metadata.incremental_updates,
                metadata.xmp_history.len()
            ),
        ));
    }

    if let Some(meta_tool) = external.and_then(|e| e.metadata_tool.as_ref()) {
        let external_created = meta_tool.creation_date.as_deref().and_then(normalize_date);
        if let (Some(a), Some(b)) = (&created, &external_created) {
            if a != b {
                out.push(TamperingIndicator::new(
                    IndicatorKind::CreationDateMismatch,
                    Severity::Medium,
                    "Creation Date Mismatch",
                    "The Info dictionary and external metadata disagree on the creation date.",
                ));
            }
        }
        let metadata_date = meta_tool.metadata_date.as_deref().and_then(normalize_date);
        if let (Some(m), Some(md)) = (&modified, &metadata_date) {
            if m != md {
                out.push(TamperingIndicator::new(
                    IndicatorKind::MetadataDateMismatch,
                    Severity::Low,
                    "Metadata Date Mismatch",
                    "The XMP metadata date differs from the document modification date.",
                ));
            }
        }
    }
}

fn parse_pdf_datetime(raw: &str) -> Option<chrono::NaiveDateTime> {
    let mut digits = normalize_date(raw)?;
    while digits.len() < 14 {
        digits.push('0');
    }
    chrono::NaiveDateTime::parse_from_str(&digits, "%Y%m%d%H%M%S").ok()
}

fn analyze_signatures(
    forensic: &ForensicFacts,
    metadata: &PdfMetadata,
    out: &mut Vec<TamperingIndicator>,
) {
    for sig in &forensic.signatures {
        if !sig.valid {
            out.push(TamperingIndicator::new(
                IndicatorKind::InvalidSignature,
                Severity::Critical,
                "Invalid Signature Structure",
                "A signature dictionary lacks its content or byte-range entry.",
            ));
        } else if !sig.covers_whole_document {
            out.push(TamperingIndicator::new(
                IndicatorKind::PartialSignatureCoverage,
                Severity::High,
                "Partial Signature Coverage",
                "The signature's declared byte range ends well before the end of the \
                 file; content appended after signing is not covered.",
            ));
        }
        if sig.signer.is_none() || sig.date.is_none() {
            out.push(TamperingIndicator::new(
                IndicatorKind::SignatureMissingData,
                Severity::Low,
                "Signature Missing Attributes",
                "A signature omits its signer name or signing date.",
            ));
        }
        if sig.valid && sig.covers_whole_document && metadata.incremental_updates > 0 {
            out.push(TamperingIndicator::new(
                IndicatorKind::ModificationAfterSigning,
                Severity::High,
                "Modification After Signing",
                "Incremental updates were appended to a signed document.",
            ));
        }
    }
}

fn analyze_hidden_content(forensic: &ForensicFacts, out: &mut Vec<TamperingIndicator>) {
    for item in &forensic.hidden_items {
        let (kind, severity, title) = match item.kind {
            HiddenKind::WhiteText | HiddenKind::HiddenFlag => (
                IndicatorKind::HiddenAnnotation,
                Severity::Medium,
                "Hidden Annotation Text",
            ),
            HiddenKind::TinyBounds => (
                IndicatorKind::TinyBoundsText,
                Severity::Medium,
                "Text In Sub-Visible Bounds",
            ),
            HiddenKind::OffPage => (
                IndicatorKind::OffPageContent,
                Severity::Medium,
                "Content Outside Page Bounds",
            ),
            HiddenKind::HiddenLayer => (
                IndicatorKind::HiddenLayer,
                Severity::Medium,
                "Hidden Optional-Content Layer",
            ),
        };
        out.push(TamperingIndicator::new(
            kind,
            severity,
            title,
            item.description.clone(),
        ));
    }

    for redaction in forensic.redactions.iter().filter(|r| r.recoverable) {
        out.push(TamperingIndicator::new(
            IndicatorKind::ImproperRedaction,
            Severity::Critical,
            "Improper Redaction",
            format!("Page {}: {}", redaction.page + 1, redaction.description),
        ));
    }
}

fn analyze_tool_chain(
    metadata: &PdfMetadata,
    forensic: &ForensicFacts,
    external: Option<&ExternalSignals>,
    out: &mut Vec<TamperingIndicator>,
) {
    if let Some(mismatch) = &forensic.suspicious.tool_mismatch {
        out.push(TamperingIndicator::new(
            IndicatorKind::CreatorProducerMismatch,
            Severity::Medium,
            "Creator/Producer Mismatch",
            mismatch.clone(),
        ));
    }

    const EDITOR_TRACES: &[&str] = &["ghostscript", "pdftk", "itext", "qpdf", "pdfbox"];
    if let Some(producer) = &metadata.producer {
        let lower = producer.to_lowercase();
        if let Some(editor) = EDITOR_TRACES.iter().find(|t| lower.contains(*t)) {
            out.push(TamperingIndicator::new(
                IndicatorKind::KnownEditorTrace,
                Severity::Low,
                "Post-Processing Tool Trace",
                format!("Producer names the rewriting tool '{}'.", editor),
            ));
        }
    }

    let history = external
        .and_then(|e| e.metadata_tool.as_ref())
        .map(|m| m.history.as_slice())
        .unwrap_or(&metadata.xmp_history);
    let mut tools: Vec<&str> = history
        .iter()
        .filter_map(|event| event.split_whitespace().nth(1))
        .collect();
    tools.sort_unstable();
    tools.dedup();
    if tools.len() > 1 {
        out.push(TamperingIndicator::new(
            IndicatorKind::MultipleGenerators,
            Severity::Low,
            "Multiple Generating Tools",
            format!("The XMP history names {} distinct tools.", tools.len()),
        ));
    }
}

fn analyze_metadata(
    metadata: &PdfMetadata,
    external: Option<&ExternalSignals>,
    out: &mut Vec<TamperingIndicator>,
) {
    if let (Some(permanent), Some(instance)) = (&metadata.permanent_id, &metadata.instance_id) {
        if permanent != instance {
            out.push(TamperingIndicator::new(
                IndicatorKind::DocumentIdChanged,
                Severity::Low,
                "Instance ID Diverged",
                "The instance half of the document ID differs from the permanent \
                 half; the file was re-saved after creation.",
            ));
        }
    }

    let info_empty = metadata.title.is_none()
        && metadata.author.is_none()
        && metadata.creator.is_none()
        && metadata.producer.is_none();
    if info_empty && metadata.has_xmp {
        out.push(TamperingIndicator::new(
            IndicatorKind::MetadataStripped,
            Severity::Low,
            "Info Dictionary Stripped",
            "Every standard Info field is empty while an XMP packet is present.",
        ));
    }

    if let Some(meta_tool) = external.and_then(|e| e.metadata_tool.as_ref()) {
        let xmp_create = meta_tool.creation_date.as_deref().and_then(normalize_date);
        let info_create = metadata.creation_date.as_deref().and_then(normalize_date);
        if info_create.is_none() && xmp_create.is_some() {
            out.push(TamperingIndicator::new(
                IndicatorKind::InfoXmpDivergence,
                Severity::Low,
                "Info/XMP Divergence",
                "XMP carries a creation date the Info dictionary no longer has.",
            ));
        }
    }
}

fn analyze_security(
    metadata: &PdfMetadata,
    forensic: &ForensicFacts,
    out: &mut Vec<TamperingIndicator>,
) {
    if forensic.suspicious.javascript {
        out.push(TamperingIndicator::new(
            IndicatorKind::JavaScriptEmbedded,
            Severity::Medium,
            "Embedded JavaScript",
            "JavaScript markers are present in the byte stream.",
        ));
    }
    if forensic.suspicious.launch_action {
        out.push(TamperingIndicator::new(
            IndicatorKind::LaunchAction,
            Severity::High,
            "Launch Action",
            "A launch-action marker is present; the document can start external \
             programs.",
        ));
    }
    if metadata.has_embedded_files {
        out.push(TamperingIndicator::new(
            IndicatorKind::EmbeddedFiles,
            Severity::Low,
            "Embedded Files",
            "The document carries embedded file attachments.",
        ));
    }
    if metadata.encrypted {
        out.push(TamperingIndicator::new(
            IndicatorKind::EncryptedDocument,
            Severity::Info,
            "Encrypted Document",
            "Encryption limits the reach of byte-level heuristics.",
        ));
    }
    if forensic.suspicious.orphaned_objects > 0 {
        out.push(TamperingIndicator::new(
            IndicatorKind::OrphanedObjects,
            Severity::Low,
            "Orphaned Objects",
            format!(
                "{} object(s) are defined but never referenced.",
                forensic.suspicious.orphaned_objects
            ),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forensic::SignatureInfo;

    #[test]
    fn clean_inputs_yield_zero_score() {
        let analysis = analyze(
            &PdfMetadata::default(),
            &FileInfo::default(),
            &ForensicFacts::default(),
            None,
        );
        assert!(analysis.indicators.is_empty());
        assert_eq!(analysis.score, 0.0);
        assert_eq!(analysis.likelihood, Likelihood::None);
    }

    #[test]
    fn analysis_is_idempotent() {
        let metadata = PdfMetadata {
            incremental_updates: 3,
            has_embedded_files: true,
            producer: Some("Ghostscript 10".into()),
            ..Default::default()
        };
        let facts = ForensicFacts {
            suspicious: crate::forensic::SuspiciousElements {
                javascript: true,
                ..Default::default()
            },
            ..Default::default()
        };
        let first = analyze(&metadata, &FileInfo::default(), &facts, None);
        let second = analyze(&metadata, &FileInfo::default(), &facts, None);
        assert_eq!(first, second);
    }

    #[test]
    fn partial_coverage_is_a_high_severity_indicator() {
        let facts = ForensicFacts {
            signatures: vec![SignatureInfo {
                valid: true,
                covers_whole_document: false,
                signer: Some("Alice".into()),
                date: Some("D:2024".into()),
                ..Default::default()
            }],
            ..Default::default()
        };
        let analysis = analyze(&PdfMetadata::default(), &FileInfo::default(), &facts, None);
        let indicator = analysis
            .indicators
            .iter()
            .find(|i| i.kind == IndicatorKind::PartialSignatureCoverage)
            .expect("partial coverage indicator");
        assert_eq!(indicator.severity, Severity::High);
        assert_eq!(indicator.title, "Partial Signature Coverage");
        assert_eq!(indicator.weight(), 30.0 * 1.2);
    }

    #[test]
    fn score_is_capped_at_one_hundred() {
        let facts = ForensicFacts {
            redactions: (0..10)
                .map(|page| crate::forensic::RedactionIssue {
                    page,
                    recoverable: true,
                    description: "text remains".into(),
                })
                .collect(),
            ..Default::default()
        };
        let analysis = analyze(&PdfMetadata::default(), &FileInfo::default(), &facts, None);
        assert_eq!(analysis.score, 100.0);
        assert_eq!(analysis.likelihood, Likelihood::VeryHigh);
    }

    #[test]
    fn modification_date_after_file_write_is_flagged() {
        let metadata = PdfMetadata {
            modification_date: Some("D:20250301120000Z".into()),
            ..Default::default()
        };
        let file_info = FileInfo {
            modified: Some("2025-01-01T00:00:00+00:00".into()),
            ..Default::default()
        };
        let analysis = analyze(&metadata, &file_info, &ForensicFacts::default(), None);
        assert!(analysis
            .indicators
            .iter()
            .any(|i| i.kind == IndicatorKind::MetadataDateMismatch));
    }

    #[test]
    fn likelihood_buckets() {
        assert_eq!(Likelihood::from_score(0.0), Likelihood::None);
        assert_eq!(Likelihood::from_score(4.9), Likelihood::None);
        assert_eq!(Likelihood::from_score(5.0), Likelihood::Low);
        assert_eq!(Likelihood::from_score(20.0), Likelihood::Moderate);
        assert_eq!(Likelihood::from_score(45.0), Likelihood::High);
        assert_eq!(Likelihood::from_score(70.0), Likelihood::VeryHigh);
    }

    #[test]
    fn weights_follow_the_base_table() {
        assert_eq!(IndicatorKind::ImproperRedaction.base_weight(), 30.0);
        assert_eq!(IndicatorKind::IncrementalUpdates.base_weight(), 20.0);
        assert_eq!(IndicatorKind::ModifiedBeforeCreated.base_weight(), 15.0);
        assert_eq!(IndicatorKind::OrphanedObjects.base_weight(), 10.0);
        assert_eq!(
            IndicatorKind::ImproperRedaction.category(),
            IndicatorCategory::HiddenContent
        );
    }
}
