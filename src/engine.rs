//! Detection engine — stage-by-stage orchestration of one analysis run.
//!
//! Stages run in a fixed order over immutable snapshots; cancellation is
//! polled between stages and aborts the run without a partial report.

use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, instrument};

use crate::compare::{metadata as metadata_compare, text as text_compare, visual as visual_compare};
use crate::config::AnalysisConfig;
use crate::error::{Error, Result};
use crate::extract::bytes as byte_extract;
use crate::extract::xmp as xmp_extract;
use crate::external::{self, ExternalSignals, ToolAvailability};
use crate::forensic;
use crate::hash_utils;
use crate::reader::{DocumentReader, LopdfReader};
use crate::tampering::{self, IndicatorCategory, IndicatorKind, TamperingAnalysis};
use crate::types::{
    sort_by_severity, DetectionReport, DocumentSnapshot, FileInfo, Finding, FindingCategory,
    MetadataComparison, PdfMetadata, RiskLevel, Severity, TextComparison, VisualComparison,
};

/// Pipeline stages in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisStage {
    Loading,
    Metadata,
    Text,
    Visual,
    Structure,
    ForensicExtraction,
    Security,
    ExternalSignals,
}

impl AnalysisStage {
    /// Overall completion fraction at this stage's start
    fn fraction(self) -> f64 {
        match self {
            AnalysisStage::Loading => 0.0,
            AnalysisStage::Metadata => 0.20,
            AnalysisStage::Text => 0.30,
            AnalysisStage::Visual => 0.45,
            AnalysisStage::Structure => 0.60,
            AnalysisStage::ForensicExtraction => 0.70,
            AnalysisStage::Security => 0.80,
            AnalysisStage::ExternalSignals => 0.90,
        }
    }
}

impl fmt::Display for AnalysisStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AnalysisStage::Loading => "loading",
            AnalysisStage::Metadata => "metadata",
            AnalysisStage::Text => "text",
            AnalysisStage::Visual => "visual",
            AnalysisStage::Structure => "structure",
            AnalysisStage::ForensicExtraction => "forensic-extraction",
            AnalysisStage::Security => "security",
            AnalysisStage::ExternalSignals => "external-signals",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressUpdate {
    pub stage: AnalysisStage,
    /// Overall completion in [0, 1]
    pub fraction: f64,
}

/// Observer invoked at every stage boundary and at completion
pub type ProgressCallback = Arc<Mutex<Box<dyn FnMut(ProgressUpdate) + Send>>>;

/// Cooperative cancellation handle, checked between stages
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct DetectionEngine {
    config: AnalysisConfig,
    tools: ToolAvailability,
}

impl DetectionEngine {
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        let tools = if config.enable_external_tools {
            ToolAvailability::new()
        } else {
            ToolAvailability::none()
        };
        Ok(Self { config, tools })
    }

    pub fn with_tools(config: AnalysisConfig, tools: ToolAvailability) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, tools })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Runs the full pipeline against files on disk.
    #[instrument(skip(self, progress, cancel), fields(original = %original.display()))]
    pub async fn run(
        &self,
        original: &Path,
        comparison: Option<&Path>,
        progress: Option<ProgressCallback>,
        cancel: Option<&CancelToken>,
    ) -> Result<DetectionReport> {
        let original_reader = LopdfReader::open(original).await?;
        let comparison_reader = match comparison {
            Some(path) => Some(LopdfReader::open(path).await?),
            None => None,
        };
        self.run_with_readers(
            &original_reader,
            original,
            comparison_reader
                .as_ref()
                .map(|reader| reader as &dyn DocumentReader)
                .zip(comparison),
            progress,
            cancel,
        )
        .await
    }

    /// Runs the pipeline over pre-built readers. Tests drive this entry
    /// point with synthetic documents.
    pub async fn run_with_readers(
        &self,
        original: &dyn DocumentReader,
        original_path: &Path,
        comparison: Option<(&dyn DocumentReader, &Path)>,
        progress: Option<ProgressCallback>,
        cancel: Option<&CancelToken>,
    ) -> Result<DetectionReport> {
        let run = StageRunner { progress, cancel };

        run.enter(AnalysisStage::Loading)?;
        let mut original_snapshot = self.build_snapshot(original, original_path).await?;
        let mut comparison_snapshot = match comparison {
            Some((reader, path)) => {
                run.midway(AnalysisStage::Loading, AnalysisStage::Metadata);
                Some(self.build_snapshot(reader, path).await?)
            }
            None => None,
        };

        run.enter(AnalysisStage::Metadata)?;
        let mut metadata_comparison = match &comparison_snapshot {
            Some(candidate) => metadata_compare::compare_info(&original_snapshot, candidate),
            None => MetadataComparison::identical(),
        };

        run.enter(AnalysisStage::Text)?;
        let text = match &comparison_snapshot {
            Some(candidate) => text_compare::compare_pages(
                &original_snapshot.page_texts,
                &candidate.page_texts,
            ),
            None => TextComparison::default(),
        };

        run.enter(AnalysisStage::Visual)?;
        let visual = match &comparison_snapshot {
            Some(candidate) => visual_compare::compare_documents(
                &original_snapshot.page_images,
                &candidate.page_images,
                &self.config,
            ),
            None => VisualComparison::default(),
        };

        run.enter(AnalysisStage::Structure)?;
        if let Some(candidate) = &comparison_snapshot {
            metadata_compare::compare_structure(
                &original_snapshot,
                candidate,
                &mut metadata_comparison,
            );
        }

        run.enter(AnalysisStage::ForensicExtraction)?;
        original_snapshot.forensic = forensic::extract_facts(&original_snapshot);
        if let Some(candidate) = &mut comparison_snapshot {
            candidate.forensic = forensic::extract_facts(candidate);
        }

        run.enter(AnalysisStage::Security)?;
        let suspect = comparison_snapshot.as_ref().unwrap_or(&original_snapshot);
        let mut tampering_analysis =
            tampering::analyze(&suspect.metadata, &suspect.file_info, &suspect.forensic, None);

        run.enter(AnalysisStage::ExternalSignals)?;
        let forensic_comparison = comparison_snapshot
            .as_ref()
            .map(|candidate| {
                forensic::compare_facts(&original_snapshot.forensic, &candidate.forensic)
            })
            .unwrap_or_default();
        let external = if self.config.enable_external_tools {
            Some(external::gather(&self.tools, &suspect.file_info.path, &self.config).await)
        } else {
            None
        };
        if let Some(signals) = &external {
            // Re-derive with the external comparisons folded in; analyze is
            // pure, so the internal indicators come out unchanged
            tampering_analysis = tampering::analyze(
                &suspect.metadata,
                &suspect.file_info,
                &suspect.forensic,
                Some(signals),
            );
        }

        let report = self.assemble_report(
            &original_snapshot,
            comparison_snapshot.as_ref(),
            metadata_comparison,
            text,
            visual,
            tampering_analysis,
            forensic_comparison,
            external,
        );
        run.finish();
        info!(
            risk_score = report.risk_score,
            findings = report.findings.len(),
            "analysis complete"
        );
        Ok(report)
    }

    /// Builds the immutable per-document snapshot: file identity, parsed
    /// pages, and the byte-level internals merged with reader attributes.
    async fn build_snapshot(
        &self,
        reader: &dyn DocumentReader,
        path: &Path,
    ) -> Result<DocumentSnapshot> {
        let raw_bytes = reader.raw_bytes().to_vec();
        let file_info = file_info(path, &raw_bytes).await;
        let mut metadata = merge_metadata(reader.attributes(), byte_extract::scan(&raw_bytes));
        if let Some(packet) = xmp_extract::parse(&raw_bytes) {
            apply_xmp(&mut metadata, &packet);
        }

        let page_count = reader.page_count();
        let mut page_texts = Vec::with_capacity(page_count);
        let mut page_images = Vec::with_capacity(page_count);
        let mut page_annotations = Vec::with_capacity(page_count);
        let mut page_bounds = Vec::with_capacity(page_count);
        for page in 0..page_count {
            page_texts.push(reader.page_text(page).await?);
            page_images.push(reader.page_image(page, self.config.render_dpi).await?);
            page_annotations.push(reader.annotations(page)?);
            page_bounds.push(reader.page_bounds(page)?);
        }

        Ok(DocumentSnapshot {
            file_info,
            page_count,
            page_texts,
            page_images,
            page_annotations,
            page_bounds,
            metadata,
            raw_bytes,
            forensic: Default::default(),
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn assemble_report(
        &self,
        original: &DocumentSnapshot,
        comparison: Option<&DocumentSnapshot>,
        metadata_comparison: MetadataComparison,
        text: TextComparison,
        visual: VisualComparison,
        tampering_analysis: TamperingAnalysis,
        forensic_comparison: Vec<Finding>,
        external: Option<ExternalSignals>,
    ) -> DetectionReport {
        let mut findings = metadata_comparison.differences.clone();
        findings.extend(text_findings(&text));
        findings.extend(visual_findings(&visual, &self.config));
        findings.extend(tampering_findings(&tampering_analysis));
        findings.extend(forensic_comparison);
        if let Some(signals) = &external {
            findings.extend(external_findings(signals));
        }
        sort_by_severity(&mut findings);

        let risk_score = risk_score(&tampering_analysis, &text, &visual, &findings);

        DetectionReport {
            id: uuid::Uuid::new_v4().to_string(),
            generated_at: chrono::Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            original: (&original.file_info).into(),
            comparison: comparison.map(|c| (&c.file_info).into()),
            risk_score,
            risk_level: RiskLevel::from_score(risk_score),
            findings,
            text,
            visual,
            metadata: metadata_comparison,
            external: external.map(|signals| signals.summary()),
            tampering: Some(tampering_analysis),
        }
    }
}

struct StageRunner<'a> {
    progress: Option<ProgressCallback>,
    cancel: Option<&'a CancelToken>,
}

impl StageRunner<'_> {
    fn enter(&self, stage: AnalysisStage) -> Result<()> {
        if let Some(token) = self.cancel {
            if token.is_cancelled() {
                return Err(Error::Cancelled);
            }
        }
        info!(stage = %stage, "stage start");
        self.emit(ProgressUpdate {
            stage,
            fraction: stage.fraction(),
        });
        Ok(())
    }

    /// Intermediate progress for a stage doing two comparable units of work
    fn midway(&self, stage: AnalysisStage, next: AnalysisStage) {
        self.emit(ProgressUpdate {
            stage,
            fraction: (stage.fraction() + next.fraction()) / 2.0,
        });
    }

    fn finish(&self) {
        self.emit(ProgressUpdate {
            stage: AnalysisStage::ExternalSignals,
            fraction: 1.0,
        });
    }

    fn emit(&self, update: ProgressUpdate) {
        if let Some(callback) = &self.progress {
            (callback.lock())(update);
        }
    }
}

async fn file_info(path: &Path, bytes: &[u8]) -> FileInfo {
    let modified = tokio::fs::metadata(path)
        .await
        .ok()
        .and_then(|meta| meta.modified().ok())
        .map(|time| chrono::DateTime::<chrono::Utc>::from(time).to_rfc3339());
    FileInfo {
        name: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string()),
        path: path.to_path_buf(),
        size_bytes: bytes.len() as u64,
        sha256: hash_utils::sha256_hex(bytes),
        modified,
    }
}

/// Info-dictionary attributes from the parser layered over the byte-level
/// internals. The byte scan still works when parsing fails upstream.
fn merge_metadata(
    attributes: std::collections::HashMap<String, String>,
    internals: byte_extract::ByteInternals,
) -> PdfMetadata {
    let mut custom_properties = attributes.clone();
    let mut take = |key: &str| custom_properties.remove(key);
    let title = take("Title");
    let author = take("Author");
    let subject = take("Subject");
    let keywords = take("Keywords");
    let creator = take("Creator");
    let producer = take("Producer");
    let creation_date = take("CreationDate");
    let modification_date = take("ModDate");

    PdfMetadata {
        title,
        author,
        subject,
        keywords,
        creator,
        producer,
        creation_date,
        modification_date,
        encrypted: internals.encrypted,
        custom_properties,
        permanent_id: internals.permanent_id,
        instance_id: internals.instance_id,
        linearized: internals.linearized,
        has_xmp: internals.has_xmp,
        incremental_updates: internals.incremental_updates,
        object_count: internals.object_count,
        fonts: internals.fonts,
        tagged: internals.tagged,
        pdfa_conformant: internals.pdfa_conformant,
        xref_kind: internals.xref_kind,
        has_javascript: internals.has_javascript,
        has_launch_action: internals.has_launch_action,
        has_embedded_files: internals.has_embedded_files,
        has_acroform: internals.has_acroform,
        has_signature: internals.has_signature,
        xmp_history: internals.xmp_history,
    }
}

/// XMP fills the gaps the Info dictionary leaves: dates missing from Info
/// and the structured edit history.
fn apply_xmp(metadata: &mut PdfMetadata, packet: &xmp_extract::XmpPacket) {
    if metadata.creation_date.is_none() {
        metadata.creation_date = packet.create_date.clone();
    }
    if metadata.modification_date.is_none() {
        metadata.modification_date = packet.modify_date.clone();
    }
    if !packet.history.is_empty() {
        metadata.xmp_history = packet.history_strings();
    }
}

fn text_findings(text: &TextComparison) -> Vec<Finding> {
    let mut findings = Vec::new();
    for page in &text.pages {
        if page.similarity >= 1.0 {
            continue;
        }
        let severity = if page.similarity < 0.5 {
            Severity::High
        } else if page.similarity < 0.9 {
            Severity::Medium
        } else {
            Severity::Low
        };
        findings.push(
            Finding::new(
                FindingCategory::Text,
                severity,
                "Text Content Changed",
                format!(
                    "Page {} text similarity is {:.1}% ({} token(s) inserted, {} deleted).",
                    page.page + 1,
                    page.similarity * 100.0,
                    page.inserted_tokens,
                    page.deleted_tokens
                ),
            )
            .on_page(page.page),
        );
    }
    findings
}

fn visual_findings(visual: &VisualComparison, config: &AnalysisConfig) -> Vec<Finding> {
    visual
        .pages
        .iter()
        .filter(|page| page.significant)
        .map(|page| {
            let severity = if page.ssim < config.ssim_threshold / 2.0 {
                Severity::High
            } else {
                Severity::Medium
            };
            Finding::new(
                FindingCategory::Visual,
                severity,
                "Visual Content Changed",
                format!(
                    "Page {} renders differently (SSIM {:.3}, pixel difference {:.1}%).",
                    page.page + 1,
                    page.ssim,
                    page.pixel_difference * 100.0
                ),
            )
            .on_page(page.page)
        })
        .collect()
}

fn tampering_findings(analysis: &TamperingAnalysis) -> Vec<Finding> {
    analysis
        .indicators
        .iter()
        .map(|indicator| {
            let category = if indicator.kind == IndicatorKind::ImproperRedaction {
                FindingCategory::Redactions
            } else {
                match indicator.kind.category() {
                    IndicatorCategory::Structure => FindingCategory::Structure,
                    IndicatorCategory::Timestamps | IndicatorCategory::Metadata => {
                        FindingCategory::Metadata
                    }
                    IndicatorCategory::Signatures => FindingCategory::Signatures,
                    IndicatorCategory::HiddenContent => FindingCategory::HiddenContent,
                    IndicatorCategory::ToolChain => FindingCategory::ToolChain,
                    IndicatorCategory::Security => FindingCategory::Security,
                }
            };
            let mut finding = Finding::new(
                category,
                indicator.severity,
                indicator.title.clone(),
                indicator.description.clone(),
            );
            if let Some(details) = &indicator.details {
                finding.details = Some(details.clone());
            }
            finding
        })
        .collect()
}

fn external_findings(signals: &ExternalSignals) -> Vec<Finding> {
    let mut findings = Vec::new();
    if !signals.missing_tools.is_empty() {
        findings.push(Finding::new(
            FindingCategory::ExternalTools,
            Severity::Info,
            "External Tools Unavailable",
            format!(
                "Analysis ran without: {}. Their signals are absent from this report.",
                signals.missing_tools.join(", ")
            ),
        ));
    }
    for failure in &signals.failures {
        findings.push(Finding::new(
            FindingCategory::ExternalTools,
            Severity::Info,
            "External Tool Failed",
            failure.clone(),
        ));
    }
    if let Some(meta) = &signals.metadata_tool {
        if meta.gps.is_some() {
            findings.push(Finding::new(
                FindingCategory::Metadata,
                Severity::Medium,
                "Location Data Embedded",
                "The metadata carries GPS coordinates.",
            ));
        }
        if !meta.attachments.is_empty() {
            findings.push(Finding::new(
                FindingCategory::Security,
                Severity::Low,
                "Extracted Attachments",
                format!("{} embedded file(s) were extracted.", meta.attachments.len()),
            ));
        }
    }
    findings
}

/// Composite risk: the tampering score plus content-divergence terms and a
/// surcharge per severe finding, clamped to [0, 100].
fn risk_score(
    tampering: &TamperingAnalysis,
    text: &TextComparison,
    visual: &VisualComparison,
    findings: &[Finding],
) -> f64 {
    let mut score = tampering.score;
    score += (1.0 - text.document_similarity).max(0.0) * 15.0;
    score += (1.0 - visual.average_ssim).max(0.0) * 10.0;
    let critical = findings
        .iter()
        .filter(|f| f.severity == Severity::Critical)
        .count() as f64;
    let high = findings
        .iter()
        .filter(|f| f.severity == Severity::High)
        .count() as f64;
    score += critical * 5.0 + high * 2.0;
    score.clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_token_flips_once() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
        let clone = token.clone();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn stage_fractions_are_monotonic() {
        let stages = [
            AnalysisStage::Loading,
            AnalysisStage::Metadata,
            AnalysisStage::Text,
            AnalysisStage::Visual,
            AnalysisStage::Structure,
            AnalysisStage::ForensicExtraction,
            AnalysisStage::Security,
            AnalysisStage::ExternalSignals,
        ];
        for pair in stages.windows(2) {
            assert!(pair[0].fraction() < pair[1].fraction());
        }
    }

    #[test]
    fn merge_metadata_splits_known_and_custom_keys() {
        let mut attributes = std::collections::HashMap::new();
        attributes.insert("Title".to_string(), "Invoice".to_string());
        attributes.insert("Producer".to_string(), "LibreOffice".to_string());
        attributes.insert("Department".to_string(), "Finance".to_string());
        let metadata = merge_metadata(attributes, byte_extract::scan(b"%PDF-1.4\n%%EOF"));
        assert_eq!(metadata.title.as_deref(), Some("Invoice"));
        assert_eq!(metadata.producer.as_deref(), Some("LibreOffice"));
        assert_eq!(
            metadata.custom_properties.get("Department").map(String::as_str),
            Some("Finance")
        );
        assert!(!metadata.custom_properties.contains_key("Title"));
    }

    #[test]
    fn identical_inputs_score_zero_risk() {
        let tampering = TamperingAnalysis {
            indicators: Vec::new(),
            score: 0.0,
            likelihood: crate::tampering::Likelihood::None,
        };
        let score = risk_score(
            &tampering,
            &TextComparison::default(),
            &VisualComparison::default(),
            &[],
        );
        assert_eq!(score, 0.0);
        assert_eq!(RiskLevel::from_score(score), RiskLevel::Minimal);
    }

    #[test]
    fn risk_is_clamped_to_one_hundred() {
        let tampering = TamperingAnalysis {
            indicators: Vec::new(),
            score: 100.0,
            likelihood: crate::tampering::Likelihood::VeryHigh,
        };
        let text = TextComparison {
            pages: Vec::new(),
            document_similarity: 0.0,
        };
        let score = risk_score(&tampering, &text, &VisualComparison::default(), &[]);
        assert_eq!(score, 100.0);
    }
}
