mod common;

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;

use common::{pdf_bytes_with_eof_markers, signed_pdf_bytes, solid_image, StubReader};
use pdfsleuth::config::AnalysisConfig;
use pdfsleuth::engine::{CancelToken, DetectionEngine, ProgressUpdate};
use pdfsleuth::error::Error;
use pdfsleuth::external::ToolAvailability;
use pdfsleuth::reader::DocumentReader;
use pdfsleuth::types::{FindingCategory, RiskLevel, Severity};

fn offline_config() -> AnalysisConfig {
    AnalysisConfig {
        enable_external_tools: false,
        ..Default::default()
    }
}

fn engine() -> DetectionEngine {
    DetectionEngine::new(offline_config()).unwrap()
}

fn clean_reader() -> StubReader {
    StubReader::new(pdf_bytes_with_eof_markers(2))
        .with_page("The cat sat.")
        .with_attribute("Title", "Fixture")
        .with_attribute("Producer", "LibreOffice 7.4")
}

#[tokio::test]
async fn identical_documents_report_minimal_risk() {
    let original = clean_reader();
    let candidate = clean_reader();

    let report = engine()
        .run_with_readers(
            &original,
            Path::new("a.pdf"),
            Some((&candidate as &dyn DocumentReader, Path::new("b.pdf"))),
            None,
            None,
        )
        .await
        .unwrap();

    assert_eq!(report.risk_level, RiskLevel::Minimal);
    assert_eq!(report.text.document_similarity, 1.0);
    assert_eq!(report.visual.significant_pages, 0);
    assert!(report.metadata.pdf_metadata_match);
    assert!(report.metadata.file_info_match);
    assert!(report.findings.is_empty());
    assert_eq!(report.comparison.as_ref().unwrap().name, "b.pdf");
}

#[tokio::test]
async fn single_document_mode_inspects_one_file() {
    let original = clean_reader();
    let report = engine()
        .run_with_readers(&original, Path::new("a.pdf"), None, None, None)
        .await
        .unwrap();

    assert!(report.comparison.is_none());
    assert_eq!(report.text.document_similarity, 1.0);
    assert_eq!(report.visual.average_ssim, 1.0);
    assert!(report.tampering.is_some());
}

#[tokio::test]
async fn appended_revision_raises_structure_finding() {
    // Three EOF markers: one revision appended after an ordinary save
    let original = StubReader::new(pdf_bytes_with_eof_markers(3)).with_page("body");
    let report = engine()
        .run_with_readers(&original, Path::new("a.pdf"), None, None, None)
        .await
        .unwrap();

    let finding = report
        .findings
        .iter()
        .find(|f| f.title == "Incremental Updates Present")
        .expect("incremental update finding");
    assert_eq!(finding.category, FindingCategory::Structure);
    assert_eq!(finding.severity, Severity::Medium);
    let tampering = report.tampering.unwrap();
    assert!(tampering.score >= 20.0);
}

#[tokio::test]
async fn partial_signature_coverage_is_flagged_high() {
    let original = StubReader::new(signed_pdf_bytes(true)).with_page("signed body");
    let report = engine()
        .run_with_readers(&original, Path::new("signed.pdf"), None, None, None)
        .await
        .unwrap();

    let finding = report
        .findings
        .iter()
        .find(|f| f.title == "Partial Signature Coverage")
        .expect("partial coverage finding");
    assert_eq!(finding.severity, Severity::High);
    assert_eq!(finding.category, FindingCategory::Signatures);
}

#[tokio::test]
async fn whole_document_signature_is_not_flagged_partial() {
    let original = StubReader::new(signed_pdf_bytes(false)).with_page("signed body");
    let report = engine()
        .run_with_readers(&original, Path::new("signed.pdf"), None, None, None)
        .await
        .unwrap();

    assert!(report
        .findings
        .iter()
        .all(|f| f.title != "Partial Signature Coverage"));
}

#[tokio::test]
async fn stripped_signature_in_comparison_is_reported() {
    let original = StubReader::new(signed_pdf_bytes(false)).with_page("signed body");
    let candidate = StubReader::new(pdf_bytes_with_eof_markers(2)).with_page("signed body");

    let report = engine()
        .run_with_readers(
            &original,
            Path::new("a.pdf"),
            Some((&candidate as &dyn DocumentReader, Path::new("b.pdf"))),
            None,
            None,
        )
        .await
        .unwrap();

    let finding = report
        .findings
        .iter()
        .find(|f| f.title == "Signature Removed")
        .expect("signature removal finding");
    assert_eq!(finding.severity, Severity::High);
    assert_eq!(finding.category, FindingCategory::Signatures);
}

#[tokio::test]
async fn inserted_text_lowers_similarity() {
    let original = StubReader::new(pdf_bytes_with_eof_markers(2)).with_page("The cat sat.");
    let candidate = StubReader::new(pdf_bytes_with_eof_markers(2)).with_page("The big cat sat.");

    let report = engine()
        .run_with_readers(
            &original,
            Path::new("a.pdf"),
            Some((&candidate as &dyn DocumentReader, Path::new("b.pdf"))),
            None,
            None,
        )
        .await
        .unwrap();

    assert_eq!(report.text.document_similarity, 0.75);
    assert_eq!(report.text.pages.len(), 1);
    let finding = report
        .findings
        .iter()
        .find(|f| f.category == FindingCategory::Text)
        .expect("text finding");
    assert_eq!(finding.severity, Severity::Medium);
    assert_eq!(finding.page, Some(0));
}

#[tokio::test]
async fn visually_different_pages_are_significant() {
    let original = StubReader::new(pdf_bytes_with_eof_markers(2))
        .with_page("same")
        .with_page_image(solid_image(64, 64, [255, 255, 255]));
    let candidate = StubReader::new(pdf_bytes_with_eof_markers(2))
        .with_page("same")
        .with_page_image(solid_image(64, 64, [0, 0, 0]));

    let report = engine()
        .run_with_readers(
            &original,
            Path::new("a.pdf"),
            Some((&candidate as &dyn DocumentReader, Path::new("b.pdf"))),
            None,
            None,
        )
        .await
        .unwrap();

    assert_eq!(report.visual.significant_pages, 1);
    assert!(report.visual.average_ssim < 0.5);
    assert!(report
        .findings
        .iter()
        .any(|f| f.category == FindingCategory::Visual));
    assert!(report.risk_score > 0.0);
}

#[tokio::test]
async fn cancellation_aborts_without_a_report() {
    let original = clean_reader();
    let token = CancelToken::new();
    token.cancel();

    let result = engine()
        .run_with_readers(&original, Path::new("a.pdf"), None, None, Some(&token))
        .await;
    assert!(matches!(result, Err(Error::Cancelled)));
}

#[tokio::test]
async fn progress_reaches_completion_monotonically() {
    let original = clean_reader();
    let fractions = Arc::new(Mutex::new(Vec::new()));
    let sink = fractions.clone();
    let callback = Arc::new(Mutex::new(Box::new(move |update: ProgressUpdate| {
        sink.lock().push(update.fraction);
    }) as Box<dyn FnMut(ProgressUpdate) + Send>));

    engine()
        .run_with_readers(&original, Path::new("a.pdf"), None, Some(callback), None)
        .await
        .unwrap();

    let fractions = fractions.lock();
    assert!(fractions.len() >= 2);
    assert_eq!(*fractions.first().unwrap(), 0.0);
    assert_eq!(*fractions.last().unwrap(), 1.0);
    assert!(fractions.windows(2).all(|pair| pair[0] <= pair[1]));
}

#[tokio::test]
async fn missing_tools_surface_as_advisory() {
    let config = AnalysisConfig::default();
    let engine = DetectionEngine::with_tools(config, ToolAvailability::none()).unwrap();
    let original = clean_reader();

    let report = engine
        .run_with_readers(&original, Path::new("a.pdf"), None, None, None)
        .await
        .unwrap();

    let external = report.external.expect("external summary");
    assert!(!external.missing_tools.is_empty());
    let advisory = report
        .findings
        .iter()
        .find(|f| f.title == "External Tools Unavailable")
        .expect("missing-tool advisory");
    assert_eq!(advisory.severity, Severity::Info);
    assert_eq!(advisory.category, FindingCategory::ExternalTools);
}

#[tokio::test]
async fn findings_are_sorted_by_descending_severity() {
    let original = StubReader::new(signed_pdf_bytes(true)).with_page("The cat sat.");
    let candidate =
        StubReader::new(pdf_bytes_with_eof_markers(2)).with_page("A different sentence.");

    let report = engine()
        .run_with_readers(
            &original,
            Path::new("a.pdf"),
            Some((&candidate as &dyn DocumentReader, Path::new("b.pdf"))),
            None,
            None,
        )
        .await
        .unwrap();

    assert!(report.findings.len() >= 2);
    let ranks: Vec<u32> = report.findings.iter().map(|f| f.severity.weight()).collect();
    assert!(ranks.windows(2).all(|pair| pair[0] >= pair[1]));
}
