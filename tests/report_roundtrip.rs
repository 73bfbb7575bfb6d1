mod common;

use std::path::Path;

use common::{signed_pdf_bytes, StubReader};
use pdfsleuth::config::AnalysisConfig;
use pdfsleuth::engine::DetectionEngine;
use pdfsleuth::report;
use pdfsleuth::types::RiskLevel;

async fn sample_report() -> pdfsleuth::types::DetectionReport {
    let config = AnalysisConfig {
        enable_external_tools: false,
        ..Default::default()
    };
    let engine = DetectionEngine::new(config).unwrap();
    let original = StubReader::new(signed_pdf_bytes(true))
        .with_page("The quick brown fox.")
        .with_attribute("Title", "Contract")
        .with_attribute("Producer", "LibreOffice 7.4");
    engine
        .run_with_readers(&original, Path::new("contract.pdf"), None, None, None)
        .await
        .unwrap()
}

#[tokio::test]
async fn canonical_json_is_deterministic() {
    let report = sample_report().await;
    let first = report::to_json_string(&report).unwrap();
    let second = report::to_json_string(&report).unwrap();
    assert_eq!(first, second);

    let value = report::to_json(&report);
    let keys: Vec<&str> = value
        .as_object()
        .unwrap()
        .keys()
        .map(String::as_str)
        .collect();
    let mut sorted = keys.clone();
    sorted.sort_unstable();
    assert_eq!(keys, sorted);
}

#[tokio::test]
async fn exported_fields_match_the_report() {
    let report = sample_report().await;
    let value = report::to_json(&report);

    assert_eq!(value["originalFile"]["name"], "contract.pdf");
    assert_eq!(
        value["originalFile"]["checksum"],
        report.original.checksum.as_str()
    );
    assert!(value["originalFile"]["sizeFormatted"]
        .as_str()
        .unwrap()
        .ends_with("B"));
    assert!(value.get("comparisonFile").is_none());
    assert_eq!(
        value["findings"].as_array().unwrap().len(),
        report.findings.len()
    );
    assert_eq!(
        value["metadata"]["differenceCount"],
        report.metadata.differences.len() as u64
    );
}

#[tokio::test]
async fn summary_parses_back_from_json() {
    let report = sample_report().await;
    let value = report::to_json(&report);
    let summary = report::from_json(&value).unwrap();

    assert_eq!(summary.generated_at, report.generated_at);
    assert_eq!(summary.version, report.version);
    assert_eq!(summary.risk_score, report.risk_score);
    assert_eq!(summary.risk_level, report.risk_level);
    assert_eq!(summary.findings.len(), report.findings.len());
}

#[tokio::test]
async fn findings_and_checksums_survive_the_round_trip() {
    let report = sample_report().await;
    let summary = report::from_json(&report::to_json(&report)).unwrap();

    assert_eq!(summary.original.checksum, report.original.checksum);
    assert_eq!(summary.original.name, report.original.name);
    assert!(summary.comparison.is_none());
    assert_eq!(summary.findings.len(), report.findings.len());
    for finding in &report.findings {
        assert!(summary.findings.contains(finding));
    }
}

#[tokio::test]
async fn text_rendition_carries_the_verdict() {
    let report = sample_report().await;
    let text = report::render_text(&report);

    assert!(text.contains("PDF Tampering Detection Report"));
    assert!(text.contains("contract.pdf"));
    assert!(text.contains("Partial Signature Coverage"));
    match report.risk_level {
        RiskLevel::Minimal => assert!(text.contains("(minimal)")),
        RiskLevel::Low => assert!(text.contains("(low)")),
        RiskLevel::Medium => assert!(text.contains("(medium)")),
        RiskLevel::High => assert!(text.contains("(high)")),
    }
}
