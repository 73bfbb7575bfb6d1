//! Report serialization.
//!
//! The JSON export is canonical: keys are emitted in sorted order (the
//! default `serde_json::Map` is backed by a `BTreeMap`), so two reports
//! with the same content serialize to identical bytes apart from the
//! run identity fields.

use serde_json::{json, Map, Value};

use crate::error::{Error, Result};
use crate::types::{DetectionReport, FileReference, Finding, FindingCategory, RiskLevel, Severity};

/// Canonical JSON rendition of a report.
pub fn to_json(report: &DetectionReport) -> Value {
    let mut root = Map::new();
    root.insert("generatedAt".into(), json!(report.generated_at));
    root.insert("version".into(), json!(report.version));
    root.insert("riskScore".into(), json!(report.risk_score));
    root.insert("riskLevel".into(), json!(report.risk_level.to_string()));
    root.insert(
        "originalFile".into(),
        file_value(&report.original.name, &report.original.path, report.original.size, &report.original.checksum),
    );
    if let Some(comparison) = &report.comparison {
        root.insert(
            "comparisonFile".into(),
            file_value(&comparison.name, &comparison.path, comparison.size, &comparison.checksum),
        );
    }
    root.insert(
        "textSimilarity".into(),
        json!(report.text.document_similarity),
    );
    root.insert("visualSimilarity".into(), json!(report.visual.average_ssim));
    root.insert(
        "findings".into(),
        Value::Array(report.findings.iter().map(finding_value).collect()),
    );
    root.insert(
        "metadata".into(),
        json!({
            "pdfMetadataMatch": report.metadata.pdf_metadata_match,
            "fileInfoMatch": report.metadata.file_info_match,
            "timestampAnomalies": report.metadata.timestamp_anomalies,
            "differenceCount": report.metadata.differences.len(),
        }),
    );
    Value::Object(root)
}

pub fn to_json_string(report: &DetectionReport) -> Result<String> {
    serde_json::to_string_pretty(&to_json(report))
        .map_err(|e| Error::Serialization(e.to_string()))
}

fn file_value(name: &str, path: &str, size: u64, checksum: &str) -> Value {
    json!({
        "name": name,
        "path": path,
        "size": size,
        "sizeFormatted": format_size(size),
        "checksum": checksum,
    })
}

fn finding_value(finding: &Finding) -> Value {
    let mut entry = Map::new();
    entry.insert("category".into(), json!(finding.category.to_string()));
    entry.insert("severity".into(), json!(finding.severity.to_string()));
    entry.insert("title".into(), json!(finding.title));
    entry.insert("description".into(), json!(finding.description));
    if let Some(details) = &finding.details {
        entry.insert("details".into(), json!(details));
    }
    if let Some(page) = finding.page {
        // 1-based in the export, 0-based internally
        entry.insert("pageNumber".into(), json!(page + 1));
    }
    Value::Object(entry)
}

/// Summary parsed back from a canonical JSON report.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportSummary {
    pub generated_at: String,
    pub version: String,
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    pub text_similarity: f64,
    pub visual_similarity: f64,
    pub original: FileReference,
    pub comparison: Option<FileReference>,
    pub findings: Vec<Finding>,
}

pub fn from_json(value: &Value) -> Result<ReportSummary> {
    let object = value
        .as_object()
        .ok_or_else(|| Error::Serialization("report root is not an object".into()))?;
    let string = |key: &str| -> Result<String> {
        object
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| Error::Serialization(format!("missing string field '{}'", key)))
    };
    let number = |key: &str| -> Result<f64> {
        object
            .get(key)
            .and_then(Value::as_f64)
            .ok_or_else(|| Error::Serialization(format!("missing numeric field '{}'", key)))
    };
    let risk_level = match string("riskLevel")?.as_str() {
        "high" => RiskLevel::High,
        "medium" => RiskLevel::Medium,
        "low" => RiskLevel::Low,
        "minimal" => RiskLevel::Minimal,
        other => {
            return Err(Error::Serialization(format!(
                "unknown risk level '{}'",
                other
            )))
        }
    };
    let findings = object
        .get("findings")
        .and_then(Value::as_array)
        .map(|entries| entries.iter().map(finding_from_json).collect::<Result<Vec<_>>>())
        .transpose()?
        .unwrap_or_default();
    Ok(ReportSummary {
        generated_at: string("generatedAt")?,
        version: string("version")?,
        risk_score: number("riskScore")?,
        risk_level,
        text_similarity: number("textSimilarity")?,
        visual_similarity: number("visualSimilarity")?,
        original: object
            .get("originalFile")
            .map(file_reference_from_json)
            .transpose()?
            .ok_or_else(|| Error::Serialization("missing 'originalFile'".into()))?,
        comparison: object
            .get("comparisonFile")
            .map(file_reference_from_json)
            .transpose()?,
        findings,
    })
}

fn file_reference_from_json(value: &Value) -> Result<FileReference> {
    let object = value
        .as_object()
        .ok_or_else(|| Error::Serialization("file reference is not an object".into()))?;
    let string = |key: &str| -> Result<String> {
        object
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| Error::Serialization(format!("missing string field '{}'", key)))
    };
    Ok(FileReference {
        name: string("name")?,
        path: string("path")?,
        size: object
            .get("size")
            .and_then(Value::as_u64)
            .ok_or_else(|| Error::Serialization("missing numeric field 'size'".into()))?,
        checksum: string("checksum")?,
    })
}

fn finding_from_json(value: &Value) -> Result<Finding> {
    let object = value
        .as_object()
        .ok_or_else(|| Error::Serialization("finding is not an object".into()))?;
    let string = |key: &str| -> Result<String> {
        object
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| Error::Serialization(format!("missing string field '{}'", key)))
    };
    // Category and severity re-enter through their serde renames, which
    // match the Display strings the export uses
    let category: FindingCategory =
        serde_json::from_value(json!(string("category")?)).map_err(Error::from)?;
    let severity: Severity =
        serde_json::from_value(json!(string("severity")?)).map_err(Error::from)?;
    let mut finding = Finding::new(category, severity, string("title")?, string("description")?);
    if let Some(details) = object.get("details") {
        finding.details = Some(serde_json::from_value(details.clone()).map_err(Error::from)?);
    }
    if let Some(page) = object.get("pageNumber").and_then(Value::as_u64) {
        // 1-based in the export, 0-based internally
        finding.page = (page as usize).checked_sub(1);
    }
    Ok(finding)
}

/// Plain-text rendition for terminal output.
pub fn render_text(report: &DetectionReport) -> String {
    let mut out = String::new();
    out.push_str("PDF Tampering Detection Report\n");
    out.push_str("==============================\n\n");
    out.push_str(&format!("Generated: {}\n", report.generated_at));
    out.push_str(&format!(
        "Original:  {} ({})\n",
        report.original.name,
        format_size(report.original.size)
    ));
    if let Some(comparison) = &report.comparison {
        out.push_str(&format!(
            "Candidate: {} ({})\n",
            comparison.name,
            format_size(comparison.size)
        ));
        out.push_str(&format!(
            "Text similarity:   {:.1}%\n",
            report.text.document_similarity * 100.0
        ));
        out.push_str(&format!(
            "Visual similarity: {:.1}%\n",
            report.visual.average_ssim * 100.0
        ));
    }
    out.push_str(&format!(
        "Risk: {:.0}/100 ({})\n",
        report.risk_score, report.risk_level
    ));
    if let Some(tampering) = &report.tampering {
        out.push_str(&format!(
            "Tampering likelihood: {} (score {:.0})\n",
            tampering.likelihood, tampering.score
        ));
    }
    out.push('\n');

    if report.findings.is_empty() {
        out.push_str("No findings.\n");
    } else {
        out.push_str(&format!("Findings ({}):\n", report.findings.len()));
        for finding in &report.findings {
            let page = finding
                .page
                .map(|p| format!(" [page {}]", p + 1))
                .unwrap_or_default();
            out.push_str(&format!(
                "  {:<8} {:<14} {}{}\n           {}\n",
                finding.severity, finding.category, finding.title, page, finding.description
            ));
        }
    }
    if let Some(external) = &report.external {
        if !external.missing_tools.is_empty() {
            out.push_str(&format!(
                "\nMissing external tools: {}\n",
                external.missing_tools.join(", ")
            ));
        }
    }
    out
}

fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}
