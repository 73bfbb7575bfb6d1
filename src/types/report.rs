//! Terminal report artifact and its comparison summaries

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::tampering::TamperingAnalysis;
use crate::types::finding::Finding;
use crate::types::snapshot::FileInfo;

/// Risk bucket derived from the clamped risk score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    High,
    Medium,
    Low,
    Minimal,
}

impl RiskLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 70.0 {
            RiskLevel::High
        } else if score >= 40.0 {
            RiskLevel::Medium
        } else if score >= 15.0 {
            RiskLevel::Low
        } else {
            RiskLevel::Minimal
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RiskLevel::High => "high",
            RiskLevel::Medium => "medium",
            RiskLevel::Low => "low",
            RiskLevel::Minimal => "minimal",
        };
        write!(f, "{}", name)
    }
}

/// File identity embedded in every report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileReference {
    pub name: String,
    pub path: String,
    pub size: u64,
    pub checksum: String,
}

impl From<&FileInfo> for FileReference {
    fn from(info: &FileInfo) -> Self {
        Self {
            name: info.name.clone(),
            path: info.path.display().to_string(),
            size: info.size_bytes,
            checksum: info.sha256.clone(),
        }
    }
}

/// Per-page text diff summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageTextResult {
    pub page: usize,
    pub similarity: f64,
    pub inserted_tokens: usize,
    pub deleted_tokens: usize,
}

/// Text comparison stage output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextComparison {
    pub pages: Vec<PageTextResult>,
    /// Weighted by max page length, not a plain average
    pub document_similarity: f64,
}

impl Default for TextComparison {
    fn default() -> Self {
        Self {
            pages: Vec::new(),
            document_similarity: 1.0,
        }
    }
}

/// Per-page visual comparison result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageVisualResult {
    pub page: usize,
    pub ssim: f64,
    pub pixel_difference: f64,
    /// ssim < threshold OR pixel_difference > threshold
    pub significant: bool,
}

/// Visual comparison stage output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualComparison {
    pub pages: Vec<PageVisualResult>,
    pub average_ssim: f64,
    pub significant_pages: usize,
}

impl Default for VisualComparison {
    fn default() -> Self {
        Self {
            pages: Vec::new(),
            average_ssim: 1.0,
            significant_pages: 0,
        }
    }
}

/// Metadata/structure comparison stage output
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataComparison {
    pub pdf_metadata_match: bool,
    pub file_info_match: bool,
    pub timestamp_anomalies: Vec<String>,
    pub differences: Vec<Finding>,
}

impl MetadataComparison {
    pub fn identical() -> Self {
        Self {
            pdf_metadata_match: true,
            file_info_match: true,
            timestamp_anomalies: Vec::new(),
            differences: Vec::new(),
        }
    }
}

/// Condensed external-tool outcome carried in the report
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalToolSummary {
    pub tools_used: Vec<String>,
    pub missing_tools: Vec<String>,
    pub notes: Vec<String>,
}

/// Terminal immutable artifact of one detection run.
/// Built once per run, never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionReport {
    pub id: String,
    pub generated_at: String,
    pub version: String,
    pub original: FileReference,
    pub comparison: Option<FileReference>,
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    pub findings: Vec<Finding>,
    pub text: TextComparison,
    pub visual: VisualComparison,
    pub metadata: MetadataComparison,
    pub external: Option<ExternalToolSummary>,
    pub tampering: Option<TamperingAnalysis>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_level_buckets() {
        assert_eq!(RiskLevel::from_score(0.0), RiskLevel::Minimal);
        assert_eq!(RiskLevel::from_score(14.9), RiskLevel::Minimal);
        assert_eq!(RiskLevel::from_score(15.0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(39.9), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(40.0), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(69.9), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(70.0), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(100.0), RiskLevel::High);
    }
}
