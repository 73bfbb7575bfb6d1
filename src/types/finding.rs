//! Findings: severity-ranked observations attached to a detection report

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Fixed total order: critical > high > medium > low > info
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

impl Severity {
    pub fn weight(self) -> u32 {
        match self {
            Severity::Critical => 100,
            Severity::High => 75,
            Severity::Medium => 50,
            Severity::Low => 25,
            Severity::Info => 0,
        }
    }

    /// Multiplier applied to indicator base weights
    pub fn multiplier(self) -> f64 {
        match self {
            Severity::Critical => 1.5,
            Severity::High => 1.2,
            Severity::Medium => 1.0,
            Severity::Low => 0.6,
            Severity::Info => 0.3,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
            Severity::Info => "info",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingCategory {
    Structure,
    Metadata,
    Text,
    Visual,
    Signatures,
    HiddenContent,
    Redactions,
    Security,
    ToolChain,
    ExternalTools,
}

impl fmt::Display for FindingCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FindingCategory::Structure => "structure",
            FindingCategory::Metadata => "metadata",
            FindingCategory::Text => "text",
            FindingCategory::Visual => "visual",
            FindingCategory::Signatures => "signatures",
            FindingCategory::HiddenContent => "hidden_content",
            FindingCategory::Redactions => "redactions",
            FindingCategory::Security => "security",
            FindingCategory::ToolChain => "tool_chain",
            FindingCategory::ExternalTools => "external_tools",
        };
        write!(f, "{}", name)
    }
}

/// One observation. Findings are append-only during a run, then sorted
/// descending by severity weight before reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub category: FindingCategory,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<usize>,
}

impl Finding {
    pub fn new(
        category: FindingCategory,
        severity: Severity,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            category,
            severity,
            title: title.into(),
            description: description.into(),
            details: None,
            page: None,
        }
    }

    pub fn on_page(mut self, page: usize) -> Self {
        self.page = Some(page);
        self
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }
}

/// Stable descending sort by severity weight; equal-severity findings keep
/// their append order.
pub fn sort_by_severity(findings: &mut [Finding]) {
    findings.sort_by(|a, b| b.severity.weight().cmp(&a.severity.weight()));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(severity: Severity, title: &str) -> Finding {
        Finding::new(FindingCategory::Metadata, severity, title, "d")
    }

    #[test]
    fn severity_order_is_total() {
        assert!(Severity::Critical.weight() > Severity::High.weight());
        assert!(Severity::High.weight() > Severity::Medium.weight());
        assert!(Severity::Medium.weight() > Severity::Low.weight());
        assert!(Severity::Low.weight() > Severity::Info.weight());
        assert_eq!(Severity::Info.weight(), 0);
    }

    #[test]
    fn sort_is_non_increasing_and_stable() {
        let mut findings = vec![
            finding(Severity::Low, "a"),
            finding(Severity::Critical, "b"),
            finding(Severity::Low, "c"),
            finding(Severity::High, "d"),
            finding(Severity::Low, "e"),
        ];
        sort_by_severity(&mut findings);
        let weights: Vec<u32> = findings.iter().map(|f| f.severity.weight()).collect();
        assert!(weights.windows(2).all(|w| w[0] >= w[1]));
        // The three Low findings keep their original relative order
        let lows: Vec<&str> = findings
            .iter()
            .filter(|f| f.severity == Severity::Low)
            .map(|f| f.title.as_str())
            .collect();
        assert_eq!(lows, vec!["a", "c", "e"]);
    }

    #[test]
    fn detail_builder_accumulates() {
        let f = finding(Severity::Info, "t")
            .with_detail("k1", "v1")
            .with_detail("k2", "v2")
            .on_page(3);
        let details = f.details.unwrap();
        assert_eq!(details.len(), 2);
        assert_eq!(f.page, Some(3));
    }
}
