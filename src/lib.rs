//! PDF tampering detection library.
//! Compares two renditions of a document (or inspects a single one) and
//! produces a weighted forensic report: byte-level structure heuristics,
//! text and visual diffs, metadata comparison, signature and hidden-content
//! analysis, plus optional signals from external PDF tooling.

// Configuration and core pipeline
pub mod config;
pub mod engine;
pub mod error;
pub mod hash_utils;
pub mod types;

// Stage building blocks
pub mod compare;
pub mod extract;
pub mod external;
pub mod forensic;
pub mod reader;
pub mod tampering;

// Terminal artifact
pub mod report;

pub use config::AnalysisConfig;
pub use engine::{AnalysisStage, CancelToken, DetectionEngine, ProgressCallback, ProgressUpdate};
pub use error::{Error, Result};
pub use reader::{DocumentReader, LopdfReader};
pub use tampering::{IndicatorKind, Likelihood, TamperingAnalysis, TamperingIndicator};
pub use types::{
    DetectionReport, Finding, FindingCategory, RiskLevel, Severity,
};
