//! Shared data model for the detection engine

pub mod finding;
pub mod report;
pub mod snapshot;

pub use finding::{sort_by_severity, Finding, FindingCategory, Severity};
pub use report::{
    DetectionReport, FileReference, MetadataComparison, RiskLevel, TextComparison,
    VisualComparison,
};
pub use snapshot::{
    Annotation, DocumentSnapshot, FileInfo, FontDetail, PageImage, PdfMetadata, XrefKind,
};
