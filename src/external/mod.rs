//! External signal adapter: optional inspection tools probed on standard
//! install paths, invoked with independent timeouts, and parsed into
//! structured facts. Absence of a tool only narrows the signal set.

pub mod font_inspector;
pub mod invoke;
pub mod metadata_tool;
pub mod probe;

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::AnalysisConfig;
use crate::types::report::ExternalToolSummary;

pub use invoke::{invoke, TempDirGuard, ToolOutput};
pub use probe::ToolAvailability;

/// Facts from the font/object inspector
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FontInspection {
    pub fonts: Vec<String>,
    pub page_resource_counts: Vec<usize>,
    pub free_objects: usize,
    pub in_use_objects: usize,
    pub prev_xref_offsets: Vec<u64>,
}

/// Facts from the metadata extractor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataInspection {
    pub xmp_namespaces: Vec<String>,
    pub history: Vec<String>,
    pub creation_date: Option<String>,
    pub modification_date: Option<String>,
    pub metadata_date: Option<String>,
    pub gps: Option<(f64, f64)>,
    pub grouped: BTreeMap<String, BTreeMap<String, String>>,
    pub attachments: Vec<PathBuf>,
}

/// Everything the external adapter produced for one document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalSignals {
    pub font_inspector: Option<FontInspection>,
    pub metadata_tool: Option<MetadataInspection>,
    pub missing_tools: Vec<String>,
    pub failures: Vec<String>,
}

impl ExternalSignals {
    pub fn summary(&self) -> ExternalToolSummary {
        let mut tools_used = Vec::new();
        if self.font_inspector.is_some() {
            tools_used.push("font-inspector".to_string());
        }
        if self.metadata_tool.is_some() {
            tools_used.push("metadata-extractor".to_string());
        }
        ExternalToolSummary {
            tools_used,
            missing_tools: self.missing_tools.clone(),
            notes: self.failures.clone(),
        }
    }
}

/// Gathers all external signals for one document path. Every sub-operation
/// that fails is recorded and substituted with an absent fact; this
/// function itself never fails the run.
pub async fn gather(
    tools: &ToolAvailability,
    path: &std::path::Path,
    config: &AnalysisConfig,
) -> ExternalSignals {
    let mut signals = ExternalSignals {
        missing_tools: tools.missing_tools().await,
        ..Default::default()
    };

    // The two inspectors drive different tools, so they run concurrently
    let (fonts, metadata) = futures::future::join(
        font_inspector::inspect(tools, path, config),
        metadata_tool::inspect(tools, path, config),
    )
    .await;

    match fonts {
        Ok(Some(inspection)) => signals.font_inspector = Some(inspection),
        Ok(None) => {}
        Err(err) => {
            warn!("font inspection degraded: {}", err);
            signals.failures.push(err.to_string());
        }
    }

    match metadata {
        Ok(Some(inspection)) => signals.metadata_tool = Some(inspection),
        Ok(None) => {}
        Err(err) => {
            warn!("metadata extraction degraded: {}", err);
            signals.failures.push(err.to_string());
        }
    }

    signals
}
