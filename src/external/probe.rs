//! Process-lifetime tool-availability cache.
//!
//! Probed once on first use via standard install paths plus a `which`
//! fallback, then reused across sequential calls within one engine
//! instance. Constructed explicitly and owned by the orchestrator so
//! tests can inject a "no tools available" instance deterministically.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tokio::process::Command;
use tracing::debug;

const STANDARD_PATHS: &[&str] = &["/usr/bin", "/usr/local/bin", "/opt/homebrew/bin"];

#[derive(Debug, Clone, Default)]
struct ProbedTools {
    mutool: Option<PathBuf>,
    pdffonts: Option<PathBuf>,
    exiftool: Option<PathBuf>,
}

/// Lazily probed, engine-owned availability cache
#[derive(Debug, Default)]
pub struct ToolAvailability {
    probed: Mutex<Option<ProbedTools>>,
    disabled: bool,
}

impl ToolAvailability {
    pub fn new() -> Self {
        Self::default()
    }

    /// An instance that reports every tool as missing, for tests and for
    /// `--no-external-tools` runs.
    pub fn none() -> Self {
        Self {
            probed: Mutex::new(None),
            disabled: true,
        }
    }

    pub async fn mutool(&self) -> Option<PathBuf> {
        self.resolved().await.mutool
    }

    pub async fn pdffonts(&self) -> Option<PathBuf> {
        self.resolved().await.pdffonts
    }

    pub async fn exiftool(&self) -> Option<PathBuf> {
        self.resolved().await.exiftool
    }

    pub async fn missing_tools(&self) -> Vec<String> {
        let probed = self.resolved().await;
        let mut missing = Vec::new();
        if probed.mutool.is_none() && probed.pdffonts.is_none() {
            missing.push("font-inspector (mutool/pdffonts)".to_string());
        }
        if probed.exiftool.is_none() {
            missing.push("metadata-extractor (exiftool)".to_string());
        }
        missing
    }

    async fn resolved(&self) -> ProbedTools {
        if self.disabled {
            return ProbedTools::default();
        }
        if let Some(probed) = self.probed.lock().clone() {
            return probed;
        }
        // Probe outside the lock; a racing caller at worst probes twice
        let probed = ProbedTools {
            mutool: locate("mutool").await,
            pdffonts: locate("pdffonts").await,
            exiftool: locate("exiftool").await,
        };
        debug!(
            "tool probe: mutool={:?} pdffonts={:?} exiftool={:?}",
            probed.mutool, probed.pdffonts, probed.exiftool
        );
        *self.probed.lock() = Some(probed.clone());
        probed
    }
}

async fn locate(name: &str) -> Option<PathBuf> {
    for dir in STANDARD_PATHS {
        let candidate = Path::new(dir).join(name);
        let is_file = tokio::fs::metadata(&candidate)
            .await
            .map(|meta| meta.is_file())
            .unwrap_or(false);
        if is_file {
            return Some(candidate);
        }
    }
    // Lookup fallback through the shell resolver
    let output = Command::new("which").arg(name).output().await.ok()?;
    if !output.status.success() {
        return None;
    }
    let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!path.is_empty()).then(|| PathBuf::from(path))
}
