//! Metadata extractor adapter around `exiftool`, plus attachment
//! extraction through `mutool` into a per-run temp directory.

use std::collections::BTreeMap;
use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;

use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::external::invoke::{invoke, TempDirGuard};
use crate::external::probe::ToolAvailability;
use crate::external::MetadataInspection;

lazy_static! {
    // "-G1 -s" line form: "[XMP-xmpMM]     HistoryAction : saved, saved"
    static ref EXIF_LINE: Regex =
        Regex::new(r"(?m)^\[([^\]]+)\]\s+(\S+)\s*:\s*(.+?)\s*$").unwrap();
    static ref DECIMAL: Regex = Regex::new(r"-?\d+(?:\.\d+)?").unwrap();
}

/// Runs the metadata extractor on one document. Returns `Ok(None)` when
/// exiftool is not installed.
pub async fn inspect(
    tools: &ToolAvailability,
    path: &Path,
    config: &AnalysisConfig,
) -> Result<Option<MetadataInspection>> {
    let Some(exiftool) = tools.exiftool().await else {
        return Ok(None);
    };
    let timeout = config.tool_timeout();
    let file = path.to_string_lossy();

    let output = invoke(
        "exiftool",
        &exiftool,
        &["-a", "-G1", "-s", "-n", &file],
        None,
        timeout,
    )
    .await?;
    let mut inspection = parse_exiftool(&output.stdout);

    // Attachment extraction is a separate sub-operation; its failure only
    // leaves the attachment list empty.
    if let Some(mutool) = tools.mutool().await {
        if let Ok(guard) = TempDirGuard::new(config.temp_root.as_deref()) {
            let absolute = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
            if invoke(
                "mutool",
                &mutool,
                &["extract", &absolute.to_string_lossy()],
                Some(guard.path()),
                timeout,
            )
            .await
            .is_ok()
            {
                inspection.attachments = guard.entries();
            }
            // guard drops here; extracted files are inspected by name only
        }
    }

    Ok(Some(inspection))
}

/// Parses `exiftool -a -G1 -s -n` output into grouped metadata plus the
/// date, history, namespace and GPS facts the analyzer consumes.
pub fn parse_exiftool(stdout: &str) -> MetadataInspection {
    let mut inspection = MetadataInspection::default();
    let mut latitude: Option<f64> = None;
    let mut longitude: Option<f64> = None;

    for caps in EXIF_LINE.captures_iter(stdout) {
        let group = caps[1].to_string();
        let tag = caps[2].to_string();
        let value = caps[3].to_string();

        match tag.as_str() {
            "CreateDate" if inspection.creation_date.is_none() => {
                inspection.creation_date = Some(value.clone());
            }
            "ModifyDate" if inspection.modification_date.is_none() => {
                inspection.modification_date = Some(value.clone());
            }
            "MetadataDate" if inspection.metadata_date.is_none() => {
                inspection.metadata_date = Some(value.clone());
            }
            "HistoryAction" => {
                inspection
                    .history
                    .extend(value.split(',').map(|s| s.trim().to_string()));
            }
            "GPSLatitude" => latitude = first_decimal(&value),
            "GPSLongitude" => longitude = first_decimal(&value),
            _ => {}
        }

        if let Some(namespace) = group.strip_prefix("XMP-") {
            if !inspection.xmp_namespaces.iter().any(|n| n == namespace) {
                inspection.xmp_namespaces.push(namespace.to_string());
            }
        }
        inspection
            .grouped
            .entry(group)
            .or_default()
            .insert(tag, value);
    }

    inspection.xmp_namespaces.sort();
    if let (Some(lat), Some(lon)) = (latitude, longitude) {
        inspection.gps = Some((lat, lon));
    }
    inspection
}

fn first_decimal(value: &str) -> Option<f64> {
    DECIMAL.find(value).and_then(|m| m.as_str().parse().ok())
}
