//! Font/object inspector adapter: `mutool` preferred, `pdffonts` as the
//! fallback. Free-text scraping is inherently fragile, so the parsers
//! accept partial output and return whatever facts they recognize.

use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;

use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::external::invoke::invoke;
use crate::external::probe::ToolAvailability;
use crate::external::FontInspection;

lazy_static! {
    // mutool info font lines: "    12  (34 0 R)  Type1 'Helvetica'"
    static ref MUTOOL_FONT: Regex =
        Regex::new(r"(?m)^\s+\d+\s+\(\d+ 0 R\)\s+\S+\s+'?([^'\r\n]+)'?\s*$").unwrap();
    static ref MUTOOL_PAGE_RES: Regex = Regex::new(r"(?m)^Page (\d+):\s*(\d+) resources").unwrap();
    // xref listing lines: "00012: 0000004321 00000 n" / "... f"
    static ref XREF_ENTRY: Regex = Regex::new(r"(?m)^\s*\d+:?\s+\d{5,10}\s+\d+\s+([nf])\b").unwrap();
    static ref PREV_OFFSET: Regex = Regex::new(r"/Prev\s+(\d+)").unwrap();
    // pdffonts columns: name first, after a two-line header
    static ref PDFFONTS_ROW: Regex = Regex::new(r"(?m)^(\S[^\r\n]{0,60}?)\s{2,}\S").unwrap();
}

/// Runs the available inspector on one document. Returns `Ok(None)` when
/// neither tool is installed.
pub async fn inspect(
    tools: &ToolAvailability,
    path: &Path,
    config: &AnalysisConfig,
) -> Result<Option<FontInspection>> {
    let timeout = config.tool_timeout();
    let file = path.to_string_lossy();

    if let Some(mutool) = tools.mutool().await {
        let info = invoke("mutool", &mutool, &["info", "-F", &file], None, timeout).await?;
        let mut inspection = parse_mutool_info(&info.stdout);
        // The xref dump is a separate sub-operation; its failure only
        // drops the object-count facts.
        if let Ok(xref) = invoke(
            "mutool",
            &mutool,
            &["show", &file, "trailer"],
            None,
            timeout,
        )
        .await
        {
            let (free, in_use, prev) = parse_xref_dump(&xref.stdout);
            inspection.free_objects = free;
            inspection.in_use_objects = in_use;
            inspection.prev_xref_offsets = prev;
        }
        return Ok(Some(inspection));
    }

    if let Some(pdffonts) = tools.pdffonts().await {
        let output = invoke("pdffonts", &pdffonts, &[&file], None, timeout).await?;
        return Ok(Some(FontInspection {
            fonts: parse_pdffonts(&output.stdout),
            ..Default::default()
        }));
    }

    Ok(None)
}

/// Parses `mutool info -F` output: font list plus per-page resource counts
pub fn parse_mutool_info(stdout: &str) -> FontInspection {
    let mut fonts: Vec<String> = MUTOOL_FONT
        .captures_iter(stdout)
        .map(|c| c[1].trim().to_string())
        .collect();
    fonts.sort();
    fonts.dedup();

    let mut page_resource_counts = Vec::new();
    for caps in MUTOOL_PAGE_RES.captures_iter(stdout) {
        let page: usize = caps[1].parse().unwrap_or(0);
        let count: usize = caps[2].parse().unwrap_or(0);
        if page > 0 {
            if page_resource_counts.len() < page {
                page_resource_counts.resize(page, 0);
            }
            page_resource_counts[page - 1] = count;
        }
    }

    FontInspection {
        fonts,
        page_resource_counts,
        ..Default::default()
    }
}

/// Parses an xref/trailer dump into free/in-use counts and /Prev offsets
pub fn parse_xref_dump(stdout: &str) -> (usize, usize, Vec<u64>) {
    let mut free = 0;
    let mut in_use = 0;
    for caps in XREF_ENTRY.captures_iter(stdout) {
        match &caps[1] {
            "f" => free += 1,
            _ => in_use += 1,
        }
    }
    let mut prev: Vec<u64> = PREV_OFFSET
        .captures_iter(stdout)
        .filter_map(|c| c[1].parse().ok())
        .collect();
    prev.sort_unstable();
    prev.dedup();
    (free, in_use, prev)
}

/// Parses `pdffonts` tabular output: font names from the first column
pub fn parse_pdffonts(stdout: &str) -> Vec<String> {
    let mut fonts: Vec<String> = stdout
        .lines()
        .skip(2) // header and separator rows
        .filter_map(|line| {
            PDFFONTS_ROW
                .captures(line)
                .map(|c| c[1].trim().to_string())
        })
        .filter(|name| !name.is_empty())
        .collect();
    fonts.sort();
    fonts.dedup();
    fonts
}
