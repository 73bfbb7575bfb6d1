//! Metadata/structure comparator: diffs extracted metadata, font
//! inventories, page geometry, and annotation/link counts between two
//! document snapshots.

use std::collections::{BTreeMap, BTreeSet};

use crate::types::report::MetadataComparison;
use crate::types::{DocumentSnapshot, Finding, FindingCategory, FontDetail, PdfMetadata, Severity};

/// Compares Info-dictionary metadata and byte-level internals
pub fn compare_info(a: &DocumentSnapshot, b: &DocumentSnapshot) -> MetadataComparison {
    let mut differences = Vec::new();
    let mut timestamp_anomalies = Vec::new();

    diff_field(&mut differences, "Title", &a.metadata.title, &b.metadata.title);
    diff_field(&mut differences, "Author", &a.metadata.author, &b.metadata.author);
    diff_field(&mut differences, "Subject", &a.metadata.subject, &b.metadata.subject);
    diff_field(&mut differences, "Keywords", &a.metadata.keywords, &b.metadata.keywords);
    diff_field(&mut differences, "Creator", &a.metadata.creator, &b.metadata.creator);
    diff_field(&mut differences, "Producer", &a.metadata.producer, &b.metadata.producer);
    diff_field(
        &mut differences,
        "CreationDate",
        &a.metadata.creation_date,
        &b.metadata.creation_date,
    );
    diff_field(
        &mut differences,
        "ModDate",
        &a.metadata.modification_date,
        &b.metadata.modification_date,
    );

    if a.metadata.encrypted != b.metadata.encrypted {
        differences.push(
            Finding::new(
                FindingCategory::Security,
                Severity::Medium,
                "Encryption State Changed",
                format!(
                    "Original encrypted: {}, comparison encrypted: {}",
                    a.metadata.encrypted, b.metadata.encrypted
                ),
            ),
        );
    }

    for (label, snapshot) in [("original", a), ("comparison", b)] {
        if let Some(anomaly) = modified_before_created(&snapshot.metadata) {
            timestamp_anomalies.push(format!("{}: {}", label, anomaly));
        }
    }
    if a.metadata.creation_date.is_some()
        && b.metadata.creation_date.is_some()
        && a.metadata.creation_date != b.metadata.creation_date
    {
        timestamp_anomalies.push("creation dates differ between versions".to_string());
    }
    if a.metadata.permanent_id.is_some() && a.metadata.permanent_id != b.metadata.permanent_id {
        timestamp_anomalies
            .push("permanent document ID changed; files have different origins".to_string());
        differences.push(Finding::new(
            FindingCategory::Metadata,
            Severity::High,
            "Permanent Document ID Changed",
            "The permanent half of the /ID pair differs; the comparison file was \
             not produced by updating the original.",
        ));
    }
    if a.metadata.permanent_id.is_some()
        && a.metadata.permanent_id == b.metadata.permanent_id
        && a.metadata.instance_id != b.metadata.instance_id
    {
        timestamp_anomalies.push(
            "instance document ID changed under the same permanent ID; the \
             comparison file is a resaved revision of the original"
                .to_string(),
        );
    }

    let pdf_metadata_match = differences.is_empty();
    let file_info_match = a.file_info.sha256 == b.file_info.sha256;

    MetadataComparison {
        pdf_metadata_match,
        file_info_match,
        timestamp_anomalies,
        differences,
    }
}

/// Compares structural internals: fonts, pages, geometry, annotations,
/// links, object counts. Findings are appended to the metadata comparison.
pub fn compare_structure(a: &DocumentSnapshot, b: &DocumentSnapshot, out: &mut MetadataComparison) {
    if a.page_count != b.page_count {
        out.differences.push(
            Finding::new(
                FindingCategory::Structure,
                Severity::High,
                "Page Count Changed",
                format!("{} pages vs {} pages", a.page_count, b.page_count),
            ),
        );
    }

    for page in 0..a.page_bounds.len().min(b.page_bounds.len()) {
        let (wa, ha) = a.page_bounds[page];
        let (wb, hb) = b.page_bounds[page];
        if (wa - wb).abs() > 0.5 || (ha - hb).abs() > 0.5 {
            out.differences.push(
                Finding::new(
                    FindingCategory::Structure,
                    Severity::Medium,
                    "Page Geometry Changed",
                    format!(
                        "page {}: {:.0}x{:.0} vs {:.0}x{:.0} units",
                        page + 1,
                        wa,
                        ha,
                        wb,
                        hb
                    ),
                )
                .on_page(page),
            );
        }
    }

    let fonts_a: BTreeSet<&str> = a.metadata.fonts.iter().map(|f| f.name.as_str()).collect();
    let fonts_b: BTreeSet<&str> = b.metadata.fonts.iter().map(|f| f.name.as_str()).collect();
    for added in fonts_b.difference(&fonts_a) {
        out.differences.push(
            Finding::new(
                FindingCategory::Structure,
                Severity::Medium,
                "Font Added",
                format!("Font '{}' present only in the comparison document", added),
            )
            .with_detail("font", *added),
        );
    }
    for removed in fonts_a.difference(&fonts_b) {
        out.differences.push(
            Finding::new(
                FindingCategory::Structure,
                Severity::Low,
                "Font Removed",
                format!("Font '{}' present only in the original document", removed),
            )
            .with_detail("font", *removed),
        );
    }

    let details_a: BTreeMap<&str, &FontDetail> = a
        .metadata
        .fonts
        .iter()
        .map(|f| (f.name.as_str(), f))
        .collect();
    for font in &b.metadata.fonts {
        if let Some(prior) = details_a.get(font.name.as_str()) {
            if **prior != *font {
                out.differences.push(
                    Finding::new(
                        FindingCategory::Structure,
                        Severity::Medium,
                        "Font Attributes Changed",
                        format!(
                            "Font '{}': {} vs {}",
                            font.name,
                            describe_font(prior),
                            describe_font(font)
                        ),
                    )
                    .with_detail("font", font.name.as_str()),
                );
            }
        }
    }

    let (annots_a, links_a) = annotation_counts(a);
    let (annots_b, links_b) = annotation_counts(b);
    if annots_a != annots_b {
        out.differences.push(Finding::new(
            FindingCategory::Structure,
            Severity::Low,
            "Annotation Count Changed",
            format!("{} annotations vs {}", annots_a, annots_b),
        ));
    }
    if links_a != links_b {
        out.differences.push(Finding::new(
            FindingCategory::Structure,
            Severity::Low,
            "Link Count Changed",
            format!("{} links vs {}", links_a, links_b),
        ));
    }

    if a.metadata.object_count != b.metadata.object_count {
        out.differences.push(
            Finding::new(
                FindingCategory::Structure,
                Severity::Low,
                "Object Count Changed",
                format!(
                    "{} objects vs {}",
                    a.metadata.object_count, b.metadata.object_count
                ),
            ),
        );
    }
    if b.metadata.incremental_updates > a.metadata.incremental_updates {
        out.differences.push(Finding::new(
            FindingCategory::Structure,
            Severity::High,
            "Additional Incremental Updates",
            format!(
                "Comparison document carries {} incremental update(s), original {}",
                b.metadata.incremental_updates, a.metadata.incremental_updates
            ),
        ));
    }

    out.pdf_metadata_match = out.differences.is_empty();
}

fn describe_font(font: &FontDetail) -> String {
    format!(
        "{}, {}{}",
        font.subtype,
        if font.embedded { "embedded" } else { "not embedded" },
        if font.subset { ", subset" } else { "" }
    )
}

fn annotation_counts(snapshot: &DocumentSnapshot) -> (usize, usize) {
    let total = snapshot.page_annotations.iter().map(Vec::len).sum();
    let links = snapshot
        .page_annotations
        .iter()
        .flatten()
        .filter(|a| a.subtype.eq_ignore_ascii_case("Link"))
        .count();
    (total, links)
}

fn diff_field(
    differences: &mut Vec<Finding>,
    field: &str,
    a: &Option<String>,
    b: &Option<String>,
) {
    if a != b {
        differences.push(
            Finding::new(
                FindingCategory::Metadata,
                Severity::Medium,
                format!("{} Changed", field),
                format!(
                    "'{}' vs '{}'",
                    a.as_deref().unwrap_or("<unset>"),
                    b.as_deref().unwrap_or("<unset>")
                ),
            )
            .with_detail("field", field),
        );
    }
}

/// Normalizes a PDF (`D:YYYYMMDDHHmmSS`) or ISO-8601 date to a sortable
/// digit string; returns None when no digits are present.
pub fn normalize_date(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    (digits.len() >= 8).then(|| digits[..digits.len().min(14)].to_string())
}

fn modified_before_created(metadata: &PdfMetadata) -> Option<String> {
    let created = normalize_date(metadata.creation_date.as_deref()?)?;
    let modified = normalize_date(metadata.modification_date.as_deref()?)?;
    (modified < created).then(|| {
        format!(
            "modification date {} precedes creation date {}",
            modified, created
        )
    })
}
