//! Byte-level extractor
//!
//! Treats the raw byte stream as text and runs independent pattern scans
//! for structural artifacts: incremental-update boundaries, object counts,
//! feature flags, document identifiers, per-font attributes, XMP history.
//! Every extractor returns a default/empty value when its pattern is
//! absent; malformed input never fails. Identical bytes always yield
//! byte-identical output, so unordered intermediates are sorted before
//! being returned.

use lazy_static::lazy_static;
use regex::bytes::Regex;

use crate::types::{FontDetail, XrefKind};

lazy_static! {
    static ref OBJ_HEADER: Regex = Regex::new(r"(?-u)(\d+)\s+(\d+)\s+obj\b").unwrap();
    static ref DOC_IDS: Regex =
        Regex::new(r"(?-u)/ID\s*\[\s*<([0-9A-Fa-f]*)>\s*<([0-9A-Fa-f]*)>").unwrap();
    static ref BASE_FONT: Regex = Regex::new(r"(?-u)/BaseFont\s*/([A-Za-z0-9+\-\.]+)").unwrap();
    static ref FONT_SUBTYPE: Regex = Regex::new(r"(?-u)/Subtype\s*/([A-Za-z0-9]+)").unwrap();
    static ref XMP_ACTION_ATTR: Regex = Regex::new(r#"(?-u)stEvt:action="([^"]*)""#).unwrap();
    static ref XMP_ACTION_ELEM: Regex =
        Regex::new(r"(?-u)<stEvt:action>([^<]*)</stEvt:action>").unwrap();
    static ref XREF_TABLE: Regex = Regex::new(r"(?-u)(?m)^xref\s").unwrap();
    static ref OBJ_REF: Regex = Regex::new(r"(?-u)(\d+)\s+\d+\s+R\b").unwrap();
    static ref SUBSET_PREFIX: Regex = Regex::new(r"^[A-Z]{6}\+").unwrap();
}

/// Context window searched around a byte-level match to associate nearby
/// attributes with it (e.g. embedding flags with a font name).
const CONTEXT_WINDOW: usize = 800;

/// Aggregate of all byte-level signals for one document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ByteInternals {
    pub incremental_updates: usize,
    pub object_count: usize,
    pub linearized: bool,
    pub has_xmp: bool,
    pub has_javascript: bool,
    pub has_launch_action: bool,
    pub has_signature: bool,
    pub has_embedded_files: bool,
    pub has_acroform: bool,
    pub tagged: bool,
    pub pdfa_conformant: bool,
    pub encrypted: bool,
    pub xref_kind: XrefKind,
    pub permanent_id: Option<String>,
    pub instance_id: Option<String>,
    pub fonts: Vec<FontDetail>,
    pub xmp_history: Vec<String>,
}

/// Runs every independent pattern scan over the raw bytes
pub fn scan(bytes: &[u8]) -> ByteInternals {
    let (permanent_id, instance_id) = document_ids(bytes);
    ByteInternals {
        incremental_updates: count_incremental_updates(bytes),
        object_count: count_objects(bytes),
        linearized: contains(bytes, b"/Linearized"),
        has_xmp: contains(bytes, b"<x:xmpmeta") || contains(bytes, b"xpacket begin"),
        has_javascript: contains(bytes, b"/JavaScript") || contains(bytes, b"/JS"),
        has_launch_action: contains(bytes, b"/Launch"),
        has_signature: contains(bytes, b"/Type /Sig")
            || contains(bytes, b"/Type/Sig")
            || contains(bytes, b"/ByteRange"),
        has_embedded_files: contains(bytes, b"/EmbeddedFile"),
        has_acroform: contains(bytes, b"/AcroForm"),
        tagged: contains(bytes, b"/MarkInfo"),
        pdfa_conformant: contains(bytes, b"pdfaid:part"),
        encrypted: contains(bytes, b"/Encrypt"),
        xref_kind: xref_kind(bytes),
        permanent_id,
        instance_id,
        fonts: scan_fonts(bytes),
        xmp_history: xmp_history(bytes),
    }
}

/// Incremental saves append a revision ending in its own `%%EOF` marker.
/// Derived as max(0, count(%%EOF) − 2).
pub fn count_incremental_updates(bytes: &[u8]) -> usize {
    count_occurrences(bytes, b"%%EOF").saturating_sub(2)
}

/// Approximate object count: matches of the `N M obj` header pattern
pub fn count_objects(bytes: &[u8]) -> usize {
    OBJ_HEADER.find_iter(bytes).count()
}

/// Object numbers defined by `N M obj` headers, sorted and deduplicated
pub fn defined_object_numbers(bytes: &[u8]) -> Vec<u32> {
    let mut numbers: Vec<u32> = OBJ_HEADER
        .captures_iter(bytes)
        .filter_map(|c| String::from_utf8_lossy(&c[1]).parse().ok())
        .collect();
    numbers.sort_unstable();
    numbers.dedup();
    numbers
}

/// Object numbers referenced by `N M R`, sorted and deduplicated
pub fn referenced_object_numbers(bytes: &[u8]) -> Vec<u32> {
    let mut numbers: Vec<u32> = OBJ_REF
        .captures_iter(bytes)
        .filter_map(|c| String::from_utf8_lossy(&c[1]).parse().ok())
        .collect();
    numbers.sort_unstable();
    numbers.dedup();
    numbers
}

/// Stream-typed cross references vs the legacy table keyword
pub fn xref_kind(bytes: &[u8]) -> XrefKind {
    if contains(bytes, b"/Type /XRef") || contains(bytes, b"/Type/XRef") {
        XrefKind::Stream
    } else if XREF_TABLE.is_match(bytes) {
        XrefKind::Table
    } else {
        XrefKind::Unknown
    }
}

/// Permanent and instance document identifiers from the trailer `/ID` pair
pub fn document_ids(bytes: &[u8]) -> (Option<String>, Option<String>) {
    // The last /ID array wins: incremental updates rewrite the trailer
    match DOC_IDS.captures_iter(bytes).last() {
        Some(caps) => {
            let permanent = String::from_utf8_lossy(&caps[1]).to_lowercase();
            let instance = String::from_utf8_lossy(&caps[2]).to_lowercase();
            (
                (!permanent.is_empty()).then_some(permanent),
                (!instance.is_empty()).then_some(instance),
            )
        }
        None => (None, None),
    }
}

/// Font inventory: `/BaseFont` names with subtype/embedding/subset flags
/// pulled from the enclosing dictionary, clamped to a bounded window so a
/// missing delimiter cannot pull in a neighboring font's attributes.
pub fn scan_fonts(bytes: &[u8]) -> Vec<FontDetail> {
    let mut fonts = Vec::new();
    for caps in BASE_FONT.captures_iter(bytes) {
        let m = caps.get(0).unwrap();
        let name = String::from_utf8_lossy(&caps[1]).into_owned();
        let window_start = m.start().saturating_sub(CONTEXT_WINDOW);
        let window_end = (m.end() + CONTEXT_WINDOW).min(bytes.len());
        let start = rfind_sub(&bytes[window_start..m.start()], b"<<")
            .map(|p| window_start + p)
            .unwrap_or(window_start);
        let end = find_sub(&bytes[m.end()..window_end], b">>")
            .map(|p| m.end() + p + 2)
            .unwrap_or(window_end);
        let window = &bytes[start..end];

        let subtype = FONT_SUBTYPE
            .captures(window)
            .map(|c| String::from_utf8_lossy(&c[1]).into_owned())
            .unwrap_or_default();
        let embedded = contains(window, b"/FontFile");
        let subset = SUBSET_PREFIX.is_match(name.as_bytes());

        fonts.push(FontDetail {
            name,
            subtype,
            embedded,
            subset,
        });
    }
    fonts.sort();
    fonts.dedup_by(|a, b| a.name == b.name);
    fonts
}

/// XMP edit-history actions in document order
pub fn xmp_history(bytes: &[u8]) -> Vec<String> {
    let mut actions: Vec<(usize, String)> = XMP_ACTION_ATTR
        .captures_iter(bytes)
        .map(|c| {
            (
                c.get(0).unwrap().start(),
                String::from_utf8_lossy(&c[1]).into_owned(),
            )
        })
        .chain(XMP_ACTION_ELEM.captures_iter(bytes).map(|c| {
            (
                c.get(0).unwrap().start(),
                String::from_utf8_lossy(&c[1]).into_owned(),
            )
        }))
        .collect();
    actions.sort_by_key(|(offset, _)| *offset);
    actions.into_iter().map(|(_, action)| action).collect()
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    needle.len() <= haystack.len() && haystack.windows(needle.len()).any(|w| w == needle)
}

pub(crate) fn find_sub(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|w| w == needle)
}

pub(crate) fn rfind_sub(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.len() > haystack.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .rposition(|w| w == needle)
}

fn count_occurrences(haystack: &[u8], needle: &[u8]) -> usize {
    if needle.is_empty() || needle.len() > haystack.len() {
        return 0;
    }
    let mut count = 0;
    let mut pos = 0;
    while pos + needle.len() <= haystack.len() {
        if &haystack[pos..pos + needle.len()] == needle {
            count += 1;
            pos += needle.len();
        } else {
            pos += 1;
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_yields_defaults() {
        let internals = scan(b"");
        assert_eq!(internals, ByteInternals::default());
    }

    #[test]
    fn three_eof_markers_mean_one_incremental_update() {
        let bytes = b"%PDF-1.4\n%%EOF\nmore%%EOF\ntail%%EOF";
        assert_eq!(count_incremental_updates(bytes), 1);
    }

    #[test]
    fn fewer_than_two_eof_markers_clamp_to_zero() {
        assert_eq!(count_incremental_updates(b"%PDF-1.4\n%%EOF"), 0);
        assert_eq!(count_incremental_updates(b"no markers at all"), 0);
    }

    #[test]
    fn counts_object_headers_not_endobj() {
        let bytes = b"1 0 obj\n<<>>\nendobj\n2 0 obj\n<<>>\nendobj\n";
        assert_eq!(count_objects(bytes), 2);
    }

    #[test]
    fn detects_xref_kinds() {
        assert_eq!(xref_kind(b"... /Type /XRef ..."), XrefKind::Stream);
        assert_eq!(xref_kind(b"trailer\nxref\n0 4\n"), XrefKind::Table);
        assert_eq!(xref_kind(b"nothing here"), XrefKind::Unknown);
    }

    #[test]
    fn extracts_last_document_id_pair() {
        let bytes = b"/ID [<AAAA> <BBBB>] junk /ID [<AAAA> <CCCC>]";
        let (permanent, instance) = document_ids(bytes);
        assert_eq!(permanent.as_deref(), Some("aaaa"));
        assert_eq!(instance.as_deref(), Some("cccc"));
    }

    #[test]
    fn font_scan_is_sorted_and_flagged() {
        let bytes = b"<< /Type /Font /Subtype /TrueType /BaseFont /ZZGHIJ+Zeta /FontFile2 9 0 R >>\n\
                      << /Type /Font /Subtype /Type1 /BaseFont /Alpha >>";
        let fonts = scan_fonts(bytes);
        assert_eq!(fonts.len(), 2);
        assert_eq!(fonts[0].name, "Alpha");
        assert!(!fonts[0].embedded);
        assert!(!fonts[0].subset);
        assert_eq!(fonts[1].name, "ZZGHIJ+Zeta");
        assert!(fonts[1].embedded);
        assert!(fonts[1].subset);
        assert_eq!(fonts[1].subtype, "TrueType");
    }

    #[test]
    fn xmp_history_in_document_order() {
        let bytes = br#"<stEvt:action>created</stEvt:action> stEvt:action="saved" "#;
        assert_eq!(xmp_history(bytes), vec!["created", "saved"]);
    }

    #[test]
    fn identical_bytes_yield_identical_output() {
        let bytes = b"1 0 obj /BaseFont /Beta endobj %%EOF %%EOF %%EOF";
        assert_eq!(scan(bytes), scan(bytes));
    }
}
