//! Signature detection via signature-dictionary markers in the raw bytes.
//! Validity is structural only: presence of both content and byte-range
//! keys. No cryptographic check is performed.

use lazy_static::lazy_static;
use regex::bytes::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref SIG_DICT: Regex = Regex::new(r"(?-u)/Type\s*/Sig\b").unwrap();
    static ref BYTE_RANGE: Regex =
        Regex::new(r"(?-u)/ByteRange\s*\[\s*(\d+)\s+(\d+)\s+(\d+)\s+(\d+)\s*\]").unwrap();
    static ref SIGNER: Regex = Regex::new(r"(?-u)/Name\s*\(([^)]*)\)").unwrap();
    static ref REASON: Regex = Regex::new(r"(?-u)/Reason\s*\(([^)]*)\)").unwrap();
    static ref LOCATION: Regex = Regex::new(r"(?-u)/Location\s*\(([^)]*)\)").unwrap();
    static ref SIGN_DATE: Regex = Regex::new(r"(?-u)/M\s*\(([^)]*)\)").unwrap();
    static ref CONTENTS: Regex = Regex::new(r"(?-u)/Contents\s*<").unwrap();
}

/// How close the declared byte-range end must come to the file end for
/// the signature to be considered whole-document.
const COVERAGE_SLACK: usize = 100;

const SIG_WINDOW: usize = 1200;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignatureInfo {
    pub signer: Option<String>,
    pub reason: Option<String>,
    pub location: Option<String>,
    pub date: Option<String>,
    /// Structural approximation: both /Contents and /ByteRange present
    pub valid: bool,
    pub covers_whole_document: bool,
    pub byte_range: Option<[u64; 4]>,
}

/// Finds every signature dictionary and extracts its attributes from a
/// bounded context window around the marker.
pub fn detect(bytes: &[u8]) -> Vec<SignatureInfo> {
    SIG_DICT
        .find_iter(bytes)
        .map(|m| {
            let start = m.start().saturating_sub(SIG_WINDOW);
            let end = (m.end() + SIG_WINDOW).min(bytes.len());
            let window = &bytes[start..end];

            let byte_range = BYTE_RANGE.captures(window).map(|c| {
                [
                    parse_u64(&c[1]),
                    parse_u64(&c[2]),
                    parse_u64(&c[3]),
                    parse_u64(&c[4]),
                ]
            });
            let has_contents = CONTENTS.is_match(window);
            let covers_whole_document = byte_range
                .map(|r| covers_whole(r, bytes.len()))
                .unwrap_or(false);

            SignatureInfo {
                signer: capture_text(&SIGNER, window),
                reason: capture_text(&REASON, window),
                location: capture_text(&LOCATION, window),
                date: capture_text(&SIGN_DATE, window),
                valid: has_contents && byte_range.is_some(),
                covers_whole_document,
                byte_range,
            }
        })
        .collect()
}

/// Whole-document coverage: the byte-range's final offset lies within
/// `COVERAGE_SLACK` bytes of total file length.
pub fn covers_whole(range: [u64; 4], file_len: usize) -> bool {
    let declared_end = range[2].saturating_add(range[3]);
    let file_len = file_len as u64;
    declared_end + COVERAGE_SLACK as u64 >= file_len && declared_end <= file_len
}

fn capture_text(re: &Regex, window: &[u8]) -> Option<String> {
    re.captures(window)
        .map(|c| String::from_utf8_lossy(&c[1]).into_owned())
        .filter(|s| !s.is_empty())
}

fn parse_u64(raw: &[u8]) -> u64 {
    String::from_utf8_lossy(raw).parse().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig_bytes(byte_range: &str, tail_padding: usize) -> Vec<u8> {
        let mut bytes = format!(
            "<< /Type /Sig /Name (Alice Example) /Reason (Approval) /M (D:20240102030405) \
             /ByteRange [{}] /Contents <deadbeef> >>",
            byte_range
        )
        .into_bytes();
        bytes.extend(std::iter::repeat(b' ').take(tail_padding));
        bytes
    }

    #[test]
    fn no_signature_yields_empty() {
        assert!(detect(b"plain bytes with no markers").is_empty());
    }

    #[test]
    fn extracts_signer_and_validity() {
        let bytes = sig_bytes("0 100 200 40", 0);
        let sigs = detect(&bytes);
        assert_eq!(sigs.len(), 1);
        assert_eq!(sigs[0].signer.as_deref(), Some("Alice Example"));
        assert_eq!(sigs[0].reason.as_deref(), Some("Approval"));
        assert!(sigs[0].valid);
    }

    #[test]
    fn coverage_within_slack_of_file_end() {
        // File ends 50 bytes after the declared range: covered
        let bytes = sig_bytes("0 100 120 40", 0);
        let file_len = bytes.len();
        let range = [0u64, 100, (file_len - 50) as u64, 10];
        assert!(covers_whole(range, file_len));

        // Range ends 500 bytes before the file end: partial
        let range = [0u64, 100, (file_len as u64).saturating_sub(500), 10];
        assert!(!covers_whole(range, file_len));
    }

    #[test]
    fn missing_byte_range_is_invalid() {
        let bytes = b"<< /Type /Sig /Contents <beef> >>";
        let sigs = detect(bytes);
        assert_eq!(sigs.len(), 1);
        assert!(!sigs[0].valid);
        assert!(!sigs[0].covers_whole_document);
    }
}
