//! Immutable per-document snapshot produced by the loading stage.
//! Later stages only read it; one snapshot exists per input document and
//! is released with the analysis session.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::forensic::ForensicFacts;

/// Everything the pipeline knows about one input document
#[derive(Debug, Clone)]
pub struct DocumentSnapshot {
    pub file_info: FileInfo,
    pub page_count: usize,
    pub page_texts: Vec<String>,
    pub page_images: Vec<PageImage>,
    pub page_annotations: Vec<Vec<Annotation>>,
    pub page_bounds: Vec<(f64, f64)>,
    pub metadata: PdfMetadata,
    pub raw_bytes: Vec<u8>,
    pub forensic: ForensicFacts,
}

/// File identity for report references
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    pub name: String,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub sha256: String,
    pub modified: Option<String>,
}

/// Owned RGBA8 raster of one rendered page
#[derive(Debug, Clone, PartialEq)]
pub struct PageImage {
    pub width: u32,
    pub height: u32,
    /// RGBA8, row-major, `width * height * 4` bytes
    pub pixels: Vec<u8>,
}

impl PageImage {
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![255; (width as usize) * (height as usize) * 4],
        }
    }

    /// Grayscale projection via 0.299R + 0.587G + 0.114B, one f64 per pixel
    pub fn luminance(&self) -> Vec<f64> {
        self.pixels
            .chunks_exact(4)
            .map(|px| 0.299 * px[0] as f64 + 0.587 * px[1] as f64 + 0.114 * px[2] as f64)
            .collect()
    }

    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }
}

/// One annotation as reported by the document reader
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub subtype: String,
    /// [x0, y0, x1, y1] in page units
    pub rect: [f64; 4],
    /// RGB in [0,1] when declared
    pub color: Option<[f64; 3]>,
    pub contents: String,
    pub hidden: bool,
    pub action: Option<String>,
}

impl Annotation {
    pub fn width(&self) -> f64 {
        (self.rect[2] - self.rect[0]).abs()
    }

    pub fn height(&self) -> f64 {
        (self.rect[3] - self.rect[1]).abs()
    }

    pub fn is_white(&self) -> bool {
        self.color
            .map(|c| c.iter().all(|v| *v >= 0.99))
            .unwrap_or(false)
    }
}

/// Cross-reference flavour detected in the raw byte stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum XrefKind {
    Table,
    Stream,
    Unknown,
}

impl Default for XrefKind {
    fn default() -> Self {
        XrefKind::Unknown
    }
}

/// Per-font detail associated by the byte-level extractor
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FontDetail {
    pub name: String,
    pub subtype: String,
    pub embedded: bool,
    pub subset: bool,
}

/// Standard Info-dictionary fields plus byte-level internals.
///
/// The byte-level fields intentionally duplicate signals also derivable
/// from the structured reader; both are preserved as independent,
/// cross-validating evidence paths.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PdfMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub keywords: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub modification_date: Option<String>,
    pub encrypted: bool,
    pub custom_properties: HashMap<String, String>,

    // Byte-level internals
    pub permanent_id: Option<String>,
    pub instance_id: Option<String>,
    pub linearized: bool,
    pub has_xmp: bool,
    pub incremental_updates: usize,
    pub object_count: usize,
    pub fonts: Vec<FontDetail>,
    pub tagged: bool,
    pub pdfa_conformant: bool,
    pub xref_kind: XrefKind,
    pub has_javascript: bool,
    pub has_launch_action: bool,
    pub has_embedded_files: bool,
    pub has_acroform: bool,
    pub has_signature: bool,
    pub xmp_history: Vec<String>,
}
