//! `lopdf`-backed [`DocumentReader`].
//!
//! Text and page geometry come straight from the parsed object tree.
//! Rasterization is out of reach for a pure-Rust parser, so `page_image`
//! returns a blank page at the requested resolution; visual comparison
//! then reports no difference and the report leans on the other signals.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, instrument, warn};

use crate::error::{Error, Result};
use crate::reader::DocumentReader;
use crate::types::{Annotation, PageImage};

const DEFAULT_PAGE_POINTS: (f64, f64) = (612.0, 792.0);

pub struct LopdfReader {
    bytes: Vec<u8>,
    doc: Document,
    /// ObjectId per page, in page order
    pages: Vec<ObjectId>,
}

impl LopdfReader {
    /// Reads and parses the file. A parse failure is an input error; the
    /// byte-level heuristics upstream do not depend on this succeeding.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = tokio::fs::read(path.as_ref()).await?;
        Self::from_bytes(bytes)
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let doc = Document::load_mem(&bytes)
            .map_err(|e| Error::InvalidInput(format!("not a parseable PDF: {}", e)))?;
        let pages = doc.get_pages().into_values().collect();
        Ok(Self { bytes, doc, pages })
    }

    fn page_id(&self, page: usize) -> Result<ObjectId> {
        self.pages
            .get(page)
            .copied()
            .ok_or_else(|| Error::InvalidInput(format!("page {} out of range", page)))
    }

    /// Follows reference chains to the underlying object.
    fn resolve<'a>(&'a self, object: &'a Object) -> &'a Object {
        let mut current = object;
        for _ in 0..16 {
            match current {
                Object::Reference(id) => match self.doc.get_object(*id) {
                    Ok(next) => current = next,
                    Err(_) => return current,
                },
                _ => return current,
            }
        }
        current
    }

    /// MediaBox of the page, walking Parent nodes for inherited values.
    fn media_box(&self, page_id: ObjectId) -> Option<[f64; 4]> {
        let mut dict = self.doc.get_dictionary(page_id).ok()?;
        for _ in 0..32 {
            if let Ok(object) = dict.get(b"MediaBox") {
                return rect_values(self.resolve(object));
            }
            let parent = dict.get(b"Parent").ok()?;
            match self.resolve(parent) {
                Object::Dictionary(d) => dict = d,
                _ => return None,
            }
        }
        None
    }

    fn annotation_from_dict(&self, dict: &Dictionary) -> Annotation {
        let subtype = dict
            .get(b"Subtype")
            .ok()
            .and_then(|o| o.as_name_str().ok())
            .unwrap_or("Unknown")
            .to_string();
        let rect = dict
            .get(b"Rect")
            .ok()
            .map(|o| self.resolve(o))
            .and_then(rect_values)
            .unwrap_or([0.0; 4]);
        let color = dict
            .get(b"C")
            .ok()
            .map(|o| self.resolve(o))
            .and_then(color_values);
        let contents = dict
            .get(b"Contents")
            .ok()
            .and_then(|o| o.as_str().ok())
            .map(decode_pdf_string)
            .unwrap_or_default();
        // Flag bit 2 marks the annotation hidden
        let hidden = dict
            .get(b"F")
            .ok()
            .and_then(|o| o.as_i64().ok())
            .map(|flags| flags & 0x2 != 0)
            .unwrap_or(false);
        let action = dict
            .get(b"A")
            .ok()
            .map(|o| self.resolve(o))
            .and_then(|o| o.as_dict().ok())
            .and_then(|a| a.get(b"S").ok())
            .and_then(|o| o.as_name_str().ok())
            .map(str::to_string);
        Annotation {
            subtype,
            rect,
            color,
            contents,
            hidden,
            action,
        }
    }
}

#[async_trait]
impl DocumentReader for LopdfReader {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    async fn page_text(&self, page: usize) -> Result<String> {
        self.page_id(page)?;
        match self.doc.extract_text(&[page as u32 + 1]) {
            Ok(text) => Ok(text),
            Err(e) => {
                debug!(page, error = %e, "text extraction failed, treating page as empty");
                Ok(String::new())
            }
        }
    }

    async fn page_image(&self, page: usize, dpi: u32) -> Result<PageImage> {
        let (width_pts, height_pts) = self.page_bounds(page)?;
        let scale = dpi as f64 / 72.0;
        let width = (width_pts * scale).round().max(1.0) as u32;
        let height = (height_pts * scale).round().max(1.0) as u32;
        Ok(PageImage::blank(width, height))
    }

    fn annotations(&self, page: usize) -> Result<Vec<Annotation>> {
        let page_id = self.page_id(page)?;
        let dict = self
            .doc
            .get_dictionary(page_id)
            .map_err(|e| Error::InvalidInput(format!("page {} dictionary: {}", page, e)))?;
        let mut annotations = Vec::new();
        if let Ok(annots) = dict.get(b"Annots") {
            if let Object::Array(entries) = self.resolve(annots) {
                for entry in entries {
                    match self.resolve(entry) {
                        Object::Dictionary(annot) => {
                            annotations.push(self.annotation_from_dict(annot))
                        }
                        _ => warn!(page, "non-dictionary annotation entry"),
                    }
                }
            }
        }
        Ok(annotations)
    }

    fn page_bounds(&self, page: usize) -> Result<(f64, f64)> {
        let page_id = self.page_id(page)?;
        let bounds = match self.media_box(page_id) {
            Some([x0, y0, x1, y1]) => ((x1 - x0).abs(), (y1 - y0).abs()),
            None => DEFAULT_PAGE_POINTS,
        };
        Ok(bounds)
    }

    fn attributes(&self) -> HashMap<String, String> {
        let mut attributes = HashMap::new();
        let info = self
            .doc
            .trailer
            .get(b"Info")
            .map(|o| self.resolve(o))
            .ok()
            .and_then(|o| o.as_dict().ok());
        if let Some(info) = info {
            for (key, value) in info.iter() {
                let key = String::from_utf8_lossy(key).into_owned();
                match self.resolve(value) {
                    Object::String(bytes, _) => {
                        attributes.insert(key, decode_pdf_string(bytes));
                    }
                    Object::Name(name) => {
                        attributes.insert(key, String::from_utf8_lossy(name).into_owned());
                    }
                    Object::Integer(n) => {
                        attributes.insert(key, n.to_string());
                    }
                    _ => {}
                }
            }
        }
        attributes
    }

    fn raw_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

fn number(object: &Object) -> Option<f64> {
    match object {
        Object::Integer(n) => Some(*n as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}

fn rect_values(object: &Object) -> Option<[f64; 4]> {
    let entries = object.as_array().ok()?;
    if entries.len() != 4 {
        return None;
    }
    let mut rect = [0.0; 4];
    for (slot, entry) in rect.iter_mut().zip(entries) {
        *slot = number(entry)?;
    }
    Some(rect)
}

fn color_values(object: &Object) -> Option<[f64; 3]> {
    let entries = object.as_array().ok()?;
    match entries.len() {
        // DeviceGray
        1 => {
            let g = number(&entries[0])?;
            Some([g, g, g])
        }
        3 => {
            let mut rgb = [0.0; 3];
            for (slot, entry) in rgb.iter_mut().zip(entries) {
                *slot = number(entry)?;
            }
            Some(rgb)
        }
        _ => None,
    }
}

/// PDF text strings are either UTF-16BE with a BOM or PDFDocEncoding;
/// the latter is close enough to Latin-1 for the fields compared here.
fn decode_pdf_string(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        bytes.iter().map(|&b| b as char).collect()
    }
}
