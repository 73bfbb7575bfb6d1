//! Shared test support: an in-memory document stub and synthetic PDF
//! byte builders for the byte-level heuristics.
#![allow(dead_code)]

use std::collections::HashMap;

use async_trait::async_trait;

use pdfsleuth::error::{Error, Result};
use pdfsleuth::reader::DocumentReader;
use pdfsleuth::types::{Annotation, PageImage};

#[derive(Clone, Default)]
pub struct StubPage {
    pub text: String,
    pub image: Option<PageImage>,
    pub annotations: Vec<Annotation>,
    pub bounds: (f64, f64),
}

/// In-memory [`DocumentReader`] with fully scripted pages.
#[derive(Default)]
pub struct StubReader {
    pub bytes: Vec<u8>,
    pub pages: Vec<StubPage>,
    pub attributes: HashMap<String, String>,
}

impl StubReader {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            ..Default::default()
        }
    }

    pub fn with_page(mut self, text: &str) -> Self {
        self.pages.push(StubPage {
            text: text.to_string(),
            image: None,
            annotations: Vec::new(),
            bounds: (612.0, 792.0),
        });
        self
    }

    pub fn with_page_image(mut self, image: PageImage) -> Self {
        if let Some(page) = self.pages.last_mut() {
            page.image = Some(image);
        }
        self
    }

    pub fn with_annotations(mut self, annotations: Vec<Annotation>) -> Self {
        if let Some(page) = self.pages.last_mut() {
            page.annotations = annotations;
        }
        self
    }

    pub fn with_attribute(mut self, key: &str, value: &str) -> Self {
        self.attributes.insert(key.to_string(), value.to_string());
        self
    }

    fn page(&self, page: usize) -> Result<&StubPage> {
        self.pages
            .get(page)
            .ok_or_else(|| Error::InvalidInput(format!("page {} out of range", page)))
    }
}

#[async_trait]
impl DocumentReader for StubReader {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    async fn page_text(&self, page: usize) -> Result<String> {
        Ok(self.page(page)?.text.clone())
    }

    async fn page_image(&self, page: usize, _dpi: u32) -> Result<PageImage> {
        Ok(self
            .page(page)?
            .image
            .clone()
            .unwrap_or_else(|| PageImage::blank(64, 64)))
    }

    fn annotations(&self, page: usize) -> Result<Vec<Annotation>> {
        Ok(self.page(page)?.annotations.clone())
    }

    fn page_bounds(&self, page: usize) -> Result<(f64, f64)> {
        Ok(self.page(page)?.bounds)
    }

    fn attributes(&self) -> HashMap<String, String> {
        self.attributes.clone()
    }

    fn raw_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Uniform solid-color page image.
pub fn solid_image(width: u32, height: u32, rgb: [u8; 3]) -> PageImage {
    let mut image = PageImage::blank(width, height);
    for pixel in image.pixels.chunks_exact_mut(4) {
        pixel[0] = rgb[0];
        pixel[1] = rgb[1];
        pixel[2] = rgb[2];
    }
    image
}

/// Minimal well-formed PDF bytes with a configurable number of trailing
/// `%%EOF` markers. Two markers model an ordinary save; every further
/// marker models one appended incremental revision.
pub fn pdf_bytes_with_eof_markers(markers: usize) -> Vec<u8> {
    let mut bytes = b"%PDF-1.7\n\
1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n\
2 0 obj\n<< /Type /Pages /Kids [3 0 R] /Count 1 >>\nendobj\n\
3 0 obj\n<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] >>\nendobj\n\
xref\n0 4\ntrailer\n<< /Size 4 /Root 1 0 R >>\nstartxref\n9\n"
        .to_vec();
    for _ in 0..markers {
        bytes.extend_from_slice(b"%%EOF\n");
    }
    bytes
}

/// PDF bytes carrying a structurally valid signature dictionary. When
/// `partial` is set the declared byte range ends far before the file end.
pub fn signed_pdf_bytes(partial: bool) -> Vec<u8> {
    let mut bytes = pdf_bytes_with_eof_markers(2);
    let sig_offset = bytes.len() + 600;
    let range = if partial {
        // Ends well before the padded file end below
        "[0 200 300 100]".to_string()
    } else {
        format!("[0 200 300 {}]", sig_offset)
    };
    bytes.extend_from_slice(
        format!(
            "4 0 obj\n<< /Type /Sig /Name (Alice Example) /M (D:20240102030405Z) \
             /ByteRange {} /Contents <deadbeef> >>\nendobj\n",
            range
        )
        .as_bytes(),
    );
    while bytes.len() < sig_offset + 300 {
        bytes.extend_from_slice(b"% padding\n");
    }
    bytes.extend_from_slice(b"%%EOF\n");
    bytes
}
