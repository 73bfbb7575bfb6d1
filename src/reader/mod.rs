//! Document access seam.
//!
//! The engine consumes documents through [`DocumentReader`] so that tests can
//! substitute synthetic documents and alternative backends can slot in
//! without touching the analysis stages.

pub mod lopdf_reader;

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Annotation, PageImage};

pub use lopdf_reader::LopdfReader;

/// Read-only view over one loaded document. Page indices are zero-based.
#[async_trait]
pub trait DocumentReader: Send + Sync {
    fn page_count(&self) -> usize;

    /// Extracted text of one page. Implementations degrade to an empty
    /// string when a page has no extractable text.
    async fn page_text(&self, page: usize) -> Result<String>;

    /// Rasterization of one page at the given resolution.
    async fn page_image(&self, page: usize, dpi: u32) -> Result<PageImage>;

    fn annotations(&self, page: usize) -> Result<Vec<Annotation>>;

    /// Page width and height in points.
    fn page_bounds(&self, page: usize) -> Result<(f64, f64)>;

    /// Info-dictionary attributes by their PDF key (`Title`, `Producer`, ...).
    fn attributes(&self) -> HashMap<String, String>;

    fn raw_bytes(&self) -> &[u8];
}
