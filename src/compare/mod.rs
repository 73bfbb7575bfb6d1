//! Multi-axis comparison of two documents: text, rendered-page visual
//! similarity, and structural metadata.

pub mod metadata;
pub mod text;
pub mod visual;
