//! Heuristic extraction of low-level document internals straight from the
//! raw byte stream, independent of any logical object model.

pub mod bytes;
pub mod xmp;

pub use bytes::{scan, ByteInternals};
pub use xmp::{XmpEvent, XmpPacket};
