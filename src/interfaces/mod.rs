//! Adapters between external file formats and the application layer.

pub mod csv;
pub mod json;
