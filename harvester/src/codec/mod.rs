//! Flatten/export codec.
//!
//! Turns a batch of heterogeneous records into either one pretty-printed
//! JSON document of grouped records, or one or more bounded delimited files.
//! Input is only ever read: normalization works on copies.
//!
//! The pipeline for delimited output is
//! [`normalize`] -> [`flatten`] -> header sample -> [`render_document`].

mod delimited;
mod export;
mod flatten;
mod limits;
mod normalize;

#[cfg(test)]
mod integration_tests;

pub use delimited::{
    build_row, collect_headers, escape_cell, fit_row, flatten_item, render_document, BOM,
};
pub use export::{write_files, ExportFile, ExportFormat, ExportOptions, Exporter};
pub use flatten::{flatten, FlatRow, VALUE_COLUMN};
pub use limits::{truncate_with_marker, ExportLimits, ELLIPSIS, TRUNCATION_MARKER};
pub use normalize::{
    category_slug, is_grouped, normalize, RecordShape, GROUP_KEYS, PRICE_FALLBACK,
};
