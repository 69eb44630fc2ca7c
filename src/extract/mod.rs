//! Extraction module for catalog media pages
//!
//! This module turns a loaded page into structured metadata:
//! - Detecting which layout variant the page uses and its declared media type
//! - Selecting the field plan for that media type
//! - Reading each planned field with null-safe, deadline-bounded lookups

mod fields;
mod layout;
mod schema;

pub use fields::{extract_fields, FieldExtraction};
pub use layout::{
    detect_layout, DetectError, Detection, DetectionSettings, LayoutVariant, LocatorStrategy,
    MEDIA_TYPE_LABEL,
};
pub use schema::{fields_for, normalize_field_name, KnownMediaType, Section};
