//! Inline markup handling: delimiter scanning, cloze normalization, field
//! splitting and HTML formatting.

pub mod cloze;
pub mod delimiters;
pub mod fields;
pub mod inline;

pub use cloze::{contains_cloze, normalize as normalize_clozes};
pub use delimiters::{segments, Segment, SegmentKind};
pub use fields::{split_fields, SplitFields};
pub use inline::{format_field, Formatted};
