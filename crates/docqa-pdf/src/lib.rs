//! docqa-pdf
//!
//! Page-by-page PDF text extraction. Text runs are read from each page's
//! content stream with their positions and assembled into lines using the
//! configured x/y tolerances. Glyph advances come from each page's font
//! widths. Pages whose runs cannot be decoded fall back
//! to lopdf's own text extraction.

pub mod content;
pub mod extract;
pub mod fonts;
pub mod layout;

pub use extract::PdfExtractor;
pub use layout::{assemble_lines, TextRun};
