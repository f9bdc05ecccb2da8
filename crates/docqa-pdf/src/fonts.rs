//! Glyph advances for the simple fonts a page references.

use std::collections::HashMap;

use lopdf::{Dictionary, Document, Object, ObjectId};

use crate::content::number;

/// Advance used when a font carries no usable widths, in thousandths of an em.
pub const FALLBACK_WIDTH: f32 = 500.0;

/// Resource dictionaries are inherited through `/Parent`; real trees are shallow.
const MAX_PAGE_TREE_DEPTH: usize = 32;

/// Page font resources by name (`F1`, ...), as used by `Tf`.
pub type FontTable = HashMap<Vec<u8>, GlyphWidths>;

/// Per-code glyph advances of a simple font in thousandths of an em.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GlyphWidths {
    first_char: u32,
    widths: Vec<f32>,
    missing: Option<f32>,
}

impl GlyphWidths {
    pub fn new(first_char: u32, widths: Vec<f32>) -> Self {
        Self { first_char, widths, missing: None }
    }

    /// Every code advances by `width`.
    pub fn monospace(width: f32) -> Self {
        Self { first_char: 0, widths: Vec::new(), missing: Some(width) }
    }

    pub fn advance(&self, code: u8) -> f32 {
        u32::from(code)
            .checked_sub(self.first_char)
            .and_then(|i| self.widths.get(i as usize))
            .copied()
            .or(self.missing)
            .unwrap_or(FALLBACK_WIDTH)
    }

    /// Read `/FirstChar`, `/Widths` and the descriptor's `/MissingWidth`.
    /// Courier has fixed metrics, so it needs no table; other fonts without
    /// widths yield `None`.
    pub fn from_font(doc: &Document, font: &Dictionary) -> Option<Self> {
        let missing = font
            .get(b"FontDescriptor")
            .ok()
            .and_then(|d| resolve(doc, d))
            .and_then(|d| d.as_dict().ok())
            .and_then(|d| d.get(b"MissingWidth").ok())
            .and_then(number);
        let widths: Option<Vec<f32>> = font
            .get(b"Widths")
            .ok()
            .and_then(|w| resolve(doc, w))
            .and_then(|w| w.as_array().ok())
            .map(|arr| arr.iter().map(|w| resolve(doc, w).and_then(number).unwrap_or(0.0)).collect());

        match widths {
            Some(widths) if !widths.is_empty() => {
                let first_char = font.get(b"FirstChar").ok().and_then(number).unwrap_or(0.0).max(0.0) as u32;
                Some(Self { first_char, widths, missing })
            }
            _ if is_courier(font) => Some(Self::monospace(600.0)),
            _ => missing.map(Self::monospace),
        }
    }
}

fn is_courier(font: &Dictionary) -> bool {
    font.get(b"BaseFont")
        .ok()
        .and_then(|n| n.as_name().ok())
        .is_some_and(|n| n.starts_with(b"Courier"))
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

/// Widths of every font visible on a page, including resources inherited
/// from ancestor page-tree nodes. The nearest definition of a name wins.
pub fn page_font_table(doc: &Document, page_id: ObjectId) -> FontTable {
    let mut table = FontTable::new();
    let mut node = doc.get_dictionary(page_id).ok();
    for _ in 0..MAX_PAGE_TREE_DEPTH {
        let Some(dict) = node else { break };
        let fonts = dict
            .get(b"Resources")
            .ok()
            .and_then(|r| resolve(doc, r))
            .and_then(|r| r.as_dict().ok())
            .and_then(|r| r.get(b"Font").ok())
            .and_then(|f| resolve(doc, f))
            .and_then(|f| f.as_dict().ok());
        for (name, font) in fonts.into_iter().flat_map(Dictionary::iter) {
            if table.contains_key(name) {
                continue;
            }
            if let Some(widths) = resolve(doc, font).and_then(|f| f.as_dict().ok()).and_then(|f| GlyphWidths::from_font(doc, f)) {
                table.insert(name.clone(), widths);
            }
        }
        node = dict
            .get(b"Parent")
            .ok()
            .and_then(|p| p.as_reference().ok())
            .and_then(|id| doc.get_dictionary(id).ok());
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    #[test]
    fn advances_come_from_the_widths_array() {
        let w = GlyphWidths::new(97, vec![556.0, 556.0, 500.0]);
        assert_eq!(w.advance(b'a'), 556.0);
        assert_eq!(w.advance(b'c'), 500.0);
        assert_eq!(w.advance(b'z'), FALLBACK_WIDTH);
        assert_eq!(w.advance(b' '), FALLBACK_WIDTH);
    }

    #[test]
    fn font_dictionaries_are_read() {
        let mut doc = Document::with_version("1.5");
        let widths = doc.add_object(vec![Object::Integer(278), Object::Real(333.0)]);
        let descriptor = doc.add_object(dictionary! { "MissingWidth" => 250 });
        let font = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "FirstChar" => 32,
            "Widths" => widths,
            "FontDescriptor" => descriptor,
        };
        let w = GlyphWidths::from_font(&doc, &font).expect("widths");
        assert_eq!(w.advance(b' '), 278.0);
        assert_eq!(w.advance(b'!'), 333.0);
        assert_eq!(w.advance(b'A'), 250.0);

        let courier = dictionary! { "Type" => "Font", "BaseFont" => "Courier-Bold" };
        assert_eq!(GlyphWidths::from_font(&doc, &courier).map(|w| w.advance(b'x')), Some(600.0));
        let times = dictionary! { "Type" => "Font", "BaseFont" => "Times-Roman" };
        assert_eq!(GlyphWidths::from_font(&doc, &times), None);
    }
}
