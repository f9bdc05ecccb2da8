//! Walks a page content stream and records where text is drawn.
//!
//! The graphics state stack (`q`, `Q`, `cm`) and the text state needed for
//! positioning are tracked: text and line matrices, leading, font, size,
//! character and word spacing, horizontal scaling. Run positions are in
//! default user space (text matrix × CTM), so pages drawn under a flipped
//! or scaled CTM still read top to bottom. Advances come from the font's
//! `/Widths`; fonts without widths use a half-em estimate.

use lopdf::content::{Content, Operation};
use lopdf::Object;

use crate::fonts::{FontTable, GlyphWidths, FALLBACK_WIDTH};
use crate::layout::TextRun;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Matrix([f32; 6]);

impl Matrix {
    const IDENTITY: Self = Self([1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);

    /// `translate(tx, ty) × self`
    fn translated(self, tx: f32, ty: f32) -> Self {
        let [a, b, c, d, e, f] = self.0;
        Self([a, b, c, d, tx * a + ty * c + e, tx * b + ty * d + f])
    }

    /// `self × other`
    fn then(self, other: Self) -> Self {
        let [a, b, c, d, e, f] = self.0;
        let [a2, b2, c2, d2, e2, f2] = other.0;
        Self([
            a * a2 + b * c2,
            a * b2 + b * d2,
            c * a2 + d * c2,
            c * b2 + d * d2,
            e * a2 + f * c2 + e2,
            e * b2 + f * d2 + f2,
        ])
    }

    fn from_operands(op: &Operation) -> Option<Self> {
        let vals: Vec<f32> = op.operands.iter().filter_map(number).collect();
        match vals[..] {
            [a, b, c, d, e, f] => Some(Self([a, b, c, d, e, f])),
            _ => None,
        }
    }
}

/// The parts of the graphics state `q`/`Q` save that affect text placement.
#[derive(Debug, Clone)]
struct GraphicsState {
    ctm: Matrix,
    font: Option<Vec<u8>>,
    font_size: f32,
    h_scale: f32,
    leading: f32,
    char_spacing: f32,
    word_spacing: f32,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self { ctm: Matrix::IDENTITY, font: None, font_size: 12.0, h_scale: 1.0, leading: 0.0, char_spacing: 0.0, word_spacing: 0.0 }
    }
}

struct Interpreter<'f> {
    fonts: &'f FontTable,
    x_tolerance: f32,
    gs: GraphicsState,
    saved: Vec<GraphicsState>,
    tm: Matrix,
    tlm: Matrix,
    runs: Vec<TextRun>,
}

impl<'f> Interpreter<'f> {
    fn new(fonts: &'f FontTable, x_tolerance: f32) -> Self {
        Self { fonts, x_tolerance, gs: GraphicsState::default(), saved: Vec::new(), tm: Matrix::IDENTITY, tlm: Matrix::IDENTITY, runs: Vec::new() }
    }

    fn move_line(&mut self, tx: f32, ty: f32) {
        self.tlm = self.tlm.translated(tx, ty);
        self.tm = self.tlm;
    }

    fn next_line(&mut self) {
        let leading = self.gs.leading;
        self.move_line(0.0, -leading);
    }

    fn widths(&self) -> Option<&GlyphWidths> {
        self.gs.font.as_ref().and_then(|name| self.fonts.get(name))
    }

    /// Horizontal displacement in text space after drawing `bytes`.
    fn advance(&self, bytes: &[u8]) -> f32 {
        let gs = &self.gs;
        let utf16 = bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF;
        let total: f32 = if utf16 {
            decode_pdf_string(bytes).chars().map(|c| FALLBACK_WIDTH / 1000.0 * gs.font_size + gs.char_spacing + if c == ' ' { gs.word_spacing } else { 0.0 }).sum()
        } else {
            let widths = self.widths();
            bytes
                .iter()
                .map(|&b| {
                    let w = widths.map_or(FALLBACK_WIDTH, |w| w.advance(b));
                    w / 1000.0 * gs.font_size + gs.char_spacing + if b == b' ' { gs.word_spacing } else { 0.0 }
                })
                .sum()
        };
        total * gs.h_scale
    }

    /// Text space to user space for the current text matrix.
    fn rendering(&self) -> Matrix {
        self.tm.then(self.gs.ctm)
    }

    fn push_run(&mut self, text: String, tx: f32) {
        if text.is_empty() { return; }
        let m = self.rendering();
        let width = (tx * m.0[0]).abs();
        self.runs.push(TextRun { x: m.0[4], y: m.0[5], width, text });
    }

    fn show(&mut self, bytes: &[u8]) {
        let tx = self.advance(bytes);
        self.push_run(decode_pdf_string(bytes), tx);
        self.tm = self.tm.translated(tx, 0.0);
    }

    /// `TJ`: strings are concatenated into one run; a kerning offset wider
    /// than `x_tolerance` in user space becomes a space.
    fn show_array(&mut self, items: &[Object]) {
        let start = self.tm;
        let scale = self.rendering().0[0].abs();
        let mut text = String::new();
        let mut tx = 0.0;
        for item in items {
            match item {
                Object::String(bytes, _) => {
                    text.push_str(&decode_pdf_string(bytes));
                    tx += self.advance(bytes);
                }
                other => {
                    if let Some(adjust) = number(other) {
                        let shift = -adjust / 1000.0 * self.gs.font_size * self.gs.h_scale;
                        if shift * scale > self.x_tolerance && !text.is_empty() && !text.ends_with(' ') { text.push(' '); }
                        tx += shift;
                    }
                }
            }
        }
        self.push_run(text, tx);
        self.tm = start.translated(tx, 0.0);
    }

    fn apply(&mut self, op: &Operation) {
        match op.operator.as_str() {
            "q" => self.saved.push(self.gs.clone()),
            "Q" => {
                if let Some(gs) = self.saved.pop() { self.gs = gs; }
            }
            "cm" => {
                if let Some(m) = Matrix::from_operands(op) { self.gs.ctm = m.then(self.gs.ctm); }
            }
            "BT" => {
                self.tm = Matrix::IDENTITY;
                self.tlm = Matrix::IDENTITY;
            }
            "Tf" => {
                if let Some(Object::Name(name)) = op.operands.first() { self.gs.font = Some(name.clone()); }
                if let Some(size) = operand(op, 1) { self.gs.font_size = size.abs(); }
            }
            "Tz" => {
                if let Some(scale) = operand(op, 0) { self.gs.h_scale = scale / 100.0; }
            }
            "TL" => {
                if let Some(l) = operand(op, 0) { self.gs.leading = l; }
            }
            "Tc" => {
                if let Some(c) = operand(op, 0) { self.gs.char_spacing = c; }
            }
            "Tw" => {
                if let Some(w) = operand(op, 0) { self.gs.word_spacing = w; }
            }
            "Td" => {
                if let (Some(tx), Some(ty)) = (operand(op, 0), operand(op, 1)) { self.move_line(tx, ty); }
            }
            "TD" => {
                if let (Some(tx), Some(ty)) = (operand(op, 0), operand(op, 1)) {
                    self.gs.leading = -ty;
                    self.move_line(tx, ty);
                }
            }
            "Tm" => {
                if let Some(m) = Matrix::from_operands(op) {
                    self.tm = m;
                    self.tlm = m;
                }
            }
            "T*" => self.next_line(),
            "Tj" => {
                if let Some(Object::String(bytes, _)) = op.operands.first() { self.show(bytes); }
            }
            "'" => {
                self.next_line();
                if let Some(Object::String(bytes, _)) = op.operands.first() { self.show(bytes); }
            }
            "\"" => {
                if let (Some(aw), Some(ac)) = (operand(op, 0), operand(op, 1)) {
                    self.gs.word_spacing = aw;
                    self.gs.char_spacing = ac;
                }
                self.next_line();
                if let Some(Object::String(bytes, _)) = op.operands.last() { self.show(bytes); }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = op.operands.first() { self.show_array(items); }
            }
            _ => {}
        }
    }
}

pub(crate) fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

fn operand(op: &Operation, i: usize) -> Option<f32> {
    op.operands.get(i).and_then(number)
}

/// Decode a PDF string: UTF-16BE when it carries a BOM, otherwise one byte per char.
pub fn decode_pdf_string(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let units: Vec<u16> = bytes[2..].chunks(2).map(|c| u16::from_be_bytes([c[0], *c.get(1).unwrap_or(&0)])).collect();
        return String::from_utf16_lossy(&units);
    }
    bytes.iter().map(|&b| b as char).collect()
}

/// True when decoded text is mostly printable; composite-font pages usually are not.
pub fn looks_decodable(runs: &[TextRun]) -> bool {
    let (mut total, mut bad) = (0usize, 0usize);
    for c in runs.iter().flat_map(|r| r.text.chars()) {
        total += 1;
        if (c.is_control() && !c.is_whitespace()) || c == char::REPLACEMENT_CHARACTER { bad += 1; }
    }
    total > 0 && bad * 10 <= total
}

/// Positioned text runs of a decoded content stream. `fonts` maps the
/// page's font resource names to their glyph widths.
pub fn text_runs(content: &Content, fonts: &FontTable, x_tolerance: f32) -> Vec<TextRun> {
    let mut interp = Interpreter::new(fonts, x_tolerance);
    for op in &content.operations {
        interp.apply(op);
    }
    interp.runs
}
