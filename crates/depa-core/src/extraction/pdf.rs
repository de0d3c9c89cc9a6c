use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId};

use crate::error::ExtractError;
use crate::extraction::{PageExtraction, PageSource};
use crate::model::{PageFragments, PositionedFragment};

/// PDF extraction backend built on `lopdf`.
///
/// Interprets the text operators of each page's content stream and emits one
/// [`PositionedFragment`] per shown string, positioned by the current text
/// matrix in page space. Glyph metrics are not consulted; fragment width is
/// estimated from the font size, which is accurate enough for the positional
/// clustering downstream.
pub struct PdfAdapter;

impl PdfAdapter {
    pub fn new() -> Self {
        PdfAdapter
    }
}

impl Default for PdfAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl PageSource for PdfAdapter {
    fn extract_pages(&self, bytes: &[u8]) -> Result<PageExtraction, ExtractError> {
        let doc = Document::load_mem(bytes)
            .map_err(|e| ExtractError::Format(format!("failed to parse PDF: {e}")))?;

        let mut out = PageExtraction {
            encrypted: doc.trailer.get(b"Encrypt").is_ok(),
            ..PageExtraction::default()
        };
        read_info_dictionary(&doc, &mut out);

        let page_ids: Vec<ObjectId> = doc.get_pages().values().copied().collect();
        let mut failed = 0usize;
        for (index, page_id) in page_ids.iter().enumerate() {
            match extract_page(&doc, *page_id, index) {
                Ok(page) => out.pages.push(page),
                Err(reason) => {
                    log::warn!("skipping page {}: {reason}", index + 1);
                    out.warnings.push(format!("page {}: {reason}", index + 1));
                    failed += 1;
                }
            }
        }

        if out.pages.is_empty() && failed > 0 {
            return Err(ExtractError::Format(format!(
                "no page content could be decoded ({failed} page(s) failed)"
            )));
        }
        if failed > 0 {
            out.failure = Some(format!("{failed} page(s) failed to decode"));
        }

        Ok(out)
    }

    fn backend_name(&self) -> &str {
        "lopdf"
    }
}

fn read_info_dictionary(doc: &Document, out: &mut PageExtraction) {
    let info = match doc.trailer.get(b"Info") {
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Dictionary(dict)) => dict,
            _ => return,
        },
        Ok(Object::Dictionary(dict)) => dict,
        _ => return,
    };
    out.author = info_string(info, b"Author");
    out.creator = info_string(info, b"Creator");
    out.created = info_string(info, b"CreationDate");
}

fn info_string(dict: &lopdf::Dictionary, key: &[u8]) -> Option<String> {
    match dict.get(key) {
        Ok(Object::String(bytes, _)) => {
            let s = decode_pdf_string(bytes);
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        _ => None,
    }
}

fn extract_page(doc: &Document, page_id: ObjectId, index: usize) -> Result<PageFragments, String> {
    let content_data = doc
        .get_page_content(page_id)
        .map_err(|e| format!("content stream unreadable: {e}"))?;
    let content =
        Content::decode(&content_data).map_err(|e| format!("content stream undecodable: {e}"))?;

    let (width, height) = page_dimensions(doc, page_id);
    let fragments = interpret_text_ops(&content.operations, index);

    Ok(PageFragments {
        page_index: index,
        width,
        height,
        fragments,
    })
}

fn page_dimensions(doc: &Document, page_id: ObjectId) -> (f32, f32) {
    // US Letter fallback when no MediaBox is reachable.
    const DEFAULT: (f32, f32) = (612.0, 792.0);

    let Ok(dict) = doc.get_dictionary(page_id) else {
        return DEFAULT;
    };
    let media_box = match dict.get(b"MediaBox") {
        Ok(Object::Array(a)) => a.clone(),
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Array(a)) => a.clone(),
            _ => return DEFAULT,
        },
        _ => return DEFAULT,
    };
    if media_box.len() != 4 {
        return DEFAULT;
    }
    let nums: Vec<f32> = media_box.iter().filter_map(number).collect();
    if nums.len() != 4 {
        return DEFAULT;
    }
    ((nums[2] - nums[0]).abs(), (nums[3] - nums[1]).abs())
}

/// Text-showing state machine over a page's content operations.
///
/// Tracks the text and line matrices through `BT/Tm/Td/TD/T*` and emits a
/// fragment for every `Tj`/`'`/`"`/`TJ`. Kerning adjustments inside `TJ`
/// larger than [`WORD_GAP_KERNING`] are treated as word gaps.
fn interpret_text_ops(ops: &[Operation], page_index: usize) -> Vec<PositionedFragment> {
    let mut fragments = Vec::new();
    let mut state = TextState::default();

    for op in ops {
        match op.operator.as_ref() {
            "BT" => state.begin_text(),
            "Tf" => {
                if let Some(size) = op.operands.get(1).and_then(number) {
                    state.font_size = size;
                }
            }
            "TL" => {
                if let Some(l) = op.operands.first().and_then(number) {
                    state.leading = l;
                }
            }
            "Td" => {
                let tx = op.operands.first().and_then(number).unwrap_or(0.0);
                let ty = op.operands.get(1).and_then(number).unwrap_or(0.0);
                state.translate_line(tx, ty);
            }
            "TD" => {
                let tx = op.operands.first().and_then(number).unwrap_or(0.0);
                let ty = op.operands.get(1).and_then(number).unwrap_or(0.0);
                state.leading = -ty;
                state.translate_line(tx, ty);
            }
            "Tm" => {
                let nums: Vec<f32> = op.operands.iter().filter_map(number).collect();
                if nums.len() == 6 {
                    state.set_matrix([nums[0], nums[1], nums[2], nums[3], nums[4], nums[5]]);
                }
            }
            "T*" => state.next_line(),
            "Tj" => {
                if let Some(bytes) = op.operands.first().and_then(string_bytes) {
                    state.show(&decode_pdf_string(bytes), page_index, &mut fragments);
                }
            }
            "'" => {
                state.next_line();
                if let Some(bytes) = op.operands.first().and_then(string_bytes) {
                    state.show(&decode_pdf_string(bytes), page_index, &mut fragments);
                }
            }
            "\"" => {
                state.next_line();
                if let Some(bytes) = op.operands.get(2).and_then(string_bytes) {
                    state.show(&decode_pdf_string(bytes), page_index, &mut fragments);
                }
            }
            "TJ" => {
                if let Some(Object::Array(parts)) = op.operands.first() {
                    let text = assemble_tj(parts);
                    state.show(&text, page_index, &mut fragments);
                }
            }
            _ => {}
        }
    }

    fragments
}

/// Kerning threshold (thousandths of an em, negative) above which an
/// adjustment inside `TJ` is rendered as a word gap.
const WORD_GAP_KERNING: f32 = -180.0;

fn assemble_tj(parts: &[Object]) -> String {
    let mut text = String::new();
    for part in parts {
        match part {
            Object::String(bytes, _) => text.push_str(&decode_pdf_string(bytes)),
            other => {
                if let Some(adj) = number(other) {
                    if adj <= WORD_GAP_KERNING && !text.ends_with(' ') {
                        text.push(' ');
                    }
                }
            }
        }
    }
    text
}

#[derive(Debug, Clone)]
struct TextState {
    /// Text matrix [a b c d e f]; (e, f) is the current origin.
    tm: [f32; 6],
    /// Line matrix; `Td`/`T*` operate on this one.
    lm: [f32; 6],
    font_size: f32,
    leading: f32,
}

const IDENTITY: [f32; 6] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

impl Default for TextState {
    fn default() -> Self {
        TextState {
            tm: IDENTITY,
            lm: IDENTITY,
            font_size: 12.0,
            leading: 0.0,
        }
    }
}

impl TextState {
    fn begin_text(&mut self) {
        self.tm = IDENTITY;
        self.lm = IDENTITY;
    }

    fn set_matrix(&mut self, m: [f32; 6]) {
        self.tm = m;
        self.lm = m;
    }

    fn translate_line(&mut self, tx: f32, ty: f32) {
        let [a, b, c, d, e, f] = self.lm;
        self.lm = [a, b, c, d, tx * a + ty * c + e, tx * b + ty * d + f];
        self.tm = self.lm;
    }

    fn next_line(&mut self) {
        let leading = self.leading;
        self.translate_line(0.0, -leading);
    }

    /// Effective glyph size after the text matrix's vertical scale.
    fn effective_size(&self) -> f32 {
        let scale = self.tm[3].abs();
        if scale > f32::EPSILON {
            self.font_size * scale
        } else {
            self.font_size
        }
    }

    fn show(&mut self, text: &str, page_index: usize, out: &mut Vec<PositionedFragment>) {
        let size = self.effective_size();
        // Rough average glyph advance; exact widths would need font metrics.
        let width = text.chars().count() as f32 * size * 0.5;
        if !text.trim().is_empty() {
            out.push(PositionedFragment {
                text: text.to_string(),
                x: self.tm[4],
                y: self.tm[5],
                width,
                height: size,
                page_index,
            });
        }
        self.tm[4] += width;
    }
}

fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

fn string_bytes(obj: &Object) -> Option<&[u8]> {
    match obj {
        Object::String(bytes, _) => Some(bytes),
        _ => None,
    }
}

/// Decode a PDF string: UTF-16BE when BOM-prefixed, otherwise a Latin-1
/// view of the bytes (covers the ASCII range of PDFDocEncoding).
fn decode_pdf_string(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xfe && bytes[1] == 0xff {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        bytes.iter().map(|&b| b as char).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op(operator: &str, operands: Vec<Object>) -> Operation {
        Operation::new(operator, operands)
    }

    #[test]
    fn decode_latin1_string() {
        assert_eq!(decode_pdf_string(b"Hello"), "Hello");
    }

    #[test]
    fn decode_utf16_string() {
        let bytes = [0xfe, 0xff, 0x00, 0x41, 0x00, 0x62];
        assert_eq!(decode_pdf_string(&bytes), "Ab");
    }

    #[test]
    fn tj_positions_fragments_per_line() {
        let ops = vec![
            op("BT", vec![]),
            op("Tf", vec![Object::Name(b"F1".to_vec()), Object::Integer(12)]),
            op(
                "Tm",
                vec![
                    Object::Integer(1),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(1),
                    Object::Integer(72),
                    Object::Integer(720),
                ],
            ),
            op("Tj", vec![Object::string_literal("Apple Inc")]),
            op("Td", vec![Object::Integer(0), Object::Real(-20.0)]),
            op("Tj", vec![Object::string_literal("Bayer AG")]),
            op("ET", vec![]),
        ];
        let fragments = interpret_text_ops(&ops, 0);
        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[0].text, "Apple Inc");
        assert_eq!(fragments[0].x, 72.0);
        assert_eq!(fragments[0].y, 720.0);
        assert_eq!(fragments[1].text, "Bayer AG");
        assert_eq!(fragments[1].y, 700.0);
        assert_eq!(fragments[1].page_index, 0);
    }

    #[test]
    fn consecutive_tj_advance_horizontally() {
        let ops = vec![
            op("BT", vec![]),
            op("Tf", vec![Object::Name(b"F1".to_vec()), Object::Integer(10)]),
            op("Td", vec![Object::Integer(10), Object::Integer(500)]),
            op("Tj", vec![Object::string_literal("left")]),
            op("Tj", vec![Object::string_literal("right")]),
        ];
        let fragments = interpret_text_ops(&ops, 3);
        assert_eq!(fragments.len(), 2);
        assert!(fragments[1].x > fragments[0].x);
        assert_eq!(fragments[0].y, fragments[1].y);
        assert_eq!(fragments[1].page_index, 3);
    }

    #[test]
    fn tj_array_merges_strings_and_word_gaps() {
        let parts = vec![
            Object::string_literal("Hel"),
            Object::Integer(-50),
            Object::string_literal("lo"),
            Object::Integer(-300),
            Object::string_literal("World"),
        ];
        assert_eq!(assemble_tj(&parts), "Hello World");
    }

    #[test]
    fn quote_operator_advances_line() {
        let ops = vec![
            op("BT", vec![]),
            op("TL", vec![Object::Integer(14)]),
            op("Td", vec![Object::Integer(50), Object::Integer(400)]),
            op("Tj", vec![Object::string_literal("first")]),
            op("'", vec![Object::string_literal("second")]),
        ];
        let fragments = interpret_text_ops(&ops, 0);
        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[1].y, 386.0);
        assert_eq!(fragments[1].x, 50.0);
    }

    #[test]
    fn info_dictionary_fields_are_decoded() {
        let mut doc = Document::with_version("1.5");
        let mut info = lopdf::Dictionary::new();
        info.set("Author", Object::string_literal("Jane Analyst"));
        info.set("Creator", Object::string_literal("Custody Suite"));
        doc.trailer.set("Info", Object::Dictionary(info));

        let mut out = PageExtraction::default();
        read_info_dictionary(&doc, &mut out);
        assert_eq!(out.author.as_deref(), Some("Jane Analyst"));
        assert_eq!(out.creator.as_deref(), Some("Custody Suite"));
        assert_eq!(out.created, None);
    }

    #[test]
    fn missing_media_box_falls_back_to_letter() {
        let doc = Document::with_version("1.5");
        assert_eq!(page_dimensions(&doc, (999, 0)), (612.0, 792.0));
    }

    #[test]
    fn whitespace_only_strings_are_not_emitted() {
        let ops = vec![
            op("BT", vec![]),
            op("Td", vec![Object::Integer(10), Object::Integer(10)]),
            op("Tj", vec![Object::string_literal("   ")]),
        ];
        assert!(interpret_text_ops(&ops, 0).is_empty());
    }
}
