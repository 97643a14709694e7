//! Open document text and position translation.
//!
//! Text lives in a [`Rope`], so line lookups and splices stay logarithmic
//! in the document size. Editor positions use UTF-16 columns; everything
//! else in the crate speaks byte offsets.

use std::ops::Range;

use ropey::Rope;
use tower_lsp::lsp_types::{Position, TextDocumentContentChangeEvent, Url};

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ChangeError {
    #[error("version {received} is not newer than {current}")]
    StaleVersion { current: i32, received: i32 },
    #[error("document is not open")]
    NotOpen,
    #[error("edit range {0:?} ends before it starts")]
    InvalidRange(tower_lsp::lsp_types::Range),
}

#[derive(Clone, Debug)]
pub struct Document {
    pub uri: Url,
    pub version: i32,
    rope: Rope,
}

impl Document {
    pub fn new(uri: Url, text: &str, version: i32) -> Self {
        Self {
            uri,
            version,
            rope: Rope::from_str(text),
        }
    }

    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    pub fn len(&self) -> usize {
        self.rope.len_bytes()
    }

    pub fn is_empty(&self) -> bool {
        self.rope.len_bytes() == 0
    }

    /// Editor position of a byte offset. Offsets past the end clamp to it.
    pub fn position(&self, offset: usize) -> Position {
        let rope = &self.rope;
        let char_idx = rope.byte_to_char(offset.min(rope.len_bytes()));
        let line = rope.char_to_line(char_idx);
        let line_start = rope.line_to_char(line);
        let character = rope.char_to_utf16_cu(char_idx) - rope.char_to_utf16_cu(line_start);
        Position {
            line: line as u32,
            character: character as u32,
        }
    }

    /// Editor range of a byte range.
    pub fn range(&self, span: Range<usize>) -> tower_lsp::lsp_types::Range {
        tower_lsp::lsp_types::Range {
            start: self.position(span.start),
            end: self.position(span.end),
        }
    }

    /// Byte offset of an editor position. A column past the end of its line
    /// clamps to the line end; a line past the end of the text is `None`.
    pub fn offset(&self, position: Position) -> Option<usize> {
        let char_idx = self.char_index(position)?;
        Some(self.rope.char_to_byte(char_idx))
    }

    fn char_index(&self, position: Position) -> Option<usize> {
        let rope = &self.rope;
        let line = position.line as usize;
        if line >= rope.len_lines() {
            return None;
        }
        let line_start = rope.line_to_char(line);
        let line_end = line_start + line_content_chars(rope.line(line));

        let line_start_cu = rope.char_to_utf16_cu(line_start);
        let line_end_cu = rope.char_to_utf16_cu(line_end);
        let target_cu = (line_start_cu + position.character as usize).min(line_end_cu);
        Some(rope.utf16_cu_to_char(target_cu))
    }

    /// Like [`Self::char_index`], but a line past the end of the text
    /// clamps to the end of the text.
    fn clamped_char_index(&self, position: Position) -> usize {
        self.char_index(position).unwrap_or(self.rope.len_chars())
    }

    /// Apply one content change. A change without a range replaces the text.
    ///
    /// Positions past the end clamp to it, so the text keeps following the
    /// client's; only a range ending before it starts is rejected.
    pub fn apply(&mut self, change: &TextDocumentContentChangeEvent) -> Result<(), ChangeError> {
        let Some(range) = change.range else {
            self.rope = Rope::from_str(&change.text);
            return Ok(());
        };
        let start = self.clamped_char_index(range.start);
        let end = self.clamped_char_index(range.end);
        if end < start {
            return Err(ChangeError::InvalidRange(range));
        }
        self.rope.remove(start..end);
        self.rope.insert(start, &change.text);
        Ok(())
    }
}

/// Characters of a line without its line break.
fn line_content_chars(line: ropey::RopeSlice) -> usize {
    let mut len = line.len_chars();
    while len > 0 && matches!(line.char(len - 1), '\n' | '\r') {
        len -= 1;
    }
    len
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower_lsp::lsp_types::Range as LspRange;

    fn doc(text: &str) -> Document {
        Document::new(Url::parse("file:///t.ttl").unwrap(), text, 1)
    }

    fn pos(line: u32, character: u32) -> Position {
        Position { line, character }
    }

    fn edit(start: Position, end: Position, text: &str) -> TextDocumentContentChangeEvent {
        TextDocumentContentChangeEvent {
            range: Some(LspRange { start, end }),
            range_length: None,
            text: text.to_string(),
        }
    }

    #[test]
    fn offsets_and_positions_agree() {
        let d = doc("ab\ncdé\nf");
        assert_eq!(d.position(0), pos(0, 0));
        assert_eq!(d.position(4), pos(1, 1));
        assert_eq!(d.offset(pos(1, 1)), Some(4));
        assert_eq!(d.offset(pos(2, 0)), Some(d.len() - 1));
    }

    #[test]
    fn columns_are_utf16() {
        // U+1F600 is one char, four UTF-8 bytes and two UTF-16 units.
        let d = doc("\u{1F600}<urn:a>");
        assert_eq!(d.position(4), pos(0, 2));
        assert_eq!(d.offset(pos(0, 2)), Some(4));
    }

    #[test]
    fn column_past_line_end_clamps() {
        let d = doc("abc\r\ndef");
        assert_eq!(d.offset(pos(0, 99)), Some(3));
        assert_eq!(d.offset(pos(7, 0)), None);
    }

    #[test]
    fn incremental_edits_splice_the_text() {
        let mut d = doc("<urn:a> a <urn:b> .\n");
        d.apply(&edit(pos(0, 1), pos(0, 6), "http://x/y")).unwrap();
        assert_eq!(d.text(), "<http://x/y> a <urn:b> .\n");
        d.apply(&edit(pos(1, 0), pos(1, 0), "<urn:c> a <urn:d> .")).unwrap();
        assert_eq!(d.text(), "<http://x/y> a <urn:b> .\n<urn:c> a <urn:d> .");
    }

    #[test]
    fn full_replacement_and_bad_ranges() {
        let mut d = doc("old");
        d.apply(&TextDocumentContentChangeEvent {
            range: None,
            range_length: None,
            text: "new".into(),
        })
        .unwrap();
        assert_eq!(d.text(), "new");
        assert!(matches!(
            d.apply(&edit(pos(0, 2), pos(0, 1), "x")),
            Err(ChangeError::InvalidRange(_))
        ));
        assert_eq!(d.text(), "new");
    }

    #[test]
    fn edits_past_the_end_append() {
        let mut d = doc("<urn:a> a <urn:b> .");
        d.apply(&edit(pos(3, 0), pos(4, 2), "\n<urn:c> a <urn:d> .")).unwrap();
        assert_eq!(d.text(), "<urn:a> a <urn:b> .\n<urn:c> a <urn:d> .");

        // Later edits still land where the client expects them.
        d.apply(&edit(pos(1, 1), pos(1, 6), "http://x/c")).unwrap();
        assert_eq!(d.text(), "<urn:a> a <urn:b> .\n<http://x/c> a <urn:d> .");
    }
}
