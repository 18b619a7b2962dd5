use crate::source::TextPosition;

/// Saved scanner state for backtracking.
#[derive(Debug, Clone, Copy)]
pub struct ScannerCheckpoint {
    cursor: usize,
    line: u32,
    character: u32,
}

/// Byte cursor over one UTF-8 source buffer.
///
/// Line continuations (`\` followed by a newline, with or without a carriage
/// return) are folded transparently: after every consume the scanner skips
/// any continuation so callers never observe one. The character counter
/// counts UTF-8 or UTF-16 code units depending on `count_utf16`, matching
/// what an LSP client negotiated.
#[derive(Debug)]
pub struct SourceScanner<'src> {
    src: &'src [u8],
    cursor: usize,
    line: u32,
    character: u32,
    count_utf16: bool,
}

impl<'src> SourceScanner<'src> {
    pub fn new(src: &'src str, count_utf16: bool) -> Self {
        let mut scanner = SourceScanner {
            src: src.as_bytes(),
            cursor: 0,
            line: 0,
            character: 0,
            count_utf16,
        };
        scanner.fold_line_continuation();
        scanner
    }

    pub fn at_begin(&self) -> bool {
        self.cursor == 0
    }

    pub fn at_end(&self) -> bool {
        self.cursor >= self.src.len()
    }

    pub fn position(&self) -> TextPosition {
        TextPosition::new(self.line, self.character)
    }

    /// Peek the next byte without consuming; `\0` at end of input.
    pub fn peek_byte(&self) -> u8 {
        if self.at_end() {
            0
        } else {
            self.src[self.cursor]
        }
    }

    fn byte_at(&self, offset: usize) -> u8 {
        *self.src.get(self.cursor + offset).unwrap_or(&0)
    }

    /// Consume whitespace. Reports whether anything was skipped and whether
    /// a newline was crossed.
    pub fn skip_whitespace(&mut self) -> (bool, bool) {
        let mut skipped_ws = false;
        let mut skipped_nl = false;
        while !self.at_end() {
            match self.peek_byte() {
                b' ' | b'\t' | b'\r' => {
                    self.character += 1;
                    self.cursor += 1;
                    skipped_ws = true;
                }
                b'\n' => {
                    self.line += 1;
                    self.character = 0;
                    self.cursor += 1;
                    skipped_ws = true;
                    skipped_nl = true;
                }
                _ => {
                    if !self.fold_line_continuation() {
                        break;
                    }
                }
            }
        }
        (skipped_ws, skipped_nl)
    }

    /// Consume characters up to (not including) the next `#` that starts a
    /// line. Used to fast-skip inactive preprocessor regions.
    pub fn skip_until_line_hash(&mut self) {
        let mut start_of_line = false;
        while !self.at_end() {
            match self.peek_byte() {
                b'\n' => {
                    start_of_line = true;
                    self.consume_char(None);
                }
                b' ' | b'\t' | b'\r' => {
                    self.consume_char(None);
                }
                b'#' if start_of_line => break,
                _ => {
                    start_of_line = false;
                    self.consume_char(None);
                }
            }
        }
    }

    /// Consume one UTF-8 code point, optionally copying its bytes.
    pub fn consume_char(&mut self, buffer: Option<&mut Vec<u8>>) {
        let begin = self.cursor;
        self.consume_code_point();
        if let Some(buffer) = buffer {
            buffer.extend_from_slice(&self.src[begin..self.cursor]);
        }
        self.fold_line_continuation();
    }

    /// Consume one byte if it is the given ASCII character.
    ///
    /// `ch` must not be `\0` or `\n`.
    pub fn try_consume_ascii(&mut self, ch: u8) -> bool {
        debug_assert!(ch != 0 && ch != b'\n');
        if self.peek_byte() == ch {
            self.cursor += 1;
            self.character += 1;
            self.fold_line_continuation();
            true
        } else {
            false
        }
    }

    /// Consume the given ASCII text if the remaining input starts with it.
    pub fn try_consume_text(&mut self, text: &str) -> bool {
        let bytes = text.as_bytes();
        if self.src[self.cursor..].starts_with(bytes) {
            self.cursor += bytes.len();
            self.character += bytes.len() as u32;
            self.fold_line_continuation();
            true
        } else {
            false
        }
    }

    pub fn checkpoint(&self) -> ScannerCheckpoint {
        ScannerCheckpoint {
            cursor: self.cursor,
            line: self.line,
            character: self.character,
        }
    }

    pub fn restore(&mut self, checkpoint: ScannerCheckpoint) {
        self.cursor = checkpoint.cursor;
        self.line = checkpoint.line;
        self.character = checkpoint.character;
    }

    fn consume_code_point(&mut self) {
        if self.at_end() {
            return;
        }

        let first = self.src[self.cursor];
        if first < 0x80 {
            self.cursor += 1;
            if first == b'\n' {
                self.line += 1;
                self.character = 0;
            } else {
                self.character += 1;
            }
        } else {
            // Malformed input is not validated; the leading byte alone
            // decides the code point width.
            let width = first.leading_ones() as usize;
            self.character += self.code_unit_count(width);
            self.cursor = (self.cursor + width).min(self.src.len());
        }
    }

    fn code_unit_count(&self, byte_count: usize) -> u32 {
        if self.count_utf16 {
            // Code points above U+FFFF (4 UTF-8 bytes) take a surrogate pair.
            if byte_count == 4 {
                2
            } else {
                1
            }
        } else {
            byte_count as u32
        }
    }

    fn fold_line_continuation(&mut self) -> bool {
        let mut folded = false;
        loop {
            if self.peek_byte() != b'\\' {
                return folded;
            }
            if self.byte_at(1) == b'\n' {
                self.cursor += 2;
            } else if self.byte_at(1) == b'\r' && self.byte_at(2) == b'\n' {
                self.cursor += 3;
            } else {
                return folded;
            }
            self.line += 1;
            self.character = 0;
            folded = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect_chars(src: &str) -> String {
        let mut scanner = SourceScanner::new(src, false);
        let mut buffer = Vec::new();
        while !scanner.at_end() {
            scanner.consume_char(Some(&mut buffer));
        }
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn tracks_line_and_character() {
        let mut scanner = SourceScanner::new("ab\ncd", false);
        scanner.consume_char(None);
        scanner.consume_char(None);
        assert_eq!(scanner.position(), TextPosition::new(0, 2));
        scanner.consume_char(None);
        assert_eq!(scanner.position(), TextPosition::new(1, 0));
    }

    #[test]
    fn folds_backslash_newline() {
        assert_eq!(collect_chars("a\\\nb"), "ab");
        assert_eq!(collect_chars("a\\\r\nb"), "ab");
    }

    #[test]
    fn continuation_at_start_is_folded() {
        let scanner = SourceScanner::new("\\\nx", false);
        assert_eq!(scanner.peek_byte(), b'x');
        assert_eq!(scanner.position().line, 1);
    }

    #[test]
    fn backslash_without_newline_is_kept() {
        assert_eq!(collect_chars("a\\b"), "a\\b");
    }

    #[test]
    fn skip_whitespace_reports_newline() {
        let mut scanner = SourceScanner::new("  \n x", false);
        let (ws, nl) = scanner.skip_whitespace();
        assert!(ws);
        assert!(nl);
        assert_eq!(scanner.peek_byte(), b'x');

        let mut scanner = SourceScanner::new("  x", false);
        let (ws, nl) = scanner.skip_whitespace();
        assert!(ws);
        assert!(!nl);
    }

    #[test]
    fn try_consume_text_only_on_match() {
        let mut scanner = SourceScanner::new("//x", false);
        assert!(!scanner.try_consume_text("/*"));
        assert!(scanner.try_consume_text("//"));
        assert_eq!(scanner.peek_byte(), b'x');
    }

    #[test]
    fn utf16_counting_differs_for_astral_chars() {
        // U+1F600 is 4 UTF-8 bytes, 2 UTF-16 units.
        let mut utf8 = SourceScanner::new("\u{1F600}x", false);
        utf8.consume_char(None);
        assert_eq!(utf8.position().character, 4);

        let mut utf16 = SourceScanner::new("\u{1F600}x", true);
        utf16.consume_char(None);
        assert_eq!(utf16.position().character, 2);
    }

    #[test]
    fn bmp_chars_count_one_utf16_unit() {
        // U+00E9 is 2 UTF-8 bytes, 1 UTF-16 unit.
        let mut utf16 = SourceScanner::new("\u{e9}x", true);
        utf16.consume_char(None);
        assert_eq!(utf16.position().character, 1);
    }

    #[test]
    #[allow(invalid_from_utf8_unchecked)]
    fn never_advances_past_end_on_truncated_utf8() {
        // A lone leading byte promising 4 continuation bytes.
        let bytes = [0xF0, b'a'];
        let src = unsafe { std::str::from_utf8_unchecked(&bytes) };
        let mut scanner = SourceScanner::new(src, false);
        scanner.consume_char(None);
        assert!(scanner.at_end());
    }

    #[test]
    fn checkpoint_restores_full_state() {
        let mut scanner = SourceScanner::new("abc\ndef", false);
        scanner.consume_char(None);
        let checkpoint = scanner.checkpoint();
        scanner.consume_char(None);
        scanner.consume_char(None);
        scanner.consume_char(None);
        scanner.restore(checkpoint);
        assert_eq!(scanner.position(), TextPosition::new(0, 1));
        assert_eq!(scanner.peek_byte(), b'b');
    }

    #[test]
    fn skip_until_line_hash_stops_at_column_zero_hash() {
        let mut scanner = SourceScanner::new("int a;\nfoo\n#endif\n", false);
        scanner.skip_until_line_hash();
        assert_eq!(scanner.peek_byte(), b'#');
        assert_eq!(scanner.position(), TextPosition::new(2, 0));
    }

    #[test]
    fn skip_until_line_hash_ignores_mid_line_hash() {
        let mut scanner = SourceScanner::new("a # b\n# c", false);
        scanner.skip_until_line_hash();
        assert_eq!(scanner.position(), TextPosition::new(1, 0));
    }
}
