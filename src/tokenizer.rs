use crate::atom::AtomTable;
use crate::scanner::SourceScanner;
use crate::source::{FileId, TextRange};
use crate::token::{PPToken, TokenKind, PUNCTUATORS};

/// Produces preprocessing tokens from one source buffer.
///
/// Comments and header names are lexed by hand (the only places where
/// non-ASCII text is meaningful); identifiers, numbers, and punctuators go
/// through a maximal-munch scan. Keywords are not recognised here; the lex
/// context re-kinds identifiers on append.
pub struct Tokenizer<'src> {
    scanner: SourceScanner<'src>,
    file: FileId,
    buf: Vec<u8>,
    force_first_of_line: bool,
}

impl<'src> Tokenizer<'src> {
    pub fn new(file: FileId, src: &'src str, count_utf16: bool) -> Self {
        Self {
            scanner: SourceScanner::new(src, count_utf16),
            file,
            buf: Vec::new(),
            force_first_of_line: false,
        }
    }

    pub fn file(&self) -> FileId {
        self.file
    }

    /// Skip to the next `#` at the start of a line. Used while the current
    /// conditional region is inactive; the `#` reached this way always
    /// counts as starting its line.
    pub fn fast_skip_to_hash(&mut self) {
        self.scanner.skip_until_line_hash();
        self.force_first_of_line = true;
    }

    /// Lex the next preprocessing token. `expect_header_name` is set by the
    /// preprocessor right after `#include` so `"..."` and `<...>` lex as
    /// header names instead of punctuator soup.
    pub fn next_token(&mut self, atoms: &mut AtomTable, expect_header_name: bool) -> PPToken {
        let mut first_of_line = self.scanner.at_begin() || self.force_first_of_line;
        self.force_first_of_line = false;
        let (leading_ws, skipped_newline) = self.scanner.skip_whitespace();
        first_of_line |= skipped_newline;

        if self.scanner.at_end() {
            // An EOF always counts as starting a fresh line.
            return PPToken {
                kind: TokenKind::Eof,
                spelled_file: self.file,
                spelled_range: TextRange::collapsed(self.scanner.position()),
                text: crate::atom::Atom::EMPTY,
                first_of_line: true,
                leading_ws: true,
            };
        }

        self.buf.clear();
        let begin = self.scanner.position();

        let kind = if self.scanner.try_consume_text("//") {
            self.lex_line_comment()
        } else if self.scanner.try_consume_text("/*") {
            self.lex_block_comment()
        } else if expect_header_name && self.scanner.try_consume_ascii(b'"') {
            self.lex_header_name(b'"', b'"', TokenKind::QuotedString)
        } else if expect_header_name && self.scanner.try_consume_ascii(b'<') {
            self.lex_header_name(b'<', b'>', TokenKind::AngleString)
        } else {
            self.lex_main()
        };

        let text = atoms.intern(std::str::from_utf8(&self.buf).unwrap_or(""));
        PPToken {
            kind,
            spelled_file: self.file,
            spelled_range: TextRange::new(begin, self.scanner.position()),
            text,
            first_of_line,
            leading_ws,
        }
    }

    fn lex_line_comment(&mut self) -> TokenKind {
        while !self.scanner.at_end() && self.scanner.peek_byte() != b'\n' {
            self.scanner.consume_char(None);
        }
        TokenKind::Comment
    }

    fn lex_block_comment(&mut self) -> TokenKind {
        while !self.scanner.at_end() {
            if self.scanner.try_consume_text("*/") {
                return TokenKind::Comment;
            }
            self.scanner.consume_char(None);
        }
        // Ran off the end of the buffer inside the comment.
        TokenKind::Error
    }

    fn lex_header_name(&mut self, open: u8, close: u8, kind: TokenKind) -> TokenKind {
        self.buf.push(open);
        while !self.scanner.at_end() {
            if self.scanner.peek_byte() == b'\n' {
                break;
            }
            if self.scanner.try_consume_ascii(close) {
                self.buf.push(close);
                return kind;
            }
            self.scanner.consume_char(Some(&mut self.buf));
        }
        TokenKind::Error
    }

    fn lex_main(&mut self) -> TokenKind {
        let first = self.scanner.peek_byte();

        if first.is_ascii_alphabetic() || first == b'_' {
            return self.lex_identifier();
        }
        if first.is_ascii_digit() {
            return self.lex_number();
        }
        if first == b'.' {
            // `.5` is a float literal; a lone `.` is a punctuator.
            let checkpoint = self.scanner.checkpoint();
            self.scanner.consume_char(None);
            let after = self.scanner.peek_byte();
            self.scanner.restore(checkpoint);
            if after.is_ascii_digit() {
                return self.lex_number();
            }
        }

        for &(spelling, kind) in PUNCTUATORS.iter() {
            if self.scanner.try_consume_text(spelling) {
                self.buf.extend_from_slice(spelling.as_bytes());
                return kind;
            }
        }

        // Unknown byte: take one code point so lexing always advances.
        self.scanner.consume_char(Some(&mut self.buf));
        TokenKind::Error
    }

    fn lex_identifier(&mut self) -> TokenKind {
        while !self.scanner.at_end() {
            let b = self.scanner.peek_byte();
            if b.is_ascii_alphanumeric() || b == b'_' {
                self.scanner.consume_char(Some(&mut self.buf));
            } else {
                break;
            }
        }
        TokenKind::Identifier
    }

    fn consume_digits(&mut self, hex: bool) -> bool {
        let mut any = false;
        while !self.scanner.at_end() {
            let b = self.scanner.peek_byte();
            let is_digit = if hex { b.is_ascii_hexdigit() } else { b.is_ascii_digit() };
            if is_digit {
                self.scanner.consume_char(Some(&mut self.buf));
                any = true;
            } else {
                break;
            }
        }
        any
    }

    fn lex_number(&mut self) -> TokenKind {
        // Hex integers first: 0x prefix, hex digits, optional unsigned suffix.
        for prefix in ["0x", "0X"] {
            if self.scanner.try_consume_text(prefix) {
                self.buf.extend_from_slice(prefix.as_bytes());
                if !self.consume_digits(true) {
                    return TokenKind::Error;
                }
                self.try_consume_unsigned_suffix();
                return TokenKind::IntConst;
            }
        }

        let mut is_float = false;

        self.consume_digits(false);
        if self.scanner.peek_byte() == b'.' {
            self.scanner.consume_char(Some(&mut self.buf));
            is_float = true;
            self.consume_digits(false);
        }

        if matches!(self.scanner.peek_byte(), b'e' | b'E') {
            let checkpoint = self.scanner.checkpoint();
            let buf_len = self.buf.len();
            self.scanner.consume_char(Some(&mut self.buf));
            if matches!(self.scanner.peek_byte(), b'+' | b'-') {
                self.scanner.consume_char(Some(&mut self.buf));
            }
            if self.consume_digits(false) {
                is_float = true;
            } else {
                // Not an exponent after all; leave `e` for the next token.
                self.scanner.restore(checkpoint);
                self.buf.truncate(buf_len);
            }
        }

        if is_float {
            if self.scanner.try_consume_text("lf") {
                self.buf.extend_from_slice(b"lf");
            } else if self.scanner.try_consume_text("LF") {
                self.buf.extend_from_slice(b"LF");
            } else if matches!(self.scanner.peek_byte(), b'f' | b'F') {
                self.scanner.consume_char(Some(&mut self.buf));
            }
            TokenKind::FloatConst
        } else if matches!(self.scanner.peek_byte(), b'f' | b'F') {
            // Integer digits with a float suffix, e.g. `1f`.
            self.scanner.consume_char(Some(&mut self.buf));
            TokenKind::FloatConst
        } else {
            self.try_consume_unsigned_suffix();
            TokenKind::IntConst
        }
    }

    fn try_consume_unsigned_suffix(&mut self) {
        if matches!(self.scanner.peek_byte(), b'u' | b'U') {
            self.scanner.consume_char(Some(&mut self.buf));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::AtomTable;

    fn lex_all(src: &str) -> Vec<(TokenKind, String)> {
        let mut atoms = AtomTable::new();
        let mut tokenizer = Tokenizer::new(FileId::from_user_index(0), src, false);
        let mut out = Vec::new();
        loop {
            let tok = tokenizer.next_token(&mut atoms, false);
            let done = tok.kind == TokenKind::Eof;
            out.push((tok.kind, atoms.resolve(tok.text).to_string()));
            if done {
                break;
            }
        }
        out
    }

    fn kinds(src: &str) -> Vec<TokenKind> {
        lex_all(src).into_iter().map(|(k, _)| k).collect()
    }

    #[test]
    fn empty_source_yields_single_eof() {
        assert_eq!(kinds(""), vec![TokenKind::Eof]);
    }

    #[test]
    fn identifiers_and_punctuators() {
        let toks = lex_all("int a = b;");
        assert_eq!(
            toks.iter().map(|(k, _)| *k).collect::<Vec<_>>(),
            vec![
                TokenKind::Identifier,
                TokenKind::Identifier,
                TokenKind::Assign,
                TokenKind::Identifier,
                TokenKind::Semi,
                TokenKind::Eof,
            ]
        );
        assert_eq!(toks[0].1, "int");
    }

    #[test]
    fn maximal_munch_takes_longest_punctuator() {
        assert_eq!(
            kinds("a <<= b"),
            vec![TokenKind::Identifier, TokenKind::LShiftAssign, TokenKind::Identifier, TokenKind::Eof]
        );
        assert_eq!(
            kinds("a<<b"),
            vec![TokenKind::Identifier, TokenKind::LShift, TokenKind::Identifier, TokenKind::Eof]
        );
    }

    #[test]
    fn numeric_literals() {
        assert_eq!(kinds("42")[0], TokenKind::IntConst);
        assert_eq!(kinds("42u")[0], TokenKind::IntConst);
        assert_eq!(kinds("0x1F")[0], TokenKind::IntConst);
        assert_eq!(kinds("1.5")[0], TokenKind::FloatConst);
        assert_eq!(kinds(".5")[0], TokenKind::FloatConst);
        assert_eq!(kinds("1.")[0], TokenKind::FloatConst);
        assert_eq!(kinds("1e10")[0], TokenKind::FloatConst);
        assert_eq!(kinds("1.5e-3f")[0], TokenKind::FloatConst);
        assert_eq!(kinds("2.0lf")[0], TokenKind::FloatConst);
    }

    #[test]
    fn digit_followed_by_identifier_does_not_merge() {
        // `1e` with no exponent digits: `1` then identifier `e`.
        assert_eq!(
            kinds("1e"),
            vec![TokenKind::IntConst, TokenKind::Identifier, TokenKind::Eof]
        );
    }

    #[test]
    fn line_comment_runs_to_newline() {
        let toks = lex_all("a // rest\nb");
        assert_eq!(
            toks.iter().map(|(k, _)| *k).collect::<Vec<_>>(),
            vec![TokenKind::Identifier, TokenKind::Comment, TokenKind::Identifier, TokenKind::Eof]
        );
    }

    #[test]
    fn block_comment_spans_lines() {
        let toks = lex_all("a /* x\ny */ b");
        assert_eq!(
            toks.iter().map(|(k, _)| *k).collect::<Vec<_>>(),
            vec![TokenKind::Identifier, TokenKind::Comment, TokenKind::Identifier, TokenKind::Eof]
        );
    }

    #[test]
    fn unterminated_block_comment_is_error() {
        let toks = kinds("/* never closed");
        assert_eq!(toks[0], TokenKind::Error);
    }

    #[test]
    fn first_of_line_tracks_newlines() {
        let mut atoms = AtomTable::new();
        let mut tokenizer = Tokenizer::new(FileId::from_user_index(0), "a b\nc", false);
        let a = tokenizer.next_token(&mut atoms, false);
        let b = tokenizer.next_token(&mut atoms, false);
        let c = tokenizer.next_token(&mut atoms, false);
        assert!(a.first_of_line);
        assert!(!b.first_of_line);
        assert!(b.leading_ws);
        assert!(c.first_of_line);
    }

    #[test]
    fn header_name_modes() {
        let mut atoms = AtomTable::new();
        let mut tokenizer = Tokenizer::new(FileId::from_user_index(0), "\"a/b.h\"", false);
        let tok = tokenizer.next_token(&mut atoms, true);
        assert_eq!(tok.kind, TokenKind::QuotedString);
        assert_eq!(atoms.resolve(tok.text), "\"a/b.h\"");

        let mut tokenizer = Tokenizer::new(FileId::from_user_index(0), "<common.h>", false);
        let tok = tokenizer.next_token(&mut atoms, true);
        assert_eq!(tok.kind, TokenKind::AngleString);
        assert_eq!(atoms.resolve(tok.text), "<common.h>");
    }

    #[test]
    fn unterminated_header_name_is_error() {
        let mut atoms = AtomTable::new();
        let mut tokenizer = Tokenizer::new(FileId::from_user_index(0), "\"a.h\nx", false);
        let tok = tokenizer.next_token(&mut atoms, true);
        assert_eq!(tok.kind, TokenKind::Error);
    }

    #[test]
    fn line_continuation_joins_identifier() {
        let toks = lex_all("ab\\\ncd");
        assert_eq!(toks[0], (TokenKind::Identifier, "abcd".to_string()));
    }

    #[test]
    fn spelled_ranges_are_monotone() {
        let mut atoms = AtomTable::new();
        let mut tokenizer = Tokenizer::new(FileId::from_user_index(0), "a bb\n ccc d", false);
        let mut last = None;
        loop {
            let tok = tokenizer.next_token(&mut atoms, false);
            if let Some(prev) = last {
                assert!(tok.spelled_range.start >= prev);
            }
            last = Some(tok.spelled_range.start);
            if tok.kind == TokenKind::Eof {
                break;
            }
        }
    }

    #[test]
    fn hash_token_lexes() {
        let toks = kinds("#define");
        assert_eq!(toks, vec![TokenKind::Hash, TokenKind::Identifier, TokenKind::Eof]);
    }

    #[test]
    fn bad_byte_becomes_error_token_and_advances() {
        let toks = kinds("@ a");
        assert_eq!(toks, vec![TokenKind::Error, TokenKind::Identifier, TokenKind::Eof]);
    }
}
