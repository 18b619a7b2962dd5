use crate::atom::AtomTable;
use crate::source::{TextPosition, TextRange, UnitId};
use crate::token::{PPToken, RawSyntaxToken, TokenId, TokenKind};

/// Append-only table of post-expansion tokens for one translation unit.
///
/// Comment tokens are dropped here; identifier tokens whose atom spells a
/// keyword are re-kinded. A `TokenId` pairs the unit tag with the index
/// into this table, which keeps ids unique across preamble and user units.
#[derive(Debug)]
pub struct LexContext {
    unit: UnitId,
    tokens: Vec<RawSyntaxToken>,
}

impl LexContext {
    pub fn new(unit: UnitId) -> Self {
        Self { unit, tokens: Vec::new() }
    }

    pub fn unit(&self) -> UnitId {
        self.unit
    }

    /// Index the next appended token will get, in unit-local terms.
    pub fn next_index(&self) -> u32 {
        self.tokens.len() as u32
    }

    pub fn next_token_id(&self) -> TokenId {
        TokenId::new(self.unit, self.next_index())
    }

    pub fn add_token(&mut self, atoms: &AtomTable, token: &PPToken, expanded_range: TextRange) {
        debug_assert!(self.tokens.last().map_or(true, |t| t.kind != TokenKind::Eof));

        if token.kind == TokenKind::Comment {
            return;
        }

        let mut kind = token.kind;
        if kind == TokenKind::Identifier {
            if let Some(kw) = atoms.keyword(token.text) {
                kind = TokenKind::Keyword(kw);
            }
        }

        self.tokens.push(RawSyntaxToken {
            kind,
            spelled_file: token.spelled_file,
            spelled_range: token.spelled_range,
            expanded_range,
            text: token.text,
        });
    }

    pub fn tokens(&self) -> &[RawSyntaxToken] {
        &self.tokens
    }

    pub fn finish(self) -> Vec<RawSyntaxToken> {
        debug_assert!(self.tokens.last().is_some_and(|t| t.kind == TokenKind::Eof));
        self.tokens
    }
}

/// Index of the token whose expanded range starts at or before `pos`, for a
/// slice sorted by expanded-range start.
pub fn find_token_at_position(tokens: &[RawSyntaxToken], pos: TextPosition) -> Option<usize> {
    let first_after = tokens.partition_point(|t| t.expanded_range.start <= pos);
    first_after.checked_sub(1)
}
