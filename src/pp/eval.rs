use rustc_hash::FxHashSet;

use super::expand::{ExpandEnv, ExpansionSink, MacroExpander, MacroTable};
use crate::atom::AtomTable;
use crate::diag::NullSink;
use crate::token::{PPToken, TokenKind};

/// Evaluate the controlling expression of `#if`/`#elif`.
///
/// `defined NAME` / `defined(NAME)` are substituted first, then the
/// remaining tokens are macro-expanded, then parsed as a C-preprocessor
/// constant expression. Undefined identifiers evaluate to 0. Returns `None`
/// when the expression is malformed or divides by zero.
pub fn eval_condition(tokens: &[PPToken], atoms: &mut AtomTable, macros: &MacroTable) -> Option<bool> {
    let with_defined = substitute_defined(tokens, atoms, macros)?;
    let expanded = expand_all(&with_defined, macros);

    let mut parser = ExprParser { tokens: &expanded, pos: 0, atoms };
    let value = parser.parse_expr(0)?;
    if parser.pos != parser.tokens.len() {
        return None;
    }
    Some(value != 0)
}

/// Replace every `defined` operator application with a `0`/`1` literal so
/// macro expansion cannot disturb its operand.
fn substitute_defined(
    tokens: &[PPToken],
    atoms: &mut AtomTable,
    macros: &MacroTable,
) -> Option<Vec<PPToken>> {
    let defined_atom = atoms.intern("defined");
    let mut out = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        let tok = tokens[i];
        if tok.kind == TokenKind::Identifier && tok.text == defined_atom {
            i += 1;
            let parenthesized = tokens.get(i).is_some_and(|t| t.kind == TokenKind::LParen);
            if parenthesized {
                i += 1;
            }
            let name = tokens.get(i)?;
            if name.kind != TokenKind::Identifier {
                return None;
            }
            let is_defined = macros.is_defined(name.text);
            i += 1;
            if parenthesized {
                if tokens.get(i).map(|t| t.kind) != Some(TokenKind::RParen) {
                    return None;
                }
                i += 1;
            }

            let mut literal = tok;
            literal.kind = TokenKind::IntConst;
            literal.text = atoms.intern(if is_defined { "1" } else { "0" });
            out.push(literal);
        } else {
            out.push(tok);
            i += 1;
        }
    }
    Some(out)
}

struct BufferSink {
    out: Vec<PPToken>,
}

impl ExpansionSink for BufferSink {
    fn yield_token(&mut self, token: &PPToken) {
        self.out.push(*token);
    }

    fn enter_expansion(&mut self, _use_tok: &PPToken) {}

    fn exit_expansion(&mut self, _use_tok: &PPToken) {}
}

fn expand_all(tokens: &[PPToken], macros: &MacroTable) -> Vec<PPToken> {
    let mut sink = BufferSink { out: Vec::new() };
    let mut disabled = FxHashSet::default();
    let diag = NullSink;
    let mut expander = MacroExpander::new();
    {
        let mut env = ExpandEnv { macros, disabled: &mut disabled, sink: &mut sink, diag: &diag };
        for tok in tokens {
            expander.feed(&mut env, *tok);
        }
        expander.finalize(&mut env);
    }
    sink.out
}

/// Precedence-climbing parser over the substituted token list. All
/// arithmetic is wrapping `i64`.
struct ExprParser<'t, 'a> {
    tokens: &'t [PPToken],
    pos: usize,
    atoms: &'a AtomTable,
}

impl ExprParser<'_, '_> {
    fn peek(&self) -> Option<TokenKind> {
        self.tokens.get(self.pos).map(|t| t.kind)
    }

    fn bump(&mut self) -> Option<PPToken> {
        let tok = self.tokens.get(self.pos).copied();
        self.pos += 1;
        tok
    }

    fn parse_primary(&mut self) -> Option<i64> {
        let tok = self.bump()?;
        match tok.kind {
            TokenKind::IntConst => parse_pp_int(self.atoms.resolve(tok.text)),
            // Any identifier that survives expansion is undefined: 0.
            TokenKind::Identifier => Some(0),
            TokenKind::LParen => {
                let value = self.parse_expr(0)?;
                if self.bump()?.kind != TokenKind::RParen {
                    return None;
                }
                Some(value)
            }
            TokenKind::Plus => self.parse_primary(),
            TokenKind::Minus => Some(self.parse_primary()?.wrapping_neg()),
            TokenKind::Tilde => Some(!self.parse_primary()?),
            TokenKind::Bang => Some((self.parse_primary()? == 0) as i64),
            _ => None,
        }
    }

    fn parse_expr(&mut self, min_prec: u8) -> Option<i64> {
        let mut lhs = self.parse_primary()?;

        loop {
            let Some(kind) = self.peek() else { break };

            // The ternary binds loosest of all.
            if kind == TokenKind::Question && min_prec == 0 {
                self.bump();
                let if_true = self.parse_expr(0)?;
                if self.bump()?.kind != TokenKind::Colon {
                    return None;
                }
                let if_false = self.parse_expr(0)?;
                lhs = if lhs != 0 { if_true } else { if_false };
                continue;
            }

            let Some(prec) = binary_precedence(kind) else { break };
            if prec < min_prec {
                break;
            }
            self.bump();
            let rhs = self.parse_expr(prec + 1)?;
            lhs = apply_binary(kind, lhs, rhs)?;
        }

        Some(lhs)
    }
}

fn binary_precedence(kind: TokenKind) -> Option<u8> {
    use TokenKind::*;
    Some(match kind {
        PipePipe => 1,
        AmpAmp => 2,
        Pipe => 3,
        Caret => 4,
        Amp => 5,
        EqEq | NotEq => 6,
        LAngle | RAngle | LessEq | GreaterEq => 7,
        LShift | RShift => 8,
        Plus | Minus => 9,
        Star | Slash | Percent => 10,
        _ => return None,
    })
}

fn apply_binary(kind: TokenKind, lhs: i64, rhs: i64) -> Option<i64> {
    use TokenKind::*;
    Some(match kind {
        PipePipe => (lhs != 0 || rhs != 0) as i64,
        AmpAmp => (lhs != 0 && rhs != 0) as i64,
        Pipe => lhs | rhs,
        Caret => lhs ^ rhs,
        Amp => lhs & rhs,
        EqEq => (lhs == rhs) as i64,
        NotEq => (lhs != rhs) as i64,
        LAngle => (lhs < rhs) as i64,
        RAngle => (lhs > rhs) as i64,
        LessEq => (lhs <= rhs) as i64,
        GreaterEq => (lhs >= rhs) as i64,
        LShift => lhs.wrapping_shl(rhs as u32),
        RShift => lhs.wrapping_shr(rhs as u32),
        Plus => lhs.wrapping_add(rhs),
        Minus => lhs.wrapping_sub(rhs),
        Star => lhs.wrapping_mul(rhs),
        Slash => lhs.checked_div(rhs)?,
        Percent => lhs.checked_rem(rhs)?,
        _ => return None,
    })
}

fn parse_pp_int(text: &str) -> Option<i64> {
    let body = text.strip_suffix(['u', 'U']).unwrap_or(text);
    if let Some(hex) = body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")) {
        return i64::from_str_radix(hex, 16).ok();
    }
    if body.len() > 1 && body.starts_with('0') {
        return i64::from_str_radix(&body[1..], 8).ok();
    }
    body.parse::<i64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{FileId, TextPosition, TextRange};

    fn tok(atoms: &mut AtomTable, kind: TokenKind, text: &str) -> PPToken {
        PPToken {
            kind,
            spelled_file: FileId::from_user_index(0),
            spelled_range: TextRange::collapsed(TextPosition::new(0, 0)),
            text: atoms.intern(text),
            first_of_line: false,
            leading_ws: false,
        }
    }

    /// Lex a directive-expression string into PPTokens through the real
    /// tokenizer.
    fn lex(atoms: &mut AtomTable, src: &str) -> Vec<PPToken> {
        let mut tokenizer = crate::tokenizer::Tokenizer::new(FileId::from_user_index(0), src, false);
        let mut out = Vec::new();
        loop {
            let tok = tokenizer.next_token(atoms, false);
            if tok.kind == TokenKind::Eof {
                break;
            }
            out.push(tok);
        }
        out
    }

    fn eval(src: &str, macros: &MacroTable) -> Option<bool> {
        let mut atoms = AtomTable::new();
        let tokens = lex(&mut atoms, src);
        eval_condition(&tokens, &mut atoms, macros)
    }

    #[test]
    fn integer_literals_and_arithmetic() {
        let macros = MacroTable::new();
        assert_eq!(eval("1", &macros), Some(true));
        assert_eq!(eval("0", &macros), Some(false));
        assert_eq!(eval("1 + 2 * 3 == 7", &macros), Some(true));
        assert_eq!(eval("(1 + 2) * 3", &macros), Some(true));
        assert_eq!(eval("8 >> 3", &macros), Some(true));
        assert_eq!(eval("1 << 3 != 8", &macros), Some(false));
    }

    #[test]
    fn undefined_identifier_is_zero() {
        let macros = MacroTable::new();
        assert_eq!(eval("FOO", &macros), Some(false));
        assert_eq!(eval("FOO + 1", &macros), Some(true));
    }

    #[test]
    fn defined_operator_both_forms() {
        let mut atoms = AtomTable::new();
        let mut macros = MacroTable::new();
        let name = tok(&mut atoms, TokenKind::Identifier, "FOO");
        macros.define_object(name, vec![]);

        let tokens = lex(&mut atoms, "defined(FOO)");
        assert_eq!(eval_condition(&tokens, &mut atoms, &macros), Some(true));

        let tokens = lex(&mut atoms, "defined FOO");
        assert_eq!(eval_condition(&tokens, &mut atoms, &macros), Some(true));

        let tokens = lex(&mut atoms, "defined(BAR)");
        assert_eq!(eval_condition(&tokens, &mut atoms, &macros), Some(false));

        let tokens = lex(&mut atoms, "!defined(BAR)");
        assert_eq!(eval_condition(&tokens, &mut atoms, &macros), Some(true));
    }

    #[test]
    fn macros_are_expanded_in_condition() {
        let mut atoms = AtomTable::new();
        let mut macros = MacroTable::new();
        let name = tok(&mut atoms, TokenKind::Identifier, "VERSION");
        let body = vec![tok(&mut atoms, TokenKind::IntConst, "450")];
        macros.define_object(name, body);

        let tokens = lex(&mut atoms, "VERSION >= 440");
        assert_eq!(eval_condition(&tokens, &mut atoms, &macros), Some(true));
    }

    #[test]
    fn logical_and_ternary() {
        let macros = MacroTable::new();
        assert_eq!(eval("1 && 0", &macros), Some(false));
        assert_eq!(eval("1 || 0", &macros), Some(true));
        assert_eq!(eval("1 ? 0 : 5", &macros), Some(false));
        assert_eq!(eval("0 ? 0 : 5", &macros), Some(true));
        assert_eq!(eval("!0 && ~0", &macros), Some(true));
    }

    #[test]
    fn malformed_expressions_are_rejected() {
        let macros = MacroTable::new();
        assert_eq!(eval("1 +", &macros), None);
        assert_eq!(eval("(1", &macros), None);
        assert_eq!(eval("", &macros), None);
        assert_eq!(eval("1 1", &macros), None);
    }

    #[test]
    fn division_by_zero_is_an_error() {
        let macros = MacroTable::new();
        assert_eq!(eval("1 / 0", &macros), None);
        assert_eq!(eval("1 % 0", &macros), None);
        assert_eq!(eval("4 / 2", &macros), Some(true));
    }

    #[test]
    fn hex_and_octal_literals() {
        let macros = MacroTable::new();
        assert_eq!(eval("0x10 == 16", &macros), Some(true));
        assert_eq!(eval("010 == 8", &macros), Some(true));
        assert_eq!(eval("1u == 1", &macros), Some(true));
    }
}
