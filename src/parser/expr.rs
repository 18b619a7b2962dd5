use super::Parser;
use crate::ast::NodeId;
use crate::consteval::{BinaryOp, UnaryOp};
use crate::token::{Kw, TokenKind};

/// Binding power of a binary operator in the GLSL expression grammar;
/// higher binds tighter.
fn binary_precedence(kind: TokenKind) -> Option<(BinaryOp, u8)> {
    use TokenKind::*;
    Some(match kind {
        PipePipe => (BinaryOp::LogicalOr, 1),
        CaretCaret => (BinaryOp::LogicalXor, 2),
        AmpAmp => (BinaryOp::LogicalAnd, 3),
        Pipe => (BinaryOp::BitOr, 4),
        Caret => (BinaryOp::BitXor, 5),
        Amp => (BinaryOp::BitAnd, 6),
        EqEq => (BinaryOp::Equal, 7),
        NotEq => (BinaryOp::NotEqual, 7),
        LAngle => (BinaryOp::Less, 8),
        RAngle => (BinaryOp::Greater, 8),
        LessEq => (BinaryOp::LessEq, 8),
        GreaterEq => (BinaryOp::GreaterEq, 8),
        LShift => (BinaryOp::ShiftLeft, 9),
        RShift => (BinaryOp::ShiftRight, 9),
        Plus => (BinaryOp::Plus, 10),
        Minus => (BinaryOp::Minus, 10),
        Star => (BinaryOp::Mul, 11),
        Slash => (BinaryOp::Div, 11),
        Percent => (BinaryOp::Modulo, 11),
        _ => return None,
    })
}

fn assignment_op(kind: TokenKind) -> Option<BinaryOp> {
    use TokenKind::*;
    Some(match kind {
        Assign => BinaryOp::Assign,
        AddAssign => BinaryOp::AddAssign,
        SubAssign => BinaryOp::SubAssign,
        MulAssign => BinaryOp::MulAssign,
        DivAssign => BinaryOp::DivAssign,
        ModAssign => BinaryOp::ModAssign,
        LShiftAssign => BinaryOp::LShiftAssign,
        RShiftAssign => BinaryOp::RShiftAssign,
        AndAssign => BinaryOp::AndAssign,
        XorAssign => BinaryOp::XorAssign,
        OrAssign => BinaryOp::OrAssign,
        _ => return None,
    })
}

impl Parser<'_> {
    /// Full expression, including the comma operator.
    pub(crate) fn parse_expr(&mut self) -> NodeId {
        let start = self.pos;
        let mut expr = self.parse_assignment_expr();
        while self.peek() == TokenKind::Comma {
            self.advance();
            let rhs = self.parse_assignment_expr();
            let range = self.range_from(start);
            expr = self.builder.build_binary_expr(range, BinaryOp::Comma, expr, rhs);
        }
        expr
    }

    pub(crate) fn parse_assignment_expr(&mut self) -> NodeId {
        let start = self.pos;
        let lhs = self.parse_conditional_expr();

        if let Some(op) = assignment_op(self.peek()) {
            self.advance();
            // Right-associative.
            let rhs = self.parse_assignment_expr();
            let range = self.range_from(start);
            return self.builder.build_binary_expr(range, op, lhs, rhs);
        }

        lhs
    }

    pub(crate) fn parse_conditional_expr(&mut self) -> NodeId {
        let start = self.pos;
        let cond = self.parse_binary_expr(1);

        if self.peek() != TokenKind::Question {
            return cond;
        }
        self.advance();
        let if_true = self.parse_expr();
        self.expect(TokenKind::Colon, "`:`");
        let if_false = self.parse_assignment_expr();
        let range = self.range_from(start);
        self.builder.build_select_expr(range, cond, if_true, if_false)
    }

    fn parse_binary_expr(&mut self, min_prec: u8) -> NodeId {
        let start = self.pos;
        let mut lhs = self.parse_unary_expr();

        while let Some((op, prec)) = binary_precedence(self.peek()) {
            if prec < min_prec {
                break;
            }
            self.advance();
            let rhs = self.parse_binary_expr(prec + 1);
            let range = self.range_from(start);
            lhs = self.builder.build_binary_expr(range, op, lhs, rhs);
        }

        lhs
    }

    fn parse_unary_expr(&mut self) -> NodeId {
        let start = self.pos;
        let op = match self.peek() {
            TokenKind::Plus => Some(UnaryOp::Identity),
            TokenKind::Minus => Some(UnaryOp::Negate),
            TokenKind::Bang => Some(UnaryOp::LogicalNot),
            TokenKind::Tilde => Some(UnaryOp::BitNot),
            TokenKind::Increment => Some(UnaryOp::PrefixInc),
            TokenKind::Decrement => Some(UnaryOp::PrefixDec),
            _ => None,
        };

        if let Some(op) = op {
            self.advance();
            let operand = self.parse_unary_expr();
            let range = self.range_from(start);
            return self.builder.build_unary_expr(range, op, operand);
        }

        self.parse_postfix_expr()
    }

    fn parse_postfix_expr(&mut self) -> NodeId {
        let start = self.pos;
        let mut expr = self.parse_primary_expr();

        loop {
            match self.peek() {
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.parse_expr();
                    self.expect(TokenKind::RBracket, "`]`");
                    let range = self.range_from(start);
                    expr = self.builder.build_index_access_expr(range, expr, index);
                }
                TokenKind::Dot => {
                    self.advance();
                    let Some(name) = self.expect(TokenKind::Identifier, "a member name") else {
                        let range = self.range_from(start);
                        expr = self.builder.build_error_expr(range);
                        continue;
                    };

                    // `.length()` is an operator, not a member.
                    if self.token_text_at(name) == "length" && self.peek() == TokenKind::LParen {
                        self.advance();
                        self.expect(TokenKind::RParen, "`)`");
                        let range = self.range_from(start);
                        expr = self.builder.build_length_expr(range, expr);
                        continue;
                    }

                    let range = self.range_from(start);
                    expr = self.builder.build_dot_access_expr(range, expr, name);
                }
                TokenKind::Increment => {
                    self.advance();
                    let range = self.range_from(start);
                    expr = self.builder.build_unary_expr(range, UnaryOp::PostfixInc, expr);
                }
                TokenKind::Decrement => {
                    self.advance();
                    let range = self.range_from(start);
                    expr = self.builder.build_unary_expr(range, UnaryOp::PostfixDec, expr);
                }
                _ => break,
            }
        }

        expr
    }

    fn parse_call_arguments(&mut self) -> Vec<NodeId> {
        let mut args = Vec::new();
        self.expect(TokenKind::LParen, "`(`");
        if self.try_consume(TokenKind::RParen).is_some() {
            return args;
        }

        // `f(void)` is an empty argument list.
        if self.peek() == TokenKind::Keyword(Kw::Void) && self.peek_at(1) == TokenKind::RParen {
            self.advance();
            self.advance();
            return args;
        }

        loop {
            args.push(self.parse_assignment_expr());
            if self.try_consume(TokenKind::Comma).is_none() {
                break;
            }
        }
        self.expect(TokenKind::RParen, "`)`");
        args
    }

    fn parse_primary_expr(&mut self) -> NodeId {
        let start = self.pos;
        match self.peek() {
            TokenKind::IntConst
            | TokenKind::FloatConst
            | TokenKind::Keyword(Kw::True)
            | TokenKind::Keyword(Kw::False) => {
                let tok = self.advance();
                let range = self.range_from(start);
                self.builder.build_literal_expr(range, tok)
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expr();
                self.expect(TokenKind::RParen, "`)`");
                expr
            }
            TokenKind::Keyword(kw) if kw.is_type_name() => {
                // A type name in expression position is a constructor call.
                let name = self.advance();
                let array_spec = self.parse_array_spec();
                let type_range = self.range_from(start);
                let qual_type = self.builder.build_qual_type_named(type_range, None, name, array_spec);

                if self.peek() == TokenKind::LParen {
                    let args = self.parse_call_arguments();
                    let range = self.range_from(start);
                    self.builder.build_constructor_call_expr(range, qual_type, args)
                } else {
                    self.report_here("expected `(` after type name".to_string());
                    let range = self.range_from(start);
                    self.builder.build_error_expr(range)
                }
            }
            TokenKind::Identifier => {
                let atom = self.tokens[self.pos].text;
                if self.peek_at(1) == TokenKind::LParen {
                    let name = self.advance();
                    if self.builder.is_struct_name(atom) {
                        let type_range = self.range_from(start);
                        let qual_type =
                            self.builder.build_qual_type_named(type_range, None, name, None);
                        let args = self.parse_call_arguments();
                        let range = self.range_from(start);
                        return self.builder.build_constructor_call_expr(range, qual_type, args);
                    }
                    let args = self.parse_call_arguments();
                    let range = self.range_from(start);
                    return self.builder.build_function_call_expr(range, name, args);
                }

                let name = self.advance();
                let range = self.range_from(start);
                self.builder.build_name_access_expr(range, name)
            }
            _ => {
                self.report_here("expected an expression".to_string());
                let range = self.range_from(start);
                self.builder.build_error_expr(range)
            }
        }
    }

    fn token_text_at(&self, id: crate::token::TokenId) -> &str {
        self.builder.atoms.resolve(self.tokens[id.index as usize].text)
    }
}
