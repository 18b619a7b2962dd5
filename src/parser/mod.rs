mod expr;

use crate::ast::{Declarator, JumpKind, LayoutItem, NodeId, QualifierGroup};
use crate::builder::AstBuilder;
use crate::cancel::CancellationToken;
use crate::diag::Severity;
use crate::source::UnitId;
use crate::token::{Kw, RawSyntaxToken, SyntaxRange, TokenId, TokenKind};
use crate::types::TypeId;

/// Predictive recursive-descent parser over one unit's token stream.
///
/// Nodes are produced through the builder, so name resolution and type
/// deduction happen while parsing; a struct name declared earlier in the
/// stream is already visible when a later statement starts with it.
pub struct Parser<'c> {
    tokens: &'c [RawSyntaxToken],
    pos: usize,
    unit: UnitId,
    pub(crate) builder: AstBuilder<'c>,
    cancel: CancellationToken,
    halted: bool,
}

impl<'c> Parser<'c> {
    pub fn new(builder: AstBuilder<'c>, cancel: CancellationToken) -> Self {
        let tokens = builder.tokens;
        let unit = builder.unit;
        Self { tokens, pos: 0, unit, builder, cancel, halted: false }
    }

    // ---- Cursor helpers ------------------------------------------------

    fn peek(&self) -> TokenKind {
        self.tokens.get(self.pos).map(|t| t.kind).unwrap_or(TokenKind::Eof)
    }

    fn peek_at(&self, offset: usize) -> TokenKind {
        self.tokens.get(self.pos + offset).map(|t| t.kind).unwrap_or(TokenKind::Eof)
    }

    fn at_eof(&self) -> bool {
        self.peek() == TokenKind::Eof
    }

    fn id_at(&self, pos: usize) -> TokenId {
        TokenId::new(self.unit, pos as u32)
    }

    fn cur_id(&self) -> TokenId {
        self.id_at(self.pos)
    }

    fn advance(&mut self) -> TokenId {
        let id = self.cur_id();
        if !self.at_eof() {
            self.pos += 1;
        }
        id
    }

    fn try_consume(&mut self, kind: TokenKind) -> Option<TokenId> {
        if self.peek() == kind {
            Some(self.advance())
        } else {
            None
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Option<TokenId> {
        match self.try_consume(kind) {
            Some(id) => Some(id),
            None => {
                self.report_here(format!("expected {what}"));
                None
            }
        }
    }

    fn report_here(&self, message: String) {
        let tok = &self.tokens[self.pos.min(self.tokens.len() - 1)];
        self.builder.diag.report(tok.spelled_file, tok.spelled_range, Severity::Error, message);
    }

    fn range_from(&self, start: usize) -> SyntaxRange {
        SyntaxRange::new(self.id_at(start), self.id_at(self.pos))
    }

    fn check_cancelled(&mut self) -> bool {
        if !self.halted && self.cancel.is_cancelled() {
            self.halted = true;
        }
        self.halted
    }

    /// Skip to the next synchronisation point: past a `;`, before a `}`, or
    /// to EOF, balancing nested brackets on the way.
    fn recover_to_sync(&mut self) {
        let mut depth = 0u32;
        while !self.at_eof() {
            match self.peek() {
                TokenKind::Semi if depth == 0 => {
                    self.advance();
                    return;
                }
                TokenKind::LBrace | TokenKind::LParen | TokenKind::LBracket => {
                    depth += 1;
                    self.advance();
                }
                TokenKind::RBrace if depth == 0 => return,
                TokenKind::RBrace | TokenKind::RParen | TokenKind::RBracket => {
                    depth = depth.saturating_sub(1);
                    self.advance();
                }
                _ => {
                    self.advance();
                }
            }
        }
    }

    // ---- Translation unit ----------------------------------------------

    pub fn parse_translation_unit(mut self) -> NodeId {
        let start = self.pos;
        let mut decls = Vec::new();
        while !self.at_eof() {
            if self.check_cancelled() {
                let range = self.range_from(self.pos);
                decls.push(self.builder.build_error_decl(range));
                break;
            }
            decls.push(self.parse_external_decl());
        }
        let range = self.range_from(start);
        self.builder.build_translation_unit(range, decls)
    }

    fn parse_external_decl(&mut self) -> NodeId {
        let start = self.pos;

        if self.try_consume(TokenKind::Semi).is_some() {
            let range = self.range_from(start);
            return self.builder.build_empty_decl(range);
        }

        if self.peek() == TokenKind::Keyword(Kw::Precision) {
            return self.parse_precision_decl();
        }

        let quals = self.parse_qualifier_seq();

        // A qualifier sequence alone is a legal declaration, e.g.
        // `layout(early_fragment_tests) in;`.
        if quals.is_some() && self.try_consume(TokenKind::Semi).is_some() {
            let range = self.range_from(start);
            return self.builder.build_empty_decl(range);
        }

        // `quals Name { ... }` declares an interface block.
        if self.peek() == TokenKind::Identifier && self.peek_at(1) == TokenKind::LBrace {
            if let Some(quals) = quals {
                return self.parse_interface_block_decl(start, quals);
            }
        }

        if self.peek() == TokenKind::Keyword(Kw::Struct) {
            return self.parse_struct_backed_decl(start, quals);
        }

        let Some(qual_type) = self.parse_qual_type(quals) else {
            self.report_here("expected a declaration".to_string());
            let before = self.pos;
            self.recover_to_sync();
            if self.pos == before && !self.at_eof() {
                // A stray `}` at file scope; consume it so parsing advances.
                self.advance();
            }
            let range = self.range_from(start);
            return self.builder.build_error_decl(range);
        };

        if self.peek() == TokenKind::Identifier && self.peek_at(1) == TokenKind::LParen {
            return self.parse_function_decl(start, qual_type);
        }

        self.parse_variable_decl_tail(start, qual_type)
    }

    fn parse_precision_decl(&mut self) -> NodeId {
        let start = self.pos;
        self.advance();

        let quals = self.parse_qualifier_seq();
        let decl = match self.parse_qual_type(quals) {
            Some(qual_type) => {
                let range = self.range_from(start);
                self.builder.build_precision_decl(range, qual_type)
            }
            None => {
                self.report_here("expected a type after `precision`".to_string());
                self.recover_to_sync();
                let range = self.range_from(start);
                return self.builder.build_error_decl(range);
            }
        };
        self.expect(TokenKind::Semi, "`;`");
        decl
    }

    /// `struct`-introduced declarations: a bare struct definition, or a
    /// variable declaration whose type is an inline struct.
    fn parse_struct_backed_decl(&mut self, start: usize, quals: Option<NodeId>) -> NodeId {
        let struct_decl = self.parse_struct_definition();

        if self.try_consume(TokenKind::Semi).is_some() {
            return struct_decl;
        }

        let type_start = self.pos;
        let array_spec = self.parse_array_spec();
        let qual_type = self.builder.build_qual_type_struct(
            self.range_from(type_start),
            quals,
            struct_decl,
            array_spec,
        );
        self.parse_variable_decl_tail(start, qual_type)
    }

    fn parse_struct_definition(&mut self) -> NodeId {
        let start = self.pos;
        self.advance();
        let name = self.try_consume(TokenKind::Identifier);

        let mut members = Vec::new();
        if self.expect(TokenKind::LBrace, "`{`").is_some() {
            while !self.at_eof() && self.peek() != TokenKind::RBrace {
                members.push(self.parse_field_decl(FieldKind::Struct));
            }
            self.expect(TokenKind::RBrace, "`}`");
        }

        let range = self.range_from(start);
        self.builder.build_struct_decl(range, name, members)
    }

    fn parse_field_decl(&mut self, field_kind: FieldKind) -> NodeId {
        let start = self.pos;
        let quals = self.parse_qualifier_seq();
        let Some(qual_type) = self.parse_qual_type(quals) else {
            self.report_here("expected a member declaration".to_string());
            self.recover_to_sync();
            let range = self.range_from(start);
            return self.builder.build_error_decl(range);
        };

        let declarators = self.parse_declarator_list();
        self.expect(TokenKind::Semi, "`;`");
        let range = self.range_from(start);
        match field_kind {
            FieldKind::Struct => self.builder.build_struct_field_decl(range, qual_type, declarators),
            FieldKind::Block => self.builder.build_block_field_decl(range, qual_type, declarators),
        }
    }

    fn parse_interface_block_decl(&mut self, start: usize, quals: NodeId) -> NodeId {
        let name = self.advance();
        self.expect(TokenKind::LBrace, "`{`");

        let mut members = Vec::new();
        while !self.at_eof() && self.peek() != TokenKind::RBrace {
            members.push(self.parse_field_decl(FieldKind::Block));
        }
        self.expect(TokenKind::RBrace, "`}`");

        let instance = if self.peek() == TokenKind::Identifier {
            let name = self.advance();
            let array_spec = self.parse_array_spec();
            Some(Declarator { name, array_spec, init: None, resolved: TypeId::default() })
        } else {
            None
        };
        self.expect(TokenKind::Semi, "`;`");

        let range = self.range_from(start);
        self.builder.build_interface_block_decl(range, quals, name, members, instance)
    }

    fn parse_function_decl(&mut self, start: usize, return_type: NodeId) -> NodeId {
        let name = self.advance();
        self.expect(TokenKind::LParen, "`(`");

        let mut params = Vec::new();
        if self.try_consume(TokenKind::RParen).is_none() {
            // `void` alone stands for an empty parameter list.
            if self.peek() == TokenKind::Keyword(Kw::Void) && self.peek_at(1) == TokenKind::RParen {
                self.advance();
                self.advance();
            } else {
                loop {
                    params.push(self.parse_param_decl());
                    if self.try_consume(TokenKind::Comma).is_none() {
                        break;
                    }
                }
                self.expect(TokenKind::RParen, "`)`");
            }
        }

        let return_type_id = match &self.builder.store.node(return_type).kind {
            crate::ast::AstKind::QualType { resolved, .. } => *resolved,
            _ => self.builder.types.error(),
        };

        let body = if self.peek() == TokenKind::LBrace {
            self.builder.enter_function_scope(return_type_id, &params);
            let body = self.parse_compound_stmt();
            self.builder.leave_function_scope();
            Some(body)
        } else {
            self.expect(TokenKind::Semi, "`;`");
            None
        };

        let range = self.range_from(start);
        self.builder.build_function_decl(range, return_type, name, params, body)
    }

    fn parse_param_decl(&mut self) -> NodeId {
        let start = self.pos;
        let quals = self.parse_qualifier_seq();
        let Some(qual_type) = self.parse_qual_type(quals) else {
            self.report_here("expected a parameter type".to_string());
            // Make progress so the parameter loop terminates.
            if !matches!(self.peek(), TokenKind::Comma | TokenKind::RParen | TokenKind::Eof) {
                self.advance();
            }
            let range = self.range_from(start);
            return self.builder.build_error_decl(range);
        };

        let declarator = if self.peek() == TokenKind::Identifier {
            let name = self.advance();
            let array_spec = self.parse_array_spec();
            Some(Declarator { name, array_spec, init: None, resolved: TypeId::default() })
        } else {
            None
        };

        let range = self.range_from(start);
        self.builder.build_param_decl(range, qual_type, declarator)
    }

    fn parse_variable_decl_tail(&mut self, start: usize, qual_type: NodeId) -> NodeId {
        let declarators = self.parse_declarator_list();
        if declarators.is_empty() {
            // A bare type specifier, e.g. `int;`.
            self.expect(TokenKind::Semi, "`;`");
            let range = self.range_from(start);
            return self.builder.build_variable_decl(range, qual_type, declarators);
        }

        self.expect(TokenKind::Semi, "`;`");
        let range = self.range_from(start);
        self.builder.build_variable_decl(range, qual_type, declarators)
    }

    fn parse_declarator_list(&mut self) -> Vec<Declarator> {
        let mut declarators = Vec::new();
        if self.peek() != TokenKind::Identifier {
            return declarators;
        }

        loop {
            let name = self.advance();
            let array_spec = self.parse_array_spec();
            let init = if self.try_consume(TokenKind::Assign).is_some() {
                Some(self.parse_initializer())
            } else {
                None
            };
            declarators.push(Declarator { name, array_spec, init, resolved: TypeId::default() });

            if self.try_consume(TokenKind::Comma).is_none() {
                break;
            }
            if self.peek() != TokenKind::Identifier {
                self.report_here("expected a declarator".to_string());
                break;
            }
        }
        declarators
    }

    fn parse_initializer(&mut self) -> NodeId {
        if self.peek() == TokenKind::LBrace {
            let start = self.pos;
            self.advance();
            let mut items = Vec::new();
            while !self.at_eof() && self.peek() != TokenKind::RBrace {
                items.push(self.parse_initializer());
                if self.try_consume(TokenKind::Comma).is_none() {
                    break;
                }
            }
            self.expect(TokenKind::RBrace, "`}`");
            let range = self.range_from(start);
            return self.builder.build_initializer_list(range, items);
        }
        self.parse_assignment_expr()
    }

    // ---- Types and qualifiers ------------------------------------------

    fn qualifier_keyword(kind: TokenKind) -> Option<Kw> {
        kind.keyword().filter(|kw| kw.is_qualifier())
    }

    /// True when the current token can begin a type specifier.
    fn at_type_start(&self) -> bool {
        match self.peek() {
            TokenKind::Keyword(kw) => kw.is_type_name() || kw == Kw::Struct,
            TokenKind::Identifier => {
                let atom = self.tokens[self.pos].text;
                self.builder.is_struct_name(atom)
            }
            _ => false,
        }
    }

    fn parse_qualifier_seq(&mut self) -> Option<NodeId> {
        let start = self.pos;
        let mut group = QualifierGroup::default();
        let mut layout = Vec::new();
        let mut any = false;

        loop {
            let Some(kw) = Self::qualifier_keyword(self.peek()) else { break };
            any = true;

            if kw == Kw::Layout {
                self.advance();
                self.parse_layout_items(&mut layout);
                continue;
            }

            self.advance();
            match kw {
                Kw::Highp => group.highp = true,
                Kw::Mediump => group.mediump = true,
                Kw::Lowp => group.lowp = true,
                Kw::Const => group.const_ = true,
                Kw::In => group.in_ = true,
                Kw::Out => group.out = true,
                Kw::Inout => group.inout = true,
                Kw::Attribute => group.attribute = true,
                Kw::Uniform => group.uniform = true,
                Kw::Varying => group.varying = true,
                Kw::Buffer => group.buffer = true,
                Kw::Shared => group.shared = true,
                Kw::Centroid => group.centroid = true,
                Kw::Sample => group.sample = true,
                Kw::Patch => group.patch = true,
                Kw::Smooth => group.smooth = true,
                Kw::Flat => group.flat = true,
                Kw::Noperspective => group.noperspective = true,
                Kw::Invariant => group.invariant = true,
                Kw::Precise => group.precise = true,
                Kw::Coherent => group.coherent = true,
                Kw::Volatile => group.volatile = true,
                Kw::Restrict => group.restrict = true,
                Kw::Readonly => group.readonly = true,
                Kw::Writeonly => group.writeonly = true,
                _ => {}
            }
        }

        if !any {
            return None;
        }
        let range = self.range_from(start);
        Some(self.builder.build_type_qualifier_seq(range, group, layout))
    }

    fn parse_layout_items(&mut self, layout: &mut Vec<LayoutItem>) {
        if self.expect(TokenKind::LParen, "`(`").is_none() {
            return;
        }
        if self.try_consume(TokenKind::RParen).is_some() {
            return;
        }

        loop {
            // Layout item names may collide with keywords (e.g. `shared`).
            let name = match self.peek() {
                TokenKind::Identifier | TokenKind::Keyword(_) => self.advance(),
                _ => {
                    self.report_here("expected a layout qualifier name".to_string());
                    break;
                }
            };
            let value = if self.try_consume(TokenKind::Assign).is_some() {
                Some(self.parse_conditional_expr())
            } else {
                None
            };
            layout.push(LayoutItem { name, value });

            if self.try_consume(TokenKind::Comma).is_none() {
                break;
            }
        }
        self.expect(TokenKind::RParen, "`)`");
    }

    /// Parse a type specifier with an optional trailing array specifier.
    /// Returns `None` without consuming anything when the current token
    /// cannot begin a type.
    fn parse_qual_type(&mut self, quals: Option<NodeId>) -> Option<NodeId> {
        let start = quals
            .map(|q| self.builder.store.node(q).range.begin as usize)
            .unwrap_or(self.pos);

        match self.peek() {
            TokenKind::Keyword(kw) if kw == Kw::Struct => {
                let struct_decl = self.parse_struct_definition();
                let array_spec = self.parse_array_spec();
                let range = self.range_from(start);
                Some(self.builder.build_qual_type_struct(range, quals, struct_decl, array_spec))
            }
            TokenKind::Keyword(kw) if kw.is_type_name() => {
                let name = self.advance();
                let array_spec = self.parse_array_spec();
                let range = self.range_from(start);
                Some(self.builder.build_qual_type_named(range, quals, name, array_spec))
            }
            TokenKind::Identifier if self.at_type_start() => {
                let name = self.advance();
                let array_spec = self.parse_array_spec();
                let range = self.range_from(start);
                Some(self.builder.build_qual_type_named(range, quals, name, array_spec))
            }
            _ => None,
        }
    }

    fn parse_array_spec(&mut self) -> Option<NodeId> {
        if self.peek() != TokenKind::LBracket {
            return None;
        }

        let start = self.pos;
        let mut dims = Vec::new();
        while self.try_consume(TokenKind::LBracket).is_some() {
            if self.try_consume(TokenKind::RBracket).is_some() {
                dims.push(None);
                continue;
            }
            let size = self.parse_conditional_expr();
            dims.push(Some(size));
            self.expect(TokenKind::RBracket, "`]`");
        }

        let range = self.range_from(start);
        Some(self.builder.build_array_spec(range, dims))
    }

    // ---- Statements ----------------------------------------------------

    fn parse_compound_stmt(&mut self) -> NodeId {
        let start = self.pos;
        self.expect(TokenKind::LBrace, "`{`");

        self.builder.enter_block_scope();
        let mut stmts = Vec::new();
        while !self.at_eof() && self.peek() != TokenKind::RBrace {
            if self.check_cancelled() {
                let range = self.range_from(self.pos);
                stmts.push(self.builder.build_error_stmt(range));
                break;
            }
            stmts.push(self.parse_statement());
        }
        self.builder.leave_block_scope();

        self.expect(TokenKind::RBrace, "`}`");
        let range = self.range_from(start);
        self.builder.build_compound_stmt(range, stmts)
    }

    pub(crate) fn parse_statement(&mut self) -> NodeId {
        let start = self.pos;
        match self.peek() {
            TokenKind::LBrace => self.parse_compound_stmt(),
            TokenKind::Semi => {
                self.advance();
                let range = self.range_from(start);
                self.builder.build_empty_stmt(range)
            }
            TokenKind::Keyword(Kw::If) => self.parse_if_stmt(),
            TokenKind::Keyword(Kw::For) => self.parse_for_stmt(),
            TokenKind::Keyword(Kw::While) => self.parse_while_stmt(),
            TokenKind::Keyword(Kw::Do) => self.parse_do_while_stmt(),
            TokenKind::Keyword(Kw::Switch) => self.parse_switch_stmt(),
            TokenKind::Keyword(Kw::Case) => {
                self.advance();
                let value = self.parse_conditional_expr();
                self.expect(TokenKind::Colon, "`:`");
                let range = self.range_from(start);
                self.builder.build_case_label_stmt(range, Some(value))
            }
            TokenKind::Keyword(Kw::Default) => {
                self.advance();
                self.expect(TokenKind::Colon, "`:`");
                let range = self.range_from(start);
                self.builder.build_case_label_stmt(range, None)
            }
            TokenKind::Keyword(Kw::Break) => self.parse_jump_stmt(JumpKind::Break),
            TokenKind::Keyword(Kw::Continue) => self.parse_jump_stmt(JumpKind::Continue),
            TokenKind::Keyword(Kw::Discard) => self.parse_jump_stmt(JumpKind::Discard),
            TokenKind::Keyword(Kw::Return) => {
                self.advance();
                let value = if self.peek() == TokenKind::Semi {
                    None
                } else {
                    Some(self.parse_expr())
                };
                self.expect(TokenKind::Semi, "`;`");
                let range = self.range_from(start);
                self.builder.build_return_stmt(range, value)
            }
            TokenKind::Keyword(Kw::Precision) => {
                let decl = self.parse_precision_decl();
                let range = self.range_from(start);
                self.builder.build_decl_stmt(range, decl)
            }
            _ => self.parse_decl_or_expr_stmt(),
        }
    }

    fn parse_jump_stmt(&mut self, kind: JumpKind) -> NodeId {
        let start = self.pos;
        self.advance();
        self.expect(TokenKind::Semi, "`;`");
        let range = self.range_from(start);
        self.builder.build_jump_stmt(range, kind)
    }

    fn starts_declaration(&self) -> bool {
        if Self::qualifier_keyword(self.peek()).is_some() {
            return true;
        }
        match self.peek() {
            TokenKind::Keyword(kw) if kw.is_type_name() || kw == Kw::Struct => {
                // `vec3(...)` at statement start is a constructor call, not
                // a declaration.
                self.peek_at(1) != TokenKind::LParen
            }
            TokenKind::Identifier => {
                self.at_type_start() && self.peek_at(1) == TokenKind::Identifier
            }
            _ => false,
        }
    }

    fn parse_decl_or_expr_stmt(&mut self) -> NodeId {
        let start = self.pos;

        if self.starts_declaration() {
            let quals = self.parse_qualifier_seq();
            if self.peek() == TokenKind::Keyword(Kw::Struct) {
                let decl = self.parse_struct_backed_decl(start, quals);
                let range = self.range_from(start);
                return self.builder.build_decl_stmt(range, decl);
            }
            match self.parse_qual_type(quals) {
                Some(qual_type) => {
                    let decl = self.parse_variable_decl_tail(start, qual_type);
                    let range = self.range_from(start);
                    return self.builder.build_decl_stmt(range, decl);
                }
                None => {
                    self.report_here("expected a type".to_string());
                    self.recover_to_sync();
                    let range = self.range_from(start);
                    return self.builder.build_error_stmt(range);
                }
            }
        }

        let before = self.pos;
        let expr = self.parse_expr();
        if self.pos == before {
            // The expression grammar consumed nothing; resynchronise so the
            // statement loop terminates.
            self.recover_to_sync();
            let range = self.range_from(start);
            return self.builder.build_error_stmt(range);
        }
        self.expect(TokenKind::Semi, "`;`");
        let range = self.range_from(start);
        self.builder.build_expr_stmt(range, expr)
    }

    fn parse_if_stmt(&mut self) -> NodeId {
        let start = self.pos;
        self.advance();
        self.expect(TokenKind::LParen, "`(`");
        let cond = self.parse_expr();
        self.expect(TokenKind::RParen, "`)`");

        let then_branch = self.parse_statement();
        let else_branch = if self.try_consume(TokenKind::Keyword(Kw::Else)).is_some() {
            Some(self.parse_statement())
        } else {
            None
        };

        let range = self.range_from(start);
        self.builder.build_if_stmt(range, cond, then_branch, else_branch)
    }

    fn parse_for_stmt(&mut self) -> NodeId {
        let start = self.pos;
        self.advance();
        self.expect(TokenKind::LParen, "`(`");

        self.builder.enter_block_scope();

        let init = if self.try_consume(TokenKind::Semi).is_some() {
            None
        } else {
            Some(self.parse_decl_or_expr_stmt())
        };

        let cond = if self.peek() == TokenKind::Semi {
            None
        } else {
            Some(self.parse_expr())
        };
        self.expect(TokenKind::Semi, "`;`");

        let iter = if self.peek() == TokenKind::RParen {
            None
        } else {
            Some(self.parse_expr())
        };
        self.expect(TokenKind::RParen, "`)`");

        let body = self.parse_statement();
        self.builder.leave_block_scope();

        let range = self.range_from(start);
        self.builder.build_for_stmt(range, init, cond, iter, body)
    }

    fn parse_while_stmt(&mut self) -> NodeId {
        let start = self.pos;
        self.advance();
        self.expect(TokenKind::LParen, "`(`");
        let cond = self.parse_expr();
        self.expect(TokenKind::RParen, "`)`");
        let body = self.parse_statement();
        let range = self.range_from(start);
        self.builder.build_while_stmt(range, cond, body)
    }

    fn parse_do_while_stmt(&mut self) -> NodeId {
        let start = self.pos;
        self.advance();
        let body = self.parse_statement();
        self.expect(TokenKind::Keyword(Kw::While), "`while`");
        self.expect(TokenKind::LParen, "`(`");
        let cond = self.parse_expr();
        self.expect(TokenKind::RParen, "`)`");
        self.expect(TokenKind::Semi, "`;`");
        let range = self.range_from(start);
        self.builder.build_do_while_stmt(range, body, cond)
    }

    fn parse_switch_stmt(&mut self) -> NodeId {
        let start = self.pos;
        self.advance();
        self.expect(TokenKind::LParen, "`(`");
        let test = self.parse_expr();
        self.expect(TokenKind::RParen, "`)`");
        let body = self.parse_compound_stmt();
        let range = self.range_from(start);
        self.builder.build_switch_stmt(range, test, body)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum FieldKind {
    Struct,
    Block,
}
