use serde::Serialize;

use super::QueryEngine;
use crate::ast::{walk_node, AstKind, AstStore, AstVisitor, NodeId};
use crate::token::{TokenId, TokenKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SemanticTokenType {
    Type,
    Struct,
    Parameter,
    Variable,
    Function,
    Keyword,
    Number,
    Macro,
    String,
}

impl SemanticTokenType {
    /// Index in the legend the server advertises.
    pub fn index(self) -> u32 {
        match self {
            SemanticTokenType::Type => 0,
            SemanticTokenType::Struct => 1,
            SemanticTokenType::Parameter => 2,
            SemanticTokenType::Variable => 3,
            SemanticTokenType::Function => 4,
            SemanticTokenType::Keyword => 5,
            SemanticTokenType::Number => 6,
            SemanticTokenType::Macro => 7,
            SemanticTokenType::String => 8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SemanticTokenModifier(u32);

impl SemanticTokenModifier {
    pub const NONE: Self = Self(0);
    pub const DECLARATION: Self = Self(1 << 0);
    pub const READONLY: Self = Self(1 << 1);

    pub fn mask(self) -> u32 {
        self.0
    }

    #[must_use]
    pub fn with(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

/// One coloured token, in main-file spelled coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SemanticTokenInfo {
    pub line: u32,
    pub character: u32,
    pub length: u32,
    pub token_type: SemanticTokenType,
    pub modifier: SemanticTokenModifier,
}

impl QueryEngine<'_> {
    /// Semantic tokens of the main file, merged from the token stream
    /// (keywords, numbers), the preprocess store (header names, macro
    /// sites), and the AST (names and declarations), sorted by position.
    pub fn semantic_tokens(&self) -> Vec<SemanticTokenInfo> {
        let mut out = Vec::new();
        self.collect_lex_tokens(&mut out);
        self.collect_pp_tokens(&mut out);
        self.collect_ast_tokens(&mut out);

        out.sort_by_key(|info| (info.line, info.character));
        out
    }

    /// The LSP wire form: each token as `(Δline, Δchar, len, type,
    /// modifier)` relative to its predecessor.
    pub fn semantic_tokens_encoded(&self) -> Vec<u32> {
        encode_semantic_tokens(&self.semantic_tokens())
    }

    fn collect_lex_tokens(&self, out: &mut Vec<SemanticTokenInfo>) {
        let unit = self.result().user_unit();
        for (index, tok) in unit.tokens.iter().enumerate() {
            let token_type = match tok.kind {
                TokenKind::Keyword(kw) => {
                    if kw.is_type_name() {
                        // Type keywords are coloured from the AST pass.
                        continue;
                    }
                    SemanticTokenType::Keyword
                }
                TokenKind::IntConst | TokenKind::FloatConst => SemanticTokenType::Number,
                _ => continue,
            };
            let id = TokenId::new(unit.unit, index as u32);
            self.push_token(out, id, token_type, SemanticTokenModifier::NONE);
        }
    }

    fn collect_pp_tokens(&self, out: &mut Vec<SemanticTokenInfo>) {
        let store = &self.result().pp_store;
        for occurrence in store.header_names() {
            push_spelled_range(out, occurrence.spelled_range, SemanticTokenType::String, SemanticTokenModifier::NONE);
        }
        for occurrence in store.macro_uses() {
            push_spelled_range(out, occurrence.spelled_range, SemanticTokenType::Macro, SemanticTokenModifier::NONE);
        }
    }

    fn collect_ast_tokens(&self, out: &mut Vec<SemanticTokenInfo>) {
        let unit = self.result().user_unit();
        let Some(root) = unit.ast.root() else { return };
        let mut visitor = AstTokenCollector { engine: self, out };
        walk_node(&mut visitor, &unit.ast, root);
    }

    fn push_token(
        &self,
        out: &mut Vec<SemanticTokenInfo>,
        id: TokenId,
        token_type: SemanticTokenType,
        modifier: SemanticTokenModifier,
    ) {
        // Only main-file spellings are coloured; expansion and include
        // products have no spelled text here.
        let Some(range) = self.result().spelled_range_in_main_file(id) else { return };
        push_spelled_range(out, range, token_type, modifier);
    }
}

fn push_spelled_range(
    out: &mut Vec<SemanticTokenInfo>,
    range: crate::source::TextRange,
    token_type: SemanticTokenType,
    modifier: SemanticTokenModifier,
) {
    if range.is_empty() || range.start.line != range.end.line {
        return;
    }
    out.push(SemanticTokenInfo {
        line: range.start.line,
        character: range.start.character,
        length: range.end.character - range.start.character,
        token_type,
        modifier,
    });
}

pub fn encode_semantic_tokens(tokens: &[SemanticTokenInfo]) -> Vec<u32> {
    let mut data = Vec::with_capacity(tokens.len() * 5);
    let mut last_line = 0u32;
    let mut last_char = 0u32;

    for (i, info) in tokens.iter().enumerate() {
        if i == 0 {
            data.push(info.line);
            data.push(info.character);
        } else if info.line == last_line {
            data.push(0);
            data.push(info.character - last_char);
        } else {
            data.push(info.line - last_line);
            data.push(info.character);
        }
        data.push(info.length);
        data.push(info.token_type.index());
        data.push(info.modifier.mask());

        last_line = info.line;
        last_char = info.character;
    }

    data
}

struct AstTokenCollector<'e, 'a, 'o> {
    engine: &'e QueryEngine<'a>,
    out: &'o mut Vec<SemanticTokenInfo>,
}

impl AstTokenCollector<'_, '_, '_> {
    fn add(&mut self, id: TokenId, token_type: SemanticTokenType, modifier: SemanticTokenModifier) {
        self.engine.push_token(self.out, id, token_type, modifier);
    }

    fn declaration_modifier(&self, store: &AstStore, qual_type: NodeId) -> SemanticTokenModifier {
        let mut modifier = SemanticTokenModifier::DECLARATION;
        if let AstKind::QualType { quals: Some(quals), .. } = &store.node(qual_type).kind {
            if let AstKind::TypeQualifierSeq { quals, .. } = &store.node(*quals).kind {
                if quals.const_ {
                    modifier = modifier.with(SemanticTokenModifier::READONLY);
                }
            }
        }
        modifier
    }
}

impl AstVisitor for AstTokenCollector<'_, '_, '_> {
    fn enter_node(&mut self, store: &AstStore, id: NodeId) -> bool {
        match &store.node(id).kind {
            AstKind::QualType { name: Some(name), .. } => {
                self.add(*name, SemanticTokenType::Type, SemanticTokenModifier::NONE);
            }
            AstKind::NameAccessExpr { name, resolved, access, .. } => {
                use crate::ast::NameAccessKind;
                let token_type = match access {
                    NameAccessKind::Constructor => SemanticTokenType::Type,
                    _ => match resolved.map(|view| self.engine.classify_decl(view)) {
                        Some(super::SymbolKind::Parameter) => SemanticTokenType::Parameter,
                        _ => SemanticTokenType::Variable,
                    },
                };
                self.add(*name, token_type, SemanticTokenModifier::NONE);
            }
            AstKind::FunctionCallExpr { name, .. } => {
                self.add(*name, SemanticTokenType::Function, SemanticTokenModifier::NONE);
            }
            AstKind::VariableDecl { qual_type, declarators }
            | AstKind::StructFieldDecl { qual_type, declarators }
            | AstKind::BlockFieldDecl { qual_type, declarators } => {
                let modifier = self.declaration_modifier(store, *qual_type);
                for declarator in declarators {
                    self.add(declarator.name, SemanticTokenType::Variable, modifier);
                }
            }
            AstKind::StructDecl { name: Some(name), .. } => {
                self.add(*name, SemanticTokenType::Struct, SemanticTokenModifier::DECLARATION);
            }
            AstKind::InterfaceBlockDecl { name, instance, .. } => {
                self.add(*name, SemanticTokenType::Type, SemanticTokenModifier::DECLARATION);
                if let Some(instance) = instance {
                    self.add(instance.name, SemanticTokenType::Variable, SemanticTokenModifier::DECLARATION);
                }
            }
            AstKind::ParamDecl { qual_type, declarator: Some(declarator), .. } => {
                let modifier = self.declaration_modifier(store, *qual_type);
                self.add(declarator.name, SemanticTokenType::Parameter, modifier);
            }
            AstKind::FunctionDecl { name, .. } => {
                self.add(*name, SemanticTokenType::Function, SemanticTokenModifier::DECLARATION);
            }
            _ => {}
        }
        true
    }
}
