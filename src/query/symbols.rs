use serde::Serialize;

use super::{QueryEngine, SymbolKind};
use crate::ast::{walk_node, AstKind, AstStore, AstVisitor, DeclView, NodeId, NodeRef};
use crate::source::{TextRange, UnitId};
use crate::token::TokenId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DocumentSymbolKind {
    Function,
    Variable,
    Struct,
    Field,
    Block,
    Macro,
}

/// One outline entry of the main file.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentSymbol {
    pub name: String,
    pub kind: DocumentSymbolKind,
    /// Range of the whole declaration.
    pub range: TextRange,
    /// Range of just the name.
    pub selection_range: TextRange,
    pub children: Vec<DocumentSymbol>,
}

impl<'a> QueryEngine<'a> {
    /// Top-level declarations of the main file plus its `#define`s, for the
    /// editor outline.
    pub fn document_symbols(&self) -> Vec<DocumentSymbol> {
        let mut out = Vec::new();

        for (occurrence, def) in self.result().pp_store.definition_sites() {
            out.push(DocumentSymbol {
                name: self.result().atoms.resolve(def.name_tok.text).to_string(),
                kind: DocumentSymbolKind::Macro,
                range: occurrence.spelled_range,
                selection_range: occurrence.spelled_range,
                children: Vec::new(),
            });
        }

        let unit = self.result().user_unit();
        let Some(root) = unit.ast.root() else { return out };
        let AstKind::TranslationUnit { decls } = &unit.ast.node(root).kind else {
            return out;
        };

        for &decl in decls {
            self.collect_document_symbol(&unit.ast, decl, &mut out);
        }

        out.sort_by_key(|symbol| (symbol.range.start, symbol.range.end));
        out
    }

    fn collect_document_symbol(&self, ast: &AstStore, decl: NodeId, out: &mut Vec<DocumentSymbol>) {
        match &ast.node(decl).kind {
            AstKind::FunctionDecl { name, .. } => {
                if let Some(symbol) = self.document_symbol_for(ast, decl, *name, DocumentSymbolKind::Function) {
                    out.push(symbol);
                }
            }
            AstKind::VariableDecl { declarators, .. } => {
                for declarator in declarators {
                    if let Some(symbol) =
                        self.document_symbol_for(ast, decl, declarator.name, DocumentSymbolKind::Variable)
                    {
                        out.push(symbol);
                    }
                }
                // An inline struct definition surfaces as its own entry.
                if let AstKind::VariableDecl { qual_type, .. } = &ast.node(decl).kind {
                    if let AstKind::QualType { struct_decl: Some(struct_decl), .. } = &ast.node(*qual_type).kind {
                        self.collect_document_symbol(ast, *struct_decl, out);
                    }
                }
            }
            AstKind::StructDecl { name: Some(name), members, .. } => {
                if let Some(mut symbol) = self.document_symbol_for(ast, decl, *name, DocumentSymbolKind::Struct) {
                    symbol.children = self.member_symbols(ast, members);
                    out.push(symbol);
                }
            }
            AstKind::InterfaceBlockDecl { name, members, instance, .. } => {
                if let Some(mut symbol) = self.document_symbol_for(ast, decl, *name, DocumentSymbolKind::Block) {
                    symbol.children = self.member_symbols(ast, members);
                    out.push(symbol);
                }
                if let Some(instance) = instance {
                    if let Some(symbol) =
                        self.document_symbol_for(ast, decl, instance.name, DocumentSymbolKind::Variable)
                    {
                        out.push(symbol);
                    }
                }
            }
            _ => {}
        }
    }

    fn member_symbols(&self, ast: &AstStore, members: &[NodeId]) -> Vec<DocumentSymbol> {
        let mut out = Vec::new();
        for &member in members {
            for declarator in ast.node(member).declarators() {
                if let Some(symbol) =
                    self.document_symbol_for(ast, member, declarator.name, DocumentSymbolKind::Field)
                {
                    out.push(symbol);
                }
            }
        }
        out
    }

    fn document_symbol_for(
        &self,
        ast: &AstStore,
        decl: NodeId,
        name: TokenId,
        kind: DocumentSymbolKind,
    ) -> Option<DocumentSymbol> {
        // Only symbols spelled in the main file make the outline.
        let selection_range = self.result().spelled_range_in_main_file(name)?;
        let name = self.result().token_text(name).to_string();
        if name.is_empty() {
            return None;
        }

        let decl_range = self.result().expanded_range(ast.node(decl).range);
        Some(DocumentSymbol {
            name,
            kind,
            range: decl_range,
            selection_range,
            children: Vec::new(),
        })
    }

    /// Every token of the main file that resolves to the same declaration
    /// as the symbol at `pos`.
    pub fn references(&self, pos: crate::source::TextPosition, include_declaration: bool) -> Vec<TextRange> {
        let Some(symbol) = self.symbol_at_position(pos) else { return Vec::new() };
        let Some(target) = symbol.decl else { return Vec::new() };
        if symbol.kind == SymbolKind::Macro || symbol.kind == SymbolKind::HeaderName {
            return Vec::new();
        }

        let unit = self.result().user_unit();
        let Some(root) = unit.ast.root() else { return Vec::new() };

        let mut visitor = ReferenceVisitor {
            engine: self,
            target,
            include_declaration,
            out: Vec::new(),
        };
        walk_node(&mut visitor, &unit.ast, root);
        visitor.out.sort_by_key(|range| (range.start, range.end));
        visitor.out.dedup();
        visitor.out
    }
}

struct ReferenceVisitor<'e, 'a> {
    engine: &'e QueryEngine<'a>,
    target: DeclView,
    include_declaration: bool,
    out: Vec<TextRange>,
}

impl ReferenceVisitor<'_, '_> {
    fn add_token(&mut self, token: TokenId) {
        if let Some(range) = self.engine.result().spelled_range_in_main_file(token) {
            if !range.is_empty() {
                self.out.push(range);
            }
        }
    }

    fn same_decl(&self, view: DeclView) -> bool {
        view == self.target
    }
}

impl AstVisitor for ReferenceVisitor<'_, '_> {
    fn enter_node(&mut self, store: &AstStore, id: NodeId) -> bool {
        match &store.node(id).kind {
            AstKind::QualType { name: Some(name), resolved_struct: Some(resolved), .. } => {
                if self.same_decl(DeclView::new(*resolved)) {
                    self.add_token(*name);
                }
            }
            AstKind::NameAccessExpr { name, resolved: Some(view), .. } => {
                if self.same_decl(*view) {
                    self.add_token(*name);
                }
            }
            AstKind::FunctionCallExpr { name, resolved_function: Some(resolved), .. } => {
                if self.same_decl(DeclView::new(*resolved)) {
                    self.add_token(*name);
                }
            }
            AstKind::VariableDecl { declarators, .. }
            | AstKind::StructFieldDecl { declarators, .. }
            | AstKind::BlockFieldDecl { declarators, .. } => {
                if self.include_declaration && self.target.decl == NodeRef::new(UnitId::UserFile, id) {
                    if let Some(declarator) = declarators.get(self.target.index as usize) {
                        self.add_token(declarator.name);
                    }
                }
            }
            AstKind::StructDecl { name, .. } => {
                if self.include_declaration
                    && self.target.decl == NodeRef::new(UnitId::UserFile, id)
                {
                    if let Some(name) = name {
                        self.add_token(*name);
                    }
                }
            }
            AstKind::InterfaceBlockDecl { instance, .. } => {
                if self.include_declaration
                    && self.target.decl == NodeRef::new(UnitId::UserFile, id)
                {
                    if let Some(instance) = instance {
                        self.add_token(instance.name);
                    }
                }
            }
            AstKind::ParamDecl { declarator: Some(declarator), .. } => {
                if self.include_declaration
                    && self.target.decl == NodeRef::new(UnitId::UserFile, id)
                {
                    self.add_token(declarator.name);
                }
            }
            AstKind::FunctionDecl { name, .. } => {
                if self.include_declaration
                    && self.target.decl == NodeRef::new(UnitId::UserFile, id)
                {
                    self.add_token(*name);
                }
            }
            _ => {}
        }
        true
    }
}
