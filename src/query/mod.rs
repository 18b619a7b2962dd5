mod hover;
mod inlay;
mod reconstruct;
mod semantic_tokens;
mod symbols;

pub use hover::HoverContent;
pub use inlay::{InlayHint, InlayHintConfig};
pub use semantic_tokens::{SemanticTokenInfo, SemanticTokenModifier, SemanticTokenType};
pub use symbols::{DocumentSymbol, DocumentSymbolKind};

use serde::Serialize;

use crate::artifacts::CompileResult;
use crate::ast::{walk_node, AstKind, AstVisitor, DeclView, NameAccessKind, NodeId, NodeRef};
use crate::builder::decl_view_type_impl;
use crate::ppstore::PPSymbolOccurrence;
use crate::source::{FileTextRange, TextPosition, TextRange, UnitId};
use crate::token::TokenId;
use crate::types::TypeId;

/// What a queried symbol is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SymbolKind {
    HeaderName,
    Macro,
    GlobalVariable,
    LocalVariable,
    Parameter,
    StructMember,
    BlockMember,
    BlockInstance,
    Block,
    Swizzle,
    Function,
    Type,
    Unknown,
}

/// Result of a position query: either a preprocessor entity or an AST
/// symbol.
#[derive(Debug, Clone)]
pub struct SymbolQueryResult {
    pub kind: SymbolKind,
    pub spelled_text: String,
    pub spelled_range: TextRange,
    /// The hit token for AST symbols.
    pub token: Option<TokenId>,
    /// Resolved declaration, when the symbol has one.
    pub decl: Option<DeclView>,
    /// The AST occurrence node for AST symbols.
    pub node: Option<NodeRef>,
    pub is_declaration: bool,
    /// Index into the preprocess store for PP symbols.
    pub pp_occurrence: Option<usize>,
}

/// Read-only query surface over a finished compilation. Every language
/// feature goes through here; nothing mutates the artifacts.
pub struct QueryEngine<'a> {
    result: &'a CompileResult,
}

impl<'a> QueryEngine<'a> {
    pub fn new(result: &'a CompileResult) -> Self {
        Self { result }
    }

    pub fn result(&self) -> &'a CompileResult {
        self.result
    }

    /// The symbol whose range contains `pos` in the main file: a macro or
    /// header name first, otherwise an AST name found by descending the
    /// tree and pruning subtrees that cannot contain the position.
    pub fn symbol_at_position(&self, pos: TextPosition) -> Option<SymbolQueryResult> {
        if let Some((index, occurrence)) = self.pp_occurrence_at(pos) {
            return Some(self.pp_symbol_result(index, occurrence));
        }

        let unit = self.result.user_unit();
        let root = unit.ast.root()?;
        let mut visitor = SymbolAtPositionVisitor { engine: self, pos, hit: None };
        walk_node(&mut visitor, &unit.ast, root);
        visitor.hit
    }

    /// Spelled locations of the declaration of the symbol at `pos`.
    pub fn goto_declaration(&self, pos: TextPosition) -> Vec<FileTextRange> {
        let Some(symbol) = self.symbol_at_position(pos) else {
            return Vec::new();
        };

        if let Some(index) = symbol.pp_occurrence {
            let occurrence = &self.result.pp_store.occurrences()[index];
            if let Some(info) = occurrence.macro_info() {
                if let Some(def) = info.definition.and_then(|i| self.result.pp_store.definition(i)) {
                    return vec![FileTextRange {
                        file: def.name_tok.spelled_file,
                        range: def.name_tok.spelled_range,
                    }];
                }
            }
            return Vec::new();
        }

        let Some(view) = symbol.decl else { return Vec::new() };
        self.decl_name_token(view)
            .and_then(|tok_id| {
                let tok = self.result.token(tok_id)?;
                Some(vec![FileTextRange { file: tok.spelled_file, range: tok.spelled_range }])
            })
            .unwrap_or_default()
    }

    fn pp_occurrence_at(&self, pos: TextPosition) -> Option<(usize, &'a PPSymbolOccurrence)> {
        let occurrence = self.result.pp_store.find_occurrence(pos)?;
        let index = self
            .result
            .pp_store
            .occurrences()
            .iter()
            .position(|o| std::ptr::eq(o, occurrence))?;
        Some((index, occurrence))
    }

    fn pp_symbol_result(&self, index: usize, occurrence: &PPSymbolOccurrence) -> SymbolQueryResult {
        let (kind, text) = match &occurrence.data {
            crate::ppstore::PPSymbolData::HeaderName(info) => (
                SymbolKind::HeaderName,
                self.result.atoms.resolve(info.header_name.text).to_string(),
            ),
            crate::ppstore::PPSymbolData::Macro(info) => (
                SymbolKind::Macro,
                self.result.atoms.resolve(info.macro_name.text).to_string(),
            ),
        };
        SymbolQueryResult {
            kind,
            spelled_text: text,
            spelled_range: occurrence.spelled_range,
            token: None,
            decl: None,
            node: None,
            is_declaration: false,
            pp_occurrence: Some(index),
        }
    }

    // ---- Shared lookup helpers ----------------------------------------

    pub(crate) fn node(&self, nref: NodeRef) -> Option<&'a crate::ast::AstNode> {
        self.result.node(nref)
    }

    pub(crate) fn decl_type(&self, view: DeclView) -> Option<TypeId> {
        decl_view_type_impl(|nref| self.result.node(nref), view)
    }

    /// Name token of the declarator a decl view addresses.
    pub(crate) fn decl_name_token(&self, view: DeclView) -> Option<TokenId> {
        let node = self.node(view.decl)?;
        match &node.kind {
            AstKind::VariableDecl { declarators, .. }
            | AstKind::StructFieldDecl { declarators, .. }
            | AstKind::BlockFieldDecl { declarators, .. } => {
                declarators.get(view.index as usize).map(|d| d.name)
            }
            AstKind::ParamDecl { declarator, .. } => declarator.as_ref().map(|d| d.name),
            AstKind::StructDecl { name, .. } => *name,
            AstKind::InterfaceBlockDecl { name, instance, .. } => {
                Some(instance.as_ref().map(|d| d.name).unwrap_or(*name))
            }
            AstKind::FunctionDecl { name, .. } => Some(*name),
            _ => None,
        }
    }

    /// Classify what a resolved declaration is, from the query layer's
    /// perspective.
    pub(crate) fn classify_decl(&self, view: DeclView) -> SymbolKind {
        let Some(node) = self.node(view.decl) else { return SymbolKind::Unknown };
        match &node.kind {
            AstKind::VariableDecl { .. } => {
                if self.is_top_level_decl(view.decl) {
                    SymbolKind::GlobalVariable
                } else {
                    SymbolKind::LocalVariable
                }
            }
            AstKind::StructFieldDecl { .. } => SymbolKind::StructMember,
            AstKind::BlockFieldDecl { .. } => SymbolKind::BlockMember,
            AstKind::ParamDecl { .. } => SymbolKind::Parameter,
            AstKind::StructDecl { .. } => SymbolKind::Type,
            AstKind::InterfaceBlockDecl { .. } => SymbolKind::BlockInstance,
            AstKind::FunctionDecl { .. } => SymbolKind::Function,
            _ => SymbolKind::Unknown,
        }
    }

    fn is_top_level_decl(&self, nref: NodeRef) -> bool {
        let Some(unit) = self.result.unit(nref.unit) else { return false };
        let Some(root) = unit.ast.root() else { return false };
        match &unit.ast.node(root).kind {
            AstKind::TranslationUnit { decls } => decls.contains(&nref.node),
            _ => false,
        }
    }

    /// Expanded range of a node in the user unit.
    pub(crate) fn node_expanded_range(&self, node: NodeId) -> TextRange {
        let unit = self.result.user_unit();
        self.result.expanded_range(unit.ast.node(node).range)
    }

    pub(crate) fn token_expanded_range(&self, id: TokenId) -> TextRange {
        self.result
            .token(id)
            .map(|t| t.expanded_range)
            .unwrap_or_default()
    }
}

struct SymbolAtPositionVisitor<'e, 'a> {
    engine: &'e QueryEngine<'a>,
    pos: TextPosition,
    hit: Option<SymbolQueryResult>,
}

impl SymbolAtPositionVisitor<'_, '_> {
    fn token_hit(&self, id: TokenId) -> bool {
        let range = self.engine.token_expanded_range(id);
        !range.is_empty() && range.contains_extended(self.pos)
    }

    fn make_result(
        &self,
        kind: SymbolKind,
        token: TokenId,
        decl: Option<DeclView>,
        node: NodeId,
        is_declaration: bool,
    ) -> SymbolQueryResult {
        let engine = self.engine;
        let spelled_range = engine
            .result()
            .spelled_range_in_main_file(token)
            .unwrap_or_else(|| engine.token_expanded_range(token));
        SymbolQueryResult {
            kind,
            spelled_text: engine.result().token_text(token).to_string(),
            spelled_range,
            token: Some(token),
            decl,
            node: Some(NodeRef::new(UnitId::UserFile, node)),
            is_declaration,
            pp_occurrence: None,
        }
    }
}

impl AstVisitor for SymbolAtPositionVisitor<'_, '_> {
    fn enter_node(&mut self, store: &crate::ast::AstStore, id: NodeId) -> bool {
        if self.hit.is_some() {
            return false;
        }

        let range = self.engine.result.expanded_range(store.node(id).range);
        if !range.contains_extended(self.pos) {
            return false;
        }

        match &store.node(id).kind {
            AstKind::QualType { name: Some(name), resolved_struct, .. } => {
                if self.token_hit(*name) {
                    let decl = resolved_struct.map(DeclView::new);
                    self.hit = Some(self.make_result(SymbolKind::Type, *name, decl, id, false));
                }
            }
            AstKind::NameAccessExpr { name, access, resolved, .. } => {
                if self.token_hit(*name) {
                    let kind = match access {
                        NameAccessKind::Swizzle => SymbolKind::Swizzle,
                        NameAccessKind::Function => SymbolKind::Function,
                        NameAccessKind::Constructor => SymbolKind::Type,
                        NameAccessKind::Unknown => SymbolKind::Unknown,
                        NameAccessKind::Variable => resolved
                            .map(|view| self.engine.classify_decl(view))
                            .unwrap_or(SymbolKind::Unknown),
                    };
                    self.hit = Some(self.make_result(kind, *name, *resolved, id, false));
                }
            }
            AstKind::FunctionCallExpr { name, resolved_function, .. } => {
                if self.token_hit(*name) {
                    let decl = resolved_function.map(DeclView::new);
                    self.hit = Some(self.make_result(SymbolKind::Function, *name, decl, id, false));
                }
            }
            AstKind::VariableDecl { declarators, .. }
            | AstKind::StructFieldDecl { declarators, .. }
            | AstKind::BlockFieldDecl { declarators, .. } => {
                let member_kind = match &store.node(id).kind {
                    AstKind::StructFieldDecl { .. } => SymbolKind::StructMember,
                    AstKind::BlockFieldDecl { .. } => SymbolKind::BlockMember,
                    _ => SymbolKind::Unknown,
                };
                for (index, declarator) in declarators.iter().enumerate() {
                    if self.token_hit(declarator.name) {
                        let view =
                            DeclView::with_index(NodeRef::new(UnitId::UserFile, id), index as u32);
                        let kind = if member_kind == SymbolKind::Unknown {
                            self.engine.classify_decl(view)
                        } else {
                            member_kind
                        };
                        self.hit = Some(self.make_result(kind, declarator.name, Some(view), id, true));
                        break;
                    }
                }
            }
            AstKind::StructDecl { name: Some(name), .. } => {
                if self.token_hit(*name) {
                    let view = DeclView::new(NodeRef::new(UnitId::UserFile, id));
                    self.hit = Some(self.make_result(SymbolKind::Type, *name, Some(view), id, true));
                }
            }
            AstKind::InterfaceBlockDecl { name, instance, .. } => {
                let view = DeclView::new(NodeRef::new(UnitId::UserFile, id));
                if self.token_hit(*name) {
                    self.hit = Some(self.make_result(SymbolKind::Block, *name, Some(view), id, true));
                } else if let Some(instance) = instance {
                    if self.token_hit(instance.name) {
                        self.hit = Some(self.make_result(
                            SymbolKind::BlockInstance,
                            instance.name,
                            Some(view),
                            id,
                            true,
                        ));
                    }
                }
            }
            AstKind::ParamDecl { declarator: Some(declarator), .. } => {
                if self.token_hit(declarator.name) {
                    let view = DeclView::new(NodeRef::new(UnitId::UserFile, id));
                    self.hit = Some(self.make_result(
                        SymbolKind::Parameter,
                        declarator.name,
                        Some(view),
                        id,
                        true,
                    ));
                }
            }
            AstKind::FunctionDecl { name, .. } => {
                if self.token_hit(*name) {
                    let view = DeclView::new(NodeRef::new(UnitId::UserFile, id));
                    self.hit =
                        Some(self.make_result(SymbolKind::Function, *name, Some(view), id, true));
                }
            }
            _ => {}
        }

        self.hit.is_none()
    }
}
