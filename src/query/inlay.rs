use serde::Serialize;

use super::QueryEngine;
use crate::ast::{walk_node, AstKind, AstStore, AstVisitor, NodeId, NodeRef};
use crate::source::{TextPosition, TextRange};

#[derive(Debug, Clone, Serialize)]
pub struct InlayHintConfig {
    pub argument_name_hints: bool,
    pub implicit_cast_hints: bool,
    pub block_end_hints: bool,
    /// Function bodies spanning at least this many lines get an end hint.
    pub block_end_line_threshold: u32,
}

impl Default for InlayHintConfig {
    fn default() -> Self {
        Self {
            argument_name_hints: true,
            implicit_cast_hints: true,
            block_end_hints: true,
            block_end_line_threshold: 8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InlayHint {
    pub position: TextPosition,
    pub label: String,
    pub padding_left: bool,
    pub padding_right: bool,
}

impl QueryEngine<'_> {
    /// Inlay hints of the main file inside `display_range`: parameter
    /// names at call arguments (`&`-prefixed for outputs), implicit cast
    /// targets, and function names after long bodies.
    pub fn inlay_hints(&self, config: &InlayHintConfig, display_range: TextRange) -> Vec<InlayHint> {
        let unit = self.result().user_unit();
        let Some(root) = unit.ast.root() else { return Vec::new() };

        let mut visitor = InlayHintVisitor { engine: self, config, display_range, out: Vec::new() };
        walk_node(&mut visitor, &unit.ast, root);
        visitor.out
    }
}

struct InlayHintVisitor<'e, 'a, 'c> {
    engine: &'e QueryEngine<'a>,
    config: &'c InlayHintConfig,
    display_range: TextRange,
    out: Vec<InlayHint>,
}

impl InlayHintVisitor<'_, '_, '_> {
    fn try_add(&mut self, position: TextPosition, label: String, padding_left: bool, padding_right: bool) {
        if self.display_range.contains(position) {
            self.out.push(InlayHint { position, label, padding_left, padding_right });
        }
    }

    fn visit_implicit_cast(&mut self, store: &AstStore, id: NodeId) {
        let AstKind::ImplicitCastExpr { payload, .. } = &store.node(id).kind else { return };
        let node = store.node(id);
        if node.range.token_count() > 1 {
            // Multi-token operands get noisy; only single tokens are
            // annotated.
            return;
        }
        if self.engine.result().types.is_error(payload.ty) {
            return;
        }

        let range = self.engine.node_expanded_range(id);
        if range.is_empty() {
            return;
        }
        let label = format!("({})", self.engine.result().types.name(payload.ty));
        self.try_add(range.start, label, false, false);
    }

    fn visit_call(&mut self, store: &AstStore, id: NodeId) {
        let AstKind::FunctionCallExpr { args, resolved_function: Some(resolved), .. } = &store.node(id).kind
        else {
            return;
        };
        let Some(decl) = self.engine.node(*resolved) else { return };
        let AstKind::FunctionDecl { params, .. } = &decl.kind else { return };

        for (&arg, &param) in args.iter().zip(params) {
            let param_node = self
                .engine
                .node(NodeRef::new(resolved.unit, param))
                .expect("params live beside their function");
            let AstKind::ParamDecl { declarator, direction, .. } = &param_node.kind else {
                continue;
            };

            let arg_range = self.engine.node_expanded_range(arg);
            if arg_range.is_empty() {
                continue;
            }

            let output_mark = if direction.is_output() { "&" } else { "" };
            let param_name = declarator
                .as_ref()
                .map(|d| self.engine.result().token_text(d.name))
                .unwrap_or("");
            if output_mark.is_empty() && param_name.is_empty() {
                continue;
            }

            self.try_add(arg_range.start, format!("{output_mark}{param_name}:"), false, true);
        }
    }

    fn visit_function_decl(&mut self, store: &AstStore, id: NodeId) {
        let AstKind::FunctionDecl { name, body: Some(_), .. } = &store.node(id).kind else { return };

        let decl_range = self.engine.node_expanded_range(id);
        if decl_range.num_lines() < self.config.block_end_line_threshold {
            return;
        }

        let name = self.engine.result().token_text(*name);
        if name.is_empty() {
            return;
        }
        self.try_add(decl_range.end, format!("// {name}"), true, false);
    }
}

impl AstVisitor for InlayHintVisitor<'_, '_, '_> {
    fn enter_node(&mut self, store: &AstStore, id: NodeId) -> bool {
        match &store.node(id).kind {
            AstKind::ImplicitCastExpr { .. } => {
                if self.config.implicit_cast_hints {
                    self.visit_implicit_cast(store, id);
                }
            }
            AstKind::FunctionCallExpr { .. } => {
                if self.config.argument_name_hints {
                    self.visit_call(store, id);
                }
            }
            AstKind::FunctionDecl { .. } => {
                if self.config.block_end_hints {
                    self.visit_function_decl(store, id);
                }
            }
            _ => {}
        }
        true
    }
}
