use serde::Serialize;

use super::reconstruct::SourceReconstruction;
use super::{QueryEngine, SymbolKind, SymbolQueryResult};
use crate::ast::AstKind;
use crate::source::{TextPosition, TextRange};

/// Structured hover answer; the server layer turns it into markdown or
/// plain text as the client prefers.
#[derive(Debug, Clone, Serialize)]
pub struct HoverContent {
    pub kind: SymbolKind,
    pub name: String,
    /// Deduced or declared type, rendered.
    pub symbol_type: Option<String>,
    /// Folded constant value, for const variables and constant expressions.
    pub value: Option<String>,
    /// Reconstructed declaration source.
    pub code: Option<String>,
    pub range: TextRange,
    /// True for symbols without a known declaration.
    pub unknown: bool,
}

impl QueryEngine<'_> {
    pub fn hover(&self, pos: TextPosition) -> Option<HoverContent> {
        let symbol = self.symbol_at_position(pos)?;

        if let Some(index) = symbol.pp_occurrence {
            return self.hover_for_pp_symbol(&symbol, index);
        }
        self.hover_for_ast_symbol(&symbol)
    }

    fn hover_for_pp_symbol(&self, symbol: &SymbolQueryResult, index: usize) -> Option<HoverContent> {
        let occurrence = &self.result().pp_store.occurrences()[index];

        if let Some(header) = occurrence.header_name() {
            return Some(HoverContent {
                kind: SymbolKind::HeaderName,
                name: symbol.spelled_text.clone(),
                symbol_type: None,
                value: None,
                code: header
                    .resolved_path
                    .as_ref()
                    .map(|path| format!("// {}", path.display())),
                range: symbol.spelled_range,
                unknown: header.resolved_path.is_none(),
            });
        }

        let info = occurrence.macro_info()?;
        let Some(def) = info.definition.and_then(|i| self.result().pp_store.definition(i)) else {
            return Some(HoverContent {
                kind: SymbolKind::Macro,
                name: symbol.spelled_text.clone(),
                symbol_type: None,
                value: None,
                code: None,
                range: symbol.spelled_range,
                unknown: true,
            });
        };

        // Rebuild the `#define` line from the recorded tokens.
        let atoms = &self.result().atoms;
        let mut code = format!("#define {}", atoms.resolve(def.name_tok.text));
        if def.function_like {
            code.push('(');
            for (i, param) in def.params.iter().enumerate() {
                if i > 0 {
                    code.push_str(", ");
                }
                code.push_str(atoms.resolve(param.text));
            }
            code.push(')');
        }
        for tok in &def.body {
            code.push(' ');
            code.push_str(atoms.resolve(tok.text));
        }

        Some(HoverContent {
            kind: SymbolKind::Macro,
            name: symbol.spelled_text.clone(),
            symbol_type: None,
            value: None,
            code: Some(code),
            range: symbol.spelled_range,
            unknown: false,
        })
    }

    fn hover_for_ast_symbol(&self, symbol: &SymbolQueryResult) -> Option<HoverContent> {
        let mut symbol_type = None;
        let mut value = None;

        // The occurrence expression carries the deduced type and any folded
        // value; a declaration site reads them off the declarator.
        if let Some(node_ref) = symbol.node {
            if let Some(payload) = self.node(node_ref).and_then(|n| n.expr_payload()) {
                symbol_type = Some(self.result().types.name(payload.ty).to_string());
                if !payload.value.is_error() {
                    value = Some(payload.value.to_display_string());
                }
            }
        }

        if let Some(view) = symbol.decl {
            if symbol_type.is_none() {
                if let Some(ty) = self.decl_type(view) {
                    symbol_type = Some(self.result().types.name(ty).to_string());
                }
            }

            if value.is_none() && symbol.is_declaration {
                if let Some(node) = self.node(view.decl) {
                    if let AstKind::VariableDecl { declarators, .. } = &node.kind {
                        if let Some(init) = declarators.get(view.index as usize).and_then(|d| d.init) {
                            let init_ref = crate::ast::NodeRef::new(view.decl.unit, init);
                            if let Some(payload) = self.node(init_ref).and_then(|n| n.expr_payload()) {
                                if !payload.value.is_error() {
                                    value = Some(payload.value.to_display_string());
                                }
                            }
                        }
                    }
                }
            }
        }

        let code = symbol.decl.map(|view| {
            let mut builder = SourceReconstruction::new(self, view.decl.unit);
            builder.append_decl(view.decl.node, view.index);
            builder.finish()
        });

        Some(HoverContent {
            kind: symbol.kind,
            name: symbol.spelled_text.clone(),
            symbol_type,
            value,
            code: code.filter(|c| !c.is_empty()),
            range: symbol.spelled_range,
            unknown: symbol.decl.is_none() && symbol.kind != SymbolKind::Swizzle,
        })
    }
}

impl HoverContent {
    /// Plain markdown rendering, for servers that do not format themselves.
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        let kind = match self.kind {
            SymbolKind::HeaderName => "Header",
            SymbolKind::Macro => "Macro",
            SymbolKind::GlobalVariable => "Global Variable",
            SymbolKind::LocalVariable => "Local Variable",
            SymbolKind::Parameter => "Parameter",
            SymbolKind::StructMember => "Struct Member",
            SymbolKind::BlockMember => "Block Member",
            SymbolKind::BlockInstance => "Block Instance",
            SymbolKind::Block => "Interface Block",
            SymbolKind::Swizzle => "Swizzle",
            SymbolKind::Function => "Function",
            SymbolKind::Type => "Type",
            SymbolKind::Unknown => "Symbol",
        };

        out.push_str("### ");
        if self.unknown {
            out.push_str("Unknown ");
        }
        out.push_str(kind);
        out.push_str(" `");
        out.push_str(&self.name);
        out.push_str("`\n");

        if let Some(ty) = &self.symbol_type {
            out.push_str(&format!("\nType: `{ty}`\n"));
        }
        if let Some(value) = &self.value {
            out.push_str(&format!("\nValue: `{value}`\n"));
        }
        if let Some(code) = &self.code {
            out.push_str("\n---\n```glsl\n");
            out.push_str(code);
            out.push_str("\n```\n");
        }
        out
    }
}
