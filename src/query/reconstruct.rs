use super::QueryEngine;
use crate::ast::{AstKind, Declarator, NodeId, NodeRef};

/// Rebuilds a readable declaration from the AST for hover text. The output
/// is regenerated source, not the original spelling: macros are expanded
/// and initializers render as their folded value.
pub(crate) struct SourceReconstruction<'e, 'a> {
    engine: &'e QueryEngine<'a>,
    unit: crate::source::UnitId,
    out: String,
}

impl<'e, 'a> SourceReconstruction<'e, 'a> {
    pub fn new(engine: &'e QueryEngine<'a>, unit: crate::source::UnitId) -> Self {
        Self { engine, unit, out: String::new() }
    }

    pub fn finish(self) -> String {
        self.out
    }

    fn node(&self, id: NodeId) -> &'a crate::ast::AstNode {
        self.engine
            .node(NodeRef::new(self.unit, id))
            .expect("reconstruction stays within one compiled unit")
    }

    fn token_text(&self, id: crate::token::TokenId) -> &'a str {
        self.engine.result().token_text(id)
    }

    fn push(&mut self, text: &str) {
        self.out.push_str(text);
    }

    pub fn append_decl(&mut self, decl: NodeId, declarator_index: u32) {
        match &self.node(decl).kind {
            AstKind::VariableDecl { qual_type, declarators }
            | AstKind::StructFieldDecl { qual_type, declarators }
            | AstKind::BlockFieldDecl { qual_type, declarators } => {
                self.append_qual_type(*qual_type);
                if let Some(declarator) = declarators.get(declarator_index as usize) {
                    self.push(" ");
                    self.append_declarator(declarator);
                }
                self.push(";");
            }
            AstKind::ParamDecl { qual_type, declarator, .. } => {
                self.append_qual_type(*qual_type);
                if let Some(declarator) = declarator {
                    self.push(" ");
                    self.append_declarator(declarator);
                }
            }
            AstKind::StructDecl { .. } => self.append_struct_decl(decl),
            AstKind::InterfaceBlockDecl { .. } => self.append_block_decl(decl),
            AstKind::FunctionDecl { .. } => self.append_function_signature(decl),
            AstKind::PrecisionDecl { qual_type } => {
                self.push("precision ");
                self.append_qual_type(*qual_type);
                self.push(";");
            }
            _ => {}
        }
    }

    pub fn append_function_signature(&mut self, decl: NodeId) {
        let AstKind::FunctionDecl { return_type, name, params, .. } = &self.node(decl).kind else {
            return;
        };
        self.append_qual_type(*return_type);
        self.push(" ");
        self.push(self.token_text(*name));
        self.push("(");
        for (i, &param) in params.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.append_decl(param, 0);
        }
        self.push(")");
    }

    fn append_qual_type(&mut self, qual_type: NodeId) {
        let AstKind::QualType { quals, name, struct_decl, array_spec, .. } = &self.node(qual_type).kind
        else {
            return;
        };
        let (quals, name, struct_decl, array_spec) = (*quals, *name, *struct_decl, *array_spec);

        if let Some(quals) = quals {
            if self.append_qualifier_seq(quals) {
                self.push(" ");
            }
        }

        if let Some(struct_decl) = struct_decl {
            self.append_struct_decl(struct_decl);
        } else if let Some(name) = name {
            self.push(self.token_text(name));
        }

        if let Some(array_spec) = array_spec {
            self.append_array_spec(array_spec);
        }
    }

    /// Returns whether anything was written.
    fn append_qualifier_seq(&mut self, quals: NodeId) -> bool {
        let AstKind::TypeQualifierSeq { quals, layout } = &self.node(quals).kind else {
            return false;
        };
        let (quals, layout) = (*quals, layout.clone());
        let mut wrote = false;

        if !layout.is_empty() {
            self.push("layout(");
            for (i, item) in layout.iter().enumerate() {
                if i > 0 {
                    self.push(", ");
                }
                self.push(self.token_text(item.name));
                if let Some(value) = item.value {
                    let rendered = self.render_const(value);
                    self.push(" = ");
                    self.push(&rendered);
                }
            }
            self.push(")");
            wrote = true;
        }

        let qual_text = quals.to_display_string();
        if !qual_text.is_empty() {
            if wrote {
                self.push(" ");
            }
            self.push(&qual_text);
            wrote = true;
        }
        wrote
    }

    fn append_declarator(&mut self, declarator: &Declarator) {
        self.push(self.token_text(declarator.name));
        if let Some(array_spec) = declarator.array_spec {
            self.append_array_spec(array_spec);
        }
        if let Some(init) = declarator.init {
            let rendered = self.render_const(init);
            self.push(" = ");
            self.push(&rendered);
        }
    }

    fn append_array_spec(&mut self, array_spec: NodeId) {
        let AstKind::ArraySpec { dims } = &self.node(array_spec).kind else { return };
        for dim in dims.clone() {
            match dim {
                Some(expr) => {
                    let rendered = self.render_const(expr);
                    self.push("[");
                    self.push(&rendered);
                    self.push("]");
                }
                None => self.push("[]"),
            }
        }
    }

    fn append_struct_decl(&mut self, decl: NodeId) {
        let AstKind::StructDecl { name, members, .. } = &self.node(decl).kind else { return };
        let (name, members) = (*name, members.clone());

        self.push("struct");
        if let Some(name) = name {
            self.push(" ");
            self.push(self.token_text(name));
        }
        self.push(" {\n");
        for member in members {
            let declarators = self.node(member).declarators().to_vec();
            for (index, _) in declarators.iter().enumerate() {
                self.push("    ");
                self.append_decl(member, index as u32);
                self.push("\n");
            }
        }
        self.push("}");
    }

    fn append_block_decl(&mut self, decl: NodeId) {
        let AstKind::InterfaceBlockDecl { quals, name, members, instance, .. } = &self.node(decl).kind
        else {
            return;
        };
        let (quals, name, members, instance) = (*quals, *name, members.clone(), instance.clone());

        if self.append_qualifier_seq(quals) {
            self.push(" ");
        }
        self.push(self.token_text(name));
        self.push(" {\n");
        for member in members {
            let declarators = self.node(member).declarators().to_vec();
            for (index, _) in declarators.iter().enumerate() {
                self.push("    ");
                self.append_decl(member, index as u32);
                self.push("\n");
            }
        }
        self.push("}");
        if let Some(instance) = instance {
            self.push(" ");
            self.append_declarator(&instance);
        }
        self.push(";");
    }

    /// An expression rendered as its folded constant, or a placeholder when
    /// the value is not a compile-time constant.
    fn render_const(&self, expr: NodeId) -> String {
        match self.node(expr).expr_payload() {
            Some(payload) if !payload.value.is_error() => payload.value.to_display_string(),
            _ => "...".to_string(),
        }
    }

}
