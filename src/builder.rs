use crate::artifacts::UnitSlots;
use crate::ast::{
    AstKind, AstStore, DeclView, Declarator, ExprPayload, LayoutItem, NameAccessKind, NodeId,
    NodeRef, ParamDirection, QualifierGroup, SwizzleDesc,
};
use crate::atom::{Atom, AtomTable};
use crate::consteval::{
    self, eval_binary, eval_index, eval_select, eval_swizzle, eval_unary, BinaryOp, ConstValue,
    ScalarValue, UnaryOp,
};
use crate::diag::{DiagnosticSink, Severity};
use crate::source::UnitId;
use crate::symbols::{FunctionEntry, ParamSignature, ScopeKind, SymbolTable};
use crate::token::{RawSyntaxToken, SyntaxRange, TokenId, TokenKind};
use crate::types::{ScalarKind, StructDesc, TypeDesc, TypeId, TypeUniverse};

/// Constructs AST nodes from parsed children, resolving names, deducing
/// types, and folding constants as it goes. Nodes leave the builder with
/// their payload complete and are immutable afterwards.
pub struct AstBuilder<'c> {
    pub unit: UnitId,
    pub store: &'c mut AstStore,
    pub types: &'c mut TypeUniverse,
    pub symbols: &'c mut SymbolTable,
    pub atoms: &'c AtomTable,
    pub tokens: &'c [RawSyntaxToken],
    pub prior_units: &'c UnitSlots,
    pub diag: &'c dyn DiagnosticSink,
    return_type: Option<TypeId>,
}

impl<'c> AstBuilder<'c> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        unit: UnitId,
        store: &'c mut AstStore,
        types: &'c mut TypeUniverse,
        symbols: &'c mut SymbolTable,
        atoms: &'c AtomTable,
        tokens: &'c [RawSyntaxToken],
        prior_units: &'c UnitSlots,
        diag: &'c dyn DiagnosticSink,
    ) -> Self {
        Self {
            unit,
            store,
            types,
            symbols,
            atoms,
            tokens,
            prior_units,
            diag,
            return_type: None,
        }
    }

    fn token(&self, id: TokenId) -> &RawSyntaxToken {
        debug_assert_eq!(id.unit, self.unit);
        &self.tokens[id.index as usize]
    }

    fn token_atom(&self, id: TokenId) -> Atom {
        self.token(id).text
    }

    fn token_text(&self, id: TokenId) -> &str {
        self.atoms.resolve(self.token(id).text)
    }

    fn report(&self, id: TokenId, severity: Severity, message: String) {
        let tok = self.token(id);
        self.diag.report(tok.spelled_file, tok.spelled_range, severity, message);
    }

    fn node(&self, nref: NodeRef) -> &crate::ast::AstNode {
        if nref.unit == self.unit {
            self.store.node(nref.node)
        } else {
            self.prior_units[nref.unit.index()]
                .as_ref()
                .expect("reference into a unit that was compiled")
                .ast
                .node(nref.node)
        }
    }

    fn local_node(&self, id: NodeId) -> &crate::ast::AstNode {
        self.store.node(id)
    }

    fn error_type(&self) -> TypeId {
        self.types.error()
    }

    fn expr_type(&self, id: NodeId) -> TypeId {
        self.local_node(id).expr_payload().map(|p| p.ty).unwrap_or(self.error_type())
    }

    fn expr_value(&self, id: NodeId) -> ConstValue {
        self.local_node(id)
            .expr_payload()
            .map(|p| p.value.clone())
            .unwrap_or(ConstValue::Error)
    }

    /// True when `name` is a struct type name currently in scope. The
    /// parser uses this to split type specifiers from expressions.
    pub fn is_struct_name(&self, name: Atom) -> bool {
        self.symbols
            .find_symbol(name)
            .is_some_and(|view| matches!(self.node(view.decl).kind, AstKind::StructDecl { .. }))
    }

    pub fn enter_function_scope(&mut self, return_type: TypeId, params: &[NodeId]) {
        self.return_type = Some(return_type);
        self.symbols.push_scope(ScopeKind::Function);
        for &param in params {
            let declarator_name = if let AstKind::ParamDecl { declarator: Some(declarator), .. } =
                &self.local_node(param).kind
            {
                Some(declarator.name)
            } else {
                None
            };
            if let Some(declarator_name) = declarator_name {
                let name = self.token_atom(declarator_name);
                let view = DeclView::new(NodeRef::new(self.unit, param));
                if !self.symbols.current_scope_mut().try_add_symbol(name, view) {
                    self.report(
                        declarator_name,
                        Severity::Error,
                        format!("parameter `{}` redeclared", self.token_text(declarator_name)),
                    );
                }
            }
        }
    }

    pub fn leave_function_scope(&mut self) {
        self.return_type = None;
        self.symbols.pop_scope();
    }

    pub fn enter_block_scope(&mut self) {
        self.symbols.push_scope(ScopeKind::Block);
    }

    pub fn leave_block_scope(&mut self) {
        self.symbols.pop_scope();
    }

    // ---- Misc nodes ----------------------------------------------------

    pub fn build_translation_unit(&mut self, range: SyntaxRange, decls: Vec<NodeId>) -> NodeId {
        let id = self.store.alloc(range, AstKind::TranslationUnit { decls });
        self.store.set_root(id);
        id
    }

    pub fn build_array_spec(&mut self, range: SyntaxRange, dims: Vec<Option<NodeId>>) -> NodeId {
        self.store.alloc(range, AstKind::ArraySpec { dims })
    }

    pub fn build_type_qualifier_seq(
        &mut self,
        range: SyntaxRange,
        quals: QualifierGroup,
        layout: Vec<LayoutItem>,
    ) -> NodeId {
        self.store.alloc(range, AstKind::TypeQualifierSeq { quals, layout })
    }

    /// Element type with an array specifier applied; each dimension is the
    /// folded value of its size expression, 0 when absent (runtime-sized).
    fn apply_array_spec(&mut self, element: TypeId, array_spec: Option<NodeId>) -> TypeId {
        let Some(spec) = array_spec else { return element };
        let AstKind::ArraySpec { dims } = &self.local_node(spec).kind else {
            return element;
        };

        let dims = dims.clone();
        let mut result = element;
        for dim in dims {
            let size = match dim {
                Some(expr) => self.expr_value(expr).as_array_size().unwrap_or(0),
                None => 0,
            };
            result = self.types.array(result, size);
        }
        result
    }

    pub fn build_qual_type_named(
        &mut self,
        range: SyntaxRange,
        quals: Option<NodeId>,
        name: TokenId,
        array_spec: Option<NodeId>,
    ) -> NodeId {
        let (resolved, resolved_struct) = self.resolve_type_name(name);
        let resolved = self.apply_array_spec(resolved, array_spec);
        self.store.alloc(
            range,
            AstKind::QualType {
                quals,
                name: Some(name),
                struct_decl: None,
                array_spec,
                resolved,
                resolved_struct,
            },
        )
    }

    pub fn build_qual_type_struct(
        &mut self,
        range: SyntaxRange,
        quals: Option<NodeId>,
        struct_decl: NodeId,
        array_spec: Option<NodeId>,
    ) -> NodeId {
        let declared = match &self.local_node(struct_decl).kind {
            AstKind::StructDecl { declared_type, .. } => *declared_type,
            _ => self.error_type(),
        };
        let resolved = self.apply_array_spec(declared, array_spec);
        self.store.alloc(
            range,
            AstKind::QualType {
                quals,
                name: None,
                struct_decl: Some(struct_decl),
                array_spec,
                resolved,
                resolved_struct: Some(NodeRef::new(self.unit, struct_decl)),
            },
        )
    }

    fn resolve_type_name(&mut self, name: TokenId) -> (TypeId, Option<NodeRef>) {
        let tok = self.token(name);
        if let TokenKind::Keyword(kw) = tok.kind {
            if let Some(ty) = self.types.builtin(kw) {
                return (ty, None);
            }
        }

        if tok.kind == TokenKind::Identifier {
            if let Some(view) = self.symbols.find_symbol(tok.text) {
                if let AstKind::StructDecl { declared_type, .. } = &self.node(view.decl).kind {
                    return (*declared_type, Some(view.decl));
                }
            }
            self.report(
                name,
                Severity::Error,
                format!("unknown type name `{}`", self.token_text(name)),
            );
        }

        (self.error_type(), None)
    }

    pub fn build_initializer_list(&mut self, range: SyntaxRange, items: Vec<NodeId>) -> NodeId {
        self.store.alloc(range, AstKind::InitializerList { items })
    }

    // ---- Expressions ---------------------------------------------------

    fn error_payload(&self) -> ExprPayload {
        ExprPayload { ty: self.error_type(), value: ConstValue::Error }
    }

    pub fn build_error_expr(&mut self, range: SyntaxRange) -> NodeId {
        let payload = self.error_payload();
        self.store.alloc(range, AstKind::ErrorExpr { payload })
    }

    pub fn build_literal_expr(&mut self, range: SyntaxRange, tok: TokenId) -> NodeId {
        let token = self.token(tok);
        let (ty, value) = match token.kind {
            TokenKind::IntConst => {
                let value = consteval::parse_int_literal(self.atoms.resolve(token.text));
                let ty = match &value {
                    ConstValue::Value(data) if data.kind == ScalarKind::Uint => self.types.uint(),
                    ConstValue::Value(_) => self.types.int(),
                    ConstValue::Error => self.error_type(),
                };
                (ty, value)
            }
            TokenKind::FloatConst => {
                let value = consteval::parse_float_literal(self.atoms.resolve(token.text));
                let ty = match &value {
                    ConstValue::Value(data) if data.kind == ScalarKind::Double => self.types.double(),
                    ConstValue::Value(_) => self.types.float(),
                    ConstValue::Error => self.error_type(),
                };
                (ty, value)
            }
            TokenKind::Keyword(crate::token::Kw::True) => (self.types.bool_(), ConstValue::bool_(true)),
            TokenKind::Keyword(crate::token::Kw::False) => (self.types.bool_(), ConstValue::bool_(false)),
            _ => (self.error_type(), ConstValue::Error),
        };

        self.store.alloc(range, AstKind::LiteralExpr { payload: ExprPayload { ty, value } })
    }

    pub fn build_name_access_expr(&mut self, range: SyntaxRange, name: TokenId) -> NodeId {
        let tok = self.token(name);
        if tok.kind != TokenKind::Identifier {
            return self.build_error_expr(range);
        }

        let Some(view) = self.symbols.find_symbol(tok.text) else {
            self.report(
                name,
                Severity::Error,
                format!("unknown identifier `{}`", self.token_text(name)),
            );
            let payload = self.error_payload();
            return self.store.alloc(
                range,
                AstKind::NameAccessExpr {
                    base: None,
                    name,
                    access: NameAccessKind::Unknown,
                    swizzle: None,
                    resolved: None,
                    payload,
                },
            );
        };

        let ty = self.decl_view_type(view);
        let value = self.decl_view_const_value(view);
        self.store.alloc(
            range,
            AstKind::NameAccessExpr {
                base: None,
                name,
                access: NameAccessKind::Variable,
                swizzle: None,
                resolved: Some(view),
                payload: ExprPayload { ty, value },
            },
        )
    }

    /// `base.name`: a swizzle when the base is a vector or scalar, a member
    /// access when it is a struct or block.
    pub fn build_dot_access_expr(&mut self, range: SyntaxRange, base: NodeId, name: TokenId) -> NodeId {
        let base_ty = self.expr_type(base);

        if self.types.is_error(base_ty) {
            let payload = self.error_payload();
            return self.store.alloc(
                range,
                AstKind::NameAccessExpr {
                    base: Some(base),
                    name,
                    access: NameAccessKind::Unknown,
                    swizzle: None,
                    resolved: None,
                    payload,
                },
            );
        }

        match *self.types.desc(base_ty) {
            TypeDesc::Vector(kind, dim) => self.build_swizzle(range, base, name, kind, dim),
            TypeDesc::Scalar(kind) => self.build_swizzle(range, base, name, kind, 1),
            TypeDesc::Struct(_) => self.build_member_access(range, base, name, base_ty),
            _ => {
                self.report(
                    name,
                    Severity::Error,
                    format!("type `{}` has no members", self.types.name(base_ty).to_string()),
                );
                let payload = self.error_payload();
                self.store.alloc(
                    range,
                    AstKind::NameAccessExpr {
                        base: Some(base),
                        name,
                        access: NameAccessKind::Unknown,
                        swizzle: None,
                        resolved: None,
                        payload,
                    },
                )
            }
        }
    }

    fn build_swizzle(
        &mut self,
        range: SyntaxRange,
        base: NodeId,
        name: TokenId,
        kind: ScalarKind,
        dim: u8,
    ) -> NodeId {
        let spelled = self.token_text(name).to_string();
        let swizzle = SwizzleDesc::parse(&spelled)
            .filter(|desc| desc.indices.iter().all(|&i| i < dim));

        let Some(swizzle) = swizzle else {
            self.report(name, Severity::Error, format!("invalid swizzle `{spelled}`"));
            let payload = self.error_payload();
            return self.store.alloc(
                range,
                AstKind::NameAccessExpr {
                    base: Some(base),
                    name,
                    access: NameAccessKind::Swizzle,
                    swizzle: None,
                    resolved: None,
                    payload,
                },
            );
        };

        let ty = self.types.scalar_or_vector(kind, swizzle.dimension() as u8);
        let value = eval_swizzle(&self.expr_value(base), &swizzle.indices);
        self.store.alloc(
            range,
            AstKind::NameAccessExpr {
                base: Some(base),
                name,
                access: NameAccessKind::Swizzle,
                swizzle: Some(swizzle),
                resolved: None,
                payload: ExprPayload { ty, value },
            },
        )
    }

    fn build_member_access(
        &mut self,
        range: SyntaxRange,
        base: NodeId,
        name: TokenId,
        base_ty: TypeId,
    ) -> NodeId {
        let member_name = self.token_text(name).to_string();
        let desc = self.types.struct_desc(base_ty).expect("caller checked the struct tag");
        let resolved = desc.member_lookup.get(&member_name).copied();
        let member_ty = desc
            .members
            .iter()
            .find(|(n, _)| *n == member_name)
            .map(|&(_, ty)| ty);

        let (access, ty) = match member_ty {
            Some(ty) => (NameAccessKind::Variable, ty),
            None => {
                self.report(
                    name,
                    Severity::Error,
                    format!("no member `{member_name}` in `{}`", self.types.name(base_ty).to_string()),
                );
                (NameAccessKind::Unknown, self.error_type())
            }
        };

        self.store.alloc(
            range,
            AstKind::NameAccessExpr {
                base: Some(base),
                name,
                access,
                swizzle: None,
                resolved,
                payload: ExprPayload { ty, value: ConstValue::Error },
            },
        )
    }

    pub fn build_index_access_expr(&mut self, range: SyntaxRange, base: NodeId, index: NodeId) -> NodeId {
        let base_ty = self.expr_type(base);
        let index_ty = self.expr_type(index);

        let index_ok = self.types.is_error(index_ty)
            || matches!(self.types.desc(index_ty), TypeDesc::Scalar(kind) if kind.is_integral());
        if !index_ok {
            let at = self.local_node(index).range.begin_id();
            self.report(at, Severity::Error, "array index must be an integer".to_string());
        }

        let ty = match *self.types.desc(base_ty) {
            TypeDesc::Vector(kind, _) => self.types.scalar(kind),
            TypeDesc::Matrix(kind, rows, _) => self.types.vector(kind, rows),
            TypeDesc::Array { element, .. } => element,
            _ => self.error_type(),
        };

        let value = eval_index(&self.expr_value(base), &self.expr_value(index));
        self.store.alloc(
            range,
            AstKind::IndexAccessExpr { base, index, payload: ExprPayload { ty, value } },
        )
    }

    pub fn build_unary_expr(&mut self, range: SyntaxRange, op: UnaryOp, operand: NodeId) -> NodeId {
        let operand_ty = self.expr_type(operand);
        let ty = self.deduce_unary_type(op, operand_ty);
        if self.types.is_error(ty) && !self.types.is_error(operand_ty) {
            let at = self.local_node(operand).range.begin_id();
            self.report(
                at,
                Severity::Error,
                format!("operator not applicable to `{}`", self.types.name(operand_ty).to_string()),
            );
        }

        let value = eval_unary(op, &self.expr_value(operand));
        self.store.alloc(range, AstKind::UnaryExpr { op, operand, payload: ExprPayload { ty, value } })
    }

    fn deduce_unary_type(&self, op: UnaryOp, operand: TypeId) -> TypeId {
        if self.types.is_error(operand) {
            return self.error_type();
        }

        let desc = self.types.desc(operand);
        match op {
            UnaryOp::Identity | UnaryOp::Negate => match desc {
                TypeDesc::Scalar(kind) | TypeDesc::Vector(kind, _) | TypeDesc::Matrix(kind, ..)
                    if *kind != ScalarKind::Bool =>
                {
                    operand
                }
                _ => self.error_type(),
            },
            UnaryOp::BitNot => match desc {
                TypeDesc::Scalar(kind) | TypeDesc::Vector(kind, _) if kind.is_integral() => operand,
                _ => self.error_type(),
            },
            UnaryOp::LogicalNot => match desc {
                TypeDesc::Scalar(ScalarKind::Bool) => operand,
                _ => self.error_type(),
            },
            UnaryOp::PrefixInc | UnaryOp::PrefixDec | UnaryOp::PostfixInc | UnaryOp::PostfixDec => {
                match desc {
                    TypeDesc::Scalar(kind) | TypeDesc::Vector(kind, _) | TypeDesc::Matrix(kind, ..)
                        if *kind != ScalarKind::Bool =>
                    {
                        operand
                    }
                    _ => self.error_type(),
                }
            }
            UnaryOp::Length => self.types.int(),
        }
    }

    /// Wrap `expr` in an implicit cast when its type differs from the
    /// context type and conversion is allowed.
    fn try_make_implicit_cast(&mut self, expr: NodeId, context: TypeId) -> NodeId {
        let expr_ty = self.expr_type(expr);
        if self.types.is_same(expr_ty, context) || self.types.is_error(expr_ty) || self.types.is_error(context) {
            return expr;
        }
        if !self.types.is_convertible_to(expr_ty, context) {
            return expr;
        }
        self.build_implicit_cast_expr(self.local_node(expr).range, expr, context)
    }

    pub fn build_implicit_cast_expr(&mut self, range: SyntaxRange, operand: NodeId, target: TypeId) -> NodeId {
        let value = cast_const_value(self.expr_value(operand), self.types.desc(target));
        self.store.alloc(
            range,
            AstKind::ImplicitCastExpr { operand, payload: ExprPayload { ty: target, value } },
        )
    }

    pub fn build_binary_expr(&mut self, range: SyntaxRange, op: BinaryOp, lhs: NodeId, rhs: NodeId) -> NodeId {
        let lhs_ty = self.expr_type(lhs);
        let rhs_ty = self.expr_type(rhs);

        if op.is_assignment() {
            // Assignments deduce to the destination type; the source is
            // cast when it converts.
            let rhs = self.try_make_implicit_cast(rhs, lhs_ty);
            if !self.types.is_error(rhs_ty)
                && !self.types.is_error(lhs_ty)
                && !self.types.is_convertible_to(rhs_ty, lhs_ty)
            {
                self.report(
                    range.begin_id(),
                    Severity::Error,
                    format!(
                        "cannot assign `{}` to `{}`",
                        self.types.name(rhs_ty).to_string(),
                        self.types.name(lhs_ty).to_string()
                    ),
                );
            }
            let payload = ExprPayload { ty: lhs_ty, value: ConstValue::Error };
            return self.store.alloc(range, AstKind::BinaryExpr { op, lhs, rhs, payload });
        }

        let (operand_ty, result_ty) = self.deduce_binary_types(op, lhs_ty, rhs_ty);
        if self.types.is_error(result_ty)
            && !self.types.is_error(lhs_ty)
            && !self.types.is_error(rhs_ty)
        {
            self.report(
                range.begin_id(),
                Severity::Error,
                format!(
                    "no operator for `{}` and `{}`",
                    self.types.name(lhs_ty).to_string(),
                    self.types.name(rhs_ty).to_string()
                ),
            );
        }

        let (lhs, rhs) = match operand_ty {
            Some((lhs_target, rhs_target)) => (
                self.try_make_implicit_cast(lhs, lhs_target),
                self.try_make_implicit_cast(rhs, rhs_target),
            ),
            None => (lhs, rhs),
        };

        let value = eval_binary(op, &self.expr_value(lhs), &self.expr_value(rhs));
        self.store.alloc(
            range,
            AstKind::BinaryExpr { op, lhs, rhs, payload: ExprPayload { ty: result_ty, value } },
        )
    }

    /// Operand target types (for implicit casts) and the result type of a
    /// non-assignment binary operator.
    fn deduce_binary_types(
        &mut self,
        op: BinaryOp,
        lhs: TypeId,
        rhs: TypeId,
    ) -> (Option<(TypeId, TypeId)>, TypeId) {
        use BinaryOp::*;

        if self.types.is_error(lhs) || self.types.is_error(rhs) {
            return (None, self.error_type());
        }

        match op {
            LogicalAnd | LogicalOr | LogicalXor => {
                let bool_ty = self.types.bool_();
                if self.types.is_same(lhs, bool_ty) && self.types.is_same(rhs, bool_ty) {
                    (None, bool_ty)
                } else {
                    (None, self.error_type())
                }
            }
            Equal | NotEqual => match self.common_arithmetic_type(lhs, rhs) {
                Some((l, r, _)) => (Some((l, r)), self.types.bool_()),
                None if self.types.is_same(lhs, rhs) => (None, self.types.bool_()),
                None => (None, self.error_type()),
            },
            Less | LessEq | Greater | GreaterEq => {
                let scalar = matches!(self.types.desc(lhs), TypeDesc::Scalar(_))
                    && matches!(self.types.desc(rhs), TypeDesc::Scalar(_));
                match self.common_arithmetic_type(lhs, rhs) {
                    Some((l, r, _)) if scalar => (Some((l, r)), self.types.bool_()),
                    _ => (None, self.error_type()),
                }
            }
            ShiftLeft | ShiftRight => {
                let integral = |ty: TypeId| {
                    matches!(self.types.desc(ty), TypeDesc::Scalar(kind) | TypeDesc::Vector(kind, _) if kind.is_integral())
                };
                if integral(lhs) && integral(rhs) {
                    (None, lhs)
                } else {
                    (None, self.error_type())
                }
            }
            BitAnd | BitOr | BitXor => {
                let integral_kind = |desc: &TypeDesc| match desc {
                    TypeDesc::Scalar(kind) | TypeDesc::Vector(kind, _) => kind.is_integral(),
                    _ => false,
                };
                if !integral_kind(self.types.desc(lhs)) || !integral_kind(self.types.desc(rhs)) {
                    return (None, self.error_type());
                }
                match self.common_arithmetic_type(lhs, rhs) {
                    Some((l, r, result)) => (Some((l, r)), result),
                    None => (None, self.error_type()),
                }
            }
            Plus | Minus | Mul | Div | Modulo => {
                if op == Modulo {
                    let integral_kind = |desc: &TypeDesc| match desc {
                        TypeDesc::Scalar(kind) | TypeDesc::Vector(kind, _) => kind.is_integral(),
                        _ => false,
                    };
                    if !integral_kind(self.types.desc(lhs)) || !integral_kind(self.types.desc(rhs)) {
                        return (None, self.error_type());
                    }
                }
                if op == Mul {
                    if let Some(result) = self.linear_algebra_mul_type(lhs, rhs) {
                        return (None, result);
                    }
                }
                match self.common_arithmetic_type(lhs, rhs) {
                    Some((l, r, result)) => (Some((l, r)), result),
                    None => (None, self.error_type()),
                }
            }
            Comma => (None, rhs),
            _ => (None, self.error_type()),
        }
    }

    /// `mat * vec`, `vec * mat`, and `mat * mat` shapes.
    fn linear_algebra_mul_type(&self, lhs: TypeId, rhs: TypeId) -> Option<TypeId> {
        match (self.types.desc(lhs), self.types.desc(rhs)) {
            (&TypeDesc::Matrix(kind, rows, cols), &TypeDesc::Vector(vk, dim))
                if vk == kind && dim == cols =>
            {
                Some(self.types.vector(kind, rows))
            }
            (&TypeDesc::Vector(vk, dim), &TypeDesc::Matrix(kind, rows, cols))
                if vk == kind && dim == rows =>
            {
                Some(self.types.vector(kind, cols))
            }
            (&TypeDesc::Matrix(lk, lr, lc), &TypeDesc::Matrix(rk, rr, rc))
                if lk == rk && lc == rr =>
            {
                Some(self.types.matrix(lk, lr, rc))
            }
            _ => None,
        }
    }

    /// Common type for component-wise arithmetic: `(lhs target, rhs target,
    /// result)`. Scalars combine with vectors and matrices by element-kind
    /// conversion of the scalar operand.
    fn common_arithmetic_type(&mut self, lhs: TypeId, rhs: TypeId) -> Option<(TypeId, TypeId, TypeId)> {
        let arithmetic = |desc: &TypeDesc| {
            matches!(desc, TypeDesc::Scalar(_) | TypeDesc::Vector(..) | TypeDesc::Matrix(..))
        };
        if !arithmetic(self.types.desc(lhs)) || !arithmetic(self.types.desc(rhs)) {
            return None;
        }

        if self.types.is_same(lhs, rhs) {
            return Some((lhs, rhs, lhs));
        }
        if self.types.is_convertible_to(lhs, rhs) {
            return Some((rhs, rhs, rhs));
        }
        if self.types.is_convertible_to(rhs, lhs) {
            return Some((lhs, lhs, lhs));
        }

        // Scalar combined with a vector or matrix: the scalar is cast to
        // the element kind and the composite shape wins.
        let element_kind = |desc: &TypeDesc| match *desc {
            TypeDesc::Vector(kind, _) | TypeDesc::Matrix(kind, ..) => Some(kind),
            _ => None,
        };
        if let (TypeDesc::Scalar(sk), Some(ek)) =
            (self.types.desc(lhs).clone(), element_kind(self.types.desc(rhs)))
        {
            let elem = self.types.scalar(ek);
            if sk == ek || self.types.is_convertible_to(lhs, elem) {
                return Some((elem, rhs, rhs));
            }
        }
        if let (Some(ek), TypeDesc::Scalar(sk)) =
            (element_kind(self.types.desc(lhs)), self.types.desc(rhs).clone())
        {
            let elem = self.types.scalar(ek);
            if sk == ek || self.types.is_convertible_to(rhs, elem) {
                return Some((lhs, elem, lhs));
            }
        }

        None
    }

    pub fn build_select_expr(
        &mut self,
        range: SyntaxRange,
        cond: NodeId,
        if_true: NodeId,
        if_false: NodeId,
    ) -> NodeId {
        let cond_ty = self.expr_type(cond);
        if !self.types.is_error(cond_ty) && !self.types.is_same(cond_ty, self.types.bool_()) {
            let at = self.local_node(cond).range.begin_id();
            self.report(at, Severity::Error, "condition must be a bool".to_string());
        }

        let true_ty = self.expr_type(if_true);
        let false_ty = self.expr_type(if_false);
        let (targets, ty) = match self.common_arithmetic_type(true_ty, false_ty) {
            Some((l, r, result)) => (Some((l, r)), result),
            None if self.types.is_same(true_ty, false_ty) => (None, true_ty),
            None => (None, self.error_type()),
        };

        let (if_true, if_false) = match targets {
            Some((l, r)) => (
                self.try_make_implicit_cast(if_true, l),
                self.try_make_implicit_cast(if_false, r),
            ),
            None => (if_true, if_false),
        };

        let value = eval_select(
            &self.expr_value(cond),
            &self.expr_value(if_true),
            &self.expr_value(if_false),
        );
        self.store.alloc(
            range,
            AstKind::SelectExpr { cond, if_true, if_false, payload: ExprPayload { ty, value } },
        )
    }

    pub fn build_function_call_expr(
        &mut self,
        range: SyntaxRange,
        name: TokenId,
        args: Vec<NodeId>,
    ) -> NodeId {
        let arg_types: Vec<TypeId> = args.iter().map(|&a| self.expr_type(a)).collect();
        let any_error = arg_types.iter().any(|&t| self.types.is_error(t));
        let name_atom = self.token_atom(name);

        let resolved = self
            .symbols
            .find_function(self.types, name_atom, &arg_types)
            .map(|entry| (entry.decl.decl, entry.return_type, entry.params.clone()));

        let (args, ty, resolved_function) = match resolved {
            Some((decl, return_type, params)) => {
                let args = args
                    .into_iter()
                    .zip(&params)
                    .map(|(arg, param)| {
                        if param.is_input && !param.is_output {
                            self.try_make_implicit_cast(arg, param.ty)
                        } else {
                            arg
                        }
                    })
                    .collect();
                (args, return_type, Some(decl))
            }
            None => {
                if !any_error {
                    self.report(
                        name,
                        Severity::Error,
                        format!("no matching overload for `{}`", self.token_text(name)),
                    );
                }
                (args, self.error_type(), None)
            }
        };

        self.store.alloc(
            range,
            AstKind::FunctionCallExpr {
                name,
                args,
                resolved_function,
                payload: ExprPayload { ty, value: ConstValue::Error },
            },
        )
    }

    pub fn build_constructor_call_expr(
        &mut self,
        range: SyntaxRange,
        qual_type: NodeId,
        args: Vec<NodeId>,
    ) -> NodeId {
        let ty = match &self.local_node(qual_type).kind {
            AstKind::QualType { resolved, .. } => *resolved,
            _ => self.error_type(),
        };

        self.check_constructor_arguments(range, ty, &args);
        let value = self.fold_constructor(ty, &args);
        self.store.alloc(
            range,
            AstKind::ConstructorCallExpr { qual_type, args, payload: ExprPayload { ty, value } },
        )
    }

    fn component_count(&self, ty: TypeId) -> Option<u32> {
        match *self.types.desc(ty) {
            TypeDesc::Scalar(_) => Some(1),
            TypeDesc::Vector(_, dim) => Some(dim as u32),
            TypeDesc::Matrix(_, rows, cols) => Some(rows as u32 * cols as u32),
            _ => None,
        }
    }

    fn check_constructor_arguments(&mut self, range: SyntaxRange, ty: TypeId, args: &[NodeId]) {
        if self.types.is_error(ty) {
            return;
        }
        let arg_types: Vec<TypeId> = args.iter().map(|&a| self.expr_type(a)).collect();
        if arg_types.iter().any(|&t| self.types.is_error(t)) {
            return;
        }

        let at = range.begin_id();
        match self.types.desc(ty).clone() {
            TypeDesc::Scalar(_) => {
                if args.len() != 1 || self.component_count(arg_types[0]).is_none() {
                    self.report(at, Severity::Error, "scalar constructor takes one scalar argument".to_string());
                }
            }
            TypeDesc::Vector(_, dim) => {
                let components: Option<u32> = arg_types.iter().map(|&t| self.component_count(t)).sum();
                match components {
                    // A single scalar splats; otherwise components must add
                    // up to the vector size.
                    Some(1) if args.len() == 1 => {}
                    Some(total) if total == dim as u32 => {}
                    _ => {
                        self.report(
                            at,
                            Severity::Error,
                            format!("wrong number of components for `{}`", self.types.name(ty).to_string()),
                        );
                    }
                }
            }
            TypeDesc::Matrix(_, rows, cols) => {
                let from_matrix = args.len() == 1
                    && matches!(self.types.desc(arg_types[0]), TypeDesc::Matrix(..));
                let single_scalar = args.len() == 1
                    && matches!(self.types.desc(arg_types[0]), TypeDesc::Scalar(_));
                let components: Option<u32> = arg_types.iter().map(|&t| self.component_count(t)).sum();
                if !from_matrix && !single_scalar && components != Some(rows as u32 * cols as u32) {
                    self.report(
                        at,
                        Severity::Error,
                        format!("wrong number of components for `{}`", self.types.name(ty).to_string()),
                    );
                }
            }
            TypeDesc::Struct(desc) => {
                if args.len() != desc.members.len() {
                    self.report(
                        at,
                        Severity::Error,
                        format!("`{}` constructor takes {} argument(s)", desc.name, desc.members.len()),
                    );
                } else {
                    for (&arg_ty, (member_name, member_ty)) in arg_types.iter().zip(&desc.members) {
                        if !self.types.is_convertible_to(arg_ty, *member_ty) {
                            self.report(
                                at,
                                Severity::Error,
                                format!("argument for member `{member_name}` has the wrong type"),
                            );
                        }
                    }
                }
            }
            TypeDesc::Array { .. } | TypeDesc::Opaque(_) | TypeDesc::Error | TypeDesc::Void => {
                self.report(at, Severity::Error, "type cannot be constructed".to_string());
            }
        }
    }

    /// Fold scalar and vector constructors over constant arguments.
    fn fold_constructor(&mut self, ty: TypeId, args: &[NodeId]) -> ConstValue {
        let target_kind = match *self.types.desc(ty) {
            TypeDesc::Scalar(kind) => kind,
            TypeDesc::Vector(kind, _) => kind,
            _ => return ConstValue::Error,
        };
        let dim = match *self.types.desc(ty) {
            TypeDesc::Scalar(_) => 1usize,
            TypeDesc::Vector(_, dim) => dim as usize,
            _ => return ConstValue::Error,
        };

        let mut elems: Vec<ScalarValue> = Vec::new();
        for &arg in args {
            let value = cast_const_value(self.expr_value(arg), &TypeDesc::Scalar(target_kind));
            match value {
                ConstValue::Value(data) if data.kind == target_kind => elems.extend(data.elems),
                _ => return ConstValue::Error,
            }
        }

        if elems.len() == 1 && dim > 1 {
            // Scalar splat.
            elems = vec![elems[0]; dim];
        }
        if elems.len() != dim {
            return ConstValue::Error;
        }

        if dim == 1 {
            ConstValue::scalar(elems[0])
        } else {
            ConstValue::vector(target_kind, elems)
        }
    }

    /// `arr.length()` and vector `.length()`.
    pub fn build_length_expr(&mut self, range: SyntaxRange, base: NodeId) -> NodeId {
        let base_ty = self.expr_type(base);
        let known = match *self.types.desc(base_ty) {
            TypeDesc::Vector(_, dim) => Some(dim as i32),
            TypeDesc::Array { size, .. } if size > 0 => Some(size as i32),
            TypeDesc::Array { .. } => None,
            _ => None,
        };
        let value = known.map(ConstValue::int).unwrap_or(ConstValue::Error);
        let ty = self.types.int();
        self.store.alloc(
            range,
            AstKind::UnaryExpr { op: UnaryOp::Length, operand: base, payload: ExprPayload { ty, value } },
        )
    }

    // ---- Statements ----------------------------------------------------

    pub fn build_error_stmt(&mut self, range: SyntaxRange) -> NodeId {
        self.store.alloc(range, AstKind::ErrorStmt)
    }

    pub fn build_empty_stmt(&mut self, range: SyntaxRange) -> NodeId {
        self.store.alloc(range, AstKind::EmptyStmt)
    }

    pub fn build_compound_stmt(&mut self, range: SyntaxRange, stmts: Vec<NodeId>) -> NodeId {
        self.store.alloc(range, AstKind::CompoundStmt { stmts })
    }

    pub fn build_expr_stmt(&mut self, range: SyntaxRange, expr: NodeId) -> NodeId {
        self.store.alloc(range, AstKind::ExprStmt { expr })
    }

    pub fn build_decl_stmt(&mut self, range: SyntaxRange, decl: NodeId) -> NodeId {
        self.store.alloc(range, AstKind::DeclStmt { decl })
    }

    pub fn build_if_stmt(
        &mut self,
        range: SyntaxRange,
        cond: NodeId,
        then_branch: NodeId,
        else_branch: Option<NodeId>,
    ) -> NodeId {
        self.store.alloc(range, AstKind::IfStmt { cond, then_branch, else_branch })
    }

    pub fn build_for_stmt(
        &mut self,
        range: SyntaxRange,
        init: Option<NodeId>,
        cond: Option<NodeId>,
        iter: Option<NodeId>,
        body: NodeId,
    ) -> NodeId {
        self.store.alloc(range, AstKind::ForStmt { init, cond, iter, body })
    }

    pub fn build_while_stmt(&mut self, range: SyntaxRange, cond: NodeId, body: NodeId) -> NodeId {
        self.store.alloc(range, AstKind::WhileStmt { cond, body })
    }

    pub fn build_do_while_stmt(&mut self, range: SyntaxRange, body: NodeId, cond: NodeId) -> NodeId {
        self.store.alloc(range, AstKind::DoWhileStmt { body, cond })
    }

    pub fn build_case_label_stmt(&mut self, range: SyntaxRange, value: Option<NodeId>) -> NodeId {
        self.store.alloc(range, AstKind::CaseLabelStmt { value })
    }

    pub fn build_switch_stmt(&mut self, range: SyntaxRange, test: NodeId, body: NodeId) -> NodeId {
        self.store.alloc(range, AstKind::SwitchStmt { test, body })
    }

    pub fn build_jump_stmt(&mut self, range: SyntaxRange, kind: crate::ast::JumpKind) -> NodeId {
        self.store.alloc(range, AstKind::JumpStmt { kind })
    }

    pub fn build_return_stmt(&mut self, range: SyntaxRange, value: Option<NodeId>) -> NodeId {
        let value = match (value, self.return_type) {
            (Some(expr), Some(expected)) => Some(self.try_make_implicit_cast(expr, expected)),
            (value, _) => value,
        };
        self.store.alloc(range, AstKind::ReturnStmt { value })
    }

    // ---- Declarations --------------------------------------------------

    pub fn build_error_decl(&mut self, range: SyntaxRange) -> NodeId {
        self.store.alloc(range, AstKind::ErrorDecl)
    }

    pub fn build_empty_decl(&mut self, range: SyntaxRange) -> NodeId {
        self.store.alloc(range, AstKind::EmptyDecl)
    }

    pub fn build_precision_decl(&mut self, range: SyntaxRange, qual_type: NodeId) -> NodeId {
        self.store.alloc(range, AstKind::PrecisionDecl { qual_type })
    }

    fn qual_type_resolved(&self, qual_type: NodeId) -> TypeId {
        match &self.local_node(qual_type).kind {
            AstKind::QualType { resolved, .. } => *resolved,
            _ => self.error_type(),
        }
    }

    fn resolve_declarators(&mut self, qual_type: NodeId, declarators: &mut [Declarator]) {
        let base = self.qual_type_resolved(qual_type);
        for declarator in declarators {
            declarator.resolved = self.apply_array_spec(base, declarator.array_spec);
        }
    }

    fn register_declarators(&mut self, decl: NodeId, declarators: &[Declarator]) {
        for (index, declarator) in declarators.iter().enumerate() {
            let name = self.token_atom(declarator.name);
            if name == Atom::EMPTY {
                continue;
            }
            let view = DeclView::with_index(NodeRef::new(self.unit, decl), index as u32);
            if !self.symbols.current_scope_mut().try_add_symbol(name, view) {
                self.report(
                    declarator.name,
                    Severity::Error,
                    format!("`{}` is already declared in this scope", self.token_text(declarator.name)),
                );
            }
        }
    }

    pub fn build_variable_decl(
        &mut self,
        range: SyntaxRange,
        qual_type: NodeId,
        mut declarators: Vec<Declarator>,
    ) -> NodeId {
        self.resolve_declarators(qual_type, &mut declarators);
        let id = self.store.peek_next_id();
        self.register_declarators(id, &declarators);
        self.store.alloc(range, AstKind::VariableDecl { qual_type, declarators })
    }

    pub fn build_struct_field_decl(
        &mut self,
        range: SyntaxRange,
        qual_type: NodeId,
        mut declarators: Vec<Declarator>,
    ) -> NodeId {
        self.resolve_declarators(qual_type, &mut declarators);
        self.store.alloc(range, AstKind::StructFieldDecl { qual_type, declarators })
    }

    pub fn build_block_field_decl(
        &mut self,
        range: SyntaxRange,
        qual_type: NodeId,
        mut declarators: Vec<Declarator>,
    ) -> NodeId {
        self.resolve_declarators(qual_type, &mut declarators);
        self.store.alloc(range, AstKind::BlockFieldDecl { qual_type, declarators })
    }

    fn collect_member_desc(
        &self,
        members: &[NodeId],
    ) -> (Vec<(String, TypeId)>, rustc_hash::FxHashMap<String, DeclView>) {
        let mut member_types = Vec::new();
        let mut member_lookup = rustc_hash::FxHashMap::default();
        for &member in members {
            let node = self.local_node(member);
            for (index, declarator) in node.declarators().iter().enumerate() {
                let name = self.token_text(declarator.name).to_string();
                if name.is_empty() {
                    continue;
                }
                member_lookup.entry(name.clone()).or_insert_with(|| {
                    DeclView::with_index(NodeRef::new(self.unit, member), index as u32)
                });
                member_types.push((name, declarator.resolved));
            }
        }
        (member_types, member_lookup)
    }

    pub fn build_struct_decl(
        &mut self,
        range: SyntaxRange,
        name: Option<TokenId>,
        members: Vec<NodeId>,
    ) -> NodeId {
        let decl_id = self.store.peek_next_id();
        let decl_ref = NodeRef::new(self.unit, decl_id);

        let (member_types, member_lookup) = self.collect_member_desc(&members);
        let struct_name = name.map(|tok| self.token_text(tok).to_string()).unwrap_or_default();
        let declared_type = self.types.declare_struct(StructDesc {
            name: struct_name,
            members: member_types,
            decl: decl_ref,
            member_lookup,
        });

        if let Some(name_tok) = name {
            let atom = self.token_atom(name_tok);
            let view = DeclView::new(decl_ref);
            if !self.symbols.current_scope_mut().try_add_symbol(atom, view) {
                self.report(
                    name_tok,
                    Severity::Error,
                    format!("`{}` is already declared in this scope", self.token_text(name_tok)),
                );
            }
        }

        self.store.alloc(range, AstKind::StructDecl { name, members, declared_type })
    }

    pub fn build_interface_block_decl(
        &mut self,
        range: SyntaxRange,
        quals: NodeId,
        name: TokenId,
        members: Vec<NodeId>,
        mut instance: Option<Declarator>,
    ) -> NodeId {
        let decl_id = self.store.peek_next_id();
        let decl_ref = NodeRef::new(self.unit, decl_id);

        let (member_types, member_lookup) = self.collect_member_desc(&members);
        let block_type = self.types.declare_struct(StructDesc {
            name: self.token_text(name).to_string(),
            members: member_types,
            decl: decl_ref,
            member_lookup,
        });

        let mut instance_type = block_type;
        if let Some(declarator) = instance.as_mut() {
            instance_type = self.apply_array_spec(block_type, declarator.array_spec);
            declarator.resolved = instance_type;

            let atom = self.token_atom(declarator.name);
            let view = DeclView::new(decl_ref);
            if !self.symbols.current_scope_mut().try_add_symbol(atom, view) {
                self.report(
                    declarator.name,
                    Severity::Error,
                    format!("`{}` is already declared in this scope", self.token_text(declarator.name)),
                );
            }
        } else {
            // An unnamed block spills its members into the enclosing scope.
            for &member in &members {
                let declarators = self.local_node(member).declarators().to_vec();
                for (index, declarator) in declarators.iter().enumerate() {
                    let atom = self.token_atom(declarator.name);
                    let view = DeclView::with_index(NodeRef::new(self.unit, member), index as u32);
                    if !self.symbols.current_scope_mut().try_add_symbol(atom, view) {
                        self.report(
                            declarator.name,
                            Severity::Error,
                            format!(
                                "`{}` is already declared in this scope",
                                self.token_text(declarator.name)
                            ),
                        );
                    }
                }
            }
        }

        self.store.alloc(
            range,
            AstKind::InterfaceBlockDecl { quals, name, members, instance, block_type, instance_type },
        )
    }

    pub fn build_param_decl(
        &mut self,
        range: SyntaxRange,
        qual_type: NodeId,
        mut declarator: Option<Declarator>,
    ) -> NodeId {
        let direction = self.param_direction(qual_type);
        let base = self.qual_type_resolved(qual_type);
        let resolved = match declarator.as_mut() {
            Some(declarator) => {
                let ty = self.apply_array_spec(base, declarator.array_spec);
                declarator.resolved = ty;
                ty
            }
            None => base,
        };

        self.store.alloc(range, AstKind::ParamDecl { qual_type, declarator, direction, resolved })
    }

    fn param_direction(&self, qual_type: NodeId) -> ParamDirection {
        let AstKind::QualType { quals: Some(quals), .. } = &self.local_node(qual_type).kind else {
            return ParamDirection::In;
        };
        let AstKind::TypeQualifierSeq { quals, .. } = &self.local_node(*quals).kind else {
            return ParamDirection::In;
        };
        if quals.inout {
            ParamDirection::InOut
        } else if quals.out {
            ParamDirection::Out
        } else {
            ParamDirection::In
        }
    }

    pub fn build_function_decl(
        &mut self,
        range: SyntaxRange,
        return_type: NodeId,
        name: TokenId,
        params: Vec<NodeId>,
        body: Option<NodeId>,
    ) -> NodeId {
        let resolved_return = self.qual_type_resolved(return_type);
        let mut resolved_params = Vec::with_capacity(params.len());
        let mut signatures = Vec::with_capacity(params.len());
        for &param in &params {
            if let AstKind::ParamDecl { direction, resolved, .. } = &self.local_node(param).kind {
                resolved_params.push(*resolved);
                signatures.push(ParamSignature {
                    ty: *resolved,
                    is_input: direction.is_input(),
                    is_output: direction.is_output(),
                });
            }
        }

        let decl_id = self.store.peek_next_id();
        let name_atom = self.token_atom(name);
        if self.token(name).kind == TokenKind::Identifier && name_atom != Atom::EMPTY {
            self.symbols.global_scope_mut().add_function(
                name_atom,
                FunctionEntry {
                    decl: DeclView::new(NodeRef::new(self.unit, decl_id)),
                    params: signatures,
                    return_type: resolved_return,
                },
            );
        }

        self.store.alloc(
            range,
            AstKind::FunctionDecl { return_type, name, params, body, resolved_params, resolved_return },
        )
    }

    // ---- Shared payload helpers ---------------------------------------

    /// Declared type of the entity one `DeclView` names.
    pub fn decl_view_type(&self, view: DeclView) -> TypeId {
        decl_view_type_impl(|nref| Some(self.node(nref)), view).unwrap_or(self.error_type())
    }

    /// Folded value of a `const`-qualified variable's initializer.
    fn decl_view_const_value(&self, view: DeclView) -> ConstValue {
        let node = self.node(view.decl);
        let AstKind::VariableDecl { qual_type, declarators } = &node.kind else {
            return ConstValue::Error;
        };
        let Some(declarator) = declarators.get(view.index as usize) else {
            return ConstValue::Error;
        };
        let Some(init) = declarator.init else {
            return ConstValue::Error;
        };

        // Only const-qualified variables fold through name accesses.
        let store = if view.decl.unit == self.unit {
            &*self.store
        } else {
            &self.prior_units[view.decl.unit.index()]
                .as_ref()
                .expect("reference into a compiled unit")
                .ast
        };
        let AstKind::QualType { quals: Some(quals), .. } = &store.node(*qual_type).kind else {
            return ConstValue::Error;
        };
        let AstKind::TypeQualifierSeq { quals, .. } = &store.node(*quals).kind else {
            return ConstValue::Error;
        };
        if !quals.const_ {
            return ConstValue::Error;
        }

        store
            .node(init)
            .expr_payload()
            .map(|p| p.value.clone())
            .unwrap_or(ConstValue::Error)
    }
}

/// Declared type of a decl view, given a node resolver. Shared with the
/// query layer, which walks finished artifacts instead of a live builder.
pub fn decl_view_type_impl<'a>(
    node: impl Fn(NodeRef) -> Option<&'a crate::ast::AstNode>,
    view: DeclView,
) -> Option<TypeId> {
    let decl = node(view.decl)?;
    match &decl.kind {
        AstKind::VariableDecl { declarators, .. }
        | AstKind::StructFieldDecl { declarators, .. }
        | AstKind::BlockFieldDecl { declarators, .. } => {
            declarators.get(view.index as usize).map(|d| d.resolved)
        }
        AstKind::ParamDecl { resolved, .. } => Some(*resolved),
        AstKind::StructDecl { declared_type, .. } => Some(*declared_type),
        AstKind::InterfaceBlockDecl { instance_type, .. } => Some(*instance_type),
        AstKind::FunctionDecl { resolved_return, .. } => Some(*resolved_return),
        _ => None,
    }
}

/// Convert a constant to another scalar kind, shape preserved. Mirrors the
/// implicit conversions the type system allows.
pub fn cast_const_value(value: ConstValue, target: &TypeDesc) -> ConstValue {
    let target_kind = match target {
        TypeDesc::Scalar(kind) => *kind,
        TypeDesc::Vector(kind, _) => *kind,
        TypeDesc::Matrix(kind, ..) => *kind,
        _ => return ConstValue::Error,
    };

    let ConstValue::Value(data) = value else { return ConstValue::Error };
    if data.kind == target_kind {
        return ConstValue::Value(data);
    }

    let mut elems = Vec::with_capacity(data.elems.len());
    for &elem in &data.elems {
        let converted = match (elem, target_kind) {
            (ScalarValue::Int(v), ScalarKind::Uint) => ScalarValue::Uint(v as u32),
            (ScalarValue::Int(v), ScalarKind::Float) => ScalarValue::Float(v as f32),
            (ScalarValue::Int(v), ScalarKind::Double) => ScalarValue::Double(v as f64),
            (ScalarValue::Uint(v), ScalarKind::Float) => ScalarValue::Float(v as f32),
            (ScalarValue::Uint(v), ScalarKind::Double) => ScalarValue::Double(v as f64),
            (ScalarValue::Float(v), ScalarKind::Double) => ScalarValue::Double(v as f64),
            _ => return ConstValue::Error,
        };
        elems.push(converted);
    }

    ConstValue::Value(crate::consteval::ConstData {
        kind: target_kind,
        rows: data.rows,
        cols: data.cols,
        elems,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consteval::ConstData;

    #[test]
    fn const_cast_int_to_float() {
        let value = cast_const_value(ConstValue::int(7), &TypeDesc::Scalar(ScalarKind::Float));
        assert_eq!(value, ConstValue::float(7.0));
    }

    #[test]
    fn const_cast_preserves_shape() {
        let vec = ConstValue::vector(
            ScalarKind::Int,
            vec![ScalarValue::Int(1), ScalarValue::Int(2)],
        );
        let cast = cast_const_value(vec, &TypeDesc::Vector(ScalarKind::Float, 2));
        let ConstValue::Value(ConstData { kind, elems, .. }) = cast else {
            panic!("expected a value");
        };
        assert_eq!(kind, ScalarKind::Float);
        assert_eq!(elems, vec![ScalarValue::Float(1.0), ScalarValue::Float(2.0)]);
    }

    #[test]
    fn const_cast_rejects_narrowing() {
        assert!(cast_const_value(ConstValue::float(1.5), &TypeDesc::Scalar(ScalarKind::Int)).is_error());
        assert!(cast_const_value(ConstValue::bool_(true), &TypeDesc::Scalar(ScalarKind::Int)).is_error());
    }
}
