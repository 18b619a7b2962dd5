mod visitor;

pub use visitor::{walk_node, AstVisitor};

use crate::consteval::{BinaryOp, ConstValue, UnaryOp};
use crate::source::UnitId;
use crate::token::{SyntaxRange, TokenId};
use crate::types::TypeId;

/// Handle to a node inside one unit's [`AstStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Node handle qualified with its translation unit, usable across units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeRef {
    pub unit: UnitId,
    pub node: NodeId,
}

impl NodeRef {
    pub fn new(unit: UnitId, node: NodeId) -> Self {
        Self { unit, node }
    }
}

/// Addresses one declarator inside a possibly multi-declarator declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeclView {
    pub decl: NodeRef,
    pub index: u32,
}

impl DeclView {
    pub fn new(decl: NodeRef) -> Self {
        Self { decl, index: 0 }
    }

    pub fn with_index(decl: NodeRef, index: u32) -> Self {
        Self { decl, index }
    }
}

/// What a name access resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NameAccessKind {
    #[default]
    Unknown,
    Variable,
    Function,
    Constructor,
    Swizzle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwizzleCharSet {
    Xyzw,
    Rgba,
    Stpq,
}

impl SwizzleCharSet {
    pub fn chars(self) -> &'static str {
        match self {
            SwizzleCharSet::Xyzw => "xyzw",
            SwizzleCharSet::Rgba => "rgba",
            SwizzleCharSet::Stpq => "stpq",
        }
    }
}

/// Parsed swizzle selector: up to four component indices from one char set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwizzleDesc {
    pub indices: Vec<u8>,
    pub char_set: SwizzleCharSet,
}

impl SwizzleDesc {
    /// Parse a swizzle spelling. Mixing character sets, unknown characters,
    /// or more than four components make the swizzle invalid.
    pub fn parse(name: &str) -> Option<SwizzleDesc> {
        if name.is_empty() || name.len() > 4 {
            return None;
        }

        let mut char_set = None;
        let mut indices = Vec::with_capacity(name.len());
        for ch in name.chars() {
            let (set, index) = match ch {
                'x' => (SwizzleCharSet::Xyzw, 0),
                'y' => (SwizzleCharSet::Xyzw, 1),
                'z' => (SwizzleCharSet::Xyzw, 2),
                'w' => (SwizzleCharSet::Xyzw, 3),
                'r' => (SwizzleCharSet::Rgba, 0),
                'g' => (SwizzleCharSet::Rgba, 1),
                'b' => (SwizzleCharSet::Rgba, 2),
                'a' => (SwizzleCharSet::Rgba, 3),
                's' => (SwizzleCharSet::Stpq, 0),
                't' => (SwizzleCharSet::Stpq, 1),
                'p' => (SwizzleCharSet::Stpq, 2),
                'q' => (SwizzleCharSet::Stpq, 3),
                _ => return None,
            };
            match char_set {
                None => char_set = Some(set),
                Some(prev) if prev != set => return None,
                Some(_) => {}
            }
            indices.push(index);
        }

        Some(SwizzleDesc { indices, char_set: char_set? })
    }

    pub fn dimension(&self) -> usize {
        self.indices.len()
    }

    pub fn to_display_string(&self) -> String {
        let chars = self.char_set.chars().as_bytes();
        self.indices.iter().map(|&i| chars[i as usize] as char).collect()
    }
}

/// Storage, precision, interpolation, and memory qualifiers as a bitset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QualifierGroup {
    pub highp: bool,
    pub mediump: bool,
    pub lowp: bool,

    pub const_: bool,
    pub in_: bool,
    pub out: bool,
    pub inout: bool,
    pub attribute: bool,
    pub uniform: bool,
    pub varying: bool,
    pub buffer: bool,
    pub shared: bool,

    pub centroid: bool,
    pub sample: bool,
    pub patch: bool,

    pub smooth: bool,
    pub flat: bool,
    pub noperspective: bool,

    pub invariant: bool,
    pub precise: bool,

    pub coherent: bool,
    pub volatile: bool,
    pub restrict: bool,
    pub readonly: bool,
    pub writeonly: bool,
}

impl QualifierGroup {
    pub fn has_any(&self) -> bool {
        *self != QualifierGroup::default()
    }

    pub fn can_declare_interface_block(&self) -> bool {
        self.in_ || self.out || self.uniform || self.buffer
    }

    pub fn to_display_string(&self) -> String {
        let mut parts: Vec<&str> = Vec::new();
        let flags = [
            (self.highp, "highp"),
            (self.mediump, "mediump"),
            (self.lowp, "lowp"),
            (self.const_, "const"),
            (self.in_, "in"),
            (self.out, "out"),
            (self.inout, "inout"),
            (self.attribute, "attribute"),
            (self.uniform, "uniform"),
            (self.varying, "varying"),
            (self.buffer, "buffer"),
            (self.shared, "shared"),
            (self.centroid, "centroid"),
            (self.sample, "sample"),
            (self.patch, "patch"),
            (self.smooth, "smooth"),
            (self.flat, "flat"),
            (self.noperspective, "noperspective"),
            (self.invariant, "invariant"),
            (self.precise, "precise"),
            (self.coherent, "coherent"),
            (self.volatile, "volatile"),
            (self.restrict, "restrict"),
            (self.readonly, "readonly"),
            (self.writeonly, "writeonly"),
        ];
        for (set, name) in flags {
            if set {
                parts.push(name);
            }
        }
        parts.join(" ")
    }
}

/// One `identifier` or `identifier = value` inside `layout(...)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutItem {
    pub name: TokenId,
    pub value: Option<NodeId>,
}

/// One declarator of a declaration: name, optional array suffix, optional
/// initializer, and the type it resolves to with the array suffix applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Declarator {
    pub name: TokenId,
    pub array_spec: Option<NodeId>,
    pub init: Option<NodeId>,
    pub resolved: TypeId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpKind {
    Break,
    Continue,
    Discard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamDirection {
    In,
    Out,
    InOut,
}

impl ParamDirection {
    pub fn is_input(self) -> bool {
        matches!(self, ParamDirection::In | ParamDirection::InOut)
    }

    pub fn is_output(self) -> bool {
        matches!(self, ParamDirection::Out | ParamDirection::InOut)
    }
}

/// Payload every expression node carries after building.
#[derive(Debug, Clone, PartialEq)]
pub struct ExprPayload {
    pub ty: TypeId,
    pub value: ConstValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AstKind {
    TranslationUnit {
        decls: Vec<NodeId>,
    },

    TypeQualifierSeq {
        quals: QualifierGroup,
        layout: Vec<LayoutItem>,
    },
    ArraySpec {
        /// One entry per `[...]`; `None` for an empty (runtime) dimension.
        dims: Vec<Option<NodeId>>,
    },
    QualType {
        quals: Option<NodeId>,
        /// Spelled type name; absent for an inline struct definition.
        name: Option<TokenId>,
        struct_decl: Option<NodeId>,
        array_spec: Option<NodeId>,
        resolved: TypeId,
        resolved_struct: Option<NodeRef>,
    },
    InitializerList {
        items: Vec<NodeId>,
    },

    ErrorExpr {
        payload: ExprPayload,
    },
    LiteralExpr {
        payload: ExprPayload,
    },
    NameAccessExpr {
        /// Base expression for `base.name`; absent for a bare name.
        base: Option<NodeId>,
        name: TokenId,
        access: NameAccessKind,
        swizzle: Option<SwizzleDesc>,
        resolved: Option<DeclView>,
        payload: ExprPayload,
    },
    IndexAccessExpr {
        base: NodeId,
        index: NodeId,
        payload: ExprPayload,
    },
    UnaryExpr {
        op: UnaryOp,
        operand: NodeId,
        payload: ExprPayload,
    },
    BinaryExpr {
        op: BinaryOp,
        lhs: NodeId,
        rhs: NodeId,
        payload: ExprPayload,
    },
    SelectExpr {
        cond: NodeId,
        if_true: NodeId,
        if_false: NodeId,
        payload: ExprPayload,
    },
    ImplicitCastExpr {
        operand: NodeId,
        payload: ExprPayload,
    },
    FunctionCallExpr {
        name: TokenId,
        args: Vec<NodeId>,
        resolved_function: Option<NodeRef>,
        payload: ExprPayload,
    },
    ConstructorCallExpr {
        qual_type: NodeId,
        args: Vec<NodeId>,
        payload: ExprPayload,
    },

    ErrorStmt,
    EmptyStmt,
    CompoundStmt {
        stmts: Vec<NodeId>,
    },
    ExprStmt {
        expr: NodeId,
    },
    DeclStmt {
        decl: NodeId,
    },
    IfStmt {
        cond: NodeId,
        then_branch: NodeId,
        else_branch: Option<NodeId>,
    },
    ForStmt {
        init: Option<NodeId>,
        cond: Option<NodeId>,
        iter: Option<NodeId>,
        body: NodeId,
    },
    WhileStmt {
        cond: NodeId,
        body: NodeId,
    },
    DoWhileStmt {
        body: NodeId,
        cond: NodeId,
    },
    /// `case expr:` or, with no value, `default:`.
    CaseLabelStmt {
        value: Option<NodeId>,
    },
    SwitchStmt {
        test: NodeId,
        body: NodeId,
    },
    JumpStmt {
        kind: JumpKind,
    },
    ReturnStmt {
        value: Option<NodeId>,
    },

    ErrorDecl,
    EmptyDecl,
    PrecisionDecl {
        qual_type: NodeId,
    },
    VariableDecl {
        qual_type: NodeId,
        declarators: Vec<Declarator>,
    },
    StructFieldDecl {
        qual_type: NodeId,
        declarators: Vec<Declarator>,
    },
    BlockFieldDecl {
        qual_type: NodeId,
        declarators: Vec<Declarator>,
    },
    StructDecl {
        name: Option<TokenId>,
        members: Vec<NodeId>,
        declared_type: TypeId,
    },
    InterfaceBlockDecl {
        quals: NodeId,
        name: TokenId,
        members: Vec<NodeId>,
        instance: Option<Declarator>,
        block_type: TypeId,
        instance_type: TypeId,
    },
    ParamDecl {
        qual_type: NodeId,
        declarator: Option<Declarator>,
        direction: ParamDirection,
        resolved: TypeId,
    },
    FunctionDecl {
        return_type: NodeId,
        name: TokenId,
        params: Vec<NodeId>,
        body: Option<NodeId>,
        resolved_params: Vec<TypeId>,
        resolved_return: TypeId,
    },
}

/// One AST node: token range plus variant data. Immutable once stored.
#[derive(Debug, Clone, PartialEq)]
pub struct AstNode {
    pub range: SyntaxRange,
    pub kind: AstKind,
}

impl AstNode {
    pub fn expr_payload(&self) -> Option<&ExprPayload> {
        use AstKind::*;
        match &self.kind {
            ErrorExpr { payload }
            | LiteralExpr { payload }
            | NameAccessExpr { payload, .. }
            | IndexAccessExpr { payload, .. }
            | UnaryExpr { payload, .. }
            | BinaryExpr { payload, .. }
            | SelectExpr { payload, .. }
            | ImplicitCastExpr { payload, .. }
            | FunctionCallExpr { payload, .. }
            | ConstructorCallExpr { payload, .. } => Some(payload),
            _ => None,
        }
    }

    pub fn is_expr(&self) -> bool {
        self.expr_payload().is_some()
    }

    pub fn is_decl(&self) -> bool {
        use AstKind::*;
        matches!(
            self.kind,
            ErrorDecl
                | EmptyDecl
                | PrecisionDecl { .. }
                | VariableDecl { .. }
                | StructFieldDecl { .. }
                | BlockFieldDecl { .. }
                | StructDecl { .. }
                | InterfaceBlockDecl { .. }
                | ParamDecl { .. }
                | FunctionDecl { .. }
        )
    }

    /// Declarators of a declaration that owns them.
    pub fn declarators(&self) -> &[Declarator] {
        use AstKind::*;
        match &self.kind {
            VariableDecl { declarators, .. }
            | StructFieldDecl { declarators, .. }
            | BlockFieldDecl { declarators, .. } => declarators,
            _ => &[],
        }
    }
}

/// Append-only node storage for one translation unit. Node handles are
/// indices; dropping the store drops every node at once.
#[derive(Debug, Default)]
pub struct AstStore {
    nodes: Vec<AstNode>,
    root: Option<NodeId>,
}

impl AstStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id the next `alloc` call will hand out. Lets a builder create a
    /// type that refers back to the node it is about to allocate.
    pub fn peek_next_id(&self) -> NodeId {
        NodeId(self.nodes.len() as u32)
    }

    pub fn alloc(&mut self, range: SyntaxRange, kind: AstKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(AstNode { range, kind });
        id
    }

    pub fn node(&self, id: NodeId) -> &AstNode {
        &self.nodes[id.index()]
    }

    pub fn set_root(&mut self, root: NodeId) {
        self.root = Some(root);
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Children of a node in syntactic order.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        use AstKind::*;
        let mut out = Vec::new();

        fn push_opt(id: &Option<NodeId>, out: &mut Vec<NodeId>) {
            if let Some(id) = id {
                out.push(*id);
            }
        }

        match &self.node(id).kind {
            TranslationUnit { decls } => out.extend(decls.iter().copied()),
            TypeQualifierSeq { layout, .. } => {
                for item in layout {
                    push_opt(&item.value, &mut out);
                }
            }
            ArraySpec { dims } => {
                for dim in dims {
                    push_opt(dim, &mut out);
                }
            }
            QualType { quals, struct_decl, array_spec, .. } => {
                push_opt(quals, &mut out);
                push_opt(struct_decl, &mut out);
                push_opt(array_spec, &mut out);
            }
            InitializerList { items } => out.extend(items.iter().copied()),

            ErrorExpr { .. } | LiteralExpr { .. } => {}
            NameAccessExpr { base, .. } => push_opt(base, &mut out),
            IndexAccessExpr { base, index, .. } => {
                out.push(*base);
                out.push(*index);
            }
            UnaryExpr { operand, .. } => out.push(*operand),
            BinaryExpr { lhs, rhs, .. } => {
                out.push(*lhs);
                out.push(*rhs);
            }
            SelectExpr { cond, if_true, if_false, .. } => {
                out.push(*cond);
                out.push(*if_true);
                out.push(*if_false);
            }
            ImplicitCastExpr { operand, .. } => out.push(*operand),
            FunctionCallExpr { args, .. } => out.extend(args.iter().copied()),
            ConstructorCallExpr { qual_type, args, .. } => {
                out.push(*qual_type);
                out.extend(args.iter().copied());
            }

            ErrorStmt | EmptyStmt | JumpStmt { .. } => {}
            CompoundStmt { stmts } => out.extend(stmts.iter().copied()),
            ExprStmt { expr } => out.push(*expr),
            DeclStmt { decl } => out.push(*decl),
            IfStmt { cond, then_branch, else_branch } => {
                out.push(*cond);
                out.push(*then_branch);
                push_opt(else_branch, &mut out);
            }
            ForStmt { init, cond, iter, body } => {
                push_opt(init, &mut out);
                push_opt(cond, &mut out);
                push_opt(iter, &mut out);
                out.push(*body);
            }
            WhileStmt { cond, body } => {
                out.push(*cond);
                out.push(*body);
            }
            DoWhileStmt { body, cond } => {
                out.push(*body);
                out.push(*cond);
            }
            CaseLabelStmt { value } => push_opt(value, &mut out),
            SwitchStmt { test, body } => {
                out.push(*test);
                out.push(*body);
            }
            ReturnStmt { value } => push_opt(value, &mut out),

            ErrorDecl | EmptyDecl => {}
            PrecisionDecl { qual_type } => out.push(*qual_type),
            VariableDecl { qual_type, declarators }
            | StructFieldDecl { qual_type, declarators }
            | BlockFieldDecl { qual_type, declarators } => {
                out.push(*qual_type);
                for declarator in declarators {
                    push_opt(&declarator.array_spec, &mut out);
                    push_opt(&declarator.init, &mut out);
                }
            }
            StructDecl { members, .. } => out.extend(members.iter().copied()),
            InterfaceBlockDecl { quals, members, instance, .. } => {
                out.push(*quals);
                out.extend(members.iter().copied());
                if let Some(instance) = instance {
                    push_opt(&instance.array_spec, &mut out);
                }
            }
            ParamDecl { qual_type, declarator, .. } => {
                out.push(*qual_type);
                if let Some(declarator) = declarator {
                    push_opt(&declarator.array_spec, &mut out);
                }
            }
            FunctionDecl { return_type, params, body, .. } => {
                out.push(*return_type);
                out.extend(params.iter().copied());
                push_opt(body, &mut out);
            }
        }
        out
    }
}
