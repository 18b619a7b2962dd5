use crate::types::ScalarKind;

/// One scalar component of a constant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScalarValue {
    Bool(bool),
    Int(i32),
    Uint(u32),
    Float(f32),
    Double(f64),
}

/// Result of constant folding: either the error value or a scalar/vector/
/// matrix composite. Every expression node carries one of these.
///
/// Folding never coerces: binary operators require both sides to have the
/// same scalar kind and shape; the AST builder inserts explicit casts first.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ConstValue {
    #[default]
    Error,
    Value(ConstData),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstData {
    pub kind: ScalarKind,
    pub rows: u8,
    pub cols: u8,
    pub elems: Vec<ScalarValue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Identity,
    Negate,
    BitNot,
    LogicalNot,
    PrefixInc,
    PrefixDec,
    PostfixInc,
    PostfixDec,
    Length,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Comma,

    Assign,
    MulAssign,
    DivAssign,
    ModAssign,
    AddAssign,
    SubAssign,
    LShiftAssign,
    RShiftAssign,
    AndAssign,
    XorAssign,
    OrAssign,

    Plus,
    Minus,
    Mul,
    Div,
    Modulo,
    Equal,
    NotEqual,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    BitAnd,
    BitOr,
    BitXor,
    LogicalAnd,
    LogicalOr,
    LogicalXor,
    ShiftLeft,
    ShiftRight,
}

impl BinaryOp {
    pub fn is_assignment(self) -> bool {
        use BinaryOp::*;
        matches!(
            self,
            Assign
                | MulAssign
                | DivAssign
                | ModAssign
                | AddAssign
                | SubAssign
                | LShiftAssign
                | RShiftAssign
                | AndAssign
                | XorAssign
                | OrAssign
        )
    }
}

impl ConstValue {
    pub fn scalar(value: ScalarValue) -> Self {
        let kind = match value {
            ScalarValue::Bool(_) => ScalarKind::Bool,
            ScalarValue::Int(_) => ScalarKind::Int,
            ScalarValue::Uint(_) => ScalarKind::Uint,
            ScalarValue::Float(_) => ScalarKind::Float,
            ScalarValue::Double(_) => ScalarKind::Double,
        };
        ConstValue::Value(ConstData { kind, rows: 1, cols: 1, elems: vec![value] })
    }

    pub fn bool_(v: bool) -> Self {
        Self::scalar(ScalarValue::Bool(v))
    }

    pub fn int(v: i32) -> Self {
        Self::scalar(ScalarValue::Int(v))
    }

    pub fn uint(v: u32) -> Self {
        Self::scalar(ScalarValue::Uint(v))
    }

    pub fn float(v: f32) -> Self {
        Self::scalar(ScalarValue::Float(v))
    }

    pub fn double(v: f64) -> Self {
        Self::scalar(ScalarValue::Double(v))
    }

    pub fn vector(kind: ScalarKind, elems: Vec<ScalarValue>) -> Self {
        let rows = elems.len() as u8;
        ConstValue::Value(ConstData { kind, rows, cols: 1, elems })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ConstValue::Error)
    }

    pub fn data(&self) -> Option<&ConstData> {
        match self {
            ConstValue::Error => None,
            ConstValue::Value(data) => Some(data),
        }
    }

    pub fn is_scalar(&self) -> bool {
        self.data().is_some_and(|d| d.rows == 1 && d.cols == 1)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.data()?.elems.as_slice() {
            [ScalarValue::Bool(v)] => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self.data()?.elems.as_slice() {
            [ScalarValue::Int(v)] => Some(*v),
            _ => None,
        }
    }

    pub fn as_uint(&self) -> Option<u32> {
        match self.data()?.elems.as_slice() {
            [ScalarValue::Uint(v)] => Some(*v),
            _ => None,
        }
    }

    /// Scalar int or uint as an array dimension, when non-negative.
    pub fn as_array_size(&self) -> Option<u32> {
        if let Some(v) = self.as_int() {
            return u32::try_from(v).ok();
        }
        self.as_uint()
    }

    pub fn to_display_string(&self) -> String {
        match self {
            ConstValue::Error => "<error>".to_string(),
            ConstValue::Value(data) => {
                if data.elems.len() == 1 {
                    format_scalar(data.elems[0])
                } else {
                    let parts: Vec<String> = data.elems.iter().map(|&e| format_scalar(e)).collect();
                    format!("{{{}}}", parts.join(", "))
                }
            }
        }
    }
}

fn format_scalar(v: ScalarValue) -> String {
    match v {
        ScalarValue::Bool(v) => v.to_string(),
        ScalarValue::Int(v) => v.to_string(),
        ScalarValue::Uint(v) => format!("{v}u"),
        ScalarValue::Float(v) => format!("{v}"),
        ScalarValue::Double(v) => format!("{v}lf"),
    }
}

pub fn eval_unary(op: UnaryOp, operand: &ConstValue) -> ConstValue {
    let Some(data) = operand.data() else {
        return ConstValue::Error;
    };

    match op {
        UnaryOp::Identity => operand.clone(),
        UnaryOp::Negate => map_elems(data, |v| match v {
            ScalarValue::Int(v) => Some(ScalarValue::Int(v.wrapping_neg())),
            ScalarValue::Float(v) => Some(ScalarValue::Float(-v)),
            ScalarValue::Double(v) => Some(ScalarValue::Double(-v)),
            _ => None,
        }),
        UnaryOp::BitNot => map_elems(data, |v| match v {
            ScalarValue::Int(v) => Some(ScalarValue::Int(!v)),
            ScalarValue::Uint(v) => Some(ScalarValue::Uint(!v)),
            _ => None,
        }),
        UnaryOp::LogicalNot => map_elems(data, |v| match v {
            ScalarValue::Bool(v) => Some(ScalarValue::Bool(!v)),
            _ => None,
        }),
        // Side effects cannot appear in a constant expression.
        UnaryOp::PrefixInc | UnaryOp::PrefixDec | UnaryOp::PostfixInc | UnaryOp::PostfixDec => {
            ConstValue::Error
        }
        UnaryOp::Length => ConstValue::int(data.elems.len() as i32),
    }
}

pub fn eval_binary(op: BinaryOp, lhs: &ConstValue, rhs: &ConstValue) -> ConstValue {
    let (Some(l), Some(r)) = (lhs.data(), rhs.data()) else {
        return ConstValue::Error;
    };
    // No implicit coercion here; the builder must cast operands first.
    if l.kind != r.kind || l.rows != r.rows || l.cols != r.cols {
        return ConstValue::Error;
    }

    use BinaryOp::*;
    match op {
        Plus => zip_arith(l, r, |a, b| a.checked_add(b), |a, b| a.checked_add(b), |a, b| a + b),
        Minus => zip_arith(l, r, |a, b| a.checked_sub(b), |a, b| a.checked_sub(b), |a, b| a - b),
        Mul => zip_arith(l, r, |a, b| a.checked_mul(b), |a, b| a.checked_mul(b), |a, b| a * b),
        Div => zip_arith(l, r, |a, b| a.checked_div(b), |a, b| a.checked_div(b), |a, b| a / b),
        Modulo => zip_elems(l, r, |a, b| match (a, b) {
            (ScalarValue::Int(a), ScalarValue::Int(b)) => a.checked_rem(b).map(ScalarValue::Int),
            (ScalarValue::Uint(a), ScalarValue::Uint(b)) => a.checked_rem(b).map(ScalarValue::Uint),
            _ => None,
        }),
        Equal => match all_components_equal(l, r) {
            Some(eq) => ConstValue::bool_(eq),
            None => ConstValue::Error,
        },
        NotEqual => match all_components_equal(l, r) {
            Some(eq) => ConstValue::bool_(!eq),
            None => ConstValue::Error,
        },
        Less => compare_scalar(l, r, |ord| ord == std::cmp::Ordering::Less),
        LessEq => compare_scalar(l, r, |ord| ord != std::cmp::Ordering::Greater),
        Greater => compare_scalar(l, r, |ord| ord == std::cmp::Ordering::Greater),
        GreaterEq => compare_scalar(l, r, |ord| ord != std::cmp::Ordering::Less),
        BitAnd => zip_integral(l, r, |a, b| a & b, |a, b| a & b),
        BitOr => zip_integral(l, r, |a, b| a | b, |a, b| a | b),
        BitXor => zip_integral(l, r, |a, b| a ^ b, |a, b| a ^ b),
        LogicalAnd => zip_bool(l, r, |a, b| a && b),
        LogicalOr => zip_bool(l, r, |a, b| a || b),
        LogicalXor => zip_bool(l, r, |a, b| a != b),
        ShiftLeft => zip_integral(l, r, |a, b| a.wrapping_shl(b as u32), |a, b| a.wrapping_shl(b)),
        ShiftRight => zip_integral(l, r, |a, b| a.wrapping_shr(b as u32), |a, b| a.wrapping_shr(b)),
        // Side-effecting and sequencing operators never fold.
        Comma | Assign | MulAssign | DivAssign | ModAssign | AddAssign | SubAssign
        | LShiftAssign | RShiftAssign | AndAssign | XorAssign | OrAssign => ConstValue::Error,
    }
}

pub fn eval_select(cond: &ConstValue, if_true: &ConstValue, if_false: &ConstValue) -> ConstValue {
    match cond.as_bool() {
        Some(true) => if_true.clone(),
        Some(false) => if_false.clone(),
        None => ConstValue::Error,
    }
}

/// Index into a constant vector, matrix column, or array-shaped composite.
pub fn eval_index(base: &ConstValue, index: &ConstValue) -> ConstValue {
    let Some(data) = base.data() else {
        return ConstValue::Error;
    };
    let Some(idx) = index.as_array_size() else {
        return ConstValue::Error;
    };
    let idx = idx as usize;

    if data.cols > 1 {
        // Matrix: yield one column vector.
        let rows = data.rows as usize;
        if idx >= data.cols as usize {
            return ConstValue::Error;
        }
        let column = data.elems[idx * rows..(idx + 1) * rows].to_vec();
        ConstValue::vector(data.kind, column)
    } else {
        if idx >= data.elems.len() {
            return ConstValue::Error;
        }
        ConstValue::scalar(data.elems[idx])
    }
}

/// Swizzle a constant vector by component indices.
pub fn eval_swizzle(base: &ConstValue, indices: &[u8]) -> ConstValue {
    let Some(data) = base.data() else {
        return ConstValue::Error;
    };
    if data.cols > 1 || indices.is_empty() || indices.len() > 4 {
        return ConstValue::Error;
    }

    let mut elems = Vec::with_capacity(indices.len());
    for &i in indices {
        match data.elems.get(i as usize) {
            Some(&v) => elems.push(v),
            None => return ConstValue::Error,
        }
    }

    if elems.len() == 1 {
        ConstValue::scalar(elems[0])
    } else {
        ConstValue::vector(data.kind, elems)
    }
}

fn map_elems(data: &ConstData, f: impl Fn(ScalarValue) -> Option<ScalarValue>) -> ConstValue {
    let mut elems = Vec::with_capacity(data.elems.len());
    for &v in &data.elems {
        match f(v) {
            Some(v) => elems.push(v),
            None => return ConstValue::Error,
        }
    }
    ConstValue::Value(ConstData { kind: data.kind, rows: data.rows, cols: data.cols, elems })
}

fn zip_elems(
    l: &ConstData,
    r: &ConstData,
    f: impl Fn(ScalarValue, ScalarValue) -> Option<ScalarValue>,
) -> ConstValue {
    let mut elems = Vec::with_capacity(l.elems.len());
    for (&a, &b) in l.elems.iter().zip(&r.elems) {
        match f(a, b) {
            Some(v) => elems.push(v),
            None => return ConstValue::Error,
        }
    }
    ConstValue::Value(ConstData { kind: l.kind, rows: l.rows, cols: l.cols, elems })
}

fn zip_arith(
    l: &ConstData,
    r: &ConstData,
    fi: impl Fn(i32, i32) -> Option<i32>,
    fu: impl Fn(u32, u32) -> Option<u32>,
    ff: impl Fn(f64, f64) -> f64,
) -> ConstValue {
    zip_elems(l, r, |a, b| match (a, b) {
        (ScalarValue::Int(a), ScalarValue::Int(b)) => fi(a, b).map(ScalarValue::Int),
        (ScalarValue::Uint(a), ScalarValue::Uint(b)) => fu(a, b).map(ScalarValue::Uint),
        (ScalarValue::Float(a), ScalarValue::Float(b)) => {
            Some(ScalarValue::Float(ff(a as f64, b as f64) as f32))
        }
        (ScalarValue::Double(a), ScalarValue::Double(b)) => Some(ScalarValue::Double(ff(a, b))),
        _ => None,
    })
}

fn zip_integral(
    l: &ConstData,
    r: &ConstData,
    fi: impl Fn(i32, i32) -> i32,
    fu: impl Fn(u32, u32) -> u32,
) -> ConstValue {
    zip_elems(l, r, |a, b| match (a, b) {
        (ScalarValue::Int(a), ScalarValue::Int(b)) => Some(ScalarValue::Int(fi(a, b))),
        (ScalarValue::Uint(a), ScalarValue::Uint(b)) => Some(ScalarValue::Uint(fu(a, b))),
        _ => None,
    })
}

fn zip_bool(l: &ConstData, r: &ConstData, f: impl Fn(bool, bool) -> bool) -> ConstValue {
    zip_elems(l, r, |a, b| match (a, b) {
        (ScalarValue::Bool(a), ScalarValue::Bool(b)) => Some(ScalarValue::Bool(f(a, b))),
        _ => None,
    })
}

fn scalar_order(a: ScalarValue, b: ScalarValue) -> Option<std::cmp::Ordering> {
    match (a, b) {
        (ScalarValue::Bool(a), ScalarValue::Bool(b)) => Some(a.cmp(&b)),
        (ScalarValue::Int(a), ScalarValue::Int(b)) => Some(a.cmp(&b)),
        (ScalarValue::Uint(a), ScalarValue::Uint(b)) => Some(a.cmp(&b)),
        (ScalarValue::Float(a), ScalarValue::Float(b)) => a.partial_cmp(&b),
        (ScalarValue::Double(a), ScalarValue::Double(b)) => a.partial_cmp(&b),
        _ => None,
    }
}

/// `==`/`!=` hold for a composite when every component agrees.
fn all_components_equal(l: &ConstData, r: &ConstData) -> Option<bool> {
    let mut all = true;
    for (&a, &b) in l.elems.iter().zip(&r.elems) {
        all &= scalar_order(a, b)? == std::cmp::Ordering::Equal;
    }
    Some(all)
}

/// Relational operators apply to scalars only.
fn compare_scalar(l: &ConstData, r: &ConstData, accept: impl Fn(std::cmp::Ordering) -> bool) -> ConstValue {
    if l.elems.len() != 1 {
        return ConstValue::Error;
    }
    match scalar_order(l.elems[0], r.elems[0]) {
        Some(ord) => ConstValue::bool_(accept(ord)),
        None => ConstValue::Error,
    }
}

/// Interpret an integer literal spelling (decimal, octal, hex, `u` suffix).
pub fn parse_int_literal(text: &str) -> ConstValue {
    let (body, unsigned) = match text.strip_suffix(['u', 'U']) {
        Some(body) => (body, true),
        None => (text, false),
    };

    let (digits, radix) = if let Some(hex) = body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")) {
        (hex, 16)
    } else if body.len() > 1 && body.starts_with('0') {
        (&body[1..], 8)
    } else {
        (body, 10)
    };

    if digits.is_empty() {
        return ConstValue::Error;
    }

    match u64::from_str_radix(digits, radix) {
        Ok(value) => {
            if unsigned {
                ConstValue::uint(value as u32)
            } else {
                ConstValue::int(value as i32)
            }
        }
        Err(_) => ConstValue::Error,
    }
}

/// Interpret a floating literal spelling (`f`/`F` float, `lf`/`LF` double,
/// unsuffixed float).
pub fn parse_float_literal(text: &str) -> ConstValue {
    if let Some(body) = text.strip_suffix("lf").or_else(|| text.strip_suffix("LF")) {
        return match body.parse::<f64>() {
            Ok(v) => ConstValue::double(v),
            Err(_) => ConstValue::Error,
        };
    }

    let body = text.strip_suffix(['f', 'F']).unwrap_or(text);
    match body.parse::<f32>() {
        Ok(v) => ConstValue::float(v),
        Err(_) => ConstValue::Error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arithmetic_folds_elementwise() {
        let a = ConstValue::int(1);
        let b = ConstValue::int(2);
        let sum = eval_binary(BinaryOp::Plus, &a, &b);
        assert_eq!(sum.as_int(), Some(3));

        let product = eval_binary(BinaryOp::Mul, &b, &ConstValue::int(3));
        let total = eval_binary(BinaryOp::Plus, &a, &product);
        assert_eq!(total.as_int(), Some(7));
    }

    #[test]
    fn mismatched_kinds_yield_error() {
        let result = eval_binary(BinaryOp::Plus, &ConstValue::int(1), &ConstValue::float(1.0));
        assert!(result.is_error());
    }

    #[test]
    fn division_by_zero_is_error() {
        assert!(eval_binary(BinaryOp::Div, &ConstValue::int(1), &ConstValue::int(0)).is_error());
        assert!(eval_binary(BinaryOp::Modulo, &ConstValue::int(1), &ConstValue::int(0)).is_error());
    }

    #[test]
    fn float_division_by_zero_is_not_error() {
        let result = eval_binary(BinaryOp::Div, &ConstValue::float(1.0), &ConstValue::float(0.0));
        assert!(!result.is_error());
    }

    #[test]
    fn assignment_operators_never_fold() {
        let one = ConstValue::int(1);
        assert!(eval_binary(BinaryOp::Assign, &one, &one).is_error());
        assert!(eval_binary(BinaryOp::AddAssign, &one, &one).is_error());
        assert!(eval_unary(UnaryOp::PrefixInc, &one).is_error());
    }

    #[test]
    fn logical_ops_require_bool() {
        let result = eval_binary(BinaryOp::LogicalAnd, &ConstValue::bool_(true), &ConstValue::bool_(false));
        assert_eq!(result.as_bool(), Some(false));
        assert!(eval_binary(BinaryOp::LogicalAnd, &ConstValue::int(1), &ConstValue::int(1)).is_error());
    }

    #[test]
    fn logical_not_and_bit_not() {
        assert_eq!(eval_unary(UnaryOp::LogicalNot, &ConstValue::bool_(false)).as_bool(), Some(true));
        assert_eq!(eval_unary(UnaryOp::BitNot, &ConstValue::int(0)).as_int(), Some(-1));
        assert!(eval_unary(UnaryOp::BitNot, &ConstValue::float(1.0)).is_error());
    }

    #[test]
    fn select_requires_scalar_bool() {
        let t = ConstValue::int(10);
        let f = ConstValue::int(20);
        assert_eq!(eval_select(&ConstValue::bool_(true), &t, &f).as_int(), Some(10));
        assert_eq!(eval_select(&ConstValue::bool_(false), &t, &f).as_int(), Some(20));
        assert!(eval_select(&ConstValue::int(1), &t, &f).is_error());
    }

    #[test]
    fn vector_equality_compares_all_components() {
        use ScalarValue::*;
        let a = ConstValue::vector(ScalarKind::Int, vec![Int(1), Int(2)]);
        let b = ConstValue::vector(ScalarKind::Int, vec![Int(1), Int(3)]);
        assert_eq!(eval_binary(BinaryOp::Equal, &a, &a.clone()).as_bool(), Some(true));
        assert_eq!(eval_binary(BinaryOp::Equal, &a, &b).as_bool(), Some(false));
        assert_eq!(eval_binary(BinaryOp::NotEqual, &a, &b).as_bool(), Some(true));
    }

    #[test]
    fn relational_ops_reject_vectors() {
        use ScalarValue::*;
        let a = ConstValue::vector(ScalarKind::Int, vec![Int(1), Int(2)]);
        assert!(eval_binary(BinaryOp::Less, &a, &a.clone()).is_error());
    }

    #[test]
    fn swizzle_selects_components() {
        use ScalarValue::*;
        let v = ConstValue::vector(ScalarKind::Float, vec![Float(1.0), Float(2.0), Float(3.0)]);
        let zx = eval_swizzle(&v, &[2, 0]);
        let data = zx.data().unwrap();
        assert_eq!(data.elems, vec![Float(3.0), Float(1.0)]);

        let single = eval_swizzle(&v, &[1]);
        assert!(single.is_scalar());
        assert!(eval_swizzle(&v, &[3]).is_error());
    }

    #[test]
    fn index_into_vector_and_out_of_bounds() {
        use ScalarValue::*;
        let v = ConstValue::vector(ScalarKind::Int, vec![Int(5), Int(6)]);
        assert_eq!(eval_index(&v, &ConstValue::int(1)).as_int(), Some(6));
        assert!(eval_index(&v, &ConstValue::int(2)).is_error());
        assert!(eval_index(&v, &ConstValue::int(-1)).is_error());
    }

    #[test]
    fn length_reports_component_count() {
        use ScalarValue::*;
        let v = ConstValue::vector(ScalarKind::Float, vec![Float(0.0); 4]);
        assert_eq!(eval_unary(UnaryOp::Length, &v).as_int(), Some(4));
    }

    #[test]
    fn shifts_are_wrapping() {
        assert_eq!(
            eval_binary(BinaryOp::ShiftLeft, &ConstValue::int(1), &ConstValue::int(3)).as_int(),
            Some(8)
        );
    }

    #[test]
    fn int_literal_forms() {
        assert_eq!(parse_int_literal("42").as_int(), Some(42));
        assert_eq!(parse_int_literal("0x10").as_int(), Some(16));
        assert_eq!(parse_int_literal("010").as_int(), Some(8));
        assert_eq!(parse_int_literal("7u").as_uint(), Some(7));
        assert_eq!(parse_int_literal("0").as_int(), Some(0));
        assert!(parse_int_literal("0x").is_error());
    }

    #[test]
    fn float_literal_forms() {
        assert_eq!(parse_float_literal("1.5"), ConstValue::float(1.5));
        assert_eq!(parse_float_literal("2.0f"), ConstValue::float(2.0));
        assert_eq!(parse_float_literal("3.0lf"), ConstValue::double(3.0));
        assert_eq!(parse_float_literal("1e2"), ConstValue::float(100.0));
    }

    #[test]
    fn array_size_accepts_int_and_uint() {
        assert_eq!(ConstValue::int(3).as_array_size(), Some(3));
        assert_eq!(ConstValue::uint(4).as_array_size(), Some(4));
        assert_eq!(ConstValue::int(-1).as_array_size(), None);
        assert_eq!(ConstValue::float(3.0).as_array_size(), None);
    }
}
