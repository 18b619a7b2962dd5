use rustc_hash::FxHashMap;

use crate::ast::{DeclView, NodeRef};
use crate::token::Kw;

/// Handle to a canonicalised type in a [`TypeUniverse`].
///
/// Within one compilation (and the preambles it inherits) handle equality is
/// type identity, with the single exception of arrays instantiated by
/// different units, which compare structurally. The default handle is the
/// error type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TypeId(u32);

impl TypeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Bool,
    Int,
    Uint,
    Float,
    Double,
    Int8,
    Int16,
    Int64,
    Uint8,
    Uint16,
    Uint64,
    Float16,
}

impl ScalarKind {
    pub fn is_integral(self) -> bool {
        use ScalarKind::*;
        matches!(self, Int | Uint | Int8 | Int16 | Int64 | Uint8 | Uint16 | Uint64)
    }

    pub fn is_floating(self) -> bool {
        use ScalarKind::*;
        matches!(self, Float | Double | Float16)
    }
}

/// Structural description of one canonical type.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDesc {
    Error,
    Void,
    Scalar(ScalarKind),
    /// Component kind and dimension (2..=4).
    Vector(ScalarKind, u8),
    /// Component kind (`Float` or `Double` only), rows, cols (2..=4).
    Matrix(ScalarKind, u8, u8),
    /// Element type and size; size 0 means runtime-sized.
    Array { element: TypeId, size: u32 },
    Struct(StructDesc),
    /// Samplers, images, atomics: named, no inner structure.
    Opaque(&'static str),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructDesc {
    /// Empty for anonymous structs.
    pub name: String,
    pub members: Vec<(String, TypeId)>,
    /// Back reference to the declaring AST node, used only for lookup.
    pub decl: NodeRef,
    pub member_lookup: FxHashMap<String, DeclView>,
}

#[derive(Debug, Clone)]
struct TypeEntry {
    desc: TypeDesc,
    name: String,
}

/// Owns every canonical type of a compilation.
///
/// Built-in types are interned eagerly so their ids are fixed; array types
/// are cached by `(element, size)`; struct types are created once per
/// declaration. A successor compilation clones the universe, keeping every
/// preamble `TypeId` valid.
#[derive(Debug, Clone)]
pub struct TypeUniverse {
    entries: Vec<TypeEntry>,
    array_cache: FxHashMap<(TypeId, u32), TypeId>,
    scalar_ids: FxHashMap<ScalarKind, TypeId>,
    vector_ids: FxHashMap<(ScalarKind, u8), TypeId>,
    matrix_ids: FxHashMap<(ScalarKind, u8, u8), TypeId>,
    opaque_ids: FxHashMap<&'static str, TypeId>,
    error_id: TypeId,
    void_id: TypeId,
}

impl TypeUniverse {
    pub fn new() -> Self {
        let mut universe = TypeUniverse {
            entries: Vec::new(),
            array_cache: FxHashMap::default(),
            scalar_ids: FxHashMap::default(),
            vector_ids: FxHashMap::default(),
            matrix_ids: FxHashMap::default(),
            opaque_ids: FxHashMap::default(),
            error_id: TypeId(0),
            void_id: TypeId(0),
        };

        universe.error_id = universe.push(TypeDesc::Error, "<error>".into());
        universe.void_id = universe.push(TypeDesc::Void, "void".into());

        use ScalarKind::*;
        for (kind, name) in [
            (Bool, "bool"),
            (Int, "int"),
            (Uint, "uint"),
            (Float, "float"),
            (Double, "double"),
            (Int8, "int8_t"),
            (Int16, "int16_t"),
            (Int64, "int64_t"),
            (Uint8, "uint8_t"),
            (Uint16, "uint16_t"),
            (Uint64, "uint64_t"),
            (Float16, "float16_t"),
        ] {
            let id = universe.push(TypeDesc::Scalar(kind), name.into());
            universe.scalar_ids.insert(kind, id);
        }

        for (kind, prefix) in [(Bool, "b"), (Int, "i"), (Uint, "u"), (Float, ""), (Double, "d")] {
            for dim in 2..=4u8 {
                let name = format!("{prefix}vec{dim}");
                let id = universe.push(TypeDesc::Vector(kind, dim), name);
                universe.vector_ids.insert((kind, dim), id);
            }
        }

        for (kind, prefix) in [(Float, ""), (Double, "d")] {
            for cols in 2..=4u8 {
                for rows in 2..=4u8 {
                    let name = if rows == cols {
                        format!("{prefix}mat{cols}")
                    } else {
                        format!("{prefix}mat{cols}x{rows}")
                    };
                    let id = universe.push(TypeDesc::Matrix(kind, rows, cols), name);
                    universe.matrix_ids.insert((kind, rows, cols), id);
                }
            }
        }

        for name in [
            "sampler1D",
            "sampler2D",
            "sampler3D",
            "samplerCube",
            "sampler2DShadow",
            "sampler2DArray",
            "samplerCubeArray",
            "isampler2D",
            "usampler2D",
            "image2D",
            "image3D",
            "atomic_uint",
        ] {
            let id = universe.push(TypeDesc::Opaque(name), name.into());
            universe.opaque_ids.insert(name, id);
        }

        universe
    }

    fn push(&mut self, desc: TypeDesc, name: String) -> TypeId {
        let id = TypeId(self.entries.len() as u32);
        self.entries.push(TypeEntry { desc, name });
        id
    }

    pub fn desc(&self, id: TypeId) -> &TypeDesc {
        &self.entries[id.index()].desc
    }

    pub fn name(&self, id: TypeId) -> &str {
        &self.entries[id.index()].name
    }

    pub fn error(&self) -> TypeId {
        self.error_id
    }

    pub fn void(&self) -> TypeId {
        self.void_id
    }

    pub fn scalar(&self, kind: ScalarKind) -> TypeId {
        self.scalar_ids[&kind]
    }

    pub fn bool_(&self) -> TypeId {
        self.scalar(ScalarKind::Bool)
    }

    pub fn int(&self) -> TypeId {
        self.scalar(ScalarKind::Int)
    }

    pub fn uint(&self) -> TypeId {
        self.scalar(ScalarKind::Uint)
    }

    pub fn float(&self) -> TypeId {
        self.scalar(ScalarKind::Float)
    }

    pub fn double(&self) -> TypeId {
        self.scalar(ScalarKind::Double)
    }

    pub fn vector(&self, kind: ScalarKind, dim: u8) -> TypeId {
        self.vector_ids.get(&(kind, dim)).copied().unwrap_or(self.error_id)
    }

    pub fn matrix(&self, kind: ScalarKind, rows: u8, cols: u8) -> TypeId {
        self.matrix_ids.get(&(kind, rows, cols)).copied().unwrap_or(self.error_id)
    }

    /// Scalar or vector of the given kind; dimension 1 yields the scalar.
    pub fn scalar_or_vector(&self, kind: ScalarKind, dim: u8) -> TypeId {
        if dim <= 1 {
            self.scalar(kind)
        } else {
            self.vector(kind, dim)
        }
    }

    /// The built-in type a type keyword names, if any.
    pub fn builtin(&self, kw: Kw) -> Option<TypeId> {
        use ScalarKind::*;
        let id = match kw {
            Kw::Void => self.void_id,
            Kw::Bool => self.scalar(Bool),
            Kw::Int => self.scalar(Int),
            Kw::Uint => self.scalar(Uint),
            Kw::Float => self.scalar(Float),
            Kw::Double => self.scalar(Double),
            Kw::Vec2 => self.vector(Float, 2),
            Kw::Vec3 => self.vector(Float, 3),
            Kw::Vec4 => self.vector(Float, 4),
            Kw::Bvec2 => self.vector(Bool, 2),
            Kw::Bvec3 => self.vector(Bool, 3),
            Kw::Bvec4 => self.vector(Bool, 4),
            Kw::Ivec2 => self.vector(Int, 2),
            Kw::Ivec3 => self.vector(Int, 3),
            Kw::Ivec4 => self.vector(Int, 4),
            Kw::Uvec2 => self.vector(Uint, 2),
            Kw::Uvec3 => self.vector(Uint, 3),
            Kw::Uvec4 => self.vector(Uint, 4),
            Kw::Dvec2 => self.vector(Double, 2),
            Kw::Dvec3 => self.vector(Double, 3),
            Kw::Dvec4 => self.vector(Double, 4),
            Kw::Mat2 | Kw::Mat2x2 => self.matrix(Float, 2, 2),
            Kw::Mat3 | Kw::Mat3x3 => self.matrix(Float, 3, 3),
            Kw::Mat4 | Kw::Mat4x4 => self.matrix(Float, 4, 4),
            Kw::Mat2x3 => self.matrix(Float, 3, 2),
            Kw::Mat2x4 => self.matrix(Float, 4, 2),
            Kw::Mat3x2 => self.matrix(Float, 2, 3),
            Kw::Mat3x4 => self.matrix(Float, 4, 3),
            Kw::Mat4x2 => self.matrix(Float, 2, 4),
            Kw::Mat4x3 => self.matrix(Float, 3, 4),
            Kw::Dmat2 => self.matrix(Double, 2, 2),
            Kw::Dmat3 => self.matrix(Double, 3, 3),
            Kw::Dmat4 => self.matrix(Double, 4, 4),
            Kw::Sampler1D
            | Kw::Sampler2D
            | Kw::Sampler3D
            | Kw::SamplerCube
            | Kw::Sampler2DShadow
            | Kw::Sampler2DArray
            | Kw::SamplerCubeArray
            | Kw::Isampler2D
            | Kw::Usampler2D
            | Kw::Image2D
            | Kw::Image3D
            | Kw::AtomicUint => self.opaque_ids[kw.spelling()],
            _ => return None,
        };
        Some(id)
    }

    /// Array over `element`; arrays over the error type collapse to error.
    pub fn array(&mut self, element: TypeId, size: u32) -> TypeId {
        if element == self.error_id {
            return self.error_id;
        }

        if let Some(&cached) = self.array_cache.get(&(element, size)) {
            return cached;
        }

        let name = if size == 0 {
            format!("{}[]", self.name(element))
        } else {
            format!("{}[{}]", self.name(element), size)
        };
        let id = self.push(TypeDesc::Array { element, size }, name);
        self.array_cache.insert((element, size), id);
        id
    }

    /// Struct types are never deduplicated; identity is per declaration.
    pub fn declare_struct(&mut self, desc: StructDesc) -> TypeId {
        let name = if desc.name.is_empty() {
            "struct <anonymous>".to_string()
        } else {
            format!("struct {}", desc.name)
        };
        self.push(TypeDesc::Struct(desc), name)
    }

    pub fn is_error(&self, id: TypeId) -> bool {
        id == self.error_id
    }

    pub fn struct_desc(&self, id: TypeId) -> Option<&StructDesc> {
        match self.desc(id) {
            TypeDesc::Struct(desc) => Some(desc),
            _ => None,
        }
    }

    pub fn is_same(&self, a: TypeId, b: TypeId) -> bool {
        if a == b {
            return true;
        }
        // Arrays instantiated by different units can be structurally equal
        // without sharing an id.
        match (self.desc(a), self.desc(b)) {
            (
                TypeDesc::Array { element: ea, size: sa },
                TypeDesc::Array { element: eb, size: sb },
            ) => sa == sb && self.is_same(*ea, *eb),
            _ => false,
        }
    }

    /// Implicit convertibility. The error type is the bottom type and
    /// converts to everything.
    pub fn is_convertible_to(&self, from: TypeId, to: TypeId) -> bool {
        if self.is_same(from, to) || self.is_error(from) {
            return true;
        }

        match (self.desc(from), self.desc(to)) {
            (TypeDesc::Scalar(f), TypeDesc::Scalar(t)) => {
                is_scalar_promotion(*f, *t) || is_scalar_conversion(*f, *t)
            }
            (TypeDesc::Vector(f, fd), TypeDesc::Vector(t, td)) => {
                fd == td && (is_scalar_promotion(*f, *t) || is_scalar_conversion(*f, *t))
            }
            (TypeDesc::Matrix(f, fr, fc), TypeDesc::Matrix(t, tr, tc)) => {
                fr == tr && fc == tc && (is_scalar_promotion(*f, *t) || is_scalar_conversion(*f, *t))
            }
            _ => false,
        }
    }

    /// Whether converting `from` to `lhs_to` beats converting it to
    /// `rhs_to`. Assumes `from` is convertible to both.
    pub fn has_better_conversion(&self, from: TypeId, lhs_to: TypeId, rhs_to: TypeId) -> bool {
        if self.is_error(from) {
            return false;
        }

        let scalar_triple = match (self.desc(from), self.desc(lhs_to), self.desc(rhs_to)) {
            (TypeDesc::Scalar(f), TypeDesc::Scalar(l), TypeDesc::Scalar(r)) => Some((*f, *l, *r)),
            (TypeDesc::Vector(f, fd), TypeDesc::Vector(l, ld), TypeDesc::Vector(r, rd))
                if fd == ld && fd == rd =>
            {
                Some((*f, *l, *r))
            }
            (
                TypeDesc::Matrix(f, fr, fc),
                TypeDesc::Matrix(l, lr, lc),
                TypeDesc::Matrix(r, rr, rc),
            ) if fr == lr && fc == lc && fr == rr && fc == rc => Some((*f, *l, *r)),
            _ => None,
        };

        if let Some((f, l, r)) = scalar_triple {
            has_better_scalar_conversion(f, l, r)
        } else if self.is_same(from, lhs_to) {
            !self.is_same(from, rhs_to)
        } else {
            false
        }
    }
}

impl Default for TypeUniverse {
    fn default() -> Self {
        Self::new()
    }
}

pub fn is_integral_promotion(from: ScalarKind, to: ScalarKind) -> bool {
    use ScalarKind::*;
    to == Int && matches!(from, Int8 | Int16 | Uint8 | Uint16)
}

pub fn is_fp_promotion(from: ScalarKind, to: ScalarKind) -> bool {
    use ScalarKind::*;
    to == Double && matches!(from, Float16 | Float)
}

pub fn is_scalar_promotion(from: ScalarKind, to: ScalarKind) -> bool {
    is_integral_promotion(from, to) || is_fp_promotion(from, to)
}

pub fn is_integral_conversion(from: ScalarKind, to: ScalarKind) -> bool {
    use ScalarKind::*;
    match from {
        Int => matches!(to, Uint | Int64 | Uint64),
        Uint => matches!(to, Int64 | Uint64),
        Int8 => matches!(to, Uint8 | Int16 | Uint16 | Uint | Int64 | Uint64),
        Int16 => matches!(to, Uint16 | Uint | Int64 | Uint64),
        Int64 => matches!(to, Uint64),
        Uint8 => matches!(to, Int16 | Uint16 | Uint | Int64 | Uint64),
        Uint16 => matches!(to, Uint | Int64 | Uint64),
        _ => false,
    }
}

pub fn is_fp_conversion(from: ScalarKind, to: ScalarKind) -> bool {
    use ScalarKind::*;
    from == Float16 && to == Float
}

pub fn is_fp_integral_conversion(from: ScalarKind, to: ScalarKind) -> bool {
    use ScalarKind::*;
    match from {
        Int | Uint => matches!(to, Float | Double),
        Int8 | Uint8 | Int16 | Uint16 => matches!(to, Float16 | Float | Double),
        _ => false,
    }
}

pub fn is_scalar_conversion(from: ScalarKind, to: ScalarKind) -> bool {
    is_integral_conversion(from, to) || is_fp_conversion(from, to) || is_fp_integral_conversion(from, to)
}

/// Conversion preference rank; lower is better. `None` if not convertible.
fn conversion_rank(from: ScalarKind, to: ScalarKind) -> Option<u8> {
    if from == to {
        Some(0)
    } else if is_integral_promotion(from, to) {
        Some(1)
    } else if is_fp_promotion(from, to) {
        Some(2)
    } else if is_integral_conversion(from, to) {
        Some(3)
    } else if is_fp_conversion(from, to) {
        Some(4)
    } else if is_fp_integral_conversion(from, to) {
        Some(5)
    } else {
        None
    }
}

/// Asymmetric comparison of two conversions out of the same source kind.
pub fn has_better_scalar_conversion(from: ScalarKind, lhs_to: ScalarKind, rhs_to: ScalarKind) -> bool {
    let (Some(lhs), Some(rhs)) = (conversion_rank(from, lhs_to), conversion_rank(from, rhs_to)) else {
        return false;
    };

    if lhs != rhs {
        return lhs < rhs;
    }

    // Within FP-integral conversions float beats double.
    lhs == 5 && lhs_to == ScalarKind::Float && rhs_to != ScalarKind::Float
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_ids_are_stable_across_calls() {
        let universe = TypeUniverse::new();
        assert_eq!(universe.float(), universe.scalar(ScalarKind::Float));
        assert_eq!(universe.vector(ScalarKind::Float, 3), universe.builtin(Kw::Vec3).unwrap());
    }

    #[test]
    fn array_types_are_cached_by_element_and_size() {
        let mut universe = TypeUniverse::new();
        let float = universe.float();
        let a = universe.array(float, 4);
        let b = universe.array(float, 4);
        let c = universe.array(float, 3);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(universe.name(a), "float[4]");
    }

    #[test]
    fn runtime_sized_array_renders_empty_brackets() {
        let mut universe = TypeUniverse::new();
        let int = universe.int();
        let a = universe.array(int, 0);
        assert_eq!(universe.name(a), "int[]");
    }

    #[test]
    fn array_of_error_is_error() {
        let mut universe = TypeUniverse::new();
        let err = universe.error();
        assert_eq!(universe.array(err, 3), err);
    }

    #[test]
    fn error_converts_to_everything() {
        let universe = TypeUniverse::new();
        assert!(universe.is_convertible_to(universe.error(), universe.float()));
        assert!(universe.is_convertible_to(universe.error(), universe.bool_()));
    }

    #[test]
    fn int_converts_to_float_and_uint_but_not_bool() {
        let universe = TypeUniverse::new();
        let int = universe.int();
        assert!(universe.is_convertible_to(int, universe.float()));
        assert!(universe.is_convertible_to(int, universe.uint()));
        assert!(universe.is_convertible_to(int, universe.double()));
        assert!(!universe.is_convertible_to(int, universe.bool_()));
        assert!(!universe.is_convertible_to(universe.float(), int));
    }

    #[test]
    fn vector_conversion_requires_matching_dimension() {
        let universe = TypeUniverse::new();
        let ivec3 = universe.vector(ScalarKind::Int, 3);
        let vec3 = universe.vector(ScalarKind::Float, 3);
        let vec4 = universe.vector(ScalarKind::Float, 4);
        assert!(universe.is_convertible_to(ivec3, vec3));
        assert!(!universe.is_convertible_to(ivec3, vec4));
    }

    #[test]
    fn exact_match_beats_any_conversion() {
        use ScalarKind::*;
        assert!(has_better_scalar_conversion(Int, Int, Float));
        assert!(!has_better_scalar_conversion(Int, Float, Int));
        assert!(!has_better_scalar_conversion(Int, Int, Int));
    }

    #[test]
    fn uint_conversion_beats_fp_conversion_for_int() {
        use ScalarKind::*;
        // int -> uint is an integral conversion, int -> float crosses the
        // FP-integral boundary.
        assert!(has_better_scalar_conversion(Int, Uint, Float));
        assert!(!has_better_scalar_conversion(Int, Float, Uint));
    }

    #[test]
    fn float_beats_double_among_fp_integral_conversions() {
        use ScalarKind::*;
        assert!(has_better_scalar_conversion(Int, Float, Double));
        assert!(!has_better_scalar_conversion(Int, Double, Float));
    }

    #[test]
    fn promotion_beats_conversion() {
        use ScalarKind::*;
        // int16 -> int is a promotion, int16 -> uint a conversion.
        assert!(has_better_scalar_conversion(Int16, Int, Uint));
        assert!(!has_better_scalar_conversion(Int16, Uint, Int));
    }

    #[test]
    fn cloned_universe_preserves_type_ids() {
        let mut universe = TypeUniverse::new();
        let arr = universe.array(universe.float(), 2);
        let mut clone = universe.clone();
        assert_eq!(clone.array(clone.float(), 2), arr);
        assert_eq!(clone.name(arr), "float[2]");
    }
}
