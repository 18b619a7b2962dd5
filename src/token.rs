use once_cell::sync::Lazy;

use crate::atom::Atom;
use crate::source::{FileId, TextRange, UnitId};

macro_rules! declare_keywords {
    ($($variant:ident => $spelling:literal),+ $(,)?) => {
        /// GLSL keywords. The tokenizer produces plain identifiers; the lex
        /// context re-kinds them by atom lookup when appending.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Kw {
            $($variant),+
        }

        impl Kw {
            pub fn spelling(self) -> &'static str {
                match self {
                    $(Kw::$variant => $spelling),+
                }
            }
        }

        /// Every keyword, in the order the atom table preloads them.
        pub const ALL_KEYWORDS: &[Kw] = &[$(Kw::$variant),+];
    };
}

declare_keywords! {
    // Structure and control flow
    Struct => "struct",
    If => "if",
    Else => "else",
    Switch => "switch",
    Case => "case",
    Default => "default",
    For => "for",
    While => "while",
    Do => "do",
    Break => "break",
    Continue => "continue",
    Return => "return",
    Discard => "discard",
    True => "true",
    False => "false",

    // Qualifiers
    Const => "const",
    Uniform => "uniform",
    Buffer => "buffer",
    Shared => "shared",
    Attribute => "attribute",
    Varying => "varying",
    In => "in",
    Out => "out",
    Inout => "inout",
    Layout => "layout",
    Precision => "precision",
    Highp => "highp",
    Mediump => "mediump",
    Lowp => "lowp",
    Centroid => "centroid",
    Sample => "sample",
    Patch => "patch",
    Flat => "flat",
    Smooth => "smooth",
    Noperspective => "noperspective",
    Invariant => "invariant",
    Precise => "precise",
    Coherent => "coherent",
    Volatile => "volatile",
    Restrict => "restrict",
    Readonly => "readonly",
    Writeonly => "writeonly",

    // Transparent types
    Void => "void",
    Bool => "bool",
    Int => "int",
    Uint => "uint",
    Float => "float",
    Double => "double",
    Vec2 => "vec2",
    Vec3 => "vec3",
    Vec4 => "vec4",
    Bvec2 => "bvec2",
    Bvec3 => "bvec3",
    Bvec4 => "bvec4",
    Ivec2 => "ivec2",
    Ivec3 => "ivec3",
    Ivec4 => "ivec4",
    Uvec2 => "uvec2",
    Uvec3 => "uvec3",
    Uvec4 => "uvec4",
    Dvec2 => "dvec2",
    Dvec3 => "dvec3",
    Dvec4 => "dvec4",
    Mat2 => "mat2",
    Mat3 => "mat3",
    Mat4 => "mat4",
    Mat2x2 => "mat2x2",
    Mat2x3 => "mat2x3",
    Mat2x4 => "mat2x4",
    Mat3x2 => "mat3x2",
    Mat3x3 => "mat3x3",
    Mat3x4 => "mat3x4",
    Mat4x2 => "mat4x2",
    Mat4x3 => "mat4x3",
    Mat4x4 => "mat4x4",
    Dmat2 => "dmat2",
    Dmat3 => "dmat3",
    Dmat4 => "dmat4",

    // Opaque types
    Sampler1D => "sampler1D",
    Sampler2D => "sampler2D",
    Sampler3D => "sampler3D",
    SamplerCube => "samplerCube",
    Sampler2DShadow => "sampler2DShadow",
    Sampler2DArray => "sampler2DArray",
    SamplerCubeArray => "samplerCubeArray",
    Isampler2D => "isampler2D",
    Usampler2D => "usampler2D",
    Image2D => "image2D",
    Image3D => "image3D",
    AtomicUint => "atomic_uint",
}

impl Kw {
    /// True for keywords that name a type (transparent or opaque).
    pub fn is_type_name(self) -> bool {
        use Kw::*;
        matches!(
            self,
            Void | Bool
                | Int
                | Uint
                | Float
                | Double
                | Vec2
                | Vec3
                | Vec4
                | Bvec2
                | Bvec3
                | Bvec4
                | Ivec2
                | Ivec3
                | Ivec4
                | Uvec2
                | Uvec3
                | Uvec4
                | Dvec2
                | Dvec3
                | Dvec4
                | Mat2
                | Mat3
                | Mat4
                | Mat2x2
                | Mat2x3
                | Mat2x4
                | Mat3x2
                | Mat3x3
                | Mat3x4
                | Mat4x2
                | Mat4x3
                | Mat4x4
                | Dmat2
                | Dmat3
                | Dmat4
                | Sampler1D
                | Sampler2D
                | Sampler3D
                | SamplerCube
                | Sampler2DShadow
                | Sampler2DArray
                | SamplerCubeArray
                | Isampler2D
                | Usampler2D
                | Image2D
                | Image3D
                | AtomicUint
        )
    }

    pub fn is_qualifier(self) -> bool {
        use Kw::*;
        matches!(
            self,
            Const
                | Uniform
                | Buffer
                | Shared
                | Attribute
                | Varying
                | In
                | Out
                | Inout
                | Layout
                | Highp
                | Mediump
                | Lowp
                | Centroid
                | Sample
                | Patch
                | Flat
                | Smooth
                | Noperspective
                | Invariant
                | Precise
                | Coherent
                | Volatile
                | Restrict
                | Readonly
                | Writeonly
        )
    }
}

/// Category of a lexed token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Keyword(Kw),
    Identifier,
    IntConst,
    FloatConst,
    QuotedString,
    AngleString,
    Comment,
    Hash,
    HashHash,

    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Dot,
    Comma,
    Colon,
    Semi,
    Question,
    Bang,
    Tilde,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    LAngle,
    RAngle,
    LShift,
    RShift,
    LessEq,
    GreaterEq,
    EqEq,
    NotEq,
    Amp,
    Caret,
    Pipe,
    AmpAmp,
    CaretCaret,
    PipePipe,
    Increment,
    Decrement,
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    ModAssign,
    LShiftAssign,
    RShiftAssign,
    AndAssign,
    XorAssign,
    OrAssign,

    Eof,
    Error,
}

impl TokenKind {
    pub fn is_keyword(self) -> bool {
        matches!(self, TokenKind::Keyword(_))
    }

    pub fn keyword(self) -> Option<Kw> {
        match self {
            TokenKind::Keyword(kw) => Some(kw),
            _ => None,
        }
    }
}

/// Punctuator spellings ordered longest-first so the tokenizer can take the
/// maximal munch by scanning the table in order.
pub static PUNCTUATORS: Lazy<Vec<(&'static str, TokenKind)>> = Lazy::new(|| {
    let mut table = vec![
        ("<<=", TokenKind::LShiftAssign),
        (">>=", TokenKind::RShiftAssign),
        ("<<", TokenKind::LShift),
        (">>", TokenKind::RShift),
        ("<=", TokenKind::LessEq),
        (">=", TokenKind::GreaterEq),
        ("==", TokenKind::EqEq),
        ("!=", TokenKind::NotEq),
        ("&&", TokenKind::AmpAmp),
        ("^^", TokenKind::CaretCaret),
        ("||", TokenKind::PipePipe),
        ("++", TokenKind::Increment),
        ("--", TokenKind::Decrement),
        ("+=", TokenKind::AddAssign),
        ("-=", TokenKind::SubAssign),
        ("*=", TokenKind::MulAssign),
        ("/=", TokenKind::DivAssign),
        ("%=", TokenKind::ModAssign),
        ("&=", TokenKind::AndAssign),
        ("^=", TokenKind::XorAssign),
        ("|=", TokenKind::OrAssign),
        ("##", TokenKind::HashHash),
        ("(", TokenKind::LParen),
        (")", TokenKind::RParen),
        ("[", TokenKind::LBracket),
        ("]", TokenKind::RBracket),
        ("{", TokenKind::LBrace),
        ("}", TokenKind::RBrace),
        (".", TokenKind::Dot),
        (",", TokenKind::Comma),
        (":", TokenKind::Colon),
        (";", TokenKind::Semi),
        ("?", TokenKind::Question),
        ("!", TokenKind::Bang),
        ("~", TokenKind::Tilde),
        ("+", TokenKind::Plus),
        ("-", TokenKind::Minus),
        ("*", TokenKind::Star),
        ("/", TokenKind::Slash),
        ("%", TokenKind::Percent),
        ("<", TokenKind::LAngle),
        (">", TokenKind::RAngle),
        ("&", TokenKind::Amp),
        ("^", TokenKind::Caret),
        ("|", TokenKind::Pipe),
        ("=", TokenKind::Assign),
        ("#", TokenKind::Hash),
    ];
    table.sort_by_key(|(s, _)| std::cmp::Reverse(s.len()));
    table
});

/// Pre-expansion token carrying only spelled location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PPToken {
    pub kind: TokenKind,
    pub spelled_file: FileId,
    pub spelled_range: TextRange,
    pub text: Atom,
    pub first_of_line: bool,
    pub leading_ws: bool,
}

impl PPToken {
    pub fn is_identifier(&self) -> bool {
        self.kind == TokenKind::Identifier
    }
}

/// Post-expansion token stored in the lex context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSyntaxToken {
    pub kind: TokenKind,
    pub spelled_file: FileId,
    pub spelled_range: TextRange,
    pub expanded_range: TextRange,
    pub text: Atom,
}

/// Identifies one token of one translation unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenId {
    pub unit: UnitId,
    pub index: u32,
}

impl TokenId {
    pub fn new(unit: UnitId, index: u32) -> Self {
        Self { unit, index }
    }
}

/// Half-open token range `[begin, end)` within one translation unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyntaxRange {
    pub unit: UnitId,
    pub begin: u32,
    pub end: u32,
}

impl SyntaxRange {
    pub fn new(begin: TokenId, end: TokenId) -> Self {
        debug_assert_eq!(begin.unit, end.unit);
        debug_assert!(begin.index <= end.index);
        Self { unit: begin.unit, begin: begin.index, end: end.index }
    }

    pub fn empty_at(tok: TokenId) -> Self {
        Self { unit: tok.unit, begin: tok.index, end: tok.index }
    }

    pub fn begin_id(&self) -> TokenId {
        TokenId::new(self.unit, self.begin)
    }

    pub fn end_id(&self) -> TokenId {
        TokenId::new(self.unit, self.end)
    }

    /// The last token of a non-empty range.
    pub fn back_id(&self) -> TokenId {
        debug_assert!(!self.is_empty());
        TokenId::new(self.unit, self.end - 1)
    }

    pub fn is_empty(&self) -> bool {
        self.begin == self.end
    }

    pub fn token_count(&self) -> u32 {
        self.end - self.begin
    }

    pub fn iter(&self) -> impl Iterator<Item = TokenId> + '_ {
        let unit = self.unit;
        (self.begin..self.end).map(move |i| TokenId::new(unit, i))
    }

    pub fn contains_token(&self, id: TokenId) -> bool {
        id.unit == self.unit && self.begin <= id.index && id.index < self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn punctuator_table_is_longest_first() {
        let lens: Vec<usize> = PUNCTUATORS.iter().map(|(s, _)| s.len()).collect();
        let mut sorted = lens.clone();
        sorted.sort_by_key(|&l| std::cmp::Reverse(l));
        assert_eq!(lens, sorted);
    }

    #[test]
    fn keyword_spellings_round_trip() {
        for &kw in ALL_KEYWORDS {
            assert!(!kw.spelling().is_empty());
        }
        assert_eq!(Kw::Mat3x4.spelling(), "mat3x4");
    }

    #[test]
    fn type_and_qualifier_keywords_are_disjoint() {
        for &kw in ALL_KEYWORDS {
            assert!(!(kw.is_type_name() && kw.is_qualifier()), "{:?}", kw);
        }
    }

    #[test]
    fn syntax_range_iterates_its_token_ids() {
        let range = SyntaxRange {
            unit: UnitId::UserFile,
            begin: 2,
            end: 5,
        };
        let ids: Vec<u32> = range.iter().map(|id| id.index).collect();
        assert_eq!(ids, vec![2, 3, 4]);
        assert_eq!(range.token_count(), 3);
        assert_eq!(range.back_id().index, 4);
    }

    #[test]
    fn empty_syntax_range_contains_nothing() {
        let range = SyntaxRange::empty_at(TokenId::new(UnitId::UserFile, 7));
        assert!(range.is_empty());
        assert!(!range.contains_token(TokenId::new(UnitId::UserFile, 7)));
    }
}
