use std::hash::{Hash, Hasher};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// GLSL language versions the front-end accepts in `#version`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GlslVersion {
    Ver110,
    Ver120,
    Ver130,
    Ver140,
    Ver150,
    Ver300,
    Ver310,
    Ver320,
    Ver330,
    Ver400,
    Ver410,
    Ver420,
    Ver430,
    Ver440,
    Ver450,
    Ver460,
}

impl GlslVersion {
    pub fn number(self) -> u32 {
        use GlslVersion::*;
        match self {
            Ver110 => 110,
            Ver120 => 120,
            Ver130 => 130,
            Ver140 => 140,
            Ver150 => 150,
            Ver300 => 300,
            Ver310 => 310,
            Ver320 => 320,
            Ver330 => 330,
            Ver400 => 400,
            Ver410 => 410,
            Ver420 => 420,
            Ver430 => 430,
            Ver440 => 440,
            Ver450 => 450,
            Ver460 => 460,
        }
    }

    pub fn from_number(number: u32) -> Option<Self> {
        use GlslVersion::*;
        Some(match number {
            110 => Ver110,
            120 => Ver120,
            130 => Ver130,
            140 => Ver140,
            150 => Ver150,
            300 => Ver300,
            310 => Ver310,
            320 => Ver320,
            330 => Ver330,
            400 => Ver400,
            410 => Ver410,
            420 => Ver420,
            430 => Ver430,
            440 => Ver440,
            450 => Ver450,
            460 => Ver460,
            _ => return None,
        })
    }
}

impl Default for GlslVersion {
    fn default() -> Self {
        GlslVersion::Ver460
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GlslProfile {
    #[default]
    Core,
    Compatibility,
    Es,
}

impl GlslProfile {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "core" => Some(GlslProfile::Core),
            "compatibility" => Some(GlslProfile::Compatibility),
            "es" => Some(GlslProfile::Es),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ShaderStage {
    #[default]
    Unknown,
    Vertex,
    Fragment,
    Geometry,
    TessControl,
    TessEvaluation,
    Compute,
    RayGen,
    Intersect,
    AnyHit,
    ClosestHit,
    Miss,
    Callable,
    Task,
    Mesh,
}

macro_rules! declare_extensions {
    ($($variant:ident => $name:literal),+ $(,)?) => {
        /// Extensions the front-end knows by name in `#extension`.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum Extension {
            $($variant),+
        }

        impl Extension {
            pub fn name(self) -> &'static str {
                match self {
                    $(Extension::$variant => $name),+
                }
            }

            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $($name => Some(Extension::$variant),)+
                    _ => None,
                }
            }

            const ALL: &'static [Extension] = &[$(Extension::$variant),+];
        }
    };
}

declare_extensions! {
    GoogleIncludeDirective => "GL_GOOGLE_include_directive",
    ArbShadingLanguage420pack => "GL_ARB_shading_language_420pack",
    ExtScalarBlockLayout => "GL_EXT_scalar_block_layout",
    ExtNonuniformQualifier => "GL_EXT_nonuniform_qualifier",
    ExtBufferReference => "GL_EXT_buffer_reference",
    ExtRayTracing => "GL_EXT_ray_tracing",
    ExtRayQuery => "GL_EXT_ray_query",
    ExtMeshShader => "GL_EXT_mesh_shader",
    KhrShaderSubgroup => "GL_KHR_shader_subgroup",
    ExtShaderExplicitArithmeticTypes => "GL_EXT_shader_explicit_arithmetic_types",
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExtensionBehavior {
    Require,
    Enable,
    Warn,
    Disable,
}

impl ExtensionBehavior {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "require" => Some(ExtensionBehavior::Require),
            "enable" => Some(ExtensionBehavior::Enable),
            "warn" => Some(ExtensionBehavior::Warn),
            "disable" => Some(ExtensionBehavior::Disable),
            _ => None,
        }
    }
}

/// Which known extensions are enabled, as a bitset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ExtensionSet(u64);

impl ExtensionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enable(&mut self, ext: Extension) {
        self.0 |= 1 << ext as u64;
    }

    pub fn disable(&mut self, ext: Extension) {
        self.0 &= !(1 << ext as u64);
    }

    pub fn is_enabled(&self, ext: Extension) -> bool {
        self.0 & (1 << ext as u64) != 0
    }

    pub fn apply(&mut self, ext: Extension, behavior: ExtensionBehavior) {
        match behavior {
            ExtensionBehavior::Require | ExtensionBehavior::Enable | ExtensionBehavior::Warn => {
                self.enable(ext)
            }
            ExtensionBehavior::Disable => self.disable(ext),
        }
    }

    pub fn iter_enabled(&self) -> impl Iterator<Item = Extension> + '_ {
        Extension::ALL.iter().copied().filter(|&e| self.is_enabled(e))
    }
}

/// Everything that shapes the meaning of a compiled translation unit. Forms
/// the cache key for precompiled preambles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct LanguageConfig {
    pub version: GlslVersion,
    pub profile: GlslProfile,
    pub stage: ShaderStage,
    pub extensions: ExtensionSet,
    pub no_stdlib: bool,
}

impl LanguageConfig {
    pub fn hash_code(&self) -> u64 {
        let mut hasher = rustc_hash::FxHasher::default();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

/// Per-invocation knobs that do not affect preamble reuse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilerConfig {
    pub include_paths: Vec<PathBuf>,
    /// Command-line style definitions, `NAME` or `NAME=VALUE`.
    pub defines: Vec<String>,
    pub max_include_depth: usize,
    /// Count columns in UTF-16 code units, as LSP clients usually request.
    pub count_utf16: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            include_paths: Vec::new(),
            defines: Vec::new(),
            max_include_depth: 32,
            count_utf16: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_numbers_round_trip() {
        assert_eq!(GlslVersion::from_number(450), Some(GlslVersion::Ver450));
        assert_eq!(GlslVersion::Ver450.number(), 450);
        assert_eq!(GlslVersion::from_number(123), None);
    }

    #[test]
    fn extension_set_bit_operations() {
        let mut set = ExtensionSet::new();
        assert!(!set.is_enabled(Extension::ExtRayTracing));
        set.enable(Extension::ExtRayTracing);
        assert!(set.is_enabled(Extension::ExtRayTracing));
        set.apply(Extension::ExtRayTracing, ExtensionBehavior::Disable);
        assert!(!set.is_enabled(Extension::ExtRayTracing));
    }

    #[test]
    fn extension_names_round_trip() {
        assert_eq!(Extension::from_name("GL_EXT_mesh_shader"), Some(Extension::ExtMeshShader));
        assert_eq!(Extension::ExtMeshShader.name(), "GL_EXT_mesh_shader");
        assert_eq!(Extension::from_name("GL_FAKE"), None);
    }

    #[test]
    fn language_config_hash_distinguishes_versions() {
        let a = LanguageConfig { version: GlslVersion::Ver450, ..Default::default() };
        let b = LanguageConfig { version: GlslVersion::Ver460, ..Default::default() };
        assert_ne!(a.hash_code(), b.hash_code());
        assert_eq!(a.hash_code(), a.hash_code());
    }

    #[test]
    fn profile_parsing() {
        assert_eq!(GlslProfile::from_name("core"), Some(GlslProfile::Core));
        assert_eq!(GlslProfile::from_name("es"), Some(GlslProfile::Es));
        assert_eq!(GlslProfile::from_name("banana"), None);
    }
}
