use std::fmt::Write;

use crate::config::{LanguageConfig, ShaderStage};

/// GLSL source of the built-in declarations for one language configuration.
///
/// This is compiled as the system preamble through the ordinary pipeline,
/// so built-ins resolve exactly like user declarations. The set is a
/// practical core: the common `genType` intrinsics expanded over float
/// scalar/vector shapes, the geometry helpers, and the per-stage globals.
pub fn system_preamble_source(config: &LanguageConfig) -> String {
    let mut out = String::new();

    let gen_types = ["float", "vec2", "vec3", "vec4"];
    let vec_types = ["vec2", "vec3", "vec4"];

    // Angle, trigonometry, exponential.
    for name in [
        "radians", "degrees", "sin", "cos", "tan", "asin", "acos", "atan", "sinh", "cosh",
        "tanh", "exp", "log", "exp2", "log2", "sqrt", "inversesqrt", "abs", "sign", "floor",
        "ceil", "fract", "trunc", "round", "normalize",
    ] {
        for ty in gen_types {
            let _ = writeln!(out, "{ty} {name}({ty} x);");
        }
    }

    for name in ["pow", "mod", "min", "max", "step", "atan", "reflect", "distance"] {
        for ty in gen_types {
            let _ = writeln!(out, "{ty} {name}({ty} x, {ty} y);");
        }
    }

    // Scalar-tail forms of the common helpers.
    for name in ["min", "max", "mod", "step"] {
        for ty in vec_types {
            let _ = writeln!(out, "{ty} {name}({ty} x, float y);");
        }
    }

    for ty in gen_types {
        let _ = writeln!(out, "{ty} clamp({ty} x, {ty} lo, {ty} hi);");
        let _ = writeln!(out, "{ty} mix({ty} x, {ty} y, {ty} a);");
        let _ = writeln!(out, "{ty} smoothstep({ty} lo, {ty} hi, {ty} x);");
        let _ = writeln!(out, "{ty} fma({ty} a, {ty} b, {ty} c);");
    }
    for ty in vec_types {
        let _ = writeln!(out, "{ty} clamp({ty} x, float lo, float hi);");
        let _ = writeln!(out, "{ty} mix({ty} x, {ty} y, float a);");
    }

    // Integer forms of abs/sign/min/max/clamp.
    for ty in ["int", "ivec2", "ivec3", "ivec4"] {
        let _ = writeln!(out, "{ty} abs({ty} x);");
        let _ = writeln!(out, "{ty} sign({ty} x);");
        let _ = writeln!(out, "{ty} min({ty} x, {ty} y);");
        let _ = writeln!(out, "{ty} max({ty} x, {ty} y);");
        let _ = writeln!(out, "{ty} clamp({ty} x, {ty} lo, {ty} hi);");
    }

    // Geometry.
    for ty in gen_types {
        let _ = writeln!(out, "float length({ty} x);");
    }
    for ty in vec_types {
        let _ = writeln!(out, "float dot({ty} x, {ty} y);");
    }
    let _ = writeln!(out, "vec3 cross(vec3 x, vec3 y);");
    let _ = writeln!(out, "vec4 texture(sampler2D s, vec2 uv);");
    let _ = writeln!(out, "vec4 texture(samplerCube s, vec3 dir);");
    let _ = writeln!(out, "vec4 texelFetch(sampler2D s, ivec2 uv, int lod);");
    let _ = writeln!(out, "ivec2 textureSize(sampler2D s, int lod);");

    // Matrix helpers.
    for ty in ["mat2", "mat3", "mat4"] {
        let _ = writeln!(out, "{ty} inverse({ty} m);");
        let _ = writeln!(out, "{ty} transpose({ty} m);");
        let _ = writeln!(out, "float determinant({ty} m);");
    }

    // Pack/bit helpers used pervasively in modern shaders.
    let _ = writeln!(out, "uint packHalf2x16(vec2 v);");
    let _ = writeln!(out, "vec2 unpackHalf2x16(uint v);");
    let _ = writeln!(out, "int floatBitsToInt(float v);");
    let _ = writeln!(out, "uint floatBitsToUint(float v);");
    let _ = writeln!(out, "float intBitsToFloat(int v);");
    let _ = writeln!(out, "float uintBitsToFloat(uint v);");

    write_stage_globals(&mut out, config.stage);

    out
}

fn write_stage_globals(out: &mut String, stage: ShaderStage) {
    match stage {
        ShaderStage::Vertex => {
            let _ = writeln!(out, "out vec4 gl_Position;");
            let _ = writeln!(out, "out float gl_PointSize;");
            let _ = writeln!(out, "in int gl_VertexID;");
            let _ = writeln!(out, "in int gl_InstanceID;");
        }
        ShaderStage::Fragment => {
            let _ = writeln!(out, "in vec4 gl_FragCoord;");
            let _ = writeln!(out, "in bool gl_FrontFacing;");
            let _ = writeln!(out, "in vec2 gl_PointCoord;");
            let _ = writeln!(out, "out float gl_FragDepth;");
        }
        ShaderStage::Compute => {
            let _ = writeln!(out, "in uvec3 gl_NumWorkGroups;");
            let _ = writeln!(out, "in uvec3 gl_WorkGroupID;");
            let _ = writeln!(out, "in uvec3 gl_LocalInvocationID;");
            let _ = writeln!(out, "in uvec3 gl_GlobalInvocationID;");
            let _ = writeln!(out, "in uint gl_LocalInvocationIndex;");
        }
        ShaderStage::Geometry => {
            let _ = writeln!(out, "out vec4 gl_Position;");
            let _ = writeln!(out, "in int gl_PrimitiveIDIn;");
            let _ = writeln!(out, "out int gl_Layer;");
        }
        ShaderStage::TessControl | ShaderStage::TessEvaluation => {
            let _ = writeln!(out, "in int gl_PatchVerticesIn;");
            let _ = writeln!(out, "in int gl_PrimitiveID;");
            let _ = writeln!(out, "in vec3 gl_TessCoord;");
        }
        _ => {
            // Stages without a curated global set still get the universal
            // position output so most shaders resolve.
            let _ = writeln!(out, "out vec4 gl_Position;");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GlslVersion;

    fn config(stage: ShaderStage) -> LanguageConfig {
        LanguageConfig { version: GlslVersion::Ver450, stage, ..Default::default() }
    }

    #[test]
    fn preamble_declares_overload_families() {
        let src = system_preamble_source(&config(ShaderStage::Fragment));
        assert!(src.contains("float sin(float x);"));
        assert!(src.contains("vec4 sin(vec4 x);"));
        assert!(src.contains("vec3 cross(vec3 x, vec3 y);"));
        assert!(src.contains("float dot(vec3 x, vec3 y);"));
    }

    #[test]
    fn stage_globals_differ() {
        let vertex = system_preamble_source(&config(ShaderStage::Vertex));
        let fragment = system_preamble_source(&config(ShaderStage::Fragment));
        assert!(vertex.contains("gl_Position"));
        assert!(!vertex.contains("gl_FragCoord"));
        assert!(fragment.contains("gl_FragCoord"));
    }

    #[test]
    fn preamble_is_deterministic() {
        let a = system_preamble_source(&config(ShaderStage::Compute));
        let b = system_preamble_source(&config(ShaderStage::Compute));
        assert_eq!(a, b);
    }
}
