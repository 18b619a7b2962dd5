mod common;

use common::error_messages;
use glslfe::{
    CancellationToken, Compiler, CompilerConfig, GlslVersion, LanguageConfig, MemoryFileSystem,
    PreambleCache, ShaderStage,
};

fn compiler(stage: ShaderStage) -> Compiler {
    let lang = LanguageConfig { version: GlslVersion::Ver450, stage, ..Default::default() };
    Compiler::with_file_system(lang, CompilerConfig::default(), MemoryFileSystem::new().into_arc())
}

#[test]
fn stdlib_functions_resolve_through_preamble() {
    let compiler = compiler(ShaderStage::Fragment);
    let preamble = compiler.create_preamble();

    let source = "
        void main() {
            float s = sin(1.0);
            vec3 n = normalize(vec3(1.0, 2.0, 3.0));
            float d = dot(n, n);
            float c = clamp(s, 0.0, 1.0);
        }
    ";
    let result = compiler.compile_source(source, Some(&preamble), &CancellationToken::new());
    assert!(error_messages(&result).is_empty(), "{:?}", error_messages(&result));
}

#[test]
fn stage_globals_come_from_the_system_preamble() {
    let compiler = compiler(ShaderStage::Vertex);
    let preamble = compiler.create_preamble();

    let source = "void main() { gl_Position = vec4(0.0); }";
    let result = compiler.compile_source(source, Some(&preamble), &CancellationToken::new());
    assert!(error_messages(&result).is_empty(), "{:?}", error_messages(&result));

    // A fragment-only global is unknown in a vertex shader.
    let source = "void main() { vec4 p = gl_FragCoord; }";
    let result = compiler.compile_source(source, Some(&preamble), &CancellationToken::new());
    assert!(!error_messages(&result).is_empty());
}

#[test]
fn preamble_reuse_matches_inline_compilation() {
    let compiler = compiler(ShaderStage::Fragment);
    let source = "void main() { float s = sqrt(4.0); }";

    let inline = compiler.compile_source(source, None, &CancellationToken::new());
    let preamble = compiler.create_preamble();
    let reused = compiler.compile_source(source, Some(&preamble), &CancellationToken::new());

    assert_eq!(error_messages(&inline), error_messages(&reused));
    assert_eq!(
        inline.user_unit().tokens.len(),
        reused.user_unit().tokens.len()
    );
    assert_eq!(inline.user_unit().ast.len(), reused.user_unit().ast.len());
}

#[test]
fn many_compilations_share_one_preamble() {
    let compiler = compiler(ShaderStage::Fragment);
    let preamble = compiler.create_preamble();

    for i in 0..5 {
        let source = format!("float v{i} = abs(-{i}.0);");
        let result = compiler.compile_source(&source, Some(&preamble), &CancellationToken::new());
        assert!(error_messages(&result).is_empty());
    }
}

#[test]
fn user_preamble_declarations_are_visible() {
    let lang = LanguageConfig { no_stdlib: true, ..Default::default() };
    let mut compiler =
        Compiler::with_file_system(lang, CompilerConfig::default(), MemoryFileSystem::new().into_arc());
    compiler.set_user_preamble("#define SCALE 2\nuniform float exposure;");

    let preamble = compiler.create_preamble();
    let source = "float x = exposure * SCALE;";
    let result = compiler.compile_source(source, Some(&preamble), &CancellationToken::new());
    assert!(error_messages(&result).is_empty(), "{:?}", error_messages(&result));
}

#[test]
fn preamble_macros_carry_into_user_file() {
    let lang = LanguageConfig { no_stdlib: true, ..Default::default() };
    let mut compiler =
        Compiler::with_file_system(lang, CompilerConfig::default(), MemoryFileSystem::new().into_arc());
    compiler.set_user_preamble("#define ENABLED 1");

    let preamble = compiler.create_preamble();
    let result = compiler.compile_source(
        "#if ENABLED\nint on;\n#endif",
        Some(&preamble),
        &CancellationToken::new(),
    );
    assert!(error_messages(&result).is_empty());
    assert_eq!(common::declared_vars(&result).len(), 1);
}

#[test]
fn cache_returns_same_preamble_for_same_config() {
    let cache = PreambleCache::new();
    let compiler_a = compiler(ShaderStage::Fragment);
    let compiler_b = compiler(ShaderStage::Fragment);
    let compiler_c = compiler(ShaderStage::Vertex);

    let a = cache.get_or_build(&compiler_a);
    let b = cache.get_or_build(&compiler_b);
    let c = cache.get_or_build(&compiler_c);

    assert!(std::sync::Arc::ptr_eq(&a, &b));
    assert!(!std::sync::Arc::ptr_eq(&a, &c));
    assert_eq!(cache.len(), 2);
}

#[test]
fn cache_is_usable_across_threads() {
    let cache = std::sync::Arc::new(PreambleCache::new());

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let cache = cache.clone();
            std::thread::spawn(move || {
                let compiler = compiler(ShaderStage::Compute);
                let preamble = cache.get_or_build(&compiler);
                let result = compiler.compile_source(
                    "void main() { uvec3 id = gl_GlobalInvocationID; }",
                    Some(&preamble),
                    &CancellationToken::new(),
                );
                assert!(error_messages(&result).is_empty());
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(cache.len(), 1);
}

#[test]
fn no_stdlib_disables_builtins() {
    let lang = LanguageConfig { no_stdlib: true, ..Default::default() };
    let compiler =
        Compiler::with_file_system(lang, CompilerConfig::default(), MemoryFileSystem::new().into_arc());
    let result = compiler.compile_source(
        "float s = sin(1.0);",
        None,
        &CancellationToken::new(),
    );
    assert!(!error_messages(&result).is_empty());
}
