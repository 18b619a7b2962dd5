mod common;

use common::*;
use glslfe::ast::AstKind;
use glslfe::source::TextPosition;
use glslfe::token::TokenKind;
use glslfe::{CancellationToken, Compiler, CompilerConfig, LanguageConfig, MemoryFileSystem};

#[test]
fn empty_source_still_produces_artifacts() {
    let result = compile("");
    let unit = result.user_unit();
    assert_eq!(unit.tokens.len(), 1);
    assert_eq!(unit.tokens[0].kind, TokenKind::Eof);
    assert!(unit.ast.root().is_some());
}

#[test]
fn lexed_text_round_trips_modulo_whitespace() {
    let source = "int a = b + 1; // trailing\nfloat c;";
    let result = compile(source);

    let concatenated: String = result
        .user_unit()
        .tokens
        .iter()
        .map(|t| result.atoms.resolve(t.text))
        .collect();
    let stripped: String = source
        .split("//")
        .next()
        .unwrap()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        + "floatc;";
    assert_eq!(concatenated, stripped);
}

#[test]
fn object_like_macro_forms_array_size() {
    let result = compile("#define N 3\nint a[N];");
    assert_eq!(var_type(&result, "a").as_deref(), Some("int[3]"));

    // The expanded `3` is spelled at the macro use site, collapsed to its
    // start: line 1, the column of `N` in `int a[N]`.
    let three = result
        .user_unit()
        .tokens
        .iter()
        .find(|t| result.atoms.resolve(t.text) == "3")
        .expect("expanded token is in the stream");
    assert_eq!(three.spelled_range.start, TextPosition::new(1, 6));
    assert!(three.spelled_range.is_empty());
    assert!(result.is_main_file(three.spelled_file));
}

#[test]
fn recursive_function_like_macro_stops_after_one_round() {
    let result = compile("#define M(x) M(x) + 1\nint z = M(2);");

    let texts: Vec<&str> = result
        .user_unit()
        .tokens
        .iter()
        .map(|t| result.atoms.resolve(t.text))
        .collect();
    // The inner `M` must not expand again.
    let needle = ["M", "(", "2", ")", "+", "1"];
    let found = texts.windows(needle.len()).any(|w| w == needle);
    assert!(found, "expected {needle:?} inside {texts:?}");
}

#[test]
fn exact_overload_beats_convertible_one() {
    let source = "
        float f(float x) { return x; }
        float f(int x) { return 0.0; }
        float y = f(1);
    ";
    let result = compile(source);

    let calls = find_nodes(&result, |kind| matches!(kind, AstKind::FunctionCallExpr { .. }));
    assert_eq!(calls.len(), 1);
    let params = resolved_call_params(&result, calls[0]).expect("call must resolve");
    assert_eq!(params, vec!["int".to_string()]);
    assert!(error_messages(&result).is_empty());
}

#[test]
fn single_overload_is_reached_through_conversion() {
    let source = "
        float g(float x) { return x; }
        float y = g(1);
    ";
    let result = compile(source);

    let calls = find_nodes(&result, |kind| matches!(kind, AstKind::FunctionCallExpr { .. }));
    let params = resolved_call_params(&result, calls[0]).expect("call must resolve");
    assert_eq!(params, vec!["float".to_string()]);

    // The int argument is wrapped in an implicit cast to float.
    let casts = find_nodes(&result, |kind| matches!(kind, AstKind::ImplicitCastExpr { .. }));
    assert!(!casts.is_empty());
}

#[test]
fn swizzle_types_and_mixed_sets() {
    let result = compile("vec4 v;\nvec4 w = v.xxzz;\nvec2 p = v.xy;");
    assert!(error_messages(&result).is_empty());

    let swizzles = find_nodes(&result, |kind| {
        matches!(kind, AstKind::NameAccessExpr { swizzle: Some(_), .. })
    });
    assert_eq!(swizzles.len(), 2);
    let ast = user_ast(&result);
    let ty = ast.node(swizzles[0]).expr_payload().unwrap().ty;
    assert_eq!(result.types.name(ty), "vec4");

    // Mixing character sets is rejected and the expression is error-typed.
    let result = compile("vec4 v;\nvec2 q = v.xr;");
    assert!(!error_messages(&result).is_empty());
    let swizzles = find_nodes(&result, |kind| {
        matches!(
            kind,
            AstKind::NameAccessExpr { access: glslfe::ast::NameAccessKind::Swizzle, .. }
        )
    });
    let ty = user_ast(&result).node(swizzles[0]).expr_payload().unwrap().ty;
    assert!(result.types.is_error(ty));
}

#[test]
fn constant_folding_feeds_array_sizes() {
    let result = compile("const int K = 1 + 2 * 3;\nfloat a[K];");
    assert_eq!(var_type(&result, "a").as_deref(), Some("float[7]"));

    // K's initializer folded to 7.
    let decls = find_nodes(&result, |kind| matches!(kind, AstKind::VariableDecl { .. }));
    let ast = user_ast(&result);
    let AstKind::VariableDecl { declarators, .. } = &ast.node(decls[0]).kind else {
        unreachable!()
    };
    let init = declarators[0].init.unwrap();
    let value = &ast.node(init).expr_payload().unwrap().value;
    assert_eq!(value.as_int(), Some(7));
}

#[test]
fn zero_sized_array_is_runtime_sized() {
    let result = compile("float data[];");
    assert_eq!(var_type(&result, "data").as_deref(), Some("float[]"));
}

#[test]
fn include_with_conditional_declares_symbol_from_header() {
    let result = compile_with_files(
        "#define A\n#include \"h.glsl\"\nint y;",
        &[("/src/h.glsl", "#ifdef A\nint x;\n#endif\n")],
    );
    assert!(error_messages(&result).is_empty());

    let vars = declared_vars(&result);
    assert!(vars.iter().any(|(n, _)| n == "x"), "x from the header: {vars:?}");
    assert!(vars.iter().any(|(n, _)| n == "y"));

    // x is spelled in the header file, not the main file.
    let decls = find_nodes(&result, |kind| matches!(kind, AstKind::VariableDecl { .. }));
    let ast = user_ast(&result);
    let x_decl = decls
        .iter()
        .find(|&&d| {
            let AstKind::VariableDecl { declarators, .. } = &ast.node(d).kind else { return false };
            result.token_text(declarators[0].name) == "x"
        })
        .unwrap();
    let AstKind::VariableDecl { declarators, .. } = &ast.node(*x_decl).kind else { unreachable!() };
    let name_tok = result.token(declarators[0].name).unwrap();
    assert!(!result.is_main_file(name_tok.spelled_file));
}

#[test]
fn ifndef_else_branch_is_taken() {
    let result = compile("#ifndef MISSING\nint a;\n#else\nint b;\n#endif");
    let vars = declared_vars(&result);
    assert_eq!(vars.len(), 1);
    assert_eq!(vars[0].0, "a");
}

#[test]
fn inactive_region_skips_garbage_without_diagnostics() {
    let result = compile("#if 0\n@@ not glsl at all $$\n#endif\nint ok;");
    assert!(error_messages(&result).is_empty());
    assert_eq!(declared_vars(&result).len(), 1);
}

#[test]
fn elif_chain_picks_single_branch() {
    let source = "
#define V 2
#if V == 1
int a;
#elif V == 2
int b;
#elif V == 2
int c;
#else
int d;
#endif
";
    let result = compile(source);
    let vars = declared_vars(&result);
    assert_eq!(vars.len(), 1);
    assert_eq!(vars[0].0, "b");
}

#[test]
fn if_with_undefined_identifier_is_inactive() {
    let result = compile("#if UNDEFINED_THING\nint a;\n#endif\nint b;");
    let vars = declared_vars(&result);
    assert_eq!(vars.len(), 1);
    assert_eq!(vars[0].0, "b");
}

#[test]
fn undef_removes_macro() {
    let result = compile("#define A\n#undef A\n#ifdef A\nint a;\n#endif\nint b;");
    let vars = declared_vars(&result);
    assert_eq!(vars.len(), 1);
    assert_eq!(vars[0].0, "b");
}

#[test]
fn unresolved_include_recovers_with_diagnostic() {
    let result = compile("#include \"missing.glsl\"\nint ok;");
    assert!(!error_messages(&result).is_empty());
    assert_eq!(declared_vars(&result).len(), 1);
}

#[test]
fn unknown_identifier_yields_error_type_and_diagnostic() {
    let result = compile("int a = nonexistent;");
    assert!(error_messages(&result).iter().any(|m| m.contains("nonexistent")));

    let names = find_nodes(&result, |kind| {
        matches!(kind, AstKind::NameAccessExpr { resolved: None, .. })
    });
    let ty = user_ast(&result).node(names[0]).expr_payload().unwrap().ty;
    assert!(result.types.is_error(ty));
}

#[test]
fn struct_member_access_resolves() {
    let source = "
        struct Light { vec3 color; float intensity; };
        Light l;
        float i = l.intensity;
        vec3 c = l.color;
    ";
    let result = compile(source);
    assert!(error_messages(&result).is_empty());
    assert_eq!(var_type(&result, "i").as_deref(), Some("float"));
    assert_eq!(var_type(&result, "c").as_deref(), Some("vec3"));

    let result = compile("struct S { int a; };\nS s;\nint b = s.missing;");
    assert!(!error_messages(&result).is_empty());
}

#[test]
fn struct_constructor_checks_arity() {
    let source = "struct P { float x; float y; };\nP p = P(1.0, 2.0);";
    let result = compile(source);
    assert!(error_messages(&result).is_empty());

    let result = compile("struct P { float x; float y; };\nP p = P(1.0);");
    assert!(!error_messages(&result).is_empty());
}

#[test]
fn vector_constructor_folds_and_checks_components() {
    let result = compile("const vec2 v = vec2(1.0, 2.0);\nvec3 w = vec3(v, 3.0);");
    assert!(error_messages(&result).is_empty());

    let ctors = find_nodes(&result, |kind| matches!(kind, AstKind::ConstructorCallExpr { .. }));
    let payload = user_ast(&result).node(ctors[0]).expr_payload().unwrap();
    assert!(!payload.value.is_error());

    let result = compile("vec3 w = vec3(1.0, 2.0);");
    assert!(!error_messages(&result).is_empty());
}

#[test]
fn interface_block_members_are_visible() {
    let source = "
        uniform Camera { mat4 view; mat4 proj; } cam;
        mat4 m = cam.view;
    ";
    let result = compile(source);
    assert!(error_messages(&result).is_empty());
    assert_eq!(var_type(&result, "m").as_deref(), Some("mat4"));

    // Unnamed blocks spill members into the global scope.
    let source = "
        uniform Globals { float exposure; };
        float e = exposure;
    ";
    let result = compile(source);
    assert!(error_messages(&result).is_empty());
    assert_eq!(var_type(&result, "e").as_deref(), Some("float"));
}

#[test]
fn statements_parse_and_locals_scope() {
    let source = "
        int helper(int x) { return x; }
        void main() {
            int total = 0;
            for (int i = 0; i < 4; i++) {
                total += helper(i);
            }
            while (total > 10) { total--; }
            do { total++; } while (total < 0);
            if (total == 3) { total = 0; } else { total = 1; }
            switch (total) {
                case 0: break;
                default: break;
            }
        }
    ";
    let result = compile(source);
    assert!(error_messages(&result).is_empty(), "{:?}", error_messages(&result));
}

#[test]
fn loop_variable_is_not_visible_after_loop() {
    let result = compile("void main() { for (int i = 0; i < 4; i++) {} int x = i; }");
    assert!(error_messages(&result).iter().any(|m| m.contains("`i`")));
}

#[test]
fn parse_recovery_keeps_later_decls() {
    let result = compile("int a = ;\nfloat b;");
    assert!(!error_messages(&result).is_empty());
    assert!(declared_vars(&result).iter().any(|(n, _)| n == "b"));
}

#[test]
fn expanded_ranges_are_monotone() {
    let result = compile_with_files(
        "#define TWICE(x) x + x\nint a = TWICE(2);\n#include \"h.glsl\"\nint tail;",
        &[("/src/h.glsl", "int inner;\n")],
    );

    let tokens = &result.user_unit().tokens;
    for pair in tokens.windows(2) {
        assert!(
            pair[0].expanded_range.start <= pair[1].expanded_range.start,
            "expanded starts must not go backwards"
        );
    }
    for tok in tokens.iter() {
        assert!(tok.expanded_range.start <= tok.expanded_range.end);
    }
}

#[test]
fn every_expression_has_a_deduced_type() {
    let source = "
        struct S { float f; };
        S s;
        vec4 v;
        float x = v.x + s.f * 2.0;
        bool flag = x > 1.0 && true;
    ";
    let result = compile(source);
    let ast = user_ast(&result);
    for id in find_nodes(&result, |kind| {
        matches!(
            kind,
            AstKind::LiteralExpr { .. }
                | AstKind::NameAccessExpr { .. }
                | AstKind::BinaryExpr { .. }
                | AstKind::UnaryExpr { .. }
                | AstKind::ImplicitCastExpr { .. }
        )
    }) {
        assert!(ast.node(id).expr_payload().is_some());
    }
}

#[test]
fn recompiling_is_structurally_deterministic() {
    let source = "#define N 2\nint a[N];\nfloat f(float x) { return x; }\nfloat y = f(1);";
    let first = compile(source);
    let second = compile(source);

    assert_eq!(first.user_unit().tokens.len(), second.user_unit().tokens.len());
    assert_eq!(first.user_unit().ast.len(), second.user_unit().ast.len());
    assert_eq!(first.diagnostics, second.diagnostics);
    assert_eq!(declared_vars(&first), declared_vars(&second));
}

#[test]
fn cancellation_still_yields_artifacts() {
    let lang = LanguageConfig { no_stdlib: true, ..Default::default() };
    let compiler =
        Compiler::with_file_system(lang, CompilerConfig::default(), MemoryFileSystem::new().into_arc());

    let cancel = CancellationToken::new();
    cancel.cancel();
    let result = compiler.compile_source("int a;\nint b;\nint c;", None, &cancel);

    // Tokens are intact and the AST exists, ending in error nodes.
    assert!(result.user_unit().tokens.len() > 1);
    assert!(result.user_unit().ast.root().is_some());
}

#[test]
fn utf16_column_counting_matches_lsp_expectations() {
    let lang = LanguageConfig { no_stdlib: true, ..Default::default() };
    let config = CompilerConfig { count_utf16: true, ..Default::default() };
    let compiler = Compiler::with_file_system(lang, config, MemoryFileSystem::new().into_arc());

    // The comment holds one astral-plane char (2 UTF-16 units, 4 UTF-8
    // bytes); the next line is unaffected either way.
    let source = "// \u{1F600}\nint a;";
    let result = compiler.compile_source(source, None, &CancellationToken::new());
    let int_tok = result
        .user_unit()
        .tokens
        .iter()
        .find(|t| result.atoms.resolve(t.text) == "int")
        .unwrap();
    assert_eq!(int_tok.spelled_range.start, TextPosition::new(1, 0));

    // On one line the suffix position shifts by the unit count.
    let source = "int \u{1F600}a;";
    let utf16 = compiler.compile_source(source, None, &CancellationToken::new());
    let err_tok = utf16
        .user_unit()
        .tokens
        .iter()
        .find(|t| t.kind == TokenKind::Error)
        .unwrap();
    assert_eq!(err_tok.spelled_range.end.character - err_tok.spelled_range.start.character, 2);
}

#[test]
fn version_and_extension_directives_do_not_disturb_parsing() {
    let source = "#version 450 core\n#extension GL_EXT_mesh_shader : enable\nint a;";
    let result = compile(source);
    assert!(error_messages(&result).is_empty());
    assert_eq!(declared_vars(&result).len(), 1);
}

#[test]
fn include_depth_limit_is_enforced() {
    // The file includes itself; the depth limit must stop it.
    let result = compile_with_files(
        "#include \"loop.glsl\"\nint ok;",
        &[("/src/loop.glsl", "#include \"loop.glsl\"\nint inner;")],
    );
    assert!(error_messages(&result).iter().any(|m| m.contains("depth")));
    assert!(declared_vars(&result).iter().any(|(n, _)| n == "ok"));
}

#[test]
fn command_line_defines_are_visible() {
    let lang = LanguageConfig { no_stdlib: true, ..Default::default() };
    let config = CompilerConfig {
        defines: vec!["WIDTH=4".to_string(), "FEATURE".to_string()],
        ..Default::default()
    };
    let compiler = Compiler::with_file_system(lang, config, MemoryFileSystem::new().into_arc());
    let result = compiler.compile_source(
        "#ifdef FEATURE\nint a[WIDTH];\n#endif",
        None,
        &CancellationToken::new(),
    );
    assert_eq!(var_type(&result, "a").as_deref(), Some("int[4]"));
}

#[test]
fn version_macro_is_predefined() {
    let result = compile("#if __VERSION__ >= 450\nint a;\n#endif");
    assert_eq!(declared_vars(&result).len(), 1);
}
