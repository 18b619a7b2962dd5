mod common;

use common::*;
use glslfe::query::{DocumentSymbolKind, InlayHintConfig, SymbolKind};
use glslfe::source::{TextPosition, TextRange};
use glslfe::QueryEngine;

fn pos(line: u32, character: u32) -> TextPosition {
    TextPosition::new(line, character)
}

fn whole_file() -> TextRange {
    TextRange::new(TextPosition::min(), TextPosition::max())
}

#[test]
fn symbol_at_position_finds_variable_use() {
    //          0123456789012345
    let src = "int count;\nint twice = count + count;";
    let result = compile(src);
    let engine = QueryEngine::new(&result);

    let symbol = engine.symbol_at_position(pos(1, 12)).expect("hit the first `count` use");
    assert_eq!(symbol.kind, SymbolKind::GlobalVariable);
    assert_eq!(symbol.spelled_text, "count");
    assert!(!symbol.is_declaration);
    assert!(symbol.decl.is_some());
}

#[test]
fn symbol_at_position_finds_declaration_site() {
    let src = "int count;";
    let result = compile(src);
    let engine = QueryEngine::new(&result);

    let symbol = engine.symbol_at_position(pos(0, 4)).expect("hit the declarator");
    assert_eq!(symbol.kind, SymbolKind::GlobalVariable);
    assert!(symbol.is_declaration);
}

#[test]
fn symbol_at_position_prefers_pp_occurrences() {
    let src = "#define SIZE 4\nint a[SIZE];";
    let result = compile(src);
    let engine = QueryEngine::new(&result);

    // On the macro name in the define line.
    let symbol = engine.symbol_at_position(pos(0, 8)).unwrap();
    assert_eq!(symbol.kind, SymbolKind::Macro);
    assert!(symbol.pp_occurrence.is_some());

    // On the expansion site.
    let symbol = engine.symbol_at_position(pos(1, 6)).unwrap();
    assert_eq!(symbol.kind, SymbolKind::Macro);
}

#[test]
fn goto_declaration_lands_on_declarator() {
    let src = "float radius;\nfloat area = radius * radius;";
    let result = compile(src);
    let engine = QueryEngine::new(&result);

    let targets = engine.goto_declaration(pos(1, 13));
    assert_eq!(targets.len(), 1);
    assert!(result.is_main_file(targets[0].file));
    assert_eq!(targets[0].range.start, pos(0, 6));
}

#[test]
fn goto_declaration_follows_macro_to_define() {
    let src = "#define W 2\nint a[W];";
    let result = compile(src);
    let engine = QueryEngine::new(&result);

    let targets = engine.goto_declaration(pos(1, 6));
    assert_eq!(targets.len(), 1);
    assert_eq!(targets[0].range.start, pos(0, 8));
}

#[test]
fn references_collects_uses_and_optionally_declaration() {
    let src = "int n;\nint a = n;\nint b = n + n;";
    let result = compile(src);
    let engine = QueryEngine::new(&result);

    let uses = engine.references(pos(0, 4), false);
    assert_eq!(uses.len(), 3);

    let with_decl = engine.references(pos(0, 4), true);
    assert_eq!(with_decl.len(), 4);
    assert!(with_decl.contains(&TextRange::new(pos(0, 4), pos(0, 5))));
}

#[test]
fn references_to_function_cover_calls() {
    let src = "float f(float x) { return x; }\nfloat y = f(f(1.0));";
    let result = compile(src);
    let engine = QueryEngine::new(&result);

    let uses = engine.references(pos(0, 6), true);
    assert_eq!(uses.len(), 3);
}

#[test]
fn document_symbols_cover_decls_and_defines() {
    let src = "
#define LIGHTS 4
struct Light { vec3 color; };
uniform Camera { mat4 view; } cam;
float exposure;
void main() {}
"
    .trim_start();
    let result = compile(src);
    let engine = QueryEngine::new(&result);

    let symbols = engine.document_symbols();
    let names: Vec<(&str, DocumentSymbolKind)> =
        symbols.iter().map(|s| (s.name.as_str(), s.kind)).collect();

    assert!(names.contains(&("LIGHTS", DocumentSymbolKind::Macro)));
    assert!(names.contains(&("Light", DocumentSymbolKind::Struct)));
    assert!(names.contains(&("Camera", DocumentSymbolKind::Block)));
    assert!(names.contains(&("cam", DocumentSymbolKind::Variable)));
    assert!(names.contains(&("exposure", DocumentSymbolKind::Variable)));
    assert!(names.contains(&("main", DocumentSymbolKind::Function)));

    let light = symbols.iter().find(|s| s.name == "Light").unwrap();
    assert_eq!(light.children.len(), 1);
    assert_eq!(light.children[0].name, "color");

    // Sorted by position.
    for pair in symbols.windows(2) {
        assert!(pair[0].range.start <= pair[1].range.start);
    }
}

#[test]
fn hover_on_const_variable_shows_folded_value() {
    let src = "const int K = 1 + 2 * 3;";
    let result = compile(src);
    let engine = QueryEngine::new(&result);

    let hover = engine.hover(pos(0, 10)).expect("hover on K");
    assert_eq!(hover.kind, SymbolKind::GlobalVariable);
    assert_eq!(hover.name, "K");
    assert_eq!(hover.symbol_type.as_deref(), Some("int"));
    assert_eq!(hover.value.as_deref(), Some("7"));

    let code = hover.code.as_deref().unwrap();
    assert!(code.contains("const int K"), "{code}");
    assert!(code.contains("= 7"), "{code}");
}

#[test]
fn hover_on_macro_reconstructs_define() {
    let src = "#define ADD(a, b) a + b\nint x = ADD(1, 2);";
    let result = compile(src);
    let engine = QueryEngine::new(&result);

    let hover = engine.hover(pos(1, 9)).expect("hover on the macro use");
    assert_eq!(hover.kind, SymbolKind::Macro);
    assert_eq!(hover.code.as_deref(), Some("#define ADD(a, b) a + b"));

    let markdown = hover.to_markdown();
    assert!(markdown.contains("Macro"));
    assert!(markdown.contains("ADD"));
}

#[test]
fn hover_on_function_shows_signature() {
    let src = "float mix2(float a, float b) { return a + b; }\nfloat y = mix2(1.0, 2.0);";
    let result = compile(src);
    let engine = QueryEngine::new(&result);

    let hover = engine.hover(pos(1, 11)).expect("hover on the call");
    assert_eq!(hover.kind, SymbolKind::Function);
    let code = hover.code.as_deref().unwrap();
    assert!(code.contains("float mix2(float a, float b)"), "{code}");
}

#[test]
fn hover_on_swizzle_reports_vector_type() {
    let src = "vec4 v;\nvec2 p = v.xy;";
    let result = compile(src);
    let engine = QueryEngine::new(&result);

    let hover = engine.hover(pos(1, 11)).expect("hover on the swizzle");
    assert_eq!(hover.kind, SymbolKind::Swizzle);
    assert_eq!(hover.symbol_type.as_deref(), Some("vec2"));
}

#[test]
fn inlay_hints_name_call_arguments() {
    let src = "float apply(float base, out float result) { result = base; return base; }\nfloat r;\nfloat y = apply(1.0, r);";
    let result = compile(src);
    let engine = QueryEngine::new(&result);

    let hints = engine.inlay_hints(&InlayHintConfig::default(), whole_file());
    let labels: Vec<&str> = hints.iter().map(|h| h.label.as_str()).collect();
    assert!(labels.contains(&"base:"), "{labels:?}");
    assert!(labels.contains(&"&result:"), "{labels:?}");
}

#[test]
fn inlay_hints_mark_implicit_casts() {
    let src = "float y = 1 + 2.0;";
    let result = compile(src);
    let engine = QueryEngine::new(&result);

    let hints = engine.inlay_hints(&InlayHintConfig::default(), whole_file());
    assert!(hints.iter().any(|h| h.label == "(float)"), "{hints:?}");
}

#[test]
fn inlay_hints_annotate_long_function_ends() {
    let body: String = (0..10).map(|i| format!("    int v{i} = {i};\n")).collect();
    let src = format!("void big() {{\n{body}}}\n");
    let result = compile(&src);
    let engine = QueryEngine::new(&result);

    let hints = engine.inlay_hints(&InlayHintConfig::default(), whole_file());
    assert!(hints.iter().any(|h| h.label == "// big"), "{hints:?}");

    // Below the threshold no end hint appears.
    let result = compile("void small() { int a = 0; }");
    let engine = QueryEngine::new(&result);
    let hints = engine.inlay_hints(&InlayHintConfig::default(), whole_file());
    assert!(!hints.iter().any(|h| h.label.starts_with("// ")));
}

#[test]
fn inlay_hints_respect_display_range() {
    let src = "float f(float a) { return a; }\nfloat x = f(1.0);\nfloat y = f(2.0);";
    let result = compile(src);
    let engine = QueryEngine::new(&result);

    let line1_only = TextRange::new(pos(1, 0), pos(2, 0));
    let hints = engine.inlay_hints(&InlayHintConfig::default(), line1_only);
    assert!(hints.iter().all(|h| h.position.line == 1));
    assert!(!hints.is_empty());
}

#[test]
fn semantic_tokens_are_sorted_and_typed() {
    let src = "#define N 2\nstruct S { float f; };\nint a[N];\nint two = 2;\nvoid main() { S s; float x = s.f; }";
    let result = compile(src);
    let engine = QueryEngine::new(&result);

    let tokens = engine.semantic_tokens();
    assert!(!tokens.is_empty());
    for pair in tokens.windows(2) {
        assert!((pair[0].line, pair[0].character) <= (pair[1].line, pair[1].character));
    }

    use glslfe::query::SemanticTokenType;
    let has = |t: SemanticTokenType| tokens.iter().any(|info| info.token_type == t);
    assert!(has(SemanticTokenType::Keyword));
    assert!(has(SemanticTokenType::Number));
    assert!(has(SemanticTokenType::Macro));
    assert!(has(SemanticTokenType::Struct));
    assert!(has(SemanticTokenType::Function));
    assert!(has(SemanticTokenType::Variable));
}

#[test]
fn semantic_tokens_delta_encoding() {
    let src = "int a;\nint b;";
    let result = compile(src);
    let engine = QueryEngine::new(&result);

    let tokens = engine.semantic_tokens();
    let encoded = engine.semantic_tokens_encoded();
    assert_eq!(encoded.len(), tokens.len() * 5);

    // First entry is absolute; every line delta is non-negative.
    assert_eq!(encoded[0], tokens[0].line);
    assert_eq!(encoded[1], tokens[0].character);
    let mut line = 0;
    for chunk in encoded.chunks(5) {
        line += chunk[0];
        assert!(line <= tokens.last().unwrap().line);
    }
}

#[test]
fn query_results_serialize_for_the_server_layer() {
    let src = "#define N 2\nint a[N];\nvoid main() {}";
    let result = compile(src);
    let engine = QueryEngine::new(&result);

    let symbols = serde_json::to_value(engine.document_symbols()).unwrap();
    assert!(symbols.as_array().is_some_and(|a| !a.is_empty()));

    let hover = engine.hover(pos(1, 4)).unwrap();
    let hover_json = serde_json::to_value(&hover).unwrap();
    assert_eq!(hover_json["name"], "a");

    let tokens = serde_json::to_value(engine.semantic_tokens()).unwrap();
    assert!(tokens.as_array().is_some_and(|a| !a.is_empty()));
}

#[test]
fn hover_misses_return_none() {
    let src = "int a;";
    let result = compile(src);
    let engine = QueryEngine::new(&result);
    assert!(engine.hover(pos(5, 0)).is_none());
    // A keyword is not a symbol.
    assert!(engine.symbol_at_position(pos(0, 1)).is_none());
}
