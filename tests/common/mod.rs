#![allow(dead_code)]

use glslfe::artifacts::CompileResult;
use glslfe::ast::{walk_node, AstKind, AstStore, AstVisitor, NodeId};
use glslfe::{
    CancellationToken, Compiler, CompilerConfig, LanguageConfig, MemoryFileSystem, Severity,
};

/// Compile one buffer with no standard library, so tests control every
/// declaration in play.
pub fn compile(source: &str) -> CompileResult {
    compile_with_files(source, &[])
}

/// Same, with extra files reachable through `#include` from `/src/`.
pub fn compile_with_files(source: &str, files: &[(&str, &str)]) -> CompileResult {
    let mut fs = MemoryFileSystem::new();
    for (path, content) in files {
        fs.add_file(*path, *content);
    }

    let lang = LanguageConfig { no_stdlib: true, ..Default::default() };
    let config = CompilerConfig {
        include_paths: vec!["/src".into()],
        ..Default::default()
    };
    let compiler = Compiler::with_file_system(lang, config, fs.into_arc());
    compiler.compile_source(source, None, &CancellationToken::new())
}

pub fn error_messages(result: &CompileResult) -> Vec<String> {
    result
        .diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .map(|d| d.message.clone())
        .collect()
}

/// `(name, type)` of every declarator in the user unit, in parse order.
pub fn declared_vars(result: &CompileResult) -> Vec<(String, String)> {
    struct Collector<'r> {
        result: &'r CompileResult,
        out: Vec<(String, String)>,
    }

    impl AstVisitor for Collector<'_> {
        fn enter_node(&mut self, store: &AstStore, id: NodeId) -> bool {
            if let AstKind::VariableDecl { declarators, .. } = &store.node(id).kind {
                for declarator in declarators {
                    let name = self
                        .result
                        .token_text(declarator.name)
                        .to_string();
                    let ty = self.result.types.name(declarator.resolved).to_string();
                    self.out.push((name, ty));
                }
            }
            true
        }
    }

    let unit = self::user_ast(result);
    let mut collector = Collector { result, out: Vec::new() };
    if let Some(root) = unit.root() {
        walk_node(&mut collector, unit, root);
    }
    collector.out
}

pub fn var_type(result: &CompileResult, name: &str) -> Option<String> {
    declared_vars(result)
        .into_iter()
        .find(|(n, _)| n == name)
        .map(|(_, ty)| ty)
}

pub fn user_ast(result: &CompileResult) -> &AstStore {
    &result.user_unit().ast
}

/// All nodes of the user unit satisfying a predicate.
pub fn find_nodes(result: &CompileResult, pred: impl Fn(&AstKind) -> bool) -> Vec<NodeId> {
    struct Collector<'p> {
        pred: &'p dyn Fn(&AstKind) -> bool,
        out: Vec<NodeId>,
    }

    impl AstVisitor for Collector<'_> {
        fn enter_node(&mut self, store: &AstStore, id: NodeId) -> bool {
            if (self.pred)(&store.node(id).kind) {
                self.out.push(id);
            }
            true
        }
    }

    let ast = user_ast(result);
    let mut collector = Collector { pred: &pred, out: Vec::new() };
    if let Some(root) = ast.root() {
        walk_node(&mut collector, ast, root);
    }
    collector.out
}

/// Parameter type names of the function a call resolved to.
pub fn resolved_call_params(result: &CompileResult, call: NodeId) -> Option<Vec<String>> {
    let AstKind::FunctionCallExpr { resolved_function: Some(decl), .. } =
        &user_ast(result).node(call).kind
    else {
        return None;
    };
    let AstKind::FunctionDecl { resolved_params, .. } = &result.node(*decl)?.kind else {
        return None;
    };
    Some(
        resolved_params
            .iter()
            .map(|&ty| result.types.name(ty).to_string())
            .collect(),
    )
}

