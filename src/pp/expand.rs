use rustc_hash::{FxHashMap, FxHashSet};

use crate::atom::Atom;
use crate::diag::{DiagnosticSink, Severity};
use crate::token::{PPToken, TokenKind};
use crate::source::TextRange;

/// One registered macro. Immutable once defined; the self-recursion
/// suppression state lives in the expansion walk, not here, so macro tables
/// inherited from a preamble can be shared without copies-on-expand.
#[derive(Debug, Clone)]
pub struct MacroDefinition {
    pub function_like: bool,
    pub builtin: bool,
    pub name_tok: PPToken,
    pub params: Vec<PPToken>,
    pub body: Vec<PPToken>,
}

/// Name → definition registry. Cloned cheaply when a compilation inherits a
/// preamble, keeping atoms and definitions from the preamble valid.
#[derive(Debug, Clone, Default)]
pub struct MacroTable {
    defs: FxHashMap<Atom, MacroDefinition>,
}

impl MacroTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define_object(&mut self, name_tok: PPToken, body: Vec<PPToken>) {
        self.defs.insert(
            name_tok.text,
            MacroDefinition { function_like: false, builtin: false, name_tok, params: Vec::new(), body },
        );
    }

    pub fn define_function(&mut self, name_tok: PPToken, params: Vec<PPToken>, body: Vec<PPToken>) {
        self.defs.insert(
            name_tok.text,
            MacroDefinition { function_like: true, builtin: false, name_tok, params, body },
        );
    }

    /// Register a compiler-provided object-like macro such as a version or
    /// extension feature flag.
    pub fn define_builtin(&mut self, name_tok: PPToken, body: Vec<PPToken>) {
        self.defs.insert(
            name_tok.text,
            MacroDefinition { function_like: false, builtin: true, name_tok, params: Vec::new(), body },
        );
    }

    pub fn undef(&mut self, name: Atom) -> bool {
        self.defs.remove(&name).is_some()
    }

    pub fn find(&self, name: Atom) -> Option<&MacroDefinition> {
        self.defs.get(&name)
    }

    pub fn is_defined(&self, name: Atom) -> bool {
        self.defs.contains_key(&name)
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}

/// Receives the post-expansion token stream.
pub trait ExpansionSink {
    fn yield_token(&mut self, token: &PPToken);
    fn enter_expansion(&mut self, use_tok: &PPToken);
    fn exit_expansion(&mut self, use_tok: &PPToken);
}

/// Everything a feed step needs besides the expander's own state.
pub struct ExpandEnv<'e> {
    pub macros: &'e MacroTable,
    /// Macros currently being rescanned; lookups treat them as undefined.
    pub disabled: &'e mut FxHashSet<Atom>,
    pub sink: &'e mut dyn ExpansionSink,
    pub diag: &'e dyn DiagnosticSink,
}

impl ExpandEnv<'_> {
    fn find_enabled(&self, name: Atom) -> Option<&MacroDefinition> {
        if self.disabled.contains(&name) {
            return None;
        }
        self.macros.find(name)
    }
}

/// Buffers pre-expanded macro arguments while forwarding expansion events
/// to the outer sink.
struct ArgBufferSink<'s> {
    base: &'s mut dyn ExpansionSink,
    out: &'s mut Vec<PPToken>,
}

impl ExpansionSink for ArgBufferSink<'_> {
    fn yield_token(&mut self, token: &PPToken) {
        self.out.push(*token);
    }

    fn enter_expansion(&mut self, use_tok: &PPToken) {
        self.base.enter_expansion(use_tok);
    }

    fn exit_expansion(&mut self, use_tok: &PPToken) {
        self.base.exit_expansion(use_tok);
    }
}

/// Token-driven macro expansion.
///
/// Tokens are pushed in one at a time; anything not eligible for further
/// expansion falls out of the sink. A function-like macro name is held
/// pending until the next token decides between an invocation (`(`) and a
/// plain identifier. The exit-expansion event for an expansion that ends on
/// a pending name is deferred until that decision is made.
#[derive(Debug, Default)]
pub struct MacroExpander {
    pending_token: Option<PPToken>,
    paren_depth: u32,
    arg_buffer: Vec<PPToken>,
    deferred_exit: Option<PPToken>,
}

impl MacroExpander {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, env: &mut ExpandEnv, token: PPToken) {
        if let Some(pending) = self.pending_token {
            if self.paren_depth > 0 {
                // Inside the argument list; balance parentheses until the
                // closing one.
                match token.kind {
                    TokenKind::RParen => {
                        self.paren_depth -= 1;
                        if self.paren_depth == 0 {
                            let args = std::mem::take(&mut self.arg_buffer);
                            self.pending_token = None;
                            self.expand_function_like(env, pending, args);
                            self.try_exit_expansion(env, pending);
                        } else {
                            self.arg_buffer.push(token);
                        }
                    }
                    TokenKind::LParen => {
                        self.paren_depth += 1;
                        self.arg_buffer.push(token);
                    }
                    _ => self.arg_buffer.push(token),
                }
            } else if token.kind == TokenKind::LParen {
                self.flush_deferred_exit(env);
                self.paren_depth = 1;
                env.sink.enter_expansion(&pending);
            } else {
                // Not an invocation after all; the held name is plain text.
                self.pending_token = None;
                env.sink.yield_token(&pending);
                self.flush_deferred_exit(env);
                env.sink.yield_token(&token);
            }
            return;
        }

        if token.kind == TokenKind::Identifier {
            if let Some(def) = env.find_enabled(token.text) {
                if def.function_like {
                    self.pending_token = Some(token);
                } else {
                    let def = def.clone();
                    env.sink.enter_expansion(&token);
                    self.expand_object_like(env, token, &def);
                    self.try_exit_expansion(env, token);
                }
                return;
            }
        }

        env.sink.yield_token(&token);
    }

    /// The input stream ended. Revokes a pending invocation that never saw
    /// its `(` and reports one that never saw its `)`.
    pub fn finalize(&mut self, env: &mut ExpandEnv) {
        if let Some(pending) = self.pending_token.take() {
            if self.paren_depth > 0 {
                env.diag.report(
                    pending.spelled_file,
                    pending.spelled_range,
                    Severity::Error,
                    "unterminated macro argument list".to_string(),
                );
                self.paren_depth = 0;
                self.arg_buffer.clear();
                env.sink.exit_expansion(&pending);
            } else {
                env.sink.yield_token(&pending);
            }
        }
        self.flush_deferred_exit(env);
    }

    fn try_exit_expansion(&mut self, env: &mut ExpandEnv, use_tok: PPToken) {
        if self.pending_token.is_some() {
            // The expansion ended on a function-like macro name; whether the
            // expansion frame closes here depends on the next token.
            self.deferred_exit = Some(use_tok);
        } else {
            env.sink.exit_expansion(&use_tok);
        }
    }

    fn flush_deferred_exit(&mut self, env: &mut ExpandEnv) {
        if let Some(tok) = self.deferred_exit.take() {
            env.sink.exit_expansion(&tok);
        }
    }

    fn expand_object_like(&mut self, env: &mut ExpandEnv, use_tok: PPToken, def: &MacroDefinition) {
        env.disabled.insert(use_tok.text);
        for tok in &def.body {
            self.feed(env, at_use_site(*tok, use_tok));
        }
        env.disabled.remove(&use_tok.text);
    }

    fn expand_function_like(&mut self, env: &mut ExpandEnv, use_tok: PPToken, args: Vec<PPToken>) {
        let Some(def) = env.macros.find(use_tok.text).cloned() else {
            return;
        };

        let original_args = split_arguments(&args);
        if original_args.len() != def.params.len() {
            env.diag.report(
                use_tok.spelled_file,
                use_tok.spelled_range,
                Severity::Error,
                format!(
                    "macro expects {} argument(s), {} provided",
                    def.params.len(),
                    original_args.len()
                ),
            );
            return;
        }

        // Pre-expand every argument into its own buffer; nested expansion
        // events still reach the outer sink.
        let mut expanded_args: Vec<Vec<PPToken>> = Vec::with_capacity(original_args.len());
        for arg in &original_args {
            let mut out = Vec::new();
            {
                let mut arg_sink = ArgBufferSink { base: &mut *env.sink, out: &mut out };
                let mut arg_env = ExpandEnv {
                    macros: env.macros,
                    disabled: &mut *env.disabled,
                    sink: &mut arg_sink,
                    diag: env.diag,
                };
                let mut arg_expander = MacroExpander::new();
                for tok in *arg {
                    arg_expander.feed(&mut arg_env, *tok);
                }
                arg_expander.finalize(&mut arg_env);
            }
            expanded_args.push(out);
        }

        env.disabled.insert(use_tok.text);
        'body: for tok in &def.body {
            if tok.kind == TokenKind::Identifier {
                for (param, expanded) in def.params.iter().zip(&expanded_args) {
                    if tok.text == param.text {
                        for arg_tok in expanded {
                            self.feed(env, at_use_site(*arg_tok, use_tok));
                        }
                        continue 'body;
                    }
                }
            }
            self.feed(env, at_use_site(*tok, use_tok));
        }
        env.disabled.remove(&use_tok.text);
    }
}

/// Relocate an expansion token onto the macro-use site: same file, range
/// collapsed to the use token's start.
fn at_use_site(mut tok: PPToken, use_tok: PPToken) -> PPToken {
    tok.spelled_file = use_tok.spelled_file;
    tok.spelled_range = TextRange::collapsed(use_tok.spelled_range.start);
    tok
}

/// Split a collected argument token list at top-level commas.
fn split_arguments(args: &[PPToken]) -> Vec<&[PPToken]> {
    let mut out = Vec::new();
    let mut depth = 0u32;
    let mut begin = 0usize;
    for (i, tok) in args.iter().enumerate() {
        match tok.kind {
            TokenKind::LParen => depth += 1,
            TokenKind::RParen => depth = depth.saturating_sub(1),
            TokenKind::Comma if depth == 0 => {
                out.push(&args[begin..i]);
                begin = i + 1;
            }
            _ => {}
        }
    }
    if begin < args.len() {
        out.push(&args[begin..]);
    }
    out
}
