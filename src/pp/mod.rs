pub mod eval;
pub mod expand;

pub use expand::{ExpansionSink, MacroDefinition, MacroTable};

use std::path::PathBuf;

use rustc_hash::FxHashSet;
use tracing::debug;

use crate::atom::AtomTable;
use crate::cancel::CancellationToken;
use crate::config::{CompilerConfig, Extension, ExtensionBehavior, ExtensionSet, GlslProfile, GlslVersion};
use crate::diag::{DiagnosticSink, Severity};
use crate::lexctx::LexContext;
use crate::source::{FileId, TextPosition, TextRange};
use crate::sources::SourceManager;
use crate::token::{PPToken, SyntaxRange, TokenKind};
use crate::tokenizer::Tokenizer;
use expand::{ExpandEnv, MacroExpander};

/// Observer for preprocessor activity. The language service hangs its
/// occurrence collection off this; batch compilation passes a no-op.
pub trait PPCallback {
    fn on_version_directive(&mut self, _file: FileId, _range: TextRange, _version: GlslVersion, _profile: GlslProfile) {}
    fn on_extension_directive(&mut self, _file: FileId, _range: TextRange, _extension: Extension, _behavior: ExtensionBehavior) {}

    /// `resolved_path` is the canonical path of the opened header, absent
    /// when resolution failed.
    fn on_include_directive(&mut self, _header_name: &PPToken, _resolved_path: Option<&std::path::Path>) {}
    fn on_define_directive(&mut self, _macro_name: &PPToken, _params: &[PPToken], _body: &[PPToken], _function_like: bool) {}
    fn on_undef_directive(&mut self, _macro_name: &PPToken) {}
    fn on_if_directive(&mut self, _taken: bool) {}
    fn on_elif_directive(&mut self, _taken: bool) {}
    fn on_ifdef_directive(&mut self, _macro_name: &PPToken, _is_ndef: bool) {}
    fn on_else_directive(&mut self) {}
    fn on_endif_directive(&mut self) {}

    fn on_enter_included_file(&mut self) {}
    fn on_exit_included_file(&mut self) {}

    /// A macro use finished expanding into `expanded_tokens` of the final
    /// stream.
    fn on_macro_expansion(&mut self, _macro_use: &PPToken, _expanded_tokens: SyntaxRange) {}
}

/// No-op callback.
#[derive(Debug, Default)]
pub struct NoopPPCallback;

impl PPCallback for NoopPPCallback {}

/// Mutable context the preprocessing of one translation unit runs against.
pub struct PpContext<'c> {
    pub atoms: &'c mut AtomTable,
    pub macros: &'c mut MacroTable,
    pub sources: &'c mut SourceManager,
    pub lexctx: &'c mut LexContext,
    pub diag: &'c dyn DiagnosticSink,
    pub callback: &'c mut dyn PPCallback,
    pub config: &'c CompilerConfig,
    pub extensions: &'c mut ExtensionSet,
    pub cancel: &'c CancellationToken,
}

/// One frame per open `#if`/`#ifdef`/`#ifndef`.
#[derive(Debug, Clone, Copy)]
struct ConditionalFrame {
    active: bool,
    seen_active_branch: bool,
    seen_else: bool,
}

#[derive(Debug)]
enum PpState {
    /// Yield tokens to the macro expander.
    Default,
    /// Collecting the tokens of a directive line after a line-initial `#`.
    Directive(Vec<PPToken>),
}

/// Directive state machine for one translation unit.
///
/// Drives a tokenizer per file, recursing for `#include`; feeds everything
/// else through the macro expander into the lex context.
pub struct Preprocessor {
    state: PpState,
    conditionals: Vec<ConditionalFrame>,
    expander: MacroExpander,
    disabled: FxHashSet<crate::atom::Atom>,
    expansion_stack: Vec<(PPToken, u32)>,
    file_stack: Vec<FileId>,
    include_depth: usize,
    /// Spelled start of the top-level `#include` currently being processed;
    /// tokens from included files take this as their expanded position.
    include_anchor: Option<TextPosition>,
}

impl Preprocessor {
    pub fn new() -> Self {
        Self {
            state: PpState::Default,
            conditionals: Vec::new(),
            expander: MacroExpander::new(),
            disabled: FxHashSet::default(),
            expansion_stack: Vec::new(),
            file_stack: Vec::new(),
            include_depth: 0,
            include_anchor: None,
        }
    }

    /// Lex and preprocess one translation unit rooted at `file`, appending
    /// the post-expansion stream (terminated by `Eof`) to the lex context.
    pub fn process_unit(&mut self, cx: &mut PpContext, file: FileId) {
        self.process_file(cx, file, true);
    }

    fn process_file(&mut self, cx: &mut PpContext, file: FileId, root: bool) {
        let content = cx.sources.content(file);
        let mut tokenizer = Tokenizer::new(file, &content, cx.config.count_utf16);
        self.file_stack.push(file);

        loop {
            if matches!(self.state, PpState::Default) && !self.in_active_region() {
                tokenizer.fast_skip_to_hash();
            }

            let expect_header = self.expect_header_name(cx.atoms);
            let tok = tokenizer.next_token(cx.atoms, expect_header);

            if tok.kind == TokenKind::Eof {
                if let PpState::Directive(buf) = std::mem::replace(&mut self.state, PpState::Default) {
                    self.handle_directive(cx, &buf);
                }
                if root {
                    self.finish_unit(cx, tok);
                }
                break;
            }

            self.issue(cx, tok);
        }

        self.file_stack.pop();
    }

    fn issue(&mut self, cx: &mut PpContext, tok: PPToken) {
        match &mut self.state {
            PpState::Default => {
                if tok.kind == TokenKind::Hash && tok.first_of_line {
                    self.state = PpState::Directive(Vec::new());
                } else if self.in_active_region() {
                    self.feed_token(cx, tok);
                }
            }
            PpState::Directive(buf) => {
                if tok.first_of_line {
                    let toks = std::mem::take(buf);
                    self.state = PpState::Default;
                    self.handle_directive(cx, &toks);
                    self.issue(cx, tok);
                } else {
                    buf.push(tok);
                }
            }
        }
    }

    fn in_active_region(&self) -> bool {
        self.conditionals.iter().all(|frame| frame.active)
    }

    /// True while the next token of an `#include` line should lex as a
    /// header name.
    fn expect_header_name(&self, atoms: &AtomTable) -> bool {
        match &self.state {
            PpState::Directive(buf) => {
                buf.len() == 1
                    && buf[0].kind == TokenKind::Identifier
                    && atoms.resolve(buf[0].text) == "include"
                    && self.in_active_region()
            }
            _ => false,
        }
    }

    fn finish_unit(&mut self, cx: &mut PpContext, eof: PPToken) {
        for frame in self.conditionals.drain(..) {
            let _ = frame;
            cx.diag.report(
                eof.spelled_file,
                eof.spelled_range,
                Severity::Warning,
                "unterminated conditional directive".to_string(),
            );
        }

        // Revoke a pending macro invocation, then terminate the stream.
        let Self { expander, disabled, expansion_stack, include_anchor, .. } = self;
        let mut sink = LexSink {
            atoms: cx.atoms,
            lexctx: cx.lexctx,
            callback: cx.callback,
            expansion_stack,
            include_anchor: *include_anchor,
        };
        let mut env = ExpandEnv { macros: cx.macros, disabled, sink: &mut sink, diag: cx.diag };
        expander.finalize(&mut env);
        env.sink.yield_token(&eof);
    }

    fn feed_token(&mut self, cx: &mut PpContext, tok: PPToken) {
        let Self { expander, disabled, expansion_stack, include_anchor, .. } = self;
        let mut sink = LexSink {
            atoms: cx.atoms,
            lexctx: cx.lexctx,
            callback: cx.callback,
            expansion_stack,
            include_anchor: *include_anchor,
        };
        let mut env = ExpandEnv { macros: cx.macros, disabled, sink: &mut sink, diag: cx.diag };
        expander.feed(&mut env, tok);
    }

    fn handle_directive(&mut self, cx: &mut PpContext, toks: &[PPToken]) {
        // A lone `#` is the null directive.
        let Some(&name_tok) = toks.first() else { return };
        let rest = &toks[1..];

        let name = cx.atoms.resolve(name_tok.text).to_string();
        let conditional = matches!(name.as_str(), "if" | "ifdef" | "ifndef" | "elif" | "else" | "endif");
        if !self.in_active_region() && !conditional {
            return;
        }

        match name.as_str() {
            "include" => self.handle_include(cx, name_tok, rest),
            "define" => self.handle_define(cx, name_tok, rest),
            "undef" => self.handle_undef(cx, name_tok, rest),
            "if" => self.handle_if(cx, name_tok, rest),
            "ifdef" => self.handle_ifdef(cx, name_tok, rest, false),
            "ifndef" => self.handle_ifdef(cx, name_tok, rest, true),
            "elif" => self.handle_elif(cx, name_tok, rest),
            "else" => self.handle_else(cx, name_tok, rest),
            "endif" => self.handle_endif(cx, name_tok, rest),
            "version" => self.handle_version(cx, name_tok, rest),
            "extension" => self.handle_extension(cx, name_tok, rest),
            _ => {
                report(cx, name_tok, Severity::Error, format!("unknown directive `#{name}`"));
            }
        }
    }


    fn handle_include(&mut self, cx: &mut PpContext, name_tok: PPToken, rest: &[PPToken]) {
        // Include boundaries are cancellation points.
        if cx.cancel.is_cancelled() {
            return;
        }
        if self.include_depth >= cx.config.max_include_depth {
            report(cx, name_tok, Severity::Error, "include depth limit exceeded".to_string());
            return;
        }

        let Some(header) = rest.first().filter(|t| {
            matches!(t.kind, TokenKind::QuotedString | TokenKind::AngleString)
        }) else {
            report(cx, name_tok, Severity::Error, "expected a header name".to_string());
            return;
        };
        warn_extra_tokens(cx, "include", &rest[1..]);

        let spelled = cx.atoms.resolve(header.text);
        let header_name: String = spelled[1..spelled.len().saturating_sub(1)].to_string();

        // Quoted includes search the including file's directory first.
        let mut search_dirs: Vec<PathBuf> = Vec::new();
        if header.kind == TokenKind::QuotedString {
            if let Some(including) = self.file_stack.last().and_then(|&f| cx.sources.path(f)) {
                if let Some(dir) = including.parent() {
                    search_dirs.push(dir.to_path_buf());
                }
            }
        }
        search_dirs.extend(cx.config.include_paths.iter().cloned());

        let mut opened = None;
        for dir in &search_dirs {
            if let Some(id) = cx.sources.open_file(&dir.join(&header_name)) {
                opened = Some(id);
                break;
            }
        }

        let Some(included) = opened else {
            cx.callback.on_include_directive(header, None);
            report(cx, *header, Severity::Error, format!("cannot open header `{header_name}`"));
            return;
        };

        let resolved = cx.sources.path(included).map(|p| p.to_path_buf());
        debug!(header = %header_name, path = ?resolved, "entering include");
        cx.callback.on_include_directive(header, resolved.as_deref());

        if self.include_depth == 0 {
            self.include_anchor = Some(header.spelled_range.start);
        }
        self.include_depth += 1;
        cx.callback.on_enter_included_file();

        self.process_file(cx, included, false);

        cx.callback.on_exit_included_file();
        self.include_depth -= 1;
        if self.include_depth == 0 {
            self.include_anchor = None;
        }
    }

    fn handle_define(&mut self, cx: &mut PpContext, name_tok: PPToken, rest: &[PPToken]) {
        let Some(&macro_name) = rest.first().filter(|t| t.kind == TokenKind::Identifier) else {
            report(cx, name_tok, Severity::Error, "expected a macro name".to_string());
            return;
        };

        if let Some(existing) = cx.macros.find(macro_name.text) {
            if existing.builtin {
                report(cx, macro_name, Severity::Error, "cannot redefine a builtin macro".to_string());
                return;
            }
            report(
                cx,
                macro_name,
                Severity::Warning,
                format!("macro `{}` redefined", cx.atoms.resolve(macro_name.text)),
            );
        }

        let mut cursor = 1;
        let mut function_like = false;
        let mut params = Vec::new();

        // A parameter list only exists when `(` hugs the macro name.
        if rest.get(cursor).is_some_and(|t| t.kind == TokenKind::LParen && !t.leading_ws) {
            function_like = true;
            cursor += 1;

            if rest.get(cursor).is_some_and(|t| t.kind == TokenKind::RParen) {
                cursor += 1;
            } else {
                let mut expect_comma = false;
                loop {
                    let Some(&tok) = rest.get(cursor) else {
                        report(cx, macro_name, Severity::Error, "unterminated macro parameter list".to_string());
                        return;
                    };
                    cursor += 1;

                    if expect_comma {
                        match tok.kind {
                            TokenKind::Comma => expect_comma = false,
                            TokenKind::RParen => break,
                            _ => {
                                report(cx, tok, Severity::Error, "expected `,` or `)` in macro parameters".to_string());
                                return;
                            }
                        }
                    } else if tok.kind == TokenKind::Identifier {
                        params.push(tok);
                        expect_comma = true;
                    } else {
                        report(cx, tok, Severity::Error, "expected a macro parameter name".to_string());
                        return;
                    }
                }
            }
        }

        let body: Vec<PPToken> = rest[cursor..].to_vec();
        debug!(name = cx.atoms.resolve(macro_name.text), function_like, "defining macro");
        cx.callback.on_define_directive(&macro_name, &params, &body, function_like);

        if function_like {
            cx.macros.define_function(macro_name, params, body);
        } else {
            cx.macros.define_object(macro_name, body);
        }
    }

    fn handle_undef(&mut self, cx: &mut PpContext, name_tok: PPToken, rest: &[PPToken]) {
        let Some(&macro_name) = rest.first().filter(|t| t.kind == TokenKind::Identifier) else {
            report(cx, name_tok, Severity::Error, "expected a macro name".to_string());
            return;
        };
        warn_extra_tokens(cx, "undef", &rest[1..]);

        if cx.macros.find(macro_name.text).is_some_and(|def| def.builtin) {
            report(cx, macro_name, Severity::Error, "cannot undefine a builtin macro".to_string());
            return;
        }

        cx.callback.on_undef_directive(&macro_name);
        if !cx.macros.undef(macro_name.text) {
            report(
                cx,
                macro_name,
                Severity::Warning,
                format!("`{}` is not a defined macro", cx.atoms.resolve(macro_name.text)),
            );
        }
    }

    fn handle_if(&mut self, cx: &mut PpContext, name_tok: PPToken, rest: &[PPToken]) {
        if !self.in_active_region() {
            // Nested under an inactive branch: the whole block stays off.
            self.conditionals.push(ConditionalFrame {
                active: false,
                seen_active_branch: true,
                seen_else: false,
            });
            return;
        }

        let value = match eval::eval_condition(rest, cx.atoms, cx.macros) {
            Some(value) => value,
            None => {
                report(cx, name_tok, Severity::Error, "invalid `#if` expression".to_string());
                false
            }
        };
        cx.callback.on_if_directive(value);
        self.conditionals.push(ConditionalFrame {
            active: value,
            seen_active_branch: value,
            seen_else: false,
        });
    }

    fn handle_ifdef(&mut self, cx: &mut PpContext, name_tok: PPToken, rest: &[PPToken], is_ndef: bool) {
        let Some(&macro_name) = rest.first().filter(|t| t.kind == TokenKind::Identifier) else {
            report(cx, name_tok, Severity::Error, "expected a macro name".to_string());
            self.conditionals.push(ConditionalFrame {
                active: false,
                seen_active_branch: true,
                seen_else: false,
            });
            return;
        };
        warn_extra_tokens(cx, if is_ndef { "ifndef" } else { "ifdef" }, &rest[1..]);

        cx.callback.on_ifdef_directive(&macro_name, is_ndef);

        if !self.in_active_region() {
            self.conditionals.push(ConditionalFrame {
                active: false,
                seen_active_branch: true,
                seen_else: false,
            });
            return;
        }

        let active = cx.macros.is_defined(macro_name.text) != is_ndef;
        self.conditionals.push(ConditionalFrame {
            active,
            seen_active_branch: active,
            seen_else: false,
        });
    }

    fn handle_elif(&mut self, cx: &mut PpContext, name_tok: PPToken, rest: &[PPToken]) {
        let parent_active = {
            let frames = &self.conditionals;
            !frames.is_empty() && frames[..frames.len() - 1].iter().all(|f| f.active)
        };
        let Some(frame) = self.conditionals.last_mut() else {
            report(cx, name_tok, Severity::Warning, "`#elif` without matching `#if`".to_string());
            return;
        };

        if frame.seen_else {
            frame.active = false;
            report(cx, name_tok, Severity::Error, "`#elif` after `#else`".to_string());
            return;
        }

        if frame.seen_active_branch || !parent_active {
            frame.active = false;
            cx.callback.on_elif_directive(false);
            return;
        }

        let value = match eval::eval_condition(rest, cx.atoms, cx.macros) {
            Some(value) => value,
            None => {
                cx.diag.report(
                    name_tok.spelled_file,
                    name_tok.spelled_range,
                    Severity::Error,
                    "invalid `#elif` expression".to_string(),
                );
                false
            }
        };
        let frame = self.conditionals.last_mut().expect("frame checked above");
        frame.active = value;
        frame.seen_active_branch |= value;
        cx.callback.on_elif_directive(value);
    }

    fn handle_else(&mut self, cx: &mut PpContext, name_tok: PPToken, rest: &[PPToken]) {
        warn_extra_tokens(cx, "else", rest);

        let Some(frame) = self.conditionals.last_mut() else {
            report(cx, name_tok, Severity::Warning, "`#else` without matching `#if`".to_string());
            return;
        };

        if frame.seen_else {
            frame.active = false;
            report(cx, name_tok, Severity::Error, "duplicate `#else`".to_string());
            return;
        }

        frame.active = !frame.seen_active_branch;
        frame.seen_else = true;
        cx.callback.on_else_directive();
    }

    fn handle_endif(&mut self, cx: &mut PpContext, name_tok: PPToken, rest: &[PPToken]) {
        warn_extra_tokens(cx, "endif", rest);

        if self.conditionals.pop().is_none() {
            report(cx, name_tok, Severity::Warning, "`#endif` without matching `#if`".to_string());
        } else {
            cx.callback.on_endif_directive();
        }
    }

    fn handle_version(&mut self, cx: &mut PpContext, name_tok: PPToken, rest: &[PPToken]) {
        let Some(number_tok) = rest.first().filter(|t| t.kind == TokenKind::IntConst) else {
            report(cx, name_tok, Severity::Error, "expected a version number".to_string());
            return;
        };

        let Some(version) = cx
            .atoms
            .resolve(number_tok.text)
            .parse::<u32>()
            .ok()
            .and_then(GlslVersion::from_number)
        else {
            report(cx, *number_tok, Severity::Error, "unsupported GLSL version".to_string());
            return;
        };

        let mut profile = GlslProfile::Core;
        if let Some(profile_tok) = rest.get(1) {
            match GlslProfile::from_name(cx.atoms.resolve(profile_tok.text)) {
                Some(parsed) => profile = parsed,
                None => {
                    report(cx, *profile_tok, Severity::Error, "unknown shader profile".to_string());
                }
            }
            warn_extra_tokens(cx, "version", &rest[2..]);
        }

        let range = TextRange::new(name_tok.spelled_range.start, rest.last().unwrap().spelled_range.end);
        cx.callback.on_version_directive(name_tok.spelled_file, range, version, profile);
    }

    fn handle_extension(&mut self, cx: &mut PpContext, name_tok: PPToken, rest: &[PPToken]) {
        let (Some(ext_tok), Some(colon), Some(behavior_tok)) = (rest.first(), rest.get(1), rest.get(2)) else {
            report(cx, name_tok, Severity::Error, "malformed `#extension` directive".to_string());
            return;
        };
        if ext_tok.kind != TokenKind::Identifier || colon.kind != TokenKind::Colon {
            report(cx, name_tok, Severity::Error, "malformed `#extension` directive".to_string());
            return;
        }
        warn_extra_tokens(cx, "extension", &rest[3..]);

        let Some(behavior) = ExtensionBehavior::from_name(cx.atoms.resolve(behavior_tok.text)) else {
            report(cx, *behavior_tok, Severity::Error, "unknown extension behavior".to_string());
            return;
        };

        let ext_name = cx.atoms.resolve(ext_tok.text);
        let Some(extension) = Extension::from_name(ext_name) else {
            if behavior == ExtensionBehavior::Require {
                report(cx, *ext_tok, Severity::Error, format!("unsupported extension `{ext_name}`"));
            } else {
                report(cx, *ext_tok, Severity::Warning, format!("unknown extension `{ext_name}`"));
            }
            return;
        };

        cx.extensions.apply(extension, behavior);
        let range = TextRange::new(name_tok.spelled_range.start, behavior_tok.spelled_range.end);
        cx.callback.on_extension_directive(name_tok.spelled_file, range, extension, behavior);
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}

fn report(cx: &PpContext, tok: PPToken, severity: Severity, message: String) {
    cx.diag.report(tok.spelled_file, tok.spelled_range, severity, message);
}

fn warn_extra_tokens(cx: &PpContext, directive: &str, rest: &[PPToken]) {
    if let Some(extra) = rest.first() {
        report(cx, *extra, Severity::Warning, format!("extra tokens after `#{directive}`"));
    }
}

/// Terminal sink: registers tokens into the lex context and reports macro
/// expansion extents to the callback.
struct LexSink<'s> {
    atoms: &'s AtomTable,
    lexctx: &'s mut LexContext,
    callback: &'s mut dyn PPCallback,
    expansion_stack: &'s mut Vec<(PPToken, u32)>,
    include_anchor: Option<TextPosition>,
}

impl ExpansionSink for LexSink<'_> {
    fn yield_token(&mut self, token: &PPToken) {
        // Tokens spelled in an included file occupy the position of the
        // top-level include directive in the expanded stream.
        let expanded_range = match self.include_anchor {
            Some(anchor) => TextRange::collapsed(anchor),
            None => token.spelled_range,
        };
        self.lexctx.add_token(self.atoms, token, expanded_range);
    }

    fn enter_expansion(&mut self, use_tok: &PPToken) {
        self.expansion_stack.push((*use_tok, self.lexctx.next_index()));
    }

    fn exit_expansion(&mut self, _use_tok: &PPToken) {
        if let Some((use_tok, begin)) = self.expansion_stack.pop() {
            let range = SyntaxRange {
                unit: self.lexctx.unit(),
                begin,
                end: self.lexctx.next_index(),
            };
            self.callback.on_macro_expansion(&use_tok, range);
        }
    }
}
