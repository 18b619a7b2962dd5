use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::{debug, info_span};

use crate::artifacts::{CompileResult, PrecompiledPreamble, UnitArtifacts, UnitSlots};
use crate::ast::AstStore;
use crate::atom::AtomTable;
use crate::builder::AstBuilder;
use crate::cancel::CancellationToken;
use crate::config::{CompilerConfig, GlslProfile, LanguageConfig};
use crate::diag::{CollectingSink, CompileError, Severity};
use crate::fs::{FileSystem, OsFileSystem};
use crate::lexctx::LexContext;
use crate::parser::Parser;
use crate::pp::{MacroTable, NoopPPCallback, PPCallback, PpContext, Preprocessor};
use crate::ppstore::PreprocessSymbolStore;
use crate::source::{FileId, TextRange, UnitId};
use crate::sources::SourceManager;
use crate::stdlib;
use crate::symbols::SymbolTable;
use crate::token::{PPToken, TokenKind};
use crate::tokenizer::Tokenizer;
use crate::types::TypeUniverse;

/// Front-end entry point: configuration plus the file system the compile
/// reads through. One compiler can run many compilations; each compilation
/// owns its own contexts.
pub struct Compiler {
    lang: LanguageConfig,
    config: CompilerConfig,
    fs: Arc<dyn FileSystem>,
    user_preamble: Option<String>,
}

impl Compiler {
    pub fn new(lang: LanguageConfig, config: CompilerConfig) -> Self {
        Self::with_file_system(lang, config, Arc::new(OsFileSystem))
    }

    pub fn with_file_system(
        lang: LanguageConfig,
        config: CompilerConfig,
        fs: Arc<dyn FileSystem>,
    ) -> Self {
        Self { lang, config, fs, user_preamble: None }
    }

    pub fn language_config(&self) -> &LanguageConfig {
        &self.lang
    }

    /// Text compiled as the user preamble unit when no precompiled preamble
    /// is supplied.
    pub fn set_user_preamble(&mut self, text: impl Into<String>) {
        self.user_preamble = Some(text.into());
    }

    /// Compile an in-memory buffer as the main file.
    pub fn compile_source(
        &self,
        source: &str,
        preamble: Option<&PrecompiledPreamble>,
        cancel: &CancellationToken,
    ) -> CompileResult {
        let mut callback = NoopPPCallback;
        self.compile_impl(MainInput::Buffer(source), preamble, &mut callback, cancel)
    }

    /// Compile with an additional preprocessor observer.
    pub fn compile_source_with_callback(
        &self,
        source: &str,
        preamble: Option<&PrecompiledPreamble>,
        callback: &mut dyn PPCallback,
        cancel: &CancellationToken,
    ) -> CompileResult {
        self.compile_impl(MainInput::Buffer(source), preamble, callback, cancel)
    }

    /// Compile a file on the (possibly virtual) file system.
    pub fn compile_file(
        &self,
        path: &Path,
        preamble: Option<&PrecompiledPreamble>,
        cancel: &CancellationToken,
    ) -> Result<CompileResult, CompileError> {
        if self.fs.canonicalize(path).is_none() {
            return Err(CompileError::MainFileNotFound { path: path.display().to_string() });
        }
        let mut callback = NoopPPCallback;
        Ok(self.compile_impl(MainInput::File(path), preamble, &mut callback, cancel))
    }

    /// Build the precompiled preamble for this configuration: the system
    /// preamble (built-in declarations) plus the configured user preamble,
    /// compiled once and shared by later compilations.
    pub fn create_preamble(&self) -> Arc<PrecompiledPreamble> {
        let cancel = CancellationToken::new();
        let mut callback = NoopPPCallback;
        let result = self.compile_impl(MainInput::Buffer(""), None, &mut callback, &cancel);
        Arc::new(PrecompiledPreamble::from_result(self.lang, &result))
    }

    fn compile_impl(
        &self,
        input: MainInput,
        preamble: Option<&PrecompiledPreamble>,
        user_callback: &mut dyn PPCallback,
        cancel: &CancellationToken,
    ) -> CompileResult {
        let _span = info_span!("compile", with_preamble = preamble.is_some()).entered();

        let sink = CollectingSink::new();
        let mut sources = SourceManager::new(self.fs.clone());

        let (mut atoms, mut macros, mut types, mut units, preamble_scopes) = match preamble {
            Some(preamble) => {
                let (atoms, macros, types) = preamble.clone_tables();
                (atoms, macros, types, preamble.units().clone(), preamble.global_scopes().to_vec())
            }
            None => (
                AtomTable::new(),
                MacroTable::new(),
                TypeUniverse::new(),
                UnitSlots::default(),
                Vec::new(),
            ),
        };

        let mut symbols = SymbolTable::new(preamble_scopes);

        if preamble.is_none() {
            self.define_builtin_macros(&mut atoms, &mut macros);

            if !self.lang.no_stdlib {
                sources.set_system_preamble(stdlib::system_preamble_source(&self.lang));
                let unit = self.compile_unit(
                    UnitId::SystemPreamble,
                    FileId::SYSTEM_PREAMBLE,
                    &mut atoms,
                    &mut macros,
                    &mut types,
                    &mut symbols,
                    &mut sources,
                    &units,
                    &sink,
                    &mut NoopPPCallback,
                    cancel,
                );
                units[UnitId::SystemPreamble.index()] = Some(unit);
            }

            if let Some(user_preamble) = &self.user_preamble {
                sources.set_user_preamble(user_preamble.as_str());
                let unit = self.compile_unit(
                    UnitId::UserPreamble,
                    FileId::USER_PREAMBLE,
                    &mut atoms,
                    &mut macros,
                    &mut types,
                    &mut symbols,
                    &mut sources,
                    &units,
                    &sink,
                    &mut NoopPPCallback,
                    cancel,
                );
                units[UnitId::UserPreamble.index()] = Some(unit);
            }
        }

        let main_file = match input {
            MainInput::Buffer(text) => sources.open_buffer(text),
            MainInput::File(path) => match sources.open_file(path) {
                Some(id) => id,
                None => sources.open_buffer(""),
            },
        };

        let mut pp_store = PreprocessSymbolStore::new();
        {
            let mut collector = pp_store.collector();
            let mut callback = ChainedCallback { first: &mut collector, second: user_callback };
            let unit = self.compile_unit(
                UnitId::UserFile,
                main_file,
                &mut atoms,
                &mut macros,
                &mut types,
                &mut symbols,
                &mut sources,
                &units,
                &sink,
                &mut callback,
                cancel,
            );
            units[UnitId::UserFile.index()] = Some(unit);
        }

        // Freeze this compilation's global scope so a preamble built from
        // the result can share it.
        let mut global_scopes = symbols.into_global_scopes();
        debug!(scopes = global_scopes.len(), "compilation finished");

        CompileResult {
            atoms,
            macros,
            types,
            units,
            global_scopes: {
                global_scopes.shrink_to_fit();
                global_scopes
            },
            pp_store,
            diagnostics: sink.take(),
            main_file,
            file_paths: sources.file_paths(),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn compile_unit(
        &self,
        unit: UnitId,
        root_file: FileId,
        atoms: &mut AtomTable,
        macros: &mut MacroTable,
        types: &mut TypeUniverse,
        symbols: &mut SymbolTable,
        sources: &mut SourceManager,
        prior_units: &UnitSlots,
        sink: &CollectingSink,
        callback: &mut dyn PPCallback,
        cancel: &CancellationToken,
    ) -> Arc<UnitArtifacts> {
        let _span = info_span!("unit", id = ?unit).entered();

        let mut lexctx = LexContext::new(unit);
        {
            let _lex_span = info_span!("lex").entered();
            let mut extensions = self.lang.extensions;
            let mut cx = PpContext {
                atoms,
                macros,
                sources,
                lexctx: &mut lexctx,
                diag: sink,
                callback,
                config: &self.config,
                extensions: &mut extensions,
                cancel,
            };
            Preprocessor::new().process_unit(&mut cx, root_file);
        }

        let tokens = lexctx.finish();
        let mut store = AstStore::new();
        {
            let _parse_span = info_span!("parse").entered();
            let builder = AstBuilder::new(unit, &mut store, types, symbols, atoms, &tokens, prior_units, sink);
            Parser::new(builder, cancel.clone()).parse_translation_unit();
        }

        Arc::new(UnitArtifacts { unit, tokens, ast: store })
    }

    /// Predefine `__VERSION__`, the profile macros, the feature macros of
    /// every enabled extension, and the command-line defines.
    fn define_builtin_macros(&self, atoms: &mut AtomTable, macros: &mut MacroTable) {
        let make_token = |atoms: &mut AtomTable, kind: TokenKind, text: &str| PPToken {
            kind,
            spelled_file: FileId::SYSTEM_PREAMBLE,
            spelled_range: TextRange::default(),
            text: atoms.intern(text),
            first_of_line: false,
            leading_ws: false,
        };

        let version = self.lang.version.number().to_string();
        let name = make_token(atoms, TokenKind::Identifier, "__VERSION__");
        let value = make_token(atoms, TokenKind::IntConst, &version);
        macros.define_builtin(name, vec![value]);

        let profile_macro = match self.lang.profile {
            GlslProfile::Core => "GL_core_profile",
            GlslProfile::Compatibility => "GL_compatibility_profile",
            GlslProfile::Es => "GL_es_profile",
        };
        let name = make_token(atoms, TokenKind::Identifier, profile_macro);
        let one = make_token(atoms, TokenKind::IntConst, "1");
        macros.define_builtin(name, vec![one]);

        for ext in self.lang.extensions.iter_enabled() {
            let name = make_token(atoms, TokenKind::Identifier, ext.name());
            let one = make_token(atoms, TokenKind::IntConst, "1");
            macros.define_builtin(name, vec![one]);
        }

        for define in &self.config.defines {
            let (name, value) = match define.split_once('=') {
                Some((name, value)) => (name, value),
                None => (define.as_str(), "1"),
            };
            if name.is_empty() {
                continue;
            }

            // The value is lexed like ordinary source so compound
            // replacement lists work.
            let mut tokenizer = Tokenizer::new(FileId::SYSTEM_PREAMBLE, value, false);
            let mut body = Vec::new();
            loop {
                let tok = tokenizer.next_token(atoms, false);
                if tok.kind == TokenKind::Eof {
                    break;
                }
                body.push(tok);
            }

            let name = make_token(atoms, TokenKind::Identifier, name);
            debug!(name = atoms.resolve(name.text), "predefined macro");
            macros.define_object(name, body);
        }
    }
}

enum MainInput<'a> {
    Buffer(&'a str),
    File(&'a Path),
}

struct ChainedCallback<'a> {
    first: &'a mut dyn PPCallback,
    second: &'a mut dyn PPCallback,
}

impl PPCallback for ChainedCallback<'_> {
    fn on_version_directive(
        &mut self,
        file: FileId,
        range: TextRange,
        version: crate::config::GlslVersion,
        profile: GlslProfile,
    ) {
        self.first.on_version_directive(file, range, version, profile);
        self.second.on_version_directive(file, range, version, profile);
    }

    fn on_extension_directive(
        &mut self,
        file: FileId,
        range: TextRange,
        extension: crate::config::Extension,
        behavior: crate::config::ExtensionBehavior,
    ) {
        self.first.on_extension_directive(file, range, extension, behavior);
        self.second.on_extension_directive(file, range, extension, behavior);
    }

    fn on_include_directive(&mut self, header_name: &PPToken, resolved_path: Option<&Path>) {
        self.first.on_include_directive(header_name, resolved_path);
        self.second.on_include_directive(header_name, resolved_path);
    }

    fn on_define_directive(
        &mut self,
        macro_name: &PPToken,
        params: &[PPToken],
        body: &[PPToken],
        function_like: bool,
    ) {
        self.first.on_define_directive(macro_name, params, body, function_like);
        self.second.on_define_directive(macro_name, params, body, function_like);
    }

    fn on_undef_directive(&mut self, macro_name: &PPToken) {
        self.first.on_undef_directive(macro_name);
        self.second.on_undef_directive(macro_name);
    }

    fn on_if_directive(&mut self, taken: bool) {
        self.first.on_if_directive(taken);
        self.second.on_if_directive(taken);
    }

    fn on_elif_directive(&mut self, taken: bool) {
        self.first.on_elif_directive(taken);
        self.second.on_elif_directive(taken);
    }

    fn on_ifdef_directive(&mut self, macro_name: &PPToken, is_ndef: bool) {
        self.first.on_ifdef_directive(macro_name, is_ndef);
        self.second.on_ifdef_directive(macro_name, is_ndef);
    }

    fn on_else_directive(&mut self) {
        self.first.on_else_directive();
        self.second.on_else_directive();
    }

    fn on_endif_directive(&mut self) {
        self.first.on_endif_directive();
        self.second.on_endif_directive();
    }

    fn on_enter_included_file(&mut self) {
        self.first.on_enter_included_file();
        self.second.on_enter_included_file();
    }

    fn on_exit_included_file(&mut self) {
        self.first.on_exit_included_file();
        self.second.on_exit_included_file();
    }

    fn on_macro_expansion(&mut self, macro_use: &PPToken, expanded_tokens: crate::token::SyntaxRange) {
        self.first.on_macro_expansion(macro_use, expanded_tokens);
        self.second.on_macro_expansion(macro_use, expanded_tokens);
    }
}

/// Shared cache of precompiled preambles, keyed by the language
/// configuration hash. Lookups hold the lock only long enough to clone the
/// `Arc`; building a missing preamble happens outside the lock.
#[derive(Default)]
pub struct PreambleCache {
    entries: Mutex<FxHashMap<u64, Arc<PrecompiledPreamble>>>,
}

impl PreambleCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, lang: &LanguageConfig) -> Option<Arc<PrecompiledPreamble>> {
        self.entries.lock().get(&lang.hash_code()).cloned()
    }

    /// Fetch the preamble for the compiler's configuration, building and
    /// publishing it on first use.
    pub fn get_or_build(&self, compiler: &Compiler) -> Arc<PrecompiledPreamble> {
        let key = compiler.language_config().hash_code();
        if let Some(hit) = self.entries.lock().get(&key).cloned() {
            return hit;
        }

        let built = compiler.create_preamble();
        let mut entries = self.entries.lock();
        entries.entry(key).or_insert_with(|| built.clone()).clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl std::fmt::Debug for Compiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compiler")
            .field("lang", &self.lang)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// Recovered diagnostics never abort a compile, but a caller may still want
// to know whether any error-severity entry exists.
pub fn has_errors(result: &CompileResult) -> bool {
    result.diagnostics.iter().any(|d| d.severity == Severity::Error)
}
