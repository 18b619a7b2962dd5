use std::path::PathBuf;
use std::sync::Arc;

use crate::ast::{AstNode, AstStore, NodeRef};
use crate::atom::AtomTable;
use crate::config::LanguageConfig;
use crate::diag::Diagnostic;
use crate::pp::MacroTable;
use crate::ppstore::PreprocessSymbolStore;
use crate::source::{FileId, TextRange, UnitId};
use crate::symbols::Scope;
use crate::token::{RawSyntaxToken, SyntaxRange, TokenId};
use crate::types::TypeUniverse;

/// Lex and parse artifacts of one translation unit.
#[derive(Debug)]
pub struct UnitArtifacts {
    pub unit: UnitId,
    /// Post-expansion token stream, ending with `Eof`.
    pub tokens: Vec<RawSyntaxToken>,
    pub ast: AstStore,
}

/// Per-unit artifact slots of one compilation. Preamble slots hold shared
/// references into the preamble; the user-file slot is always owned.
pub type UnitSlots = [Option<Arc<UnitArtifacts>>; UnitId::COUNT];

/// Everything a finished compilation leaves behind. The query layer is a
/// read-only view over this.
#[derive(Debug)]
pub struct CompileResult {
    pub atoms: AtomTable,
    pub macros: MacroTable,
    pub types: TypeUniverse,
    pub units: UnitSlots,
    /// Global scopes in unit order: inherited preamble scopes first, the
    /// user file's own global scope last.
    pub global_scopes: Vec<Arc<Scope>>,
    pub pp_store: PreprocessSymbolStore,
    pub diagnostics: Vec<Diagnostic>,
    /// The main file of the user-file unit.
    pub main_file: FileId,
    /// Paths of the user files opened during the compile, index-aligned
    /// with `FileId::from_user_index`.
    pub file_paths: Vec<Option<PathBuf>>,
}

impl CompileResult {
    pub fn unit(&self, unit: UnitId) -> Option<&UnitArtifacts> {
        self.units[unit.index()].as_deref()
    }

    pub fn user_unit(&self) -> &UnitArtifacts {
        self.unit(UnitId::UserFile).expect("user file unit is always compiled")
    }

    pub fn token(&self, id: TokenId) -> Option<&RawSyntaxToken> {
        self.unit(id.unit)?.tokens.get(id.index as usize)
    }

    pub fn node(&self, nref: NodeRef) -> Option<&AstNode> {
        Some(self.unit(nref.unit)?.ast.node(nref.node))
    }

    pub fn token_text(&self, id: TokenId) -> &str {
        match self.token(id) {
            Some(tok) => self.atoms.resolve(tok.text),
            None => "",
        }
    }

    /// Expanded range covered by a token range; empty ranges collapse onto
    /// the start of their begin token.
    pub fn expanded_range(&self, range: SyntaxRange) -> TextRange {
        if range.is_empty() {
            let start = self
                .token(range.begin_id())
                .map(|t| t.expanded_range.start)
                .unwrap_or_default();
            return TextRange::collapsed(start);
        }
        let start = self
            .token(range.begin_id())
            .map(|t| t.expanded_range.start)
            .unwrap_or_default();
        let end = self
            .token(range.back_id())
            .map(|t| t.expanded_range.end)
            .unwrap_or_default();
        TextRange { start, end }
    }

    pub fn is_main_file(&self, file: FileId) -> bool {
        file == self.main_file
    }

    /// Spelled range of a token, restricted to the main file.
    pub fn spelled_range_in_main_file(&self, id: TokenId) -> Option<TextRange> {
        if id.unit != UnitId::UserFile {
            return None;
        }
        let tok = self.token(id)?;
        (tok.spelled_file == self.main_file).then_some(tok.spelled_range)
    }

    pub fn file_path(&self, file: FileId) -> Option<&std::path::Path> {
        self.file_paths.get(file.user_index()?)?.as_deref()
    }
}

/// Immutable artifacts of a compiled preamble, shared by reference with
/// every later compilation that uses it.
#[derive(Debug, Clone)]
pub struct PrecompiledPreamble {
    inner: Arc<PreambleData>,
}

#[derive(Debug)]
struct PreambleData {
    config: LanguageConfig,
    atoms: AtomTable,
    macros: MacroTable,
    types: TypeUniverse,
    units: UnitSlots,
    global_scopes: Vec<Arc<Scope>>,
}

impl PrecompiledPreamble {
    pub fn from_result(config: LanguageConfig, result: &CompileResult) -> Self {
        // Only the preamble units carry over; the (empty) user-file unit of
        // the preamble compilation is discarded.
        let mut units: UnitSlots = Default::default();
        units[UnitId::SystemPreamble.index()] = result.units[UnitId::SystemPreamble.index()].clone();
        units[UnitId::UserPreamble.index()] = result.units[UnitId::UserPreamble.index()].clone();
        Self {
            inner: Arc::new(PreambleData {
                config,
                atoms: result.atoms.clone(),
                macros: result.macros.clone(),
                types: result.types.clone(),
                units,
                global_scopes: result.global_scopes.clone(),
            }),
        }
    }

    pub fn config(&self) -> &LanguageConfig {
        &self.inner.config
    }

    /// Growable-table seeds for a successor compilation. Cloning keeps every
    /// preamble handle (atoms, types) valid in the successor.
    pub fn clone_tables(&self) -> (AtomTable, MacroTable, TypeUniverse) {
        (self.inner.atoms.clone(), self.inner.macros.clone(), self.inner.types.clone())
    }

    pub fn units(&self) -> &UnitSlots {
        &self.inner.units
    }

    pub fn global_scopes(&self) -> &[Arc<Scope>] {
        &self.inner.global_scopes
    }

    /// Token count across the preamble units.
    pub fn token_count(&self) -> u32 {
        self.inner
            .units
            .iter()
            .flatten()
            .map(|unit| unit.tokens.len() as u32)
            .sum()
    }
}
