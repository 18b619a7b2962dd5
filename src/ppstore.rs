use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;

use crate::pp::{MacroDefinition, PPCallback};
use crate::source::{TextPosition, TextRange};
use crate::token::{PPToken, SyntaxRange};

/// A header name spelled in the main file together with where it resolved.
#[derive(Debug, Clone)]
pub struct HeaderNameSymbol {
    pub header_name: PPToken,
    pub resolved_path: Option<PathBuf>,
}

/// A macro name spelled in the main file: a definition site, an `#ifdef`
/// test, an `#undef`, or an expansion.
#[derive(Debug, Clone)]
pub struct MacroSymbol {
    pub macro_name: PPToken,
    /// Tokens the expansion produced, empty for non-expansion sites.
    pub expanded_tokens: Option<SyntaxRange>,
    /// Index into the store's definition list, when the macro was defined.
    pub definition: Option<usize>,
}

#[derive(Debug, Clone)]
pub enum PPSymbolData {
    HeaderName(HeaderNameSymbol),
    Macro(MacroSymbol),
}

/// One preprocessor-level symbol occurrence, keyed by its spelled range in
/// the main file.
#[derive(Debug, Clone)]
pub struct PPSymbolOccurrence {
    pub spelled_range: TextRange,
    pub data: PPSymbolData,
}

impl PPSymbolOccurrence {
    pub fn header_name(&self) -> Option<&HeaderNameSymbol> {
        match &self.data {
            PPSymbolData::HeaderName(info) => Some(info),
            _ => None,
        }
    }

    pub fn macro_info(&self) -> Option<&MacroSymbol> {
        match &self.data {
            PPSymbolData::Macro(info) => Some(info),
            _ => None,
        }
    }
}

/// Records preprocessor activity of the main file so the query layer can
/// answer position queries over directives and macro expansions.
///
/// Only depth-zero events are kept; activity inside included files belongs
/// to those files.
#[derive(Debug, Default)]
pub struct PreprocessSymbolStore {
    definitions: Vec<MacroDefinition>,
    occurrences: Vec<PPSymbolOccurrence>,
}

impl PreprocessSymbolStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn occurrences(&self) -> &[PPSymbolOccurrence] {
        &self.occurrences
    }

    pub fn definition(&self, index: usize) -> Option<&MacroDefinition> {
        self.definitions.get(index)
    }

    /// The occurrence whose spelled range contains `pos`, if any.
    ///
    /// Occurrences arrive in source order, so a binary search on range end
    /// finds the only candidate.
    pub fn find_occurrence(&self, pos: TextPosition) -> Option<&PPSymbolOccurrence> {
        let idx = self.occurrences.partition_point(|occ| occ.spelled_range.end <= pos);
        self.occurrences
            .get(idx)
            .filter(|occ| occ.spelled_range.contains(pos))
    }

    /// All header-name occurrences, for semantic tokens.
    pub fn header_names(&self) -> impl Iterator<Item = &PPSymbolOccurrence> {
        self.occurrences
            .iter()
            .filter(|occ| matches!(occ.data, PPSymbolData::HeaderName(_)))
    }

    /// All macro-name occurrences, for semantic tokens.
    pub fn macro_uses(&self) -> impl Iterator<Item = &PPSymbolOccurrence> {
        self.occurrences
            .iter()
            .filter(|occ| matches!(occ.data, PPSymbolData::Macro(_)))
    }

    /// Macro definition occurrences of the main file, for document symbols.
    pub fn definition_sites(&self) -> impl Iterator<Item = (&PPSymbolOccurrence, &MacroDefinition)> {
        self.occurrences.iter().filter_map(|occ| match &occ.data {
            PPSymbolData::Macro(m) if m.expanded_tokens.is_none() => {
                let def = m.definition.and_then(|i| self.definitions.get(i))?;
                (def.name_tok.spelled_range == occ.spelled_range).then_some((occ, def))
            }
            _ => None,
        })
    }

    /// A callback that fills this store during compilation of the user file.
    pub fn collector(&mut self) -> PreprocessInfoCollector<'_> {
        PreprocessInfoCollector {
            store: self,
            include_depth: 0,
            macro_lookup: FxHashMap::default(),
        }
    }
}

/// `PPCallback` implementation feeding a [`PreprocessSymbolStore`].
pub struct PreprocessInfoCollector<'s> {
    store: &'s mut PreprocessSymbolStore,
    include_depth: usize,
    macro_lookup: FxHashMap<crate::atom::Atom, usize>,
}

impl PreprocessInfoCollector<'_> {
    fn at_top_level(&self) -> bool {
        self.include_depth == 0
    }
}

impl PPCallback for PreprocessInfoCollector<'_> {
    fn on_include_directive(&mut self, header_name: &PPToken, resolved_path: Option<&Path>) {
        if self.at_top_level() {
            self.store.occurrences.push(PPSymbolOccurrence {
                spelled_range: header_name.spelled_range,
                data: PPSymbolData::HeaderName(HeaderNameSymbol {
                    header_name: *header_name,
                    resolved_path: resolved_path.map(|p| p.to_path_buf()),
                }),
            });
        }
    }

    fn on_define_directive(
        &mut self,
        macro_name: &PPToken,
        params: &[PPToken],
        body: &[PPToken],
        function_like: bool,
    ) {
        if !self.at_top_level() {
            return;
        }
        let index = self.store.definitions.len();
        self.store.definitions.push(MacroDefinition {
            function_like,
            builtin: false,
            name_tok: *macro_name,
            params: params.to_vec(),
            body: body.to_vec(),
        });
        self.macro_lookup.insert(macro_name.text, index);
        self.store.occurrences.push(PPSymbolOccurrence {
            spelled_range: macro_name.spelled_range,
            data: PPSymbolData::Macro(MacroSymbol {
                macro_name: *macro_name,
                expanded_tokens: None,
                definition: Some(index),
            }),
        });
    }

    fn on_undef_directive(&mut self, macro_name: &PPToken) {
        if !self.at_top_level() {
            return;
        }
        // The name is still a macro occurrence, pointing at the definition
        // it removes.
        let definition = self.macro_lookup.remove(&macro_name.text);
        self.store.occurrences.push(PPSymbolOccurrence {
            spelled_range: macro_name.spelled_range,
            data: PPSymbolData::Macro(MacroSymbol {
                macro_name: *macro_name,
                expanded_tokens: None,
                definition,
            }),
        });
    }

    fn on_ifdef_directive(&mut self, macro_name: &PPToken, _is_ndef: bool) {
        if !self.at_top_level() {
            return;
        }
        self.store.occurrences.push(PPSymbolOccurrence {
            spelled_range: macro_name.spelled_range,
            data: PPSymbolData::Macro(MacroSymbol {
                macro_name: *macro_name,
                expanded_tokens: None,
                definition: self.macro_lookup.get(&macro_name.text).copied(),
            }),
        });
    }

    fn on_enter_included_file(&mut self) {
        self.include_depth += 1;
    }

    fn on_exit_included_file(&mut self) {
        self.include_depth -= 1;
    }

    fn on_macro_expansion(&mut self, macro_use: &PPToken, expanded_tokens: SyntaxRange) {
        if self.at_top_level() && !macro_use.spelled_range.is_empty() {
            self.store.occurrences.push(PPSymbolOccurrence {
                spelled_range: macro_use.spelled_range,
                data: PPSymbolData::Macro(MacroSymbol {
                    macro_name: *macro_use,
                    expanded_tokens: Some(expanded_tokens),
                    definition: self.macro_lookup.get(&macro_use.text).copied(),
                }),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::AtomTable;
    use crate::source::FileId;
    use crate::token::TokenKind;

    fn name_tok(atoms: &mut AtomTable, text: &str, line: u32, col: u32) -> PPToken {
        PPToken {
            kind: TokenKind::Identifier,
            spelled_file: FileId::from_user_index(0),
            spelled_range: TextRange::new(
                TextPosition::new(line, col),
                TextPosition::new(line, col + text.len() as u32),
            ),
            text: atoms.intern(text),
            first_of_line: false,
            leading_ws: false,
        }
    }

    #[test]
    fn define_then_expansion_links_to_definition() {
        let mut atoms = AtomTable::new();
        let mut store = PreprocessSymbolStore::new();
        let def_tok = name_tok(&mut atoms, "N", 0, 8);
        let use_tok = name_tok(&mut atoms, "N", 2, 6);

        {
            let mut collector = store.collector();
            collector.on_define_directive(&def_tok, &[], &[], false);
            collector.on_macro_expansion(
                &use_tok,
                SyntaxRange { unit: crate::source::UnitId::UserFile, begin: 4, end: 5 },
            );
        }

        assert_eq!(store.occurrences().len(), 2);
        let found = store.find_occurrence(TextPosition::new(2, 6)).unwrap();
        let info = found.macro_info().unwrap();
        assert!(info.expanded_tokens.is_some());
        assert_eq!(info.definition, Some(0));
        assert!(store.definition(0).is_some());
    }

    #[test]
    fn events_inside_includes_are_ignored() {
        let mut atoms = AtomTable::new();
        let mut store = PreprocessSymbolStore::new();
        let tok = name_tok(&mut atoms, "INNER", 0, 0);

        {
            let mut collector = store.collector();
            collector.on_enter_included_file();
            collector.on_define_directive(&tok, &[], &[], false);
            collector.on_exit_included_file();
        }

        assert!(store.occurrences().is_empty());
    }

    #[test]
    fn undef_unlinks_later_uses() {
        let mut atoms = AtomTable::new();
        let mut store = PreprocessSymbolStore::new();
        let def_tok = name_tok(&mut atoms, "X", 0, 8);
        let undef_tok = name_tok(&mut atoms, "X", 1, 7);
        let use_tok = name_tok(&mut atoms, "X", 2, 2);

        {
            let mut collector = store.collector();
            collector.on_define_directive(&def_tok, &[], &[], false);
            collector.on_undef_directive(&undef_tok);
            collector.on_ifdef_directive(&use_tok, false);
        }

        let last = store.occurrences().last().unwrap().macro_info().unwrap();
        assert_eq!(last.definition, None);
        // The undef site itself still points at the removed definition.
        let undef_occ = store.find_occurrence(TextPosition::new(1, 7)).unwrap();
        assert_eq!(undef_occ.macro_info().unwrap().definition, Some(0));
    }

    #[test]
    fn position_lookup_misses_between_occurrences() {
        let mut atoms = AtomTable::new();
        let mut store = PreprocessSymbolStore::new();
        let def_tok = name_tok(&mut atoms, "LONGNAME", 3, 8);
        {
            let mut collector = store.collector();
            collector.on_define_directive(&def_tok, &[], &[], false);
        }

        assert!(store.find_occurrence(TextPosition::new(3, 7)).is_none());
        assert!(store.find_occurrence(TextPosition::new(3, 8)).is_some());
        assert!(store.find_occurrence(TextPosition::new(3, 15)).is_some());
        assert!(store.find_occurrence(TextPosition::new(3, 16)).is_none());
    }
}
