use rustc_hash::FxHashMap;

use crate::token::{Kw, ALL_KEYWORDS};

/// Handle to a string interned by an [`AtomTable`].
///
/// Handle equality is string equality, so tokens can be compared without
/// touching the string storage. `Atom::EMPTY` always resolves to `""`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Atom(u32);

impl Atom {
    pub const EMPTY: Atom = Atom(0);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl Default for Atom {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Interning table for identifier and literal spellings.
///
/// The table is preloaded with every GLSL keyword so the lex context can
/// re-kind identifier tokens by atom lookup alone. A compilation that
/// inherits a preamble clones the preamble's table, which keeps atom
/// handles from the preamble valid in the successor.
#[derive(Debug, Clone)]
pub struct AtomTable {
    map: FxHashMap<String, Atom>,
    strings: Vec<String>,
    keyword_base: u32,
}

impl AtomTable {
    pub fn new() -> Self {
        let mut table = AtomTable {
            map: FxHashMap::default(),
            strings: Vec::new(),
            keyword_base: 0,
        };
        table.strings.push(String::new());
        table.map.insert(String::new(), Atom::EMPTY);

        table.keyword_base = table.strings.len() as u32;
        for kw in ALL_KEYWORDS {
            table.intern(kw.spelling());
        }
        table
    }

    pub fn intern(&mut self, s: &str) -> Atom {
        if let Some(&atom) = self.map.get(s) {
            return atom;
        }
        let atom = Atom(self.strings.len() as u32);
        self.strings.push(s.to_string());
        self.map.insert(s.to_string(), atom);
        atom
    }

    pub fn resolve(&self, atom: Atom) -> &str {
        &self.strings[atom.0 as usize]
    }

    /// Look up an existing atom without creating a new entry.
    pub fn lookup(&self, s: &str) -> Option<Atom> {
        self.map.get(s).copied()
    }

    /// If the atom is the spelling of a keyword, return that keyword.
    pub fn keyword(&self, atom: Atom) -> Option<Kw> {
        let idx = atom.0.checked_sub(self.keyword_base)? as usize;
        ALL_KEYWORDS.get(idx).copied()
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

impl Default for AtomTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_returns_same_atom_for_same_string() {
        let mut table = AtomTable::new();
        let a = table.intern("gl_Position");
        let b = table.intern("gl_Position");
        assert_eq!(a, b);
    }

    #[test]
    fn intern_returns_different_atoms_for_different_strings() {
        let mut table = AtomTable::new();
        assert_ne!(table.intern("foo"), table.intern("bar"));
    }

    #[test]
    fn resolve_returns_original_string() {
        let mut table = AtomTable::new();
        let atom = table.intern("main");
        assert_eq!(table.resolve(atom), "main");
    }

    #[test]
    fn empty_atom_resolves_to_empty_string() {
        let table = AtomTable::new();
        assert_eq!(table.resolve(Atom::EMPTY), "");
    }

    #[test]
    fn keywords_are_preloaded() {
        let table = AtomTable::new();
        let atom = table.lookup("void").expect("keyword should be preloaded");
        assert_eq!(table.keyword(atom), Some(Kw::Void));
    }

    #[test]
    fn non_keyword_atom_has_no_keyword() {
        let mut table = AtomTable::new();
        let atom = table.intern("myVariable");
        assert_eq!(table.keyword(atom), None);
    }

    #[test]
    fn cloned_table_preserves_atom_identity() {
        let mut table = AtomTable::new();
        let atom = table.intern("shared_name");
        let mut clone = table.clone();
        assert_eq!(clone.intern("shared_name"), atom);
        assert_eq!(clone.resolve(atom), "shared_name");
    }
}
