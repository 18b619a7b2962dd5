use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::ast::DeclView;
use crate::atom::Atom;
use crate::types::{TypeId, TypeUniverse};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Global,
    Function,
    Block,
    Struct,
}

/// Signature of one function parameter as overload resolution sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSignature {
    pub ty: TypeId,
    pub is_input: bool,
    pub is_output: bool,
}

/// One registered function declaration.
#[derive(Debug, Clone)]
pub struct FunctionEntry {
    pub decl: DeclView,
    pub params: Vec<ParamSignature>,
    pub return_type: TypeId,
}

/// One lexical scope: name bindings plus, for global scopes, the function
/// overload multimap.
#[derive(Debug, Clone)]
pub struct Scope {
    kind: ScopeKind,
    decls: FxHashMap<Atom, DeclView>,
    functions: FxHashMap<Atom, Vec<FunctionEntry>>,
}

impl Scope {
    pub fn new(kind: ScopeKind) -> Self {
        Self { kind, decls: FxHashMap::default(), functions: FxHashMap::default() }
    }

    pub fn kind(&self) -> ScopeKind {
        self.kind
    }

    /// First insertion wins; returns false when the name was already bound
    /// in this scope.
    pub fn try_add_symbol(&mut self, name: Atom, decl: DeclView) -> bool {
        if name == Atom::EMPTY {
            return false;
        }
        match self.decls.entry(name) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(decl);
                true
            }
        }
    }

    pub fn add_function(&mut self, name: Atom, entry: FunctionEntry) {
        if name == Atom::EMPTY {
            return;
        }
        self.functions.entry(name).or_default().push(entry);
    }

    pub fn find_symbol(&self, name: Atom) -> Option<DeclView> {
        self.decls.get(&name).copied()
    }

    pub fn function_candidates(&self, name: Atom) -> &[FunctionEntry] {
        self.functions.get(&name).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn symbols(&self) -> impl Iterator<Item = (Atom, DeclView)> + '_ {
        self.decls.iter().map(|(&name, &decl)| (name, decl))
    }
}

/// Scope stack of one compilation.
///
/// Global scopes inherited from preambles are frozen and shared; the
/// compilation's own global scope sits at the bottom of `levels` and local
/// scopes stack above it.
#[derive(Debug)]
pub struct SymbolTable {
    preamble_levels: Vec<Arc<Scope>>,
    levels: Vec<Scope>,
}

impl SymbolTable {
    pub fn new(preamble_levels: Vec<Arc<Scope>>) -> Self {
        Self { preamble_levels, levels: vec![Scope::new(ScopeKind::Global)] }
    }

    pub fn push_scope(&mut self, kind: ScopeKind) {
        debug_assert!(kind != ScopeKind::Global);
        self.levels.push(Scope::new(kind));
    }

    pub fn pop_scope(&mut self) {
        debug_assert!(self.levels.len() > 1, "cannot pop the global scope");
        if self.levels.len() > 1 {
            self.levels.pop();
        }
    }

    pub fn current_scope(&self) -> &Scope {
        self.levels.last().expect("at least the global scope")
    }

    pub fn current_scope_mut(&mut self) -> &mut Scope {
        self.levels.last_mut().expect("at least the global scope")
    }

    pub fn at_global_scope(&self) -> bool {
        self.levels.len() == 1
    }

    pub fn global_scope_mut(&mut self) -> &mut Scope {
        &mut self.levels[0]
    }

    /// Innermost binding for `name`, searching local scopes then inherited
    /// preamble globals.
    pub fn find_symbol(&self, name: Atom) -> Option<DeclView> {
        for scope in self.levels.iter().rev() {
            if let Some(decl) = scope.find_symbol(name) {
                return Some(decl);
            }
        }
        for scope in self.preamble_levels.iter().rev() {
            if let Some(decl) = scope.find_symbol(name) {
                return Some(decl);
            }
        }
        None
    }

    /// Freeze the table at end of compilation: the inherited global scopes
    /// followed by this compilation's own global scope.
    pub fn into_global_scopes(mut self) -> Vec<Arc<Scope>> {
        debug_assert_eq!(self.levels.len(), 1, "local scopes must be popped before freezing");
        let own_global = self.levels.remove(0);
        let mut scopes = self.preamble_levels;
        scopes.push(Arc::new(own_global));
        scopes
    }

    /// Overload resolution over every global function scope.
    ///
    /// An exact signature match wins immediately. Otherwise candidates are
    /// filtered by direction-aware convertibility and the single candidate
    /// whose conversions are never worse and somewhere strictly better than
    /// every other's is chosen; anything else is ambiguous and resolves to
    /// nothing.
    pub fn find_function(
        &self,
        universe: &TypeUniverse,
        name: Atom,
        arg_types: &[TypeId],
    ) -> Option<&FunctionEntry> {
        let mut candidates: Vec<&FunctionEntry> = Vec::new();

        let global_scopes = self
            .preamble_levels
            .iter()
            .map(|scope| scope.as_ref())
            .chain(std::iter::once(&self.levels[0]));

        for scope in global_scopes {
            for candidate in scope.function_candidates(name) {
                if candidate.params.len() != arg_types.len() {
                    continue;
                }

                let exact = candidate
                    .params
                    .iter()
                    .zip(arg_types)
                    .all(|(param, &arg)| universe.is_same(param.ty, arg));
                if exact {
                    return Some(candidate);
                }

                let convertible = candidate.params.iter().zip(arg_types).all(|(param, &arg)| {
                    (!param.is_input || universe.is_convertible_to(arg, param.ty))
                        && (!param.is_output || universe.is_convertible_to(param.ty, arg))
                });
                if convertible {
                    candidates.push(candidate);
                }
            }
        }

        let mut best: Option<&FunctionEntry> = None;
        for candidate in &candidates {
            let beats_all = candidates.iter().all(|other| {
                if std::ptr::eq(*candidate, *other) {
                    return true;
                }
                better_candidate(universe, candidate, other, arg_types)
            });

            if beats_all {
                if best.is_some() {
                    // Two candidates each claim to beat the rest: ambiguous.
                    return None;
                }
                best = Some(candidate);
            }
        }
        best
    }
}

/// Whether `lhs` is a strictly better viable candidate than `rhs`: no
/// argument conversion worse, at least one better.
fn better_candidate(
    universe: &TypeUniverse,
    lhs: &FunctionEntry,
    rhs: &FunctionEntry,
    arg_types: &[TypeId],
) -> bool {
    let mut lhs_better_somewhere = false;
    for ((lp, rp), &arg) in lhs.params.iter().zip(&rhs.params).zip(arg_types) {
        if !lp.is_input || !rp.is_input {
            continue;
        }
        if universe.has_better_conversion(arg, rp.ty, lp.ty) {
            // rhs converts better on this argument.
            return false;
        }
        if universe.has_better_conversion(arg, lp.ty, rp.ty) {
            lhs_better_somewhere = true;
        }
    }
    lhs_better_somewhere
}
