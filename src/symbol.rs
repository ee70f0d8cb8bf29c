use std::ops::Range;

use fxhash::FxBuildHasher;
use indexmap::map::Entry;
use indexmap::IndexMap;
use miette::SourceSpan;

// Insertion ordered, so symbol indices stay stable for the lifetime of a table
type FxMap<K, V> = IndexMap<K, V, FxBuildHasher>;

/// Reference to symbol table index
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Symbol(usize);

impl From<usize> for Symbol {
    fn from(value: usize) -> Self {
        Symbol(value)
    }
}

/// Location within source
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct Span {
    offs: SrcOffset,
    len: usize,
}

impl Span {
    pub fn new(offs: SrcOffset, len: usize) -> Self {
        Span { offs, len }
    }

    pub fn dummy() -> Self {
        Span {
            offs: SrcOffset(0),
            len: 0,
        }
    }

    pub fn range(&self) -> Range<usize> {
        self.offs.0..self.offs.0 + self.len
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn offs(&self) -> usize {
        self.offs.0
    }

    pub fn end(&self) -> usize {
        self.offs.0 + self.len
    }
}

impl From<Span> for SourceSpan {
    fn from(value: Span) -> Self {
        SourceSpan::new(value.offs().into(), value.len())
    }
}

impl From<Span> for Range<usize> {
    fn from(value: Span) -> Self {
        value.range()
    }
}

/// Used to refer to offsets from the start of a source file.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Debug)]
pub struct SrcOffset(pub usize);

/// A declared variable and, once relocated, the memory cell holding it.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Variable {
    pub name: String,
    /// 1-indexed source line of the declaration. Only used for diagnostics.
    pub line: usize,
    pub span: Span,
    /// Initial value, as written in source.
    pub value: String,
    /// Assigned during relocation, and only if a surviving instruction reads the variable.
    pub slot: Option<u8>,
}

impl Variable {
    pub fn new(name: impl Into<String>, value: impl Into<String>, line: usize, span: Span) -> Self {
        Variable {
            name: name.into(),
            line,
            span,
            value: value.into(),
            slot: None,
        }
    }
}

/// Variable name -> declaration.
#[derive(Default, Debug)]
pub struct SymbolTable {
    vars: FxMap<String, Variable>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the symbol of the existing declaration if the name is taken.
    pub fn declare(&mut self, var: Variable) -> Result<Symbol, Symbol> {
        match self.vars.entry(var.name.clone()) {
            Entry::Occupied(entry) => Err(Symbol(entry.index())),
            Entry::Vacant(entry) => {
                let sym = Symbol(entry.index());
                entry.insert(var);
                Ok(sym)
            }
        }
    }

    pub fn lookup(&self, name: &str) -> Option<Symbol> {
        self.vars.get_index_of(name).map(Symbol)
    }

    pub fn get(&self, sym: Symbol) -> &Variable {
        self.vars
            .get_index(sym.0)
            .map(|(_, var)| var)
            .expect("symbols are only handed out by this table")
    }

    pub fn get_mut(&mut self, sym: Symbol) -> &mut Variable {
        self.vars
            .get_index_mut(sym.0)
            .map(|(_, var)| var)
            .expect("symbols are only handed out by this table")
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

/// Position of a branch label in the generated instruction stream.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct BranchLabel {
    pub index: usize,
    pub span: Span,
}

/// Label name -> instruction index.
#[derive(Default, Debug)]
pub struct BranchTable {
    labels: FxMap<String, BranchLabel>,
}

impl BranchTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the existing label if the name is taken.
    pub fn insert(&mut self, name: &str, label: BranchLabel) -> Result<(), BranchLabel> {
        match self.labels.entry(name.to_owned()) {
            Entry::Occupied(entry) => Err(*entry.get()),
            Entry::Vacant(entry) => {
                entry.insert(label);
                Ok(())
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<usize> {
        self.labels.get(name).map(|label| label.index)
    }
}
