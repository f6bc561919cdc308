// xp-vm - Bytecode compiler and virtual machine for the XP language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Scope analysis: decide where every variable lives before any code is emitted.
//!
//! This pass walks the expression tree to:
//! 1. Build a tree of lexical scopes (global, function, block)
//! 2. Classify each name as a global, a stack local, or a cell
//! 3. Record, per function, which cells it owns and which it inherits (free)
//!
//! A variable becomes a cell as soon as some reference to it crosses a
//! function boundary. The owning scope records it in `cells`; every scope
//! between the owner and the capturing reference records it in `free`.

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::trace;
use xp_parser::Exp;

use super::forms::{self, Function};
use super::types::{CompileError, Result};

/// Index of a scope in a [`ScopeTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(usize);

/// What introduced a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// The program root.
    Global,
    /// A `def` or `lambda`: parameters and the function's own name.
    Function,
    /// A nested `begin`.
    Block,
}

/// Where a variable is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocKind {
    /// Slot in the global table.
    Global,
    /// Slot on the current call's stack segment.
    Local,
    /// Heap cell shared with closures.
    Cell,
}

/// One lexical scope.
#[derive(Debug)]
pub struct Scope {
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    alloc: HashMap<String, AllocKind>,
    declared: HashSet<String>,
    free: BTreeSet<String>,
    cells: BTreeSet<String>,
}

impl Scope {
    fn new(kind: ScopeKind, parent: Option<ScopeId>) -> Self {
        Self {
            kind,
            parent,
            alloc: HashMap::new(),
            declared: HashSet::new(),
            free: BTreeSet::new(),
            cells: BTreeSet::new(),
        }
    }

    /// The storage decision recorded for `name` in this scope.
    pub fn alloc(&self, name: &str) -> Option<AllocKind> {
        self.alloc.get(name).copied()
    }

    /// Whether `name` is declared here (a `var`, `def`, parameter or function name).
    pub fn declares(&self, name: &str) -> bool {
        self.declared.contains(name)
    }

    /// Names this scope receives from an enclosing function, in order.
    pub fn free(&self) -> &BTreeSet<String> {
        &self.free
    }

    /// Names this scope owns that inner functions capture, in order.
    pub fn cells(&self) -> &BTreeSet<String> {
        &self.cells
    }

    fn add_local(&mut self, name: &str) {
        let redeclared_cell = self.declares(name) && self.alloc(name) == Some(AllocKind::Cell);
        self.declared.insert(name.to_string());
        if !redeclared_cell {
            let kind = match self.kind {
                ScopeKind::Global => AllocKind::Global,
                _ => AllocKind::Local,
            };
            self.alloc.insert(name.to_string(), kind);
        }
    }

    fn add_cell(&mut self, name: &str) {
        self.cells.insert(name.to_string());
        self.alloc.insert(name.to_string(), AllocKind::Cell);
    }

    fn add_free(&mut self, name: &str) {
        self.free.insert(name.to_string());
        self.alloc.insert(name.to_string(), AllocKind::Cell);
    }
}

/// The analysed program: every scope plus the node that introduced it.
#[derive(Debug)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
    by_node: HashMap<usize, ScopeId>,
    root: ScopeId,
}

impl ScopeTree {
    pub fn root(&self) -> ScopeId {
        self.root
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0]
    }

    /// Scope introduced by a `begin`, `def` or `lambda` node.
    pub fn scope_of(&self, node: &Exp) -> Option<ScopeId> {
        self.by_node.get(&node_key(node)).copied()
    }

    /// Storage decision for `name` as seen from scope `id`.
    pub fn alloc(&self, id: ScopeId, name: &str) -> Option<AllocKind> {
        self.scope(id).alloc(name)
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    fn scope_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.0]
    }

    fn push(&mut self, kind: ScopeKind, parent: Option<ScopeId>) -> ScopeId {
        self.scopes.push(Scope::new(kind, parent));
        ScopeId(self.scopes.len() - 1)
    }
}

/// Nodes are identified by address; the tree is borrowed, unmoved, for both passes.
fn node_key(node: &Exp) -> usize {
    std::ptr::from_ref(node) as usize
}

/// A resolved variable reference, kept for the reconciliation pass.
#[derive(Debug)]
struct Reference {
    scope: ScopeId,
    name: String,
    owner: ScopeId,
}

/// The scope analyser.
pub struct Analyser {
    tree: ScopeTree,
    references: Vec<Reference>,
}

impl Analyser {
    /// Create an analyser whose global scope already declares `globals`.
    pub fn new<'a>(globals: impl IntoIterator<Item = &'a str>) -> Self {
        let mut tree = ScopeTree {
            scopes: Vec::new(),
            by_node: HashMap::new(),
            root: ScopeId(0),
        };
        let root = tree.push(ScopeKind::Global, None);
        for name in globals {
            tree.scope_mut(root).add_local(name);
        }
        Self {
            tree,
            references: Vec::new(),
        }
    }

    /// Analyse a program. A top-level `begin` becomes the global scope itself.
    pub fn analyse(mut self, program: &Exp) -> Result<ScopeTree> {
        let root = self.tree.root;
        match program.as_list() {
            Some(items) if program.is_tagged("begin") => {
                self.tree.by_node.insert(node_key(program), root);
                for stmt in &items[1..] {
                    self.analyse_expr(stmt, root)?;
                }
            }
            _ => self.analyse_expr(program, root)?,
        }
        self.reconcile();
        Ok(self.tree)
    }

    fn analyse_expr(&mut self, exp: &Exp, scope: ScopeId) -> Result<()> {
        match exp {
            Exp::Symbol(name) if name == "true" || name == "false" => Ok(()),
            Exp::Symbol(name) => self.maybe_promote(scope, name),
            Exp::List(items) => self.analyse_list(exp, items, scope),
            // Literals don't need analysis
            Exp::Number(_) | Exp::String(_) => Ok(()),
        }
    }

    fn analyse_list(&mut self, node: &Exp, items: &[Exp], scope: ScopeId) -> Result<()> {
        let Some(head) = items.first() else {
            return Err(CompileError::Syntax("cannot evaluate an empty list".into()));
        };

        match head.as_symbol() {
            Some("begin") => {
                let block = self.tree.push(ScopeKind::Block, Some(scope));
                self.tree.by_node.insert(node_key(node), block);
                for stmt in &items[1..] {
                    self.analyse_expr(stmt, block)?;
                }
                Ok(())
            }
            Some("var") => {
                let binding = forms::binding(items, "var")?;
                self.tree.scope_mut(scope).add_local(binding.name);
                self.analyse_expr(binding.value, scope)
            }
            Some("set") => {
                let binding = forms::binding(items, "set")?;
                self.maybe_promote(scope, binding.name).map_err(|err| match err {
                    CompileError::Reference(name) => CompileError::UndefinedSetTarget(name),
                    other => other,
                })?;
                self.analyse_expr(binding.value, scope)
            }
            Some("def") => {
                let (name, function) = forms::def(items)?;
                self.tree.scope_mut(scope).add_local(name);
                self.analyse_function(node, Some(name), &function, scope)
            }
            Some("lambda") => {
                let function = forms::lambda(items)?;
                self.analyse_function(node, None, &function, scope)
            }
            Some(op) if forms::is_operator(op) || op == "if" || op == "while" => {
                for item in &items[1..] {
                    self.analyse_expr(item, scope)?;
                }
                Ok(())
            }
            // Call: the callee is an ordinary expression too
            _ => {
                for item in items {
                    self.analyse_expr(item, scope)?;
                }
                Ok(())
            }
        }
    }

    fn analyse_function(
        &mut self,
        node: &Exp,
        name: Option<&str>,
        function: &Function,
        parent: ScopeId,
    ) -> Result<()> {
        let scope = self.tree.push(ScopeKind::Function, Some(parent));
        self.tree.by_node.insert(node_key(node), scope);

        let frame = self.tree.scope_mut(scope);
        if let Some(name) = name {
            frame.add_local(name);
        }
        for param in &function.params {
            frame.add_local(param);
        }

        self.analyse_expr(function.body, scope)
    }

    /// Classify a reference to `name` from `scope`, promoting it to a cell if needed.
    fn maybe_promote(&mut self, scope: ScopeId, name: &str) -> Result<()> {
        let current = self.tree.scope(scope);
        let guess = current.alloc(name).unwrap_or(match current.kind {
            ScopeKind::Global => AllocKind::Global,
            _ => AllocKind::Local,
        });

        let (owner, kind) = self.resolve(scope, name, guess)?;
        self.tree
            .scope_mut(scope)
            .alloc
            .insert(name.to_string(), kind);

        if kind == AllocKind::Cell {
            self.promote(scope, name, owner);
        }

        self.references.push(Reference {
            scope,
            name: name.to_string(),
            owner,
        });
        Ok(())
    }

    /// Find the scope declaring `name`, adjusting the storage guess on the way up.
    fn resolve(&self, scope: ScopeId, name: &str, guess: AllocKind) -> Result<(ScopeId, AllocKind)> {
        let mut current = scope;
        let mut kind = guess;
        loop {
            let searched = self.tree.scope(current);
            if searched.declares(name) {
                return Ok((current, kind));
            }

            // Leaving a function: the variable outlives this frame
            if searched.kind == ScopeKind::Function {
                kind = AllocKind::Cell;
            }

            let Some(parent) = searched.parent else {
                return Err(CompileError::Reference(name.to_string()));
            };
            if self.tree.scope(parent).kind == ScopeKind::Global {
                kind = AllocKind::Global;
            }
            current = parent;
        }
    }

    /// Make `owner` own a cell for `name` and thread it through every scope below.
    fn promote(&mut self, from: ScopeId, name: &str, owner: ScopeId) {
        trace!(name, "promoting variable to a cell");
        self.tree.scope_mut(owner).add_cell(name);

        let mut current = from;
        while current != owner {
            let scope = self.tree.scope_mut(current);
            scope.add_free(name);
            match scope.parent {
                Some(parent) => current = parent,
                None => break,
            }
        }
    }

    /// Revisit references classified as locals before a later capture turned
    /// the same variable into a cell.
    fn reconcile(&mut self) {
        let references = std::mem::take(&mut self.references);
        for reference in &references {
            let stale = self.tree.alloc(reference.scope, &reference.name) == Some(AllocKind::Local)
                && self.tree.alloc(reference.owner, &reference.name) == Some(AllocKind::Cell);
            if stale {
                self.promote(reference.scope, &reference.name, reference.owner);
            }
        }
    }
}
