// xp-vm - Bytecode compiler and virtual machine for the XP language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Code generation: transforms the analysed AST to bytecode.

use std::rc::Rc;

use tracing::debug;
use xp_parser::Exp;

use crate::code::CodeObject;
use crate::globals::Globals;
use crate::opcode::{CompareOp, OpCode};
use crate::value::{FunctionObject, Value};

use super::analysis::{AllocKind, Analyser, ScopeId, ScopeTree};
use super::emit::CodeUnit;
use super::forms::{self, Function};
use super::types::{CompileError, Result, operand};

/// Where a name resolved to at the current point of compilation.
#[derive(Debug, Clone, Copy)]
enum Variable {
    Global(usize),
    Local(usize),
    Cell(usize),
}

/// How a declaration stored its value.
#[derive(Debug, Clone, Copy)]
enum Declared {
    /// The value is still on the stack.
    Global,
    /// The value on the stack *is* the variable.
    Local(u8),
    /// The value went into a cell and was popped.
    Cell(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    Plain,
    /// The outermost block of a function: its exit also drops the callee and arguments.
    FunctionBody,
}

/// Compile a parsed program into the `main` code object.
///
/// New top-level names are defined in `globals` as a side effect, so a REPL
/// can compile line by line against the same table.
pub fn compile(program: &Exp, globals: &mut Globals) -> Result<Rc<CodeObject>> {
    let tree = Analyser::new(globals.names()).analyse(program)?;
    Compiler::new(tree, globals).compile(program).map(Rc::new)
}

/// The code generator.
pub struct Compiler<'g> {
    globals: &'g mut Globals,
    tree: ScopeTree,
    /// Innermost scope at the current point.
    scope: ScopeId,
    /// The code object being emitted. Enclosing units wait on the Rust stack.
    unit: CodeUnit,
}

impl<'g> Compiler<'g> {
    pub fn new(tree: ScopeTree, globals: &'g mut Globals) -> Self {
        let root = tree.root();
        Self {
            globals,
            tree,
            scope: root,
            unit: CodeUnit::main(root),
        }
    }

    /// Compile the program. A top-level `begin` shares the global scope.
    pub fn compile(mut self, program: &Exp) -> Result<CodeObject> {
        self.compile_expr(program)?;
        self.unit.emit(OpCode::Halt);
        let code = self.unit.finish();
        log_code(&code);
        Ok(code)
    }

    fn compile_expr(&mut self, exp: &Exp) -> Result<()> {
        match exp {
            Exp::Number(n) => self.unit.emit_constant(Value::number(*n)),
            Exp::String(s) => self.unit.emit_constant(Value::string(s.as_str())),
            Exp::Symbol(name) if name == "true" => self.unit.emit_constant(Value::boolean(true)),
            Exp::Symbol(name) if name == "false" => self.unit.emit_constant(Value::boolean(false)),
            Exp::Symbol(name) => self.compile_symbol(name),
            Exp::List(items) => self.compile_list(exp, items),
        }
    }

    fn compile_symbol(&mut self, name: &str) -> Result<()> {
        let variable = self
            .resolve_variable(name)
            .ok_or_else(|| CompileError::UndefinedVariable(name.to_string()))?;
        match variable {
            Variable::Global(index) => {
                let index = operand(index, || CompileError::TooManyGlobals)?;
                self.unit.emit_with(OpCode::GetGlobal, index);
            }
            Variable::Local(slot) => {
                let slot = self.local_operand(slot)?;
                self.unit.emit_with(OpCode::GetLocal, slot);
            }
            Variable::Cell(index) => {
                let index = self.cell_operand(index)?;
                self.unit.emit_with(OpCode::GetCell, index);
            }
        }
        Ok(())
    }

    fn compile_list(&mut self, node: &Exp, items: &[Exp]) -> Result<()> {
        let Some(head) = items.first() else {
            return Err(CompileError::Syntax("cannot evaluate an empty list".into()));
        };

        match head.as_symbol() {
            Some(op @ ("+" | "-" | "*" | "/")) => self.compile_arithmetic(op, items),
            Some(op) if CompareOp::from_symbol(op).is_some() => self.compile_compare(op, items),
            Some("if") => self.compile_if(items),
            Some("while") => self.compile_while(items),
            Some("begin") => self.compile_begin(node, items, BlockKind::Plain),
            Some("set") => self.compile_set(items),
            Some("lambda") => {
                let function = forms::lambda(items)?;
                self.compile_function(node, "lambda", &function)
            }
            Some("var") | Some("def") => self.compile_declaration_value(node),
            _ => self.compile_call(items),
        }
    }

    fn compile_arithmetic(&mut self, op: &str, items: &[Exp]) -> Result<()> {
        let (lhs, rhs) = forms::operands(items, op)?;
        self.compile_expr(lhs)?;
        self.compile_expr(rhs)?;
        self.unit.emit(match op {
            "+" => OpCode::Add,
            "-" => OpCode::Sub,
            "*" => OpCode::Mul,
            _ => OpCode::Div,
        });
        Ok(())
    }

    fn compile_compare(&mut self, op: &str, items: &[Exp]) -> Result<()> {
        let kind = CompareOp::from_symbol(op)
            .ok_or_else(|| CompileError::Syntax(format!("unknown comparison {}", op)))?;
        let (lhs, rhs) = forms::operands(items, op)?;
        self.compile_expr(lhs)?;
        self.compile_expr(rhs)?;
        self.unit.emit_with(OpCode::Compare, kind as u8);
        Ok(())
    }

    /// `(if test then [else])`. A missing else branch yields `false`.
    fn compile_if(&mut self, items: &[Exp]) -> Result<()> {
        let form = forms::conditional(items)?;

        self.compile_expr(form.test)?;
        let else_jump = self.unit.emit_jump(OpCode::JumpIfFalse);
        let depth = self.unit.depth();

        self.compile_expr(form.then)?;
        let end_jump = self.unit.emit_jump(OpCode::Jump);

        self.unit.bind(else_jump)?;
        self.unit.set_depth(depth);
        match form.otherwise {
            Some(otherwise) => self.compile_expr(otherwise)?,
            None => self.unit.emit_constant(Value::boolean(false))?,
        }

        self.unit.bind(end_jump)
    }

    /// `(while test body)`. Each body value is discarded; the loop yields `false`.
    fn compile_while(&mut self, items: &[Exp]) -> Result<()> {
        let form = forms::while_loop(items)?;

        let start = self.unit.code.offset();
        self.compile_expr(form.test)?;
        let exit_jump = self.unit.emit_jump(OpCode::JumpIfFalse);

        self.compile_expr(form.body)?;
        self.unit.emit(OpCode::Pop);
        self.unit.emit_jump_to(OpCode::Jump, start)?;

        self.unit.bind(exit_jump)?;
        self.unit.emit_constant(Value::boolean(false))
    }

    /// A `begin` block. Statement values are popped except the last, which
    /// becomes the block's value; locals declared inside are then collapsed
    /// beneath it.
    fn compile_begin(&mut self, node: &Exp, items: &[Exp], kind: BlockKind) -> Result<()> {
        let scope = self.scope_of(node)?;
        self.in_scope(scope, |this| {
            this.unit.enter_block();

            let body = &items[1..];
            if body.is_empty() {
                this.unit.emit_constant(Value::boolean(false))?;
            }
            for (i, stmt) in body.iter().enumerate() {
                let is_last = i + 1 == body.len();
                match this.compile_statement(stmt)? {
                    None | Some(Declared::Global) => {
                        if !is_last {
                            this.unit.emit(OpCode::Pop);
                        }
                    }
                    Some(Declared::Local(slot)) if is_last => {
                        this.unit.emit_with(OpCode::GetLocal, slot);
                    }
                    Some(Declared::Cell(index)) if is_last => {
                        this.unit.emit_with(OpCode::GetCell, index);
                    }
                    Some(_) => {}
                }
            }

            let mut count = this.unit.exit_block();
            if kind == BlockKind::FunctionBody {
                count += this.unit.code.arity + 1;
            }
            if count > 0 {
                let count = this.local_operand(count)?;
                this.unit.emit_with(OpCode::ScopeExit, count);
            }
            Ok(())
        })
    }

    /// Compile a block statement, reporting what a declaration did with its value.
    fn compile_statement(&mut self, stmt: &Exp) -> Result<Option<Declared>> {
        match stmt.tag() {
            Some("var") | Some("def") => self.compile_declaration_form(stmt),
            _ => self.compile_expr(stmt).map(|()| None),
        }
    }

    /// A declaration used as a value (an `if` branch, a loop body, an operand).
    /// Its binding lives only as long as the expression: a local is
    /// collapsed beneath the value it leaves on the stack.
    fn compile_declaration_value(&mut self, node: &Exp) -> Result<()> {
        self.unit.enter_block();
        match self.compile_declaration_form(node)? {
            Some(Declared::Local(slot)) => self.unit.emit_with(OpCode::GetLocal, slot),
            Some(Declared::Cell(index)) => self.unit.emit_with(OpCode::GetCell, index),
            Some(Declared::Global) | None => {}
        }
        let count = self.unit.exit_block();
        if count > 0 {
            let count = self.local_operand(count)?;
            self.unit.emit_with(OpCode::ScopeExit, count);
        }
        Ok(())
    }

    fn compile_declaration_form(&mut self, node: &Exp) -> Result<Option<Declared>> {
        let Some(items) = node.as_list() else {
            return Ok(None);
        };
        if node.is_tagged("def") {
            let (name, function) = forms::def(items)?;
            let declared =
                self.compile_declaration(name, |this| this.compile_function(node, name, &function))?;
            return Ok(Some(declared));
        }

        let binding = forms::binding(items, "var")?;
        let declared = self.compile_declaration(binding.name, |this| match binding.value.as_list() {
            // A lambda bound by `var` takes the variable's name
            Some(lambda) if binding.value.is_tagged("lambda") => {
                let function = forms::lambda(lambda)?;
                this.compile_function(binding.value, binding.name, &function)
            }
            _ => this.compile_expr(binding.value),
        })?;
        Ok(Some(declared))
    }

    /// Store the value produced by `init` according to the analysis of `name`.
    fn compile_declaration(
        &mut self,
        name: &str,
        init: impl FnOnce(&mut Self) -> Result<()>,
    ) -> Result<Declared> {
        match self.tree.alloc(self.scope, name) {
            Some(AllocKind::Global) => {
                // Defined before the initializer so recursive functions can see themselves
                let index = operand(self.globals.define(name), || CompileError::TooManyGlobals)?;
                init(self)?;
                self.unit.emit_with(OpCode::SetGlobal, index);
                Ok(Declared::Global)
            }
            Some(AllocKind::Cell) => {
                // Fresh before the initializer, so a closure built there captures it
                let index = self.declare_cell(name)?;
                self.unit.emit_with(OpCode::NewCell, index);
                init(self)?;
                self.unit.emit_with(OpCode::SetCell, index);
                self.unit.emit(OpCode::Pop);
                Ok(Declared::Cell(index))
            }
            Some(AllocKind::Local) | None => {
                init(self)?;
                Ok(Declared::Local(self.unit.declare_local(name)?))
            }
        }
    }

    /// Cell for a declaration in the current scope. The function scope reuses
    /// the cell it owns; a block gets a fresh one.
    fn declare_cell(&mut self, name: &str) -> Result<u8> {
        let owned = if self.scope == self.unit.scope {
            self.unit.owned_cell(name)
        } else {
            None
        };
        let index = match owned {
            Some(index) => index,
            None => self.unit.declare_block_cell(name),
        };
        self.cell_operand(index)
    }

    /// `(set name value)`. The assigned value stays on the stack.
    fn compile_set(&mut self, items: &[Exp]) -> Result<()> {
        let binding = forms::binding(items, "set")?;
        self.compile_expr(binding.value)?;

        let variable = self
            .resolve_variable(binding.name)
            .ok_or_else(|| CompileError::UndefinedSetTarget(binding.name.to_string()))?;
        match variable {
            Variable::Global(index) => {
                let index = operand(index, || CompileError::TooManyGlobals)?;
                self.unit.emit_with(OpCode::SetGlobal, index);
            }
            Variable::Local(slot) => {
                let slot = self.local_operand(slot)?;
                self.unit.emit_with(OpCode::SetLocal, slot);
            }
            Variable::Cell(index) => {
                let index = self.cell_operand(index)?;
                self.unit.emit_with(OpCode::SetCell, index);
            }
        }
        Ok(())
    }

    /// Compile a function body into its own code object and leave the
    /// function value on the stack.
    fn compile_function(&mut self, node: &Exp, name: &str, function: &Function) -> Result<()> {
        let scope = self.scope_of(node)?;
        let arity = function.params.len();
        operand(arity, || CompileError::TooManyArguments(arity))?;

        let info = self.tree.scope(scope);
        let free: Vec<String> = info.free().iter().cloned().collect();
        let mut code = CodeObject::new(name, arity);
        code.free_count = free.len();
        code.cell_names = free.iter().chain(info.cells()).cloned().collect();

        let parent = std::mem::replace(&mut self.unit, CodeUnit::function(code, scope));
        let body = self.in_scope(scope, |this| this.compile_function_body(name, function));
        let child = std::mem::replace(&mut self.unit, parent);
        body?;

        let code = Rc::new(child.finish());
        log_code(&code);

        if free.is_empty() {
            return self
                .unit
                .emit_constant(Value::function(FunctionObject::new(code, Vec::new())));
        }

        // Closure: load the captured cells, then bind them to the code
        for name in &free {
            let index = self.unit.cell_index(name).ok_or_else(|| {
                CompileError::Internal(format!("captured variable {} has no cell", name))
            })?;
            let index = self.cell_operand(index)?;
            self.unit.emit_with(OpCode::LoadCell, index);
        }
        self.unit.emit_constant(Value::code(code))?;
        let count = self.cell_operand(free.len())?;
        self.unit.emit_with(OpCode::MakeFunction, count);
        Ok(())
    }

    fn compile_function_body(&mut self, name: &str, function: &Function) -> Result<()> {
        let arity = function.params.len();

        // Slot 0 holds the callee itself; parameters follow
        let bound: Vec<&str> = std::iter::once(name)
            .chain(function.params.iter().copied())
            .collect();
        for (slot, local) in bound.iter().enumerate() {
            self.unit.code.add_local(*local, slot);
        }

        // Captured parameters move into their cells before the body runs
        for (slot, local) in bound.iter().enumerate() {
            if let Some(index) = self.unit.owned_cell(local) {
                let slot = self.local_operand(slot)?;
                let index = self.cell_operand(index)?;
                self.unit.emit_with(OpCode::GetLocal, slot);
                self.unit.emit_with(OpCode::SetCell, index);
                self.unit.emit(OpCode::Pop);
            }
        }

        match function.body.as_list() {
            Some(items) if function.body.is_tagged("begin") => {
                self.compile_begin(function.body, items, BlockKind::FunctionBody)?;
            }
            _ => {
                self.compile_expr(function.body)?;
                let count = self.local_operand(arity + 1)?;
                self.unit.emit_with(OpCode::ScopeExit, count);
            }
        }
        self.unit.emit(OpCode::Return);
        Ok(())
    }

    /// `(callee args...)`.
    fn compile_call(&mut self, items: &[Exp]) -> Result<()> {
        let Some((callee, args)) = items.split_first() else {
            return Err(CompileError::Syntax("cannot evaluate an empty list".into()));
        };
        let argc = operand(args.len(), || CompileError::TooManyArguments(args.len()))?;
        self.compile_expr(callee)?;
        for arg in args {
            self.compile_expr(arg)?;
        }
        self.unit.emit_with(OpCode::Call, argc);
        Ok(())
    }

    /// Find `name` in the current unit, following the analysis but falling
    /// back when the binding isn't live yet at this point of the body.
    fn resolve_variable(&self, name: &str) -> Option<Variable> {
        let local = || self.unit.code.local_slot(name).map(Variable::Local);
        let cell = || self.unit.cell_index(name).map(Variable::Cell);
        let global = || self.globals.index_of(name).map(Variable::Global);

        match self.tree.alloc(self.scope, name) {
            Some(AllocKind::Global) => global(),
            Some(AllocKind::Cell) => cell().or_else(local).or_else(global),
            Some(AllocKind::Local) | None => local().or_else(cell).or_else(global),
        }
    }

    fn scope_of(&self, node: &Exp) -> Result<ScopeId> {
        self.tree
            .scope_of(node)
            .ok_or_else(|| CompileError::Internal(format!("no scope recorded for {}", node)))
    }

    fn in_scope<T>(&mut self, scope: ScopeId, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let saved = std::mem::replace(&mut self.scope, scope);
        let result = f(self);
        self.scope = saved;
        result
    }

    fn local_operand(&self, slot: usize) -> Result<u8> {
        operand(slot, || CompileError::TooManyLocals(self.unit.code.name.clone()))
    }

    fn cell_operand(&self, index: usize) -> Result<u8> {
        operand(index, || CompileError::TooManyCells(self.unit.code.name.clone()))
    }
}

fn log_code(code: &CodeObject) {
    debug!(
        name = %code.name,
        arity = code.arity,
        bytes = code.code.len(),
        constants = code.constants.len(),
        cells = code.cell_names.len(),
        free = code.free_count,
        "compiled code object"
    );
}
