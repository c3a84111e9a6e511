//! Graph emission.
//!
//! Walks the final flat statement list of every function and turns it into
//! block placements, values and wires. Jumps inside a function are wired
//! once the function is complete; calls between functions are wired once
//! the whole program is complete, since callees may be emitted after their
//! callers.

pub mod expr;
pub mod stmt;
pub mod store;

use std::collections::HashMap;
use std::rc::Rc;

use indexmap::IndexMap;
use log::debug;

use crate::bound::{BoundStatement, StatementKind};
use crate::config::EmitOptions;
use crate::diagnostic::{Diagnostic, Diagnostics};
use crate::error::CoreError;
use crate::graph::{Block, BlockDef, BlockValue, Builder, Placer, TerminalRef};
use crate::symbols::{Function, Modifiers, Variable};
use crate::value::Axis;

use self::store::{Connector, EmitStore};

/// Why a construct could not be emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmitFault {
    /// User-facing; the construct is skipped and emission continues.
    Diagnostic(Diagnostic),
    Internal(CoreError),
}

impl From<CoreError> for EmitFault {
    fn from(value: CoreError) -> Self {
        EmitFault::Internal(value)
    }
}

impl From<Diagnostic> for EmitFault {
    fn from(value: Diagnostic) -> Self {
        EmitFault::Diagnostic(value)
    }
}

pub type EmitResult<T> = Result<T, EmitFault>;

/// Last break node placed for a variable, with reads served per axis.
#[derive(Debug, Clone, Copy)]
struct BreakCache {
    outputs: [TerminalRef; 3],
    uses: [u32; 3],
}

impl BreakCache {
    fn take(&mut self, axis: Axis, limit: u32) -> Option<TerminalRef> {
        let i = axis.index();
        if self.uses[i] >= limit {
            return None;
        }
        self.uses[i] += 1;
        Some(self.outputs[i])
    }
}

#[derive(Debug, Clone, Copy)]
struct InlineValue {
    terminal: Option<TerminalRef>,
    reads: u32,
}

/// Previous element store, so that a store to the next index can chain
/// its list node from the previous element.
#[derive(Debug, Clone)]
struct ListCursor {
    array: Variable,
    index: f32,
    /// `None` when the previous store went through the array variable
    /// itself.
    element: Option<TerminalRef>,
}

pub struct Emitter<'a> {
    placer: &'a mut dyn Placer,
    builder: &'a mut dyn Builder,
    options: &'a EmitOptions,
    diagnostics: Diagnostics,
    entries: HashMap<Function, Option<TerminalRef>>,
    pending_calls: IndexMap<Function, Vec<TerminalRef>>,
    function: Option<Function>,
    break_cache: HashMap<Variable, BreakCache>,
    inline_values: HashMap<Variable, InlineValue>,
    list_cursor: Option<ListCursor>,
    highlight_depth: u32,
    placed: usize,
}

/// Emits every function of `program` and wires calls between them.
pub fn emit_program(
    program: &IndexMap<Function, Rc<BoundStatement>>,
    placer: &mut dyn Placer,
    builder: &mut dyn Builder,
    options: &EmitOptions,
) -> Result<Diagnostics, CoreError> {
    let mut emitter = Emitter::new(placer, builder, options);
    for (function, body) in program {
        emitter.emit_function(function, body)?;
    }
    emitter.resolve_calls()?;
    debug!(
        "emitted {} functions, {} blocks, {} diagnostics",
        program.len(),
        emitter.placed,
        emitter.diagnostics.len()
    );
    Ok(emitter.diagnostics)
}

impl<'a> Emitter<'a> {
    pub fn new(placer: &'a mut dyn Placer, builder: &'a mut dyn Builder, options: &'a EmitOptions) -> Self {
        Emitter {
            placer,
            builder,
            options,
            diagnostics: Diagnostics::new(),
            entries: HashMap::new(),
            pending_calls: IndexMap::new(),
            function: None,
            break_cache: HashMap::new(),
            inline_values: HashMap::new(),
            list_cursor: None,
            highlight_depth: 0,
            placed: 0,
        }
    }

    pub fn emit_function(&mut self, function: &Function, body: &Rc<BoundStatement>) -> Result<(), CoreError> {
        self.function = Some(function.clone());
        self.break_cache.clear();
        self.inline_values.clear();
        self.list_cursor = None;
        self.highlight_depth = 0;
        let first = self.placed;

        let statements = match &body.kind {
            StatementKind::Block(statements) => statements.as_slice(),
            _ => std::slice::from_ref(body),
        };
        let mut connector = Connector::new(function.name.as_str());
        for statement in statements {
            let store = self.statement(statement)?;
            connector.push(&mut *self.builder, store);
        }
        let finished = connector.finish(&mut *self.builder)?;
        for label in &finished.empty_loops {
            self.diagnostics.push(Diagnostic::empty_loop(label.name(), body.span));
        }
        self.entries.insert(function.clone(), finished.entry);
        debug!("emitted '{}': {} blocks", function.name, self.placed - first);
        Ok(())
    }

    /// Emits one statement; a diagnostic replaces it with a no-op.
    pub(crate) fn statement(&mut self, statement: &Rc<BoundStatement>) -> Result<EmitStore, CoreError> {
        match stmt::emit_statement(self, statement) {
            Ok(store) => Ok(store),
            Err(EmitFault::Diagnostic(diagnostic)) => {
                self.diagnostics.push(diagnostic);
                Ok(EmitStore::Nop)
            }
            Err(EmitFault::Internal(error)) => Err(error),
        }
    }

    fn resolve_calls(&mut self) -> Result<(), CoreError> {
        for (function, sources) in std::mem::take(&mut self.pending_calls) {
            match self.entries.get(&function) {
                Some(Some(entry)) => {
                    for source in sources {
                        self.builder.connect(source, *entry);
                    }
                }
                Some(None) => {}
                None => return Err(CoreError::MissingCallee(function.name.clone())),
            }
        }
        Ok(())
    }

    pub fn options(&self) -> &EmitOptions {
        self.options
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    fn current_function(&self) -> Result<&Function, CoreError> {
        self.function
            .as_ref()
            .ok_or_else(|| CoreError::internal("statement emitted outside of a function"))
    }

    pub(crate) fn place(&mut self, def: &'static BlockDef) -> Block {
        let block = self.placer.place(def);
        self.placed += 1;
        if self.highlight_depth > 0 {
            self.builder.highlight(block);
        }
        block
    }

    pub(crate) fn set_value(&mut self, block: Block, slot: usize, value: BlockValue) {
        self.builder.set_value(block, slot, value);
    }

    pub(crate) fn connect(&mut self, from: TerminalRef, to: TerminalRef) {
        self.builder.connect(from, to);
    }

    /// Connects `from` when there is a value; unconnected inputs read as
    /// the default value of their type.
    pub(crate) fn connect_opt(&mut self, from: Option<TerminalRef>, to: TerminalRef) {
        if let Some(from) = from {
            self.builder.connect(from, to);
        }
    }

    pub(crate) fn append(&mut self, chain: &mut store::Chain, store: EmitStore) -> Result<(), CoreError> {
        chain.append(&mut *self.builder, store)
    }
}

/// Name of the storage cell behind `variable`.
pub fn storage_name(variable: &Variable) -> String {
    if variable.is_global() {
        let prefix = if variable.modifiers.contains(Modifiers::SAVED) { '!' } else { '$' };
        format!("{prefix}{}", variable.name)
    } else {
        variable.name.clone()
    }
}
