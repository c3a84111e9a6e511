//! Whole-program facts gathered from the bound tree before lowering.
//!
//! * call-site counts per user function and recursion detection, which
//!   drive the inlining decision
//! * lexical scopes per function, reporting redeclared names

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use indexmap::IndexMap;
use log::debug;

use crate::bound::{BoundExpression, BoundStatement, ExpressionKind, StatementKind};
use crate::compiler::BoundProgram;
use crate::diagnostic::{Diagnostic, Diagnostics};
use crate::error::CoreError;
use crate::rewrite::{RewriteResult, Rewriter, walk_expression, walk_statement};
use crate::span::Span;
use crate::symbols::{Function, Modifiers, Variable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(usize);

#[derive(Debug, Clone)]
pub struct Scope {
    pub span: Span,
    pub parent: Option<ScopeId>,
    pub symbols: IndexMap<String, Variable>,
}

/// Lexical scopes of one function. The root scope holds the parameters
/// and the top-level declarations of the body.
#[derive(Debug, Clone)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
}

impl ScopeTree {
    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0]
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Resolves `name` from `scope` outwards.
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<&Variable> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let scope = self.scope(id);
            if let Some(variable) = scope.symbols.get(name) {
                return Some(variable);
            }
            current = scope.parent;
        }
        None
    }

    /// Innermost scope whose span contains `offset`.
    pub fn scope_at(&self, offset: usize) -> ScopeId {
        let mut best = self.root();
        for (i, scope) in self.scopes.iter().enumerate().skip(1) {
            let inside = scope.span.start <= offset && offset < scope.span.end;
            if inside && scope.span.len() <= self.scope(best).span.len() {
                best = ScopeId(i);
            }
        }
        best
    }

    fn push(&mut self, span: Span, parent: ScopeId) -> ScopeId {
        self.scopes.push(Scope {
            span,
            parent: Some(parent),
            symbols: IndexMap::new(),
        });
        ScopeId(self.scopes.len() - 1)
    }
}

struct ScopeBuilder<'d> {
    tree: ScopeTree,
    diagnostics: &'d mut Diagnostics,
}

impl ScopeBuilder<'_> {
    fn build(function: &Function, body: &BoundStatement, diagnostics: &mut Diagnostics) -> ScopeTree {
        let mut builder = ScopeBuilder {
            tree: ScopeTree {
                scopes: vec![Scope {
                    span: body.span,
                    parent: None,
                    symbols: IndexMap::new(),
                }],
            },
            diagnostics,
        };
        let root = builder.tree.root();
        for parameter in &function.parameters {
            builder.declare(root, parameter, body.span);
        }
        match &body.kind {
            StatementKind::Block(statements) => {
                for statement in statements {
                    builder.statement(root, statement);
                }
            }
            _ => builder.statement(root, body),
        }
        builder.tree
    }

    fn declare(&mut self, scope: ScopeId, variable: &Variable, span: Span) {
        let symbols = &mut self.tree.scopes[scope.0].symbols;
        if symbols.contains_key(&variable.name) {
            self.diagnostics.push(Diagnostic::already_declared(&variable.name, span));
        } else {
            symbols.insert(variable.name.clone(), variable.clone());
        }
    }

    fn statement(&mut self, scope: ScopeId, statement: &BoundStatement) {
        match &statement.kind {
            StatementKind::Block(statements) => {
                let inner = self.tree.push(statement.span, scope);
                for s in statements {
                    self.statement(inner, s);
                }
            }
            StatementKind::VariableDeclaration {
                variable,
                name_span,
                ..
            } => self.declare(scope, variable, *name_span),
            StatementKind::If {
                then, otherwise, ..
            } => {
                self.statement(scope, then);
                if let Some(otherwise) = otherwise {
                    self.statement(scope, otherwise);
                }
            }
            StatementKind::While { body, .. }
            | StatementKind::DoWhile { body, .. }
            | StatementKind::Event { body, .. } => self.statement(scope, body),
            _ => {}
        }
    }
}

/// User functions called from a tree, once per call site.
#[derive(Default)]
struct CallSites(Vec<Function>);

impl Rewriter for CallSites {
    fn rewrite_statement(&mut self, statement: &Rc<BoundStatement>) -> RewriteResult<Rc<BoundStatement>> {
        if let StatementKind::Call { function, .. } = &statement.kind {
            if !function.is_builtin() {
                self.0.push(function.clone());
            }
        }
        walk_statement(self, statement)
    }

    fn rewrite_expression(&mut self, expression: &Rc<BoundExpression>) -> RewriteResult<Rc<BoundExpression>> {
        if let ExpressionKind::Call { function, .. } = &expression.kind {
            if !function.is_builtin() {
                self.0.push(function.clone());
            }
        }
        walk_expression(self, expression)
    }
}

/// User functions called from `body`, once per call site, in order.
pub fn call_sites(body: &Rc<BoundStatement>) -> Result<Vec<Function>, CoreError> {
    let mut sites = CallSites::default();
    sites.rewrite_statement(body)?;
    Ok(sites.0)
}

#[derive(Debug, Clone)]
pub struct AnalysisResult {
    entry: Function,
    callees: HashMap<Function, Vec<Function>>,
    call_counts: HashMap<Function, usize>,
    recursive: HashSet<Function>,
    scopes: HashMap<Function, ScopeTree>,
    diagnostics: Diagnostics,
}

impl AnalysisResult {
    pub fn analyze(program: &BoundProgram) -> Result<AnalysisResult, CoreError> {
        let mut diagnostics = Diagnostics::new();
        let mut callees = HashMap::new();
        let mut call_counts: HashMap<Function, usize> = HashMap::new();
        let mut scopes = HashMap::new();

        for (function, body) in &program.functions {
            let sites = call_sites(body)?;
            for callee in &sites {
                *call_counts.entry(callee.clone()).or_default() += 1;
            }
            callees.insert(function.clone(), sites);
            scopes.insert(function.clone(), ScopeBuilder::build(function, body, &mut diagnostics));
        }

        let recursive: HashSet<Function> = program
            .functions
            .keys()
            .filter(|f| reaches(&callees, f, f))
            .cloned()
            .collect();
        debug!(
            "analyzed {} functions: {} call sites, {} recursive",
            program.functions.len(),
            call_counts.values().sum::<usize>(),
            recursive.len()
        );

        Ok(AnalysisResult {
            entry: program.entry.clone(),
            callees,
            call_counts,
            recursive,
            scopes,
            diagnostics,
        })
    }

    pub fn call_count(&self, function: &Function) -> usize {
        self.call_counts.get(function).copied().unwrap_or(0)
    }

    pub fn is_recursive(&self, function: &Function) -> bool {
        self.recursive.contains(function)
    }

    /// User functions called directly from `function`, once per site.
    pub fn callees(&self, function: &Function) -> &[Function] {
        self.callees.get(function).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Functions that can be expanded at all: called, non-recursive user
    /// functions other than the entry.
    pub fn can_inline(&self, function: &Function) -> bool {
        !function.is_builtin()
            && *function != self.entry
            && !self.is_recursive(function)
            && self.call_count(function) > 0
    }

    /// Marked `inline`, or called from exactly one site.
    pub fn should_inline(&self, function: &Function) -> bool {
        self.can_inline(function)
            && (function.modifiers.contains(Modifiers::INLINE) || self.call_count(function) == 1)
    }

    pub fn scopes(&self, function: &Function) -> Option<&ScopeTree> {
        self.scopes.get(function)
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }
}

/// True if `target` is reachable from `from` through one or more calls.
fn reaches(callees: &HashMap<Function, Vec<Function>>, from: &Function, target: &Function) -> bool {
    let mut seen = HashSet::new();
    let mut stack: Vec<&Function> = callees.get(from).map(|c| c.iter().collect()).unwrap_or_default();
    while let Some(f) = stack.pop() {
        if f == target {
            return true;
        }
        if seen.insert(f) {
            if let Some(next) = callees.get(f) {
                stack.extend(next);
            }
        }
    }
    false
}
