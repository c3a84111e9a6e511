//! Call-site expansion of user functions.
//!
//! Runs after extraction, so every user call is a call statement. An
//! expanded call assigns its arguments to per-site substitutes, runs a
//! renamed copy of the callee's body and copies by-reference parameters
//! back. Returns in the copy store into the call's result and jump to a
//! per-site exit label.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use indexmap::IndexMap;
use log::debug;

use crate::bound::{BoundExpression, BoundStatement, ExpressionKind, GotoKind, StatementKind};
use crate::error::CoreError;
use crate::rewrite::{RewriteResult, Rewriter, walk_expression, walk_statement};
use crate::span::Span;
use crate::symbols::{Function, Label, Modifiers, Variable};

type Statements = Vec<Rc<BoundStatement>>;

/// Expands calls to `inlined` functions, taking callee bodies from
/// `bodies`. One instance numbers its expansion sites across every
/// function it processes.
pub struct Inliner<'a> {
    inlined: &'a HashSet<Function>,
    bodies: &'a IndexMap<Function, Rc<BoundStatement>>,
    sites: u32,
}

impl<'a> Inliner<'a> {
    pub fn new(inlined: &'a HashSet<Function>, bodies: &'a IndexMap<Function, Rc<BoundStatement>>) -> Self {
        Inliner {
            inlined,
            bodies,
            sites: 0,
        }
    }

    pub fn inline(&mut self, function: &Function, body: &Rc<BoundStatement>) -> Result<Rc<BoundStatement>, CoreError> {
        let first = self.sites;
        let mut out = Vec::new();
        self.statement(body, &mut out)?;
        debug!(
            "inlined into '{}': {} call sites, {} statements",
            function.name,
            self.sites - first,
            out.len()
        );
        Ok(BoundStatement::block(out, body.span))
    }

    fn statement(&mut self, statement: &Rc<BoundStatement>, out: &mut Statements) -> Result<(), CoreError> {
        match &statement.kind {
            StatementKind::Block(statements) => {
                for s in statements {
                    self.statement(s, out)?;
                }
                Ok(())
            }
            StatementKind::Call {
                function,
                arguments,
                result,
            } if self.inlined.contains(function) => {
                self.expand(function, arguments, result.as_ref(), statement.span, out)
            }
            _ => {
                out.push(statement.clone());
                Ok(())
            }
        }
    }

    fn expand(
        &mut self,
        function: &Function,
        arguments: &[Rc<BoundExpression>],
        result: Option<&Variable>,
        span: Span,
        out: &mut Statements,
    ) -> Result<(), CoreError> {
        let body = self
            .bodies
            .get(function)
            .ok_or_else(|| CoreError::MissingCallee(function.name.clone()))?;
        if function.parameters.len() != arguments.len() {
            return Err(CoreError::internal(format!(
                "call to '{}' passes {} arguments for {} parameters",
                function.name,
                arguments.len(),
                function.parameters.len()
            )));
        }
        self.sites += 1;
        let site = self.sites;

        let written = written_variables(body)?;
        let mut variables = HashMap::new();
        let mut copy_back = Vec::new();
        for (parameter, argument) in function.parameters.iter().zip(arguments) {
            if let Some(target) = alias_target(parameter, argument, &written) {
                variables.insert(parameter.clone(), target.clone());
                continue;
            }
            let substitute = Variable::temporary(format!("inl{site}_{}", parameter.name), parameter.ty);
            if !parameter.modifiers.contains(Modifiers::OUT) {
                out.push(BoundStatement::assign(&substitute, argument.clone(), span));
            }
            if parameter.modifiers.is_by_reference() {
                let target = argument.as_variable().ok_or_else(|| {
                    CoreError::internal(format!("by-reference argument '{argument}' of '{}' is not a variable", function.name))
                })?;
                copy_back.push(BoundStatement::assign(
                    target,
                    BoundExpression::variable(&substitute, span),
                    span,
                ));
            }
            variables.insert(parameter.clone(), substitute);
        }

        let exit = Label::new(format!("{}.return#{site}", function.name));
        let mut copy = BodyCopy {
            site,
            variables,
            result: result.cloned(),
            exit: exit.clone(),
        };
        let copied = copy.rewrite_statement(body)?;
        // Calls in the copy may themselves be inlined.
        self.statement(&copied, out)?;
        out.push(BoundStatement::label(&exit, span));
        out.extend(copy_back);
        Ok(())
    }
}

/// A read-only parameter that the callee never writes can read the
/// caller's variable directly.
fn alias_target<'e>(
    parameter: &Variable,
    argument: &'e BoundExpression,
    written: &HashSet<Variable>,
) -> Option<&'e Variable> {
    if !parameter.modifiers.contains(Modifiers::READONLY)
        || parameter.modifiers.is_by_reference()
        || written.contains(parameter)
    {
        return None;
    }
    argument
        .as_variable()
        .filter(|v| !v.is_global() && v.property_of().is_none())
}

/// Copies a callee body for one expansion site.
struct BodyCopy {
    site: u32,
    variables: HashMap<Variable, Variable>,
    result: Option<Variable>,
    exit: Label,
}

impl Rewriter for BodyCopy {
    fn rewrite_statement(&mut self, statement: &Rc<BoundStatement>) -> RewriteResult<Rc<BoundStatement>> {
        let StatementKind::Return(value) = &statement.kind else {
            return walk_statement(self, statement);
        };
        let span = statement.span;
        let mut out = Vec::with_capacity(2);
        if let (Some(result), Some(value)) = (self.result.clone(), value) {
            let value = self.rewrite_expression(value)?;
            out.push(BoundStatement::assign(&result, value, span));
        }
        out.push(BoundStatement::goto(&self.exit, span));
        Ok(BoundStatement::block(out, span))
    }

    fn rewrite_variable(&mut self, variable: &Variable) -> Variable {
        if let Some(copy) = self.variables.get(variable) {
            return copy.clone();
        }
        if variable.is_global() {
            return variable.clone();
        }
        let copy = match variable.property_of() {
            Some((base, axis)) => {
                let new_base = self.rewrite_variable(base);
                if new_base == *base {
                    variable.clone()
                } else {
                    Variable::property(&new_base, axis)
                }
            }
            None => variable.renamed(format!("inl{}_{}", self.site, variable.name)),
        };
        self.variables.insert(variable.clone(), copy.clone());
        copy
    }

    fn rewrite_label(&mut self, label: &Label) -> Label {
        Label::new(format!("{}#{}", label.name(), self.site))
    }
}

/// Every variable `body` may store into. Writes to a property count as
/// writes to its base.
fn written_variables(body: &Rc<BoundStatement>) -> Result<HashSet<Variable>, CoreError> {
    let mut writes = Writes::default();
    writes.rewrite_statement(body)?;
    Ok(writes.0)
}

#[derive(Default)]
struct Writes(HashSet<Variable>);

impl Writes {
    fn record(&mut self, variable: &Variable) {
        if let Some((base, _)) = variable.property_of() {
            self.record(base);
        }
        self.0.insert(variable.clone());
    }

    fn record_by_reference(&mut self, function: &Function, arguments: &[Rc<BoundExpression>]) {
        for (parameter, argument) in function.parameters.iter().zip(arguments) {
            if parameter.modifiers.is_by_reference() {
                if let Some(variable) = argument.as_variable() {
                    self.record(variable);
                }
            }
        }
    }
}

impl Rewriter for Writes {
    fn rewrite_statement(&mut self, statement: &Rc<BoundStatement>) -> RewriteResult<Rc<BoundStatement>> {
        match &statement.kind {
            StatementKind::VariableDeclaration { variable, .. }
            | StatementKind::Assignment { variable, .. }
            | StatementKind::CompoundAssignment { variable, .. } => self.record(variable),
            StatementKind::Call {
                function,
                arguments,
                result,
            } => {
                if let Some(result) = result {
                    self.record(result);
                }
                self.record_by_reference(function, arguments);
            }
            StatementKind::Goto {
                kind: GotoKind::Event { arguments, .. },
                ..
            } => {
                for variable in arguments.iter().filter_map(|a| a.as_variable()) {
                    self.record(variable);
                }
            }
            _ => {}
        }
        walk_statement(self, statement)
    }

    fn rewrite_expression(&mut self, expression: &Rc<BoundExpression>) -> RewriteResult<Rc<BoundExpression>> {
        match &expression.kind {
            ExpressionKind::Increment { variable, .. }
            | ExpressionKind::Assignment { variable, .. }
            | ExpressionKind::CompoundAssignment { variable, .. } => self.record(variable),
            ExpressionKind::Call {
                function,
                arguments,
            } => self.record_by_reference(function, arguments),
            _ => {}
        }
        walk_expression(self, expression)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bound::{BinaryOp, render};
    use crate::types::Type;

    fn s() -> Span {
        Span::dummy()
    }

    fn main_fn() -> Function {
        Function::user("main", vec![], Type::Void, Modifiers::empty())
    }

    fn read(v: &Variable) -> Rc<BoundExpression> {
        BoundExpression::variable(v, s())
    }

    fn plus(v: &Variable, n: f32) -> Rc<BoundExpression> {
        BoundExpression::binary(read(v), BinaryOp::Add, BoundExpression::float(n, s()), s())
    }

    fn inlined(
        callees: Vec<(Function, Vec<Rc<BoundStatement>>)>,
        body: Vec<Rc<BoundStatement>>,
    ) -> Vec<String> {
        let bodies: IndexMap<_, _> = callees
            .into_iter()
            .map(|(f, b)| (f, BoundStatement::block(b, s())))
            .collect();
        let set: HashSet<Function> = bodies.keys().cloned().collect();
        let mut inliner = Inliner::new(&set, &bodies);
        let out = inliner.inline(&main_fn(), &BoundStatement::block(body, s())).unwrap();
        let StatementKind::Block(statements) = &out.kind else {
            panic!("inlining must produce a block");
        };
        render(statements)
    }

    #[test]
    fn parameters_and_locals_get_per_site_substitutes() {
        let p = Variable::parameter("p", Type::Float, Modifiers::empty());
        let t = Variable::local("t", Type::Float);
        let f = Function::user("f", vec![p.clone()], Type::Float, Modifiers::empty());
        let a = Variable::local("a", Type::Float);
        let r = Variable::local("r", Type::Float);
        let x = Variable::local("x", Type::Float);
        let callee = vec![
            BoundStatement::assign(
                &t,
                BoundExpression::binary(read(&p), BinaryOp::Multiply, BoundExpression::float(2.0, s()), s()),
                s(),
            ),
            BoundStatement::ret(Some(plus(&t, 1.0)), s()),
        ];
        let out = inlined(
            vec![(f.clone(), callee)],
            vec![
                BoundStatement::call(&f, vec![read(&a)], Some(r.clone()), s()),
                BoundStatement::assign(&x, read(&r), s()),
            ],
        );
        assert_eq!(
            out,
            vec![
                "inl1_p = a",
                "inl1_t = inl1_p * 2",
                "r = inl1_t + 1",
                "goto f.return#1",
                "f.return#1:",
                "x = r",
            ]
        );
    }

    #[test]
    fn readonly_parameters_alias_plain_variables() {
        let p = Variable::parameter("p", Type::Float, Modifiers::READONLY);
        let f = Function::user("f", vec![p.clone()], Type::Float, Modifiers::empty());
        let a = Variable::local("a", Type::Float);
        let g = Variable::global("g", Type::Float);
        let r = Variable::local("r", Type::Float);
        let callee = vec![BoundStatement::ret(Some(plus(&p, 1.0)), s())];
        let out = inlined(
            vec![(f.clone(), callee)],
            vec![
                BoundStatement::call(&f, vec![read(&a)], Some(r.clone()), s()),
                BoundStatement::call(&f, vec![read(&g)], Some(r.clone()), s()),
            ],
        );
        assert_eq!(
            out,
            vec![
                "r = a + 1",
                "goto f.return#1",
                "f.return#1:",
                "inl2_p = g",
                "r = inl2_p + 1",
                "goto f.return#2",
                "f.return#2:",
            ]
        );
    }

    #[test]
    fn written_readonly_parameters_are_not_aliased() {
        let p = Variable::parameter("p", Type::Float, Modifiers::READONLY);
        let f = Function::user("f", vec![p.clone()], Type::Void, Modifiers::empty());
        let a = Variable::local("a", Type::Float);
        let callee = vec![
            BoundStatement::expression(BoundExpression::increment(&p, true, false, s())),
            BoundStatement::ret(None, s()),
        ];
        let out = inlined(vec![(f.clone(), callee)], vec![BoundStatement::call(&f, vec![read(&a)], None, s())]);
        assert_eq!(out, vec!["inl1_p = a", "++inl1_p", "goto f.return#1", "f.return#1:"]);
    }

    #[test]
    fn out_parameters_are_copied_back() {
        let o = Variable::parameter("o", Type::Float, Modifiers::OUT);
        let g = Function::user("g", vec![o.clone()], Type::Void, Modifiers::empty());
        let a = Variable::local("a", Type::Float);
        let callee = vec![
            BoundStatement::assign(&o, BoundExpression::float(5.0, s()), s()),
            BoundStatement::ret(None, s()),
        ];
        let out = inlined(vec![(g.clone(), callee)], vec![BoundStatement::call(&g, vec![read(&a)], None, s())]);
        assert_eq!(out, vec!["inl1_o = 5", "goto g.return#1", "g.return#1:", "a = inl1_o"]);
    }

    #[test]
    fn labels_are_unique_per_site_and_nested_calls_expand() {
        let f = Function::user("f", vec![], Type::Void, Modifiers::empty());
        let h = Function::user("h", vec![], Type::Void, Modifiers::empty());
        let skip = Label::new("f.skip1");
        let f_body = vec![
            BoundStatement::goto(&skip, s()),
            BoundStatement::label(&skip, s()),
            BoundStatement::ret(None, s()),
        ];
        let h_body = vec![
            BoundStatement::call(&f, vec![], None, s()),
            BoundStatement::ret(None, s()),
        ];
        let out = inlined(
            vec![(f.clone(), f_body), (h.clone(), h_body)],
            vec![
                BoundStatement::call(&h, vec![], None, s()),
                BoundStatement::call(&f, vec![], None, s()),
            ],
        );
        assert_eq!(
            out,
            vec![
                "goto f.skip1#2",
                "f.skip1#2:",
                "goto f.return#2",
                "f.return#2:",
                "goto h.return#1",
                "h.return#1:",
                "goto f.skip1#3",
                "f.skip1#3:",
                "goto f.return#3",
                "f.return#3:",
            ]
        );
    }
}
