//! Program-wide unique storage names.
//!
//! Locals, parameters and temporaries of every emitted function share one
//! storage namespace once they become graph variables, so each distinct
//! symbol gets a distinct name: the first keeps its own, later ones get a
//! `_N` suffix. Globals keep their names; their storage is prefixed.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use indexmap::IndexMap;
use log::debug;

use crate::bound::BoundStatement;
use crate::error::CoreError;
use crate::rewrite::Rewriter;
use crate::symbols::{Function, Variable};

pub fn rename(
    program: &IndexMap<Function, Rc<BoundStatement>>,
) -> Result<IndexMap<Function, Rc<BoundStatement>>, CoreError> {
    let mut renamer = Renamer::default();
    let mut out = IndexMap::with_capacity(program.len());
    for (function, body) in program {
        let function = renamer.rewrite_function(function);
        let body = renamer.rewrite_statement(body)?;
        out.insert(function, body);
    }
    debug!(
        "renamed {} variables across {} functions",
        renamer.renamed,
        out.len()
    );
    Ok(out)
}

#[derive(Default)]
struct Renamer {
    taken: HashSet<String>,
    suffixes: HashMap<String, u32>,
    variables: HashMap<Variable, Variable>,
    functions: HashMap<Function, Function>,
    renamed: usize,
}

impl Renamer {
    fn unique_name(&mut self, name: &str) -> String {
        if self.taken.insert(name.to_string()) {
            return name.to_string();
        }
        let suffix = self.suffixes.entry(name.to_string()).or_insert(0);
        loop {
            *suffix += 1;
            let candidate = format!("{name}_{suffix}");
            if self.taken.insert(candidate.clone()) {
                self.renamed += 1;
                return candidate;
            }
        }
    }
}

impl Rewriter for Renamer {
    fn rewrite_variable(&mut self, variable: &Variable) -> Variable {
        if variable.is_global() {
            return variable.clone();
        }
        if let Some(renamed) = self.variables.get(variable) {
            return renamed.clone();
        }
        let renamed = match variable.property_of() {
            Some((base, axis)) => {
                let new_base = self.rewrite_variable(base);
                if new_base == *base {
                    variable.clone()
                } else {
                    Variable::property(&new_base, axis)
                }
            }
            None => {
                let name = self.unique_name(&variable.name);
                if name == variable.name {
                    variable.clone()
                } else {
                    variable.renamed(name)
                }
            }
        };
        self.variables.insert(variable.clone(), renamed.clone());
        renamed
    }

    fn rewrite_function(&mut self, function: &Function) -> Function {
        if function.is_builtin() {
            return function.clone();
        }
        if let Some(renamed) = self.functions.get(function) {
            return renamed.clone();
        }
        let parameters: Vec<Variable> = function
            .parameters
            .iter()
            .map(|p| self.rewrite_variable(p))
            .collect();
        let return_variable = function.return_variable.as_ref().map(|v| self.rewrite_variable(v));
        let unchanged = parameters.iter().zip(&function.parameters).all(|(a, b)| a == b)
            && return_variable == function.return_variable;
        let renamed = if unchanged {
            function.clone()
        } else {
            function.with_parameters(parameters, return_variable)
        };
        self.functions.insert(function.clone(), renamed.clone());
        renamed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bound::{BoundExpression, StatementKind, render};
    use crate::span::Span;
    use crate::symbols::Modifiers;
    use crate::types::Type;

    fn s() -> Span {
        Span::dummy()
    }

    fn body(out: &IndexMap<Function, Rc<BoundStatement>>, index: usize) -> Vec<String> {
        let (_, body) = out.get_index(index).unwrap();
        let StatementKind::Block(statements) = &body.kind else {
            panic!("expected a block");
        };
        render(statements)
    }

    #[test]
    fn same_named_symbols_get_distinct_names() {
        let first = Variable::local("x", Type::Float);
        let second = Variable::local("x", Type::Float);
        let taken = Variable::local("x_1", Type::Float);
        let main = Function::user("main", vec![], Type::Void, Modifiers::empty());
        let program: IndexMap<_, _> = [(
            main,
            BoundStatement::block(
                vec![
                    BoundStatement::assign(&first, BoundExpression::float(1.0, s()), s()),
                    BoundStatement::assign(&taken, BoundExpression::variable(&first, s()), s()),
                    BoundStatement::assign(&second, BoundExpression::variable(&taken, s()), s()),
                ],
                s(),
            ),
        )]
        .into_iter()
        .collect();
        let out = rename(&program).unwrap();
        assert_eq!(body(&out, 0), vec!["x = 1", "x_1 = x", "x_2 = x_1"]);
    }

    #[test]
    fn parameters_are_renamed_in_signatures_and_call_sites() {
        let x = Variable::local("x", Type::Float);
        let p = Variable::parameter("x", Type::Float, Modifiers::empty());
        let g = Variable::global("x", Type::Float);
        let f = Function::user("f", vec![p.clone()], Type::Void, Modifiers::empty());
        let main = Function::user("main", vec![], Type::Void, Modifiers::empty());
        let program: IndexMap<_, _> = [
            (
                main,
                BoundStatement::block(
                    vec![
                        BoundStatement::assign(&x, BoundExpression::variable(&g, s()), s()),
                        BoundStatement::call(&f, vec![BoundExpression::variable(&x, s())], None, s()),
                    ],
                    s(),
                ),
            ),
            (
                f.clone(),
                BoundStatement::block(
                    vec![BoundStatement::assign(&g, BoundExpression::variable(&p, s()), s())],
                    s(),
                ),
            ),
        ]
        .into_iter()
        .collect();
        let out = rename(&program).unwrap();
        assert_eq!(body(&out, 0), vec!["x = x", "call f(x)"]);
        assert_eq!(body(&out, 1), vec!["x = x_1"]);

        let (callee, _) = out.get_index(1).unwrap();
        assert_eq!(callee.parameters[0].name, "x_1");
        let (_, main_body) = out.get_index(0).unwrap();
        let StatementKind::Block(statements) = &main_body.kind else {
            panic!("expected a block");
        };
        let StatementKind::Call { function, .. } = &statements[1].kind else {
            panic!("expected a call");
        };
        assert_eq!(function, callee);
    }
}
