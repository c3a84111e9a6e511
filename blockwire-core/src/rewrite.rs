//! Structural rewriting of the bound tree.
//!
//! A [`Rewriter`] overrides the hooks it cares about and inherits an
//! exhaustive walk for everything else. The walk returns the original `Rc`
//! when no child changed, so callers can compare with `Rc::ptr_eq`.

use std::rc::Rc;

use crate::bound::{BoundExpression, BoundStatement, ExpressionKind, GotoKind, StatementKind};
use crate::error::CoreError;
use crate::symbols::{Function, Label, Variable};

pub type RewriteResult<T> = Result<T, CoreError>;

pub trait Rewriter {
    fn rewrite_statement(&mut self, statement: &Rc<BoundStatement>) -> RewriteResult<Rc<BoundStatement>> {
        walk_statement(self, statement)
    }

    fn rewrite_expression(&mut self, expression: &Rc<BoundExpression>) -> RewriteResult<Rc<BoundExpression>> {
        walk_expression(self, expression)
    }

    fn rewrite_variable(&mut self, variable: &Variable) -> Variable {
        variable.clone()
    }

    fn rewrite_label(&mut self, label: &Label) -> Label {
        label.clone()
    }

    fn rewrite_function(&mut self, function: &Function) -> Function {
        function.clone()
    }
}

fn same<T>(a: &Rc<T>, b: &Rc<T>) -> bool {
    Rc::ptr_eq(a, b)
}

fn rewrite_list<R: Rewriter + ?Sized>(
    rewriter: &mut R,
    items: &[Rc<BoundExpression>],
) -> RewriteResult<Option<Vec<Rc<BoundExpression>>>> {
    let mut out = Vec::with_capacity(items.len());
    let mut changed = false;
    for item in items {
        let new = rewriter.rewrite_expression(item)?;
        changed |= !same(item, &new);
        out.push(new);
    }
    Ok(changed.then_some(out))
}

fn rewrite_optional<R: Rewriter + ?Sized>(
    rewriter: &mut R,
    item: &Option<Rc<BoundExpression>>,
) -> RewriteResult<(Option<Rc<BoundExpression>>, bool)> {
    match item {
        Some(e) => {
            let new = rewriter.rewrite_expression(e)?;
            let changed = !same(e, &new);
            Ok((Some(new), changed))
        }
        None => Ok((None, false)),
    }
}

/// Rewrites every child of `statement` and rebuilds it only if one changed.
pub fn walk_statement<R: Rewriter + ?Sized>(
    rewriter: &mut R,
    statement: &Rc<BoundStatement>,
) -> RewriteResult<Rc<BoundStatement>> {
    let span = statement.span;
    let kind = match &statement.kind {
        StatementKind::Block(statements) => {
            let mut out = Vec::with_capacity(statements.len());
            let mut changed = false;
            for s in statements {
                let new = rewriter.rewrite_statement(s)?;
                changed |= !same(s, &new);
                out.push(new);
            }
            if !changed {
                return Ok(statement.clone());
            }
            StatementKind::Block(out)
        }
        StatementKind::VariableDeclaration {
            variable,
            initializer,
            name_span,
        } => {
            let new_var = rewriter.rewrite_variable(variable);
            let (initializer, changed) = rewrite_optional(rewriter, initializer)?;
            if !changed && new_var == *variable {
                return Ok(statement.clone());
            }
            StatementKind::VariableDeclaration {
                variable: new_var,
                initializer,
                name_span: *name_span,
            }
        }
        StatementKind::Assignment { variable, value } => {
            let new_var = rewriter.rewrite_variable(variable);
            let new_value = rewriter.rewrite_expression(value)?;
            if same(value, &new_value) && new_var == *variable {
                return Ok(statement.clone());
            }
            StatementKind::Assignment {
                variable: new_var,
                value: new_value,
            }
        }
        StatementKind::CompoundAssignment {
            variable,
            op,
            value,
        } => {
            let new_var = rewriter.rewrite_variable(variable);
            let new_value = rewriter.rewrite_expression(value)?;
            if same(value, &new_value) && new_var == *variable {
                return Ok(statement.clone());
            }
            StatementKind::CompoundAssignment {
                variable: new_var,
                op: *op,
                value: new_value,
            }
        }
        StatementKind::If {
            condition,
            then,
            otherwise,
        } => {
            let c = rewriter.rewrite_expression(condition)?;
            let t = rewriter.rewrite_statement(then)?;
            let e = match otherwise {
                Some(e) => Some(rewriter.rewrite_statement(e)?),
                None => None,
            };
            let else_same = match (otherwise, &e) {
                (Some(a), Some(b)) => same(a, b),
                (None, None) => true,
                _ => false,
            };
            if same(condition, &c) && same(then, &t) && else_same {
                return Ok(statement.clone());
            }
            StatementKind::If {
                condition: c,
                then: t,
                otherwise: e,
            }
        }
        StatementKind::While { condition, body } => {
            let c = rewriter.rewrite_expression(condition)?;
            let b = rewriter.rewrite_statement(body)?;
            if same(condition, &c) && same(body, &b) {
                return Ok(statement.clone());
            }
            StatementKind::While {
                condition: c,
                body: b,
            }
        }
        StatementKind::DoWhile { body, condition } => {
            let b = rewriter.rewrite_statement(body)?;
            let c = rewriter.rewrite_expression(condition)?;
            if same(condition, &c) && same(body, &b) {
                return Ok(statement.clone());
            }
            StatementKind::DoWhile {
                body: b,
                condition: c,
            }
        }
        StatementKind::Event {
            event,
            arguments,
            body,
        } => {
            let args = rewrite_list(rewriter, arguments)?;
            let b = rewriter.rewrite_statement(body)?;
            if args.is_none() && same(body, &b) {
                return Ok(statement.clone());
            }
            StatementKind::Event {
                event: *event,
                arguments: args.unwrap_or_else(|| arguments.clone()),
                body: b,
            }
        }
        StatementKind::Label(label) => {
            let new = rewriter.rewrite_label(label);
            if new == *label {
                return Ok(statement.clone());
            }
            StatementKind::Label(new)
        }
        StatementKind::Goto { label, kind } => {
            let new_label = rewriter.rewrite_label(label);
            let (new_kind, changed) = match kind {
                GotoKind::Conditional {
                    condition,
                    jump_if_true,
                } => {
                    let c = rewriter.rewrite_expression(condition)?;
                    let changed = !same(condition, &c);
                    (
                        GotoKind::Conditional {
                            condition: c,
                            jump_if_true: *jump_if_true,
                        },
                        changed,
                    )
                }
                GotoKind::Event { event, arguments } => {
                    let args = rewrite_list(rewriter, arguments)?;
                    let changed = args.is_some();
                    (
                        GotoKind::Event {
                            event: *event,
                            arguments: args.unwrap_or_else(|| arguments.clone()),
                        },
                        changed,
                    )
                }
                other => (other.clone(), false),
            };
            if !changed && new_label == *label {
                return Ok(statement.clone());
            }
            StatementKind::Goto {
                label: new_label,
                kind: new_kind,
            }
        }
        StatementKind::Return(value) => {
            let (value, changed) = rewrite_optional(rewriter, value)?;
            if !changed {
                return Ok(statement.clone());
            }
            StatementKind::Return(value)
        }
        StatementKind::Call {
            function,
            arguments,
            result,
        } => {
            let new_function = rewriter.rewrite_function(function);
            let args = rewrite_list(rewriter, arguments)?;
            let new_result = result.as_ref().map(|r| rewriter.rewrite_variable(r));
            if args.is_none() && new_result == *result && new_function == *function {
                return Ok(statement.clone());
            }
            StatementKind::Call {
                function: new_function,
                arguments: args.unwrap_or_else(|| arguments.clone()),
                result: new_result,
            }
        }
        StatementKind::Expression(e) => {
            let new = rewriter.rewrite_expression(e)?;
            if same(e, &new) {
                return Ok(statement.clone());
            }
            StatementKind::Expression(new)
        }
        StatementKind::EmitterHint(_) | StatementKind::Nop => return Ok(statement.clone()),
    };
    Ok(BoundStatement::new(kind, span))
}

/// Rewrites every child of `expression`; type, span and constant carry
/// over to the rebuilt node unchanged.
pub fn walk_expression<R: Rewriter + ?Sized>(
    rewriter: &mut R,
    expression: &Rc<BoundExpression>,
) -> RewriteResult<Rc<BoundExpression>> {
    let kind = match &expression.kind {
        ExpressionKind::Literal(_) | ExpressionKind::Error => return Ok(expression.clone()),
        ExpressionKind::Variable(v) => {
            let new = rewriter.rewrite_variable(v);
            if new == *v {
                return Ok(expression.clone());
            }
            ExpressionKind::Variable(new)
        }
        ExpressionKind::Unary { op, operand } => {
            let new = rewriter.rewrite_expression(operand)?;
            if same(operand, &new) {
                return Ok(expression.clone());
            }
            ExpressionKind::Unary {
                op: *op,
                operand: new,
            }
        }
        ExpressionKind::Binary { left, op, right } => {
            let l = rewriter.rewrite_expression(left)?;
            let r = rewriter.rewrite_expression(right)?;
            if same(left, &l) && same(right, &r) {
                return Ok(expression.clone());
            }
            ExpressionKind::Binary {
                left: l,
                op: *op,
                right: r,
            }
        }
        ExpressionKind::Constructor { x, y, z } => {
            let nx = rewriter.rewrite_expression(x)?;
            let ny = rewriter.rewrite_expression(y)?;
            let nz = rewriter.rewrite_expression(z)?;
            if same(x, &nx) && same(y, &ny) && same(z, &nz) {
                return Ok(expression.clone());
            }
            ExpressionKind::Constructor {
                x: nx,
                y: ny,
                z: nz,
            }
        }
        ExpressionKind::Call {
            function,
            arguments,
        } => {
            let new_function = rewriter.rewrite_function(function);
            let args = rewrite_list(rewriter, arguments)?;
            if args.is_none() && new_function == *function {
                return Ok(expression.clone());
            }
            ExpressionKind::Call {
                function: new_function,
                arguments: args.unwrap_or_else(|| arguments.clone()),
            }
        }
        ExpressionKind::Conversion { operand } => {
            let new = rewriter.rewrite_expression(operand)?;
            if same(operand, &new) {
                return Ok(expression.clone());
            }
            ExpressionKind::Conversion { operand: new }
        }
        ExpressionKind::Increment {
            variable,
            prefix,
            decrement,
        } => {
            let new = rewriter.rewrite_variable(variable);
            if new == *variable {
                return Ok(expression.clone());
            }
            ExpressionKind::Increment {
                variable: new,
                prefix: *prefix,
                decrement: *decrement,
            }
        }
        ExpressionKind::ArraySegment(items) => match rewrite_list(rewriter, items)? {
            Some(items) => ExpressionKind::ArraySegment(items),
            None => return Ok(expression.clone()),
        },
        ExpressionKind::Assignment { variable, value } => {
            let new_var = rewriter.rewrite_variable(variable);
            let new_value = rewriter.rewrite_expression(value)?;
            if same(value, &new_value) && new_var == *variable {
                return Ok(expression.clone());
            }
            ExpressionKind::Assignment {
                variable: new_var,
                value: new_value,
            }
        }
        ExpressionKind::CompoundAssignment {
            variable,
            op,
            value,
        } => {
            let new_var = rewriter.rewrite_variable(variable);
            let new_value = rewriter.rewrite_expression(value)?;
            if same(value, &new_value) && new_var == *variable {
                return Ok(expression.clone());
            }
            ExpressionKind::CompoundAssignment {
                variable: new_var,
                op: *op,
                value: new_value,
            }
        }
        ExpressionKind::Statement(s) => {
            let new = rewriter.rewrite_statement(s)?;
            if same(s, &new) {
                return Ok(expression.clone());
            }
            ExpressionKind::Statement(new)
        }
    };
    Ok(BoundExpression::new(
        kind,
        expression.ty,
        expression.span,
        expression.constant,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bound::BinaryOp;
    use crate::span::Span;
    use crate::types::Type;

    struct Identity;
    impl Rewriter for Identity {}

    struct RenameX {
        from: Variable,
        to: Variable,
    }

    impl Rewriter for RenameX {
        fn rewrite_variable(&mut self, variable: &Variable) -> Variable {
            if *variable == self.from {
                self.to.clone()
            } else {
                variable.clone()
            }
        }
    }

    fn sample(x: &Variable, y: &Variable) -> Rc<BoundStatement> {
        let s = Span::dummy();
        BoundStatement::block(
            vec![
                BoundStatement::assign(
                    y,
                    BoundExpression::binary(BoundExpression::variable(x, s), BinaryOp::Add, BoundExpression::float(1.0, s), s),
                    s,
                ),
                BoundStatement::assign(y, BoundExpression::float(2.0, s), s),
            ],
            s,
        )
    }

    #[test]
    fn unchanged_trees_are_shared() {
        let x = Variable::local("x", Type::Float);
        let y = Variable::local("y", Type::Float);
        let tree = sample(&x, &y);
        let out = Identity.rewrite_statement(&tree).unwrap();
        assert!(Rc::ptr_eq(&tree, &out));
    }

    #[test]
    fn only_changed_paths_are_rebuilt() {
        let x = Variable::local("x", Type::Float);
        let y = Variable::local("y", Type::Float);
        let tree = sample(&x, &y);
        let mut rw = RenameX {
            from: x.clone(),
            to: Variable::local("x_1", Type::Float),
        };
        let out = rw.rewrite_statement(&tree).unwrap();
        assert!(!Rc::ptr_eq(&tree, &out));
        let (StatementKind::Block(before), StatementKind::Block(after)) = (&tree.kind, &out.kind) else {
            panic!("expected blocks");
        };
        assert!(!Rc::ptr_eq(&before[0], &after[0]));
        assert!(Rc::ptr_eq(&before[1], &after[1]));
        assert_eq!(after[0].to_string(), "y = x_1 + 1");
    }
}
