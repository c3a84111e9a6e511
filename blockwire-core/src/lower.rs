//! Lowering of structured control flow into labels and gotos.
//!
//! The result of [`lower`] is a single flat block: no nested blocks, no
//! `if`/`while`/`do`/event statements, no compound assignments. Constant
//! subexpressions are folded, constant conditions become plain jumps, and
//! statements unreachable from the function entry are dropped.

use std::rc::Rc;

use log::debug;

use crate::bound::{
    BoundExpression, BoundStatement, EmitterHint, ExpressionKind, GotoKind, StatementKind,
};
use crate::cfg::ControlFlowGraph;
use crate::error::CoreError;
use crate::names::LabelGenerator;
use crate::rewrite::{RewriteResult, Rewriter, walk_expression, walk_statement};
use crate::span::Span;
use crate::symbols::{Function, Label};

pub fn lower(function: &Function, body: &Rc<BoundStatement>) -> Result<Rc<BoundStatement>, CoreError> {
    let mut lowerer = Lowerer {
        labels: LabelGenerator::new(function.name.as_str()),
    };
    let rewritten = lowerer.rewrite_statement(body)?;

    let mut statements = Vec::new();
    flatten(&rewritten, &mut statements);

    if function.return_type.is_void() && ControlFlowGraph::build(&statements)?.falls_through() {
        statements.push(BoundStatement::ret(None, body.span));
    }

    let before = statements.len();
    let statements = remove_dead_code(statements)?;
    debug!(
        "lowered '{}': {} statements, {} unreachable removed",
        function.name,
        statements.len(),
        before - statements.len()
    );
    Ok(BoundStatement::block(statements, body.span))
}

/// Inlines nested blocks into one sequence.
pub fn flatten(statement: &Rc<BoundStatement>, out: &mut Vec<Rc<BoundStatement>>) {
    match &statement.kind {
        StatementKind::Block(statements) => {
            for s in statements {
                flatten(s, out);
            }
        }
        _ => out.push(statement.clone()),
    }
}

/// Drops statements the control-flow graph cannot reach. Emitter hints are
/// kept so enter/exit markers stay balanced.
fn remove_dead_code(statements: Vec<Rc<BoundStatement>>) -> Result<Vec<Rc<BoundStatement>>, CoreError> {
    let reachable = ControlFlowGraph::build(&statements)?.reachable_statements();
    Ok(statements
        .into_iter()
        .zip(reachable)
        .filter(|(s, live)| *live || matches!(s.kind, StatementKind::EmitterHint(_)))
        .map(|(s, _)| s)
        .collect())
}

/// `goto label` when `condition == jump_if_true`; resolved now when the
/// condition is constant.
fn conditional_goto(
    condition: Rc<BoundExpression>,
    label: &Label,
    jump_if_true: bool,
    span: Span,
) -> Rc<BoundStatement> {
    match condition.constant.and_then(|v| v.as_bool()) {
        Some(value) if value == jump_if_true => BoundStatement::goto(label, span),
        Some(_) => BoundStatement::nop(span),
        None => BoundStatement::goto_if(condition, label, jump_if_true, span),
    }
}

fn grouped(body: Rc<BoundStatement>, out: &mut Vec<Rc<BoundStatement>>) {
    let span = body.span;
    out.push(BoundStatement::hint(EmitterHint::EnterStatementBlock, span));
    out.push(body);
    out.push(BoundStatement::hint(EmitterHint::ExitStatementBlock, span));
}

struct Lowerer {
    labels: LabelGenerator,
}

impl Lowerer {
    fn lower_if(
        &mut self,
        condition: &Rc<BoundExpression>,
        then: &Rc<BoundStatement>,
        otherwise: Option<&Rc<BoundStatement>>,
        span: Span,
    ) -> RewriteResult<Rc<BoundStatement>> {
        let condition = self.rewrite_expression(condition)?;
        let then = self.rewrite_statement(then)?;
        let otherwise = otherwise.map(|e| self.rewrite_statement(e)).transpose()?;

        let end = self.labels.fresh("end");
        let mut out = Vec::new();
        match otherwise {
            None => {
                out.push(conditional_goto(condition, &end, false, span));
                grouped(then, &mut out);
            }
            Some(otherwise) => {
                let else_label = self.labels.fresh("else");
                out.push(conditional_goto(condition, &else_label, false, span));
                grouped(then, &mut out);
                out.push(BoundStatement::goto(&end, span));
                out.push(BoundStatement::label(&else_label, span));
                grouped(otherwise, &mut out);
            }
        }
        out.push(BoundStatement::label(&end, span));
        Ok(BoundStatement::block(out, span))
    }

    fn lower_while(
        &mut self,
        condition: &Rc<BoundExpression>,
        body: &Rc<BoundStatement>,
        span: Span,
    ) -> RewriteResult<Rc<BoundStatement>> {
        let condition = self.rewrite_expression(condition)?;
        let body = self.rewrite_statement(body)?;
        let continue_label = self.labels.fresh("continue");
        let break_label = self.labels.fresh("break");
        Ok(BoundStatement::block(
            vec![
                BoundStatement::label(&continue_label, span),
                conditional_goto(condition, &break_label, false, span),
                body,
                BoundStatement::goto(&continue_label, span),
                BoundStatement::label(&break_label, span),
            ],
            span,
        ))
    }

    fn lower_do_while(
        &mut self,
        body: &Rc<BoundStatement>,
        condition: &Rc<BoundExpression>,
        span: Span,
    ) -> RewriteResult<Rc<BoundStatement>> {
        let body = self.rewrite_statement(body)?;
        let condition = self.rewrite_expression(condition)?;
        let body_label = self.labels.fresh("body");
        let continue_label = self.labels.fresh("continue");
        let break_label = self.labels.fresh("break");
        Ok(BoundStatement::block(
            vec![
                BoundStatement::label(&body_label, span),
                body,
                BoundStatement::label(&continue_label, span),
                conditional_goto(condition, &body_label, true, span),
                BoundStatement::label(&break_label, span),
            ],
            span,
        ))
    }

    fn lower_event(
        &mut self,
        statement: &BoundStatement,
        span: Span,
    ) -> RewriteResult<Rc<BoundStatement>> {
        let StatementKind::Event {
            event,
            arguments,
            body,
        } = &statement.kind
        else {
            return Err(CoreError::internal("lower_event called on a non-event statement"));
        };
        let arguments = arguments
            .iter()
            .map(|a| self.rewrite_expression(a))
            .collect::<Result<Vec<_>, _>>()?;
        let body = self.rewrite_statement(body)?;
        let special = self.labels.fresh("event");
        let end = self.labels.fresh("end");
        // The sensor's `After` output fires whether or not the body left
        // through a `return`; the rollback keeps `end` from running twice.
        Ok(BoundStatement::block(
            vec![
                BoundStatement::event_goto(&special, *event, arguments, span),
                BoundStatement::goto(&end, span),
                BoundStatement::label(&special, span),
                body,
                BoundStatement::rollback_goto(&end, span),
                BoundStatement::label(&end, span),
            ],
            span,
        ))
    }

    /// Replaces a call to a constant-foldable built-in by its value.
    fn fold_call(&self, call: Rc<BoundExpression>) -> RewriteResult<Rc<BoundExpression>> {
        let ExpressionKind::Call {
            function,
            arguments,
        } = &call.kind
        else {
            return Ok(call);
        };
        let Some(evaluate) = function.builtin_descriptor().and_then(|d| d.constant) else {
            return Ok(call);
        };
        if let Some(parameter) = function.parameters.iter().find(|p| p.modifiers.is_by_reference()) {
            return Err(CoreError::ConstantRefParameter {
                function: function.name.clone(),
                parameter: parameter.name.clone(),
            });
        }
        let values: Option<Vec<_>> = arguments.iter().map(|a| a.constant).collect();
        match values.and_then(|v| evaluate(&v)) {
            Some(value) => Ok(BoundExpression::literal(value, call.span)),
            None => Ok(call),
        }
    }
}

/// Derives the constant of an operator node again from its (possibly
/// rewritten) operands. The original node is handed back when that changes
/// nothing.
fn rederive(original: &Rc<BoundExpression>, rewritten: Rc<BoundExpression>) -> Rc<BoundExpression> {
    let unchanged = Rc::ptr_eq(original, &rewritten);
    if unchanged && rewritten.constant.is_some() {
        return rewritten;
    }
    let span = rewritten.span;
    let rebuilt = match &rewritten.kind {
        ExpressionKind::Unary { op, operand } => BoundExpression::unary(*op, operand.clone(), span),
        ExpressionKind::Binary { left, op, right } => {
            BoundExpression::binary(left.clone(), *op, right.clone(), span)
        }
        ExpressionKind::Constructor { x, y, z } => {
            BoundExpression::constructor(rewritten.ty, x.clone(), y.clone(), z.clone(), span)
        }
        ExpressionKind::Conversion { operand } => {
            BoundExpression::conversion(operand.clone(), rewritten.ty, span)
        }
        _ => return rewritten,
    };
    if unchanged && rebuilt.constant.is_none() {
        rewritten
    } else {
        rebuilt
    }
}

impl Rewriter for Lowerer {
    fn rewrite_statement(&mut self, statement: &Rc<BoundStatement>) -> RewriteResult<Rc<BoundStatement>> {
        let span = statement.span;
        match &statement.kind {
            StatementKind::If {
                condition,
                then,
                otherwise,
            } => self.lower_if(condition, then, otherwise.as_ref(), span),
            StatementKind::While { condition, body } => self.lower_while(condition, body, span),
            StatementKind::DoWhile { body, condition } => self.lower_do_while(body, condition, span),
            StatementKind::Event { .. } => self.lower_event(statement, span),
            StatementKind::CompoundAssignment {
                variable,
                op,
                value,
            } => {
                let value = self.rewrite_expression(value)?;
                let current = BoundExpression::variable(variable, span);
                let combined = BoundExpression::binary(current, *op, value, span);
                Ok(BoundStatement::assign(variable, combined, span))
            }
            StatementKind::Goto {
                label,
                kind: GotoKind::Conditional {
                    condition,
                    jump_if_true,
                },
            } => {
                let condition = self.rewrite_expression(condition)?;
                Ok(conditional_goto(condition, label, *jump_if_true, span))
            }
            _ => walk_statement(self, statement),
        }
    }

    fn rewrite_expression(&mut self, expression: &Rc<BoundExpression>) -> RewriteResult<Rc<BoundExpression>> {
        let rewritten = rederive(expression, walk_expression(self, expression)?);
        let span = rewritten.span;
        match &rewritten.kind {
            ExpressionKind::CompoundAssignment {
                variable,
                op,
                value,
            } => {
                let current = BoundExpression::variable(variable, span);
                let combined = BoundExpression::binary(current, *op, value.clone(), span);
                Ok(BoundExpression::assignment(variable, combined, span))
            }
            ExpressionKind::Call { .. } => self.fold_call(rewritten),
            ExpressionKind::Unary { .. }
            | ExpressionKind::Binary { .. }
            | ExpressionKind::Constructor { .. }
            | ExpressionKind::Conversion { .. } => match rewritten.constant {
                Some(value) => Ok(BoundExpression::literal(value, span)),
                None => Ok(rewritten),
            },
            _ => Ok(rewritten),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bound::{BinaryOp, EventKind, render};
    use crate::builtins::{BuiltinEmit, BuiltinFunction, BuiltinParameter, BuiltinRegistry};
    use crate::symbols::{Modifiers, Variable};
    use crate::types::Type;
    use crate::value::Value;
    use proptest::prelude::*;

    fn s() -> Span {
        Span::dummy()
    }

    fn main_fn() -> Function {
        Function::user("main", vec![], Type::Void, Modifiers::empty())
    }

    fn lowered(body: Vec<Rc<BoundStatement>>) -> Vec<String> {
        let out = lower(&main_fn(), &BoundStatement::block(body, s())).unwrap();
        let StatementKind::Block(statements) = &out.kind else {
            panic!("lowering must produce a block");
        };
        render(statements)
    }

    #[test]
    fn while_loop_has_the_expected_shape() {
        let i = Variable::local("i", Type::Float);
        let condition = BoundExpression::binary(
            BoundExpression::variable(&i, s()),
            BinaryOp::Less,
            BoundExpression::float(10.0, s()),
            s(),
        );
        let body = BoundStatement::expression(BoundExpression::increment(&i, false, false, s()));
        assert_eq!(
            lowered(vec![BoundStatement::while_(condition, body, s())]),
            vec![
                "main.continue1:",
                "goto main.break1 unless i < 10",
                "i++",
                "goto main.continue1",
                "main.break1:",
                "return",
            ]
        );
    }

    #[test]
    fn constant_expressions_fold_to_literals() {
        let x = Variable::local("x", Type::Float);
        // Built without the binder's folding to exercise the lowerer's own.
        let product = BoundExpression::new(
            ExpressionKind::Binary {
                left: BoundExpression::float(2.0, s()),
                op: BinaryOp::Multiply,
                right: BoundExpression::float(3.0, s()),
            },
            Type::Float,
            s(),
            None,
        );
        let sum = BoundExpression::new(
            ExpressionKind::Binary {
                left: product,
                op: BinaryOp::Add,
                right: BoundExpression::float(1.0, s()),
            },
            Type::Float,
            s(),
            None,
        );
        assert_eq!(
            lowered(vec![BoundStatement::assign(&x, sum, s())]),
            vec!["x = 7", "return"]
        );
    }

    #[test]
    fn builtin_calls_with_constant_arguments_fold() {
        let x = Variable::local("x", Type::Float);
        let abs = BuiltinRegistry::global()
            .resolve("abs", &[Type::Float], s())
            .unwrap();
        let call = BoundExpression::call(&abs, vec![BoundExpression::float(-3.0, s())], s());
        let sum = BoundExpression::binary(call, BinaryOp::Add, BoundExpression::float(1.0, s()), s());
        assert_eq!(
            lowered(vec![BoundStatement::assign(&x, sum, s())]),
            vec!["x = 4", "return"]
        );
    }

    #[test]
    fn constant_folding_rejects_by_reference_parameters() {
        fn fold(_: &[Value]) -> Option<Value> {
            Some(Value::Float(0.0))
        }
        static BROKEN: BuiltinFunction = BuiltinFunction {
            name: "broken",
            parameters: &[BuiltinParameter {
                name: "result",
                ty: Type::Float,
                modifiers: Modifiers::OUT,
            }],
            return_type: Type::Float,
            constant: Some(fold),
            emit: BuiltinEmit::Block(&crate::blocks::ABSOLUTE),
        };
        let f = Function::builtin(&BROKEN, Type::Float);
        let x = Variable::local("x", Type::Float);
        let call = BoundExpression::call(&f, vec![BoundExpression::variable(&x, s())], s());
        let body = BoundStatement::block(vec![BoundStatement::assign(&x, call, s())], s());
        let err = lower(&main_fn(), &body).unwrap_err();
        assert!(matches!(err, CoreError::ConstantRefParameter { .. }));
    }

    #[test]
    fn if_else_branches_are_grouped() {
        let c = Variable::local("c", Type::Bool);
        let x = Variable::local("x", Type::Float);
        let stmt = BoundStatement::if_(
            BoundExpression::variable(&c, s()),
            BoundStatement::assign(&x, BoundExpression::float(1.0, s()), s()),
            Some(BoundStatement::assign(&x, BoundExpression::float(2.0, s()), s())),
            s(),
        );
        assert_eq!(
            lowered(vec![stmt]),
            vec![
                "goto main.else1 unless c",
                "<enter block>",
                "x = 1",
                "<exit block>",
                "goto main.end1",
                "main.else1:",
                "<enter block>",
                "x = 2",
                "<exit block>",
                "main.end1:",
                "return",
            ]
        );
    }

    #[test]
    fn constant_true_condition_drops_the_else_branch() {
        let x = Variable::local("x", Type::Float);
        let stmt = BoundStatement::if_(
            BoundExpression::bool(true, s()),
            BoundStatement::assign(&x, BoundExpression::float(1.0, s()), s()),
            Some(BoundStatement::assign(&x, BoundExpression::float(2.0, s()), s())),
            s(),
        );
        // The dead branch loses its statements but keeps its grouping hints.
        assert_eq!(
            lowered(vec![stmt]),
            vec![
                "nop",
                "<enter block>",
                "x = 1",
                "<exit block>",
                "goto main.end1",
                "<enter block>",
                "<exit block>",
                "main.end1:",
                "return",
            ]
        );
    }

    #[test]
    fn code_after_return_is_removed() {
        let i = Variable::local("i", Type::Float);
        let body = BoundStatement::block(
            vec![BoundStatement::expression(BoundExpression::increment(&i, false, false, s()))],
            s(),
        );
        let statements = vec![
            BoundStatement::do_while(body, BoundExpression::bool(false, s()), s()),
            BoundStatement::ret(None, s()),
            BoundStatement::assign(&i, BoundExpression::float(5.0, s()), s()),
        ];
        assert_eq!(
            lowered(statements),
            vec![
                "main.body1:",
                "i++",
                "main.continue1:",
                "nop",
                "main.break1:",
                "return",
            ]
        );
    }

    #[test]
    fn events_jump_to_their_body_and_roll_back() {
        let x = Variable::local("x", Type::Float);
        let body = BoundStatement::assign(&x, BoundExpression::float(1.0, s()), s());
        let stmt = BoundStatement::event(EventKind::Play, vec![], body, s());
        assert_eq!(
            lowered(vec![stmt]),
            vec![
                "goto main.event1 on Play",
                "goto main.end1",
                "main.event1:",
                "x = 1",
                "rollback main.end1",
                "main.end1:",
                "return",
            ]
        );
    }

    #[test]
    fn compound_assignment_becomes_plain_assignment() {
        let x = Variable::local("x", Type::Float);
        let stmt = BoundStatement::compound_assign(&x, BinaryOp::Multiply, BoundExpression::float(2.0, s()), s());
        assert_eq!(lowered(vec![stmt]), vec!["x = x * 2", "return"]);
    }

    proptest! {
        #[test]
        fn folding_matches_direct_evaluation(a in -100i32..100, b in -100i32..100, c in -100i32..100) {
            let x = Variable::local("x", Type::Float);
            let raw = |l, op, r| BoundExpression::new(
                ExpressionKind::Binary { left: l, op, right: r },
                Type::Float,
                Span::dummy(),
                None,
            );
            let (fa, fb, fc) = (a as f32, b as f32, c as f32);
            let e = raw(
                raw(BoundExpression::float(fa, s()), BinaryOp::Multiply, BoundExpression::float(fb, s())),
                BinaryOp::Subtract,
                BoundExpression::float(fc, s()),
            );
            let out = lower(&main_fn(), &BoundStatement::block(vec![BoundStatement::assign(&x, e, s())], s())).unwrap();
            let StatementKind::Block(statements) = &out.kind else { panic!("expected block") };
            let StatementKind::Assignment { value, .. } = &statements[0].kind else { panic!("expected assignment") };
            prop_assert!(matches!(value.kind, ExpressionKind::Literal(_)));
            prop_assert_eq!(value.constant, Some(Value::Float(fa * fb - fc)));
        }
    }
}
