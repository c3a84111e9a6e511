//! Hoisting of side effects out of expressions.
//!
//! The target graph evaluates data wires lazily and runs effects only
//! along execution wires, so every effect buried in an expression (user
//! calls, increments, assignments, short-circuit operators with effectful
//! right operands) has to become a statement of its own. Each expression
//! is split into the statements that must run before its value is read,
//! the value itself, and the statements that must run after.

use std::rc::Rc;

use log::debug;

use crate::bound::{BinaryOp, BoundExpression, BoundStatement, ExpressionKind, GotoKind, StatementKind};
use crate::builtins;
use crate::error::CoreError;
use crate::names::{LabelGenerator, NameGenerator};
use crate::span::Span;
use crate::symbols::{Function, Label, Variable};
use crate::types::Type;

type Statements = Vec<Rc<BoundStatement>>;

#[derive(Debug, Clone)]
pub struct Extracted {
    pub before: Statements,
    pub value: Rc<BoundExpression>,
    pub after: Statements,
}

impl Extracted {
    fn pure(value: Rc<BoundExpression>) -> Self {
        Extracted {
            before: Vec::new(),
            value,
            after: Vec::new(),
        }
    }

    pub fn has_effects(&self) -> bool {
        !self.before.is_empty() || !self.after.is_empty()
    }

    /// No effects were hoisted and `original` came back as is.
    pub fn is_unchanged(&self, original: &Rc<BoundExpression>) -> bool {
        !self.has_effects() && Rc::ptr_eq(&self.value, original)
    }
}

pub fn extract(function: &Function, body: &Rc<BoundStatement>) -> Result<Rc<BoundStatement>, CoreError> {
    let mut extractor = Extractor::new(function);
    let mut out = Vec::new();
    extractor.statement(body, &mut out)?;
    debug!(
        "extracted '{}': {} statements, {} temporaries",
        function.name,
        out.len(),
        extractor.temporaries.issued()
    );
    Ok(BoundStatement::block(out, body.span))
}

fn same_operands(extracted: &[Rc<BoundExpression>], original: &[Rc<BoundExpression>]) -> bool {
    extracted.len() == original.len() && extracted.iter().zip(original).all(|(a, b)| Rc::ptr_eq(a, b))
}

/// Values no later effect can change: constants and compiler temporaries,
/// which are written exactly once.
fn is_stable(value: &BoundExpression) -> bool {
    value.is_constant() || value.as_variable().is_some_and(Variable::is_temporary)
}

/// Calls the graph can only make from an execution context.
fn needs_statement(function: &Function) -> bool {
    match function.builtin_descriptor() {
        Some(descriptor) => descriptor.is_statement(),
        None => true,
    }
}

pub struct Extractor {
    temporaries: NameGenerator,
    labels: LabelGenerator,
}

impl Extractor {
    pub fn new(function: &Function) -> Self {
        Extractor {
            temporaries: NameGenerator::new("#tmp"),
            labels: LabelGenerator::new(function.name.as_str()),
        }
    }

    fn capture(&mut self, value: Rc<BoundExpression>, out: &mut Statements) -> Rc<BoundExpression> {
        let span = value.span;
        let temporary = self.temporaries.fresh(value.ty);
        out.push(BoundStatement::assign(&temporary, value, span));
        BoundExpression::variable(&temporary, span)
    }

    fn step(variable: &Variable, decrement: bool, span: Span) -> Rc<BoundStatement> {
        let op = if decrement { BinaryOp::Subtract } else { BinaryOp::Add };
        let current = BoundExpression::variable(variable, span);
        let value = BoundExpression::binary(current, op, BoundExpression::float(1.0, span), span);
        BoundStatement::assign(variable, value, span)
    }

    pub fn statement(&mut self, statement: &Rc<BoundStatement>, out: &mut Statements) -> Result<(), CoreError> {
        let span = statement.span;
        match &statement.kind {
            StatementKind::Block(statements) => {
                for s in statements {
                    self.statement(s, out)?;
                }
            }
            StatementKind::VariableDeclaration {
                variable,
                initializer: Some(initializer),
                name_span,
            } => match &initializer.kind {
                ExpressionKind::ArraySegment(_) | ExpressionKind::Call { .. } => {
                    out.push(BoundStatement::declare(variable, None, *name_span, span));
                    self.assignment(variable, initializer, None, span, out)?;
                }
                _ => {
                    let x = self.expression(initializer)?;
                    if x.is_unchanged(initializer) {
                        out.push(statement.clone());
                    } else {
                        out.extend(x.before);
                        out.push(BoundStatement::declare(variable, Some(x.value), *name_span, span));
                        out.extend(x.after);
                    }
                }
            },
            StatementKind::Assignment { variable, value } => {
                self.assignment(variable, value, Some(statement), span, out)?
            }
            StatementKind::Goto {
                label,
                kind: GotoKind::Conditional {
                    condition,
                    jump_if_true,
                },
            } => {
                let emitted = out.len();
                let settled = self.settled(condition, out)?;
                if out.len() == emitted && Rc::ptr_eq(&settled, condition) {
                    out.push(statement.clone());
                } else {
                    out.push(BoundStatement::goto_if(settled, label, *jump_if_true, span));
                }
            }
            StatementKind::Return(Some(value)) => {
                let emitted = out.len();
                let settled = self.settled(value, out)?;
                if out.len() == emitted && Rc::ptr_eq(&settled, value) {
                    out.push(statement.clone());
                } else {
                    out.push(BoundStatement::ret(Some(settled), span));
                }
            }
            StatementKind::Call {
                function,
                arguments,
                result,
            } => self.call(function, arguments, result.as_ref(), Some(statement), span, out)?,
            StatementKind::Expression(expression) => self.expression_statement(expression, out)?,
            StatementKind::If { .. }
            | StatementKind::While { .. }
            | StatementKind::DoWhile { .. }
            | StatementKind::Event { .. }
            | StatementKind::CompoundAssignment { .. } => {
                return Err(CoreError::internal(format!(
                    "statement '{statement}' reached extraction without being lowered"
                )));
            }
            StatementKind::VariableDeclaration { .. }
            | StatementKind::Label(_)
            | StatementKind::Goto { .. }
            | StatementKind::Return(None)
            | StatementKind::EmitterHint(_)
            | StatementKind::Nop => out.push(statement.clone()),
        }
        Ok(())
    }

    /// Extracts `value` for a statement that consumes it. When effects must
    /// run after the value is read, the value is read into a temporary
    /// first.
    fn settled(&mut self, value: &Rc<BoundExpression>, out: &mut Statements) -> Result<Rc<BoundExpression>, CoreError> {
        let x = self.expression(value)?;
        out.extend(x.before);
        if x.after.is_empty() {
            return Ok(x.value);
        }
        let value = if is_stable(&x.value) {
            x.value
        } else {
            self.capture(x.value, out)
        };
        out.extend(x.after);
        Ok(value)
    }

    fn assignment(
        &mut self,
        variable: &Variable,
        value: &Rc<BoundExpression>,
        original: Option<&Rc<BoundStatement>>,
        span: Span,
        out: &mut Statements,
    ) -> Result<(), CoreError> {
        match &value.kind {
            ExpressionKind::ArraySegment(items) => {
                let array = BoundExpression::variable(variable, span);
                self.list_stores(&array, 0.0, items, span, out)
            }
            ExpressionKind::Call {
                function,
                arguments,
            } if needs_statement(function) && !function.return_type.is_void() => {
                self.call(function, arguments, Some(variable), None, span, out)
            }
            _ => {
                let x = self.expression(value)?;
                match original {
                    Some(original) if x.is_unchanged(value) => out.push(original.clone()),
                    _ => {
                        out.extend(x.before);
                        out.push(BoundStatement::assign(variable, x.value, span));
                        out.extend(x.after);
                    }
                }
                Ok(())
            }
        }
    }

    fn expression_statement(&mut self, expression: &Rc<BoundExpression>, out: &mut Statements) -> Result<(), CoreError> {
        let span = expression.span;
        match &expression.kind {
            ExpressionKind::Call {
                function,
                arguments,
            } => self.call(function, arguments, None, None, span, out),
            ExpressionKind::Increment {
                variable,
                decrement,
                ..
            } => {
                out.push(Self::step(variable, *decrement, span));
                Ok(())
            }
            ExpressionKind::Assignment { variable, value } => self.assignment(variable, value, None, span, out),
            ExpressionKind::Statement(statement) => self.statement(statement, out),
            _ => {
                let x = self.expression(expression)?;
                out.extend(x.before);
                out.extend(x.after);
                Ok(())
            }
        }
    }

    fn call(
        &mut self,
        function: &Function,
        arguments: &[Rc<BoundExpression>],
        result: Option<&Variable>,
        original: Option<&Rc<BoundStatement>>,
        span: Span,
        out: &mut Statements,
    ) -> Result<(), CoreError> {
        if function.builtin_descriptor().is_some_and(|d| d.name == "setRange") {
            if let [array, start, values] = arguments {
                if let (Some(start), ExpressionKind::ArraySegment(items)) =
                    (start.constant.and_then(|v| v.as_float()), &values.kind)
                {
                    return self.list_stores(array, start, items, span, out);
                }
            }
        }
        let (before, values, after) = self.list(arguments)?;
        match original {
            Some(original) if before.is_empty() && after.is_empty() && same_operands(&values, arguments) => {
                out.push(original.clone());
            }
            _ => {
                out.extend(before);
                out.push(BoundStatement::call(function, values, result.cloned(), span));
                out.extend(after);
            }
        }
        Ok(())
    }

    /// One `set` per element, starting at index `start`.
    fn list_stores(
        &mut self,
        array: &Rc<BoundExpression>,
        start: f32,
        items: &[Rc<BoundExpression>],
        span: Span,
        out: &mut Statements,
    ) -> Result<(), CoreError> {
        let element = array
            .ty
            .element()
            .map(Type::from)
            .ok_or_else(|| CoreError::internal(format!("list store into non-array '{array}'")))?;
        let set = builtins::instantiate("set", &[array.ty, Type::Float, element])
            .ok_or_else(|| CoreError::internal(format!("no 'set' built-in for {}", array.ty)))?;
        let (before, values, after) = self.list(items)?;
        out.extend(before);
        for (i, value) in values.into_iter().enumerate() {
            let index = BoundExpression::float(start + i as f32, span);
            out.push(BoundStatement::call(&set, vec![array.clone(), index, value], None, span));
        }
        out.extend(after);
        Ok(())
    }

    /// Extracts operands evaluated left to right. Operands before the last
    /// one with a `before` effect are read into temporaries, unless stable.
    fn list(&mut self, items: &[Rc<BoundExpression>]) -> Result<(Statements, Vec<Rc<BoundExpression>>, Statements), CoreError> {
        let extracted = items
            .iter()
            .map(|item| self.expression(item))
            .collect::<Result<Vec<_>, _>>()?;
        let last = extracted.iter().rposition(|x| !x.before.is_empty());

        let mut before = Vec::new();
        let mut values = Vec::with_capacity(extracted.len());
        let mut after = Vec::new();
        for (i, x) in extracted.into_iter().enumerate() {
            before.extend(x.before);
            if last.is_some_and(|last| i < last) {
                let value = if is_stable(&x.value) {
                    x.value
                } else {
                    self.capture(x.value, &mut before)
                };
                before.extend(x.after);
                values.push(value);
            } else {
                values.push(x.value);
                after.extend(x.after);
            }
        }
        Ok((before, values, after))
    }

    fn short_circuit(&mut self, left: Extracted, op: BinaryOp, right: Extracted, span: Span) -> Extracted {
        let result = self.temporaries.fresh(Type::Bool);
        let skip: Label = self.labels.fresh("skip");
        let read = BoundExpression::variable(&result, span);

        let mut before = left.before;
        before.push(BoundStatement::assign(&result, left.value, span));
        before.extend(left.after);
        // `a && b` skips `b` once `a` is false, `a || b` once it is true.
        before.push(BoundStatement::goto_if(read.clone(), &skip, op == BinaryOp::LogicalOr, span));
        before.extend(right.before);
        before.push(BoundStatement::assign(&result, right.value, span));
        before.extend(right.after);
        before.push(BoundStatement::label(&skip, span));
        Extracted {
            before,
            value: read,
            after: Vec::new(),
        }
    }

    pub fn expression(&mut self, expression: &Rc<BoundExpression>) -> Result<Extracted, CoreError> {
        let span = expression.span;
        match &expression.kind {
            ExpressionKind::Literal(_) | ExpressionKind::Variable(_) | ExpressionKind::Error => {
                Ok(Extracted::pure(expression.clone()))
            }
            ExpressionKind::Unary { op, operand } => {
                let x = self.expression(operand)?;
                let value = if Rc::ptr_eq(&x.value, operand) {
                    expression.clone()
                } else {
                    BoundExpression::unary(*op, x.value, span)
                };
                Ok(Extracted { value, ..x })
            }
            ExpressionKind::Conversion { operand } => {
                let x = self.expression(operand)?;
                let value = if Rc::ptr_eq(&x.value, operand) {
                    expression.clone()
                } else {
                    BoundExpression::conversion(x.value, expression.ty, span)
                };
                Ok(Extracted { value, ..x })
            }
            ExpressionKind::Binary { left, op, right } => {
                let lx = self.expression(left)?;
                let rx = self.expression(right)?;
                if op.is_short_circuit() && rx.has_effects() {
                    return Ok(self.short_circuit(lx, *op, rx, span));
                }

                let mut before = lx.before;
                let (l, after) = if rx.before.is_empty() {
                    let mut after = lx.after;
                    after.extend(rx.after);
                    (lx.value, after)
                } else {
                    let l = if is_stable(&lx.value) {
                        lx.value
                    } else {
                        self.capture(lx.value, &mut before)
                    };
                    before.extend(lx.after);
                    (l, rx.after)
                };
                before.extend(rx.before);

                let value = if Rc::ptr_eq(&l, left) && Rc::ptr_eq(&rx.value, right) {
                    expression.clone()
                } else {
                    BoundExpression::binary(l, *op, rx.value, span)
                };
                Ok(Extracted { before, value, after })
            }
            ExpressionKind::Constructor { x, y, z } => {
                let (before, values, after) = self.list(&[x.clone(), y.clone(), z.clone()])?;
                let value = match values.as_slice() {
                    [nx, ny, nz] if Rc::ptr_eq(nx, x) && Rc::ptr_eq(ny, y) && Rc::ptr_eq(nz, z) => expression.clone(),
                    [nx, ny, nz] => {
                        BoundExpression::constructor(expression.ty, nx.clone(), ny.clone(), nz.clone(), span)
                    }
                    _ => return Err(CoreError::internal("constructor lost a component")),
                };
                Ok(Extracted { before, value, after })
            }
            ExpressionKind::ArraySegment(items) => {
                let (before, values, after) = self.list(items)?;
                let element = expression
                    .ty
                    .element()
                    .ok_or_else(|| CoreError::internal("array segment without element type"))?;
                let value = if same_operands(&values, items) {
                    expression.clone()
                } else {
                    BoundExpression::array_segment(element, values, span)
                };
                Ok(Extracted { before, value, after })
            }
            ExpressionKind::Call {
                function,
                arguments,
            } => {
                let (mut before, values, after) = self.list(arguments)?;
                if !needs_statement(function) {
                    let value = if same_operands(&values, arguments) {
                        expression.clone()
                    } else {
                        BoundExpression::call(function, values, span)
                    };
                    return Ok(Extracted { before, value, after });
                }
                let (result, value) = if function.return_type.is_void() {
                    (None, BoundExpression::statement(BoundStatement::nop(span)))
                } else {
                    let temporary = self.temporaries.fresh(function.return_type);
                    let read = BoundExpression::variable(&temporary, span);
                    (Some(temporary), read)
                };
                before.push(BoundStatement::call(function, values, result, span));
                before.extend(after);
                Ok(Extracted {
                    before,
                    value,
                    after: Vec::new(),
                })
            }
            ExpressionKind::Increment {
                variable,
                prefix,
                decrement,
            } => {
                let step = Self::step(variable, *decrement, span);
                let value = BoundExpression::variable(variable, span);
                Ok(if *prefix {
                    Extracted {
                        before: vec![step],
                        value,
                        after: Vec::new(),
                    }
                } else {
                    Extracted {
                        before: Vec::new(),
                        value,
                        after: vec![step],
                    }
                })
            }
            ExpressionKind::Assignment { variable, value } => {
                let mut before = Vec::new();
                self.assignment(variable, value, None, span, &mut before)?;
                Ok(Extracted {
                    before,
                    value: BoundExpression::variable(variable, span),
                    after: Vec::new(),
                })
            }
            ExpressionKind::CompoundAssignment { .. } => Err(CoreError::internal(format!(
                "compound assignment '{expression}' reached extraction without being lowered"
            ))),
            ExpressionKind::Statement(statement) => {
                let mut before = Vec::new();
                self.statement(statement, &mut before)?;
                Ok(Extracted {
                    before,
                    value: BoundExpression::statement(BoundStatement::nop(span)),
                    after: Vec::new(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bound::render;
    use crate::symbols::Modifiers;
    use crate::types::ElementType;

    fn s() -> Span {
        Span::dummy()
    }

    fn main_fn() -> Function {
        Function::user("main", vec![], Type::Void, Modifiers::empty())
    }

    fn user(name: &str, parameters: Vec<Variable>, ty: Type) -> Function {
        Function::user(name, parameters, ty, Modifiers::empty())
    }

    fn extracted(statements: Vec<Rc<BoundStatement>>) -> Vec<String> {
        let out = extract(&main_fn(), &BoundStatement::block(statements, s())).unwrap();
        let StatementKind::Block(statements) = &out.kind else {
            panic!("extraction must produce a block");
        };
        render(statements)
    }

    #[test]
    fn calls_are_ordered_left_to_right() {
        let float = |name: &str| user(name, vec![], Type::Float);
        let unary = |name: &str| user(name, vec![Variable::parameter("p", Type::Float, Modifiers::empty())], Type::Float);
        let (a, b, f, g) = (float("a"), float("b"), unary("f"), unary("g"));
        let x = Variable::local("x", Type::Float);
        let call = |func: &Function, args| BoundExpression::call(func, args, s());
        let sum = BoundExpression::binary(
            call(&f, vec![call(&a, vec![])]),
            BinaryOp::Add,
            call(&g, vec![call(&b, vec![])]),
            s(),
        );
        assert_eq!(
            extracted(vec![BoundStatement::assign(&x, sum, s())]),
            vec![
                "#tmp0 = call a()",
                "#tmp1 = call f(#tmp0)",
                "#tmp2 = call b()",
                "#tmp3 = call g(#tmp2)",
                "x = #tmp1 + #tmp3",
            ]
        );
    }

    #[test]
    fn left_operand_is_captured_only_when_right_has_effects() {
        let i = Variable::local("i", Type::Float);
        let x = Variable::local("x", Type::Float);
        let f = user("f", vec![], Type::Float);

        let pure = BoundStatement::assign(
            &x,
            BoundExpression::binary(BoundExpression::variable(&i, s()), BinaryOp::Add, BoundExpression::float(1.0, s()), s()),
            s(),
        );
        let out = extract(&main_fn(), &BoundStatement::block(vec![pure.clone()], s())).unwrap();
        let StatementKind::Block(statements) = &out.kind else { panic!("expected block") };
        assert!(Rc::ptr_eq(&statements[0], &pure));

        let effectful = BoundStatement::assign(
            &x,
            BoundExpression::binary(BoundExpression::variable(&i, s()), BinaryOp::Add, BoundExpression::call(&f, vec![], s()), s()),
            s(),
        );
        assert_eq!(
            extracted(vec![effectful]),
            vec!["#tmp1 = i", "#tmp0 = call f()", "x = #tmp1 + #tmp0"]
        );
    }

    #[test]
    fn statements_without_effects_come_back_unchanged() {
        let i = Variable::local("i", Type::Float);
        let y = Variable::local("y", Type::Float);
        let read = || BoundExpression::variable(&i, s());
        let g = user("g", vec![Variable::parameter("p", Type::Float, Modifiers::empty())], Type::Void);
        let abs = builtins::BuiltinRegistry::global().resolve("abs", &[Type::Float], s()).unwrap();
        let done = Label::new("done");

        let statements = vec![
            BoundStatement::declare(&y, Some(BoundExpression::binary(read(), BinaryOp::Multiply, BoundExpression::float(2.0, s()), s())), s(), s()),
            BoundStatement::assign(&y, BoundExpression::call(&abs, vec![read()], s()), s()),
            BoundStatement::goto_if(BoundExpression::binary(read(), BinaryOp::Greater, BoundExpression::float(1.0, s()), s()), &done, false, s()),
            BoundStatement::call(&g, vec![read()], None, s()),
            BoundStatement::label(&done, s()),
            BoundStatement::ret(Some(read()), s()),
        ];
        let out = extract(&main_fn(), &BoundStatement::block(statements.clone(), s())).unwrap();
        let StatementKind::Block(extracted) = &out.kind else { panic!("expected block") };
        assert_eq!(extracted.len(), statements.len());
        for (after, before) in extracted.iter().zip(&statements) {
            assert!(Rc::ptr_eq(after, before), "'{before}' was rebuilt");
        }
    }

    #[test]
    fn constants_are_never_captured() {
        let x = Variable::local("x", Type::Float);
        let f = user("f", vec![], Type::Float);
        let e = BoundExpression::binary(BoundExpression::float(2.0, s()), BinaryOp::Multiply, BoundExpression::call(&f, vec![], s()), s());
        assert_eq!(
            extracted(vec![BoundStatement::assign(&x, e, s())]),
            vec!["#tmp0 = call f()", "x = 2 * #tmp0"]
        );
    }

    #[test]
    fn short_circuit_with_effects_branches() {
        let c = Variable::local("c", Type::Bool);
        let b = Variable::local("b", Type::Bool);
        let f = user("f", vec![], Type::Bool);
        let e = BoundExpression::binary(
            BoundExpression::variable(&c, s()),
            BinaryOp::LogicalAnd,
            BoundExpression::call(&f, vec![], s()),
            s(),
        );
        assert_eq!(
            extracted(vec![BoundStatement::assign(&b, e, s())]),
            vec![
                "#tmp1 = c",
                "goto main.skip1 unless #tmp1",
                "#tmp0 = call f()",
                "#tmp1 = #tmp0",
                "main.skip1:",
                "b = #tmp1",
            ]
        );
    }

    #[test]
    fn increments_run_before_or_after_the_read() {
        let i = Variable::local("i", Type::Float);
        let x = Variable::local("x", Type::Float);
        let pre = BoundStatement::assign(&x, BoundExpression::increment(&i, true, false, s()), s());
        let post = BoundStatement::assign(&x, BoundExpression::increment(&i, false, true, s()), s());
        assert_eq!(
            extracted(vec![pre, post]),
            vec!["i = i + 1", "x = i", "x = i", "i = i - 1"]
        );
    }

    #[test]
    fn post_increment_in_a_condition_is_read_first() {
        let i = Variable::local("i", Type::Float);
        let l = Label::new("L");
        let cond = BoundExpression::binary(
            BoundExpression::increment(&i, false, false, s()),
            BinaryOp::Less,
            BoundExpression::float(3.0, s()),
            s(),
        );
        assert_eq!(
            extracted(vec![BoundStatement::goto_if(cond, &l, true, s()), BoundStatement::label(&l, s())]),
            vec!["#tmp0 = i < 3", "i = i + 1", "goto L if #tmp0", "L:"]
        );
    }

    #[test]
    fn array_segments_become_element_stores() {
        let arr = Variable::local("arr", Type::Array(ElementType::Float));
        let segment = BoundExpression::array_segment(
            ElementType::Float,
            vec![BoundExpression::float(4.0, s()), BoundExpression::float(5.0, s()), BoundExpression::float(6.0, s())],
            s(),
        );
        assert_eq!(
            extracted(vec![BoundStatement::assign(&arr, segment, s())]),
            vec!["call set(arr, 0, 4)", "call set(arr, 1, 5)", "call set(arr, 2, 6)"]
        );
    }

    #[test]
    fn assignment_expressions_run_first() {
        let x = Variable::local("x", Type::Float);
        let y = Variable::local("y", Type::Float);
        let inner = BoundExpression::assignment(&x, BoundExpression::float(3.0, s()), s());
        let e = BoundExpression::binary(inner, BinaryOp::Add, BoundExpression::float(1.0, s()), s());
        assert_eq!(
            extracted(vec![BoundStatement::assign(&y, e, s())]),
            vec!["x = 3", "y = x + 1"]
        );
    }

    #[test]
    fn structured_statements_are_rejected() {
        let c = Variable::local("c", Type::Bool);
        let stmt = BoundStatement::while_(BoundExpression::variable(&c, s()), BoundStatement::nop(s()), s());
        assert!(extract(&main_fn(), &BoundStatement::block(vec![stmt], s())).is_err());
    }
}
