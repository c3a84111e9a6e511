//! Bound tree consumed by the core.
//!
//! The binder (outside this crate) produces one tree per function with
//! every name resolved and every literal-only subexpression folded into
//! `constant`. The constructors here compute types and constants the same
//! way, so later passes can synthesize nodes that look bound.
//!
//! Nodes are shared through `Rc`; a rewrite that changes nothing hands back
//! the very same `Rc`, which lets parents skip rebuilding.

use core::fmt;
use std::rc::Rc;

use crate::span::Span;
use crate::symbols::{Function, Label, Variable};
use crate::types::{ElementType, Type};
use crate::value::{Value, fold_binary, fold_unary};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Identity,
    Negate,
    LogicalNot,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Identity => "+",
            UnaryOp::Negate => "-",
            UnaryOp::LogicalNot => "!",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Equals,
    NotEquals,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    LogicalAnd,
    LogicalOr,
}

impl BinaryOp {
    pub fn is_short_circuit(self) -> bool {
        matches!(self, BinaryOp::LogicalAnd | BinaryOp::LogicalOr)
    }

    pub fn yields_bool(self) -> bool {
        matches!(
            self,
            BinaryOp::Equals
                | BinaryOp::NotEquals
                | BinaryOp::Less
                | BinaryOp::LessOrEqual
                | BinaryOp::Greater
                | BinaryOp::GreaterOrEqual
                | BinaryOp::LogicalAnd
                | BinaryOp::LogicalOr
        )
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulo => "%",
            BinaryOp::Equals => "==",
            BinaryOp::NotEquals => "!=",
            BinaryOp::Less => "<",
            BinaryOp::LessOrEqual => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterOrEqual => ">=",
            BinaryOp::LogicalAnd => "&&",
            BinaryOp::LogicalOr => "||",
        }
    }
}

/// Type of `left op right` for operands the binder accepted.
pub fn binary_result_type(left: Type, op: BinaryOp, right: Type) -> Type {
    if op.yields_bool() {
        return Type::Bool;
    }
    match (left, right) {
        (Type::Float, Type::Float) => Type::Float,
        (Type::Vector3, _) | (_, Type::Vector3) => Type::Vector3,
        (Type::Rotation, Type::Rotation) => Type::Rotation,
        _ => Type::Error,
    }
}

/// Sensor kinds an event block can listen to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Play,
    LateUpdate,
    BoxArt,
    Touch,
    Swipe,
    Button,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventParameterKind {
    /// Receives a sensor output each time the event fires.
    Out,
    /// Configures the sensor; must be known at compile time.
    Constant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventParameter {
    pub name: &'static str,
    pub ty: Type,
    pub kind: EventParameterKind,
}

const fn out_param(name: &'static str, ty: Type) -> EventParameter {
    EventParameter {
        name,
        ty,
        kind: EventParameterKind::Out,
    }
}

const fn const_param(name: &'static str, ty: Type) -> EventParameter {
    EventParameter {
        name,
        ty,
        kind: EventParameterKind::Constant,
    }
}

impl EventKind {
    pub fn parameters(self) -> &'static [EventParameter] {
        const TOUCH: &[EventParameter] = &[
            out_param("screenX", Type::Float),
            out_param("screenY", Type::Float),
            const_param("state", Type::Float),
            const_param("finger", Type::Float),
        ];
        const SWIPE: &[EventParameter] = &[out_param("direction", Type::Vector3)];
        const BUTTON: &[EventParameter] = &[const_param("type", Type::Float)];
        match self {
            EventKind::Play | EventKind::LateUpdate | EventKind::BoxArt => &[],
            EventKind::Touch => TOUCH,
            EventKind::Swipe => SWIPE,
            EventKind::Button => BUTTON,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            EventKind::Play => "Play",
            EventKind::LateUpdate => "LateUpdate",
            EventKind::BoxArt => "BoxArt",
            EventKind::Touch => "Touch",
            EventKind::Swipe => "Swipe",
            EventKind::Button => "Button",
        }
    }
}

/// Structural markers for the placer. They never affect values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EmitterHint {
    EnterStatementBlock,
    ExitStatementBlock,
    EnterHighlight,
    ExitHighlight,
}

#[derive(Debug, Clone)]
pub enum GotoKind {
    Unconditional,
    /// Jumps when `condition == jump_if_true`, falls through otherwise.
    Conditional {
        condition: Rc<BoundExpression>,
        jump_if_true: bool,
    },
    /// Jumps each time the event fires; falls through right away.
    Event {
        event: EventKind,
        arguments: Vec<Rc<BoundExpression>>,
    },
    /// Counts as a jump for reachability only; never wired.
    Rollback,
}

#[derive(Debug, Clone)]
pub enum StatementKind {
    Block(Vec<Rc<BoundStatement>>),
    VariableDeclaration {
        variable: Variable,
        initializer: Option<Rc<BoundExpression>>,
        name_span: Span,
    },
    Assignment {
        variable: Variable,
        value: Rc<BoundExpression>,
    },
    CompoundAssignment {
        variable: Variable,
        op: BinaryOp,
        value: Rc<BoundExpression>,
    },
    If {
        condition: Rc<BoundExpression>,
        then: Rc<BoundStatement>,
        otherwise: Option<Rc<BoundStatement>>,
    },
    While {
        condition: Rc<BoundExpression>,
        body: Rc<BoundStatement>,
    },
    DoWhile {
        body: Rc<BoundStatement>,
        condition: Rc<BoundExpression>,
    },
    Event {
        event: EventKind,
        arguments: Vec<Rc<BoundExpression>>,
        body: Rc<BoundStatement>,
    },
    Label(Label),
    Goto {
        label: Label,
        kind: GotoKind,
    },
    Return(Option<Rc<BoundExpression>>),
    /// A call run for its effects; its result, if kept, lands in `result`.
    Call {
        function: Function,
        arguments: Vec<Rc<BoundExpression>>,
        result: Option<Variable>,
    },
    Expression(Rc<BoundExpression>),
    EmitterHint(EmitterHint),
    Nop,
}

#[derive(Debug, Clone)]
pub struct BoundStatement {
    pub kind: StatementKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum ExpressionKind {
    Literal(Value),
    Variable(Variable),
    Unary {
        op: UnaryOp,
        operand: Rc<BoundExpression>,
    },
    Binary {
        left: Rc<BoundExpression>,
        op: BinaryOp,
        right: Rc<BoundExpression>,
    },
    /// `vec(x, y, z)` or `rot(x, y, z)`; the node type tells which.
    Constructor {
        x: Rc<BoundExpression>,
        y: Rc<BoundExpression>,
        z: Rc<BoundExpression>,
    },
    Call {
        function: Function,
        arguments: Vec<Rc<BoundExpression>>,
    },
    Conversion {
        operand: Rc<BoundExpression>,
    },
    Increment {
        variable: Variable,
        prefix: bool,
        decrement: bool,
    },
    ArraySegment(Vec<Rc<BoundExpression>>),
    Assignment {
        variable: Variable,
        value: Rc<BoundExpression>,
    },
    CompoundAssignment {
        variable: Variable,
        op: BinaryOp,
        value: Rc<BoundExpression>,
    },
    Error,
    /// Runs a statement and yields nothing.
    Statement(Rc<BoundStatement>),
}

#[derive(Debug, Clone)]
pub struct BoundExpression {
    pub kind: ExpressionKind,
    pub ty: Type,
    pub span: Span,
    pub constant: Option<Value>,
}

impl BoundExpression {
    pub fn new(kind: ExpressionKind, ty: Type, span: Span, constant: Option<Value>) -> Rc<Self> {
        Rc::new(BoundExpression {
            kind,
            ty,
            span,
            constant,
        })
    }

    pub fn literal(value: Value, span: Span) -> Rc<Self> {
        BoundExpression::new(ExpressionKind::Literal(value), value.ty(), span, Some(value))
    }

    pub fn float(value: f32, span: Span) -> Rc<Self> {
        BoundExpression::literal(Value::Float(value), span)
    }

    pub fn bool(value: bool, span: Span) -> Rc<Self> {
        BoundExpression::literal(Value::Bool(value), span)
    }

    pub fn variable(variable: &Variable, span: Span) -> Rc<Self> {
        BoundExpression::new(
            ExpressionKind::Variable(variable.clone()),
            variable.ty,
            span,
            None,
        )
    }

    pub fn unary(op: UnaryOp, operand: Rc<BoundExpression>, span: Span) -> Rc<Self> {
        let ty = match op {
            UnaryOp::LogicalNot => Type::Bool,
            _ => operand.ty,
        };
        let constant = operand.constant.and_then(|v| fold_unary(op, v));
        BoundExpression::new(ExpressionKind::Unary { op, operand }, ty, span, constant)
    }

    pub fn binary(
        left: Rc<BoundExpression>,
        op: BinaryOp,
        right: Rc<BoundExpression>,
        span: Span,
    ) -> Rc<Self> {
        let ty = binary_result_type(left.ty, op, right.ty);
        let constant = match (left.constant, right.constant) {
            (Some(l), Some(r)) => fold_binary(l, op, r),
            // `false && x` / `true || x` never evaluate `x`.
            (Some(l @ Value::Bool(b)), None) if op.is_short_circuit() => {
                let decided = (op == BinaryOp::LogicalAnd && !b) || (op == BinaryOp::LogicalOr && b);
                decided.then_some(l)
            }
            _ => None,
        };
        BoundExpression::new(ExpressionKind::Binary { left, op, right }, ty, span, constant)
    }

    /// `ty` must be [`Type::Vector3`] or [`Type::Rotation`].
    pub fn constructor(
        ty: Type,
        x: Rc<BoundExpression>,
        y: Rc<BoundExpression>,
        z: Rc<BoundExpression>,
        span: Span,
    ) -> Rc<Self> {
        let constant = match (
            x.constant.and_then(|v| v.as_float()),
            y.constant.and_then(|v| v.as_float()),
            z.constant.and_then(|v| v.as_float()),
        ) {
            (Some(x), Some(y), Some(z)) => {
                let v = crate::value::Vec3::new(x, y, z);
                match ty {
                    Type::Rotation => Some(Value::Rotation(v)),
                    _ => Some(Value::Vector3(v)),
                }
            }
            _ => None,
        };
        BoundExpression::new(ExpressionKind::Constructor { x, y, z }, ty, span, constant)
    }

    pub fn call(function: &Function, arguments: Vec<Rc<BoundExpression>>, span: Span) -> Rc<Self> {
        BoundExpression::new(
            ExpressionKind::Call {
                function: function.clone(),
                arguments,
            },
            function.return_type,
            span,
            None,
        )
    }

    pub fn conversion(operand: Rc<BoundExpression>, ty: Type, span: Span) -> Rc<Self> {
        let constant = match (operand.constant, ty) {
            (Some(Value::Vector3(v)), Type::Rotation) => Some(Value::Rotation(v)),
            (Some(Value::Rotation(v)), Type::Vector3) => Some(Value::Vector3(v)),
            (Some(v), ty) if v.ty() == ty => Some(v),
            _ => None,
        };
        BoundExpression::new(ExpressionKind::Conversion { operand }, ty, span, constant)
    }

    pub fn increment(variable: &Variable, prefix: bool, decrement: bool, span: Span) -> Rc<Self> {
        BoundExpression::new(
            ExpressionKind::Increment {
                variable: variable.clone(),
                prefix,
                decrement,
            },
            variable.ty,
            span,
            None,
        )
    }

    pub fn array_segment(
        element: ElementType,
        elements: Vec<Rc<BoundExpression>>,
        span: Span,
    ) -> Rc<Self> {
        BoundExpression::new(
            ExpressionKind::ArraySegment(elements),
            Type::ArraySegment(element),
            span,
            None,
        )
    }

    pub fn assignment(variable: &Variable, value: Rc<BoundExpression>, span: Span) -> Rc<Self> {
        BoundExpression::new(
            ExpressionKind::Assignment {
                variable: variable.clone(),
                value,
            },
            variable.ty,
            span,
            None,
        )
    }

    pub fn compound_assignment(
        variable: &Variable,
        op: BinaryOp,
        value: Rc<BoundExpression>,
        span: Span,
    ) -> Rc<Self> {
        BoundExpression::new(
            ExpressionKind::CompoundAssignment {
                variable: variable.clone(),
                op,
                value,
            },
            variable.ty,
            span,
            None,
        )
    }

    pub fn error(span: Span) -> Rc<Self> {
        BoundExpression::new(ExpressionKind::Error, Type::Error, span, None)
    }

    pub fn statement(statement: Rc<BoundStatement>) -> Rc<Self> {
        let span = statement.span;
        BoundExpression::new(ExpressionKind::Statement(statement), Type::Void, span, None)
    }

    pub fn is_constant(&self) -> bool {
        self.constant.is_some()
    }

    pub fn as_variable(&self) -> Option<&Variable> {
        match &self.kind {
            ExpressionKind::Variable(v) => Some(v),
            _ => None,
        }
    }
}

impl BoundStatement {
    pub fn new(kind: StatementKind, span: Span) -> Rc<Self> {
        Rc::new(BoundStatement { kind, span })
    }

    pub fn block(statements: Vec<Rc<BoundStatement>>, span: Span) -> Rc<Self> {
        BoundStatement::new(StatementKind::Block(statements), span)
    }

    pub fn declare(
        variable: &Variable,
        initializer: Option<Rc<BoundExpression>>,
        name_span: Span,
        span: Span,
    ) -> Rc<Self> {
        BoundStatement::new(
            StatementKind::VariableDeclaration {
                variable: variable.clone(),
                initializer,
                name_span,
            },
            span,
        )
    }

    pub fn assign(variable: &Variable, value: Rc<BoundExpression>, span: Span) -> Rc<Self> {
        BoundStatement::new(
            StatementKind::Assignment {
                variable: variable.clone(),
                value,
            },
            span,
        )
    }

    pub fn compound_assign(
        variable: &Variable,
        op: BinaryOp,
        value: Rc<BoundExpression>,
        span: Span,
    ) -> Rc<Self> {
        BoundStatement::new(
            StatementKind::CompoundAssignment {
                variable: variable.clone(),
                op,
                value,
            },
            span,
        )
    }

    pub fn if_(
        condition: Rc<BoundExpression>,
        then: Rc<BoundStatement>,
        otherwise: Option<Rc<BoundStatement>>,
        span: Span,
    ) -> Rc<Self> {
        BoundStatement::new(
            StatementKind::If {
                condition,
                then,
                otherwise,
            },
            span,
        )
    }

    pub fn while_(condition: Rc<BoundExpression>, body: Rc<BoundStatement>, span: Span) -> Rc<Self> {
        BoundStatement::new(StatementKind::While { condition, body }, span)
    }

    pub fn do_while(body: Rc<BoundStatement>, condition: Rc<BoundExpression>, span: Span) -> Rc<Self> {
        BoundStatement::new(StatementKind::DoWhile { body, condition }, span)
    }

    pub fn event(
        event: EventKind,
        arguments: Vec<Rc<BoundExpression>>,
        body: Rc<BoundStatement>,
        span: Span,
    ) -> Rc<Self> {
        BoundStatement::new(
            StatementKind::Event {
                event,
                arguments,
                body,
            },
            span,
        )
    }

    pub fn label(label: &Label, span: Span) -> Rc<Self> {
        BoundStatement::new(StatementKind::Label(label.clone()), span)
    }

    pub fn goto(label: &Label, span: Span) -> Rc<Self> {
        BoundStatement::new(
            StatementKind::Goto {
                label: label.clone(),
                kind: GotoKind::Unconditional,
            },
            span,
        )
    }

    pub fn goto_if(
        condition: Rc<BoundExpression>,
        label: &Label,
        jump_if_true: bool,
        span: Span,
    ) -> Rc<Self> {
        BoundStatement::new(
            StatementKind::Goto {
                label: label.clone(),
                kind: GotoKind::Conditional {
                    condition,
                    jump_if_true,
                },
            },
            span,
        )
    }

    pub fn event_goto(
        label: &Label,
        event: EventKind,
        arguments: Vec<Rc<BoundExpression>>,
        span: Span,
    ) -> Rc<Self> {
        BoundStatement::new(
            StatementKind::Goto {
                label: label.clone(),
                kind: GotoKind::Event { event, arguments },
            },
            span,
        )
    }

    pub fn rollback_goto(label: &Label, span: Span) -> Rc<Self> {
        BoundStatement::new(
            StatementKind::Goto {
                label: label.clone(),
                kind: GotoKind::Rollback,
            },
            span,
        )
    }

    pub fn ret(value: Option<Rc<BoundExpression>>, span: Span) -> Rc<Self> {
        BoundStatement::new(StatementKind::Return(value), span)
    }

    pub fn call(
        function: &Function,
        arguments: Vec<Rc<BoundExpression>>,
        result: Option<Variable>,
        span: Span,
    ) -> Rc<Self> {
        BoundStatement::new(
            StatementKind::Call {
                function: function.clone(),
                arguments,
                result,
            },
            span,
        )
    }

    pub fn expression(expression: Rc<BoundExpression>) -> Rc<Self> {
        let span = expression.span;
        BoundStatement::new(StatementKind::Expression(expression), span)
    }

    pub fn hint(hint: EmitterHint, span: Span) -> Rc<Self> {
        BoundStatement::new(StatementKind::EmitterHint(hint), span)
    }

    pub fn nop(span: Span) -> Rc<Self> {
        BoundStatement::new(StatementKind::Nop, span)
    }

    /// Statements after which control never falls through to the next one.
    pub fn ends_flow(&self) -> bool {
        matches!(
            &self.kind,
            StatementKind::Return(_)
                | StatementKind::Goto {
                    kind: GotoKind::Unconditional | GotoKind::Rollback,
                    ..
                }
        )
    }

    pub fn is_label(&self) -> bool {
        matches!(self.kind, StatementKind::Label(_))
    }
}

impl fmt::Display for BoundExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn operand(f: &mut fmt::Formatter<'_>, e: &BoundExpression) -> fmt::Result {
            if matches!(e.kind, ExpressionKind::Binary { .. }) {
                write!(f, "({e})")
            } else {
                write!(f, "{e}")
            }
        }

        fn list(f: &mut fmt::Formatter<'_>, items: &[Rc<BoundExpression>]) -> fmt::Result {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{item}")?;
            }
            Ok(())
        }

        match &self.kind {
            ExpressionKind::Literal(v) => write!(f, "{v}"),
            ExpressionKind::Variable(v) => write!(f, "{v}"),
            ExpressionKind::Unary { op, operand: o } => {
                f.write_str(op.symbol())?;
                operand(f, o)
            }
            ExpressionKind::Binary { left, op, right } => {
                operand(f, left)?;
                write!(f, " {} ", op.symbol())?;
                operand(f, right)
            }
            ExpressionKind::Constructor { x, y, z } => {
                let name = if self.ty == Type::Rotation { "rot" } else { "vec" };
                write!(f, "{name}({x}, {y}, {z})")
            }
            ExpressionKind::Call {
                function,
                arguments,
            } => {
                write!(f, "{}(", function.name)?;
                list(f, arguments)?;
                f.write_str(")")
            }
            ExpressionKind::Conversion { operand } => write!(f, "({}){operand}", self.ty),
            ExpressionKind::Increment {
                variable,
                prefix,
                decrement,
            } => {
                let op = if *decrement { "--" } else { "++" };
                if *prefix {
                    write!(f, "{op}{variable}")
                } else {
                    write!(f, "{variable}{op}")
                }
            }
            ExpressionKind::ArraySegment(items) => {
                f.write_str("[")?;
                list(f, items)?;
                f.write_str("]")
            }
            ExpressionKind::Assignment { variable, value } => write!(f, "({variable} = {value})"),
            ExpressionKind::CompoundAssignment {
                variable,
                op,
                value,
            } => write!(f, "({variable} {}= {value})", op.symbol()),
            ExpressionKind::Error => f.write_str("<error>"),
            ExpressionKind::Statement(s) => write!(f, "{{ {s} }}"),
        }
    }
}

impl fmt::Display for BoundStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            StatementKind::Block(statements) => {
                f.write_str("{ ")?;
                for s in statements {
                    write!(f, "{s}; ")?;
                }
                f.write_str("}")
            }
            StatementKind::VariableDeclaration {
                variable,
                initializer,
                ..
            } => match initializer {
                Some(init) => write!(f, "{} {variable} = {init}", variable.ty),
                None => write!(f, "{} {variable}", variable.ty),
            },
            StatementKind::Assignment { variable, value } => write!(f, "{variable} = {value}"),
            StatementKind::CompoundAssignment {
                variable,
                op,
                value,
            } => write!(f, "{variable} {}= {value}", op.symbol()),
            StatementKind::If {
                condition,
                then,
                otherwise,
            } => {
                write!(f, "if ({condition}) {then}")?;
                if let Some(e) = otherwise {
                    write!(f, " else {e}")?;
                }
                Ok(())
            }
            StatementKind::While { condition, body } => write!(f, "while ({condition}) {body}"),
            StatementKind::DoWhile { body, condition } => {
                write!(f, "do {body} while ({condition})")
            }
            StatementKind::Event { event, body, .. } => write!(f, "on {} {body}", event.name()),
            StatementKind::Label(label) => write!(f, "{label}:"),
            StatementKind::Goto { label, kind } => match kind {
                GotoKind::Unconditional => write!(f, "goto {label}"),
                GotoKind::Conditional {
                    condition,
                    jump_if_true: true,
                } => write!(f, "goto {label} if {condition}"),
                GotoKind::Conditional {
                    condition,
                    jump_if_true: false,
                } => write!(f, "goto {label} unless {condition}"),
                GotoKind::Event { event, .. } => write!(f, "goto {label} on {}", event.name()),
                GotoKind::Rollback => write!(f, "rollback {label}"),
            },
            StatementKind::Return(None) => f.write_str("return"),
            StatementKind::Return(Some(v)) => write!(f, "return {v}"),
            StatementKind::Call {
                function,
                arguments,
                result,
            } => {
                if let Some(r) = result {
                    write!(f, "{r} = ")?;
                }
                write!(f, "call {}(", function.name)?;
                for (i, a) in arguments.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{a}")?;
                }
                f.write_str(")")
            }
            StatementKind::Expression(e) => write!(f, "{e}"),
            StatementKind::EmitterHint(hint) => match hint {
                EmitterHint::EnterStatementBlock => f.write_str("<enter block>"),
                EmitterHint::ExitStatementBlock => f.write_str("<exit block>"),
                EmitterHint::EnterHighlight => f.write_str("<enter highlight>"),
                EmitterHint::ExitHighlight => f.write_str("<exit highlight>"),
            },
            StatementKind::Nop => f.write_str("nop"),
        }
    }
}

/// One line per statement; handy when asserting the shape of flat code.
pub fn render(statements: &[Rc<BoundStatement>]) -> Vec<String> {
    statements.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binder_constructors_fold_literal_trees() {
        let s = Span::dummy();
        let e = BoundExpression::binary(
            BoundExpression::binary(BoundExpression::float(2.0, s), BinaryOp::Multiply, BoundExpression::float(3.0, s), s),
            BinaryOp::Add,
            BoundExpression::float(1.0, s),
            s,
        );
        assert_eq!(e.constant, Some(Value::Float(7.0)));
        assert_eq!(e.ty, Type::Float);
        assert_eq!(e.to_string(), "(2 * 3) + 1");
    }

    #[test]
    fn short_circuit_folds_on_left_operand_alone() {
        let s = Span::dummy();
        let x = Variable::local("x", Type::Bool);
        let e = BoundExpression::binary(
            BoundExpression::bool(false, s),
            BinaryOp::LogicalAnd,
            BoundExpression::variable(&x, s),
            s,
        );
        assert_eq!(e.constant, Some(Value::Bool(false)));
        let e = BoundExpression::binary(
            BoundExpression::bool(false, s),
            BinaryOp::LogicalOr,
            BoundExpression::variable(&x, s),
            s,
        );
        assert_eq!(e.constant, None);
    }

    #[test]
    fn renders_gotos() {
        let s = Span::dummy();
        let i = Variable::local("i", Type::Float);
        let cond = BoundExpression::binary(BoundExpression::variable(&i, s), BinaryOp::Less, BoundExpression::float(10.0, s), s);
        let stmt = BoundStatement::goto_if(cond, &Label::new("main.break1"), false, s);
        assert_eq!(stmt.to_string(), "goto main.break1 unless i < 10");
        assert!(!stmt.ends_flow());
        assert!(BoundStatement::rollback_goto(&Label::new("x"), s).ends_flow());
    }
}
