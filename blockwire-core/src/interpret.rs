//! Reference interpreter for flat goto-form code, used by differential
//! tests of the rewriting passes.
//!
//! Storage follows the emitted graph: every variable is one named cell
//! keyed by its storage name, parameters included, and a call writes its
//! arguments into the callee's parameter cells.

use std::collections::HashMap;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::bound::{BinaryOp, BoundExpression, BoundStatement, ExpressionKind, GotoKind, StatementKind};
use crate::emit::storage_name;
use crate::error::CoreError;
use crate::lower::flatten;
use crate::symbols::{Function, Modifiers, Variable};
use crate::types::Type;
use crate::value::{Value, fold_binary, fold_unary};

const STEP_LIMIT: usize = 100_000;

pub struct Interpreter<'p> {
    program: &'p IndexMap<Function, Rc<BoundStatement>>,
    memory: HashMap<String, Value>,
    steps: usize,
}

fn fault(message: impl Into<String>) -> CoreError {
    CoreError::internal(message)
}

impl<'p> Interpreter<'p> {
    pub fn new(program: &'p IndexMap<Function, Rc<BoundStatement>>) -> Self {
        Interpreter {
            program,
            memory: HashMap::new(),
            steps: 0,
        }
    }

    /// Value of the cell named `storage`, if anything was stored there.
    pub fn cell(&self, storage: &str) -> Option<Value> {
        self.memory.get(storage).copied()
    }

    pub fn load(&self, variable: &Variable) -> Value {
        if let Some((base, axis)) = variable.property_of() {
            let component = self.load(base).as_vec3().map(|v| v.get(axis)).unwrap_or(0.0);
            return Value::Float(component);
        }
        self.memory
            .get(&storage_name(variable))
            .copied()
            .or_else(|| Value::default_for(&variable.ty))
            .unwrap_or(Value::Null)
    }

    fn store(&mut self, variable: &Variable, value: Value) -> Result<(), CoreError> {
        if let Some((base, axis)) = variable.property_of() {
            let component = value.as_float().ok_or_else(|| fault(format!("{variable} takes a float")))?;
            let rebuilt = match self.load(base) {
                Value::Vector3(v) => Value::Vector3(v.with(axis, component)),
                Value::Rotation(v) => Value::Rotation(v.with(axis, component)),
                other => return Err(fault(format!("{base} holds {other}, not a vector"))),
            };
            return self.store(base, rebuilt);
        }
        self.memory.insert(storage_name(variable), value);
        Ok(())
    }

    /// Runs `function` to completion.
    pub fn run(&mut self, function: &Function) -> Result<(), CoreError> {
        let body = self
            .program
            .get(function)
            .ok_or_else(|| CoreError::MissingCallee(function.name.clone()))?;
        let mut statements = Vec::new();
        flatten(body, &mut statements);
        let labels: HashMap<String, usize> = statements
            .iter()
            .enumerate()
            .filter_map(|(i, s)| match &s.kind {
                StatementKind::Label(label) => Some((label.name().to_string(), i)),
                _ => None,
            })
            .collect();
        let target = |label: &crate::symbols::Label| {
            labels
                .get(label.name())
                .copied()
                .ok_or_else(|| fault(format!("no label {label} in {}", function.name)))
        };

        let mut pc = 0;
        while let Some(statement) = statements.get(pc) {
            self.steps += 1;
            if self.steps > STEP_LIMIT {
                return Err(fault("step limit exceeded"));
            }
            pc += 1;
            match &statement.kind {
                StatementKind::VariableDeclaration {
                    variable,
                    initializer: Some(value),
                    ..
                }
                | StatementKind::Assignment { variable, value } => {
                    let value = self.eval(value)?;
                    self.store(variable, value)?;
                }
                StatementKind::Expression(expression) => self.effect(expression)?,
                StatementKind::Call {
                    function,
                    arguments,
                    result,
                } => self.call(function, arguments, result.as_ref())?,
                StatementKind::Goto { label, kind } => match kind {
                    GotoKind::Unconditional => pc = target(label)?,
                    GotoKind::Conditional {
                        condition,
                        jump_if_true,
                    } => {
                        let value = self.eval(condition)?.as_bool();
                        if value == Some(*jump_if_true) {
                            pc = target(label)?;
                        }
                    }
                    GotoKind::Rollback => return Ok(()),
                    GotoKind::Event { .. } => return Err(fault("events cannot be interpreted")),
                },
                StatementKind::Return(value) => {
                    if let (Some(value), Some(slot)) = (value, &function.return_variable) {
                        let value = self.eval(value)?;
                        self.store(slot, value)?;
                    }
                    return Ok(());
                }
                StatementKind::VariableDeclaration { .. }
                | StatementKind::Label(_)
                | StatementKind::EmitterHint(_)
                | StatementKind::Nop => {}
                _ => return Err(fault(format!("'{statement}' is not in goto form"))),
            }
        }
        Ok(())
    }

    fn call(&mut self, function: &Function, arguments: &[Rc<BoundExpression>], result: Option<&Variable>) -> Result<(), CoreError> {
        if let Some(descriptor) = function.builtin_descriptor() {
            let fold = descriptor
                .constant
                .ok_or_else(|| fault(format!("built-in '{}' has no evaluator", descriptor.name)))?;
            let values = arguments.iter().map(|a| self.eval(a)).collect::<Result<Vec<_>, _>>()?;
            let value = fold(&values).ok_or_else(|| fault(format!("'{}' failed to evaluate", descriptor.name)))?;
            if let Some(result) = result {
                self.store(result, value)?;
            }
            return Ok(());
        }

        for (parameter, argument) in function.parameters.iter().zip(arguments) {
            if !parameter.modifiers.contains(Modifiers::OUT) {
                let value = self.eval(argument)?;
                self.store(parameter, value)?;
            }
        }
        self.run(function)?;
        for (parameter, argument) in function.parameters.iter().zip(arguments) {
            if parameter.modifiers.is_by_reference() {
                let target = argument.as_variable().ok_or_else(|| fault("by-reference argument is not a variable"))?;
                let value = self.load(parameter);
                self.store(target, value)?;
            }
        }
        if let (Some(result), Some(slot)) = (result, &function.return_variable) {
            let value = self.load(slot);
            self.store(result, value)?;
        }
        Ok(())
    }

    fn effect(&mut self, expression: &BoundExpression) -> Result<(), CoreError> {
        match &expression.kind {
            ExpressionKind::Increment {
                variable,
                decrement,
                ..
            } => {
                let op = if *decrement { BinaryOp::Subtract } else { BinaryOp::Add };
                let value = fold_binary(self.load(variable), op, Value::Float(1.0))
                    .ok_or_else(|| fault(format!("cannot step {variable}")))?;
                self.store(variable, value)
            }
            ExpressionKind::Assignment { variable, value } => {
                let value = self.eval(value)?;
                self.store(variable, value)
            }
            ExpressionKind::Call {
                function,
                arguments,
            } => self.call(function, arguments, None),
            _ => self.eval(expression).map(|_| ()),
        }
    }

    pub fn eval(&mut self, expression: &BoundExpression) -> Result<Value, CoreError> {
        if let Some(value) = expression.constant {
            return Ok(value);
        }
        let value = match &expression.kind {
            ExpressionKind::Literal(value) => Some(*value),
            ExpressionKind::Variable(variable) => Some(self.load(variable)),
            ExpressionKind::Unary { op, operand } => {
                let operand = self.eval(operand)?;
                fold_unary(*op, operand)
            }
            ExpressionKind::Binary { left, op, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                fold_binary(left, *op, right)
            }
            ExpressionKind::Constructor { x, y, z } => {
                let mut components = [0.0; 3];
                for (slot, e) in components.iter_mut().zip([x, y, z]) {
                    *slot = self.eval(e)?.as_float().unwrap_or(0.0);
                }
                let v = crate::value::Vec3::new(components[0], components[1], components[2]);
                Some(match expression.ty {
                    Type::Rotation => Value::Rotation(v),
                    _ => Value::Vector3(v),
                })
            }
            ExpressionKind::Conversion { operand } => match (self.eval(operand)?, expression.ty) {
                (Value::Vector3(v), Type::Rotation) => Some(Value::Rotation(v)),
                (Value::Rotation(v), Type::Vector3) => Some(Value::Vector3(v)),
                (v, _) => Some(v),
            },
            ExpressionKind::Call {
                function,
                arguments,
            } => {
                let fold = function.builtin_descriptor().and_then(|d| d.constant);
                match fold {
                    Some(fold) => {
                        let values = arguments.iter().map(|a| self.eval(a)).collect::<Result<Vec<_>, _>>()?;
                        fold(&values)
                    }
                    None => None,
                }
            }
            _ => None,
        };
        value.ok_or_else(|| fault(format!("cannot evaluate '{expression}'")))
    }
}
