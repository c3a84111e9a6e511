//! Statement emission.
//!
//! Every statement becomes an [`EmitStore`]: the execution terminals its
//! blocks expose. Jumps stay symbolic here and are wired by the
//! connector once the function is complete.

use std::rc::Rc;

use super::expr::{self, emit_expression};
use super::store::{Chain, EmitStore};
use super::{EmitResult, Emitter, InlineValue, ListCursor, storage_name};
use crate::blocks;
use crate::bound::{
    BinaryOp, BoundExpression, BoundStatement, EmitterHint, EventKind, EventParameterKind, ExpressionKind, GotoKind,
    StatementKind,
};
use crate::builtins::{BuiltinCall, BuiltinEmit};
use crate::diagnostic::Diagnostic;
use crate::error::CoreError;
use crate::graph::{BlockDef, BlockValue, TerminalRef};
use crate::span::Span;
use crate::symbols::{Function, Label, Modifiers, Variable};
use crate::types::Type;
use crate::value::{Axis, Value};

pub fn emit_statement(e: &mut Emitter<'_>, statement: &Rc<BoundStatement>) -> EmitResult<EmitStore> {
    if !is_list_store(statement) {
        e.list_cursor = None;
    }
    let span = statement.span;
    match &statement.kind {
        StatementKind::Block(statements) => {
            if let [only] = statements.as_slice() {
                if matches!(only.kind, StatementKind::Block(_)) {
                    return emit_statement(e, only);
                }
            }
            let mut stores = Vec::with_capacity(statements.len());
            for s in statements {
                stores.push(e.statement(s)?);
            }
            Ok(EmitStore::Multi(stores))
        }
        StatementKind::VariableDeclaration {
            variable,
            initializer,
            ..
        } => match initializer {
            Some(value) => assign(e, variable, value),
            None => Ok(EmitStore::Nop),
        },
        StatementKind::Assignment { variable, value } => assign(e, variable, value),
        StatementKind::Label(label) => Ok(EmitStore::Label(label.clone())),
        StatementKind::Goto { label, kind } => match kind {
            GotoKind::Unconditional => Ok(EmitStore::Goto(label.clone())),
            GotoKind::Rollback => Ok(EmitStore::Rollback),
            GotoKind::Conditional {
                condition,
                jump_if_true,
            } => conditional_goto(e, condition, label, *jump_if_true),
            GotoKind::Event { event, arguments } => event_goto(e, *event, arguments, label, span),
        },
        StatementKind::Return(None) => Ok(EmitStore::Return),
        StatementKind::Return(Some(value)) => {
            let slot = e.current_function()?.return_variable.clone().ok_or_else(|| {
                CoreError::internal(format!("'{}' returns a value but has no return slot", statement))
            })?;
            let store = assign(e, &slot, value)?;
            Ok(EmitStore::Multi(vec![store, EmitStore::Return]))
        }
        StatementKind::Call {
            function,
            arguments,
            result,
        } => call(e, function, arguments, result.as_ref(), span),
        StatementKind::Expression(expression) => expression_statement(e, expression),
        StatementKind::EmitterHint(hint) => {
            match hint {
                EmitterHint::EnterStatementBlock => e.placer.enter_statement_block(),
                EmitterHint::ExitStatementBlock => e.placer.exit_statement_block(),
                EmitterHint::EnterHighlight => e.highlight_depth += 1,
                EmitterHint::ExitHighlight => e.highlight_depth = e.highlight_depth.saturating_sub(1),
            }
            Ok(EmitStore::Nop)
        }
        StatementKind::Nop => Ok(EmitStore::Nop),
        StatementKind::If { .. }
        | StatementKind::While { .. }
        | StatementKind::DoWhile { .. }
        | StatementKind::Event { .. }
        | StatementKind::CompoundAssignment { .. } => {
            Err(CoreError::internal(format!("statement '{statement}' reached the emitter without being lowered")).into())
        }
    }
}

fn is_list_store(statement: &BoundStatement) -> bool {
    match &statement.kind {
        StatementKind::Call { function, .. } => function
            .builtin_descriptor()
            .is_some_and(|d| d.name == "set" || d.name == "setRange"),
        _ => false,
    }
}

/// Emits `value` inside an expression group.
fn value_of(e: &mut Emitter<'_>, value: &BoundExpression) -> EmitResult<Option<TerminalRef>> {
    e.placer.enter_expression_block();
    let terminal = emit_expression(e, value);
    e.placer.exit_expression_block();
    terminal
}

fn assign(e: &mut Emitter<'_>, variable: &Variable, value: &BoundExpression) -> EmitResult<EmitStore> {
    let terminal = value_of(e, value)?;
    assign_terminal(e, variable, terminal, value.span)
}

/// Stores the value on `terminal` into `variable`.
pub(super) fn assign_terminal(
    e: &mut Emitter<'_>,
    variable: &Variable,
    terminal: Option<TerminalRef>,
    span: Span,
) -> EmitResult<EmitStore> {
    if variable.is_inline() {
        e.inline_values.insert(variable.clone(), InlineValue { terminal, reads: 0 });
        return Ok(EmitStore::Nop);
    }
    if let Some((base, axis)) = variable.property_of() {
        let mut components = [None; 3];
        for other in Axis::ALL {
            components[other.index()] = if other == axis {
                terminal
            } else {
                expr::break_variable_axis(e, base, other, span)?
            };
        }
        let def = match base.ty {
            Type::Rotation => &blocks::MAKE_ROTATION,
            _ => &blocks::MAKE_VECTOR,
        };
        let rebuilt = expr::operator(e, def, &components)?;
        return assign_terminal(e, base, Some(rebuilt.output_at(0)?), span);
    }

    let def = variable
        .ty
        .wire_type()
        .and_then(blocks::set_variable)
        .ok_or_else(|| CoreError::internal(format!("no set block for '{variable}' of type {}", variable.ty)))?;
    let block = e.place(def);
    e.set_value(block, 0, BlockValue::Text(storage_name(variable)));
    e.connect_opt(terminal, block.input("Value")?);
    Ok(EmitStore::Basic {
        entry: block.before()?,
        exits: vec![block.after()?],
    })
}

fn conditional_goto(
    e: &mut Emitter<'_>,
    condition: &BoundExpression,
    label: &Label,
    jump_if_true: bool,
) -> EmitResult<EmitStore> {
    let value = value_of(e, condition)?;
    let block = e.place(&blocks::IF);
    e.connect_opt(value, block.input("Condition")?);
    let (jump, fall) = if jump_if_true { ("True", "False") } else { ("False", "True") };
    Ok(EmitStore::Branch {
        entry: block.before()?,
        fall_through: vec![block.output(fall)?],
        label: label.clone(),
        jumps: vec![block.output(jump)?],
    })
}

fn sensor(event: EventKind) -> (&'static BlockDef, &'static str) {
    match event {
        EventKind::Play => (&blocks::PLAY_SENSOR, "On Play"),
        EventKind::LateUpdate => (&blocks::LATE_UPDATE, "After Physics"),
        EventKind::BoxArt => (&blocks::BOX_ART_SENSOR, "On Screenshot"),
        EventKind::Touch => (&blocks::TOUCH_SENSOR, "Touched"),
        EventKind::Swipe => (&blocks::SWIPE_SENSOR, "Swiped"),
        EventKind::Button => (&blocks::BUTTON, "Button"),
    }
}

fn event_byte(value: f32, span: Span) -> Result<u8, Diagnostic> {
    if value.fract() != 0.0 || !(0.0..=f32::from(u8::MAX)).contains(&value) {
        return Err(Diagnostic::value_out_of_range(value, 0, u8::MAX, span));
    }
    Ok(value as u8)
}

/// Sensor whose firing output jumps to `label`, through the stores that
/// copy its outputs into `out` arguments. `After` falls through.
fn event_goto(
    e: &mut Emitter<'_>,
    event: EventKind,
    arguments: &[Rc<BoundExpression>],
    label: &Label,
    span: Span,
) -> EmitResult<EmitStore> {
    let parameters = event.parameters();
    if parameters.len() != arguments.len() {
        return Err(Diagnostic::wrong_argument_count(event.name(), parameters.len(), arguments.len(), span).into());
    }

    let mut settings = Vec::new();
    let mut outs = Vec::new();
    for (parameter, argument) in parameters.iter().zip(arguments) {
        match parameter.kind {
            EventParameterKind::Constant => {
                let value = argument
                    .constant
                    .and_then(|v| v.as_float())
                    .ok_or_else(|| Diagnostic::value_must_be_constant(argument.span))?;
                settings.push(BlockValue::Byte(event_byte(value, argument.span)?));
            }
            EventParameterKind::Out => {
                let variable = argument.as_variable().ok_or_else(|| {
                    CoreError::internal(format!("out argument '{argument}' of {} is not a variable", event.name()))
                })?;
                outs.push(variable.clone());
            }
        }
    }

    let (def, fire) = sensor(event);
    let block = e.place(def);
    for (slot, value) in settings.into_iter().enumerate() {
        e.set_value(block, slot, value);
    }
    // Sensor outputs after `After` and the firing output follow the
    // event's out parameters in order.
    let mut chain = Chain::new();
    for (i, variable) in outs.iter().enumerate() {
        let store = assign_terminal(e, variable, Some(block.output_at(2 + i)?), span)?;
        e.append(&mut chain, store)?;
    }
    let fired = block.output(fire)?;
    let jumps = match chain.entry() {
        Some(entry) => {
            e.connect(fired, entry);
            chain.exits().to_vec()
        }
        None => vec![fired],
    };
    Ok(EmitStore::Branch {
        entry: block.before()?,
        fall_through: vec![block.after()?],
        label: label.clone(),
        jumps,
    })
}

fn call(
    e: &mut Emitter<'_>,
    function: &Function,
    arguments: &[Rc<BoundExpression>],
    result: Option<&Variable>,
    span: Span,
) -> EmitResult<EmitStore> {
    let Some(descriptor) = function.builtin_descriptor() else {
        return call_user(e, function, arguments, result, span);
    };
    let invocation = BuiltinCall {
        function,
        arguments,
        span,
    };
    match descriptor.emit {
        BuiltinEmit::Block(def) => {
            let has_outs = function.parameters.iter().any(|p| p.modifiers.contains(Modifiers::OUT));
            let has_result = result.is_some() && !function.return_type.is_void();
            if !has_outs && !has_result {
                // Data blocks only run when something reads them.
                return Ok(EmitStore::Nop);
            }
            e.placer.enter_expression_block();
            let block = expr::builtin_block(e, def, function, arguments);
            e.placer.exit_expression_block();
            let block = block?;

            let mut chain = Chain::new();
            let mut output = 0;
            if !function.return_type.is_void() {
                if let Some(result) = result {
                    let store = assign_terminal(e, result, Some(block.output_at(0)?), span)?;
                    e.append(&mut chain, store)?;
                }
                output = 1;
            }
            for (parameter, argument) in function.parameters.iter().zip(arguments) {
                if parameter.modifiers.contains(Modifiers::OUT) {
                    let target = out_target(argument)?;
                    let store = assign_terminal(e, target, Some(block.output_at(output)?), span)?;
                    e.append(&mut chain, store)?;
                    output += 1;
                }
            }
            Ok(chain.into_store())
        }
        BuiltinEmit::Statement(def) => {
            let mut inputs = Vec::with_capacity(arguments.len());
            for argument in arguments {
                inputs.push(value_of(e, argument)?);
            }
            let block = e.place(def);
            for (i, input) in inputs.into_iter().enumerate() {
                e.connect_opt(input, block.input_at(i + 1)?);
            }
            Ok(EmitStore::Basic {
                entry: block.before()?,
                exits: vec![block.after()?],
            })
        }
        BuiltinEmit::Custom(emit) => emit(e, &invocation),
        BuiltinEmit::Value(emit) => {
            e.placer.enter_expression_block();
            let value = emit(e, &invocation);
            e.placer.exit_expression_block();
            let value = value?;
            match result {
                Some(result) => assign_terminal(e, result, value, span),
                None => Ok(EmitStore::Nop),
            }
        }
    }
}

fn out_target(argument: &BoundExpression) -> Result<&Variable, CoreError> {
    argument
        .as_variable()
        .ok_or_else(|| CoreError::internal(format!("by-reference argument '{argument}' is not a variable")))
}

/// Sets the parameters, enters the callee through an `If` gated by a
/// constant `True`, then copies back by-reference parameters and the
/// result. The gate's `True` output is wired to the callee once every
/// function has been emitted.
fn call_user(
    e: &mut Emitter<'_>,
    function: &Function,
    arguments: &[Rc<BoundExpression>],
    result: Option<&Variable>,
    span: Span,
) -> EmitResult<EmitStore> {
    if function.parameters.len() != arguments.len() {
        return Err(Diagnostic::wrong_argument_count(
            &function.name,
            function.parameters.len(),
            arguments.len(),
            span,
        )
        .into());
    }

    let mut chain = Chain::new();
    for (parameter, argument) in function.parameters.iter().zip(arguments) {
        if !parameter.modifiers.contains(Modifiers::OUT) {
            let store = assign(e, parameter, argument)?;
            e.append(&mut chain, store)?;
        }
    }

    let gate = e.place(&blocks::IF);
    let truth = e.place(&blocks::TRUE);
    e.connect(truth.output_at(0)?, gate.input("Condition")?);
    e.pending_calls
        .entry(function.clone())
        .or_default()
        .push(gate.output("True")?);
    let gate_store = EmitStore::Basic {
        entry: gate.before()?,
        exits: vec![gate.after()?],
    };
    e.append(&mut chain, gate_store)?;

    for (parameter, argument) in function.parameters.iter().zip(arguments) {
        if parameter.modifiers.is_by_reference() {
            let target = out_target(argument)?;
            let store = assign(e, target, &BoundExpression::variable(parameter, span))?;
            e.append(&mut chain, store)?;
        }
    }
    if let Some(result) = result {
        let slot = function
            .return_variable
            .as_ref()
            .ok_or_else(|| CoreError::internal(format!("result of void function '{}' is stored", function.name)))?;
        let store = assign(e, result, &BoundExpression::variable(slot, span))?;
        e.append(&mut chain, store)?;
    }
    Ok(chain.into_store())
}

fn expression_statement(e: &mut Emitter<'_>, expression: &Rc<BoundExpression>) -> EmitResult<EmitStore> {
    let span = expression.span;
    match &expression.kind {
        ExpressionKind::Call {
            function,
            arguments,
        } => call(e, function, arguments, None, span),
        ExpressionKind::Increment {
            variable,
            decrement,
            ..
        } => {
            let op = if *decrement { BinaryOp::Subtract } else { BinaryOp::Add };
            let stepped = BoundExpression::binary(
                BoundExpression::variable(variable, span),
                op,
                BoundExpression::float(1.0, span),
                span,
            );
            assign(e, variable, &stepped)
        }
        ExpressionKind::Assignment { variable, value } => assign(e, variable, value),
        ExpressionKind::Statement(statement) => emit_statement(e, statement),
        _ => Ok(EmitStore::Nop),
    }
}

/// `inspect(value)`: shows a value while the game runs.
pub fn emit_inspect(e: &mut Emitter<'_>, call: &BuiltinCall<'_>) -> EmitResult<EmitStore> {
    let [value] = call.arguments else {
        return Err(CoreError::internal("'inspect' takes one value").into());
    };
    let def = value
        .ty
        .wire_type()
        .and_then(blocks::inspect)
        .ok_or_else(|| Diagnostic::error(format!("Values of type {} cannot be inspected", value.ty), value.span))?;
    let terminal = value_of(e, value)?;
    let block = e.place(def);
    e.connect_opt(terminal, block.input_at(1)?);
    Ok(EmitStore::Basic {
        entry: block.before()?,
        exits: vec![block.after()?],
    })
}

/// `set(array, index, value)`.
pub fn emit_list_set(e: &mut Emitter<'_>, call: &BuiltinCall<'_>) -> EmitResult<EmitStore> {
    let [array, index, value] = call.arguments else {
        return Err(CoreError::internal("'set' takes an array, an index and a value").into());
    };
    list_store(e, array, index, value, call.span)
}

/// `setRange(array, start, [values])`: one element store per value.
pub fn emit_set_range(e: &mut Emitter<'_>, call: &BuiltinCall<'_>) -> EmitResult<EmitStore> {
    let [array, start, values] = call.arguments else {
        return Err(CoreError::internal("'setRange' takes an array, a start index and values").into());
    };
    let Some(start_index) = start.constant.and_then(|v| v.as_float()) else {
        return Err(Diagnostic::value_must_be_constant(start.span).into());
    };
    let ExpressionKind::ArraySegment(items) = &values.kind else {
        return Err(CoreError::internal(format!("'setRange' expects a literal list, got '{values}'")).into());
    };
    let mut chain = Chain::new();
    for (i, item) in items.iter().enumerate() {
        let index = BoundExpression::float(start_index + i as f32, start.span);
        let store = list_store(e, array, &index, item, call.span)?;
        e.append(&mut chain, store)?;
    }
    Ok(chain.into_store())
}

enum ListTarget {
    /// Element 0 of a plain array variable, written through its name.
    Variable(Variable),
    Pointer(TerminalRef),
}

fn list_target(e: &mut Emitter<'_>, array: &BoundExpression, index: &BoundExpression) -> EmitResult<ListTarget> {
    let constant_index = index.constant.and_then(|v| v.as_float());
    let variable = array
        .as_variable()
        .filter(|v| !v.is_inline() && v.property_of().is_none());

    if let (Some(i), Some(variable)) = (constant_index, variable) {
        let previous = e
            .list_cursor
            .as_ref()
            .filter(|c| c.array == *variable && c.index + 1.0 == i)
            .map(|c| c.element);
        if let Some(element) = previous {
            let base = match element {
                Some(element) => Some(element),
                None => emit_expression(e, array)?,
            };
            let step = expr::emit_constant(e, Value::Float(1.0))?;
            return Ok(ListTarget::Pointer(expr::list_element(e, array.ty, base, step)?));
        }
        if i == 0.0 {
            return Ok(ListTarget::Variable(variable.clone()));
        }
    }
    let base = emit_expression(e, array)?;
    let index = emit_expression(e, index)?;
    Ok(ListTarget::Pointer(expr::list_element(e, array.ty, base, index)?))
}

fn list_store(
    e: &mut Emitter<'_>,
    array: &BoundExpression,
    index: &BoundExpression,
    value: &BoundExpression,
    span: Span,
) -> EmitResult<EmitStore> {
    e.placer.enter_expression_block();
    let operands = list_target(e, array, index).and_then(|target| Ok((target, emit_expression(e, value)?)));
    e.placer.exit_expression_block();
    let (target, terminal) = operands?;

    let cursor_index = index.constant.and_then(|v| v.as_float());
    let cursor_array = array.as_variable().cloned();
    let (store, element) = match target {
        ListTarget::Variable(variable) => (assign_terminal(e, &variable, terminal, span)?, None),
        ListTarget::Pointer(element) => {
            let def = blocks::set_pointer(element.wire)
                .ok_or_else(|| CoreError::internal(format!("no pointer store for {:?}", element.wire)))?;
            let block = e.place(def);
            e.connect(element, block.input("Variable")?);
            e.connect_opt(terminal, block.input("Value")?);
            let store = EmitStore::Basic {
                entry: block.before()?,
                exits: vec![block.after()?],
            };
            (store, Some(element))
        }
    };
    e.list_cursor = match (cursor_array, cursor_index) {
        (Some(array), Some(index)) => Some(ListCursor { array, index, element }),
        _ => None,
    };
    Ok(store)
}
