//! Expression emission: data blocks and the wires between them.

use std::rc::Rc;

use super::{BreakCache, EmitResult, Emitter, storage_name};
use crate::blocks;
use crate::bound::{BinaryOp, BoundExpression, ExpressionKind, UnaryOp};
use crate::builtins::{BuiltinCall, BuiltinEmit};
use crate::config::Capabilities;
use crate::diagnostic::Diagnostic;
use crate::error::CoreError;
use crate::graph::{Block, BlockDef, BlockValue, TerminalRef};
use crate::span::Span;
use crate::symbols::{Function, Modifiers, Variable};
use crate::types::Type;
use crate::value::{Axis, Value};

type Components = [Option<TerminalRef>; 3];

/// Emits `expression` and returns the terminal carrying its value.
/// `None` means the value is the default of its type (an unconnected
/// input), which is how the null object travels.
pub fn emit_expression(e: &mut Emitter<'_>, expression: &BoundExpression) -> EmitResult<Option<TerminalRef>> {
    if let Some(value) = expression.constant {
        return emit_constant(e, value);
    }
    let span = expression.span;
    match &expression.kind {
        ExpressionKind::Literal(value) => emit_constant(e, *value),
        ExpressionKind::Variable(variable) => emit_variable(e, variable, span),
        ExpressionKind::Unary { op, operand } => emit_unary(e, *op, operand),
        ExpressionKind::Binary { left, op, right } => emit_binary(e, left, *op, right),
        ExpressionKind::Constructor { x, y, z } => {
            let components = [
                emit_expression(e, x)?,
                emit_expression(e, y)?,
                emit_expression(e, z)?,
            ];
            make(e, expression.ty, components)
        }
        ExpressionKind::Conversion { operand } => emit_conversion(e, operand, expression.ty),
        ExpressionKind::Call {
            function,
            arguments,
        } => emit_call(e, function, arguments, span),
        _ => Err(CoreError::internal(format!("expression '{expression}' cannot be emitted as data")).into()),
    }
}

pub(super) fn emit_constant(e: &mut Emitter<'_>, value: Value) -> EmitResult<Option<TerminalRef>> {
    let (def, slot): (&'static BlockDef, Option<BlockValue>) = match value {
        Value::Float(v) => (&blocks::NUMBER, Some(BlockValue::Float(v))),
        Value::Vector3(v) => (&blocks::VECTOR, Some(BlockValue::Vector(v))),
        Value::Rotation(v) => (&blocks::ROTATION, Some(BlockValue::Rotation(v))),
        Value::Bool(true) => (&blocks::TRUE, None),
        Value::Bool(false) => (&blocks::FALSE, None),
        Value::Null => return Ok(None),
    };
    let block = e.place(def);
    if let Some(slot) = slot {
        e.set_value(block, 0, slot);
    }
    Ok(Some(block.output_at(0)?))
}

fn number(e: &mut Emitter<'_>, value: f32) -> EmitResult<Option<TerminalRef>> {
    emit_constant(e, Value::Float(value))
}

fn emit_variable(e: &mut Emitter<'_>, variable: &Variable, span: Span) -> EmitResult<Option<TerminalRef>> {
    if let Some((base, axis)) = variable.property_of() {
        return break_variable_axis(e, base, axis, span);
    }
    if variable.is_inline() {
        let limit = e.options.inline_variable_reuse_limit;
        let Some(value) = e.inline_values.get_mut(variable) else {
            return Err(Diagnostic::error(
                format!("Inline variable '{}' is read before it is assigned", variable.name),
                span,
            )
            .into());
        };
        value.reads += 1;
        if value.reads > limit {
            return Err(Diagnostic::too_many_reuses(&variable.name, limit, span).into());
        }
        return Ok(value.terminal);
    }
    let def = variable
        .ty
        .wire_type()
        .and_then(blocks::variable)
        .ok_or_else(|| CoreError::internal(format!("no storage block for '{variable}' of type {}", variable.ty)))?;
    let block = e.place(def);
    e.set_value(block, 0, BlockValue::Text(storage_name(variable)));
    Ok(Some(block.output_at(0)?))
}

/// Places `def` and wires `inputs` to its inputs in order.
pub(super) fn operator(e: &mut Emitter<'_>, def: &'static BlockDef, inputs: &[Option<TerminalRef>]) -> EmitResult<Block> {
    let block = e.place(def);
    for (i, input) in inputs.iter().enumerate() {
        e.connect_opt(*input, block.input_at(i)?);
    }
    Ok(block)
}

fn apply(e: &mut Emitter<'_>, def: &'static BlockDef, inputs: &[Option<TerminalRef>]) -> EmitResult<Option<TerminalRef>> {
    let block = operator(e, def, inputs)?;
    Ok(Some(block.output_at(0)?))
}

fn not(e: &mut Emitter<'_>, input: Option<TerminalRef>) -> EmitResult<Option<TerminalRef>> {
    apply(e, &blocks::NOT, &[input])
}

fn make(e: &mut Emitter<'_>, ty: Type, components: Components) -> EmitResult<Option<TerminalRef>> {
    let def = match ty {
        Type::Rotation => &blocks::MAKE_ROTATION,
        _ => &blocks::MAKE_VECTOR,
    };
    apply(e, def, &components)
}

fn emit_unary(e: &mut Emitter<'_>, op: UnaryOp, operand: &BoundExpression) -> EmitResult<Option<TerminalRef>> {
    match (op, operand.ty) {
        (UnaryOp::Identity, _) => emit_expression(e, operand),
        (UnaryOp::LogicalNot, _) => {
            let value = emit_expression(e, operand)?;
            not(e, value)
        }
        (UnaryOp::Negate, Type::Float) => {
            let value = emit_expression(e, operand)?;
            apply(e, &blocks::NEGATE, &[value])
        }
        (UnaryOp::Negate, Type::Vector3) => {
            let value = emit_expression(e, operand)?;
            let factor = number(e, -1.0)?;
            apply(e, &blocks::SCALE_VECTOR, &[value, factor])
        }
        (UnaryOp::Negate, Type::Rotation) => {
            let components = break_expression(e, operand)?;
            let mut negated = [None; 3];
            for (slot, component) in negated.iter_mut().zip(components) {
                *slot = apply(e, &blocks::NEGATE, &[component])?;
            }
            make(e, Type::Rotation, negated)
        }
        (op, ty) => Err(CoreError::internal(format!("no block for unary '{}' on {ty}", op.symbol())).into()),
    }
}

fn emit_binary(
    e: &mut Emitter<'_>,
    left: &BoundExpression,
    op: BinaryOp,
    right: &BoundExpression,
) -> EmitResult<Option<TerminalRef>> {
    use BinaryOp::*;

    let unsupported = || -> EmitResult<Option<TerminalRef>> {
        Err(CoreError::internal(format!("no block for {} {} {}", left.ty, op.symbol(), right.ty)).into())
    };
    match (left.ty, right.ty) {
        (Type::Float, Type::Float) => match op {
            Add => pair(e, left, &blocks::ADD_NUMBERS, right),
            Subtract => pair(e, left, &blocks::SUBTRACT_NUMBERS, right),
            Multiply => pair(e, left, &blocks::MULTIPLY, right),
            Divide => pair(e, left, &blocks::DIVIDE, right),
            Modulo => pair(e, left, &blocks::MODULO, right),
            Equals => pair(e, left, &blocks::EQUAL_NUMBERS, right),
            NotEquals => negated(e, left, &blocks::EQUAL_NUMBERS, right),
            Less => pair(e, left, &blocks::LESS_THAN, right),
            Greater => pair(e, left, &blocks::GREATER_THAN, right),
            LessOrEqual => negated(e, left, &blocks::GREATER_THAN, right),
            GreaterOrEqual => negated(e, left, &blocks::LESS_THAN, right),
            LogicalAnd | LogicalOr => unsupported(),
        },
        (Type::Bool, Type::Bool) => match op {
            LogicalAnd => pair(e, left, &blocks::AND, right),
            LogicalOr => pair(e, left, &blocks::OR, right),
            Equals => pair(e, left, &blocks::EQUAL_TRUTHS, right),
            NotEquals => negated(e, left, &blocks::EQUAL_TRUTHS, right),
            _ => unsupported(),
        },
        (Type::Object, Type::Object) => match op {
            Equals => pair(e, left, &blocks::EQUAL_OBJECTS, right),
            NotEquals => negated(e, left, &blocks::EQUAL_OBJECTS, right),
            _ => unsupported(),
        },
        (Type::Vector3, Type::Vector3) => match op {
            Add => pair(e, left, &blocks::ADD_VECTORS, right),
            Subtract => pair(e, left, &blocks::SUBTRACT_VECTORS, right),
            Equals => pair(e, left, &blocks::EQUAL_VECTORS, right),
            NotEquals => negated(e, left, &blocks::EQUAL_VECTORS, right),
            Multiply => per_axis(e, left, &blocks::MULTIPLY, right, Type::Vector3),
            Divide => per_axis(e, left, &blocks::DIVIDE, right, Type::Vector3),
            Modulo => per_axis(e, left, &blocks::MODULO, right, Type::Vector3),
            _ => unsupported(),
        },
        (Type::Vector3, Type::Float) => match op {
            Multiply => pair(e, left, &blocks::SCALE_VECTOR, right),
            Divide => per_axis(e, left, &blocks::DIVIDE, right, Type::Vector3),
            Modulo => per_axis(e, left, &blocks::MODULO, right, Type::Vector3),
            _ => unsupported(),
        },
        (Type::Float, Type::Vector3) => match op {
            Multiply => {
                let scalar = emit_expression(e, left)?;
                let vector = emit_expression(e, right)?;
                apply(e, &blocks::SCALE_VECTOR, &[vector, scalar])
            }
            _ => unsupported(),
        },
        (Type::Vector3, Type::Rotation) => match op {
            Multiply => pair(e, left, &blocks::ROTATE_VECTOR, right),
            _ => unsupported(),
        },
        (Type::Rotation, Type::Rotation) => match op {
            Multiply => pair(e, left, &blocks::COMBINE_ROTATIONS, right),
            Add => per_axis(e, left, &blocks::ADD_NUMBERS, right, Type::Rotation),
            Subtract => per_axis(e, left, &blocks::SUBTRACT_NUMBERS, right, Type::Rotation),
            Equals => rotations_equal(e, left, right),
            NotEquals => {
                let value = rotations_equal(e, left, right)?;
                not(e, value)
            }
            _ => unsupported(),
        },
        _ => unsupported(),
    }
}

fn pair(
    e: &mut Emitter<'_>,
    left: &BoundExpression,
    def: &'static BlockDef,
    right: &BoundExpression,
) -> EmitResult<Option<TerminalRef>> {
    let l = emit_expression(e, left)?;
    let r = emit_expression(e, right)?;
    apply(e, def, &[l, r])
}

fn negated(
    e: &mut Emitter<'_>,
    left: &BoundExpression,
    def: &'static BlockDef,
    right: &BoundExpression,
) -> EmitResult<Option<TerminalRef>> {
    let value = pair(e, left, def, right)?;
    not(e, value)
}

/// Components of an operand; a float operand stands for all three.
fn operand_components(e: &mut Emitter<'_>, operand: &BoundExpression) -> EmitResult<Components> {
    if operand.ty.is_vector_like() {
        break_expression(e, operand)
    } else {
        let value = emit_expression(e, operand)?;
        Ok([value; 3])
    }
}

fn per_axis(
    e: &mut Emitter<'_>,
    left: &BoundExpression,
    def: &'static BlockDef,
    right: &BoundExpression,
    ty: Type,
) -> EmitResult<Option<TerminalRef>> {
    let l = operand_components(e, left)?;
    let r = operand_components(e, right)?;
    let mut result = [None; 3];
    for axis in Axis::ALL {
        let i = axis.index();
        result[i] = apply(e, def, &[l[i], r[i]])?;
    }
    make(e, ty, result)
}

fn rotations_equal(e: &mut Emitter<'_>, left: &BoundExpression, right: &BoundExpression) -> EmitResult<Option<TerminalRef>> {
    let l = break_expression(e, left)?;
    let r = break_expression(e, right)?;
    let mut all: Option<Option<TerminalRef>> = None;
    for axis in Axis::ALL {
        let i = axis.index();
        let equal = apply(e, &blocks::EQUAL_NUMBERS, &[l[i], r[i]])?;
        all = Some(match all {
            None => equal,
            Some(previous) => apply(e, &blocks::AND, &[previous, equal])?,
        });
    }
    Ok(all.flatten())
}

fn emit_conversion(e: &mut Emitter<'_>, operand: &BoundExpression, ty: Type) -> EmitResult<Option<TerminalRef>> {
    if operand.ty == ty {
        return emit_expression(e, operand);
    }
    match (operand.ty, ty) {
        (Type::Vector3, Type::Rotation) | (Type::Rotation, Type::Vector3) => {
            let components = break_expression(e, operand)?;
            make(e, ty, components)
        }
        (from, to) => Err(CoreError::internal(format!("no conversion from {from} to {to}")).into()),
    }
}

fn emit_call(
    e: &mut Emitter<'_>,
    function: &Function,
    arguments: &[Rc<BoundExpression>],
    span: Span,
) -> EmitResult<Option<TerminalRef>> {
    let Some(descriptor) = function.builtin_descriptor() else {
        return Err(CoreError::internal(format!("call to '{}' left inside an expression", function.name)).into());
    };
    match descriptor.emit {
        BuiltinEmit::Block(def) if !descriptor.is_statement() => {
            let block = builtin_block(e, def, function, arguments)?;
            if function.return_type.is_void() {
                Ok(None)
            } else {
                Ok(Some(block.output_at(0)?))
            }
        }
        BuiltinEmit::Value(emit) => emit(
            e,
            &BuiltinCall {
                function,
                arguments,
                span,
            },
        ),
        _ => Err(CoreError::internal(format!("statement built-in '{}' used as a value", function.name)).into()),
    }
}

/// Places the passive block behind a built-in, wiring the arguments of
/// its non-`out` parameters.
pub(super) fn builtin_block(
    e: &mut Emitter<'_>,
    def: &'static BlockDef,
    function: &Function,
    arguments: &[Rc<BoundExpression>],
) -> EmitResult<Block> {
    let mut inputs = Vec::with_capacity(arguments.len());
    for (parameter, argument) in function.parameters.iter().zip(arguments) {
        if !parameter.modifiers.contains(Modifiers::OUT) {
            inputs.push(emit_expression(e, argument)?);
        }
    }
    operator(e, def, &inputs)
}

fn fresh_break(e: &mut Emitter<'_>, ty: Type, source: Option<TerminalRef>) -> EmitResult<[TerminalRef; 3]> {
    let def = match ty {
        Type::Rotation => &blocks::BREAK_ROTATION,
        _ => &blocks::BREAK_VECTOR,
    };
    let block = operator(e, def, &[source])?;
    Ok([block.output_at(0)?, block.output_at(1)?, block.output_at(2)?])
}

/// One component of a vector or rotation variable. Non-inline variables
/// share a break node per axis until the reuse limit is hit.
pub(super) fn break_variable_axis(
    e: &mut Emitter<'_>,
    variable: &Variable,
    axis: Axis,
    span: Span,
) -> EmitResult<Option<TerminalRef>> {
    if variable.is_inline() {
        let source = emit_variable(e, variable, span)?;
        return Ok(Some(fresh_break(e, variable.ty, source)?[axis.index()]));
    }
    let limit = e.options.break_vector_reuse_limit;
    if let Some(terminal) = e.break_cache.get_mut(variable).and_then(|c| c.take(axis, limit)) {
        return Ok(Some(terminal));
    }
    let source = emit_variable(e, variable, span)?;
    let outputs = fresh_break(e, variable.ty, source)?;
    let mut cache = BreakCache { outputs, uses: [0; 3] };
    let terminal = cache.take(axis, limit.max(1));
    e.break_cache.insert(variable.clone(), cache);
    Ok(terminal)
}

/// The three components of a vector or rotation expression, each from
/// the cheapest source available: a constant, a constructor argument, a
/// cached break node, and only then a fresh break node.
pub(super) fn break_expression(e: &mut Emitter<'_>, expression: &BoundExpression) -> EmitResult<Components> {
    if let Some(v) = expression.constant.and_then(|c| c.as_vec3()) {
        let mut components = [None; 3];
        for axis in Axis::ALL {
            components[axis.index()] = number(e, v.get(axis))?;
        }
        return Ok(components);
    }
    match &expression.kind {
        ExpressionKind::Constructor { x, y, z } => Ok([
            emit_expression(e, x)?,
            emit_expression(e, y)?,
            emit_expression(e, z)?,
        ]),
        ExpressionKind::Variable(variable) if !variable.is_inline() => {
            let mut components = [None; 3];
            for axis in Axis::ALL {
                components[axis.index()] = break_variable_axis(e, variable, axis, expression.span)?;
            }
            Ok(components)
        }
        _ => {
            let source = emit_expression(e, expression)?;
            let outputs = fresh_break(e, expression.ty, source)?;
            Ok(outputs.map(Some))
        }
    }
}

/// `get(array, index)`: pointer to one element.
pub fn emit_list_get(e: &mut Emitter<'_>, call: &BuiltinCall<'_>) -> EmitResult<Option<TerminalRef>> {
    let [array, index] = call.arguments else {
        return Err(CoreError::internal("'get' takes an array and an index").into());
    };
    let base = emit_expression(e, array)?;
    let index = emit_expression(e, index)?;
    Ok(Some(list_element(e, array.ty, base, index)?))
}

/// Places a list node selecting `index` elements past `base`.
pub(super) fn list_element(
    e: &mut Emitter<'_>,
    array: Type,
    base: Option<TerminalRef>,
    index: Option<TerminalRef>,
) -> EmitResult<TerminalRef> {
    let def = array
        .wire_type()
        .and_then(blocks::list_element)
        .ok_or_else(|| CoreError::internal(format!("no list block for {array}")))?;
    let block = operator(e, def, &[base, index])?;
    Ok(block.output("Element")?)
}

/// `getBlock(position)`: the block already placed at a fixed position.
pub fn emit_block_query(e: &mut Emitter<'_>, call: &BuiltinCall<'_>) -> EmitResult<Option<TerminalRef>> {
    if !e.options.capabilities.contains(Capabilities::BLOCK_QUERY) {
        return Err(Diagnostic::unsupported_capability("querying blocks at a fixed position", call.span).into());
    }
    let [position] = call.arguments else {
        return Err(CoreError::internal("'getBlock' takes one position").into());
    };
    let Some(Value::Vector3(at)) = position.constant else {
        return Err(Diagnostic::value_must_be_constant(position.span).into());
    };
    let block = e.place(&blocks::BLOCK_REFERENCE);
    e.set_value(block, 0, BlockValue::Vector(at));
    Ok(Some(block.output_at(0)?))
}
