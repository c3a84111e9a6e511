//! Compile-time constant values and operator folding.

use core::fmt;

use crate::bound::{BinaryOp, UnaryOp};
use crate::types::Type;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Vec3 { x, y, z }
    }

    pub fn splat(v: f32) -> Self {
        Vec3::new(v, v, v)
    }

    pub fn get(&self, axis: Axis) -> f32 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    pub fn with(mut self, axis: Axis, value: f32) -> Self {
        match axis {
            Axis::X => self.x = value,
            Axis::Y => self.y = value,
            Axis::Z => self.z = value,
        }
        self
    }

    fn zip(self, other: Vec3, f: impl Fn(f32, f32) -> f32) -> Vec3 {
        Vec3::new(f(self.x, other.x), f(self.y, other.y), f(self.z, other.z))
    }
}

/// One of the three components of a vector or rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        }
    }
}

/// A constant proven by the binder or the lowerer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Bool(bool),
    Float(f32),
    Vector3(Vec3),
    Rotation(Vec3),
    /// The null object; the graph represents it as an unconnected input.
    Null,
}

impl Value {
    pub fn ty(&self) -> Type {
        match self {
            Value::Bool(_) => Type::Bool,
            Value::Float(_) => Type::Float,
            Value::Vector3(_) => Type::Vector3,
            Value::Rotation(_) => Type::Rotation,
            Value::Null => Type::Object,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_vec3(&self) -> Option<Vec3> {
        match self {
            Value::Vector3(v) | Value::Rotation(v) => Some(*v),
            _ => None,
        }
    }

    /// Zero value a freshly declared variable of type `ty` holds.
    pub fn default_for(ty: &Type) -> Option<Value> {
        match ty {
            Type::Bool => Some(Value::Bool(false)),
            Type::Float => Some(Value::Float(0.0)),
            Type::Vector3 => Some(Value::Vector3(Vec3::default())),
            Type::Rotation => Some(Value::Rotation(Vec3::default())),
            Type::Object => Some(Value::Null),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Vector3(v) => write!(f, "vec({}, {}, {})", v.x, v.y, v.z),
            Value::Rotation(v) => write!(f, "rot({}, {}, {})", v.x, v.y, v.z),
            Value::Null => write!(f, "null"),
        }
    }
}

pub fn fold_unary(op: UnaryOp, operand: Value) -> Option<Value> {
    match (op, operand) {
        (UnaryOp::Identity, v) => Some(v),
        (UnaryOp::Negate, Value::Float(f)) => Some(Value::Float(-f)),
        (UnaryOp::Negate, Value::Vector3(v)) => Some(Value::Vector3(Vec3::new(-v.x, -v.y, -v.z))),
        (UnaryOp::Negate, Value::Rotation(v)) => {
            Some(Value::Rotation(Vec3::new(-v.x, -v.y, -v.z)))
        }
        (UnaryOp::LogicalNot, Value::Bool(b)) => Some(Value::Bool(!b)),
        _ => None,
    }
}

/// Folds `left op right`. Returns `None` when the combination has no
/// compile-time meaning (rotating by a rotation, object comparisons with
/// non-null values, ...).
pub fn fold_binary(left: Value, op: BinaryOp, right: Value) -> Option<Value> {
    use BinaryOp::*;

    match (left, right) {
        (Value::Float(l), Value::Float(r)) => match op {
            Add => Some(Value::Float(l + r)),
            Subtract => Some(Value::Float(l - r)),
            Multiply => Some(Value::Float(l * r)),
            Divide => Some(Value::Float(l / r)),
            Modulo => Some(Value::Float(l % r)),
            Equals => Some(Value::Bool(l == r)),
            NotEquals => Some(Value::Bool(l != r)),
            Less => Some(Value::Bool(l < r)),
            LessOrEqual => Some(Value::Bool(l <= r)),
            Greater => Some(Value::Bool(l > r)),
            GreaterOrEqual => Some(Value::Bool(l >= r)),
            LogicalAnd | LogicalOr => None,
        },
        (Value::Bool(l), Value::Bool(r)) => match op {
            LogicalAnd => Some(Value::Bool(l && r)),
            LogicalOr => Some(Value::Bool(l || r)),
            Equals => Some(Value::Bool(l == r)),
            NotEquals => Some(Value::Bool(l != r)),
            _ => None,
        },
        (Value::Vector3(l), Value::Vector3(r)) => match op {
            Add => Some(Value::Vector3(l.zip(r, |a, b| a + b))),
            Subtract => Some(Value::Vector3(l.zip(r, |a, b| a - b))),
            Multiply => Some(Value::Vector3(l.zip(r, |a, b| a * b))),
            Divide => Some(Value::Vector3(l.zip(r, |a, b| a / b))),
            Modulo => Some(Value::Vector3(l.zip(r, |a, b| a % b))),
            Equals => Some(Value::Bool(l == r)),
            NotEquals => Some(Value::Bool(l != r)),
            _ => None,
        },
        (Value::Vector3(l), Value::Float(r)) => match op {
            Multiply => Some(Value::Vector3(l.zip(Vec3::splat(r), |a, b| a * b))),
            Divide => Some(Value::Vector3(l.zip(Vec3::splat(r), |a, b| a / b))),
            Modulo => Some(Value::Vector3(l.zip(Vec3::splat(r), |a, b| a % b))),
            _ => None,
        },
        (Value::Float(l), Value::Vector3(r)) => match op {
            Multiply => Some(Value::Vector3(Vec3::splat(l).zip(r, |a, b| a * b))),
            _ => None,
        },
        (Value::Rotation(l), Value::Rotation(r)) => match op {
            Add => Some(Value::Rotation(l.zip(r, |a, b| a + b))),
            Subtract => Some(Value::Rotation(l.zip(r, |a, b| a - b))),
            Equals => Some(Value::Bool(l == r)),
            NotEquals => Some(Value::Bool(l != r)),
            _ => None,
        },
        (Value::Null, Value::Null) => match op {
            Equals => Some(Value::Bool(true)),
            NotEquals => Some(Value::Bool(false)),
            _ => None,
        },
        // Short-circuit operators only need the left side.
        (Value::Bool(false), _) if op == LogicalAnd => Some(Value::Bool(false)),
        (Value::Bool(true), _) if op == LogicalOr => Some(Value::Bool(true)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn folds_float_arithmetic_and_comparisons() {
        assert_eq!(
            fold_binary(Value::Float(2.0), BinaryOp::Multiply, Value::Float(3.0)),
            Some(Value::Float(6.0))
        );
        assert_eq!(
            fold_binary(Value::Float(2.0), BinaryOp::GreaterOrEqual, Value::Float(3.0)),
            Some(Value::Bool(false))
        );
    }

    #[test]
    fn scales_vectors_by_floats() {
        let v = Value::Vector3(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(
            fold_binary(v, BinaryOp::Multiply, Value::Float(2.0)),
            Some(Value::Vector3(Vec3::new(2.0, 4.0, 6.0)))
        );
        assert_eq!(fold_unary(UnaryOp::Negate, v), Some(Value::Vector3(Vec3::new(-1.0, -2.0, -3.0))));
    }

    #[test]
    fn refuses_meaningless_combinations() {
        let r = Value::Rotation(Vec3::new(0.0, 90.0, 0.0));
        assert_eq!(fold_binary(r, BinaryOp::Multiply, r), None);
        assert_eq!(fold_unary(UnaryOp::LogicalNot, Value::Float(1.0)), None);
    }

    proptest! {
        #[test]
        fn comparison_complements_agree(l in -1000i32..1000, r in -1000i32..1000) {
            let (l, r) = (Value::Float(l as f32), Value::Float(r as f32));
            let le = fold_binary(l, BinaryOp::LessOrEqual, r).and_then(|v| v.as_bool());
            let gt = fold_binary(l, BinaryOp::Greater, r).and_then(|v| v.as_bool());
            prop_assert_eq!(le, gt.map(|b| !b));
        }
    }
}
