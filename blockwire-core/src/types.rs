//! Type system of the scripting language and of the output graph.
//!
//! Source-level types ([`Type`]) are a fixed, closed set. Each one maps
//! onto a [`WireType`], the type of a terminal in the emitted graph.

use core::fmt;

/// Element type of arrays, and the set of types a variable can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    Bool,
    Float,
    Vector3,
    Rotation,
    Object,
    /// Placeholder used by built-ins that work over any element type.
    Generic,
}

/// Represents the types of values and expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    Void,
    Bool,
    Float,
    Vector3,
    Rotation,
    Object,
    /// Distinguished placeholder for built-ins parameterized over a type.
    Generic,
    Array(ElementType),
    /// Literal list `[a, b, c]`; only valid as the source of a list store.
    ArraySegment(ElementType),
    /// Type of an erroneous expression.
    Error,
}

impl Type {
    pub fn is_void(&self) -> bool {
        matches!(self, Type::Void)
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Type::Array(_))
    }

    /// True for the two types that decompose into three float components.
    pub fn is_vector_like(&self) -> bool {
        matches!(self, Type::Vector3 | Type::Rotation)
    }

    /// Element type of an array or array segment; scalars are their own
    /// element type.
    pub fn element(&self) -> Option<ElementType> {
        match self {
            Type::Array(e) | Type::ArraySegment(e) => Some(*e),
            Type::Bool => Some(ElementType::Bool),
            Type::Float => Some(ElementType::Float),
            Type::Vector3 => Some(ElementType::Vector3),
            Type::Rotation => Some(ElementType::Rotation),
            Type::Object => Some(ElementType::Object),
            Type::Generic => Some(ElementType::Generic),
            Type::Void | Type::Error => None,
        }
    }

    /// Wire type a value of this type travels on. Arrays travel as pointers
    /// to their first element.
    pub fn wire_type(&self) -> Option<WireType> {
        match self {
            Type::Void => Some(WireType::Void),
            Type::Bool => Some(WireType::Bool),
            Type::Float => Some(WireType::Float),
            Type::Vector3 => Some(WireType::Vec3),
            Type::Rotation => Some(WireType::Rot),
            Type::Object => Some(WireType::Obj),
            Type::Array(e) => Type::from(*e).wire_type().map(WireType::to_pointer),
            Type::Generic | Type::ArraySegment(_) | Type::Error => None,
        }
    }

    /// Returns true if a value of type `self` may be passed where `expected`
    /// is declared. `Generic` matches anything.
    pub fn accepts(expected: &Type, actual: &Type) -> bool {
        match (expected, actual) {
            (Type::Generic, _) => true,
            (Type::Array(ElementType::Generic), Type::Array(_)) => true,
            (Type::ArraySegment(ElementType::Generic), Type::ArraySegment(_)) => true,
            (Type::Array(a), Type::Array(b)) | (Type::ArraySegment(a), Type::ArraySegment(b)) => {
                a == b || *a == ElementType::Generic
            }
            (e, a) => e == a,
        }
    }
}

impl From<ElementType> for Type {
    fn from(value: ElementType) -> Self {
        match value {
            ElementType::Bool => Type::Bool,
            ElementType::Float => Type::Float,
            ElementType::Vector3 => Type::Vector3,
            ElementType::Rotation => Type::Rotation,
            ElementType::Object => Type::Object,
            ElementType::Generic => Type::Generic,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Void => write!(f, "void"),
            Type::Bool => write!(f, "bool"),
            Type::Float => write!(f, "float"),
            Type::Vector3 => write!(f, "vector3"),
            Type::Rotation => write!(f, "rotation"),
            Type::Object => write!(f, "object"),
            Type::Generic => write!(f, "T"),
            Type::Array(e) => write!(f, "{}[]", Type::from(*e)),
            Type::ArraySegment(e) => write!(f, "[{}]", Type::from(*e)),
            Type::Error => write!(f, "?"),
        }
    }
}

/// Type of a terminal on a graph block. `Void` terminals carry execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireType {
    Void,
    Float,
    Vec3,
    Rot,
    Bool,
    Obj,
    Con,
    FloatPtr,
    Vec3Ptr,
    RotPtr,
    BoolPtr,
    ObjPtr,
    ConPtr,
}

impl WireType {
    pub fn is_pointer(self) -> bool {
        matches!(
            self,
            WireType::FloatPtr
                | WireType::Vec3Ptr
                | WireType::RotPtr
                | WireType::BoolPtr
                | WireType::ObjPtr
                | WireType::ConPtr
        )
    }

    pub fn to_pointer(self) -> WireType {
        match self {
            WireType::Float => WireType::FloatPtr,
            WireType::Vec3 => WireType::Vec3Ptr,
            WireType::Rot => WireType::RotPtr,
            WireType::Bool => WireType::BoolPtr,
            WireType::Obj => WireType::ObjPtr,
            WireType::Con => WireType::ConPtr,
            other => other,
        }
    }

    pub fn to_value(self) -> WireType {
        match self {
            WireType::FloatPtr => WireType::Float,
            WireType::Vec3Ptr => WireType::Vec3,
            WireType::RotPtr => WireType::Rot,
            WireType::BoolPtr => WireType::Bool,
            WireType::ObjPtr => WireType::Obj,
            WireType::ConPtr => WireType::Con,
            other => other,
        }
    }

    /// A pointer output may feed a value input of the pointee type; the
    /// reverse is not allowed.
    pub fn can_connect(from: WireType, to: WireType) -> bool {
        from == to || (from.is_pointer() && from.to_value() == to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arrays_travel_as_pointers() {
        assert_eq!(
            Type::Array(ElementType::Vector3).wire_type(),
            Some(WireType::Vec3Ptr)
        );
        assert_eq!(Type::Float.wire_type(), Some(WireType::Float));
        assert_eq!(Type::Generic.wire_type(), None);
    }

    #[test]
    fn generic_parameters_accept_any_array() {
        assert!(Type::accepts(
            &Type::Array(ElementType::Generic),
            &Type::Array(ElementType::Object)
        ));
        assert!(!Type::accepts(&Type::Float, &Type::Vector3));
        assert!(Type::accepts(&Type::Generic, &Type::Rotation));
    }

    #[test]
    fn pointer_outputs_feed_value_inputs() {
        assert!(WireType::can_connect(WireType::FloatPtr, WireType::Float));
        assert!(!WireType::can_connect(WireType::Float, WireType::FloatPtr));
        assert!(!WireType::can_connect(WireType::Vec3, WireType::Rot));
    }
}
