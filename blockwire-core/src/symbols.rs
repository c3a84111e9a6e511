//! Resolved symbols referenced by the bound tree.
//!
//! Variables and functions have pointer identity: two locals that share a
//! name in sibling scopes are distinct symbols, and only the renamer turns
//! them into distinct storage names. Labels are identified by name.

use core::fmt;
use core::hash::{Hash, Hasher};
use core::ops::Deref;
use std::rc::Rc;

use bitflags::bitflags;

use crate::builtins::BuiltinFunction;
use crate::types::Type;
use crate::value::Axis;

bitflags! {
    /// Declaration modifiers of variables, parameters and functions.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u16 {
        const READONLY = 1 << 0;
        const CONSTANT = 1 << 1;
        const REF = 1 << 2;
        const OUT = 1 << 3;
        /// On a variable: no storage cell, the value wire is reused.
        /// On a function: expand at every call site.
        const INLINE = 1 << 4;
        const GLOBAL = 1 << 5;
        const SAVED = 1 << 6;
    }
}

impl Modifiers {
    /// Parameters whose value flows back to the caller.
    pub fn is_by_reference(self) -> bool {
        self.intersects(Modifiers::REF | Modifiers::OUT)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariableKind {
    Global,
    Local,
    Parameter,
    /// Reserved for compiler-introduced storage (extractor temporaries,
    /// inliner substitutes, function return slots).
    Temporary,
    /// One component of a vector or rotation variable, `v.x`.
    Property { base: Variable, axis: Axis },
}

#[derive(Debug)]
pub struct VariableSymbol {
    pub name: String,
    pub ty: Type,
    pub kind: VariableKind,
    pub modifiers: Modifiers,
}

#[derive(Clone)]
pub struct Variable(Rc<VariableSymbol>);

impl Variable {
    pub fn new(name: impl Into<String>, ty: Type, kind: VariableKind, modifiers: Modifiers) -> Self {
        Variable(Rc::new(VariableSymbol {
            name: name.into(),
            ty,
            kind,
            modifiers,
        }))
    }

    pub fn global(name: impl Into<String>, ty: Type) -> Self {
        Variable::new(name, ty, VariableKind::Global, Modifiers::GLOBAL)
    }

    pub fn local(name: impl Into<String>, ty: Type) -> Self {
        Variable::new(name, ty, VariableKind::Local, Modifiers::empty())
    }

    pub fn parameter(name: impl Into<String>, ty: Type, modifiers: Modifiers) -> Self {
        Variable::new(name, ty, VariableKind::Parameter, modifiers)
    }

    pub fn temporary(name: impl Into<String>, ty: Type) -> Self {
        Variable::new(name, ty, VariableKind::Temporary, Modifiers::empty())
    }

    /// Projection of one component of `base`, which must be a vector or
    /// rotation variable.
    pub fn property(base: &Variable, axis: Axis) -> Self {
        Variable::new(
            format!("{}.{}", base.name, axis.name()),
            Type::Float,
            VariableKind::Property {
                base: base.clone(),
                axis,
            },
            base.modifiers,
        )
    }

    /// Same symbol attributes under a new name, with a fresh identity.
    pub fn renamed(&self, name: impl Into<String>) -> Variable {
        Variable::new(name, self.ty, self.kind.clone(), self.modifiers)
    }

    pub fn is_global(&self) -> bool {
        matches!(self.kind, VariableKind::Global)
    }

    pub fn is_inline(&self) -> bool {
        self.modifiers.contains(Modifiers::INLINE)
    }

    pub fn is_temporary(&self) -> bool {
        matches!(self.kind, VariableKind::Temporary)
    }

    pub fn property_of(&self) -> Option<(&Variable, Axis)> {
        match &self.kind {
            VariableKind::Property { base, axis } => Some((base, *axis)),
            _ => None,
        }
    }

    pub fn ptr_eq(&self, other: &Variable) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Deref for Variable {
    type Target = VariableSymbol;

    fn deref(&self) -> &VariableSymbol {
        &self.0
    }
}

impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Variable {}

impl Hash for Variable {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Rc::as_ptr(&self.0).hash(state);
    }
}

impl fmt::Debug for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.ty)
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Clone, Copy)]
pub enum FunctionKind {
    User,
    Builtin(&'static BuiltinFunction),
}

#[derive(Debug)]
pub struct FunctionSymbol {
    pub name: String,
    pub parameters: Vec<Variable>,
    pub return_type: Type,
    pub modifiers: Modifiers,
    pub kind: FunctionKind,
    /// Storage slot a non-inlined call reads its result from.
    pub return_variable: Option<Variable>,
}

#[derive(Clone)]
pub struct Function(Rc<FunctionSymbol>);

impl Function {
    pub fn user(
        name: impl Into<String>,
        parameters: Vec<Variable>,
        return_type: Type,
        modifiers: Modifiers,
    ) -> Self {
        let name = name.into();
        let return_variable = (!return_type.is_void())
            .then(|| Variable::temporary(format!("{name}@ret"), return_type));
        Function(Rc::new(FunctionSymbol {
            name,
            parameters,
            return_type,
            modifiers,
            kind: FunctionKind::User,
            return_variable,
        }))
    }

    /// Symbol for a built-in. `return_type` is the call's concrete type,
    /// which differs from the descriptor's for generic built-ins.
    pub fn builtin(descriptor: &'static BuiltinFunction, return_type: Type) -> Self {
        let parameters = descriptor
            .parameters
            .iter()
            .map(|p| Variable::parameter(p.name, p.ty, p.modifiers))
            .collect();
        Function(Rc::new(FunctionSymbol {
            name: descriptor.name.to_string(),
            parameters,
            return_type,
            modifiers: Modifiers::empty(),
            kind: FunctionKind::Builtin(descriptor),
            return_variable: None,
        }))
    }

    pub fn builtin_descriptor(&self) -> Option<&'static BuiltinFunction> {
        match self.kind {
            FunctionKind::Builtin(d) => Some(d),
            FunctionKind::User => None,
        }
    }

    pub fn is_builtin(&self) -> bool {
        self.builtin_descriptor().is_some()
    }

    /// Same signature with a different parameter list; used by the renamer.
    pub fn with_parameters(&self, parameters: Vec<Variable>, return_variable: Option<Variable>) -> Function {
        Function(Rc::new(FunctionSymbol {
            name: self.name.clone(),
            parameters,
            return_type: self.return_type,
            modifiers: self.modifiers,
            kind: self.kind,
            return_variable,
        }))
    }

    pub fn ptr_eq(&self, other: &Function) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Deref for Function {
    type Target = FunctionSymbol;

    fn deref(&self) -> &FunctionSymbol {
        &self.0
    }
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Function {}

impl Hash for Function {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Rc::as_ptr(&self.0).hash(state);
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fn {}", self.name)
    }
}

/// Named jump target, unique within one function.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(Rc<str>);

impl Label {
    pub fn new(name: impl AsRef<str>) -> Self {
        Label(Rc::from(name.as_ref()))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.0)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_name_locals_are_distinct_symbols() {
        let a = Variable::local("x", Type::Float);
        let b = Variable::local("x", Type::Float);
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn non_void_functions_get_a_return_slot() {
        let f = Function::user("f", vec![], Type::Float, Modifiers::empty());
        let ret = f.return_variable.as_ref().map(|v| v.name.clone());
        assert_eq!(ret.as_deref(), Some("f@ret"));
        let g = Function::user("g", vec![], Type::Void, Modifiers::empty());
        assert!(g.return_variable.is_none());
    }

    #[test]
    fn properties_project_float_components() {
        let v = Variable::local("v", Type::Vector3);
        let vy = Variable::property(&v, Axis::Y);
        assert_eq!(vy.name, "v.y");
        assert_eq!(vy.ty, Type::Float);
        assert_eq!(vy.property_of().map(|(b, a)| (b.clone(), a)), Some((v, Axis::Y)));
    }
}
