//! Built-in functions known to the core.
//!
//! The table is static: every built-in carries its signature, an optional
//! constant-evaluation callback used by the lowerer, and the way the emitter
//! turns a call into blocks. Lookups go through [`BuiltinRegistry`], which
//! indexes the table by name and arity once, on first use.

use std::collections::HashMap;
use std::rc::Rc;
use std::sync::LazyLock;

use crate::blocks;
use crate::bound::BoundExpression;
use crate::diagnostic::Diagnostic;
use crate::emit::store::EmitStore;
use crate::emit::{EmitResult, Emitter, expr, stmt};
use crate::graph::{BlockDef, TerminalRef};
use crate::span::Span;
use crate::symbols::{Function, Modifiers};
use crate::types::{ElementType, Type};
use crate::value::{Value, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltinParameter {
    pub name: &'static str,
    pub ty: Type,
    pub modifiers: Modifiers,
}

const fn param(name: &'static str, ty: Type) -> BuiltinParameter {
    BuiltinParameter {
        name,
        ty,
        modifiers: Modifiers::empty(),
    }
}

const fn out(name: &'static str, ty: Type) -> BuiltinParameter {
    BuiltinParameter {
        name,
        ty,
        modifiers: Modifiers::OUT,
    }
}

const fn constant(name: &'static str, ty: Type) -> BuiltinParameter {
    BuiltinParameter {
        name,
        ty,
        modifiers: Modifiers::CONSTANT,
    }
}

/// A call site handed to a hand-written emitter.
pub struct BuiltinCall<'c> {
    pub function: &'c Function,
    pub arguments: &'c [Rc<BoundExpression>],
    pub span: Span,
}

pub type ConstantFn = fn(&[Value]) -> Option<Value>;
pub type ValueEmitter = fn(&mut Emitter<'_>, &BuiltinCall<'_>) -> EmitResult<Option<TerminalRef>>;
pub type StatementEmitter = fn(&mut Emitter<'_>, &BuiltinCall<'_>) -> EmitResult<EmitStore>;

/// How a call is turned into blocks.
#[derive(Debug, Clone, Copy)]
pub enum BuiltinEmit {
    /// Passive block. Inputs follow the non-`out` parameters; outputs are
    /// the return value (if any) followed by the `out` parameters.
    Block(&'static BlockDef),
    /// Active block whose inputs after `Before` follow the parameters.
    Statement(&'static BlockDef),
    /// Expression with its own emitter.
    Value(ValueEmitter),
    /// Statement with its own emitter.
    Custom(StatementEmitter),
}

#[derive(Debug)]
pub struct BuiltinFunction {
    pub name: &'static str,
    pub parameters: &'static [BuiltinParameter],
    pub return_type: Type,
    /// Evaluates the call when every argument is a constant.
    pub constant: Option<ConstantFn>,
    pub emit: BuiltinEmit,
}

impl BuiltinFunction {
    pub fn arity(&self) -> usize {
        self.parameters.len()
    }

    /// True when a call needs an execution wire, so it can only appear as
    /// a statement.
    pub fn is_statement(&self) -> bool {
        match self.emit {
            BuiltinEmit::Statement(_) | BuiltinEmit::Custom(_) => true,
            BuiltinEmit::Value(_) => false,
            BuiltinEmit::Block(_) => self.parameters.iter().any(|p| p.modifiers.is_by_reference()),
        }
    }

    /// Binds the generic placeholder against concrete argument types.
    /// Returns `None` when the arguments do not fit the signature.
    fn bind(&self, arguments: &[Type]) -> Option<Option<Type>> {
        if arguments.len() != self.parameters.len() {
            return None;
        }
        let mut bound: Option<Type> = None;
        for (p, a) in self.parameters.iter().zip(arguments) {
            let generic = match (p.ty, a) {
                (Type::Generic, a) => Some(*a),
                (Type::Array(ElementType::Generic), Type::Array(e))
                | (Type::ArraySegment(ElementType::Generic), Type::ArraySegment(e)) => Some(Type::from(*e)),
                (expected, actual) if Type::accepts(&expected, actual) => None,
                _ => return None,
            };
            if let Some(g) = generic {
                match bound {
                    Some(b) if b != g => return None,
                    _ => bound = Some(g),
                }
            }
        }
        Some(bound)
    }
}

fn float1(args: &[Value], f: fn(f32) -> f32) -> Option<Value> {
    match args {
        [Value::Float(a)] => Some(Value::Float(f(*a))),
        _ => None,
    }
}

fn float2(args: &[Value], f: fn(f32, f32) -> f32) -> Option<Value> {
    match args {
        [Value::Float(a), Value::Float(b)] => Some(Value::Float(f(*a, *b))),
        _ => None,
    }
}

fn vectors(args: &[Value]) -> Option<(Vec3, Vec3)> {
    match args {
        [Value::Vector3(a), Value::Vector3(b)] => Some((*a, *b)),
        _ => None,
    }
}

fn const_abs(args: &[Value]) -> Option<Value> {
    float1(args, f32::abs)
}

fn const_floor(args: &[Value]) -> Option<Value> {
    float1(args, f32::floor)
}

fn const_ceil(args: &[Value]) -> Option<Value> {
    float1(args, f32::ceil)
}

fn const_round(args: &[Value]) -> Option<Value> {
    float1(args, f32::round)
}

fn const_min(args: &[Value]) -> Option<Value> {
    float2(args, f32::min)
}

fn const_max(args: &[Value]) -> Option<Value> {
    float2(args, f32::max)
}

fn const_pow(args: &[Value]) -> Option<Value> {
    float2(args, f32::powf)
}

fn const_distance(args: &[Value]) -> Option<Value> {
    let (a, b) = vectors(args)?;
    let (dx, dy, dz) = (a.x - b.x, a.y - b.y, a.z - b.z);
    Some(Value::Float((dx * dx + dy * dy + dz * dz).sqrt()))
}

fn const_dot(args: &[Value]) -> Option<Value> {
    let (a, b) = vectors(args)?;
    Some(Value::Float(a.x * b.x + a.y * b.y + a.z * b.z))
}

fn const_cross(args: &[Value]) -> Option<Value> {
    let (a, b) = vectors(args)?;
    Some(Value::Vector3(Vec3::new(
        a.y * b.z - a.z * b.y,
        a.z * b.x - a.x * b.z,
        a.x * b.y - a.y * b.x,
    )))
}

const GENERIC_ARRAY: Type = Type::Array(ElementType::Generic);

pub static BUILTINS: &[BuiltinFunction] = &[
    BuiltinFunction {
        name: "abs",
        parameters: &[param("num", Type::Float)],
        return_type: Type::Float,
        constant: Some(const_abs),
        emit: BuiltinEmit::Block(&blocks::ABSOLUTE),
    },
    BuiltinFunction {
        name: "floor",
        parameters: &[param("num", Type::Float)],
        return_type: Type::Float,
        constant: Some(const_floor),
        emit: BuiltinEmit::Block(&blocks::FLOOR),
    },
    BuiltinFunction {
        name: "ceil",
        parameters: &[param("num", Type::Float)],
        return_type: Type::Float,
        constant: Some(const_ceil),
        emit: BuiltinEmit::Block(&blocks::CEILING),
    },
    BuiltinFunction {
        name: "round",
        parameters: &[param("num", Type::Float)],
        return_type: Type::Float,
        constant: Some(const_round),
        emit: BuiltinEmit::Block(&blocks::ROUND),
    },
    BuiltinFunction {
        name: "min",
        parameters: &[param("a", Type::Float), param("b", Type::Float)],
        return_type: Type::Float,
        constant: Some(const_min),
        emit: BuiltinEmit::Block(&blocks::MIN),
    },
    BuiltinFunction {
        name: "max",
        parameters: &[param("a", Type::Float), param("b", Type::Float)],
        return_type: Type::Float,
        constant: Some(const_max),
        emit: BuiltinEmit::Block(&blocks::MAX),
    },
    BuiltinFunction {
        name: "pow",
        parameters: &[param("base", Type::Float), param("exponent", Type::Float)],
        return_type: Type::Float,
        constant: Some(const_pow),
        emit: BuiltinEmit::Block(&blocks::POWER),
    },
    BuiltinFunction {
        name: "distance",
        parameters: &[param("a", Type::Vector3), param("b", Type::Vector3)],
        return_type: Type::Float,
        constant: Some(const_distance),
        emit: BuiltinEmit::Block(&blocks::DISTANCE),
    },
    BuiltinFunction {
        name: "dot",
        parameters: &[param("a", Type::Vector3), param("b", Type::Vector3)],
        return_type: Type::Float,
        constant: Some(const_dot),
        emit: BuiltinEmit::Block(&blocks::DOT_PRODUCT),
    },
    BuiltinFunction {
        name: "cross",
        parameters: &[param("a", Type::Vector3), param("b", Type::Vector3)],
        return_type: Type::Vector3,
        constant: Some(const_cross),
        emit: BuiltinEmit::Block(&blocks::CROSS_PRODUCT),
    },
    BuiltinFunction {
        name: "rotate",
        parameters: &[param("vec", Type::Vector3), param("rot", Type::Rotation)],
        return_type: Type::Vector3,
        constant: None,
        emit: BuiltinEmit::Block(&blocks::ROTATE_VECTOR),
    },
    BuiltinFunction {
        name: "random",
        parameters: &[param("min", Type::Float), param("max", Type::Float)],
        return_type: Type::Float,
        constant: None,
        emit: BuiltinEmit::Block(&blocks::RANDOM),
    },
    BuiltinFunction {
        name: "frame",
        parameters: &[],
        return_type: Type::Float,
        constant: None,
        emit: BuiltinEmit::Block(&blocks::CURRENT_FRAME),
    },
    BuiltinFunction {
        name: "screenSize",
        parameters: &[out("width", Type::Float), out("height", Type::Float)],
        return_type: Type::Void,
        constant: None,
        emit: BuiltinEmit::Block(&blocks::SCREEN_SIZE),
    },
    BuiltinFunction {
        name: "getPosition",
        parameters: &[
            param("object", Type::Object),
            out("position", Type::Vector3),
            out("rotation", Type::Rotation),
        ],
        return_type: Type::Void,
        constant: None,
        emit: BuiltinEmit::Block(&blocks::GET_POSITION),
    },
    BuiltinFunction {
        name: "raycast",
        parameters: &[
            param("from", Type::Vector3),
            param("to", Type::Vector3),
            out("hit", Type::Bool),
            out("hitPos", Type::Vector3),
            out("hitObj", Type::Object),
        ],
        return_type: Type::Void,
        constant: None,
        emit: BuiltinEmit::Block(&blocks::RAYCAST),
    },
    BuiltinFunction {
        name: "setPosition",
        parameters: &[
            param("object", Type::Object),
            param("position", Type::Vector3),
            param("rotation", Type::Rotation),
        ],
        return_type: Type::Void,
        constant: None,
        emit: BuiltinEmit::Statement(&blocks::SET_POSITION),
    },
    BuiltinFunction {
        name: "inspect",
        parameters: &[param("value", Type::Generic)],
        return_type: Type::Void,
        constant: None,
        emit: BuiltinEmit::Custom(stmt::emit_inspect),
    },
    BuiltinFunction {
        name: "get",
        parameters: &[param("array", GENERIC_ARRAY), param("index", Type::Float)],
        return_type: Type::Generic,
        constant: None,
        emit: BuiltinEmit::Value(expr::emit_list_get),
    },
    BuiltinFunction {
        name: "set",
        parameters: &[
            param("array", GENERIC_ARRAY),
            param("index", Type::Float),
            param("value", Type::Generic),
        ],
        return_type: Type::Void,
        constant: None,
        emit: BuiltinEmit::Custom(stmt::emit_list_set),
    },
    BuiltinFunction {
        name: "setRange",
        parameters: &[
            param("array", GENERIC_ARRAY),
            constant("index", Type::Float),
            param("values", Type::ArraySegment(ElementType::Generic)),
        ],
        return_type: Type::Void,
        constant: None,
        emit: BuiltinEmit::Custom(stmt::emit_set_range),
    },
    BuiltinFunction {
        name: "getBlock",
        parameters: &[constant("position", Type::Vector3)],
        return_type: Type::Object,
        constant: None,
        emit: BuiltinEmit::Value(expr::emit_block_query),
    },
];

/// Index over [`BUILTINS`] keyed by name and arity.
#[derive(Debug)]
pub struct BuiltinRegistry {
    by_signature: HashMap<(&'static str, usize), Vec<&'static BuiltinFunction>>,
    arities: HashMap<&'static str, Vec<usize>>,
}

static REGISTRY: LazyLock<BuiltinRegistry> = LazyLock::new(|| BuiltinRegistry::build(BUILTINS));

impl BuiltinRegistry {
    pub fn global() -> &'static BuiltinRegistry {
        &REGISTRY
    }

    fn build(table: &'static [BuiltinFunction]) -> Self {
        let mut by_signature: HashMap<_, Vec<_>> = HashMap::new();
        let mut arities: HashMap<_, Vec<_>> = HashMap::new();
        for builtin in table {
            by_signature
                .entry((builtin.name, builtin.arity()))
                .or_default()
                .push(builtin);
            let known = arities.entry(builtin.name).or_default();
            if !known.contains(&builtin.arity()) {
                known.push(builtin.arity());
            }
        }
        BuiltinRegistry {
            by_signature,
            arities,
        }
    }

    /// First overload registered under `name`.
    pub fn find(&self, name: &str) -> Option<&'static BuiltinFunction> {
        let arity = *self.arities.get(name)?.first()?;
        self.by_signature.get(&(name, arity))?.first().copied()
    }

    pub fn lookup(&self, name: &str, arguments: &[Type]) -> Option<&'static BuiltinFunction> {
        self.by_signature
            .get(&(name, arguments.len()))?
            .iter()
            .copied()
            .find(|b| b.bind(arguments).is_some())
    }

    /// Resolves a call and instantiates a function symbol whose return
    /// type has the generic placeholder replaced.
    pub fn resolve(&self, name: &str, arguments: &[Type], span: Span) -> Result<Function, Diagnostic> {
        let Some(arities) = self.arities.get(name) else {
            return Err(Diagnostic::error(format!("Unknown function '{name}'"), span));
        };
        let Some(overloads) = self.by_signature.get(&(name, arguments.len())) else {
            let expected = arities.first().copied().unwrap_or_default();
            return Err(Diagnostic::wrong_argument_count(name, expected, arguments.len(), span));
        };
        for &builtin in overloads {
            if let Some(generic) = builtin.bind(arguments) {
                let return_type = match builtin.return_type {
                    Type::Generic => generic.unwrap_or(Type::Error),
                    other => other,
                };
                return Ok(Function::builtin(builtin, return_type));
            }
        }
        let given: Vec<String> = arguments.iter().map(|t| t.to_string()).collect();
        Err(Diagnostic::error(
            format!("No overload of '{name}' accepts ({})", given.join(", ")),
            span,
        ))
    }
}

/// Instantiates a built-in by name for compiler-generated calls.
pub(crate) fn instantiate(name: &str, arguments: &[Type]) -> Option<Function> {
    BuiltinRegistry::global()
        .resolve(name, arguments, Span::dummy())
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_callbacks_evaluate() {
        let abs = BuiltinRegistry::global().find("abs").unwrap();
        assert_eq!((abs.constant.unwrap())(&[Value::Float(-2.5)]), Some(Value::Float(2.5)));
        let cross = BuiltinRegistry::global().find("cross").unwrap();
        let x = Value::Vector3(Vec3::new(1.0, 0.0, 0.0));
        let y = Value::Vector3(Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(
            (cross.constant.unwrap())(&[x, y]),
            Some(Value::Vector3(Vec3::new(0.0, 0.0, 1.0)))
        );
    }

    #[test]
    fn wrong_arity_reports_expected_count() {
        let registry = BuiltinRegistry::global();
        for given in [vec![], vec![Type::Float; 3]] {
            let err = registry.resolve("abs", &given, Span::new(3, 9)).unwrap_err();
            assert_eq!(
                err.message,
                format!("'abs' requires 1 arguments but was given {}", given.len())
            );
            assert_eq!(err.span, Span::new(3, 9));
        }
    }

    #[test]
    fn generic_return_types_are_instantiated() {
        let get = BuiltinRegistry::global()
            .resolve("get", &[Type::Array(ElementType::Vector3), Type::Float], Span::dummy())
            .unwrap();
        assert_eq!(get.return_type, Type::Vector3);
        assert!(get.is_builtin());
    }

    #[test]
    fn generic_bindings_must_agree() {
        let registry = BuiltinRegistry::global();
        let args = [Type::Array(ElementType::Float), Type::Float, Type::Vector3];
        assert!(registry.lookup("set", &args).is_none());
        let args = [Type::Array(ElementType::Float), Type::Float, Type::Float];
        assert!(registry.lookup("set", &args).is_some());
    }

    #[test]
    fn statement_builtins_are_flagged() {
        let registry = BuiltinRegistry::global();
        assert!(registry.find("screenSize").unwrap().is_statement());
        assert!(registry.find("setPosition").unwrap().is_statement());
        assert!(!registry.find("abs").unwrap().is_statement());
        assert!(!registry.find("get").unwrap().is_statement());
    }
}
