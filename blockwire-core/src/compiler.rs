use std::collections::{HashSet, VecDeque};
use std::rc::Rc;

use indexmap::IndexMap;
use log::debug;

use crate::analysis::{AnalysisResult, call_sites};
use crate::bound::{BoundStatement, StatementKind};
use crate::config::{CompileOptions, InlineMode};
use crate::diagnostic::Diagnostics;
use crate::emit::emit_program;
use crate::error::CoreError;
use crate::extract::extract;
use crate::graph::{Builder, Placer};
use crate::inline::Inliner;
use crate::lower::lower;
use crate::rename::rename;
use crate::symbols::{Function, Variable};

/// Input handed over by the binder.
#[derive(Debug, Clone)]
pub struct BoundProgram {
    pub globals: Vec<Variable>,
    pub functions: IndexMap<Function, Rc<BoundStatement>>,
    /// Function whose body starts running when the level plays.
    pub entry: Function,
}

#[derive(Debug, Clone)]
pub struct CompilationArtifact {
    pub diagnostics: Diagnostics,
    /// Final flat bodies of the emitted functions, entry first.
    pub functions: IndexMap<Function, Rc<BoundStatement>>,
}

impl CompilationArtifact {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.has_errors()
    }
}

fn statement_count(functions: &IndexMap<Function, Rc<BoundStatement>>) -> usize {
    functions
        .values()
        .map(|body| match &body.kind {
            StatementKind::Block(statements) => statements.len(),
            _ => 1,
        })
        .sum()
}

/// Runs every rewriting pass and returns the functions to emit.
pub fn prepare(
    program: &BoundProgram,
    analysis: &AnalysisResult,
    options: &CompileOptions,
) -> Result<IndexMap<Function, Rc<BoundStatement>>, CoreError> {
    if !program.functions.contains_key(&program.entry) {
        return Err(CoreError::MissingCallee(program.entry.name.clone()));
    }

    let mut flat = IndexMap::with_capacity(program.functions.len());
    for (function, body) in &program.functions {
        let lowered = lower(function, body)?;
        flat.insert(function.clone(), extract(function, &lowered)?);
    }
    debug!("lowered and extracted: {} statements", statement_count(&flat));

    let inlined: HashSet<Function> = program
        .functions
        .keys()
        .filter(|f| match options.inlining {
            InlineMode::Auto => analysis.should_inline(f),
            InlineMode::Always => analysis.can_inline(f),
            InlineMode::Never => false,
        })
        .cloned()
        .collect();
    let mut inliner = Inliner::new(&inlined, &flat);
    let mut expanded = IndexMap::with_capacity(flat.len());
    for (function, body) in &flat {
        if !inlined.contains(function) {
            expanded.insert(function.clone(), inliner.inline(function, body)?);
        }
    }

    let reachable = reachable_functions(&expanded, &program.entry)?;
    let before = expanded.len();
    expanded.retain(|f, _| reachable.contains(f));
    expanded.move_index(
        expanded.get_index_of(&program.entry).unwrap_or(0),
        0,
    );
    debug!(
        "inlined {} functions, dropped {} uncalled, {} statements",
        inlined.len(),
        before - expanded.len(),
        statement_count(&expanded)
    );

    rename(&expanded)
}

/// Functions the entry reaches through calls that survived inlining.
fn reachable_functions(
    functions: &IndexMap<Function, Rc<BoundStatement>>,
    entry: &Function,
) -> Result<HashSet<Function>, CoreError> {
    let mut seen = HashSet::from([entry.clone()]);
    let mut queue = VecDeque::from([entry.clone()]);
    while let Some(function) = queue.pop_front() {
        let Some(body) = functions.get(&function) else {
            return Err(CoreError::MissingCallee(function.name.clone()));
        };
        for callee in call_sites(body)? {
            if seen.insert(callee.clone()) {
                queue.push_back(callee);
            }
        }
    }
    Ok(seen)
}

/// Compiles `program` into blocks handed to `placer` and wires handed to
/// `builder`. Analysis errors stop compilation before any pass runs.
pub fn compile(
    program: &BoundProgram,
    analysis: &AnalysisResult,
    options: &CompileOptions,
    placer: &mut dyn Placer,
    builder: &mut dyn Builder,
) -> Result<CompilationArtifact, CoreError> {
    let mut diagnostics = analysis.diagnostics().clone();
    if diagnostics.has_errors() {
        return Ok(CompilationArtifact {
            diagnostics,
            functions: IndexMap::new(),
        });
    }

    let functions = prepare(program, analysis, options)?;
    diagnostics.extend(emit_program(&functions, placer, builder, &options.emit)?);
    debug!(
        "compiled '{}': {} functions emitted, {} diagnostics",
        program.entry.name,
        functions.len(),
        diagnostics.len()
    );
    Ok(CompilationArtifact {
        diagnostics,
        functions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks;
    use crate::bound::{BinaryOp, BoundExpression};
    use crate::graph::{Netlist, SegmentPlacer};
    use crate::interpret::Interpreter;
    use crate::span::Span;
    use crate::symbols::Modifiers;
    use crate::types::Type;
    use crate::value::Value;

    fn s() -> Span {
        Span::dummy()
    }

    fn read(v: &Variable) -> Rc<BoundExpression> {
        BoundExpression::variable(v, s())
    }

    fn main_fn() -> Function {
        Function::user("main", vec![], Type::Void, Modifiers::empty())
    }

    fn bound(entry: &Function, functions: Vec<(Function, Vec<Rc<BoundStatement>>)>) -> BoundProgram {
        BoundProgram {
            globals: Vec::new(),
            functions: functions
                .into_iter()
                .map(|(f, body)| (f, BoundStatement::block(body, s())))
                .collect(),
            entry: entry.clone(),
        }
    }

    /// ```text
    /// float scale(float p, out float o) {
    ///     o = p * 2;
    ///     if (p > 1) { return p + 10; }
    ///     return p;
    /// }
    /// void main() {
    ///     float a = 3; float b;
    ///     float r = scale(a, b) + scale(1, b);
    ///     $total = r + b;
    /// }
    /// ```
    fn scale_program() -> (BoundProgram, Variable) {
        let total = Variable::global("total", Type::Float);
        let p = Variable::parameter("p", Type::Float, Modifiers::empty());
        let o = Variable::parameter("o", Type::Float, Modifiers::OUT);
        let scale = Function::user("scale", vec![p.clone(), o.clone()], Type::Float, Modifiers::empty());
        let main = main_fn();
        let (a, b, r) = (
            Variable::local("a", Type::Float),
            Variable::local("b", Type::Float),
            Variable::local("r", Type::Float),
        );
        let number = |v: f32| BoundExpression::float(v, s());
        let scale_body = vec![
            BoundStatement::assign(&o, BoundExpression::binary(read(&p), BinaryOp::Multiply, number(2.0), s()), s()),
            BoundStatement::if_(
                BoundExpression::binary(read(&p), BinaryOp::Greater, number(1.0), s()),
                BoundStatement::block(
                    vec![BoundStatement::ret(
                        Some(BoundExpression::binary(read(&p), BinaryOp::Add, number(10.0), s())),
                        s(),
                    )],
                    s(),
                ),
                None,
                s(),
            ),
            BoundStatement::ret(Some(read(&p)), s()),
        ];
        let sum = BoundExpression::binary(
            BoundExpression::call(&scale, vec![read(&a), read(&b)], s()),
            BinaryOp::Add,
            BoundExpression::call(&scale, vec![number(1.0), read(&b)], s()),
            s(),
        );
        let main_body = vec![
            BoundStatement::declare(&a, Some(number(3.0)), s(), s()),
            BoundStatement::declare(&b, None, s(), s()),
            BoundStatement::declare(&r, Some(sum), s(), s()),
            BoundStatement::assign(&total, BoundExpression::binary(read(&r), BinaryOp::Add, read(&b), s()), s()),
        ];
        (bound(&main, vec![(main.clone(), main_body), (scale, scale_body)]), total)
    }

    fn run(program: &BoundProgram, inlining: InlineMode) -> (usize, Value) {
        let analysis = AnalysisResult::analyze(program).unwrap();
        let options = CompileOptions::default().with_inlining(inlining);
        let functions = prepare(program, &analysis, &options).unwrap();
        let entry = functions.get_index(0).unwrap().0.clone();
        let mut interpreter = Interpreter::new(&functions);
        interpreter.run(&entry).unwrap();
        (functions.len(), interpreter.cell("$total").unwrap())
    }

    #[test]
    fn inlining_preserves_behaviour() {
        let (program, _) = scale_program();
        let (kept, never) = run(&program, InlineMode::Never);
        assert_eq!(kept, 2);
        assert_eq!(never, Value::Float(16.0));
        let (kept, always) = run(&program, InlineMode::Always);
        assert_eq!(kept, 1);
        assert_eq!(always, never);
        let (kept, auto) = run(&program, InlineMode::Auto);
        assert_eq!(kept, 2);
        assert_eq!(auto, never);
    }

    #[test]
    fn single_call_sites_compile_without_call_gates() {
        let x = Variable::local("x", Type::Float);
        let f = Function::user("f", vec![], Type::Void, Modifiers::empty());
        let unused = Function::user("unused", vec![], Type::Void, Modifiers::empty());
        let main = main_fn();
        let program = bound(
            &main,
            vec![
                (main.clone(), vec![BoundStatement::call(&f, vec![], None, s())]),
                (f.clone(), vec![BoundStatement::assign(&x, BoundExpression::float(1.0, s()), s())]),
                (unused.clone(), vec![BoundStatement::assign(&x, BoundExpression::float(2.0, s()), s())]),
            ],
        );
        let analysis = AnalysisResult::analyze(&program).unwrap();

        let mut placer = SegmentPlacer::new();
        let mut netlist = Netlist::new();
        let artifact = compile(&program, &analysis, &CompileOptions::default(), &mut placer, &mut netlist).unwrap();
        assert!(!artifact.has_errors());
        assert_eq!(artifact.functions.len(), 1);
        assert_eq!(placer.count(&blocks::IF), 0);
        assert_eq!(placer.count(&blocks::SET_VARIABLE_NUMBER), 1);

        let mut placer = SegmentPlacer::new();
        let mut netlist = Netlist::new();
        let options = CompileOptions::default().with_inlining(InlineMode::Never);
        let artifact = compile(&program, &analysis, &options, &mut placer, &mut netlist).unwrap();
        assert_eq!(artifact.functions.len(), 2);
        assert_eq!(placer.count(&blocks::IF), 1);
    }

    #[test]
    fn analysis_errors_stop_before_emission() {
        let main = main_fn();
        let first = Variable::local("x", Type::Float);
        let second = Variable::local("x", Type::Float);
        let program = bound(
            &main,
            vec![(
                main.clone(),
                vec![
                    BoundStatement::declare(&first, None, s(), s()),
                    BoundStatement::declare(&second, None, s(), s()),
                ],
            )],
        );
        let analysis = AnalysisResult::analyze(&program).unwrap();
        let mut placer = SegmentPlacer::new();
        let mut netlist = Netlist::new();
        let artifact = compile(&program, &analysis, &CompileOptions::default(), &mut placer, &mut netlist).unwrap();
        assert!(artifact.has_errors());
        assert!(artifact.functions.is_empty());
        assert!(placer.is_empty());
    }

    #[test]
    fn missing_entry_is_an_internal_fault() {
        let main = main_fn();
        let program = BoundProgram {
            globals: Vec::new(),
            functions: IndexMap::new(),
            entry: main.clone(),
        };
        let analysis = AnalysisResult::analyze(&program).unwrap();
        let err = prepare(&program, &analysis, &CompileOptions::default()).unwrap_err();
        assert_eq!(err, CoreError::MissingCallee("main".into()));
    }
}
