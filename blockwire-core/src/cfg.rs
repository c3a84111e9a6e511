//! Control-flow graph over a flat statement list.
//!
//! Built fresh whenever reachability is needed and thrown away afterwards.
//! Node 0 is `Start`, node 1 is `End`; basic blocks follow in statement
//! order.

use std::collections::HashMap;
use std::ops::Range;
use std::rc::Rc;

use crate::bound::{BoundStatement, GotoKind, StatementKind};
use crate::error::CoreError;
use crate::symbols::Label;

pub const START: usize = 0;
pub const END: usize = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicBlock {
    /// Statement indices covered; empty for `Start` and `End`.
    pub statements: Range<usize>,
    pub successors: Vec<usize>,
    pub predecessors: Vec<usize>,
}

impl BasicBlock {
    fn new(statements: Range<usize>) -> Self {
        BasicBlock {
            statements,
            successors: Vec::new(),
            predecessors: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ControlFlowGraph {
    blocks: Vec<BasicBlock>,
    statement_count: usize,
    /// Node whose control runs off the end of the list, if any.
    exit: Option<usize>,
}

impl ControlFlowGraph {
    pub fn build(statements: &[Rc<BoundStatement>]) -> Result<ControlFlowGraph, CoreError> {
        let mut blocks = vec![BasicBlock::new(0..0), BasicBlock::new(0..0)];

        let mut start = 0;
        for (i, statement) in statements.iter().enumerate() {
            if statement.is_label() && i > start {
                blocks.push(BasicBlock::new(start..i));
                start = i;
            }
            if matches!(
                statement.kind,
                StatementKind::Goto { .. } | StatementKind::Return(_)
            ) {
                blocks.push(BasicBlock::new(start..i + 1));
                start = i + 1;
            }
        }
        if start < statements.len() {
            blocks.push(BasicBlock::new(start..statements.len()));
        }

        let mut label_blocks: HashMap<Label, usize> = HashMap::new();
        for (id, block) in blocks.iter().enumerate().skip(2) {
            if let StatementKind::Label(label) = &statements[block.statements.start].kind {
                label_blocks.insert(label.clone(), id);
            }
        }
        let target = |label: &Label| {
            label_blocks
                .get(label)
                .copied()
                .ok_or_else(|| CoreError::internal(format!("goto to undefined label '{label}'")))
        };

        let mut edges = vec![(START, if blocks.len() > 2 { 2 } else { END })];
        let mut exit = (blocks.len() == 2).then_some(START);
        for id in 2..blocks.len() {
            let next = if id + 1 < blocks.len() { id + 1 } else { END };
            let last = &statements[blocks[id].statements.end - 1];
            match &last.kind {
                StatementKind::Return(_) => edges.push((id, END)),
                StatementKind::Goto { label, kind } => {
                    edges.push((id, target(label)?));
                    // Rollbacks count as jumps here even though the emitter
                    // never wires them.
                    if !matches!(kind, GotoKind::Unconditional | GotoKind::Rollback) {
                        edges.push((id, next));
                        if next == END {
                            exit = Some(id);
                        }
                    }
                }
                _ => {
                    edges.push((id, next));
                    if next == END {
                        exit = Some(id);
                    }
                }
            }
        }

        for (from, to) in edges {
            if !blocks[from].successors.contains(&to) {
                blocks[from].successors.push(to);
                blocks[to].predecessors.push(from);
            }
        }

        Ok(ControlFlowGraph {
            blocks,
            statement_count: statements.len(),
            exit,
        })
    }

    pub fn blocks(&self) -> &[BasicBlock] {
        &self.blocks
    }

    pub fn block(&self, id: usize) -> &BasicBlock {
        &self.blocks[id]
    }

    /// Basic block containing statement `index`.
    pub fn block_of(&self, index: usize) -> Option<usize> {
        self.blocks
            .iter()
            .position(|b| b.statements.contains(&index))
    }

    /// Blocks reachable from `Start`, `Start` and `End` included.
    pub fn reachable_blocks(&self) -> Vec<bool> {
        let mut reachable = vec![false; self.blocks.len()];
        let mut worklist = vec![START];
        while let Some(id) = worklist.pop() {
            if reachable[id] {
                continue;
            }
            reachable[id] = true;
            worklist.extend(self.blocks[id].successors.iter().copied());
        }
        reachable
    }

    /// Per statement: is it reachable from `Start`?
    pub fn reachable_statements(&self) -> Vec<bool> {
        let blocks = self.reachable_blocks();
        let mut statements = vec![false; self.statement_count];
        for (id, block) in self.blocks.iter().enumerate() {
            if blocks[id] {
                for i in block.statements.clone() {
                    statements[i] = true;
                }
            }
        }
        statements
    }

    /// Can control run off the end of the list without a `return`?
    pub fn falls_through(&self) -> bool {
        self.exit.is_some_and(|id| self.reachable_blocks()[id])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bound::BoundExpression;
    use crate::span::Span;
    use crate::symbols::Variable;
    use crate::types::Type;

    fn s() -> Span {
        Span::dummy()
    }

    #[test]
    fn splits_at_labels_and_after_jumps() {
        let l = Label::new("L");
        let x = Variable::local("x", Type::Float);
        let stmts = vec![
            BoundStatement::assign(&x, BoundExpression::float(1.0, s()), s()),
            BoundStatement::goto(&l, s()),
            BoundStatement::assign(&x, BoundExpression::float(2.0, s()), s()),
            BoundStatement::label(&l, s()),
            BoundStatement::ret(None, s()),
        ];
        let cfg = ControlFlowGraph::build(&stmts).unwrap();
        assert_eq!(cfg.blocks().len(), 5);
        assert_eq!(cfg.block(2).statements, 0..2);
        assert_eq!(cfg.block(2).successors, vec![4]);
        assert_eq!(cfg.reachable_statements(), vec![true, true, false, true, true]);
        assert!(!cfg.falls_through());
    }

    #[test]
    fn conditional_gotos_have_two_successors() {
        let l = Label::new("L");
        let c = Variable::local("c", Type::Bool);
        let stmts = vec![
            BoundStatement::goto_if(BoundExpression::variable(&c, s()), &l, true, s()),
            BoundStatement::nop(s()),
            BoundStatement::label(&l, s()),
        ];
        let cfg = ControlFlowGraph::build(&stmts).unwrap();
        assert_eq!(cfg.block(2).successors, vec![4, 3]);
        assert!(cfg.falls_through());
    }

    #[test]
    fn rollback_does_not_fall_through() {
        let end = Label::new("end");
        let x = Variable::local("x", Type::Float);
        let stmts = vec![
            BoundStatement::rollback_goto(&end, s()),
            BoundStatement::assign(&x, BoundExpression::float(1.0, s()), s()),
            BoundStatement::label(&end, s()),
        ];
        let cfg = ControlFlowGraph::build(&stmts).unwrap();
        assert_eq!(cfg.reachable_statements(), vec![true, false, true]);
    }

    #[test]
    fn undefined_labels_are_internal_errors() {
        let stmts = vec![BoundStatement::goto(&Label::new("nowhere"), s())];
        assert!(ControlFlowGraph::build(&stmts).is_err());
    }
}
