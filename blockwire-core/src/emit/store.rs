//! Connection handles returned by statement emission, and the connector
//! that sequences them and resolves labels once a function is complete.

use std::collections::{HashMap, HashSet};

use indexmap::{IndexMap, IndexSet};
use log::{trace, warn};

use crate::error::CoreError;
use crate::graph::{Builder, TerminalRef};
use crate::symbols::Label;

/// Execution terminals exposed by one emitted statement.
#[derive(Debug, Clone)]
pub enum EmitStore {
    /// Nothing placed; control passes straight through.
    Nop,
    Basic {
        entry: TerminalRef,
        exits: Vec<TerminalRef>,
    },
    Goto(Label),
    Label(Label),
    /// Conditional or event jump: `jumps` go to `label`, `fall_through`
    /// continues with the next statement.
    Branch {
        entry: TerminalRef,
        fall_through: Vec<TerminalRef>,
        label: Label,
        jumps: Vec<TerminalRef>,
    },
    /// Ends the chain without a wire; the sensor already continues.
    Rollback,
    Return,
    Multi(Vec<EmitStore>),
}

/// Straight-line sequence of stores without jumps, built inside one
/// statement.
#[derive(Debug, Default)]
pub struct Chain {
    entry: Option<TerminalRef>,
    exits: Vec<TerminalRef>,
}

impl Chain {
    pub fn new() -> Self {
        Chain::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entry.is_none()
    }

    pub fn append(&mut self, builder: &mut dyn Builder, store: EmitStore) -> Result<(), CoreError> {
        match store {
            EmitStore::Nop => Ok(()),
            EmitStore::Basic { entry, exits } => {
                if self.entry.is_none() {
                    self.entry = Some(entry);
                }
                for exit in self.exits.drain(..) {
                    builder.connect(exit, entry);
                }
                self.exits = exits;
                Ok(())
            }
            EmitStore::Multi(stores) => {
                for store in stores {
                    self.append(builder, store)?;
                }
                Ok(())
            }
            other => Err(CoreError::internal(format!(
                "jump store {other:?} inside a straight-line chain"
            ))),
        }
    }

    pub fn entry(&self) -> Option<TerminalRef> {
        self.entry
    }

    pub fn exits(&self) -> &[TerminalRef] {
        &self.exits
    }

    pub fn into_store(self) -> EmitStore {
        match self.entry {
            Some(entry) => EmitStore::Basic {
                entry,
                exits: self.exits,
            },
            None => EmitStore::Nop,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Anchor {
    /// The function's first statement.
    Entry,
    Label(Label),
}

#[derive(Debug, Clone)]
enum Target {
    Terminal(TerminalRef),
    /// Control leaves the function.
    End,
    /// Another label follows with nothing in between.
    Alias(Label),
}

/// Sequences the stores of one function. Jumps are recorded while
/// emitting and wired by [`Connector::finish`].
#[derive(Debug)]
pub struct Connector {
    function: String,
    pending: Vec<TerminalRef>,
    open: Vec<Anchor>,
    targets: HashMap<Anchor, Target>,
    gotos: IndexMap<Label, Vec<TerminalRef>>,
    empty_loops: IndexSet<Label>,
}

/// Outcome of [`Connector::finish`].
#[derive(Debug)]
pub struct Finished {
    /// First terminal of the function, `None` when it places no blocks.
    pub entry: Option<TerminalRef>,
    /// Labels that only jump among themselves. The graph has nothing to
    /// wire for them, so they are left out.
    pub empty_loops: Vec<Label>,
}

impl Connector {
    pub fn new(function: impl Into<String>) -> Self {
        Connector {
            function: function.into(),
            pending: Vec::new(),
            open: vec![Anchor::Entry],
            targets: HashMap::new(),
            gotos: IndexMap::new(),
            empty_loops: IndexSet::new(),
        }
    }

    fn settle(&mut self, target: Target) {
        for anchor in self.open.drain(..) {
            self.targets.insert(anchor, target.clone());
        }
    }

    fn enter(&mut self, builder: &mut dyn Builder, entry: TerminalRef) {
        for exit in self.pending.drain(..) {
            builder.connect(exit, entry);
        }
        self.settle(Target::Terminal(entry));
    }

    pub fn push(&mut self, builder: &mut dyn Builder, store: EmitStore) {
        match store {
            EmitStore::Nop => {}
            EmitStore::Basic { entry, exits } => {
                self.enter(builder, entry);
                self.pending = exits;
            }
            EmitStore::Branch {
                entry,
                fall_through,
                label,
                jumps,
            } => {
                self.enter(builder, entry);
                self.gotos.entry(label).or_default().extend(jumps);
                self.pending = fall_through;
            }
            EmitStore::Goto(label) => {
                let pending = std::mem::take(&mut self.pending);
                self.gotos.entry(label.clone()).or_default().extend(pending);
                self.settle(Target::Alias(label));
            }
            EmitStore::Label(label) => self.open.push(Anchor::Label(label)),
            EmitStore::Rollback | EmitStore::Return => {
                self.pending.clear();
                self.settle(Target::End);
            }
            EmitStore::Multi(stores) => {
                for store in stores {
                    self.push(builder, store);
                }
            }
        }
    }

    fn resolve(&mut self, anchor: &Anchor) -> Result<Option<TerminalRef>, CoreError> {
        let mut seen = HashSet::new();
        let mut current = anchor.clone();
        loop {
            match self.targets.get(&current) {
                Some(Target::Terminal(terminal)) => return Ok(Some(*terminal)),
                Some(Target::End) => return Ok(None),
                Some(Target::Alias(next)) => {
                    if !seen.insert(current.clone()) {
                        warn!("label '{next}' in '{}' only jumps back to itself", self.function);
                        self.empty_loops.insert(next.clone());
                        return Ok(None);
                    }
                    current = Anchor::Label(next.clone());
                }
                None => {
                    return Err(match current {
                        Anchor::Label(label) => CoreError::UnresolvedLabel {
                            function: self.function.clone(),
                            label: label.name().to_string(),
                        },
                        Anchor::Entry => CoreError::internal(format!(
                            "entry of '{}' was never settled",
                            self.function
                        )),
                    });
                }
            }
        }
    }

    /// Wires every recorded jump.
    pub fn finish(mut self, builder: &mut dyn Builder) -> Result<Finished, CoreError> {
        self.pending.clear();
        self.settle(Target::End);
        let gotos = std::mem::take(&mut self.gotos);
        for (label, sources) in &gotos {
            let target = self.resolve(&Anchor::Label(label.clone()))?;
            trace!("'{}': {label} -> {target:?}", self.function);
            if let Some(target) = target {
                for source in sources {
                    builder.connect(*source, target);
                }
            }
        }
        let entry = self.resolve(&Anchor::Entry)?;
        Ok(Finished {
            entry,
            empty_loops: self.empty_loops.into_iter().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks;
    use crate::graph::{Netlist, Placer, SegmentPlacer};

    #[test]
    fn adjacent_labels_resolve_through_chains() {
        let mut placer = SegmentPlacer::new();
        let mut netlist = Netlist::new();
        let a = placer.place(&blocks::SET_VARIABLE_NUMBER);
        let b = placer.place(&blocks::SET_VARIABLE_NUMBER);

        let mut connector = Connector::new("main");
        let basic = |block: crate::graph::Block| EmitStore::Basic {
            entry: block.before().unwrap(),
            exits: vec![block.after().unwrap()],
        };
        connector.push(&mut netlist, basic(a));
        connector.push(&mut netlist, EmitStore::Goto(Label::new("one")));
        connector.push(&mut netlist, EmitStore::Label(Label::new("one")));
        connector.push(&mut netlist, EmitStore::Label(Label::new("two")));
        connector.push(&mut netlist, basic(b));

        let finished = connector.finish(&mut netlist).unwrap();
        assert_eq!(finished.entry, Some(a.before().unwrap()));
        assert!(finished.empty_loops.is_empty());
        assert!(netlist.is_connected(a.after().unwrap(), b.before().unwrap()));
        assert_eq!(netlist.wires.len(), 1);
    }

    #[test]
    fn unknown_labels_are_internal_faults() {
        let mut netlist = Netlist::new();
        let mut connector = Connector::new("main");
        connector.push(&mut netlist, EmitStore::Goto(Label::new("nowhere")));
        let err = connector.finish(&mut netlist).unwrap_err();
        assert_eq!(
            err,
            CoreError::UnresolvedLabel {
                function: "main".into(),
                label: "nowhere".into()
            }
        );
    }

    #[test]
    fn self_loops_are_reported_once_without_wires() {
        let mut netlist = Netlist::new();
        let mut connector = Connector::new("main");
        connector.push(&mut netlist, EmitStore::Label(Label::new("spin")));
        connector.push(&mut netlist, EmitStore::Goto(Label::new("spin")));
        let finished = connector.finish(&mut netlist).unwrap();
        assert_eq!(finished.entry, None);
        assert_eq!(finished.empty_loops, vec![Label::new("spin")]);
        assert!(netlist.wires.is_empty());
    }

    #[test]
    fn returns_drop_pending_exits() {
        let mut placer = SegmentPlacer::new();
        let mut netlist = Netlist::new();
        let a = placer.place(&blocks::SET_VARIABLE_NUMBER);
        let b = placer.place(&blocks::SET_VARIABLE_NUMBER);
        let mut connector = Connector::new("main");
        connector.push(
            &mut netlist,
            EmitStore::Multi(vec![
                EmitStore::Basic {
                    entry: a.before().unwrap(),
                    exits: vec![a.after().unwrap()],
                },
                EmitStore::Return,
                EmitStore::Basic {
                    entry: b.before().unwrap(),
                    exits: vec![b.after().unwrap()],
                },
            ]),
        );
        connector.finish(&mut netlist).unwrap();
        assert!(netlist.wires.is_empty());
    }
}
