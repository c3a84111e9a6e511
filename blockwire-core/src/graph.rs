//! Output model handed to the placer and builder.
//!
//! The emitter only decides which blocks exist, how they group into
//! segments, which literal values they carry and how their terminals are
//! wired. Coordinates are the placer's business.

use core::fmt;

use crate::error::CoreError;
use crate::types::WireType;
use crate::value::Vec3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    /// Has a `Before` execution input and an `After` execution output.
    Active,
    /// Pure data, no execution terminals.
    Passive,
    /// Data source with no inputs.
    Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalDef {
    pub name: &'static str,
    pub wire: WireType,
}

#[derive(Debug, PartialEq, Eq)]
pub struct BlockDef {
    pub name: &'static str,
    pub kind: BlockKind,
    pub inputs: &'static [TerminalDef],
    pub outputs: &'static [TerminalDef],
}

impl BlockDef {
    pub fn input_index(&self, name: &str) -> Option<usize> {
        self.inputs.iter().position(|t| t.name == name)
    }

    pub fn output_index(&self, name: &str) -> Option<usize> {
        self.outputs.iter().position(|t| t.name == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub usize);

/// A placed instance of a [`BlockDef`]. Identity is the id the placer
/// handed out.
#[derive(Debug, Clone, Copy)]
pub struct Block {
    pub id: BlockId,
    pub def: &'static BlockDef,
}

impl PartialEq for Block {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Block {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    In,
    Out,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TerminalRef {
    pub block: BlockId,
    pub direction: Direction,
    pub index: usize,
    pub wire: WireType,
}

impl Block {
    pub fn input(&self, name: &'static str) -> Result<TerminalRef, CoreError> {
        let index = self.def.input_index(name).ok_or(CoreError::UnknownTerminal {
            block: self.def.name,
            terminal: name,
        })?;
        Ok(TerminalRef {
            block: self.id,
            direction: Direction::In,
            index,
            wire: self.def.inputs[index].wire,
        })
    }

    pub fn output(&self, name: &'static str) -> Result<TerminalRef, CoreError> {
        let index = self.def.output_index(name).ok_or(CoreError::UnknownTerminal {
            block: self.def.name,
            terminal: name,
        })?;
        Ok(TerminalRef {
            block: self.id,
            direction: Direction::Out,
            index,
            wire: self.def.outputs[index].wire,
        })
    }

    /// Output by position, for blocks whose outputs follow parameter order.
    pub fn output_at(&self, index: usize) -> Result<TerminalRef, CoreError> {
        let def = self.def.outputs.get(index).ok_or_else(|| {
            CoreError::internal(format!("block '{}' has no output #{index}", self.def.name))
        })?;
        Ok(TerminalRef {
            block: self.id,
            direction: Direction::Out,
            index,
            wire: def.wire,
        })
    }

    pub fn input_at(&self, index: usize) -> Result<TerminalRef, CoreError> {
        let def = self.def.inputs.get(index).ok_or_else(|| {
            CoreError::internal(format!("block '{}' has no input #{index}", self.def.name))
        })?;
        Ok(TerminalRef {
            block: self.id,
            direction: Direction::In,
            index,
            wire: def.wire,
        })
    }

    pub fn before(&self) -> Result<TerminalRef, CoreError> {
        self.input("Before")
    }

    pub fn after(&self) -> Result<TerminalRef, CoreError> {
        self.output("After")
    }
}

/// Literal stored in one of a block's value slots.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockValue {
    Float(f32),
    Vector(Vec3),
    Rotation(Vec3),
    Text(String),
    Byte(u8),
}

impl fmt::Display for BlockValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockValue::Float(v) => write!(f, "{v}"),
            BlockValue::Vector(v) | BlockValue::Rotation(v) => write!(f, "({}, {}, {})", v.x, v.y, v.z),
            BlockValue::Text(s) => write!(f, "{s:?}"),
            BlockValue::Byte(b) => write!(f, "{b}"),
        }
    }
}

/// Receives block placement requests and grouping hints.
pub trait Placer {
    fn place(&mut self, def: &'static BlockDef) -> Block;
    fn enter_statement_block(&mut self);
    fn exit_statement_block(&mut self);
    fn enter_expression_block(&mut self);
    fn exit_expression_block(&mut self);
}

/// Receives values, wires and highlight markup for placed blocks.
pub trait Builder {
    fn set_value(&mut self, block: Block, slot: usize, value: BlockValue);
    fn connect(&mut self, from: TerminalRef, to: TerminalRef);
    fn highlight(&mut self, block: Block);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacedBlock {
    pub id: BlockId,
    pub def: &'static BlockDef,
    /// Statement block (packing group) the block was placed in.
    pub segment: usize,
    pub statement_depth: usize,
    pub expression_depth: usize,
}

/// Placer that records placement order and grouping without assigning
/// coordinates.
#[derive(Debug, Default)]
pub struct SegmentPlacer {
    blocks: Vec<PlacedBlock>,
    segment_stack: Vec<usize>,
    next_segment: usize,
    expression_depth: usize,
}

impl SegmentPlacer {
    pub fn new() -> Self {
        SegmentPlacer::default()
    }

    pub fn blocks(&self) -> &[PlacedBlock] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Number of placed blocks of the given definition.
    pub fn count(&self, def: &'static BlockDef) -> usize {
        self.blocks.iter().filter(|b| core::ptr::eq(b.def, def)).count()
    }

    pub fn find(&self, def: &'static BlockDef) -> Vec<Block> {
        self.blocks
            .iter()
            .filter(|b| core::ptr::eq(b.def, def))
            .map(|b| Block { id: b.id, def: b.def })
            .collect()
    }

    pub fn block(&self, id: BlockId) -> Option<Block> {
        self.blocks.get(id.0).map(|b| Block { id: b.id, def: b.def })
    }

    /// True when every enter had a matching exit.
    pub fn is_balanced(&self) -> bool {
        self.segment_stack.is_empty() && self.expression_depth == 0
    }
}

impl Placer for SegmentPlacer {
    fn place(&mut self, def: &'static BlockDef) -> Block {
        let id = BlockId(self.blocks.len());
        self.blocks.push(PlacedBlock {
            id,
            def,
            segment: self.segment_stack.last().copied().unwrap_or(0),
            statement_depth: self.segment_stack.len(),
            expression_depth: self.expression_depth,
        });
        Block { id, def }
    }

    fn enter_statement_block(&mut self) {
        self.next_segment += 1;
        self.segment_stack.push(self.next_segment);
    }

    fn exit_statement_block(&mut self) {
        self.segment_stack.pop();
    }

    fn enter_expression_block(&mut self) {
        self.expression_depth += 1;
    }

    fn exit_expression_block(&mut self) {
        self.expression_depth = self.expression_depth.saturating_sub(1);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wire {
    pub from: TerminalRef,
    pub to: TerminalRef,
}

/// Builder that keeps everything in memory; also checks wire types.
#[derive(Debug, Default)]
pub struct Netlist {
    pub values: Vec<(BlockId, usize, BlockValue)>,
    pub wires: Vec<Wire>,
    pub highlighted: Vec<BlockId>,
    /// Connections whose endpoints were not compatible.
    pub type_errors: Vec<Wire>,
}

impl Netlist {
    pub fn new() -> Self {
        Netlist::default()
    }

    pub fn value(&self, block: BlockId, slot: usize) -> Option<&BlockValue> {
        self.values
            .iter()
            .rev()
            .find(|(b, s, _)| *b == block && *s == slot)
            .map(|(_, _, v)| v)
    }

    pub fn wires_from(&self, from: TerminalRef) -> impl Iterator<Item = &Wire> {
        self.wires.iter().filter(move |w| w.from == from)
    }

    pub fn wires_into(&self, block: BlockId) -> impl Iterator<Item = &Wire> {
        self.wires.iter().filter(move |w| w.to.block == block)
    }

    pub fn is_connected(&self, from: TerminalRef, to: TerminalRef) -> bool {
        self.wires.iter().any(|w| w.from == from && w.to == to)
    }

    /// Execution successors of `block`, in wiring order.
    pub fn exec_successors(&self, block: BlockId) -> Vec<BlockId> {
        self.wires
            .iter()
            .filter(|w| w.from.block == block && w.from.wire == WireType::Void)
            .map(|w| w.to.block)
            .collect()
    }
}

impl Builder for Netlist {
    fn set_value(&mut self, block: Block, slot: usize, value: BlockValue) {
        self.values.push((block.id, slot, value));
    }

    fn connect(&mut self, from: TerminalRef, to: TerminalRef) {
        let wire = Wire { from, to };
        if from.direction != Direction::Out
            || to.direction != Direction::In
            || !WireType::can_connect(from.wire, to.wire)
        {
            self.type_errors.push(wire);
        }
        self.wires.push(wire);
    }

    fn highlight(&mut self, block: Block) {
        self.highlighted.push(block.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks;

    #[test]
    fn terminals_are_looked_up_by_name() {
        let mut placer = SegmentPlacer::new();
        let block = placer.place(&blocks::IF);
        let cond = block.input("Condition").unwrap();
        assert_eq!(cond.wire, WireType::Bool);
        assert!(block.output("Missing").is_err());
    }

    #[test]
    fn netlist_flags_mismatched_wires() {
        let mut placer = SegmentPlacer::new();
        let mut netlist = Netlist::new();
        let number = placer.place(&blocks::NUMBER);
        let not = placer.place(&blocks::NOT);
        netlist.connect(number.output_at(0).unwrap(), not.input_at(0).unwrap());
        assert_eq!(netlist.type_errors.len(), 1);
    }

    #[test]
    fn statement_blocks_open_new_segments() {
        let mut placer = SegmentPlacer::new();
        placer.place(&blocks::NUMBER);
        placer.enter_statement_block();
        placer.place(&blocks::NUMBER);
        placer.exit_statement_block();
        assert_eq!(placer.blocks()[0].segment, 0);
        assert_eq!(placer.blocks()[1].segment, 1);
        assert!(placer.is_balanced());
    }
}
