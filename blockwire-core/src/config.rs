//! Compile options.

use bitflags::bitflags;

bitflags! {
    /// Optional features of the target builder.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Capabilities: u8 {
        /// Querying a block already placed at a fixed world position.
        const BLOCK_QUERY = 1 << 0;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InlineMode {
    /// Inline what the analysis asks for.
    #[default]
    Auto,
    /// Inline every called, non-recursive user function.
    Always,
    Never,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitOptions {
    /// Reads per axis served by one cached break node before a fresh one
    /// is placed.
    pub break_vector_reuse_limit: u32,
    /// Reads of an inline variable's value terminal before the emitter
    /// reports it.
    pub inline_variable_reuse_limit: u32,
    pub capabilities: Capabilities,
}

impl Default for EmitOptions {
    fn default() -> Self {
        EmitOptions {
            break_vector_reuse_limit: 2,
            inline_variable_reuse_limit: 16,
            capabilities: Capabilities::empty(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompileOptions {
    pub inlining: InlineMode,
    pub emit: EmitOptions,
}

impl CompileOptions {
    pub fn with_inlining(mut self, inlining: InlineMode) -> Self {
        self.inlining = inlining;
        self
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.emit.capabilities = capabilities;
        self
    }
}
