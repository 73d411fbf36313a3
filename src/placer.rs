use crate::commands::Command;
use crate::error::CompileResult;
use crate::scope::{BlockPos, Scope};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockMode {
    Impulse,
    Chain,
    Repeat,
}

impl BlockMode {
    fn block_id(self) -> &'static str {
        match self {
            BlockMode::Impulse => "minecraft:command_block",
            BlockMode::Chain => "minecraft:chain_command_block",
            BlockMode::Repeat => "minecraft:repeating_command_block",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandBlock {
    pub command: Command,
    pub conditional: bool,
    pub mode: BlockMode,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedBlock {
    pub command: String,
    pub conditional: bool,
    pub mode: BlockMode,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandSequence {
    blocks: Vec<CommandBlock>,
}

impl CommandSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_block(&mut self, block: CommandBlock) {
        self.blocks.push(block);
    }

    pub fn resolve(&self, scope: &mut Scope) -> CompileResult<Vec<ResolvedBlock>> {
        self.blocks
            .iter()
            .map(|block| {
                Ok(ResolvedBlock {
                    command: block.command.resolve(scope)?,
                    conditional: block.conditional,
                    mode: block.mode,
                })
            })
            .collect()
    }
}

/// Turns resolved command block lines into world-building commands.
pub trait Placer {
    fn place(&mut self, line: Vec<ResolvedBlock>);
    /// Commands that build everything placed so far.
    fn output(&self) -> Vec<String>;
    /// Commands that remove everything `output` built.
    fn cleanup(&self) -> Vec<String>;
}

/// Lays each line along +x, one line per z offset from the origin.
#[derive(Debug)]
pub struct LinePlacer {
    origin: BlockPos,
    lines: Vec<Vec<ResolvedBlock>>,
}

impl LinePlacer {
    pub fn new(origin: BlockPos) -> Self {
        Self {
            origin,
            lines: Vec::new(),
        }
    }

    fn positions(&self) -> impl Iterator<Item = (BlockPos, &ResolvedBlock)> {
        self.lines.iter().enumerate().flat_map(move |(z, line)| {
            line.iter()
                .enumerate()
                .map(move |(x, block)| (self.origin.offset(x as i32, 0, z as i32 + 1), block))
        })
    }
}

impl Placer for LinePlacer {
    fn place(&mut self, line: Vec<ResolvedBlock>) {
        self.lines.push(line);
    }

    fn output(&self) -> Vec<String> {
        self.positions()
            .map(|(pos, block)| {
                let command = serde_json::Value::String(block.command.clone());
                format!(
                    "setblock {pos} {}[facing=east,conditional={}]{{Command:{command},auto:1b}}",
                    block.mode.block_id(),
                    block.conditional
                )
            })
            .collect()
    }

    fn cleanup(&self) -> Vec<String> {
        self.positions()
            .map(|(pos, _)| format!("setblock {pos} minecraft:air"))
            .collect()
    }
}

impl<P: Placer + ?Sized> Placer for &mut P {
    fn place(&mut self, line: Vec<ResolvedBlock>) {
        (**self).place(line)
    }

    fn output(&self) -> Vec<String> {
        (**self).output()
    }

    fn cleanup(&self) -> Vec<String> {
        (**self).cleanup()
    }
}
