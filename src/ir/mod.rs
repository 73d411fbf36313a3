pub mod event;
pub mod function;
pub mod insn;
pub mod output;
pub mod preamble;
pub mod program;
pub mod reader;
pub mod types;

pub use function::{FuncId, FunctionAttrs};
pub use insn::Instruction;
pub use output::{Artifacts, EventBinding, OutputRecord};
pub use program::{IrValue, Program, VarHandle};
