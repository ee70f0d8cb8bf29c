// Compiling
mod parser;
pub use parser::{compile, Compiler};
mod air;
pub use air::{Air, Program};
mod error;
mod lexer;
mod symbol;
pub mod word;

// Running
mod device;
pub use device::{Buffered, Console, Device};
mod memory;
pub use memory::Memory;
mod runtime;
pub use runtime::{Processor, Registers, RuntimeError, Snapshot, Status};
#[macro_use]
mod output;
pub use output::Output;
mod debugger;
pub use debugger::{Debugger, DebuggerOptions};

pub mod env;
pub mod loader;

/// Amount of lines to show as context, each side of focus line (line containing span).
pub const DIAGNOSTIC_CONTEXT_LINES: usize = 8;
