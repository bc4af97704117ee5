/*!
  The front end and translator of the Koa compiler: source text is parsed into a `Contract`,
  which `Compilation::compile` translates into assembly, laying out the memory of each function
  as it goes.
*/

pub mod ast;
mod compile;
mod memory;
mod parser;
mod symboltable;

pub use compile::{Compilation, CompileError, Scope};
pub use memory::{EntryError, MemEntry, MemEntryTable, ENTRY_SIZE};
pub use parser::{parse, parse_statements, ParseError};
pub use symboltable::{Selector, SymbolTable};
