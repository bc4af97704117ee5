/*!
  A compiler for the Koa contract language. Source text is parsed into an abstract syntax tree,
  translated into instructions for a stack and memory based VM, and written out as annotated
  assembly and raw bytecode together with the ABI of the contract.
*/

#[macro_use] extern crate lazy_static;
#[macro_use] extern crate prettytable;

pub mod abi;
pub mod artifact;
pub mod bytecode;
pub mod compiler;
pub mod error;
pub mod repl;

pub use artifact::CompiledContract;
pub use error::Error;
