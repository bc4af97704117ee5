use thiserror::Error;

use crate::bytecode::{AssemblyError, DecodeError};
use crate::compiler::{CompileError, ParseError};

/// Any failure of a pipeline run through the library or the command line.
#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Parse(#[from] ParseError),

  #[error(transparent)]
  Compile(#[from] CompileError),

  #[error(transparent)]
  Assembly(#[from] AssemblyError),

  #[error(transparent)]
  Decode(#[from] DecodeError),

  #[error("invalid hex bytecode: {0}")]
  Hex(#[from] hex::FromHexError),

  #[error(transparent)]
  Json(#[from] serde_json::Error),

  #[error(transparent)]
  Io(#[from] std::io::Error),
}
