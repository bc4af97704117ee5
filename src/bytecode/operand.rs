/*!
  Encoding and decoding of instruction operands.

  Every operand occupies exactly one 64 bit word in the bytecode, whatever its logical type.
  The justification of the payload inside the word depends on the kind of the operand:

    Boolean: `00 00 00 00 00 00 00 0b`, where `b` is `1` for true.
    Text:    the bytes of the string starting at index 0, trailing bytes zero filled.
    Integer: big-endian two's complement.
    Bytes:   the bytes right justified, leading bytes zero filled.

  Note that text and raw bytes are justified in opposite directions.
*/

use std::fmt::{Display, Formatter};

use strum_macros::Display as StrumDisplay;
use thiserror::Error;

use super::Opcode;

pub const WORD_SIZE: usize = 8;

/// The unit exchanged between the translator and the final byte stream.
pub type Word = [u8; WORD_SIZE];

/// A single typed value attached to an instruction.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub enum Operand {
  Boolean(bool),
  Text(String),
  Integer(i64),
  Bytes(Vec<u8>),
}

#[derive(StrumDisplay, Clone, Copy, Eq, PartialEq, Debug, Hash)]
pub enum OperandKind {
  #[strum(serialize = "boolean")]
  Boolean,
  #[strum(serialize = "text")]
  Text,
  #[strum(serialize = "integer")]
  Integer,
  #[strum(serialize = "bytes")]
  Bytes,
}

#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum EncodeError {
  #[error("length of a {kind} operand must not exceed 8 bytes, but {value} is {length} bytes")]
  Oversize {
    kind   : OperandKind,
    length : usize,
    value  : Operand,
  },
}

#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum DecodeError {
  #[error("word 0x{} is not a boolean", hex::encode(.0))]
  NotBoolean(Word),

  #[error("word 0x{} is not valid text", hex::encode(.0))]
  InvalidText(Word),

  #[error("unknown opcode 0x{byte:02x} at byte {position}")]
  UnknownOpcode {
    position : usize,
    byte     : u8,
  },

  #[error("no instruction at byte {0}")]
  OutOfBounds(usize),

  #[error("{opcode} at byte {position} is missing its operand")]
  Truncated {
    position : usize,
    opcode   : Opcode,
  },
}

impl Operand {
  pub fn kind(&self) -> OperandKind {
    match self {
      Operand::Boolean(_) => OperandKind::Boolean,
      Operand::Text(_)    => OperandKind::Text,
      Operand::Integer(_) => OperandKind::Integer,
      Operand::Bytes(_)   => OperandKind::Bytes,
    }
  }
}

impl Display for Operand {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      Operand::Boolean(value) => write!(f, "{}", value),
      Operand::Text(text)     => write!(f, "{:?}", text),
      Operand::Integer(value) => write!(f, "{}", value),
      Operand::Bytes(bytes)   => write!(f, "0x{}", hex::encode(bytes)),
    }
  }
}

// region Conversions

impl From<bool> for Operand {
  fn from(value: bool) -> Self {
    Operand::Boolean(value)
  }
}

impl From<i64> for Operand {
  fn from(value: i64) -> Self {
    Operand::Integer(value)
  }
}

impl From<&str> for Operand {
  fn from(text: &str) -> Self {
    Operand::Text(text.to_string())
  }
}

impl From<String> for Operand {
  fn from(text: String) -> Self {
    Operand::Text(text)
  }
}

impl From<Vec<u8>> for Operand {
  fn from(bytes: Vec<u8>) -> Self {
    Operand::Bytes(bytes)
  }
}

impl From<&[u8]> for Operand {
  fn from(bytes: &[u8]) -> Self {
    Operand::Bytes(bytes.to_vec())
  }
}

// endregion

/// Integers always occupy the full word, so this cannot fail.
pub fn encode_integer(value: i64) -> Word {
  value.to_be_bytes()
}

/**
  Encodes the operand into a single word. Text and byte sequences longer than `WORD_SIZE`
  are rejected; there is no truncation.
*/
pub fn encode_operand(operand: &Operand) -> Result<Word, EncodeError> {
  let mut word: Word = [0; WORD_SIZE];

  match operand {

    Operand::Boolean(value) => {
      word[WORD_SIZE - 1] = *value as u8;
    }

    Operand::Integer(value) => {
      word = encode_integer(*value);
    }

    Operand::Text(text) => {
      let bytes = text.as_bytes();
      check_length(operand, bytes.len())?;
      word[..bytes.len()].copy_from_slice(bytes);
    }

    Operand::Bytes(bytes) => {
      check_length(operand, bytes.len())?;
      word[WORD_SIZE - bytes.len()..].copy_from_slice(bytes);
    }

  }

  Ok(word)
}

fn check_length(operand: &Operand, length: usize) -> Result<(), EncodeError> {
  match length > WORD_SIZE {
    true  => Err(EncodeError::Oversize { kind: operand.kind(), length, value: operand.clone() }),
    false => Ok(())
  }
}

/**
  Decodes a word as an operand of the given kind, applying the inverse justification rule.

  The zero padding is not recorded in the word, so text loses trailing NUL bytes and byte
  sequences lose leading zero bytes.
*/
pub fn decode_operand(word: &Word, kind: OperandKind) -> Result<Operand, DecodeError> {
  match kind {

    OperandKind::Boolean => {
      let (padding, last) = word.split_at(WORD_SIZE - 1);
      match (padding.iter().all(|b| *b == 0), last[0]) {
        (true, 0) => Ok(Operand::Boolean(false)),
        (true, 1) => Ok(Operand::Boolean(true)),
        _         => Err(DecodeError::NotBoolean(*word))
      }
    }

    OperandKind::Integer => Ok(Operand::Integer(i64::from_be_bytes(*word))),

    OperandKind::Text => {
      let end = word.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
      String::from_utf8(word[..end].to_vec())
        .map(Operand::Text)
        .map_err(|_| DecodeError::InvalidText(*word))
    }

    OperandKind::Bytes => {
      let start = word.iter().position(|b| *b != 0).unwrap_or(WORD_SIZE);
      Ok(Operand::Bytes(word[start..].to_vec()))
    }

  }
}
