/*!
  This module is responsible for the encoding and decoding of binary instructions.

*/
use std::convert::TryFrom;
use std::fmt::{Display, Formatter};

use super::{DecodeError, Instruction, Opcode, Word, WORD_SIZE};

/// An `Either` type for an encoded instruction, allowing the instruction to be
/// either a single opcode byte or an opcode followed by an operand word.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EncodedInstruction {
  Byte(u8),
  Wide(u8, Word)
}

impl EncodedInstruction {
  pub fn len(&self) -> usize {
    match self {
      EncodedInstruction::Byte(_)    => 1,
      EncodedInstruction::Wide(_, _) => 1 + WORD_SIZE,
    }
  }

  pub fn write_to(&self, code: &mut Vec<u8>) {
    match self {
      EncodedInstruction::Byte(opcode) => code.push(*opcode),
      EncodedInstruction::Wide(opcode, operand) => {
        code.push(*opcode);
        code.extend_from_slice(operand);
      }
    }
  }
}

impl Display for EncodedInstruction {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      EncodedInstruction::Byte(opcode)          => write!(f, "{:02x}", opcode),
      EncodedInstruction::Wide(opcode, operand) => write!(f, "{:02x}{}", opcode, hex::encode(operand)),
    }
  }
}

/// Encodes the instruction into bytecode.
pub fn encode_instruction(instruction: &Instruction) -> EncodedInstruction {
  match instruction {
    // [Opcode:8][Operand:64]
    Instruction::Unary { opcode, operand } => EncodedInstruction::Wide(opcode.code(), *operand),
    // [Opcode:8]
    Instruction::Nullary(opcode)           => EncodedInstruction::Byte(opcode.code()),
  }
}

/// Returns the size in bytes of an instruction for the corresponding opcode.
pub fn instruction_size(opcode: Opcode) -> usize {
  1 + opcode.arity() * WORD_SIZE
}

/**
  Decodes the instruction starting at `position` in `code`, returning it together with
  its size in bytes.
*/
pub fn try_decode_instruction(code: &[u8], position: usize)
  -> Result<(Instruction, usize), DecodeError>
{
  let byte = match code.get(position) {
    Some(byte) => *byte,
    None       => return Err(DecodeError::OutOfBounds(position)),
  };
  let opcode = Opcode::try_from(byte)
                 .map_err(|_| DecodeError::UnknownOpcode { position, byte })?;
  let size   = instruction_size(opcode);

  let instruction =
    match opcode.arity() {
      0 => Instruction::Nullary(opcode),
      _ => {
        let operand_bytes = code.get(position + 1..position + size)
                                .ok_or(DecodeError::Truncated { position, opcode })?;
        let mut operand: Word = [0; WORD_SIZE];
        operand.copy_from_slice(operand_bytes);
        Instruction::Unary { opcode, operand }
      }
    };

  Ok((instruction, size))
}

/// Disassembles a complete bytecode buffer.
pub fn decode_bytecode(code: &[u8]) -> Result<Vec<Instruction>, DecodeError> {
  let mut instructions = Vec::new();
  let mut position     = 0;

  while position < code.len() {
    let (instruction, size) = try_decode_instruction(code, position)?;
    instructions.push(instruction);
    position += size;
  }

  Ok(instructions)
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::bytecode::encode_integer;

  fn push(value: i64) -> Instruction {
    Instruction::Unary { opcode: Opcode::Push, operand: encode_integer(value) }
  }

  #[test]
  fn encodes_push_as_nine_bytes() {
    let encoded = encode_instruction(&push(23));
    let mut code = Vec::new();
    encoded.write_to(&mut code);

    assert_eq!(encoded.len(), 9);
    assert_eq!(code, vec![0x21, 0, 0, 0, 0, 0, 0, 0, 0x17]);
    assert_eq!(encoded.to_string(), "210000000000000017");
  }

  #[test]
  fn encodes_nullary_as_one_byte() {
    let encoded = encode_instruction(&Instruction::Nullary(Opcode::Mload));
    assert_eq!(encoded, EncodedInstruction::Byte(0x22));
    assert_eq!(instruction_size(Opcode::Mload), 1);
    assert_eq!(instruction_size(Opcode::Push), 9);
  }

  #[test]
  fn decodes_a_sequence() {
    let instructions = vec![
      push(8),
      push(0),
      Instruction::Nullary(Opcode::Mload),
      Instruction::Nullary(Opcode::Returning),
    ];
    let mut code = Vec::new();
    for instruction in &instructions {
      encode_instruction(instruction).write_to(&mut code);
    }

    assert_eq!(code.len(), 20);
    assert_eq!(decode_bytecode(&code), Ok(instructions));
  }

  #[test]
  fn rejects_unknown_opcodes() {
    assert_eq!(
      decode_bytecode(&[0x22, 0xee]),
      Err(DecodeError::UnknownOpcode { position: 1, byte: 0xee })
    );
  }

  #[test]
  fn rejects_truncated_operands() {
    assert_eq!(
      decode_bytecode(&[0x30, 0x21, 0x00, 0x01]),
      Err(DecodeError::Truncated { position: 1, opcode: Opcode::Push })
    );
  }
}
