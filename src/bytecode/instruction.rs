use std::fmt::{Display, Formatter};

use num_enum::{IntoPrimitive, TryFromPrimitive};
use strum_macros::{Display as StrumDisplay, EnumString, IntoStaticStr};

use super::operand::Word;

/**
  Opcodes of the virtual machine.

  Each opcode inhabits a single byte. The numbering leaves gaps between the groups so that
  related operations can be added without renumbering deployed bytecode. `Push` is the only
  opcode followed by an operand word; everything else takes its arguments from the stack.

  Stack effects, where `a` is pushed before `b`:
  ```text
  Add, Mul, Sub, Div, Mod   a, b          -> a op b
  And, Or                   a, b          -> a op b
  LessThan .. Equal         a, b          -> a op b
  Not                       a             -> !a
  Pop                       a             ->
  Push                                    -> operand
  Mload                     size, offset  -> memory[offset..offset + size]
  Mstore                    value, size, offset ->
  LoadFunc                                -> selector of the called function
  LoadArgs                  index         -> call argument `index`
  Returning                 value         -> (returns value to the caller)
  Jump                      destination   ->
  Jumpi                     condition, destination ->
  JumpDst                                 (marks a valid jump destination)
  Exit                                    (stops execution)
  ```
*/
#[derive(
  StrumDisplay, IntoStaticStr, EnumString, TryFromPrimitive, IntoPrimitive,
  Clone,        Copy,          Eq,         PartialEq,        Debug,         Hash
)]
#[repr(u8)]
pub enum Opcode {
  // Arithmetic and logic
  Add                = 0x01,
  Mul                = 0x02,
  Sub                = 0x03,
  Div                = 0x04,
  Mod                = 0x05,
  And                = 0x06,
  Or                 = 0x07,

  // Comparison
  LessThan           = 0x10,
  GreaterThan        = 0x11,
  LessThanOrEqual    = 0x12,
  GreaterThanOrEqual = 0x13,
  Equal              = 0x14,
  Not                = 0x15,

  // Stack, memory and control flow
  Pop                = 0x20,
  Push               = 0x21,
  Mload              = 0x22,
  Mstore             = 0x23,
  LoadFunc           = 0x24,
  LoadArgs           = 0x25,
  Returning          = 0x26,
  Jump               = 0x27,
  Jumpi              = 0x28,
  JumpDst            = 0x29,
  Exit               = 0x30,
}

impl Opcode {
  pub fn code(&self) -> u8 {
    Into::<u8>::into(*self)
  }

  /// The number of operand words that follow the opcode in the bytecode.
  pub fn arity(&self) -> usize {
    match self {
      Opcode::Push => 1,
      _            => 0
    }
  }
}

/// Holds the components of an instruction, with the operand already encoded.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Instruction {
  /// [Opcode:8][Operand:64]
  Unary {
    opcode  : Opcode,
    operand : Word
  },
  /// [Opcode:8]
  Nullary(Opcode),
}

impl Instruction {
  pub fn opcode(&self) -> Opcode {
    match self {
      Instruction::Unary { opcode, .. } => *opcode,
      Instruction::Nullary(opcode)      => *opcode,
    }
  }

  pub fn operand(&self) -> Option<&Word> {
    match self {
      Instruction::Unary { operand, .. } => Some(operand),
      Instruction::Nullary(_)            => None,
    }
  }
}

impl Display for Instruction {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {

      Instruction::Unary { opcode, operand } => {
        write!(f, "{} 0x{}", opcode, hex::encode(operand))
      }

      Instruction::Nullary(opcode) => {
        write!(f, "{}", opcode)
      }

    }
  }
}


#[cfg(test)]
mod tests {
  use std::convert::TryFrom;
  use std::str::FromStr;

  use super::*;
  use crate::bytecode::encode_integer;

  #[test]
  fn opcodes_convert_to_and_from_bytes() {
    assert_eq!(Opcode::Push.code(), 0x21);
    assert_eq!(Opcode::try_from(0x23u8).ok(), Some(Opcode::Mstore));
    assert!(Opcode::try_from(0xffu8).is_err());
  }

  #[test]
  fn opcodes_convert_to_and_from_text() {
    assert_eq!(Opcode::JumpDst.to_string(), "JumpDst");
    assert_eq!(Opcode::from_str("LessThanOrEqual").ok(), Some(Opcode::LessThanOrEqual));
    assert!(Opcode::from_str("Robert").is_err());
  }

  #[test]
  fn only_push_takes_an_operand() {
    assert_eq!(Opcode::Push.arity(), 1);
    assert_eq!(Opcode::Mload.arity(), 0);
    assert_eq!(Opcode::Exit.arity(), 0);
  }

  #[test]
  fn displays_operands_as_hex_words() {
    let push = Instruction::Unary { opcode: Opcode::Push, operand: encode_integer(456) };
    assert_eq!(push.to_string(), "Push 0x00000000000001c8");
    assert_eq!(Instruction::Nullary(Opcode::Mstore).to_string(), "Mstore");
  }
}
