/*!
  The human readable textual form of bytecode is called assembly. This module holds the ordered
  instruction sequence produced by the translator, renders it as assembly text and as raw
  bytecode, and parses assembly text back into an instruction sequence. Opcode names come from
  the `strum` derives on `Opcode`.

  One instruction is written per line. Everything after a `%` is a note, which the translator
  uses to record the logical value of an operand or the purpose of an instruction:
  ```text
  Push 0x0000000000000005       % 5
  Push 0x0000000000000008       % size of a
  Push 0x0000000000000000       % offset of a
  Mstore
  ```
  Operands may be written as `0x` followed by up to 16 hex digits or as a signed decimal integer.
*/

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use nom::{
  branch::alt,
  bytes::complete::{tag, take_while_m_n},
  character::complete::{alpha1, char as one_char, digit1, space0, space1},
  combinator::{all_consuming, map_res, opt, recognize},
  sequence::{delimited, pair, preceded},
  IResult
};
use thiserror::Error;

use super::{
  decode_bytecode, encode_instruction, encode_integer, instruction_size,
  DecodeError, Instruction, Opcode, Word
};

#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum AssemblyError {
  #[error("Error on line {line}: {name} is not an operation.")]
  NotAnOperation {
    line : usize,
    name : String
  },

  #[error("Error on line {line}: {opcode} requires {expected} operands but was given {given}.")]
  WrongArity {
    line     : usize,
    opcode   : Opcode,
    expected : usize,
    given    : usize
  },

  #[error("Error on line {line}: could not parse `{text}`.")]
  Malformed {
    line : usize,
    text : String
  },
}

/// An instruction together with its optional note.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AsmCode {
  pub instruction : Instruction,
  pub note        : Option<String>,
}

/// The ordered instruction sequence of a compilation.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Asm {
  codes : Vec<AsmCode>,
  size  : usize, // Size of the encoded sequence in bytes
}

impl Asm {
  pub fn new() -> Asm {
    Asm::default()
  }

  /// Disassembles raw bytecode. The result carries no notes.
  pub fn from_bytecode(code: &[u8]) -> Result<Asm, DecodeError> {
    let mut asm = Asm::new();
    for instruction in decode_bytecode(code)? {
      asm.emit(instruction, None);
    }
    Ok(asm)
  }

  /// Appends an instruction and returns its index in the sequence.
  pub fn emit(&mut self, instruction: Instruction, note: Option<String>) -> usize {
    self.size += instruction_size(instruction.opcode());
    self.codes.push(AsmCode { instruction, note });
    self.codes.len() - 1
  }

  /**
    Replaces the operand of a previously emitted unary instruction. Used to fill in jump
    destinations once they are known. Returns `false` if `index` does not name a unary
    instruction.

    The size of the sequence is unchanged, so positions computed before the patch stay valid.
  */
  pub fn patch(&mut self, index: usize, operand: Word, note: Option<String>) -> bool {
    match self.codes.get_mut(index) {
      Some(AsmCode { instruction: Instruction::Unary { operand: old, .. }, note: old_note }) => {
        *old      = operand;
        *old_note = note;
        true
      }
      _ => false
    }
  }

  /// The byte offset at which the next emitted instruction will start.
  pub fn position(&self) -> usize {
    self.size
  }

  pub fn codes(&self) -> &[AsmCode] {
    &self.codes
  }

  pub fn instructions(&self) -> impl Iterator<Item = &Instruction> + '_ {
    self.codes.iter().map(|code| &code.instruction)
  }

  pub fn len(&self) -> usize {
    self.codes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.codes.is_empty()
  }

  /// Concatenates the binary form of every instruction in program order.
  pub fn to_raw_bytecode(&self) -> Vec<u8> {
    let mut code = Vec::with_capacity(self.size);
    for instruction in self.instructions() {
      encode_instruction(instruction).write_to(&mut code);
    }
    code
  }

  pub fn to_hex(&self) -> String {
    hex::encode(self.to_raw_bytecode())
  }
}

impl Display for Asm {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    for code in &self.codes {
      match &code.note {
        Some(note) => writeln!(f, "{:30}% {}", code.instruction.to_string(), note)?,
        None       => writeln!(f, "{}", code.instruction)?,
      }
    }
    Ok(())
  }
}

/// Parses assembly text into an instruction sequence, stopping at the first error.
pub fn parse_assembly(text: &str) -> Result<Asm, AssemblyError> {
  let mut asm = Asm::new();

  for (index, source_line) in text.lines().enumerate() {
    let line = index + 1;
    let (code, note) =
      match source_line.find('%') {
        Some(i) => (&source_line[..i], Some(source_line[i + 1..].trim())),
        None    => (source_line, None),
      };

    // Blank lines and lines holding only a note.
    if code.trim().is_empty() {
      continue;
    }

    let (name, operand) =
      match pinstruction(code) {
        Ok((_, parsed)) => parsed,
        Err(_)          => {
          return Err(AssemblyError::Malformed { line, text: source_line.trim().to_string() });
        }
      };

    let opcode = Opcode::from_str(name)
                   .map_err(|_| AssemblyError::NotAnOperation { line, name: name.to_string() })?;

    let instruction =
      match (opcode.arity(), operand) {
        (0, None)          => Instruction::Nullary(opcode),
        (1, Some(operand)) => Instruction::Unary { opcode, operand },
        (expected, given)  => {
          return Err(AssemblyError::WrongArity {
            line,
            opcode,
            expected,
            given: given.is_some() as usize
          });
        }
      };

    asm.emit(instruction, note.filter(|n| !n.is_empty()).map(str::to_string));
  }

  Ok(asm)
}

/// <instruction> ::= <name> (<operand>)?
fn pinstruction(text: &str) -> IResult<&str, (&str, Option<Word>)> {
  all_consuming(
    delimited(
      space0,
      pair(alpha1, opt(preceded(space1, poperand))),
      space0
    )
  )(text)
}

/// <operand> ::= '0x' <hex digit>{1,16} | '-'? <digit>+
fn poperand(text: &str) -> IResult<&str, Word> {
  alt((
    map_res(
      preceded(tag("0x"), take_while_m_n(1, 16, |c: char| c.is_ascii_hexdigit())),
      |digits: &str| u64::from_str_radix(digits, 16).map(u64::to_be_bytes)
    ),
    map_res(
      recognize(pair(opt(one_char('-')), digit1)),
      |digits: &str| digits.parse::<i64>().map(encode_integer)
    ),
  ))(text)
}


#[cfg(test)]
mod tests {
  use super::*;

  fn sample() -> Asm {
    let mut asm = Asm::new();
    asm.emit(Instruction::Unary { opcode: Opcode::Push, operand: encode_integer(5) }, Some("5".to_string()));
    asm.emit(Instruction::Unary { opcode: Opcode::Push, operand: encode_integer(8) }, Some("size of a".to_string()));
    asm.emit(Instruction::Unary { opcode: Opcode::Push, operand: encode_integer(0) }, Some("offset of a".to_string()));
    asm.emit(Instruction::Nullary(Opcode::Mstore), None);
    asm
  }

  #[test]
  fn tracks_byte_positions() {
    let asm = sample();
    assert_eq!(asm.len(), 4);
    assert_eq!(asm.position(), 28);
    assert_eq!(asm.to_raw_bytecode().len(), 28);
  }

  #[test]
  fn renders_assembly_text() {
    let text = sample().to_string();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "Push 0x0000000000000005       % 5");
    assert_eq!(lines[3], "Mstore");
  }

  #[test]
  fn renders_raw_bytecode() {
    assert_eq!(
      sample().to_hex(),
      "210000000000000005210000000000000008210000000000000000\
       23"
    );
  }

  #[test]
  fn parses_its_own_output() {
    let asm = sample();
    assert_eq!(parse_assembly(&asm.to_string()), Ok(asm));
  }

  #[test]
  fn patches_operands_in_place() {
    let mut asm = sample();
    let position = asm.position();
    assert!(asm.patch(0, encode_integer(7), None));
    assert!(!asm.patch(3, encode_integer(7), None));
    assert_eq!(asm.position(), position);
    assert_eq!(asm.codes()[0].instruction.operand(), Some(&encode_integer(7)));
  }

  #[test]
  fn accepts_hand_written_assembly() {
    let text = "
      % Store 23 at offset 8
      Push 23
      Push 0x8
      Push   8
      Mstore      % done
    ";
    let asm = parse_assembly(text).unwrap();
    assert_eq!(asm.len(), 4);
    assert_eq!(asm.codes()[0].instruction, Instruction::Unary { opcode: Opcode::Push, operand: encode_integer(23) });
    assert_eq!(asm.codes()[1].instruction, asm.codes()[2].instruction);
    assert_eq!(asm.codes()[3].note.as_deref(), Some("done"));
  }

  #[test]
  fn reports_errors_with_line_numbers() {
    assert_eq!(
      parse_assembly("Push 1\nRobert 2"),
      Err(AssemblyError::NotAnOperation { line: 2, name: "Robert".to_string() })
    );
    assert_eq!(
      parse_assembly("Mload 1"),
      Err(AssemblyError::WrongArity { line: 1, opcode: Opcode::Mload, expected: 0, given: 1 })
    );
    assert_eq!(
      parse_assembly("\nPush"),
      Err(AssemblyError::WrongArity { line: 2, opcode: Opcode::Push, expected: 1, given: 0 })
    );
    assert_eq!(
      parse_assembly("Push (1)"),
      Err(AssemblyError::Malformed { line: 1, text: "Push (1)".to_string() })
    );
  }

  #[test]
  fn disassembles_raw_bytecode() {
    let asm = sample();
    let disassembled = Asm::from_bytecode(&asm.to_raw_bytecode()).unwrap();
    assert!(disassembled.instructions().eq(asm.instructions()));
    assert!(disassembled.codes().iter().all(|code| code.note.is_none()));
  }
}
