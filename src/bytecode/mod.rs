/*!

  The VM uses a 64 bit big-endian word size. An instruction is a single opcode byte, optionally
  followed by one operand word:

    Opcode:    8 bits
    Operand:  64 bits (`Push` only)

  Instructions are packed without alignment or padding, so the address of an instruction is its
  byte offset from the start of the bytecode. Jump destinations are such byte offsets.

  All values on the stack and in linear memory are one word wide, whatever their logical type.
  The operand codec in `operand` fixes how each logical type is laid out inside that word.

  The opcode enum is only used for the opcode itself, not the entire instruction. Operands are
  stored already encoded, so an `Instruction` is exactly what ends up in the bytecode and the
  textual and binary forms of an instruction sequence cannot disagree.

*/

mod assembly;
mod binary;
mod instruction;
mod operand;

pub use assembly::{parse_assembly, Asm, AsmCode, AssemblyError};
pub use binary::{
  decode_bytecode, encode_instruction, instruction_size, try_decode_instruction,
  EncodedInstruction
};
pub use instruction::{Instruction, Opcode};
pub use operand::{
  decode_operand, encode_integer, encode_operand,
  DecodeError, EncodeError, Operand, OperandKind, Word, WORD_SIZE
};
