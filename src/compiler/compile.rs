/*!
  Functions to produce a compilation artifact from a parsed contract. Accepts a `Contract` and
  turns it into an ordered sequence of instructions, from which both the assembly text and the
  raw bytecode are rendered, together with the memory layout of every compiled scope.

  The compilation pipeline is this:
  ```text
  text -> [`parser::parse`] -> `Contract` ->⋯

  ⋯-> [`Compilation::compile`] -> `Asm` + `MemEntryTable`s ->⋯

  ⋯-> [`Asm::to_raw_bytecode`] -> bytes
  ```

  Translation is a single straight-line pass. Each construct maps to a fixed instruction
  template; the only patching is of forward jump destinations, which are emitted as `Push`
  instructions with a placeholder operand and filled in once the destination is reached. A
  `Push` has the same size whatever its operand, so patching never moves an instruction.

  The bytecode of a contract starts with a dispatcher, which compares the selector of the called
  function against each declared function and jumps to the matching entry point:
  ```text
  Push <selector of f>, LoadFunc, Equal, Push <entry of f>, Jumpi     (for each function f)
  Exit
  JumpDst, <body of f>, Exit                                          (for each function f)
  ```
*/

use std::time::Instant;

use string_cache::DefaultAtom;
use thiserror::Error;
use tracing::{debug, info, warn};
#[cfg(feature = "trace_compilation")]
use tracing::trace;

use crate::bytecode::*;
use super::ast::*;
use super::memory::{EntryError, MemEntry, MemEntryTable};
use super::symboltable::{Selector, SymbolTable};

#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum CompileError {
  #[error("in `{statement}`: {source}")]
  UndefinedReference {
    statement : String,
    source    : EntryError
  },

  #[error("in `{statement}`: {source}")]
  InvalidOperand {
    statement : String,
    source    : EncodeError
  },

  #[error("function `{0}` is declared more than once")]
  DuplicateFunction(String),
}

/// The memory layout of one compiled function.
#[derive(Clone, Debug)]
pub struct Scope {
  pub name   : DefaultAtom,
  pub memory : MemEntryTable,
}

/// A `Compilation` is the result of compiling a contract or a single function.
#[derive(Clone, Debug, Default)]
pub struct Compilation {
  pub asm     : Asm,
  // One scope per compiled function, in declaration order.
  pub scopes  : Vec<Scope>,
  // Maps function names to their entry point in the bytecode.
  pub labels  : Vec<(DefaultAtom, usize)>,
  pub symbols : SymbolTable,
}

impl Compilation {

  /// Compiles the dispatcher followed by every function of the contract.
  pub fn compile(contract: &Contract) -> Result<Compilation, CompileError> {
    let compilation_time = Instant::now();
    let mut compilation  = Compilation::default();

    for function in &contract.functions {
      if compilation.symbols.insert(function.name.clone()).is_none() {
        return Err(CompileError::DuplicateFunction(function.name.to_string()));
      }
    }

    let entry_pushes = compilation.compile_dispatcher(contract);

    for (function, push_index) in contract.functions.iter().zip(entry_pushes) {
      let entry = compilation.asm.position();
      compilation.patch_destination(push_index, entry, format!("entry of {}", function.name));
      compilation.compile_function_body(function)?;
    }

    info!(
      functions = contract.functions.len(),
      bytes     = compilation.asm.position(),
      elapsed   = ?compilation_time.elapsed(),
      "compiled contract"
    );

    Ok(compilation)
  }

  /// Compiles a single function without a dispatcher. Its entry point is byte 0.
  pub fn compile_function(function: &Function) -> Result<Compilation, CompileError> {
    let mut compilation = Compilation::default();
    compilation.symbols.insert(function.name.clone());
    compilation.compile_function_body(function)?;
    Ok(compilation)
  }

  /// Returns the memory layout of the named function.
  pub fn scope(&self, name: &str) -> Option<&Scope> {
    self.scopes.iter().find(|scope| &*scope.name == name)
  }

  pub fn entry_point(&self, name: &str) -> Option<usize> {
    self.labels
        .iter()
        .find(|(label, _)| &**label == name)
        .map(|(_, entry)| *entry)
  }

  /**
    Emits the selector comparison for every function. The entry points are not known yet, so
    the returned indices name the `Push` instructions that must be patched with them.
  */
  fn compile_dispatcher(&mut self, contract: &Contract) -> Vec<usize> {
    let mut entry_pushes = Vec::with_capacity(contract.functions.len());

    for (selector, function) in contract.functions.iter().enumerate() {
      self.push_integer(selector as Selector as i64, format!("selector of {}", function.name));
      self.emit_nullary(Opcode::LoadFunc, None);
      self.emit_nullary(Opcode::Equal, None);
      entry_pushes.push(self.push_integer(0, format!("entry of {}", function.name)));
      self.emit_nullary(Opcode::Jumpi, None);
    }
    self.emit_nullary(Opcode::Exit, Some("no function matched".to_string()));

    entry_pushes
  }

  /**
    Compiles one function into a fresh scope. Parameters are defined first, in order, and are
    copied from the call arguments into their memory slots before the body runs.
  */
  fn compile_function_body(&mut self, function: &Function) -> Result<(), CompileError> {
    let mut memory = MemEntryTable::new();

    self.labels.push((function.name.clone(), self.asm.position()));
    self.emit_nullary(Opcode::JumpDst, Some(format!("func {}", function.name)));

    for (index, parameter) in function.parameters.iter().enumerate() {
      let entry = memory.define(&parameter.name);
      self.push_integer(index as i64, format!("argument {}", index));
      self.emit_nullary(Opcode::LoadArgs, None);
      self.store(entry, &parameter.name);
    }

    self.compile_block(&mut memory, &function.body)?;
    self.emit_nullary(Opcode::Exit, Some(format!("end of {}", function.name)));

    debug!(function = %function.name, slots = memory.cursor() / super::memory::ENTRY_SIZE, "compiled function");
    self.scopes.push(Scope { name: function.name.clone(), memory });

    Ok(())
  }

  fn compile_block(&mut self, memory: &mut MemEntryTable, statements: &[Statement])
    -> Result<(), CompileError>
  {
    for statement in statements {
      self.compile_statement(memory, statement)?;
    }
    Ok(())
  }

  fn compile_statement(&mut self, memory: &mut MemEntryTable, statement: &Statement)
    -> Result<(), CompileError>
  {
    match statement {

      Statement::Assign { name, value, .. } => {
        // The value is compiled first, so `int a = a + 1` reads the previous `a`.
        self.compile_expression(memory, value, statement)?;
        if memory.is_defined(name) {
          warn!(identifier = %name, "redefinition shadows the previous definition");
        }
        let entry = memory.define(name);
        self.store(entry, name);
      }

      Statement::Reassign { name, value } => {
        self.compile_expression(memory, value, statement)?;
        let entry = Self::resolve(memory, name, statement)?;
        self.store(entry, name);
      }

      Statement::Return(Some(value)) => {
        self.compile_expression(memory, value, statement)?;
        self.emit_nullary(Opcode::Returning, None);
      }

      Statement::Return(None) => {
        self.emit_nullary(Opcode::Exit, Some("return".to_string()));
      }

      Statement::If { condition, consequence, alternative } => {
        self.compile_expression(memory, condition, statement)?;
        self.emit_nullary(Opcode::Not, None);
        let skip = self.push_integer(0, String::new());
        self.emit_nullary(Opcode::Jumpi, None);

        self.compile_block(memory, consequence)?;

        match alternative {
          Some(alternative) => {
            let exit = self.push_integer(0, String::new());
            self.emit_nullary(Opcode::Jump, None);
            self.jump_destination(skip, "else");
            self.compile_block(memory, alternative)?;
            self.jump_destination(exit, "end if");
          }
          None => self.jump_destination(skip, "end if"),
        }
      }

      Statement::Expression(expression) => {
        self.compile_expression(memory, expression, statement)?;
        self.emit_nullary(Opcode::Pop, None);
      }

    }

    Ok(())
  }

  /// Leaves the value of `expression` on top of the stack.
  fn compile_expression(&mut self, memory: &MemEntryTable, expression: &Expression,
                        statement: &Statement) -> Result<(), CompileError>
  {
    match expression {

      Expression::Integer(value) => self.push_operand(Operand::Integer(*value), statement)?,

      Expression::Boolean(value) => self.push_operand(Operand::Boolean(*value), statement)?,

      Expression::Text(text) => self.push_operand(Operand::Text(text.clone()), statement)?,

      Expression::Identifier(name) => {
        let entry = Self::resolve(memory, name, statement)?;
        self.load(entry, name);
      }

      Expression::Prefix { operator: PrefixOperator::Not, right } => {
        self.compile_expression(memory, right, statement)?;
        self.emit_nullary(Opcode::Not, None);
      }

      Expression::Prefix { operator: PrefixOperator::Minus, right } => {
        self.push_integer(0, "0".to_string());
        self.compile_expression(memory, right, statement)?;
        self.emit_nullary(Opcode::Sub, None);
      }

      Expression::Infix { left, operator, right } => {
        self.compile_expression(memory, left, statement)?;
        self.compile_expression(memory, right, statement)?;
        for opcode in infix_opcodes(*operator) {
          self.emit_nullary(*opcode, None);
        }
      }

    }

    Ok(())
  }

  fn resolve(memory: &MemEntryTable, name: &str, statement: &Statement)
    -> Result<MemEntry, CompileError>
  {
    memory.get_entry(name)
          .map_err(|source| CompileError::UndefinedReference { statement: statement.to_string(), source })
  }

  // region Emission helpers

  /// `value; Push size; Push offset; Mstore`
  fn store(&mut self, entry: MemEntry, name: &str) {
    self.push_integer(entry.size as i64,   format!("size of {}", name));
    self.push_integer(entry.offset as i64, format!("offset of {}", name));
    self.emit_nullary(Opcode::Mstore, None);
  }

  /// `Push size; Push offset; Mload`
  fn load(&mut self, entry: MemEntry, name: &str) {
    self.push_integer(entry.size as i64,   format!("size of {}", name));
    self.push_integer(entry.offset as i64, format!("offset of {}", name));
    self.emit_nullary(Opcode::Mload, None);
  }

  fn push_operand(&mut self, operand: Operand, statement: &Statement) -> Result<(), CompileError> {
    let word = encode_operand(&operand)
                 .map_err(|source| CompileError::InvalidOperand { statement: statement.to_string(), source })?;
    self.emit(Instruction::Unary { opcode: Opcode::Push, operand: word }, Some(operand.to_string()));
    Ok(())
  }

  /// Pushes an integer the compiler itself produced. Returns the index of the instruction.
  fn push_integer(&mut self, value: i64, note: String) -> usize {
    let note = match note.is_empty() {
      true  => None,
      false => Some(note)
    };
    self.emit(Instruction::Unary { opcode: Opcode::Push, operand: encode_integer(value) }, note)
  }

  /// Makes the current position the destination of the jump pushed at `push_index`.
  fn jump_destination(&mut self, push_index: usize, label: &str) {
    let destination = self.asm.position();
    self.patch_destination(push_index, destination, format!("to {}", label));
    self.emit_nullary(Opcode::JumpDst, Some(label.to_string()));
  }

  fn patch_destination(&mut self, push_index: usize, destination: usize, note: String) {
    let patched = self.asm.patch(push_index, encode_integer(destination as i64), Some(note));
    debug_assert!(patched, "instruction {} is not a push", push_index);
  }

  fn emit_nullary(&mut self, opcode: Opcode, note: Option<String>) -> usize {
    self.emit(Instruction::Nullary(opcode), note)
  }

  fn emit(&mut self, instruction: Instruction, note: Option<String>) -> usize {
    #[cfg(feature = "trace_compilation")]
    trace!(position = self.asm.position(), "{}", instruction);

    self.asm.emit(instruction, note)
  }

  // endregion
}

/// The instructions that compute `operator`, applied to the two topmost stack values.
fn infix_opcodes(operator: InfixOperator) -> &'static [Opcode] {
  match operator {
    InfixOperator::Plus               => &[Opcode::Add],
    InfixOperator::Minus              => &[Opcode::Sub],
    InfixOperator::Asterisk           => &[Opcode::Mul],
    InfixOperator::Slash              => &[Opcode::Div],
    InfixOperator::Percent            => &[Opcode::Mod],
    InfixOperator::LessThan           => &[Opcode::LessThan],
    InfixOperator::GreaterThan        => &[Opcode::GreaterThan],
    InfixOperator::LessThanOrEqual    => &[Opcode::LessThanOrEqual],
    InfixOperator::GreaterThanOrEqual => &[Opcode::GreaterThanOrEqual],
    InfixOperator::Equal              => &[Opcode::Equal],
    InfixOperator::NotEqual           => &[Opcode::Equal, Opcode::Not],
    InfixOperator::And                => &[Opcode::And],
    InfixOperator::Or                 => &[Opcode::Or],
  }
}
