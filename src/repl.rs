/*!
  An interactive shell around the compiler. Each line is compiled on its own:

   * a line starting with `contract` is compiled as a whole contract, and the artifact JSON is
     printed together with the memory layout of every function;
   * any other line is compiled as the body of a function `main`, and its assembly, raw bytecode
     and memory layout are printed.

  `exit()` leaves the shell. Errors are reported and the shell keeps reading.
*/

use std::io::{self, BufRead, Write};

use prettytable::{format as TableFormat, Table};
use string_cache::DefaultAtom;
use tracing::debug;

use crate::abi::extract_abi;
use crate::artifact::CompiledContract;
use crate::compiler::{ast::Function, parse, parse_statements, Compilation, Scope};
use crate::error::Error;

pub const PROMPT: &str = ">> ";
pub const EXIT  : &str = "exit()";

pub const BANNER: &str = "Koa interactive shell. Type `exit()` to leave.";

lazy_static! {
  static ref TABLE_DISPLAY_FORMAT: TableFormat::TableFormat =
    TableFormat::FormatBuilder::new()
      .column_separator('│')
      .borders(' ')
      .separator(
        TableFormat::LinePosition::Title,
        TableFormat::LineSeparator::new('─', '┼', ' ', ' ')
      )
      .separator(
        TableFormat::LinePosition::Bottom,
        TableFormat::LineSeparator::new('─', '┴', ' ', ' ')
      )
      .padding(1, 1)
      .build();
}

/// Reads lines from `input` until `exit()` or the end of input, writing results to `output`.
pub fn run<R: BufRead, W: Write>(input: R, output: &mut W) -> io::Result<()> {
  let mut lines = input.lines();

  loop {
    write!(output, "{}", PROMPT)?;
    output.flush()?;

    let line = match lines.next() {
      Some(line) => line?,
      None       => return Ok(()),
    };
    let line = line.trim();

    if line == EXIT {
      writeln!(output, "bye")?;
      return Ok(());
    }
    if line.is_empty() {
      continue;
    }

    match evaluate(line) {
      Ok(text)   => writeln!(output, "{}", text)?,
      Err(error) => {
        debug!(%error, "evaluation failed");
        writeln!(output, "{}", error)?
      }
    }
  }
}

/// Compiles one line of input and renders the result.
pub fn evaluate(line: &str) -> Result<String, Error> {
  let first_word = line.split(|c: char| !(c.is_ascii_alphanumeric() || c == '_')).next();

  match first_word == Some("contract") {

    true => {
      let contract    = parse(line)?;
      let compilation = Compilation::compile(&contract)?;
      let artifact    = CompiledContract::from_compilation(&compilation, extract_abi(&contract));

      let mut buffer = artifact.to_json()?;
      for scope in &compilation.scopes {
        buffer.push('\n');
        buffer.push_str(&memory_table(scope).to_string());
      }
      Ok(buffer)
    }

    false => {
      let function = Function {
        name        : DefaultAtom::from("main"),
        parameters  : Vec::new(),
        return_type : None,
        body        : parse_statements(line)?,
      };
      let compilation = Compilation::compile_function(&function)?;

      let mut buffer = format!("{}{}\n", compilation.asm, compilation.asm.to_hex());
      for scope in &compilation.scopes {
        buffer.push_str(&memory_table(scope).to_string());
      }
      Ok(buffer)
    }

  }
}

/// Lists the identifiers visible at the end of a scope with the memory they occupy.
pub fn memory_table(scope: &Scope) -> Table {
  let mut table = Table::new();
  table.set_format(*TABLE_DISPLAY_FORMAT);
  table.set_titles(row![ubr->"Memory", ubl->scope.name]);

  for (id, entry) in scope.memory.entries() {
    table.add_row(row![r->format!("[{}..{})", entry.offset, entry.offset + entry.size), id]);
  }

  table
}


#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Cursor;

  fn session(input: &str) -> String {
    let mut output = Vec::new();
    run(Cursor::new(input), &mut output).unwrap();
    String::from_utf8(output).unwrap()
  }

  #[test]
  fn compiles_statements_as_main() {
    let output = session("int a = 5 return a\nexit()\n");

    assert!(output.starts_with(PROMPT));
    assert!(output.contains("func main"));
    assert!(output.contains("Mstore"));
    assert!(output.contains("29210000000000000005"));
    assert!(output.contains("[0..8)"));
    assert!(output.trim_end().ends_with("bye"));
  }

  #[test]
  fn compiles_contracts_to_json() {
    let output = session("contract { func get() int { return 1 } }\n");

    assert!(output.contains("\"Abi\""));
    assert!(output.contains("\"RawByte\""));
    assert!(output.contains("selector of get"));
  }

  #[test]
  fn keeps_going_after_errors() {
    let output = session("return ghost\n\nbool ok = true\nexit()\nint never = 1\n");

    assert!(output.contains("`ghost` is not defined"));
    assert!(output.contains("ok"));
    assert!(!output.contains("never"));
    assert!(output.contains("bye"));
  }

  #[test]
  fn stops_at_end_of_input() {
    assert_eq!(session(""), PROMPT);
  }

  #[test]
  fn contract_prefixed_identifiers_are_statements() {
    assert!(evaluate("int contractor = 1").is_ok());
    assert!(matches!(evaluate("contractor = 1"), Err(Error::Compile(_))));
  }
}
