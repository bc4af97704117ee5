/*!
  The compiled artifact of a contract: its ABI, the annotated assembly and the raw bytecode, as
  written out by `koa compile`.
  ```text
  {
    "Abi": [...],
    "Asm": "Push 0x0000000000000000      % selector of add\n...",
    "RawByte": "2100000000000000002414..."
  }
  ```
*/

use serde::{Deserialize, Serialize};

use crate::abi::{extract_abi, Abi};
use crate::compiler::{parse, ast::Contract, Compilation, CompileError};
use crate::error::Error;

#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug)]
#[serde(rename_all = "PascalCase")]
pub struct CompiledContract {
  pub abi      : Abi,
  /// One instruction per line.
  pub asm      : String,
  /// Lowercase hex of the bytecode.
  pub raw_byte : String,
}

impl CompiledContract {

  pub fn compile(contract: &Contract) -> Result<CompiledContract, CompileError> {
    let compilation = Compilation::compile(contract)?;
    Ok(CompiledContract::from_compilation(&compilation, extract_abi(contract)))
  }

  pub fn from_compilation(compilation: &Compilation, abi: Abi) -> CompiledContract {
    CompiledContract {
      abi,
      asm      : compilation.asm.to_string(),
      raw_byte : compilation.asm.to_hex(),
    }
  }

  pub fn from_source(source: &str) -> Result<CompiledContract, Error> {
    let contract = parse(source)?;
    Ok(CompiledContract::compile(&contract)?)
  }

  pub fn to_json(&self) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(self)
  }

  pub fn bytecode(&self) -> Result<Vec<u8>, hex::FromHexError> {
    hex::decode(&self.raw_byte)
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::bytecode::Asm;

  const SOURCE: &str = "contract { func double(x int) int { return x * 2 } }";

  #[test]
  fn serializes_with_capitalized_keys() {
    let artifact = CompiledContract::from_source(SOURCE).unwrap();
    let json: serde_json::Value = serde_json::from_str(&artifact.to_json().unwrap()).unwrap();

    assert_eq!(json["Abi"][0]["name"], "double");
    assert_eq!(json["Abi"][0]["arguments"][0]["type"], "int64");
    assert_eq!(json["RawByte"], artifact.raw_byte.as_str());
    assert!(json["Asm"].as_str().map_or(false, |asm| asm.contains("selector of double")));
  }

  #[test]
  fn raw_bytes_disassemble_to_the_assembly() {
    let artifact = CompiledContract::from_source(SOURCE).unwrap();
    let disassembled = Asm::from_bytecode(&artifact.bytecode().unwrap()).unwrap();
    let instructions: Vec<String> = disassembled.instructions().map(|i| i.to_string()).collect();
    let lines: Vec<String> = artifact.asm
                                     .lines()
                                     .map(|line| line.split('%').next().unwrap_or("").trim().to_string())
                                     .collect();
    assert_eq!(instructions, lines);
  }

  #[test]
  fn reports_parse_errors() {
    match CompiledContract::from_source("contract { func }") {
      Err(Error::Parse(_)) => {}
      other => panic!("expected a parse error, got {:?}", other),
    }
  }
}
