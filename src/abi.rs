/*!
  The ABI of a contract describes, for every function, the name, the typed arguments and the
  output type a caller needs in order to build a call. Methods are listed in declaration order,
  so the index of a method is the selector the dispatcher compares against.

  The ABI is serialized as a bare JSON array of methods:
  ```text
  [
    {"name": "add", "arguments": [{"name": "a", "type": "int64"}, ...], "output": "int64"},
    ...
  ]
  ```
*/

use serde::{Deserialize, Serialize};
use strum_macros::Display as StrumDisplay;

use crate::compiler::ast::{Contract, DataType, Function};
use crate::compiler::Selector;

#[derive(StrumDisplay, Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Debug, Hash)]
pub enum ParamType {
  #[serde(rename = "int64")]
  #[strum(serialize = "int64")]
  Integer64,
  #[serde(rename = "bool")]
  #[strum(serialize = "bool")]
  Boolean,
  #[serde(rename = "string")]
  #[strum(serialize = "string")]
  String,
}

impl From<DataType> for ParamType {
  fn from(data_type: DataType) -> Self {
    match data_type {
      DataType::Int  => ParamType::Integer64,
      DataType::Bool => ParamType::Boolean,
      DataType::Str  => ParamType::String,
    }
  }
}

#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug)]
pub struct Argument {
  pub name       : String,
  #[serde(rename = "type")]
  pub param_type : ParamType,
}

#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug)]
pub struct Method {
  pub name      : String,
  #[serde(default)]
  pub arguments : Vec<Argument>,
  /// `None` for functions that return nothing.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub output    : Option<ParamType>,
}

#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug, Default)]
#[serde(transparent)]
pub struct Abi {
  pub methods: Vec<Method>,
}

impl Abi {
  pub fn from_json(json: &str) -> Result<Abi, serde_json::Error> {
    serde_json::from_str(json)
  }

  pub fn method(&self, name: &str) -> Option<&Method> {
    self.methods.iter().find(|method| method.name == name)
  }

  pub fn selector(&self, name: &str) -> Option<Selector> {
    self.methods
        .iter()
        .position(|method| method.name == name)
        .map(|index| index as Selector)
  }
}

pub fn extract_abi_from_function(function: &Function) -> Method {
  Method {
    name      : function.name.to_string(),
    arguments : function.parameters
                        .iter()
                        .map(|parameter| Argument {
                          name       : parameter.name.to_string(),
                          param_type : parameter.data_type.into()
                        })
                        .collect(),
    output    : function.return_type.map(ParamType::from),
  }
}

pub fn extract_abi(contract: &Contract) -> Abi {
  Abi {
    methods: contract.functions.iter().map(extract_abi_from_function).collect()
  }
}
