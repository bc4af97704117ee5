//! The abstract syntax tree of a contract.

use std::fmt::{Display, Formatter};

use string_cache::DefaultAtom;
use strum_macros::{Display as StrumDisplay, EnumString};

pub type StatementVec = Vec<Statement>;

/// The data types a value can be declared with.
#[derive(StrumDisplay, EnumString, Clone, Copy, Eq, PartialEq, Debug, Hash)]
pub enum DataType {
  #[strum(serialize = "int")]
  Int,
  #[strum(serialize = "bool")]
  Bool,
  #[strum(serialize = "string")]
  Str,
}

#[derive(StrumDisplay, Clone, Copy, Eq, PartialEq, Debug, Hash)]
pub enum PrefixOperator {
  #[strum(serialize = "!")]
  Not,
  #[strum(serialize = "-")]
  Minus,
}

#[derive(StrumDisplay, Clone, Copy, Eq, PartialEq, Debug, Hash)]
pub enum InfixOperator {
  #[strum(serialize = "+")]
  Plus,
  #[strum(serialize = "-")]
  Minus,
  #[strum(serialize = "*")]
  Asterisk,
  #[strum(serialize = "/")]
  Slash,
  #[strum(serialize = "%")]
  Percent,
  #[strum(serialize = "<")]
  LessThan,
  #[strum(serialize = ">")]
  GreaterThan,
  #[strum(serialize = "<=")]
  LessThanOrEqual,
  #[strum(serialize = ">=")]
  GreaterThanOrEqual,
  #[strum(serialize = "==")]
  Equal,
  #[strum(serialize = "!=")]
  NotEqual,
  #[strum(serialize = "&&")]
  And,
  #[strum(serialize = "||")]
  Or,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub enum Expression {
  Integer(i64),
  Boolean(bool),
  Text(String),
  /// An interned identifier.
  Identifier(DefaultAtom),
  Prefix {
    operator : PrefixOperator,
    right    : Box<Expression>
  },
  Infix {
    left     : Box<Expression>,
    operator : InfixOperator,
    right    : Box<Expression>
  },
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub enum Statement {
  /// `int a = 5` declares `a`.
  Assign {
    data_type : DataType,
    name      : DefaultAtom,
    value     : Expression
  },
  /// `a = 5` stores into an already declared `a`.
  Reassign {
    name  : DefaultAtom,
    value : Expression
  },
  Return(Option<Expression>),
  If {
    condition   : Expression,
    consequence : StatementVec,
    alternative : Option<StatementVec>
  },
  /// An expression evaluated for its side effects; its value is discarded.
  Expression(Expression),
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Parameter {
  pub name      : DefaultAtom,
  pub data_type : DataType,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Function {
  pub name        : DefaultAtom,
  pub parameters  : Vec<Parameter>,
  pub return_type : Option<DataType>,
  pub body        : StatementVec,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Default)]
pub struct Contract {
  pub functions: Vec<Function>,
}

impl Expression {
  pub fn identifier(name: &str) -> Expression {
    Expression::Identifier(DefaultAtom::from(name))
  }

  pub fn infix(left: Expression, operator: InfixOperator, right: Expression) -> Expression {
    Expression::Infix { left: Box::new(left), operator, right: Box::new(right) }
  }

  pub fn prefix(operator: PrefixOperator, right: Expression) -> Expression {
    Expression::Prefix { operator, right: Box::new(right) }
  }
}

// region Display

impl Display for Expression {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      Expression::Integer(value)                  => write!(f, "{}", value),
      Expression::Boolean(value)                  => write!(f, "{}", value),
      Expression::Text(text)                      => write!(f, "\"{}\"", text),
      Expression::Identifier(name)                => write!(f, "{}", name),
      Expression::Prefix { operator, right }      => write!(f, "({}{})", operator, right),
      Expression::Infix { left, operator, right } => write!(f, "({} {} {})", left, operator, right),
    }
  }
}

/// A helper for block statements, to keep things DRY.
fn fmt_block(f: &mut Formatter<'_>, statements: &[Statement]) -> std::fmt::Result {
  write!(f, "{{ ")?;
  for statement in statements {
    write!(f, "{}; ", statement)?;
  }
  write!(f, "}}")
}

impl Display for Statement {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {

      Statement::Assign { data_type, name, value } => {
        write!(f, "{} {} = {}", data_type, name, value)
      }

      Statement::Reassign { name, value } => write!(f, "{} = {}", name, value),

      Statement::Return(Some(value)) => write!(f, "return {}", value),

      Statement::Return(None) => write!(f, "return"),

      Statement::If { condition, consequence, alternative } => {
        write!(f, "if {} ", condition)?;
        fmt_block(f, consequence)?;
        if let Some(alternative) = alternative {
          write!(f, " else ")?;
          fmt_block(f, alternative)?;
        }
        Ok(())
      }

      Statement::Expression(expression) => write!(f, "{}", expression),

    }
  }
}

impl Display for Function {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let parameters = self.parameters
                         .iter()
                         .map(|p| format!("{} {}", p.name, p.data_type))
                         .collect::<Vec<String>>()
                         .join(", ");
    write!(f, "func {}({})", self.name, parameters)?;
    if let Some(return_type) = self.return_type {
      write!(f, " {}", return_type)?;
    }
    write!(f, " ")?;
    fmt_block(f, &self.body)
  }
}

impl Display for Contract {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    writeln!(f, "contract {{")?;
    for function in &self.functions {
      writeln!(f, "  {}", function)?;
    }
    write!(f, "}}")
  }
}

// endregion Display


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn expressions_display_fully_parenthesized() {
    let expression = Expression::infix(
      Expression::identifier("a"),
      InfixOperator::Plus,
      Expression::infix(Expression::Integer(2), InfixOperator::Asterisk, Expression::Integer(3))
    );
    assert_eq!(expression.to_string(), "(a + (2 * 3))");
    assert_eq!(
      Expression::prefix(PrefixOperator::Not, Expression::Boolean(true)).to_string(),
      "(!true)"
    );
  }

  #[test]
  fn statements_display_as_source() {
    let statement = Statement::If {
      condition   : Expression::identifier("ok"),
      consequence : vec![Statement::Return(Some(Expression::Text("yes".to_string())))],
      alternative : Some(vec![Statement::Return(None)]),
    };
    assert_eq!(statement.to_string(), "if ok { return \"yes\"; } else { return; }");
  }

  #[test]
  fn functions_display_their_signature() {
    let function = Function {
      name        : DefaultAtom::from("add"),
      parameters  : vec![
        Parameter { name: DefaultAtom::from("a"), data_type: DataType::Int },
        Parameter { name: DefaultAtom::from("b"), data_type: DataType::Int },
      ],
      return_type : Some(DataType::Int),
      body        : vec![],
    };
    assert_eq!(function.to_string(), "func add(a int, b int) int { }");
  }
}
