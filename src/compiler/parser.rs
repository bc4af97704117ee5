/*!

This module parses Koa source code.

The language is given by the following EBNF:
```text
<contract>   ::= 'contract' '{' <function>* '}'
<function>   ::= 'func' <ident> '(' <params>? ')' <type>? <block>
<params>     ::= <param> (',' <param>)*
<param>      ::= <ident> <type>
<type>       ::= 'int' | 'bool' | 'string'
<block>      ::= '{' <statement>* '}'
<statement>  ::= (<return> | <if> | <assign> | <reassign> | <expression>) ';'?
<assign>     ::= <type> <ident> '=' <expression>
<reassign>   ::= <ident> '=' <expression>
<return>     ::= 'return' <expression>?
<if>         ::= 'if' <expression> <block> ('else' <block>)?
<expression> ::= <and> ('||' <and>)*
<and>        ::= <equality> ('&&' <equality>)*
<equality>   ::= <comparison> (('==' | '!=') <comparison>)*
<comparison> ::= <sum> (('<=' | '>=' | '<' | '>') <sum>)*
<sum>        ::= <product> (('+' | '-') <product>)*
<product>    ::= <prefix> (('*' | '/' | '%') <prefix>)*
<prefix>     ::= ('!' | '-') <prefix> | <primary>
<primary>    ::= <integer> | 'true' | 'false' | <string> | <ident> | '(' <expression> ')'
<ident>      ::= [A-Za-z_] [A-Za-z0-9_]*
<string>     ::= '"' [^"]* '"'
```

Special lexical forms, which are ignored:
```text
<eol_comment> ::= '//' .* ('\n' | EOF)
<whitespace>  ::= [ \t\cr\n\lf]+
```

Binary operators are left associative. Statements may be separated by whitespace alone; the
trailing `;` is optional.

*/

use std::str::FromStr;

use nom::{
  branch::alt,
  bytes::complete::{is_not, tag},
  character::complete::{alpha1, alphanumeric1, char as one_char, digit1, multispace1, satisfy},
  combinator::{all_consuming, cut, map, map_res, not, opt, recognize, value, verify},
  multi::{many0, separated_list0},
  sequence::{delimited, pair, preceded, terminated, tuple},
  Finish, IResult
};
use string_cache::DefaultAtom;
use thiserror::Error;

use super::ast::*;

type PResult<'a, O> = IResult<&'a str, O>;

const KEYWORDS: [&str; 10] = [
  "contract", "func", "return", "if", "else", "true", "false", "int", "bool", "string"
];

#[derive(Debug, Clone, Eq, PartialEq, Error)]
#[error("parse error at line {line}, column {column}: unexpected {found}")]
pub struct ParseError {
  pub line   : usize,
  pub column : usize,
  pub found  : String,
}

impl ParseError {
  /// Locates `rest`, a suffix of `source`, as a line and column.
  fn at(source: &str, rest: &str) -> ParseError {
    let consumed = &source[..source.len() - rest.len()];
    let line     = consumed.matches('\n').count() + 1;
    let column   = consumed.len() - consumed.rfind('\n').map_or(0, |i| i + 1) + 1;
    let found    =
      match rest.split_whitespace().next() {
        Some(token) => format!("`{}`", token),
        None        => "end of input".to_string(),
      };

    ParseError { line, column, found }
  }
}

/// Parses a complete contract. Once a declaration or statement has started with its keyword
/// or type, an error inside it is reported at the offending token.
pub fn parse(source: &str) -> Result<Contract, ParseError> {
  match all_consuming(delimited(pskip, pcontract, pskip))(source).finish() {
    Ok((_, contract)) => Ok(contract),
    Err(error)        => Err(ParseError::at(source, error.input)),
  }
}

/// Parses a sequence of statements outside of any function.
pub fn parse_statements(source: &str) -> Result<StatementVec, ParseError> {
  match all_consuming(delimited(pskip, many0(pstatement), pskip))(source).finish() {
    Ok((_, statements)) => Ok(statements),
    Err(error)          => Err(ParseError::at(source, error.input)),
  }
}

// region Declarations

/// <contract> ::= 'contract' '{' <function>* '}'
fn pcontract(text: &str) -> PResult<Contract> {
  map(
    preceded(
      keyword("contract"),
      cut(delimited(symbol("{"), many0(pfunction), symbol("}")))
    ),
    |functions| Contract { functions }
  )(text)
}

/// <function> ::= 'func' <ident> '(' <params>? ')' <type>? <block>
fn pfunction(text: &str) -> PResult<Function> {
  map(
    preceded(
      keyword("func"),
      cut(tuple((
        pidentifier,
        delimited(symbol("("), separated_list0(symbol(","), pparameter), symbol(")")),
        opt(pdata_type),
        pblock
      )))
    ),
    |(name, parameters, return_type, body)| Function { name, parameters, return_type, body }
  )(text)
}

/// <param> ::= <ident> <type>
fn pparameter(text: &str) -> PResult<Parameter> {
  map(pair(pidentifier, pdata_type), |(name, data_type)| Parameter { name, data_type })(text)
}

/// <type> ::= 'int' | 'bool' | 'string'
fn pdata_type(text: &str) -> PResult<DataType> {
  map_res(
    alt((keyword("int"), keyword("bool"), keyword("string"))),
    DataType::from_str
  )(text)
}

// endregion

// region Statements

/// <block> ::= '{' <statement>* '}'
fn pblock(text: &str) -> PResult<StatementVec> {
  delimited(symbol("{"), many0(pstatement), cut(symbol("}")))(text)
}

fn pstatement(text: &str) -> PResult<Statement> {
  terminated(
    alt((preturn, pif, passign, preassign, map(pexpression, Statement::Expression))),
    opt(symbol(";"))
  )(text)
}

/// <return> ::= 'return' <expression>?
fn preturn(text: &str) -> PResult<Statement> {
  map(preceded(keyword("return"), opt(pexpression)), Statement::Return)(text)
}

/// <if> ::= 'if' <expression> <block> ('else' <block>)?
fn pif(text: &str) -> PResult<Statement> {
  map(
    preceded(
      keyword("if"),
      cut(tuple((
        pexpression,
        pblock,
        opt(preceded(keyword("else"), cut(pblock)))
      )))
    ),
    |(condition, consequence, alternative)| Statement::If { condition, consequence, alternative }
  )(text)
}

/// <assign> ::= <type> <ident> '=' <expression>
fn passign(text: &str) -> PResult<Statement> {
  map(
    pair(pdata_type, cut(tuple((pidentifier, passign_operator, pexpression)))),
    |(data_type, (name, _, value))| Statement::Assign { data_type, name, value }
  )(text)
}

/// <reassign> ::= <ident> '=' <expression>
fn preassign(text: &str) -> PResult<Statement> {
  map(
    tuple((pidentifier, passign_operator, pexpression)),
    |(name, _, value)| Statement::Reassign { name, value }
  )(text)
}

/// A single `=`, which must not be the start of `==`.
fn passign_operator(text: &str) -> PResult<&str> {
  ws(terminated(tag("="), not(one_char('='))))(text)
}

// endregion

// region Expressions

/// Folds `first (operator operand)*` into a left associative tree.
fn fold_infix((first, rest): (Expression, Vec<(InfixOperator, Expression)>)) -> Expression {
  rest.into_iter()
      .fold(first, |left, (operator, right)| Expression::infix(left, operator, right))
}

/// <expression> ::= <and> ('||' <and>)*
fn pexpression(text: &str) -> PResult<Expression> {
  map(
    pair(pand, many0(pair(value(InfixOperator::Or, symbol("||")), pand))),
    fold_infix
  )(text)
}

/// <and> ::= <equality> ('&&' <equality>)*
fn pand(text: &str) -> PResult<Expression> {
  map(
    pair(pequality, many0(pair(value(InfixOperator::And, symbol("&&")), pequality))),
    fold_infix
  )(text)
}

/// <equality> ::= <comparison> (('==' | '!=') <comparison>)*
fn pequality(text: &str) -> PResult<Expression> {
  let operator = alt((
    value(InfixOperator::Equal,    symbol("==")),
    value(InfixOperator::NotEqual, symbol("!=")),
  ));
  map(pair(pcomparison, many0(pair(operator, pcomparison))), fold_infix)(text)
}

/// <comparison> ::= <sum> (('<=' | '>=' | '<' | '>') <sum>)*
fn pcomparison(text: &str) -> PResult<Expression> {
  let operator = alt((
    value(InfixOperator::LessThanOrEqual,    symbol("<=")),
    value(InfixOperator::GreaterThanOrEqual, symbol(">=")),
    value(InfixOperator::LessThan,           symbol("<")),
    value(InfixOperator::GreaterThan,        symbol(">")),
  ));
  map(pair(psum, many0(pair(operator, psum))), fold_infix)(text)
}

/// <sum> ::= <product> (('+' | '-') <product>)*
fn psum(text: &str) -> PResult<Expression> {
  let operator = alt((
    value(InfixOperator::Plus,  symbol("+")),
    value(InfixOperator::Minus, symbol("-")),
  ));
  map(pair(pproduct, many0(pair(operator, pproduct))), fold_infix)(text)
}

/// <product> ::= <prefix> (('*' | '/' | '%') <prefix>)*
fn pproduct(text: &str) -> PResult<Expression> {
  let operator = alt((
    value(InfixOperator::Asterisk, symbol("*")),
    value(InfixOperator::Slash,    symbol("/")),
    value(InfixOperator::Percent,  symbol("%")),
  ));
  map(pair(pprefix, many0(pair(operator, pprefix))), fold_infix)(text)
}

/// <prefix> ::= ('!' | '-') <prefix> | <primary>
fn pprefix(text: &str) -> PResult<Expression> {
  let operator = alt((
    value(PrefixOperator::Not,   terminated(symbol("!"), not(one_char('=')))),
    value(PrefixOperator::Minus, symbol("-")),
  ));
  alt((
    // The magnitude of `i64::MIN` is not itself an `i64`.
    value(
      Expression::Integer(i64::MIN),
      preceded(symbol("-"), ws(terminated(tag("9223372036854775808"), not(satisfy(is_identifier_char)))))
    ),
    map(pair(operator, pprefix), |(operator, right)| Expression::prefix(operator, right)),
    pprimary
  ))(text)
}

/// <primary> ::= <integer> | 'true' | 'false' | <string> | <ident> | '(' <expression> ')'
fn pprimary(text: &str) -> PResult<Expression> {
  alt((
    map(ws(map_res(pdigits, |digits: &str| digits.parse::<i64>())), Expression::Integer),
    value(Expression::Boolean(true),  keyword("true")),
    value(Expression::Boolean(false), keyword("false")),
    map(ws(pstring), |text: &str| Expression::Text(text.to_string())),
    map(pidentifier, Expression::Identifier),
    delimited(symbol("("), pexpression, symbol(")"))
  ))(text)
}

/// <string> ::= '"' [^"]* '"'
fn pstring(text: &str) -> PResult<&str> {
  delimited(one_char('"'), map(opt(is_not("\"")), |out| out.unwrap_or("")), one_char('"'))(text)
}

// endregion

// region Lexical forms

/// <ident> ::= [A-Za-z_] [A-Za-z0-9_]*, excluding keywords
fn pidentifier(text: &str) -> PResult<DefaultAtom> {
  map(
    ws(verify(
      recognize(pair(alt((alpha1, tag("_"))), many0(alt((alphanumeric1, tag("_")))))),
      |name: &str| !KEYWORDS.contains(&name)
    )),
    |name: &str| DefaultAtom::from(name)
  )(text)
}

/// A run of digits, which must not run into an identifier.
fn pdigits(text: &str) -> PResult<&str> {
  terminated(digit1, not(satisfy(is_identifier_char)))(text)
}

fn is_identifier_char(c: char) -> bool {
  c.is_ascii_alphanumeric() || c == '_'
}

/// A keyword, which must not be the prefix of a longer identifier.
fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> PResult<'a, &'a str> {
  ws(terminated(tag(word), not(satisfy(is_identifier_char))))
}

fn symbol<'a>(token: &'static str) -> impl FnMut(&'a str) -> PResult<'a, &'a str> {
  ws(tag(token))
}

fn ws<'a, F, O>(inner: F) -> impl FnMut(&'a str) -> PResult<'a, O>
  where
  F: FnMut(&'a str) -> PResult<'a, O>,
{
  delimited(pskip, inner, pskip)
}

fn pskip(text: &str) -> PResult<()> {
  value((), many0(alt((value((), multispace1), peol_comment))))(text)
}

/// <eol_comment> ::= '//' [^\n\r]*
fn peol_comment(text: &str) -> PResult<()> {
  value((), pair(tag("//"), opt(is_not("\n\r"))))(text)
}

// endregion


#[cfg(test)]
mod tests {
  use super::*;

  fn ident(name: &str) -> Expression {
    Expression::identifier(name)
  }

  #[test]
  fn parses_a_contract() {
    let source = "
      contract {
        // Adds two numbers.
        func add(a int, b int) int {
          int c = a + b
          return c
        }

        func greet() string { return \"hi\"; }
      }
    ";
    let contract = parse(source).unwrap();

    assert_eq!(contract.functions.len(), 2);
    let add = &contract.functions[0];
    assert_eq!(&*add.name, "add");
    assert_eq!(
      add.parameters,
      vec![
        Parameter { name: DefaultAtom::from("a"), data_type: DataType::Int },
        Parameter { name: DefaultAtom::from("b"), data_type: DataType::Int },
      ]
    );
    assert_eq!(add.return_type, Some(DataType::Int));
    assert_eq!(
      add.body,
      vec![
        Statement::Assign {
          data_type : DataType::Int,
          name      : DefaultAtom::from("c"),
          value     : Expression::infix(ident("a"), InfixOperator::Plus, ident("b")),
        },
        Statement::Return(Some(ident("c"))),
      ]
    );
    assert_eq!(
      contract.functions[1].body,
      vec![Statement::Return(Some(Expression::Text("hi".to_string())))]
    );
  }

  #[test]
  fn respects_precedence_and_associativity() {
    let statements = parse_statements("1 + 2 * 3 - 4 == 3 || !done && -x < 0").unwrap();
    assert_eq!(
      statements[0].to_string(),
      "((((1 + (2 * 3)) - 4) == 3) || ((!done) && ((-x) < 0)))"
    );
  }

  #[test]
  fn distinguishes_assignment_from_equality() {
    let statements = parse_statements("a = 1  a == 1  a != 1").unwrap();
    assert_eq!(
      statements,
      vec![
        Statement::Reassign { name: DefaultAtom::from("a"), value: Expression::Integer(1) },
        Statement::Expression(Expression::infix(ident("a"), InfixOperator::Equal, Expression::Integer(1))),
        Statement::Expression(Expression::infix(ident("a"), InfixOperator::NotEqual, Expression::Integer(1))),
      ]
    );
  }

  #[test]
  fn keywords_are_not_identifiers() {
    let statements = parse_statements("integer = 1; int x = integer").unwrap();
    assert_eq!(statements.len(), 2);
    assert!(parse_statements("int = 1").is_err());
  }

  #[test]
  fn parses_if_else() {
    let statements = parse_statements("if (a > 1) { return true } else { return }").unwrap();
    assert_eq!(
      statements,
      vec![Statement::If {
        condition   : Expression::infix(ident("a"), InfixOperator::GreaterThan, Expression::Integer(1)),
        consequence : vec![Statement::Return(Some(Expression::Boolean(true)))],
        alternative : Some(vec![Statement::Return(None)]),
      }]
    );
  }

  #[test]
  fn reports_the_error_position() {
    let error = parse("contract {\n  func f() {\n    int = 3\n  }\n}").unwrap_err();
    assert_eq!(error, ParseError { line: 3, column: 9, found: "`=`".to_string() });
    assert_eq!(error.to_string(), "parse error at line 3, column 9: unexpected `=`");

    let error = parse("contract {\n  func f( { }\n}").unwrap_err();
    assert_eq!((error.line, error.column), (2, 11));

    let error = parse_statements("if ok { return 1 ").unwrap_err();
    assert_eq!(error.found, "end of input");

    assert!(parse("").is_err());
    assert!(parse("contract { } trailing").is_err());
  }

  #[test]
  fn integers_do_not_run_into_identifiers() {
    assert!(parse_statements("1abc").is_err());
    assert_eq!(parse_statements("1 abc").map(|statements| statements.len()), Ok(2));
  }

  #[test]
  fn accepts_the_full_integer_range() {
    assert_eq!(
      parse_statements("int a = -9223372036854775808"),
      Ok(vec![Statement::Assign {
        data_type : DataType::Int,
        name      : DefaultAtom::from("a"),
        value     : Expression::Integer(i64::MIN),
      }])
    );
    assert_eq!(
      parse_statements("9223372036854775807").map(|statements| statements[0].to_string()),
      Ok("9223372036854775807".to_string())
    );
    assert_eq!(
      parse_statements("-1").map(|statements| statements[0].to_string()),
      Ok("(-1)".to_string())
    );
    assert!(parse_statements("9223372036854775808").is_err());
    assert!(parse_statements("-92233720368547758080").is_err());
  }

  #[test]
  fn accepts_an_empty_contract() {
    assert_eq!(parse("contract {}"), Ok(Contract::default()));
  }
}
