use thiserror::Error;

use crate::tokenizer::Token;

#[derive(Error, Debug)]
pub enum Error {
    #[error("io error: {0}")]
    IO(#[from] std::io::Error),
    #[error("lexical error (line {line}, col {column}, text '{text}'): {kind}")]
    Lexical {
        line: usize,
        column: usize,
        text: String,
        kind: LexicalErrorKind,
    },
    #[error("syntax error (line {line}, col {column}, token '{token}'): expected {expected}")]
    Syntax {
        line: usize,
        column: usize,
        token: String,
        expected: String,
    },
    #[error("syntax error (line {line}, col {column}): nesting deeper than {limit} levels")]
    NestingDepth {
        line: usize,
        column: usize,
        limit: usize,
    },
    #[error("identifier not bound: {0}")]
    UnboundIdentifier(String),
    #[error("identifier redefined in local scope: {0}")]
    DuplicateBinding(String),
    #[error("cannot assign to constant: {0}")]
    ConstantAssignment(String),
    #[error("invalid operands to '{operator}': must have type {expected}")]
    OperatorType { operator: String, expected: String },
    #[error("property '{property}' not found in object '{object}'")]
    PropertyNotFound { object: String, property: String },
    #[error("property '{target}' does not accept values of type '{type_name}'")]
    PropertyAssignment { target: String, type_name: String },
    #[error("function '{name}' expects {expected} argument(s) but got {found}")]
    Arity {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("call to '{name}' exceeds the maximum call depth of {limit}")]
    CallDepth { name: String, limit: usize },
    #[error("unable to wrap native value of type '{0}'")]
    Conversion(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("arithmetic overflow in '{0}'")]
    Overflow(String),
    #[error("{0} produced no value")]
    NoValue(String),
    #[error("internal interpreter error: {0}")]
    Internal(String),
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexicalErrorKind {
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("unexpected character")]
    UnexpectedCharacter,
    #[error("number literal out of range")]
    NumberOutOfRange,
}

pub type Result<T> = std::result::Result<T, Error>;

pub fn syntax_error<T>(token: &Token, expected: impl Into<String>) -> Result<T> {
    Err(Error::Syntax {
        line: token.line,
        column: token.column,
        token: token.lexeme().to_string(),
        expected: expected.into(),
    })
}

pub fn operator_type_error<T>(operator: &str, expected: &str) -> Result<T> {
    Err(Error::OperatorType {
        operator: operator.to_string(),
        expected: expected.to_string(),
    })
}
