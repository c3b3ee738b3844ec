use log::debug;
use std::rc::Rc;

use crate::{
    error::{syntax_error, Error, Result},
    runtime::Value,
    stack::ensure_sufficient_stack,
    tokenizer::{Lexer, Token, TokenKind},
};

/// Deepest nesting of statements, parentheses and unary operators the parser accepts.
pub const MAX_NESTING_DEPTH: usize = 256;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Block {
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Const {
        name: String,
        initializer: Expression,
    },
    Var {
        name: String,
        initializer: Expression,
    },
    Set {
        target: IdentifierRef,
        value: Expression,
    },
    Func {
        name: String,
        params: Vec<String>,
        body: Rc<Block>,
    },
    If {
        condition: Expression,
        then_branch: Block,
        else_branch: Option<Block>,
    },
    Expression(Expression),
}

/// A name followed by zero or more dotted property names.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentifierRef {
    pub name: String,
    pub properties: Vec<String>,
}

impl IdentifierRef {
    pub fn plain(name: impl Into<String>) -> Self {
        IdentifierRef {
            name: name.into(),
            properties: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(Value),
    Identifier(IdentifierRef),
    Call {
        name: String,
        arguments: Vec<Expression>,
    },
    Unary {
        operator: UnaryOp,
        operand: Box<Expression>,
    },
    Binary {
        left: Box<Expression>,
        operator: BinaryOp,
        right: Box<Expression>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Negate,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Equal,
    NotEqual,
    Less,
    Greater,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Equal => "=",
            BinaryOp::NotEqual => "<>",
            BinaryOp::Less => "<",
            BinaryOp::Greater => ">",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
        }
    }
}

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(lexer: Lexer<'a>) -> Self {
        Parser { lexer, depth: 0 }
    }

    pub fn parse_script(&mut self) -> Result<Block> {
        let statements = self.parse_statements(&[TokenKind::Eof])?;
        Ok(Block { statements })
    }

    fn peek(&self) -> TokenKind {
        self.lexer.following().kind
    }

    fn advance(&mut self) -> Result<Token> {
        self.lexer.advance().cloned()
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> Result<Token> {
        if self.peek() != kind {
            debug!("wanted {:?}, found {:?}", kind, self.peek());
            return syntax_error(self.lexer.following(), expected);
        }
        self.advance()
    }

    fn expect_identifier(&mut self, expected: &str) -> Result<String> {
        let token = self.expect(TokenKind::Identifier, expected)?;
        Ok(token.text.unwrap_or_default())
    }

    // Runs one recursive grammar step, failing once nesting passes the limit.
    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.depth >= MAX_NESTING_DEPTH {
            let token = self.lexer.following();
            return Err(Error::NestingDepth {
                line: token.line,
                column: token.column,
                limit: MAX_NESTING_DEPTH,
            });
        }
        self.depth += 1;
        let result = ensure_sufficient_stack(|| parse(self));
        self.depth -= 1;
        result
    }

    // Statements up to, but not including, one of the terminators.
    fn parse_statements(&mut self, terminators: &[TokenKind]) -> Result<Vec<Statement>> {
        let mut statements = Vec::new();
        while !terminators.contains(&self.peek()) {
            statements.push(self.nested(Self::parse_statement)?);
        }
        Ok(statements)
    }

    fn parse_statement(&mut self) -> Result<Statement> {
        match self.peek() {
            TokenKind::Const => {
                self.advance()?;
                let name = self.expect_identifier("identifier after 'const'")?;
                let initializer = self.parse_assignment_tail()?;
                Ok(Statement::Const { name, initializer })
            }
            TokenKind::Var => {
                self.advance()?;
                let name = self.expect_identifier("identifier after 'var'")?;
                let initializer = self.parse_assignment_tail()?;
                Ok(Statement::Var { name, initializer })
            }
            TokenKind::Set => {
                self.advance()?;
                let name = self.expect_identifier("identifier after 'set'")?;
                let target = self.parse_property_path(name)?;
                let value = self.parse_assignment_tail()?;
                Ok(Statement::Set { target, value })
            }
            TokenKind::Func => self.parse_function(),
            TokenKind::If => self.parse_if(),
            TokenKind::For => syntax_error(
                self.lexer.following(),
                "a statement ('for' loops are not supported)",
            ),
            TokenKind::Identifier
            | TokenKind::Number
            | TokenKind::String
            | TokenKind::LeftParen
            | TokenKind::Plus
            | TokenKind::Minus
            | TokenKind::Not => Ok(Statement::Expression(self.parse_expression()?)),
            _ => syntax_error(self.lexer.following(), "a statement"),
        }
    }

    fn parse_assignment_tail(&mut self) -> Result<Expression> {
        self.expect(TokenKind::Equal, "'=' after assignment target")?;
        self.parse_expression()
    }

    fn parse_function(&mut self) -> Result<Statement> {
        self.advance()?;
        let name = self.expect_identifier("identifier after 'func'")?;
        self.expect(TokenKind::LeftParen, "'(' after function name")?;

        let mut params = Vec::new();
        if self.peek() != TokenKind::RightParen {
            loop {
                params.push(self.expect_identifier("parameter name")?);
                if self.peek() != TokenKind::Comma {
                    break;
                }
                self.advance()?;
            }
        }
        self.expect(TokenKind::RightParen, "')' after parameters")?;

        self.expect(TokenKind::LeftBrace, "'{' before function body")?;
        let statements = self.parse_statements(&[TokenKind::RightBrace, TokenKind::Eof])?;
        self.expect(TokenKind::RightBrace, "'}' after function body")?;

        Ok(Statement::Func {
            name,
            params,
            body: Rc::new(Block { statements }),
        })
    }

    fn parse_if(&mut self) -> Result<Statement> {
        self.advance()?;
        let condition = self.parse_expression()?;
        self.expect(TokenKind::Then, "'then' after condition")?;

        let statements =
            self.parse_statements(&[TokenKind::Else, TokenKind::End, TokenKind::Eof])?;
        let then_branch = Block { statements };

        let else_branch = if self.peek() == TokenKind::Else {
            self.advance()?;
            let statements = self.parse_statements(&[TokenKind::End, TokenKind::Eof])?;
            Some(Block { statements })
        } else {
            None
        };
        self.expect(TokenKind::End, "'end' to close 'if'")?;

        Ok(Statement::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn parse_property_path(&mut self, name: String) -> Result<IdentifierRef> {
        let mut properties = Vec::new();
        while self.peek() == TokenKind::Dot {
            self.advance()?;
            properties.push(self.expect_identifier("identifier after '.'")?);
        }
        Ok(IdentifierRef { name, properties })
    }

    pub fn parse_expression(&mut self) -> Result<Expression> {
        self.nested(Self::parse_boolean)
    }

    fn parse_boolean(&mut self) -> Result<Expression> {
        let left = self.parse_equality()?;
        let operator = match self.peek() {
            TokenKind::And => BinaryOp::And,
            TokenKind::Or => BinaryOp::Or,
            _ => return Ok(left),
        };
        self.advance()?;
        let right = self.nested(Self::parse_boolean)?;
        Ok(binary(left, operator, right))
    }

    fn parse_equality(&mut self) -> Result<Expression> {
        let left = self.parse_additive()?;
        let operator = match self.peek() {
            TokenKind::Equal => BinaryOp::Equal,
            TokenKind::NotEqual => BinaryOp::NotEqual,
            TokenKind::Less => BinaryOp::Less,
            TokenKind::Greater => BinaryOp::Greater,
            _ => return Ok(left),
        };
        self.advance()?;
        let right = self.nested(Self::parse_equality)?;
        Ok(binary(left, operator, right))
    }

    fn parse_additive(&mut self) -> Result<Expression> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let operator = match self.peek() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Subtract,
                _ => return Ok(left),
            };
            self.advance()?;
            let right = self.parse_multiplicative()?;
            left = binary(left, operator, right);
        }
    }

    fn parse_multiplicative(&mut self) -> Result<Expression> {
        let mut left = self.parse_unary()?;
        loop {
            let operator = match self.peek() {
                TokenKind::Star => BinaryOp::Multiply,
                TokenKind::Slash => BinaryOp::Divide,
                _ => return Ok(left),
            };
            self.advance()?;
            let right = self.parse_unary()?;
            left = binary(left, operator, right);
        }
    }

    fn parse_unary(&mut self) -> Result<Expression> {
        let operator = match self.peek() {
            TokenKind::Plus => UnaryOp::Plus,
            TokenKind::Minus => UnaryOp::Negate,
            TokenKind::Not => UnaryOp::Not,
            _ => return self.parse_atomic(),
        };
        self.advance()?;
        let operand = self.nested(Self::parse_unary)?;
        Ok(Expression::Unary {
            operator,
            operand: Box::new(operand),
        })
    }

    fn parse_atomic(&mut self) -> Result<Expression> {
        match self.peek() {
            TokenKind::LeftParen => {
                self.advance()?;
                let expr = self.parse_expression()?;
                self.expect(TokenKind::RightParen, "')' after expression")?;
                Ok(expr)
            }
            TokenKind::Identifier => {
                let name = self.advance()?.text.unwrap_or_default();
                if self.peek() == TokenKind::LeftParen {
                    self.parse_call(name)
                } else {
                    Ok(Expression::Identifier(self.parse_property_path(name)?))
                }
            }
            TokenKind::Number => {
                let token = self.advance()?;
                match token.as_number() {
                    Some(n) => Ok(Expression::Literal(Value::Number(n))),
                    None => syntax_error(&token, "a decimal number"),
                }
            }
            TokenKind::String => {
                let token = self.advance()?;
                Ok(Expression::Literal(Value::String(
                    token.text.unwrap_or_default(),
                )))
            }
            _ => syntax_error(self.lexer.following(), "an expression"),
        }
    }

    fn parse_call(&mut self, name: String) -> Result<Expression> {
        self.expect(TokenKind::LeftParen, "'(' in function call")?;

        let mut arguments = Vec::new();
        if self.peek() != TokenKind::RightParen {
            loop {
                arguments.push(self.parse_expression()?);
                if self.peek() != TokenKind::Comma {
                    break;
                }
                self.advance()?;
            }
        }
        self.expect(TokenKind::RightParen, "')' after arguments")?;

        Ok(Expression::Call { name, arguments })
    }
}

fn binary(left: Expression, operator: BinaryOp, right: Expression) -> Expression {
    Expression::Binary {
        left: Box::new(left),
        operator,
        right: Box::new(right),
    }
}

pub fn parse(source: &str) -> Result<Block> {
    Parser::new(Lexer::new(source)?).parse_script()
}
