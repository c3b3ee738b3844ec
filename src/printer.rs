//! Source-like rendering of the syntax tree. Every node implements `Display`; the output
//! parses back into the same tree. Parentheses appear only where precedence or
//! associativity requires them, so a statement never gains a leading `(` that would
//! glue it onto the previous one as a call.

use std::fmt::{self, Display, Formatter};

use crate::{
    parser::{BinaryOp, Block, Expression, IdentifierRef, Statement, UnaryOp},
    runtime::Value,
    stack::ensure_sufficient_stack,
    tokenizer::quote,
};

const INDENT: &str = "  ";

fn write_indent(f: &mut Formatter<'_>, depth: usize) -> fmt::Result {
    for _ in 0..depth {
        f.write_str(INDENT)?;
    }
    Ok(())
}

fn write_block(f: &mut Formatter<'_>, block: &Block, depth: usize) -> fmt::Result {
    for statement in &block.statements {
        write_indent(f, depth)?;
        write_statement(f, statement, depth)?;
        writeln!(f)?;
    }
    Ok(())
}

// The caller has already written the indent for the first line.
fn write_statement(f: &mut Formatter<'_>, statement: &Statement, depth: usize) -> fmt::Result {
    match statement {
        Statement::Const { name, initializer } => write!(f, "const {} = {}", name, initializer),
        Statement::Var { name, initializer } => write!(f, "var {} = {}", name, initializer),
        Statement::Set { target, value } => write!(f, "set {} = {}", target, value),
        Statement::Func { name, params, body } => {
            writeln!(f, "func {}({}) {{", name, params.join(", "))?;
            write_block(f, body, depth + 1)?;
            write_indent(f, depth)?;
            write!(f, "}}")
        }
        Statement::If {
            condition,
            then_branch,
            else_branch,
        } => {
            writeln!(f, "if {} then", condition)?;
            write_block(f, then_branch, depth + 1)?;
            if let Some(else_branch) = else_branch {
                write_indent(f, depth)?;
                writeln!(f, "else")?;
                write_block(f, else_branch, depth + 1)?;
            }
            write_indent(f, depth)?;
            write!(f, "end")
        }
        Statement::Expression(expr) => write!(f, "{}", expr),
    }
}

impl Display for Block {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write_block(f, self, 0)
    }
}

impl Display for Statement {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write_statement(f, self, 0)
    }
}

impl Display for IdentifierRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        for property in &self.properties {
            write!(f, ".{}", property)?;
        }
        Ok(())
    }
}

// Binding strength of each binary level, loosest first.
fn precedence(operator: BinaryOp) -> u8 {
    match operator {
        BinaryOp::And | BinaryOp::Or => 1,
        BinaryOp::Equal | BinaryOp::NotEqual | BinaryOp::Less | BinaryOp::Greater => 2,
        BinaryOp::Add | BinaryOp::Subtract => 3,
        BinaryOp::Multiply | BinaryOp::Divide => 4,
    }
}

fn is_left_associative(operator: BinaryOp) -> bool {
    precedence(operator) >= 3
}

// Parenthesizes a binary operand only where the parser would otherwise group it differently.
fn write_operand(
    f: &mut Formatter<'_>,
    operand: &Expression,
    parent: BinaryOp,
    is_left: bool,
) -> fmt::Result {
    let needs_parens = match operand {
        Expression::Binary { operator, .. } => {
            let (inner, outer) = (precedence(*operator), precedence(parent));
            inner < outer || (inner == outer && is_left != is_left_associative(parent))
        }
        _ => false,
    };
    if needs_parens {
        write!(f, "({})", operand)
    } else {
        write!(f, "{}", operand)
    }
}

impl Display for Expression {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        ensure_sufficient_stack(|| match self {
            Expression::Literal(Value::String(s)) => write!(f, "{}", quote(s)),
            Expression::Literal(value) => write!(f, "{}", value),
            Expression::Identifier(reference) => write!(f, "{}", reference),
            Expression::Call { name, arguments } => {
                write!(f, "{}(", name)?;
                for (i, argument) in arguments.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", argument)?;
                }
                write!(f, ")")
            }
            Expression::Unary { operator, operand } => {
                match operator {
                    UnaryOp::Plus => write!(f, "+")?,
                    UnaryOp::Negate => write!(f, "-")?,
                    UnaryOp::Not => write!(f, "not ")?,
                }
                // Unary operators bind tighter than every binary level.
                if matches!(**operand, Expression::Binary { .. }) {
                    write!(f, "({})", operand)
                } else {
                    write!(f, "{}", operand)
                }
            }
            Expression::Binary {
                left,
                operator,
                right,
            } => {
                write_operand(f, left, *operator, true)?;
                write!(f, " {} ", operator.symbol())?;
                write_operand(f, right, *operator, false)
            }
        })
    }
}
