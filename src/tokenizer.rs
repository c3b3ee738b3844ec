use log::{debug, trace};
use rust_decimal::Decimal;
use std::{
    fmt::{self, Display, Formatter},
    ops::Range,
    str::FromStr,
};

use crate::error::{Error, LexicalErrorKind, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Eof,

    Identifier,
    String,
    Number,

    Comma,
    Dot,
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,

    Plus,
    Minus,
    Star,
    Slash,

    Equal,
    NotEqual,
    Less,
    Greater,

    Const,
    Var,
    Set,
    Func,
    And,
    Or,
    Not,
    If,
    Then,
    Else,
    For,
    End,
}

impl TokenKind {
    /// Source spelling of fixed tokens. Tokens that carry text have no fixed spelling.
    pub fn symbol(self) -> &'static str {
        match self {
            TokenKind::Eof => "<eof>",
            TokenKind::Identifier => "<identifier>",
            TokenKind::String => "<string>",
            TokenKind::Number => "<number>",
            TokenKind::Comma => ",",
            TokenKind::Dot => ".",
            TokenKind::LeftParen => "(",
            TokenKind::RightParen => ")",
            TokenKind::LeftBrace => "{",
            TokenKind::RightBrace => "}",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Equal => "=",
            TokenKind::NotEqual => "<>",
            TokenKind::Less => "<",
            TokenKind::Greater => ">",
            TokenKind::Const => "const",
            TokenKind::Var => "var",
            TokenKind::Set => "set",
            TokenKind::Func => "func",
            TokenKind::And => "and",
            TokenKind::Or => "or",
            TokenKind::Not => "not",
            TokenKind::If => "if",
            TokenKind::Then => "then",
            TokenKind::Else => "else",
            TokenKind::For => "for",
            TokenKind::End => "end",
        }
    }

    pub fn is_keyword(self) -> bool {
        matches!(
            self,
            TokenKind::Const
                | TokenKind::Var
                | TokenKind::Set
                | TokenKind::Func
                | TokenKind::And
                | TokenKind::Or
                | TokenKind::Not
                | TokenKind::If
                | TokenKind::Then
                | TokenKind::Else
                | TokenKind::For
                | TokenKind::End
        )
    }

    fn keyword(word: &str) -> Option<TokenKind> {
        let kind = match word {
            "const" => TokenKind::Const,
            "var" => TokenKind::Var,
            "set" => TokenKind::Set,
            "func" => TokenKind::Func,
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "not" => TokenKind::Not,
            "if" => TokenKind::If,
            "then" => TokenKind::Then,
            "else" => TokenKind::Else,
            "for" => TokenKind::For,
            "end" => TokenKind::End,
            _ => return None,
        };
        Some(kind)
    }
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub text: Option<String>,
    pub line: usize,
    pub column: usize,
    pub span: Range<usize>,
}

impl Token {
    /// The text used when reporting this token in a diagnostic.
    pub fn lexeme(&self) -> &str {
        self.text.as_deref().unwrap_or(self.kind.symbol())
    }

    pub fn as_number(&self) -> Option<Decimal> {
        match (self.kind, &self.text) {
            (TokenKind::Number, Some(text)) => decimal_from_text(text),
            _ => None,
        }
    }

    /// Renders the token back to source text that lexes to the same token.
    pub fn to_source(&self) -> String {
        match (self.kind, &self.text) {
            (TokenKind::Eof, _) => String::new(),
            (TokenKind::String, Some(text)) => quote(text),
            (_, Some(text)) => text.clone(),
            (kind, None) => kind.symbol().to_string(),
        }
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.text {
            Some(text) => write!(f, "{:?} {:?}", self.kind, text),
            None => write!(f, "{:?}", self.kind),
        }
    }
}

/// Wraps text in double quotes, doubling any embedded quote.
pub fn quote(text: &str) -> String {
    format!("\"{}\"", text.replace('"', "\"\""))
}

fn decimal_from_text(text: &str) -> Option<Decimal> {
    let trimmed = text.strip_suffix('.').unwrap_or(text);
    if trimmed.starts_with('.') {
        Decimal::from_str(&format!("0{}", trimmed)).ok()
    } else {
        Decimal::from_str(trimmed).ok()
    }
}

/// Cursor over source text holding the current token and one token of lookahead.
pub struct Lexer<'a> {
    source: &'a str,
    offset: usize,
    line: usize,
    line_start: usize,
    current: Option<Token>,
    following: Token,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Result<Self> {
        let mut lexer = Lexer {
            source,
            offset: 0,
            line: 1,
            line_start: 0,
            current: None,
            following: Token {
                kind: TokenKind::Eof,
                text: None,
                line: 1,
                column: 1,
                span: 0..0,
            },
        };
        lexer.following = lexer.scan_token()?;
        Ok(lexer)
    }

    /// The token most recently consumed, `None` before the first `advance`.
    pub fn current(&self) -> Option<&Token> {
        self.current.as_ref()
    }

    pub fn following(&self) -> &Token {
        &self.following
    }

    pub fn advance(&mut self) -> Result<&Token> {
        let next = self.scan_token()?;
        let previous = std::mem::replace(&mut self.following, next);
        Ok(self.current.insert(previous))
    }

    fn column_at(&self, offset: usize) -> usize {
        self.source[self.line_start..offset].chars().count() + 1
    }

    fn peek_char(&self) -> Option<char> {
        self.source[self.offset..].chars().next()
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek_char() {
            if !c.is_whitespace() {
                break;
            }
            self.offset += c.len_utf8();
            if c == '\n' {
                self.line += 1;
                self.line_start = self.offset;
            }
        }
    }

    fn scan_token(&mut self) -> Result<Token> {
        self.skip_whitespace();

        let start = self.offset;
        let line = self.line;
        let column = self.column_at(start);

        let Some(first) = self.peek_char() else {
            return Ok(self.make_token(TokenKind::Eof, None, start, line, column));
        };
        self.offset += first.len_utf8();

        let punctuation = match first {
            ',' => Some(TokenKind::Comma),
            '.' if !self.peek_char().is_some_and(|c| c.is_ascii_digit()) => Some(TokenKind::Dot),
            '(' => Some(TokenKind::LeftParen),
            ')' => Some(TokenKind::RightParen),
            '{' => Some(TokenKind::LeftBrace),
            '}' => Some(TokenKind::RightBrace),
            '+' => Some(TokenKind::Plus),
            '-' => Some(TokenKind::Minus),
            '*' => Some(TokenKind::Star),
            '/' => Some(TokenKind::Slash),
            '=' => Some(TokenKind::Equal),
            '>' => Some(TokenKind::Greater),
            '<' if self.peek_char() == Some('>') => {
                self.offset += 1;
                Some(TokenKind::NotEqual)
            }
            '<' => Some(TokenKind::Less),
            _ => None,
        };

        if let Some(kind) = punctuation {
            return Ok(self.make_token(kind, None, start, line, column));
        }

        if first.is_alphabetic() {
            while self.peek_char().is_some_and(char::is_alphanumeric) {
                self.offset += self.peek_char().map_or(0, char::len_utf8);
            }
            let word = &self.source[start..self.offset];
            return Ok(match TokenKind::keyword(word) {
                Some(kind) => self.make_token(kind, None, start, line, column),
                None => self.make_token(
                    TokenKind::Identifier,
                    Some(word.to_string()),
                    start,
                    line,
                    column,
                ),
            });
        }

        if first.is_ascii_digit() || first == '.' {
            self.skip_digits();
            if first != '.' && self.peek_char() == Some('.') {
                self.offset += 1;
                self.skip_digits();
            }
            let text = &self.source[start..self.offset];
            if decimal_from_text(text).is_none() {
                let kind = LexicalErrorKind::NumberOutOfRange;
                return self.lexical_error(line, column, text, kind);
            }
            return Ok(self.make_token(
                TokenKind::Number,
                Some(text.to_string()),
                start,
                line,
                column,
            ));
        }

        if first == '"' {
            let text = self.scan_string(start, line, column)?;
            return Ok(self.make_token(TokenKind::String, Some(text), start, line, column));
        }

        self.lexical_error(
            line,
            column,
            &first.to_string(),
            LexicalErrorKind::UnexpectedCharacter,
        )
    }

    fn skip_digits(&mut self) {
        while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
            self.offset += 1;
        }
    }

    // The opening quote is already consumed. A doubled quote inside the literal is one quote.
    fn scan_string(&mut self, start: usize, line: usize, column: usize) -> Result<String> {
        let source = self.source;
        let mut text = String::new();
        loop {
            let rest = &source[self.offset..];
            let Some(close) = rest.find('"') else {
                self.offset = source.len();
                let partial = &source[start..];
                return self.lexical_error(
                    line,
                    column,
                    partial,
                    LexicalErrorKind::UnterminatedString,
                );
            };
            text.push_str(&rest[..close]);
            self.offset += close + 1;
            if self.peek_char() == Some('"') {
                text.push('"');
                self.offset += 1;
            } else {
                break;
            }
        }

        let literal = &source[start..self.offset];
        if let Some(last_newline) = literal.rfind('\n') {
            self.line += literal.matches('\n').count();
            self.line_start = start + last_newline + 1;
        }

        Ok(text)
    }

    fn make_token(
        &self,
        kind: TokenKind,
        text: Option<String>,
        start: usize,
        line: usize,
        column: usize,
    ) -> Token {
        trace!("scanned {:?} at {}:{}", kind, line, column);
        Token {
            kind,
            text,
            line,
            column,
            span: start..self.offset,
        }
    }

    fn lexical_error<T>(
        &self,
        line: usize,
        column: usize,
        text: &str,
        kind: LexicalErrorKind,
    ) -> Result<T> {
        debug!("{} on line {}, column {}", kind, line, column);
        Err(Error::Lexical {
            line,
            column,
            text: text.to_string(),
            kind,
        })
    }
}

/// Scans the whole source, returning every token up to and including `Eof`.
pub fn tokenize(source: &str) -> Result<Vec<Token>> {
    let mut lexer = Lexer::new(source)?;
    let mut tokens = Vec::new();
    loop {
        let token = lexer.advance()?.clone();
        let at_end = token.kind == TokenKind::Eof;
        tokens.push(token);
        if at_end {
            return Ok(tokens);
        }
    }
}
