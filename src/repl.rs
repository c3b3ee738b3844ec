use nu_ansi_term::{Color, Style};
use reedline::{
    Highlighter, Prompt, PromptEditMode, PromptHistorySearch, PromptHistorySearchStatus,
    StyledText, ValidationResult, Validator,
};
use std::borrow::Cow;

use crate::{
    error::{Error, LexicalErrorKind},
    tokenizer::{tokenize, TokenKind},
};

#[derive(Clone)]
pub struct REPLPrompt;

impl Prompt for REPLPrompt {
    fn render_prompt_left(&self) -> Cow<str> {
        Cow::Borrowed("scriptlang")
    }

    fn render_prompt_right(&self) -> Cow<str> {
        Cow::Borrowed("")
    }

    fn render_prompt_indicator(&self, _edit_mode: PromptEditMode) -> Cow<str> {
        Cow::Borrowed("❯ ")
    }

    fn render_prompt_multiline_indicator(&self) -> Cow<str> {
        Cow::Borrowed("  ... ")
    }

    fn render_prompt_history_search_indicator(
        &self,
        history_search: PromptHistorySearch,
    ) -> Cow<str> {
        let prefix = match history_search.status {
            PromptHistorySearchStatus::Passing => "",
            PromptHistorySearchStatus::Failing => "failing ",
        };
        Cow::Owned(format!(
            "({}reverse-search: {}) ",
            prefix, history_search.term
        ))
    }
}

/// Keeps reading lines while a string, brace, parenthesis or `if` block is still open.
pub struct REPLValidator;

impl Validator for REPLValidator {
    fn validate(&self, line: &str) -> ValidationResult {
        let tokens = match tokenize(line) {
            Ok(tokens) => tokens,
            Err(Error::Lexical {
                kind: LexicalErrorKind::UnterminatedString,
                ..
            }) => return ValidationResult::Incomplete,
            // Let the interpreter report every other error.
            Err(_) => return ValidationResult::Complete,
        };

        let mut depth = 0i32;
        for token in &tokens {
            match token.kind {
                TokenKind::LeftBrace | TokenKind::LeftParen | TokenKind::If => depth += 1,
                TokenKind::RightBrace | TokenKind::RightParen | TokenKind::End => depth -= 1,
                _ => {}
            }
        }

        if depth > 0 {
            ValidationResult::Incomplete
        } else {
            ValidationResult::Complete
        }
    }
}

pub static KEYWORD_COLOR: Color = Color::LightBlue;
pub static LITERAL_COLOR: Color = Color::Yellow;
pub static DEFAULT_COLOR: Color = Color::White;
pub static OPERATOR_COLOR: Color = Color::DarkGray;

fn token_color(kind: TokenKind) -> Color {
    match kind {
        kind if kind.is_keyword() => KEYWORD_COLOR,
        TokenKind::String | TokenKind::Number => LITERAL_COLOR,
        TokenKind::Identifier | TokenKind::Eof => DEFAULT_COLOR,
        _ => OPERATOR_COLOR,
    }
}

pub struct SyntaxHighlighter;

impl Highlighter for SyntaxHighlighter {
    fn highlight(&self, line: &str, _cursor: usize) -> StyledText {
        let mut styled_text = StyledText::new();

        let tokens = match tokenize(line) {
            Ok(t) => t,
            Err(_) => {
                styled_text.push((Style::new().fg(DEFAULT_COLOR), line.to_string()));
                return styled_text;
            }
        };

        let mut position = 0;
        for token in tokens.iter().filter(|t| t.kind != TokenKind::Eof) {
            if token.span.start > position {
                styled_text.push((
                    Style::new().fg(DEFAULT_COLOR),
                    line[position..token.span.start].to_string(),
                ));
            }
            styled_text.push((
                Style::new().fg(token_color(token.kind)),
                line[token.span.clone()].to_string(),
            ));
            position = token.span.end;
        }

        if position < line.len() {
            styled_text.push((Style::new().fg(DEFAULT_COLOR), line[position..].to_string()));
        }

        styled_text
    }
}
