/// SQL tokenizer - lexes on demand with one token of pushback

use super::token::{Token, TokenKind};
use crate::error::{PocketError, Result};

const PUNCTUATION: &str = ",;()?:@$|&*%+-";

/// Saved tokenizer state, see [`Lexer::checkpoint`].
#[derive(Debug, Clone)]
pub struct Checkpoint {
    position: usize,
    current: Option<Token>,
    pushed_back: bool,
}

pub struct Lexer {
    input: Vec<char>,
    /// Offset of the next unread character (always past trailing whitespace)
    position: usize,
    current: Option<Token>,
    pushed_back: bool,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        let mut lexer = Self {
            input: input.chars().collect(),
            position: 0,
            current: None,
            pushed_back: false,
        };
        lexer.skip_whitespace();
        lexer
    }

    /// Moves to the next token. `Ok(None)` marks the end of input.
    pub fn advance(&mut self) -> Result<Option<&Token>> {
        if self.pushed_back {
            self.pushed_back = false;
        } else {
            self.current = self.read_token()?;
        }
        Ok(self.current.as_ref())
    }

    pub fn current(&self) -> Option<&Token> {
        self.current.as_ref()
    }

    /// Replays the current token on the next `advance`. Only one token deep.
    pub fn push_back(&mut self) {
        self.pushed_back = true;
    }

    /// Source offset of the token the next `advance` will return.
    pub fn position(&self) -> usize {
        match (&self.current, self.pushed_back) {
            (Some(token), true) => token.pos,
            _ => self.position,
        }
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            position: self.position,
            current: self.current.clone(),
            pushed_back: self.pushed_back,
        }
    }

    /// Rewinds to a checkpoint taken on this lexer.
    pub fn restore(&mut self, checkpoint: Checkpoint) {
        self.position = checkpoint.position;
        self.current = checkpoint.current;
        self.pushed_back = checkpoint.pushed_back;
    }

    fn read_token(&mut self) -> Result<Option<Token>> {
        let start = self.position;
        let ch = match self.peek() {
            Some(ch) => ch,
            None => return Ok(None),
        };

        let kind = if PUNCTUATION.contains(ch) {
            self.position += 1;
            TokenKind::Symbol
        } else if matches!(ch, '!' | '=' | '>' | '<') {
            self.position += 1;
            if self.peek() == Some('=') {
                self.position += 1;
            }
            TokenKind::Symbol
        } else if ch == '\'' || ch == '"' {
            self.read_quoted(ch);
            if ch == '\'' {
                TokenKind::Str
            } else {
                TokenKind::QuotedIdent
            }
        } else if ch.is_alphabetic() || ch == '_' {
            self.position += 1;
            while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_' || c == '.') {
                self.position += 1;
            }
            TokenKind::Identifier
        } else if ch.is_ascii_digit() {
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.position += 1;
            }
            TokenKind::Number
        } else {
            return Err(PocketError::Lex { ch, pos: start });
        };

        let text: String = self.input[start..self.position].iter().collect();
        self.skip_whitespace();
        Ok(Some(Token::new(kind, text, start)))
    }

    /// Consumes a quoted run verbatim. An unterminated run swallows the rest of the input.
    fn read_quoted(&mut self, quote: char) {
        self.position += 1;
        while let Some(c) = self.peek() {
            self.position += 1;
            if c == quote {
                return;
            }
        }
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.position += 1;
        }
    }
}
