/// Token types for the SQL tokenizer

/// Lexical class of a token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Punctuation and comparison operators (`,`, `(`, `<=`, ...)
    Symbol,
    /// Single-quoted literal, quotes included
    Str,
    /// Double-quoted name, quotes included
    QuotedIdent,
    /// Run of decimal digits
    Number,
    /// Letters, digits, `_` and `.`; starts with a letter or `_`
    Identifier,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Source text of the token, verbatim
    pub text: String,
    /// Character offset of the first character in the source
    pub pos: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, pos: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            pos,
        }
    }

    /// Case-insensitive comparison against a keyword or symbol.
    pub fn is(&self, word: &str) -> bool {
        self.text.eq_ignore_ascii_case(word)
    }

    pub fn is_string(&self) -> bool {
        self.kind == TokenKind::Str
    }

    pub fn is_number(&self) -> bool {
        self.kind == TokenKind::Number
    }

    pub fn is_identifier(&self) -> bool {
        self.kind == TokenKind::Identifier
    }

    /// Text with the surrounding quotes removed. Unquoted tokens are returned as is.
    pub fn unquoted(&self) -> &str {
        let quote = match self.kind {
            TokenKind::Str => '\'',
            TokenKind::QuotedIdent => '"',
            _ => return &self.text,
        };
        let inner = self.text.strip_prefix(quote).unwrap_or(&self.text);
        inner.strip_suffix(quote).unwrap_or(inner)
    }
}
