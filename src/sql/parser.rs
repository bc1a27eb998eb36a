/// SQL Parser - token consumption primitives and expression parsing
///
/// There is no statement AST: the executor drives this parser and acts on
/// each clause as soon as it has been consumed.
use super::ast::{BinaryOperator, Expr, UnaryOperator};
use super::lexer::{Checkpoint, Lexer};
use super::token::{Token, TokenKind};
use crate::error::{PocketError, Result};
use crate::types::Value;
use ahash::AHashMap;

/// Positional parameters, keyed by binding index
pub type Bindings = AHashMap<usize, Value>;

pub struct Parser {
    lexer: Lexer,
    /// Index the next unindexed `?` reads
    binding_cursor: usize,
    /// Off while reading a column default, where a trailing `NOT NULL`
    /// belongs to the column definition
    postfix: bool,
}

impl Parser {
    pub fn new(sql: &str) -> Self {
        Self {
            lexer: Lexer::new(sql),
            binding_cursor: 0,
            postfix: true,
        }
    }

    /// Source offset of the next token to be consumed.
    pub fn position(&self) -> usize {
        self.lexer.position()
    }

    fn next_token(&mut self) -> Result<Option<Token>> {
        Ok(self.lexer.advance()?.cloned())
    }

    fn error(&self, message: impl Into<String>, pos: usize) -> PocketError {
        PocketError::parse(message, pos)
    }

    /// Consumes one of `words` (case-insensitive) and returns its index.
    ///
    /// With `accept_other` a mismatch is pushed back and `None` returned;
    /// otherwise it is a parse fault listing the alternatives.
    pub fn eat_one_of(&mut self, words: &[&str], accept_other: bool) -> Result<Option<usize>> {
        let start = self.position();
        if let Some(token) = self.next_token()? {
            if let Some(idx) = words.iter().position(|w| token.is(w)) {
                return Ok(Some(idx));
            }
        }
        if accept_other {
            self.lexer.push_back();
            return Ok(None);
        }
        Err(self.error(format!("{} expected", alternatives(words)), start))
    }

    /// Consumes `word` or fails.
    pub fn eat(&mut self, word: &str) -> Result<()> {
        self.eat_one_of(&[word], false).map(|_| ())
    }

    /// Consumes `word` if it is next.
    pub fn eat_optional(&mut self, word: &str) -> Result<bool> {
        Ok(self.eat_one_of(&[word], true)?.is_some())
    }

    /// Consumes the next token if it contains one of `fragments`, ignoring case.
    pub fn eat_fuzzy(&mut self, fragments: &[&str]) -> Result<Option<usize>> {
        if let Some(token) = self.next_token()? {
            let text = token.text.to_ascii_uppercase();
            if let Some(idx) = fragments.iter().position(|f| text.contains(&f.to_ascii_uppercase())) {
                return Ok(Some(idx));
            }
        }
        self.lexer.push_back();
        Ok(None)
    }

    pub fn eat_number(&mut self) -> Result<i64> {
        let start = self.position();
        match self.next_token()? {
            Some(token) if token.is_number() => token
                .text
                .parse::<i64>()
                .map_err(|_| self.error("Number out of range", start)),
            _ => Err(self.error("Number expected", start)),
        }
    }

    /// Consumes a single-quoted string and returns it without the quotes.
    pub fn eat_string(&mut self) -> Result<String> {
        let start = self.position();
        match self.next_token()? {
            Some(token) if token.is_string() => Ok(token.unquoted().to_string()),
            _ => Err(self.error("String expected", start)),
        }
    }

    /// Consumes whatever token is next.
    pub fn eat_any(&mut self) -> Result<Token> {
        let start = self.position();
        self.next_token()?
            .ok_or_else(|| self.error("Identifier expected", start))
    }

    /// Consumes the next token and returns its raw text.
    pub fn eat_name(&mut self) -> Result<String> {
        Ok(self.eat_any()?.text)
    }

    /// True when the next token is one of `words`. Consumes nothing.
    pub fn look_ahead(&mut self, words: &[&str]) -> Result<bool> {
        let found = match self.next_token()? {
            Some(token) => words.iter().any(|w| token.is(w)),
            None => false,
        };
        self.lexer.push_back();
        Ok(found)
    }

    /// True when no tokens are left. Consumes nothing.
    pub fn at_end(&mut self) -> Result<bool> {
        let end = self.next_token()?.is_none();
        self.lexer.push_back();
        Ok(end)
    }

    /// Consumes the statement terminator: `;` or the end of input.
    pub fn eat_statement_end(&mut self) -> Result<()> {
        let start = self.position();
        match self.next_token()? {
            None => Ok(()),
            Some(token) if token.is(";") => Ok(()),
            Some(_) => Err(self.error("; or end of statement expected", start)),
        }
    }

    /// Parse a full expression
    pub fn parse_expr(&mut self, bindings: &Bindings) -> Result<Expr> {
        let left = self.parse_unary(bindings)?;
        self.parse_binary(left, 0, bindings)
    }

    /// Parse an expression that stops before postfix `NOT NULL`, `ISNULL`
    /// and `IN`. Parenthesized sub-expressions still take them.
    pub fn parse_constant_expr(&mut self, bindings: &Bindings) -> Result<Expr> {
        let saved = std::mem::replace(&mut self.postfix, false);
        let result = self.parse_expr(bindings);
        self.postfix = saved;
        result
    }

    /// Parse a primary expression or a prefix operator applied to one
    pub fn parse_unary(&mut self, bindings: &Bindings) -> Result<Expr> {
        let start = self.position();
        let token = self.eat_any()?;

        if token.is("COALESCE") {
            self.eat("(")?;
            let mut args = Vec::new();
            loop {
                args.push(self.parse_expr(bindings)?);
                if !self.eat_optional(",")? {
                    break;
                }
            }
            self.eat(")")?;
            return Ok(Expr::Function {
                name: "COALESCE".to_string(),
                args,
            });
        }
        if token.is("NULL") {
            return Ok(Expr::Literal(Value::Null));
        }
        if token.is("NOT") {
            return Ok(Expr::unary(UnaryOperator::Not, self.parse_unary(bindings)?));
        }

        match token.kind {
            TokenKind::Number => {
                let value = token
                    .text
                    .parse::<i64>()
                    .map_err(|_| self.error("Number out of range", token.pos))?;
                Ok(Expr::Literal(Value::Integer(value)))
            }
            TokenKind::Str => Ok(Expr::Literal(Value::Text(token.unquoted().to_string()))),
            TokenKind::Identifier => Ok(Expr::Column(token.text)),
            TokenKind::QuotedIdent => Ok(Expr::Column(token.unquoted().to_string())),
            TokenKind::Symbol if token.is("(") => {
                let saved = std::mem::replace(&mut self.postfix, true);
                let expr = self.parse_expr(bindings);
                self.postfix = saved;
                let expr = expr?;
                self.eat(")")?;
                Ok(expr)
            }
            TokenKind::Symbol if token.is("?") => Ok(Expr::Literal(self.parse_binding(&token, bindings)?)),
            // Negation applies to everything that follows, not just the next operand
            TokenKind::Symbol if token.is("-") => {
                if let Some(literal) = self.parse_negative_literal(&token)? {
                    return Ok(literal);
                }
                Ok(Expr::unary(UnaryOperator::Negate, self.parse_expr(bindings)?))
            }
            TokenKind::Symbol => Err(self.error("Expression expected", start)),
        }
    }

    /// `-9223372036854775808` only fits once the sign is part of the literal.
    ///
    /// Applies when the digits follow `-` directly and nothing binds after
    /// them, so the result matches negating the whole tail.
    fn parse_negative_literal(&mut self, minus: &Token) -> Result<Option<Expr>> {
        let mark = self.lexer.checkpoint();
        let digits = match self.next_token()? {
            Some(token) if token.is_number() && token.pos == minus.pos + 1 => token,
            _ => {
                self.lexer.restore(mark);
                return Ok(None);
            }
        };
        let value = match format!("-{}", digits.text).parse::<i64>() {
            Ok(value) if value == i64::MIN => value,
            _ => {
                self.lexer.restore(mark);
                return Ok(None);
            }
        };
        if let Some((_, op_mark)) = self.parse_operator()? {
            self.lexer.restore(op_mark);
            self.lexer.restore(mark);
            return Ok(None);
        }
        Ok(Some(Expr::Literal(Value::Integer(value))))
    }

    /// `?` reads the value at the cursor; `?N` moves the cursor to N first.
    fn parse_binding(&mut self, question: &Token, bindings: &Bindings) -> Result<Value> {
        match self.next_token()? {
            Some(token) if token.is_number() && token.pos == question.pos + 1 => {
                self.binding_cursor = token
                    .text
                    .parse::<usize>()
                    .map_err(|_| self.error("Parameter index out of range", token.pos))?;
            }
            _ => self.lexer.push_back(),
        }
        let value = bindings.get(&self.binding_cursor).cloned().unwrap_or(Value::Null);
        self.binding_cursor = self
            .binding_cursor
            .checked_add(1)
            .ok_or_else(|| self.error("Parameter index out of range", question.pos))?;
        Ok(value)
    }

    /// Precedence climbing over binary operators.
    ///
    /// Operators below `min_precedence` end this level. The right operand is
    /// extended while the following operator binds strictly tighter, so equal
    /// precedence associates to the left.
    fn parse_binary(&mut self, mut left: Expr, min_precedence: u8, bindings: &Bindings) -> Result<Expr> {
        loop {
            let (op, mark) = match self.parse_operator()? {
                Some(found) => found,
                None => {
                    // Keep climbing after a postfix form: `a NOT NULL AND b`
                    if self.postfix {
                        if let Some(wrapped) = self.parse_postfix(&left)? {
                            left = wrapped;
                            continue;
                        }
                    }
                    break;
                }
            };
            if op.precedence() < min_precedence {
                self.lexer.restore(mark);
                break;
            }

            let mut right = self.parse_unary(bindings)?;
            while let Some((next, mark)) = self.parse_operator()? {
                self.lexer.restore(mark);
                if next.precedence() <= op.precedence() {
                    break;
                }
                right = self.parse_binary(right, next.precedence(), bindings)?;
            }
            left = Expr::binary(left, op, right);
        }
        Ok(left)
    }

    /// Postfix productions that are not binary operators: `NOT NULL`,
    /// `NOTNULL`, `ISNULL` and `[NOT] IN (...)`.
    fn parse_postfix(&mut self, left: &Expr) -> Result<Option<Expr>> {
        match self.eat_one_of(&["NOT", "NOTNULL", "ISNULL", "IN"], true)? {
            Some(0) => match self.eat_one_of(&["NULL", "IN"], false)? {
                Some(0) => Ok(Some(Expr::unary(UnaryOperator::NotNull, left.clone()))),
                _ => Ok(Some(self.parse_in(left.clone(), true)?)),
            },
            Some(1) => Ok(Some(Expr::unary(UnaryOperator::NotNull, left.clone()))),
            Some(2) => Ok(Some(Expr::unary(UnaryOperator::IsNull, left.clone()))),
            Some(_) => Ok(Some(self.parse_in(left.clone(), false)?)),
            None => Ok(None),
        }
    }

    /// Captures the parenthesized IN list as raw token text.
    fn parse_in(&mut self, left: Expr, negated: bool) -> Result<Expr> {
        self.eat("(")?;
        let mut depth = 1usize;
        let mut parts = Vec::new();
        loop {
            let token = self.eat_any()?;
            if token.is("(") {
                depth += 1;
            } else if token.is(")") {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            parts.push(token.text);
        }
        Ok(Expr::In {
            expr: Box::new(left),
            list: parts.join(" "),
            negated,
        })
    }

    /// Consumes a binary operator if one is next.
    ///
    /// Returns the operator with a checkpoint taken before it, so the caller
    /// can un-read it; `||`, `<<`, `>>` and `<>` span two adjacent tokens,
    /// more than a single push back can undo. Nothing is consumed on `None`.
    fn parse_operator(&mut self) -> Result<Option<(BinaryOperator, Checkpoint)>> {
        let mark = self.lexer.checkpoint();
        let token = match self.next_token()? {
            Some(token) => token,
            None => {
                self.lexer.restore(mark);
                return Ok(None);
            }
        };

        let op = match token.text.to_ascii_uppercase().as_str() {
            "=" | "==" => Some(BinaryOperator::Eq),
            "!=" => Some(BinaryOperator::Ne),
            "<=" => Some(BinaryOperator::Le),
            ">=" => Some(BinaryOperator::Ge),
            "AND" => Some(BinaryOperator::And),
            "OR" => Some(BinaryOperator::Or),
            "+" => Some(BinaryOperator::Add),
            "-" => Some(BinaryOperator::Sub),
            "*" => Some(BinaryOperator::Mul),
            "/" => Some(BinaryOperator::Div),
            "%" => Some(BinaryOperator::Mod),
            "<" => Some(match self.eat_adjacent(&token, &["<", ">"])? {
                Some(0) => BinaryOperator::ShiftLeft,
                Some(_) => BinaryOperator::Ne,
                None => BinaryOperator::Lt,
            }),
            ">" => Some(match self.eat_adjacent(&token, &[">"])? {
                Some(_) => BinaryOperator::ShiftRight,
                None => BinaryOperator::Gt,
            }),
            "|" => match self.eat_adjacent(&token, &["|"])? {
                Some(_) => Some(BinaryOperator::Concat),
                None => None,
            },
            _ => None,
        };

        match op {
            Some(op) => Ok(Some((op, mark))),
            None => {
                self.lexer.restore(mark);
                Ok(None)
            }
        }
    }

    /// Consumes a token directly following `first` (no whitespace) if it is one of `words`.
    fn eat_adjacent(&mut self, first: &Token, words: &[&str]) -> Result<Option<usize>> {
        let after_first = self.lexer.checkpoint();
        if let Some(token) = self.next_token()? {
            if token.pos == first.pos + first.text.chars().count() {
                if let Some(idx) = words.iter().position(|w| token.is(w)) {
                    return Ok(Some(idx));
                }
            }
        }
        self.lexer.restore(after_first);
        Ok(None)
    }
}

/// "A, B or C"
fn alternatives(words: &[&str]) -> String {
    match words {
        [] => String::new(),
        [only] => only.to_string(),
        [init @ .., last] => format!("{} or {}", init.join(", "), last),
    }
}
