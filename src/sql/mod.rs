/// SQL front end: tokenizer, expression model and statement interpreter
///
/// Architecture:
/// - Lexer: splits SQL text into tokens, one at a time with one-token pushback
/// - Parser: token primitives plus precedence-climbing expression parsing
/// - Evaluator: computes expression values against a table row
/// - Executor: interprets statements as they are parsed, no statement AST

pub mod token;
pub mod lexer;
pub mod ast;
pub mod parser;
pub mod evaluator;
pub(crate) mod executor;

pub use token::{Token, TokenKind};
pub use lexer::Lexer;
pub use ast::{BinaryOperator, Expr, UnaryOperator};
pub use parser::{Bindings, Parser};
pub use evaluator::{is_equal, is_greater, is_lesser, ExprEvaluator};
