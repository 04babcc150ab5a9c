//! Front end of the Vesta engine: a lexer, a typed syntax tree and a
//! recursive-descent / precedence-climbing parser for an early ECMAScript
//! dialect, with automatic semicolon insertion and source-extent tracking.

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod span;

pub use ast::{Expr, ExprKind, Stmt, StmtKind};
pub use lexer::{Lexer, Token};
pub use parser::{parse, ParseError, Parser};
pub use span::{positions, SourcePosition, Span};
