pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;

pub use ast::{BinaryOp, Expr, JoinKind, Select, SelectItem, UnaryOp};
pub use error::QueryErr;
pub use lexer::Lexer;
pub use parser::{Parser, parse_query};
