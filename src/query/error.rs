use super::lexer::LexErr;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, QueryErr>;

/// 학습자에게 그대로 보여줄 오류 메시지를 담습니다.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryErr {
    #[error(transparent)]
    Lex(#[from] LexErr),
    #[error("syntax error near \"{found}\" (expected {expected})")]
    UnexpectedToken { expected: String, found: String },
    #[error("incomplete input (expected {0})")]
    UnexpectedEof(String),
    #[error("this tutorial is read-only: {0} statements are not allowed")]
    ReadOnly(String),
    #[error("no query to run")]
    EmptyQuery,
    #[error("you can only execute one statement at a time")]
    MultipleStatements,
    #[error("no tables specified")]
    NoTables,
    #[error("no such table: {0}")]
    NoSuchTable(String),
    #[error("no such column: {0}")]
    NoSuchColumn(String),
    #[error("ambiguous column name: {0}")]
    AmbiguousColumn(String),
    #[error("no such function: {0}")]
    NoSuchFunction(String),
    #[error("wrong number of arguments to function {0}()")]
    WrongArgCount(String),
    #[error("misuse of aggregate function {0}()")]
    MisusedAggregate(String),
    #[error("{0} must be a non-negative integer")]
    InvalidLimit(&'static str),
    #[error("ORDER BY term out of range: {0}")]
    OrderByOutOfRange(i64),
    #[error("GROUP BY term out of range: {0}")]
    GroupByOutOfRange(i64),
    #[error("expression tree is too large (maximum depth {0})")]
    TooDeep(usize),
    #[error("type mismatch: {0}")]
    TypeMismatch(String),
}
