use std::collections::VecDeque;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Null,
    Bool(bool),
    Num(String),
    Text(String),
    // 식별자
    Ident(String),
    // "따옴표 식별자"
    Quoted(String),
    // 키워드
    Select,   // SELECT
    Distinct, // DISTINCT
    From,     // FROM
    Where,    // WHERE
    As,       // AS
    Join,     // JOIN
    Inner,    // INNER
    Left,     // LEFT
    Outer,    // OUTER
    Cross,    // CROSS
    On,       // ON
    Group,    // GROUP
    Having,   // HAVING
    Order,    // ORDER
    By,       // BY
    Asc,      // ASC
    Desc,     // DESC
    Limit,    // LIMIT
    Offset,   // OFFSET
    // 쓰기 키워드 (읽기 전용 검사에만 사용)
    Create, // CREATE
    Insert, // INSERT
    Update, // UPDATE
    Alter,  // ALTER
    Delete, // DELETE
    Drop,   // DROP
    // 구분자
    Dot,       // .
    Comma,     // ,
    Semicolon, // ;
    LParen,    // (
    RParen,    // )
    // 연산자
    Not,     // NOT
    And,     // AND
    Or,      // OR
    In,      // IN
    Like,    // LIKE
    Between, // BETWEEN
    Is,      // IS
    Eq,      // = ==
    Ne,      // <> !=
    Gt,      // >
    Lt,      // <
    Ge,      // >=
    Le,      // <=
    Add,     // +
    Sub,     // -
    Mul,     // *
    Div,     // /
    Mod,     // %
    Concat,  // ||
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Token::Null => "NULL",
            Token::Bool(true) => "TRUE",
            Token::Bool(false) => "FALSE",
            Token::Num(n) => return write!(f, "{n}"),
            Token::Text(t) => return write!(f, "'{t}'"),
            Token::Ident(i) => return write!(f, "{i}"),
            Token::Quoted(q) => return write!(f, "\"{}\"", q.replace('"', "\"\"")),
            Token::Select => "SELECT",
            Token::Distinct => "DISTINCT",
            Token::From => "FROM",
            Token::Where => "WHERE",
            Token::As => "AS",
            Token::Join => "JOIN",
            Token::Inner => "INNER",
            Token::Left => "LEFT",
            Token::Outer => "OUTER",
            Token::Cross => "CROSS",
            Token::On => "ON",
            Token::Group => "GROUP",
            Token::Having => "HAVING",
            Token::Order => "ORDER",
            Token::By => "BY",
            Token::Asc => "ASC",
            Token::Desc => "DESC",
            Token::Limit => "LIMIT",
            Token::Offset => "OFFSET",
            Token::Create => "CREATE",
            Token::Insert => "INSERT",
            Token::Update => "UPDATE",
            Token::Alter => "ALTER",
            Token::Delete => "DELETE",
            Token::Drop => "DROP",
            Token::Dot => ".",
            Token::Comma => ",",
            Token::Semicolon => ";",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::Not => "NOT",
            Token::And => "AND",
            Token::Or => "OR",
            Token::In => "IN",
            Token::Like => "LIKE",
            Token::Between => "BETWEEN",
            Token::Is => "IS",
            Token::Eq => "=",
            Token::Ne => "<>",
            Token::Gt => ">",
            Token::Lt => "<",
            Token::Ge => ">=",
            Token::Le => "<=",
            Token::Add => "+",
            Token::Sub => "-",
            Token::Mul => "*",
            Token::Div => "/",
            Token::Mod => "%",
            Token::Concat => "||",
        };
        f.write_str(s)
    }
}

pub struct Lexer {
    src: VecDeque<char>,
}

impl Lexer {
    pub fn new(src: &str) -> Self {
        Lexer {
            src: src.chars().collect(),
        }
    }

    fn is_letter(ch: char) -> bool {
        ch.is_alphabetic() || ch == '_'
    }

    fn is_digit(ch: char) -> bool {
        ch.is_ascii_digit()
    }

    fn finished(&self) -> bool {
        self.src.is_empty()
    }

    fn curr(&self) -> Option<char> {
        self.src.front().copied()
    }

    fn peek(&self, step: usize) -> String {
        self.src.iter().take(step).collect()
    }

    fn walk(&mut self) -> Option<char> {
        self.src.pop_front()
    }

    /// 공백과 `--` 주석을 건너뜁니다.
    fn skip_ws(&mut self) {
        loop {
            while let Some(ch) = self.curr()
                && ch.is_whitespace()
            {
                self.walk();
            }
            if self.peek(2) != "--" {
                break;
            }
            while let Some(ch) = self.walk()
                && ch != '\n'
            {}
        }
    }

    /// 남은 입력을 모두 토큰으로 바꿉니다.
    pub fn tokens(mut self) -> Result<Vec<Token>, LexErr> {
        let mut out = Vec::new();
        loop {
            self.skip_ws();
            if self.finished() {
                return Ok(out);
            }
            out.push(self.next()?);
        }
    }

    pub fn next(&mut self) -> Result<Token, LexErr> {
        self.skip_ws();
        let ch = self.walk().ok_or(LexErr::UnexpectedEof)?;
        Ok(match ch {
            '.' => Token::Dot,
            ',' => Token::Comma,
            ';' => Token::Semicolon,
            '(' => Token::LParen,
            ')' => Token::RParen,
            '=' => {
                if self.curr() == Some('=') {
                    self.walk();
                }
                Token::Eq
            }
            '!' => {
                if self.curr() == Some('=') {
                    self.walk();
                    Token::Ne
                } else {
                    return Err(LexErr::InvalidToken(ch));
                }
            }
            '>' => {
                if self.curr() == Some('=') {
                    self.walk();
                    Token::Ge
                } else {
                    Token::Gt
                }
            }
            '<' => match self.curr() {
                Some('=') => {
                    self.walk();
                    Token::Le
                }
                Some('>') => {
                    self.walk();
                    Token::Ne
                }
                _ => Token::Lt,
            },
            '|' => {
                if self.curr() == Some('|') {
                    self.walk();
                    Token::Concat
                } else {
                    return Err(LexErr::InvalidToken(ch));
                }
            }
            '+' => Token::Add,
            '-' => Token::Sub,
            '*' => Token::Mul,
            '/' => Token::Div,
            '%' => Token::Mod,
            '\'' => Token::Text(self.lex_text(ch)?),
            '"' => Token::Quoted(self.lex_text(ch)?),
            _ if Self::is_digit(ch) => self.lex_num(ch)?,
            _ if Self::is_letter(ch) => self.lex_keyword(ch)?,
            _ => return Err(LexErr::InvalidToken(ch)),
        })
    }

    fn lex_num(&mut self, start: char) -> Result<Token, LexErr> {
        let mut float = false;
        let mut out = String::from(start);
        while let Some(ch) = self.walk_if(|ch| Self::is_digit(ch) || ch == '.') {
            if ch == '.' {
                if float {
                    out.push(ch);
                    return Err(LexErr::InvalidNum(out));
                }
                float = true;
            }
            out.push(ch);
        }
        if let Some(ch) = self.curr()
            && Self::is_letter(ch)
        {
            out.push(ch);
            return Err(LexErr::InvalidNum(out));
        }
        if float && out.ends_with('.') {
            out.push('0');
        }
        Ok(Token::Num(out))
    }

    fn walk_if(&mut self, pred: impl Fn(char) -> bool) -> Option<char> {
        match self.curr() {
            Some(ch) if pred(ch) => self.walk(),
            _ => None,
        }
    }

    /// 닫는 따옴표까지 읽습니다. 백슬래시 이스케이프는 작은따옴표 문자열에서만 씁니다.
    fn lex_text(&mut self, quote: char) -> Result<String, LexErr> {
        let mut out = String::new();
        while let Some(ch) = self.walk() {
            if ch == quote {
                // SQL 방식의 이스케이프: 'it''s'
                if self.curr() == Some(quote) {
                    self.walk();
                    out.push(quote);
                    continue;
                }
                return Ok(out);
            } else if ch == '\\' && quote == '\'' {
                let esc = self.walk().ok_or(LexErr::UnterminatedText)?;
                match esc {
                    '\\' => out.push('\\'),
                    '\'' => out.push('\''),
                    '"' => out.push('"'),
                    'n' => out.push('\n'),
                    'r' => out.push('\r'),
                    't' => out.push('\t'),
                    _ => {
                        out.push(ch);
                        out.push(esc);
                    }
                }
            } else {
                out.push(ch);
            }
        }
        Err(LexErr::UnterminatedText)
    }

    fn lex_keyword(&mut self, start: char) -> Result<Token, LexErr> {
        let mut out = String::from(start);
        while let Some(ch) = self.walk_if(|ch| Self::is_letter(ch) || Self::is_digit(ch)) {
            out.push(ch);
        }
        // 키워드 매칭
        Ok(match out.to_uppercase().as_str() {
            "NULL" => Token::Null,
            "TRUE" => Token::Bool(true),
            "FALSE" => Token::Bool(false),
            "SELECT" => Token::Select,
            "DISTINCT" => Token::Distinct,
            "FROM" => Token::From,
            "WHERE" => Token::Where,
            "AS" => Token::As,
            "JOIN" => Token::Join,
            "INNER" => Token::Inner,
            "LEFT" => Token::Left,
            "OUTER" => Token::Outer,
            "CROSS" => Token::Cross,
            "ON" => Token::On,
            "GROUP" => Token::Group,
            "HAVING" => Token::Having,
            "ORDER" => Token::Order,
            "BY" => Token::By,
            "ASC" => Token::Asc,
            "DESC" => Token::Desc,
            "LIMIT" => Token::Limit,
            "OFFSET" => Token::Offset,
            "CREATE" => Token::Create,
            "INSERT" => Token::Insert,
            "UPDATE" => Token::Update,
            "ALTER" => Token::Alter,
            "DELETE" => Token::Delete,
            "DROP" => Token::Drop,
            "NOT" => Token::Not,
            "AND" => Token::And,
            "OR" => Token::Or,
            "IN" => Token::In,
            "LIKE" => Token::Like,
            "BETWEEN" => Token::Between,
            "IS" => Token::Is,
            _ => Token::Ident(out),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexErr {
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("malformed number \"{0}\"")]
    InvalidNum(String),
    #[error("unterminated string literal")]
    UnterminatedText,
    #[error("unrecognized token \"{0}\"")]
    InvalidToken(char),
}
