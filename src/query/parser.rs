use super::ast::*;
use super::error::{QueryErr, Result};
use super::lexer::{LexErr, Lexer, Token};
use std::collections::VecDeque;

/// 식 트리의 최대 깊이. 괄호 중첩도 같은 한도를 씁니다.
pub const MAX_DEPTH: usize = 100;

/// 재귀 하강 방식의 SELECT 파서.
///
/// 쓰기 문장(CREATE, INSERT, UPDATE, DELETE, DROP, ALTER)은 파싱 단계에서 거부됩니다.
pub struct Parser {
    tokens: VecDeque<Token>,
    // 현재 parse_expr 중첩 수
    depth: usize,
}

impl Parser {
    pub fn new(lexer: Lexer) -> Result<Self> {
        Ok(Self {
            tokens: lexer.tokens()?.into(),
            depth: 0,
        })
    }

    pub fn parse(mut self) -> Result<Vec<Select>> {
        let mut stmts = Vec::new();
        loop {
            while self.eat(&Token::Semicolon) {}
            let Some(tok) = self.peek() else {
                return Ok(stmts);
            };
            match tok {
                Token::Create
                | Token::Insert
                | Token::Update
                | Token::Alter
                | Token::Delete
                | Token::Drop => return Err(QueryErr::ReadOnly(tok.to_string())),
                _ => stmts.push(self.parse_select()?),
            }
            if !self.eat(&Token::Semicolon) && self.peek().is_some() {
                return Err(self.unexpected("end of statement"));
            }
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.front()
    }

    fn peek_nth(&self, n: usize) -> Option<&Token> {
        self.tokens.get(n)
    }

    fn walk(&mut self) -> Option<Token> {
        self.tokens.pop_front()
    }

    fn eat(&mut self, tok: &Token) -> bool {
        if self.peek() == Some(tok) {
            self.walk();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, tok: Token) -> Result<()> {
        if self.eat(&tok) {
            Ok(())
        } else {
            Err(self.unexpected(&tok.to_string()))
        }
    }

    fn unexpected(&self, expected: &str) -> QueryErr {
        match self.peek() {
            Some(found) => QueryErr::UnexpectedToken {
                expected: expected.to_string(),
                found: found.to_string(),
            },
            None => QueryErr::UnexpectedEof(expected.to_string()),
        }
    }

    fn ident(&mut self) -> Result<Box<str>> {
        match self.walk() {
            Some(Token::Ident(name) | Token::Quoted(name)) => Ok(name.into()),
            Some(tok) => {
                self.tokens.push_front(tok);
                Err(self.unexpected("identifier"))
            }
            None => Err(self.unexpected("identifier")),
        }
    }

    /// `[AS] alias`
    fn alias(&mut self) -> Result<Option<Box<str>>> {
        if self.eat(&Token::As) {
            if let Some(Token::Text(_)) = self.peek()
                && let Some(Token::Text(text)) = self.walk()
            {
                return Ok(Some(text.into()));
            }
            return self.ident().map(Some);
        }
        if let Some(Token::Ident(_) | Token::Quoted(_)) = self.peek() {
            return self.ident().map(Some);
        }
        Ok(None)
    }

    fn parse_select(&mut self) -> Result<Select> {
        self.expect(Token::Select)?;
        let mut select = Select {
            distinct: self.eat(&Token::Distinct),
            ..Default::default()
        };
        loop {
            select.items.push(self.parse_item()?);
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        if self.eat(&Token::From) {
            select.from = Some(self.parse_from()?);
        }
        if self.eat(&Token::Where) {
            select.filter = Some(self.parse_expr()?);
        }
        if self.eat(&Token::Group) {
            self.expect(Token::By)?;
            select.group_by = self.parse_expr_list()?;
        }
        if self.eat(&Token::Having) {
            select.having = Some(self.parse_expr()?);
        }
        if self.eat(&Token::Order) {
            self.expect(Token::By)?;
            loop {
                let expr = self.parse_expr()?;
                let asc = if self.eat(&Token::Desc) {
                    false
                } else {
                    self.eat(&Token::Asc);
                    true
                };
                select.order_by.push(OrderBy { expr, asc });
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
        }
        if self.eat(&Token::Limit) {
            let first = self.parse_expr()?;
            if self.eat(&Token::Offset) {
                select.limit = Some(first);
                select.offset = Some(self.parse_expr()?);
            } else if self.eat(&Token::Comma) {
                // LIMIT <offset>, <count>
                select.offset = Some(first);
                select.limit = Some(self.parse_expr()?);
            } else {
                select.limit = Some(first);
            }
        }
        Ok(select)
    }

    fn parse_item(&mut self) -> Result<SelectItem> {
        if self.eat(&Token::Mul) {
            return Ok(SelectItem::Wildcard);
        }
        if let (Some(Token::Ident(_) | Token::Quoted(_)), Some(Token::Dot), Some(Token::Mul)) =
            (self.peek(), self.peek_nth(1), self.peek_nth(2))
        {
            let table = self.ident()?;
            self.walk();
            self.walk();
            return Ok(SelectItem::TableWildcard(table));
        }
        let expr = self.parse_expr()?;
        let alias = self.alias()?;
        Ok(SelectItem::Expr { expr, alias })
    }

    fn parse_table_ref(&mut self) -> Result<TableRef> {
        let name = self.ident()?;
        let alias = self.alias()?;
        Ok(TableRef { name, alias })
    }

    fn parse_from(&mut self) -> Result<FromClause> {
        let base = self.parse_table_ref()?;
        let mut joins = Vec::new();
        loop {
            let kind = match self.peek() {
                Some(Token::Comma) => {
                    self.walk();
                    joins.push(Join {
                        kind: JoinKind::Cross,
                        table: self.parse_table_ref()?,
                        on: None,
                    });
                    continue;
                }
                Some(Token::Join) => JoinKind::Inner,
                Some(Token::Inner) => {
                    self.walk();
                    JoinKind::Inner
                }
                Some(Token::Left) => {
                    self.walk();
                    self.eat(&Token::Outer);
                    JoinKind::Left
                }
                Some(Token::Cross) => {
                    self.walk();
                    JoinKind::Cross
                }
                _ => break,
            };
            self.expect(Token::Join)?;
            let table = self.parse_table_ref()?;
            let on = match kind {
                JoinKind::Cross => None,
                _ => {
                    self.expect(Token::On)?;
                    Some(self.parse_expr()?)
                }
            };
            joins.push(Join { kind, table, on });
        }
        Ok(FromClause { base, joins })
    }

    fn parse_expr_list(&mut self) -> Result<Vec<Expr>> {
        let mut list = vec![self.parse_expr()?];
        while self.eat(&Token::Comma) {
            list.push(self.parse_expr()?);
        }
        Ok(list)
    }

    pub fn parse_expr(&mut self) -> Result<Expr> {
        if self.depth >= MAX_DEPTH {
            return Err(QueryErr::TooDeep(MAX_DEPTH));
        }
        self.depth += 1;
        let expr = self.parse_or();
        self.depth -= 1;
        expr
    }

    fn binary(op: BinaryOp, left: Expr, right: Expr) -> Result<Expr> {
        nest(Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut left = self.parse_and()?;
        while self.eat(&Token::Or) {
            let right = self.parse_and()?;
            left = Self::binary(BinaryOp::Or, left, right)?;
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut left = self.parse_not()?;
        while self.eat(&Token::And) {
            let right = self.parse_not()?;
            left = Self::binary(BinaryOp::And, left, right)?;
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr> {
        let mut nots = 0;
        while self.eat(&Token::Not) {
            nots += 1;
        }
        let mut expr = self.parse_comparison()?;
        for _ in 0..nots {
            expr = nest(Expr::Unary {
                op: UnaryOp::Not,
                right: Box::new(expr),
            })?;
        }
        Ok(expr)
    }

    fn parse_comparison(&mut self) -> Result<Expr> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.peek() {
                Some(Token::Eq) => BinaryOp::Eq,
                Some(Token::Ne) => BinaryOp::Ne,
                Some(Token::Lt) => BinaryOp::Lt,
                Some(Token::Le) => BinaryOp::Le,
                Some(Token::Gt) => BinaryOp::Gt,
                Some(Token::Ge) => BinaryOp::Ge,
                Some(Token::Is) => {
                    self.walk();
                    let negated = self.eat(&Token::Not);
                    self.expect(Token::Null)?;
                    left = nest(Expr::IsNull {
                        expr: Box::new(left),
                        negated,
                    })?;
                    continue;
                }
                Some(Token::Not)
                    if matches!(
                        self.peek_nth(1),
                        Some(Token::In | Token::Between | Token::Like)
                    ) =>
                {
                    self.walk();
                    left = self.parse_postfix(left, true)?;
                    continue;
                }
                Some(Token::In | Token::Between | Token::Like) => {
                    left = self.parse_postfix(left, false)?;
                    continue;
                }
                _ => return Ok(left),
            };
            self.walk();
            let right = self.parse_additive()?;
            left = Self::binary(op, left, right)?;
        }
    }

    /// `IN (...)`, `BETWEEN a AND b`, `LIKE p` (앞의 NOT은 이미 소비됨)
    fn parse_postfix(&mut self, left: Expr, negated: bool) -> Result<Expr> {
        match self.walk() {
            Some(Token::In) => {
                self.expect(Token::LParen)?;
                let list = self.parse_expr_list()?;
                self.expect(Token::RParen)?;
                nest(Expr::InList {
                    expr: Box::new(left),
                    list,
                    negated,
                })
            }
            Some(Token::Between) => {
                let low = self.parse_additive()?;
                self.expect(Token::And)?;
                let high = self.parse_additive()?;
                nest(Expr::Between {
                    expr: Box::new(left),
                    low: Box::new(low),
                    high: Box::new(high),
                    negated,
                })
            }
            Some(Token::Like) => {
                let pattern = self.parse_additive()?;
                let like = Self::binary(BinaryOp::Like, left, pattern)?;
                if !negated {
                    return Ok(like);
                }
                nest(Expr::Unary {
                    op: UnaryOp::Not,
                    right: Box::new(like),
                })
            }
            _ => Err(self.unexpected("IN, BETWEEN or LIKE")),
        }
    }

    fn parse_additive(&mut self) -> Result<Expr> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Add) => BinaryOp::Add,
                Some(Token::Sub) => BinaryOp::Sub,
                Some(Token::Concat) => BinaryOp::Concat,
                _ => return Ok(left),
            };
            self.walk();
            let right = self.parse_multiplicative()?;
            left = Self::binary(op, left, right)?;
        }
    }

    fn parse_multiplicative(&mut self) -> Result<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Mul) => BinaryOp::Mul,
                Some(Token::Div) => BinaryOp::Div,
                Some(Token::Mod) => BinaryOp::Mod,
                _ => return Ok(left),
            };
            self.walk();
            let right = self.parse_unary()?;
            left = Self::binary(op, left, right)?;
        }
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        // 단항 +는 버리고 -만 셉니다
        let mut negations = 0;
        loop {
            if self.eat(&Token::Sub) {
                negations += 1;
            } else if !self.eat(&Token::Add) {
                break;
            }
        }
        let mut expr = self.parse_primary()?;
        for _ in 0..negations {
            expr = nest(Expr::Unary {
                op: UnaryOp::Neg,
                right: Box::new(expr),
            })?;
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let Some(tok) = self.peek().cloned() else {
            return Err(self.unexpected("expression"));
        };
        match tok {
            Token::Null => {
                self.walk();
                Ok(Expr::Null)
            }
            Token::Bool(b) => {
                self.walk();
                Ok(Expr::Bool(b))
            }
            Token::Num(num) => {
                self.walk();
                parse_number(&num)
            }
            Token::Text(text) => {
                self.walk();
                Ok(Expr::Text(text.into()))
            }
            Token::LParen => {
                self.walk();
                let expr = self.parse_expr()?;
                self.expect(Token::RParen)?;
                Ok(expr)
            }
            Token::Ident(_) | Token::Quoted(_) => {
                let quoted = matches!(tok, Token::Quoted(_));
                let name = self.ident()?;
                if self.eat(&Token::LParen) {
                    return self.parse_call(name);
                }
                if self.eat(&Token::Dot) {
                    let column = self.ident()?;
                    return Ok(Expr::Column {
                        table: Some(name),
                        name: column,
                    });
                }
                if quoted {
                    return Ok(Expr::Quoted(name));
                }
                Ok(Expr::Column { table: None, name })
            }
            _ => Err(self.unexpected("expression")),
        }
    }

    /// 여는 괄호 다음부터 함수 호출을 읽습니다.
    fn parse_call(&mut self, name: Box<str>) -> Result<Expr> {
        let distinct = self.eat(&Token::Distinct);
        let args = if self.eat(&Token::Mul) {
            vec![Expr::Star]
        } else if self.peek() == Some(&Token::RParen) {
            Vec::new()
        } else {
            self.parse_expr_list()?
        };
        self.expect(Token::RParen)?;
        nest(Expr::Call {
            name,
            args,
            distinct,
        })
    }
}

/// 새로 만든 노드가 깊이 한도를 넘지 않는지 확인합니다. 자식들은 이미 확인된 상태입니다.
fn nest(expr: Expr) -> Result<Expr> {
    if expr.depth() > MAX_DEPTH {
        return Err(QueryErr::TooDeep(MAX_DEPTH));
    }
    Ok(expr)
}

fn parse_number(num: &str) -> Result<Expr> {
    if !num.contains('.')
        && let Ok(i) = num.parse::<i64>()
    {
        return Ok(Expr::Int(i));
    }
    num.parse::<f64>()
        .map(Expr::Float)
        .map_err(|_| LexErr::InvalidNum(num.to_string()).into())
}

/// 쿼리 문자열을 하나의 SELECT 문으로 파싱합니다.
pub fn parse_query(src: &str) -> Result<Select> {
    let mut stmts = Parser::new(Lexer::new(src))?.parse()?;
    match stmts.len() {
        0 => Err(QueryErr::EmptyQuery),
        1 => Ok(stmts.remove(0)),
        _ => Err(QueryErr::MultipleStatements),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn col(name: &str) -> Expr {
        Expr::column(name)
    }

    #[test]
    fn test_select_star() {
        let select = parse_query("SELECT * FROM employees").unwrap();
        assert_eq!(select.items, vec![SelectItem::Wildcard]);
        let from = select.from.unwrap();
        assert_eq!(&*from.base.name, "employees");
        assert!(from.joins.is_empty());
    }

    #[test]
    fn test_where_order_limit() {
        let select =
            parse_query("SELECT name, price FROM products WHERE price < 100 ORDER BY price DESC LIMIT 3;")
                .unwrap();
        assert_eq!(select.items.len(), 2);
        assert_eq!(
            select.filter,
            Some(Expr::Binary {
                op: BinaryOp::Lt,
                left: Box::new(col("price")),
                right: Box::new(Expr::Int(100)),
            })
        );
        assert_eq!(
            select.order_by,
            vec![OrderBy {
                expr: col("price"),
                asc: false
            }]
        );
        assert_eq!(select.limit, Some(Expr::Int(3)));
        assert_eq!(select.offset, None);
    }

    #[test]
    fn test_limit_offset_forms() {
        let select = parse_query("SELECT * FROM t LIMIT 2 OFFSET 1").unwrap();
        assert_eq!(select.limit, Some(Expr::Int(2)));
        assert_eq!(select.offset, Some(Expr::Int(1)));
        let select = parse_query("SELECT * FROM t LIMIT 1, 2").unwrap();
        assert_eq!(select.limit, Some(Expr::Int(2)));
        assert_eq!(select.offset, Some(Expr::Int(1)));
    }

    #[test]
    fn test_join_and_aliases() {
        let select = parse_query(
            "SELECT o.id, c.name AS customer FROM orders o JOIN customers AS c ON o.customer_id = c.id",
        )
        .unwrap();
        let from = select.from.unwrap();
        assert_eq!(from.base.binding(), "o");
        assert_eq!(from.joins.len(), 1);
        assert_eq!(from.joins[0].kind, JoinKind::Inner);
        assert_eq!(from.joins[0].table.binding(), "c");
        match &select.items[1] {
            SelectItem::Expr { alias, .. } => assert_eq!(alias.as_deref(), Some("customer")),
            other => panic!("unexpected item {other:?}"),
        }
    }

    #[test]
    fn test_join_kinds() {
        let select =
            parse_query("SELECT * FROM a LEFT OUTER JOIN b ON a.x = b.x CROSS JOIN c, d").unwrap();
        let kinds: Vec<_> = select.from.unwrap().joins.iter().map(|j| j.kind).collect();
        assert_eq!(kinds, vec![JoinKind::Left, JoinKind::Cross, JoinKind::Cross]);
    }

    #[test]
    fn test_group_by_having() {
        let select = parse_query(
            "SELECT category, SUM(total) FROM orders GROUP BY category HAVING SUM(total) > 1000",
        )
        .unwrap();
        assert_eq!(select.group_by, vec![col("category")]);
        let SelectItem::Expr { expr, .. } = &select.items[1] else {
            panic!("expected expression item");
        };
        assert_eq!(expr.output_name(), "SUM(total)");
        assert!(select.having.is_some());
    }

    #[test]
    fn test_count_star_and_distinct() {
        let select = parse_query("SELECT COUNT(*), count(DISTINCT category) FROM products").unwrap();
        let names: Vec<_> = select
            .items
            .iter()
            .map(|item| match item {
                SelectItem::Expr { expr, .. } => expr.output_name(),
                _ => String::new(),
            })
            .collect();
        assert_eq!(names, vec!["COUNT(*)", "count(DISTINCT category)"]);
    }

    #[test]
    fn test_precedence() {
        let select = parse_query("SELECT 1 + 2 * 3 = 7 AND NOT 0 OR 1").unwrap();
        let SelectItem::Expr { expr, .. } = &select.items[0] else {
            panic!("expected expression item");
        };
        assert_eq!(expr.to_string(), "1 + 2 * 3 = 7 AND NOT 0 OR 1");
        assert!(matches!(
            expr,
            Expr::Binary {
                op: BinaryOp::Or,
                ..
            }
        ));
    }

    #[test]
    fn test_postfix_predicates() {
        let select = parse_query(
            "SELECT * FROM products WHERE price NOT BETWEEN 10 AND 100 AND category IN ('A', 'B') AND name NOT LIKE 'L%' AND stock IS NOT NULL",
        )
        .unwrap();
        assert_eq!(
            select.filter.unwrap().to_string(),
            "price NOT BETWEEN 10 AND 100 AND category IN ('A', 'B') AND NOT name LIKE 'L%' AND stock IS NOT NULL"
        );
    }

    #[test]
    fn test_table_wildcard() {
        let select = parse_query("SELECT c.*, o.total FROM customers c, orders o").unwrap();
        assert_eq!(select.items[0], SelectItem::TableWildcard("c".into()));
    }

    #[test]
    fn test_misspelled_keyword() {
        let err = parse_query("SELEC * FROM employees").unwrap_err();
        assert_eq!(
            err,
            QueryErr::UnexpectedToken {
                expected: "SELECT".to_string(),
                found: "SELEC".to_string(),
            }
        );
        assert_eq!(
            err.to_string(),
            "syntax error near \"SELEC\" (expected SELECT)"
        );
    }

    #[test]
    fn test_incomplete_query() {
        assert!(matches!(
            parse_query("SELECT * FROM"),
            Err(QueryErr::UnexpectedEof(_))
        ));
        assert!(matches!(
            parse_query("SELECT name FROM employees WHERE"),
            Err(QueryErr::UnexpectedEof(_))
        ));
    }

    #[test]
    fn test_identifier_expected() {
        assert_eq!(
            parse_query("SELECT * FROM 42"),
            Err(QueryErr::UnexpectedToken {
                expected: "identifier".to_string(),
                found: "42".to_string(),
            })
        );
        assert!(matches!(
            parse_query("SELECT o. FROM orders o"),
            Err(QueryErr::UnexpectedToken { .. })
        ));
    }

    #[test]
    fn test_trailing_garbage() {
        assert!(matches!(
            parse_query("SELECT * FROM employees employees2 extra"),
            Err(QueryErr::UnexpectedToken { .. })
        ));
    }

    #[test]
    fn test_read_only() {
        for sql in [
            "DROP TABLE employees",
            "delete from orders",
            "INSERT INTO products VALUES (6, 'x', 1, 'y', 2)",
            "UPDATE employees SET salary = 0",
        ] {
            assert!(
                matches!(parse_query(sql), Err(QueryErr::ReadOnly(_))),
                "{sql} should be rejected"
            );
        }
        assert!(matches!(
            parse_query("SELECT 1; DROP TABLE employees"),
            Err(QueryErr::ReadOnly(_))
        ));
    }

    #[test]
    fn test_statement_count() {
        assert_eq!(parse_query("  ;; "), Err(QueryErr::EmptyQuery));
        assert_eq!(parse_query(""), Err(QueryErr::EmptyQuery));
        assert_eq!(
            parse_query("SELECT 1; SELECT 2"),
            Err(QueryErr::MultipleStatements)
        );
    }

    #[test]
    fn test_quoted_names() {
        let select = parse_query(
            r#"SELECT "price" AS "p", x.* FROM "products" "x" WHERE "x"."price" < 100"#,
        )
        .unwrap();
        assert_eq!(
            select.items,
            vec![
                SelectItem::Expr {
                    expr: Expr::Quoted("price".into()),
                    alias: Some("p".into()),
                },
                SelectItem::TableWildcard("x".into()),
            ]
        );
        let from = select.from.unwrap();
        assert_eq!((&*from.base.name, from.base.binding()), ("products", "x"));
        assert_eq!(
            select.filter,
            Some(Expr::Binary {
                op: BinaryOp::Lt,
                left: Box::new(Expr::Column {
                    table: Some("x".into()),
                    name: "price".into(),
                }),
                right: Box::new(Expr::Int(100)),
            })
        );
    }

    #[test]
    fn test_nesting_limit() {
        let nested = |n: usize| format!("SELECT {}1{}", "(".repeat(n), ")".repeat(n));
        assert_eq!(
            parse_query(&nested(MAX_DEPTH - 1)).unwrap().items,
            vec![SelectItem::Expr {
                expr: Expr::Int(1),
                alias: None
            }]
        );
        assert_eq!(
            parse_query(&nested(20_000)),
            Err(QueryErr::TooDeep(MAX_DEPTH))
        );
    }

    #[test]
    fn test_tree_depth_limit() {
        let chain = |op: &str, n: usize| format!("SELECT {}1", op.repeat(n));
        for op in ["1 + ", "NOT ", "- ", "1 = ", "- + "] {
            assert_eq!(
                parse_query(&chain(op, 20_000)),
                Err(QueryErr::TooDeep(MAX_DEPTH)),
                "{op}"
            );
        }
        let select = parse_query(&chain("1 + ", 50)).unwrap();
        let SelectItem::Expr { expr, .. } = &select.items[0] else {
            panic!("expected an expression");
        };
        assert_eq!(expr.depth(), 51);
        assert!(matches!(
            parse_query(&format!("SELECT name IS NULL{}", " IS NULL".repeat(200))),
            Err(QueryErr::TooDeep(_))
        ));
    }
}
