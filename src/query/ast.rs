use std::fmt;

/// 하나의 SELECT 문
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Select {
    pub distinct: bool,
    pub items: Vec<SelectItem>,
    pub from: Option<FromClause>,
    pub filter: Option<Expr>,
    pub group_by: Vec<Expr>,
    pub having: Option<Expr>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<Expr>,
    pub offset: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    /// `*`
    Wildcard,
    /// `table.*`
    TableWildcard(Box<str>),
    Expr { expr: Expr, alias: Option<Box<str>> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FromClause {
    pub base: TableRef,
    pub joins: Vec<Join>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableRef {
    pub name: Box<str>,
    pub alias: Option<Box<str>>,
}

impl TableRef {
    /// 컬럼 한정자로 쓰이는 이름 (별칭이 있으면 별칭)
    pub fn binding(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Cross,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub kind: JoinKind,
    pub table: TableRef,
    pub on: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub expr: Expr,
    pub asc: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Concat,
}

impl BinaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::Or => "OR",
            BinaryOp::And => "AND",
            BinaryOp::Eq => "=",
            BinaryOp::Ne => "<>",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Like => "LIKE",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Concat => "||",
        }
    }

    fn precedence(self) -> u8 {
        match self {
            BinaryOp::Or => 1,
            BinaryOp::And => 2,
            BinaryOp::Eq
            | BinaryOp::Ne
            | BinaryOp::Lt
            | BinaryOp::Le
            | BinaryOp::Gt
            | BinaryOp::Ge
            | BinaryOp::Like => 4,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Concat => 5,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => 6,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(Box<str>),
    Column {
        table: Option<Box<str>>,
        name: Box<str>,
    },
    /// `"name"`: 같은 이름의 컬럼이 있으면 컬럼, 없으면 문자열
    Quoted(Box<str>),
    /// `COUNT(*)`의 `*`
    Star,
    Unary {
        op: UnaryOp,
        right: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    IsNull {
        expr: Box<Expr>,
        negated: bool,
    },
    InList {
        expr: Box<Expr>,
        list: Vec<Expr>,
        negated: bool,
    },
    Between {
        expr: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
        negated: bool,
    },
    Call {
        name: Box<str>,
        args: Vec<Expr>,
        distinct: bool,
    },
}

impl Expr {
    pub fn column(name: &str) -> Self {
        Expr::Column {
            table: None,
            name: name.into(),
        }
    }

    /// 결과 컬럼 이름. 컬럼 참조는 한정자 없이, 나머지는 SQL 텍스트 그대로.
    pub fn output_name(&self) -> String {
        match self {
            Expr::Column { name, .. } | Expr::Quoted(name) => name.to_string(),
            other => other.to_string(),
        }
    }

    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Unary { right, .. } => vec![&**right],
            Expr::Binary { left, right, .. } => vec![&**left, &**right],
            Expr::IsNull { expr, .. } => vec![&**expr],
            Expr::InList { expr, list, .. } => {
                let mut children = vec![&**expr];
                children.extend(list);
                children
            }
            Expr::Between {
                expr, low, high, ..
            } => vec![&**expr, &**low, &**high],
            Expr::Call { args, .. } => args.iter().collect(),
            _ => Vec::new(),
        }
    }

    /// 트리 깊이. 리프는 1.
    pub fn depth(&self) -> usize {
        1 + self
            .children()
            .into_iter()
            .map(Expr::depth)
            .max()
            .unwrap_or(0)
    }

    fn precedence(&self) -> u8 {
        match self {
            Expr::Binary { op, .. } => op.precedence(),
            Expr::Unary { op: UnaryOp::Not, .. } => 3,
            Expr::IsNull { .. } | Expr::InList { .. } | Expr::Between { .. } => 4,
            _ => 7,
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Null => write!(f, "NULL"),
            Expr::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Expr::Int(i) => write!(f, "{i}"),
            Expr::Float(x) => write!(f, "{x:?}"),
            Expr::Text(t) => write!(f, "'{}'", t.replace('\'', "''")),
            Expr::Column { table: Some(t), name } => write!(f, "{t}.{name}"),
            Expr::Column { table: None, name } => write!(f, "{name}"),
            Expr::Quoted(name) => write!(f, "\"{}\"", name.replace('"', "\"\"")),
            Expr::Star => write!(f, "*"),
            Expr::Unary { op: UnaryOp::Neg, right } => write!(f, "-{right}"),
            Expr::Unary { op: UnaryOp::Not, right } => write!(f, "NOT {right}"),
            Expr::Binary { op, left, right } => {
                // 왼쪽 결합이므로 오른쪽은 같은 우선순위여도 괄호가 필요
                write_operand(f, left, left.precedence() < op.precedence())?;
                write!(f, " {} ", op.as_str())?;
                write_operand(f, right, right.precedence() <= op.precedence())
            }
            Expr::IsNull { expr, negated } => {
                write!(f, "{expr} IS {}NULL", if *negated { "NOT " } else { "" })
            }
            Expr::InList {
                expr,
                list,
                negated,
            } => {
                write!(f, "{expr} {}IN (", if *negated { "NOT " } else { "" })?;
                write_list(f, list)?;
                write!(f, ")")
            }
            Expr::Between {
                expr,
                low,
                high,
                negated,
            } => write!(
                f,
                "{expr} {}BETWEEN {low} AND {high}",
                if *negated { "NOT " } else { "" }
            ),
            Expr::Call {
                name,
                args,
                distinct,
            } => {
                write!(f, "{name}({}", if *distinct { "DISTINCT " } else { "" })?;
                write_list(f, args)?;
                write!(f, ")")
            }
        }
    }
}

fn write_operand(f: &mut fmt::Formatter<'_>, expr: &Expr, parens: bool) -> fmt::Result {
    if parens {
        write!(f, "({expr})")
    } else {
        write!(f, "{expr}")
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, list: &[Expr]) -> fmt::Result {
    for (i, e) in list.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{e}")?;
    }
    Ok(())
}
