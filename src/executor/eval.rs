//! Expression evaluation over a single row or a group of rows.

use crate::query::error::{QueryErr, Result};
use crate::query::{BinaryOp, Expr, UnaryOp};
use crate::storage::{DataValue, Row};
use std::cmp::Ordering;

const AGGREGATES: [&str; 5] = ["COUNT", "SUM", "AVG", "MIN", "MAX"];

/// 현재 행에서 보이는 컬럼들: (테이블 바인딩, 컬럼 이름)
#[derive(Debug, Clone, Default)]
pub struct Scope {
    columns: Vec<(String, String)>,
}

impl Scope {
    pub fn push(&mut self, table: &str, column: &str) {
        self.columns.push((table.to_string(), column.to_string()));
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &str)> {
        self.columns.iter().map(|(t, c)| (t.as_str(), c.as_str()))
    }

    pub fn resolve(&self, table: Option<&str>, name: &str) -> Result<usize> {
        let display = || match table {
            Some(t) => format!("{t}.{name}"),
            None => name.to_string(),
        };
        let mut found = None;
        for (i, (t, c)) in self.columns.iter().enumerate() {
            if c.eq_ignore_ascii_case(name) && table.is_none_or(|q| t.eq_ignore_ascii_case(q)) {
                if found.is_some() {
                    return Err(QueryErr::AmbiguousColumn(display()));
                }
                found = Some(i);
            }
        }
        found.ok_or_else(|| QueryErr::NoSuchColumn(display()))
    }

    /// 실행 전에 식 안의 컬럼 참조를 모두 확인합니다. 행이 없어도 오류를 잡기 위함.
    pub fn validate(&self, expr: &Expr) -> Result<()> {
        match expr {
            Expr::Column { table, name } => self.resolve(table.as_deref(), name).map(|_| ()),
            Expr::Unary { right, .. } => self.validate(right),
            Expr::Binary { left, right, .. } => {
                self.validate(left)?;
                self.validate(right)
            }
            Expr::IsNull { expr, .. } => self.validate(expr),
            Expr::InList { expr, list, .. } => {
                self.validate(expr)?;
                list.iter().try_for_each(|e| self.validate(e))
            }
            Expr::Between {
                expr, low, high, ..
            } => {
                self.validate(expr)?;
                self.validate(low)?;
                self.validate(high)
            }
            Expr::Call { args, .. } => args.iter().try_for_each(|e| self.validate(e)),
            _ => Ok(()),
        }
    }
}

/// 평가 환경. `group`이 있으면 집계 함수를 쓸 수 있습니다.
#[derive(Clone, Copy)]
pub struct Env<'a> {
    pub scope: &'a Scope,
    pub row: &'a Row,
    pub group: Option<&'a [Row]>,
}

pub fn is_aggregate(name: &str) -> bool {
    AGGREGATES.iter().any(|a| a.eq_ignore_ascii_case(name))
}

pub fn contains_aggregate(expr: &Expr) -> bool {
    first_aggregate(expr).is_some()
}

/// 식 안에서 처음 나오는 집계 함수의 이름
pub fn first_aggregate(expr: &Expr) -> Option<&str> {
    match expr {
        Expr::Call { name, .. } if is_aggregate(name) => Some(&**name),
        Expr::Call { args, .. } => args.iter().find_map(first_aggregate),
        Expr::Unary { right, .. } => first_aggregate(right),
        Expr::Binary { left, right, .. } => first_aggregate(left).or_else(|| first_aggregate(right)),
        Expr::IsNull { expr, .. } => first_aggregate(expr),
        Expr::InList { expr, list, .. } => {
            first_aggregate(expr).or_else(|| list.iter().find_map(first_aggregate))
        }
        Expr::Between {
            expr, low, high, ..
        } => first_aggregate(expr)
            .or_else(|| first_aggregate(low))
            .or_else(|| first_aggregate(high)),
        _ => None,
    }
}

pub fn eval(expr: &Expr, env: Env<'_>) -> Result<DataValue> {
    Ok(match expr {
        Expr::Null => DataValue::Null,
        Expr::Bool(b) => DataValue::Bool(*b),
        Expr::Int(i) => DataValue::Int(*i),
        Expr::Float(f) => DataValue::Float(*f),
        Expr::Text(t) => DataValue::String(t.to_string()),
        Expr::Column { table, name } => {
            let idx = env.scope.resolve(table.as_deref(), name)?;
            env.row.get(idx).cloned().unwrap_or_default()
        }
        Expr::Quoted(name) => match env.scope.resolve(None, name) {
            Ok(idx) => env.row.get(idx).cloned().unwrap_or_default(),
            Err(QueryErr::NoSuchColumn(_)) => DataValue::String(name.to_string()),
            Err(e) => return Err(e),
        },
        Expr::Star => {
            return Err(QueryErr::TypeMismatch(
                "* is only allowed inside COUNT(*)".to_string(),
            ));
        }
        Expr::Unary { op, right } => {
            let value = eval(right, env)?;
            match op {
                UnaryOp::Neg => negate(value)?,
                UnaryOp::Not if value.is_null() => DataValue::Null,
                UnaryOp::Not => DataValue::Bool(!value.is_truthy()),
            }
        }
        Expr::Binary { op, left, right } => eval_binary(*op, left, right, env)?,
        Expr::IsNull { expr, negated } => DataValue::Bool(eval(expr, env)?.is_null() != *negated),
        Expr::InList {
            expr,
            list,
            negated,
        } => {
            let value = eval(expr, env)?;
            if value.is_null() {
                return Ok(DataValue::Null);
            }
            let mut saw_null = false;
            for item in list {
                let item = eval(item, env)?;
                if item.is_null() {
                    saw_null = true;
                } else if item.same_as(&value) {
                    return Ok(DataValue::Bool(!negated));
                }
            }
            if saw_null {
                DataValue::Null
            } else {
                DataValue::Bool(*negated)
            }
        }
        Expr::Between {
            expr,
            low,
            high,
            negated,
        } => {
            let value = eval(expr, env)?;
            let low = eval(low, env)?;
            let high = eval(high, env)?;
            if value.is_null() || low.is_null() || high.is_null() {
                return Ok(DataValue::Null);
            }
            let inside = value.total_cmp(&low) != Ordering::Less
                && value.total_cmp(&high) != Ordering::Greater;
            DataValue::Bool(inside != *negated)
        }
        Expr::Call {
            name,
            args,
            distinct,
        } => {
            if is_aggregate(name) {
                eval_aggregate(name, args, *distinct, env)?
            } else {
                eval_scalar(name, args, env)?
            }
        }
    })
}

fn negate(value: DataValue) -> Result<DataValue> {
    Ok(match value {
        DataValue::Null => DataValue::Null,
        DataValue::Int(i) => i
            .checked_neg()
            .map_or(DataValue::Float(-(i as f64)), DataValue::Int),
        DataValue::Float(f) => DataValue::Float(-f),
        DataValue::Bool(b) => DataValue::Int(-(b as i64)),
        DataValue::String(s) => {
            return Err(QueryErr::TypeMismatch(format!("cannot negate text '{s}'")));
        }
    })
}

fn eval_binary(op: BinaryOp, left: &Expr, right: &Expr, env: Env<'_>) -> Result<DataValue> {
    if let BinaryOp::And | BinaryOp::Or = op {
        return logical(op == BinaryOp::Or, left, right, env);
    }

    let l = eval(left, env)?;
    let r = eval(right, env)?;
    if l.is_null() || r.is_null() {
        return Ok(DataValue::Null);
    }
    let cmp = || l.total_cmp(&r);
    Ok(match op {
        BinaryOp::Eq => DataValue::Bool(cmp() == Ordering::Equal),
        BinaryOp::Ne => DataValue::Bool(cmp() != Ordering::Equal),
        BinaryOp::Lt => DataValue::Bool(cmp() == Ordering::Less),
        BinaryOp::Le => DataValue::Bool(cmp() != Ordering::Greater),
        BinaryOp::Gt => DataValue::Bool(cmp() == Ordering::Greater),
        BinaryOp::Ge => DataValue::Bool(cmp() != Ordering::Less),
        BinaryOp::Like => DataValue::Bool(like(&l.to_string(), &r.to_string())),
        BinaryOp::Concat => DataValue::String(format!("{l}{r}")),
        _ => arithmetic(op, &l, &r)?,
    })
}

/// AND/OR의 삼값 논리. `short`는 결과를 바로 정하는 값 (OR이면 참).
fn logical(short: bool, left: &Expr, right: &Expr, env: Env<'_>) -> Result<DataValue> {
    let l = eval(left, env)?;
    if !l.is_null() && l.is_truthy() == short {
        return Ok(DataValue::Bool(short));
    }
    let r = eval(right, env)?;
    if !r.is_null() && r.is_truthy() == short {
        return Ok(DataValue::Bool(short));
    }
    if l.is_null() || r.is_null() {
        return Ok(DataValue::Null);
    }
    Ok(DataValue::Bool(!short))
}

fn arithmetic(op: BinaryOp, l: &DataValue, r: &DataValue) -> Result<DataValue> {
    let mismatch = || {
        QueryErr::TypeMismatch(format!(
            "cannot apply {} to {l} and {r}",
            op.as_str()
        ))
    };
    let (Some(lf), Some(rf)) = (l.as_f64(), r.as_f64()) else {
        return Err(mismatch());
    };
    if let (Some(a), Some(b)) = (l.as_int(), r.as_int()) {
        let value = match op {
            BinaryOp::Add => a.checked_add(b),
            BinaryOp::Sub => a.checked_sub(b),
            BinaryOp::Mul => a.checked_mul(b),
            BinaryOp::Div | BinaryOp::Mod if b == 0 => return Ok(DataValue::Null),
            BinaryOp::Div => a.checked_div(b),
            BinaryOp::Mod => a.checked_rem(b),
            _ => return Err(mismatch()),
        };
        if let Some(v) = value {
            return Ok(DataValue::Int(v));
        }
    }
    Ok(match op {
        BinaryOp::Add => DataValue::Float(lf + rf),
        BinaryOp::Sub => DataValue::Float(lf - rf),
        BinaryOp::Mul => DataValue::Float(lf * rf),
        BinaryOp::Div if rf == 0.0 => DataValue::Null,
        BinaryOp::Div => DataValue::Float(lf / rf),
        BinaryOp::Mod => {
            let (a, b) = (lf as i64, rf as i64);
            if b == 0 {
                DataValue::Null
            } else {
                DataValue::Int(a.wrapping_rem(b))
            }
        }
        _ => return Err(mismatch()),
    })
}

/// `%`는 임의 길이, `_`는 한 글자. ASCII 대소문자를 구분하지 않습니다.
pub fn like(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().map(|c| c.to_ascii_lowercase()).collect();
    let pattern: Vec<char> = pattern.chars().map(|c| c.to_ascii_lowercase()).collect();
    let (mut t, mut p) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;
    while t < text.len() {
        if p < pattern.len() && (pattern[p] == '_' || pattern[p] == text[t]) {
            t += 1;
            p += 1;
        } else if p < pattern.len() && pattern[p] == '%' {
            backtrack = Some((p, t));
            p += 1;
        } else if let Some((bp, bt)) = backtrack {
            p = bp + 1;
            t = bt + 1;
            backtrack = Some((bp, bt + 1));
        } else {
            return false;
        }
    }
    pattern[p..].iter().all(|&c| c == '%')
}

fn eval_aggregate(name: &str, args: &[Expr], distinct: bool, env: Env<'_>) -> Result<DataValue> {
    let group = env
        .group
        .ok_or_else(|| QueryErr::MisusedAggregate(name.to_string()))?;
    let [arg] = args else {
        return Err(QueryErr::WrongArgCount(name.to_string()));
    };
    let func = name.to_ascii_uppercase();
    if matches!(arg, Expr::Star) {
        if func != "COUNT" || distinct {
            return Err(QueryErr::WrongArgCount(name.to_string()));
        }
        return Ok(DataValue::Int(group.len() as i64));
    }

    let mut values: Vec<DataValue> = Vec::with_capacity(group.len());
    for row in group {
        // 집계 인자 안에서는 다시 집계할 수 없음
        let inner = Env {
            scope: env.scope,
            row,
            group: None,
        };
        let value = eval(arg, inner)?;
        if value.is_null() || (distinct && values.iter().any(|v| v.same_as(&value))) {
            continue;
        }
        values.push(value);
    }

    Ok(match func.as_str() {
        "COUNT" => DataValue::Int(values.len() as i64),
        "SUM" => sum(&values),
        "AVG" => {
            let nums: Vec<f64> = values.iter().filter_map(DataValue::as_f64).collect();
            if nums.is_empty() {
                DataValue::Null
            } else {
                DataValue::Float(nums.iter().sum::<f64>() / nums.len() as f64)
            }
        }
        "MIN" => values
            .into_iter()
            .min_by(|a, b| a.total_cmp(b))
            .unwrap_or_default(),
        "MAX" => values
            .into_iter()
            .max_by(|a, b| a.total_cmp(b))
            .unwrap_or_default(),
        _ => return Err(QueryErr::NoSuchFunction(name.to_string())),
    })
}

/// 정수만 더하면 정수, 하나라도 실수면 실수. 숫자가 아닌 값은 건너뜁니다.
fn sum(values: &[DataValue]) -> DataValue {
    let nums: Vec<&DataValue> = values.iter().filter(|v| v.as_f64().is_some()).collect();
    if nums.is_empty() {
        return DataValue::Null;
    }
    let ints: Option<Vec<i64>> = nums.iter().map(|v| v.as_int()).collect();
    if let Some(ints) = ints
        && let Some(total) = ints.iter().try_fold(0i64, |acc, &i| acc.checked_add(i))
    {
        return DataValue::Int(total);
    }
    DataValue::Float(nums.iter().filter_map(|v| v.as_f64()).sum())
}

fn eval_scalar(name: &str, args: &[Expr], env: Env<'_>) -> Result<DataValue> {
    let func = name.to_ascii_uppercase();
    let arity = |ok: bool| {
        if ok {
            Ok(())
        } else {
            Err(QueryErr::WrongArgCount(name.to_string()))
        }
    };
    match func.as_str() {
        "UPPER" | "LOWER" | "LENGTH" | "ABS" => arity(args.len() == 1)?,
        "ROUND" => arity(matches!(args.len(), 1 | 2))?,
        "COALESCE" => arity(!args.is_empty())?,
        _ => return Err(QueryErr::NoSuchFunction(name.to_string())),
    }

    let mut values = Vec::with_capacity(args.len());
    for arg in args {
        values.push(eval(arg, env)?);
    }
    if func == "COALESCE" {
        return Ok(values
            .into_iter()
            .find(|v| !v.is_null())
            .unwrap_or_default());
    }
    let value = &values[0];
    if value.is_null() {
        return Ok(DataValue::Null);
    }
    Ok(match func.as_str() {
        "UPPER" => DataValue::String(value.to_string().to_uppercase()),
        "LOWER" => DataValue::String(value.to_string().to_lowercase()),
        "LENGTH" => DataValue::Int(value.to_string().chars().count() as i64),
        "ABS" => match value {
            DataValue::Float(f) => DataValue::Float(f.abs()),
            other => match other.as_int() {
                Some(i) => DataValue::Int(i.saturating_abs()),
                None => {
                    return Err(QueryErr::TypeMismatch(format!("ABS of text '{other}'")));
                }
            },
        },
        "ROUND" => {
            let Some(x) = value.as_f64() else {
                return Err(QueryErr::TypeMismatch(format!("ROUND of text '{value}'")));
            };
            let digits = values.get(1).and_then(DataValue::as_int).unwrap_or(0).clamp(0, 15);
            let scale = 10f64.powi(digits as i32);
            DataValue::Float((x * scale).round() / scale)
        }
        _ => return Err(QueryErr::NoSuchFunction(name.to_string())),
    })
}
