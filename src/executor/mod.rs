/*
SELECT 실행 순서

SQL은 쓰는 순서와 실행되는 순서가 다릅니다. 이 실행기는 아래 순서를 따릅니다.

1. FROM / JOIN   : 테이블을 읽고 이어 붙임
2. WHERE         : 행 단위로 거름
3. GROUP BY      : 같은 키끼리 묶음 (집계 함수만 있고 GROUP BY가 없으면 전체가 한 그룹)
4. HAVING        : 그룹 단위로 거름
5. SELECT        : 출력 컬럼 계산
6. DISTINCT      : 중복 행 제거 (처음 나온 행 유지)
7. ORDER BY      : 정렬 (안정 정렬, 오름차순에서 NULL이 먼저)
8. LIMIT/OFFSET  : 잘라냄

예시)
    `SELECT category, SUM(total) FROM orders GROUP BY category HAVING SUM(total) > 1000;`
    >>> Rows:
        | category    | SUM(total) |
        |-------------|------------|
        | Electronics | 1650       |

읽기 전용입니다. CREATE, INSERT, UPDATE, DELETE, DROP은 파서에서 거부됩니다.
*/

pub mod eval;
pub mod result;

use crate::query::error::{QueryErr, Result};
use crate::query::{Expr, JoinKind, Select, SelectItem, parse_query};
use crate::query::ast::FromClause;
use crate::storage::{DataValue, Database, Row};
use eval::{Env, Scope, contains_aggregate, eval};
use std::cmp::Ordering;
use tracing::debug;

pub use result::QueryResult;

/// 출력 컬럼 하나를 계산하는 방법
enum Projection<'a> {
    Column(usize),
    Expr(&'a Expr),
}

/// GROUP BY 키를 계산하는 방법
enum GroupKey {
    Column(usize),
    Expr(Expr),
}

/// ORDER BY 키를 계산하는 방법
enum SortKey {
    Output(usize),
    Expr(Expr),
}

/// 평가 단위: 일반 쿼리는 행 하나, 집계 쿼리는 그룹 하나
struct Unit {
    row: Row,
    group: Option<Vec<Row>>,
}

pub struct Executor {
    db: Database,
}

impl Executor {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn run(&self, src: &str) -> Result<QueryResult> {
        let select = parse_query(src)?;
        let result = self.execute(&select)?;
        debug!(
            rows = result.row_count(),
            columns = result.column_count(),
            "query executed"
        );
        Ok(result)
    }

    pub fn execute(&self, select: &Select) -> Result<QueryResult> {
        let (scope, rows) = self.scan(select.from.as_ref())?;
        let (columns, projections) = project(&scope, &select.items)?;
        let aliases = aliases(&select.items);

        for item in &select.items {
            if let SelectItem::Expr { expr, .. } = item {
                scope.validate(expr)?;
            }
        }
        let filter = match &select.filter {
            Some(expr) => {
                let filter = with_aliases(expr, &scope, &aliases, false);
                scope.validate(&filter)?;
                if contains_aggregate(&filter) {
                    return Err(misused_aggregate(&filter));
                }
                Some(filter)
            }
            None => None,
        };
        let group_keys = group_keys(select, &scope, &aliases, &projections)?;
        let having = match &select.having {
            Some(expr) => {
                let having = with_aliases(expr, &scope, &aliases, false);
                scope.validate(&having)?;
                Some(having)
            }
            None => None,
        };
        let sort_keys = sort_keys(select, &scope, &aliases, &columns)?;

        let mut filtered = Vec::with_capacity(rows.len());
        for row in rows {
            if let Some(filter) = &filter {
                let env = Env {
                    scope: &scope,
                    row: &row,
                    group: None,
                };
                if !eval(filter, env)?.is_truthy() {
                    continue;
                }
            }
            filtered.push(row);
        }

        let grouped = !group_keys.is_empty()
            || having.is_some()
            || select.items.iter().any(|item| match item {
                SelectItem::Expr { expr, .. } => contains_aggregate(expr),
                _ => false,
            })
            || sort_keys
                .iter()
                .any(|(key, _)| matches!(key, SortKey::Expr(expr) if contains_aggregate(expr)));
        let mut units = if grouped {
            self.group(&scope, &group_keys, filtered)?
        } else {
            filtered
                .into_iter()
                .map(|row| Unit { row, group: None })
                .collect()
        };

        if let Some(having) = &having {
            let mut kept = Vec::with_capacity(units.len());
            for unit in units {
                if eval(having, unit_env(&scope, &unit))?.is_truthy() {
                    kept.push(unit);
                }
            }
            units = kept;
        }

        let mut entries: Vec<(Row, Vec<DataValue>)> = Vec::with_capacity(units.len());
        for unit in &units {
            let env = unit_env(&scope, unit);
            let mut values = Vec::with_capacity(projections.len());
            for projection in &projections {
                values.push(match projection {
                    Projection::Column(idx) => unit.row[*idx].clone(),
                    Projection::Expr(expr) => eval(expr, env)?,
                });
            }
            let mut keys = Vec::with_capacity(sort_keys.len());
            for (key, _) in &sort_keys {
                keys.push(match key {
                    SortKey::Output(idx) => values[*idx].clone(),
                    SortKey::Expr(expr) => eval(expr, env)?,
                });
            }
            entries.push((values, keys));
        }

        if select.distinct {
            let mut unique: Vec<(Row, Vec<DataValue>)> = Vec::with_capacity(entries.len());
            for entry in entries {
                if !unique.iter().any(|(seen, _)| same_row(seen, &entry.0)) {
                    unique.push(entry);
                }
            }
            entries = unique;
        }

        if !sort_keys.is_empty() {
            entries.sort_by(|(_, a), (_, b)| {
                for ((x, y), (_, asc)) in a.iter().zip(b).zip(&sort_keys) {
                    let cmp = x.total_cmp(y);
                    let cmp = if *asc { cmp } else { cmp.reverse() };
                    if cmp != Ordering::Equal {
                        return cmp;
                    }
                }
                Ordering::Equal
            });
        }

        let offset = match &select.offset {
            Some(expr) => constant_int(expr, "OFFSET")?.max(0) as usize,
            None => 0,
        };
        let limit = match &select.limit {
            Some(expr) => usize::try_from(constant_int(expr, "LIMIT")?).ok(),
            None => None,
        };
        let rows = entries
            .into_iter()
            .skip(offset)
            .take(limit.unwrap_or(usize::MAX))
            .map(|(values, _)| values)
            .collect();

        Ok(QueryResult { columns, rows })
    }

    /// FROM 절을 읽어 (스코프, 행 목록)을 만듭니다. FROM이 없으면 빈 행 하나.
    fn scan(&self, from: Option<&FromClause>) -> Result<(Scope, Vec<Row>)> {
        let mut scope = Scope::default();
        let Some(from) = from else {
            return Ok((scope, vec![Vec::new()]));
        };

        let base = self
            .db
            .table(&from.base.name)
            .ok_or_else(|| QueryErr::NoSuchTable(from.base.name.to_string()))?;
        for column in &base.columns {
            scope.push(from.base.binding(), &column.name);
        }
        let mut rows: Vec<Row> = base.rows().cloned().collect();

        for join in &from.joins {
            let right = self
                .db
                .table(&join.table.name)
                .ok_or_else(|| QueryErr::NoSuchTable(join.table.name.to_string()))?;
            for column in &right.columns {
                scope.push(join.table.binding(), &column.name);
            }
            if let Some(on) = &join.on {
                scope.validate(on)?;
                if contains_aggregate(on) {
                    return Err(misused_aggregate(on));
                }
            }

            let mut joined = Vec::new();
            for left in rows {
                let mut matched = false;
                for r in right.rows() {
                    let mut row = left.clone();
                    row.extend(r.iter().cloned());
                    let keep = match &join.on {
                        Some(on) => eval(
                            on,
                            Env {
                                scope: &scope,
                                row: &row,
                                group: None,
                            },
                        )?
                        .is_truthy(),
                        None => true,
                    };
                    if keep {
                        matched = true;
                        joined.push(row);
                    }
                }
                if join.kind == JoinKind::Left && !matched {
                    let mut row = left;
                    row.resize(scope.len(), DataValue::Null);
                    joined.push(row);
                }
            }
            rows = joined;
        }
        Ok((scope, rows))
    }

    /// GROUP BY 키로 묶습니다. 그룹은 키 순서로 정렬됩니다.
    fn group(&self, scope: &Scope, keys: &[GroupKey], rows: Vec<Row>) -> Result<Vec<Unit>> {
        if keys.is_empty() {
            let row = rows
                .first()
                .cloned()
                .unwrap_or_else(|| vec![DataValue::Null; scope.len()]);
            return Ok(vec![Unit {
                row,
                group: Some(rows),
            }]);
        }

        let mut groups: Vec<(Vec<DataValue>, Vec<Row>)> = Vec::new();
        for row in rows {
            let env = Env {
                scope,
                row: &row,
                group: None,
            };
            let mut key = Vec::with_capacity(keys.len());
            for group_key in keys {
                key.push(match group_key {
                    GroupKey::Column(idx) => row[*idx].clone(),
                    GroupKey::Expr(expr) => eval(expr, env)?,
                });
            }
            match groups.iter_mut().find(|(k, _)| same_row(k, &key)) {
                Some((_, members)) => members.push(row),
                None => groups.push((key, vec![row])),
            }
        }
        groups.sort_by(|(a, _), (b, _)| compare_rows(a, b));

        Ok(groups
            .into_iter()
            .map(|(_, members)| Unit {
                row: members[0].clone(),
                group: Some(members),
            })
            .collect())
    }
}

fn unit_env<'a>(scope: &'a Scope, unit: &'a Unit) -> Env<'a> {
    Env {
        scope,
        row: &unit.row,
        group: unit.group.as_deref(),
    }
}

fn project<'a>(scope: &Scope, items: &'a [SelectItem]) -> Result<(Vec<String>, Vec<Projection<'a>>)> {
    let mut columns = Vec::new();
    let mut projections = Vec::new();
    for item in items {
        match item {
            SelectItem::Wildcard => {
                if scope.is_empty() {
                    return Err(QueryErr::NoTables);
                }
                for (idx, (_, name)) in scope.columns().enumerate() {
                    columns.push(name.to_string());
                    projections.push(Projection::Column(idx));
                }
            }
            SelectItem::TableWildcard(table) => {
                let before = columns.len();
                for (idx, (binding, name)) in scope.columns().enumerate() {
                    if binding.eq_ignore_ascii_case(table) {
                        columns.push(name.to_string());
                        projections.push(Projection::Column(idx));
                    }
                }
                if columns.len() == before {
                    return Err(QueryErr::NoSuchTable(table.to_string()));
                }
            }
            SelectItem::Expr { expr, alias } => {
                columns.push(match alias {
                    Some(alias) => alias.to_string(),
                    None => expr.output_name(),
                });
                projections.push(Projection::Expr(expr));
            }
        }
    }
    Ok((columns, projections))
}

/// SELECT 목록의 (별칭, 식)
fn aliases(items: &[SelectItem]) -> Vec<(&str, &Expr)> {
    items
        .iter()
        .filter_map(|item| match item {
            SelectItem::Expr {
                expr,
                alias: Some(alias),
            } => Some((&**alias, expr)),
            _ => None,
        })
        .collect()
}

/// 한정자 없는 이름 중 별칭과 같은 것을 별칭의 식으로 바꿉니다.
/// `prefer_alias`가 거짓이면 FROM 쪽 컬럼이 우선입니다.
fn with_aliases(expr: &Expr, scope: &Scope, aliases: &[(&str, &Expr)], prefer_alias: bool) -> Expr {
    let sub = |e: &Expr| with_aliases(e, scope, aliases, prefer_alias);
    match expr {
        Expr::Column { table: None, name } | Expr::Quoted(name) => {
            match aliases.iter().find(|(alias, _)| alias.eq_ignore_ascii_case(name)) {
                Some((_, target)) if prefer_alias || scope.resolve(None, name).is_err() => {
                    (*target).clone()
                }
                _ => expr.clone(),
            }
        }
        Expr::Unary { op, right } => Expr::Unary {
            op: *op,
            right: Box::new(sub(right)),
        },
        Expr::Binary { op, left, right } => Expr::Binary {
            op: *op,
            left: Box::new(sub(left)),
            right: Box::new(sub(right)),
        },
        Expr::IsNull { expr, negated } => Expr::IsNull {
            expr: Box::new(sub(expr)),
            negated: *negated,
        },
        Expr::InList {
            expr,
            list,
            negated,
        } => Expr::InList {
            expr: Box::new(sub(expr)),
            list: list.iter().map(sub).collect(),
            negated: *negated,
        },
        Expr::Between {
            expr,
            low,
            high,
            negated,
        } => Expr::Between {
            expr: Box::new(sub(expr)),
            low: Box::new(sub(low)),
            high: Box::new(sub(high)),
            negated: *negated,
        },
        Expr::Call {
            name,
            args,
            distinct,
        } => Expr::Call {
            name: name.clone(),
            args: args.iter().map(sub).collect(),
            distinct: *distinct,
        },
        _ => expr.clone(),
    }
}

/// GROUP BY 항목. 정수는 1부터 세는 출력 컬럼 위치입니다.
fn group_keys(
    select: &Select,
    scope: &Scope,
    aliases: &[(&str, &Expr)],
    projections: &[Projection<'_>],
) -> Result<Vec<GroupKey>> {
    let mut keys = Vec::with_capacity(select.group_by.len());
    for expr in &select.group_by {
        let key = match expr {
            Expr::Int(n) => {
                let idx = usize::try_from(*n)
                    .ok()
                    .filter(|&i| i >= 1 && i <= projections.len())
                    .ok_or(QueryErr::GroupByOutOfRange(*n))?;
                match &projections[idx - 1] {
                    Projection::Column(col) => GroupKey::Column(*col),
                    Projection::Expr(e) => GroupKey::Expr((*e).clone()),
                }
            }
            expr => GroupKey::Expr(with_aliases(expr, scope, aliases, false)),
        };
        if let GroupKey::Expr(e) = &key {
            scope.validate(e)?;
            if contains_aggregate(e) {
                return Err(misused_aggregate(e));
            }
        }
        keys.push(key);
    }
    Ok(keys)
}

/// ORDER BY 항목을 출력 위치, 별칭, 같은 식의 출력 컬럼 순으로 찾아봅니다.
fn sort_keys(
    select: &Select,
    scope: &Scope,
    aliases: &[(&str, &Expr)],
    columns: &[String],
) -> Result<Vec<(SortKey, bool)>> {
    // 와일드카드가 있으면 항목 위치와 출력 위치가 달라지므로 식으로 평가
    let plain = select
        .items
        .iter()
        .all(|item| matches!(item, SelectItem::Expr { .. }));
    let mut keys = Vec::with_capacity(select.order_by.len());
    for order in &select.order_by {
        let key = match &order.expr {
            Expr::Int(n) => {
                let idx = usize::try_from(*n)
                    .ok()
                    .filter(|&i| i >= 1 && i <= columns.len())
                    .ok_or(QueryErr::OrderByOutOfRange(*n))?;
                SortKey::Output(idx - 1)
            }
            expr => {
                let by_alias = || {
                    select.items.iter().position(|item| match (item, expr) {
                        (
                            SelectItem::Expr {
                                alias: Some(alias), ..
                            },
                            Expr::Column { table: None, name } | Expr::Quoted(name),
                        ) => alias.eq_ignore_ascii_case(name),
                        _ => false,
                    })
                };
                let by_expr = || {
                    select.items.iter().position(
                        |item| matches!(item, SelectItem::Expr { expr: e, .. } if e == expr),
                    )
                };
                match by_alias().or_else(by_expr) {
                    Some(idx) if plain => SortKey::Output(idx),
                    _ => {
                        let expr = with_aliases(expr, scope, aliases, true);
                        scope.validate(&expr)?;
                        SortKey::Expr(expr)
                    }
                }
            }
        };
        keys.push((key, order.asc));
    }
    Ok(keys)
}

fn constant_int(expr: &Expr, clause: &'static str) -> Result<i64> {
    let scope = Scope::default();
    let row = Vec::new();
    let env = Env {
        scope: &scope,
        row: &row,
        group: None,
    };
    eval(expr, env)?
        .as_int()
        .ok_or(QueryErr::InvalidLimit(clause))
}

fn misused_aggregate(expr: &Expr) -> QueryErr {
    let name = eval::first_aggregate(expr).map_or_else(|| expr.to_string(), str::to_string);
    QueryErr::MisusedAggregate(name)
}

fn same_row(a: &[DataValue], b: &[DataValue]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same_as(y))
}

fn compare_rows(a: &[DataValue], b: &[DataValue]) -> Ordering {
    a.iter()
        .zip(b)
        .map(|(x, y)| x.total_cmp(y))
        .find(|o| *o != Ordering::Equal)
        .unwrap_or(Ordering::Equal)
}
