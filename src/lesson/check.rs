//! Lesson grading.
//!
//! Every lesson carries one [`Check`]. A check inspects the result table of the
//! learner's query and either answers yes/no or fails to inspect it at all
//! (a column it needs is missing, values can't be compared). The second case is
//! reported separately so the learner knows the query ran but could not be graded.

use crate::executor::QueryResult;
use crate::storage::DataValue;
use std::cmp::Ordering;
use thiserror::Error;

use super::Lesson;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CheckErr {
    #[error("column '{0}' is not in the result")]
    MissingColumn(&'static str),
    #[error("column '{0}' appears more than once in the result")]
    DuplicateColumn(&'static str),
    #[error("the result has no column #{}", .0 + 1)]
    MissingPosition(usize),
    #[error("cannot compare {left} with {right}")]
    Incomparable { left: String, right: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    /// 6 rows, 6 columns
    EmployeeListing,
    /// 2 rows, every `price` below 100
    CheapProducts,
    /// 3 rows, first `price` >= second `price`
    TopThreeByPrice,
    /// 4 rows, `category` values unique
    DistinctCategories,
    /// 5 rows with both `name` and `id` columns
    OrdersWithCustomers,
    /// 3 rows, one of them Electronics with 1650 in the second column
    SalesPerCategory,
    /// 1 row, and it is Electronics
    ElectronicsOnly,
}

impl Check {
    /// 조건은 왼쪽부터 확인하며, 앞의 조건이 거짓이면 뒤는 보지 않습니다.
    pub fn evaluate(&self, result: &QueryResult) -> Result<bool, CheckErr> {
        let rows = result.row_count();
        Ok(match self {
            Check::EmployeeListing => rows == 6 && result.column_count() == 6,
            Check::CheapProducts => {
                if rows != 2 {
                    return Ok(false);
                }
                let limit = DataValue::Int(100);
                for price in column(result, "price")? {
                    if compare(price, &limit)? != Some(Ordering::Less) {
                        return Ok(false);
                    }
                }
                true
            }
            Check::TopThreeByPrice => {
                if rows != 3 {
                    return Ok(false);
                }
                let prices: Vec<_> = column(result, "price")?.collect();
                matches!(
                    compare(prices[0], prices[1])?,
                    Some(Ordering::Greater | Ordering::Equal)
                )
            }
            Check::DistinctCategories => {
                if rows != 4 {
                    return Ok(false);
                }
                let categories: Vec<_> = column(result, "category")?.collect();
                categories
                    .iter()
                    .enumerate()
                    .all(|(i, a)| categories[..i].iter().all(|b| !a.same_as(b)))
            }
            Check::OrdersWithCustomers => {
                rows == 5 && result.has_column("name") && result.has_column("id")
            }
            Check::SalesPerCategory => {
                if rows != 3 {
                    return Ok(false);
                }
                let category = index(result, "category")?;
                if result.column_count() < 2 {
                    return Err(CheckErr::MissingPosition(1));
                }
                result.rows.iter().any(|row| {
                    row[category].as_str() == Some("Electronics")
                        && row[1].as_f64() == Some(1650.0)
                })
            }
            Check::ElectronicsOnly => {
                rows == 1
                    && result.rows[0][index(result, "category")?].as_str() == Some("Electronics")
            }
        })
    }
}

/// 이름으로 컬럼 하나를 찾습니다. 같은 이름이 둘 이상이면 어느 쪽인지 알 수 없으므로 오류.
fn index(result: &QueryResult, name: &'static str) -> Result<usize, CheckErr> {
    let mut found = result.positions(name);
    match (found.next(), found.next()) {
        (Some(idx), None) => Ok(idx),
        (Some(_), Some(_)) => Err(CheckErr::DuplicateColumn(name)),
        (None, _) => Err(CheckErr::MissingColumn(name)),
    }
}

fn column<'a>(
    result: &'a QueryResult,
    name: &'static str,
) -> Result<impl Iterator<Item = &'a DataValue>, CheckErr> {
    let idx = index(result, name)?;
    Ok(result.rows.iter().map(move |row| &row[idx]))
}

/// 숫자끼리, 문자열끼리만 비교합니다. NULL이 끼면 `None`(거짓 취급).
fn compare(a: &DataValue, b: &DataValue) -> Result<Option<Ordering>, CheckErr> {
    if a.is_null() || b.is_null() {
        return Ok(None);
    }
    if let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) {
        return Ok(x.partial_cmp(&y));
    }
    if let (Some(x), Some(y)) = (a.as_str(), b.as_str()) {
        return Ok(Some(x.cmp(y)));
    }
    Err(CheckErr::Incomparable {
        left: a.to_string(),
        right: b.to_string(),
    })
}

/// 채점 결과
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Pass,
    Fail,
    /// 쿼리는 실행됐지만 채점 자체가 실패함
    Unverifiable(CheckErr),
}

impl Verdict {
    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Pass)
    }

    pub fn message(&self) -> String {
        match self {
            Verdict::Pass => "Correct! Great job.".to_string(),
            Verdict::Fail => "The query ran successfully, but the result isn't quite what we're looking for. Try again!".to_string(),
            Verdict::Unverifiable(e) => {
                format!("The query ran, but we couldn't verify the result: {e}")
            }
        }
    }
}

pub fn validate(lesson: &Lesson, result: &QueryResult) -> Verdict {
    match lesson.check.evaluate(result) {
        Ok(true) => Verdict::Pass,
        Ok(false) => Verdict::Fail,
        Err(e) => Verdict::Unverifiable(e),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::executor::Executor;
    use crate::lesson::lessons;
    use crate::storage::seed_dataset;

    fn grade(lesson: usize, sql: &str) -> Verdict {
        let exe = Executor::new(seed_dataset().unwrap());
        let result = exe.run(sql).unwrap();
        validate(&lessons()[lesson], &result)
    }

    #[test]
    fn test_every_solution_passes() {
        let exe = Executor::new(seed_dataset().unwrap());
        for lesson in lessons() {
            let result = exe.run(lesson.solution).unwrap();
            assert_eq!(
                validate(lesson, &result),
                Verdict::Pass,
                "solution of lesson {} fails its own check",
                lesson.id
            );
        }
    }

    #[test]
    fn test_every_default_query_runs() {
        let exe = Executor::new(seed_dataset().unwrap());
        for lesson in lessons() {
            assert!(exe.run(lesson.default_query).is_ok(), "lesson {}", lesson.id);
        }
    }

    #[test]
    fn test_select_where() {
        assert_eq!(grade(1, "SELECT * FROM products WHERE price < 100"), Verdict::Pass);
        assert_eq!(grade(1, "SELECT * FROM products WHERE price <= 150"), Verdict::Fail);
        assert_eq!(
            grade(1, "SELECT * FROM products WHERE price > 300"),
            Verdict::Fail
        );
    }

    #[test]
    fn test_order_limit_checks_first_two_rows() {
        assert_eq!(
            grade(2, "SELECT * FROM products ORDER BY price DESC LIMIT 3"),
            Verdict::Pass
        );
        assert_eq!(
            grade(2, "SELECT * FROM products ORDER BY price ASC LIMIT 3"),
            Verdict::Fail
        );
    }

    #[test]
    fn test_group_by() {
        assert_eq!(
            grade(5, "SELECT category, SUM(total) AS sales FROM orders GROUP BY category"),
            Verdict::Pass
        );
        assert_eq!(
            grade(5, "SELECT category, SUM(total) FROM orders GROUP BY 1"),
            Verdict::Pass
        );
        assert_eq!(grade(5, "SELECT * FROM orders"), Verdict::Fail);
        assert_eq!(
            grade(5, "SELECT category, COUNT(*) FROM orders GROUP BY category"),
            Verdict::Fail
        );
    }

    #[test]
    fn test_join_needs_both_columns() {
        assert_eq!(
            grade(4, "SELECT o.id, c.name FROM orders o JOIN customers c ON o.customer_id = c.id"),
            Verdict::Pass
        );
        assert_eq!(
            grade(4, "SELECT orders.id, customers.email FROM orders JOIN customers ON orders.customer_id = customers.id"),
            Verdict::Fail
        );
    }

    #[test]
    fn test_missing_column_is_unverifiable() {
        assert_eq!(
            grade(1, "SELECT name FROM products WHERE price < 100"),
            Verdict::Unverifiable(CheckErr::MissingColumn("price"))
        );
        assert_eq!(
            grade(5, "SELECT category FROM orders GROUP BY category"),
            Verdict::Unverifiable(CheckErr::MissingPosition(1))
        );
        assert_eq!(
            grade(6, "SELECT SUM(total) FROM orders"),
            Verdict::Unverifiable(CheckErr::MissingColumn("category"))
        );
    }

    #[test]
    fn test_duplicate_column_is_unverifiable() {
        assert_eq!(
            grade(3, "SELECT DISTINCT category, category FROM products"),
            Verdict::Unverifiable(CheckErr::DuplicateColumn("category"))
        );
        assert_eq!(
            grade(1, "SELECT price, price FROM products WHERE price < 100"),
            Verdict::Unverifiable(CheckErr::DuplicateColumn("price"))
        );
        assert_eq!(
            grade(6, "SELECT category, SUM(total), category FROM orders GROUP BY category HAVING SUM(total) > 1000"),
            Verdict::Unverifiable(CheckErr::DuplicateColumn("category"))
        );
        // 이름만 확인하는 단원은 중복이 있어도 채점됩니다
        assert_eq!(
            grade(4, "SELECT * FROM orders JOIN customers ON orders.customer_id = customers.id"),
            Verdict::Pass
        );
    }

    #[test]
    fn test_row_count_checked_before_columns() {
        assert_eq!(grade(1, "SELECT name FROM products"), Verdict::Fail);
        assert_eq!(grade(6, "SELECT name FROM products"), Verdict::Fail);
    }

    #[test]
    fn test_incomparable_values() {
        let result = QueryResult {
            columns: vec!["price".to_string()],
            rows: vec![
                vec![DataValue::from("cheap")],
                vec![DataValue::Int(1)],
                vec![DataValue::Int(2)],
            ],
        };
        assert!(matches!(
            Check::TopThreeByPrice.evaluate(&result),
            Err(CheckErr::Incomparable { .. })
        ));
    }

    #[test]
    fn test_messages() {
        assert_eq!(Verdict::Pass.message(), "Correct! Great job.");
        assert!(Verdict::Fail.message().contains("isn't quite what we're looking for"));
        assert_eq!(
            Verdict::Unverifiable(CheckErr::MissingPosition(1)).message(),
            "The query ran, but we couldn't verify the result: the result has no column #2"
        );
    }
}
