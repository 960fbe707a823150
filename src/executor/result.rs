use crate::storage::Row;
use std::fmt;

/// 쿼리 결과 표. 행 순서는 실행 순서 그대로입니다.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl QueryResult {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// 이름이 같은 컬럼들의 위치 (대소문자 구분). 같은 이름이 여럿일 수 있습니다.
    pub fn positions<'a>(&'a self, name: &'a str) -> impl Iterator<Item = usize> + 'a {
        self.columns
            .iter()
            .enumerate()
            .filter(move |(_, c)| *c == name)
            .map(|(i, _)| i)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.positions(name).next().is_some()
    }
}

impl fmt::Display for QueryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cells: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| row.iter().map(|v| v.to_string()).collect())
            .collect();
        let mut widths: Vec<usize> = self.columns.iter().map(|c| c.chars().count()).collect();
        for row in &cells {
            for (w, cell) in widths.iter_mut().zip(row) {
                *w = (*w).max(cell.chars().count());
            }
        }
        let line = |f: &mut fmt::Formatter<'_>, items: &[String]| -> fmt::Result {
            write!(f, "|")?;
            for (item, &w) in items.iter().zip(&widths) {
                write!(f, " {item:<w$} |")?;
            }
            writeln!(f)
        };
        line(f, &self.columns)?;
        write!(f, "|")?;
        for w in &widths {
            write!(f, "{}|", "-".repeat(w + 2))?;
        }
        writeln!(f)?;
        for row in &cells {
            line(f, row)?;
        }
        let n = self.rows.len();
        write!(f, "({n} row{})", if n == 1 { "" } else { "s" })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::storage::DataValue;

    fn sample() -> QueryResult {
        QueryResult {
            columns: vec!["name".to_string(), "price".to_string()],
            rows: vec![
                vec!["Wireless Mouse".into(), DataValue::Int(25)],
                vec!["Notebook".into(), DataValue::Int(5)],
            ],
        }
    }

    #[test]
    fn test_lookup() {
        let result = sample();
        assert_eq!(result.positions("price").collect::<Vec<_>>(), vec![1]);
        assert!(result.has_column("name"));
        assert!(!result.has_column("Price"));

        let doubled = QueryResult {
            columns: vec!["id".to_string(), "name".to_string(), "id".to_string()],
            rows: Vec::new(),
        };
        assert_eq!(doubled.positions("id").collect::<Vec<_>>(), vec![0, 2]);
    }

    #[test]
    fn test_display() {
        let expected = "\
| name           | price |
|----------------|-------|
| Wireless Mouse | 25    |
| Notebook       | 5     |
(2 rows)";
        assert_eq!(sample().to_string(), expected);
    }
}
