pub mod seed;

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

pub use seed::seed_dataset;

#[repr(u8)]
#[derive(PartialEq, Eq, Hash, Clone, Debug, Copy)]
pub enum DataType {
    Int = 11,
    Float = 12,
    Bool = 13,
    String = 14,
}

#[derive(PartialEq, Clone, Debug, Default)]
pub enum DataValue {
    #[default]
    Null,
    Int(i64),
    Float(f64),
    Bool(bool),
    String(String),
}

impl DataType {
    /// 스키마 표시에 쓰는 SQL 타입 이름
    pub fn as_str(self) -> &'static str {
        match self {
            DataType::Int => "INTEGER",
            DataType::Float => "REAL",
            DataType::Bool => "BOOLEAN",
            DataType::String => "TEXT",
        }
    }
}

impl DataValue {
    /// NULL은 모든 타입에 들어갈 수 있습니다.
    pub fn verify(&self, data_type: DataType) -> bool {
        match self {
            DataValue::Null => true,
            DataValue::Int(_) => DataType::Int == data_type,
            DataValue::Float(_) => DataType::Float == data_type,
            DataValue::Bool(_) => DataType::Bool == data_type,
            DataValue::String(_) => DataType::String == data_type,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, DataValue::Null)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            DataValue::Int(i) => Some(*i),
            DataValue::Bool(b) => Some(*b as i64),
            _ => None,
        }
    }

    /// 숫자형 값을 f64로 읽습니다. 문자열은 숫자로 취급하지 않습니다.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            DataValue::Int(i) => Some(*i as f64),
            DataValue::Float(f) => Some(*f),
            DataValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            DataValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// WHERE/HAVING 조건으로서의 참 여부 (NULL은 거짓)
    pub fn is_truthy(&self) -> bool {
        match self {
            DataValue::Null => false,
            DataValue::Int(i) => *i != 0,
            DataValue::Float(f) => *f != 0.0,
            DataValue::Bool(b) => *b,
            DataValue::String(s) => s.trim().parse::<f64>().is_ok_and(|f| f != 0.0),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            DataValue::Null => 0,
            DataValue::Int(_) | DataValue::Float(_) | DataValue::Bool(_) => 1,
            DataValue::String(_) => 2,
        }
    }

    /// 정렬 순서: NULL < 숫자 < 문자열. 숫자끼리는 값으로 비교합니다.
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (DataValue::Int(a), DataValue::Int(b)) => a.cmp(b),
            (DataValue::String(a), DataValue::String(b)) => a.cmp(b),
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a.total_cmp(&b),
                _ => self.rank().cmp(&other.rank()),
            },
        }
    }

    /// 두 값이 같은지 (NULL끼리도 같다고 봄). DISTINCT와 GROUP BY에서 사용.
    pub fn same_as(&self, other: &Self) -> bool {
        self.total_cmp(other) == Ordering::Equal
    }
}

impl fmt::Display for DataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataValue::Null => write!(f, "NULL"),
            DataValue::Int(i) => write!(f, "{i}"),
            DataValue::Float(x) => write!(f, "{x:?}"),
            DataValue::Bool(b) => write!(f, "{b}"),
            DataValue::String(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for DataValue {
    fn from(value: i64) -> Self {
        DataValue::Int(value)
    }
}

impl From<&str> for DataValue {
    fn from(value: &str) -> Self {
        DataValue::String(value.to_string())
    }
}

pub type Row = Vec<DataValue>;

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub data_type: DataType,
    pub primary_key: bool,
    /// 선언만 하고 강제하지 않는 참조 (테이블, 컬럼)
    pub references: Option<(String, String)>,
}

impl ColumnDef {
    pub fn new(name: &str, data_type: DataType) -> Self {
        Self {
            name: name.to_string(),
            data_type,
            primary_key: false,
            references: None,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn references(mut self, table: &str, column: &str) -> Self {
        self.references = Some((table.to_string(), column.to_string()));
        self
    }
}

/// 기본 키를 row id로 삼는 테이블. 스캔은 id 오름차순입니다.
#[derive(Debug, Clone)]
pub struct Table {
    pub name: String,
    pub columns: Vec<ColumnDef>,
    rows: BTreeMap<i64, Row>,
    next_id: i64,
}

impl Table {
    pub fn rows(&self) -> impl Iterator<Item = &Row> {
        self.rows.values()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StorageErr {
    #[error("table {0} already exists")]
    TableExists(String),
    #[error("no such table: {0}")]
    NoSuchTable(String),
    #[error("table {table} has {expected} columns but {found} values were supplied")]
    ArityMismatch {
        table: String,
        expected: usize,
        found: usize,
    },
    #[error("value {value} does not fit column {table}.{column} ({data_type})")]
    TypeMismatch {
        table: String,
        column: String,
        data_type: &'static str,
        value: String,
    },
    #[error("UNIQUE constraint failed: {table}.{column} = {id}")]
    DuplicateKey {
        table: String,
        column: String,
        id: i64,
    },
}

/// 메모리 위의 데이터베이스. 테이블은 생성 순서대로 보관합니다.
#[derive(Debug, Clone, Default)]
pub struct Database {
    tables: Vec<Table>,
}

impl Database {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_table(&mut self, name: &str, columns: Vec<ColumnDef>) -> Result<(), StorageErr> {
        if self.table(name).is_some() {
            return Err(StorageErr::TableExists(name.to_string()));
        }
        self.tables.push(Table {
            name: name.to_string(),
            columns,
            rows: BTreeMap::new(),
            next_id: 1,
        });
        Ok(())
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name))
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    /// 행을 추가하고 row id를 돌려줍니다.
    ///
    /// 정수 기본 키가 있으면 그 값이 row id가 되고, 없으면 순번을 매깁니다.
    pub fn insert(&mut self, table: &str, values: Row) -> Result<i64, StorageErr> {
        let t = self
            .tables
            .iter_mut()
            .find(|t| t.name.eq_ignore_ascii_case(table))
            .ok_or_else(|| StorageErr::NoSuchTable(table.to_string()))?;
        if values.len() != t.columns.len() {
            return Err(StorageErr::ArityMismatch {
                table: t.name.clone(),
                expected: t.columns.len(),
                found: values.len(),
            });
        }
        for (value, column) in values.iter().zip(&t.columns) {
            if !value.verify(column.data_type) {
                return Err(StorageErr::TypeMismatch {
                    table: t.name.clone(),
                    column: column.name.clone(),
                    data_type: column.data_type.as_str(),
                    value: value.to_string(),
                });
            }
        }
        let key = t
            .columns
            .iter()
            .position(|c| c.primary_key)
            .and_then(|i| values[i].as_int().map(|id| (i, id)));
        let id = match key {
            Some((i, id)) => {
                if t.rows.contains_key(&id) {
                    return Err(StorageErr::DuplicateKey {
                        table: t.name.clone(),
                        column: t.columns[i].name.clone(),
                        id,
                    });
                }
                id
            }
            None => t.next_id,
        };
        t.next_id = t.next_id.max(id + 1);
        t.rows.insert(id, values);
        Ok(id)
    }

    /// (테이블 이름, [(컬럼 이름, 타입)]) 목록
    pub fn schema(&self) -> Vec<(String, Vec<(String, &'static str)>)> {
        self.tables
            .iter()
            .map(|t| {
                let columns = t
                    .columns
                    .iter()
                    .map(|c| (c.name.clone(), c.data_type.as_str()))
                    .collect();
                (t.name.clone(), columns)
            })
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn people() -> Database {
        let mut db = Database::new();
        db.create_table(
            "people",
            vec![
                ColumnDef::new("id", DataType::Int).primary_key(),
                ColumnDef::new("name", DataType::String),
            ],
        )
        .unwrap();
        db
    }

    #[test]
    fn test_insert_orders_by_id() {
        let mut db = people();
        db.insert("people", vec![DataValue::Int(3), "C".into()]).unwrap();
        db.insert("people", vec![DataValue::Int(1), "A".into()]).unwrap();
        let names: Vec<_> = db
            .table("people")
            .unwrap()
            .rows()
            .map(|r| r[1].to_string())
            .collect();
        assert_eq!(names, vec!["A", "C"]);
    }

    #[test]
    fn test_insert_constraints() {
        let mut db = people();
        db.insert("people", vec![DataValue::Int(1), "A".into()]).unwrap();
        assert!(matches!(
            db.insert("people", vec![DataValue::Int(1), "B".into()]),
            Err(StorageErr::DuplicateKey { id: 1, .. })
        ));
        assert!(matches!(
            db.insert("people", vec![DataValue::Int(2)]),
            Err(StorageErr::ArityMismatch { .. })
        ));
        assert!(matches!(
            db.insert("people", vec!["x".into(), "B".into()]),
            Err(StorageErr::TypeMismatch { .. })
        ));
        assert!(matches!(
            db.insert("nobody", vec![]),
            Err(StorageErr::NoSuchTable(_))
        ));
        assert_eq!(db.insert("people", vec![DataValue::Null, "N".into()]), Ok(2));
    }

    #[test]
    fn test_create_twice() {
        let mut db = people();
        assert_eq!(
            db.create_table("PEOPLE", vec![]),
            Err(StorageErr::TableExists("PEOPLE".to_string()))
        );
    }

    #[test]
    fn test_value_ordering() {
        use std::cmp::Ordering::*;
        assert_eq!(DataValue::Null.total_cmp(&DataValue::Int(0)), Less);
        assert_eq!(DataValue::Int(2).total_cmp(&DataValue::Float(1.5)), Greater);
        assert_eq!(DataValue::Int(1650).total_cmp(&DataValue::Float(1650.0)), Equal);
        assert_eq!(DataValue::Int(9).total_cmp(&"1".into()), Less);
        assert!(DataValue::Null.same_as(&DataValue::Null));
    }
}
