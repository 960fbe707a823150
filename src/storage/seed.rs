//! 튜토리얼에서 쓰는 고정 데이터셋.
//!
//! 네 개의 테이블(employees, products, customers, orders)을 만들고 값을 채웁니다.
//! 수업 채점이 이 값들에 의존하므로 행을 바꾸면 안 됩니다.

use super::{ColumnDef, DataType, Database, StorageErr};
use tracing::debug;

const EMPLOYEES: [(i64, &str, &str, i64, &str, &str); 6] = [
    (1, "Alice Johnson", "Engineer", 85000, "Engineering", "2021-03-15"),
    (2, "Bob Smith", "Marketing", 62000, "Sales", "2020-06-01"),
    (3, "Charlie Brown", "Engineer", 90000, "Engineering", "2019-11-20"),
    (4, "Diana Prince", "Executive", 120000, "Management", "2018-01-10"),
    (5, "Evan Wright", "Support", 55000, "Customer Support", "2022-08-05"),
    (6, "Fiona Gallagher", "Marketing", 65000, "Sales", "2021-01-30"),
];

const PRODUCTS: [(i64, &str, i64, &str, i64); 5] = [
    (1, "Laptop Pro", 1200, "Electronics", 50),
    (2, "Wireless Mouse", 25, "Accessories", 200),
    (3, "Desk Chair", 150, "Furniture", 30),
    (4, "Monitor 4K", 400, "Electronics", 40),
    (5, "Notebook", 5, "Stationery", 500),
];

const CUSTOMERS: [(i64, &str, &str, &str); 3] = [
    (1, "John Doe", "john@example.com", "USA"),
    (2, "Jane Smith", "jane@test.com", "Canada"),
    (3, "Sam Wilson", "sam@demo.com", "UK"),
];

const ORDERS: [(i64, i64, &str, i64, &str); 5] = [
    (101, 1, "2023-10-01", 1250, "Electronics"),
    (102, 2, "2023-10-02", 25, "Accessories"),
    (103, 1, "2023-10-05", 400, "Electronics"),
    (104, 3, "2023-10-06", 150, "Furniture"),
    (105, 2, "2023-10-07", 50, "Accessories"),
];

/// 새 데이터베이스를 만들어 고정 데이터를 채웁니다.
///
/// 호출할 때마다 똑같은 내용의 독립된 인스턴스를 돌려줍니다.
pub fn seed_dataset() -> Result<Database, StorageErr> {
    let mut db = Database::new();

    db.create_table(
        "employees",
        vec![
            ColumnDef::new("id", DataType::Int).primary_key(),
            ColumnDef::new("name", DataType::String),
            ColumnDef::new("role", DataType::String),
            ColumnDef::new("salary", DataType::Int),
            ColumnDef::new("department", DataType::String),
            ColumnDef::new("hired_date", DataType::String),
        ],
    )?;
    for (id, name, role, salary, department, hired) in EMPLOYEES {
        db.insert(
            "employees",
            vec![
                id.into(),
                name.into(),
                role.into(),
                salary.into(),
                department.into(),
                hired.into(),
            ],
        )?;
    }

    db.create_table(
        "products",
        vec![
            ColumnDef::new("id", DataType::Int).primary_key(),
            ColumnDef::new("name", DataType::String),
            ColumnDef::new("price", DataType::Int),
            ColumnDef::new("category", DataType::String),
            ColumnDef::new("stock", DataType::Int),
        ],
    )?;
    for (id, name, price, category, stock) in PRODUCTS {
        db.insert(
            "products",
            vec![
                id.into(),
                name.into(),
                price.into(),
                category.into(),
                stock.into(),
            ],
        )?;
    }

    db.create_table(
        "customers",
        vec![
            ColumnDef::new("id", DataType::Int).primary_key(),
            ColumnDef::new("name", DataType::String),
            ColumnDef::new("email", DataType::String),
            ColumnDef::new("country", DataType::String),
        ],
    )?;
    for (id, name, email, country) in CUSTOMERS {
        db.insert(
            "customers",
            vec![id.into(), name.into(), email.into(), country.into()],
        )?;
    }

    db.create_table(
        "orders",
        vec![
            ColumnDef::new("id", DataType::Int).primary_key(),
            ColumnDef::new("customer_id", DataType::Int).references("customers", "id"),
            ColumnDef::new("order_date", DataType::String),
            ColumnDef::new("total", DataType::Int),
            ColumnDef::new("category", DataType::String),
        ],
    )?;
    for (id, customer_id, date, total, category) in ORDERS {
        db.insert(
            "orders",
            vec![
                id.into(),
                customer_id.into(),
                date.into(),
                total.into(),
                category.into(),
            ],
        )?;
    }

    for table in db.tables() {
        debug!(table = %table.name, rows = table.row_count(), "seeded table");
    }
    Ok(db)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::storage::DataValue;

    #[test]
    fn test_row_counts() {
        let db = seed_dataset().unwrap();
        let counts: Vec<_> = db.tables().iter().map(|t| (t.name.as_str(), t.row_count())).collect();
        assert_eq!(
            counts,
            vec![("employees", 6), ("products", 5), ("customers", 3), ("orders", 5)]
        );
    }

    #[test]
    fn test_distinct_product_categories() {
        let db = seed_dataset().unwrap();
        let products = db.table("products").unwrap();
        let idx = products
            .columns
            .iter()
            .position(|c| c.name == "category")
            .unwrap();
        let mut categories: Vec<_> = products.rows().map(|r| r[idx].to_string()).collect();
        categories.sort();
        categories.dedup();
        assert_eq!(categories.len(), 4);
    }

    #[test]
    fn test_electronics_order_total() {
        let db = seed_dataset().unwrap();
        let orders = db.table("orders").unwrap();
        let total: i64 = orders
            .rows()
            .filter(|r| r[4].as_str() == Some("Electronics"))
            .filter_map(|r| r[3].as_int())
            .sum();
        assert_eq!(total, 1650);
        let first = orders.rows().next().unwrap();
        assert_eq!(first[0], DataValue::Int(101));
        assert_eq!(first[3], DataValue::Int(1250));
    }

    #[test]
    fn test_orders_reference_customers() {
        let db = seed_dataset().unwrap();
        let orders = db.table("orders").unwrap();
        assert_eq!(
            orders.columns[1].references,
            Some(("customers".to_string(), "id".to_string()))
        );
    }

    #[test]
    fn test_seeding_is_repeatable() {
        let first = seed_dataset().unwrap();
        let second = seed_dataset().unwrap();
        assert_eq!(first.schema(), second.schema());
        for (a, b) in first.tables().iter().zip(second.tables()) {
            assert!(a.rows().eq(b.rows()));
        }
    }
}
