use super::{Check, Lesson};

/// 커리큘럼. 순서가 곧 진행 순서입니다.
pub static LESSONS: [Lesson; 7] = [
    Lesson {
        id: 1,
        category: "01. Introduction",
        title: "Introduction to SQL",
        description: "SQL (Structured Query Language) is used to communicate with databases. A database contains tables, each with rows (records) and columns (fields).",
        concept: "The SELECT statement is the starting point for all data retrieval. It tells the database which columns you want to see.",
        task: "List all data from the table 'employees'.",
        hint: "Use SELECT * FROM employees",
        default_query: "SELECT * FROM employees",
        solution: "SELECT * FROM employees",
        check: Check::EmployeeListing,
    },
    Lesson {
        id: 2,
        category: "02. Select & Where",
        title: "SELECT & WHERE",
        description: "You often need to filter data to find specific records. The WHERE clause allows you to set conditions that rows must meet to be included.",
        concept: "WHERE acts as a filter. Only rows that evaluate to TRUE are returned. Common operators: =, >, <, >=, <=, <>.",
        task: "Show all products with a price less than 100.",
        hint: "SELECT * FROM products WHERE price < 100",
        default_query: "SELECT * FROM products WHERE price < 100",
        solution: "SELECT * FROM products WHERE price < 100",
        check: Check::CheapProducts,
    },
    Lesson {
        id: 3,
        category: "03. Order & Limit",
        title: "ORDER BY & LIMIT",
        description: "Databases don't store data in a specific order. To rank results (e.g., top 10), you must sort them and limit the output.",
        concept: "ORDER BY sorts the result set. LIMIT restricts the number of rows returned. Always use ORDER BY before LIMIT for consistent results.",
        task: "Find the 3 most expensive products.",
        hint: "SELECT * FROM products ORDER BY price DESC LIMIT 3",
        default_query: "SELECT * FROM products ORDER BY price DESC LIMIT 3",
        solution: "SELECT * FROM products ORDER BY price DESC LIMIT 3",
        check: Check::TopThreeByPrice,
    },
    Lesson {
        id: 4,
        category: "04. Distinct",
        title: "DISTINCT Values",
        description: "Duplicate data is common. The DISTINCT keyword is used to return only distinct (different) values.",
        concept: "It eliminates duplicate rows from the result set, showing you a unique list of values for the selected column(s).",
        task: "List unique product categories.",
        hint: "SELECT DISTINCT category FROM products",
        default_query: "SELECT DISTINCT category FROM products",
        solution: "SELECT DISTINCT category FROM products",
        check: Check::DistinctCategories,
    },
    Lesson {
        id: 5,
        category: "05. Joins",
        title: "SQL JOINS",
        description: "Data is often split across multiple tables. JOINs allow you to combine rows from two or more tables based on a related column between them.",
        concept: "INNER JOIN selects records that have matching values in both tables. We link 'orders' to 'customers' using the customer_id.",
        task: "Show each order with the customer name.",
        hint: "SELECT orders.id, customers.name FROM orders JOIN customers ON orders.customer_id = customers.id",
        default_query: "SELECT orders.id, customers.name FROM orders JOIN customers ON orders.customer_id = customers.id",
        solution: "SELECT orders.id, customers.name FROM orders JOIN customers ON orders.customer_id = customers.id",
        check: Check::OrdersWithCustomers,
    },
    Lesson {
        id: 6,
        category: "06. Group By",
        title: "GROUP BY",
        description: "GROUP BY groups rows that have the same values into summary rows, like 'find the number of customers in each country'.",
        concept: "It is often used with aggregate functions (COUNT, MAX, MIN, SUM, AVG) to group the result-set by one or more columns.",
        task: "Find total sales (sum of total) per category from the orders table.",
        hint: "SELECT category, SUM(total) FROM orders GROUP BY category",
        default_query: "SELECT category, SUM(total) FROM orders GROUP BY category",
        solution: "SELECT category, SUM(total) FROM orders GROUP BY category",
        check: Check::SalesPerCategory,
    },
    Lesson {
        id: 7,
        category: "07. Having",
        title: "HAVING Clause",
        description: "The HAVING clause was added to SQL because the WHERE keyword could not be used with aggregate functions.",
        concept: "WHERE filters rows BEFORE grouping. HAVING filters groups AFTER grouping.",
        task: "Find product categories with total sales greater than 1000.",
        hint: "SELECT category, SUM(total) FROM orders GROUP BY category HAVING SUM(total) > 1000",
        default_query: "SELECT category, SUM(total) FROM orders GROUP BY category HAVING SUM(total) > 1000",
        solution: "SELECT category, SUM(total) FROM orders GROUP BY category HAVING SUM(total) > 1000",
        check: Check::ElectronicsOnly,
    },
];

pub fn lessons() -> &'static [Lesson] {
    &LESSONS
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_ids_are_ordered() {
        let ids: Vec<u32> = lessons().iter().map(|l| l.id).collect();
        assert_eq!(ids, (1..=7).collect::<Vec<_>>());
    }

    #[test]
    fn test_categories_are_numbered() {
        for lesson in lessons() {
            assert!(
                lesson
                    .category
                    .starts_with(&format!("{:02}. ", lesson.id)),
                "{} has an unnumbered category",
                lesson.title
            );
        }
    }
}
