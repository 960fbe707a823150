pub mod catalog;
pub mod check;

pub use catalog::{LESSONS, lessons};
pub use check::{Check, CheckErr, Verdict, validate};

/// 한 단원: 설명 글, 기본 쿼리, 모범 답안, 채점 기준
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lesson {
    pub id: u32,
    pub category: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub concept: &'static str,
    pub task: &'static str,
    pub hint: &'static str,
    pub default_query: &'static str,
    pub solution: &'static str,
    pub check: Check,
}
