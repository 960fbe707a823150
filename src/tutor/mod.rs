//! The boundary between the lesson model and whatever draws it.
//!
//! Front ends (the GUI and the REPL) only talk to [`Tutor`]: they ask for the
//! current lesson, forward navigation and run requests, and render what comes back.

mod session;

use session::Session;

use crate::executor::{Executor, QueryResult};
use crate::lesson::{Verdict, lessons, validate};
use crate::query::QueryErr;
use crate::storage::{StorageErr, seed_dataset};
use std::mem;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nav {
    Select(usize),
    Next,
    Prev,
    ShowSolution,
}

/// 화면에 보여줄 단원 내용
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LessonView {
    pub id: u32,
    pub category: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub concept: &'static str,
    pub task: &'static str,
    pub hint: &'static str,
    pub default_query: &'static str,
}

/// 사이드바 목록의 한 줄
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LessonEntry {
    pub index: usize,
    pub category: &'static str,
    pub is_active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    pub current: usize,
    pub total: usize,
}

impl Progress {
    /// 지금까지 끝낸 비율 (현재 단원은 아직 끝나지 않은 것으로 봄)
    pub fn fraction(&self) -> f32 {
        (self.current - 1) as f32 / self.total as f32
    }

    pub fn caption(&self) -> String {
        format!("Lesson {} of {}", self.current, self.total)
    }
}

/// 쿼리 실행 한 번의 결과. 쿼리가 실패하면 채점하지 않습니다.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub result: Result<QueryResult, QueryErr>,
    pub verdict: Option<Verdict>,
}

impl RunOutcome {
    pub fn passed(&self) -> bool {
        self.verdict.as_ref().is_some_and(Verdict::is_pass)
    }

    pub fn message(&self) -> String {
        match (&self.result, &self.verdict) {
            (Err(e), _) => format!("Error: {e}"),
            (Ok(_), Some(verdict)) => verdict.message(),
            (Ok(_), None) => String::new(),
        }
    }
}

pub struct Tutor {
    executor: Executor,
    session: Session,
}

impl Tutor {
    pub fn new() -> Result<Self, StorageErr> {
        Self::starting_at(0)
    }

    /// 0부터 세는 `index`번째 단원에서 시작합니다.
    pub fn starting_at(index: usize) -> Result<Self, StorageErr> {
        let executor = Executor::new(seed_dataset()?);
        let session = Session::at(index);
        info!(lesson = session.lesson().id, "tutor session started");
        Ok(Self { executor, session })
    }

    pub fn current_lesson(&self) -> LessonView {
        let lesson = self.session.lesson();
        LessonView {
            id: lesson.id,
            category: lesson.category,
            title: lesson.title,
            description: lesson.description,
            concept: lesson.concept,
            task: lesson.task,
            hint: lesson.hint,
            default_query: lesson.default_query,
        }
    }

    pub fn lessons(&self) -> Vec<LessonEntry> {
        lessons()
            .iter()
            .enumerate()
            .map(|(index, lesson)| LessonEntry {
                index,
                category: lesson.category,
                is_active: index == self.session.index(),
            })
            .collect()
    }

    pub fn run_query(&mut self, sql: &str) -> RunOutcome {
        debug!(lesson = self.session.lesson().id, sql, "running query");
        let outcome = match self.executor.run(sql) {
            Ok(result) => {
                let verdict = validate(self.session.lesson(), &result);
                if let Verdict::Unverifiable(e) = &verdict {
                    warn!(error = %e, "query ran but could not be graded");
                }
                RunOutcome {
                    result: Ok(result),
                    verdict: Some(verdict),
                }
            }
            Err(e) => {
                warn!(error = %e, "query failed");
                RunOutcome {
                    result: Err(e),
                    verdict: None,
                }
            }
        };
        let success = outcome.passed();
        self.session = mem::take(&mut self.session).record_run(sql, success);
        outcome
    }

    /// 편집기에 있는 쿼리를 실행합니다.
    pub fn run_editor(&mut self) -> RunOutcome {
        let sql = self.session.editor().to_string();
        self.run_query(&sql)
    }

    pub fn navigate(&mut self, nav: Nav) {
        let session = mem::take(&mut self.session);
        self.session = match nav {
            Nav::Select(index) => session.select(index),
            Nav::Next => session.next(),
            Nav::Prev => session.prev(),
            Nav::ShowSolution => session.show_solution(),
        };
        info!(?nav, lesson = self.session.lesson().id, "navigated");
    }

    pub fn editor(&self) -> &str {
        self.session.editor()
    }

    pub fn editor_mut(&mut self) -> &mut String {
        self.session.editor_mut()
    }

    pub fn last_run_success(&self) -> bool {
        self.session.last_run_success()
    }

    pub fn can_go_prev(&self) -> bool {
        !self.session.is_first()
    }

    pub fn can_go_next(&self) -> bool {
        !self.session.is_last()
    }

    pub fn progress(&self) -> Progress {
        Progress {
            current: self.session.index() + 1,
            total: lessons().len(),
        }
    }

    pub fn schema(&self) -> Vec<(String, Vec<(String, &'static str)>)> {
        self.executor.database().schema()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn tutor() -> Tutor {
        Tutor::new().unwrap()
    }

    #[test]
    fn test_lesson_one_passes() {
        let mut tutor = tutor();
        let outcome = tutor.run_query("SELECT * FROM employees");
        let result = outcome.result.as_ref().unwrap();
        assert_eq!((result.row_count(), result.column_count()), (6, 6));
        assert_eq!(outcome.verdict, Some(Verdict::Pass));
        assert!(tutor.last_run_success());
    }

    #[test]
    fn test_malformed_query_keeps_session() {
        let mut tutor = tutor();
        tutor.run_query("SELECT * FROM employees");
        assert!(tutor.last_run_success());

        let outcome = tutor.run_query("SELEC * FROM employees");
        assert!(matches!(outcome.result, Err(QueryErr::UnexpectedToken { .. })));
        assert_eq!(outcome.verdict, None);
        assert!(outcome.message().starts_with("Error: syntax error"));
        assert!(!tutor.last_run_success());
        assert_eq!(tutor.progress().current, 1);
        assert_eq!(tutor.editor(), "SELEC * FROM employees");
    }

    #[test]
    fn test_failed_check_clears_success() {
        let mut tutor = tutor();
        tutor.navigate(Nav::Select(5));
        let sql = tutor.current_lesson().default_query;
        assert!(tutor.run_query(sql).passed());
        let outcome = tutor.run_query("SELECT * FROM orders");
        assert_eq!(outcome.verdict, Some(Verdict::Fail));
        assert!(!tutor.last_run_success());
    }

    #[test]
    fn test_unverifiable_clears_success() {
        let mut tutor = tutor();
        tutor.navigate(Nav::Next);
        tutor.run_query("SELECT * FROM products WHERE price < 100");
        assert!(tutor.last_run_success());
        let outcome = tutor.run_query("SELECT name FROM products WHERE price < 100");
        assert!(matches!(outcome.verdict, Some(Verdict::Unverifiable(_))));
        assert!(outcome.message().starts_with("The query ran, but we couldn't verify"));
        assert!(!tutor.last_run_success());
    }

    #[test]
    fn test_walk_through_every_lesson() {
        let mut tutor = tutor();
        loop {
            tutor.navigate(Nav::ShowSolution);
            let outcome = tutor.run_editor();
            assert!(outcome.passed(), "lesson {}", tutor.current_lesson().id);
            if !tutor.can_go_next() {
                break;
            }
            tutor.navigate(Nav::Next);
            assert!(!tutor.last_run_success());
        }
        assert_eq!(tutor.current_lesson().id, 7);
        tutor.navigate(Nav::Next);
        assert_eq!(tutor.current_lesson().id, 7);
        assert!(tutor.last_run_success());
    }

    #[test]
    fn test_navigation_bounds() {
        let mut tutor = tutor();
        assert!(!tutor.can_go_prev());
        tutor.navigate(Nav::Prev);
        assert_eq!(tutor.progress().current, 1);

        tutor.navigate(Nav::Select(3));
        assert_eq!(tutor.editor(), lessons()[3].default_query);
        assert_eq!(tutor.current_lesson().title, "DISTINCT Values");
        assert!(tutor.can_go_prev() && tutor.can_go_next());
    }

    #[test]
    fn test_lesson_list_marks_active() {
        let mut tutor = tutor();
        tutor.navigate(Nav::Select(2));
        let active: Vec<_> = tutor
            .lessons()
            .into_iter()
            .filter(|entry| entry.is_active)
            .map(|entry| entry.index)
            .collect();
        assert_eq!(active, vec![2]);
        assert_eq!(tutor.lessons().len(), 7);
    }

    #[test]
    fn test_progress() {
        let mut tutor = tutor();
        assert_eq!(tutor.progress().caption(), "Lesson 1 of 7");
        assert_eq!(tutor.progress().fraction(), 0.0);
        tutor.navigate(Nav::Select(6));
        assert_eq!(tutor.progress().caption(), "Lesson 7 of 7");
    }

    #[test]
    fn test_schema_lists_tables_in_order() {
        let schema = tutor().schema();
        let names: Vec<_> = schema.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["employees", "products", "customers", "orders"]);
        assert_eq!(
            schema[3].1[1],
            ("customer_id".to_string(), "INTEGER")
        );
    }

    #[test]
    fn test_sessions_are_independent() {
        let mut first = tutor();
        let second = tutor();
        first.navigate(Nav::Next);
        assert_eq!(first.progress().current, 2);
        assert_eq!(second.progress().current, 1);
    }
}
