use crate::lesson::{Lesson, lessons};

/// 학습 진행 상태. 모든 전이는 값을 받아 새 값을 돌려줍니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    index: usize,
    editor: String,
    last_run_success: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self::at(0)
    }
}

impl Session {
    /// `index`번째 단원에서 시작합니다. 범위를 벗어나면 마지막 단원으로 맞춥니다.
    pub fn at(index: usize) -> Self {
        let index = index.min(lessons().len() - 1);
        Self {
            index,
            editor: lessons()[index].default_query.to_string(),
            last_run_success: false,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn lesson(&self) -> &'static Lesson {
        &lessons()[self.index]
    }

    pub fn editor(&self) -> &str {
        &self.editor
    }

    pub fn editor_mut(&mut self) -> &mut String {
        &mut self.editor
    }

    pub fn last_run_success(&self) -> bool {
        self.last_run_success
    }

    pub fn is_first(&self) -> bool {
        self.index == 0
    }

    pub fn is_last(&self) -> bool {
        self.index + 1 == lessons().len()
    }

    pub fn select(self, index: usize) -> Self {
        if index >= lessons().len() {
            return self;
        }
        Self::at(index)
    }

    /// 성공 여부와 관계없이 넘어갈 수 있습니다.
    pub fn next(self) -> Self {
        if self.is_last() {
            return self;
        }
        Self::at(self.index + 1)
    }

    pub fn prev(self) -> Self {
        if self.is_first() {
            return self;
        }
        Self::at(self.index - 1)
    }

    pub fn show_solution(self) -> Self {
        Self {
            editor: self.lesson().solution.to_string(),
            ..self
        }
    }

    /// 제출한 쿼리와 채점 결과를 기록합니다.
    pub fn record_run(self, submitted: &str, success: bool) -> Self {
        Self {
            editor: submitted.to_string(),
            last_run_success: success,
            ..self
        }
    }
}
