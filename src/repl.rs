//! 터미널 모드. SQL은 `;`로 끝나는 줄까지 모아서 실행하고,
//! `.`으로 시작하는 줄은 명령어로 처리합니다.

use crate::tutor::{LessonView, Nav, RunOutcome, Tutor};
use std::io::{self, BufRead, Write};
use std::mem;

const HELP: &str = "\
.lesson      show the current lesson
.list        list all lessons
.goto N      jump to lesson N
.next        go to the next lesson
.prev        go to the previous lesson
.hint        show the hint
.solution    load the solution into the editor
.run         run the editor text
.schema      show the tables and their columns
.help        show this message
.exit/.quit  leave
SQL is run once a line ends with ';'.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Lesson,
    List,
    Goto(usize),
    Next,
    Prev,
    Hint,
    Solution,
    Run,
    Schema,
    Help,
    Exit,
}

impl Command {
    fn parse(line: &str) -> Result<Self, String> {
        let mut words = line.split_whitespace();
        let name = words.next().unwrap_or_default();
        let command = match name {
            ".lesson" => Command::Lesson,
            ".list" => Command::List,
            ".goto" => {
                let n = words
                    .next()
                    .and_then(|w| w.parse::<usize>().ok())
                    .filter(|&n| n >= 1)
                    .ok_or_else(|| "usage: .goto N".to_string())?;
                Command::Goto(n - 1)
            }
            ".next" => Command::Next,
            ".prev" => Command::Prev,
            ".hint" => Command::Hint,
            ".solution" => Command::Solution,
            ".run" => Command::Run,
            ".schema" => Command::Schema,
            ".help" => Command::Help,
            ".exit" | ".quit" => Command::Exit,
            _ => return Err(format!("unknown command '{name}' (try .help)")),
        };
        if words.next().is_some() && !matches!(command, Command::Goto(_)) {
            return Err(format!("{name} takes no arguments"));
        }
        Ok(command)
    }
}

pub struct Repl<R, W> {
    tutor: Tutor,
    input: R,
    output: W,
}

impl Repl<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio(tutor: Tutor) -> Self {
        Self::new(tutor, io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Repl<R, W> {
    pub fn new(tutor: Tutor, input: R, output: W) -> Self {
        Self {
            tutor,
            input,
            output,
        }
    }

    pub fn run(&mut self) -> io::Result<()> {
        writeln!(
            self.output,
            "SQL Masterclass (type '.help' for commands, '.exit' or '.quit' to stop)"
        )?;
        self.print_lesson()?;
        let mut buffer = String::new();
        loop {
            if buffer.is_empty() {
                write!(self.output, "sql> ")?;
            } else {
                write!(self.output, "...  ")?;
            }
            self.output.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                // EOF
                writeln!(self.output)?;
                return Ok(());
            }
            let input = line.trim();
            if buffer.is_empty() && input.starts_with('.') {
                match Command::parse(input) {
                    Ok(Command::Exit) => return Ok(()),
                    Ok(command) => self.apply(command)?,
                    Err(msg) => writeln!(self.output, "{msg}")?,
                }
            } else if !input.ends_with(';') {
                if !input.is_empty() || !buffer.is_empty() {
                    buffer.push_str(input);
                    buffer.push('\n');
                }
            } else {
                buffer.push_str(input);
                let src = mem::take(&mut buffer);
                let outcome = self.tutor.run_query(&src);
                self.print_outcome(&outcome)?;
            }
        }
    }

    fn apply(&mut self, command: Command) -> io::Result<()> {
        match command {
            Command::Lesson => self.print_lesson(),
            Command::List => {
                for entry in self.tutor.lessons() {
                    let mark = if entry.is_active { '>' } else { ' ' };
                    writeln!(self.output, "{mark} {}", entry.category)?;
                }
                Ok(())
            }
            Command::Goto(index) => {
                if index >= self.tutor.lessons().len() {
                    return writeln!(self.output, "no such lesson: {}", index + 1);
                }
                self.tutor.navigate(Nav::Select(index));
                self.print_lesson()
            }
            Command::Next => self.step(Nav::Next, self.tutor.can_go_next()),
            Command::Prev => self.step(Nav::Prev, self.tutor.can_go_prev()),
            Command::Hint => {
                let hint = self.tutor.current_lesson().hint;
                writeln!(self.output, "Try using: {hint}")
            }
            Command::Solution => {
                self.tutor.navigate(Nav::ShowSolution);
                writeln!(self.output, "{}", self.tutor.editor())
            }
            Command::Run => {
                let outcome = self.tutor.run_editor();
                self.print_outcome(&outcome)
            }
            Command::Schema => {
                for (table, columns) in self.tutor.schema() {
                    writeln!(self.output, "{table}")?;
                    for (name, ty) in columns {
                        writeln!(self.output, "  {name:<12} {ty}")?;
                    }
                }
                Ok(())
            }
            Command::Help => writeln!(self.output, "{HELP}"),
            Command::Exit => Ok(()),
        }
    }

    fn step(&mut self, nav: Nav, allowed: bool) -> io::Result<()> {
        if !allowed {
            return writeln!(self.output, "no more lessons in that direction");
        }
        self.tutor.navigate(nav);
        self.print_lesson()
    }

    fn print_lesson(&mut self) -> io::Result<()> {
        let progress = self.tutor.progress();
        let LessonView {
            title,
            description,
            concept,
            task,
            ..
        } = self.tutor.current_lesson();
        writeln!(self.output, "\n== {title} ({}) ==", progress.caption())?;
        writeln!(self.output, "{description}")?;
        writeln!(self.output, "Key concept: {concept}")?;
        writeln!(self.output, "Your mission: {task}")?;
        writeln!(self.output, "Editor: {}\n", self.tutor.editor())
    }

    fn print_outcome(&mut self, outcome: &RunOutcome) -> io::Result<()> {
        if let Ok(result) = &outcome.result {
            writeln!(self.output, "{result}")?;
        }
        writeln!(self.output, "{}", outcome.message())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    impl<R, W> Repl<R, W> {
        fn into_tutor(self) -> Tutor {
            self.tutor
        }
    }

    fn session(script: &str) -> (Tutor, String) {
        let mut out = Vec::new();
        let mut repl = Repl::new(Tutor::new().unwrap(), script.as_bytes(), &mut out);
        repl.run().unwrap();
        let tutor = repl.into_tutor();
        (tutor, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse(".next"), Ok(Command::Next));
        assert_eq!(Command::parse(".goto 3"), Ok(Command::Goto(2)));
        assert_eq!(Command::parse(".quit"), Ok(Command::Exit));
        assert!(Command::parse(".goto").is_err());
        assert!(Command::parse(".goto 0").is_err());
        assert!(Command::parse(".next 2").is_err());
        assert!(Command::parse(".drop").is_err());
    }

    #[test]
    fn test_multiline_query() {
        let (tutor, out) = session("SELECT *\nFROM employees;\n.exit\n");
        assert!(out.contains("...  "));
        assert!(out.contains("(6 rows)"));
        assert!(out.contains("Correct! Great job."));
        assert!(tutor.last_run_success());
    }

    #[test]
    fn test_error_is_printed() {
        let (tutor, out) = session("SELEC 1;\n");
        assert!(out.contains("Error: syntax error"));
        assert!(!tutor.last_run_success());
    }

    #[test]
    fn test_navigation_commands() {
        let (tutor, out) = session(".goto 6\n.prev\n.next\n.next\n.next\n");
        assert_eq!(tutor.current_lesson().id, 7);
        assert!(out.contains("Lesson 7 of 7"));
        assert!(out.contains("no more lessons in that direction"));
    }

    #[test]
    fn test_goto_out_of_range() {
        let (tutor, out) = session(".goto 9\n");
        assert_eq!(tutor.current_lesson().id, 1);
        assert!(out.contains("no such lesson: 9"));
    }

    #[test]
    fn test_solution_then_run() {
        let (tutor, out) = session(".goto 7\n.solution\n.run\n");
        assert!(out.contains("HAVING SUM(total) > 1000"));
        assert!(out.contains("(1 row)"));
        assert!(tutor.last_run_success());
    }

    #[test]
    fn test_schema_and_list() {
        let (_, out) = session(".schema\n.list\n");
        assert!(out.contains("customer_id"));
        assert!(out.contains("> 01. Introduction"));
        assert!(out.contains("  07. Having"));
    }
}
