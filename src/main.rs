pub mod executor;
pub mod gui;
pub mod lesson;
pub mod query;
pub mod repl;
pub mod storage;
pub mod tutor;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Interactive SQL tutorial over a small built-in dataset
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Run in the terminal instead of opening a window
    #[arg(long)]
    cli: bool,

    /// Lesson to start on
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u8).range(1..=7))]
    lesson: Option<u8>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, value_name = "FILTER", default_value = "warn")]
    log_level: String,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .with_context(|| format!("invalid log filter '{}'", args.log_level))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let tutor = start_tutor(args.lesson)?;

    if args.cli {
        repl::Repl::stdio(tutor)
            .run()
            .context("terminal session failed")?;
    } else {
        gui::Application::new(tutor)
            .launch()
            .map_err(|e| anyhow::anyhow!("failed to launch the GUI: {e}"))?;
    }
    Ok(())
}

// --lesson은 1부터 셉니다
fn start_tutor(lesson: Option<u8>) -> anyhow::Result<tutor::Tutor> {
    match lesson {
        Some(n) => tutor::Tutor::starting_at(usize::from(n) - 1),
        None => tutor::Tutor::new(),
    }
    .context("failed to seed the tutorial dataset")
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_args() {
        let args = Args::try_parse_from(["sql-masterclass", "--cli", "--lesson", "7"]).unwrap();
        assert!(args.cli);
        assert_eq!(args.lesson, Some(7));
        assert_eq!(args.log_level, "warn");
        assert!(Args::try_parse_from(["sql-masterclass", "--lesson", "8"]).is_err());
        assert!(Args::try_parse_from(["sql-masterclass", "--lesson", "0"]).is_err());
    }

    #[test]
    fn test_start_tutor() {
        assert_eq!(start_tutor(None).unwrap().current_lesson().id, 1);
        assert_eq!(start_tutor(Some(7)).unwrap().current_lesson().id, 7);
    }
}
