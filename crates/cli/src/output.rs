//! Report output and terminal summary

use std::path::Path;

use anyhow::Context as _;
use clap::ValueEnum;
use colored::Colorize;

use sitecheck_engine::{render, render_json, AmbientVars, EngineResult, RunOutcome, Tally, TestSuite};

/// Report format
#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable checklist
    #[default]
    Text,
    /// JSON document
    Json,
}

pub fn render_report(suite: &TestSuite, ambient: &AmbientVars, format: OutputFormat) -> EngineResult<String> {
    match format {
        OutputFormat::Text => render(suite, ambient),
        OutputFormat::Json => render_json(suite, ambient),
    }
}

/// Write the report to `output`, or stdout when no file was given.
pub fn write_report(report: &str, output: Option<&Path>) -> anyhow::Result<()> {
    match output {
        Some(path) => std::fs::write(path, report)
            .with_context(|| format!("Failed to write report to {}", path.display())),
        None => {
            print!("{report}");
            Ok(())
        }
    }
}

/// Process exit code for a finished run: 0 when every evaluated test
/// passed, 1 when some failed, 2 when the run was aborted.
pub fn exit_code(outcome: &RunOutcome) -> i32 {
    if outcome.aborted.is_some() {
        2
    } else if outcome.suite.tally().failed > 0 {
        1
    } else {
        0
    }
}

fn summary_line(tally: &Tally, duration_ms: u64) -> String {
    format!(
        "{} passed, {} failed, {} not run in {:.1}s",
        tally.passed,
        tally.failed,
        tally.pending,
        duration_ms as f64 / 1000.0
    )
}

/// One-line verdict on stderr, so stdout stays the report.
pub fn print_summary(outcome: &RunOutcome) {
    let tally = outcome.suite.tally();
    let line = summary_line(&tally, outcome.duration_ms);

    if let Some(reason) = &outcome.aborted {
        eprintln!("{} {}", "ABORTED".red().bold(), reason);
        eprintln!("{}", line.dimmed());
    } else if tally.failed > 0 {
        eprintln!("{} {}", "FAILED".red().bold(), line);
    } else {
        eprintln!("{} {}", "PASSED".green().bold(), line);
    }
}

/// Print error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "error:".red().bold(), message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitecheck_engine::context::Context;
    use sitecheck_engine::{record_test_status, Scenario, Test};

    fn outcome(verdicts: &[Option<bool>], aborted: Option<&str>) -> RunOutcome {
        let tests = verdicts
            .iter()
            .enumerate()
            .map(|(i, passed)| Test {
                key: format!("t{i}"),
                it: format!("does thing {i}"),
                desc: "Something.".to_string(),
                wrap: false,
                passed: *passed,
                context: Context::new(),
                check: None,
            })
            .collect();
        RunOutcome {
            suite: TestSuite {
                name: "Checklist".to_string(),
                context: Context::new(),
                scenarios: vec![Scenario {
                    key: "home".to_string(),
                    when: "visiting".to_string(),
                    context: Context::new(),
                    visit: None,
                    tests,
                }],
            },
            aborted: aborted.map(str::to_string),
            duration_ms: 1500,
        }
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_code(&outcome(&[Some(true), None], None)), 0);
        assert_eq!(exit_code(&outcome(&[Some(true), Some(false)], None)), 1);
        assert_eq!(exit_code(&outcome(&[Some(false)], Some("site is down"))), 2);
    }

    #[test]
    fn test_summary_line() {
        let run = outcome(&[Some(true), Some(false), None], None);
        assert_eq!(
            summary_line(&run.suite.tally(), run.duration_ms),
            "1 passed, 1 failed, 1 not run in 1.5s"
        );
    }

    #[test]
    fn test_report_formats() {
        let ambient = AmbientVars {
            url: "https://a.example.com".to_string(),
            course: "cpsc113".to_string(),
            nickname: "team".to_string(),
        };
        let run = outcome(&[None], None);
        let suite = record_test_status(true, &run.suite, "home", "t0", None);

        let text = render_report(&suite, &ambient, OutputFormat::Text).unwrap();
        assert!(text.contains("✓ it does thing 0"));

        let json = render_report(&suite, &ambient, OutputFormat::Json).unwrap();
        assert!(json.trim_start().starts_with('{'));
    }

    #[test]
    fn test_write_report_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.txt");
        write_report("hello\n", Some(&path)).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello\n");
    }
}
