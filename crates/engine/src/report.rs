//! Report rendering
//!
//! Each scenario renders its `when` against suite + scenario context plus
//! the ambient run values. Each test additionally sees its own context.
//! `None` and `Some(false)` share the fail glyph in the text report; the
//! JSON report keeps them apart.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::context::{ctx, merge, Context};
use crate::error::EngineResult;
use crate::suite::{Scenario, Tally, Test, TestSuite};
use crate::template::render_str;

pub const PASS_GLYPH: &str = "✓";
pub const FAIL_GLYPH: &str = "✗";

/// Column width for wrapped descriptions
pub const WRAP_WIDTH: usize = 70;

const TEST_INDENT: &str = "  ";
const DESC_INDENT: &str = "      ";

/// Values that describe the run itself rather than the suite
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmbientVars {
    pub url: String,
    pub course: String,
    pub nickname: String,
}

impl AmbientVars {
    fn to_context(&self) -> Context {
        ctx([
            ("url", self.url.as_str()),
            ("course", self.course.as_str()),
            ("nickname", self.nickname.as_str()),
        ])
    }
}

fn scenario_context(suite: &TestSuite, scenario: &Scenario, ambient: &Context) -> EngineResult<Context> {
    let this = ctx([("suite", serde_json::to_value(suite)?)]);
    Ok(merge(&[&suite.context, &scenario.context, ambient, &this]))
}

fn test_context(scenario_ctx: &Context, test: &Test) -> EngineResult<Context> {
    let this = ctx([("test", serde_json::to_value(test)?)]);
    Ok(merge(&[scenario_ctx, &test.context, &this]))
}

/// Merged context a test's templates (and `text` check strings) see.
pub fn context_for_test(
    suite: &TestSuite,
    scenario: &Scenario,
    test: &Test,
    ambient: &AmbientVars,
) -> EngineResult<Context> {
    let scenario_ctx = scenario_context(suite, scenario, &ambient.to_context())?;
    test_context(&scenario_ctx, test)
}

pub fn render_when(suite: &TestSuite, scenario: &Scenario, ambient: &AmbientVars) -> EngineResult<String> {
    let context = scenario_context(suite, scenario, &ambient.to_context())?;
    render_str(&scenario.when, &context)
}

pub fn glyph(passed: Option<bool>) -> &'static str {
    if passed == Some(true) {
        PASS_GLYPH
    } else {
        FAIL_GLYPH
    }
}

/// Greedy word wrap. Existing line breaks are kept; a word longer than
/// `width` gets a line of its own.
pub fn wrap_text(text: &str, width: usize) -> String {
    let mut lines = Vec::new();

    for paragraph in text.lines() {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            if !line.is_empty() && line.chars().count() + 1 + word.chars().count() > width {
                lines.push(std::mem::take(&mut line));
            }
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(word);
        }
        lines.push(line);
    }

    lines.join("\n")
}

fn indent(text: &str, prefix: &str) -> String {
    text.lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{prefix}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn tally_line(tally: &Tally) -> String {
    format!(
        "{} passed, {} failed, {} not run ({} total)",
        tally.passed,
        tally.failed,
        tally.pending,
        tally.total()
    )
}

/// Render the human-readable report.
pub fn render(suite: &TestSuite, ambient: &AmbientVars) -> EngineResult<String> {
    let ambient_ctx = ambient.to_context();
    let mut out = String::new();

    out.push_str(&format!("{}\n", suite.name));
    out.push_str(&format!(
        "course: {}  team: {}  url: {}\n",
        ambient.course, ambient.nickname, ambient.url
    ));

    for scenario in &suite.scenarios {
        let scenario_ctx = scenario_context(suite, scenario, &ambient_ctx)?;
        out.push_str(&format!("\nWhen {}\n", render_str(&scenario.when, &scenario_ctx)?));

        for test in &scenario.tests {
            let context = test_context(&scenario_ctx, test)?;
            let it = render_str(&test.it, &context)?;
            let mut desc = render_str(&test.desc, &context)?;
            if test.wrap {
                desc = wrap_text(&desc, WRAP_WIDTH);
            }

            out.push_str(&format!("{TEST_INDENT}{} it {}\n", glyph(test.passed), it));
            let desc = indent(desc.trim_end(), DESC_INDENT);
            if !desc.is_empty() {
                out.push_str(&desc);
                out.push('\n');
            }
        }
    }

    out.push('\n');
    out.push_str(&tally_line(&suite.tally()));
    out.push('\n');
    Ok(out)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonReport {
    pub suite: String,
    #[serde(flatten)]
    pub ambient: AmbientVars,
    pub generated_at: DateTime<Utc>,
    pub tally: Tally,
    pub scenarios: Vec<JsonScenario>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonScenario {
    pub key: String,
    pub when: String,
    pub tests: Vec<JsonTest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonTest {
    pub key: String,
    pub it: String,
    pub desc: String,
    pub passed: Option<bool>,
    pub context: Context,
}

/// Machine-readable report with rendered descriptions.
pub fn build_json_report(suite: &TestSuite, ambient: &AmbientVars) -> EngineResult<JsonReport> {
    let ambient_ctx = ambient.to_context();
    let mut scenarios = Vec::with_capacity(suite.scenarios.len());

    for scenario in &suite.scenarios {
        let scenario_ctx = scenario_context(suite, scenario, &ambient_ctx)?;
        let mut tests = Vec::with_capacity(scenario.tests.len());
        for test in &scenario.tests {
            let context = test_context(&scenario_ctx, test)?;
            tests.push(JsonTest {
                key: test.key.clone(),
                it: render_str(&test.it, &context)?,
                desc: render_str(&test.desc, &context)?,
                passed: test.passed,
                context: test.context.clone(),
            });
        }
        scenarios.push(JsonScenario {
            key: scenario.key.clone(),
            when: render_str(&scenario.when, &scenario_ctx)?,
            tests,
        });
    }

    Ok(JsonReport {
        suite: suite.name.clone(),
        ambient: ambient.clone(),
        generated_at: Utc::now(),
        tally: suite.tally(),
        scenarios,
    })
}

pub fn render_json(suite: &TestSuite, ambient: &AmbientVars) -> EngineResult<String> {
    let report = build_json_report(suite, ambient)?;
    Ok(serde_json::to_string_pretty(&report)?)
}
