//! YAML suite loading and validation
//!
//! Documents are read into permissive raw structs first so that a missing
//! or empty field can be reported with its full path, e.g.
//! `scenarios[1].tests[0].desc is required`.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info};

use crate::context::Context;
use crate::error::{EngineError, EngineResult};
use crate::suite::{Check, Scenario, Test, TestSuite};

#[derive(Debug, Deserialize)]
struct RawSuite {
    name: Option<String>,
    context: Option<Context>,
    scenarios: Option<Vec<RawScenario>>,
}

#[derive(Debug, Deserialize)]
struct RawScenario {
    #[serde(alias = "slug")]
    key: Option<String>,
    when: Option<String>,
    context: Option<Context>,
    visit: Option<String>,
    tests: Option<Vec<RawTest>>,
}

#[derive(Debug, Deserialize)]
struct RawTest {
    #[serde(alias = "slug")]
    key: Option<String>,
    it: Option<String>,
    desc: Option<String>,
    wrap: Option<bool>,
    context: Option<Context>,
    check: Option<Check>,
}

fn required(value: Option<String>, field: impl FnOnce() -> String) -> EngineResult<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(EngineError::config(field(), "is required")),
    }
}

impl RawTest {
    fn validate(self, path: &str) -> EngineResult<Test> {
        Ok(Test {
            key: required(self.key, || format!("{path}.key"))?,
            it: required(self.it, || format!("{path}.it"))?,
            desc: required(self.desc, || format!("{path}.desc"))?,
            wrap: self.wrap.unwrap_or(false),
            passed: None,
            context: self.context.unwrap_or_default(),
            check: self.check,
        })
    }
}

impl RawScenario {
    fn validate(self, path: &str) -> EngineResult<Scenario> {
        let key = required(self.key, || format!("{path}.key"))?;
        let when = required(self.when, || format!("{path}.when"))?;
        let raw_tests = self
            .tests
            .ok_or_else(|| EngineError::config(format!("{path}.tests"), "is required"))?;

        let mut seen = HashSet::new();
        let mut tests = Vec::with_capacity(raw_tests.len());
        for (i, raw) in raw_tests.into_iter().enumerate() {
            let test = raw.validate(&format!("{path}.tests[{i}]"))?;
            if !seen.insert(test.key.clone()) {
                return Err(EngineError::DuplicateKey {
                    kind: "test",
                    key: format!("{key}/{}", test.key),
                });
            }
            tests.push(test);
        }

        Ok(Scenario {
            key,
            when,
            context: self.context.unwrap_or_default(),
            visit: self.visit,
            tests,
        })
    }
}

impl RawSuite {
    fn validate(self) -> EngineResult<TestSuite> {
        let name = required(self.name, || "name".to_string())?;
        let raw_scenarios = self
            .scenarios
            .ok_or_else(|| EngineError::config("scenarios", "is required"))?;

        let mut seen = HashSet::new();
        let mut scenarios = Vec::with_capacity(raw_scenarios.len());
        for (i, raw) in raw_scenarios.into_iter().enumerate() {
            let scenario = raw.validate(&format!("scenarios[{i}]"))?;
            if !seen.insert(scenario.key.clone()) {
                return Err(EngineError::DuplicateKey {
                    kind: "scenario",
                    key: scenario.key,
                });
            }
            scenarios.push(scenario);
        }

        Ok(TestSuite {
            name,
            context: self.context.unwrap_or_default(),
            scenarios,
        })
    }
}

/// Parse and validate a suite document.
pub fn parse_suite(yaml: &str) -> EngineResult<TestSuite> {
    let raw: RawSuite = serde_yaml::from_str(yaml)?;
    raw.validate()
}

/// Read, parse and validate a suite file.
pub fn load_suite(path: &Path) -> EngineResult<TestSuite> {
    debug!("Loading suite from {}", path.display());
    let content = std::fs::read_to_string(path)?;
    let suite = parse_suite(&content)?;

    info!(
        "Loaded suite '{}' ({} scenarios, {} tests)",
        suite.name,
        suite.scenarios.len(),
        suite.tally().total()
    );
    Ok(suite)
}
