//! Suite → Scenario → Test tree

use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::probe::{CountPredicate, FoundPredicate};

/// One grading checklist for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestSuite {
    pub name: String,

    /// Suite-global values, visible to every template
    #[serde(default)]
    pub context: Context,

    pub scenarios: Vec<Scenario>,
}

/// A situation ("when") grouping related tests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Stable identifier, unique within the suite
    pub key: String,

    /// Template describing the situation, e.g. "visiting {{ url }}"
    pub when: String,

    #[serde(default)]
    pub context: Context,

    /// Path relative to the target URL to load before the tests run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visit: Option<String>,

    pub tests: Vec<Test>,
}

/// A single assertion with its verdict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Test {
    /// Stable identifier, unique within the scenario
    pub key: String,

    pub it: String,

    pub desc: String,

    /// Reflow `desc` before indenting it
    #[serde(default)]
    pub wrap: bool,

    /// `None` until a probe has run
    #[serde(default)]
    pub passed: Option<bool>,

    #[serde(default)]
    pub context: Context,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check: Option<Check>,
}

/// Declarative probe binding for a test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "probe", rename_all = "snake_case")]
pub enum Check {
    /// The scenario's navigation answered with a 2xx/3xx status
    Reachable,

    /// The page has a non-empty title, optionally containing a substring
    Title {
        #[serde(default)]
        contains: Option<String>,
    },

    Selectors {
        selectors: Vec<String>,
        expect: CountPredicate,
    },

    /// Strings are templates, rendered against the test's context first
    Text {
        strings: Vec<String>,
        expect: FoundPredicate,
    },

    Rsvp {
        accept: bool,
        #[serde(default)]
        domain: Option<String>,
    },

    Markup,
}

/// Verdict counts over a whole suite
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub passed: usize,
    pub failed: usize,
    pub pending: usize,
}

impl Tally {
    pub fn total(&self) -> usize {
        self.passed + self.failed + self.pending
    }
}

impl TestSuite {
    pub fn scenario(&self, key: &str) -> Option<&Scenario> {
        self.scenarios.iter().find(|s| s.key == key)
    }

    pub fn test(&self, scenario_key: &str, test_key: &str) -> Option<&Test> {
        self.scenario(scenario_key).and_then(|s| s.test(test_key))
    }

    pub fn tally(&self) -> Tally {
        let mut tally = Tally::default();
        for test in self.scenarios.iter().flat_map(|s| s.tests.iter()) {
            match test.passed {
                Some(true) => tally.passed += 1,
                Some(false) => tally.failed += 1,
                None => tally.pending += 1,
            }
        }
        tally
    }
}

impl Scenario {
    pub fn test(&self, key: &str) -> Option<&Test> {
        self.tests.iter().find(|t| t.key == key)
    }
}
